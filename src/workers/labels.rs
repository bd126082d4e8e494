use crate::gateway::LabelSpec;

pub const DEV_READY: &str = "dev-ready";
pub const CREATE_ISSUE: &str = "create-issue";
pub const UPDATE_ISSUE: &str = "update-issue";
pub const FIX_ONETIME: &str = "fix-onetime";
pub const FIX_REPEAT: &str = "fix-repeat";
pub const IN_PROGRESS: &str = "in-progress";

/// Every label the workers read or write, as created by `init`.
pub const ALL: [LabelSpec; 6] = [
    LabelSpec {
        name: CREATE_ISSUE,
        color: "0E8A16",
        description: "Draft new issues from this request",
    },
    LabelSpec {
        name: UPDATE_ISSUE,
        color: "1D76DB",
        description: "Revise this issue from its latest comment",
    },
    LabelSpec {
        name: DEV_READY,
        color: "5319E7",
        description: "Ready for the agent to implement",
    },
    LabelSpec {
        name: FIX_ONETIME,
        color: "FBCA04",
        description: "Address open review threads once",
    },
    LabelSpec {
        name: FIX_REPEAT,
        color: "D93F0B",
        description: "Keep addressing open review threads",
    },
    LabelSpec {
        name: IN_PROGRESS,
        color: "C2E0C6",
        description: "An agent is working on this",
    },
];
