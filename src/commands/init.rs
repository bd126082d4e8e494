use clap::Args;

use crate::error::{ExitError, TransportError};
use crate::gateway::{Gateway, GhCli};
use crate::workers::labels;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// GitHub CLI executable
    #[arg(long, default_value = "gh")]
    pub gh: String,
}

impl InitArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let gh = GhCli::new(&self.gh);
        eprintln!("Creating labels...");
        for (name, created) in create_labels(&gh).map_err(ExitError::from)? {
            if created {
                eprintln!("  Created label: {name}");
            } else {
                eprintln!("  Label already exists: {name}");
            }
        }
        eprintln!("Done.");
        Ok(())
    }
}

/// Create every worker label. Existing labels are left as they are.
pub fn create_labels(gateway: &dyn Gateway) -> Result<Vec<(&'static str, bool)>, TransportError> {
    labels::ALL
        .iter()
        .map(|spec| Ok((spec.name, gateway.create_label(spec)?)))
        .collect()
}
