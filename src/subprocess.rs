use std::fmt;
use std::process::{Child, Command, Stdio};

use crate::error::TransportError;

/// Result of running a subprocess.
#[derive(Debug)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl RunOutput {
    /// Returns true if the process exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Builder for short-lived commands with captured output.
pub struct Tool {
    program: String,
    args: Vec<String>,
}

impl Tool {
    /// Create a new tool invocation.
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| (*s).to_string()));
        self
    }

    /// Short human-readable form used in error messages: the program and its
    /// subcommand words, without flag values that may be large (GraphQL
    /// queries, issue bodies).
    pub fn describe(&self) -> String {
        let words: Vec<&str> = self
            .args
            .iter()
            .take_while(|a| !a.starts_with('-'))
            .take(3)
            .map(String::as_str)
            .collect();
        if words.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, words.join(" "))
        }
    }

    /// Run the tool, capturing stdout and stderr.
    pub fn run(&self) -> Result<RunOutput, TransportError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.not_found_or_other(e))?;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Run the tool and return an error if it fails.
    pub fn run_ok(&self) -> Result<RunOutput, TransportError> {
        let output = self.run()?;
        if output.success() {
            Ok(output)
        } else {
            let stderr = output.stderr.trim();
            Err(TransportError::Failed {
                command: self.describe(),
                code: output.exit_code,
                message: if stderr.is_empty() {
                    output.stdout.trim().to_string()
                } else {
                    stderr.to_string()
                },
            })
        }
    }

    fn not_found_or_other(&self, e: std::io::Error) -> TransportError {
        if e.kind() == std::io::ErrorKind::NotFound {
            TransportError::NotFound {
                tool: self.program.clone(),
            }
        } else {
            TransportError::Io {
                command: self.describe(),
                source: e,
            }
        }
    }
}

/// A long-running agent process: program plus argument list, spawned with
/// the daemon's own stdin/stdout/stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: String,
    pub args: Vec<String>,
}

impl Launch {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Spawn the process with inherited standard streams.
    pub fn spawn(&self) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
    }
}

impl fmt::Display for Launch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
