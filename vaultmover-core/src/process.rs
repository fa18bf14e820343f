//! Running the external tools some adapters delegate to (`gpg`,
//! `keepassxc-cli`, `pass`).

use crate::platform::find_in_path;
use crate::{MigrationError, Result};
use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;
use zeroize::Zeroizing;

/// Captured result of a finished tool invocation.
pub struct ToolOutput {
    pub code: i32,
    /// Plaintext may land here, so it is wiped on drop.
    pub stdout: Zeroizing<Vec<u8>>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A located external executable plus the environment to run it with.
#[derive(Debug, Clone)]
pub struct Tool {
    program: PathBuf,
    env: Vec<(String, String)>,
}

impl Tool {
    /// First of `candidates` found in `PATH`. `hint` tells the user how to
    /// install it.
    pub fn locate(candidates: &[&str], hint: &str) -> Result<Self> {
        candidates
            .iter()
            .find_map(|name| find_in_path(name))
            .map(|program| Self {
                program,
                env: Vec::new(),
            })
            .ok_or_else(|| MigrationError::MissingDependency {
                name: candidates.first().copied().unwrap_or_default().to_string(),
                hint: hint.to_string(),
            })
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run with `args`, feeding `stdin` when given, and capture the output.
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S], stdin: Option<&[u8]>) -> Result<ToolOutput> {
        debug!("Running {}", self.program.display());
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            MigrationError::Manager(format!("failed to run {}: {}", self.program.display(), e))
        })?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)?;
        }
        let output = child.wait_with_output()?;

        Ok(ToolOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: Zeroizing::new(output.stdout),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
