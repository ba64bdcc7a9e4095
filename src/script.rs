//! Python script runner
//!
//! Launches a `.py` file through an interpreter process and reports how it
//! exited. Standard streams are inherited from the caller.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interpreter used when none is configured
#[cfg(windows)]
pub const DEFAULT_INTERPRETER: &str = "py";
#[cfg(not(windows))]
pub const DEFAULT_INTERPRETER: &str = "python3";

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Not a Python script: {0}")]
    NotAScript(PathBuf),

    #[error("Script not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied running {0}")]
    PermissionDenied(PathBuf),

    #[error("Failed to launch {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScriptError>;

/// How a script run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
}

#[derive(Debug, Clone)]
pub struct ScriptRunner {
    path: PathBuf,
    interpreter: String,
}

impl ScriptRunner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn is_python_script(&self) -> bool {
        self.path.to_string_lossy().ends_with(".py")
    }

    /// Run the script and wait for it to finish
    pub fn run(&self) -> Result<ScriptOutcome> {
        if !self.is_python_script() {
            return Err(ScriptError::NotAScript(self.path.clone()));
        }
        if !self.path.exists() {
            return Err(ScriptError::NotFound(self.path.clone()));
        }

        tracing::debug!("Running {} with {}", self.path.display(), self.interpreter);
        let status = Command::new(&self.interpreter)
            .arg(&self.path)
            .status()
            .map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => ScriptError::PermissionDenied(self.path.clone()),
                _ => ScriptError::Spawn {
                    interpreter: self.interpreter.clone(),
                    source: e,
                },
            })?;

        let outcome = ScriptOutcome {
            exit_code: status.code(),
            success: status.success(),
        };
        if outcome.success {
            tracing::info!("{} finished successfully", self.path.display());
        } else {
            tracing::warn!("{} exited with {:?}", self.path.display(), outcome.exit_code);
        }
        Ok(outcome)
    }
}
