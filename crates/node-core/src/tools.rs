//! External process collaborators
//!
//! The archive tool expands a definition library into a directory tree that
//! can be committed, and collapses such a tree back into a library. The
//! package release command publishes a released repository. Both block until
//! the process exits; a non-zero exit is fatal.

use std::path::Path;
use std::process::Command;

use crate::config::ManagerConfig;
use crate::{Error, Result};

/// Expands and collapses definition libraries.
pub trait ArchiveTool: Send + Sync {
    /// Expand the library `src` into the directory `dest`.
    fn expand(&self, src: &Path, dest: &Path) -> Result<()>;

    /// Collapse the directory `src` into the library `dest`.
    fn collapse(&self, src: &Path, dest: &Path) -> Result<()>;
}

/// The `hotl` command line archive tool.
#[derive(Debug, Clone)]
pub struct Hotl {
    program: String,
    apprentice: bool,
}

impl Hotl {
    pub fn new(program: impl Into<String>, apprentice: bool) -> Self {
        Self {
            program: program.into(),
            apprentice,
        }
    }

    pub fn from_config(config: &ManagerConfig) -> Self {
        Self::new(config.archive_tool.clone(), config.apprentice)
    }

    fn expand_flag(&self) -> &'static str {
        if self.apprentice { "-x" } else { "-tp" }
    }

    fn collapse_flag(&self) -> &'static str {
        if self.apprentice { "-c" } else { "-l" }
    }
}

impl ArchiveTool for Hotl {
    fn expand(&self, src: &Path, dest: &Path) -> Result<()> {
        tracing::debug!(src = %src.display(), dest = %dest.display(), "Expanding definition");
        let mut cmd = Command::new(&self.program);
        cmd.arg(self.expand_flag()).arg(dest).arg(src);
        run(&self.program, cmd).map(|_| ())
    }

    fn collapse(&self, src: &Path, dest: &Path) -> Result<()> {
        tracing::debug!(src = %src.display(), dest = %dest.display(), "Collapsing definition");
        let mut cmd = Command::new(&self.program);
        cmd.arg(self.collapse_flag()).arg(src).arg(dest);
        run(&self.program, cmd).map(|_| ())
    }
}

/// Package release command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCommand {
    program: String,
    args: Vec<String>,
}

impl ReleaseCommand {
    /// Parse a whitespace separated command line.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::configuration("package release command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run the command in `working_dir`, returning its stdout.
    pub fn run(&self, working_dir: &Path) -> Result<String> {
        tracing::info!(program = %self.program, cwd = %working_dir.display(), "Running package release");
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(working_dir).args(&self.args);
        run(&self.program, cmd)
    }
}

/// Run a command to completion, turning a non-zero exit into
/// [`Error::ToolFailed`] with the captured stderr.
fn run(tool: &str, mut cmd: Command) -> Result<String> {
    let output = cmd.output().map_err(|e| Error::ToolFailed {
        tool: tool.to_string(),
        code: -1,
        stderr: e.to_string(),
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        Err(Error::ToolFailed {
            tool: tool.to_string(),
            code,
            stderr,
        })
    }
}
