//! CLI command execution helpers with automatic timing
//!
//! This module provides a wrapper around the `quell` binary that points it at
//! an isolated config file and measures execution time.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Scratch directory holding a test's config file and traces
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("Failed to create temp dir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("quell").join("config.toml")
    }

    /// Write a file into the scratch directory, returning its path
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Command bound to this environment's config file
    pub fn command(&self) -> QuellCommand {
        let mut cmd = QuellCommand::new(self.path());
        cmd.env("QUELL_CONFIG", &self.config_path().to_string_lossy());
        cmd
    }
}

/// CLI command builder with timing
pub struct QuellCommand {
    binary_path: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl QuellCommand {
    /// Create a new command in the given working directory
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_quell")),
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .output()
            .context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains text
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    /// Check if stderr contains text
    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Last non-empty stdout line
    pub fn last_line(&self) -> &str {
        self.stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("")
    }
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// quell!(env, "config", "get", "debounce.delay_ms").assert_success()?;
/// ```
#[macro_export]
macro_rules! quell {
    ($env:expr, $($arg:expr),*) => {{
        let mut cmd = $env.command();
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
