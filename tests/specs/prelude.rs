//! Shared helpers for CLI specs

use assert_cmd::Command;
use tempfile::TempDir;

pub use predicates::prelude::*;

/// One isolated ledger data directory, shared across CLI invocations
pub struct Ledger {
    dir: TempDir,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// A `rifa` command pointed at this ledger
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("rifa").unwrap();
        cmd.arg("--data-dir").arg(self.dir.path());
        cmd
    }

    /// Run a subcommand and return the assertion handle
    pub fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd().args(args).assert()
    }

    /// Parse the stdout of a `--json` invocation
    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cmd().arg("--json").args(args).output().unwrap();
        assert!(
            output.status.success(),
            "command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}
