#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const HEADER: [&str; 8] = [
    "TaskId",
    "TaskName",
    "Description",
    "Domain",
    "Mode",
    "Status",
    "CreatedDate",
    "DueDate",
];

pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn sheet_path(&self) -> PathBuf {
        self.dir.path().join("tasks.sheet.json")
    }

    /// `taskboard` bound to this data directory with a clean environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskboard").expect("binary");
        cmd.env("TASKBOARD_DATA", self.dir.path())
            .env_remove("PORT")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Writes a sheet with the default header and the given rows.
    pub fn write_sheet(&self, rows: &[[&str; 8]]) -> std::io::Result<()> {
        let sheet = serde_json::json!({
            "title": "Tasks",
            "header": HEADER,
            "rows": rows,
        });
        fs::write(self.sheet_path(), serde_json::to_vec_pretty(&sheet)?)
    }

    pub fn write_raw_sheet(&self, contents: &str) -> std::io::Result<()> {
        fs::write(self.sheet_path(), contents)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<()> {
        fs::write(self.dir.path().join("taskboard.toml"), contents)
    }

    /// Runs with `--json` and returns the parsed stdout and exit code.
    pub fn run_json(&self, args: &[&str]) -> (i32, Value) {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .output()
            .expect("run taskboard");
        let code = output.status.code().unwrap_or(-1);
        let value = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
            panic!(
                "stdout is not JSON ({err}): {}",
                String::from_utf8_lossy(&output.stdout)
            )
        });
        (code, value)
    }
}
