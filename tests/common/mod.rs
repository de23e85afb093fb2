#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use tempfile::{TempDir, tempdir};
use terminal_insights::{
    data::{Dataset, QueryResponse},
    io_utils::{self, LoadOptions},
    mock,
};

/// Returns the absolute path to a fixture under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Loads a fixture the same way the commands do.
pub fn load_fixture(name: &str) -> QueryResponse {
    io_utils::load_payload(&fixture_path(name), &LoadOptions::default()).expect("load fixture")
}

/// Fixed reference time so generated data and alert stamps are stable.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap()
}

pub fn generated(rows: usize, seed: u64) -> Dataset {
    mock::generate(rows, seed, base_time())
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    pub fn write_json(&self, name: &str, value: &impl serde::Serialize) -> PathBuf {
        let contents = serde_json::to_string_pretty(value).expect("serialize fixture");
        self.write(name, &contents)
    }
}
