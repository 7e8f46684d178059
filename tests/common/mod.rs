#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

pub const SAMPLE_LCOV: &str = include_str!("../fixtures/sample.lcov");
pub const COUNTER_BYTECODE: &str = include_str!("../fixtures/counter_bytecode.txt");
pub const COUNTER_SOURCE: &str = include_str!("../fixtures/counter_source.txt");

/// Write `content` to a file in a fresh temporary directory, returning the dir
/// handle and file path. The caller must hold onto `TempDir` to keep the
/// directory alive.
pub fn write_temp(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}
