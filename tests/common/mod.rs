#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use csv2db::{database::Database, failure::DbError};
use regex::Regex;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }
}

/// In-memory stand-in for MySQL.
///
/// Records every statement, answers `LOAD DATA` from a script of results and
/// tracks declared VARCHAR/TEXT lengths from the DDL it sees, so length
/// lookups reflect earlier repairs.
pub struct FakeDatabase {
    pub statements: Vec<String>,
    pub commits: usize,
    pub rows_per_load: u64,
    load_script: VecDeque<Result<(), DbError>>,
    lengths: HashMap<String, u64>,
    rows: u64,
    text_column: Regex,
    alter: Regex,
}

impl FakeDatabase {
    pub fn new(rows_per_load: u64) -> Self {
        Self {
            statements: Vec::new(),
            commits: 0,
            rows_per_load,
            load_script: VecDeque::new(),
            lengths: HashMap::new(),
            rows: 0,
            text_column: Regex::new(r"`([^`]+)` (TEXT|VARCHAR\((\d+)\))").unwrap(),
            alter: Regex::new(r"^ALTER TABLE `[^`]+` MODIFY `([^`]+)` ").unwrap(),
        }
    }

    /// Queues the outcome of the next `LOAD DATA`; unscripted loads succeed.
    pub fn then_load(mut self, result: Result<(), DbError>) -> Self {
        self.load_script.push_back(result);
        self
    }

    pub fn reject(self, code: u16, message: &str) -> Self {
        self.then_load(Err(DbError::new(code, message)))
    }

    pub fn statements_starting_with(&self, prefix: &str) -> Vec<&str> {
        self.statements
            .iter()
            .filter(|s| s.starts_with(prefix))
            .map(|s| s.as_str())
            .collect()
    }

    fn record_lengths(&mut self, sql: &str) {
        for caps in self.text_column.captures_iter(sql) {
            let length = match caps.get(3) {
                Some(len) => len.as_str().parse().unwrap(),
                None => 65_535,
            };
            self.lengths.insert(caps[1].to_string(), length);
        }
    }
}

impl Database for FakeDatabase {
    fn execute(&mut self, sql: &str) -> Result<(), DbError> {
        self.statements.push(sql.to_string());
        if sql.starts_with("LOAD DATA") {
            let result = self.load_script.pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                self.rows += self.rows_per_load;
            }
            return result;
        }
        if sql.starts_with("CREATE TABLE") {
            self.lengths.clear();
            self.rows = 0;
            self.record_lengths(sql);
        } else if let Some(caps) = self.alter.captures(sql) {
            let column = caps[1].to_string();
            self.lengths.remove(&column);
            self.record_lengths(sql);
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.commits += 1;
        Ok(())
    }

    fn column_max_length(&mut self, _table: &str, column: &str) -> Result<Option<u64>, DbError> {
        Ok(self.lengths.get(column).copied())
    }

    fn row_count(&mut self, _table: &str) -> Result<u64, DbError> {
        Ok(self.rows)
    }
}

pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
