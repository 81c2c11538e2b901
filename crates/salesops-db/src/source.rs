use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use salesops_common::{Error, Result};
use serde::Serialize;
use tracing::info;

use crate::splitter::split_statements;

pub const FORWARD_SUFFIX: &str = ".sql";
pub const ROLLBACK_SUFFIX: &str = ".rollback.sql";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationKind {
    Forward,
    Rollback,
}

/// One versioned SQL file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationFile {
    pub version: i64,
    pub kind: MigrationKind,
    pub path: PathBuf,
}

impl MigrationFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn read_sql(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read {}: {e}", self.path.display()),
            ))
        })
    }

    /// Statements of this file, comments removed, in file order.
    pub fn statements(&self) -> Result<Vec<String>> {
        Ok(split_statements(&self.read_sql()?))
    }
}

/// Classify a directory entry by name.
///
/// Returns `None` for names that are not migration files at all, and a
/// `Config` error for `.sql` names whose stem is not a plain decimal number.
pub fn classify(file_name: &str) -> Option<Result<(MigrationKind, i64)>> {
    let (kind, stem) = if let Some(stem) = file_name.strip_suffix(ROLLBACK_SUFFIX) {
        (MigrationKind::Rollback, stem)
    } else if let Some(stem) = file_name.strip_suffix(FORWARD_SUFFIX) {
        (MigrationKind::Forward, stem)
    } else {
        return None;
    };

    Some(parse_version(stem).map(|version| (kind, version)).ok_or_else(|| {
        Error::Config(format!(
            "migration file {file_name} must be named <integer>{FORWARD_SUFFIX} or <integer>{ROLLBACK_SUFFIX}"
        ))
    }))
}

fn parse_version(stem: &str) -> Option<i64> {
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// The directory migration files are discovered in.
#[derive(Debug, Clone)]
pub struct MigrationSource {
    dir: PathBuf,
}

impl MigrationSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Forward files, ascending by version.
    pub fn forward_files(&self) -> Result<Vec<MigrationFile>> {
        let mut files = self.scan(MigrationKind::Forward)?;
        files.sort_by_key(|f| f.version);
        Ok(files)
    }

    /// Rollback files, descending by version.
    pub fn rollback_files(&self) -> Result<Vec<MigrationFile>> {
        let mut files = self.scan(MigrationKind::Rollback)?;
        files.sort_by_key(|f| std::cmp::Reverse(f.version));
        Ok(files)
    }

    /// Every migration file of either kind, validated as a whole.
    fn scan_all(&self) -> Result<Vec<MigrationFile>> {
        if !self.dir.is_dir() {
            return Err(Error::Config(format!(
                "schema directory {} does not exist",
                self.dir.display()
            )));
        }

        let mut files = Vec::new();
        let mut seen: HashMap<(MigrationKind, i64), String> = HashMap::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(classified) = classify(&name) else {
                continue;
            };
            let (kind, version) = classified?;

            if let Some(previous) = seen.insert((kind, version), name.clone()) {
                return Err(Error::Config(format!(
                    "{previous} and {name} both declare version {version}"
                )));
            }
            files.push(MigrationFile {
                version,
                kind,
                path,
            });
        }

        Ok(files)
    }

    fn scan(&self, kind: MigrationKind) -> Result<Vec<MigrationFile>> {
        Ok(self
            .scan_all()?
            .into_iter()
            .filter(|f| f.kind == kind)
            .collect())
    }

    /// Write an empty `<n>.sql` / `<n>.rollback.sql` pair for the next
    /// version, creating the directory if needed. Never overwrites.
    pub fn create_pair(&self, name: &str) -> Result<(MigrationFile, MigrationFile)> {
        fs::create_dir_all(&self.dir)?;

        let highest = self
            .scan_all()?
            .iter()
            .map(|f| f.version)
            .max()
            .unwrap_or(0);
        let version = highest.checked_add(1).ok_or_else(|| {
            Error::Config(format!(
                "no version left after {highest} in {}",
                self.dir.display()
            ))
        })?;
        let created = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        let forward = MigrationFile {
            version,
            kind: MigrationKind::Forward,
            path: self.dir.join(format!("{version}{FORWARD_SUFFIX}")),
        };
        let rollback = MigrationFile {
            version,
            kind: MigrationKind::Rollback,
            path: self.dir.join(format!("{version}{ROLLBACK_SUFFIX}")),
        };

        write_new(
            &forward.path,
            &format!(
                "-- Migration {version}: {name}\n-- Created: {created}\n\n-- Schema changes for version {version} go here.\n"
            ),
        )?;
        write_new(
            &rollback.path,
            &format!(
                "-- Rollback {version}: {name}\n-- Created: {created}\n\n-- Undo exactly what {version}{FORWARD_SUFFIX} does.\n"
            ),
        )?;

        info!(
            "created migration pair {} and {}",
            forward.file_name(),
            rollback.file_name()
        );
        Ok((forward, rollback))
    }
}

fn write_new(path: &Path, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create {}: {e}", path.display()),
            ))
        })?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}
