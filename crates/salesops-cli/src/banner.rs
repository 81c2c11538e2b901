use std::path::Path;

use salesops_db::{MigrationReport, MigrationState, RollbackReport, StatusReport};

const WIDTH: usize = 64;
const LABEL_W: usize = 14;

/// Paths shown in a summary box, with `$HOME` abbreviated.
pub struct Target<'a> {
    pub database: &'a Path,
    pub schema_dir: &'a Path,
}

fn display_path(path: &Path) -> String {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => path.to_string_lossy().replace(&home, "~"),
        _ => path.to_string_lossy().to_string(),
    }
}

fn versions(list: &[i64]) -> String {
    if list.is_empty() {
        "none".to_string()
    } else {
        list.iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn boxed(title: &str, rows: &[(&str, String)]) -> String {
    let inner = WIDTH - 4; // "│ " + " │"
    let title = format!("SalesOps v{} · {title}", env!("CARGO_PKG_VERSION"));
    let title_dashes = (WIDTH - 2).saturating_sub(title.chars().count() + 5);

    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(format!("╭─── {title} {}╮", "─".repeat(title_dashes)));
    out.push(format!("│ {:<inner$} │", ""));
    for (label, value) in rows {
        let line = format!("{label:<LABEL_W$}{value}");
        let line: String = line.chars().take(inner).collect();
        out.push(format!("│ {line:<inner$} │"));
    }
    out.push(format!("│ {:<inner$} │", ""));
    out.push(format!("╰{}╯", "─".repeat(WIDTH - 2)));
    out.join("\n")
}

pub fn migration_summary(report: &MigrationReport, target: &Target<'_>) -> String {
    let mut rows = vec![
        ("Database", display_path(target.database)),
        ("Schema dir", display_path(target.schema_dir)),
        (
            "Version",
            format!("{} -> {}", report.from_version, report.to_version),
        ),
        ("Applied", versions(&report.applied)),
        ("Skipped", versions(&report.skipped)),
        ("Statements", report.statements_executed.to_string()),
        ("Elapsed", format!("{} ms", report.elapsed_ms)),
    ];
    if report.created_version_table {
        rows.push(("", "version table created".to_string()));
    }
    boxed("migrate", &rows)
}

pub fn rollback_summary(report: &RollbackReport, target: &Target<'_>) -> String {
    let mut rows = vec![
        ("Database", display_path(target.database)),
        ("Schema dir", display_path(target.schema_dir)),
        (
            "Version",
            format!(
                "{} -> {} (target {})",
                report.from_version, report.to_version, report.target_version
            ),
        ),
        ("Rolled back", versions(&report.rolled_back)),
        ("Statements", report.statements_executed.to_string()),
        ("Elapsed", format!("{} ms", report.elapsed_ms)),
    ];
    if !report.missing.is_empty() {
        rows.push(("No rollback", versions(&report.missing)));
    }
    boxed("rollback", &rows)
}

/// Plain table for `salesops status`, one line per forward file.
pub fn status_table(report: &StatusReport) -> String {
    let mut out = Vec::new();
    if report.version_table_exists {
        out.push(format!("current version: {}", report.current_version));
    } else {
        out.push("current version: 0 (version table not created yet)".to_string());
    }
    out.push(String::new());
    out.push(format!("{:<8}  {:<10}  {:<8}  FILE", "VERSION", "STATE", "ROLLBACK"));
    for entry in &report.entries {
        let state = match entry.state {
            MigrationState::Applied => "applied",
            MigrationState::Pending => "pending",
        };
        let rollback = if entry.has_rollback { "yes" } else { "missing" };
        out.push(format!(
            "{:<8}  {:<10}  {:<8}  {}",
            entry.version, state, rollback, entry.file
        ));
    }
    if !report.orphan_rollbacks.is_empty() {
        out.push(String::new());
        out.push(format!(
            "rollback files without a migration: {}",
            versions(&report.orphan_rollbacks)
        ));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use salesops_db::StatusEntry;

    use super::*;

    fn target() -> (PathBuf, PathBuf) {
        (PathBuf::from("/srv/ops.db"), PathBuf::from("/srv/schema"))
    }

    #[test]
    fn summary_box_lines_share_width() {
        let (db, dir) = target();
        let report = MigrationReport {
            from_version: 0,
            to_version: 4,
            applied: vec![1, 2, 3, 4],
            skipped: vec![],
            statements_executed: 9,
            created_version_table: true,
            elapsed_ms: 12,
        };

        let out = migration_summary(
            &report,
            &Target {
                database: &db,
                schema_dir: &dir,
            },
        );

        assert!(out.contains("1, 2, 3, 4"));
        assert!(out.contains("0 -> 4"));
        assert!(out.contains("version table created"));
        for line in out.lines() {
            assert_eq!(line.chars().count(), WIDTH, "line {line:?}");
        }
    }

    #[test]
    fn rollback_summary_lists_missing_files() {
        let (db, dir) = target();
        let report = RollbackReport {
            target_version: 3,
            from_version: 5,
            to_version: 3,
            rolled_back: vec![4],
            missing: vec![5],
            statements_executed: 1,
            elapsed_ms: 3,
        };

        let out = rollback_summary(
            &report,
            &Target {
                database: &db,
                schema_dir: &dir,
            },
        );

        assert!(out.contains("5 -> 3 (target 3)"));
        assert!(out.contains("No rollback"));
        for line in out.lines() {
            assert_eq!(line.chars().count(), WIDTH, "line {line:?}");
        }
    }

    #[test]
    fn status_table_marks_pending_and_unpaired() {
        let report = StatusReport {
            version_table_exists: true,
            current_version: 1,
            entries: vec![
                StatusEntry {
                    version: 1,
                    file: "1.sql".into(),
                    state: MigrationState::Applied,
                    has_rollback: true,
                },
                StatusEntry {
                    version: 2,
                    file: "2.sql".into(),
                    state: MigrationState::Pending,
                    has_rollback: false,
                },
            ],
            orphan_rollbacks: vec![9],
        };

        let out = status_table(&report);

        assert!(out.starts_with("current version: 1"));
        assert!(out.contains("applied"));
        assert!(out.lines().any(|l| l.contains("pending") && l.contains("missing")));
        assert!(out.ends_with("rollback files without a migration: 9"));
    }
}
