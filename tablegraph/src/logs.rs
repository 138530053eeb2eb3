// SPDX-License-Identifier: AGPL-3.0-or-later

//! Inspection of newline-delimited JSON log files.
//!
//! The node's structured log output lands as `*.logs` files of one JSON object per line. This
//! module reads them back for the `/logs` endpoint, ordered by their `ts` field.
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::db::query::Direction;

/// Number of log lines returned when no limit is requested.
const DEFAULT_LIMIT: usize = 10;

/// Upper bound on the number of log lines a single request can ask for.
const MAX_LIMIT: usize = 1000;

/// Extension of the log files inside the log directory.
const LOG_FILE_EXTENSION: &str = "logs";

/// Reads log lines from the given directory.
///
/// Unparseable lines and unreadable files are skipped. Lines are ordered by their `ts` field,
/// descending by default, then windowed by `offset` and `limit` (clamped to 1..=1000).
pub fn read_logs(
    dir: &Path,
    limit: Option<usize>,
    offset: usize,
    direction: Direction,
) -> Result<Vec<Value>> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let mut lines: Vec<Value> = Vec::new();

    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(LOG_FILE_EXTENSION) {
                continue;
            }

            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(_) => continue,
            };

            lines.extend(
                contents
                    .lines()
                    .filter_map(|line| serde_json::from_str::<Value>(line).ok()),
            );
        }
    }

    lines.sort_by(|left, right| {
        let ordering = timestamp(left)
            .partial_cmp(&timestamp(right))
            .unwrap_or(std::cmp::Ordering::Equal);
        match direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    });

    Ok(lines.into_iter().skip(offset).take(limit).collect())
}

fn timestamp(line: &Value) -> f64 {
    match line.get("ts") {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(value)) => value.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
