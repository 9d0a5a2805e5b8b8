// JSONL export/import of tasks

use crate::models::Task;
use eyre::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Write tasks to `path`, one JSON object per line, replacing the file
pub fn write_jsonl(path: &Path, tasks: &[Task]) -> Result<()> {
    let file = File::create(path).context("Failed to create JSONL file")?;
    let mut writer = BufWriter::new(file);
    write_jsonl_to(&mut writer, tasks)?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?; // Ensure data is flushed to disk

    info!(file = ?path, count = tasks.len(), "Wrote tasks to JSONL");
    Ok(())
}

/// Write tasks as JSONL to any writer
pub fn write_jsonl_to<W: Write>(writer: &mut W, tasks: &[Task]) -> Result<()> {
    for task in tasks {
        let json = serde_json::to_string(task)?;
        writeln!(writer, "{}", json)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read tasks from a JSONL file in file order
///
/// A missing file reads as empty. Blank and malformed lines are skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<Task>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path).context("Failed to open JSONL file")?;
    let reader = BufReader::new(file);
    let mut tasks = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Task>(&line) {
            Ok(task) => tasks.push(task),
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to parse JSON, skipping"
                );
            }
        }
    }

    info!(file = ?path, count = tasks.len(), "Loaded tasks from JSONL");
    Ok(tasks)
}
