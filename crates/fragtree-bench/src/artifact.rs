//! JSONL artifacts: one serialized value per line.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

type BoxError = Box<dyn std::error::Error>;

pub(crate) fn write_jsonl<T: Serialize>(path: &Path, values: &[T]) -> Result<(), BoxError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for value in values {
        serde_json::to_writer(&mut writer, value)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Blank lines are skipped; a malformed line fails with its line number.
pub(crate) fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, BoxError> {
    let reader = BufReader::new(File::open(path)?);
    let mut values = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line)
            .map_err(|err| format!("{}:{}: {err}", path.display(), number + 1))?;
        values.push(value);
    }
    Ok(values)
}

/// `bench_<unix millis>`.
pub(crate) fn new_run_id() -> Result<String, BoxError> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| std::io::Error::other(err.to_string()))?
        .as_millis();
    Ok(format!("bench_{millis}"))
}
