// File-backed dataset source (JSON records, columnar JSON, or JSON lines)
use crate::application::dataset_source::DatasetSource;
use crate::domain::raw_table::RawTable;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported dataset layout in {path}: {reason}")]
    Shape { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct JsonDatasetSource {
    path: PathBuf,
}

impl JsonDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_json_lines(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("jsonl") | Some("ndjson")
        )
    }
}

#[async_trait]
impl DatasetSource for JsonDatasetSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load_raw(&self) -> anyhow::Result<RawTable> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| LoadError::Read {
                path: self.path.clone(),
                source,
            })?;

        let table = if self.is_json_lines() {
            parse_json_lines(&self.path, &bytes)?
        } else {
            parse_json(&self.path, &bytes)?
        };

        tracing::info!(
            "Loaded {} rows with columns {:?} from {}",
            table.len(),
            table.columns(),
            self.path.display()
        );
        Ok(table)
    }
}

/// Records (`[{..}, ..]`) or columnar (`{"col": [..], ..}`) JSON.
pub fn parse_json(path: &Path, bytes: &[u8]) -> Result<RawTable, LoadError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(items) => {
            let records = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(record) => Ok(record),
                    _ => Err(shape(path, format!("row {} is not an object", i))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RawTable::from_records(records))
        }
        Value::Object(columns) => columnar(path, columns),
        _ => Err(shape(path, "expected an array of records or an object of columns".to_string())),
    }
}

/// One record object per line; blank lines are skipped.
pub fn parse_json_lines(path: &Path, bytes: &[u8]) -> Result<RawTable, LoadError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| shape(path, format!("not valid UTF-8: {}", e)))?;

    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        match value {
            Value::Object(record) => records.push(record),
            _ => return Err(shape(path, format!("line {} is not an object", line_no + 1))),
        }
    }

    Ok(RawTable::from_records(records))
}

fn columnar(path: &Path, columns: Map<String, Value>) -> Result<RawTable, LoadError> {
    let mut names = Vec::with_capacity(columns.len());
    let mut values = Vec::with_capacity(columns.len());
    for (name, column) in columns {
        match column {
            Value::Array(cells) => {
                names.push(name);
                values.push(cells);
            }
            _ => return Err(shape(path, format!("column `{}` is not an array", name))),
        }
    }

    let len = values.first().map(Vec::len).unwrap_or(0);
    if let Some(pos) = values.iter().position(|v| v.len() != len) {
        return Err(shape(
            path,
            format!("column `{}` has {} values, expected {}", names[pos], values[pos].len(), len),
        ));
    }

    let mut rows = vec![Map::new(); len];
    for (name, cells) in names.iter().zip(values) {
        for (row, cell) in rows.iter_mut().zip(cells) {
            row.insert(name.clone(), cell);
        }
    }

    Ok(RawTable::new(names, rows))
}

fn shape(path: &Path, reason: String) -> LoadError {
    LoadError::Shape {
        path: path.to_path_buf(),
        reason,
    }
}
