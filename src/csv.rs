use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::{Operation, Payer, Points};

/// Errors that can occur when reading operations or writing balances
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation '{op}'")]
    UnrecognizedOp { line: usize, op: String },

    #[error("line {line}: {op} missing {field}")]
    MissingField {
        line: usize,
        op: &'static str,
        field: &'static str,
    },

    #[error("line {line}: spend points must be positive, got {points}")]
    NonPositiveSpend { line: usize, points: Points },

    #[error("failed to write balances: {0}")]
    Write(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    op: String,
    payer: Option<String>,
    points: Option<Points>,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    payer: &'a str,
    points: Points,
}

/// Read operations from a csv file
pub fn read_operations(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Operation, CsvError>>, CsvError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| CsvError::Open {
        path: path.to_owned(),
        source,
    })?;
    Ok(parse_operations(file))
}

/// Parse operations from any csv source, one result per row
pub fn parse_operations<R: io::Read>(
    reader: R,
) -> impl Iterator<Item = Result<Operation, CsvError>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            to_operation(line, row)
        })
}

fn to_operation(line: usize, row: InputRow) -> Result<Operation, CsvError> {
    let missing = |op, field| CsvError::MissingField { line, op, field };

    match row.op.as_str() {
        "add" => {
            let payer = row
                .payer
                .filter(|payer| !payer.is_empty())
                .ok_or_else(|| missing("add", "payer"))?;
            let points = row.points.ok_or_else(|| missing("add", "points"))?;
            let timestamp = row.timestamp.ok_or_else(|| missing("add", "timestamp"))?;
            Ok(Operation::Add {
                payer,
                points,
                timestamp,
            })
        }
        "spend" => {
            let points = row.points.ok_or_else(|| missing("spend", "points"))?;
            if !points.is_positive() {
                return Err(CsvError::NonPositiveSpend { line, points });
            }
            Ok(Operation::Spend { points })
        }
        "balance" => Ok(Operation::Balance),
        other => Err(CsvError::UnrecognizedOp {
            line,
            op: other.to_string(),
        }),
    }
}

/// Write payer balances in csv format
pub fn write_balances<W: io::Write>(
    writer: W,
    balances: impl IntoIterator<Item = (Payer, Points)>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for (payer, points) in balances {
        writer.serialize(OutputRow {
            payer: &payer,
            points,
        })?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
