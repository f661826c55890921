// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Raw record source.
//!
//! Reads the roster spreadsheet export as plain rows of strings. No header
//! line is expected, and rows may have any number of fields. Making sense of
//! the rows is left to [`Roster::from_rows`](crate::roster::Roster::from_rows).

use csv::ReaderBuilder;
use std::{
    io::Read,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Read raw rows from CSV file at target path.
///
/// # Errors
///
/// - Return [`RecordsError::Open`] if file cannot be opened.
/// - Return [`RecordsError::ParseFile`] if file is not valid CSV.
#[instrument(skip(path), level = "debug")]
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    debug!("read records from {:?}", path.display());
    let file = std::fs::File::open(path).map_err(|err| RecordsError::Open {
        source: err,
        path: path.to_path_buf(),
    })?;

    parse_records(file).map_err(|err| match err {
        RecordsError::Parse(source) => RecordsError::ParseFile {
            source,
            path: path.to_path_buf(),
        },
        other => other,
    })
}

/// Parse raw rows from any CSV reader.
///
/// # Errors
///
/// - Return [`RecordsError::Parse`] if data is not valid CSV.
pub fn parse_records(reader: impl Read) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(rows)
}

/// Record source error types.
#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    /// Record file cannot be opened.
    #[error("failed to open record file at {:?}", path.display())]
    Open {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Record data is not valid CSV.
    #[error("failed to parse records")]
    Parse(#[from] csv::Error),

    /// Record file is not valid CSV.
    #[error("failed to parse record file at {:?}", path.display())]
    ParseFile {
        #[source]
        source: csv::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = RecordsError> = std::result::Result<T, E>;
