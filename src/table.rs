//! Reading and writing delimited tables.
use crate::{util, DataError, Result};
use anyhow::Context;
use qu::ick_use::*;
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, io, ops::Deref, path::Path};

/// A required column and the header names accepted for it across table revisions.
pub(crate) struct Column {
    pub name: &'static str,
    pub accepted: &'static [&'static str],
}

/// Check the header before decoding anything, so a table with the wrong layout fails even when
/// it has no rows.
pub(crate) fn check_columns(headers: &csv::StringRecord, columns: &[Column]) -> Result<(), DataError> {
    for column in columns {
        if !column
            .accepted
            .iter()
            .any(|name| headers.iter().any(|h| h == *name))
        {
            return Err(DataError::MissingColumn {
                column: column.name,
                accepted: column.accepted,
            });
        }
    }
    Ok(())
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).trim(csv::Trim::All);
    builder
}

/// Decode every row of a table.
pub(crate) fn read_rows<T: DeserializeOwned>(
    reader: impl io::Read,
    columns: &[Column],
    path: Option<&Path>,
) -> Result<Vec<T>, DataError> {
    let mut rdr = reader_builder().from_reader(reader);
    let headers = rdr.headers().map_err(|e| DataError::from_csv(path, e))?;
    check_columns(headers, columns)?;
    rdr.into_deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| DataError::from_csv(path, e))
}

/// Load a table from disk.
pub(crate) fn load_rows<T: DeserializeOwned>(path: &Path, columns: &[Column]) -> Result<Vec<T>> {
    fn inner<T: DeserializeOwned>(path: &Path, columns: &[Column]) -> Result<Vec<T>, DataError> {
        let file = fs::File::open(path).map_err(|source| DataError::Io {
            path: path.into(),
            source,
        })?;
        read_rows(io::BufReader::new(file), columns, Some(path))
    }
    inner(path, columns).with_context(|| format!("while loading \"{}\"", path.display()))
}

/// Any delimited table, kept as strings.
///
/// This makes no assumptions about the columns, so it can read back anything written by
/// [`save_csv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<RawTable, DataError> {
            let file = fs::File::open(path).map_err(|source| DataError::Io {
                path: path.into(),
                source,
            })?;
            RawTable::read(io::BufReader::new(file), Some(path))
        }
        let path = path.as_ref();
        let table =
            inner(path).with_context(|| format!("while loading \"{}\"", path.display()))?;
        event!(
            Level::INFO,
            "loaded {} rows from \"{}\"",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader(reader: impl io::Read) -> Result<Self, DataError> {
        Self::read(reader, None)
    }

    fn read(reader: impl io::Read, path: Option<&Path>) -> Result<Self, DataError> {
        let mut rdr = reader_builder().from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| DataError::from_csv(path, e))?
            .iter()
            .map(String::from)
            .collect();
        let rows = rdr
            .into_records()
            .map(|row| row.map(|row| row.iter().map(String::from).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()
            .map_err(|e| DataError::from_csv(path, e))?;
        Ok(RawTable { headers, rows })
    }

    /// Column names, in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Look up a field by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

impl Deref for RawTable {
    type Target = [Vec<String>];
    fn deref(&self) -> &Self::Target {
        &*self.rows
    }
}

/// Save rows to a delimited file.
///
/// The header is taken from the keys of the first row. Missing parent directories are created.
pub fn save_csv<T: Serialize>(rows: &[T], path: impl AsRef<Path>) -> Result {
    fn inner<T: Serialize>(rows: &[T], path: &Path) -> Result<(), DataError> {
        if rows.is_empty() {
            return Err(DataError::NothingToSave);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| DataError::from_write(parent.into(), source))?;
        }
        if util::path_exists(path).unwrap_or(false) {
            event!(
                Level::WARN,
                "overwriting existing file at \"{}\"",
                path.display()
            );
        }
        let file =
            fs::File::create(path).map_err(|source| DataError::from_write(path.into(), source))?;
        let mut out = csv::Writer::from_writer(io::BufWriter::new(file));
        for row in rows {
            out.serialize(row)
                .map_err(|e| DataError::from_csv(Some(path), e))?;
        }
        out.flush()
            .map_err(|source| DataError::from_write(path.into(), source))?;
        Ok(())
    }
    let path = path.as_ref();
    inner(rows, path).with_context(|| format!("unable to save data to \"{}\"", path.display()))
}

#[cfg(test)]
mod test {
    use super::{check_columns, Column, RawTable};
    use crate::DataError;
    use std::io;

    const COLUMNS: &[Column] = &[
        Column {
            name: "name",
            accepted: &["Name"],
        },
        Column {
            name: "province",
            accepted: &["ProvRes", "Province"],
        },
    ];

    #[test]
    fn accepts_any_alias() {
        let headers = csv::StringRecord::from(vec!["Name", "Province"]);
        assert!(check_columns(&headers, COLUMNS).is_ok());
    }

    #[test]
    fn reports_first_missing_column() {
        let headers = csv::StringRecord::from(vec!["Name", "Region"]);
        let err = check_columns(&headers, COLUMNS).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn {
                column: "province",
                ..
            }
        ));
    }

    #[test]
    fn raw_table_keeps_order() {
        let input = "Date,Region,Count\n2020-04-02, A ,2\n2020-04-01,A,1\n";
        let table = RawTable::from_reader(io::Cursor::new(input)).unwrap();
        assert_eq!(table.headers(), ["Date", "Region", "Count"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Region"), Some("A"));
        assert_eq!(table.get(1, "Date"), Some("2020-04-01"));
        assert_eq!(table.get(1, "Missing"), None);
    }

    #[test]
    fn raw_table_rejects_ragged_rows() {
        let input = "a,b\n1,2\n3\n";
        let err = RawTable::from_reader(io::Cursor::new(input)).unwrap_err();
        assert!(matches!(err, DataError::Format { row: 2, .. }));
    }
}
