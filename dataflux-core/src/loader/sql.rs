//! Relational source backed by SQLite.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;

use super::{DataSource, DataSourceInfo};
use crate::dataset::{Column, Dataset, Value};
use crate::error::LoadError;

/// SQLite database data source. Loads the result set of a SQL query.
#[derive(Debug, Clone)]
pub struct SqlSource {
    pub db_path: PathBuf,
    pub query: String,
}

impl SqlSource {
    pub fn new(db_path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            query: query.into(),
        }
    }
}

impl DataSource for SqlSource {
    fn load(&self, limit: Option<usize>) -> Result<Dataset, LoadError> {
        let location = self.db_path.display().to_string();

        // Read-only open fails for a missing file instead of creating one.
        let conn = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| LoadError::unavailable(&location, e))?;

        let mut stmt = conn
            .prepare(&self.query)
            .map_err(|e| LoadError::format(&location, e))?;
        let column_count = stmt.column_count();
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut cells: Vec<Vec<Value>> = vec![Vec::new(); column_count];
        let mut rows = stmt
            .query([])
            .map_err(|e| LoadError::format(&location, e))?;
        let max_rows = limit.unwrap_or(usize::MAX);
        let mut read = 0;

        while read < max_rows {
            let Some(row) = rows.next().map_err(|e| LoadError::format(&location, e))? else {
                break;
            };
            for (i, column) in cells.iter_mut().enumerate() {
                let value = match row.get_ref(i).map_err(|e| LoadError::format(&location, e))? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(n) => Value::Int(n),
                    ValueRef::Real(f) => Value::Float(f),
                    ValueRef::Text(t) => Value::Str(
                        std::str::from_utf8(t)
                            .map_err(|e| LoadError::format(&location, e))?
                            .to_string(),
                    ),
                    ValueRef::Blob(_) => {
                        return Err(LoadError::format(
                            &location,
                            format!("column '{}' holds binary data", names[i]),
                        ));
                    }
                };
                column.push(value);
            }
            read += 1;
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::new(name, values))
            .collect();
        let dataset = Dataset::new(columns).map_err(|e| LoadError::format(&location, e))?;
        tracing::debug!(
            db = %location,
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            "Loaded SQL result set"
        );
        Ok(dataset)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "sql".to_string(),
            location: self.db_path.display().to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}
