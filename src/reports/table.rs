use std::fmt;

use serde::{Serialize, Serializer};

use crate::errors::BackendError;

/// A single value in a report.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Count(i64),

    /// Rendered with two decimal places.
    Average(f64),

    /// Rendered as `None`, e.g. for a member who never attended.
    Missing,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Count(n) => write!(f, "{}", n),
            Cell::Average(x) => write!(f, "{:.2}", x),
            Cell::Missing => f.write_str("None"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Count(n) => serializer.serialize_i64(*n),
            Cell::Average(x) => serializer.serialize_f64(*x),
            Cell::Missing => serializer.serialize_none(),
        }
    }
}

/// Named columns and rows of cells. Every row has one cell per column.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: vec![],
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the header and every row as CSV.
    pub fn to_csv(&self) -> Result<Vec<u8>, BackendError> {
        let mut writer = csv::Writer::from_writer(vec![]);

        writer
            .write_record(&self.columns)
            .map_err(|source| BackendError::Csv { source })?;

        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.to_string()))
                .map_err(|source| BackendError::Csv { source })?;
        }

        writer.into_inner().map_err(|e| BackendError::Csv {
            source: e.into_error().into(),
        })
    }
}

/// Rounds to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_a_header_and_one_line_per_row() {
        let mut table = Table::new(vec!["Name", "Weekly Average", "Last Attended"]);
        table.push(vec![
            Cell::text("Helio, Gracie"),
            Cell::Average(2.5),
            Cell::Missing,
        ]);
        table.push(vec![Cell::text("Carlos"), Cell::Count(3), Cell::text("2024-01-01")]);

        let csv = String::from_utf8(table.to_csv().unwrap()).unwrap();

        assert_eq!(
            csv,
            "Name,Weekly Average,Last Attended\n\"Helio, Gracie\",2.50,None\nCarlos,3,2024-01-01\n"
        );
    }

    #[test]
    fn cells_serialize_as_plain_values() {
        let row = vec![Cell::text("A"), Cell::Count(1), Cell::Average(1.25), Cell::Missing];

        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            serde_json::json!(["A", 1, 1.25, null])
        );
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(2.0 / 3.0), 0.67);
    }
}
