//! In-memory identification tables
//!
//! Cells are kept as the text they were read as, so writing a table back out
//! reproduces the original values and string-joins (ScanID) see exactly what
//! the search engine reported.

use std::collections::BTreeMap;

use crate::schema::require_columns;
use crate::Error;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table, rejecting any row whose width differs from the header
    pub fn from_rows<S: Into<String>>(
        headers: impl IntoIterator<Item = S>,
        rows: Vec<Vec<String>>,
    ) -> Result<Self, Error> {
        let mut table = Table::new(headers);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), Error> {
        if row.len() != self.headers.len() {
            return Err(Error::RaggedRow {
                row: self.rows.len(),
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Value of column `name` in row `row`
    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Iterate over every value of a column, in row order
    pub fn values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let col = self.column(name)?;
        Some(self.rows.iter().map(move |row| row[col].as_str()))
    }

    /// Append a new column computed from each row. The closure sees the row
    /// as it was before the column was added.
    pub fn push_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&[String]) -> String,
    {
        for row in self.rows.iter_mut() {
            let value = f(row);
            row.push(value);
        }
        self.headers.push(name.to_string());
    }

    /// Replace the values of column `name`, appending the column if absent.
    /// `values` must hold one value per row.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), Error> {
        if values.len() != self.rows.len() {
            return Err(Error::RaggedRow {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column(name) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
                self.headers.push(name.to_string());
            }
        }
        Ok(())
    }

    /// Split the table by the values of `name`. Keys come out sorted, rows
    /// keep their relative order inside each partition.
    pub fn partition_by(self, name: &str) -> Result<BTreeMap<String, Table>, Error> {
        require_columns(&self, &[name])?;
        let col = self.column(name).unwrap_or_default();

        let mut partitions: BTreeMap<String, Table> = BTreeMap::new();
        for row in self.rows {
            partitions
                .entry(row[col].clone())
                .or_insert_with(|| Table {
                    headers: self.headers.clone(),
                    rows: Vec::new(),
                })
                .rows
                .push(row);
        }
        Ok(partitions)
    }

    /// Stack tables vertically. Headers are the union of all input headers in
    /// first-seen order; cells for columns a table lacks are left empty.
    /// Repeated column names are matched occurrence by occurrence, so the
    /// second `protein` of one table lines up with the second of another.
    pub fn concat<I: IntoIterator<Item = Table>>(tables: I) -> Table {
        let tables = tables.into_iter().collect::<Vec<_>>();

        let mut headers: Vec<String> = Vec::new();
        for table in &tables {
            for (ix, header) in table.headers.iter().enumerate() {
                let nth = occurrence(&table.headers, ix);
                if nth_position(&headers, header, nth).is_none() {
                    headers.push(header.clone());
                }
            }
        }

        let total = tables.iter().map(Table::len).sum();
        let mut rows = Vec::with_capacity(total);
        for table in tables {
            let positions = (0..table.headers.len())
                .map(|ix| {
                    let nth = occurrence(&table.headers, ix);
                    nth_position(&headers, &table.headers[ix], nth).unwrap_or_default()
                })
                .collect::<Vec<_>>();
            for row in table.rows {
                let mut out = vec![String::new(); headers.len()];
                for (value, &pos) in row.into_iter().zip(&positions) {
                    out[pos] = value;
                }
                rows.push(out);
            }
        }

        Table { headers, rows }
    }
}

/// How many earlier headers share the name of `headers[ix]`
fn occurrence(headers: &[String], ix: usize) -> usize {
    headers[..ix].iter().filter(|h| **h == headers[ix]).count()
}

/// Position of the `nth` header called `name`
fn nth_position(headers: &[String], name: &str, nth: usize) -> Option<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| *h == name)
        .nth(nth)
        .map(|(ix, _)| ix)
}

#[cfg(test)]
mod test {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            headers.iter().copied(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = Table::from_rows(["a", "b"], vec![vec!["1".into()]]).unwrap_err();
        assert_eq!(
            err,
            Error::RaggedRow {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn partition_keeps_order() {
        let t = table(
            &["Spectrum_File", "scan"],
            &[&["b", "1"], &["a", "2"], &["b", "3"], &["a", "4"]],
        );
        let parts = t.partition_by("Spectrum_File").unwrap();
        assert_eq!(parts.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(parts["a"].values("scan").unwrap().collect::<Vec<_>>(), vec!["2", "4"]);
        assert_eq!(parts["b"].values("scan").unwrap().collect::<Vec<_>>(), vec!["1", "3"]);
        assert_eq!(parts["b"].headers(), &["Spectrum_File", "scan"]);
    }

    #[test]
    fn partition_requires_column() {
        let t = table(&["scan"], &[&["1"]]);
        assert_eq!(
            t.partition_by("Spectrum_File").unwrap_err(),
            Error::MissingColumns {
                columns: vec!["Spectrum_File".into()]
            }
        );
    }

    #[test]
    fn concat_unions_headers() {
        let a = table(&["x", "y"], &[&["1", "2"]]);
        let b = table(&["y", "z"], &[&["3", "4"]]);
        let c = Table::concat([a, b]);
        assert_eq!(c.headers(), &["x", "y", "z"]);
        assert_eq!(c.rows()[0], vec!["1", "2", ""]);
        assert_eq!(c.rows()[1], vec!["", "3", "4"]);
    }

    #[test]
    fn concat_keeps_repeated_columns() {
        let a = table(&["scannum", "protein", "protein"], &[&["1", "P1", "P2"]]);
        assert_eq!(Table::concat([a.clone()]), a);

        let b = table(&["protein", "scannum"], &[&["P3", "2"]]);
        let c = Table::concat([a, b]);
        assert_eq!(c.headers(), &["scannum", "protein", "protein"]);
        assert_eq!(c.rows()[0], vec!["1", "P1", "P2"]);
        assert_eq!(c.rows()[1], vec!["2", "P3", ""]);
    }

    #[test]
    fn set_and_push_columns() {
        let mut t = table(&["a"], &[&["1"], &["2"]]);
        t.push_column("b", |row| format!("{}0", row[0]));
        assert_eq!(t.values("b").unwrap().collect::<Vec<_>>(), vec!["10", "20"]);

        t.set_column("a", vec!["x".into(), "y".into()]).unwrap();
        t.set_column("c", vec!["p".into(), "q".into()]).unwrap();
        assert_eq!(t.headers(), &["a", "b", "c"]);
        assert_eq!(t.value(1, "a"), Some("y"));
        assert_eq!(t.value(1, "c"), Some("q"));
        assert!(t.set_column("c", vec![]).is_err());
    }
}
