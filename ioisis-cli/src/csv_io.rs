//! CSV input/output for the tabular record modes.

use std::io::{Read, Write};

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};

use ioisis_fields::Mode;

/// Columns whose CSV cells are decimal integers.
const NUMERIC_COLUMNS: &[&str] = &["mfn", "index", "sindex"];

/// Writes tabular record rows with the mode's header.
pub struct CsvRecordWriter<W: Write> {
    writer: csv::Writer<W>,
    columns: &'static [&'static str],
}

impl<W: Write> CsvRecordWriter<W> {
    pub fn new(inner: W, cmode: Mode) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(cmode.columns())?;
        Ok(Self {
            writer,
            columns: cmode.columns(),
        })
    }

    /// Write every row of one record.
    pub fn write_record_rows(&mut self, rows: &Value) -> Result<()> {
        let rows = rows
            .as_array()
            .ok_or_else(|| anyhow!("tabular record is not an array of rows"))?;
        for row in rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|column| match row.get(*column) {
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::String(s)) => s.clone(),
                    _ => String::new(),
                })
                .collect();
            self.writer.write_record(&cells)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }
}

/// Reads tabular rows back, grouping consecutive rows by `mfn`.
pub struct CsvRecordReader<R: Read> {
    rows: csv::StringRecordsIntoIter<R>,
    header: Vec<String>,
    pending_row: Option<Value>,
}

impl<R: Read> CsvRecordReader<R> {
    pub fn new(inner: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(inner);
        let header: Vec<String> = reader
            .headers()
            .context("CSV input has no header row")?
            .iter()
            .map(str::to_string)
            .collect();
        Ok(Self {
            rows: reader.into_records(),
            header,
            pending_row: None,
        })
    }

    fn row_to_value(&self, row: &csv::StringRecord) -> Result<Value> {
        let mut object = Map::new();
        for (name, cell) in self.header.iter().zip(row.iter()) {
            let value = if NUMERIC_COLUMNS.contains(&name.as_str()) {
                let number: u64 = cell
                    .trim()
                    .parse()
                    .with_context(|| format!("column {name} holds {cell:?}, not a number"))?;
                Value::from(number)
            } else {
                Value::String(cell.to_string())
            };
            object.insert(name.clone(), value);
        }
        Ok(Value::Object(object))
    }

    fn next_row(&mut self) -> Result<Option<Value>> {
        match self.rows.next() {
            None => Ok(None),
            Some(row) => Ok(Some(self.row_to_value(&row?)?)),
        }
    }

    /// The next record as an array of row objects.
    pub fn next_record(&mut self) -> Result<Option<Value>> {
        let first = match self.pending_row.take() {
            Some(row) => row,
            None => match self.next_row()? {
                Some(row) => row,
                None => return Ok(None),
            },
        };
        let mfn = first.get("mfn").cloned();
        let mut rows = vec![first];
        while let Some(row) = self.next_row()? {
            if row.get("mfn").cloned() == mfn {
                rows.push(row);
            } else {
                self.pending_row = Some(row);
                break;
            }
        }
        Ok(Some(Value::Array(rows)))
    }
}
