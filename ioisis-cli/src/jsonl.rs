//! JSON Lines input/output for record values.
//!
//! Record-object modes put one record per line; the tabular modes put
//! one row per line, and consecutive rows sharing an `mfn` form one
//! record.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use serde_json::Value;

use ioisis_fields::Mode;

use crate::io::{TextLineReader, TextLineWriter};

/// Reads one record value per call, grouping tabular rows by `mfn`.
pub struct JsonlReader<R> {
    lines: TextLineReader<R>,
    mode: Mode,
    pending_row: Option<Value>,
}

impl<R: Read> JsonlReader<R> {
    pub fn new(inner: R, encoding_label: &str, mode: Mode) -> Result<Self> {
        Ok(Self {
            lines: TextLineReader::new(inner, encoding_label)?,
            mode,
            pending_row: None,
        })
    }

    fn next_value(&mut self) -> Result<Option<Value>> {
        while let Some(line) = self.lines.next_line()? {
            if line.trim().is_empty() {
                continue;
            }
            let value = serde_json::from_str(&line)
                .with_context(|| format!("malformed JSON line {line:?}"))?;
            return Ok(Some(value));
        }
        Ok(None)
    }

    /// The next record: a JSON object, or an array of rows in the
    /// tabular modes.
    pub fn next_record(&mut self) -> Result<Option<Value>> {
        if !self.mode.is_tabular() {
            return self.next_value();
        }
        let first = match self.pending_row.take() {
            Some(row) => row,
            None => match self.next_value()? {
                Some(row) => row,
                None => return Ok(None),
            },
        };
        let mfn = first.get("mfn").cloned();
        let mut rows = vec![first];
        while let Some(row) = self.next_value()? {
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

/// Writes one record value per line, or one line per tabular row.
pub struct JsonlWriter<W> {
    lines: TextLineWriter<W>,
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(inner: W, encoding_label: &str) -> Result<Self> {
        Ok(Self {
            lines: TextLineWriter::new(inner, encoding_label)?,
        })
    }

    pub fn write_record(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Array(rows) => {
                for row in rows {
                    self.lines.write_line(&serde_json::to_string(row)?)?;
                }
                Ok(())
            }
            record => self.lines.write_line(&serde_json::to_string(record)?),
        }
    }
}
