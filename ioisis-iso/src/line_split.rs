//! Fixed-width line splitting of a raw byte stream.
//!
//! ISO files are traditionally wrapped in fixed-width text lines: the
//! raw record bytes are cut every `line_len` bytes and a newline
//! sequence is inserted at each cut, with one more after the final
//! (possibly partial) line of each record. The adapters here present
//! the seamless logical stream on one side and the wrapped physical
//! stream on the other, tracking the logical (unsplit) offset.

use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Reads a line-split stream as its seamless logical bytes.
///
/// The line phase is per record: call [`LineSplitReader::finish_record`]
/// after each record to consume the record's final newline and reset
/// the phase.
#[derive(Debug)]
pub struct LineSplitReader<R> {
    inner: R,
    line_len: usize,
    newline: Vec<u8>,
    pos_in_line: usize,
    logical: u64,
}

impl<R: Read> LineSplitReader<R> {
    pub fn new(inner: R, line_len: usize, newline: Vec<u8>) -> Self {
        debug_assert!(line_len > 0 && !newline.is_empty());
        Self {
            inner,
            line_len,
            newline,
            pos_in_line: 0,
            logical: 0,
        }
    }

    /// Logical (unsplit) bytes delivered so far.
    pub fn logical_position(&self) -> u64 {
        self.logical
    }

    /// Read from the inner stream until `buf` is full or EOF.
    fn fill_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let count = self.inner.read(&mut buf[filled..])?;
            if count == 0 {
                break;
            }
            filled += count;
        }
        Ok(filled)
    }

    fn consume_newline(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.newline.len()];
        let got = self.fill_raw(&mut buf)?;
        if got < buf.len() {
            return Err(Error::UnexpectedEof);
        }
        if buf != self.newline {
            return Err(Error::LineSplit {
                offset: self.logical,
            });
        }
        Ok(())
    }

    /// Read exactly `buf.len()` logical bytes.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.pos_in_line == self.line_len {
                self.consume_newline()?;
                self.pos_in_line = 0;
            }
            let room = (self.line_len - self.pos_in_line).min(buf.len() - filled);
            let got = self.fill_raw(&mut buf[filled..filled + room])?;
            if got == 0 {
                return Err(Error::UnexpectedEof);
            }
            filled += got;
            self.pos_in_line += got;
            self.logical += got as u64;
        }
        Ok(())
    }

    /// Read exactly `buf.len()` logical bytes, or report a clean EOF
    /// (`false`) when the stream ends before the first byte.
    pub fn read_initial(&mut self, buf: &mut [u8]) -> Result<bool> {
        debug_assert_eq!(self.pos_in_line, 0);
        let got = self.fill_raw(&mut buf[..1])?;
        if got == 0 {
            return Ok(false);
        }
        self.pos_in_line += 1;
        self.logical += 1;
        self.read_exact(&mut buf[1..])?;
        Ok(true)
    }

    /// Consume the newline terminating the record's final line and
    /// reset the line phase. The newline is optional at EOF.
    pub fn finish_record(&mut self) -> Result<()> {
        if self.pos_in_line > 0 {
            let mut buf = vec![0u8; self.newline.len()];
            let got = self.fill_raw(&mut buf)?;
            if got != 0 && (got < buf.len() || buf != self.newline) {
                return Err(Error::LineSplit {
                    offset: self.logical,
                });
            }
        }
        self.pos_in_line = 0;
        Ok(())
    }
}

/// Writes a seamless logical byte stream in fixed-width lines.
#[derive(Debug)]
pub struct LineSplitWriter<W> {
    inner: W,
    line_len: usize,
    newline: Vec<u8>,
    pos_in_line: usize,
    logical: u64,
}

impl<W: Write> LineSplitWriter<W> {
    pub fn new(inner: W, line_len: usize, newline: Vec<u8>) -> Self {
        debug_assert!(line_len > 0 && !newline.is_empty());
        Self {
            inner,
            line_len,
            newline,
            pos_in_line: 0,
            logical: 0,
        }
    }

    /// Logical (unsplit) bytes accepted so far.
    pub fn logical_position(&self) -> u64 {
        self.logical
    }

    /// Write logical bytes, inserting a newline after every full line.
    pub fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let room = (self.line_len - self.pos_in_line).min(data.len());
            self.inner.write_all(&data[..room])?;
            self.pos_in_line += room;
            self.logical += room as u64;
            data = &data[room..];
            if self.pos_in_line == self.line_len {
                self.inner.write_all(&self.newline)?;
                self.pos_in_line = 0;
            }
        }
        Ok(())
    }

    /// Terminate the record: a non-empty final partial line gets its
    /// newline, and the line phase resets for the next record.
    pub fn finish_record(&mut self) -> Result<()> {
        if self.pos_in_line > 0 {
            self.inner.write_all(&self.newline)?;
            self.pos_in_line = 0;
        }
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split(data: &[u8], line_len: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = LineSplitWriter::new(&mut out, line_len, b"\n".to_vec());
        writer.write_all(data).unwrap();
        writer.finish_record().unwrap();
        out
    }

    #[test]
    fn partial_final_line_is_terminated() {
        assert_eq!(split(b"abcdefg", 3), b"abc\ndef\ng\n".to_vec());
    }

    #[test]
    fn exact_multiple_gets_a_single_trailing_newline() {
        assert_eq!(split(b"abcdef", 3), b"abc\ndef\n".to_vec());
    }

    #[test]
    fn reader_reverses_writer() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let wrapped = split(data, 8);
        let mut reader = LineSplitReader::new(&wrapped[..], 8, b"\n".to_vec());
        let mut back = vec![0u8; data.len()];
        assert!(reader.read_initial(&mut back).unwrap());
        reader.finish_record().unwrap();
        assert_eq!(back, data.to_vec());
        assert_eq!(reader.logical_position(), data.len() as u64);
    }

    #[test]
    fn wrong_newline_is_a_line_split_error() {
        let mut reader = LineSplitReader::new(&b"abcXdef\n"[..], 3, b"\n".to_vec());
        let mut buf = [0u8; 6];
        let err = reader.read_exact(&mut buf).unwrap_err();
        assert!(matches!(err, Error::LineSplit { offset: 3 }));
    }

    #[test]
    fn missing_tail_newline_at_eof_is_tolerated() {
        let mut reader = LineSplitReader::new(&b"abc\nde"[..], 3, b"\n".to_vec());
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        reader.finish_record().unwrap();
        assert_eq!(&buf, b"abcde");
    }

    #[test]
    fn truncated_stream_is_unexpected_eof() {
        let mut reader = LineSplitReader::new(&b"ab"[..], 3, b"\n".to_vec());
        let mut buf = [0u8; 5];
        assert!(matches!(
            reader.read_exact(&mut buf).unwrap_err(),
            Error::UnexpectedEof,
        ));
    }
}
