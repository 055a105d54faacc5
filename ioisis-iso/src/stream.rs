//! Streaming readers and writers over whole ISO files.

use std::io::{Read, Write};

use crate::codec::{build_record, parse_record};
use crate::error::{Error, Result};
use crate::line_split::{LineSplitReader, LineSplitWriter};
use crate::record::{IsoConfig, IsoRecord, TOTAL_LEN_LEN};

enum Source<R> {
    Plain(R),
    Split(LineSplitReader<R>),
}

fn fill_plain(inner: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let count = inner.read(&mut buf[filled..])?;
        if count == 0 {
            return Err(Error::UnexpectedEof);
        }
        filled += count;
    }
    Ok(())
}

impl<R: Read> Source<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self {
            Self::Plain(inner) => fill_plain(inner, buf),
            Self::Split(reader) => reader.read_exact(buf),
        }
    }

    fn read_initial(&mut self, buf: &mut [u8]) -> Result<bool> {
        match self {
            Self::Plain(inner) => {
                let count = inner.read(&mut buf[..1])?;
                if count == 0 {
                    return Ok(false);
                }
                fill_plain(inner, &mut buf[1..])?;
                Ok(true)
            }
            Self::Split(reader) => reader.read_initial(buf),
        }
    }

    fn finish_record(&mut self) -> Result<()> {
        match self {
            Self::Plain(_) => Ok(()),
            Self::Split(reader) => reader.finish_record(),
        }
    }
}

/// Pull-based reader over a (not necessarily seekable) ISO byte
/// source. EOF at a record boundary ends iteration cleanly; EOF inside
/// a record is [`Error::UnexpectedEof`].
pub struct IsoReader<R: Read> {
    source: Source<R>,
    config: IsoConfig,
    records_read: u64,
    done: bool,
}

impl<R: Read> IsoReader<R> {
    pub fn new(inner: R, config: IsoConfig) -> Self {
        let source = if config.line_len == 0 {
            Source::Plain(inner)
        } else {
            Source::Split(LineSplitReader::new(
                inner,
                config.line_len,
                config.newline.clone(),
            ))
        };
        Self {
            source,
            config,
            records_read: 0,
            done: false,
        }
    }

    /// Records delivered so far; after a successful read this is the
    /// 1-based ordinal of that record.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read the next record, or `None` at a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<IsoRecord>> {
        if self.done {
            return Ok(None);
        }
        let mut prefix = [0u8; TOTAL_LEN_LEN];
        if !self.source.read_initial(&mut prefix)? {
            self.done = true;
            return Ok(None);
        }
        let total_len = crate::codec::ascii_num(&prefix)?;
        if total_len <= TOTAL_LEN_LEN {
            return Err(Error::format(format!("impossible total length {total_len}")));
        }
        let mut bytes = vec![0u8; total_len];
        bytes[..TOTAL_LEN_LEN].copy_from_slice(&prefix);
        self.source.read_exact(&mut bytes[TOTAL_LEN_LEN..])?;
        let record = parse_record(&bytes, &self.config)?;
        self.source.finish_record()?;
        self.records_read += 1;
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for IsoReader<R> {
    type Item = Result<IsoRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Writer emitting records one at a time, line-splitting each when the
/// configuration asks for it.
pub struct IsoWriter<W: Write> {
    inner: W,
    config: IsoConfig,
}

impl<W: Write> IsoWriter<W> {
    pub fn new(inner: W, config: IsoConfig) -> Self {
        Self { inner, config }
    }

    /// Build and write one record.
    pub fn write_record(&mut self, record: &IsoRecord) -> Result<()> {
        let bytes = build_record(record, &self.config)?;
        if self.config.line_len == 0 {
            self.inner.write_all(&bytes)?;
        } else {
            let mut splitter = LineSplitWriter::new(
                &mut self.inner,
                self.config.line_len,
                self.config.newline.clone(),
            );
            splitter.write_all(&bytes)?;
            splitter.finish_record()?;
        }
        Ok(())
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    /// Consume the writer, returning the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
