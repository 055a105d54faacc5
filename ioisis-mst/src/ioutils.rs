//! Internal I/O helpers: endianness-dispatched integers and a small
//! probe reader for forward-only scanning with bounded lookahead.

use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Byte order of every multi-byte integer in an MST/XRF file pair.
///
/// Little endian is known as "swapped" in CISIS and Bruma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    pub fn read_u16(self, reader: &mut impl Read) -> std::io::Result<u16> {
        match self {
            Self::Little => reader.read_u16::<LittleEndian>(),
            Self::Big => reader.read_u16::<BigEndian>(),
        }
    }

    pub fn read_i16(self, reader: &mut impl Read) -> std::io::Result<i16> {
        match self {
            Self::Little => reader.read_i16::<LittleEndian>(),
            Self::Big => reader.read_i16::<BigEndian>(),
        }
    }

    pub fn read_u32(self, reader: &mut impl Read) -> std::io::Result<u32> {
        match self {
            Self::Little => reader.read_u32::<LittleEndian>(),
            Self::Big => reader.read_u32::<BigEndian>(),
        }
    }

    pub fn read_i32(self, reader: &mut impl Read) -> std::io::Result<i32> {
        match self {
            Self::Little => reader.read_i32::<LittleEndian>(),
            Self::Big => reader.read_i32::<BigEndian>(),
        }
    }

    pub fn write_u16(self, writer: &mut impl Write, value: u16) -> std::io::Result<()> {
        match self {
            Self::Little => writer.write_u16::<LittleEndian>(value),
            Self::Big => writer.write_u16::<BigEndian>(value),
        }
    }

    pub fn write_i16(self, writer: &mut impl Write, value: i16) -> std::io::Result<()> {
        match self {
            Self::Little => writer.write_i16::<LittleEndian>(value),
            Self::Big => writer.write_i16::<BigEndian>(value),
        }
    }

    pub fn write_u32(self, writer: &mut impl Write, value: u32) -> std::io::Result<()> {
        match self {
            Self::Little => writer.write_u32::<LittleEndian>(value),
            Self::Big => writer.write_u32::<BigEndian>(value),
        }
    }

    pub fn write_i32(self, writer: &mut impl Write, value: i32) -> std::io::Result<()> {
        match self {
            Self::Little => writer.write_i32::<LittleEndian>(value),
            Self::Big => writer.write_i32::<BigEndian>(value),
        }
    }
}

impl std::str::FromStr for Endianness {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "little" => Ok(Self::Little),
            "big" => Ok(Self::Big),
            other => Err(Error::config(format!("unknown endianness {other:?}"))),
        }
    }
}

/// Forward-only reader with a small lookahead buffer and an absolute
/// position counter.
///
/// The master-file scanner needs to peek a few leader bytes before
/// deciding whether a record, padding or the end of the file starts at
/// the cursor; this keeps the read bytes around until they are
/// consumed, so the source itself never has to be seekable.
#[derive(Debug)]
pub struct ProbeReader<R> {
    inner: R,
    pending: Vec<u8>,
    position: u64,
}

impl<R: Read> ProbeReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            position: 0,
        }
    }

    /// Absolute offset of the next unconsumed byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Make up to `count` bytes visible without consuming them; fewer
    /// are returned only at end of stream.
    pub fn peek(&mut self, count: usize) -> Result<&[u8]> {
        while self.pending.len() < count {
            let mut buf = [0u8; 512];
            let want = (count - self.pending.len()).min(buf.len());
            let got = self.inner.read(&mut buf[..want])?;
            if got == 0 {
                break;
            }
            self.pending.extend_from_slice(&buf[..got]);
        }
        Ok(&self.pending[..self.pending.len().min(count)])
    }

    /// Drop `count` already-peeked bytes.
    pub fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.pending.len());
        self.pending.drain(..count);
        self.position += count as u64;
    }

    /// Read exactly `buf.len()` bytes, draining the lookahead first.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let from_pending = self.pending.len().min(buf.len());
        buf[..from_pending].copy_from_slice(&self.pending[..from_pending]);
        self.pending.drain(..from_pending);
        let mut filled = from_pending;
        while filled < buf.len() {
            let got = self.inner.read(&mut buf[filled..])?;
            if got == 0 {
                self.position += filled as u64;
                return Err(Error::UnexpectedEof);
            }
            filled += got;
        }
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Read and return up to `count` bytes (fewer at end of stream).
    pub fn read_up_to(&mut self, count: usize) -> Result<Vec<u8>> {
        let available = self.peek(count)?.len();
        let mut out = vec![0u8; available];
        out.copy_from_slice(&self.pending[..available]);
        self.consume(available);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn peek_does_not_consume() {
        let mut probe = ProbeReader::new(&b"abcdef"[..]);
        assert_eq!(probe.peek(4).unwrap(), b"abcd");
        assert_eq!(probe.position(), 0);
        probe.consume(2);
        assert_eq!(probe.position(), 2);
        let mut rest = [0u8; 4];
        probe.read_exact(&mut rest).unwrap();
        assert_eq!(&rest, b"cdef");
        assert_eq!(probe.position(), 6);
    }

    #[test]
    fn peek_is_short_at_eof() {
        let mut probe = ProbeReader::new(&b"ab"[..]);
        assert_eq!(probe.peek(4).unwrap(), b"ab");
    }

    #[test]
    fn read_exact_past_eof_fails() {
        let mut probe = ProbeReader::new(&b"ab"[..]);
        let mut buf = [0u8; 3];
        assert!(matches!(
            probe.read_exact(&mut buf).unwrap_err(),
            Error::UnexpectedEof,
        ));
    }

    #[test]
    fn round_trip_integers_both_endians() {
        for endianness in [Endianness::Little, Endianness::Big] {
            let mut buf = Vec::new();
            endianness.write_i32(&mut buf, -7).unwrap();
            endianness.write_u16(&mut buf, 514).unwrap();
            let mut cursor = &buf[..];
            assert_eq!(endianness.read_i32(&mut cursor).unwrap(), -7);
            assert_eq!(endianness.read_u16(&mut cursor).unwrap(), 514);
        }
    }
}
