//! Stream plumbing: stdin/stdout handling and line-based transcoding
//! between UTF-8 and the user-selected text-file encodings.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use anyhow::{bail, Context, Result};
use encoding_rs::Encoding;
use ioisis_fields::encoding::{decode_strict, encode_strict, encoding_for_label};

/// Open an input stream; `-` is standard input.
pub fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == "-" {
        Ok(Box::new(io::stdin().lock()))
    } else {
        let file =
            File::open(path).with_context(|| format!("cannot open input file {path}"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Open an output stream; `-` is standard output.
pub fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        Ok(Box::new(BufWriter::new(io::stdout().lock())))
    } else {
        let file =
            File::create(path).with_context(|| format!("cannot create output file {path}"))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Open a seekable output file; the master-file builder rewrites its
/// control record in place, so a pipe will not do.
pub fn open_seekable_output(path: &str) -> Result<File> {
    if path == "-" {
        bail!("master file output needs a real (seekable) file path, not -");
    }
    File::create(path).with_context(|| format!("cannot create output file {path}"))
}

/// Line-oriented text reader decoding the configured encoding into
/// UTF-8 strings.
pub struct TextLineReader<R> {
    inner: BufReader<R>,
    encoding: &'static Encoding,
}

impl<R: Read> TextLineReader<R> {
    pub fn new(inner: R, label: &str) -> Result<Self> {
        Ok(Self {
            inner: BufReader::new(inner),
            encoding: encoding_for_label(label)?,
        })
    }

    /// The next line, without its terminator; `None` at end of input.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let mut raw = Vec::new();
        if self.inner.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        }
        Ok(Some(decode_strict(&raw, self.encoding)?))
    }
}

/// Line-oriented text writer encoding UTF-8 strings into the
/// configured encoding.
pub struct TextLineWriter<W> {
    inner: W,
    encoding: &'static Encoding,
}

impl<W: Write> TextLineWriter<W> {
    pub fn new(inner: W, label: &str) -> Result<Self> {
        Ok(Self {
            inner,
            encoding: encoding_for_label(label)?,
        })
    }

    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.inner.write_all(&encode_strict(line, self.encoding)?)?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        Ok(())
    }
}

/// `io::Read` adapter turning a text stream in the configured
/// encoding into UTF-8 bytes, one line at a time. A newline byte
/// never occurs inside a multi-byte unit of the supported encodings,
/// so line-based transcoding is loss-free.
pub struct TranscodingReader<R> {
    inner: BufReader<R>,
    encoding: &'static Encoding,
    passthrough: bool,
    buffer: Vec<u8>,
    cursor: usize,
}

impl<R: Read> TranscodingReader<R> {
    pub fn new(inner: R, label: &str) -> Result<Self> {
        let encoding = encoding_for_label(label)?;
        Ok(Self {
            inner: BufReader::new(inner),
            passthrough: encoding == encoding_rs::UTF_8,
            encoding,
            buffer: Vec::new(),
            cursor: 0,
        })
    }
}

impl<R: Read> Read for TranscodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.passthrough {
            return self.inner.read(buf);
        }
        if self.cursor == self.buffer.len() {
            let mut raw = Vec::new();
            if self.inner.read_until(b'\n', &mut raw)? == 0 {
                return Ok(0);
            }
            let terminated = raw.last() == Some(&b'\n');
            if terminated {
                raw.pop();
            }
            let decoded = decode_strict(&raw, self.encoding)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            self.buffer = decoded.into_bytes();
            if terminated {
                self.buffer.push(b'\n');
            }
            self.cursor = 0;
        }
        let available = &self.buffer[self.cursor..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.cursor += count;
        Ok(count)
    }
}

/// `io::Write` adapter turning UTF-8 bytes into the configured
/// encoding, one line at a time.
pub struct TranscodingWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    passthrough: bool,
    buffer: Vec<u8>,
}

impl<W: Write> TranscodingWriter<W> {
    pub fn new(inner: W, label: &str) -> Result<Self> {
        let encoding = encoding_for_label(label)?;
        Ok(Self {
            inner,
            passthrough: encoding == encoding_rs::UTF_8,
            encoding,
            buffer: Vec::new(),
        })
    }

    fn transcode_out(&mut self, line: &[u8], terminated: bool) -> io::Result<()> {
        let text = std::str::from_utf8(line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        let encoded = encode_strict(text, self.encoding)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        self.inner.write_all(&encoded)?;
        if terminated {
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl<W: Write> Write for TranscodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.passthrough {
            return self.inner.write(buf);
        }
        self.buffer.extend_from_slice(buf);
        while let Some(nl) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=nl).collect();
            self.transcode_out(&line[..line.len() - 1], true)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.transcode_out(&line, false)?;
        }
        self.inner.flush()
    }
}

/// Whether an error chain bottoms out in a broken pipe, which the
/// converter treats as a clean early exit (so `ioisis ... | head`
/// works).
pub fn is_broken_pipe(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|e| e.kind() == io::ErrorKind::BrokenPipe)
}
