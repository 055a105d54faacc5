//! Text encoding helpers for field payloads.
//!
//! ISIS payloads are nominally in a single-byte legacy encoding
//! (`cp1252` by default) but files touched by newer tooling often
//! carry embedded UTF-8 runs. The hybrid decoder picks out the
//! well-formed multi-byte UTF-8 sequences and falls back to the legacy
//! encoding for everything else.

use std::str;
use std::sync::OnceLock;

use encoding_rs::Encoding;
use regex::bytes::Regex;

use crate::error::{Error, Result};

/// Default encoding of ISO and MST payloads.
pub const DEFAULT_RECORD_ENCODING: &str = "cp1252";

/// Well-formed multi-byte UTF-8 sequences per RFC 3629: 2-, 3- and
/// 4-byte forms, excluding surrogates (U+D800..U+DFFF) and overlong
/// encodings. Single-byte (ASCII) units are left to the legacy
/// decoder, which agrees with UTF-8 on them.
const UTF8_MULTIBYTE_PATTERN: &str = "(?s-u)(?:\
    [\\xC2-\\xDF][\\x80-\\xBF]\
    |\\xE0[\\xA0-\\xBF][\\x80-\\xBF]\
    |[\\xE1-\\xEC][\\x80-\\xBF]{2}\
    |\\xED[\\x80-\\x9F][\\x80-\\xBF]\
    |[\\xEE-\\xEF][\\x80-\\xBF]{2}\
    |\\xF0[\\x90-\\xBF][\\x80-\\xBF]{2}\
    |[\\xF1-\\xF3][\\x80-\\xBF]{3}\
    |\\xF4[\\x80-\\x8F][\\x80-\\xBF]{2}\
    )+";

fn utf8_multibyte_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(UTF8_MULTIBYTE_PATTERN).expect("the multi-byte pattern is a constant")
    })
}

/// Resolve an encoding label (`cp1252`, `utf-8`, `latin1`, ...).
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.as_bytes()).ok_or_else(|| Error::UnknownEncoding {
        label: label.to_string(),
    })
}

/// Strict decode: any malformed input is an error, never replaced.
pub fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| Error::Encoding {
            encoding: encoding.name().to_string(),
        })
}

/// Strict encode: unmappable characters are an error.
pub fn encode_strict(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>> {
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(Error::Encoding {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(bytes.into_owned())
}

/// Decode bytes that may mix UTF-8 runs into a legacy encoding.
///
/// Every maximal run of well-formed multi-byte UTF-8 is decoded as
/// UTF-8; the bytes between runs are decoded with `fallback`.
pub fn hybrid_utf8_decode(bytes: &[u8], fallback: &'static Encoding) -> Result<String> {
    let mut out = String::new();
    let mut cursor = 0;
    for found in utf8_multibyte_regex().find_iter(bytes) {
        if found.start() > cursor {
            out.push_str(&decode_strict(&bytes[cursor..found.start()], fallback)?);
        }
        // The pattern only admits well-formed UTF-8.
        match str::from_utf8(found.as_bytes()) {
            Ok(text) => out.push_str(text),
            Err(_) => out.push_str(&decode_strict(found.as_bytes(), fallback)?),
        }
        cursor = found.end();
    }
    if cursor < bytes.len() {
        out.push_str(&decode_strict(&bytes[cursor..], fallback)?);
    }
    Ok(out)
}

/// A byte⇄text codec for record payloads.
#[derive(Debug, Clone, Copy)]
pub struct TextCodec {
    encoding: &'static Encoding,
    utf8_fallback: bool,
}

impl TextCodec {
    /// Build a codec from an encoding label. With `utf8_fallback`,
    /// decoding applies [`hybrid_utf8_decode`].
    pub fn new(label: &str, utf8_fallback: bool) -> Result<Self> {
        Ok(Self {
            encoding: encoding_for_label(label)?,
            utf8_fallback,
        })
    }

    /// The resolved encoding.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Decode payload bytes to text.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        if self.utf8_fallback {
            hybrid_utf8_decode(bytes, self.encoding)
        } else {
            decode_strict(bytes, self.encoding)
        }
    }

    /// Encode text to payload bytes.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        encode_strict(text, self.encoding)
    }
}
