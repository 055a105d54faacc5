//! Splitting field values into subfield pairs and joining them back.
//!
//! A field value like `b"data^ttext^len"` holds a leading keyless run
//! followed by subfields, each introduced by a prefix (`^`) and a
//! fixed-length key. The parser yields `(key, value)` pairs; the
//! unparser rebuilds the byte value from such pairs.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Configuration for [`SubfieldParser`].
///
/// The defaults match the bare parsing rules; front-ends usually
/// override `prefix`, `first` and `lower` with their own defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubfieldConfig {
    /// Byte sequence marking the beginning of a new subfield.
    pub prefix: Vec<u8>,
    /// Subfield key length, in bytes, after the prefix.
    pub length: usize,
    /// Lowercase keys on parse and unparse.
    pub lower: bool,
    /// Key assigned to the leading keyless run.
    pub first: Vec<u8>,
    /// Keep pairs whose value is empty.
    pub empty: bool,
    /// Suffix repeated keys with a decimal counter starting at 1.
    pub number: bool,
    /// With `number`, also suffix first occurrences with `0`.
    pub zero: bool,
    /// Verify on unparse that the output parses back to the input.
    pub check: bool,
}

impl Default for SubfieldConfig {
    fn default() -> Self {
        Self {
            prefix: b"^".to_vec(),
            length: 1,
            lower: false,
            first: Vec::new(),
            empty: false,
            number: true,
            zero: false,
            check: false,
        }
    }
}

/// Splits field values into subfield pairs and joins them back.
///
/// ```
/// use ioisis_fields::subfield::{SubfieldConfig, SubfieldParser};
///
/// let sfp = SubfieldParser::new(SubfieldConfig {
///     first: b"_".to_vec(),
///     ..SubfieldConfig::default()
/// });
/// let pairs = sfp.parse(b"data^ttext^len^tTrail");
/// assert_eq!(
///     pairs,
///     vec![
///         (b"_".to_vec(), b"data".to_vec()),
///         (b"t".to_vec(), b"text".to_vec()),
///         (b"l".to_vec(), b"en".to_vec()),
///         (b"t1".to_vec(), b"Trail".to_vec()),
///     ],
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SubfieldParser {
    config: SubfieldConfig,
}

/// An ordered list of `(key, value)` subfield pairs.
pub type SubfieldPairs = Vec<(Vec<u8>, Vec<u8>)>;

impl SubfieldParser {
    /// Create a parser from its configuration.
    pub fn new(config: SubfieldConfig) -> Self {
        Self { config }
    }

    /// The configuration this parser was built from.
    pub fn config(&self) -> &SubfieldConfig {
        &self.config
    }

    /// A subfield boundary exists at `i` when the prefix occurs there
    /// with at least `length` bytes after it.
    fn boundary_at(&self, field: &[u8], i: usize) -> bool {
        let plen = self.config.prefix.len();
        i + plen + self.config.length <= field.len()
            && field[i..i + plen] == self.config.prefix[..]
    }

    /// Split a field value into ordered `(key, value)` pairs.
    ///
    /// The leading keyless run is reported under the configured
    /// `first` key. Lowering, numbering and empty-filtering are
    /// applied in that order, with the filter running before the
    /// per-key counter is bumped.
    pub fn parse(&self, field: &[u8]) -> SubfieldPairs {
        let cfg = &self.config;
        let plen = cfg.prefix.len();

        let mut raw: SubfieldPairs = Vec::new();
        if plen == 0 {
            raw.push((Vec::new(), field.to_vec()));
        } else {
            let mut i = 0;
            let mut key: Vec<u8> = Vec::new();
            let mut value: Vec<u8> = Vec::new();
            while i < field.len() {
                if self.boundary_at(field, i) {
                    raw.push((key, value));
                    key = field[i + plen..i + plen + cfg.length].to_vec();
                    value = Vec::new();
                    i += plen + cfg.length;
                } else {
                    value.push(field[i]);
                    i += 1;
                }
            }
            raw.push((key, value));
        }

        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut out: SubfieldPairs = Vec::new();
        for (key, value) in raw {
            if value.is_empty() && !cfg.empty {
                continue;
            }
            let mut key = if key.is_empty() { cfg.first.clone() } else { key };
            if cfg.lower {
                key.make_ascii_lowercase();
            }
            if cfg.number {
                let suffix = {
                    let n = counts.entry(key.clone()).or_insert(0);
                    let current = *n;
                    *n += 1;
                    current
                };
                if cfg.zero || suffix > 0 {
                    key.extend_from_slice(suffix.to_string().as_bytes());
                }
            }
            out.push((key, value));
        }
        out
    }

    /// The key the leading pair must carry for its value to be emitted
    /// without a prefix.
    fn expected_first(&self) -> Vec<u8> {
        let cfg = &self.config;
        let mut first = cfg.first.clone();
        if cfg.lower {
            first.make_ascii_lowercase();
        }
        if cfg.number && cfg.zero {
            first.push(b'0');
        }
        first
    }

    /// Join ordered `(key, value)` pairs back into one field value.
    ///
    /// The first pair is emitted without a prefix iff its key equals
    /// the expected first key; every other pair is emitted as
    /// `prefix || key[..length] || value`. Keys shorter than the
    /// configured length are rejected. With `check` on, the output is
    /// reparsed and compared against the surviving input pairs.
    pub fn unparse(&self, pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<Vec<u8>> {
        let cfg = &self.config;

        let mut kept: SubfieldPairs = Vec::new();
        for (key, value) in pairs {
            if value.is_empty() && !cfg.empty {
                continue;
            }
            let mut key = key.clone();
            if cfg.lower {
                key.make_ascii_lowercase();
            }
            kept.push((key, value.clone()));
        }

        let expected_first = self.expected_first();
        let mut out = Vec::new();
        for (idx, (key, value)) in kept.iter().enumerate() {
            if idx == 0 && *key == expected_first {
                out.extend_from_slice(value);
            } else {
                if key.len() < cfg.length {
                    return Err(Error::InvalidSubfieldKey {
                        key: String::from_utf8_lossy(key).into_owned(),
                        length: cfg.length,
                    });
                }
                out.extend_from_slice(&cfg.prefix);
                out.extend_from_slice(&key[..cfg.length]);
                out.extend_from_slice(value);
            }
        }

        if cfg.check && self.parse(&out) != kept {
            return Err(Error::SubfieldRoundTripMismatch);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sfp(config: SubfieldConfig) -> SubfieldParser {
        SubfieldParser::new(config)
    }

    fn pairs(raw: &[(&[u8], &[u8])]) -> SubfieldPairs {
        raw.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect()
    }

    #[test]
    fn back_to_back_prefixes_yield_empty_runs() {
        let parser = sfp(SubfieldConfig {
            empty: true,
            ..SubfieldConfig::default()
        });
        assert_eq!(
            parser.parse(b"^a^b"),
            pairs(&[(b"", b""), (b"a", b""), (b"b", b"")]),
        );
    }

    #[test]
    fn unparse_prefixless_first_round_trips() {
        let parser = sfp(SubfieldConfig {
            first: b"_".to_vec(),
            check: true,
            ..SubfieldConfig::default()
        });
        let field = b"data^ttext^len^tTrail";
        let parsed = parser.parse(field);
        assert_eq!(parser.unparse(&parsed).unwrap(), field.to_vec());
    }

    #[test]
    fn unparse_prefixes_everything_when_first_key_differs() {
        let parser = sfp(SubfieldConfig::default());
        let out = parser
            .unparse(&pairs(&[(b"a", b"one"), (b"b", b"two")]))
            .unwrap();
        assert_eq!(out, b"^aone^btwo".to_vec());
    }

    #[test]
    fn unparse_rejects_short_keys() {
        let parser = sfp(SubfieldConfig {
            length: 2,
            ..SubfieldConfig::default()
        });
        let err = parser.unparse(&pairs(&[(b"a", b"one")])).unwrap_err();
        assert!(matches!(err, Error::InvalidSubfieldKey { length: 2, .. }));
    }

    #[test]
    fn unparse_check_catches_unnumbered_duplicates() {
        let parser = sfp(SubfieldConfig {
            check: true,
            ..SubfieldConfig::default()
        });
        let err = parser
            .unparse(&pairs(&[(b"t", b"one"), (b"t", b"two")]))
            .unwrap_err();
        assert_eq!(err, Error::SubfieldRoundTripMismatch);
    }

    #[test]
    fn unparse_zero_suffix_on_first_key() {
        let parser = sfp(SubfieldConfig {
            first: b"_".to_vec(),
            zero: true,
            check: true,
            ..SubfieldConfig::default()
        });
        let parsed = parser.parse(b"lead^tdata");
        assert_eq!(parsed, pairs(&[(b"_0", b"lead"), (b"t0", b"data")]));
        assert_eq!(parser.unparse(&parsed).unwrap(), b"lead^tdata".to_vec());
    }

    #[test]
    fn empty_prefix_keeps_whole_field_as_leading_run() {
        let parser = sfp(SubfieldConfig {
            prefix: Vec::new(),
            first: b"_".to_vec(),
            ..SubfieldConfig::default()
        });
        assert_eq!(parser.parse(b"abc"), pairs(&[(b"_", b"abc")]));
    }
}
