//! Printf-like templates mapping raw field tags to user-visible ones.
//!
//! A template is compiled once into a render function and a scanner.
//! Supported specifiers:
//!
//! | Specifier | Render | Scan |
//! |---|---|---|
//! | `%d` | tag as a decimal integer | integer |
//! | `%r` | tag as it appears in the input | raw capture |
//! | `%z` | tag with leading zeros stripped | requires no leading zeros |
//! | `%i` | record-relative field index (0-based) | integer index |
//! | `%%` | literal `%` | literal |
//!
//! A width may appear between `%` and the letter; a leading `0` in the
//! width selects zero-padding, otherwise space-padding is used. Raw
//! tags are strings for ISO records and decimal integers for MST
//! records.

use regex::Regex;

use crate::error::{Error, Result};

/// The tag template used when the caller does not supply one.
pub const DEFAULT_FTF_TEMPLATE: &str = "%z";

/// Width of a raw ISO tag.
const ISO_TAG_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecKind {
    Decimal,
    Raw,
    ZeroStripped,
    Index,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Spec {
        kind: SpecKind,
        width: Option<usize>,
        zero_pad: bool,
    },
}

/// The values recovered by scanning one rendered tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTag {
    /// Canonical raw tag (zero-filled 3-char string for ISO, plain
    /// decimal for MST), when the template captures one.
    pub raw_tag: Option<String>,
    /// Field index, when the template captures one.
    pub index: Option<usize>,
}

/// A compiled field-tag format template.
#[derive(Debug, Clone)]
pub struct FieldTagFormatter {
    int_tags: bool,
    segments: Vec<Segment>,
    scanner: Regex,
}

impl FieldTagFormatter {
    /// Compile a template. `int_tags` selects the MST interpretation
    /// (integer raw tags) over the ISO one (3-char string raw tags).
    pub fn new(template: &str, int_tags: bool) -> Result<Self> {
        let segments = Self::compile_segments(template)?;
        if segments.is_empty() {
            return Err(Error::InvalidTagTemplate {
                reason: "empty template".to_string(),
            });
        }
        let scanner = Self::compile_scanner(&segments, int_tags)?;
        Ok(Self {
            int_tags,
            segments,
            scanner,
        })
    }

    fn compile_segments(template: &str) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied() {
                if d.is_ascii_digit() {
                    digits.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let letter = chars.next().ok_or_else(|| Error::InvalidTagTemplate {
                reason: "template ends inside a specifier".to_string(),
            })?;
            if letter == '%' {
                if !digits.is_empty() {
                    return Err(Error::InvalidTagTemplate {
                        reason: "width is not allowed on %%".to_string(),
                    });
                }
                literal.push('%');
                continue;
            }
            let kind = match letter {
                'd' => SpecKind::Decimal,
                'r' => SpecKind::Raw,
                'z' => SpecKind::ZeroStripped,
                'i' => SpecKind::Index,
                other => {
                    return Err(Error::InvalidTagTemplate {
                        reason: format!("unknown specifier %{other}"),
                    });
                }
            };
            let (width, zero_pad) = if digits.is_empty() {
                (None, false)
            } else {
                let zero_pad = digits.starts_with('0');
                let width: usize =
                    digits.parse().map_err(|_| Error::InvalidTagTemplate {
                        reason: format!("bad width {digits:?}"),
                    })?;
                if width == 0 {
                    return Err(Error::InvalidTagTemplate {
                        reason: "zero width".to_string(),
                    });
                }
                (Some(width), zero_pad)
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Spec {
                kind,
                width,
                zero_pad,
            });
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    fn compile_scanner(segments: &[Segment], int_tags: bool) -> Result<Regex> {
        let mut pattern = String::from("^");
        for segment in segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Spec { kind, width, .. } => {
                    let group = match (kind, width) {
                        (SpecKind::Decimal | SpecKind::Index, Some(w)) => {
                            format!("([0-9 ]{{{w}}})")
                        }
                        (SpecKind::Decimal | SpecKind::Index, None) => {
                            "([0-9]+)".to_string()
                        }
                        (SpecKind::Raw, Some(w)) => format!("(.{{{w}}})"),
                        (SpecKind::Raw, None) => {
                            if int_tags {
                                "([0-9]+)".to_string()
                            } else {
                                format!("(.{{{ISO_TAG_LEN}}})")
                            }
                        }
                        (SpecKind::ZeroStripped, Some(w)) => format!("(.{{{w}}})"),
                        (SpecKind::ZeroStripped, None) => {
                            if int_tags {
                                "(0|[1-9][0-9]*)".to_string()
                            } else {
                                "(0|[1-9][0-9]*|[0-9]*[A-Za-z][0-9A-Za-z]*)".to_string()
                            }
                        }
                    };
                    pattern.push_str(&group);
                }
            }
        }
        pattern.push('$');
        Regex::new(&pattern).map_err(|e| Error::InvalidTagTemplate {
            reason: e.to_string(),
        })
    }

    /// Whether this formatter treats raw tags as integers (MST mode).
    pub fn int_tags(&self) -> bool {
        self.int_tags
    }

    fn pad(text: &str, width: Option<usize>, zero_pad: bool) -> String {
        match width {
            None => text.to_string(),
            Some(w) if zero_pad => format!("{text:0>w$}"),
            Some(w) => format!("{text:>w$}"),
        }
    }

    fn tag_as_number(&self, raw_tag: &str) -> Result<u32> {
        raw_tag.parse().map_err(|_| Error::TagMismatch {
            tag: raw_tag.to_string(),
        })
    }

    fn strip_zeros(raw_tag: &str) -> &str {
        let stripped = raw_tag.trim_start_matches('0');
        if stripped.is_empty() { "0" } else { stripped }
    }

    /// Render the user-visible form of one raw tag.
    ///
    /// `raw_tag` is the 3-char directory tag for ISO records or the
    /// decimal form of the integer tag for MST records; `index` is the
    /// 0-based position of the field inside its record.
    pub fn render(&self, raw_tag: &str, index: usize) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Spec {
                    kind,
                    width,
                    zero_pad,
                } => {
                    let rendered = match kind {
                        SpecKind::Decimal => self.tag_as_number(raw_tag)?.to_string(),
                        SpecKind::Raw => raw_tag.to_string(),
                        SpecKind::ZeroStripped => Self::strip_zeros(raw_tag).to_string(),
                        SpecKind::Index => index.to_string(),
                    };
                    out.push_str(&Self::pad(&rendered, *width, *zero_pad));
                }
            }
        }
        Ok(out)
    }

    fn canonical_tag(&self, kind: SpecKind, capture: &str) -> Result<String> {
        let trimmed = capture.trim_matches(' ');
        if self.int_tags {
            let value: u32 = trimmed.parse().map_err(|_| Error::TagMismatch {
                tag: capture.to_string(),
            })?;
            return Ok(value.to_string());
        }
        let w = ISO_TAG_LEN;
        match kind {
            SpecKind::Decimal => {
                let value: u32 = trimmed.parse().map_err(|_| Error::TagMismatch {
                    tag: capture.to_string(),
                })?;
                Ok(format!("{value:0>w$}"))
            }
            _ => Ok(format!("{trimmed:0>w$}")),
        }
    }

    /// Scan a user-visible tag back to its raw form.
    pub fn scan(&self, text: &str) -> Result<ScannedTag> {
        let captures = self.scanner.captures(text).ok_or_else(|| Error::TagMismatch {
            tag: text.to_string(),
        })?;
        let mut raw_tag: Option<String> = None;
        let mut index: Option<usize> = None;
        let mut group = 0;
        for segment in &self.segments {
            let Segment::Spec { kind, .. } = segment else {
                continue;
            };
            group += 1;
            let capture = captures
                .get(group)
                .map(|m| m.as_str())
                .ok_or_else(|| Error::TagMismatch {
                    tag: text.to_string(),
                })?;
            if *kind == SpecKind::Index {
                let value: usize =
                    capture.trim_matches(' ').parse().map_err(|_| Error::TagMismatch {
                        tag: text.to_string(),
                    })?;
                match index {
                    None => index = Some(value),
                    Some(prev) if prev == value => {}
                    Some(prev) => {
                        return Err(Error::AmbiguousTagTemplate {
                            left: prev.to_string(),
                            right: value.to_string(),
                        });
                    }
                }
            } else {
                let value = self.canonical_tag(*kind, capture)?;
                match &raw_tag {
                    None => raw_tag = Some(value),
                    Some(prev) if *prev == value => {}
                    Some(prev) => {
                        return Err(Error::AmbiguousTagTemplate {
                            left: prev.clone(),
                            right: value,
                        });
                    }
                }
            }
        }
        Ok(ScannedTag { raw_tag, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_template_strips_zeros() {
        let ftf = FieldTagFormatter::new(DEFAULT_FTF_TEMPLATE, false).unwrap();
        assert_eq!(ftf.render("010", 0).unwrap(), "10");
        assert_eq!(ftf.render("000", 0).unwrap(), "0");
        let scanned = ftf.scan("10").unwrap();
        assert_eq!(scanned.raw_tag.as_deref(), Some("010"));
    }

    #[test]
    fn zero_stripped_rejects_leading_zeros_on_scan() {
        let ftf = FieldTagFormatter::new("%z", false).unwrap();
        assert!(matches!(ftf.scan("010"), Err(Error::TagMismatch { .. })));
    }

    #[test]
    fn prefixed_template_round_trips() {
        let ftf = FieldTagFormatter::new("v%z", true).unwrap();
        assert_eq!(ftf.render("70", 2).unwrap(), "v70");
        let scanned = ftf.scan("v70").unwrap();
        assert_eq!(scanned.raw_tag.as_deref(), Some("70"));
    }

    #[test]
    fn zero_padded_decimal_width() {
        let ftf = FieldTagFormatter::new("%04d", true).unwrap();
        assert_eq!(ftf.render("12", 0).unwrap(), "0012");
        assert_eq!(ftf.scan("0012").unwrap().raw_tag.as_deref(), Some("12"));
    }

    #[test]
    fn space_padded_index_width() {
        let ftf = FieldTagFormatter::new("%5i %r", true).unwrap();
        assert_eq!(ftf.render("3", 7).unwrap(), "    7 3");
        let scanned = ftf.scan("    7 3").unwrap();
        assert_eq!(scanned.index, Some(7));
        assert_eq!(scanned.raw_tag.as_deref(), Some("3"));
    }

    #[test]
    fn repeated_specifiers_must_agree() {
        let ftf = FieldTagFormatter::new("%d-%d", true).unwrap();
        assert_eq!(ftf.scan("5-5").unwrap().raw_tag.as_deref(), Some("5"));
        assert!(matches!(
            ftf.scan("5-6"),
            Err(Error::AmbiguousTagTemplate { .. })
        ));
    }

    #[test]
    fn percent_literal() {
        let ftf = FieldTagFormatter::new("%%%z", true).unwrap();
        assert_eq!(ftf.render("9", 0).unwrap(), "%9");
        assert_eq!(ftf.scan("%9").unwrap().raw_tag.as_deref(), Some("9"));
    }

    #[test]
    fn unknown_specifier_is_rejected() {
        assert!(matches!(
            FieldTagFormatter::new("%q", false),
            Err(Error::InvalidTagTemplate { .. })
        ));
    }

    #[test]
    fn decimal_render_fails_for_non_numeric_iso_tag() {
        let ftf = FieldTagFormatter::new("%d", false).unwrap();
        assert!(matches!(ftf.render("0ab", 0), Err(Error::TagMismatch { .. })));
    }

    #[test]
    fn iso_raw_tag_scan_is_three_chars() {
        let ftf = FieldTagFormatter::new("%r", false).unwrap();
        assert_eq!(ftf.scan("001").unwrap().raw_tag.as_deref(), Some("001"));
        assert!(ftf.scan("1").is_err());
    }
}
