//! The ISO 2709 record model and codec configuration.

/// Width of the leading total-length field, in ASCII digits.
pub const TOTAL_LEN_LEN: usize = 5;
/// Leader width, including the total-length prefix.
pub const LEADER_LEN: usize = 24;
/// Width of a directory tag.
pub const TAG_LEN: usize = 3;

/// Default width of a directory length entry.
pub const DEFAULT_LEN_LEN: usize = 4;
/// Default width of a directory position entry.
pub const DEFAULT_POS_LEN: usize = 5;
/// Default width of a directory custom area.
pub const DEFAULT_CUSTOM_LEN: usize = 0;

/// Default field terminator byte sequence.
pub const DEFAULT_FIELD_TERMINATOR: &[u8] = b"#";
/// Default record terminator byte sequence.
pub const DEFAULT_RECORD_TERMINATOR: &[u8] = b"#";
/// Default line width for the line-split wrapper.
pub const DEFAULT_LINE_LEN: usize = 80;
/// Default newline byte sequence for the line-split wrapper.
pub const DEFAULT_NEWLINE: &[u8] = b"\n";

/// Codec configuration: terminators and line splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoConfig {
    /// Byte sequence terminating each field and the directory.
    pub field_terminator: Vec<u8>,
    /// Byte sequence terminating the whole record.
    pub record_terminator: Vec<u8>,
    /// Data bytes per line; `0` disables line splitting.
    pub line_len: usize,
    /// Newline byte sequence between lines.
    pub newline: Vec<u8>,
}

impl Default for IsoConfig {
    fn default() -> Self {
        Self {
            field_terminator: DEFAULT_FIELD_TERMINATOR.to_vec(),
            record_terminator: DEFAULT_RECORD_TERMINATOR.to_vec(),
            line_len: DEFAULT_LINE_LEN,
            newline: DEFAULT_NEWLINE.to_vec(),
        }
    }
}

/// One field: a 3-byte directory tag, the field value, and the
/// directory entry's custom area (usually empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoField {
    pub tag: [u8; TAG_LEN],
    pub value: Vec<u8>,
    pub custom: Vec<u8>,
}

impl IsoField {
    /// Build a field from a tag of up to 3 bytes (zero-filled on the
    /// left, the canonical form for numeric tags) and a value.
    pub fn new(tag: &[u8], value: impl Into<Vec<u8>>) -> Self {
        let mut canonical = [b'0'; TAG_LEN];
        let take = tag.len().min(TAG_LEN);
        canonical[TAG_LEN - take..].copy_from_slice(&tag[tag.len() - take..]);
        Self {
            tag: canonical,
            value: value.into(),
            custom: Vec::new(),
        }
    }
}

/// A parsed or to-be-built ISO 2709 record.
///
/// All leader bytes are kept, so a parsed record rebuilds to exactly
/// the input bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoRecord {
    /// Record status byte (`b'0'` = active).
    pub status: u8,
    /// Record type byte.
    pub record_type: u8,
    /// Custom leader area after the type byte.
    pub custom_2: [u8; 2],
    /// Character coding byte.
    pub coding: u8,
    /// Indicator count (one ASCII digit in the leader).
    pub indicator_count: u8,
    /// Identifier length (one ASCII digit in the leader).
    pub identifier_len: u8,
    /// Custom leader area after the base address.
    pub custom_3: [u8; 3],
    /// Directory length-entry width.
    pub len_len: usize,
    /// Directory position-entry width.
    pub pos_len: usize,
    /// Directory custom-area width.
    pub custom_len: usize,
    /// Reserved leader byte.
    pub reserved: u8,
    /// The record's fields, in directory order.
    pub fields: Vec<IsoField>,
}

impl Default for IsoRecord {
    fn default() -> Self {
        Self {
            status: b'0',
            record_type: b'0',
            custom_2: *b"00",
            coding: b'0',
            indicator_count: 0,
            identifier_len: 0,
            custom_3: *b"000",
            len_len: DEFAULT_LEN_LEN,
            pos_len: DEFAULT_POS_LEN,
            custom_len: DEFAULT_CUSTOM_LEN,
            reserved: b'0',
            fields: Vec::new(),
        }
    }
}

impl IsoRecord {
    /// Build a default-leader record from `(tag, value)` pairs.
    pub fn from_pairs<T, V>(pairs: impl IntoIterator<Item = (T, V)>) -> Self
    where
        T: AsRef<[u8]>,
        V: Into<Vec<u8>>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(tag, value)| IsoField::new(tag.as_ref(), value))
                .collect(),
            ..Self::default()
        }
    }

    /// Whether the status byte marks the record active.
    pub fn is_active(&self) -> bool {
        self.status == b'0'
    }

    /// Width of one directory entry under this record's leader.
    pub fn dir_entry_len(&self) -> usize {
        TAG_LEN + self.len_len + self.pos_len + self.custom_len
    }
}
