//! Tidy lists and the user-visible record shapes built from them.
//!
//! A *tidy list* is an ordered sequence of `(tag, field bytes)` pairs,
//! optionally preceded by synthetic metadata pairs (`mfn`, `status`,
//! `ibp`). The conversions here reshape a tidy list into one of six
//! JSON-facing modes and back.

use serde_json::{Map, Value};

use crate::encoding::TextCodec;
use crate::error::{Error, Result};
use crate::subfield::{SubfieldPairs, SubfieldParser};

/// Synthetic tag carrying the record's MFN.
pub const MFN_TAG: &str = "mfn";
/// Synthetic tag carrying the record's status flag (`"0"` or `"1"`).
pub const STATUS_TAG: &str = "status";
/// Synthetic tag carrying stored invalid-block-padding residue (hex).
pub const IBP_TAG: &str = "ibp";

/// An ordered sequence of `(textual tag, field bytes)` pairs.
pub type TidyList = Vec<(String, Vec<u8>)>;

/// The six user-visible record shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `{tag: [field, ...], ...}` with raw field strings.
    Field,
    /// `{tag: [[[key, value], ...], ...], ...}` subfield pair arrays.
    Pairs,
    /// `{tag: [{key: value, ...}, ...], ...}`, last value wins.
    Nest,
    /// Like `Nest`, but the first value wins on duplicate keys.
    Inest,
    /// One row per field: `{mfn, index, tag, data}`.
    Tidy,
    /// One row per subfield: `{mfn, index, tag, sindex, sub, data}`.
    Stidy,
}

impl Mode {
    /// Tabular modes emit one row object per field or subfield instead
    /// of a single record object.
    pub fn is_tabular(self) -> bool {
        matches!(self, Self::Tidy | Self::Stidy)
    }

    /// The mode name as it appears on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Pairs => "pairs",
            Self::Nest => "nest",
            Self::Inest => "inest",
            Self::Tidy => "tidy",
            Self::Stidy => "stidy",
        }
    }

    /// Column set of the tabular modes.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Stidy => &["mfn", "index", "tag", "sindex", "sub", "data"],
            _ => &["mfn", "index", "tag", "data"],
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "field" => Ok(Self::Field),
            "pairs" => Ok(Self::Pairs),
            "nest" => Ok(Self::Nest),
            "inest" => Ok(Self::Inest),
            "tidy" => Ok(Self::Tidy),
            "stidy" => Ok(Self::Stidy),
            other => Err(Error::InvalidRecord {
                mode: other.to_string(),
                reason: "unknown mode".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_synthetic(tag: &str) -> bool {
    matches!(tag, MFN_TAG | STATUS_TAG | IBP_TAG)
}

fn invalid(mode: Mode, reason: impl Into<String>) -> Error {
    Error::InvalidRecord {
        mode: mode.as_str().to_string(),
        reason: reason.into(),
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The MFN carried by a tidy list's leading synthetic pair, if any.
pub fn tl_mfn(tl: &[(String, Vec<u8>)]) -> Option<u64> {
    tl.first().and_then(|(tag, data)| {
        if tag == MFN_TAG {
            std::str::from_utf8(data).ok()?.parse().ok()
        } else {
            None
        }
    })
}

/// Reshape a tidy list into the JSON value of the requested mode.
///
/// Tabular modes return an array of row objects; the other modes
/// return a single record object. Synthetic pairs stay field-shaped
/// (an array of raw strings) in the record-object modes; in tabular
/// modes the leading `mfn` pair feeds the `mfn` column instead of
/// becoming a row.
pub fn tl_to_value(
    tl: &[(String, Vec<u8>)],
    mode: Mode,
    sfp: &SubfieldParser,
    codec: &TextCodec,
) -> Result<Value> {
    if mode.is_tabular() {
        return tl_to_rows(tl, mode, sfp, codec);
    }

    let mut map = Map::new();
    for (tag, data) in tl {
        let rendered = if is_synthetic(tag) || mode == Mode::Field {
            Value::String(codec.decode(data)?)
        } else {
            let pairs = sfp.parse(data);
            match mode {
                Mode::Pairs => {
                    let mut items = Vec::with_capacity(pairs.len());
                    for (key, value) in &pairs {
                        items.push(Value::Array(vec![
                            Value::String(codec.decode(key)?),
                            Value::String(codec.decode(value)?),
                        ]));
                    }
                    Value::Array(items)
                }
                Mode::Nest | Mode::Inest => {
                    let mut nested = Map::new();
                    for (key, value) in &pairs {
                        let key = codec.decode(key)?;
                        let value = Value::String(codec.decode(value)?);
                        if mode == Mode::Nest || !nested.contains_key(&key) {
                            nested.insert(key, value);
                        }
                    }
                    Value::Object(nested)
                }
                Mode::Field | Mode::Tidy | Mode::Stidy => unreachable!(),
            }
        };
        let entry = map
            .entry(tag.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(rendered);
        }
    }
    Ok(Value::Object(map))
}

fn tl_to_rows(
    tl: &[(String, Vec<u8>)],
    mode: Mode,
    sfp: &SubfieldParser,
    codec: &TextCodec,
) -> Result<Value> {
    let mfn = tl_mfn(tl).unwrap_or(0);
    let fields = if tl_mfn(tl).is_some() { &tl[1..] } else { tl };

    let mut rows = Vec::new();
    for (index, (tag, data)) in fields.iter().enumerate() {
        if mode == Mode::Tidy {
            let mut row = Map::new();
            row.insert("mfn".to_string(), Value::from(mfn));
            row.insert("index".to_string(), Value::from(index));
            row.insert("tag".to_string(), Value::String(tag.clone()));
            row.insert("data".to_string(), Value::String(codec.decode(data)?));
            rows.push(Value::Object(row));
        } else {
            for (sindex, (key, value)) in sfp.parse(data).iter().enumerate() {
                let mut row = Map::new();
                row.insert("mfn".to_string(), Value::from(mfn));
                row.insert("index".to_string(), Value::from(index));
                row.insert("tag".to_string(), Value::String(tag.clone()));
                row.insert("sindex".to_string(), Value::from(sindex));
                row.insert("sub".to_string(), Value::String(codec.decode(key)?));
                row.insert("data".to_string(), Value::String(codec.decode(value)?));
                rows.push(Value::Object(row));
            }
        }
    }
    Ok(Value::Array(rows))
}

/// Rebuild a tidy list from a mode-shaped JSON value.
///
/// With `prepend_mfn`, a recognized MFN (the `mfn` key of a record
/// object, or the `mfn` column of tabular rows) is re-emitted as the
/// leading synthetic pair; otherwise it is dropped.
pub fn value_to_tl(
    value: &Value,
    mode: Mode,
    sfp: &SubfieldParser,
    codec: &TextCodec,
    prepend_mfn: bool,
) -> Result<TidyList> {
    if mode.is_tabular() {
        return rows_to_tl(value, mode, sfp, codec, prepend_mfn);
    }

    let obj = value
        .as_object()
        .ok_or_else(|| invalid(mode, "expected a JSON object"))?;

    let mut tl = TidyList::new();
    if prepend_mfn {
        if let Some(mfn_value) = obj.get(MFN_TAG) {
            let mfn = match mfn_value {
                Value::Array(items) => items.first().and_then(value_as_u64),
                other => value_as_u64(other),
            }
            .ok_or_else(|| invalid(mode, "mfn is not a number"))?;
            tl.push((MFN_TAG.to_string(), mfn.to_string().into_bytes()));
        }
    }

    for (tag, occurrences) in obj {
        if tag == MFN_TAG {
            continue;
        }
        let items = occurrences
            .as_array()
            .ok_or_else(|| invalid(mode, format!("tag {tag:?} is not an array")))?;
        for item in items {
            let data = if is_synthetic(tag) || mode == Mode::Field {
                let text = item
                    .as_str()
                    .ok_or_else(|| invalid(mode, format!("field {tag:?} is not a string")))?;
                codec.encode(text)?
            } else {
                let pairs = item_to_pairs(item, mode, codec)?;
                sfp.unparse(&pairs)?
            };
            tl.push((tag.clone(), data));
        }
    }
    Ok(tl)
}

fn item_to_pairs(item: &Value, mode: Mode, codec: &TextCodec) -> Result<SubfieldPairs> {
    let mut pairs = SubfieldPairs::new();
    match (mode, item) {
        (Mode::Pairs, Value::Array(entries)) => {
            for entry in entries {
                let pair = entry
                    .as_array()
                    .filter(|p| p.len() == 2)
                    .ok_or_else(|| invalid(mode, "subfield entry is not a [key, value] pair"))?;
                let key = pair[0]
                    .as_str()
                    .ok_or_else(|| invalid(mode, "subfield key is not a string"))?;
                let value = pair[1]
                    .as_str()
                    .ok_or_else(|| invalid(mode, "subfield value is not a string"))?;
                pairs.push((codec.encode(key)?, codec.encode(value)?));
            }
        }
        (Mode::Nest | Mode::Inest, Value::Object(entries)) => {
            for (key, value) in entries {
                let value = value
                    .as_str()
                    .ok_or_else(|| invalid(mode, "subfield value is not a string"))?;
                pairs.push((codec.encode(key)?, codec.encode(value)?));
            }
        }
        _ => return Err(invalid(mode, "field value has the wrong shape")),
    }
    Ok(pairs)
}

fn rows_to_tl(
    value: &Value,
    mode: Mode,
    sfp: &SubfieldParser,
    codec: &TextCodec,
    prepend_mfn: bool,
) -> Result<TidyList> {
    let rows = value
        .as_array()
        .ok_or_else(|| invalid(mode, "expected an array of rows"))?;

    let mut tl = TidyList::new();
    if prepend_mfn {
        if let Some(first) = rows.first() {
            let mfn = first
                .get("mfn")
                .and_then(value_as_u64)
                .ok_or_else(|| invalid(mode, "row has no numeric mfn"))?;
            tl.push((MFN_TAG.to_string(), mfn.to_string().into_bytes()));
        }
    }

    if mode == Mode::Tidy {
        for row in rows {
            let tag = row
                .get("tag")
                .and_then(value_as_text)
                .ok_or_else(|| invalid(mode, "row has no tag"))?;
            let data = row
                .get("data")
                .and_then(value_as_text)
                .ok_or_else(|| invalid(mode, "row has no data"))?;
            tl.push((tag, codec.encode(&data)?));
        }
        return Ok(tl);
    }

    // stidy: consecutive rows sharing an index form one field.
    let mut cursor = 0;
    while cursor < rows.len() {
        let index = rows[cursor].get("index").and_then(value_as_u64);
        let tag = rows[cursor]
            .get("tag")
            .and_then(value_as_text)
            .ok_or_else(|| invalid(mode, "row has no tag"))?;
        let mut pairs = SubfieldPairs::new();
        while cursor < rows.len() && rows[cursor].get("index").and_then(value_as_u64) == index {
            let sub = rows[cursor]
                .get("sub")
                .and_then(value_as_text)
                .ok_or_else(|| invalid(mode, "row has no sub"))?;
            let data = rows[cursor]
                .get("data")
                .and_then(value_as_text)
                .ok_or_else(|| invalid(mode, "row has no data"))?;
            pairs.push((codec.encode(&sub)?, codec.encode(&data)?));
            cursor += 1;
        }
        tl.push((tag, sfp.unparse(&pairs)?));
    }
    Ok(tl)
}
