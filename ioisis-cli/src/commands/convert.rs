//! Conversions mediated by the in-memory record model only.

use anyhow::Result;
use clap::Args;

use ioisis_fields::{tl_to_value, value_to_tl, Mode, TextCodec};
use serde_json::{Map, Value};

use crate::csv_io::{CsvRecordReader, CsvRecordWriter};
use crate::io::{open_input, open_output, TranscodingReader, TranscodingWriter};
use crate::jsonl::{JsonlReader, JsonlWriter};
use crate::opts::{CmodeOpts, PlainModeOpt, SfCheckOpt, SubfieldOpts};

fn mfn_of(value: &Value) -> Option<u64> {
    let field = value.get("mfn")?;
    let scalar = match field {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match scalar {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Record objects converted to a tabular form need an MFN; records
/// without one get sequential numbers past the highest seen so far.
fn with_mfn(value: Value, last_mfn: &mut u64) -> Value {
    if let Some(mfn) = mfn_of(&value) {
        *last_mfn = (*last_mfn).max(mfn);
        return value;
    }
    *last_mfn += 1;
    let Value::Object(fields) = value else {
        return value;
    };
    let mut renumbered = Map::new();
    renumbered.insert(
        "mfn".to_string(),
        Value::Array(vec![Value::String(last_mfn.to_string())]),
    );
    renumbered.extend(fields);
    Value::Object(renumbered)
}

#[derive(Args, Debug)]
pub struct Jsonl2CsvArgs {
    #[command(flatten)]
    pub mode: PlainModeOpt,
    #[command(flatten)]
    pub cmode: CmodeOpts,
    #[command(flatten)]
    pub subfield: SubfieldOpts,
    #[command(flatten)]
    pub sfcheck: SfCheckOpt,
    /// JSONL file encoding.
    #[arg(long, default_value = "utf-8")]
    pub jenc: String,
    /// CSV file encoding.
    #[arg(long, default_value = "utf-8")]
    pub cenc: String,
    /// JSONL input file, or - for standard input.
    #[arg(default_value = "-")]
    pub jsonl_input: String,
    /// CSV output file, or - for standard output.
    #[arg(default_value = "-")]
    pub csv_output: String,
}

/// JSON Lines to CSV.
pub fn jsonl2csv(args: &Jsonl2CsvArgs) -> Result<()> {
    let mode = args.mode.mode();
    let cmode: Mode = args.cmode.cmode.into();
    let sfp = args.subfield.parser(args.sfcheck.enabled())?;
    // The byte layer is internal here; UTF-8 keeps it lossless.
    let codec = TextCodec::new("utf-8", false)?;
    let mut reader = JsonlReader::new(open_input(&args.jsonl_input)?, &args.jenc, mode)?;
    let sink = TranscodingWriter::new(open_output(&args.csv_output)?, &args.cenc)?;
    let mut writer = CsvRecordWriter::new(sink, cmode)?;
    let mut last_mfn = 0u64;
    while let Some(value) = reader.next_record()? {
        let value = if mode.is_tabular() {
            value
        } else {
            with_mfn(value, &mut last_mfn)
        };
        let tl = value_to_tl(&value, mode, &sfp, &codec, true)?;
        writer.write_record_rows(&tl_to_value(&tl, cmode, &sfp, &codec)?)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct Csv2JsonlArgs {
    #[command(flatten)]
    pub mode: PlainModeOpt,
    #[command(flatten)]
    pub cmode: CmodeOpts,
    #[command(flatten)]
    pub subfield: SubfieldOpts,
    #[command(flatten)]
    pub sfcheck: SfCheckOpt,
    /// CSV file encoding.
    #[arg(long, default_value = "utf-8")]
    pub cenc: String,
    /// JSONL file encoding.
    #[arg(long, default_value = "utf-8")]
    pub jenc: String,
    /// CSV input file, or - for standard input.
    #[arg(default_value = "-")]
    pub csv_input: String,
    /// JSONL output file, or - for standard output.
    #[arg(default_value = "-")]
    pub jsonl_output: String,
}

/// CSV to JSON Lines.
pub fn csv2jsonl(args: &Csv2JsonlArgs) -> Result<()> {
    let mode = args.mode.mode();
    let cmode: Mode = args.cmode.cmode.into();
    let sfp = args.subfield.parser(args.sfcheck.enabled())?;
    let codec = TextCodec::new("utf-8", false)?;
    let source = TranscodingReader::new(open_input(&args.csv_input)?, &args.cenc)?;
    let mut reader = CsvRecordReader::new(source)?;
    let mut writer = JsonlWriter::new(open_output(&args.jsonl_output)?, &args.jenc)?;
    while let Some(rows) = reader.next_record()? {
        let tl = value_to_tl(&rows, cmode, &sfp, &codec, true)?;
        writer.write_record(&tl_to_value(&tl, mode, &sfp, &codec)?)?;
    }
    Ok(())
}
