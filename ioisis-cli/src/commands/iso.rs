//! ISO 2709 conversions.

use anyhow::Result;
use clap::Args;

use ioisis_fields::{tl_to_value, value_to_tl, Mode};
use ioisis_iso::{IsoReader, IsoWriter};

use crate::csv_io::{CsvRecordReader, CsvRecordWriter};
use crate::io::{open_input, open_output, TranscodingReader, TranscodingWriter};
use crate::jsonl::{JsonlReader, JsonlWriter};
use crate::opts::{
    CmodeOpts, FtfOpt, IsoOpts, MetaOpts, ModeOpts, SfCheckOpt, SubfieldOpts, Utf8Opt,
};
use crate::pipeline::{iso_record_to_tl, tl_to_iso_record};

#[derive(Args, Debug)]
pub struct Iso2JsonlArgs {
    #[command(flatten)]
    pub iso: IsoOpts,
    #[command(flatten)]
    pub meta: MetaOpts,
    #[command(flatten)]
    pub mode: ModeOpts,
    #[command(flatten)]
    pub subfield: SubfieldOpts,
    #[command(flatten)]
    pub utf8: Utf8Opt,
    /// ISO file encoding.
    #[arg(long, default_value = "cp1252")]
    pub ienc: String,
    /// JSONL file encoding.
    #[arg(long, default_value = "utf-8")]
    pub jenc: String,
    /// ISO input file, or - for standard input.
    #[arg(default_value = "-")]
    pub iso_input: String,
    /// JSONL output file, or - for standard output.
    #[arg(default_value = "-")]
    pub jsonl_output: String,
}

/// ISO2709 to JSON Lines.
pub fn iso2jsonl(args: &Iso2JsonlArgs) -> Result<()> {
    let mode = args.mode.mode();
    let ftf = args.mode.formatter(false)?;
    let sfp = args.subfield.parser(false)?;
    let codec = args.utf8.codec(&args.ienc)?;
    let mut reader = IsoReader::new(open_input(&args.iso_input)?, args.iso.config()?);
    let mut writer = JsonlWriter::new(open_output(&args.jsonl_output)?, &args.jenc)?;
    while let Some(record) = reader.read_record()? {
        let ordinal = reader.records_read();
        if args.meta.only_active() && !record.is_active() {
            continue;
        }
        let tl = iso_record_to_tl(
            &record,
            ordinal,
            &ftf,
            args.meta.prepend_mfn(mode),
            args.meta.prepend_status(),
        )?;
        writer.write_record(&tl_to_value(&tl, mode, &sfp, &codec)?)?;
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct Jsonl2IsoArgs {
    #[command(flatten)]
    pub iso: IsoOpts,
    #[command(flatten)]
    pub mode: ModeOpts,
    #[command(flatten)]
    pub subfield: SubfieldOpts,
    #[command(flatten)]
    pub sfcheck: SfCheckOpt,
    /// JSONL file encoding.
    #[arg(long, default_value = "utf-8")]
    pub jenc: String,
    /// ISO file encoding.
    #[arg(long, default_value = "cp1252")]
    pub ienc: String,
    /// JSONL input file, or - for standard input.
    #[arg(default_value = "-")]
    pub jsonl_input: String,
    /// ISO output file, or - for standard output.
    #[arg(default_value = "-")]
    pub iso_output: String,
}

/// JSON Lines to ISO2709.
pub fn jsonl2iso(args: &Jsonl2IsoArgs) -> Result<()> {
    let mode = args.mode.mode();
    let ftf = args.mode.formatter(false)?;
    let sfp = args.subfield.parser(args.sfcheck.enabled())?;
    let codec = ioisis_fields::TextCodec::new(&args.ienc, false)?;
    let mut reader = JsonlReader::new(open_input(&args.jsonl_input)?, &args.jenc, mode)?;
    let mut writer = IsoWriter::new(open_output(&args.iso_output)?, args.iso.config()?);
    while let Some(value) = reader.next_record()? {
        let tl = value_to_tl(&value, mode, &sfp, &codec, false)?;
        writer.write_record(&tl_to_iso_record(&tl, &ftf)?)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct Iso2CsvArgs {
    #[command(flatten)]
    pub iso: IsoOpts,
    #[command(flatten)]
    pub meta: MetaOpts,
    #[command(flatten)]
    pub cmode: CmodeOpts,
    #[command(flatten)]
    pub ftf: FtfOpt,
    #[command(flatten)]
    pub subfield: SubfieldOpts,
    #[command(flatten)]
    pub utf8: Utf8Opt,
    /// ISO file encoding.
    #[arg(long, default_value = "cp1252")]
    pub ienc: String,
    /// CSV file encoding.
    #[arg(long, default_value = "utf-8")]
    pub cenc: String,
    /// ISO input file, or - for standard input.
    #[arg(default_value = "-")]
    pub iso_input: String,
    /// CSV output file, or - for standard output.
    #[arg(default_value = "-")]
    pub csv_output: String,
}

/// ISO2709 to CSV.
pub fn iso2csv(args: &Iso2CsvArgs) -> Result<()> {
    let cmode: Mode = args.cmode.cmode.into();
    let ftf = args.ftf.formatter(false)?;
    let sfp = args.subfield.parser(false)?;
    let codec = args.utf8.codec(&args.ienc)?;
    let mut reader = IsoReader::new(open_input(&args.iso_input)?, args.iso.config()?);
    let sink = TranscodingWriter::new(open_output(&args.csv_output)?, &args.cenc)?;
    let mut writer = CsvRecordWriter::new(sink, cmode)?;
    while let Some(record) = reader.read_record()? {
        let ordinal = reader.records_read();
        if args.meta.only_active() && !record.is_active() {
            continue;
        }
        let tl =
            iso_record_to_tl(&record, ordinal, &ftf, true, args.meta.prepend_status())?;
        writer.write_record_rows(&tl_to_value(&tl, cmode, &sfp, &codec)?)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct Csv2IsoArgs {
    #[command(flatten)]
    pub iso: IsoOpts,
    #[command(flatten)]
    pub cmode: CmodeOpts,
    #[command(flatten)]
    pub ftf: FtfOpt,
    #[command(flatten)]
    pub subfield: SubfieldOpts,
    #[command(flatten)]
    pub sfcheck: SfCheckOpt,
    /// CSV file encoding.
    #[arg(long, default_value = "utf-8")]
    pub cenc: String,
    /// ISO file encoding.
    #[arg(long, default_value = "cp1252")]
    pub ienc: String,
    /// CSV input file, or - for standard input.
    #[arg(default_value = "-")]
    pub csv_input: String,
    /// ISO output file, or - for standard output.
    #[arg(default_value = "-")]
    pub iso_output: String,
}

/// CSV to ISO2709.
pub fn csv2iso(args: &Csv2IsoArgs) -> Result<()> {
    let cmode: Mode = args.cmode.cmode.into();
    let ftf = args.ftf.formatter(false)?;
    let sfp = args.subfield.parser(args.sfcheck.enabled())?;
    let codec = ioisis_fields::TextCodec::new(&args.ienc, false)?;
    let source = TranscodingReader::new(open_input(&args.csv_input)?, &args.cenc)?;
    let mut reader = CsvRecordReader::new(source)?;
    let mut writer = IsoWriter::new(open_output(&args.iso_output)?, args.iso.config()?);
    while let Some(rows) = reader.next_record()? {
        let tl = value_to_tl(&rows, cmode, &sfp, &codec, false)?;
        writer.write_record(&tl_to_iso_record(&tl, &ftf)?)?;
    }
    writer.flush()?;
    Ok(())
}
