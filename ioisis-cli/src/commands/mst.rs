//! Master-file conversions.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use clap::Args;

use ioisis_fields::{tl_to_value, value_to_tl, Mode};
use ioisis_mst::{build_xrf, MstReader, MstWriter};

use crate::csv_io::{CsvRecordReader, CsvRecordWriter};
use crate::io::{
    open_input, open_output, open_seekable_output, TranscodingReader, TranscodingWriter,
};
use crate::jsonl::{JsonlReader, JsonlWriter};
use crate::opts::{
    CmodeOpts, FtfOpt, MetaOpts, ModeOpts, MstReadOpts, MstWriteOpts, SfCheckOpt, SubfieldOpts,
    Utf8Opt,
};
use crate::pipeline::{mst_record_to_tl, tl_to_mst_record};

#[derive(Args, Debug)]
pub struct Mst2JsonlArgs {
    #[command(flatten)]
    pub mst: MstReadOpts,
    #[command(flatten)]
    pub meta: MetaOpts,
    #[command(flatten)]
    pub mode: ModeOpts,
    #[command(flatten)]
    pub subfield: SubfieldOpts,
    #[command(flatten)]
    pub utf8: Utf8Opt,
    /// MST file encoding.
    #[arg(long, default_value = "cp1252")]
    pub menc: String,
    /// JSONL file encoding.
    #[arg(long, default_value = "utf-8")]
    pub jenc: String,
    /// MST input file, or - for standard input.
    #[arg(default_value = "-")]
    pub mst_input: String,
    /// JSONL output file, or - for standard output.
    #[arg(default_value = "-")]
    pub jsonl_output: String,
}

/// ISIS/FFI Master File Format to JSON Lines.
pub fn mst2jsonl(args: &Mst2JsonlArgs) -> Result<()> {
    let mode = args.mode.mode();
    let ftf = args.mode.formatter(true)?;
    let sfp = args.subfield.parser(false)?;
    let codec = args.utf8.codec(&args.menc)?;
    let mut reader = MstReader::new(open_input(&args.mst_input)?, args.mst.config()?)?;
    let mut writer = JsonlWriter::new(open_output(&args.jsonl_output)?, &args.jenc)?;
    while let Some(record) = reader.read_record()? {
        if args.meta.only_active() && !record.status.is_active() {
            continue;
        }
        let tl = mst_record_to_tl(
            &record,
            &ftf,
            args.meta.prepend_mfn(mode),
            args.meta.prepend_status(),
        )?;
        writer.write_record(&tl_to_value(&tl, mode, &sfp, &codec)?)?;
    }
    Ok(())
}

fn write_xrf_file(
    path: &std::path::Path,
    build: &ioisis_mst::MstBuild<File>,
    endianness: ioisis_mst::Endianness,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot create cross-reference file {}", path.display()))?;
    build_xrf(&build.xrf, endianness, build.shift, BufWriter::new(file))?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct Jsonl2MstArgs {
    #[command(flatten)]
    pub mst: MstWriteOpts,
    #[command(flatten)]
    pub mode: ModeOpts,
    #[command(flatten)]
    pub subfield: SubfieldOpts,
    #[command(flatten)]
    pub sfcheck: SfCheckOpt,
    /// JSONL file encoding.
    #[arg(long, default_value = "utf-8")]
    pub jenc: String,
    /// MST file encoding.
    #[arg(long, default_value = "cp1252")]
    pub menc: String,
    /// JSONL input file, or - for standard input.
    pub jsonl_input: String,
    /// MST output file path.
    pub mst_output: String,
}

/// JSON Lines to ISIS/FFI Master File Format.
pub fn jsonl2mst(args: &Jsonl2MstArgs) -> Result<()> {
    let mode = args.mode.mode();
    let ftf = args.mode.formatter(true)?;
    let sfp = args.subfield.parser(args.sfcheck.enabled())?;
    let codec = ioisis_fields::TextCodec::new(&args.menc, false)?;
    let config = args.mst.config()?;
    let endianness = config.endianness;
    let mut reader = JsonlReader::new(open_input(&args.jsonl_input)?, &args.jenc, mode)?;
    let mut writer = MstWriter::new(open_seekable_output(&args.mst_output)?, config)?;
    while let Some(value) = reader.next_record()? {
        let tl = value_to_tl(&value, mode, &sfp, &codec, true)?;
        writer.write_record(&tl_to_mst_record(&tl, &ftf)?)?;
    }
    let build = writer.finish()?;
    if let Some(path) = &args.mst.xrf {
        write_xrf_file(path, &build, endianness)?;
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct Mst2CsvArgs {
    #[command(flatten)]
    pub mst: MstReadOpts,
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
    /// MST file encoding.
    #[arg(long, default_value = "cp1252")]
    pub menc: String,
    /// CSV file encoding.
    #[arg(long, default_value = "utf-8")]
    pub cenc: String,
    /// MST input file, or - for standard input.
    #[arg(default_value = "-")]
    pub mst_input: String,
    /// CSV output file, or - for standard output.
    #[arg(default_value = "-")]
    pub csv_output: String,
}

/// ISIS/FFI Master File Format to CSV.
pub fn mst2csv(args: &Mst2CsvArgs) -> Result<()> {
    let cmode: Mode = args.cmode.cmode.into();
    let ftf = args.ftf.formatter(true)?;
    let sfp = args.subfield.parser(false)?;
    let codec = args.utf8.codec(&args.menc)?;
    let mut reader = MstReader::new(open_input(&args.mst_input)?, args.mst.config()?)?;
    let sink = TranscodingWriter::new(open_output(&args.csv_output)?, &args.cenc)?;
    let mut writer = CsvRecordWriter::new(sink, cmode)?;
    while let Some(record) = reader.read_record()? {
        if args.meta.only_active() && !record.status.is_active() {
            continue;
        }
        let tl = mst_record_to_tl(&record, &ftf, true, args.meta.prepend_status())?;
        writer.write_record_rows(&tl_to_value(&tl, cmode, &sfp, &codec)?)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct Csv2MstArgs {
    #[command(flatten)]
    pub mst: MstWriteOpts,
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
    /// MST file encoding.
    #[arg(long, default_value = "cp1252")]
    pub menc: String,
    /// CSV input file, or - for standard input.
    pub csv_input: String,
    /// MST output file path.
    pub mst_output: String,
}

/// CSV to ISIS/FFI Master File Format.
pub fn csv2mst(args: &Csv2MstArgs) -> Result<()> {
    let cmode: Mode = args.cmode.cmode.into();
    let ftf = args.ftf.formatter(true)?;
    let sfp = args.subfield.parser(args.sfcheck.enabled())?;
    let codec = ioisis_fields::TextCodec::new(&args.menc, false)?;
    let config = args.mst.config()?;
    let endianness = config.endianness;
    let source = TranscodingReader::new(open_input(&args.csv_input)?, &args.cenc)?;
    let mut reader = CsvRecordReader::new(source)?;
    let mut writer = MstWriter::new(open_seekable_output(&args.mst_output)?, config)?;
    while let Some(rows) = reader.next_record()? {
        let tl = value_to_tl(&rows, cmode, &sfp, &codec, true)?;
        writer.write_record(&tl_to_mst_record(&tl, &ftf)?)?;
    }
    let build = writer.finish()?;
    if let Some(path) = &args.mst.xrf {
        write_xrf_file(path, &build, endianness)?;
    }
    Ok(())
}
