//! Shared option families for the converter subcommands.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use ioisis_fields::{
    FieldTagFormatter, Mode, SubfieldConfig, SubfieldParser, TextCodec, DEFAULT_FTF_TEMPLATE,
};
use ioisis_iso::IsoConfig;
use ioisis_mst::{Dialect, Endianness, Ibp, MstConfig};

/// Decode the C-style escapes (`\n`, `\t`, `\xNN`, ...) accepted by
/// the byte-valued flags.
pub fn unescape_bytes(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('0') => out.push(0),
            Some('\\') => out.push(b'\\'),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    bail!("truncated \\x escape in {text:?}");
                };
                let byte = u8::from_str_radix(&format!("{hi}{lo}"), 16)
                    .with_context(|| format!("bad \\x escape in {text:?}"))?;
                out.push(byte);
            }
            other => bail!("unknown escape \\{} in {text:?}", other.unwrap_or(' ')),
        }
    }
    Ok(out)
}

/// Parse a two-digit hexadecimal byte value.
pub fn hex_byte(text: &str) -> Result<u8> {
    u8::from_str_radix(text, 16).with_context(|| format!("bad hexadecimal byte {text:?}"))
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Field,
    Pairs,
    Nest,
    Inest,
    Tidy,
    Stidy,
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Field => "field",
            Self::Pairs => "pairs",
            Self::Nest => "nest",
            Self::Inest => "inest",
            Self::Tidy => "tidy",
            Self::Stidy => "stidy",
        })
    }
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Field => Mode::Field,
            ModeArg::Pairs => Mode::Pairs,
            ModeArg::Nest => Mode::Nest,
            ModeArg::Inest => Mode::Inest,
            ModeArg::Tidy => Mode::Tidy,
            ModeArg::Stidy => Mode::Stidy,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CmodeArg {
    Tidy,
    Stidy,
}

impl std::fmt::Display for CmodeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tidy => "tidy",
            Self::Stidy => "stidy",
        })
    }
}

impl From<CmodeArg> for Mode {
    fn from(arg: CmodeArg) -> Self {
        match arg {
            CmodeArg::Tidy => Mode::Tidy,
            CmodeArg::Stidy => Mode::Stidy,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EndArg {
    Little,
    Big,
}

impl std::fmt::Display for EndArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Little => "little",
            Self::Big => "big",
        })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    Isis,
    Ffi,
}

impl std::fmt::Display for FormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Isis => "isis",
            Self::Ffi => "ffi",
        })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum IbpArg {
    Check,
    Ignore,
    Store,
}

impl std::fmt::Display for IbpArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Check => "check",
            Self::Ignore => "ignore",
            Self::Store => "store",
        })
    }
}

/// JSONL record structure and field-tag rendering options.
#[derive(Args, Debug)]
pub struct ModeOpts {
    /// Mode for JSONL record structure processing and its
    /// field/subfield parsing. The "tidy" and "stidy" tabular modes
    /// put one field or subfield per row; the remaining modes put
    /// each record in a single JSON object keyed by field tag.
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Field tag format template: %d tag as a number, %r raw tag,
    /// %z tag without leading zeros, %i field index, %% a percent
    /// sign. A printf-like width (with optional zero padding) may sit
    /// between % and the letter.
    #[arg(long, value_name = "TEMPLATE")]
    pub ftf: Option<String>,

    /// Same as --mode=inest --ftf=v%z.
    #[arg(long)]
    pub xylose: bool,
}

impl ModeOpts {
    pub fn mode(&self) -> Mode {
        match self.mode {
            Some(arg) => arg.into(),
            None if self.xylose => Mode::Inest,
            None => Mode::Field,
        }
    }

    pub fn template(&self) -> String {
        match &self.ftf {
            Some(template) => template.clone(),
            None if self.xylose => "v%z".to_string(),
            None => DEFAULT_FTF_TEMPLATE.to_string(),
        }
    }

    pub fn formatter(&self, int_tags: bool) -> Result<FieldTagFormatter> {
        Ok(FieldTagFormatter::new(&self.template(), int_tags)?)
    }
}

/// Field-tag template option alone, for the CSV codec commands
/// (which have no JSONL mode to pair it with).
#[derive(Args, Debug)]
pub struct FtfOpt {
    /// Field tag format template: %d tag as a number, %r raw tag,
    /// %z tag without leading zeros, %i field index, %% a percent
    /// sign.
    #[arg(long, value_name = "TEMPLATE", default_value = DEFAULT_FTF_TEMPLATE)]
    pub ftf: String,
}

impl FtfOpt {
    pub fn formatter(&self, int_tags: bool) -> Result<FieldTagFormatter> {
        Ok(FieldTagFormatter::new(&self.ftf, int_tags)?)
    }
}

/// JSONL mode option alone, for the model-mediated conversions
/// (which translate no field tags).
#[derive(Args, Debug)]
pub struct PlainModeOpt {
    /// Mode for JSONL record structure processing.
    #[arg(short, long, value_enum, default_value_t = ModeArg::Field)]
    pub mode: ModeArg,
}

impl PlainModeOpt {
    pub fn mode(&self) -> Mode {
        self.mode.into()
    }
}

/// CSV record structure options.
#[derive(Args, Debug)]
pub struct CmodeOpts {
    /// Mode for CSV record structure processing: one row per field
    /// (tidy) or per subfield (stidy).
    #[arg(short = 'M', long, value_enum, default_value_t = CmodeArg::Tidy)]
    pub cmode: CmodeArg,
}

/// Subfield parsing options.
#[derive(Args, Debug)]
pub struct SubfieldOpts {
    /// Subfield prefix mark.
    #[arg(long, value_name = "BYTES", default_value = "^")]
    pub prefix: String,

    /// Subfield key length in bytes.
    #[arg(long, default_value_t = 1)]
    pub length: usize,

    /// Put subfield keys in lower case, making them case insensitive.
    #[arg(long, overrides_with = "no_lower")]
    pub lower: bool,
    /// Keep the subfield key case.
    #[arg(long = "no-lower", overrides_with = "lower")]
    pub no_lower: bool,

    /// Key to be used for the first keyless subfield.
    #[arg(long, value_name = "BYTES", default_value = "_")]
    pub first: String,

    /// Keep subfield pairs with empty values.
    #[arg(long, overrides_with = "no_empty")]
    pub empty: bool,
    /// Drop subfield pairs with empty values.
    #[arg(long = "no-empty", overrides_with = "empty")]
    pub no_empty: bool,

    /// Add a number suffix to repeated subfield keys, starting at 1.
    #[arg(long, overrides_with = "no_number")]
    pub number: bool,
    /// Keep repeated subfield keys as they are.
    #[arg(long = "no-number", overrides_with = "number")]
    pub no_number: bool,

    /// Add the "0" suffix to the first of each distinct subfield key.
    /// Has no effect with --no-number.
    #[arg(long, overrides_with = "no_zero")]
    pub zero: bool,
    /// No "0" suffix on first key occurrences.
    #[arg(long = "no-zero", overrides_with = "zero")]
    pub no_zero: bool,
}

impl SubfieldOpts {
    pub fn parser(&self, check: bool) -> Result<SubfieldParser> {
        Ok(SubfieldParser::new(SubfieldConfig {
            prefix: unescape_bytes(&self.prefix)?,
            length: self.length,
            lower: !self.no_lower,
            first: unescape_bytes(&self.first)?,
            empty: self.empty,
            number: !self.no_number,
            zero: self.zero,
            check,
        }))
    }
}

/// Subfield unparse verification, for the building directions.
#[derive(Args, Debug)]
pub struct SfCheckOpt {
    /// Check that the field generated from the subfields would parse
    /// back to the same subfields.
    #[arg(long, overrides_with = "no_sfcheck")]
    pub sfcheck: bool,
    /// Skip the subfield unparse check.
    #[arg(long = "no-sfcheck", overrides_with = "sfcheck")]
    pub no_sfcheck: bool,
}

impl SfCheckOpt {
    pub fn enabled(&self) -> bool {
        !self.no_sfcheck
    }
}

/// Record metadata filtering options.
#[derive(Args, Debug)]
pub struct MetaOpts {
    /// Select only records whose status is active.
    #[arg(long = "only-active", overrides_with = "all")]
    pub only_active: bool,
    /// Keep logically deleted records too.
    #[arg(long, overrides_with = "only_active")]
    pub all: bool,

    /// Prepend the "mfn" field (always on in the tabular modes).
    #[arg(long = "prepend-mfn", overrides_with = "no_mfn")]
    pub prepend_mfn: bool,
    /// No "mfn" field.
    #[arg(long = "no-mfn", overrides_with = "prepend_mfn")]
    pub no_mfn: bool,

    /// Prepend the "status" field, "0" (active) or "1" (logically
    /// deleted).
    #[arg(long = "prepend-status", overrides_with = "no_status")]
    pub prepend_status: bool,
    /// No "status" field.
    #[arg(long = "no-status", overrides_with = "prepend_status")]
    pub no_status: bool,
}

impl MetaOpts {
    pub fn only_active(&self) -> bool {
        !self.all
    }

    pub fn prepend_mfn(&self, mode: Mode) -> bool {
        self.prepend_mfn || mode.is_tabular()
    }

    pub fn prepend_status(&self) -> bool {
        self.prepend_status
    }
}

/// ISO 2709 layout options.
#[derive(Args, Debug)]
pub struct IsoOpts {
    /// ISO field terminator.
    #[arg(long = "ft", value_name = "BYTES", default_value = "#")]
    pub field_terminator: String,

    /// ISO record terminator.
    #[arg(long = "rt", value_name = "BYTES", default_value = "#")]
    pub record_terminator: String,

    /// Line size to wrap the raw ISO data into several lines. If
    /// zero, performs no line splitting.
    #[arg(long = "line", default_value_t = 80)]
    pub line_len: usize,

    /// End of line character/string for ISO line splitting. Ignored
    /// if --line=0.
    #[arg(long = "eol", value_name = "BYTES", default_value = "\\n")]
    pub newline: String,
}

impl IsoOpts {
    pub fn config(&self) -> Result<IsoConfig> {
        Ok(IsoConfig {
            field_terminator: unescape_bytes(&self.field_terminator)?,
            record_terminator: unescape_bytes(&self.record_terminator)?,
            line_len: self.line_len,
            newline: unescape_bytes(&self.newline)?,
        })
    }
}

/// Master-file layout options shared by the reading and writing
/// directions.
#[derive(Args, Debug)]
pub struct MstOpts {
    /// Byte order endianness for 16/32 bits integer numbers. Little
    /// endian is known as "swapped" in CISIS/Bruma.
    #[arg(long = "end", value_enum, default_value_t = EndArg::Little)]
    pub end: EndArg,
    /// Same as --end=little.
    #[arg(long = "le", conflicts_with = "be")]
    pub le: bool,
    /// Same as --end=big.
    #[arg(long = "be")]
    pub be: bool,

    /// Leader and directory format: ISIS (16-bit addressing) or FFI
    /// (32-bit addressing).
    #[arg(long = "format", value_enum, default_value_t = FormatArg::Isis)]
    pub format: FormatArg,
    /// Same as --format=isis.
    #[arg(long = "isis", conflicts_with = "ffi")]
    pub isis: bool,
    /// Same as --format=ffi.
    #[arg(long = "ffi")]
    pub ffi: bool,

    /// Multi-user locking, where the MFRL sign is the record lock
    /// flag. MFRL is unsigned with --no-locks, doubling the maximum
    /// record size.
    #[arg(long, overrides_with = "no_locks")]
    pub lockable: bool,
    /// Interpret MFRL as unsigned.
    #[arg(long = "no-locks", overrides_with = "lockable")]
    pub no_locks: bool,

    /// Legacy shifting interpretation where MSTXL=4 means 3 shift
    /// steps.
    #[arg(long = "shift4is3", overrides_with = "shift4isnt3")]
    pub shift4is3: bool,
    /// Take MSTXL=4 literally.
    #[arg(long = "shift4isnt3", overrides_with = "shift4is3")]
    pub shift4isnt3: bool,

    /// Smallest modulus value for record alignment. The actual
    /// modulus is 2 to the power of MSTXL unless this value is
    /// higher.
    #[arg(long = "min-modulus", default_value_t = 2)]
    pub min_modulus: u32,

    /// No padding/slack bytes in the leader and FFI directory.
    #[arg(long, overrides_with = "unpacked")]
    pub packed: bool,
    /// 4-byte alignment slack in the leader and FFI directory.
    #[arg(long, overrides_with = "packed")]
    pub unpacked: bool,

    /// Character code in hexadecimal for unset filler options.
    #[arg(long, value_name = "HEX_BYTE", default_value = "00")]
    pub filler: String,

    /// Filler for the trailing bytes of the control record.
    #[arg(long = "control-filler", value_name = "HEX_BYTE")]
    pub control_filler: Option<String>,

    /// Filler for alignment slack in leaders and directories.
    #[arg(long = "slack-filler", value_name = "HEX_BYTE")]
    pub slack_filler: Option<String>,

    /// Filler for the trailing recordless bytes of a block.
    #[arg(long = "block-filler", value_name = "HEX_BYTE")]
    pub block_filler: Option<String>,

    /// Filler for the trailing record data.
    #[arg(long = "record-filler", value_name = "HEX_BYTE", default_value = "20")]
    pub record_filler: String,

    /// Control record length, at least 32, a multiple of the modulus.
    #[arg(long = "control-len", default_value_t = 64)]
    pub control_len: u32,
}

impl MstOpts {
    pub fn endianness(&self) -> Endianness {
        if self.le {
            Endianness::Little
        } else if self.be {
            Endianness::Big
        } else {
            match self.end {
                EndArg::Little => Endianness::Little,
                EndArg::Big => Endianness::Big,
            }
        }
    }

    pub fn dialect(&self) -> Dialect {
        if self.isis {
            Dialect::Isis
        } else if self.ffi {
            Dialect::Ffi
        } else {
            match self.format {
                FormatArg::Isis => Dialect::Isis,
                FormatArg::Ffi => Dialect::Ffi,
            }
        }
    }

    pub fn config(&self, default_shift: u8, ibp: Ibp) -> Result<MstConfig> {
        let filler = hex_byte(&self.filler)?;
        let optional = |value: &Option<String>| -> Result<u8> {
            value.as_deref().map_or(Ok(filler), hex_byte)
        };
        let config = MstConfig {
            endianness: self.endianness(),
            format: self.dialect(),
            lockable: !self.no_locks,
            default_shift,
            shift4is3: !self.shift4isnt3,
            min_modulus: self.min_modulus,
            packed: self.packed,
            control_len: self.control_len,
            control_filler: optional(&self.control_filler)?,
            slack_filler: optional(&self.slack_filler)?,
            block_filler: optional(&self.block_filler)?,
            record_filler: hex_byte(&self.record_filler)?,
            ibp,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Extra master-file options for the reading direction.
#[derive(Args, Debug)]
pub struct MstReadOpts {
    #[command(flatten)]
    pub common: MstOpts,

    /// Invalid block padding policy: fail (check), skip (ignore) or
    /// keep the residual bytes in the previous record (store).
    #[arg(long, value_enum, default_value_t = IbpArg::Check)]
    pub ibp: IbpArg,
}

impl MstReadOpts {
    pub fn config(&self) -> Result<MstConfig> {
        let ibp = match self.ibp {
            IbpArg::Check => Ibp::Check,
            IbpArg::Ignore => Ibp::Ignore,
            IbpArg::Store => Ibp::Store,
        };
        // The shift of an existing file comes from its control record.
        self.common.config(ioisis_mst::DEFAULT_SHIFT, ibp)
    }
}

/// Extra master-file options for the writing direction.
#[derive(Args, Debug)]
pub struct MstWriteOpts {
    #[command(flatten)]
    pub common: MstOpts,

    /// MSTXL value, the number of XRF bit shift steps. 0 gives the
    /// standard ISIS behavior, 3 the CISIS FFI behavior; 6 is the
    /// common choice for large files.
    #[arg(long, default_value_t = ioisis_mst::DEFAULT_SHIFT)]
    pub shift: u8,

    /// Also write the companion cross-reference file at this path.
    #[arg(long, value_name = "PATH")]
    pub xrf: Option<std::path::PathBuf>,
}

impl MstWriteOpts {
    pub fn config(&self) -> Result<MstConfig> {
        self.common.config(self.shift, Ibp::Check)
    }
}

/// Hybrid decoding switch for the reading directions.
#[derive(Args, Debug)]
pub struct Utf8Opt {
    /// Decode the input data with UTF-8 if possible, using the given
    /// input encoding as a fallback.
    #[arg(long = "utf8")]
    pub utf8: bool,
}

impl Utf8Opt {
    pub fn codec(&self, label: &str) -> Result<TextCodec> {
        Ok(TextCodec::new(label, self.utf8)?)
    }
}
