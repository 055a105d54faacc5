use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ioisis_cli::commands::convert::{
    csv2jsonl, jsonl2csv, Csv2JsonlArgs, Jsonl2CsvArgs,
};
use ioisis_cli::commands::iso::{
    csv2iso, iso2csv, iso2jsonl, jsonl2iso, Csv2IsoArgs, Iso2CsvArgs, Iso2JsonlArgs,
    Jsonl2IsoArgs,
};
use ioisis_cli::commands::mst::{
    csv2mst, jsonl2mst, mst2csv, mst2jsonl, Csv2MstArgs, Jsonl2MstArgs, Mst2CsvArgs,
    Mst2JsonlArgs,
};
use ioisis_cli::io::is_broken_pipe;

#[derive(Parser)]
#[command(
    name = "ioisis",
    about = "ISIS data converter for the ISO 2709 and MST/XRF formats",
    version,
    long_about = "Converts between the CDS/ISIS bibliographic file formats (ISO 2709 \
                  interchange files and MST/XRF master files) and JSON Lines or CSV. \
                  Every command can also be called by the acronym built from the first \
                  letters of the formats around the \"2\" (e.g. \"i2j\" for \"iso2jsonl\")."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// ISO2709 to JSON Lines.
    #[command(name = "iso2jsonl", alias = "i2j")]
    Iso2Jsonl(Iso2JsonlArgs),

    /// JSON Lines to ISO2709.
    #[command(name = "jsonl2iso", alias = "j2i")]
    Jsonl2Iso(Jsonl2IsoArgs),

    /// ISIS/FFI Master File Format to JSON Lines.
    #[command(name = "mst2jsonl", alias = "m2j")]
    Mst2Jsonl(Mst2JsonlArgs),

    /// JSON Lines to ISIS/FFI Master File Format.
    #[command(name = "jsonl2mst", alias = "j2m")]
    Jsonl2Mst(Jsonl2MstArgs),

    /// ISO2709 to CSV.
    #[command(name = "iso2csv", alias = "i2c")]
    Iso2Csv(Iso2CsvArgs),

    /// CSV to ISO2709.
    #[command(name = "csv2iso", alias = "c2i")]
    Csv2Iso(Csv2IsoArgs),

    /// ISIS/FFI Master File Format to CSV.
    #[command(name = "mst2csv", alias = "m2c")]
    Mst2Csv(Mst2CsvArgs),

    /// CSV to ISIS/FFI Master File Format.
    #[command(name = "csv2mst", alias = "c2m")]
    Csv2Mst(Csv2MstArgs),

    /// JSON Lines to CSV.
    #[command(name = "jsonl2csv", alias = "j2c")]
    Jsonl2Csv(Jsonl2CsvArgs),

    /// CSV to JSON Lines.
    #[command(name = "csv2jsonl", alias = "c2j")]
    Csv2Jsonl(Csv2JsonlArgs),
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Iso2Jsonl(args) => iso2jsonl(args),
        Command::Jsonl2Iso(args) => jsonl2iso(args),
        Command::Mst2Jsonl(args) => mst2jsonl(args),
        Command::Jsonl2Mst(args) => jsonl2mst(args),
        Command::Iso2Csv(args) => iso2csv(args),
        Command::Csv2Iso(args) => csv2iso(args),
        Command::Mst2Csv(args) => mst2csv(args),
        Command::Csv2Mst(args) => csv2mst(args),
        Command::Jsonl2Csv(args) => jsonl2csv(args),
        Command::Csv2Jsonl(args) => csv2jsonl(args),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(&cli) {
        // A broken pipe downstream (ioisis ... | head) is a clean
        // early exit, not a failure.
        if is_broken_pipe(&error) {
            return;
        }
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
