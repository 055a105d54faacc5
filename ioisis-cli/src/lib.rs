//! Library side of the `ioisis` command-line converter.
//!
//! Everything the binary does lives here, so the conversion pipelines
//! stay testable: option families (`opts`), stream plumbing (`io`),
//! the JSONL/CSV adapters, the record ⇄ tidy-list glue (`pipeline`)
//! and the subcommand handlers (`commands`).

pub mod commands;
pub mod csv_io;
pub mod io;
pub mod jsonl;
pub mod opts;
pub mod pipeline;
