//! Pascallite Compiler CLI
//!
//! Command-line interface: compile one source file into a listing and an
//! object-text file.

use clap::Parser as ClapParser;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "plc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pascallite compiler - translate .pas programs to object text", long_about = None)]
struct Cli {
    /// Input Pascallite source file
    source: PathBuf,

    /// Listing output path (line-numbered source plus diagnostics)
    listing: PathBuf,

    /// Object text output path
    object: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    match plc::compile_file(&cli.source, &cli.listing, &cli.object) {
        Ok(()) => {
            println!(
                "Compiled {} -> {}",
                cli.source.display(),
                cli.object.display()
            );
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
