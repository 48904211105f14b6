// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use blkvol::partition::{BlockId, Partition, DEFAULT_SPLIT_THRESHOLD};
use blkvol::repl::{self, Session};
use blkvol::result::ExitClass;

/// A single-file block storage partition with a small hierarchical
/// filesystem overlay, driven by a line-oriented command interpreter
/// on stdin.
#[derive(Parser, Debug)]
#[command(name = "blkvol", version, about)]
struct Cli {
    /// Path to the partition file. Created if it doesn't exist.
    path: PathBuf,

    /// Size of the partition, used only when creating a new file.
    #[arg(long, default_value = "1M", value_parser = parse_size)]
    size: u64,

    /// Minimum remainder size a split leaves behind; smaller
    /// remainders are absorbed into the allocation instead.
    #[arg(long, default_value_t = DEFAULT_SPLIT_THRESHOLD)]
    split_threshold: u64,
}

fn parse_size(s: &str) -> Result<u64, String> {
    repl::reader::parse_len(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = run(&cli);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            match e.exit_class() {
                Some(ExitClass::Io) => ExitCode::from(2),
                Some(ExitClass::Corruption) => ExitCode::from(3),
                None => ExitCode::from(1),
            }
        }
    }
}

fn run(cli: &Cli) -> blkvol::result::Result<()> {
    let mut partition = if cli.path.exists() {
        Partition::open(&cli.path, cli.split_threshold)?
    } else {
        Partition::create(&cli.path, cli.size, cli.split_threshold)?
    };
    let cwd = partition.root().unwrap_or(BlockId::NULL);
    let mut session = Session { partition, cwd };

    repl::run(&mut session, std::io::stdin())
}
