//! `bpatch` - apply a binary patch produced by `bdiff -b`

use bdiff::logging::init_logging;
use bdiff::{BdiffError, PatchApplier, PatchError};
use clap::{ArgAction, CommandFactory, Parser};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "bpatch",
    about = "Apply a binary delta to a file",
    override_usage = "bpatch [options] OLD [NEW]",
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct Cli {
    /// Read the patch from FILE instead of stdin ('-' means stdin)
    #[arg(short = 'i', long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Report progress on stderr; repeat for more detail
    #[arg(short = 'V', long, action = ArgAction::Count)]
    verbose: u8,

    /// Print help and exit
    #[arg(short = 'h', long)]
    help: bool,

    /// Print version and exit
    #[arg(short = 'v', long)]
    version: bool,

    /// OLD is patched into NEW, which defaults to OLD
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("bpatch: {}", BdiffError::from(e));
            return ExitCode::FAILURE;
        }
    };

    if cli.help {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }
    if cli.version {
        println!("bpatch {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("bpatch: logging disabled: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(kind = ?e.kind(), "bpatch failed");
            eprintln!("bpatch: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BdiffError> {
    let (source, dest) = match cli.files.as_slice() {
        [old] => (old, old),
        [old, new] => (old, new),
        [] => return Err(BdiffError::Usage("file name argument missing".to_string())),
        _ => {
            return Err(BdiffError::Usage(
                "too many file names on command line".to_string(),
            ));
        }
    };

    let patch: Box<dyn Read> = match cli.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            Box::new(File::open(path).map_err(|source| PatchError::OpenPatch {
                path: path.to_path_buf(),
                source,
            })?)
        }
        _ => Box::new(io::stdin().lock()),
    };

    info!(source = %source.display(), dest = %dest.display(), "applying patch");
    let summary = PatchApplier::default().apply(patch, source, dest)?;
    info!(
        bytes = summary.dest_len,
        copies = summary.copies,
        inserts = summary.inserts,
        "done"
    );
    Ok(())
}
