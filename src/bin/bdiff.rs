//! `bdiff` - compute a patch turning OLD into NEW

use bdiff::diff::load_file;
use bdiff::logging::init_logging;
use bdiff::{
    BdiffError, DiffConfig, DiffEncoder, DiffError, Labels, PatchFormat, parse_min_match_length,
};
use clap::{ArgAction, CommandFactory, Parser};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "bdiff",
    about = "Compute a binary delta between two files",
    override_usage = "bdiff [options] OLD NEW",
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct Cli {
    /// Quoted text output (default)
    #[arg(short = 'q', overrides_with_all = ["filtered", "binary", "format"])]
    quoted: bool,

    /// Filtered text output, non-printable bytes shown as '.'
    #[arg(short = 'f', overrides_with_all = ["quoted", "binary", "format"])]
    filtered: bool,

    /// Binary output, the only format bpatch accepts
    #[arg(short = 'b', overrides_with_all = ["quoted", "filtered", "format"])]
    binary: bool,

    /// Output format: quoted, filter[ed] or binary
    #[arg(long, value_name = "FMT", overrides_with_all = ["quoted", "filtered", "binary"])]
    format: Option<String>,

    /// Minimum length of a copied span (1..=32767, default 24)
    #[arg(short = 'm', long = "min-equal", value_name = "N")]
    min_equal: Option<String>,

    /// Report progress on stderr; repeat for more detail
    #[arg(short = 'V', long, action = ArgAction::Count)]
    verbose: u8,

    /// Write the patch to FILE instead of stdout ('-' means stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print help and exit
    #[arg(short = 'h', long)]
    help: bool,

    /// Print version and exit
    #[arg(short = 'v', long)]
    version: bool,

    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

impl Cli {
    fn config(&self) -> Result<DiffConfig, BdiffError> {
        let format = if self.quoted {
            PatchFormat::Quoted
        } else if self.filtered {
            PatchFormat::Filtered
        } else if self.binary {
            PatchFormat::Binary
        } else if let Some(name) = &self.format {
            name.parse::<PatchFormat>()?
        } else {
            PatchFormat::default()
        };

        let mut config = DiffConfig::default().with_format(format);
        if let Some(text) = &self.min_equal {
            config.min_match_length = parse_min_match_length(text)?;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("bdiff: {}", BdiffError::from(e));
            return ExitCode::FAILURE;
        }
    };

    if cli.help {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }
    if cli.version {
        println!("bdiff {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("bdiff: logging disabled: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(kind = ?e.kind(), "bdiff failed");
            eprintln!("bdiff: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BdiffError> {
    let (old_path, new_path) = match cli.files.as_slice() {
        [old, new] => (old, new),
        [_, _, ..] => {
            return Err(BdiffError::Usage(
                "too many file names on command line".to_string(),
            ));
        }
        _ => return Err(BdiffError::Usage("need two filenames".to_string())),
    };
    let config = cli.config()?;
    debug!(format = %config.format, min_match_length = config.min_match_length, "configured");

    info!("loading old file");
    let old = load_file(old_path)?;
    info!("loading new file");
    let new = load_file(new_path)?;

    let old_label = old_path.display().to_string();
    let new_label = new_path.display().to_string();
    let labels = Labels {
        old: &old_label,
        new: &new_label,
    };

    let encoder = DiffEncoder::new(config);
    let summary = match cli.output.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::create(path).map_err(|source| DiffError::CreateOutput {
                path: path.to_path_buf(),
                source,
            })?;
            encoder.encode(&old, &new, labels, BufWriter::new(file))?
        }
        _ => encoder.encode(&old, &new, labels, BufWriter::new(io::stdout().lock()))?,
    };

    debug!(
        inserts = summary.inserts,
        copies = summary.copies,
        "wrote patch"
    );
    Ok(())
}
