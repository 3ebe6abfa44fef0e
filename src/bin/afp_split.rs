use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use irpt::afp::splitter::{parse_ranges, ExtractMode};
use irpt::afp::AfpDocument;
use irpt::error::{IRptError, IoKind};
use memmap2::Mmap;
use tracing::{info, Level};

/// Splits an AFP/MO:DCA document down to a chosen page range, producing a
/// standalone, self-consistent AFP file.
#[derive(Parser, Debug)]
struct Arguments {
    #[arg(short = 'v', action = clap::ArgAction::Count, help = "verbose level")]
    verbose: u8,

    #[arg(long = "no-color", action = clap::ArgAction::SetFalse)]
    color: bool,

    #[arg(long, action = clap::ArgAction::SetTrue, help = "raw mode: copy bytes [0, last_selected.end) verbatim")]
    raw: bool,

    input: PathBuf,
    ranges: String,
    output: PathBuf,
}

fn main() -> ExitCode {
    let args = match Arguments::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .with_ansi(args.color)
        .finish();
    _ = tracing::subscriber::set_global_default(subscriber);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            let code = e.downcast_ref::<IRptError>().map(IRptError::exit_code).unwrap_or(10);
            ExitCode::from(code as u8)
        }
    }
}

fn run(args: &Arguments) -> anyhow::Result<()> {
    let file = File::open(&args.input).map_err(|e| IRptError::Io {
        path: args.input.clone(),
        kind: IoKind::Read,
        reason: e.to_string(),
    })?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| IRptError::Io {
        path: args.input.clone(),
        kind: IoKind::Read,
        reason: e.to_string(),
    })?;
    let doc = AfpDocument::parse(&mmap)?;
    info!("parsed {} AFP page(s)", doc.page_count());

    let page_numbers = parse_ranges(&args.ranges, doc.page_count() as u32)?;
    let mode = if args.raw { ExtractMode::Raw } else { ExtractMode::Clean };
    let out = doc.extract(&page_numbers, mode)?;

    fs::write(&args.output, &out).map_err(|e| IRptError::Io {
        path: args.output.clone(),
        kind: IoKind::Write,
        reason: e.to_string(),
    })?;
    info!("wrote {} byte(s) covering {} page(s)", out.len(), page_numbers.len());
    Ok(())
}
