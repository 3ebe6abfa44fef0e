use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use irpt::error::{IRptError, IoKind};
use irpt::rpt::RptDocument;
use irpt::select;
use memmap2::Mmap;
use tracing::{info, Level};

/// Extracts text (and optional binary body) from an RPT archive for a given
/// page selection.
#[derive(Parser, Debug)]
struct Arguments {
    #[arg(short = 'v', action = clap::ArgAction::Count, help = "verbose level")]
    verbose: u8,

    #[arg(long = "no-color", action = clap::ArgAction::SetFalse)]
    color: bool,

    input: PathBuf,
    selection: String,
    out_text: PathBuf,
    out_binary: PathBuf,
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
            ExitCode::from(exit_code_for(&e) as u8)
        }
    }
}

fn exit_code_for(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<IRptError>().map(IRptError::exit_code).unwrap_or(10)
}

fn run(args: &Arguments) -> anyhow::Result<()> {
    let file = File::open(&args.input).map_err(|e| IRptError::Io {
        path: args.input.clone(),
        kind: IoKind::Read,
        reason: e.to_string(),
    })?;
    // Table directory and marker scans require random access; mmap avoids
    // copying potentially large RPT archives into the heap up front.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| IRptError::Io {
        path: args.input.clone(),
        kind: IoKind::Read,
        reason: e.to_string(),
    })?;
    let doc = RptDocument::parse(&mmap)?;
    info!(
        "parsed {} page(s), {} section(s)",
        doc.page_count(),
        doc.sections.len()
    );

    let selection = select::parse(&args.selection)?;
    let page_numbers = select::resolve(&selection, doc.page_count() as u32, &doc.sections)?;

    let text = doc.concat_pages(&page_numbers);
    fs::write(&args.out_text, &text).map_err(|e| IRptError::Io {
        path: args.out_text.clone(),
        kind: IoKind::Write,
        reason: e.to_string(),
    })?;

    let binary = match (&doc.binary_body, &selection) {
        (Some(body), select::Selection::All) => body.clone(),
        _ => Vec::new(),
    };
    fs::write(&args.out_binary, &binary).map_err(|e| IRptError::Io {
        path: args.out_binary.clone(),
        kind: IoKind::Write,
        reason: e.to_string(),
    })?;

    info!(
        "wrote {} byte(s) of text and {} byte(s) of binary",
        text.len(),
        binary.len()
    );
    Ok(())
}
