use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use irpt::error::{IRptError, IoKind};
use irpt::rpt::builder::{build_to_file, BuildInput, BuildPage, BuildSection};
use tracing::{info, Level};

/// Assembles an RPT archive from a header-metadata file and a directory of
/// per-page text files.
///
/// `header-meta` is a line-oriented text file:
/// `domain_id:<n>`, `species_id:<n>`, `timestamp:<text>` (optional), and zero
/// or more `section:<id>,<start_page>,<page_count>` lines.
///
/// `page-dir` contains one file per page, in page order by filename.
#[derive(Parser, Debug)]
struct Arguments {
    #[arg(short = 'v', action = clap::ArgAction::Count, help = "verbose level")]
    verbose: u8,

    #[arg(long = "no-color", action = clap::ArgAction::SetFalse)]
    color: bool,

    header_meta: PathBuf,
    page_dir: PathBuf,
    binary: Option<PathBuf>,
    out: PathBuf,
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

struct HeaderMeta {
    domain_id: i64,
    species_id: i64,
    timestamp: Option<String>,
    sections: Vec<BuildSection>,
}

fn parse_header_meta(text: &str) -> anyhow::Result<HeaderMeta> {
    let mut domain_id = 0i64;
    let mut species_id = 0i64;
    let mut timestamp = None;
    let mut sections = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').ok_or_else(|| IRptError::BadHeader {
            reason: format!("malformed header-meta line: {line:?}"),
        })?;
        match key {
            "domain_id" => domain_id = value.trim().parse()?,
            "species_id" => species_id = value.trim().parse()?,
            "timestamp" => timestamp = Some(value.trim().to_string()),
            "section" => {
                let parts: Vec<&str> = value.split(',').map(str::trim).collect();
                let [id, start, count] = parts.as_slice() else {
                    return Err(IRptError::BadHeader {
                        reason: format!("section line needs 3 fields: {line:?}"),
                    }
                    .into());
                };
                sections.push(BuildSection {
                    section_id: id.parse()?,
                    start_page: start.parse()?,
                    page_count: count.parse()?,
                });
            }
            other => {
                return Err(IRptError::BadHeader {
                    reason: format!("unknown header-meta key: {other:?}"),
                }
                .into())
            }
        }
    }

    Ok(HeaderMeta { domain_id, species_id, timestamp, sections })
}

/// `line_width` is the longest line in bytes; `lines_per_page` counts `\n`
/// terminators (spec §9's resolved Open Question: the unit is bytes).
fn page_metrics(text: &[u8]) -> (u16, u16) {
    let line_width = text
        .split(|&b| b == b'\n')
        .map(|line| line.len())
        .max()
        .unwrap_or(0)
        .min(u16::MAX as usize) as u16;
    let lines_per_page = text.iter().filter(|&&b| b == b'\n').count().min(u16::MAX as usize) as u16;
    (line_width, lines_per_page)
}

fn run(args: &Arguments) -> anyhow::Result<()> {
    let meta_text = fs::read_to_string(&args.header_meta).map_err(|e| IRptError::Io {
        path: args.header_meta.clone(),
        kind: IoKind::Read,
        reason: e.to_string(),
    })?;
    let meta = parse_header_meta(&meta_text)?;

    let mut page_files: Vec<PathBuf> = fs::read_dir(&args.page_dir)
        .map_err(|e| IRptError::Io { path: args.page_dir.clone(), kind: IoKind::Read, reason: e.to_string() })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    page_files.sort();

    let pb: Option<ProgressBar> = if args.verbose == 0 {
        Some(ProgressBar::new(page_files.len() as u64))
    } else {
        None
    };
    if let Some(pb) = &pb {
        pb.set_style(
            ProgressStyle::with_template("[{eta}] [{bar:40}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=> "),
        );
    }

    let mut pages = Vec::with_capacity(page_files.len());
    for path in &page_files {
        let text = fs::read(path).map_err(|e| IRptError::Io { path: path.clone(), kind: IoKind::Read, reason: e.to_string() })?;
        let (line_width, lines_per_page) = page_metrics(&text);
        pages.push(BuildPage { text, line_width, lines_per_page });
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    let binary_body = match &args.binary {
        Some(path) => Some(
            fs::read(path)
                .map_err(|e| IRptError::Io { path: path.clone(), kind: IoKind::Read, reason: e.to_string() })?,
        ),
        None => None,
    };

    let input = BuildInput {
        domain_id: meta.domain_id,
        species_id: meta.species_id,
        timestamp: meta.timestamp,
        pages,
        sections: meta.sections,
        binary_body,
    };

    build_to_file(&input, &args.out)?;
    info!("wrote {}", args.out.display());
    Ok(())
}
