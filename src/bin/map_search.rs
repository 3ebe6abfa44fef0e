use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use irpt::error::{IRptError, IoKind};
use irpt::map::{MapIndex, MapSchema};
use memmap2::Mmap;
use tracing::{info, Level};

/// Binary-searches a MAP index file for pages matching `(line_id, field_id,
/// value)`. The record layout is producer-defined (spec §6), so the schema
/// flags below describe it; the defaults match the fixed-width layout this
/// toolkit's own `build` path never writes but real MAP producers commonly
/// use (see DESIGN.md for the full rationale).
#[derive(Parser, Debug)]
struct Arguments {
    #[arg(short = 'v', action = clap::ArgAction::Count, help = "verbose level")]
    verbose: u8,

    #[arg(long = "no-color", action = clap::ArgAction::SetFalse)]
    color: bool,

    #[arg(long, action = clap::ArgAction::SetTrue, help = "list distinct values for (line_id, field_id) instead of searching")]
    list_values: bool,

    #[arg(long, default_value_t = 20)]
    record_size: usize,
    #[arg(long, default_value_t = 0)]
    line_id_offset: usize,
    #[arg(long, default_value_t = 4)]
    field_id_offset: usize,
    #[arg(long, default_value_t = 8)]
    value_offset: usize,
    #[arg(long, default_value_t = 8)]
    value_len: usize,
    #[arg(long, default_value_t = 16)]
    page_offset: usize,

    map_file: PathBuf,
    line_id: u32,
    field_id: u32,
    #[arg(required_unless_present = "list_values")]
    value: Option<String>,
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

/// Encodes `text` as UTF-8, truncated or zero-padded to exactly `value_len`
/// bytes so it can be compared against a fixed-width MAP value field.
fn encode_value(text: &str, value_len: usize) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(value_len, 0);
    bytes
}

fn run(args: &Arguments) -> anyhow::Result<()> {
    let file = File::open(&args.map_file).map_err(|e| IRptError::Io {
        path: args.map_file.clone(),
        kind: IoKind::Read,
        reason: e.to_string(),
    })?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| IRptError::Io {
        path: args.map_file.clone(),
        kind: IoKind::Read,
        reason: e.to_string(),
    })?;
    let schema = MapSchema {
        record_size: args.record_size,
        line_id_offset: args.line_id_offset,
        field_id_offset: args.field_id_offset,
        value_offset: args.value_offset,
        value_len: args.value_len,
        page_offset: args.page_offset,
    };
    let index = MapIndex::new(&mmap, schema)?;
    info!("loaded {} record(s)", index.record_count());

    if args.list_values {
        let values = index.list_distinct_values(args.line_id, args.field_id);
        for value in values {
            println!("{}", String::from_utf8_lossy(&value).trim_end_matches('\0'));
        }
        return Ok(());
    }

    let value_text = args.value.as_deref().expect("required_unless_present enforces this");
    let value = encode_value(value_text, args.value_len);
    let pages = index.search(args.line_id, args.field_id, &value);
    for page in &pages {
        println!("{page}");
    }
    info!("{} page(s) matched", pages.len());
    Ok(())
}
