// src/main.rs

use colored::*;
use env_logger::Builder;
use log::{debug, info, LevelFilter};
use medialoader::cli::build_cli;
use medialoader::error::AppError;
use medialoader::formats::FormatCatalog;
use medialoader::metadata::RawInfo;
use medialoader::playlist::PlaylistRangeSet;
use medialoader::selection::select_mode_formats;
use std::fs;
use std::io::Write;

fn main() -> Result<(), AppError> {
    init_logger();
    info!(
        "medialoader inspection tool starting - version {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = build_cli().get_matches();
    match matches.subcommand() {
        Some(("catalog", sub)) => {
            let path = sub.get_one::<String>("file").expect("required arg");
            let catalog = load_catalog(path)?;
            print_catalog(&catalog);
        }
        Some(("select", sub)) => {
            let path = sub.get_one::<String>("file").expect("required arg");
            let mode = sub.get_one::<String>("mode").expect("required arg");
            let container = sub
                .get_one::<String>("container")
                .map(String::as_str)
                .unwrap_or("");
            let codec = sub
                .get_one::<String>("codec")
                .map(String::as_str)
                .unwrap_or("");
            let catalog = load_catalog(path)?;
            let selection = select_mode_formats(mode, container, codec, &catalog);
            if selection.is_empty() {
                println!(
                    "{}",
                    "No selectable formats for that mode/container/codec".yellow()
                );
            } else {
                if selection.codec_fallback_used {
                    println!(
                        "{}",
                        "Note: chosen codec unavailable, matching any codec".yellow()
                    );
                }
                for label in selection.labels() {
                    println!("  {}", label);
                }
            }
        }
        Some(("ranges", sub)) => {
            let spec = sub.get_one::<String>("spec").expect("required arg");
            let ranges = PlaylistRangeSet::parse(spec);
            println!("Parsed ranges: {:?}", ranges.ranges());
            if !sub.get_flag("quiet") {
                match ranges.total_count() {
                    Some(total) => println!("Total items: {}", total),
                    None => println!("Total items: open-ended"),
                }
                if let Some(index) = sub.get_one::<u64>("index") {
                    match ranges.position_of(*index) {
                        Some(position) => {
                            println!("Index {} is item {} of the selection", index, position)
                        }
                        None => println!(
                            "{}",
                            format!("Index {} is outside the selection", index).yellow()
                        ),
                    }
                }
            }
        }
        _ => unreachable!("subcommand required"),
    }
    Ok(())
}

fn load_catalog(path: &str) -> Result<FormatCatalog, AppError> {
    debug!("reading metadata document {}", path);
    let raw = fs::read_to_string(path)?;
    let info: RawInfo = serde_json::from_str(&raw)?;
    Ok(FormatCatalog::from_info(&info))
}

fn print_catalog(catalog: &FormatCatalog) {
    if !catalog.preview_title.is_empty() {
        println!("{}", catalog.preview_title.bold());
    }
    println!("{}", "Video formats:".bright_cyan());
    if catalog.video.is_empty() {
        println!("  (none)");
    }
    for (label, _) in &catalog.video {
        println!("  {}", label);
    }
    println!("{}", "Audio formats:".bright_cyan());
    for (label, _) in &catalog.audio {
        println!("  {}", label);
    }
    if !catalog.audio_languages.is_empty() {
        println!("Audio languages: {}", catalog.audio_languages.join(", "));
    }
}

fn init_logger() {
    // Custom format with timestamp, level, module and message
    let mut builder = Builder::from_default_env();
    if cfg!(debug_assertions) {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder.filter_level(LevelFilter::Info);
    }
    builder.format(|buf, record| {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        writeln!(
            buf,
            "[{} {} {}] {}",
            timestamp,
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });
    builder.parse_env("RUST_LOG");
    builder.init();
}
