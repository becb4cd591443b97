// src/cli.rs

use clap::{Arg, ArgAction, Command};

/// Build the command-line interface for the inspection tool
pub fn build_cli() -> Command {
    Command::new("medialoader")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect media metadata documents: catalogs, selections and playlist ranges")
        .subcommand_required(true)
        .subcommand(
            Command::new("catalog")
                .about("Build and print the format catalog from a metadata JSON file")
                .arg(
                    Arg::new("file")
                        .help("Path to a raw metadata JSON document")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("select")
                .about("Print the filtered label set for a mode/container/codec choice")
                .arg(
                    Arg::new("file")
                        .help("Path to a raw metadata JSON document")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .short('m')
                        .help("Content mode")
                        .value_parser(["audio", "video"])
                        .required(true),
                )
                .arg(
                    Arg::new("container")
                        .long("container")
                        .short('c')
                        .help("Target container (video mode)")
                        .value_parser(["mp4", "webm"]),
                )
                .arg(
                    Arg::new("codec")
                        .long("codec")
                        .help("Preferred video codec (video mode)")
                        .value_parser(["avc1", "av01"]),
                ),
        )
        .subcommand(
            Command::new("ranges")
                .about("Parse a playlist range spec and print membership details")
                .arg(
                    Arg::new("spec")
                        .help("Range spec, e.g. \"1-3,7,10-\"")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("index")
                        .long("index")
                        .short('i')
                        .help("Absolute playlist index to locate within the selection")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .short('q')
                        .help("Only print the parsed ranges")
                        .action(ArgAction::SetTrue),
                ),
        )
}
