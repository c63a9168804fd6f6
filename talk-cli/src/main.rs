//! Command-line interface for talk
//! This binary parses rendered talk pages, annotates them and compares revisions.
//!
//! Usage:
//!   talk threads `<path>` [--format `<format>`] [--container `<id>`]    - Show the threads of a page
//!   talk annotate `<path>` [--postprocess]                            - Add comment markers to a page
//!   talk new-comments `<old>` `<new>` --author `<name>` [--revision `<id>`] - List comments an edit added
//!
//! Every command accepts `--config <file>` to layer a wiki's settings over the defaults.
//! Logging goes to stderr and is controlled with `RUST_LOG`.

mod commands;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fs;
use talk_config::{Loader, TalkConfig};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("talk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for inspecting and annotating wiki talk pages")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("TOML file layered over the built-in configuration"),
        )
        .arg(
            Arg::new("container")
                .long("container")
                .global(true)
                .help("Id of the element holding the page content"),
        )
        .subcommand(
            Command::new("threads")
                .about("Parse a page and print its threads")
                .arg(Arg::new("path").help("Path to the HTML page").required(true))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(commands::THREAD_FORMATS.to_vec())
                        .default_value("tree"),
                ),
        )
        .subcommand(
            Command::new("annotate")
                .about("Insert comment markers and records into a page")
                .arg(Arg::new("path").help("Path to the HTML page").required(true))
                .arg(
                    Arg::new("postprocess")
                        .long("postprocess")
                        .help("Replace button placeholders as an anonymous reader would see them")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("new-comments")
                .about("List the comments an author added between two revisions")
                .arg(Arg::new("old").help("Old revision").required(true))
                .arg(Arg::new("new").help("New revision").required(true))
                .arg(
                    Arg::new("author")
                        .long("author")
                        .help("User name of the editor")
                        .required(true),
                )
                .arg(
                    Arg::new("revision")
                        .long("revision")
                        .help("Revision id of the new revision")
                        .value_parser(value_parser!(u64))
                        .default_value("0"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<TalkConfig> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if let Some(id) = matches.get_one::<String>("container") {
        loader = loader.set_override("render.container_id", id.as_str())?;
    }
    loader.build().context("Failed to load configuration")
}

fn read(path: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
}

fn run(matches: &ArgMatches) -> Result<String> {
    match matches.subcommand() {
        Some(("threads", sub)) => {
            let config = load_config(sub)?;
            let path = required(sub, "path")?;
            let format = required(sub, "format")?;
            commands::threads(&read(path)?, &config, format)
        }
        Some(("annotate", sub)) => {
            let config = load_config(sub)?;
            let path = required(sub, "path")?;
            commands::annotate(&read(path)?, &config, sub.get_flag("postprocess"))
        }
        Some(("new-comments", sub)) => {
            let config = load_config(sub)?;
            let old = read(required(sub, "old")?)?;
            let new = read(required(sub, "new")?)?;
            let author = required(sub, "author")?;
            let revision = sub.get_one::<u64>("revision").copied().unwrap_or_default();
            commands::new_comments(&old, &new, &config, author, revision)
        }
        _ => anyhow::bail!("Unknown command"),
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("Missing argument '{}'", name))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match run(&matches) {
        Ok(output) => print!("{}", output),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn global_flags_reach_subcommands() {
        let matches = cli()
            .try_get_matches_from(["talk", "threads", "page.html", "--container", "content"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let config = load_config(sub).unwrap();
        assert_eq!(config.render.container_id(), Some("content"));
    }
}
