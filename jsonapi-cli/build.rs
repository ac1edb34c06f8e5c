use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of WRITE_OPERATIONS from src/main.rs
// We need to duplicate this here since build scripts can't access src/ modules
const WRITE_OPERATIONS: &[&str] = &["create", "update", "set", "add", "remove"];

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Path to the JSON document")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("jsonapi")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Read, validate and render JSON:API documents")
        .arg_required_else_help(true)
        .arg(
            Arg::new("schema")
                .long("schema")
                .short('s')
                .help("Path to the resource schema (JSON)")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a jsonapi.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("list-types")
                .long("list-types")
                .help("List the resource types declared by the schema")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log debug output to stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("read")
                .about("Parse a request body as a server would")
                .arg(input_arg())
                .arg(Arg::new("type").long("type").short('t').required(true))
                .arg(Arg::new("relationship").long("relationship").short('r'))
                .arg(
                    Arg::new("write")
                        .long("write")
                        .short('w')
                        .value_parser(clap::builder::PossibleValuesParser::new(WRITE_OPERATIONS)),
                ),
        )
        .subcommand(
            Command::new("operations")
                .about("Validate an atomic:operations batch")
                .arg(input_arg())
                .arg(
                    Arg::new("execute")
                        .long("execute")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Re-render a response document")
                .arg(input_arg())
                .arg(Arg::new("type").long("type").short('t'))
                .arg(Arg::new("include").long("include").short('i'))
                .arg(
                    Arg::new("fields")
                        .long("fields")
                        .short('f')
                        .action(ArgAction::Append),
                )
                .arg(Arg::new("path").long("path")),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "jsonapi", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "jsonapi", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "jsonapi", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
