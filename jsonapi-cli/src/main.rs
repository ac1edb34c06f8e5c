// Command-line interface for the JSON:API codec
//
// The jsonapi program is a thin shell over jsonapi-codec: every command loads a resource
// schema (a JSON file listing resource types, see ResourceGraph::from_json), reads one
// JSON document from disk and prints JSON to stdout.
//
// Usage:
//  jsonapi read <input> --schema <file> --type <type> [--relationship <name>] [--write <op>]
//      Read a request body the way a server would and print the parsed resources together
//      with the fields the request assigned.
//  jsonapi operations <input> --schema <file> [--execute]
//      Read and validate an atomic:operations batch. With --execute the batch is replayed
//      against an in-memory store and the atomic:results document is printed.
//  jsonapi render <input> --schema <file> [--include <paths>] [--fields <type=a,b>]...
//      Read a response document the way a client would, then render it again through the
//      response adapter with the configured options, links and the requested include and
//      sparse fieldsets.
//  jsonapi --list-types --schema <file>
//      List the resource types declared by the schema.
//
// Rejected documents are reported as a JSON:API error document on stdout with exit code 1.
// Logging goes to stderr and is controlled by RUST_LOG, or forced to debug by --verbose.
// Any configuration key can also be set through the environment, e.g. JSONAPI_LINKS__BASE_URL.

mod dry_run;
mod views;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use dry_run::DryRunStore;
use jsonapi_codec::query::IncludeParseError;
use jsonapi_codec::resources::SchemaError;
use jsonapi_codec::{
    encode_pretty, ClientReader, CodecError, Data, Document, IncludeExpression,
    LocalIdValidator, OperationsProcessor, OperationsReader, RequestScope, ResourceGraph,
    ResponseAdapter, ResponsePayload, ServerReader, SparseFieldSetCache, SparseFieldSets,
    WriteOperationKind,
};
use jsonapi_config::{CodecConfig, Loader};
use std::fs;
use std::process;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Values accepted by `read --write`.
const WRITE_OPERATIONS: &[&str] = &["create", "update", "set", "add", "remove"];

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid --include: {0}")]
    Include(#[from] IncludeParseError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
    /// The codec rejected the input; the document describes why.
    #[error("document rejected")]
    Rejected(Box<Document>),
}

impl From<CodecError> for CliError {
    fn from(err: CodecError) -> Self {
        if err.kind.is_internal() {
            tracing::error!(kind = ?err.kind, detail = %err.detail, "codec failed internally");
        }
        CliError::Rejected(Box::new(err.into_document()))
    }
}

fn build_cli() -> Command {
    Command::new("jsonapi")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Read, validate and render JSON:API documents")
        .long_about(
            "jsonapi reads JSON:API 1.1 documents against a resource schema.\n\n\
            Commands:\n  \
            - read:       Parse a request body as a server would\n  \
            - operations: Validate (and dry-run) an atomic:operations batch\n  \
            - render:     Re-render a response document with include and fieldsets\n\n\
            Configuration is read from ./jsonapi.toml when present, or from --config.\n\n\
            Examples:\n  \
            jsonapi read body.json --schema schema.json --type articles\n  \
            jsonapi operations batch.json --schema schema.json --execute\n  \
            jsonapi render response.json --schema schema.json --include author\n  \
            jsonapi --list-types --schema schema.json",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("schema")
                .long("schema")
                .short('s')
                .value_name("FILE")
                .help("Path to the resource schema (JSON)")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
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
                .arg(
                    Arg::new("type")
                        .long("type")
                        .short('t')
                        .value_name("TYPE")
                        .help("Resource type of the endpoint")
                        .required(true),
                )
                .arg(
                    Arg::new("relationship")
                        .long("relationship")
                        .short('r')
                        .value_name("NAME")
                        .help("Read the body of a relationship endpoint"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .short('w')
                        .value_name("OP")
                        .help("Write operation the body belongs to (create or set by default)")
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
                        .help("Replay the batch against an in-memory store and print the results")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Re-render a response document")
                .arg(input_arg())
                .arg(
                    Arg::new("type")
                        .long("type")
                        .short('t')
                        .value_name("TYPE")
                        .help("Primary resource type (inferred from the data when omitted)"),
                )
                .arg(
                    Arg::new("include")
                        .long("include")
                        .short('i')
                        .value_name("PATHS")
                        .help("Relationship paths to include, e.g. 'author,comments.author'"),
                )
                .arg(
                    Arg::new("fields")
                        .long("fields")
                        .short('f')
                        .value_name("TYPE=FIELDS")
                        .help("Sparse fieldset, e.g. 'articles=title,author' (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("path")
                        .long("path")
                        .value_name("PATH")
                        .help("Request path for the top-level self link (defaults to /<type>)"),
                ),
        )
}

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Path to the JSON document")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));

    let result = if matches.get_flag("list-types") {
        handle_list_types(&matches)
    } else {
        match matches.subcommand() {
            Some(("read", sub_matches)) => handle_read(sub_matches, &config),
            Some(("operations", sub_matches)) => handle_operations(sub_matches, &config),
            Some(("render", sub_matches)) => handle_render(sub_matches, &config),
            _ => Err(CliError::Usage("no command given; see 'jsonapi --help'".to_string())),
        }
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(CliError::Rejected(document)) => {
            match serde_json::to_string_pretty(&document) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("Error: {err}"),
            }
            process::exit(1);
        }
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from ./jsonapi.toml, an optional explicit file and JSONAPI_* variables.
fn load_cli_config(explicit_path: Option<&str>) -> CodecConfig {
    let loader = Loader::new().with_optional_file("jsonapi.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };
    let loader = loader.with_environment();

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        process::exit(1);
    })
}

fn read_file(path: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })
}

fn load_schema(matches: &ArgMatches) -> Result<ResourceGraph, CliError> {
    let path = matches
        .get_one::<String>("schema")
        .ok_or_else(|| CliError::Usage("--schema <FILE> is required".to_string()))?;
    let graph = ResourceGraph::from_json(&read_file(path)?)?;
    tracing::debug!(path = %path, "loaded schema");
    Ok(graph)
}

fn input_text(matches: &ArgMatches) -> Result<String, CliError> {
    let path = matches
        .get_one::<String>("input")
        .ok_or_else(|| CliError::Usage("an input file is required".to_string()))?;
    read_file(path)
}

fn handle_list_types(matches: &ArgMatches) -> Result<String, CliError> {
    let graph = load_schema(matches)?;
    Ok(graph.list_types().join("\n"))
}

fn write_operation(name: Option<&str>, relationship: bool) -> WriteOperationKind {
    match (name, relationship) {
        (Some("update"), _) => WriteOperationKind::UpdateResource,
        (Some("add"), _) => WriteOperationKind::AddToRelationship,
        (Some("remove"), _) => WriteOperationKind::RemoveFromRelationship,
        (Some("set"), _) | (None, true) => WriteOperationKind::SetRelationship,
        _ => WriteOperationKind::CreateResource,
    }
}

fn handle_read(matches: &ArgMatches, config: &CodecConfig) -> Result<String, CliError> {
    let graph = load_schema(matches)?;
    let text = input_text(matches)?;
    let options = config.codec_options();

    let type_name = matches
        .get_one::<String>("type")
        .ok_or_else(|| CliError::Usage("--type <TYPE> is required".to_string()))?;
    let relationship = matches.get_one::<String>("relationship");
    let operation = write_operation(
        matches.get_one::<String>("write").map(|s| s.as_str()),
        relationship.is_some(),
    );
    let scope = match relationship {
        Some(name) => RequestScope::relationship(type_name.as_str(), name.as_str()),
        None => RequestScope::primary(type_name.as_str()),
    }
    .with_write_operation(operation);
    if scope.targets_relationship() && relationship.is_none() {
        return Err(CliError::Usage(format!(
            "{operation} needs --relationship <NAME>"
        )));
    }

    let mut reader = ServerReader::server(&graph, &options, scope);
    let body = reader.read_body(&text)?;
    let view = views::request_body(&body, reader.hook())?;
    Ok(serde_json::to_string_pretty(&view)?)
}

fn handle_operations(matches: &ArgMatches, config: &CodecConfig) -> Result<String, CliError> {
    let graph = load_schema(matches)?;
    let text = input_text(matches)?;
    let options = config.codec_options();

    if matches.get_flag("execute") {
        let links = config.link_builder();
        let mut selector = SparseFieldSetCache::new(SparseFieldSets::new());
        let mut processor = OperationsProcessor::new(&graph, &options, &mut selector, &links);
        let mut store = DryRunStore::new(&graph);
        let document = processor
            .process_text(&text, &mut store)
            .map_err(|err| CliError::Rejected(Box::new(err.into_document())))?;
        return Ok(encode_pretty(&document)?);
    }

    let operations = OperationsReader::new(&graph, &options).read_batch(&text)?;
    LocalIdValidator::validate(&operations)?;
    let view = views::operations(&operations)?;
    Ok(serde_json::to_string_pretty(&view)?)
}

/// Turn repeated `type=a,b` arguments into sparse fieldsets.
fn parse_fieldsets<'a, I>(values: I) -> Result<SparseFieldSets, CliError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut pairs = Vec::new();
    for value in values {
        let (type_name, fields) = value.split_once('=').ok_or_else(|| {
            CliError::Usage(format!("invalid --fields '{value}': expected TYPE=FIELDS"))
        })?;
        pairs.push((format!("fields[{}]", type_name.trim()), fields));
    }
    Ok(SparseFieldSets::parse_query(
        pairs.iter().map(|(key, fields)| (key.as_str(), *fields)),
    ))
}

fn handle_render(matches: &ArgMatches, config: &CodecConfig) -> Result<String, CliError> {
    let graph = load_schema(matches)?;
    let text = input_text(matches)?;
    let options = config.codec_options();

    let response = ClientReader::client(&graph, &options).read_response(&text)?;
    let payload = if !response.errors.is_empty() {
        ResponsePayload::Errors(response.errors)
    } else {
        match response.data {
            Data::Absent | Data::Null => ResponsePayload::Null,
            Data::Single(resource) => ResponsePayload::Single(resource),
            Data::Many(resources) => ResponsePayload::Many(resources),
        }
    };

    let inferred = match &payload {
        ResponsePayload::Single(resource) => Some(resource.type_name.clone()),
        ResponsePayload::Many(resources) => resources.first().map(|r| r.type_name.clone()),
        _ => None,
    };
    let type_name = match (matches.get_one::<String>("type"), inferred) {
        (Some(explicit), _) => explicit.clone(),
        (None, Some(inferred)) => inferred,
        (None, None) if matches!(payload, ResponsePayload::Errors(_)) => String::new(),
        (None, None) => {
            return Err(CliError::Usage(
                "cannot infer the primary resource type from empty data; pass --type".to_string(),
            ));
        }
    };

    let fieldsets = parse_fieldsets(matches.get_many::<String>("fields").into_iter().flatten())?;
    let path = matches
        .get_one::<String>("path")
        .cloned()
        .unwrap_or_else(|| format!("/{type_name}"));
    let mut scope = RequestScope::primary(type_name).with_request_path(path);
    // Without --include the document carries no `included` member at all.
    if let Some(text) = matches.get_one::<String>("include") {
        scope = scope.with_include(IncludeExpression::parse(text)?);
    }

    let links = config.link_builder();
    let mut selector = SparseFieldSetCache::new(fieldsets);
    let mut adapter = ResponseAdapter::new(&graph, &mut selector, &links, &options, scope);
    if !response.meta.is_empty() {
        adapter = adapter.with_meta(response.meta);
    }
    let document = adapter.convert(&payload)?;
    Ok(encode_pretty(&document)?)
}
