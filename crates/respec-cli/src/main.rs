use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use respec_core::config::{self, CONFIG_FILE_NAME};
use respec_core::{Format, Node, ParseOptions, Resource, SpecError, Strictness};

#[derive(Parser)]
#[command(name = "respec", about = "Inspect OpenAPI and RAML resources", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one path of an API document and print the resulting resource
    Inspect {
        /// Path to the API document (JSON, YAML or RAML)
        #[arg(short, long)]
        input: PathBuf,

        /// Requested path, e.g. `/foo/:fooId` or `/foo/12`
        #[arg(short, long)]
        path: String,

        /// Document format; detected from the document when omitted
        #[arg(long)]
        format: Option<FormatArg>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        output: OutputFormat,

        /// Reject constraints that do not fit the declared type
        #[arg(long)]
        strict: bool,
    },

    /// Parse every declared path of an API document
    Check {
        /// Path to the API document
        #[arg(short, long)]
        input: PathBuf,

        /// Document format; detected from the document when omitted
        #[arg(long)]
        format: Option<FormatArg>,

        /// Reject constraints that do not fit the declared type
        #[arg(long)]
        strict: bool,
    },

    /// Initialize a new respec configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Openapi,
    Raml,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Openapi => Format::OpenApi,
            FormatArg::Raml => Format::Raml,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            input,
            path,
            format,
            output,
            strict,
        } => cmd_inspect(&input, &path, format, output, strict),

        Commands::Check {
            input,
            format,
            strict,
        } => cmd_check(&input, format, strict),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "respec", &mut io::stdout());
            Ok(())
        }
    }
}

/// Parse options from the config file in the current directory, with the
/// `--strict` flag taking precedence.
fn load_options(strict: bool) -> Result<ParseOptions> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    let mut options = config::load_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?
        .unwrap_or_default();
    if strict {
        options.strictness = Strictness::Strict;
    }
    Ok(options)
}

/// Read an API document into the generic tree. `.json` files go through the
/// JSON tokenizer, everything else (`.yaml`, `.yml`, `.raml`) through YAML.
fn load_document(path: &Path) -> Result<Node, SpecError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            SpecError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            SpecError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");
    match ext {
        "json" => Node::from_json_str(&content),
        _ => Node::from_yaml_str(&content),
    }
}

fn resolve_format(document: &Node, format: Option<FormatArg>) -> Result<Format> {
    match format {
        Some(arg) => Ok(arg.into()),
        None => Format::detect(document).context("pass --format to choose one explicitly"),
    }
}

fn cmd_inspect(
    input: &Path,
    path: &str,
    format: Option<FormatArg>,
    output: OutputFormat,
    strict: bool,
) -> Result<()> {
    let options = load_options(strict)?;
    let document = load_document(input)?;
    let format = resolve_format(&document, format)?;
    log::info!("inspecting {path} in {} as {format}", input.display());

    let resource = respec_core::parse_resource(&document, path, format, &options)
        .with_context(|| format!("failed to parse {path} from {}", input.display()))?;
    let summary = build_inspect_summary(&resource);

    match output {
        OutputFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn build_inspect_summary(resource: &Resource) -> serde_json::Value {
    let methods: Vec<serde_json::Value> = resource
        .methods()
        .values()
        .map(|method| {
            let responses: serde_json::Map<String, serde_json::Value> = method
                .declared_statuses()
                .into_iter()
                .map(|status| {
                    let body = match method.response(status) {
                        Ok(schema) => serde_json::json!({
                            "name": schema.name(),
                            "schema": schema.definition().to_string(),
                        }),
                        Err(_) => serde_json::Value::Null,
                    };
                    (status.to_string(), body)
                })
                .collect();

            serde_json::json!({
                "method": method.name(),
                "description": method.description(),
                "query": method.query_parameters().to_string(),
                "path": method.path_parameters().to_string(),
                "request": method.request().map(|schema| serde_json::json!({
                    "name": schema.name(),
                    "schema": schema.definition().to_string(),
                })),
                "responses": responses,
            })
        })
        .collect();

    serde_json::json!({
        "path": resource.path(),
        "template": resource.template(),
        "title": resource.title(),
        "description": resource.description(),
        "path_parameters": resource.path_parameters().to_string(),
        "methods": methods,
    })
}

fn cmd_check(input: &Path, format: Option<FormatArg>, strict: bool) -> Result<()> {
    let options = load_options(strict)?;
    let document = load_document(input)?;
    let format = resolve_format(&document, format)?;
    let parser = format.parser(options);

    let templates = parser.paths(&document)?;
    let mut failures = 0;
    for template in &templates {
        match parser.parse(&document, template) {
            Ok(resource) => {
                eprintln!("  ok   {} [{}]", template, resource.allowed_methods().join(", "));
            }
            Err(err) => {
                failures += 1;
                eprintln!("  fail {}: {}", template, err);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!(
            "{} of {} paths in {} failed to parse",
            failures,
            templates.len(),
            input.display()
        );
    }

    eprintln!(
        "Parsed {} paths of {} ({}).",
        templates.len(),
        input.display(),
        format
    );
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAML: &str = "title: Songs\n/songs/{id}:\n  get:\n    responses:\n      200:\n        body:\n          application/json:\n            type: object\n            properties:\n              title: string\n";

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.raml");
        match load_document(&missing).unwrap_err() {
            SpecError::FileNotFound { path } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_picks_tokenizer_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("api.json");
        fs::write(&json, r#"{"openapi": "3.0.0", "paths": {}}"#).unwrap();
        let document = load_document(&json).unwrap();
        assert_eq!(Format::detect(&document).unwrap(), Format::OpenApi);

        let raml = dir.path().join("api.raml");
        fs::write(&raml, RAML).unwrap();
        let document = load_document(&raml).unwrap();
        assert_eq!(Format::detect(&document).unwrap(), Format::Raml);

        // YAML is not valid JSON.
        let mislabeled = dir.path().join("api2.json");
        fs::write(&mislabeled, RAML).unwrap();
        assert!(matches!(load_document(&mislabeled), Err(SpecError::Json(_))));
    }

    #[test]
    fn summary_lists_methods_and_responses() {
        let document = Node::from_yaml_str(RAML).unwrap();
        let resource =
            respec_core::parse_resource_auto(&document, "/songs/1", &ParseOptions::default())
                .unwrap();
        let summary = build_inspect_summary(&resource);

        assert_eq!(summary["template"], "/songs/{id}");
        assert_eq!(summary["title"], "Songs");
        assert_eq!(summary["path_parameters"], "object{id: string}");
        assert_eq!(summary["methods"][0]["method"], "GET");
        assert_eq!(
            summary["methods"][0]["responses"]["200"]["schema"],
            "object{title: string}"
        );
    }

    #[test]
    fn explicit_format_overrides_detection() {
        let document = Node::from_yaml_str("name: x\n").unwrap();
        assert!(resolve_format(&document, None).is_err());
        assert_eq!(
            resolve_format(&document, Some(FormatArg::Raml)).unwrap(),
            Format::Raml
        );
    }
}
