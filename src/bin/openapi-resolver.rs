//! OpenAPI Resolver CLI
//!
//! Command-line interface for resolving references in and validating OpenAPI documents.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use openapi_resolver::{
    read_from_file, write_to_json, write_to_yaml, Document, ObjectKind, ReadOptions, ResolveMode,
    SpecError,
};

#[derive(Parser)]
#[command(name = "openapi-resolver")]
#[command(about = "Resolve references in and validate OpenAPI 3.0/3.1 documents")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve all references and print the resulting document
    Resolve {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Which references to resolve
        #[arg(long, value_enum, default_value_t = Mode::All)]
        mode: Mode,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Output file (stdout if not specified)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Keep unresolvable references and report them instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Validate a document against the OpenAPI rules
    Validate {
        /// Document source: file path or URL (http:// or https://)
        source: String,

        /// Validate without resolving references first
        #[arg(long)]
        no_resolve: bool,

        /// Keep unresolvable references and report them as validation errors
        #[arg(long)]
        lenient: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    All,
    Inline,
}

impl From<Mode> for ResolveMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::All => ResolveMode::All,
            Mode::Inline => ResolveMode::Inline,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Resolve {
            source,
            mode,
            format,
            output,
            lenient,
        } => run_resolve(&source, mode, format, output, lenient),

        Commands::Validate {
            source,
            no_resolve,
            lenient,
            json,
        } => run_validate(&source, no_resolve, lenient, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read(source: &str, options: &ReadOptions) -> Result<Document, SpecError> {
    read_from_file(source, ObjectKind::OpenApi, options)
}

fn run_resolve(
    source: &str,
    mode: Mode,
    format: Format,
    output: Option<PathBuf>,
    lenient: bool,
) -> Result<(), u8> {
    let options = ReadOptions::new()
        .resolve(Some(mode.into()))
        .lenient(lenient);
    let document = read(source, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if lenient {
        for error in document.get_errors() {
            eprintln!("Warning: {}", error);
        }
    }

    let rendered = match format {
        Format::Json => write_to_json(&document),
        Format::Yaml => write_to_yaml(&document),
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        e.exit_code() as u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered.trim_end());
        }
    }

    Ok(())
}

fn run_validate(source: &str, no_resolve: bool, lenient: bool, json_output: bool) -> Result<(), u8> {
    let mode = if no_resolve { None } else { Some(ResolveMode::All) };
    let options = ReadOptions::new().resolve(mode).lenient(lenient);
    let document = read(source, &options).map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;

    if document.validate() {
        if json_output {
            println!(r#"{{"valid":true}}"#);
        } else {
            println!("Valid");
        }
        return Ok(());
    }

    let errors = document.get_errors();
    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "errors": errors
        });
        println!("{}", output);
    } else {
        eprintln!("Validation failed:");
        for error in errors {
            eprintln!("  {}", error);
        }
    }
    Err(1)
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({"valid": false, "error": msg}));
    } else {
        eprintln!("Error: {}", msg);
    }
}
