//! Command line front-end: check schemas, emit the flat JSON schema and run
//! values through the codec.
//!
//! Usage:
//!   rpcidl check api.idl [--strict]
//!   rpcidl json api.idl [-o schema.json] [--strict]
//!   rpcidl decode schema.json User [value.json]     (value read from stdin if omitted)
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rpcidl::{ast_to_json, compile_file_with, AstRoot, Codec, LexerOptions, Schema};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpcidl")]
#[command(author, version, about = "RPC IDL compiler and codec", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema and report warnings
    Check {
        file: PathBuf,

        /// Reject unterminated strings and comments instead of warning
        #[arg(long)]
        strict: bool,
    },

    /// Compile a schema and print its flat JSON form
    Json {
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        strict: bool,
    },

    /// Decode a JSON value against a type of a flat schema and print it
    /// re-encoded
    Decode {
        /// Flat schema produced by `rpcidl json`
        schema: PathBuf,

        /// Type expression, e.g. `User` or `int[]?`
        #[arg(value_name = "TYPE")]
        ty: String,

        /// JSON value; stdin when omitted
        value: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { file, strict } => {
            let root = compile(&file, strict)?;
            println!(
                "{}: {} types, {} operations, {} errors",
                file.display(),
                root.type_definitions.len(),
                root.operations.len(),
                root.errors.len()
            );
        }
        Commands::Json {
            file,
            output,
            strict,
        } => {
            let root = compile(&file, strict)?;
            let text = ast_to_json(&root)
                .to_json_string()
                .context("serializing schema")?;
            match output {
                Some(path) => fs::write(&path, text + "\n")
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{text}"),
            }
        }
        Commands::Decode { schema, ty, value } => {
            let source = fs::read_to_string(&schema)
                .with_context(|| format!("reading {}", schema.display()))?;
            let schema = Schema::from_json_str(&source)
                .with_context(|| format!("parsing {}", schema.display()))?;
            let input = match value {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf).context("reading stdin")?;
                    buf
                }
            };
            let input: serde_json::Value =
                serde_json::from_str(&input).context("value is not valid JSON")?;

            let codec = Codec::from_schema(schema);
            let decoded = codec.decode(&ty, &input)?;
            let encoded = codec.encode(&ty, &decoded)?;
            println!("{}", serde_json::to_string_pretty(&encoded)?);
        }
    }
    Ok(())
}

fn compile(file: &Path, strict: bool) -> Result<AstRoot> {
    let root = compile_file_with(file, LexerOptions { strict })
        .with_context(|| format!("compiling {}", file.display()))?;
    for warning in &root.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(root)
}
