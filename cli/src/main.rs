use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use safepack::{layout_to_json, value_from_json, value_to_json, Codec, CompiledLayout, PackError};
use safepack_compiler::SchemaDocument;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spk")]
#[command(about = "Inspect, encode or decode fixed-layout binary records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the compiled layout of every schema in a document (or just one)
    Inspect {
        /// JSON schema document
        #[arg(short, long)]
        schema: PathBuf,

        /// Only print this schema
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Encode a JSON record and print it as hex
    Encode {
        /// JSON schema document
        #[arg(short, long)]
        schema: PathBuf,

        /// Schema of the record
        #[arg(short, long)]
        name: String,

        /// The record as JSON
        #[arg(short, long)]
        record: String,
    },

    /// Decode hex bytes and print the record as JSON
    Decode {
        /// JSON schema document
        #[arg(short, long)]
        schema: PathBuf,

        /// Schema of the record
        #[arg(short, long)]
        name: String,

        /// Encoded bytes as hex
        #[arg(long)]
        hex: String,

        /// Byte offset of the record within the decoded bytes
        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },
}

fn load(path: &Path) -> Result<Vec<Arc<CompiledLayout>>, PackError> {
    let text = fs::read_to_string(path)?;
    let layouts = SchemaDocument::parse(&text)?.compile()?;
    info!(path = %path.display(), schemas = layouts.len(), "loaded schema document");
    Ok(layouts)
}

fn find(layouts: &[Arc<CompiledLayout>], name: &str) -> Result<Arc<CompiledLayout>, PackError> {
    layouts
        .iter()
        .find(|layout| layout.name() == name)
        .cloned()
        .ok_or_else(|| PackError::Input(format!("no schema named {:?} in the document", name)))
}

fn run(cli: &Cli) -> Result<String, PackError> {
    match &cli.command {
        Commands::Inspect { schema, name } => {
            let layouts = load(schema)?;
            let selected = match name {
                Some(name) => vec![find(&layouts, name)?],
                None => layouts,
            };
            let rendered = selected
                .iter()
                .map(|layout| layout_to_json(layout))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(serde_json::to_string_pretty(&rendered)?)
        }

        Commands::Encode { schema, name, record } => {
            let layout = find(&load(schema)?, name)?;
            let json: serde_json::Value = serde_json::from_str(record)?;
            let value = value_from_json(&json, &layout)?;
            debug!(schema = layout.name(), value = ?value, "encoding record");
            let bytes = Codec::new(layout).encode(&value)?;
            Ok(hex::encode(bytes))
        }

        Commands::Decode {
            schema,
            name,
            hex: encoded,
            offset,
        } => {
            let layout = find(&load(schema)?, name)?;
            let bytes = hex::decode(encoded.trim())
                .map_err(|e| PackError::Input(format!("invalid hex: {}", e)))?;
            let value = Codec::new(layout).decode_from(&bytes, *offset)?;
            Ok(serde_json::to_string_pretty(&value_to_json(&value))?)
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => println!("{}", output),
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    }
}
