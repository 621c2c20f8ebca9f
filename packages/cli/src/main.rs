//! `ldg`: command-line interface for ldgraph documents.
//!
//! Three subcommands, all driven by a registry schema (`--schema` or
//! `LDG_SCHEMA`):
//!
//! - **`check`** decodes a document and reports every decode error.
//! - **`inspect`** prints a human-readable summary of the decoded graph.
//! - **`normalize`** decodes and re-encodes, regenerating blank identifiers.
//!
//! All subcommands read JSON from a file path or from stdin (`-`).

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use ldgraph::{decode_from_str, encode, encode_canonical, Decoded, Registry, Root, Schema};

/// ldg: flattened JSON-LD graph tool
///
/// Check, inspect, and normalize `@context`/`@graph` documents against a
/// registry schema.
#[derive(Parser)]
#[command(name = "ldg", version, about, long_about = None)]
struct Cli {
    /// Registry schema (JSON) describing the accepted contexts and types.
    #[arg(long, global = true, env = "LDG_SCHEMA", value_name = "FILE")]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a document and report problems.
    ///
    /// Exits 0 if the document decodes without errors, 1 otherwise. Every
    /// error is printed with the path of the offending value.
    ///
    /// Pass `-` as FILE to read from stdin.
    Check {
        /// Path to a JSON document, or `-` for stdin.
        file: PathBuf,
    },

    /// Print a human-readable summary of a decoded document.
    ///
    /// A document with a single top-level node is rendered in full detail;
    /// larger graphs use the grouped summary view.
    Inspect {
        /// Path to a JSON document, or `-` for stdin.
        file: PathBuf,
    },

    /// Decode a document and encode it again.
    ///
    /// Every top-level node stays top-level. Blank identifiers are
    /// renumbered. Refuses to write a partially decoded graph.
    Normalize {
        /// Path to a JSON document, or `-` for stdin.
        file: PathBuf,

        /// Emit RFC 8785 canonical JSON instead of pretty-printed output.
        #[arg(long)]
        canonical: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ldgraph=warn,ldg=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let registry = load_registry(cli.schema.as_deref());

    match cli.command {
        Command::Check { file } => {
            let decoded = decode_input(&registry, &file);
            if decoded.is_complete() {
                println!(
                    "ok: {} top-level node{}, {} object{}",
                    decoded.roots.len(),
                    plural(decoded.roots.len()),
                    decoded.arena.len(),
                    plural(decoded.arena.len()),
                );
            } else {
                report_errors(&decoded);
                process::exit(1);
            }
        }

        Command::Inspect { file } => {
            let decoded = decode_input(&registry, &file);
            report_errors(&decoded);
            if let [only] = decoded.roots.as_slice() {
                print!("{}", ldgraph::render::render_object(&registry, &decoded.arena, *only));
            } else {
                print!("{}", ldgraph::render::render_arena(&decoded.arena));
            }
        }

        Command::Normalize { file, canonical } => {
            let decoded = decode_input(&registry, &file);
            if !decoded.is_complete() {
                report_errors(&decoded);
                fatal("document has decode errors; not normalizing a partial graph");
            }
            let roots: Vec<Root<'_>> = decoded.roots.iter().copied().map(Root::Handle).collect();
            let output = if canonical {
                encode_canonical(&registry, &decoded.arena, &roots)
            } else {
                encode(&registry, &decoded.arena, &roots)
                    .and_then(|doc| Ok(serde_json::to_string_pretty(&doc)?))
            };
            match output {
                Ok(json) => println!("{}", json),
                Err(e) => fatal(&format!("encode failed: {}", e)),
            }
        }
    }
}

/// Build the registry from the schema file.
fn load_registry(path: Option<&Path>) -> Registry {
    let Some(path) = path else {
        fatal("no registry schema given; pass --schema FILE or set LDG_SCHEMA");
    };
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| fatal(&format!("failed to read schema {}: {}", path.display(), e)));
    let schema = Schema::from_json(&json)
        .unwrap_or_else(|e| fatal(&format!("invalid schema {}: {}", path.display(), e)));
    let registry = Registry::from_schema(schema)
        .unwrap_or_else(|e| fatal(&format!("invalid schema {}: {}", path.display(), e)));
    tracing::debug!(
        schema = %path.display(),
        contexts = registry.contexts().count(),
        "loaded registry"
    );
    registry
}

fn decode_input(registry: &Registry, path: &Path) -> Decoded {
    let json = read_input(path);
    decode_from_str(registry, &json).unwrap_or_else(|e| fatal(&format!("{}: {}", path.display(), e)))
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {}", path.display(), e)))
    }
}

fn report_errors(decoded: &Decoded) {
    for err in decoded.errors.iter() {
        eprintln!("error: {}", err);
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("ldg: {}", msg);
    process::exit(2);
}
