use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docscout_core::config::{resolve_with_base, Config};
use docscout_core::types::RetrievalResponse;
use docscout_engine::{clients_from_settings, RetrievalEngine};

#[derive(Parser)]
#[command(name = "docscout")]
#[command(about = "Find the documents on this machine that answer a question")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index the source directory into the persisted collection
    Ingest {
        /// Directory to ingest instead of `source.dir`
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Rank documents by how well they match a question
    Query {
        /// The question or keywords
        text: String,

        /// Number of fragments to retrieve (defaults to `retrieval.k`)
        #[arg(short)]
        k: Option<usize>,

        /// Print the response payload as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let engine = RetrievalEngine::new(&settings, clients_from_settings(&settings)?)?;

    match args.command {
        Command::Ingest { source } => {
            let stored = match source {
                Some(dir) => {
                    let dir = resolve_with_base(&std::env::current_dir()?, dir.to_string_lossy());
                    println!("Ingesting from {}", dir.display());
                    engine.ingest_dir(&dir)?
                }
                None => engine.ingest()?,
            };
            println!("✅ Ingest complete ({} fragments stored)", stored);
        }
        Command::Query { text, k, json } => {
            let response = engine.query_k(&text, k.unwrap_or(engine.default_k()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&text, &response);
            }
            if response.is_error() {
                std::process::exit(2);
            }
        }
    }
    Ok(())
}

fn trust_label(trust: f64) -> &'static str {
    if trust >= 70.0 {
        "high"
    } else if trust >= 40.0 {
        "medium"
    } else {
        "low"
    }
}

fn print_response(query: &str, response: &RetrievalResponse) {
    println!("🔍 {}", query);
    println!("{}", response.summary);
    if response.sources.is_empty() {
        return;
    }
    println!("\n📄 {} sources:", response.total_hits);
    for (i, source) in response.sources.iter().enumerate() {
        println!(
            "  {}. {:<32} {:>6.2}% ({})  {}",
            i + 1,
            source.filename,
            source.trust_percent,
            trust_label(source.trust_percent),
            source.full_path
        );
    }
}
