use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use syllabus_rag_retriever::{
    EmbedderKind, LoadPolicy, RagConfig, RetrievalResult, RetrieveOptions, Retriever,
};

/// Build and query the syllabus retrieval index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Fail on a missing or invalid configuration file instead of using defaults
    #[arg(long, global = true)]
    strict: bool,

    /// Embedding backend (fastembed or hashing); overrides the config file
    #[arg(long, global = true)]
    embedder: Option<EmbedderKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a syllabus (.txt, .md or .pdf), build the index and save it
    Build {
        /// Source document
        file: PathBuf,
    },
    /// Find the chunks most relevant to a query
    Search {
        query: String,
        /// Number of results (defaults to the configured top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Keep only units containing this text, e.g. "Unit-2"
        #[arg(short, long)]
        unit: Option<String>,
        /// Keep only chunks tagged with this Bloom level
        #[arg(short, long)]
        bloom: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Print the formatted context block for a query
    Context {
        query: String,
        /// Number of chunks (defaults to the configured top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Show index status
    Status {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    results: &'a [RetrievalResult],
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(args: &Args) -> anyhow::Result<RagConfig> {
    let policy = if args.strict {
        LoadPolicy::Strict
    } else {
        LoadPolicy::Lenient
    };
    let mut config = match &args.config {
        Some(path) => RagConfig::load(path, policy)?,
        None => RagConfig::default(),
    };
    if let Some(embedder) = args.embedder {
        config.embedder = embedder;
    }
    Ok(config)
}

async fn open_retriever(config: RagConfig) -> anyhow::Result<Retriever> {
    let embedder = config.create_embedder().await?;
    let retriever = Retriever::open(config, embedder);
    if !retriever.is_ready() {
        eprintln!(
            "No index found at {}. Run `syllabus-rag build <FILE>` first.",
            retriever.config().index_path.display()
        );
    }
    Ok(retriever)
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(100).collect();
    if preview.len() < text.len() {
        preview.push_str("...");
    }
    preview
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Commands::Build { file } => {
            let embedder = config.create_embedder().await?;
            let mut retriever = Retriever::new(config, embedder);
            let stats = retriever.build_from_file(&file).await?;

            println!("Indexed {} chunks from {}", stats.chunk_count, file.display());
            println!("  Model: {} ({} dimensions)", stats.model_id, stats.dimension);
            for (unit, count) in &stats.units {
                println!("  {unit}: {count} chunks");
            }
            println!(
                "  Saved to {} and {}",
                retriever.config().index_path.display(),
                retriever.config().chunks_path.display()
            );
            Ok(())
        }
        Commands::Search {
            query,
            top_k,
            unit,
            bloom,
            format,
        } => {
            let retriever = open_retriever(config).await?;
            let options = RetrieveOptions {
                top_k,
                unit_filter: unit,
                bloom_filter: bloom,
            };
            let results = retriever.retrieve(&query, &options).await?;

            match format {
                OutputFormat::Json => {
                    let output = SearchOutput {
                        query: &query,
                        results: &results,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} results:", results.len());
                    for result in &results {
                        println!(
                            "  Score: {:.3} | Distance: {:.3} | Chunk: {} | {} | {} | Page: {}",
                            result.score,
                            result.distance,
                            result.chunk.chunk_id,
                            result.chunk.unit,
                            result.chunk.taxonomy_tag,
                            result.chunk.page
                        );
                        println!("    {}", preview(&result.chunk.text));
                    }
                }
                OutputFormat::Full => {
                    for result in &results {
                        println!("Score: {:.3}", result.score);
                        println!("Distance: {:.3}", result.distance);
                        println!("Chunk ID: {}", result.chunk.chunk_id);
                        println!("Unit: {}", result.chunk.unit);
                        println!("Taxonomy: {}", result.chunk.taxonomy_tag);
                        println!("Page: {}", result.chunk.page);
                        println!("Content:\n{}", result.chunk.text);
                        println!("---");
                    }
                }
            }
            Ok(())
        }
        Commands::Context { query, top_k } => {
            let retriever = open_retriever(config).await?;
            println!("{}", retriever.retrieve_context(&query, top_k).await?);
            Ok(())
        }
        Commands::Status { format } => {
            let retriever = open_retriever(config).await?;
            let status = retriever.status();

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                OutputFormat::Summary | OutputFormat::Full => {
                    println!("Syllabus RAG Status");
                    println!("===================");
                    println!("  Ready: {}", if status.ready { "Yes" } else { "No" });
                    println!("  Model: {}", status.model_id);
                    println!(
                        "  Index: {} ({})",
                        status.index_path.display(),
                        if status.index_exists { "present" } else { "missing" }
                    );
                    println!(
                        "  Chunks: {} ({})",
                        status.chunks_path.display(),
                        if status.chunks_exists { "present" } else { "missing" }
                    );
                    println!("  Chunk count: {}", status.chunk_count);
                    if let Some(dimension) = status.dimension {
                        println!("  Dimension: {dimension}");
                    }
                    if let Some(fingerprint) = &status.source_fingerprint {
                        println!("  Source blake3: {fingerprint}");
                    }
                    if let Some(created_at) = status
                        .created_at
                        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                    {
                        println!("  Built: {}", created_at.to_rfc3339());
                    }
                    if format == OutputFormat::Full && !status.units.is_empty() {
                        println!("\n  Units:");
                        for (unit, count) in &status.units {
                            println!("    {unit}: {count} chunks");
                        }
                    }
                }
            }
            Ok(())
        }
    }
}
