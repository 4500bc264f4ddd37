//! # paperrag CLI
//!
//! Ask questions about one academic paper, answered from its own text.
//!
//! The paper is split into overlapping chunks, each chunk is embedded, and
//! every question is answered by a language model from the chunks closest
//! to it. Answers come with the page numbers and excerpts they were based on.
//!
//! ## Commands
//!
//! - `paperrag index <PDF>` - Build (or reuse) the index of a paper
//! - `paperrag summarize <PDF>` - Summarize the paper in four sections
//! - `paperrag ask <PDF> <QUESTION>` - Answer one question
//! - `paperrag chat <PDF>` - Ask questions interactively
//! - `paperrag status <PDF>` - Show the stored index of a paper
//! - `paperrag remove <PDF>` - Delete the stored index of a paper
//!
//! ## Examples
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! paperrag summarize paper.pdf
//! paperrag ask paper.pdf "Which datasets were used?" --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paperrag_chunker::FixedSizeChunker;
use paperrag_core::{Embedder, IndexManifest, QueryResult};
use paperrag_embed::{EmbedderPool, HashEmbedder, OpenAiEmbedder};
use paperrag_extract::{document_id, LoaderRegistry};
use paperrag_index::{DocumentIndexer, DocumentSession};
use paperrag_query::{AnswerGenerator, OpenAiGenerator};
use paperrag_store::VectorIndex;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod config;

use config::{data_dir, Config, EmbeddingProvider};

#[derive(Parser)]
#[command(name = "paperrag")]
#[command(about = "Question answering over a single academic paper")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/paperrag/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// API key for the embedding and chat endpoints
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index of a paper (reused when already up to date)
    Index {
        /// Paper to index
        path: PathBuf,

        /// Rebuild even if an up-to-date index exists
        #[arg(short, long)]
        force: bool,
    },

    /// Summarize a paper in Introduction, Methodology, Results, Conclusion
    Summarize {
        /// Paper to summarize
        path: PathBuf,
    },

    /// Answer one question about a paper
    Ask {
        /// Paper to ask about
        path: PathBuf,

        /// Question
        question: String,
    },

    /// Ask questions interactively (`:summary` summarizes, `:quit` exits)
    Chat {
        /// Paper to ask about
        path: PathBuf,
    },

    /// Show the stored index of a paper
    Status {
        /// Paper to inspect
        path: PathBuf,
    },

    /// Delete the stored index of a paper
    Remove {
        /// Paper whose index is deleted
        path: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for answers.
#[derive(Serialize)]
struct AnswerOutput {
    question: String,
    answer: String,
    citations: Vec<paperrag_core::CitedChunk>,
}

/// Output structure for index builds.
#[derive(Serialize)]
struct IndexOutput {
    path: String,
    document_id: String,
    chunks: usize,
    reused: bool,
}

/// Output structure for status.
#[derive(Serialize)]
struct StatusOutput {
    path: String,
    document_id: String,
    embedding_model: String,
    dimension: usize,
    chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_chunk_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlap_length: Option<usize>,
    built_at: String,
}

impl StatusOutput {
    fn new(path: &Path, manifest: &IndexManifest) -> Self {
        Self {
            path: path.to_string_lossy().to_string(),
            document_id: manifest.document_id.to_string(),
            embedding_model: manifest.embedding_model.clone(),
            dimension: manifest.dimension,
            chunks: manifest.chunk_count,
            max_chunk_length: manifest.chunk_config.map(|c| c.max_chunk_length),
            overlap_length: manifest.chunk_config.map(|c| c.overlap_length),
            built_at: manifest.built_at.to_rfc3339(),
        }
    }
}

/// Get the root directory of all stored indices.
fn indices_dir() -> Result<PathBuf> {
    let data = data_dir().context("Failed to get data directory")?;
    Ok(data.join("indices"))
}

/// Check that the paper exists and return its canonical path.
fn resolve_paper(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("Not a file: {}", path.display());
    }
    Ok(path.canonicalize()?)
}

fn require_api_key(api_key: Option<&str>) -> Result<&str> {
    api_key
        .filter(|key| !key.trim().is_empty())
        .context("No API key found. Set OPENAI_API_KEY or pass --api-key")
}

/// Create the configured embedder.
fn create_embedder(config: &Config, api_key: Option<&str>) -> Result<Arc<dyn Embedder>> {
    let embedding = &config.embedding;
    let embedder: Arc<dyn Embedder> = match embedding.provider {
        EmbeddingProvider::OpenAi => Arc::new(
            OpenAiEmbedder::new(require_api_key(api_key)?)
                .context("Failed to create embedder")?
                .with_base_url(&embedding.base_url)
                .with_model(&embedding.model),
        ),
        EmbeddingProvider::Hash => Arc::new(HashEmbedder::with_dimension(embedding.dimension)),
    };
    Ok(embedder)
}

/// Create the indexing stack: loaders, chunker, embedder pool and index.
///
/// Needs an API key only when the configured embedder is remote.
fn create_indexer(config: &Config, api_key: Option<&str>, root: &Path) -> Result<DocumentIndexer> {
    let index = Arc::new(VectorIndex::new(root, config.retrieval.metric));

    let embedder = create_embedder(config, api_key)?;
    info!("Using embedding model {}", embedder.model_name());
    let pool = Arc::new(
        EmbedderPool::new(embedder, config.embedding.max_concurrent)
            .with_batch_size(config.embedding.batch_size),
    );

    Ok(DocumentIndexer::new(
        Arc::new(LoaderRegistry::with_defaults()),
        Arc::new(FixedSizeChunker::new()),
        config.chunking.to_chunk_config(),
        pool,
        index,
    )?)
}

/// Create the configured chat model client.
fn create_generator(config: &Config, api_key: Option<&str>) -> Result<OpenAiGenerator> {
    let generation = &config.generation;
    Ok(OpenAiGenerator::new(require_api_key(api_key)?)
        .context("Failed to create generator")?
        .with_base_url(&generation.base_url)
        .with_model(&generation.model)
        .with_temperature(generation.temperature)
        .with_max_tokens(generation.max_tokens))
}

/// Create the full question answering stack.
fn create_session(config: &Config, api_key: Option<&str>, root: &Path) -> Result<DocumentSession> {
    let indexer = create_indexer(config, api_key, root)?;
    let generator = create_generator(config, api_key)?;

    let composer = config.prompt.to_composer()?;
    let answerer = AnswerGenerator::new(
        indexer.index().clone(),
        indexer.embedder().clone(),
        Arc::new(generator),
    )
    .with_top_k(config.retrieval.top_k)
    .with_composer(composer);

    Ok(DocumentSession::new(Arc::new(indexer), Arc::new(answerer)))
}

/// Build or reuse the index, reporting which one happened.
async fn open_session(config: &Config, api_key: Option<&str>, path: &Path) -> Result<DocumentSession> {
    let mut session = create_session(config, api_key, &indices_dir()?)?;
    let build = session
        .build(path, false)
        .await
        .with_context(|| format!("Failed to index {}", path.display()))?;

    if build.reused {
        info!("Using existing index ({} chunks)", build.handle.chunk_count());
    } else {
        info!("Indexed {} chunks", build.handle.chunk_count());
    }
    Ok(session)
}

fn print_answer(
    format: OutputFormat,
    question: &str,
    result: &QueryResult,
    excerpt_chars: usize,
) -> Result<()> {
    let citations = result.citations(excerpt_chars);

    match format {
        OutputFormat::Json => {
            let output = AnswerOutput {
                question: question.to_string(),
                answer: result.answer_text.clone(),
                citations,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("{}\n", result.answer_text.trim());
            if !citations.is_empty() {
                println!("Sources:");
                for (i, cited) in citations.iter().enumerate() {
                    println!("{}. Page {}", i + 1, cited.page_number);
                    println!("   {}", flatten(&cited.excerpt));
                    println!();
                }
            }
        }
    }
    Ok(())
}

async fn run_chat(session: &DocumentSession, format: OutputFormat, excerpt_chars: usize) -> Result<()> {
    println!("Ask a question (:summary to summarize, :quit to exit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        let result = match input {
            "" => continue,
            ":quit" | ":q" => break,
            ":summary" => session.summarize().await,
            question => session.ask(question).await,
        };

        // A failed question leaves the session usable
        match result {
            Ok(result) => print_answer(format, input, &result, excerpt_chars)?,
            Err(e) => {
                warn!("Question failed: {}", e);
                eprintln!("Error: {e}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config from file or CLI-specified path
    let config = if let Some(ref path) = cli.config {
        Config::load_from(Some(path.clone()))
            .context(format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load().context("Failed to load config")?
    };

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config
            .logging
            .level
            .parse()
            .context("Invalid logging.level")?
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let api_key = cli.api_key.as_deref();
    let excerpt_chars = config.retrieval.excerpt_chars;

    match cli.command {
        Commands::Index { path, force } => {
            let path = resolve_paper(&path)?;
            info!("Indexing {:?} (force={})", path, force);

            let indexer = create_indexer(&config, api_key, &indices_dir()?)?;
            let build = indexer
                .open_or_build(&path, force)
                .await
                .with_context(|| format!("Failed to index {}", path.display()))?;

            match cli.format {
                OutputFormat::Json => {
                    let output = IndexOutput {
                        path: path.to_string_lossy().to_string(),
                        document_id: build.handle.document_id().to_string(),
                        chunks: build.handle.chunk_count(),
                        reused: build.reused,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    let verb = if build.reused { "Up to date" } else { "Indexed" };
                    println!(
                        "{}: {} ({} chunks)",
                        verb,
                        path.display(),
                        build.handle.chunk_count()
                    );
                }
            }
        }

        Commands::Summarize { path } => {
            let path = resolve_paper(&path)?;
            let session = open_session(&config, api_key, &path).await?;

            let result = session.summarize().await.context("Summary failed")?;
            print_answer(cli.format, paperrag_query::SUMMARY_QUERY, &result, excerpt_chars)?;
        }

        Commands::Ask { path, question } => {
            let path = resolve_paper(&path)?;
            let session = open_session(&config, api_key, &path).await?;

            let result = session.ask(&question).await.context("Question failed")?;
            print_answer(cli.format, &question, &result, excerpt_chars)?;
        }

        Commands::Chat { path } => {
            let path = resolve_paper(&path)?;
            let session = open_session(&config, api_key, &path).await?;
            run_chat(&session, cli.format, excerpt_chars).await?;
        }

        Commands::Status { path } => {
            let path = resolve_paper(&path)?;
            let id = document_id(&path).await?;
            let index = VectorIndex::new(indices_dir()?, config.retrieval.metric);

            let Some(handle) = index.open(&id).await? else {
                match cli.format {
                    OutputFormat::Json => {
                        println!(r#"{{"error": "Index not found"}}"#);
                    }
                    OutputFormat::Text => {
                        println!("Index not found for {}", path.display());
                        println!("Run 'paperrag index {}' to create it.", path.display());
                    }
                }
                return Ok(());
            };

            let output = StatusOutput::new(&path, handle.manifest());
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Index Status for {}", output.path);
                    println!("  Document: {}", output.document_id);
                    println!("  Location: {}", index.location(&id).display());
                    println!("  Model:    {} ({} dims)", output.embedding_model, output.dimension);
                    println!("  Chunks:   {}", output.chunks);
                    if let (Some(max), Some(overlap)) = (output.max_chunk_length, output.overlap_length) {
                        println!("  Chunking: {max} chars, {overlap} overlap");
                    }
                    println!(
                        "  Built:    {}",
                        handle.manifest().built_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }

        Commands::Remove { path } => {
            let path = resolve_paper(&path)?;
            let id = document_id(&path).await?;
            let index = VectorIndex::new(indices_dir()?, config.retrieval.metric);

            if index.remove(&id).await? {
                println!("Removed index for {}", path.display());
            } else {
                println!("No index found for {}", path.display());
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}

/// Collapse line breaks so an excerpt prints on one line.
fn flatten(s: &str) -> String {
    s.replace('\n', " ").replace('\r', "")
}
