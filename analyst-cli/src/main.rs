//! The `analyst` command: ask questions about financial documents from the terminal.
//!
//! Documents are read as already-extracted plain text; the company tag is
//! guessed from the file name unless `--company` is given.
//!
//! ```text
//! analyst retrieve --doc tesla_10k.txt --doc nvda_10k.txt "Compare Tesla vs Nvidia revenue"
//! analyst ask --doc tesla_10k.txt --doc nvda_10k.txt --compare Tesla --compare Nvidia "Revenue?"
//! analyst summary --doc tesla_10k.txt
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use analyst_rag::openai::{OpenAIChatGenerator, OpenAIEmbeddingProvider};
use analyst_rag::{
    AnalystConfig, AnalystSession, DocumentUpload, EmbeddingProvider, EntityVocabulary,
    FinancialAnalyst, HashingEmbeddingProvider, InMemoryIndex, IngestOutcome, RagError,
    RetrievalOrchestrator,
};
use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "analyst", version, about = "Question answering over financial documents")]
struct Cli {
    /// JSON file overriding analyst configuration defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON file replacing the built-in company and metric vocabulary.
    #[arg(long, global = true)]
    vocabulary: Option<PathBuf>,

    /// Embedding backend used to build the index.
    #[arg(long, value_enum, default_value_t = Embedder::Hashing, global = true)]
    embedder: Embedder,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Embedder {
    /// Offline lexical feature hashing.
    Hashing,
    /// OpenAI embeddings (needs OPENAI_API_KEY).
    Openai,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve and print the chunks a question would be answered from.
    Retrieve(QueryArgs),
    /// Answer a question with the OpenAI chat model (needs OPENAI_API_KEY).
    Ask(QueryArgs),
    /// Show chunk counts per company and document type.
    Summary(CorpusArgs),
}

#[derive(Args, Debug)]
struct CorpusArgs {
    /// Plain-text document to load; repeat for several.
    #[arg(long = "doc", required = true)]
    docs: Vec<PathBuf>,

    /// Document type tag applied to every loaded document.
    #[arg(long, default_value = "Financial Report")]
    doc_type: String,

    /// Company tag applied to every loaded document instead of guessing.
    #[arg(long)]
    company: Option<String>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Entity to force into balanced retrieval; give at least two.
    #[arg(long = "compare")]
    entities: Vec<String>,

    /// The question.
    question: String,
}

impl QueryArgs {
    fn entities(&self) -> Option<&[String]> {
        if self.entities.is_empty() { None } else { Some(&self.entities) }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalystConfig> {
    let Some(path) = path else {
        return Ok(AnalystConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(AnalystConfig::from_json(&json)?)
}

fn load_vocabulary(path: Option<&Path>) -> anyhow::Result<EntityVocabulary> {
    let Some(path) = path else {
        return Ok(EntityVocabulary::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading vocabulary {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing vocabulary {}", path.display()))
}

fn embedder(kind: Embedder) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    Ok(match kind {
        Embedder::Hashing => Arc::new(HashingEmbeddingProvider::new(512)?),
        Embedder::Openai => Arc::new(OpenAIEmbeddingProvider::from_env()?),
    })
}

/// Load every document into the session, reporting skips and failures.
fn load_documents(session: &mut AnalystSession, args: &CorpusArgs) -> anyhow::Result<()> {
    for path in &args.docs {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading document {}", path.display()))?;

        let mut upload = DocumentUpload::new(file_name, text).with_doc_type(args.doc_type.clone());
        if let Some(company) = &args.company {
            upload = upload.with_company(company.clone());
        }

        match session.ingest(upload) {
            Ok(IngestOutcome::Processed { company, chunk_count }) => {
                eprintln!("✓ {} ({company}, {chunk_count} chunks)", path.display());
            }
            Ok(IngestOutcome::AlreadyLoaded) => {
                eprintln!("↻ {} already loaded", path.display());
            }
            Err(e @ RagError::DocumentRejected { .. }) => {
                warn!(error = %e, "document skipped");
                eprintln!("✗ {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if session.chunks().is_empty() {
        bail!("no documents could be loaded");
    }
    Ok(())
}

async fn build_index(
    session: &AnalystSession,
    embedder_kind: Embedder,
) -> anyhow::Result<Arc<InMemoryIndex>> {
    let index = Arc::new(InMemoryIndex::new(embedder(embedder_kind)?));
    let count = session.rebuild_index(&index).await?;
    info!(chunk_count = count, "index ready");
    Ok(index)
}

fn print_summary(session: &AnalystSession) {
    let summary = session.corpus_summary();
    println!("By company:");
    for (company, count) in &summary.chunks_by_company {
        let share = *count as f64 / summary.total_chunks as f64 * 100.0;
        println!("  {company}: {count} chunks ({share:.0}%)");
    }
    println!("By document type:");
    for (doc_type, count) in &summary.chunks_by_type {
        println!("  {doc_type}: {count} chunks");
    }
    println!("Total: {} chunks from {} files", summary.total_chunks, summary.sources.len());
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let vocabulary = load_vocabulary(cli.vocabulary.as_deref())?;
    let mut session = AnalystSession::new(config.clone(), vocabulary.clone());

    match cli.command {
        Command::Summary(args) => {
            load_documents(&mut session, &args)?;
            print_summary(&session);
        }
        Command::Retrieve(args) => {
            load_documents(&mut session, &args.corpus)?;
            let index = build_index(&session, cli.embedder).await?;
            let orchestrator = RetrievalOrchestrator::new(index, vocabulary, config);
            let retrieval = orchestrator.retrieve(&args.question, args.entities()).await?;
            println!("{}", serde_json::to_string_pretty(&retrieval)?);
        }
        Command::Ask(args) => {
            load_documents(&mut session, &args.corpus)?;
            let index = build_index(&session, cli.embedder).await?;
            let analyst = FinancialAnalyst::builder()
                .config(config)
                .vocabulary(vocabulary)
                .index(index)
                .generator(Arc::new(OpenAIChatGenerator::from_env()?))
                .build()?;

            let answer = session.ask(&analyst, &args.question, args.entities()).await?;
            println!("{}\n", answer.answer);
            for (i, source) in answer.sources.iter().enumerate() {
                println!(
                    "[{}] {} - {} (chunk {})",
                    i + 1,
                    source.metadata.company,
                    source.metadata.source,
                    source.metadata.chunk_id
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
