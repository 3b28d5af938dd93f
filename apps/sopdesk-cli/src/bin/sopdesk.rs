//! `sopdesk`: SOP-grounded support replies and FAQ gap analysis.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use sopdesk_core::config::{resolve_with_base, Config, Settings};
use sopdesk_core::types::Document;
use sopdesk_rag::store::FsStore;
use sopdesk_rag::{PairOutcome, SentimentClassifier, SopPipeline, ThreadSentimentOutcome};

#[derive(Parser)]
#[command(name = "sopdesk")]
#[command(about = "SOP-grounded support replies and FAQ coverage analysis")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, env = "SOPDESK_CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,

    /// Override storage.data_dir
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print how a stored document is chunked
    Chunks {
        document_id: String,
    },
    /// Evaluate every FAQ against a document and persist verdicts
    Coverage {
        document_id: String,
    },
    /// Draft a reply to a support email, grounded in a document
    Reply(ReplyArgs),
    /// Classify the sentiment of every stored thread
    Sentiment,
}

#[derive(Args)]
struct ReplyArgs {
    document_id: String,

    /// Answer a stored thread instead of a single email
    #[arg(long, conflicts_with_all = ["subject", "body", "sender"])]
    thread: Option<String>,

    #[arg(long)]
    subject: Option<String>,

    #[arg(long)]
    body: Option<String>,

    #[arg(long)]
    sender: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lance=warn,lance_datafusion=warn,datafusion=warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = Config::load_from(&cli.config_dir)
        .with_context(|| format!("loading configuration from {}", cli.config_dir.display()))?;
    let settings = config.settings()?;
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => resolve_with_base(&cli.config_dir, &settings.storage.data_dir),
    };
    let store = Arc::new(FsStore::new(&data_dir));
    tracing::debug!(data_dir = %data_dir.display(), "using filesystem store");

    match cli.command {
        Command::Chunks { document_id } => print_chunks(&settings, &store, &document_id).await,
        Command::Coverage { document_id } => run_coverage(&settings, store, &data_dir, &document_id).await,
        Command::Reply(args) => run_reply(&settings, store, &data_dir, args).await,
        Command::Sentiment => run_sentiment(&settings, &store).await,
    }
}

async fn pipeline(settings: &Settings, store: Arc<FsStore>, data_dir: &Path) -> Result<SopPipeline> {
    let embedder = sopdesk_llm::build_embedder(&settings.embedding)?;
    let generator = sopdesk_llm::build_generator(&settings.generation)?;
    let pipeline = SopPipeline::new(settings, Arc::clone(&embedder), generator, store.clone(), store.clone(), store)?;
    with_cache(pipeline, data_dir, embedder.dim()).await
}

#[cfg(feature = "lance-cache")]
async fn with_cache(pipeline: SopPipeline, data_dir: &Path, dim: usize) -> Result<SopPipeline> {
    let uri = data_dir.join("embedding_cache");
    let cache = sopdesk_vector::LanceEmbeddingCache::open(&uri.to_string_lossy(), "embeddings", dim).await?;
    Ok(pipeline.with_cache(Arc::new(cache)))
}

#[cfg(not(feature = "lance-cache"))]
async fn with_cache(pipeline: SopPipeline, _data_dir: &Path, _dim: usize) -> Result<SopPipeline> {
    Ok(pipeline)
}

async fn print_chunks(settings: &Settings, store: &FsStore, document_id: &str) -> Result<()> {
    use sopdesk_core::traits::DocumentStore;

    let chunker = sopdesk_core::chunker::TextChunker::new(settings.chunking.clone())?;
    let document = Document::new(document_id, store.get_content(document_id).await?);
    let chunks = chunker.chunk_document(document_id, &document.text()?);
    for chunk in &chunks {
        println!("--- chunk {} ({} chars)", chunk.ordinal, chunk.text.chars().count());
        println!("{}", chunk.text);
    }
    println!("{} chunks", chunks.len());
    Ok(())
}

async fn run_coverage(settings: &Settings, store: Arc<FsStore>, data_dir: &Path, document_id: &str) -> Result<()> {
    let pipeline = pipeline(settings, store, data_dir).await?;
    let run = pipeline
        .evaluate_coverage(document_id)
        .await
        .with_context(|| format!("evaluating coverage of {document_id}"))?;

    for outcome in &run.outcomes {
        match outcome {
            PairOutcome::Done(v) => println!("{}\t{}\t{}", v.faq_id, v.coverage_type, v.reason),
            PairOutcome::Failed(f) => println!("{}\tFAILED at {}\t{}", f.faq_id, f.stage, f.error),
        }
    }
    println!("{} verdicts saved, {} failed", run.done_count(), run.failed_count());
    if run.failed_count() > 0 && run.done_count() == 0 {
        bail!("no FAQ could be evaluated");
    }
    Ok(())
}

enum ReplyTarget {
    Thread(String),
    Email { subject: String, body: String, sender: String },
}

impl ReplyArgs {
    fn target(self) -> Result<ReplyTarget> {
        match (self.thread, self.subject, self.body, self.sender) {
            (Some(thread_id), ..) => Ok(ReplyTarget::Thread(thread_id)),
            (None, Some(subject), Some(body), Some(sender)) => Ok(ReplyTarget::Email { subject, body, sender }),
            _ => bail!("pass either --thread <id> or all of --subject, --body and --sender"),
        }
    }
}

async fn run_reply(settings: &Settings, store: Arc<FsStore>, data_dir: &Path, args: ReplyArgs) -> Result<()> {
    let document_id = args.document_id.clone();
    let target = args.target()?;
    let pipeline = pipeline(settings, store.clone(), data_dir).await?;
    let index = pipeline.build_index(&document_id).await?;
    let reply = match target {
        ReplyTarget::Thread(thread_id) => pipeline.answer_thread(store.as_ref(), &thread_id, &index).await?,
        ReplyTarget::Email { subject, body, sender } => pipeline.answer_email(&subject, &body, &sender, &index).await?,
    };
    println!("{reply}");
    Ok(())
}

async fn run_sentiment(settings: &Settings, store: &FsStore) -> Result<()> {
    let generator = sopdesk_llm::build_generator(&settings.generation)?;
    let classifier = SentimentClassifier::new(generator, &settings.sentiment)?;
    for outcome in classifier.refresh_all(store, store).await? {
        match outcome {
            ThreadSentimentOutcome::Updated { thread_id, sentiment } => println!("{thread_id}\t{sentiment}"),
            ThreadSentimentOutcome::Skipped { thread_id } => println!("{thread_id}\t(unchanged)"),
            ThreadSentimentOutcome::Failed { thread_id, error } => println!("{thread_id}\tFAILED\t{error}"),
        }
    }
    Ok(())
}
