use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use pagerag_core::config::{resolve_with_base, Config, Settings};
use pagerag_core::pages::{collect_documents, read_pages};
use pagerag_core::{Embedder, VectorIndex};
use pagerag_embed::get_default_embedder;
use pagerag_eval::{load_eval_set, run_all, write_reports, CommandScorer, EndToEndEvaluator, EndToEndStatus, MetricsScorer, RetrievalEvaluator};
use pagerag_rag::{ChatCompletionsGenerator, Ingestor, RagPipeline};
use pagerag_vector::LanceIndex;

#[derive(Parser)]
#[command(name = "pagerag")]
#[command(version)]
#[command(about = "Ask questions about local PDF documents", long_about = None)]
struct Cli {
    /// Directory holding config.toml / config.<env>.toml; relative data paths resolve against it.
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk, embed and index a document or a directory of documents.
    Ingest { path: PathBuf },
    /// Answer a question from the indexed chunks.
    Query {
        question: String,
        #[arg(long)]
        k: Option<usize>,
        /// Print the retrieved contexts with their source and page.
        #[arg(long)]
        show_context: bool,
    },
    /// Number of indexed chunks.
    Count,
    /// Run retrieval and end-to-end evaluations and write reports.
    Eval {
        #[arg(long)]
        eval_set: Option<PathBuf>,
        #[arg(long)]
        reports_dir: Option<PathBuf>,
        /// Only evaluate retrieval; no generator calls.
        #[arg(long)]
        skip_e2e: bool,
    },
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr);
    tracing_subscriber::registry().with(env_filter).with(stderr_layer).init();
}

struct App {
    base: PathBuf,
    settings: Settings,
}

impl App {
    fn load(config_dir: &Path) -> Result<Self> {
        let config = Config::load_from(config_dir)?;
        Ok(Self { base: config_dir.to_path_buf(), settings: config.settings()? })
    }

    fn path(&self, p: &str) -> PathBuf { resolve_with_base(&self.base, p) }

    fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        Ok(Arc::from(get_default_embedder(&self.settings.embedding)?))
    }

    fn index(&self, dim: usize) -> Result<LanceIndex> {
        LanceIndex::open(&self.path(&self.settings.data.index_dir), &self.settings.data.table, dim)
    }
}

fn ingest(app: &App, path: &Path) -> Result<()> {
    let documents = collect_documents(path);
    if documents.is_empty() {
        anyhow::bail!("no .pdf or .txt documents under {}", path.display());
    }
    let mut pages = Vec::new();
    for doc in &documents {
        let doc_pages = read_pages(doc)?;
        if doc_pages.is_empty() {
            tracing::warn!(path = %doc.display(), "no extractable text; skipping");
        }
        pages.extend(doc_pages);
    }
    let embedder = app.embedder()?;
    let index = app.index(embedder.dim())?;
    let chunker = app.settings.chunking.build()?;
    let ingestor = Ingestor::new(chunker, embedder, index, app.settings.embedding.batch_size);
    let stats = ingestor.ingest(&pages)?;
    println!(
        "Ingested {} chunks from {} pages of {} documents ({} replaced); index now holds {} chunks",
        stats.chunks,
        stats.pages,
        stats.sources,
        stats.replaced,
        ingestor.index().count()?
    );
    Ok(())
}

fn pipeline(app: &App) -> Result<RagPipeline<LanceIndex, ChatCompletionsGenerator>> {
    let embedder = app.embedder()?;
    let index = app.index(embedder.dim())?;
    let generator = ChatCompletionsGenerator::from_settings(&app.settings.generation)?;
    Ok(RagPipeline::new(embedder, index, generator))
}

fn query(app: &App, question: &str, k: Option<usize>, show_context: bool) -> Result<()> {
    let pipeline = pipeline(app)?;
    let outcome = pipeline.query(question, k.unwrap_or(app.settings.retrieval.top_k))?;
    if show_context {
        for (i, (ctx, meta)) in outcome.contexts.iter().zip(&outcome.metadatas).enumerate() {
            println!("[{}] {} p.{}\n{}\n", i + 1, meta.source, meta.page, ctx);
        }
    }
    println!("{}", outcome.answer);
    Ok(())
}

fn count(app: &App) -> Result<()> {
    let embedder = app.embedder()?;
    println!("{}", app.index(embedder.dim())?.count()?);
    Ok(())
}

fn eval(app: &App, eval_set: Option<PathBuf>, reports_dir: Option<PathBuf>, skip_e2e: bool) -> Result<()> {
    let data = &app.settings.data;
    let eval_set = eval_set.unwrap_or_else(|| app.path(&data.eval_set));
    let reports_dir = reports_dir.unwrap_or_else(|| app.path(&data.reports_dir));
    let items = load_eval_set(&eval_set)?;

    let pipeline = pipeline(app)?;
    let k = app.settings.retrieval.top_k;
    let retrieval = RetrievalEvaluator::new(pipeline.embedder(), pipeline.index())
        .with_k(k)
        .with_threshold(app.settings.retrieval.similarity_threshold);
    let e2e = EndToEndEvaluator::new(&pipeline).with_k(k);
    let scorer = match &app.settings.metrics.command {
        Some(command) => Some(CommandScorer::from_command(command)?),
        None => None,
    };

    let run = run_all(
        &retrieval,
        if skip_e2e { None } else { Some(&e2e) },
        scorer.as_ref().map(|s| s as &dyn MetricsScorer),
        &items,
    )?;
    let written = write_reports(&run, &reports_dir)?;

    println!("Recall@{}: {:.3} over {} questions", run.k, run.recall, run.retrieval.len());
    match &run.end_to_end {
        EndToEndStatus::Scored { report, .. } => println!("End-to-end metrics: {:?}", report.summary()),
        EndToEndStatus::Collected(samples) => println!("Collected {} end-to-end samples (no scorer configured)", samples.len()),
        EndToEndStatus::Failed(msg) => println!("End-to-end evaluation failed: {msg}"),
        EndToEndStatus::Skipped => {}
    }
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let app = App::load(&cli.config_dir)?;
    match cli.command {
        Commands::Ingest { path } => ingest(&app, &path),
        Commands::Query { question, k, show_context } => query(&app, &question, k, show_context),
        Commands::Count => count(&app),
        Commands::Eval { eval_set, reports_dir, skip_e2e } => eval(&app, eval_set, reports_dir, skip_e2e),
    }
}
