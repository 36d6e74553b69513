use anyhow::Context;
use caselens_embed::create_provider;
use caselens_retriever::{
    config::{CaselensConfig, CorpusKind},
    corpus::{CaseCorpus, Corpus, DocumentCorpus},
    generation::{OllamaGenerator, answer_question},
    insights::{Bucket, CaseBook, Lookup, build_recommendation},
    retrieval::{
        indexing_engine::{Indexer, IndexerConfig},
        indexing_mode::IndexingMode,
        retriever::{Retriever, ScoredResult},
    },
    status::IndexStatus,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Semantic search over historical support cases and reference documents.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to ./caselens.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bring the index in line with the corpus
    Index {
        /// Rebuild every document from scratch, replacing the artifacts once done
        #[arg(long)]
        rebuild: bool,
        /// Indexing mode (incremental, full-rebuild); `--rebuild` is shorthand for full-rebuild
        #[arg(short, long, conflicts_with = "rebuild")]
        mode: Option<IndexingMode>,
    },
    /// Find the most similar chunks or cases
    Search {
        query: String,
        /// Maximum number of results (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Answer a question from retrieved context
    Ask {
        question: String,
        /// Passages given to the generator (defaults to retrieval.context_top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Workload summary for an owner, or details for a numeric case id
    Insights {
        input: String,
        /// List the owner's cases in this bucket (pending, overdue, critical, all)
        #[arg(short, long)]
        bucket: Option<Bucket>,
        #[arg(short = 'n', long, default_value_t = 3)]
        top_n: usize,
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show artifact health
    Status {
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Print the effective configuration as TOML
    Config,
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

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn open_corpus(config: &CaselensConfig) -> anyhow::Result<Arc<dyn Corpus>> {
    let corpus: Arc<dyn Corpus> = match config.corpus.kind {
        CorpusKind::Documents => Arc::new(DocumentCorpus::new(&config.paths.corpus_dir)),
        CorpusKind::Cases => Arc::new(CaseCorpus::open(
            &config.paths.cases_file,
            config.schema.clone(),
        )?),
    };
    Ok(corpus)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn snippet(text: &str, limit: usize) -> String {
    let mut out: String = text.chars().take(limit).collect();
    if text.chars().count() > limit {
        out.push('…');
    }
    out
}

fn print_results(results: &[ScoredResult], format: &OutputFormat) {
    for (rank, hit) in results.iter().enumerate() {
        println!(
            "{}. [{:5.1}%] {} #{} (distance {:.4})",
            rank + 1,
            hit.confidence,
            hit.record.source,
            hit.record.chunk_index,
            hit.distance
        );
        if let Some(case) = &hit.record.case {
            println!(
                "   status: {} | owner: {} | aging: {}",
                case.status.as_deref().unwrap_or("-"),
                case.owner.as_deref().unwrap_or("-"),
                case.aging
            );
        }
        match format {
            OutputFormat::Full => println!("   {}", hit.record.text),
            _ => println!("   {}", snippet(&hit.record.text, 160)),
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = CaselensConfig::load(args.config.as_deref())?;
    let paths = config.artifact_paths();

    match args.command {
        Commands::Index { rebuild, mode } => {
            let mode = match mode {
                Some(mode) => mode,
                None if rebuild => IndexingMode::FullRebuild,
                None => IndexingMode::Incremental,
            };
            let embedder = create_provider(&config.embedding).await?;
            let indexer = Indexer::new(
                IndexerConfig::new(paths)
                    .with_chunker(config.word_chunker())
                    .with_mode(mode),
                embedder,
                open_corpus(&config)?,
            );
            let report = indexer.incremental_index().await?;
            println!("{report}");
        }
        Commands::Search {
            query,
            top_k,
            format,
        } => {
            let embedder = create_provider(&config.embedding).await?;
            let retriever = Retriever::open(&paths, embedder)?;
            let results = retriever
                .search(&query, top_k.unwrap_or(config.retrieval.top_k))
                .await?;

            if format == OutputFormat::Json {
                return print_json(&results);
            }
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            print_results(&results, &format);
            if config.corpus.kind == CorpusKind::Cases {
                println!("\nSuggested resolution:\n{}", build_recommendation(&results, 3));
            }
        }
        Commands::Ask {
            question,
            top_k,
            format,
        } => {
            let embedder = create_provider(&config.embedding).await?;
            let retriever = Retriever::open(&paths, embedder)?;
            let generator = OllamaGenerator::new(&config.generation)?;
            let answer = answer_question(
                &retriever,
                &generator,
                &question,
                top_k.unwrap_or(config.retrieval.context_top_k),
            )
            .await?;

            if format == OutputFormat::Json {
                return print_json(&answer);
            }
            println!("{}", answer.text);
            if !answer.passages.is_empty() {
                println!("\nSources:");
                for passage in &answer.passages {
                    println!("  [{:5.1}%] {}", passage.confidence, passage.source);
                }
            }
        }
        Commands::Insights {
            input,
            bucket,
            top_n,
            format,
        } => {
            let corpus = CaseCorpus::open(&config.paths.cases_file, config.schema.clone())
                .context("insights need a case export (paths.cases_file)")?;
            let book = CaseBook::new(corpus.records());
            let lookup = book.lookup(&input);

            if format == OutputFormat::Json {
                let cases = match (&lookup, bucket) {
                    (Lookup::Owner(_), Some(bucket)) => book.cases_in_bucket(&input, bucket, top_n),
                    _ => Vec::new(),
                };
                return print_json(&serde_json::json!({ "lookup": lookup, "cases": cases }));
            }

            match lookup {
                Lookup::Case { case_id, record: None } => println!("Case {case_id} not found."),
                Lookup::Case { record: Some(case), .. } => {
                    println!("{}", serde_json::to_string_pretty(&case)?);
                }
                Lookup::Owner(summary) => {
                    println!("{summary}");
                    if let Some(bucket) = bucket {
                        println!("\nTop {top_n} {bucket} cases:");
                        for case in book.cases_in_bucket(&input, bucket, top_n) {
                            println!(
                                "  {} | {} | aging {} | {}",
                                case.case_id.as_deref().unwrap_or("-"),
                                case.status.as_deref().unwrap_or("-"),
                                case.aging,
                                snippet(case.summary.as_deref().unwrap_or(""), 80)
                            );
                        }
                    }
                }
            }
        }
        Commands::Status { format } => {
            let listing = match open_corpus(&config) {
                Ok(corpus) => corpus.list().await.map_err(anyhow::Error::from),
                Err(e) => Err(e),
            };
            let listing = listing
                .map_err(|e| warn!("Corpus unavailable, skipping change detection: {e:#}"))
                .ok();
            let status = IndexStatus::inspect(&paths, listing.as_deref());

            if format == OutputFormat::Json {
                return print_json(&status);
            }
            print!("{status}");
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
