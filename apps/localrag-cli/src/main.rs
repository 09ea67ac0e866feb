use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use localrag_core::config::{expand_path, Config, RagSettings};
use localrag_core::{Chunk, Chunker, DocumentSource, Embedder, Generator, RetrievalResult, TextDirSource};
use localrag_embed::get_default_embedder;
use localrag_generate::OllamaGenerator;
use localrag_retrieve::{
    AnswerSynthesizer, HydeRetriever, ModelIds, RetrievalStrategy, Retriever, SelfRag, SelfRagOptions, StrategyKind,
};
use localrag_vector::snapshot;

#[derive(Parser)]
#[command(name = "localrag", version, about = "Local retrieval-augmented generation over a text corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk and embed a corpus, then write an index snapshot
    Index {
        /// Corpus directory (defaults to rag.corpus_dir)
        dir: Option<PathBuf>,
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        strategy: Option<StrategyKind>,
    },
    /// Show the chunks retrieved for a question
    Query {
        question: String,
        #[command(flatten)]
        opts: RetrieveOpts,
    },
    /// Retrieve and generate an answer
    Answer {
        question: String,
        #[command(flatten)]
        opts: RetrieveOpts,
        /// Grade the answer and rewrite it when the grade is low
        #[arg(long)]
        self_rag: bool,
    },
}

#[derive(Args)]
struct RetrieveOpts {
    #[arg(long)]
    strategy: Option<StrategyKind>,
    #[arg(short = 'k', long = "top-k")]
    top_k: Option<usize>,
    /// Snapshot root; falls back to indexing the corpus when absent
    #[arg(long)]
    snapshot: Option<PathBuf>,
    #[arg(long)]
    corpus: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let pipeline = Pipeline::new(config.settings()?)?;

    match cli.command {
        Command::Index { dir, snapshot: snapshot_root, strategy } => {
            let kind = pipeline.strategy_kind(strategy)?;
            let corpus = dir.unwrap_or_else(|| expand_path(&pipeline.settings.corpus_dir));
            let target = pipeline.snapshot_dir(snapshot_root.as_deref(), kind);
            println!("localrag indexer\n================");
            println!("Corpus: {}", corpus.display());
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
            pb.set_message(format!("embedding corpus for {kind} retrieval"));
            pb.enable_steady_tick(Duration::from_millis(100));
            let strategy = pipeline.build(kind, &corpus)?;
            pb.finish_and_clear();
            let index = match &strategy {
                RetrievalStrategy::Direct(r) => r.index().context("direct index was not built")?,
                RetrievalStrategy::Hyde(h) => h.index(),
            };
            snapshot::save(index, &target)?;
            println!("✅ Indexed {} chunks ({} metric) into {}", index.len(), index.metric(), target.display());
        }
        Command::Query { question, opts } => {
            let (strategy, top_k) = pipeline.open(&opts)?;
            let retrieval = strategy.retrieve(&question, top_k)?;
            println!("🔍 {} results for \"{}\" ({} retrieval)", retrieval.result.len(), question, strategy.kind());
            if let Some(doc) = &retrieval.hypothetical_document {
                println!("\n📝 Hypothetical document:\n{}", doc.trim());
            }
            print_hits(&retrieval.result);
        }
        Command::Answer { question, opts, self_rag } => {
            let (strategy, top_k) = pipeline.open(&opts)?;
            if self_rag {
                let options = SelfRagOptions { top_k, improve_threshold: pipeline.settings.improve_threshold, ..SelfRagOptions::default() };
                let response = SelfRag::new(strategy, pipeline.generator.clone(), options).generate_response(&question)?;
                println!("{}", response.final_response);
                println!(
                    "\n📊 Score {:.1}/10{} ({})",
                    response.evaluation.overall_score,
                    if response.improved { ", improved" } else { "" },
                    response.evaluation.overall_explanation
                );
                println!("📚 Sources: {:?}", response.sources);
            } else {
                let retrieval = strategy.retrieve(&question, top_k)?;
                let synthesizer = AnswerSynthesizer::with_max_new_tokens(pipeline.generator.clone(), pipeline.settings.answer_max_tokens);
                println!("{}", synthesizer.answer(&question, &retrieval.result)?);
                print_hits(&retrieval.result);
            }
        }
    }
    Ok(())
}

fn print_hits(result: &RetrievalResult) {
    for (i, hit) in result.hits.iter().enumerate() {
        println!(
            "\n  {}. {}={:.4}  source={}  offset={}",
            i + 1,
            result.kind.label(),
            hit.score,
            hit.chunk.source_index,
            hit.chunk.source_offset
        );
        println!("     {}", hit.chunk.text);
    }
}

struct Pipeline {
    settings: RagSettings,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
}

impl Pipeline {
    fn new(settings: RagSettings) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder()?);
        let generator: Arc<dyn Generator> = Arc::new(OllamaGenerator::from_settings(&settings)?);
        Ok(Self { settings, embedder, generator })
    }

    fn strategy_kind(&self, requested: Option<StrategyKind>) -> Result<StrategyKind> {
        match requested {
            Some(kind) => Ok(kind),
            None => Ok(self.settings.strategy.parse()?),
        }
    }

    /// Each strategy keeps its own snapshot since the metrics differ.
    fn snapshot_dir(&self, root: Option<&Path>, kind: StrategyKind) -> PathBuf {
        root.map(Path::to_path_buf).unwrap_or_else(|| expand_path(&self.settings.snapshot_dir)).join(kind.as_str())
    }

    fn models(&self) -> ModelIds {
        ModelIds { generator: self.settings.generator_model.clone(), embedder: self.settings.embedding_model.clone() }
    }

    fn load_chunks(&self, corpus: &Path) -> Result<Vec<Chunk>> {
        let texts = TextDirSource::new().load(corpus)?;
        Ok(Chunker::from_config(self.settings.chunking())?.chunk(&texts))
    }

    fn build(&self, kind: StrategyKind, corpus: &Path) -> Result<RetrievalStrategy> {
        let chunks = self.load_chunks(corpus)?;
        info!(chunks = chunks.len(), strategy = %kind, "building index");
        Ok(match kind {
            StrategyKind::Direct => {
                let mut retriever = Retriever::new(self.embedder.clone());
                retriever.build_from_chunks(chunks)?;
                retriever.into()
            }
            StrategyKind::Hyde => HydeRetriever::from_chunks(
                chunks,
                self.settings.chunking(),
                self.generator.clone(),
                self.embedder.clone(),
                self.models(),
            )?
            .into(),
        })
    }

    /// Restore the strategy's snapshot when one exists, else index the corpus.
    fn open(&self, opts: &RetrieveOpts) -> Result<(RetrievalStrategy, usize)> {
        let kind = self.strategy_kind(opts.strategy)?;
        let top_k = opts.top_k.unwrap_or(self.settings.top_k);
        let dir = self.snapshot_dir(opts.snapshot.as_deref(), kind);
        if !dir.exists() {
            let corpus = opts.corpus.clone().unwrap_or_else(|| expand_path(&self.settings.corpus_dir));
            info!(snapshot = %dir.display(), corpus = %corpus.display(), "no snapshot, indexing corpus");
            return Ok((self.build(kind, &corpus)?, top_k));
        }
        let index = snapshot::load(&dir)?;
        let strategy: RetrievalStrategy = match kind {
            StrategyKind::Direct => Retriever::from_index(self.embedder.clone(), index)?.into(),
            StrategyKind::Hyde => HydeRetriever::from_index(
                index,
                self.settings.chunking(),
                self.generator.clone(),
                self.embedder.clone(),
                self.models(),
            )?
            .into(),
        };
        Ok((strategy, top_k))
    }
}
