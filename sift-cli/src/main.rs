use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use sift_core::config::Config;
use sift_core::server::{send_request, Request, Response};
use sift_core::{
    create_corpus_store, HealthReport, MetricsSnapshot, OllamaProvider, QueryEngine,
    QueryRequest, QueryResult, Server,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Hybrid retrieval and question answering service", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the query server")]
    Serve,

    #[command(about = "Ask a running server a question")]
    Query {
        #[arg(help = "The question to answer")]
        question: String,

        #[arg(short = 'n', long, help = "Number of sources to return (1-20)")]
        max_results: Option<usize>,

        #[arg(short, long, help = "Include chunk metadata in sources")]
        metadata: bool,
    },

    #[command(about = "Show running query statistics")]
    Metrics,

    #[command(about = "Check server health")]
    Health,

    #[command(about = "Drop every cached result")]
    InvalidateCache,

    #[command(about = "Configuration commands")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    #[command(about = "Show the effective configuration")]
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sift_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Query {
            question,
            max_results,
            metadata,
        } => {
            let mut request = QueryRequest::new(question).with_metadata(metadata);
            if let Some(n) = max_results {
                request = request.with_max_results(n);
            }
            let data = call(&config, &Request::Query(request)).await?;
            let result: QueryResult = serde_json::from_value(data).context("Unexpected query response")?;
            print_result(&result);
            Ok(())
        }
        Commands::Metrics => {
            let data = call(&config, &Request::Metrics).await?;
            let metrics: MetricsSnapshot = serde_json::from_value(data).context("Unexpected metrics response")?;
            print_metrics(&metrics);
            Ok(())
        }
        Commands::Health => {
            let data = call(&config, &Request::Health).await?;
            let health: HealthReport = serde_json::from_value(data).context("Unexpected health response")?;
            print_health(&health);
            Ok(())
        }
        Commands::InvalidateCache => {
            call(&config, &Request::InvalidateCache).await?;
            println!("{} Cache invalidated", "✓".green().bold());
            Ok(())
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => show_config(&config),
        },
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

async fn serve(config: Config) -> Result<()> {
    let provider = Arc::new(OllamaProvider::new(&config.llm));
    let corpus = create_corpus_store(&config.corpus);
    let socket_path = config.server.socket_path.clone();
    let engine = QueryEngine::new(config, provider, corpus).context("Failed to build query engine")?;

    println!("{} Listening on {}", "→".blue(), socket_path.cyan());
    Server::new(engine, socket_path)
        .start()
        .await
        .context("Server failed")?;
    Ok(())
}

async fn call(config: &Config, request: &Request) -> Result<serde_json::Value> {
    let response = send_request(&config.server.socket_path, request)
        .await
        .with_context(|| {
            format!(
                "Failed to reach server at {}. Is `sift serve` running?",
                config.server.socket_path
            )
        })?;

    match response {
        Response::Ok { data } => Ok(data),
        Response::Error { kind, message } => bail!("{:?} error: {}", kind, message),
    }
}

fn print_result(result: &QueryResult) {
    println!("{}", "Answer:".bold().green());
    println!("{}", result.answer);
    println!();

    if result.sources.is_empty() {
        println!("{}", "No sources.".yellow());
    } else {
        println!("{}", "Sources:".bold());
        for (i, source) in result.sources.iter().enumerate() {
            println!(
                "  {} {} (hybrid {:.3}, vector {:.3}, bm25 {:.3})",
                format!("[{}]", i + 1).cyan(),
                source.chunk_id.bold(),
                source.hybrid_score,
                source.vector_score,
                source.bm25_score
            );
            println!("      {}", source.content.dimmed());
            if let Some(metadata) = &source.metadata {
                println!(
                    "      doc {} chunk {} ({} words), matched \"{}\"",
                    metadata.doc_id, metadata.chunk_index, metadata.word_count, metadata.matched_variation
                );
            }
        }
    }
    println!();

    println!("{}", "Evaluation:".bold());
    println!("  Answer relevance:  {:.3}", result.evaluation.answer_relevance);
    println!("  Context precision: {:.3}", result.evaluation.context_precision);
    println!("  Faithfulness:      {:.3}", result.evaluation.faithfulness);
    println!();

    let cached = if result.cached { "cached".green() } else { "fresh".normal() };
    println!(
        "{} variations, {} ms, {}",
        result.variations.len(),
        result.response_time_ms,
        cached
    );
}

fn print_metrics(metrics: &MetricsSnapshot) {
    println!("{}", "Query Metrics:".bold().green());
    println!("  Total queries:     {}", metrics.total_queries);
    println!("  Avg response time: {:.1} ms", metrics.average_response_time);
    println!("  Cache hit rate:    {:.1}%", metrics.cache_hit_rate * 100.0);
    println!("  Error rate:        {:.1}%", metrics.error_rate * 100.0);
}

fn print_health(health: &HealthReport) {
    let status = if health.status == "ok" {
        health.status.green().bold()
    } else {
        health.status.yellow().bold()
    };
    println!("{}: {}", "Status".bold(), status);
    match health.corpus_chunks {
        Some(count) => println!("  Corpus chunks: {}", count),
        None => println!("  Corpus chunks: {}", "unavailable".yellow()),
    }
    println!("  Cache entries: {}", health.cache_entries);
    println!();
    print_metrics(&health.metrics);
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "LLM:".bold());
    println!("  Model:           {}", config.llm.model.cyan());
    println!("  Base URL:        {}", config.llm.base_url);
    println!("  Temperature:     {}", config.llm.temperature);
    println!("  Request Timeout: {}s", config.llm.request_timeout_secs);
    println!();
    println!("{}", "Retrieval:".bold());
    println!("  Embedding Model: {}", config.retrieval.embedding_model.cyan());
    println!("  Expansions:      {}", config.retrieval.expansion_count);
    println!("  Max Results:     {}", config.retrieval.default_max_results);
    println!(
        "  Question Length: {}-{} chars",
        config.retrieval.min_question_chars, config.retrieval.max_question_chars
    );
    println!("  Embed Parallel:  {}", config.retrieval.embedding_concurrency);
    println!("  Score Threads:   {}", config.retrieval.scoring_threads);
    println!();
    println!("{}", "Cache:".bold());
    println!("  Default TTL:     {}s", config.cache.default_ttl_secs);
    println!("  Query TTL:       {}s", config.cache.query_ttl_secs);
    println!("  Max Entries:     {}", config.cache.max_entries);
    println!();
    println!("{}", "Corpus:".bold());
    println!("{}", serde_json::to_string_pretty(&config.corpus)?);
    println!();
    println!("{}", "Server:".bold());
    println!("  Socket:          {}", config.server.socket_path);

    Ok(())
}
