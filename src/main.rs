//! brand-monitor: one monitoring run per invocation.
//! Loads `.env` and config, wires providers/scorer/sink/notifier, runs the
//! pipeline and prints the report as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use tracing::{info, warn};

use brand_mention_monitor::alert::{AlertNotifier, LogNotifier, SlackNotifier};
use brand_mention_monitor::config::{InputConfig, PipelineConfig, ScorerKind, StoreKind};
use brand_mention_monitor::ingest::providers::{json_file::JsonFileProvider, synthetic::SyntheticProvider};
use brand_mention_monitor::ingest::types::SourceProvider;
use brand_mention_monitor::sentiment::{DynScorer, HuggingFaceScorer, LexiconScorer, SentimentScorer};
use brand_mention_monitor::store::{CsvSink, GoogleSheetsSink, MentionSink};
use brand_mention_monitor::telemetry::{init_tracing, install_prometheus};
use brand_mention_monitor::{Pipeline, Source};

/// Brand mention monitor - collect, score, persist and alert
#[derive(Parser, Debug)]
#[command(name = "brand-monitor", version, about, long_about = None)]
struct Args {
    /// Config file (TOML or JSON); overrides MONITOR_CONFIG_PATH
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the sink and log the alert instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// JSON log lines instead of compact text
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus exposition text after the run
    #[arg(long)]
    metrics: bool,

    /// Fill sources without an input file with synthetic mentions
    #[arg(long)]
    synthetic: bool,

    /// Raw records for one source, e.g. `--input twitter=data/tweets.json`
    #[arg(long = "input", value_name = "SOURCE=PATH", value_parser = parse_input)]
    inputs: Vec<InputConfig>,
}

fn parse_input(s: &str) -> Result<InputConfig, String> {
    let (source, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SOURCE=PATH, got `{s}`"))?;
    let source: Source = source.trim().parse().map_err(|e: anyhow::Error| e.to_string())?;
    let path = path.trim();
    if path.is_empty() {
        return Err(format!("empty path for {source}"));
    }
    Ok(InputConfig {
        source,
        path: PathBuf::from(path),
    })
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let cfg = match &args.config {
        Some(p) => PipelineConfig::load_from(p)?,
        None => PipelineConfig::load_default()?,
    };
    let mut cfg = cfg.with_env_overrides();
    cfg.inputs.extend(args.inputs.iter().cloned());
    cfg.synthetic |= args.synthetic;
    Ok(cfg)
}

fn build_providers(cfg: &PipelineConfig) -> Vec<Box<dyn SourceProvider>> {
    let mut providers: Vec<Box<dyn SourceProvider>> = Vec::new();
    for input in &cfg.inputs {
        providers.push(Box::new(JsonFileProvider::from_path(input.source, input.path.clone())));
    }
    if cfg.synthetic {
        for source in Source::ALL {
            if !cfg.inputs.iter().any(|i| i.source == source) {
                providers.push(Box::new(SyntheticProvider::new(source, cfg.synthetic_count)));
            }
        }
    }
    providers
}

fn build_scorer(cfg: &PipelineConfig) -> Result<DynScorer> {
    match (cfg.sentiment.provider, &cfg.sentiment.api_token) {
        (ScorerKind::Lexicon, _) => Ok(Arc::new(LexiconScorer::new())),
        (ScorerKind::Huggingface, Some(token)) => {
            let hf = HuggingFaceScorer::new(token.clone(), cfg.sentiment.model.as_deref())?;
            Ok(Arc::new(hf))
        }
        (ScorerKind::Huggingface, None) => {
            warn!("huggingface scorer selected but HF_API_TOKEN is unset; using lexicon");
            Ok(Arc::new(LexiconScorer::new()))
        }
    }
}

fn build_sink(cfg: &PipelineConfig) -> Result<Option<Arc<dyn MentionSink>>> {
    let store = &cfg.store;
    let sink: Option<Arc<dyn MentionSink>> = match store.kind {
        StoreKind::None => None,
        StoreKind::Csv => Some(Arc::new(CsvSink::new(store.csv_path.clone()))),
        StoreKind::GoogleSheets => {
            let id = store
                .spreadsheet_id
                .clone()
                .ok_or_else(|| anyhow!("google_sheets store needs spreadsheet_id"))?;
            let token = store
                .access_token
                .clone()
                .ok_or_else(|| anyhow!("google_sheets store needs GOOGLE_SHEETS_TOKEN"))?;
            Some(Arc::new(GoogleSheetsSink::new(id, store.range.clone(), token)?))
        }
    };
    Ok(sink)
}

fn build_notifier(cfg: &PipelineConfig, dry_run: bool) -> Arc<dyn AlertNotifier> {
    match (&cfg.alert.slack_webhook_url, dry_run) {
        (Some(url), false) => Arc::new(
            SlackNotifier::new(url.clone())
                .with_timeout(cfg.alert.timeout_secs)
                .with_retries(cfg.alert.retries),
        ),
        _ => Arc::new(LogNotifier),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let prometheus = if args.metrics {
        Some(install_prometheus()?)
    } else {
        None
    };

    let cfg = load_config(&args)?;
    let providers = build_providers(&cfg);
    if providers.is_empty() {
        bail!("no sources configured; pass --input SOURCE=PATH or --synthetic");
    }
    let scorer = build_scorer(&cfg)?;
    let notifier = build_notifier(&cfg, args.dry_run);
    let sink = if args.dry_run { None } else { build_sink(&cfg)? };

    info!(
        providers = providers.len(),
        scorer = scorer.name(),
        notifier = notifier.name(),
        sink = sink.as_ref().map(|s| s.name()).unwrap_or("none"),
        threshold = cfg.threshold,
        "starting run"
    );

    let mut pipeline = Pipeline::new(providers, scorer, notifier, cfg);
    if let Some(sink) = sink {
        pipeline = pipeline.with_sink(sink);
    }
    let report = pipeline.run().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(handle) = prometheus {
        println!("{}", handle.render());
    }
    Ok(())
}
