//! plexus - branching conversations against streaming LLM providers
//!
//! `plexus ask` runs one question through a fresh session and streams the
//! answer to stdout. Logs go to stderr, filtered by `PLEXUS_LOG`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use plexus::config::{Overrides, AVAILABLE_MODELS};
use plexus::graph::PlexusSession;
use plexus::llm::SnapshotSink;
use plexus::{Orchestrator, PlexusConfig, ProviderAdapter};

#[derive(Parser)]
#[command(name = "plexus")]
#[command(about = "Branching conversation graph over streaming LLM providers")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question and stream the answer
    Ask {
        question: String,

        /// Model id (see `plexus models`)
        #[arg(long, short = 'm', env = "PLEXUS_MODEL")]
        model: Option<String>,

        /// System prompt sent ahead of the conversation
        #[arg(long, short = 's')]
        system: Option<String>,

        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long)]
        top_k: Option<u32>,

        /// Also generate a one-line summary of the answer
        #[arg(long)]
        summarize: bool,
    },
    /// List the available models
    Models,
}

/// Prints only the part of each snapshot not yet on screen
#[derive(Default)]
struct TerminalSink {
    printed: usize,
}

impl SnapshotSink for TerminalSink {
    fn snapshot(&mut self, text: &str) {
        if let Some(suffix) = text.get(self.printed..) {
            print!("{}", suffix);
            let _ = std::io::stdout().flush();
            self.printed = text.len();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = PlexusConfig::from_env();

    fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Models => {
            for model in AVAILABLE_MODELS {
                println!("{:<28} {:<22} {}", model.id, model.name, model.provider.as_str());
            }
            Ok(())
        }
        Command::Ask {
            question,
            model,
            system,
            temperature,
            top_k,
            summarize,
        } => {
            config
                .apply(Overrides {
                    model,
                    system_prompt: system,
                    temperature,
                    top_k,
                    summarize,
                })
                .context("invalid options, run `plexus models` for the model list")?;

            ask(&config, &question).await
        }
    }
}

async fn ask(config: &PlexusConfig, question: &str) -> Result<()> {
    let generation = config.generation_config();
    info!("Using {} ({})", generation.model, generation.provider);

    let adapter = ProviderAdapter::new(config.credentials())
        .with_base_urls(&config.openai_base_url, &config.gemini_base_url)
        .with_timeout(config.request_timeout());

    let session = PlexusSession::new().into_shared();
    let orchestrator = Orchestrator::new(session.clone(), adapter, generation)
        .with_auto_summarize(config.auto_summarize);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, keeping partial answer");
            ctrl_c.cancel();
        }
    });

    let mut sink = TerminalSink::default();
    let answer_id = orchestrator
        .submit(question, &mut sink, &cancel)
        .await
        .context("failed to record answer")?;
    println!();

    let session = session.lock().await;
    let node = session
        .graph()
        .node(&answer_id)
        .context("answer node missing from graph")?;

    if sink.printed == 0 {
        // nothing streamed: show the error indicator or "No response."
        println!("{}", node.label);
        if node.label.starts_with("Error: ") {
            bail!("generation failed");
        }
    }
    if let Some(summary) = &node.summary {
        eprintln!("Summary: {}", summary);
    }

    Ok(())
}
