//! Application entry point — Houdini terminal shell.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Validate the configuration; invalid settings stop the program here
//!    with a diagnostic.
//! 4. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Build the language model client ([`GeminiClient`] wrapped in
//!    [`RetryingClient`]) and [`VoiceOutput`].  A missing or placeholder
//!    API key is fatal.
//! 6. Spawn the snapshot renderer.
//! 7. Read prompts from stdin until EOF or `/quit`.
//!
//! Lines starting with `/` are shell commands:
//!
//! | command        | effect                                  |
//! |----------------|-----------------------------------------|
//! | `/cancel`      | abandon the pending response or speech  |
//! | `/stop`        | stop speaking                           |
//! | `/reset`       | clear an error                          |
//! | `/history`     | print every turn                        |
//! | `/select N`    | highlight turn N                        |
//! | `/quit`        | exit                                    |

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use houdini::{
    config::AppConfig,
    llm::{GeminiClient, LanguageModelClient, RetryingClient},
    pipeline::{ConversationPipeline, PipelineOptions, PipelineSnapshot, PipelineState, TurnId},
    voice::VoiceOutput,
};

// ---------------------------------------------------------------------------
// Snapshot rendering
// ---------------------------------------------------------------------------

/// Print what changed between two snapshots.
fn render(previous: &PipelineSnapshot, current: &PipelineSnapshot) {
    for turn in current.history.iter().skip(previous.history.len()) {
        println!("[{}] {}", turn.id(), turn.response());
    }

    if current.state != previous.state {
        match &current.state {
            PipelineState::AwaitingResponse => println!("… thinking"),
            PipelineState::Failed(message) => println!("! {message}"),
            PipelineState::Idle | PipelineState::Speaking => {}
        }
    }

    if current.selected != previous.selected {
        if let Some(turn) = current.selected_turn() {
            println!("> {}\n  {}", turn.prompt(), turn.response());
        }
    }
}

async fn run_renderer(mut snapshots: watch::Receiver<PipelineSnapshot>) {
    let mut previous = snapshots.borrow_and_update().clone();
    while snapshots.changed().await.is_ok() {
        let current = snapshots.borrow_and_update().clone();
        render(&previous, &current);
        previous = current;
    }
}

// ---------------------------------------------------------------------------
// Input handling
// ---------------------------------------------------------------------------

/// Handle one input line.  Returns `false` when the shell should exit.
fn handle_line(pipeline: &ConversationPipeline, line: &str) -> bool {
    let Some(command) = line.trim().strip_prefix('/') else {
        if let Err(e) = pipeline.submit(line) {
            println!("! {e}");
        }
        return true;
    };

    let mut words = command.split_whitespace();
    match (words.next(), words.next()) {
        (Some("quit"), _) => return false,
        (Some("cancel"), _) => {
            if !pipeline.cancel() {
                println!("nothing to cancel");
            }
        }
        (Some("stop"), _) => pipeline.stop_speaking(),
        (Some("reset"), _) => {
            pipeline.reset();
        }
        (Some("history"), _) => {
            for turn in pipeline.history() {
                println!("{} > {}\n   {}", turn.id(), turn.prompt(), turn.response());
            }
        }
        (Some("select"), Some(n)) => match n.trim_start_matches('#').parse::<u64>() {
            Ok(n) => {
                if pipeline.select(TurnId(n)).is_none() {
                    println!("no turn #{n}");
                }
            }
            Err(_) => println!("usage: /select N"),
        },
        _ => println!("commands: /cancel /stop /reset /history /select N /quit"),
    }
    true
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Houdini starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Validation
    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {e}");
        return Err(e).context("invalid configuration");
    }

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async move {
        // 5. Model client + voice output
        let gemini = GeminiClient::from_config(&config.model).map_err(|e| {
            log::error!("Cannot create the language model client: {e}");
            e
        })?;
        log::info!("Model endpoint: {}", gemini.endpoint());

        let client: Arc<dyn LanguageModelClient> =
            Arc::new(RetryingClient::from_config(gemini, &config.model));
        let voice = Arc::new(VoiceOutput::from_config(&config.voice));
        let pipeline =
            ConversationPipeline::new(client, voice, PipelineOptions::from_config(&config));

        // 6. Renderer
        let renderer = tokio::spawn(run_renderer(pipeline.subscribe()));

        // 7. Input loop
        println!("Type a message (/quit to exit).");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
            if !handle_line(&pipeline, &line) {
                break;
            }
        }

        pipeline.cancel();
        renderer.abort();
        log::info!("Houdini shutting down");
        Ok::<(), anyhow::Error>(())
    })
}
