//! `rustedscout research` and `rustedscout resume`.

use super::{CommandResult, build_engine, load_config};
use rustedscout_core::message::ThreadId;
use rustedscout_engine::{
    CancellationToken, EngineEvent, ResearchRequest, ResearchResponse, RunOptions,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub async fn run(
    query: String,
    thread: Option<String>,
    max_turns: Option<u32>,
    stream: bool,
) -> CommandResult {
    let config = load_config()?;
    let engine = build_engine(&config).await?;

    let (mut options, printer) = run_options(stream);
    options.max_turns = max_turns;
    let request = ResearchRequest {
        thread_id: thread.map(ThreadId::from),
        query,
    };

    let result = engine.run_with(request, options).await;
    finish(printer).await;
    print_response(&result?);
    Ok(())
}

pub async fn resume(thread: String, stream: bool) -> CommandResult {
    let config = load_config()?;
    let engine = build_engine(&config).await?;

    let (options, printer) = run_options(stream);
    let result = engine.resume(&ThreadId::from(thread), options).await;
    finish(printer).await;
    print_response(&result?);
    Ok(())
}

/// Cancellation on Ctrl-C, plus an event printer when streaming.
fn run_options(stream: bool) -> (RunOptions, Option<JoinHandle<()>>) {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            on_interrupt.cancel();
        }
    });

    let mut options = RunOptions {
        cancel: Some(cancel),
        ..RunOptions::default()
    };
    if !stream {
        return (options, None);
    }

    let (tx, mut rx) = mpsc::channel::<EngineEvent>(64);
    options.events = Some(tx);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => eprintln!("{line}"),
                Err(e) => tracing::debug!(error = %e, "Unserializable event"),
            }
        }
    });
    (options, Some(printer))
}

/// Wait for buffered events to be printed. The sender lives in the run
/// options, which the engine consumed, so the channel is already closed.
async fn finish(printer: Option<JoinHandle<()>>) {
    if let Some(printer) = printer {
        let _ = printer.await;
    }
}

fn print_response(response: &ResearchResponse) {
    println!("{}", response.text);
    tracing::info!(
        thread = %response.thread_id,
        turns = response.turns,
        sources = response.sources.len(),
        "Answer printed"
    );
}
