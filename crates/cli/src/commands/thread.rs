//! `rustedscout thread`: inspect and manage stored threads.

use super::{CommandResult, load_config, open_store};
use rustedscout_core::error::Error;
use rustedscout_core::message::ThreadId;

pub async fn list() -> CommandResult {
    let config = load_config()?;
    let store = open_store(&config).await?;

    let threads = store.list_threads().await.map_err(Error::from)?;
    if threads.is_empty() {
        println!("No threads stored ({} backend).", store.backend_name());
        return Ok(());
    }
    for thread_id in threads {
        match store.peek(&thread_id).await {
            Ok(Some(state)) => {
                let status = if state.finished { "finished" } else { "interrupted" };
                println!(
                    "{thread_id}\t{status}\t{} messages\t{}",
                    state.messages.len(),
                    state.latest_query().unwrap_or("")
                );
            }
            Ok(None) => println!("{thread_id}"),
            Err(e) => println!("{thread_id}\tunreadable: {e}"),
        }
    }
    Ok(())
}

pub async fn show(thread: String) -> CommandResult {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let thread_id = ThreadId::from(thread);

    let state = store
        .peek(&thread_id)
        .await
        .map_err(Error::from)?
        .ok_or_else(|| Error::InvalidRequest(format!("thread '{thread_id}' not found")))?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

pub async fn delete(thread: String) -> CommandResult {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let thread_id = ThreadId::from(thread);

    if store.delete(&thread_id).await.map_err(Error::from)? {
        println!("Deleted thread '{thread_id}'.");
    } else {
        println!("Thread '{thread_id}' not found.");
    }
    Ok(())
}
