use anyhow::{Context, Result, bail};
use branchline_application::Branchline;
use branchline_core::conversation::Sender;
use branchline_core::overlay::PhantomMessage;
use serde_json::Value;
use std::path::Path;

pub async fn set(
    app: &Branchline,
    conversation_id: &str,
    file: Option<&Path>,
    texts: Vec<String>,
) -> Result<()> {
    let messages = match file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_phantom_file(&raw)?
        }
        None => alternating(texts),
    };

    if messages.is_empty() {
        bail!("No phantom messages given; use `phantoms clear` to remove them");
    }

    let stored = app.store_phantoms(conversation_id, messages).await?;
    println!("✅ Stored {} phantom message(s) for {conversation_id}", stored.len());
    Ok(())
}

pub async fn clear(app: &Branchline, conversation_id: &str) -> Result<()> {
    app.clear_phantoms(conversation_id).await?;
    println!("🧹 Cleared phantom messages for {conversation_id}");
    Ok(())
}

pub async fn show(app: &Branchline, conversation_id: &str) -> Result<()> {
    match app.phantoms(conversation_id).await? {
        Some(sequence) => println!("{}", serde_json::to_string_pretty(&sequence)?),
        None => println!("No phantom messages for {conversation_id}"),
    }
    Ok(())
}

pub async fn migrate(app: &Branchline, conversation_id: Option<&str>) -> Result<()> {
    match conversation_id {
        Some(id) => {
            if app.migrate_legacy(id).await? {
                println!("✅ Migrated legacy phantoms for {id}");
            } else {
                println!("Nothing to migrate for {id}");
            }
        }
        None => {
            let count = app.migrate_all_legacy().await?;
            println!("✅ Migrated {count} legacy entr{}", if count == 1 { "y" } else { "ies" });
        }
    }
    Ok(())
}

/// Text phantoms alternating human and assistant, starting with human.
fn alternating(texts: Vec<String>) -> Vec<PhantomMessage> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let sender = if i % 2 == 0 {
                Sender::Human
            } else {
                Sender::Assistant
            };
            PhantomMessage::text(sender, text)
        })
        .collect()
}

/// Parses a JSON array of message objects.
fn parse_phantom_file(raw: &str) -> Result<Vec<PhantomMessage>> {
    let value: Value = serde_json::from_str(raw).context("Phantom file is not valid JSON")?;
    let Value::Array(items) = value else {
        bail!("Phantom file must contain a JSON array");
    };
    items
        .into_iter()
        .map(|item| PhantomMessage::from_json(item).map_err(Into::into))
        .collect()
}
