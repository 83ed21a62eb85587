use anyhow::{Result, bail};
use branchline_application::Branchline;

use super::navigate::describe;

pub async fn add(app: &Branchline, conversation_id: &str, name: &str, message_id: &str) -> Result<()> {
    app.add_bookmark(conversation_id, name, message_id).await?;
    println!("🔖 Bookmark '{name}' -> {message_id}");
    Ok(())
}

pub async fn remove(app: &Branchline, conversation_id: &str, name: &str) -> Result<()> {
    if !app.remove_bookmark(conversation_id, name).await? {
        bail!("No bookmark named '{name}' in {conversation_id}");
    }
    println!("🗑️  Removed bookmark '{name}'");
    Ok(())
}

pub async fn list(app: &Branchline, conversation_id: &str) -> Result<()> {
    let bookmarks = app.list_bookmarks(conversation_id).await?;
    if bookmarks.is_empty() {
        println!("No bookmarks for {conversation_id}");
        return Ok(());
    }
    for (name, message_id) in &bookmarks {
        println!("{name}\t{message_id}");
    }
    Ok(())
}

pub async fn go(app: &Branchline, conversation_id: &str, name: &str) -> Result<()> {
    let found = app.go_to_bookmark(conversation_id, name).await?;
    println!("✅ Current leaf set: {}", describe(&found));
    Ok(())
}
