use anyhow::Result;
use branchline_application::Branchline;
use tokio_util::sync::CancellationToken;

/// Forks and prints the new conversation id. Ctrl-C cancels the fork.
pub async fn run(
    app: &Branchline,
    conversation_id: &str,
    message_id: &str,
    model: Option<&str>,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!("🍴 Forking {conversation_id} at {message_id}...");
    let result = app
        .fork_from_with_cancel(conversation_id, message_id, model, &cancel)
        .await;
    watcher.abort();

    let new_id = result?;
    println!("✅ Fork created: {new_id}");
    Ok(())
}
