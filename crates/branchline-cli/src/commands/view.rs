use anyhow::Result;
use branchline_application::Branchline;
use branchline_core::conversation::{ConversationTree, ROOT_MESSAGE_ID, Sender};
use branchline_core::overlay::{is_phantom, strip_marker};
use branchline_core::tree::MessageIndex;
use std::collections::HashSet;

const PREVIEW_CHARS: usize = 60;

pub async fn run(app: &Branchline, conversation_id: &str, json: bool) -> Result<()> {
    let tree = app.get_overlay_view(conversation_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        println!("🌳 {} ({})", tree.name, tree.uuid);
        print!("{}", render_outline(&tree));
    }
    Ok(())
}

/// Indented outline of the tree, one line per message.
///
/// `*` marks the current leaf and `~` marks phantoms.
pub fn render_outline(tree: &ConversationTree) -> String {
    let index = MessageIndex::new(&tree.chat_messages);
    let mut out = String::new();
    let mut stack: Vec<(&str, usize)> = index
        .children(ROOT_MESSAGE_ID)
        .iter()
        .rev()
        .map(|m| (m.uuid.as_str(), 0))
        .collect();
    let mut visited = HashSet::new();

    while let Some((id, depth)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(message) = index.get(id) else {
            continue;
        };

        let leaf = if id == tree.current_leaf_message_uuid { '*' } else { ' ' };
        let phantom = if is_phantom(message) { '~' } else { ' ' };
        let role = match message.sender {
            Sender::Human => "user",
            Sender::Assistant => "assistant",
        };
        out.push_str(&format!(
            "{leaf}{phantom}{}{id} [{role}] {}\n",
            "  ".repeat(depth),
            preview(&message.text_content())
        ));

        for child in index.children(id).iter().rev() {
            stack.push((child.uuid.as_str(), depth + 1));
        }
    }
    out
}

fn preview(text: &str) -> String {
    let clean = strip_marker(text).replace('\n', " ");
    if clean.chars().count() > PREVIEW_CHARS {
        let cut: String = clean.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        clean
    }
}
