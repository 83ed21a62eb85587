use anyhow::Result;
use branchline_application::Branchline;
use branchline_core::conversation::ROOT_MESSAGE_ID;
use branchline_core::tree::DeepestLeaf;

pub async fn deepest(app: &Branchline, conversation_id: &str, from: Option<&str>) -> Result<()> {
    let start = from.unwrap_or(ROOT_MESSAGE_ID);
    let found = app.find_deepest_leaf_from(conversation_id, start).await?;
    println!("{}", describe(&found));
    Ok(())
}

pub async fn goto_deepest(app: &Branchline, conversation_id: &str) -> Result<()> {
    let found = app.go_to_deepest(conversation_id).await?;
    println!("✅ Current leaf set: {}", describe(&found));
    Ok(())
}

pub async fn goto_leaf(app: &Branchline, conversation_id: &str, message_id: &str) -> Result<()> {
    let found = app.go_to_leaf(conversation_id, message_id).await?;
    println!("✅ Current leaf set: {}", describe(&found));
    Ok(())
}

pub fn describe(leaf: &DeepestLeaf) -> String {
    match leaf.created_at {
        Some(at) => format!("{} (depth {}, created {})", leaf.leaf_id, leaf.depth, at.to_rfc3339()),
        None => format!("{} (depth {})", leaf.leaf_id, leaf.depth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_without_timestamp() {
        let leaf = DeepestLeaf {
            leaf_id: "F".into(),
            depth: 4,
            created_at: None,
        };
        assert_eq!(describe(&leaf), "F (depth 4)");
    }
}
