//! Tree algorithms over a flat message list.
//!
//! The remote service hands out a conversation as a flat list of messages,
//! each pointing at its parent. Everything here works on that list without
//! mutating it, and every traversal tracks visited ids so a cyclic or
//! self-referencing list fails with [`BranchlineError::MalformedTree`] instead
//! of looping.

use crate::conversation::{Message, ROOT_MESSAGE_ID};
use crate::error::{BranchlineError, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Outcome of a deepest-leaf search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepestLeaf {
    pub leaf_id: String,
    /// Length of the longest downward path from the start node
    pub depth: usize,
    /// Creation time of the leaf (`None` when the start node is the root sentinel
    /// of an empty tree)
    pub created_at: Option<DateTime<Utc>>,
}

/// Lookup tables over a message list.
///
/// Children keep the order in which the server delivered them.
pub struct MessageIndex<'a> {
    by_id: HashMap<&'a str, &'a Message>,
    children: HashMap<&'a str, Vec<&'a Message>>,
}

impl<'a> MessageIndex<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        let mut by_id = HashMap::with_capacity(messages.len());
        let mut children: HashMap<&'a str, Vec<&'a Message>> = HashMap::new();

        for message in messages {
            by_id.entry(message.uuid.as_str()).or_insert(message);
            children
                .entry(message.parent_message_uuid.as_str())
                .or_default()
                .push(message);
        }

        Self { by_id, children }
    }

    pub fn get(&self, id: &str) -> Option<&'a Message> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn children(&self, id: &str) -> &[&'a Message] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Root-to-leaf chain ending at `leaf_id`.
    pub fn chain_to(&self, leaf_id: &str) -> Result<Vec<&'a Message>> {
        let mut current = self
            .get(leaf_id)
            .ok_or_else(|| BranchlineError::not_found("message", leaf_id))?;
        let mut visited = HashSet::new();
        let mut chain = Vec::new();

        loop {
            if !visited.insert(current.uuid.as_str()) {
                return Err(BranchlineError::malformed_tree(
                    "parent chain loops back on itself",
                    Some(&current.uuid),
                ));
            }
            chain.push(current);

            if current.is_root() {
                break;
            }

            current = self.get(&current.parent_message_uuid).ok_or_else(|| {
                BranchlineError::malformed_tree(
                    format!(
                        "parent '{}' of message '{}' is not in the tree",
                        current.parent_message_uuid, current.uuid
                    ),
                    Some(&current.uuid),
                )
            })?;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Post-order walk below `start_id` with an explicit stack, so the depth
    /// of the tree never reaches the call stack.
    fn deepest_from(
        &self,
        start_id: &str,
        created_at: Option<DateTime<Utc>>,
        visited: &mut HashSet<&'a str>,
    ) -> Result<DeepestLeaf> {
        let mut stack = vec![Frame {
            id: start_id,
            created_at,
            children: self.children(start_id),
            next: 0,
            best: None,
        }];

        while let Some(frame) = stack.last_mut() {
            let children = frame.children;
            if let Some(child) = children.get(frame.next).copied() {
                frame.next += 1;
                if !visited.insert(child.uuid.as_str()) {
                    return Err(BranchlineError::malformed_tree(
                        "message reached twice while walking down the tree (cycle or duplicate id)",
                        Some(&child.uuid),
                    ));
                }
                stack.push(Frame {
                    id: child.uuid.as_str(),
                    created_at: Some(child.created_at),
                    children: self.children(&child.uuid),
                    next: 0,
                    best: None,
                });
                continue;
            }

            let Some(done) = stack.pop() else {
                break;
            };
            let leaf = match done.best {
                Some(best) => DeepestLeaf {
                    depth: best.depth + 1,
                    ..best
                },
                None => DeepestLeaf {
                    leaf_id: done.id.to_string(),
                    depth: 0,
                    created_at: done.created_at,
                },
            };

            match stack.last_mut() {
                Some(parent) => {
                    parent.best = match parent.best.take() {
                        Some(current) if !is_better(&leaf, &current) => Some(current),
                        _ => Some(leaf),
                    };
                }
                None => return Ok(leaf),
            }
        }

        Err(BranchlineError::internal("deepest-leaf walk ended without a result"))
    }
}

/// A node of the deepest-leaf walk whose children are still being visited.
struct Frame<'s, 'a> {
    id: &'s str,
    created_at: Option<DateTime<Utc>>,
    children: &'s [&'a Message],
    next: usize,
    /// Best leaf among the children finished so far
    best: Option<DeepestLeaf>,
}

/// Deeper wins; on equal depth the later leaf wins; a full tie keeps the
/// earlier branch.
fn is_better(candidate: &DeepestLeaf, current: &DeepestLeaf) -> bool {
    candidate.depth > current.depth
        || (candidate.depth == current.depth && candidate.created_at > current.created_at)
}

/// Finds the leaf at the end of the longest downward path from `start_id`.
///
/// `start_id` may be the root sentinel, in which case every root message is
/// considered. A node without children is its own leaf at depth 0.
///
/// # Errors
///
/// - `NotFound` if `start_id` is neither a message nor the root sentinel
/// - `MalformedTree` if the walk reaches a message twice
pub fn find_deepest_leaf(messages: &[Message], start_id: &str) -> Result<DeepestLeaf> {
    let index = MessageIndex::new(messages);

    let created_at = if start_id == ROOT_MESSAGE_ID {
        None
    } else {
        let start = index
            .get(start_id)
            .ok_or_else(|| BranchlineError::not_found("message", start_id))?;
        Some(start.created_at)
    };

    let mut visited = HashSet::new();
    if let Some(start) = index.get(start_id) {
        visited.insert(start.uuid.as_str());
    }

    index.deepest_from(start_id, created_at, &mut visited)
}

/// Root-to-leaf chain of messages ending at `leaf_id`.
///
/// # Errors
///
/// - `NotFound` if `leaf_id` is not in the list
/// - `MalformedTree` on a cycle or a parent id that resolves to nothing
pub fn parent_chain<'a>(messages: &'a [Message], leaf_id: &str) -> Result<Vec<&'a Message>> {
    MessageIndex::new(messages).chain_to(leaf_id)
}

/// History of a fork cut at `cut_point_id`: the chain from the root down to
/// and including the cut point. Messages on other branches are ignored.
pub fn history_through<'a>(messages: &'a [Message], cut_point_id: &str) -> Result<Vec<&'a Message>> {
    parent_chain(messages, cut_point_id)
}

/// History ending at the child of `target_parent_id`, that child included.
///
/// The cut point is resolved by walking parent links rather than by scanning
/// the list in delivery order: among the children of `target_parent_id` the
/// one lying on the branch of `current_leaf` is preferred, otherwise the first
/// delivered child. When no message has `target_parent_id` as its parent, the
/// whole current branch is returned (the current leaf, or the deepest leaf
/// from the root when no usable current leaf is known).
pub fn extract_linear_history<'a>(
    messages: &'a [Message],
    target_parent_id: &str,
    current_leaf: Option<&str>,
) -> Result<Vec<&'a Message>> {
    let index = MessageIndex::new(messages);
    let current_leaf = current_leaf.filter(|leaf| index.contains(leaf));

    let current_branch: HashSet<&str> = match current_leaf {
        Some(leaf) => index
            .chain_to(leaf)?
            .into_iter()
            .map(|m| m.uuid.as_str())
            .collect(),
        None => HashSet::new(),
    };

    let candidates = index.children(target_parent_id);
    let cut_point = candidates
        .iter()
        .find(|child| current_branch.contains(child.uuid.as_str()))
        .or_else(|| candidates.first());

    if let Some(cut_point) = cut_point {
        return index.chain_to(&cut_point.uuid);
    }

    tracing::debug!(
        target_parent_id,
        "No message continues from the requested parent, using the whole current branch"
    );

    let leaf_id = match current_leaf {
        Some(leaf) => leaf.to_string(),
        None => find_deepest_leaf(messages, ROOT_MESSAGE_ID)?.leaf_id,
    };

    if leaf_id == ROOT_MESSAGE_ID {
        return Ok(Vec::new());
    }
    index.chain_to(&leaf_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Sender;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    fn msg(id: &str, parent: &str, minute: u32) -> Message {
        let sender = if minute % 2 == 0 {
            Sender::Human
        } else {
            Sender::Assistant
        };
        Message::text(id, parent, sender, format!("text {id}"), at(minute))
    }

    /// A -> B -> C plus a shorter side branch A -> D
    fn branching_tree() -> Vec<Message> {
        vec![
            msg("A", ROOT_MESSAGE_ID, 0),
            msg("B", "A", 1),
            msg("C", "B", 2),
            msg("D", "A", 3),
        ]
    }

    fn ids(chain: &[&Message]) -> Vec<String> {
        chain.iter().map(|m| m.uuid.clone()).collect()
    }

    #[test]
    fn test_deepest_leaf_from_root() {
        let messages = branching_tree();
        let leaf = find_deepest_leaf(&messages, ROOT_MESSAGE_ID).unwrap();

        assert_eq!(leaf.leaf_id, "C");
        assert_eq!(leaf.depth, 3);
        assert_eq!(leaf.created_at, Some(at(2)));
    }

    #[test]
    fn test_deepest_leaf_of_a_leaf_is_itself() {
        let messages = branching_tree();
        let leaf = find_deepest_leaf(&messages, "D").unwrap();

        assert_eq!(leaf.leaf_id, "D");
        assert_eq!(leaf.depth, 0);
        assert_eq!(leaf.created_at, Some(at(3)));
    }

    #[test]
    fn test_equal_depth_prefers_later_leaf() {
        let messages = vec![
            msg("A", ROOT_MESSAGE_ID, 0),
            msg("B1", "A", 1),
            msg("B2", "A", 5),
            msg("C1", "B1", 9),
            msg("C2", "B2", 7),
        ];

        let leaf = find_deepest_leaf(&messages, "A").unwrap();
        assert_eq!(leaf.leaf_id, "C1");
        assert_eq!(leaf.depth, 2);
    }

    #[test]
    fn test_full_tie_keeps_first_delivered_branch() {
        let messages = vec![
            msg("A", ROOT_MESSAGE_ID, 0),
            msg("B1", "A", 4),
            msg("B2", "A", 4),
        ];

        let leaf = find_deepest_leaf(&messages, "A").unwrap();
        assert_eq!(leaf.leaf_id, "B1");
    }

    #[test]
    fn test_empty_tree_from_root() {
        let leaf = find_deepest_leaf(&[], ROOT_MESSAGE_ID).unwrap();
        assert_eq!(leaf.leaf_id, ROOT_MESSAGE_ID);
        assert_eq!(leaf.depth, 0);
        assert_eq!(leaf.created_at, None);
    }

    #[test]
    fn test_unknown_start_is_not_found() {
        let err = find_deepest_leaf(&branching_tree(), "nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cycle_fails_instead_of_hanging() {
        let messages = vec![msg("X", "Y", 0), msg("Y", "X", 1)];

        let err = find_deepest_leaf(&messages, "X").unwrap_err();
        assert!(err.is_malformed_tree());

        let err = parent_chain(&messages, "X").unwrap_err();
        assert!(err.is_malformed_tree());
    }

    #[test]
    fn test_duplicate_ids_are_malformed() {
        let messages = vec![
            msg("A", ROOT_MESSAGE_ID, 0),
            msg("B", "A", 1),
            msg("B", "A", 2),
        ];
        let err = find_deepest_leaf(&messages, ROOT_MESSAGE_ID).unwrap_err();
        assert!(err.is_malformed_tree());
    }

    #[test]
    fn test_very_long_linear_conversation() {
        const LEN: usize = 100_000;
        let created = at(0);
        let messages: Vec<Message> = (0..LEN)
            .map(|i| {
                let parent = match i {
                    0 => ROOT_MESSAGE_ID.to_string(),
                    _ => format!("m{}", i - 1),
                };
                Message::text(format!("m{i}"), parent, Sender::Human, "x", created)
            })
            .collect();

        let leaf = find_deepest_leaf(&messages, ROOT_MESSAGE_ID).unwrap();
        assert_eq!(leaf.leaf_id, format!("m{}", LEN - 1));
        assert_eq!(leaf.depth, LEN);

        let leaf = find_deepest_leaf(&messages, "m10").unwrap();
        assert_eq!(leaf.depth, LEN - 11);
        assert_eq!(parent_chain(&messages, &leaf.leaf_id).unwrap().len(), LEN);
    }

    #[test]
    fn test_parent_chain_with_dangling_parent() {
        let messages = vec![msg("A", ROOT_MESSAGE_ID, 0), msg("C", "missing", 1)];
        let err = parent_chain(&messages, "C").unwrap_err();
        assert!(err.is_malformed_tree());
    }

    #[test]
    fn test_history_through_ignores_later_and_side_messages() {
        let messages = branching_tree();
        let chain = history_through(&messages, "B").unwrap();
        assert_eq!(ids(&chain), vec!["A", "B"]);
    }

    #[test]
    fn test_extract_linear_history_includes_cut_point() {
        let messages = branching_tree();
        let chain = extract_linear_history(&messages, "A", Some("C")).unwrap();
        assert_eq!(ids(&chain), vec!["A", "B"]);
    }

    #[test]
    fn test_extract_linear_history_prefers_current_branch() {
        let messages = branching_tree();
        let chain = extract_linear_history(&messages, "A", Some("D")).unwrap();
        assert_eq!(ids(&chain), vec!["A", "D"]);

        // Without a current leaf the first delivered child is used
        let chain = extract_linear_history(&messages, "A", None).unwrap();
        assert_eq!(ids(&chain), vec!["A", "B"]);
    }

    #[test]
    fn test_extract_linear_history_unresolved_returns_current_branch() {
        let messages = branching_tree();

        let chain = extract_linear_history(&messages, "C", Some("D")).unwrap();
        assert_eq!(ids(&chain), vec!["A", "D"]);

        let chain = extract_linear_history(&messages, "C", None).unwrap();
        assert_eq!(ids(&chain), vec!["A", "B", "C"]);

        assert!(extract_linear_history(&[], "C", None).unwrap().is_empty());
    }
}
