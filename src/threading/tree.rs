//! Reply forest reconstruction
//!
//! A thread is stored as a flat list of messages. The forest is rebuilt on every
//! read from each message's In-Reply-To reference. Nodes live in an arena: the
//! forest owns the messages in input order and every link is an index into that
//! array, so no node owns another.

use std::collections::HashMap;

use super::cycle_detection::detect_cycle_in_ancestry;
use crate::models::{Message, ThreadItem};

/// Reply forest of one thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadForest {
    messages: Vec<Message>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

/// Build the reply forest for the messages of a thread.
///
/// ## Algorithm
///
/// 1. Index every message by id (the first occurrence of an id wins)
/// 2. For each message, in input order:
///    - If `in_reply_to` names an indexed message and linking would not create a
///      cycle, append it to that message's children
///    - Otherwise it starts a new root
///
/// Input is expected in date order, so siblings and roots come out oldest first.
/// A reference to a message outside the thread (or to none) makes a root.
pub fn build_forest(messages: Vec<Message>) -> ThreadForest {
    let count = messages.len();

    let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(count);
    for (index, message) in messages.iter().enumerate() {
        index_by_id.entry(message.id.as_str()).or_insert(index);
    }

    let mut parents: Vec<Option<usize>> = vec![None; count];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut roots = Vec::new();

    for (index, message) in messages.iter().enumerate() {
        let parent = message
            .in_reply_to
            .as_deref()
            .and_then(|reply_id| index_by_id.get(reply_id).copied());

        match parent {
            Some(parent) if !detect_cycle_in_ancestry(&parents, index, parent) => {
                parents[index] = Some(parent);
                children[parent].push(index);
            }
            Some(parent) => {
                log::debug!(
                    "message {} replies to its own descendant {}, treating as root",
                    message.id,
                    messages[parent].id
                );
                roots.push(index);
            }
            None => roots.push(index),
        }
    }

    ThreadForest {
        messages,
        parents,
        children,
        roots,
    }
}

impl ThreadForest {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Root node indices, oldest first.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Child node indices of `index`, in attachment order.
    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// Depth-first pre-order traversal yielding `(index, depth)`.
    ///
    /// Uses an explicit stack so deeply nested threads cannot overflow.
    pub fn walk(&self) -> Vec<(usize, usize)> {
        let mut visited = Vec::with_capacity(self.messages.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&root| (root, 0)).collect();

        while let Some((index, depth)) = stack.pop() {
            visited.push((index, depth));

            // Add children in reverse order to maintain DFS left-to-right order
            for &child in self.children[index].iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        visited
    }

    /// Convert the arena into owned nested items for serialization.
    pub fn into_items(self) -> Vec<ThreadItem> {
        let order = self.walk();
        let mut messages: Vec<Option<Message>> = self.messages.into_iter().map(Some).collect();
        let mut built: Vec<Option<ThreadItem>> = vec![None; messages.len()];

        // Children follow their parent in pre-order, so reverse pre-order builds leaves first
        for &(index, _) in order.iter().rev() {
            let replies = self.children[index]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();

            if let Some(message) = messages[index].take() {
                built[index] = Some(ThreadItem { message, replies });
            }
        }

        self.roots
            .iter()
            .filter_map(|&root| built[root].take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;
    use chrono::{Duration, TimeZone, Utc};

    fn message(id: &str, minute: i64, in_reply_to: Option<&str>) -> Message {
        let base = Utc.with_ymd_and_hms(2017, 3, 1, 12, 0, 0).unwrap();
        Message {
            id: id.to_string(),
            subject: format!("Re: {}", id),
            raw_content: String::new(),
            rendered_content: String::new(),
            thread_id: 1,
            date: base + Duration::minutes(minute),
            sender: Sender {
                email: "dev@example.com".to_string(),
                name: None,
            },
            in_reply_to: in_reply_to.map(str::to_string),
            read: false,
        }
    }

    fn ids(forest: &ThreadForest, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .map(|&i| forest.message(i).unwrap().id.clone())
            .collect()
    }

    #[test]
    fn test_reply_chain() {
        let forest = build_forest(vec![
            message("A", 0, None),
            message("B", 1, Some("A")),
            message("C", 2, Some("B")),
            message("D", 3, Some("A")),
        ]);

        assert_eq!(ids(&forest, forest.roots()), vec!["A"]);
        assert_eq!(ids(&forest, forest.children(0)), vec!["B", "D"]);
        assert_eq!(ids(&forest, forest.children(1)), vec!["C"]);
        assert!(forest.children(3).is_empty());
    }

    #[test]
    fn test_dangling_reference_becomes_root() {
        let forest = build_forest(vec![
            message("A", 0, None),
            message("B", 1, Some("missing@example.com")),
        ]);

        assert_eq!(ids(&forest, forest.roots()), vec!["A", "B"]);
    }

    #[test]
    fn test_parent_dated_after_child() {
        let forest = build_forest(vec![message("B", 0, Some("A")), message("A", 1, None)]);

        assert_eq!(ids(&forest, forest.roots()), vec!["A"]);
        assert_eq!(forest.parent(0), Some(1));
    }

    #[test]
    fn test_cycle_breaks_into_root() {
        let forest = build_forest(vec![message("A", 0, Some("B")), message("B", 1, Some("A"))]);

        assert_eq!(ids(&forest, forest.roots()), vec!["B"]);
        assert_eq!(ids(&forest, forest.children(1)), vec!["A"]);
    }

    #[test]
    fn test_self_reply_is_root() {
        let forest = build_forest(vec![message("A", 0, Some("A"))]);
        assert_eq!(forest.roots(), &[0]);
    }

    #[test]
    fn test_walk_depths() {
        let forest = build_forest(vec![
            message("A", 0, None),
            message("B", 1, Some("A")),
            message("C", 2, Some("B")),
            message("D", 3, Some("A")),
        ]);

        assert_eq!(forest.walk(), vec![(0, 0), (1, 1), (2, 2), (3, 1)]);
    }

    #[test]
    fn test_into_items_nests_replies() {
        let items = build_forest(vec![
            message("A", 0, None),
            message("B", 1, Some("A")),
            message("C", 2, Some("B")),
            message("D", 3, Some("A")),
            message("E", 4, None),
        ])
        .into_items();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].message.id, "A");
        let replies: Vec<&str> = items[0].replies.iter().map(|r| r.message.id.as_str()).collect();
        assert_eq!(replies, vec!["B", "D"]);
        assert_eq!(items[0].replies[0].replies[0].message.id, "C");
        assert_eq!(items[1].message.id, "E");
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut messages = vec![message("m0", 0, None)];
        for i in 1..5_000 {
            let parent = format!("m{}", i - 1);
            messages.push(message(&format!("m{}", i), i, Some(&parent)));
        }

        let forest = build_forest(messages);
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.walk().last(), Some(&(4_999, 4_999)));
    }

    #[test]
    fn test_empty_input() {
        let forest = build_forest(Vec::new());
        assert!(forest.is_empty());
        assert!(forest.into_items().is_empty());
    }
}
