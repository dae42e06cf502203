//! Comment threading.
//!
//! Comments are persisted flat; these functions turn one post's comments into
//! an ordered reply tree and guard how deep new replies may nest.

use std::collections::HashMap;

use agora_db::entities::comment;
use serde::Serialize;

use super::comment::CommentView;

/// Anything that takes part in a reply chain.
pub trait Threaded {
    /// Identifier of this comment.
    fn id(&self) -> &str;

    /// Identifier of the comment this one replies to.
    fn parent_id(&self) -> Option<&str>;
}

impl Threaded for comment::Model {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

impl Threaded for CommentView {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

/// A comment together with its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentTree {
    #[serde(flatten)]
    pub comment: CommentView,
    /// Direct replies, newest first.
    pub replies: Vec<CommentTree>,
    /// Ancestor hops to the nearest root; 0 for roots.
    pub depth: usize,
}

/// Assemble one post's comments into reply trees.
///
/// Roots and every `replies` list are ordered newest first; ties keep their
/// input order. A comment whose parent is not in `comments` becomes a root.
/// Comments caught in a parent cycle can't be reached from any root, so they
/// are promoted to roots in input order. No comment is ever dropped.
#[must_use]
pub fn build_comment_tree(comments: Vec<CommentView>) -> Vec<CommentTree> {
    let n = comments.len();

    let parent_of: Vec<Option<usize>> = {
        let index: HashMap<&str, usize> = comments
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();

        comments
            .iter()
            .enumerate()
            .map(|(i, c)| {
                c.parent_id
                    .as_deref()
                    .and_then(|p| index.get(p).copied())
                    .filter(|&p| p != i)
            })
            .collect()
    };

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for (i, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
    }

    let newest_first = |a: &usize, b: &usize| comments[*b].created_at.cmp(&comments[*a].created_at);
    roots.sort_by(newest_first);
    for list in &mut children {
        list.sort_by(newest_first);
    }

    // Pre-order walk from the roots. Only edges actually taken end up in the tree.
    let mut depth = vec![0usize; n];
    let mut visited = vec![false; n];
    let mut tree_children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);

    let mut walk = |start: usize, visited: &mut Vec<bool>| {
        visited[start] = true;
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            order.push(i);
            for &c in &children[i] {
                if !visited[c] {
                    visited[c] = true;
                    depth[c] = depth[i] + 1;
                    tree_children[i].push(c);
                }
            }
            stack.extend(tree_children[i].iter().rev());
        }
    };

    for &root in &roots {
        walk(root, &mut visited);
    }
    for i in 0..n {
        if !visited[i] {
            roots.push(i);
            walk(i, &mut visited);
        }
    }

    // Reverse pre-order visits every child before its parent.
    let mut slots: Vec<Option<CommentView>> = comments.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentTree>> = (0..n).map(|_| None).collect();
    for &i in order.iter().rev() {
        let Some(comment) = slots[i].take() else {
            continue;
        };
        let replies = tree_children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(CommentTree {
            comment,
            replies,
            depth: depth[i],
        });
    }

    roots.iter().filter_map(|&r| built[r].take()).collect()
}

/// Check whether a reply to `parent_id` stays within `max_depth`.
///
/// Walks up the ancestor chain starting at the parent itself, counting every
/// comment found, and stops after `max_depth` hops, at a root, or when the
/// next ancestor is missing from `comments`. Returns whether fewer than
/// `max_depth` comments were found on the way.
#[must_use]
pub fn validate_reply_depth<T: Threaded>(parent_id: &str, comments: &[T], max_depth: usize) -> bool {
    let mut hops = 0;
    let mut current = Some(parent_id);

    while let Some(id) = current {
        if hops >= max_depth {
            break;
        }
        let Some(parent) = comments.iter().find(|c| c.id() == id) else {
            break;
        };
        current = parent.parent_id();
        hops += 1;
    }

    hops < max_depth
}

/// Flatten reply trees back into a pre-order sequence.
///
/// Each returned node keeps its `depth` but is detached from its replies,
/// which follow it directly in the output.
#[must_use]
pub fn flatten_comment_tree(tree: Vec<CommentTree>) -> Vec<CommentTree> {
    let mut flat = Vec::new();
    let mut stack: Vec<CommentTree> = tree.into_iter().rev().collect();

    while let Some(mut node) = stack.pop() {
        let replies = std::mem::take(&mut node.replies);
        stack.extend(replies.into_iter().rev());
        flat.push(node);
    }

    flat
}
