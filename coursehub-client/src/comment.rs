use std::fmt;

use crate::api::{CommentId, CommentRecord};

/// Deepest level a comment is displayed at; anything further down is shown
/// flat at this level
pub const MAX_LEVEL: u8 = 2;

/// One comment and the replies below it
///
/// Threads can be arbitrarily deep, so dropping, cloning and comparing nodes
/// all walk the subtree with a heap stack instead of the call stack.
pub struct CommentNode {
    pub record: CommentRecord,

    /// Depth in the thread, clamped to `MAX_LEVEL`
    pub level: u8,

    /// Direct answers, oldest first
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn new(record: CommentRecord, level: u8) -> CommentNode {
        CommentNode {
            record,
            level: level.min(MAX_LEVEL),
            replies: Vec::new(),
        }
    }

    pub fn id(&self) -> &CommentId {
        &self.record.id
    }

    /// Number of comments in the whole subtree below this one
    pub fn total_replies(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(c) = stack.pop() {
            count += c.replies.len();
            stack.extend(c.replies.iter());
        }
        count
    }

    /// For a level-1 comment, all its level-2 descendants in depth-first
    /// order: these are displayed as siblings, not nested
    ///
    /// Empty for comments at any other level.
    pub fn flattened_replies(&self) -> Vec<&CommentNode> {
        if self.level != 1 {
            return Vec::new();
        }
        let mut res = Vec::new();
        let mut stack = self.replies.iter().rev().collect::<Vec<_>>();
        while let Some(c) = stack.pop() {
            if c.level >= MAX_LEVEL {
                res.push(c);
            }
            stack.extend(c.replies.iter().rev());
        }
        res
    }

    /// Depth-first walk of this comment and everything below it
    pub fn iter(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    pub(crate) fn sort_siblings(siblings: &mut [CommentNode]) {
        // stable, so equal timestamps keep their insertion order
        siblings.sort_by_cached_key(|c| c.record.created_at.sort_key());
    }

    /// Finds the list holding `id` and its position there, at any depth
    pub(crate) fn locate_in<'a>(
        comments: &'a mut Vec<CommentNode>,
        id: &CommentId,
    ) -> Option<(&'a mut Vec<CommentNode>, usize)> {
        let mut stack = vec![comments];
        while let Some(list) = stack.pop() {
            let pos = list.iter().position(|c| c.id() == id);
            match pos {
                Some(pos) => return Some((list, pos)),
                None => stack.extend(list.iter_mut().map(|c| &mut c.replies)),
            }
        }
        None
    }

    pub fn find_in<'a>(
        comments: &'a mut Vec<CommentNode>,
        id: &CommentId,
    ) -> Option<&'a mut CommentNode> {
        CommentNode::locate_in(comments, id).map(|(list, pos)| &mut list[pos])
    }
}

/// Clones a list of subtrees, children before their parent
fn clone_forest(nodes: &[CommentNode]) -> Vec<CommentNode> {
    let mut done: Vec<CommentNode> = Vec::new();
    let mut stack = nodes.iter().rev().map(|c| (c, false)).collect::<Vec<_>>();
    while let Some((c, expanded)) = stack.pop() {
        if expanded {
            let replies = done.split_off(done.len() - c.replies.len());
            done.push(CommentNode {
                record: c.record.clone(),
                level: c.level,
                replies,
            });
        } else {
            stack.push((c, true));
            stack.extend(c.replies.iter().rev().map(|r| (r, false)));
        }
    }
    done
}

impl Clone for CommentNode {
    fn clone(&self) -> CommentNode {
        CommentNode {
            record: self.record.clone(),
            level: self.level,
            replies: clone_forest(&self.replies),
        }
    }
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut c) = pending.pop() {
            pending.append(&mut c.replies);
        }
    }
}

impl PartialEq for CommentNode {
    /// Same comments in the same preorder with the same number of replies
    /// each means the same shape
    fn eq(&self, other: &CommentNode) -> bool {
        let (mut a, mut b) = (self.iter(), other.iter());
        loop {
            match (a.next(), b.next()) {
                (None, None) => return true,
                (Some(x), Some(y))
                    if x.level == y.level
                        && x.replies.len() == y.replies.len()
                        && x.record == y.record => {}
                _ => return false,
            }
        }
    }
}

impl Eq for CommentNode {}

impl fmt::Debug for CommentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentNode")
            .field("record", &self.record)
            .field("level", &self.level)
            .field(
                "replies",
                &self.replies.iter().map(CommentNode::id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Serialized form of a comment: the tree is written as a flat preorder
/// list, each entry carrying its level and how many direct replies follow it
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FlatComment<'a> {
    #[serde(flatten)]
    record: &'a CommentRecord,
    level: u8,
    reply_count: usize,
}

impl<'a> From<&'a CommentNode> for FlatComment<'a> {
    fn from(c: &'a CommentNode) -> FlatComment<'a> {
        FlatComment {
            record: &c.record,
            level: c.level,
            reply_count: c.replies.len(),
        }
    }
}

pub struct Preorder<'a> {
    stack: Vec<&'a CommentNode>,
}

impl<'a> Preorder<'a> {
    pub(crate) fn over(roots: &'a [CommentNode]) -> Preorder<'a> {
        Preorder {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a CommentNode;

    fn next(&mut self) -> Option<&'a CommentNode> {
        let c = self.stack.pop()?;
        self.stack.extend(c.replies.iter().rev());
        Some(c)
    }
}
