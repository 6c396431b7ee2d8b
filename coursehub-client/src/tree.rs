use std::collections::{HashMap, HashSet, VecDeque};

use crate::{
    api::{CommentId, CommentRecord},
    comment::{FlatComment, Preorder},
    CommentNode, MAX_LEVEL,
};

/// A post's discussion, threaded and ordered for display
///
/// Built in one go from the flat list the backend returns, then kept up to
/// date locally as comments get posted, edited and deleted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentTree {
    roots: Vec<CommentNode>,
}

impl CommentTree {
    pub fn new() -> CommentTree {
        CommentTree::default()
    }

    /// Threads a flat list of comments
    ///
    /// Comments whose parent chain does not lead up to a root (missing parent,
    /// or a loop in the parent links) are dropped. Duplicate ids keep only
    /// their first occurrence.
    pub fn build(records: Vec<CommentRecord>) -> CommentTree {
        let mut seen = HashSet::new();
        let mut records = records
            .into_iter()
            .filter(|r| {
                let fresh = seen.insert(r.id.clone());
                if !fresh {
                    tracing::warn!(id = %r.id, "dropping comment with duplicate id");
                }
                fresh
            })
            .map(|r| (r.created_at.sort_key(), r))
            .collect::<Vec<_>>();
        // stable: equal timestamps keep the order the server gave
        records.sort_by(|(a, _), (b, _)| a.cmp(b));
        let records = records.into_iter().map(|(_, r)| r).collect::<Vec<_>>();

        let n = records.len();
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (&r.id, i))
            .collect::<HashMap<_, _>>();
        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); n];
        for (i, r) in records.iter().enumerate() {
            match r.parent() {
                None => roots.push(i),
                Some(p) => match index.get(p) {
                    Some(&parent) => children[parent].push(i),
                    None => tracing::warn!(id = %r.id, parent = %p, "dropping orphan comment"),
                },
            }
        }

        // Breadth-first from the roots: every comment is reached at most once,
        // so loops in the parent links cannot make this spin
        let mut levels: Vec<Option<u8>> = vec![None; n];
        let mut order = Vec::with_capacity(n);
        let mut queue = VecDeque::with_capacity(n);
        for &r in &roots {
            levels[r] = Some(0);
            queue.push_back(r);
        }
        while let Some(i) = queue.pop_front() {
            order.push(i);
            let child_level = levels[i].map_or(MAX_LEVEL, |l| (l + 1).min(MAX_LEVEL));
            for &c in &children[i] {
                if levels[c].is_none() {
                    levels[c] = Some(child_level);
                    queue.push_back(c);
                }
            }
        }
        if order.len() < n {
            tracing::warn!(
                dropped = n - order.len(),
                "some comments are not reachable from any root comment"
            );
        }

        // Children always come after their parent in `order`, so walking it
        // backwards assembles every subtree before it gets attached
        let mut records = records.into_iter().map(Some).collect::<Vec<_>>();
        let mut built: Vec<Option<CommentNode>> = (0..n).map(|_| None).collect();
        for &i in order.iter().rev() {
            let Some(record) = records[i].take() else {
                continue;
            };
            let mut node = CommentNode::new(record, levels[i].unwrap_or(MAX_LEVEL));
            node.replies = children[i]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[i] = Some(node);
        }

        CommentTree {
            roots: roots.into_iter().filter_map(|r| built[r].take()).collect(),
        }
    }

    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    /// Every comment in the tree, depth-first
    pub fn iter(&self) -> Preorder<'_> {
        Preorder::over(&self.roots)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn find(&self, id: &CommentId) -> Option<&CommentNode> {
        self.iter().find(|c| c.id() == id)
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.find(id).is_some()
    }

    /// Adds a freshly posted comment, returning the level it landed at
    ///
    /// Root comments go at the end of the thread. Replies go under their
    /// parent wherever it is, one level deeper but never past `MAX_LEVEL`.
    /// Returns `None` if the parent is not in this tree.
    pub fn insert(&mut self, record: CommentRecord) -> Option<u8> {
        let Some(parent_id) = record.parent().cloned() else {
            self.roots.push(CommentNode::new(record, 0));
            return Some(0);
        };
        let Some(parent) = CommentNode::find_in(&mut self.roots, &parent_id) else {
            tracing::warn!(
                id = %record.id,
                parent = %parent_id,
                "reply to a comment not in this thread"
            );
            return None;
        };
        let level = (parent.level + 1).min(MAX_LEVEL);
        parent.replies.push(CommentNode::new(record, level));
        CommentNode::sort_siblings(&mut parent.replies);
        Some(level)
    }

    /// Applies an edit the server acknowledged; level and replies stay
    pub fn apply_edit(&mut self, updated: CommentRecord) -> bool {
        let Some((siblings, pos)) = CommentNode::locate_in(&mut self.roots, &updated.id) else {
            return false;
        };
        siblings[pos].record.apply_edit(updated);
        CommentNode::sort_siblings(siblings);
        true
    }

    /// Removes a comment along with every reply below it
    pub fn remove(&mut self, id: &CommentId) -> Option<CommentNode> {
        CommentNode::locate_in(&mut self.roots, id).map(|(siblings, pos)| siblings.remove(pos))
    }
}

impl serde::Serialize for CommentTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(FlatComment::from))
    }
}
