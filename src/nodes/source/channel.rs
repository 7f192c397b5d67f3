//! Channel hierarchy: groups and the leaves that seed the patch graph.

use hashbrown::HashMap;

use crate::error::ChannelError;
use crate::node::ChannelId;

#[derive(Debug, Clone)]
enum ChannelKind {
    Leaf,
    Group(Vec<ChannelId>),
}

#[derive(Debug, Clone)]
struct ChannelEntry {
    name: String,
    parent: Option<ChannelId>,
    kind: ChannelKind,
}

/// A tree of channel groups and leaves.
///
/// Groups are organizational only. Leaves are the channels the sequence
/// writes intents to, and the only ones that become graph nodes.
///
/// Groups and leaves draw ids from one counter, starting at `ChannelId(0)`
/// for [`ChannelTree::new`]. Trees that share a graph need disjoint ranges:
/// start the next one at [`ChannelTree::next_id`] of the previous.
#[derive(Debug, Clone, Default)]
pub struct ChannelTree {
    entries: HashMap<ChannelId, ChannelEntry>,
    roots: Vec<ChannelId>,
    next_id: u32,
}

impl ChannelTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty tree whose first entry gets `first`.
    pub fn starting_at(first: ChannelId) -> Self {
        Self {
            next_id: first.0,
            ..Self::default()
        }
    }

    /// The id the next group or leaf will get.
    #[inline]
    pub fn next_id(&self) -> ChannelId {
        ChannelId(self.next_id)
    }

    /// Add a group under `parent` (or at the root).
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        parent: Option<ChannelId>,
    ) -> Result<ChannelId, ChannelError> {
        self.insert(name.into(), parent, ChannelKind::Group(Vec::new()))
    }

    /// Add a leaf under `parent` (or at the root).
    pub fn add_leaf(
        &mut self,
        name: impl Into<String>,
        parent: Option<ChannelId>,
    ) -> Result<ChannelId, ChannelError> {
        self.insert(name.into(), parent, ChannelKind::Leaf)
    }

    fn insert(
        &mut self,
        name: String,
        parent: Option<ChannelId>,
        kind: ChannelKind,
    ) -> Result<ChannelId, ChannelError> {
        if let Some(parent) = parent {
            match self.entries.get(&parent).map(|e| &e.kind) {
                None => return Err(ChannelError::UnknownChannel(parent)),
                Some(ChannelKind::Leaf) => return Err(ChannelError::ParentIsLeaf(parent)),
                Some(ChannelKind::Group(_)) => {}
            }
        }

        let id = ChannelId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(ChannelError::IdsExhausted(id))?;
        self.entries.insert(id, ChannelEntry { name, parent, kind });

        match parent {
            Some(parent) => {
                if let Some(ChannelEntry {
                    kind: ChannelKind::Group(children),
                    ..
                }) = self.entries.get_mut(&parent)
                {
                    children.push(id);
                }
            }
            None => self.roots.push(id),
        }

        Ok(id)
    }

    pub fn name(&self, id: ChannelId) -> Option<&str> {
        self.entries.get(&id).map(|e| e.name.as_str())
    }

    pub fn parent(&self, id: ChannelId) -> Option<ChannelId> {
        self.entries.get(&id).and_then(|e| e.parent)
    }

    pub fn is_leaf(&self, id: ChannelId) -> bool {
        matches!(self.entries.get(&id).map(|e| &e.kind), Some(ChannelKind::Leaf))
    }

    /// Direct children of a group, in insertion order. Empty for leaves.
    pub fn children(&self, id: ChannelId) -> &[ChannelId] {
        match self.entries.get(&id).map(|e| &e.kind) {
            Some(ChannelKind::Group(children)) => children,
            _ => &[],
        }
    }

    /// Top-level channels in insertion order.
    pub fn roots(&self) -> &[ChannelId] {
        &self.roots
    }

    /// Every leaf, depth first from the roots.
    pub fn leaves(&self) -> Vec<ChannelId> {
        let mut leaves = Vec::new();
        let mut stack: Vec<ChannelId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            match self.entries.get(&id).map(|e| &e.kind) {
                Some(ChannelKind::Leaf) => leaves.push(id),
                Some(ChannelKind::Group(children)) => stack.extend(children.iter().rev()),
                None => {}
            }
        }
        leaves
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_are_depth_first() {
        let mut tree = ChannelTree::new();
        let front = tree.add_group("Front", None).unwrap();
        let a = tree.add_leaf("A", Some(front)).unwrap();
        let inner = tree.add_group("Inner", Some(front)).unwrap();
        let b = tree.add_leaf("B", Some(inner)).unwrap();
        let c = tree.add_leaf("C", None).unwrap();

        assert_eq!(tree.leaves(), vec![a, b, c]);
        assert_eq!(tree.roots(), &[front, c]);
        assert_eq!(tree.children(front), &[a, inner]);
        assert_eq!(tree.parent(b), Some(inner));
        assert!(!tree.is_leaf(front));
        assert_eq!(tree.name(b), Some("B"));
    }

    #[test]
    fn leaves_cannot_hold_children() {
        let mut tree = ChannelTree::new();
        let leaf = tree.add_leaf("Leaf", None).unwrap();
        assert_eq!(
            tree.add_leaf("Child", Some(leaf)),
            Err(ChannelError::ParentIsLeaf(leaf))
        );
        assert_eq!(
            tree.add_group("Orphan", Some(ChannelId(99))),
            Err(ChannelError::UnknownChannel(ChannelId(99)))
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn numbering_continues_from_start() {
        let mut tree = ChannelTree::starting_at(ChannelId(10));
        let group = tree.add_group("Yard", None).unwrap();
        let leaf = tree.add_leaf("Bush", Some(group)).unwrap();
        assert_eq!((group, leaf), (ChannelId(10), ChannelId(11)));
        assert_eq!(tree.next_id(), ChannelId(12));

        let mut full = ChannelTree::starting_at(ChannelId(u32::MAX));
        assert_eq!(
            full.add_leaf("Last", None),
            Err(ChannelError::IdsExhausted(ChannelId(u32::MAX)))
        );
        assert!(full.is_empty());
    }
}
