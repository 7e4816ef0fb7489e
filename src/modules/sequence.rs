// Flattening of one or more tab trees into the linear order used for
// keyboard navigation.

use crate::modules::tree::{NodeIndex, TabTree, TreeNode};
use crate::state::SourceKind;

/// Reference to one node of one source tree. `depth` is 0 for top-level
/// entries (direct children of the root).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceEntry {
    pub kind: SourceKind,
    pub index: NodeIndex,
    pub depth: usize,
}

/// Preorder over every node except the sentinel root, parent before children,
/// children left to right.
pub fn flatten(tree: &TabTree) -> Vec<(NodeIndex, usize)> {
    tree.preorder(tree.root())
        .skip(1)
        .map(|(index, depth)| (index, depth - 1))
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigableSequence {
    entries: Vec<SequenceEntry>,
}

impl NavigableSequence {
    /// Concatenates [`flatten`] of each tree in the order given.
    pub fn flatten_many<'a>(trees: impl IntoIterator<Item = (SourceKind, &'a TabTree)>) -> Self {
        let mut sequence = Self::default();
        for (kind, tree) in trees {
            sequence.append(kind, tree);
        }
        sequence
    }

    /// Appends `tree` past the current end; existing positions keep pointing
    /// at the same entries.
    pub fn append(&mut self, kind: SourceKind, tree: &TabTree) {
        self.entries
            .extend(flatten(tree).into_iter().map(|(index, depth)| SequenceEntry {
                kind,
                index,
                depth,
            }));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&SequenceEntry> {
        self.entries.get(position)
    }

    pub fn entries(&self) -> &[SequenceEntry] {
        &self.entries
    }

    /// True if any entry came from `kind`.
    pub fn contains_kind(&self, kind: SourceKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    /// Resolves `position` against the trees the sequence was built from.
    pub fn resolve<'a>(
        &self,
        position: usize,
        tree_for: impl Fn(SourceKind) -> &'a TabTree,
    ) -> Option<&'a TreeNode> {
        let entry = self.get(position)?;
        tree_for(entry.kind).get(entry.index)
    }
}
