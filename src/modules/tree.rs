// Arena-backed tab tree. Pure logic, no runtime imports.
//
// Nodes live in one Vec owned by the tree; children are index lists, so every
// child has exactly one owner and cycles cannot be expressed.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwitcherError};
use crate::state::{TabField, TabId, TabStatus, NO_TAB};

/// Position of a node inside the arena of the tree that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

/// One entry: a window, tab, bookmark (folder) or search suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub id: TabId,
    pub title: String,
    pub url: String,
    pub fav_icon_url: Option<String>,
    pub status: TabStatus,
    pub is_bookmark: bool,
    pub is_suggestion: bool,
    children: Vec<NodeIndex>,
}

impl TreeNode {
    fn root() -> Self {
        Self::from_spec(&NodeSpec::default())
    }

    fn from_spec(spec: &NodeSpec) -> Self {
        Self {
            id: spec.id,
            title: spec.title.clone(),
            url: spec.url.clone(),
            fav_icon_url: spec.fav_icon_url.clone(),
            status: spec.status,
            is_bookmark: spec.is_bookmark,
            is_suggestion: spec.is_suggestion,
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    fn apply(&mut self, field: TabField) {
        match field {
            TabField::Title(title) => self.title = title,
            TabField::FavIconUrl(icon) => self.fav_icon_url = icon,
            TabField::Status(status) => self.status = status,
        }
    }
}

/// Nested, owned form of a node. Collaborators build trees with it (or
/// deserialize it from JSON) and hand it to [`TabTree::from_specs`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub id: TabId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub status: TabStatus,
    #[serde(default)]
    pub is_bookmark: bool,
    #[serde(default)]
    pub is_suggestion: bool,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            id: NO_TAB,
            title: String::new(),
            url: String::new(),
            fav_icon_url: None,
            status: TabStatus::default(),
            is_bookmark: false,
            is_suggestion: false,
            children: Vec::new(),
        }
    }
}

impl NodeSpec {
    pub fn tab(id: TabId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn bookmark(id: TabId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            is_bookmark: true,
            ..Self::tab(id, title, url)
        }
    }

    pub fn suggestion(id: TabId, phrase: impl Into<String>) -> Self {
        Self {
            is_suggestion: true,
            ..Self::tab(id, phrase, "")
        }
    }

    pub fn with_children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children = children;
        self
    }
}

/// A rooted tree whose root is the sentinel node and whose root children are
/// the top-level groups (windows, bookmark folders, suggestion list).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabTree {
    nodes: Vec<TreeNode>,
}

impl Default for TabTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TabTree {
    /// An empty tree: just the sentinel root.
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode::root()],
        }
    }

    pub fn from_specs(top_level: Vec<NodeSpec>) -> Self {
        let mut tree = Self::new();
        let root = tree.root();
        for spec in &top_level {
            tree.add_child(root, spec);
        }
        tree
    }

    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    /// Appends `spec` (and its whole subtree) as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeIndex, spec: &NodeSpec) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        self.nodes.push(TreeNode::from_spec(spec));
        self.nodes[parent.0].children.push(index);
        for child in &spec.children {
            self.add_child(index, child);
        }
        index
    }

    pub fn get(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index.0)
    }

    /// Number of nodes, root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// True when the root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// Preorder walk starting at (and including) `start`, yielding each node
    /// with its depth relative to `start`.
    pub fn preorder(&self, start: NodeIndex) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![(start, 0)],
        }
    }

    /// First node in preorder whose id is `id`. The sentinel id never matches.
    pub fn find_by_id(&self, id: TabId) -> Option<NodeIndex> {
        if id == NO_TAB {
            return None;
        }
        self.preorder(self.root())
            .map(|(index, _)| index)
            .find(|&index| self.nodes[index.0].id == id)
    }

    pub fn node_by_id(&self, id: TabId) -> Option<&TreeNode> {
        self.find_by_id(id).and_then(|index| self.get(index))
    }

    /// Overwrites one field of the node with `id`. Shape, order and every
    /// other node are left untouched.
    pub fn set_field(&mut self, id: TabId, field: TabField) -> Result<()> {
        let index = self.find_by_id(id).ok_or(SwitcherError::NotFound(id))?;
        self.nodes[index.0].apply(field);
        Ok(())
    }

    /// `index`'s own id followed by every descendant id, preorder.
    pub fn collect_ids(&self, index: NodeIndex) -> Vec<TabId> {
        self.preorder(index)
            .map(|(index, _)| self.nodes[index.0].id)
            .collect()
    }

    /// [`collect_ids`](Self::collect_ids) for the node with `id`.
    pub fn collect_ids_by_id(&self, id: TabId) -> Result<Vec<TabId>> {
        let index = self.find_by_id(id).ok_or(SwitcherError::NotFound(id))?;
        Ok(self.collect_ids(index))
    }
}

pub struct Preorder<'a> {
    tree: &'a TabTree,
    stack: Vec<(NodeIndex, usize)>,
}

impl Iterator for Preorder<'_> {
    type Item = (NodeIndex, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, depth) = self.stack.pop()?;
        let node = self.tree.get(index)?;
        self.stack
            .extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
        Some((index, depth))
    }
}
