// Generation-guarded merge of the live, bookmark and suggestion trees into
// the published sequence and cursor. Synchronous: the switcher feeds it
// responses one at a time, in whatever order the fetches resolve.

use log::{debug, info, warn};

use crate::error::Result;
use crate::modules::cursor::NavigationCursor;
use crate::modules::sequence::{NavigableSequence, SequenceEntry};
use crate::modules::tree::{TabTree, TreeNode};
use crate::state::{SourceKind, TabField, TabId};

/// Tag of one keyword refresh. Only responses carrying the current value
/// are applied.
pub type Generation = u64;

/// What a refresh has to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPlan {
    pub generation: Generation,
    pub keyword: String,
    pub fetch_suggestions: bool,
}

/// A resolved fetch. Live and bookmark trees travel together because the
/// sequence is only rebuilt once both are in.
#[derive(Debug)]
pub enum SourceResponse {
    Bundle {
        generation: Generation,
        live: Result<TabTree>,
        bookmarks: Result<TabTree>,
    },
    Suggestions {
        generation: Generation,
        tree: Result<TabTree>,
    },
}

impl SourceResponse {
    pub fn generation(&self) -> Generation {
        match self {
            Self::Bundle { generation, .. } | Self::Suggestions { generation, .. } => *generation,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Live + bookmarks (+ any early suggestions) republished, cursor reset.
    Rebuilt,
    /// Suggestions appended after the published entries, cursor kept.
    Appended,
    /// Suggestions arrived before their bundle; kept until it lands.
    Held,
    /// Response from a superseded generation, discarded.
    Stale,
}

pub struct SourceMerger {
    generation: Generation,
    keyword: String,
    show_bookmarks: bool,
    suggestions_enabled: bool,
    live: TabTree,
    bookmarks: TabTree,
    suggestions: TabTree,
    /// Suggestions that beat their bundle. Not published until it lands.
    pending_suggestions: Option<(Generation, TabTree)>,
    bundle_generation: Option<Generation>,
    sequence: NavigableSequence,
    cursor: NavigationCursor,
    version: u64,
}

impl SourceMerger {
    pub fn new(show_bookmarks: bool, suggestions_enabled: bool) -> Self {
        Self {
            generation: 0,
            keyword: String::new(),
            show_bookmarks,
            suggestions_enabled,
            live: TabTree::new(),
            bookmarks: TabTree::new(),
            suggestions: TabTree::new(),
            pending_suggestions: None,
            bundle_generation: None,
            sequence: NavigableSequence::default(),
            cursor: NavigationCursor::default(),
            version: 0,
        }
    }

    /// Starts a refresh for `keyword` and supersedes every outstanding fetch.
    pub fn begin(&mut self, keyword: impl Into<String>) -> FetchPlan {
        self.generation += 1;
        self.keyword = keyword.into();
        debug!(
            "[Merger] Generation {} for keyword {:?}",
            self.generation, self.keyword
        );
        FetchPlan {
            generation: self.generation,
            keyword: self.keyword.clone(),
            fetch_suggestions: self.suggestions_enabled && !self.keyword.is_empty(),
        }
    }

    pub fn accept(&mut self, response: SourceResponse) -> MergeOutcome {
        if response.generation() != self.generation {
            debug!(
                "[Merger] Discarding stale response (generation {}, current {})",
                response.generation(),
                self.generation
            );
            return MergeOutcome::Stale;
        }

        match response {
            SourceResponse::Bundle {
                generation,
                live,
                bookmarks,
            } => {
                self.live = or_empty(SourceKind::Live, live);
                self.bookmarks = or_empty(SourceKind::Bookmarks, bookmarks);
                self.bundle_generation = Some(generation);
                self.rebuild();
                MergeOutcome::Rebuilt
            }
            SourceResponse::Suggestions { generation, tree } => {
                let tree = or_empty(SourceKind::Suggestions, tree);
                if self.bundle_generation != Some(generation) {
                    debug!("[Merger] Holding suggestions until bundle {} lands", generation);
                    self.pending_suggestions = Some((generation, tree));
                    return MergeOutcome::Held;
                }
                self.suggestions = tree;
                if self.suggestions_visible() {
                    self.sequence.append(SourceKind::Suggestions, &self.suggestions);
                    self.cursor.resize(self.sequence.len());
                }
                self.version += 1;
                debug!("[Merger] Appended suggestions, {} entries", self.sequence.len());
                MergeOutcome::Appended
            }
        }
    }

    fn rebuild(&mut self) {
        self.suggestions = match self.pending_suggestions.take() {
            Some((generation, tree)) if generation == self.generation => tree,
            _ => TabTree::new(),
        };
        let mut trees = vec![(SourceKind::Live, &self.live)];
        if self.bookmarks_visible() {
            trees.push((SourceKind::Bookmarks, &self.bookmarks));
        }
        if self.suggestions_visible() {
            trees.push((SourceKind::Suggestions, &self.suggestions));
        }
        self.sequence = NavigableSequence::flatten_many(trees);
        self.cursor = NavigationCursor::new(self.sequence.len());
        self.version += 1;
        info!(
            "[Merger] Published {} entries for {:?}",
            self.sequence.len(),
            self.keyword
        );
    }

    fn bookmarks_visible(&self) -> bool {
        self.show_bookmarks && !self.keyword.is_empty() && !self.bookmarks.is_empty()
    }

    fn suggestions_visible(&self) -> bool {
        self.suggestions_enabled && !self.keyword.is_empty() && !self.suggestions.is_empty()
    }

    /// Patches a live node in place. The sequence holds indices, so it stays
    /// valid and needs no rebuild.
    pub fn apply_field(&mut self, id: TabId, field: TabField) -> Result<()> {
        self.live.set_field(id, field)?;
        self.version += 1;
        Ok(())
    }

    pub fn next(&mut self) -> Option<&TreeNode> {
        let position = self.cursor.next()?;
        self.version += 1;
        self.node_at(position)
    }

    pub fn previous(&mut self) -> Option<&TreeNode> {
        let position = self.cursor.previous()?;
        self.version += 1;
        self.node_at(position)
    }

    pub fn select(&mut self, position: usize) -> Option<&TreeNode> {
        let before = self.cursor.position();
        let after = self.cursor.select(position)?;
        if before != Some(after) {
            self.version += 1;
        }
        self.node_at(after)
    }

    pub fn clear_selection(&mut self) {
        if self.cursor.position().is_some() {
            self.cursor.reset();
            self.version += 1;
        }
    }

    pub fn selected(&self) -> Option<(SequenceEntry, &TreeNode)> {
        let position = self.cursor.position()?;
        let entry = *self.sequence.get(position)?;
        Some((entry, self.tree(entry.kind).get(entry.index)?))
    }

    pub fn node_at(&self, position: usize) -> Option<&TreeNode> {
        self.sequence.resolve(position, move |kind| self.tree(kind))
    }

    pub fn tree(&self, kind: SourceKind) -> &TabTree {
        match kind {
            SourceKind::Live => &self.live,
            SourceKind::Bookmarks => &self.bookmarks,
            SourceKind::Suggestions => &self.suggestions,
        }
    }

    pub fn sequence(&self) -> &NavigableSequence {
        &self.sequence
    }

    pub fn cursor(&self) -> &NavigationCursor {
        &self.cursor
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

fn or_empty(kind: SourceKind, result: Result<TabTree>) -> TabTree {
    result.unwrap_or_else(|e| {
        warn!("[Merger] {:?} source failed, showing no entries: {}", kind, e);
        TabTree::new()
    })
}
