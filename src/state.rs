// Shared value types passed between the core, its collaborators and the UI.
// Kept free of any logic so every module can depend on them.

use serde::{Deserialize, Serialize};

/// Browser-assigned identifier of a tab, window, bookmark or suggestion entry.
pub type TabId = i64;

/// Sentinel id: the synthetic tree root, or "no tab selected".
pub const NO_TAB: TabId = -1;

/// Which collaborator a tree (and the section it renders as) came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Live,
    Bookmarks,
    Suggestions,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    #[default]
    Complete,
    Loading,
    Unloaded,
}

/// One scalar field of a node, with its new value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabField {
    Title(String),
    FavIconUrl(Option<String>),
    Status(TabStatus),
}

/// A tab update as the browser reports it: any subset of fields at once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabChange {
    pub title: Option<String>,
    pub fav_icon_url: Option<String>,
    pub status: Option<TabStatus>,
}

impl TabChange {
    /// Splits the change into single-field updates, title first.
    pub fn into_fields(self) -> Vec<TabField> {
        let mut fields = Vec::new();
        if let Some(title) = self.title {
            fields.push(TabField::Title(title));
        }
        if let Some(icon) = self.fav_icon_url {
            fields.push(TabField::FavIconUrl(Some(icon)));
        }
        if let Some(status) = self.status {
            fields.push(TabField::Status(status));
        }
        fields
    }
}

/// Inbound notifications from the tab manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabEvent {
    Updated { tab_id: TabId, change: TabChange },
    Removed { tab_id: TabId },
}

/// One rendered row of a section.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntryRow {
    pub id: TabId,
    pub title: String,
    pub url: String,
    pub fav_icon_url: Option<String>,
    pub status: TabStatus,
    pub depth: usize,
    pub is_bookmark: bool,
    pub is_suggestion: bool,
    pub selected: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub kind: SourceKind,
    pub rows: Vec<EntryRow>,
}

/// Snapshot handed to the UI layer. `selected_index` is -1 when nothing is
/// selected; `version` changes whenever anything visible changes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SwitcherView {
    pub keyword: String,
    pub version: u64,
    pub selected_index: i64,
    pub selected_tab_id: TabId,
    pub sections: Vec<SectionView>,
}
