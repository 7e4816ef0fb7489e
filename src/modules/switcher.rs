// Caller-facing core: keyword refreshes, tab events, keyboard navigation and
// activation over the merged live/bookmark/suggestion sequence.
//
// Single owner. Fetches run as tokio tasks and report back over a channel;
// every state change happens synchronously inside `handle`.

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::modules::merger::{FetchPlan, Generation, MergeOutcome, SourceMerger, SourceResponse};
use crate::modules::sources::{Subscription, SuggestionSource, TabManager, TreeSource};
use crate::modules::tree::TreeNode;
use crate::settings::Settings;
use crate::state::{EntryRow, SectionView, SourceKind, SwitcherView, TabEvent, TabId, NO_TAB};

/// Something the switcher has to react to.
#[derive(Debug)]
pub enum Inbound {
    Response(SourceResponse),
    Event(TabEvent),
}

/// What handling one inbound message did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handled {
    Merge(MergeOutcome),
    FieldsChanged { tab_id: TabId, applied: usize },
    TabRemoved { tab_id: TabId },
}

/// Action performed by [`TabSwitcher::activate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Activation {
    Search { query: String, url: String },
    OpenBookmark { url: String },
    FocusTab { tab_id: TabId },
    Nothing,
}

pub struct TabSwitcher {
    tree_source: Arc<dyn TreeSource>,
    suggestion_source: Option<Arc<dyn SuggestionSource>>,
    tabs: Arc<dyn TabManager>,
    settings: Settings,
    merger: SourceMerger,
    responses_tx: mpsc::UnboundedSender<SourceResponse>,
    responses_rx: mpsc::UnboundedReceiver<SourceResponse>,
    events: Subscription,
}

impl TabSwitcher {
    /// Subscribes to tab events and starts the initial unfiltered refresh.
    /// Must be called from within a tokio runtime.
    pub fn new(
        tree_source: Arc<dyn TreeSource>,
        suggestion_source: Option<Arc<dyn SuggestionSource>>,
        tabs: Arc<dyn TabManager>,
        settings: Settings,
    ) -> Self {
        let suggestions_enabled = settings.suggestions_enabled && suggestion_source.is_some();
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        let events = tabs.subscribe();
        let mut switcher = Self {
            tree_source,
            suggestion_source,
            tabs,
            merger: SourceMerger::new(settings.show_bookmarks, suggestions_enabled),
            settings,
            responses_tx,
            responses_rx,
            events,
        };
        switcher.refresh();
        switcher
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        let plan = self.merger.begin(keyword);
        self.dispatch(plan);
    }

    /// Refetches everything for the current keyword.
    pub fn refresh(&mut self) {
        let keyword = self.merger.keyword().to_string();
        self.set_keyword(keyword);
    }

    fn dispatch(&self, plan: FetchPlan) {
        let FetchPlan {
            generation,
            keyword,
            fetch_suggestions,
        } = plan;

        let source = Arc::clone(&self.tree_source);
        let tx = self.responses_tx.clone();
        let bundle_keyword = keyword.clone();
        tokio::spawn(async move {
            let (live, bookmarks) = tokio::join!(
                source.live_tree(&bundle_keyword),
                source.bookmark_tree(&bundle_keyword)
            );
            let response = SourceResponse::Bundle {
                generation,
                live,
                bookmarks,
            };
            if tx.send(response).is_err() {
                debug!("[Switcher] Dropping bundle {}, switcher is gone", generation);
            }
        });

        if !fetch_suggestions {
            return;
        }
        let Some(source) = self.suggestion_source.clone() else {
            return;
        };
        let tx = self.responses_tx.clone();
        tokio::spawn(async move {
            let tree = source.suggestion_tree(&keyword).await;
            if tx
                .send(SourceResponse::Suggestions { generation, tree })
                .is_err()
            {
                debug!("[Switcher] Dropping suggestions {}, switcher is gone", generation);
            }
        });
    }

    /// Waits for the next fetch result or tab event and applies it.
    /// Queued fetch results go first. Returns `None` once the tab manager's
    /// event bus has shut down.
    pub async fn pump(&mut self) -> Option<Handled> {
        let inbound = tokio::select! {
            biased;
            Some(response) = self.responses_rx.recv() => Inbound::Response(response),
            event = self.events.recv() => match event {
                Some(event) => Inbound::Event(event),
                None => {
                    info!("[Switcher] Tab event bus closed");
                    return None;
                }
            },
        };
        Some(self.handle(inbound))
    }

    /// Applies everything already queued, without waiting.
    pub fn drain(&mut self) -> Vec<Handled> {
        let mut handled = Vec::new();
        loop {
            let inbound = if let Ok(response) = self.responses_rx.try_recv() {
                Inbound::Response(response)
            } else if let Some(event) = self.events.try_recv() {
                Inbound::Event(event)
            } else {
                break;
            };
            handled.push(self.handle(inbound));
        }
        handled
    }

    pub fn handle(&mut self, inbound: Inbound) -> Handled {
        match inbound {
            Inbound::Response(response) => Handled::Merge(self.merger.accept(response)),
            Inbound::Event(TabEvent::Updated { tab_id, change }) => {
                let mut applied = 0;
                for field in change.into_fields() {
                    match self.merger.apply_field(tab_id, field) {
                        Ok(()) => applied += 1,
                        Err(e) => debug!("[Switcher] Ignoring update: {}", e),
                    }
                }
                Handled::FieldsChanged { tab_id, applied }
            }
            Inbound::Event(TabEvent::Removed { tab_id }) => {
                info!("[Switcher] Tab {} removed, rebuilding", tab_id);
                self.merger.clear_selection();
                self.refresh();
                Handled::TabRemoved { tab_id }
            }
        }
    }

    pub fn next(&mut self) -> Option<&TreeNode> {
        self.merger.next()
    }

    pub fn previous(&mut self) -> Option<&TreeNode> {
        self.merger.previous()
    }

    pub fn select(&mut self, position: usize) -> Option<&TreeNode> {
        self.merger.select(position)
    }

    pub fn selected(&self) -> Option<&TreeNode> {
        self.merger.selected().map(|(_, node)| node)
    }

    pub fn position(&self) -> Option<usize> {
        self.merger.cursor().position()
    }

    pub fn node_at(&self, position: usize) -> Option<&TreeNode> {
        self.merger.node_at(position)
    }

    /// Activates the entry at `position`, or runs a keyword search when
    /// `position` is `None`. A position with no entry behind it does nothing.
    pub async fn activate(&self, position: Option<usize>) -> Result<Activation> {
        let activation = match position {
            None => self.search(self.keyword()),
            Some(p) => match self.merger.node_at(p) {
                Some(node) if node.is_bookmark => Activation::OpenBookmark {
                    url: node.url.clone(),
                },
                Some(node) if node.is_suggestion => self.search(&node.title),
                Some(node) => Activation::FocusTab { tab_id: node.id },
                None => {
                    debug!("[Switcher] No entry at position {}, nothing to activate", p);
                    return Ok(Activation::Nothing);
                }
            },
        };

        match &activation {
            Activation::Search { url, .. } | Activation::OpenBookmark { url } => {
                self.tabs.open_new_tab(url).await?
            }
            Activation::FocusTab { tab_id } => self.tabs.activate(*tab_id).await?,
            Activation::Nothing => {}
        }
        info!("[Switcher] Activated {:?}", activation);
        Ok(activation)
    }

    pub async fn activate_selected(&self) -> Result<Activation> {
        self.activate(self.position()).await
    }

    fn search(&self, query: &str) -> Activation {
        Activation::Search {
            query: query.to_string(),
            url: self.settings.search_engine.query_url(query),
        }
    }

    /// Closes the live node with `node_id` and every tab under it. Unknown
    /// ids close nothing.
    pub async fn close_subtree(&self, node_id: TabId) -> Result<Vec<TabId>> {
        let ids = match self.merger.tree(SourceKind::Live).collect_ids_by_id(node_id) {
            Ok(ids) => ids,
            Err(e) => {
                debug!("[Switcher] Nothing to close: {}", e);
                return Ok(Vec::new());
            }
        };
        self.tabs.remove(&ids).await?;
        info!("[Switcher] Closing {} entries under {}", ids.len(), node_id);
        Ok(ids)
    }

    /// Closes the subtree of the selected live entry. Bookmarks and
    /// suggestions are not closable.
    pub async fn close_selected(&self) -> Result<Vec<TabId>> {
        match self.merger.selected() {
            Some((entry, node)) if entry.kind == SourceKind::Live => {
                self.close_subtree(node.id).await
            }
            _ => Ok(Vec::new()),
        }
    }

    pub async fn close_tab(&self, tab_id: TabId) -> Result<()> {
        self.tabs.remove(&[tab_id]).await
    }

    pub fn keyword(&self) -> &str {
        self.merger.keyword()
    }

    pub fn generation(&self) -> Generation {
        self.merger.generation()
    }

    pub fn version(&self) -> u64 {
        self.merger.version()
    }

    pub fn len(&self) -> usize {
        self.merger.sequence().len()
    }

    pub fn is_empty(&self) -> bool {
        self.merger.sequence().is_empty()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Snapshot of the published sequence, grouped by source.
    pub fn view(&self) -> SwitcherView {
        let selected = self.position();
        let mut sections: Vec<SectionView> = Vec::new();
        for (position, entry) in self.merger.sequence().entries().iter().enumerate() {
            let Some(node) = self.merger.tree(entry.kind).get(entry.index) else {
                continue;
            };
            let row = EntryRow {
                id: node.id,
                title: node.title.clone(),
                url: node.url.clone(),
                fav_icon_url: node.fav_icon_url.clone(),
                status: node.status,
                depth: entry.depth,
                is_bookmark: node.is_bookmark,
                is_suggestion: node.is_suggestion,
                selected: selected == Some(position),
            };
            match sections.last_mut() {
                Some(section) if section.kind == entry.kind => section.rows.push(row),
                _ => sections.push(SectionView {
                    kind: entry.kind,
                    rows: vec![row],
                }),
            }
        }

        SwitcherView {
            keyword: self.keyword().to_string(),
            version: self.version(),
            selected_index: selected.map_or(-1, |p| i64::try_from(p).unwrap_or(i64::MAX)),
            selected_tab_id: self.selected().map_or(NO_TAB, |node| node.id),
            sections,
        }
    }
}
