// In-memory browser backed by a JSON session snapshot. Implements every
// collaborator the switcher needs, with case-insensitive substring matching
// as its keyword policy.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SwitcherError};
use crate::modules::sources::{Subscription, SuggestionSource, TabEventBus, TabManager, TreeSource};
use crate::modules::tree::{NodeSpec, TabTree};
use crate::state::{TabChange, TabEvent, TabField, TabId, TabStatus};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub windows: Vec<WindowSnapshot>,
    #[serde(default)]
    pub bookmarks: Vec<NodeSpec>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub id: TabId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tabs: Vec<TabSnapshot>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
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
    pub active: bool,
}

impl SessionSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn next_tab_id(&self) -> TabId {
        self.windows
            .iter()
            .flat_map(|w| std::iter::once(w.id).chain(w.tabs.iter().map(|t| t.id)))
            .max()
            .unwrap_or(0)
            + 1
    }
}

fn matches(keyword: &str, title: &str, url: &str) -> bool {
    if keyword.is_empty() {
        return true;
    }
    let keyword = keyword.to_lowercase();
    title.to_lowercase().contains(&keyword) || url.to_lowercase().contains(&keyword)
}

/// Keeps matching leaves and any folder with a kept descendant.
fn prune_bookmarks(keyword: &str, nodes: &[NodeSpec]) -> Vec<NodeSpec> {
    nodes
        .iter()
        .filter_map(|node| {
            let children = prune_bookmarks(keyword, &node.children);
            let keep = if node.children.is_empty() {
                matches(keyword, &node.title, &node.url)
            } else {
                !children.is_empty()
            };
            keep.then(|| NodeSpec {
                is_bookmark: true,
                children,
                ..node.clone()
            })
        })
        .collect()
}

pub struct MemoryBrowser {
    session: Mutex<SessionSnapshot>,
    bus: TabEventBus,
}

impl MemoryBrowser {
    pub fn new(session: SessionSnapshot) -> Self {
        Self {
            session: Mutex::new(session),
            bus: TabEventBus::new(),
        }
    }

    fn session(&self) -> Result<MutexGuard<'_, SessionSnapshot>> {
        self.session
            .lock()
            .map_err(|e| SwitcherError::TabManager(e.to_string()))
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        Ok(self.session()?.clone())
    }

    /// Applies a browser-side change to a tab and notifies subscribers,
    /// the way a page load or title change would.
    pub fn update_tab(&self, tab_id: TabId, change: TabChange) -> Result<()> {
        {
            let mut session = self.session()?;
            let tab = session
                .windows
                .iter_mut()
                .flat_map(|w| w.tabs.iter_mut())
                .find(|t| t.id == tab_id)
                .ok_or(SwitcherError::NotFound(tab_id))?;
            for field in change.clone().into_fields() {
                match field {
                    TabField::Title(title) => tab.title = title,
                    TabField::FavIconUrl(icon) => tab.fav_icon_url = icon,
                    TabField::Status(status) => tab.status = status,
                }
            }
        }
        self.bus.emit(TabEvent::Updated { tab_id, change });
        Ok(())
    }
}

#[async_trait]
impl TreeSource for MemoryBrowser {
    async fn live_tree(&self, keyword: &str) -> Result<TabTree> {
        let session = self.session()?;
        let windows = session
            .windows
            .iter()
            .enumerate()
            .filter_map(|(n, window)| {
                let tabs: Vec<NodeSpec> = window
                    .tabs
                    .iter()
                    .filter(|t| matches(keyword, &t.title, &t.url))
                    .map(|t| NodeSpec {
                        fav_icon_url: t.fav_icon_url.clone(),
                        status: t.status,
                        ..NodeSpec::tab(t.id, t.title.clone(), t.url.clone())
                    })
                    .collect();
                if tabs.is_empty() && !keyword.is_empty() {
                    return None;
                }
                let title = window
                    .title
                    .clone()
                    .unwrap_or_else(|| format!("Window {}", n + 1));
                Some(NodeSpec::tab(window.id, title, "").with_children(tabs))
            })
            .collect();
        Ok(TabTree::from_specs(windows))
    }

    async fn bookmark_tree(&self, keyword: &str) -> Result<TabTree> {
        let session = self.session()?;
        Ok(TabTree::from_specs(prune_bookmarks(keyword, &session.bookmarks)))
    }
}

#[async_trait]
impl SuggestionSource for MemoryBrowser {
    async fn suggestion_tree(&self, keyword: &str) -> Result<TabTree> {
        let session = self.session()?;
        let phrases = session
            .suggestions
            .iter()
            .filter(|phrase| matches(keyword, phrase, ""))
            .enumerate()
            .map(|(i, phrase)| NodeSpec::suggestion(i as TabId + 1, phrase.clone()))
            .collect();
        Ok(TabTree::from_specs(phrases))
    }
}

#[async_trait]
impl TabManager for MemoryBrowser {
    /// Closes tabs by id. Window ids are not tabs and are skipped; a window
    /// goes away with its last tab.
    async fn remove(&self, ids: &[TabId]) -> Result<()> {
        let mut removed = Vec::new();
        {
            let mut session = self.session()?;
            for &id in ids {
                let Some(window) = session
                    .windows
                    .iter_mut()
                    .find(|w| w.tabs.iter().any(|t| t.id == id))
                else {
                    debug!("[Browser] No tab {} to remove", id);
                    continue;
                };
                window.tabs.retain(|t| t.id != id);
                removed.push(id);
            }
            session.windows.retain(|w| !w.tabs.is_empty());
        }
        info!("[Browser] Removed tabs {:?}", removed);
        for tab_id in removed {
            self.bus.emit(TabEvent::Removed { tab_id });
        }
        Ok(())
    }

    async fn activate(&self, id: TabId) -> Result<()> {
        let mut session = self.session()?;
        if session.windows.iter().any(|w| w.id == id) {
            debug!("[Browser] Focused window {}", id);
            return Ok(());
        }
        let window = session
            .windows
            .iter_mut()
            .find(|w| w.tabs.iter().any(|t| t.id == id))
            .ok_or_else(|| SwitcherError::TabManager(format!("no tab or window {}", id)))?;
        for tab in window.tabs.iter_mut() {
            tab.active = tab.id == id;
        }
        debug!("[Browser] Activated tab {}", id);
        Ok(())
    }

    async fn open_new_tab(&self, url: &str) -> Result<()> {
        let mut session = self.session()?;
        let id = session.next_tab_id();
        if session.windows.is_empty() {
            session.windows.push(WindowSnapshot {
                id,
                title: None,
                tabs: Vec::new(),
            });
            return self.open_in_last_window(&mut session, id + 1, url);
        }
        self.open_in_last_window(&mut session, id, url)
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }
}

impl MemoryBrowser {
    fn open_in_last_window(&self, session: &mut SessionSnapshot, id: TabId, url: &str) -> Result<()> {
        let window = session
            .windows
            .last_mut()
            .ok_or_else(|| SwitcherError::TabManager("no window to open into".to_string()))?;
        for tab in window.tabs.iter_mut() {
            tab.active = false;
        }
        window.tabs.push(TabSnapshot {
            id,
            title: url.to_string(),
            url: url.to_string(),
            fav_icon_url: None,
            status: TabStatus::Loading,
            active: true,
        });
        info!("[Browser] Opened tab {} at {}", id, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::sequence::flatten;
    use crate::modules::switcher::{Handled, TabSwitcher};
    use crate::modules::merger::MergeOutcome;
    use crate::settings::Settings;
    use std::sync::Arc;
    use std::time::Duration;

    const SESSION: &str = r#"{
        "windows": [
            {"id": 1, "tabs": [
                {"id": 11, "title": "Rust Docs", "url": "https://doc.rust-lang.org", "active": true},
                {"id": 12, "title": "Hacker News", "url": "https://news.ycombinator.com"}
            ]},
            {"id": 2, "title": "Work", "tabs": [
                {"id": 21, "title": "Tokio", "url": "https://tokio.rs", "status": "loading"}
            ]}
        ],
        "bookmarks": [
            {"id": 100, "title": "Dev", "children": [
                {"id": 101, "title": "crates.io", "url": "https://crates.io"},
                {"id": 102, "title": "Rustonomicon", "url": "https://doc.rust-lang.org/nomicon"}
            ]}
        ],
        "suggestions": ["rust book", "rust async", "tokio tutorial"]
    }"#;

    fn browser() -> MemoryBrowser {
        MemoryBrowser::new(serde_json::from_str(SESSION).unwrap())
    }

    fn titles(tree: &TabTree) -> Vec<String> {
        flatten(tree)
            .into_iter()
            .map(|(i, _)| tree.get(i).unwrap().title.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_live_tree_filters_and_drops_empty_windows() {
        let browser = browser();
        let all = browser.live_tree("").await.unwrap();
        assert_eq!(
            titles(&all),
            vec!["Window 1", "Rust Docs", "Hacker News", "Work", "Tokio"]
        );
        assert_eq!(all.node_by_id(21).unwrap().status, TabStatus::Loading);

        let rust = browser.live_tree("RUST").await.unwrap();
        assert_eq!(titles(&rust), vec!["Window 1", "Rust Docs"]);
    }

    #[tokio::test]
    async fn test_bookmark_tree_keeps_folders_with_matches() {
        let browser = browser();
        let tree = browser.bookmark_tree("nomicon").await.unwrap();
        assert_eq!(titles(&tree), vec!["Dev", "Rustonomicon"]);
        assert!(tree.node_by_id(100).unwrap().is_bookmark);
        assert!(browser.bookmark_tree("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_suggestion_tree() {
        let browser = browser();
        let tree = browser.suggestion_tree("rust").await.unwrap();
        assert_eq!(titles(&tree), vec!["rust book", "rust async"]);
        assert!(tree.node_by_id(1).unwrap().is_suggestion);
    }

    #[tokio::test]
    async fn test_remove_closes_tabs_and_empty_windows() {
        let browser = browser();
        let mut sub = browser.subscribe();
        browser.remove(&[1, 11, 12]).await.unwrap();
        assert_eq!(sub.try_recv(), Some(TabEvent::Removed { tab_id: 11 }));
        assert_eq!(sub.try_recv(), Some(TabEvent::Removed { tab_id: 12 }));
        assert_eq!(sub.try_recv(), None);
        assert_eq!(browser.snapshot().unwrap().windows.len(), 1);
    }

    #[tokio::test]
    async fn test_activate_and_open() {
        let browser = browser();
        browser.activate(12).await.unwrap();
        let session = browser.snapshot().unwrap();
        assert!(session.windows[0].tabs[1].active);
        assert!(!session.windows[0].tabs[0].active);
        assert!(browser.activate(999).await.is_err());

        browser.open_new_tab("https://example.com").await.unwrap();
        let session = browser.snapshot().unwrap();
        let opened = session.windows[1].tabs.last().unwrap();
        assert_eq!(opened.id, 22);
        assert_eq!(opened.status, TabStatus::Loading);
    }

    #[tokio::test]
    async fn test_open_into_empty_session_creates_window() {
        let browser = MemoryBrowser::new(SessionSnapshot::default());
        browser.open_new_tab("https://example.com").await.unwrap();
        let session = browser.snapshot().unwrap();
        assert_eq!(session.windows.len(), 1);
        assert_eq!(session.windows[0].id, 1);
        assert_eq!(session.windows[0].tabs[0].id, 2);
    }

    async fn pump(switcher: &mut TabSwitcher) -> Option<Handled> {
        tokio::time::timeout(Duration::from_secs(2), switcher.pump())
            .await
            .expect("pump timed out")
    }

    #[tokio::test]
    async fn test_switcher_over_memory_browser() {
        let browser = Arc::new(browser());
        let settings = Settings {
            suggestions_enabled: true,
            ..Settings::default()
        };
        let mut switcher = TabSwitcher::new(
            browser.clone(),
            Some(browser.clone() as Arc<dyn SuggestionSource>),
            browser.clone(),
            settings,
        );
        assert_eq!(pump(&mut switcher).await, Some(Handled::Merge(MergeOutcome::Rebuilt)));

        switcher.set_keyword("rust");
        let outcomes = vec![pump(&mut switcher).await, pump(&mut switcher).await];
        assert!(outcomes.contains(&Some(Handled::Merge(MergeOutcome::Rebuilt))));

        let view = switcher.view();
        let titles: Vec<Vec<String>> = view
            .sections
            .iter()
            .map(|s| s.rows.iter().map(|r| r.title.clone()).collect())
            .collect();
        assert_eq!(
            titles,
            vec![
                vec!["Window 1".to_string(), "Rust Docs".to_string()],
                vec!["Dev".to_string(), "Rustonomicon".to_string()],
                vec!["rust book".to_string(), "rust async".to_string()],
            ]
        );

        // Only the visible tab of window 1 closes; its removal rebuilds.
        switcher.next();
        assert_eq!(switcher.close_selected().await.unwrap(), vec![1, 11]);
        assert_eq!(pump(&mut switcher).await, Some(Handled::TabRemoved { tab_id: 11 }));
        assert_eq!(switcher.position(), None);

        browser
            .update_tab(
                21,
                TabChange {
                    title: Some("Rust async book".to_string()),
                    ..TabChange::default()
                },
            )
            .unwrap();
        let mut seen_update = false;
        let mut rebuilt = false;
        while !(seen_update && rebuilt) {
            match pump(&mut switcher).await {
                Some(Handled::FieldsChanged { tab_id: 21, .. }) => seen_update = true,
                Some(Handled::Merge(MergeOutcome::Rebuilt)) => rebuilt = true,
                Some(_) => {}
                None => break,
            }
        }
        let view = switcher.view();
        let live = &view.sections[0];
        assert!(live.rows.iter().any(|r| r.id == 21 && r.title == "Rust async book"));
        assert!(!live.rows.iter().any(|r| r.id == 11));
        assert_eq!(browser.snapshot().unwrap().windows[0].tabs.len(), 1);
    }
}
