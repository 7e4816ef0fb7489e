// Test collaborators: a source whose answers the test releases by hand, in
// any order, and a tab manager that records every command.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::{Result, SwitcherError};
use crate::modules::sources::{Subscription, SuggestionSource, TabEventBus, TabManager, TreeSource};
use crate::modules::tree::TabTree;
use crate::state::{SourceKind, TabEvent, TabId};

enum Slot {
    Waiting(oneshot::Sender<Result<TabTree>>),
    Ready(Result<TabTree>),
}

/// Fetches block until the test calls [`Gate::resolve`] for the same kind and
/// keyword. Resolving first is fine too; the answer is kept for the fetch.
#[derive(Default)]
pub struct Gate {
    slots: Mutex<HashMap<(SourceKind, String), VecDeque<Slot>>>,
    requests: Mutex<Vec<(SourceKind, String)>>,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn resolve(&self, kind: SourceKind, keyword: &str, result: Result<TabTree>) {
        let mut slots = self.slots.lock().unwrap();
        let queue = slots.entry((kind, keyword.to_string())).or_default();
        if let Some(Slot::Waiting(_)) = queue.front() {
            if let Some(Slot::Waiting(sender)) = queue.pop_front() {
                let _ = sender.send(result);
                return;
            }
        }
        queue.push_back(Slot::Ready(result));
    }

    pub fn resolve_bundle(&self, keyword: &str, live: TabTree, bookmarks: TabTree) {
        self.resolve(SourceKind::Live, keyword, Ok(live));
        self.resolve(SourceKind::Bookmarks, keyword, Ok(bookmarks));
    }

    pub fn requests(&self) -> Vec<(SourceKind, String)> {
        self.requests.lock().unwrap().clone()
    }

    async fn wait(&self, kind: SourceKind, keyword: &str) -> Result<TabTree> {
        let receiver = {
            self.requests.lock().unwrap().push((kind, keyword.to_string()));
            let mut slots = self.slots.lock().unwrap();
            let queue = slots.entry((kind, keyword.to_string())).or_default();
            if let Some(Slot::Ready(_)) = queue.front() {
                if let Some(Slot::Ready(result)) = queue.pop_front() {
                    return result;
                }
            }
            let (sender, receiver) = oneshot::channel();
            queue.push_back(Slot::Waiting(sender));
            receiver
        };
        receiver.await.unwrap_or_else(|_| {
            Err(SwitcherError::SourceFailure {
                source_kind: kind,
                message: "gate dropped".to_string(),
            })
        })
    }
}

#[async_trait]
impl TreeSource for Gate {
    async fn live_tree(&self, keyword: &str) -> Result<TabTree> {
        self.wait(SourceKind::Live, keyword).await
    }

    async fn bookmark_tree(&self, keyword: &str) -> Result<TabTree> {
        self.wait(SourceKind::Bookmarks, keyword).await
    }
}

#[async_trait]
impl SuggestionSource for Gate {
    async fn suggestion_tree(&self, keyword: &str) -> Result<TabTree> {
        self.wait(SourceKind::Suggestions, keyword).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabCall {
    Remove(Vec<TabId>),
    Activate(TabId),
    Open(String),
}

#[derive(Default)]
pub struct RecordingTabs {
    pub bus: TabEventBus,
    calls: Mutex<Vec<TabCall>>,
    closed: bool,
}

impl RecordingTabs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A manager whose event stream has already ended.
    pub fn closed() -> Arc<Self> {
        Arc::new(Self {
            closed: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<TabCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn emit(&self, event: TabEvent) {
        self.bus.emit(event);
    }
}

#[async_trait]
impl TabManager for RecordingTabs {
    async fn remove(&self, ids: &[TabId]) -> Result<()> {
        self.calls.lock().unwrap().push(TabCall::Remove(ids.to_vec()));
        Ok(())
    }

    async fn activate(&self, id: TabId) -> Result<()> {
        self.calls.lock().unwrap().push(TabCall::Activate(id));
        Ok(())
    }

    async fn open_new_tab(&self, url: &str) -> Result<()> {
        self.calls.lock().unwrap().push(TabCall::Open(url.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        if self.closed {
            return TabEventBus::new().subscribe();
        }
        self.bus.subscribe()
    }
}
