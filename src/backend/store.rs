use super::config::TimelineConfig;
use super::source::{FetchRequest, Page, TimelineSource};
use super::types::{ColumnSettings, FeedSnapshot, TimelineAction};
use color_eyre::Result;
use std::collections::HashMap;
use std::fs;
use std::mem;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

/// Owns every timeline snapshot and the list of pinned columns.
///
/// Snapshots are published through `watch` channels; readers only ever see
/// them through [`Store::timeline`].
pub struct Store {
    timelines: HashMap<String, watch::Sender<FeedSnapshot>>,
    columns: Vec<ColumnSettings>,
    source: Arc<dyn TimelineSource>,
    config: TimelineConfig,
}

impl Store {
    pub fn new(
        source: Arc<dyn TimelineSource>,
        columns: Vec<ColumnSettings>,
        config: TimelineConfig,
    ) -> Self {
        Self {
            timelines: HashMap::new(),
            columns,
            source,
            config,
        }
    }
    pub fn columns(&self) -> &[ColumnSettings] {
        &self.columns
    }
    /// Subscribes to a timeline, creating an empty one on first use.
    pub fn timeline(&mut self, name: &str) -> watch::Receiver<FeedSnapshot> {
        self.sender(name).subscribe()
    }
    pub fn timeline_state(&mut self, name: &str) -> FeedSnapshot {
        self.sender(name).borrow().clone()
    }
    fn sender(&mut self, name: &str) -> &watch::Sender<FeedSnapshot> {
        self.timelines
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(FeedSnapshot::default()).0)
    }
    /// Applies an action. Returns `true` if the column list changed.
    pub fn apply(&mut self, action: TimelineAction) -> bool {
        match action {
            TimelineAction::AddColumn(kind, params) => {
                let id = next_column_id(&self.columns);
                log::info!("pin {kind} column as {id}");
                self.columns.push(ColumnSettings { id, kind, params });
                true
            }
            TimelineAction::RemoveColumn(id) => {
                let len = self.columns.len();
                self.columns.retain(|column| column.id != id);
                self.columns.len() != len
            }
            TimelineAction::MoveColumn(id, direction) => {
                let Some(index) = self.columns.iter().position(|column| column.id == id) else {
                    return false;
                };
                let target = index
                    .saturating_add_signed(direction)
                    .min(self.columns.len() - 1);
                if target == index {
                    return false;
                }
                let column = self.columns.remove(index);
                self.columns.insert(target, column);
                true
            }
            TimelineAction::ChangeColumnParams(id, key, value) => {
                let Some(column) = self.columns.iter_mut().find(|column| column.id == id) else {
                    return false;
                };
                if column.params.get(&key) == Some(&value) {
                    return false;
                }
                log::info!("set {key} = {value} on column {id}");
                column.params.insert(key, value);
                true
            }
            TimelineAction::ExpandTimeline { name, max_id } => {
                self.expand(&name, max_id.is_some());
                false
            }
            TimelineAction::ScrollTop(name, top) => {
                self.sender(&name)
                    .send_modify(|snapshot| scroll_top(snapshot, top));
                false
            }
        }
    }
    fn expand(&mut self, name: &str, older: bool) {
        let (source, limit) = (self.source.clone(), self.config.limit);
        let tx = self.sender(name).clone();
        let cursor = {
            let snapshot = tx.borrow();
            if snapshot.is_loading {
                return log::debug!("{name} is already loading");
            }
            match (older, &snapshot.cursor) {
                (false, _) => None,
                (true, Some(cursor)) => Some(cursor.clone()),
                (true, None) => return log::debug!("no older posts in {name}"),
            }
        };
        tx.send_modify(|snapshot| snapshot.is_loading = true);
        let request = FetchRequest {
            name: name.to_string(),
            cursor,
            limit,
        };
        tokio::spawn(async move {
            let result = source.fetch(request).await;
            tx.send_modify(|snapshot| {
                snapshot.is_loading = false;
                match result {
                    Ok(page) if older => append(snapshot, page),
                    Ok(page) => prepend(snapshot, page),
                    Err(e) => {
                        log::warn!("failed to expand timeline: {e}");
                        if !older {
                            snapshot.is_partial = true;
                        }
                    }
                }
            });
        });
    }
    pub fn load_columns(path: &Path) -> Result<Vec<ColumnSettings>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
    pub fn save_columns(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(&self.columns)?)?;
        log::debug!("saved {} columns to {path:?}", self.columns.len());
        Ok(())
    }
}

fn next_column_id(columns: &[ColumnSettings]) -> String {
    columns
        .iter()
        .filter_map(|column| column.id.parse::<u64>().ok())
        .max()
        .map_or(1, |max| max + 1)
        .to_string()
}

fn store_posts(snapshot: &mut FeedSnapshot, page: &Page) {
    for post in &page.posts {
        snapshot.statuses.insert(post.id.clone(), post.clone());
    }
    snapshot.revision += 1;
}

fn unseen(snapshot: &FeedSnapshot, page: &Page) -> Vec<Option<String>> {
    page.posts
        .iter()
        .filter(|post| !snapshot.contains(&post.id))
        .map(|post| Some(post.id.clone()))
        .collect()
}

fn prepend(snapshot: &mut FeedSnapshot, page: Page) {
    let was_empty = snapshot.items.is_empty() && snapshot.pending_items.is_empty();
    let mut fresh = unseen(snapshot, &page);
    // Nothing overlapped with what we have: there may be posts in between.
    if !was_empty && !fresh.is_empty() && fresh.len() == page.posts.len() {
        fresh.push(None);
    }
    store_posts(snapshot, &page);
    if was_empty {
        snapshot.cursor = page.cursor;
    }
    snapshot.is_partial = false;
    if snapshot.top || was_empty {
        snapshot.items.splice(0..0, fresh);
    } else {
        snapshot.unread += fresh.iter().flatten().count();
        snapshot.pending_items.splice(0..0, fresh);
    }
}

fn append(snapshot: &mut FeedSnapshot, page: Page) {
    let fresh = unseen(snapshot, &page);
    store_posts(snapshot, &page);
    snapshot.items.extend(fresh);
    snapshot.cursor = page.cursor;
}

fn scroll_top(snapshot: &mut FeedSnapshot, top: bool) {
    snapshot.top = top;
    if top {
        snapshot.unread = 0;
        let pending = mem::take(&mut snapshot.pending_items);
        snapshot.items.splice(0..0, pending);
    }
}
