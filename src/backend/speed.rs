use super::types::{FeedSnapshot, PostId};
use chrono::{DateTime, Utc};

/// Number of recent posts consulted when estimating the feed speed.
const WINDOW: usize = 20;
/// Average gap between posts above which the feed is considered too slow.
const MAX_GAP_SECONDS: f64 = 30.0 * 60.0;
/// Age of the newest post above which the feed is considered too slow.
const MAX_AGE_MILLIS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSpeed {
    /// Estimated average gap between recent posts, in seconds.
    pub gap_seconds: f64,
    pub newest: DateTime<Utc>,
}

impl Default for FeedSpeed {
    fn default() -> Self {
        Self {
            gap_seconds: 0.0,
            newest: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

fn recent_ids(snapshot: &FeedSnapshot) -> &[Option<PostId>] {
    if snapshot.pending_items.is_empty() {
        &snapshot.items
    } else {
        &snapshot.pending_items
    }
}

/// Estimates how active the feed is from the first page of recent posts,
/// ignoring the viewer's own posts.
pub fn feed_speed(snapshot: &FeedSnapshot, viewer: Option<&str>) -> FeedSpeed {
    let datetimes = recent_ids(snapshot)
        .iter()
        .flatten()
        .filter_map(|id| snapshot.statuses.get(id))
        .filter(|post| viewer != Some(post.author.as_str()))
        .take(WINDOW)
        .map(|post| post.created_at)
        .collect::<Vec<_>>();
    let (Some(oldest), Some(newest)) = (
        datetimes.iter().min().copied(),
        datetimes.iter().max().copied(),
    ) else {
        return FeedSpeed::default();
    };
    let span = (newest - oldest).num_milliseconds() as f64;
    FeedSpeed {
        gap_seconds: span / (1000.0 * (datetimes.len() + 1) as f64),
        newest,
    }
}

/// Whether the feed has settled and is still too quiet to be interesting.
pub fn is_too_slow(snapshot: &FeedSnapshot, speed: &FeedSpeed, now: DateTime<Utc>) -> bool {
    !snapshot.is_loading
        && !snapshot.is_partial
        && (speed.gap_seconds > MAX_GAP_SECONDS
            || (now - speed.newest).num_milliseconds() > MAX_AGE_MILLIS)
}

#[derive(Debug, Clone)]
struct Key {
    ids: Vec<Option<PostId>>,
    revision: u64,
    viewer: Option<String>,
}

/// Memoizes [`feed_speed`] on the fields it actually consults.
#[derive(Debug, Default)]
pub struct SpeedSelector {
    cached: Option<(Key, FeedSpeed)>,
}

impl SpeedSelector {
    pub fn select(&mut self, snapshot: &FeedSnapshot, viewer: Option<&str>) -> FeedSpeed {
        let ids = recent_ids(snapshot);
        match &self.cached {
            Some((key, speed))
                if key.revision == snapshot.revision
                    && key.viewer.as_deref() == viewer
                    && key.ids == ids =>
            {
                *speed
            }
            _ => {
                let speed = feed_speed(snapshot, viewer);
                log::debug!("feed speed: {speed:?}");
                let key = Key {
                    ids: ids.to_vec(),
                    revision: snapshot.revision,
                    viewer: viewer.map(String::from),
                };
                self.cached = Some((key, speed));
                speed
            }
        }
    }
    pub fn too_slow(
        &mut self,
        snapshot: &FeedSnapshot,
        viewer: Option<&str>,
        now: DateTime<Utc>,
    ) -> bool {
        let speed = self.select(snapshot, viewer);
        is_too_slow(snapshot, &speed, now)
    }
}
