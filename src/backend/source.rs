use super::types::{Post, PostId};
use bsky_sdk::api::app::bsky::feed::defs::{FeedViewPost, FeedViewPostReasonRefs};
use bsky_sdk::api::records::{KnownRecord, Record};
use bsky_sdk::api::types::Union;
use bsky_sdk::BskyAgent;
use chrono::{DateTime, Utc};
use color_eyre::{eyre, Result};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub name: String,
    /// Continue after this cursor. `None` requests the newest page.
    pub cursor: Option<String>,
    pub limit: u8,
}

/// One page of a timeline, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub posts: Vec<Post>,
    pub cursor: Option<String>,
}

pub trait TimelineSource: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Page>>;
}

/// Fetches timelines from the signed-in account's AppView.
pub struct BskySource {
    agent: Option<Arc<BskyAgent>>,
}

impl BskySource {
    pub fn new(agent: Option<Arc<BskyAgent>>) -> Self {
        Self { agent }
    }
}

impl TimelineSource for BskySource {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Page>> {
        let agent = self.agent.clone();
        async move {
            let agent = agent.ok_or_else(|| eyre::eyre!("not signed in"))?;
            match request.name.as_str() {
                "home" => Ok(get_timeline(&agent, request.cursor, request.limit).await?),
                name => Err(eyre::eyre!("unknown timeline: {name}")),
            }
        }
        .boxed()
    }
}

async fn get_timeline(
    agent: &BskyAgent,
    cursor: Option<String>,
    limit: u8,
) -> bsky_sdk::Result<Page> {
    let output = agent
        .api
        .app
        .bsky
        .feed
        .get_timeline(
            bsky_sdk::api::app::bsky::feed::get_timeline::ParametersData {
                algorithm: None,
                cursor,
                limit: limit.try_into().ok(),
            }
            .into(),
        )
        .await?
        .data;
    log::debug!("fetch {} feed view posts", output.feed.len());
    Ok(Page {
        posts: latest_entries(output.feed.iter().map(entry).collect()),
        cursor: output.cursor,
    })
}

#[derive(Debug, Clone)]
struct Entry {
    post: Post,
    reposted_at: Option<DateTime<Utc>>,
}

fn entry(feed_view_post: &FeedViewPost) -> Entry {
    let view = &feed_view_post.post;
    let (text, created_at) = match &view.record {
        Record::Known(KnownRecord::AppBskyFeedPost(record)) => (
            record.text.clone(),
            record.created_at.as_ref().with_timezone(&Utc),
        ),
        _ => (String::new(), view.indexed_at.as_ref().with_timezone(&Utc)),
    };
    let (reposted_at, reposted_by) = match &feed_view_post.reason {
        Some(Union::Refs(FeedViewPostReasonRefs::ReasonRepost(repost))) => (
            Some(repost.indexed_at.as_ref().with_timezone(&Utc)),
            Some(
                repost
                    .by
                    .display_name
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| repost.by.handle.as_str().to_string()),
            ),
        ),
        _ => (None, None),
    };
    Entry {
        post: Post {
            id: view.uri.clone(),
            author: view.author.did.as_str().to_string(),
            handle: view.author.handle.as_str().to_string(),
            display_name: view.author.display_name.clone().filter(|s| !s.is_empty()),
            text,
            created_at,
            reply_count: view.reply_count.unwrap_or_default(),
            repost_count: view.repost_count.unwrap_or_default(),
            like_count: view.like_count.unwrap_or_default(),
            reposted_by,
            is_reply: feed_view_post.reply.is_some(),
        },
        reposted_at,
    }
}

/// Collapses a newest-first feed to one entry per post, placing each post
/// where its latest appearance (original or repost) is.
fn latest_entries(feed: Vec<Entry>) -> Vec<Post> {
    let mut entries = IndexMap::<PostId, Entry>::new();
    for next in feed.into_iter().rev() {
        if let Some(curr) = entries.get_mut(&next.post.id) {
            if match (curr.reposted_at, next.reposted_at) {
                (Some(curr), Some(next)) => curr < next,
                (None, Some(_)) => true,
                _ => false,
            } {
                entries.shift_remove(&next.post.id);
            } else {
                // Keep how the post entered the timeline, refresh its content.
                let reposted_by = curr.post.reposted_by.take();
                curr.post = Post {
                    reposted_by,
                    ..next.post
                };
                continue;
            }
        }
        entries.insert(next.post.id.clone(), next);
    }
    entries.into_values().rev().map(|entry| entry.post).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, text: &str, reposted_at: Option<i64>) -> Entry {
        Entry {
            post: Post {
                id: id.to_string(),
                author: "did:fake:post.test".to_string(),
                handle: "post.test".to_string(),
                display_name: None,
                text: text.to_string(),
                created_at: DateTime::<Utc>::UNIX_EPOCH,
                reply_count: 0,
                repost_count: 0,
                like_count: 0,
                reposted_by: reposted_at.map(|_| "reposter".to_string()),
                is_reply: false,
            },
            reposted_at: reposted_at
                .map(|secs| DateTime::from_timestamp(secs, 0).expect("invalid timestamp")),
        }
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|post| post.id.as_str()).collect()
    }

    #[test]
    fn empty_feed() {
        assert!(latest_entries(Vec::new()).is_empty());
    }

    #[test]
    fn distinct_posts_keep_order() {
        let posts = latest_entries(vec![
            entry("c", "", None),
            entry("b", "", None),
            entry("a", "", None),
        ]);
        assert_eq!(ids(&posts), ["c", "b", "a"]);
    }

    #[test]
    fn repost_moves_post_up() {
        // "a" was posted first, then reposted after "b".
        let posts = latest_entries(vec![
            entry("a", "", Some(100)),
            entry("b", "", None),
            entry("a", "", None),
        ]);
        assert_eq!(ids(&posts), ["a", "b"]);
        assert_eq!(posts[0].reposted_by.as_deref(), Some("reposter"));
        assert_eq!(posts[1].reposted_by, None);
    }

    #[test]
    fn duplicate_keeps_position_and_updates_post() {
        let posts = latest_entries(vec![
            entry("b", "", None),
            entry("a", "edited", None),
            entry("c", "", None),
            entry("a", "original", Some(100)),
        ]);
        assert_eq!(ids(&posts), ["b", "c", "a"]);
        assert_eq!(posts[2].text, "edited");
        // Still shown as the repost it arrived as.
        assert_eq!(posts[2].reposted_by.as_deref(), Some("reposter"));
    }

    #[test]
    fn latest_repost_wins() {
        let posts = latest_entries(vec![
            entry("a", "", Some(300)),
            entry("b", "", None),
            entry("a", "", Some(200)),
            entry("c", "", None),
        ]);
        assert_eq!(ids(&posts), ["a", "b", "c"]);
    }
}
