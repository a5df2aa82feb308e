// SPDX-License-Identifier: GPL-3.0-only

//! Gallery feed and identity collaborators
//!
//! The capture session only talks to these through traits. In-memory
//! implementations are provided for hosts without their own store.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// One photo in the community feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: Uuid,
    pub author_name: String,
    pub image_url: String,
    pub caption: String,
    pub appreciation_count: u64,
}

impl GalleryItem {
    /// New item with no appreciation yet
    pub fn new(
        author_name: impl Into<String>,
        image_url: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_name: author_name.into(),
            image_url: image_url.into(),
            caption: caption.into(),
            appreciation_count: 0,
        }
    }
}

/// Read-only access to the signed-in user
pub trait IdentityProvider: Send + Sync {
    /// Display name of the current user, `None` when signed out
    fn current_user_name(&self) -> Option<String>;
}

/// Identity fixed at construction
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    name: Option<String>,
}

impl StaticIdentity {
    pub fn signed_in(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { name: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_name(&self) -> Option<String> {
        self.name.clone().filter(|name| !name.trim().is_empty())
    }
}

/// The photo feed
pub trait GalleryFeed: Send + Sync {
    /// Insert an item at the front (newest first)
    fn append(&self, item: GalleryItem);

    /// Atomically add one appreciation; returns the new count, or `None`
    /// for an unknown item
    fn increment_appreciation(&self, id: Uuid) -> Option<u64>;

    /// Snapshot of the feed, newest first
    fn items(&self) -> Vec<GalleryItem>;
}

struct FeedEntry {
    id: Uuid,
    author_name: String,
    image_url: String,
    caption: String,
    appreciation: AtomicU64,
}

impl FeedEntry {
    fn snapshot(&self) -> GalleryItem {
        GalleryItem {
            id: self.id,
            author_name: self.author_name.clone(),
            image_url: self.image_url.clone(),
            caption: self.caption.clone(),
            appreciation_count: self.appreciation.load(Ordering::Acquire),
        }
    }
}

/// Feed kept in process memory
///
/// The list lock is only taken for writing on append. Increments take a
/// read lock and bump the entry's atomic counter, so concurrent
/// appreciation never loses an update.
#[derive(Default, Clone)]
pub struct InMemoryFeed {
    entries: Arc<RwLock<VecDeque<Arc<FeedEntry>>>>,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed pre-populated with `items` (first item shown first)
    pub fn with_items(items: impl IntoIterator<Item = GalleryItem>) -> Self {
        let feed = Self::new();
        let items: Vec<_> = items.into_iter().collect();
        for item in items.into_iter().rev() {
            feed.append(item);
        }
        feed
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GalleryFeed for InMemoryFeed {
    fn append(&self, item: GalleryItem) {
        let entry = Arc::new(FeedEntry {
            id: item.id,
            author_name: item.author_name,
            image_url: item.image_url,
            caption: item.caption,
            appreciation: AtomicU64::new(item.appreciation_count),
        });

        match self.entries.write() {
            Ok(mut entries) => {
                debug!(id = %entry.id, author = %entry.author_name, "Gallery item added");
                entries.push_front(entry);
            }
            Err(_) => warn!("Gallery feed lock poisoned, item dropped"),
        }
    }

    fn increment_appreciation(&self, id: Uuid) -> Option<u64> {
        let entries = self.entries.read().ok()?;
        let entry = entries.iter().find(|entry| entry.id == id)?;
        Some(entry.appreciation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    fn items(&self) -> Vec<GalleryItem> {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|entry| entry.snapshot()).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for InMemoryFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryFeed")
            .field("items", &self.len())
            .finish()
    }
}
