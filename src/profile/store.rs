//! Session-keyed profile storage.
//!
//! [`ProfileStore::acquire`] hands out an exclusive [`ProfileLease`] per
//! session: overlapping requests for the same session queue on the lease,
//! while different sessions proceed in parallel. The in-memory backend bounds
//! its size with an idle TTL and a capacity limit; profiles currently leased
//! are never evicted.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::model::{OnboardingFlow, ProfileRecord};
use crate::config::StoreConfig;

// ---------------------------------------------------------------------------
// Lease
// ---------------------------------------------------------------------------

/// Exclusive access to one session's profile.
///
/// Dereferences to the [`ProfileRecord`]. Dropping the lease releases the
/// session for the next request.
pub struct ProfileLease {
    session_id: String,
    created: bool,
    guard: OwnedMutexGuard<ProfileRecord>,
}

impl ProfileLease {
    /// Session this lease belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the profile was created by this acquisition (first contact).
    pub fn is_new(&self) -> bool {
        self.created
    }
}

impl Deref for ProfileLease {
    type Target = ProfileRecord;

    fn deref(&self) -> &ProfileRecord {
        &self.guard
    }
}

impl DerefMut for ProfileLease {
    fn deref_mut(&mut self) -> &mut ProfileRecord {
        &mut self.guard
    }
}

impl std::fmt::Debug for ProfileLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileLease")
            .field("session_id", &self.session_id)
            .field("created", &self.created)
            .field("profile", &*self.guard)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Storage for founder profiles keyed by session id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get-or-create the profile for `session_id` and lock it for the caller.
    async fn acquire(&self, session_id: &str) -> ProfileLease;

    /// Copy of the current profile, if one exists. Waits for any active lease.
    async fn snapshot(&self, session_id: &str) -> Option<ProfileRecord>;

    /// Number of stored profiles.
    async fn len(&self) -> usize;

    /// Whether the store holds no profiles.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Called after the holder of `lease` has mutated the profile.
    ///
    /// Durable backends persist here; the in-memory store needs nothing.
    async fn commit(&self, _lease: &ProfileLease) {}
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

struct Slot {
    profile: Arc<Mutex<ProfileRecord>>,
    last_seen: Instant,
}

impl Slot {
    /// A slot is leased while anyone besides the map holds its `Arc`.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.profile) > 1
    }
}

/// Volatile [`ProfileStore`] with optional idle expiry and capacity bound.
pub struct InMemoryProfileStore {
    flow: OnboardingFlow,
    capacity: Option<usize>,
    idle_ttl: Option<Duration>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl InMemoryProfileStore {
    /// Unbounded store creating profiles with `flow`.
    pub fn new(flow: OnboardingFlow) -> Self {
        Self {
            flow,
            capacity: None,
            idle_ttl: None,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Store bounded by the `[store]` config section.
    pub fn from_config(config: &StoreConfig, flow: OnboardingFlow) -> Self {
        let mut store = Self::new(flow);
        store.capacity = config.capacity;
        store.idle_ttl = config.idle_ttl_secs.map(Duration::from_secs);
        store
    }

    /// Limit the number of stored profiles.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Expire profiles not acquired for `ttl`.
    #[must_use]
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = Some(ttl);
        self
    }

    fn evict_idle(&self, slots: &mut HashMap<String, Slot>, now: Instant) {
        let Some(ttl) = self.idle_ttl else {
            return;
        };
        let before = slots.len();
        slots.retain(|_, slot| slot.in_use() || now.duration_since(slot.last_seen) < ttl);
        let evicted = before.saturating_sub(slots.len());
        if evicted > 0 {
            info!(evicted, remaining = slots.len(), "expired idle profiles");
        }
    }

    fn make_room(&self, slots: &mut HashMap<String, Slot>) {
        let Some(capacity) = self.capacity else {
            return;
        };
        if slots.len() < capacity {
            return;
        }
        let oldest = slots
            .iter()
            .filter(|(_, slot)| !slot.in_use())
            .min_by_key(|(_, slot)| slot.last_seen)
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                slots.remove(&id);
                debug!(session_id = %id, "evicted least recently used profile");
            }
            None => warn!(capacity, "profile store full of active sessions, growing"),
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn acquire(&self, session_id: &str) -> ProfileLease {
        let (profile, created) = {
            let mut slots = self.slots.lock().await;
            let now = Instant::now();
            self.evict_idle(&mut slots, now);

            if let Some(slot) = slots.get_mut(session_id) {
                slot.last_seen = now;
                (Arc::clone(&slot.profile), false)
            } else {
                self.make_room(&mut slots);
                let profile = Arc::new(Mutex::new(ProfileRecord::new(self.flow)));
                slots.insert(
                    session_id.to_owned(),
                    Slot {
                        profile: Arc::clone(&profile),
                        last_seen: now,
                    },
                );
                info!(session_id, "new session profile");
                (profile, true)
            }
        };

        // Map lock is released before waiting on the session.
        let guard = profile.lock_owned().await;
        ProfileLease {
            session_id: session_id.to_owned(),
            created,
            guard,
        }
    }

    async fn snapshot(&self, session_id: &str) -> Option<ProfileRecord> {
        let profile = {
            let slots = self.slots.lock().await;
            Arc::clone(&slots.get(session_id)?.profile)
        };
        let record = profile.lock().await.clone();
        Some(record)
    }

    async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}
