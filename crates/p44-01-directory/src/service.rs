//! Room directory service.
//!
//! The announcement map is the only multi-writer structure in a node. Each
//! key is replaced atomically through the `DashMap` entry API, so readers see
//! either the previous record or the new one, never a mix.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_bus::{EventPublisher, ValidatorEvent};
use shared_types::{NodeId, RoomAnnouncement, SharedSecret, Signable, TimeSource, Timestamp};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DirectoryConfig;
use crate::domain::{check_clock_skew, validate_fields, AnnounceOutcome, DirectoryHealth};
use crate::error::DirectoryResult;
use crate::ports::DirectoryApi;

/// In-memory registry of announced rooms with lazy TTL eviction.
pub struct RoomDirectory {
    rooms: DashMap<NodeId, RoomAnnouncement>,
    config: DirectoryConfig,
    secret: SharedSecret,
    time_source: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
}

impl RoomDirectory {
    pub fn new(
        config: DirectoryConfig,
        secret: SharedSecret,
        time_source: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
            secret,
            time_source,
            events,
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn is_live(&self, room: &RoomAnnouncement, now: Timestamp) -> bool {
        now.saturating_sub(room.last_seen) < self.config.ttl_secs
    }

    /// Drop every expired room. Returns how many were removed.
    fn evict_expired(&self, now: Timestamp) -> usize {
        let mut evicted = 0usize;
        self.rooms.retain(|node_id, room| {
            let keep = now.saturating_sub(room.last_seen) < self.config.ttl_secs;
            if !keep {
                debug!(node_id = %node_id, last_seen = %room.last_seen, "Evicting expired room");
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Background sweep for memory bounds. Reads evict lazily regardless.
    pub async fn sweep_expired(&self) -> usize {
        let evicted = self.evict_expired(self.time_source.now());
        if evicted > 0 {
            self.events
                .publish(ValidatorEvent::RoomsEvicted {
                    count: evicted,
                    live: self.rooms.len(),
                })
                .await;
        }
        evicted
    }

    /// Number of stored records, expired or not.
    pub fn stored_len(&self) -> usize {
        self.rooms.len()
    }

    fn verify(&self, ann: &RoomAnnouncement, now: Timestamp) -> DirectoryResult<()> {
        validate_fields(ann)?;
        check_clock_skew(ann.announced_at, now, self.config.max_clock_skew_secs)?;
        ann.verify(&self.secret)?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryApi for RoomDirectory {
    async fn announce(&self, mut ann: RoomAnnouncement) -> DirectoryResult<AnnounceOutcome> {
        let now = self.time_source.now();

        if let Err(err) = self.verify(&ann, now) {
            warn!(node_id = %ann.node_id, kind = err.kind(), error = %err, "Announcement rejected");
            self.events
                .publish(ValidatorEvent::AnnouncementRejected {
                    node_id: ann.node_id.clone(),
                    reason: err.kind().to_string(),
                })
                .await;
            return Err(err);
        }

        ann.last_seen = now;
        let node_id = ann.node_id.clone();
        let capacity = ann.capacity;

        // The entry guard must be released before any await point.
        let outcome = match self.rooms.entry(node_id.clone()) {
            Entry::Occupied(mut slot) => {
                if slot.get().announced_at > ann.announced_at {
                    AnnounceOutcome::Stale
                } else {
                    slot.insert(ann);
                    AnnounceOutcome::Accepted
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(ann);
                AnnounceOutcome::Accepted
            }
        };

        match outcome {
            AnnounceOutcome::Accepted => {
                debug!(node_id = %node_id, capacity, "Room announced");
                self.events
                    .publish(ValidatorEvent::RoomAnnounced { node_id, capacity })
                    .await;
            }
            AnnounceOutcome::Stale => {
                info!(node_id = %node_id, "Ignoring announcement older than stored record");
            }
        }
        Ok(outcome)
    }

    async fn list_rooms(&self) -> Vec<RoomAnnouncement> {
        let now = self.time_source.now();
        let evicted = self.evict_expired(now);

        let mut rooms: Vec<RoomAnnouncement> = self
            .rooms
            .iter()
            .filter(|entry| self.is_live(entry.value(), now))
            .map(|entry| entry.value().clone())
            .collect();
        rooms.sort_by_key(|r| (Reverse(r.capacity), Reverse(r.last_seen)));

        if evicted > 0 {
            self.events
                .publish(ValidatorEvent::RoomsEvicted {
                    count: evicted,
                    live: rooms.len(),
                })
                .await;
        }
        rooms
    }

    async fn get_room(&self, node_id: &NodeId) -> Option<RoomAnnouncement> {
        let now = self.time_source.now();
        self.rooms
            .get(node_id)
            .filter(|entry| self.is_live(entry.value(), now))
            .map(|entry| entry.value().clone())
    }

    async fn health_check(&self) -> DirectoryHealth {
        let now = self.time_source.now();
        let rooms = self
            .rooms
            .iter()
            .filter(|entry| self.is_live(entry.value(), now))
            .count();
        DirectoryHealth {
            status: "ok".to_string(),
            rooms,
        }
    }
}

#[cfg(test)]
mod tests;
