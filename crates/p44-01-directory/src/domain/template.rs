use serde::{Deserialize, Serialize};
use shared_types::{NodeId, RoomAnnouncement, SharedSecret, Signable, SigningError, Timestamp};

/// The static part of a node's announcement. The announce loop stamps and
/// signs a fresh copy on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementTemplate {
    pub node_id: NodeId,
    pub node_name: String,
    pub service_url: String,
    pub read_api_url: Option<String>,
    pub room_code: Option<String>,
    pub capacity: u32,
    pub version_hash: String,
}

impl AnnouncementTemplate {
    /// Produce a signed announcement stamped with `now`.
    pub fn build(
        &self,
        now: Timestamp,
        secret: &SharedSecret,
    ) -> Result<RoomAnnouncement, SigningError> {
        let mut ann = RoomAnnouncement {
            node_id: self.node_id.clone(),
            node_name: self.node_name.clone(),
            service_url: trim_slash(&self.service_url),
            read_api_url: self.read_api_url.as_deref().map(trim_slash),
            room_code: self.room_code.clone().filter(|c| !c.trim().is_empty()),
            capacity: self.capacity.max(1),
            version_hash: self.version_hash.clone(),
            announced_at: now,
            signature: String::new(),
            last_seen: Timestamp::default(),
        };
        ann.sign(secret)?;
        Ok(ann)
    }
}

fn trim_slash(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
