//! # Directory Expiry Flow
//!
//! Announcements over HTTP, TTL expiry on the system clock, and the node's
//! announce loop keeping a room alive in a remote directory.

#[cfg(test)]
mod tests {
    use node_runtime::adapters::DirectoryLink;
    use node_runtime::wiring::loops::announce_loop;
    use p44_01_directory::{AnnounceOutcome, DirectoryConfig};
    use shared_types::{NodeId, PeerError, SharedSecret, TimeSource};
    use std::time::Duration;
    use tokio::sync::watch;

    use crate::harness::{clock, secret, template, TestDirectory};

    const TTL_SECS: u64 = 2;

    async fn directory() -> TestDirectory {
        TestDirectory::start(DirectoryConfig::new(TTL_SECS, 120)).await
    }

    fn listed(rooms: &[shared_types::RoomAnnouncement], id: &str) -> bool {
        rooms.iter().any(|r| r.node_id == NodeId::new(id))
    }

    #[tokio::test]
    async fn test_room_expires_without_refresh() {
        let dir = directory().await;
        dir.announce(&template("v1", None)).await;
        assert!(listed(&dir.client.list_rooms().await.unwrap(), "v1"));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert!(!listed(&dir.client.list_rooms().await.unwrap(), "v1"));

        // A fresh announce brings it back.
        dir.announce(&template("v1", None)).await;
        assert!(listed(&dir.client.list_rooms().await.unwrap(), "v1"));
    }

    #[tokio::test]
    async fn test_rejected_announcements_are_not_listed() {
        let dir = directory().await;
        let now = clock().now();

        let forged = template("mallory", None)
            .build(now, &SharedSecret::from("not-the-mesh-secret"))
            .unwrap();
        assert_eq!(
            dir.client.announce(&forged).await.unwrap_err(),
            PeerError::Status { status: 401 }
        );

        let mut bad_url = template("v2", None);
        bad_url.service_url = "ftp://v2.mesh.test".into();
        let bad_url = bad_url.build(now, &secret()).unwrap();
        assert_eq!(
            dir.client.announce(&bad_url).await.unwrap_err(),
            PeerError::Status { status: 400 }
        );

        let skewed = template("v3", None)
            .build(now.add_secs(600), &secret())
            .unwrap();
        assert!(dir.client.announce(&skewed).await.is_err());

        let rooms = dir.client.list_rooms().await.unwrap();
        assert!(rooms.is_empty());
    }

    #[tokio::test]
    async fn test_older_announcement_does_not_replace_newer() {
        let dir = directory().await;
        let now = clock().now();

        let mut newer = template("v1", None);
        newer.room_code = Some("NEW".into());
        let newer = newer.build(now, &secret()).unwrap();
        let mut older = template("v1", None);
        older.room_code = Some("OLD".into());
        let older = older
            .build(shared_types::Timestamp::new(now.as_secs() - 30), &secret())
            .unwrap();

        assert_eq!(dir.client.announce(&newer).await.unwrap(), AnnounceOutcome::Accepted);
        assert_eq!(dir.client.announce(&older).await.unwrap(), AnnounceOutcome::Stale);

        let rooms = dir.client.list_rooms().await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_code.as_deref(), Some("NEW"));
    }

    #[tokio::test]
    async fn test_announce_loop_keeps_room_alive_until_stopped() {
        let dir = directory().await;
        let (stop, shutdown) = watch::channel(false);
        let task = tokio::spawn(announce_loop(
            DirectoryLink::Remote(dir.client.clone()),
            template("v7", None),
            secret(),
            clock(),
            Duration::from_millis(300),
            shutdown,
        ));

        // Past the TTL several times over, still live.
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(listed(&dir.client.list_rooms().await.unwrap(), "v7"));
        }

        stop.send(true).unwrap();
        task.await.unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert!(!listed(&dir.client.list_rooms().await.unwrap(), "v7"));
    }
}
