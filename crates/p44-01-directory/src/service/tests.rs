use super::*;
use crate::domain::AnnouncementTemplate;
use crate::error::DirectoryError;
use shared_bus::{EventFilter, InMemoryEventBus};
use shared_types::ControllableTimeSource;

const SECRET: &str = "directory-test-secret";

fn setup(ttl: u64) -> (RoomDirectory, ControllableTimeSource, Arc<InMemoryEventBus>) {
    let clock = ControllableTimeSource::new(0);
    let bus = Arc::new(InMemoryEventBus::new());
    let dir = RoomDirectory::new(
        DirectoryConfig::new(ttl, 120),
        SharedSecret::from(SECRET),
        Arc::new(clock.clone()),
        bus.clone(),
    );
    (dir, clock, bus)
}

fn template(id: &str, capacity: u32) -> AnnouncementTemplate {
    AnnouncementTemplate {
        node_id: NodeId::new(id),
        node_name: format!("{id}-name"),
        service_url: format!("http://{id}.local:3001"),
        read_api_url: Some(format!("http://{id}.local:8787")),
        room_code: None,
        capacity,
        version_hash: "v1".into(),
    }
}

fn signed(id: &str, capacity: u32, at: u64) -> RoomAnnouncement {
    template(id, capacity)
        .build(Timestamp::new(at), &SharedSecret::from(SECRET))
        .unwrap()
}

#[tokio::test]
async fn test_announce_then_list() {
    let (dir, _clock, _bus) = setup(60);
    let outcome = dir.announce(signed("a", 2, 0)).await.unwrap();
    assert_eq!(outcome, AnnounceOutcome::Accepted);

    let rooms = dir.list_rooms().await;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].node_id, NodeId::new("a"));
    assert_eq!(rooms[0].last_seen, Timestamp::new(0));
}

#[tokio::test]
async fn test_ttl_expiry_at_61_seconds() {
    let (dir, clock, _bus) = setup(60);
    dir.announce(signed("a", 1, 0)).await.unwrap();

    clock.set(59);
    assert_eq!(dir.list_rooms().await.len(), 1);

    clock.set(61);
    assert!(dir.list_rooms().await.is_empty());
    // Lazy eviction removed the record, not just hid it.
    assert_eq!(dir.stored_len(), 0);
}

#[tokio::test]
async fn test_ttl_boundary_is_exclusive() {
    let (dir, clock, _bus) = setup(60);
    dir.announce(signed("a", 1, 0)).await.unwrap();
    clock.set(60);
    assert!(dir.list_rooms().await.is_empty());
    assert!(dir.get_room(&NodeId::new("a")).await.is_none());
}

#[tokio::test]
async fn test_reannounce_refreshes_last_seen() {
    let (dir, clock, _bus) = setup(60);
    dir.announce(signed("a", 1, 0)).await.unwrap();
    clock.set(50);
    dir.announce(signed("a", 1, 50)).await.unwrap();
    clock.set(100);

    let rooms = dir.list_rooms().await;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].last_seen, Timestamp::new(50));
}

#[tokio::test]
async fn test_bad_signature_rejected_without_side_effects() {
    let (dir, _clock, bus) = setup(60);
    let mut sub = bus.subscribe(EventFilter::all());

    let mut ann = signed("a", 1, 0);
    ann.capacity = 99;
    let err = dir.announce(ann).await.unwrap_err();
    assert!(err.is_auth_failure());
    assert_eq!(dir.stored_len(), 0);

    let event = sub.try_recv().unwrap().unwrap();
    assert!(matches!(event, ValidatorEvent::AnnouncementRejected { .. }));
}

#[tokio::test]
async fn test_unsigned_announcement_rejected() {
    let (dir, _clock, _bus) = setup(60);
    let mut ann = signed("a", 1, 0);
    ann.signature.clear();
    assert_eq!(
        dir.announce(ann).await,
        Err(DirectoryError::MissingField("signature"))
    );
}

#[tokio::test]
async fn test_clock_skew_rejected() {
    let (dir, clock, _bus) = setup(60);
    clock.set(1_000);
    let err = dir.announce(signed("a", 1, 500)).await.unwrap_err();
    assert_eq!(err.kind(), "clock_skew");
}

#[tokio::test]
async fn test_older_announcement_is_stale() {
    let (dir, clock, _bus) = setup(60);
    clock.set(100);
    dir.announce(signed("a", 5, 100)).await.unwrap();
    let outcome = dir.announce(signed("a", 1, 90)).await.unwrap();
    assert_eq!(outcome, AnnounceOutcome::Stale);
    assert_eq!(dir.list_rooms().await[0].capacity, 5);
}

#[tokio::test]
async fn test_listing_order_capacity_then_recency() {
    let (dir, clock, _bus) = setup(60);
    dir.announce(signed("small", 1, 0)).await.unwrap();
    dir.announce(signed("big-old", 8, 0)).await.unwrap();
    clock.set(5);
    dir.announce(signed("big-new", 8, 5)).await.unwrap();

    let order: Vec<String> = dir
        .list_rooms()
        .await
        .into_iter()
        .map(|r| r.node_id.to_string())
        .collect();
    assert_eq!(order, vec!["big-new", "big-old", "small"]);
}

#[tokio::test]
async fn test_sweep_reports_evictions() {
    let (dir, clock, bus) = setup(10);
    dir.announce(signed("a", 1, 0)).await.unwrap();
    dir.announce(signed("b", 1, 0)).await.unwrap();
    let mut sub = bus.subscribe(EventFilter::all());

    clock.set(11);
    assert_eq!(dir.sweep_expired().await, 2);
    let event = sub.try_recv().unwrap().unwrap();
    assert!(matches!(event, ValidatorEvent::RoomsEvicted { count: 2, live: 0 }));
    assert_eq!(dir.health_check().await.rooms, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_announces_keep_one_record_per_node() {
    let (dir, _clock, _bus) = setup(60);
    let dir = Arc::new(dir);

    let mut handles = Vec::new();
    for i in 0..32u32 {
        let dir = Arc::clone(&dir);
        handles.push(tokio::spawn(async move {
            let id = if i % 2 == 0 { "even" } else { "odd" };
            dir.announce(signed(id, i + 1, 0)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let rooms = dir.list_rooms().await;
    assert_eq!(rooms.len(), 2);
    for room in rooms {
        assert!(room.verify(&SharedSecret::from(SECRET)).is_ok());
    }
}
