//! Periodic tasks. Each one owns its interval and stops on the shutdown
//! signal; a failed tick is logged and the next tick proceeds.

use p44_01_directory::{AnnouncementTemplate, RoomDirectory};
use shared_types::{SharedSecret, TimeSource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::adapters::DirectoryLink;
use crate::container::{LocalEvaluation, LocalIndexer};

/// Call `tick` every `period`, first tick immediately, until shutdown.
pub async fn every<F, Fut>(
    task: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(task, period_ms = period.as_millis() as u64, "Periodic task started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => tick().await,
        }
    }
    info!(task, "Periodic task stopped");
}

/// Sign and send this node's announcement.
pub async fn announce_once(
    link: &DirectoryLink,
    template: &AnnouncementTemplate,
    secret: &SharedSecret,
    clock: &dyn TimeSource,
) {
    let announcement = match template.build(clock.now(), secret) {
        Ok(announcement) => announcement,
        Err(err) => {
            error!(error = %err, "Cannot sign announcement");
            return;
        }
    };
    match link.announce(&announcement).await {
        Ok(outcome) => debug!(node_id = %announcement.node_id, ?outcome, "Announced"),
        Err(err) => warn!(node_id = %announcement.node_id, error = %err, "Announce failed"),
    }
}

pub async fn announce_loop(
    link: DirectoryLink,
    template: AnnouncementTemplate,
    secret: SharedSecret,
    clock: Arc<dyn TimeSource>,
    period: Duration,
    shutdown: watch::Receiver<bool>,
) {
    every("announce", period, shutdown, || {
        announce_once(&link, &template, &secret, clock.as_ref())
    })
    .await;
}

pub async fn indexer_poll_loop(
    indexer: Arc<LocalIndexer>,
    period: Duration,
    shutdown: watch::Receiver<bool>,
) {
    every("indexer-poll", period, shutdown, || {
        let indexer = Arc::clone(&indexer);
        async move {
            match indexer.poll_once().await {
                Ok(summary) => debug!(
                    epoch = summary.epoch,
                    attested = summary.attested,
                    unattested = summary.unattested,
                    unreachable = summary.unreachable,
                    "Poll round complete"
                ),
                Err(err) => warn!(error = %err, "Poll round failed"),
            }
        }
    })
    .await;
}

pub async fn sweep_loop(
    directory: Arc<RoomDirectory>,
    period: Duration,
    shutdown: watch::Receiver<bool>,
) {
    every("directory-sweep", period, shutdown, || {
        let directory = Arc::clone(&directory);
        async move {
            let evicted = directory.sweep_expired().await;
            p44_telemetry::metrics::LIVE_ROOMS.set(directory.stored_len() as f64);
            if evicted > 0 {
                debug!(evicted, "Swept expired rooms");
            }
        }
    })
    .await;
}

/// Run the evaluation loop. A fatal error requests node shutdown.
pub async fn evaluation_task(
    evaluation: LocalEvaluation,
    shutdown: watch::Receiver<bool>,
    stop_node: watch::Sender<bool>,
) {
    if let Err(err) = evaluation.run(shutdown).await {
        error!(error = %err, "Evaluation stopped on a fatal error, shutting down node");
        // Receivers may already be gone during teardown.
        let _ = stop_node.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p44_01_directory::{DirectoryApi, DirectoryConfig};
    use shared_bus::InMemoryEventBus;
    use shared_types::{ControllableTimeSource, NodeId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_every_ticks_until_shutdown() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);
        let counter = Arc::clone(&ticks);
        let task = tokio::spawn(every("test", Duration::from_secs(10), rx, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        tokio::time::sleep(Duration::from_secs(25)).await;
        tx.send(true).unwrap();
        task.await.unwrap();
        // t = 0, 10, 20
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_announce_once_reaches_local_directory() {
        let secret = SharedSecret::from("loop-test-secret");
        let clock = Arc::new(ControllableTimeSource::new(5_000));
        let directory = Arc::new(RoomDirectory::new(
            DirectoryConfig::default(),
            secret.clone(),
            clock.clone(),
            Arc::new(InMemoryEventBus::new()),
        ));
        let link = DirectoryLink::Local(Arc::clone(&directory));
        let template = AnnouncementTemplate {
            node_id: NodeId::new("v1"),
            node_name: "one".into(),
            service_url: "http://v1.local:3003".into(),
            read_api_url: None,
            room_code: Some("R1".into()),
            capacity: 1,
            version_hash: "test".into(),
        };

        announce_once(&link, &template, &secret, clock.as_ref()).await;
        let room = directory.get_room(&NodeId::new("v1")).await.unwrap();
        assert_eq!(room.room_code.as_deref(), Some("R1"));

        // Expired after the TTL, fresh again after the next announce.
        clock.advance(61);
        assert!(directory.get_room(&NodeId::new("v1")).await.is_none());
        announce_once(&link, &template, &secret, clock.as_ref()).await;
        assert!(directory.get_room(&NodeId::new("v1")).await.is_some());
    }
}
