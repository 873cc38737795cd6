//! Attestation indexer service.
//!
//! Generic over its driven ports so the poll round can be exercised against
//! in-memory peers. The service owns nothing mutable except the vote book,
//! and only `poll_once` writes to it.

use async_trait::async_trait;
use futures::future::join_all;
use shared_bus::{EventPublisher, ValidatorEvent};
use shared_types::{
    epoch_for, AttestationBundle, AttestationStatus, AttestationVote, NodeId, PeerError,
    PeerResult, RoomAnnouncement, SharedSecret, Signable, TimeSource, Timestamp, TrustState,
    UnattestedReason, BUNDLE_SCHEMA,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use crate::domain::{
    aggregate, classify_bundle, count_votes, sort_validators, voter_quorum, DirectoryState,
    Freshness, PollSummary, ValidatorStatus, VoteBook, VoteListing, VoteRound,
};
use crate::error::{IndexerError, IndexerResult};
use crate::ports::{DirectorySource, IndexerApi, PeerIndexer};

/// Publishes this node's bundle, votes on peers and aggregates votes.
pub struct IndexerService<D, P>
where
    D: DirectorySource,
    P: PeerIndexer,
{
    config: IndexerConfig,
    secret: SharedSecret,
    time_source: Arc<dyn TimeSource>,
    directory: D,
    peers: P,
    book: Arc<VoteBook>,
    events: Arc<dyn EventPublisher>,
}

impl<D, P> IndexerService<D, P>
where
    D: DirectorySource,
    P: PeerIndexer,
{
    pub fn new(
        config: IndexerConfig,
        secret: SharedSecret,
        time_source: Arc<dyn TimeSource>,
        directory: D,
        peers: P,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            secret,
            time_source,
            directory,
            peers,
            book: Arc::new(VoteBook::new()),
            events,
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn vote_book(&self) -> Arc<VoteBook> {
        Arc::clone(&self.book)
    }

    fn freshness(&self) -> Freshness {
        Freshness {
            staleness_secs: self.config.bundle_staleness_secs,
            max_clock_skew_secs: self.config.max_clock_skew_secs,
        }
    }

    fn epoch_at(&self, now: Timestamp) -> u64 {
        epoch_for(now, self.config.epoch_seconds())
    }

    /// Trust state of this node's own bundle, without signing anything.
    fn own_state(&self) -> TrustState {
        if !self.config.publish_bundle {
            TrustState::Unattested(UnattestedReason::NoBundle)
        } else if !self.config.trust_flag {
            TrustState::Unattested(UnattestedReason::EnvironmentIntegrityDisabled)
        } else {
            TrustState::Attested
        }
    }

    fn sign_bundle(&self, now: Timestamp) -> IndexerResult<AttestationBundle> {
        if !self.config.publish_bundle {
            return Err(IndexerError::BundleDisabled);
        }
        let mut bundle = AttestationBundle {
            schema: BUNDLE_SCHEMA.to_string(),
            node_id: self.config.node_id.clone(),
            node_name: self.config.node_name.clone(),
            trust_flag: self.config.trust_flag,
            measurement: self.config.measurement.clone(),
            epoch: self.epoch_at(now),
            issued_at: now,
            signature: String::new(),
        };
        bundle.sign(&self.secret)?;
        Ok(bundle)
    }

    async fn with_deadline<T>(&self, call: impl Future<Output = PeerResult<T>>) -> PeerResult<T> {
        let timeout = self.config.peer_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PeerError::Timeout {
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Bundle state of one room. The flag is `false` when the peer could
    /// not be reached.
    async fn assess_room(&self, room: &RoomAnnouncement, now: Timestamp) -> (TrustState, bool) {
        if room.node_id == self.config.node_id {
            return (self.own_state(), true);
        }
        let Some(url) = room.read_api_url.as_deref() else {
            return (TrustState::Unattested(UnattestedReason::NoBundle), true);
        };
        match self.with_deadline(self.peers.fetch_bundle(url)).await {
            Ok(bundle) => (
                classify_bundle(&room.node_id, &bundle, &self.secret, self.freshness(), now),
                true,
            ),
            Err(err) => {
                warn!(subject = %room.node_id, url, error = %err, "Bundle fetch failed");
                (TrustState::Unattested(UnattestedReason::NoBundle), false)
            }
        }
    }

    /// Vote on every other live room and replace the vote book.
    ///
    /// A failing peer yields a negative vote; it never aborts the round.
    pub async fn poll_once(&self) -> IndexerResult<PollSummary> {
        let now = self.time_source.now();
        let epoch = self.epoch_at(now);
        let rooms = self
            .directory
            .live_rooms()
            .await
            .map_err(IndexerError::DirectoryUnavailable)?;

        let subjects: Vec<&RoomAnnouncement> = rooms
            .iter()
            .filter(|r| r.node_id != self.config.node_id)
            .collect();
        let verdicts = join_all(subjects.iter().map(|room| self.assess_room(room, now))).await;

        let mut summary = PollSummary {
            epoch,
            ..PollSummary::default()
        };
        let mut round = VoteRound {
            epoch,
            computed_at: now,
            votes: Default::default(),
        };
        for (room, (verdict, reachable)) in subjects.into_iter().zip(verdicts) {
            if verdict.is_attested() {
                summary.attested += 1;
            } else {
                summary.unattested += 1;
            }
            if !reachable {
                summary.unreachable += 1;
            }
            let mut vote = AttestationVote {
                voter_node_id: self.config.node_id.clone(),
                subject_node_id: room.node_id.clone(),
                epoch,
                verdict,
                issued_at: now,
                signature: String::new(),
            };
            vote.sign(&self.secret)?;
            round.votes.insert(room.node_id.clone(), vote);
        }

        self.book.replace(round);
        info!(
            epoch,
            attested = summary.attested,
            unattested = summary.unattested,
            unreachable = summary.unreachable,
            "Vote round complete"
        );
        self.events
            .publish(ValidatorEvent::VotesComputed {
                epoch,
                attested: summary.attested,
                unattested: summary.unattested,
                unreachable: summary.unreachable,
            })
            .await;
        Ok(summary)
    }

    /// Votes of one voter room for `epoch`, with forged or misattributed
    /// entries dropped.
    async fn voter_votes(
        &self,
        voter: &RoomAnnouncement,
        epoch: u64,
    ) -> Result<Vec<AttestationVote>, String> {
        if voter.node_id == self.config.node_id {
            return Ok(self.book.votes_for_epoch(epoch));
        }
        let Some(url) = voter.read_api_url.as_deref() else {
            return Ok(Vec::new());
        };
        let votes = self
            .with_deadline(self.peers.fetch_votes(url, epoch))
            .await
            .map_err(|err| format!("votes unavailable from {}: {err}", voter.node_id))?;

        Ok(votes
            .into_iter()
            .filter(|vote| {
                let valid = vote.voter_node_id == voter.node_id
                    && vote.epoch == epoch
                    && vote.verify(&self.secret).is_ok();
                if !valid {
                    debug!(voter = %voter.node_id, subject = %vote.subject_node_id, "Discarding invalid vote");
                }
                valid
            })
            .collect())
    }
}

#[async_trait]
impl<D, P> IndexerApi for IndexerService<D, P>
where
    D: DirectorySource,
    P: PeerIndexer,
{
    async fn current_bundle(&self) -> IndexerResult<AttestationBundle> {
        self.sign_bundle(self.time_source.now())
    }

    async fn votes(&self, epoch: Option<u64>) -> VoteListing {
        let epoch = epoch.unwrap_or_else(|| self.current_epoch());
        VoteListing {
            voter_node_id: self.config.node_id.clone(),
            epoch,
            votes: self.book.votes_for_epoch(epoch),
        }
    }

    async fn directory_state(&self) -> DirectoryState {
        let now = self.time_source.now();
        let epoch = self.epoch_at(now);
        let mut warnings = Vec::new();

        let rooms = match self.directory.live_rooms().await {
            Ok(rooms) => rooms,
            Err(err) => {
                warn!(error = %err, "Directory unavailable for state aggregation");
                warnings.push(format!("directory unavailable: {err}"));
                Vec::new()
            }
        };
        let quorum = voter_quorum(&rooms);

        let voters: Vec<&RoomAnnouncement> =
            rooms.iter().filter(|r| r.read_api_url.is_some()).collect();
        let (fetched, bundle_states) = futures::join!(
            join_all(voters.iter().map(|room| self.voter_votes(room, epoch))),
            join_all(rooms.iter().map(|room| self.assess_room(room, now))),
        );

        let mut votes = Vec::new();
        for result in fetched {
            match result {
                Ok(mut batch) => votes.append(&mut batch),
                Err(warning) => {
                    warn!(%warning, "Skipping voter");
                    warnings.push(warning);
                }
            }
        }

        let mut validators: Vec<ValidatorStatus> = rooms
            .iter()
            .zip(bundle_states)
            .map(|(room, (bundle_state, _))| {
                let (votes_pass, votes_fail) = count_votes(&room.node_id, &votes);
                ValidatorStatus {
                    node_id: room.node_id.clone(),
                    node_name: room.node_name.clone(),
                    service_url: room.service_url.clone(),
                    read_api_url: room.read_api_url.clone(),
                    last_seen: room.last_seen,
                    trust: aggregate(bundle_state, votes_pass, quorum),
                    votes_pass,
                    votes_fail,
                    quorum,
                }
            })
            .collect();
        sort_validators(&mut validators);

        DirectoryState {
            epoch,
            validators,
            warnings,
            generated_at: now,
        }
    }

    async fn attestation_status(&self, node_id: &NodeId) -> AttestationStatus {
        let now = self.time_source.now();
        let epoch = self.epoch_at(now);
        let no_bundle = TrustState::Unattested(UnattestedReason::NoBundle);

        let state = if node_id == &self.config.node_id {
            self.own_state()
        } else {
            let live = match self.directory.live_rooms().await {
                Ok(rooms) => rooms.iter().any(|r| &r.node_id == node_id),
                Err(err) => {
                    warn!(subject = %node_id, error = %err, "Directory unavailable; reporting no bundle");
                    false
                }
            };
            if !live {
                no_bundle
            } else {
                self.book
                    .latest_for(node_id)
                    .filter(|vote| now.saturating_sub(vote.issued_at) <= self.config.epoch_seconds())
                    .map(|vote| vote.verdict)
                    .unwrap_or(no_bundle)
            }
        };

        debug!(subject = %node_id, %state, epoch, "Attestation status");
        AttestationStatus::from_state(node_id.clone(), state, epoch)
    }

    fn current_epoch(&self) -> u64 {
        self.epoch_at(self.time_source.now())
    }
}
