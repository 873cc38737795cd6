//! Single-writer actor around [`EvalBuffer`].
//!
//! ```text
//! HTTP handlers ─┐
//! eval loop ─────┼──mpsc<Command>──→ [actor task: EvalBuffer] ──oneshot──→ caller
//! producers ─────┘
//! ```
//!
//! The actor exits when every handle is dropped or a shutdown is requested.

use async_trait::async_trait;
use shared_bus::{EventPublisher, ValidatorEvent};
use shared_types::{EvalSample, TimeSource};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::EvalBufferConfig;
use crate::domain::{BufferStats, EvalBuffer, Reservation};
use crate::error::{EvalBufferError, EvalBufferResult};
use crate::ports::SampleSource;

enum Command {
    Ingest {
        samples: Vec<EvalSample>,
        reply: oneshot::Sender<EvalBufferResult<usize>>,
    },
    Reserve {
        limit: usize,
        require_mixed: bool,
        reply: oneshot::Sender<EvalBufferResult<Reservation>>,
    },
    MarkEvaluated {
        sample_ids: Vec<String>,
        reply: oneshot::Sender<usize>,
    },
    Stats {
        reply: oneshot::Sender<BufferStats>,
    },
}

/// Cloneable handle to the buffer actor.
#[derive(Clone)]
pub struct EvalBufferHandle {
    tx: mpsc::Sender<Command>,
}

impl EvalBufferHandle {
    /// Spawn the actor on the current runtime.
    pub fn spawn(
        config: EvalBufferConfig,
        time_source: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let actor = BufferActor {
            buffer: EvalBuffer::new(),
            config,
            time_source,
            events,
        };
        let task = tokio::spawn(actor.run(rx, shutdown));
        (Self { tx }, task)
    }

    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> EvalBufferResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| EvalBufferError::Closed)?;
        rx.await.map_err(|_| EvalBufferError::Closed)
    }

    pub async fn ingest(&self, samples: Vec<EvalSample>) -> EvalBufferResult<usize> {
        self.call(|reply| Command::Ingest { samples, reply }).await?
    }

    pub async fn stats(&self) -> EvalBufferResult<BufferStats> {
        self.call(|reply| Command::Stats { reply }).await
    }
}

#[async_trait]
impl SampleSource for EvalBufferHandle {
    async fn reserve_batch(&self, limit: usize, require_mixed: bool) -> EvalBufferResult<Reservation> {
        self.call(|reply| Command::Reserve {
            limit,
            require_mixed,
            reply,
        })
        .await?
    }

    async fn mark_evaluated(&self, sample_ids: Vec<String>) -> EvalBufferResult<usize> {
        self.call(|reply| Command::MarkEvaluated { sample_ids, reply })
            .await
    }
}

struct BufferActor {
    buffer: EvalBuffer,
    config: EvalBufferConfig,
    time_source: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
}

impl BufferActor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>, mut shutdown: watch::Receiver<bool>) {
        info!("Evaluation buffer started");
        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(stats = ?self.buffer.stats(), "Evaluation buffer stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Ingest { samples, reply } => {
                let result = self.buffer.ingest(samples);
                if let Ok(count) = &result {
                    debug!(count, "Samples ingested");
                }
                let _ = reply.send(result);
            }
            Command::Reserve {
                limit,
                require_mixed,
                reply,
            } => {
                let limit = limit.min(self.config.max_reserve);
                let result = self
                    .buffer
                    .reserve(limit, require_mixed, self.time_source.now());
                match &result {
                    Ok(reservation) if !reservation.is_empty() => {
                        debug!(count = reservation.len(), mixed = reservation.mixed, "Samples reserved");
                        self.events
                            .publish(ValidatorEvent::SamplesReserved {
                                count: reservation.len(),
                                mixed: reservation.mixed,
                            })
                            .await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        error!(error = %err, "Reservation failed");
                        self.events
                            .publish(ValidatorEvent::CriticalError {
                                component: "eval-buffer".to_string(),
                                error: err.to_string(),
                            })
                            .await;
                    }
                }
                let _ = reply.send(result);
            }
            Command::MarkEvaluated { sample_ids, reply } => {
                let marked = self.buffer.mark_evaluated(&sample_ids);
                if marked > 0 {
                    self.events
                        .publish(ValidatorEvent::SamplesEvaluated { count: marked })
                        .await;
                }
                let _ = reply.send(marked);
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.buffer.stats());
            }
        }
    }
}
