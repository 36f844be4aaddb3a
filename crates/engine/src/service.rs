//! The chore service actor: serialized commands over the store (PRD-05).
//!
//! One task owns the [`ChoreStore`]; everything else talks to it through
//! [`ChoreHandle`], a clonable mpsc sender whose commands carry `oneshot`
//! reply channels. The sweep and reset loops submit tick commands on the
//! same queue, so no mutation ever races another.
//!
//! After every committed mutation the service publishes the resulting
//! events (fire-and-forget) and hands a fresh snapshot to the save
//! scheduler, a latest-wins task that never blocks the command loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chorewheel_core::chore::Chore;
use chorewheel_core::error::CoreError;
use chorewheel_core::person::Person;
use chorewheel_core::types::{ChoreId, PersonId};
use chorewheel_events::EventBus;

use crate::config::EngineConfig;
use crate::persistence::{ChoreSnapshot, PersistenceGateway};
use crate::store::ChoreStore;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

type Reply<T> = oneshot::Sender<Result<T, CoreError>>;

/// A serialized mutation or query against the store.
#[derive(Debug)]
pub enum Command {
    Claim {
        chore_id: ChoreId,
        person_id: PersonId,
        reply: Reply<()>,
    },
    Approve {
        chore_id: ChoreId,
        person_id: PersonId,
        actor_id: PersonId,
        reply: Reply<()>,
    },
    Disapprove {
        chore_id: ChoreId,
        person_id: PersonId,
        actor_id: PersonId,
        reply: Reply<()>,
    },
    SetDueDate {
        chore_id: ChoreId,
        due_at: DateTime<Utc>,
        reply: Reply<()>,
    },
    SkipToNextDue {
        chore_id: ChoreId,
        reply: Reply<()>,
    },
    UpsertPerson {
        person: Person,
        reply: Reply<()>,
    },
    RemovePerson {
        person_id: PersonId,
        reply: Reply<()>,
    },
    UpsertChore {
        chore: Box<Chore>,
        reply: Reply<()>,
    },
    RemoveChore {
        chore_id: ChoreId,
        reply: Reply<()>,
    },
    /// Submitted by the sweep timer.
    SweepTick,
    /// Submitted by the reset orchestrator timer.
    ResetTick,
    /// Read-back of the full state (tests, diagnostics).
    Snapshot {
        reply: oneshot::Sender<ChoreSnapshot>,
    },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Clonable handle to the chore service.
#[derive(Clone)]
pub struct ChoreHandle {
    tx: mpsc::Sender<Command>,
}

impl ChoreHandle {
    pub async fn claim(&self, chore_id: ChoreId, person_id: PersonId) -> Result<(), CoreError> {
        self.request(|reply| Command::Claim {
            chore_id,
            person_id,
            reply,
        })
        .await
    }

    pub async fn approve(
        &self,
        chore_id: ChoreId,
        person_id: PersonId,
        actor_id: PersonId,
    ) -> Result<(), CoreError> {
        self.request(|reply| Command::Approve {
            chore_id,
            person_id,
            actor_id,
            reply,
        })
        .await
    }

    pub async fn disapprove(
        &self,
        chore_id: ChoreId,
        person_id: PersonId,
        actor_id: PersonId,
    ) -> Result<(), CoreError> {
        self.request(|reply| Command::Disapprove {
            chore_id,
            person_id,
            actor_id,
            reply,
        })
        .await
    }

    pub async fn set_due_date(
        &self,
        chore_id: ChoreId,
        due_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        self.request(|reply| Command::SetDueDate {
            chore_id,
            due_at,
            reply,
        })
        .await
    }

    pub async fn skip_to_next_due_date(&self, chore_id: ChoreId) -> Result<(), CoreError> {
        self.request(|reply| Command::SkipToNextDue { chore_id, reply })
            .await
    }

    pub async fn upsert_person(&self, person: Person) -> Result<(), CoreError> {
        self.request(|reply| Command::UpsertPerson { person, reply })
            .await
    }

    pub async fn remove_person(&self, person_id: PersonId) -> Result<(), CoreError> {
        self.request(|reply| Command::RemovePerson { person_id, reply })
            .await
    }

    pub async fn upsert_chore(&self, chore: Chore) -> Result<(), CoreError> {
        self.request(|reply| Command::UpsertChore {
            chore: Box::new(chore),
            reply,
        })
        .await
    }

    pub async fn remove_chore(&self, chore_id: ChoreId) -> Result<(), CoreError> {
        self.request(|reply| Command::RemoveChore { chore_id, reply })
            .await
    }

    /// Full state read-back.
    pub async fn snapshot(&self) -> Result<ChoreSnapshot, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| engine_stopped())?;
        rx.await.map_err(|_| engine_stopped())
    }

    /// Submit a sweep tick. Used by the sweep timer loop.
    pub async fn sweep_tick(&self) -> Result<(), CoreError> {
        self.tx
            .send(Command::SweepTick)
            .await
            .map_err(|_| engine_stopped())
    }

    /// Submit a reset tick. Used by the reset orchestrator loop.
    pub async fn reset_tick(&self) -> Result<(), CoreError> {
        self.tx
            .send(Command::ResetTick)
            .await
            .map_err(|_| engine_stopped())
    }

    async fn request<F>(&self, build: F) -> Result<(), CoreError>
    where
        F: FnOnce(Reply<()>) -> Command,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| engine_stopped())?;
        rx.await.map_err(|_| engine_stopped())?
    }
}

fn engine_stopped() -> CoreError {
    CoreError::Persistence("chore service is not running".to_string())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// The store-owning actor plus its save scheduler.
pub struct ChoreService;

impl ChoreService {
    /// Spawn the service and its save scheduler.
    ///
    /// Both tasks exit when `cancel` fires; the service performs a final
    /// flush save on the way out (timers are expected to be cancelled by
    /// the same token, so no tick can arrive after the flush).
    pub fn spawn(
        store: ChoreStore,
        bus: Arc<EventBus>,
        gateway: Arc<dyn PersistenceGateway>,
        config: &EngineConfig,
        cancel: CancellationToken,
    ) -> (ChoreHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let (save_tx, save_rx) = watch::channel::<Option<ChoreSnapshot>>(None);

        let saver = tokio::spawn(run_saver(
            Arc::clone(&gateway),
            save_rx,
            config.save_timeout(),
            config.save_retry(),
            cancel.clone(),
        ));

        let join = tokio::spawn(run_service(
            store, rx, bus, gateway, save_tx, saver, cancel,
        ));

        (ChoreHandle { tx }, join)
    }
}

async fn run_service(
    mut store: ChoreStore,
    mut rx: mpsc::Receiver<Command>,
    bus: Arc<EventBus>,
    gateway: Arc<dyn PersistenceGateway>,
    save_tx: watch::Sender<Option<ChoreSnapshot>>,
    saver: JoinHandle<()>,
    cancel: CancellationToken,
) {
    tracing::info!("Chore service started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Chore service shutting down");
                break;
            }
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    tracing::info!("Command channel closed, chore service stopping");
                    break;
                };
                let now = Utc::now();
                if apply(&mut store, cmd, now, &bus) {
                    // Latest-wins handoff; the saver coalesces bursts.
                    save_tx.send_replace(Some(store.to_snapshot()));
                }
            }
        }
    }

    // Final flush after the timers are cancelled: bypass the saver so the
    // very last state is on disk before we return. Dropping the watch
    // sender unblocks a saver that is still waiting for changes.
    drop(save_tx);
    let _ = saver.await;
    if let Err(err) = gateway.save_snapshot(&store.to_snapshot()).await {
        tracing::error!(error = %err, "Final snapshot flush failed");
    } else {
        tracing::info!("Final snapshot flushed");
    }
}

/// Apply one command. Returns whether state changed (and must be saved).
fn apply(store: &mut ChoreStore, cmd: Command, now: DateTime<Utc>, bus: &EventBus) -> bool {
    match cmd {
        Command::Claim {
            chore_id,
            person_id,
            reply,
        } => {
            let result = store.claim(chore_id, person_id, now);
            finish(result, reply, bus)
        }
        Command::Approve {
            chore_id,
            person_id,
            actor_id,
            reply,
        } => {
            let result = store.approve(chore_id, person_id, actor_id, now);
            finish(result, reply, bus)
        }
        Command::Disapprove {
            chore_id,
            person_id,
            actor_id,
            reply,
        } => {
            let result = store.disapprove(chore_id, person_id, actor_id, now);
            finish(result, reply, bus)
        }
        Command::SetDueDate {
            chore_id,
            due_at,
            reply,
        } => {
            let result = store.set_due_date(chore_id, due_at, now);
            let ok = result.is_ok();
            let _ = reply.send(result);
            ok
        }
        Command::SkipToNextDue { chore_id, reply } => {
            let result = store.skip_to_next_due(chore_id, now);
            let ok = result.is_ok();
            let _ = reply.send(result);
            ok
        }
        Command::UpsertPerson { person, reply } => {
            let result = store.upsert_person(person);
            let ok = result.is_ok();
            let _ = reply.send(result);
            ok
        }
        Command::RemovePerson { person_id, reply } => {
            let result = store.remove_person(person_id);
            let ok = result.is_ok();
            let _ = reply.send(result);
            ok
        }
        Command::UpsertChore { chore, reply } => {
            let result = store.upsert_chore(*chore, now);
            let ok = result.is_ok();
            let _ = reply.send(result);
            ok
        }
        Command::RemoveChore { chore_id, reply } => {
            let result = store.remove_chore(chore_id);
            let ok = result.is_ok();
            let _ = reply.send(result);
            ok
        }
        Command::SweepTick => {
            let events = store.sweep(now);
            let mutated = !events.is_empty();
            for event in events {
                bus.publish(event);
            }
            mutated
        }
        Command::ResetTick => {
            let armed = store.cycle_reset(now);
            if armed > 0 {
                tracing::info!(armed, "Cycle reset re-armed records");
            }
            armed > 0
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(store.to_snapshot());
            false
        }
    }
}

/// Publish events and answer the caller for an event-producing command.
fn finish(
    result: Result<Vec<chorewheel_events::ChoreEvent>, CoreError>,
    reply: Reply<()>,
    bus: &EventBus,
) -> bool {
    match result {
        Ok(events) => {
            for event in events {
                bus.publish(event);
            }
            let _ = reply.send(Ok(()));
            true
        }
        Err(err) => {
            let _ = reply.send(Err(err));
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Save scheduler
// ---------------------------------------------------------------------------

/// Latest-wins snapshot saver.
///
/// Waits for a new snapshot, saves it under a bounded timeout, and on
/// failure retries after a delay, unless an even newer snapshot arrived,
/// in which case the stale one is abandoned. The command loop is never
/// blocked by a save.
async fn run_saver(
    gateway: Arc<dyn PersistenceGateway>,
    mut rx: watch::Receiver<Option<ChoreSnapshot>>,
    save_timeout: std::time::Duration,
    retry_delay: std::time::Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let Some(snapshot) = rx.borrow_and_update().clone() else {
            continue;
        };

        loop {
            match tokio::time::timeout(save_timeout, gateway.save_snapshot(&snapshot)).await {
                Ok(Ok(())) => {
                    tracing::debug!("Snapshot saved");
                    break;
                }
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "Snapshot save failed, will retry");
                }
                Err(_) => {
                    tracing::error!(
                        timeout_secs = save_timeout.as_secs(),
                        "Snapshot save timed out, will retry"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(retry_delay) => {}
            }
            if rx.has_changed().unwrap_or(true) {
                // A newer snapshot supersedes this one.
                break;
            }
        }
    }
    tracing::debug!("Save scheduler stopped");
}
