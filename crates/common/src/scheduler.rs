use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub &'static str);

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: JobId,
    pub interval: Duration,
    /// Fire the first tick right away instead of after one interval
    pub run_immediately: bool,
}

/// Non-overlap guard shared by a job's scheduled ticks and manual triggers
#[derive(Debug, Clone, Default)]
pub struct TickGate {
    busy: Arc<AtomicBool>,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit to run, or `None` while another run holds one
    pub fn try_enter(&self) -> Option<TickPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Released on drop
#[derive(Debug)]
pub struct TickPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for TickPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    shutdown_tx: broadcast::Sender<()>,
    grace: Duration,
    handles: Vec<(JobId, JoinHandle<()>)>,
}

impl Scheduler {
    /// `grace` bounds how long an in-flight tick may run after shutdown
    pub fn new(grace: Duration) -> Self {
        let (tx, _rx) = broadcast::channel(8);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                shutdown_tx: tx,
                grace,
                handles: Vec::new(),
            })),
        }
    }

    pub async fn spawn_periodic<F, Fut>(&self, job: ScheduledJob, gate: TickGate, f: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.inner.write().await;
        let rx = inner.shutdown_tx.subscribe();
        let id = job.id;
        let handle = tokio::spawn(run_periodic(job, gate, rx, inner.grace, f));
        inner.handles.push((id, handle));
        tracing::debug!(job = id.0, "Periodic job registered");
    }

    pub async fn job_count(&self) -> usize {
        self.inner.read().await.handles.len()
    }

    /// Signal every job loop and wait for them to wind down
    pub async fn shutdown(&self) {
        let handles = {
            let mut inner = self.inner.write().await;
            let _ = inner.shutdown_tx.send(());
            std::mem::take(&mut inner.handles)
        };

        for (id, handle) in handles {
            if let Err(e) = handle.await {
                tracing::warn!(job = id.0, error = %e, "Job loop ended abnormally");
            }
        }
        tracing::info!("Scheduler stopped");
    }
}

async fn run_periodic<F, Fut>(
    job: ScheduledJob,
    gate: TickGate,
    mut shutdown_rx: broadcast::Receiver<()>,
    grace: Duration,
    mut f: F,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let start = if job.run_immediately {
        Instant::now()
    } else {
        Instant::now() + job.interval
    };
    let mut ticker = tokio::time::interval_at(start, job.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(permit) = gate.try_enter() else {
                    tracing::info!(job = job.id.0, "Previous run still in progress, skipping tick");
                    continue;
                };

                let tick = f();
                let mut handle = tokio::spawn(async move {
                    let _permit = permit;
                    tick.await;
                });

                tokio::select! {
                    result = &mut handle => log_tick_outcome(job.id, result),
                    _ = shutdown_rx.recv() => {
                        match tokio::time::timeout(grace, &mut handle).await {
                            Ok(result) => log_tick_outcome(job.id, result),
                            Err(_) => {
                                tracing::warn!(
                                    job = job.id.0,
                                    grace_secs = grace.as_secs(),
                                    "Abandoning in-flight tick at shutdown"
                                );
                                handle.abort();
                            }
                        }
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }
    tracing::debug!(job = job.id.0, "Job loop exited");
}

fn log_tick_outcome(id: JobId, result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(job = id.0, "Tick panicked; job keeps its schedule");
        } else {
            tracing::warn!(job = id.0, error = %e, "Tick was cancelled");
        }
    }
}
