/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Per-brand bounded work queues.
//!
//! Each brand gets one queue sized by its adapter capabilities: at most
//! `max_concurrent` executors in parallel and at most `max_per_minute` job
//! starts per sliding 60-second window. Ticket identity is deterministic and
//! deduplicated: submitting an id that is already pending, running or
//! waiting on a retry is a silent no-op.
//!
//! Retry policy: a retryable failure is re-run up to two more times with
//! exponential backoff (5s then 10s, 0-20% jitter). A vendor-supplied
//! `retry_after` floor overrides a shorter backoff. Authentication failures
//! and bad-payload failures are terminal. The last 100 successful and 50
//! failed terminal tickets are kept for observability.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{watch, Notify, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::adapters::AdapterCapabilities;
use crate::metrics;
use crate::monitor::executor::{JobReport, PollExecutor};
use crate::monitor::JobTicket;
use solfleet_models::models::plants::Brand;

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Queue limits for one brand.
#[derive(Debug, Clone)]
pub struct BrandQueueConfig {
    pub brand: Brand,
    /// Executors allowed in parallel.
    pub max_concurrent: usize,
    /// Job starts per sliding 60-second window.
    pub max_per_minute: u32,
    /// Total executions per ticket (first attempt plus retries).
    pub max_attempts: u32,
    /// First retry backoff; doubles per attempt.
    pub backoff_base: Duration,
    /// Terminal successes kept for observability.
    pub success_retention: usize,
    /// Terminal failures kept for observability.
    pub failure_retention: usize,
}

impl BrandQueueConfig {
    pub fn from_capabilities(caps: &AdapterCapabilities) -> Self {
        Self {
            brand: caps.brand,
            max_concurrent: caps.max_concurrent.max(1),
            max_per_minute: caps.max_per_minute.max(1),
            max_attempts: 3,
            backoff_base: Duration::from_secs(5),
            success_retention: 100,
            failure_retention: 50,
        }
    }
}

/// Terminal ticket record kept in the retention rings.
#[derive(Debug, Clone)]
pub struct TicketRecord {
    pub id: String,
    pub plant_id: Uuid,
    pub attempts: u32,
    pub error_kind: Option<String>,
    pub finished_at: DateTime<Utc>,
}

struct QueueState {
    pending: VecDeque<JobTicket>,
    /// Ids that are pending, running, or waiting on a retry.
    tracked: HashSet<String>,
    in_flight: usize,
    recent_starts: VecDeque<tokio::time::Instant>,
    completed_ok: VecDeque<TicketRecord>,
    completed_err: VecDeque<TicketRecord>,
}

struct QueueInner {
    config: BrandQueueConfig,
    executor: Arc<PollExecutor>,
    state: Mutex<QueueState>,
    notify: Notify,
    semaphore: Arc<Semaphore>,
    shutdown: watch::Receiver<bool>,
}

/// Handle to one brand's work queue.
#[derive(Clone)]
pub struct BrandQueue {
    inner: Arc<QueueInner>,
}

impl BrandQueue {
    /// Builds the queue and spawns its dispatcher task.
    pub fn start(
        config: BrandQueueConfig,
        executor: Arc<PollExecutor>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let max_concurrent = config.max_concurrent;
        let inner = Arc::new(QueueInner {
            config,
            executor,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                tracked: HashSet::new(),
                in_flight: 0,
                recent_starts: VecDeque::new(),
                completed_ok: VecDeque::new(),
                completed_err: VecDeque::new(),
            }),
            notify: Notify::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            shutdown,
        });

        tokio::spawn(dispatch_loop(inner.clone()));
        Self { inner }
    }

    pub fn brand(&self) -> Brand {
        self.inner.config.brand
    }

    /// Submits a ticket. Returns false when a ticket with the same id is
    /// already tracked; that duplicate is dropped silently by design.
    pub fn submit(&self, ticket: JobTicket) -> bool {
        let mut state = self.inner.state.lock().expect("queue state poisoned");
        if !state.tracked.insert(ticket.id.clone()) {
            debug!(brand = %self.inner.config.brand, id = %ticket.id, "duplicate ticket dropped");
            return false;
        }
        state.pending.push_back(ticket);
        metrics::QUEUE_DEPTH
            .with_label_values(&[self.inner.config.brand.as_str()])
            .set(state.pending.len() as i64);
        drop(state);
        self.inner.notify.notify_one();
        true
    }

    /// Pending tickets not yet dispatched.
    pub fn depth(&self) -> usize {
        self.inner.state.lock().expect("queue state poisoned").pending.len()
    }

    /// True when nothing is pending or running.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock().expect("queue state poisoned");
        state.pending.is_empty() && state.in_flight == 0
    }

    /// Waits until the queue is idle or the deadline passes. Returns whether
    /// the queue drained in time.
    pub async fn drain(&self, deadline: Duration) -> bool {
        let drained = tokio::time::timeout(deadline, async {
            while !self.is_idle() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;
        if drained.is_err() {
            warn!(brand = %self.inner.config.brand, "queue did not drain before deadline");
        }
        drained.is_ok()
    }

    /// Terminal ticket records, most recent last.
    pub fn recent_completed(&self) -> (Vec<TicketRecord>, Vec<TicketRecord>) {
        let state = self.inner.state.lock().expect("queue state poisoned");
        (
            state.completed_ok.iter().cloned().collect(),
            state.completed_err.iter().cloned().collect(),
        )
    }
}

async fn dispatch_loop(inner: Arc<QueueInner>) {
    let mut shutdown = inner.shutdown.clone();
    // A closed channel means the process is going away; treat it as shutdown.
    let mut closed = false;
    loop {
        // Find the next ticket, or exit once shut down and fully idle.
        let ticket = loop {
            if let Some(ticket) = pop_pending(&inner) {
                break ticket;
            }
            let stopping = closed || *shutdown.borrow();
            if stopping && inner.state.lock().expect("queue state poisoned").in_flight == 0 {
                debug!(brand = %inner.config.brand, "queue dispatcher stopped");
                return;
            }
            if closed {
                inner.notify.notified().await;
            } else {
                tokio::select! {
                    _ = inner.notify.notified() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            closed = true;
                        }
                    }
                }
            }
        };

        // Concurrency cap, then the sliding-window rate limit.
        let permit = match inner.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        wait_for_rate_slot(&inner).await;

        let worker_inner = inner.clone();
        tokio::spawn(async move {
            let _permit = permit;
            run_ticket(&worker_inner, ticket).await;
        });
    }
}

fn pop_pending(inner: &Arc<QueueInner>) -> Option<JobTicket> {
    let mut state = inner.state.lock().expect("queue state poisoned");
    let ticket = state.pending.pop_front()?;
    state.in_flight += 1;
    metrics::QUEUE_DEPTH
        .with_label_values(&[inner.config.brand.as_str()])
        .set(state.pending.len() as i64);
    Some(ticket)
}

/// Claims a start slot in the sliding 60-second window, sleeping until one
/// frees up when the window is full.
async fn wait_for_rate_slot(inner: &Arc<QueueInner>) {
    loop {
        let wait = {
            let mut state = inner.state.lock().expect("queue state poisoned");
            let now = tokio::time::Instant::now();
            while let Some(front) = state.recent_starts.front() {
                if now.duration_since(*front) >= RATE_WINDOW {
                    state.recent_starts.pop_front();
                } else {
                    break;
                }
            }
            if (state.recent_starts.len() as u32) < inner.config.max_per_minute {
                state.recent_starts.push_back(now);
                None
            } else {
                let oldest = *state.recent_starts.front().expect("window is full");
                Some(RATE_WINDOW - now.duration_since(oldest))
            }
        };

        match wait {
            None => return,
            Some(delay) => {
                metrics::RATE_LIMIT_WAITS_TOTAL
                    .with_label_values(&[inner.config.brand.as_str()])
                    .inc();
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn run_ticket(inner: &Arc<QueueInner>, ticket: JobTicket) {
    let started = inner.executor.now();

    // Run the pipeline in its own task so a panic is contained; the poll
    // audit invariant holds even for a job that dies abnormally.
    let executor = inner.executor.clone();
    let job_ticket = ticket.clone();
    let handle = tokio::spawn(async move { executor.execute(&job_ticket).await });

    let report = match handle.await {
        Ok(report) => report,
        Err(join_error) => {
            error!(
                brand = %inner.config.brand,
                id = %ticket.id,
                panicked = join_error.is_panic(),
                "poll job aborted"
            );
            inner.executor.record_aborted(&ticket, started);
            JobReport {
                success: false,
                error_kind: Some("UNKNOWN"),
                retryable: true,
                retry_after: None,
            }
        }
    };

    finish_ticket(inner, ticket, report);
}

fn finish_ticket(inner: &Arc<QueueInner>, ticket: JobTicket, report: JobReport) {
    let will_retry =
        !report.success && report.retryable && ticket.attempt + 1 < inner.config.max_attempts;

    if will_retry {
        let delay = retry_delay(&inner.config, ticket.attempt, report.retry_after);
        info!(
            brand = %inner.config.brand,
            id = %ticket.id,
            attempt = ticket.attempt,
            delay_secs = delay.as_secs_f64(),
            error = report.error_kind.unwrap_or("UNKNOWN"),
            "scheduling retry"
        );

        {
            let mut state = inner.state.lock().expect("queue state poisoned");
            state.in_flight -= 1;
            // The id stays tracked while waiting, so scheduler duplicates
            // keep collapsing onto this ticket.
        }

        let retry_inner = inner.clone();
        let next = ticket.next_attempt();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = retry_inner.state.lock().expect("queue state poisoned");
                state.pending.push_back(next);
                metrics::QUEUE_DEPTH
                    .with_label_values(&[retry_inner.config.brand.as_str()])
                    .set(state.pending.len() as i64);
            }
            retry_inner.notify.notify_one();
        });
    } else {
        let mut state = inner.state.lock().expect("queue state poisoned");
        state.in_flight -= 1;
        state.tracked.remove(&ticket.id);

        let record = TicketRecord {
            id: ticket.id,
            plant_id: ticket.plant_id,
            attempts: ticket.attempt + 1,
            error_kind: report.error_kind.map(String::from),
            finished_at: inner.executor.now(),
        };
        if report.success {
            state.completed_ok.push_back(record);
            while state.completed_ok.len() > inner.config.success_retention {
                state.completed_ok.pop_front();
            }
        } else {
            state.completed_err.push_back(record);
            while state.completed_err.len() > inner.config.failure_retention {
                state.completed_err.pop_front();
            }
        }
    }

    inner.notify.notify_one();
}

/// Exponential backoff with jitter, floored by any vendor-mandated
/// `retry_after`: the next attempt never starts before `now + retry_after`.
fn retry_delay(
    config: &BrandQueueConfig,
    attempt: u32,
    retry_after: Option<Duration>,
) -> Duration {
    let base = config.backoff_base * 2u32.saturating_pow(attempt);
    let jitter = 1.0 + rand::thread_rng().gen_range(0.0..0.2);
    let backoff = base.mul_f64(jitter);
    match retry_after {
        Some(floor) => backoff.max(floor),
        None => backoff,
    }
}
