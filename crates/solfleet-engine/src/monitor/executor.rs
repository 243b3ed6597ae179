/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! The poll pipeline.
//!
//! One executor run takes a job ticket through: exclusion lock -> plant +
//! credential load -> vault decrypt -> adapter summary -> snapshot upsert ->
//! alarm fetch -> gap backfill -> derivations -> alert reconciliation ->
//! status recomputation -> lock release -> poll log. Every run, including
//! lock-skipped and failed ones, writes exactly one poll log row.
//!
//! The job's total time budget is enforced at the suspension points: each
//! adapter call is capped by whatever budget remains, so an exhausted budget
//! surfaces as a normal NETWORK_TIMEOUT failure and the lock release / audit
//! write still run. Lock release is unconditional on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use chrono::{DateTime, Utc};

use crate::adapters::{
    validate_summary, AdapterError, AdapterRegistry, VendorAdapter, VendorCredentials,
};
use crate::lock::{plant_lock_key, LockService};
use crate::metrics;
use crate::monitor::backfill::{missing_dates, points_for, window_dates};
use crate::monitor::derive::{can_judge_low_gen, is_offline, low_gen_level, LowGenLevel};
use crate::monitor::reconcile::{reconcile, AlarmSignal};
use crate::monitor::status::{evaluate, StatusInputs};
use crate::monitor::{local_date, parse_zone, Clock, JobKind, JobTicket};
use crate::store::{Store, StoreError};
use crate::vault::CredentialVault;
use solfleet_models::models::alerts::{AlertSeverity, AlertType};
use solfleet_models::models::metric_snapshots::NewMetricSnapshot;
use solfleet_models::models::plants::{IntegrationStatus, Plant, PlantStatus};
use solfleet_models::models::poll_logs::{
    NewPollLog, JOB_TYPE_DAILY, JOB_TYPE_POLL, POLL_STATUS_ERROR, POLL_STATUS_SUCCESS,
};

/// Poll-log marker for a run that found the plant locked by another executor.
/// Not an error: the concurrent run is doing the work.
pub const LOCK_SKIPPED: &str = "LOCK_SKIPPED";

/// Days of history feeding the low-generation median.
const LOW_GEN_HISTORY_DAYS: i64 = 7;

/// How far back each poll asks for vendor alarms.
const ALARM_LOOKBACK_HOURS: i64 = 24;

/// What the queue needs to know about a finished run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub success: bool,
    pub error_kind: Option<&'static str>,
    pub retryable: bool,
    pub retry_after: Option<Duration>,
}

impl JobReport {
    fn success() -> Self {
        Self {
            success: true,
            error_kind: None,
            retryable: false,
            retry_after: None,
        }
    }

    fn failure(error: &PipelineError) -> Self {
        Self {
            success: false,
            error_kind: Some(error.kind()),
            retryable: error.retryable(),
            retry_after: error.retry_after(),
        }
    }
}

/// Internal pipeline failure: adapter-side or store-side.
enum PipelineError {
    Adapter(AdapterError),
    Store(StoreError),
}

impl PipelineError {
    fn kind(&self) -> &'static str {
        match self {
            PipelineError::Adapter(e) => e.kind(),
            PipelineError::Store(_) => "UNKNOWN",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            PipelineError::Adapter(e) => e.is_retryable(),
            PipelineError::Store(_) => true,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            PipelineError::Adapter(e) => e.retry_after(),
            PipelineError::Store(_) => None,
        }
    }
}

impl From<AdapterError> for PipelineError {
    fn from(e: AdapterError) -> Self {
        PipelineError::Adapter(e)
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::Store(e)
    }
}

/// Runs the poll pipeline for one ticket at a time.
pub struct PollExecutor {
    store: Arc<dyn Store>,
    locks: Arc<dyn LockService>,
    vault: Arc<CredentialVault>,
    registry: Arc<AdapterRegistry>,
    clock: Arc<dyn Clock>,
    adapter_timeout: Duration,
    job_budget: Duration,
    lock_ttl: Duration,
}

impl PollExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        locks: Arc<dyn LockService>,
        vault: Arc<CredentialVault>,
        registry: Arc<AdapterRegistry>,
        clock: Arc<dyn Clock>,
        adapter_timeout: Duration,
        job_budget: Duration,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            store,
            locks,
            vault,
            registry,
            clock,
            adapter_timeout,
            job_budget,
            lock_ttl,
        }
    }

    /// Current wall-clock time as the executor sees it.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Executes one ticket end to end. Always writes exactly one poll log.
    pub async fn execute(&self, ticket: &JobTicket) -> JobReport {
        let started = self.clock.now();

        let adapter = match self.registry.get(ticket.brand) {
            Some(adapter) => adapter,
            None => {
                error!(brand = %ticket.brand, "no adapter registered for brand");
                let failure = PipelineError::Adapter(AdapterError::Unknown(format!(
                    "no adapter registered for brand {}",
                    ticket.brand
                )));
                self.write_poll_log(ticket, started, POLL_STATUS_ERROR, Some(failure.kind()));
                return JobReport::failure(&failure);
            }
        };

        // Correlation id doubles as the lock caller token.
        let token = Uuid::new_v4().to_string();
        let key = plant_lock_key(ticket.plant_id);

        match self.locks.acquire(&key, &token, self.lock_ttl, started) {
            Ok(true) => {}
            Ok(false) => {
                info!(plant_id = %ticket.plant_id, "plant already locked, skipping poll");
                self.write_poll_log(ticket, started, POLL_STATUS_SUCCESS, Some(LOCK_SKIPPED));
                return JobReport::success();
            }
            Err(e) => {
                error!(plant_id = %ticket.plant_id, error = %e, "lock acquisition failed");
                let failure = PipelineError::Store(e);
                self.write_poll_log(ticket, started, POLL_STATUS_ERROR, Some(failure.kind()));
                return JobReport::failure(&failure);
            }
        }

        let result = self.run_locked(ticket, adapter.as_ref(), started).await;

        match self.locks.release(&key, &token) {
            Ok(true) => {}
            Ok(false) => warn!(plant_id = %ticket.plant_id, "lock was no longer held at release"),
            Err(e) => error!(plant_id = %ticket.plant_id, error = %e, "lock release failed"),
        }

        match result {
            Ok(()) => {
                self.write_poll_log(ticket, started, POLL_STATUS_SUCCESS, None);
                JobReport::success()
            }
            Err(failure) => {
                self.write_poll_log(ticket, started, POLL_STATUS_ERROR, Some(failure.kind()));
                JobReport::failure(&failure)
            }
        }
    }

    /// Audit entry for a job that was started but died abnormally (panic in
    /// the worker). The plant lock, if still held, expires via its TTL.
    pub fn record_aborted(&self, ticket: &JobTicket, started: DateTime<Utc>) {
        self.write_poll_log(ticket, started, POLL_STATUS_ERROR, Some("UNKNOWN"));
    }

    /// Pipeline body while the plant lock is held.
    async fn run_locked(
        &self,
        ticket: &JobTicket,
        adapter: &dyn VendorAdapter,
        started: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let plant = self
            .store
            .plant(ticket.plant_id)?
            .ok_or(PipelineError::Adapter(AdapterError::PlantNotFound))?;

        if !plant.is_active() {
            // Skip branch: no adapter call, but the status/integration
            // coupling is still enforced.
            self.recompute_status(&plant, None, LowGenLevel::None)?;
            debug!(plant_id = %plant.id, "integration not active, poll skipped");
            return Ok(());
        }

        let credential = match self.store.credential_for_plant(plant.id)? {
            Some(credential) => credential,
            None => return Err(self.quarantine_auth(&plant)),
        };

        let plaintext = match self.vault.decrypt_string(&credential.encrypted_blob) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(plant_id = %plant.id, error = %e, "credential decryption failed");
                return Err(self.quarantine_auth(&plant));
            }
        };
        let creds = match VendorCredentials::from_plaintext(&plaintext) {
            Ok(creds) => creds,
            Err(_) => return Err(self.quarantine_auth(&plant)),
        };
        drop(plaintext);

        let tz = parse_zone(&plant.timezone)
            .map_err(|e| PipelineError::Adapter(AdapterError::InvalidData(e)))?;

        match ticket.kind {
            JobKind::Poll => {
                self.run_poll(&plant, adapter, &creds, tz, started).await
            }
            JobKind::Daily(_) => {
                self.backfill_sweep(&plant, adapter, &creds, tz, started).await?;
                // A daily sweep teaches us nothing about liveness unless the
                // plant has data at all.
                if let Some(latest) = self.store.latest_snapshot(plant.id)? {
                    self.recompute_status(&plant, Some(latest.last_seen_at), LowGenLevel::None)?;
                }
                Ok(())
            }
        }
    }

    /// Full pipeline for a POLL ticket.
    async fn run_poll(
        &self,
        plant: &Plant,
        adapter: &dyn VendorAdapter,
        creds: &VendorCredentials,
        tz: chrono_tz::Tz,
        started: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let summary = match self
            .bounded(started, adapter.plant_summary(&plant.vendor_plant_id, creds))
            .await
        {
            Ok(summary) => summary,
            Err(AdapterError::AuthFailed) => return Err(self.quarantine_auth(plant)),
            Err(e) => return Err(e.into()),
        };

        validate_summary(&summary).map_err(PipelineError::Adapter)?;

        // Snapshot identity is the local day of the vendor's last contact.
        let snapshot_date = local_date(summary.last_seen_at, tz);
        let snapshot = NewMetricSnapshot::new(
            plant.id,
            snapshot_date,
            plant.timezone.clone(),
            summary.today_energy_kwh,
            summary.current_power_w,
            summary.grid_injection_power_w,
            summary.total_energy_kwh,
            summary.last_seen_at,
            summary.source_sampled_at,
        )
        .map_err(|e| PipelineError::Adapter(AdapterError::InvalidData(e)))?;
        self.store.upsert_snapshot(&snapshot)?;

        let caps = adapter.capabilities();
        let now = self.clock.now();
        let mut signals: Vec<AlarmSignal> = Vec::new();

        if caps.supports_alarms {
            let since = now - chrono::Duration::hours(ALARM_LOOKBACK_HOURS);
            let alarms = match self
                .bounded(started, adapter.alarms_since(&plant.vendor_plant_id, creds, since))
                .await
            {
                Ok(alarms) => alarms,
                Err(AdapterError::AuthFailed) => return Err(self.quarantine_auth(plant)),
                Err(e) => return Err(e.into()),
            };
            signals.extend(alarms.into_iter().map(AlarmSignal::from_vendor));
        }

        if caps.supports_daily_series {
            self.backfill_sweep(plant, adapter, creds, tz, started).await?;
        }

        // Low generation: judged against the median of recent history, only
        // when both enough history and a snapshot for today exist.
        let today_local = local_date(now, tz);
        let history = self
            .store
            .daily_energy_before(plant.id, today_local, LOW_GEN_HISTORY_DAYS)?;
        let mut low_gen = LowGenLevel::None;
        if can_judge_low_gen(&history) {
            if let Some(today_snapshot) = self.store.snapshot_for_date(plant.id, today_local)? {
                low_gen = low_gen_level(&history, today_snapshot.today_energy_kwh);
                let (active, severity) = match low_gen {
                    LowGenLevel::Red => (true, AlertSeverity::Critical),
                    LowGenLevel::Yellow => (true, AlertSeverity::High),
                    LowGenLevel::None => (false, AlertSeverity::High),
                };
                let message = if active {
                    format!(
                        "today's production {:.1} kWh is far below the recent daily median",
                        today_snapshot.today_energy_kwh
                    )
                } else {
                    "production back in the normal range".to_string()
                };
                signals.push(AlarmSignal::derived(
                    AlertType::LowGen,
                    active,
                    severity,
                    message,
                    now,
                ));
            }
        }

        // Offline: always signaled so a recovered plant resolves its alert.
        let offline = is_offline(now, summary.last_seen_at);
        let offline_message = if offline {
            format!(
                "no vendor contact since {}",
                summary.last_seen_at.to_rfc3339()
            )
        } else {
            "vendor contact re-established".to_string()
        };
        signals.push(AlarmSignal::derived(
            AlertType::Offline,
            offline,
            AlertSeverity::Critical,
            offline_message,
            now,
        ));

        let outcome = reconcile(
            self.store.as_ref(),
            plant.id,
            now,
            plant.alerts_silenced_until,
            &signals,
        )?;
        if outcome.raised > 0 || outcome.resolved > 0 {
            info!(
                plant_id = %plant.id,
                raised = outcome.raised,
                refreshed = outcome.refreshed,
                resolved = outcome.resolved,
                "alerts reconciled"
            );
        }

        self.recompute_status(plant, Some(summary.last_seen_at), low_gen)?;
        Ok(())
    }

    /// Insert-only gap repair over the last four local dates.
    async fn backfill_sweep(
        &self,
        plant: &Plant,
        adapter: &dyn VendorAdapter,
        creds: &VendorCredentials,
        tz: chrono_tz::Tz,
        started: DateTime<Utc>,
    ) -> Result<usize, PipelineError> {
        let now = self.clock.now();
        let window = window_dates(local_date(now, tz));
        let present = self
            .store
            .snapshot_dates(plant.id, window[0], window[window.len() - 1])?;
        let missing = missing_dates(&window, &present);
        if missing.is_empty() {
            return Ok(0);
        }

        let first = missing[0];
        let last = *missing.last().expect("missing is non-empty");
        let series = match self
            .bounded(
                started,
                adapter.daily_energy_series(&plant.vendor_plant_id, creds, first, last),
            )
            .await
        {
            Ok(series) => series,
            Err(AdapterError::AuthFailed) => return Err(self.quarantine_auth(plant)),
            Err(e) => return Err(e.into()),
        };

        let mut inserted = 0;
        for (date, energy_kwh) in points_for(&missing, &series).map_err(PipelineError::Adapter)? {
            let row = NewMetricSnapshot::new(
                plant.id,
                date,
                plant.timezone.clone(),
                energy_kwh,
                None,
                None,
                None,
                now,
                now,
            )
            .map_err(|e| PipelineError::Adapter(AdapterError::InvalidData(e)))?;
            if self.store.insert_snapshot_if_absent(&row)? {
                inserted += 1;
            }
        }
        if inserted > 0 {
            debug!(plant_id = %plant.id, inserted, "backfilled missing snapshots");
        }
        Ok(inserted)
    }

    /// Evaluates and persists the health status when it changed.
    fn recompute_status(
        &self,
        plant: &Plant,
        last_seen_at: Option<DateTime<Utc>>,
        low_gen: LowGenLevel,
    ) -> Result<(), PipelineError> {
        let critical = self.store.active_critical_alert_count(plant.id)?;
        let inputs = StatusInputs {
            integration_status: plant
                .integration()
                .unwrap_or(IntegrationStatus::Disabled),
            now: self.clock.now(),
            last_seen_at,
            active_critical_alerts: critical,
            low_gen,
        };
        let status = evaluate(&inputs);
        if plant.status != status.as_str() {
            info!(
                plant_id = %plant.id,
                from = %plant.status,
                to = status.as_str(),
                "plant status transition"
            );
            self.store.update_plant_status(plant.id, status)?;
        }
        Ok(())
    }

    /// Quarantines a plant after an authentication failure: polling pauses
    /// until an operator fixes the credentials, and the status coupling
    /// drives the plant GREY.
    fn quarantine_auth(&self, plant: &Plant) -> PipelineError {
        warn!(plant_id = %plant.id, name = %plant.name, "authentication failed, pausing integration");
        if let Err(e) = self
            .store
            .update_integration_status(plant.id, IntegrationStatus::PausedAuthError)
        {
            return e.into();
        }
        if plant.status != PlantStatus::Grey.as_str() {
            if let Err(e) = self.store.update_plant_status(plant.id, PlantStatus::Grey) {
                return e.into();
            }
        }
        AdapterError::AuthFailed.into()
    }

    /// Runs an adapter call under the smaller of the per-request timeout and
    /// the job's remaining budget.
    async fn bounded<T, F>(&self, started: DateTime<Utc>, fut: F) -> Result<T, AdapterError>
    where
        F: std::future::Future<Output = Result<T, AdapterError>>,
    {
        let elapsed = (self.clock.now() - started).to_std().unwrap_or_default();
        let remaining = self.job_budget.saturating_sub(elapsed);
        if remaining.is_zero() {
            return Err(AdapterError::NetworkTimeout);
        }
        let limit = remaining.min(self.adapter_timeout);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::NetworkTimeout),
        }
    }

    fn write_poll_log(
        &self,
        ticket: &JobTicket,
        started: DateTime<Utc>,
        status: &str,
        error_kind: Option<&str>,
    ) {
        let finished = self.clock.now();
        let duration_ms = (finished - started).num_milliseconds().max(0);
        let job_type = match ticket.kind {
            JobKind::Poll => JOB_TYPE_POLL,
            JobKind::Daily(_) => JOB_TYPE_DAILY,
        };

        match NewPollLog::new(
            ticket.plant_id,
            job_type.to_string(),
            status.to_string(),
            duration_ms,
            error_kind.map(String::from),
            None,
            started,
            finished,
        ) {
            Ok(log) => {
                if let Err(e) = self.store.insert_poll_log(&log) {
                    error!(plant_id = %ticket.plant_id, error = %e, "failed to write poll log");
                }
            }
            Err(e) => error!(plant_id = %ticket.plant_id, error = %e, "invalid poll log row"),
        }

        metrics::POLLS_TOTAL
            .with_label_values(&[ticket.brand.as_str(), status])
            .inc();
        metrics::POLL_DURATION_SECONDS
            .with_label_values(&[ticket.brand.as_str()])
            .observe(duration_ms as f64 / 1000.0);
    }
}
