//! Test fixture for the Solfleet engine.
//!
//! Provides an in-memory Store and LockService, a manually advanced clock,
//! and a scriptable vendor adapter, so the real executor, reconciler and
//! queues can be driven end to end without a database or a vendor cloud.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use secrecy::SecretString;
use uuid::Uuid;

use solfleet_engine::adapters::{
    AdapterCapabilities, AdapterError, AdapterRegistry, DailyEnergyPoint, NormalizedAlarm,
    NormalizedSummary, VendorAdapter, VendorCredentials,
};
use solfleet_engine::lock::LockService;
use solfleet_engine::monitor::executor::PollExecutor;
use solfleet_engine::monitor::Clock;
use solfleet_engine::store::{Store, StoreError};
use solfleet_engine::vault::CredentialVault;
use solfleet_models::models::alerts::{Alert, AlertSeverity, AlertState, AlertType, NewAlert};
use solfleet_models::models::credentials::Credential;
use solfleet_models::models::metric_snapshots::{MetricSnapshot, NewMetricSnapshot};
use solfleet_models::models::plants::{Brand, IntegrationStatus, Plant, PlantStatus};
use solfleet_models::models::poll_logs::NewPollLog;

pub const TEST_MASTER_KEY: &str =
    "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

/// Manually advanced wall clock.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-memory LockService with the same TTL/token semantics as the DAL one.
#[derive(Default)]
pub struct MemoryLockService {
    leases: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl LockService for MemoryLockService {
    fn acquire(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut leases = self.leases.lock().unwrap();
        if let Some((_, expires)) = leases.get(key) {
            if *expires > now {
                return Ok(false);
            }
        }
        let expires = now + chrono::Duration::from_std(ttl).unwrap();
        leases.insert(key.to_string(), (holder.to_string(), expires));
        Ok(true)
    }

    fn release(&self, key: &str, holder: &str) -> Result<bool, StoreError> {
        let mut leases = self.leases.lock().unwrap();
        match leases.get(key) {
            Some((owner, _)) if owner == holder => {
                leases.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
struct MemoryStoreInner {
    plants: Vec<Plant>,
    credentials: Vec<Credential>,
    snapshots: Vec<MetricSnapshot>,
    alerts: Vec<Alert>,
    poll_logs: Vec<NewPollLog>,
}

/// In-memory Store upholding the same uniqueness rules as Postgres.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn insert_plant(&self, plant: Plant) {
        self.inner.lock().unwrap().plants.push(plant);
    }

    pub fn insert_credential(&self, credential: Credential) {
        self.inner.lock().unwrap().credentials.push(credential);
    }

    pub fn plant_row(&self, plant_id: Uuid) -> Option<Plant> {
        self.inner
            .lock()
            .unwrap()
            .plants
            .iter()
            .find(|p| p.id == plant_id)
            .cloned()
    }

    pub fn snapshots(&self, plant_id: Uuid) -> Vec<MetricSnapshot> {
        let mut rows: Vec<MetricSnapshot> = self
            .inner
            .lock()
            .unwrap()
            .snapshots
            .iter()
            .filter(|s| s.plant_id == plant_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.date);
        rows
    }

    pub fn alerts(&self, plant_id: Uuid) -> Vec<Alert> {
        self.inner
            .lock()
            .unwrap()
            .alerts
            .iter()
            .filter(|a| a.plant_id == plant_id)
            .cloned()
            .collect()
    }

    pub fn poll_logs(&self, plant_id: Uuid) -> Vec<NewPollLog> {
        self.inner
            .lock()
            .unwrap()
            .poll_logs
            .iter()
            .filter(|l| l.plant_id == plant_id)
            .cloned()
            .collect()
    }

    pub fn all_poll_logs(&self) -> Vec<NewPollLog> {
        self.inner.lock().unwrap().poll_logs.clone()
    }

    /// Seeds a snapshot row directly (historical data for derivations).
    pub fn seed_snapshot(&self, plant_id: Uuid, date: NaiveDate, energy_kwh: f64, seen: DateTime<Utc>) {
        let row = MetricSnapshot {
            id: Uuid::new_v4(),
            created_at: seen,
            updated_at: seen,
            plant_id,
            date,
            timezone: "America/Sao_Paulo".to_string(),
            today_energy_kwh: energy_kwh,
            current_power_w: None,
            grid_injection_power_w: None,
            total_energy_kwh: None,
            last_seen_at: seen,
            source_sampled_at: seen,
        };
        self.inner.lock().unwrap().snapshots.push(row);
    }
}

impl Store for MemoryStore {
    fn plant(&self, plant_id: Uuid) -> Result<Option<Plant>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .plants
            .iter()
            .find(|p| p.id == plant_id && p.deleted_at.is_none())
            .cloned())
    }

    fn active_plants(&self) -> Result<Vec<Plant>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .plants
            .iter()
            .filter(|p| {
                p.integration_status == IntegrationStatus::Active.as_str()
                    && p.deleted_at.is_none()
            })
            .cloned()
            .collect())
    }

    fn update_plant_status(&self, plant_id: Uuid, status: PlantStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(plant) = inner.plants.iter_mut().find(|p| p.id == plant_id) {
            plant.status = status.as_str().to_string();
        }
        Ok(())
    }

    fn update_integration_status(
        &self,
        plant_id: Uuid,
        status: IntegrationStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(plant) = inner.plants.iter_mut().find(|p| p.id == plant_id) {
            plant.integration_status = status.as_str().to_string();
        }
        Ok(())
    }

    fn credential_for_plant(&self, plant_id: Uuid) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .credentials
            .iter()
            .find(|c| c.plant_id == plant_id)
            .cloned())
    }

    fn upsert_snapshot(&self, snapshot: &NewMetricSnapshot) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .snapshots
            .iter_mut()
            .find(|s| s.plant_id == snapshot.plant_id && s.date == snapshot.date)
        {
            existing.timezone = snapshot.timezone.clone();
            existing.today_energy_kwh = snapshot.today_energy_kwh;
            existing.current_power_w = snapshot.current_power_w;
            existing.grid_injection_power_w = snapshot.grid_injection_power_w;
            existing.total_energy_kwh = snapshot.total_energy_kwh;
            existing.last_seen_at = snapshot.last_seen_at;
            existing.source_sampled_at = snapshot.source_sampled_at;
            existing.updated_at = snapshot.last_seen_at;
        } else {
            inner.snapshots.push(materialize_snapshot(snapshot));
        }
        Ok(())
    }

    fn insert_snapshot_if_absent(&self, snapshot: &NewMetricSnapshot) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let exists = inner
            .snapshots
            .iter()
            .any(|s| s.plant_id == snapshot.plant_id && s.date == snapshot.date);
        if exists {
            return Ok(false);
        }
        inner.snapshots.push(materialize_snapshot(snapshot));
        Ok(true)
    }

    fn snapshot_dates(
        &self,
        plant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let mut dates: Vec<NaiveDate> = self
            .inner
            .lock()
            .unwrap()
            .snapshots
            .iter()
            .filter(|s| s.plant_id == plant_id && s.date >= from && s.date <= to)
            .map(|s| s.date)
            .collect();
        dates.sort();
        Ok(dates)
    }

    fn snapshot_for_date(
        &self,
        plant_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<MetricSnapshot>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .snapshots
            .iter()
            .find(|s| s.plant_id == plant_id && s.date == date)
            .cloned())
    }

    fn latest_snapshot(&self, plant_id: Uuid) -> Result<Option<MetricSnapshot>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .snapshots
            .iter()
            .filter(|s| s.plant_id == plant_id)
            .max_by_key(|s| s.date)
            .cloned())
    }

    fn daily_energy_before(
        &self,
        plant_id: Uuid,
        before: NaiveDate,
        limit: i64,
    ) -> Result<Vec<f64>, StoreError> {
        let mut rows: Vec<(NaiveDate, f64)> = self
            .inner
            .lock()
            .unwrap()
            .snapshots
            .iter()
            .filter(|s| s.plant_id == plant_id && s.date < before)
            .map(|s| (s.date, s.today_energy_kwh))
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|(_, e)| e)
            .collect())
    }

    fn active_alert_for_key(
        &self,
        plant_id: Uuid,
        alert_type: AlertType,
        vendor_alarm_code: &str,
        device_sn: &str,
    ) -> Result<Option<Alert>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .alerts
            .iter()
            .find(|a| {
                a.plant_id == plant_id
                    && a.alert_type == alert_type.as_str()
                    && a.vendor_alarm_code == vendor_alarm_code
                    && a.device_sn == device_sn
                    && a.is_active()
            })
            .cloned())
    }

    fn active_critical_alert_count(&self, plant_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .alerts
            .iter()
            .filter(|a| {
                a.plant_id == plant_id
                    && a.is_active()
                    && a.severity == AlertSeverity::Critical.as_str()
            })
            .count() as i64)
    }

    fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, StoreError> {
        let row = Alert {
            id: Uuid::new_v4(),
            created_at: alert.last_seen_at,
            updated_at: alert.last_seen_at,
            plant_id: alert.plant_id,
            alert_type: alert.alert_type.clone(),
            severity: alert.severity.clone(),
            state: alert.state.clone(),
            vendor_alarm_code: alert.vendor_alarm_code.clone(),
            device_sn: alert.device_sn.clone(),
            message: alert.message.clone(),
            occurred_at: alert.occurred_at,
            cleared_at: None,
            last_notified_at: None,
            last_seen_at: alert.last_seen_at,
            notifiable: alert.notifiable,
        };
        self.inner.lock().unwrap().alerts.push(row.clone());
        Ok(row)
    }

    fn refresh_alert(
        &self,
        alert_id: Uuid,
        severity: AlertSeverity,
        message: &str,
        last_seen_at: DateTime<Utc>,
        notifiable: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(alert) = inner.alerts.iter_mut().find(|a| a.id == alert_id) {
            alert.severity = severity.as_str().to_string();
            alert.message = message.to_string();
            alert.last_seen_at = last_seen_at;
            alert.notifiable = notifiable;
            alert.updated_at = last_seen_at;
        }
        Ok(())
    }

    fn resolve_alert(&self, alert_id: Uuid, cleared_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(alert) = inner.alerts.iter_mut().find(|a| a.id == alert_id) {
            alert.state = AlertState::Resolved.as_str().to_string();
            alert.cleared_at = Some(cleared_at);
            alert.notifiable = false;
            alert.updated_at = cleared_at;
        }
        Ok(())
    }

    fn insert_poll_log(&self, log: &NewPollLog) -> Result<(), StoreError> {
        self.inner.lock().unwrap().poll_logs.push(log.clone());
        Ok(())
    }
}

fn materialize_snapshot(snapshot: &NewMetricSnapshot) -> MetricSnapshot {
    MetricSnapshot {
        id: Uuid::new_v4(),
        created_at: snapshot.last_seen_at,
        updated_at: snapshot.last_seen_at,
        plant_id: snapshot.plant_id,
        date: snapshot.date,
        timezone: snapshot.timezone.clone(),
        today_energy_kwh: snapshot.today_energy_kwh,
        current_power_w: snapshot.current_power_w,
        grid_injection_power_w: snapshot.grid_injection_power_w,
        total_energy_kwh: snapshot.total_energy_kwh,
        last_seen_at: snapshot.last_seen_at,
        source_sampled_at: snapshot.source_sampled_at,
    }
}

/// A vendor adapter whose responses are scripted by the test.
pub struct ScriptedAdapter {
    brand: Brand,
    pub max_concurrent: usize,
    pub max_per_minute: u32,
    summary_script: Mutex<VecDeque<Result<NormalizedSummary, AdapterError>>>,
    fallback_summary: Mutex<Result<NormalizedSummary, AdapterError>>,
    alarms: Mutex<Vec<NormalizedAlarm>>,
    series: Mutex<Vec<DailyEnergyPoint>>,
    summary_delay: Mutex<Option<Duration>>,
    pub summary_calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(brand: Brand, fallback: NormalizedSummary) -> Self {
        Self {
            brand,
            max_concurrent: 4,
            max_per_minute: 60,
            summary_script: Mutex::new(VecDeque::new()),
            fallback_summary: Mutex::new(Ok(fallback)),
            alarms: Mutex::new(Vec::new()),
            series: Mutex::new(Vec::new()),
            summary_delay: Mutex::new(None),
            summary_calls: AtomicUsize::new(0),
        }
    }

    /// Makes every summary call pause first, to widen race windows in tests.
    pub fn set_summary_delay(&self, delay: Duration) {
        *self.summary_delay.lock().unwrap() = Some(delay);
    }

    /// Queues a one-shot summary response ahead of the fallback.
    pub fn push_summary(&self, response: Result<NormalizedSummary, AdapterError>) {
        self.summary_script.lock().unwrap().push_back(response);
    }

    pub fn set_fallback(&self, response: Result<NormalizedSummary, AdapterError>) {
        *self.fallback_summary.lock().unwrap() = response;
    }

    pub fn set_alarms(&self, alarms: Vec<NormalizedAlarm>) {
        *self.alarms.lock().unwrap() = alarms;
    }

    pub fn set_series(&self, series: Vec<DailyEnergyPoint>) {
        *self.series.lock().unwrap() = series;
    }

    pub fn calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VendorAdapter for ScriptedAdapter {
    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            brand: self.brand,
            max_concurrent: self.max_concurrent,
            max_per_minute: self.max_per_minute,
            min_interval_secs: 60,
            supports_daily_series: true,
            supports_alarms: true,
            supports_device_list: true,
        }
    }

    async fn test_connection(&self, _credentials: &VendorCredentials) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn plant_summary(
        &self,
        _vendor_plant_id: &str,
        _credentials: &VendorCredentials,
    ) -> Result<NormalizedSummary, AdapterError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.summary_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(scripted) = self.summary_script.lock().unwrap().pop_front() {
            return scripted;
        }
        self.fallback_summary.lock().unwrap().clone()
    }

    async fn daily_energy_series(
        &self,
        _vendor_plant_id: &str,
        _credentials: &VendorCredentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyEnergyPoint>, AdapterError> {
        Ok(self
            .series
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect())
    }

    async fn alarms_since(
        &self,
        _vendor_plant_id: &str,
        _credentials: &VendorCredentials,
        since: DateTime<Utc>,
    ) -> Result<Vec<NormalizedAlarm>, AdapterError> {
        Ok(self
            .alarms
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.occurred_at >= since)
            .cloned()
            .collect())
    }
}

/// Default "now" for tests: shortly after the reference summary's lastSeenAt.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 18, 14, 35, 0).unwrap()
}

/// A clean normalized summary matching the cold-start scenario.
pub fn reference_summary() -> NormalizedSummary {
    NormalizedSummary {
        current_power_w: Some(4500.0),
        today_energy_kwh: 28.5,
        total_energy_kwh: None,
        grid_injection_power_w: None,
        last_seen_at: Utc.with_ymd_and_hms(2026, 2, 18, 14, 30, 0).unwrap(),
        source_sampled_at: Utc.with_ymd_and_hms(2026, 2, 18, 14, 29, 45).unwrap(),
        timezone: "America/Sao_Paulo".to_string(),
    }
}

pub fn alarm(code: &str, device: &str, active: bool, severity: AlertSeverity) -> NormalizedAlarm {
    NormalizedAlarm {
        vendor_alarm_code: code.to_string(),
        device_sn: Some(device.to_string()),
        message: format!("alarm {}", code),
        occurred_at: test_now() - chrono::Duration::hours(1),
        is_active: active,
        severity,
    }
}

/// Wires the real executor to the in-memory collaborators.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub locks: Arc<MemoryLockService>,
    pub clock: Arc<ManualClock>,
    pub vault: Arc<CredentialVault>,
    pub adapter: Arc<ScriptedAdapter>,
    pub executor: Arc<PollExecutor>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_adapter(Arc::new(ScriptedAdapter::new(
            Brand::Solis,
            reference_summary(),
        )))
    }

    pub fn with_adapter(adapter: Arc<ScriptedAdapter>) -> Self {
        let store = Arc::new(MemoryStore::default());
        let locks = Arc::new(MemoryLockService::default());
        let clock = Arc::new(ManualClock::at(test_now()));
        let vault = Arc::new(CredentialVault::from_hex(TEST_MASTER_KEY, None).unwrap());

        let mut adapters: HashMap<Brand, Arc<dyn VendorAdapter>> = HashMap::new();
        adapters.insert(Brand::Solis, adapter.clone());
        let registry = Arc::new(AdapterRegistry::new(adapters));

        let executor = Arc::new(PollExecutor::new(
            store.clone(),
            locks.clone(),
            vault.clone(),
            registry,
            clock.clone(),
            Duration::from_secs(8),
            Duration::from_secs(60),
            Duration::from_secs(1200),
        ));

        Self {
            store,
            locks,
            clock,
            vault,
            adapter,
            executor,
        }
    }

    /// Inserts an ACTIVE, GREY plant with a valid sealed credential.
    pub fn insert_plant(&self) -> Uuid {
        let plant_id = self.insert_plant_without_credential();
        self.insert_credential(plant_id);
        plant_id
    }

    pub fn insert_plant_without_credential(&self) -> Uuid {
        let id = Uuid::new_v4();
        let now = self.clock.now();
        self.store.insert_plant(Plant {
            id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            name: format!("Test Plant {}", id),
            brand: Brand::Solis.as_str().to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            integration_status: IntegrationStatus::Active.as_str().to_string(),
            status: PlantStatus::Grey.as_str().to_string(),
            alerts_silenced_until: None,
            owner_customer_id: None,
            vendor_plant_id: format!("VP-{}", id),
            installed_capacity_w: Some(50_000.0),
        });
        id
    }

    pub fn insert_credential(&self, plant_id: Uuid) {
        let plaintext = SecretString::from(r#"{"api_key":"k-123","api_secret":"s-456"}"#.to_string());
        let blob = solfleet_engine::vault::encrypt_credentials(&self.vault, &plaintext).unwrap();
        let now = self.clock.now();
        self.store.insert_credential(Credential {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            plant_id,
            brand: Brand::Solis.as_str().to_string(),
            encrypted_blob: blob,
            key_version: 1,
        });
    }

    /// Inserts a credential blob sealed with the wrong key.
    pub fn insert_undecryptable_credential(&self, plant_id: Uuid) {
        let other_vault = CredentialVault::from_hex(
            "ffeeddccbbaa99887766554433221100ffeeddccbbaa99887766554433221100",
            None,
        )
        .unwrap();
        let plaintext = SecretString::from(r#"{"api_key":"k","api_secret":"s"}"#.to_string());
        let blob = solfleet_engine::vault::encrypt_credentials(&other_vault, &plaintext).unwrap();
        let now = self.clock.now();
        self.store.insert_credential(Credential {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            plant_id,
            brand: Brand::Solis.as_str().to_string(),
            encrypted_blob: blob,
            key_version: 1,
        });
    }
}
