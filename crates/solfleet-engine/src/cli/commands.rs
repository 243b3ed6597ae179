/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use solfleet_utils::logging::prelude::*;
use tokio::signal;
use tokio::sync::watch;

use crate::adapters::AdapterRegistry;
use crate::dal::DAL;
use crate::db::create_shared_connection_pool;
use crate::health::{self, HealthState};
use crate::lock::LockService;
use crate::monitor::executor::PollExecutor;
use crate::monitor::queue::{BrandQueue, BrandQueueConfig};
use crate::monitor::scheduler::Scheduler;
use crate::monitor::{Clock, SystemClock};
use crate::store::Store;
use crate::vault::{encrypt_credentials, CredentialVault};
use secrecy::SecretString;
use solfleet_models::models::credentials::NewCredential;
use solfleet_models::models::plants::{Brand, NewPlant};
use solfleet_utils::config::Settings;

/// Function to start the monitoring engine
///
/// This function validates configuration, probes the store, builds the vault
/// and the mock adapter registry, starts the brand queues, the health
/// listener and the scheduler, and then waits for shutdown.
pub async fn serve(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Solfleet monitoring engine");

    // Mock-mode gate and master-key shape checks; refusing to start beats
    // polling vendors with a half-configured process.
    config.validate()?;

    info!("Creating database connection pool");
    let connection_pool =
        create_shared_connection_pool(&config.database_url, config.store_pool_size);
    let dal = DAL::new(connection_pool.pool.clone());
    dal.probe().expect("Failed to reach the store");
    info!("Store reachable");

    let vault = CredentialVault::from_hex(
        &config.master_key_current,
        config.master_key_previous.as_deref(),
    )
    .expect("Failed to load master key");
    vault.self_test().expect("Master key self-test failed");
    info!(
        "Credential vault ready (key fingerprint: {})",
        vault.fingerprint()
    );

    let registry = AdapterRegistry::mock_from_dir(Path::new(&config.fixtures_dir))
        .expect("Failed to load mock fixtures");
    info!("Adapter registry ready (mock mode, no vendor network I/O)");

    // Set up shutdown signal handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
        let _ = shutdown_tx.send(true);
    });

    let store: Arc<dyn Store> = Arc::new(dal.clone());
    let locks: Arc<dyn LockService> = Arc::new(dal.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let vault = Arc::new(vault);
    let registry = Arc::new(registry);

    let executor = Arc::new(PollExecutor::new(
        store.clone(),
        locks,
        vault,
        registry.clone(),
        clock.clone(),
        config.adapter_request_timeout(),
        config.job_timeout(),
        config.lock_ttl(),
    ));

    info!("Starting brand queues");
    let mut queues: HashMap<Brand, BrandQueue> = HashMap::new();
    for brand in Brand::ALL {
        let caps = registry
            .get(brand)
            .expect("registry covers every brand")
            .capabilities();
        let queue = BrandQueue::start(
            BrandQueueConfig::from_capabilities(&caps),
            executor.clone(),
            shutdown_rx.clone(),
        );
        queues.insert(brand, queue);
    }

    let health_state = HealthState {
        dal: dal.clone(),
        start_time: SystemTime::now(),
    };
    tokio::spawn(health::serve(health_state, config.health_port));
    info!("Health listener on port {}", config.health_port);

    let scheduler = Scheduler::new(
        store.clone(),
        queues.clone(),
        config.poll_interval(),
        clock,
    );
    let scheduler_handle = scheduler.start(shutdown_rx.clone());

    info!("Solfleet engine is now running");

    // Block until the shutdown signal flips, then stop the scheduler first
    // and give the queues a bounded drain window.
    let mut shutdown_watch = shutdown_rx.clone();
    shutdown_watch.changed().await.ok();

    info!("Shutdown requested, draining queues");
    scheduler_handle.await.ok();

    let grace = config.shutdown_grace();
    let mut drains = Vec::new();
    for queue in queues.values() {
        let queue = queue.clone();
        drains.push(tokio::spawn(async move { queue.drain(grace).await }));
    }
    for drain in drains {
        drain.await.ok();
    }

    info!("Engine stopped");
    Ok(())
}

/// Registers a new plant together with its sealed vendor credentials.
///
/// The engine only polls what the catalog holds; this is the admin path for
/// getting a plant into the catalog.
#[allow(clippy::too_many_arguments)]
pub fn create_plant(
    config: &Settings,
    name: String,
    brand: String,
    timezone: String,
    vendor_plant_id: String,
    api_key: String,
    api_secret: String,
    installed_capacity_w: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let parsed_brand =
        Brand::parse(&brand).ok_or_else(|| format!("Unknown brand: {}", brand))?;

    let connection_pool = create_shared_connection_pool(&config.database_url, 2);
    let dal = DAL::new(connection_pool.pool.clone());

    let vault = CredentialVault::from_hex(
        &config.master_key_current,
        config.master_key_previous.as_deref(),
    )?;
    vault.self_test()?;

    let new_plant = NewPlant::new(
        name,
        parsed_brand,
        timezone,
        vendor_plant_id,
        None,
        installed_capacity_w,
    )?;
    let plant = dal.plants().create(&new_plant)?;

    let plaintext = SecretString::from(
        serde_json::json!({ "api_key": api_key, "api_secret": api_secret }).to_string(),
    );
    let blob = encrypt_credentials(&vault, &plaintext)?;
    let new_credential = NewCredential::new(plant.id, parsed_brand, blob, 1)?;
    dal.credentials().create(&new_credential)?;

    info!(plant_id = %plant.id, brand = %parsed_brand, "Plant registered");
    println!("{}", plant.id);
    Ok(())
}

/// Re-encrypts every stored credential blob under the current master key.
///
/// Blobs already sealed with the current key are left untouched; blobs only
/// the previous key can open are rewritten and their key version bumped.
pub fn rotate_credentials(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let connection_pool = create_shared_connection_pool(&config.database_url, 2);
    let dal = DAL::new(connection_pool.pool.clone());

    let vault = CredentialVault::from_hex(
        &config.master_key_current,
        config.master_key_previous.as_deref(),
    )?;
    vault.self_test()?;

    let credentials = dal.credentials().list()?;
    info!(total = credentials.len(), "Rotating credentials");

    let mut rotated = 0usize;
    let mut failed = 0usize;
    for credential in credentials {
        match vault.reseal(&credential.encrypted_blob) {
            Ok(Some(blob)) => {
                dal.credentials()
                    .update_blob(credential.id, blob, credential.key_version + 1)?;
                rotated += 1;
            }
            Ok(None) => {}
            Err(e) => {
                error!(credential_id = %credential.id, error = %e, "credential cannot be resealed");
                failed += 1;
            }
        }
    }

    info!(rotated, failed, "Credential rotation complete");
    if failed > 0 {
        return Err(format!("{} credential(s) could not be resealed", failed).into());
    }
    Ok(())
}
