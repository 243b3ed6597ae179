/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Periodic scheduler: enumerates active plants and feeds the brand queues.
//!
//! Every period the scheduler submits one `poll:plant:{id}:latest` ticket per
//! active plant to the plant's brand queue; duplicate ids collapse inside the
//! queue, so a slow poll is never stacked behind a second one. The first tick
//! fires immediately on start. On startup the scheduler also submits one
//! daily catch-up backfill ticket per plant to repair gaps accumulated while
//! the process was down.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use solfleet_utils::logging::prelude::*;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::metrics;
use crate::monitor::queue::BrandQueue;
use crate::monitor::{local_date, parse_zone, Clock, JobTicket};
use crate::store::Store;
use solfleet_models::models::plants::{Brand, Plant};

pub struct Scheduler {
    store: Arc<dyn Store>,
    queues: HashMap<Brand, BrandQueue>,
    period: Duration,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn Store>,
        queues: HashMap<Brand, BrandQueue>,
        period: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            queues,
            period,
            clock,
        }
    }

    /// Spawns the scheduling loop. The task stops emitting tickets as soon as
    /// the shutdown signal flips; draining what is already queued is the
    /// queues' business.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(period_secs = self.period.as_secs(), "scheduler started");
            self.submit_daily_catchup();

            let mut ticker = interval(self.period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.tick(),
                    _ = shutdown.changed() => {
                        info!("scheduler stopped");
                        return;
                    }
                }
            }
        })
    }

    /// One scheduling pass: enumerate and submit. A failure affects this pass
    /// only; the loop keeps running.
    fn tick(&self) {
        let plants = match self.store.active_plants() {
            Ok(plants) => plants,
            Err(e) => {
                error!(error = %e, "scheduler could not enumerate active plants");
                return;
            }
        };
        metrics::ACTIVE_PLANTS.set(plants.len() as i64);

        let now = self.clock.now();
        let mut submitted = 0usize;
        for plant in &plants {
            if let Some(queue) = self.queue_for(plant) {
                if queue.submit(JobTicket::poll(plant.id, queue.brand(), now)) {
                    submitted += 1;
                }
            }
        }
        debug!(
            plants = plants.len(),
            submitted, "scheduler tick complete"
        );
    }

    /// Startup catch-up: one daily backfill ticket per active plant, keyed by
    /// the plant's local date so a restart on the same day stays idempotent.
    fn submit_daily_catchup(&self) {
        let plants = match self.store.active_plants() {
            Ok(plants) => plants,
            Err(e) => {
                error!(error = %e, "scheduler could not enumerate plants for catch-up");
                return;
            }
        };

        let now = self.clock.now();
        for plant in &plants {
            let Some(queue) = self.queue_for(plant) else {
                continue;
            };
            let tz = match parse_zone(&plant.timezone) {
                Ok(tz) => tz,
                Err(e) => {
                    warn!(plant_id = %plant.id, error = %e, "skipping catch-up for plant with bad timezone");
                    continue;
                }
            };
            queue.submit(JobTicket::daily(
                plant.id,
                queue.brand(),
                local_date(now, tz),
                now,
            ));
        }
    }

    fn queue_for(&self, plant: &Plant) -> Option<&BrandQueue> {
        let Some(brand) = plant.brand_parsed() else {
            warn!(plant_id = %plant.id, brand = %plant.brand, "plant has unknown brand");
            return None;
        };
        let queue = self.queues.get(&brand);
        if queue.is_none() {
            warn!(plant_id = %plant.id, brand = %brand, "no queue for brand");
        }
        queue
    }
}
