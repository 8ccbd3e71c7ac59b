/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{sync::Arc, time::Duration};
use chrono::{DateTime,TimeDelta,Utc};
use tokio::time::sleep;
use tracing::{debug,error,info,warn};

use crate::FlightTable;
use crate::persist::{FlightStore, is_store_unavailable, store_with_timeout};

#[derive(Debug,Clone)]
pub struct JanitorConfig {
    pub interval: Duration,   // time between cleanup cycles
    pub max_age: Duration,    // flights without new reports for longer than this are dropped
    pub max_history: usize,   // number of newest reports we keep per flight
    pub io_timeout: Duration, // max time to wait for the store
}

/// what happened in one cleanup cycle
#[derive(Debug,Default,Clone,PartialEq,Eq)]
pub struct CycleStats {
    pub scanned: usize,
    pub persisted: usize,
    pub persist_failures: usize,
    pub trimmed: usize,  // number of dropped reports
    pub removed: usize,
    pub missing: usize,  // stale flights that were already gone when we tried to remove them
}

/// background task that persists the last report of each flight, trims flight histories and
/// removes stale flights from the table.
///
/// The janitor is the only component that removes flights
pub struct Janitor<S> where S: FlightStore {
    table: Arc<FlightTable>,
    store: Arc<S>,
    config: JanitorConfig,
}

impl<S> Janitor<S> where S: FlightStore + 'static {
    pub fn new (table: Arc<FlightTable>, store: Arc<S>, config: JanitorConfig)->Self {
        Janitor { table, store, config }
    }

    /// sleep, then scan - forever. A failing cycle does not stop subsequent ones
    pub async fn run (self: Arc<Self>) {
        loop {
            sleep( self.config.interval).await;

            let janitor = self.clone();
            match tokio::spawn( async move { janitor.run_cycle( Utc::now()).await }).await {
                Ok(stats) => debug!("cleanup cycle done: {:?}", stats),
                Err(e) => error!("cleanup cycle failed: {}", e)
            }
        }
    }

    pub async fn run_cycle (&self, now: DateTime<Utc>)->CycleStats {
        let mut stats = CycleStats::default();
        let max_age = TimeDelta::from_std( self.config.max_age).unwrap_or( TimeDelta::MAX);
        let mut store_available = true;
        let mut stale: Vec<(Arc<String>,DateTime<Utc>)> = Vec::new();

        let flights = self.table.enumerate();
        info!("starting cleanup of flight collection. size={}", flights.len());

        for flight in &flights {
            stats.scanned += 1;
            let Some(last) = flight.last_report() else { continue };

            // a rejected record does not affect other flights, an unreachable store is not retried before the next cycle
            if store_available {
                match store_with_timeout( self.store.as_ref(), flight.hexident.as_str(), &last.to_record(), self.config.io_timeout).await {
                    Ok(()) => {
                        self.table.mark_persisted( flight.hexident.as_str(), now);
                        stats.persisted += 1;
                    }
                    Err(e) => {
                        warn!("failed to persist flight {}: {}", flight.hexident, e);
                        stats.persist_failures += 1;
                        if is_store_unavailable( &e) {
                            warn!("store not available, skipping remaining flights of this cycle");
                            store_available = false;
                        }
                    }
                }
            }

            if now - last.generation_time > max_age {
                info!("removing flight {} from collection", flight.hexident);
                stale.push( (flight.hexident.clone(), last.generation_time));
            }

            if flight.len() > self.config.max_history {
                stats.trimmed += self.table.trim_history( flight.hexident.as_str(), self.config.max_history).unwrap_or(0);
            }
        }

        for (hexident, last_seen) in &stale {
            match self.table.remove( hexident.as_str()) {
                Some(flight) => {
                    if flight.last_update().is_some_and( |t| t > *last_seen) {
                        warn!("flight {} was updated after cleanup snapshot, dropped newer reports", hexident);
                    }
                    stats.removed += 1;
                }
                None => {
                    warn!("flight {} not found in flight table", hexident);
                    stats.missing += 1;
                }
            }
        }

        self.table.shrink();
        stats
    }
}
