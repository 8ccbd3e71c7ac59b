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

//! heartbeat that tells subscribers of the notification topic we are still alive

use std::{sync::Arc, time::Duration};
use chrono::{Local,Timelike};
use tokio::time::sleep;
use tracing::{info,warn};

use crate::FlightTable;
use crate::notify::{Notifier, publish_with_timeout};

const CHECK_INTERVAL: Duration = Duration::from_secs(60);
const SLOT_DURATION: Duration = Duration::from_secs(3600);

pub fn liveness_payload (n_flights: usize)->String {
    format!("{} Flts", n_flights)
}

/// publish the number of tracked flights once within each of the given (local) hours. This only reads the table size
pub async fn run_liveness<N> (table: Arc<FlightTable>, notifier: Arc<N>, hours: Vec<u32>, io_timeout: Duration)
    where N: Notifier + ?Sized
{
    loop {
        if hours.contains( &Local::now().hour()) {
            let payload = liveness_payload( table.len());
            match publish_with_timeout( notifier.as_ref(), payload.as_str(), io_timeout).await {
                Ok(()) => info!("published liveness message '{}'", payload),
                Err(e) => warn!("failed to publish liveness message: {}", e)
            }
            sleep( SLOT_DURATION).await; // don't publish twice in the same hour
        } else {
            sleep( CHECK_INTERVAL).await;
        }
    }
}
