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

use std::{sync::Mutex, time::Duration};
use async_trait::async_trait;
use chrono::{DateTime,TimeDelta,Utc};
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tokio::{task::JoinHandle, time::{sleep,timeout}};
use tracing::{debug,warn};

use crate::FlightTable;
use crate::errors::{Result,OdinFlightWatchError};

/* #region notification gate ***************************************************************************/

/// per-flight notification state
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum NotificationState {
    Unnotified,
    Cooldown(DateTime<Utc>), // last time we sent a notification for this flight
}

/// what we send out if a tracked flight comes close
#[derive(Debug,Clone,PartialEq)]
pub struct Notification {
    pub hexident: String,
    pub callsign: String,
    pub distance: Option<f64>, // last known distance in miles (if any)
}

impl Notification {
    pub fn payload (&self)->&str { self.callsign.trim() }
}

/// outcome of a [`NotificationGate::evaluate`] call
#[derive(Debug,Clone,PartialEq)]
pub enum GateDecision {
    Fire(Notification),
    CoolingDown(TimeDelta), // remaining cooldown
    Duplicate(String),      // same content as the last notification we sent
    NoCallsign,
    Untracked,
}

/// decides if a proximity event for a tracked flight should produce a notification.
///
/// The time-level dedup is per flight (cooldown since the last notification of that flight), the content
/// level dedup is global (we never send the same call sign twice in a row). Evaluation and state transition
/// happen under the table lock of the respective flight
pub struct NotificationGate {
    cooldown: TimeDelta,
    last_sent: Mutex<Option<String>>,
}

impl NotificationGate {
    pub fn new (cooldown: Duration)->Self {
        let cooldown = TimeDelta::from_std( cooldown).unwrap_or( TimeDelta::MAX);
        NotificationGate { cooldown, last_sent: Mutex::new(None) }
    }

    pub fn cooldown (&self)->TimeDelta { self.cooldown }

    /// the payload of the last notification we fired
    pub fn last_sent (&self)->Option<String> {
        match self.last_sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone()
        }
    }

    pub fn evaluate (&self, table: &FlightTable, hexident: &str, now: DateTime<Utc>)->GateDecision {
        table.update_flight( hexident, |flight| {
            if let NotificationState::Cooldown(t) = flight.notification {
                let elapsed = now - t;
                if elapsed < self.cooldown {
                    return GateDecision::CoolingDown( self.cooldown - elapsed)
                }
            }

            let (callsign, distance) = flight.resolve_callsign();
            let Some(callsign) = callsign else {
                return GateDecision::NoCallsign
            };

            let mut last_sent = match self.last_sent.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner()
            };
            if last_sent.as_deref() == Some( callsign.as_str()) {
                return GateDecision::Duplicate( callsign)
            }

            *last_sent = Some( callsign.clone());
            flight.notification = NotificationState::Cooldown(now);

            GateDecision::Fire( Notification { hexident: flight.hexident.to_string(), callsign, distance } )
        }).unwrap_or( GateDecision::Untracked)
    }
}

/* #endregion notification gate */

/* #region notifier ************************************************************************************/

/// the outbound notification transport
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish (&self, payload: &str)->Result<()>;
}

/// publish with an upper bound on how long we wait for the transport
pub async fn publish_with_timeout<N> (notifier: &N, payload: &str, max_wait: Duration)->Result<()> where N: Notifier + ?Sized {
    match timeout( max_wait, notifier.publish( payload)).await {
        Ok(res) => res,
        Err(_) => Err( OdinFlightWatchError::TimeoutError(max_wait))
    }
}

/// [`Notifier`] that publishes to a single MQTT topic.
/// The connection is kept (and re-established) by a background task that drives the rumqttc event loop
pub struct MqttNotifier {
    client: AsyncClient,
    topic: String,
    task: JoinHandle<()>,
}

impl MqttNotifier {
    /// this has to be called from within a tokio runtime
    pub fn new (client_id: &str, host: &str, port: u16, topic: &str)->Self {
        let mut opts = MqttOptions::new( client_id, host, port);
        opts.set_keep_alive( Duration::from_secs(30));

        let (client, mut eventloop) = AsyncClient::new( opts, 16);
        let task = tokio::spawn( async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => debug!("MQTT event {:?}", event),
                    Err(e) => {
                        warn!("MQTT connection error: {}", e);
                        sleep( Duration::from_secs(5)).await;
                    }
                }
            }
        });

        MqttNotifier { client, topic: topic.to_string(), task }
    }

    pub fn topic (&self)->&str { self.topic.as_str() }
}

impl Drop for MqttNotifier {
    fn drop (&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl Notifier for MqttNotifier {
    async fn publish (&self, payload: &str)->Result<()> {
        self.client.publish( self.topic.as_str(), QoS::AtLeastOnce, false, payload.as_bytes().to_vec()).await?;
        Ok(())
    }
}

/* #endregion notifier */
