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
use async_trait::async_trait;
use chrono::{DateTime,Utc};
use tokio::time::sleep;
use tracing::{debug,error,info,warn};

use crate::FlightTable;
use crate::errors::Result;
use crate::notify::{GateDecision, Notification, NotificationGate, Notifier, publish_with_timeout};
use crate::proximity::ProximityEvaluator;
use crate::report::Report;

/// number of merged position reports between progress log entries
const PROGRESS_INTERVAL: u64 = 10_000;

/* #region message source *******************************************************************************/

/// where we get raw report lines from. Each `connect` opens a new, scoped connection
#[async_trait]
pub trait MessageSource: Send {
    type Connection: MessageConnection;

    async fn connect (&mut self)->Result<Self::Connection>;

    /// for logging purposes
    fn name (&self)->&str;
}

/// an open connection of a [`MessageSource`]. `Ok(None)` means the connection is exhausted
#[async_trait]
pub trait MessageConnection: Send {
    async fn next_line (&mut self)->Result<Option<String>>;
}

/// turns a raw line into a [`Report`]
pub trait ReportDecoder: Send + Sync {
    fn decode (&self, line: &str)->Result<Report>;
}

/// exponential reconnect delay
#[derive(Debug,Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new (min: Duration, max: Duration)->Self {
        let max = max.max(min);
        Backoff { min, max, current: min }
    }

    /// the delay to wait now. Each call doubles the next delay up to `max`
    pub fn next_delay (&mut self)->Duration {
        let delay = self.current;
        self.current = (self.current * 2).min( self.max);
        delay
    }

    pub fn reset (&mut self) { self.current = self.min; }
}

/* #endregion message source */

/* #region ingestion loop *******************************************************************************/

/// what happened to a single report
#[derive(Debug,Clone,PartialEq)]
pub enum ReportOutcome {
    OnGround,
    NoSignal,
    PartialPosition,
    Merged,                  // call sign only, or not close enough
    InRange(GateDecision),   // within proximity radius, with respective gate decision
}

/// the hot path: filters reports, evaluates proximity, consults the [`NotificationGate`] and merges
/// reports into the [`FlightTable`]
pub struct IngestionLoop<N> where N: Notifier + ?Sized {
    table: Arc<FlightTable>,
    evaluator: ProximityEvaluator,
    gate: Arc<NotificationGate>,
    notifier: Arc<N>,
    io_timeout: Duration,
    msg_count: u64,
}

impl<N> IngestionLoop<N> where N: Notifier + ?Sized {
    pub fn new (table: Arc<FlightTable>, evaluator: ProximityEvaluator, gate: Arc<NotificationGate>, notifier: Arc<N>, io_timeout: Duration)->Self {
        IngestionLoop { table, evaluator, gate, notifier, io_timeout, msg_count: 0 }
    }

    /// number of merged position reports
    pub fn msg_count (&self)->u64 { self.msg_count }

    pub async fn process_report (&mut self, mut report: Report, now: DateTime<Utc>)->ReportOutcome {
        if report.is_on_ground() {
            return ReportOutcome::OnGround
        }
        if !report.has_signal() {
            return ReportOutcome::NoSignal
        }

        let outcome = match self.evaluator.evaluate( &mut report) {
            Some(distance) => {
                // notifications require an established track, i.e. we check *before* we merge
                if self.evaluator.is_within( distance) && self.table.contains( report.hexident.as_str()) {
                    let decision = self.gate.evaluate( &self.table, report.hexident.as_str(), now);
                    match &decision {
                        GateDecision::Fire(notification) => self.send( notification).await,
                        GateDecision::CoolingDown(remaining) => info!("flight {} already notified, skipping for another {}s", report.hexident, remaining.num_seconds()),
                        GateDecision::Duplicate(cs) => debug!("flight {} suppressed duplicate notification '{}'", report.hexident, cs),
                        GateDecision::NoCallsign => debug!("flight {} in range without known call sign", report.hexident),
                        GateDecision::Untracked => warn!("flight {} removed while evaluating notification", report.hexident),
                    }
                    ReportOutcome::InRange( decision)
                } else {
                    ReportOutcome::Merged
                }
            }
            None => {
                // call sign only reports never trigger a proximity evaluation
                if report.callsign().is_none() {
                    return ReportOutcome::PartialPosition
                }
                ReportOutcome::Merged
            }
        };

        let hexident = report.hexident.clone();
        let has_position = report.position().is_some();
        self.table.upsert( report);
        if has_position {
            self.count_report( hexident.as_str());
        }

        outcome
    }

    async fn send (&self, notification: &Notification) {
        let payload = notification.payload();
        info!("queue notification for {} call_sign='{}' dist={:?}", notification.hexident, payload, notification.distance);

        if let Err(e) = publish_with_timeout( self.notifier.as_ref(), payload, self.io_timeout).await {
            warn!("failed to publish notification for {}: {}", notification.hexident, e);
        }
    }

    fn count_report (&mut self, hexident: &str) {
        self.msg_count += 1;
        if self.msg_count % PROGRESS_INTERVAL == 0 {
            let (callsign, distance) = self.table.lookup( hexident).map( |f| f.resolve_callsign()).unwrap_or((None,None));
            info!("{} {} recorded. last_dist={:.2} call_sign={:?}", self.msg_count, hexident, distance.unwrap_or(-1.0), callsign);
        }
    }

    /// decode and process one raw line. Undecodable lines are skipped
    pub async fn process_line<D> (&mut self, decoder: &D, line: &str)->Option<ReportOutcome> where D: ReportDecoder + ?Sized {
        match decoder.decode( line) {
            Ok(report) => Some( self.process_report( report, Utc::now()).await),
            Err(e) => {
                debug!("skipping undecodable line '{}': {}", line, e);
                None
            }
        }
    }

    /// process all lines of one connection. Returns when the connection is exhausted or fails
    pub async fn consume<C,D> (&mut self, conn: &mut C, decoder: &D)->Result<()>
        where C: MessageConnection + ?Sized, D: ReportDecoder + ?Sized
    {
        while let Some(line) = conn.next_line().await? {
            self.process_line( decoder, line.as_str()).await;
        }
        Ok(())
    }

    /// run forever, (re-)connecting to `source` with exponential backoff. The flight table is kept across reconnects
    pub async fn run_supervised<S,D> (&mut self, mut source: S, decoder: &D, mut backoff: Backoff)
        where S: MessageSource, D: ReportDecoder + ?Sized
    {
        loop {
            match source.connect().await {
                Ok(mut conn) => {
                    info!("connected to message source {}", source.name());
                    backoff.reset();

                    match self.consume( &mut conn, decoder).await {
                        Ok(()) => info!("message source {} exhausted, reconnecting", source.name()),
                        Err(e) => error!("error reading from message source {}: {}", source.name(), e)
                    }
                }
                Err(e) => warn!("failed to connect to message source {}: {}", source.name(), e)
            }

            let delay = backoff.next_delay();
            debug!("reconnecting in {:?}", delay);
            sleep( delay).await;
        }
    }
}

/* #endregion ingestion loop */
