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

//! odin_flightwatch tracks aircraft reported by an SBS (BaseStation) feed, notifies through MQTT when
//! a tracked flight comes within a configured distance of a home location, and periodically persists
//! the last report of each flight to Redis.
//!
//! The [`FlightTable`] is the shared state of the system. It is written by the ingestion loop
//! ([`ingest::IngestionLoop`]) and pruned by the [`janitor::Janitor`], which run as independent tasks.

use std::{collections::VecDeque, fmt, sync::Arc};
use chrono::{DateTime,TimeDelta,Utc};
use dashmap::{DashMap, mapref::entry::Entry}; // papaya or whirlwind can be an async alternatives (once whirlwind stabilizes)

pub mod errors;
pub mod config;
pub mod report;
use report::Report;

pub mod sbs;
pub mod proximity;
pub mod notify;
use notify::NotificationState;

pub mod persist;
pub mod janitor;
pub mod ingest;
pub mod liveness;

/// default number of most recent reports we keep per flight
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// the data model for a tracked flight
#[derive(Debug,Clone)]
pub struct Flight {
    pub hexident: Arc<String>, // we keep that in an Arc so that we can clone without heap allocation
    messages: VecDeque<Arc<Report>>, // used as a ringbuffer, oldest first

    pub notification: NotificationState,
    pub last_persist: Option<DateTime<Utc>>,
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Flight( hexident: {}, n_msgs: {}", self.hexident, self.messages.len())?;
        if let (Some(cs),_) = self.resolve_callsign() { write!( f, ", cs: \"{cs}\"")?; }
        if let NotificationState::Cooldown(t) = self.notification { write!( f, ", notified: {t}")?; }
        if let Some(t) = self.last_update() { write!( f, ", time: {t}")?; }
        write!( f, ")")
    }
}

impl Flight {
    pub fn new (report: Report, max_history: usize)->Self {
        let mut messages = VecDeque::with_capacity( max_history.max(1));
        let hexident = Arc::new( report.hexident.clone());
        messages.push_back( Arc::new(report));

        Flight { hexident, messages, notification: NotificationState::Unnotified, last_persist: None }
    }

    pub fn messages (&self)->&VecDeque<Arc<Report>> { &self.messages }
    pub fn len (&self)->usize { self.messages.len() }
    pub fn is_empty (&self)->bool { self.messages.is_empty() }

    pub fn last_report (&self)->Option<&Arc<Report>> { self.messages.back() }

    /// generation time of the newest report
    pub fn last_update (&self)->Option<DateTime<Utc>> { self.messages.back().map( |r| r.generation_time) }

    /// how long ago the newest report was generated
    pub fn age (&self, now: DateTime<Utc>)->Option<TimeDelta> { self.last_update().map( |t| now - t) }

    /// append a report, dropping the oldest ones if we would exceed `max_history`.
    /// Note that this does not touch the notification state
    pub fn push_report (&mut self, report: Arc<Report>, max_history: usize) {
        let max_history = max_history.max(1);
        while self.messages.len() >= max_history {
            self.messages.pop_front();
        }
        self.messages.push_back( report);
    }

    /// keep only the `max_history` newest reports. Returns the number of dropped reports
    pub fn trim_history (&mut self, max_history: usize)->usize {
        let len = self.messages.len();
        if len > max_history {
            self.messages.drain( ..len - max_history);
            len - max_history
        } else {
            0
        }
    }

    /// scan the history newest-first for the last non-empty call sign and the last attached distance.
    /// Stops as soon as both are found
    pub fn resolve_callsign (&self)->(Option<String>,Option<f64>) {
        let mut callsign: Option<String> = None;
        let mut distance: Option<f64> = None;

        for r in self.messages.iter().rev() {
            if callsign.is_none() {
                if let Some(cs) = r.callsign() { callsign = Some(cs.to_string()) }
            }
            if distance.is_none() {
                distance = r.distance;
            }
            if callsign.is_some() && distance.is_some() { break }
        }

        (callsign, distance)
    }
}

/// the concurrent collection of flights, keyed by hexident. This is shared between the ingestion loop (writer),
/// the janitor (pruner) and the liveness reporter (reader).
///
/// All per-flight operations are executed under the shard lock of the respective key, i.e. they are atomic
/// for that key. Readers only ever get clones of flights, which means they can't observe partial updates
pub struct FlightTable {
    flights: DashMap<String,Flight>,
    max_history: usize,
}

impl FlightTable {
    pub fn new (max_history: usize)->Self {
        FlightTable { flights: DashMap::new(), max_history }
    }

    pub fn max_history (&self)->usize { self.max_history }

    /// add report to the flight with the same hexident, creating that flight if we don't know it yet.
    /// Returns true if a new flight was created
    pub fn upsert (&self, report: Report)->bool {
        match self.flights.entry( report.hexident.clone()) {
            Entry::Occupied(mut e) => {
                e.get_mut().push_report( Arc::new(report), self.max_history);
                false
            }
            Entry::Vacant(e) => {
                e.insert( Flight::new( report, self.max_history));
                true
            }
        }
    }

    /// snapshot of the flight for `hexident`, or None if we don't track it
    pub fn lookup (&self, hexident: &str)->Option<Flight> {
        self.flights.get( hexident).map( |e| e.value().clone())
    }

    pub fn contains (&self, hexident: &str)->bool {
        self.flights.contains_key( hexident)
    }

    /// remove the flight for `hexident`. Removing an unknown flight is not an error, it just returns None
    pub fn remove (&self, hexident: &str)->Option<Flight> {
        self.flights.remove( hexident).map( |(_,flight)| flight)
    }

    /// snapshot of all flights. Each flight is copied while holding its shard lock
    pub fn enumerate (&self)->Vec<Flight> {
        self.flights.iter().map( |e| e.value().clone()).collect()
    }

    pub fn len (&self)->usize { self.flights.len() }
    pub fn is_empty (&self)->bool { self.flights.is_empty() }

    /// atomic read-modify-write of a single flight. `f` must not access the table itself
    pub fn update_flight<F,R> (&self, hexident: &str, f: F)->Option<R> where F: FnOnce(&mut Flight)->R {
        self.flights.get_mut( hexident).map( |mut e| f( e.value_mut()))
    }

    /// trim history of `hexident` to the newest `max_history` reports. Returns number of dropped reports
    pub fn trim_history (&self, hexident: &str, max_history: usize)->Option<usize> {
        self.update_flight( hexident, |flight| flight.trim_history( max_history))
    }

    pub fn mark_persisted (&self, hexident: &str, date: DateTime<Utc>)->bool {
        self.update_flight( hexident, |flight| flight.last_persist = Some(date)).is_some()
    }

    /// give back memory from removed flights. This is just a hint
    pub fn shrink (&self) {
        self.flights.shrink_to_fit();
    }
}
