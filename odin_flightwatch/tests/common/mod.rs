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

#![allow(unused)]

use std::{collections::{HashMap,VecDeque}, sync::{Arc,Mutex}, time::Duration};
use async_trait::async_trait;
use chrono::{DateTime,TimeDelta,TimeZone,Utc};

use odin_flightwatch::{
    FlightTable,
    errors::{OdinFlightWatchError, Result},
    ingest::{MessageConnection, MessageSource},
    notify::Notifier,
    persist::FlightStore,
    report::{FieldRecord, Report},
};

//--- test data

pub const HOME_LAT: f64 = 37.4;
pub const HOME_LON: f64 = -122.0;

pub fn t0 ()->DateTime<Utc> {
    Utc.with_ymd_and_hms( 2025, 3, 11, 13, 7, 0).unwrap()
}

pub fn secs (n: i64)->TimeDelta { TimeDelta::seconds(n) }

/// airborne position report that is about 0.7mi north of home
pub fn near_report (hexident: &str, t: DateTime<Utc>)->Report {
    Report::new( "MSG", hexident, t).with_position( HOME_LAT + 0.01, HOME_LON).with_altitude( 3000).with_on_ground( false)
}

/// airborne position report that is about 70mi north of home
pub fn far_report (hexident: &str, t: DateTime<Utc>)->Report {
    Report::new( "MSG", hexident, t).with_position( HOME_LAT + 1.0, HOME_LON).with_altitude( 30000).with_on_ground( false)
}

pub fn callsign_report (hexident: &str, callsign: &str, t: DateTime<Utc>)->Report {
    Report::new( "MSG", hexident, t).with_callsign( callsign).with_on_ground( false)
}

//--- notifier doubles

/// records everything that gets published
#[derive(Default)]
pub struct RecordingNotifier {
    pub published: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn published (&self)->Vec<String> { self.published.lock().unwrap().clone() }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish (&self, payload: &str)->Result<()> {
        self.published.lock().unwrap().push( payload.to_string());
        Ok(())
    }
}

/// a transport that is down
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn publish (&self, _payload: &str)->Result<()> {
        Err( OdinFlightWatchError::OpFailedError("broker not reachable".into()))
    }
}

//--- store doubles

#[derive(Default)]
pub struct MemoryStore {
    pub records: Mutex<HashMap<String,FieldRecord>>,
}

impl MemoryStore {
    pub fn get (&self, key: &str)->Option<FieldRecord> { self.records.lock().unwrap().get(key).cloned() }
    pub fn len (&self)->usize { self.records.lock().unwrap().len() }
}

#[async_trait]
impl FlightStore for MemoryStore {
    async fn store (&self, key: &str, record: &FieldRecord)->Result<()> {
        self.records.lock().unwrap().insert( key.to_string(), record.clone());
        Ok(())
    }
}

/// a store that is down (every call times out), counting how often we tried
#[derive(Default)]
pub struct UnavailableStore {
    pub attempts: Mutex<usize>,
}

#[async_trait]
impl FlightStore for UnavailableStore {
    async fn store (&self, _key: &str, _record: &FieldRecord)->Result<()> {
        *self.attempts.lock().unwrap() += 1;
        Err( OdinFlightWatchError::TimeoutError( Duration::from_secs(1)))
    }
}

/// a store that rejects records for a single key (e.g. a key holding a value of the wrong type)
pub struct RejectingStore {
    pub rejected: String,
    pub inner: MemoryStore,
}

impl RejectingStore {
    pub fn new (rejected: &str)->Self {
        RejectingStore { rejected: rejected.to_string(), inner: MemoryStore::default() }
    }
}

#[async_trait]
impl FlightStore for RejectingStore {
    async fn store (&self, key: &str, record: &FieldRecord)->Result<()> {
        if key == self.rejected {
            Err( OdinFlightWatchError::OpFailedError("WRONGTYPE Operation against a key holding the wrong kind of value".into()))
        } else {
            self.inner.store( key, record).await
        }
    }
}

/// a store that modifies the table while a flight is persisted, to simulate the ingestion loop
/// running concurrently with the janitor
pub struct RacingStore {
    pub table: Arc<FlightTable>,
    pub newer: Option<Report>, // if set we upsert this, otherwise we remove the flight
}

#[async_trait]
impl FlightStore for RacingStore {
    async fn store (&self, key: &str, _record: &FieldRecord)->Result<()> {
        match &self.newer {
            Some(report) if report.hexident == key => { self.table.upsert( report.clone()); }
            Some(_) => {}
            None => { self.table.remove( key); }
        }
        Ok(())
    }
}

//--- message source doubles

/// a source with a scripted sequence of connections. Once the script is exhausted connects fail
pub struct ScriptedSource {
    pub sessions: VecDeque<Vec<String>>,
    pub connects: usize,
}

impl ScriptedSource {
    pub fn new (sessions: Vec<Vec<&str>>)->Self {
        let sessions: VecDeque<Vec<String>> = sessions.into_iter().map( |s| s.into_iter().map( |l| l.to_string()).collect()).collect();
        ScriptedSource { sessions, connects: 0 }
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    type Connection = ScriptedConnection;

    async fn connect (&mut self)->Result<ScriptedConnection> {
        self.connects += 1;
        match self.sessions.pop_front() {
            Some(lines) => Ok( ScriptedConnection { lines: lines.into() }),
            None => Err( OdinFlightWatchError::OpFailedError("no more sessions".into()))
        }
    }

    fn name (&self)->&str { "scripted" }
}

pub struct ScriptedConnection {
    lines: VecDeque<String>,
}

impl ScriptedConnection {
    pub fn new (lines: &[&str])->Self {
        ScriptedConnection { lines: lines.iter().map( |l| l.to_string()).collect() }
    }
}

#[async_trait]
impl MessageConnection for ScriptedConnection {
    async fn next_line (&mut self)->Result<Option<String>> {
        Ok( self.lines.pop_front())
    }
}
