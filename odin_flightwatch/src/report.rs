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

use std::{collections::BTreeMap, fmt};
use chrono::{DateTime,Utc};

/// the format we use to store datetime fields as text
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// the names of all fields a [`Report`] can project into a persisted record, in SBS field order.
/// Optional fields without a value are omitted from the record
pub const RECORD_FIELDS: &[&str] = &[
    "message_type", "transmission_type", "session_id", "aircraft_id", "hexident", "flight_id",
    "generation_time", "record_time", "callsign", "altitude", "ground_speed", "track",
    "latitude", "longitude", "vertical_rate", "squawk", "alert", "emergency", "spi", "on_ground",
    "distance"
];

/// flat field->value mapping as it is written to the persistence backend
pub type FieldRecord = BTreeMap<&'static str,String>;

/// one decoded SBS telemetry message for a single aircraft
#[derive(Debug,Clone,PartialEq)]
pub struct Report {
    pub message_type: String,          // MSG, SEL, ID, AIR, STA, CLK
    pub transmission_type: Option<u8>, // MSG only: 1-8
    pub session_id: Option<String>,
    pub aircraft_id: Option<String>,
    pub hexident: String,              // ICAO 24 bit transponder code - our flight key
    pub flight_id: Option<String>,
    pub generation_time: DateTime<Utc>,
    pub record_time: Option<DateTime<Utc>>,
    pub callsign: Option<String>,
    pub altitude: Option<i64>,         // mode-C altitude in ft
    pub ground_speed: Option<f64>,     // kn
    pub track: Option<f64>,            // deg
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vertical_rate: Option<i64>,    // ft/min
    pub squawk: Option<String>,        // keep leading zeros
    pub alert: Option<bool>,
    pub emergency: Option<bool>,
    pub spi: Option<bool>,
    pub on_ground: Option<bool>,

    pub distance: Option<f64>,         // miles from home, attached by the ingestion loop
}

impl Report {
    pub fn new (message_type: impl ToString, hexident: impl ToString, generation_time: DateTime<Utc>)->Self {
        Report {
            message_type: message_type.to_string(),
            transmission_type: None,
            session_id: None,
            aircraft_id: None,
            hexident: hexident.to_string(),
            flight_id: None,
            generation_time,
            record_time: None,
            callsign: None,
            altitude: None,
            ground_speed: None,
            track: None,
            latitude: None,
            longitude: None,
            vertical_rate: None,
            squawk: None,
            alert: None,
            emergency: None,
            spi: None,
            on_ground: None,
            distance: None
        }
    }

    pub fn with_position (mut self, latitude: f64, longitude: f64)->Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_callsign (mut self, callsign: impl ToString)->Self {
        self.callsign = Some(callsign.to_string());
        self
    }

    pub fn with_altitude (mut self, altitude: i64)->Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_on_ground (mut self, on_ground: bool)->Self {
        self.on_ground = Some(on_ground);
        self
    }

    /// the trimmed call sign, or None if there is none or it is blank
    pub fn callsign (&self)->Option<&str> {
        self.callsign.as_deref().map(str::trim).filter( |cs| !cs.is_empty())
    }

    /// both coordinates if this report has a full position
    pub fn position (&self)->Option<(f64,f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat,lon)),
            _ => None
        }
    }

    pub fn is_on_ground (&self)->bool { self.on_ground.unwrap_or(false) }

    /// does this report carry anything we track (coordinates or call sign)
    pub fn has_signal (&self)->bool {
        self.latitude.is_some() || self.longitude.is_some() || self.callsign().is_some()
    }

    /// project this report into a flat record: datetimes as text, booleans as 1/0, unset fields omitted
    pub fn to_record (&self)->FieldRecord {
        let mut rec = FieldRecord::new();

        rec.insert( "message_type", self.message_type.clone());
        put( &mut rec, "transmission_type", &self.transmission_type);
        put( &mut rec, "session_id", &self.session_id);
        put( &mut rec, "aircraft_id", &self.aircraft_id);
        rec.insert( "hexident", self.hexident.clone());
        put( &mut rec, "flight_id", &self.flight_id);
        rec.insert( "generation_time", format_time( &self.generation_time));
        if let Some(t) = &self.record_time { rec.insert( "record_time", format_time(t)); }
        put( &mut rec, "callsign", &self.callsign);
        put( &mut rec, "altitude", &self.altitude);
        put( &mut rec, "ground_speed", &self.ground_speed);
        put( &mut rec, "track", &self.track);
        put( &mut rec, "latitude", &self.latitude);
        put( &mut rec, "longitude", &self.longitude);
        put( &mut rec, "vertical_rate", &self.vertical_rate);
        put( &mut rec, "squawk", &self.squawk);
        put_flag( &mut rec, "alert", self.alert);
        put_flag( &mut rec, "emergency", self.emergency);
        put_flag( &mut rec, "spi", self.spi);
        put_flag( &mut rec, "on_ground", self.on_ground);
        put( &mut rec, "distance", &self.distance);

        rec
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Report( {} {}", self.message_type, self.hexident)?;
        if let Some(tt) = self.transmission_type { write!( f, ",{tt}")?; }
        if let Some(cs) = self.callsign() { write!( f, ", cs: \"{cs}\"")?; }
        if let Some((lat,lon)) = self.position() { write!( f, ", pos: ({lat:.5},{lon:.5})")?; }
        if let Some(alt) = self.altitude { write!( f, ", alt: {alt}")?; }
        if let Some(dist) = self.distance { write!( f, ", dist: {dist:.2}")?; }
        if self.is_on_ground() { write!( f, ", on_ground")?; }
        write!( f, ", time: {})", self.generation_time.format( RECORD_TIME_FORMAT))
    }
}

pub fn format_time (dt: &DateTime<Utc>)->String {
    dt.format( RECORD_TIME_FORMAT).to_string()
}

fn put<T: ToString> (rec: &mut FieldRecord, name: &'static str, v: &Option<T>) {
    if let Some(v) = v {
        rec.insert( name, v.to_string());
    }
}

fn put_flag (rec: &mut FieldRecord, name: &'static str, v: Option<bool>) {
    if let Some(b) = v {
        rec.insert( name, if b { "1".to_string() } else { "0".to_string() });
    }
}
