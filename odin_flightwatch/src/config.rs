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

//! configuration of flightwatch. Values are layered: built-in defaults, then an optional RON file,
//! then environment variables (e.g. `MQTT_DISTANCE_MAX=2.5`).
//! Durations are given as human readable strings such as "60s" or "1h"

use std::{env, fmt::Display, fs, path::Path, str::FromStr, time::Duration};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::DEFAULT_MAX_HISTORY;
use crate::errors::{Result, OdinFlightWatchError, config_error};
use crate::janitor::JanitorConfig;
use crate::sbs::SBS_PORT;

/// if this is set in the environment we run in the foreground instead of daemonizing
pub const FOREGROUND_ENV: &str = "RUNNING_IN_IDE";

lazy_static! {
    // [scheme,userinfo,rest]
    static ref URL_RE: Regex = Regex::new( r"^([A-Za-z][A-Za-z0-9+.\-]*)://(?:(.*)@)?([^@]*)$").unwrap();
}

/// replace the password of a URL with `<redacted>`, keeping scheme, user and host. Strings that are not
/// URLs or that have no credentials are returned unchanged
pub fn redact_url_password (url: &str)->String {
    if let Some(caps) = URL_RE.captures( url) {
        if let (Some(scheme), Some(userinfo), Some(rest)) = (caps.get(1), caps.get(2), caps.get(3)) {
            let user = userinfo.as_str().split_once(':').map( |(user,_)| user).unwrap_or( userinfo.as_str());
            return format!("{}://{}:<redacted>@{}", scheme.as_str(), user, rest.as_str())
        }
    }
    url.to_string()
}

#[derive(Deserialize,Debug,Clone)]
#[serde(default)]
pub struct FlightWatchConfig {
    pub redis_url: String,
    pub fa_host: String,        // host of the SBS feed, can include ":<port>"
    pub fa_port: u16,
    pub source_timezone: Tz,    // timezone in which the SBS feed reports times

    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_topic_name: String,
    pub mqtt_client_id: String,

    pub mqtt_distance_max: f64, // notification radius in miles
    pub home_latitude: f64,
    pub home_longitude: f64,

    pub log_filename: String,

    #[serde(deserialize_with="de_duration")]
    pub notify_cooldown: Duration,
    #[serde(deserialize_with="de_duration")]
    pub janitor_interval: Duration,
    #[serde(deserialize_with="de_duration")]
    pub max_flight_age: Duration,
    pub max_history: usize,

    #[serde(deserialize_with="de_duration")]
    pub io_timeout: Duration,   // for persistence and notification calls
    #[serde(deserialize_with="de_duration")]
    pub reconnect_delay: Duration,
    #[serde(deserialize_with="de_duration")]
    pub max_reconnect_delay: Duration,

    pub liveness_hours: Vec<u32>, // local hours in which we publish a liveness message
}

impl Default for FlightWatchConfig {
    fn default()->Self {
        FlightWatchConfig {
            redis_url: "redis://localhost:6379/0".into(),
            fa_host: "localhost".into(),
            fa_port: SBS_PORT,
            source_timezone: Tz::UTC,
            mqtt_host: "localhost".into(),
            mqtt_port: 1883,
            mqtt_topic_name: "flightaware/positions".into(),
            mqtt_client_id: "odin-flightwatch".into(),
            mqtt_distance_max: 1.0,
            home_latitude: 0.0,
            home_longitude: 0.0,
            log_filename: "/var/log/odin-flightwatch.log".into(),
            notify_cooldown: Duration::from_secs(60),
            janitor_interval: Duration::from_secs(60),
            max_flight_age: Duration::from_secs(3600),
            max_history: DEFAULT_MAX_HISTORY,
            io_timeout: Duration::from_secs(2),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            liveness_hours: vec![8, 20],
        }
    }
}

impl FlightWatchConfig {
    pub fn from_ron (src: &str)->Result<Self> {
        Ok( ron::from_str( src)? )
    }

    pub fn from_ron_file (path: &Path)->Result<Self> {
        let src = fs::read_to_string( path)?;
        Self::from_ron( src.as_str())
    }

    /// defaults, overridden by the optional RON file, overridden by the process environment
    pub fn load (path: Option<&Path>)->Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_ron_file( path)?,
            None => Self::default()
        };
        config.apply_env( |key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// override fields with values obtained from `lookup`, which maps variable names to (optional) values
    pub fn apply_env<F> (&mut self, lookup: F)->Result<()> where F: Fn(&str)->Option<String> {
        env_value( &lookup, "REDIS_URL", &mut self.redis_url)?;
        env_value( &lookup, "FA_HOST", &mut self.fa_host)?;
        env_value( &lookup, "FA_PORT", &mut self.fa_port)?;
        env_value( &lookup, "SOURCE_TIMEZONE", &mut self.source_timezone)?;
        env_value( &lookup, "MQTT_HOST", &mut self.mqtt_host)?;
        env_value( &lookup, "MQTT_PORT", &mut self.mqtt_port)?;
        env_value( &lookup, "MQTT_TOPIC_NAME", &mut self.mqtt_topic_name)?;
        env_value( &lookup, "MQTT_CLIENT_ID", &mut self.mqtt_client_id)?;
        env_value( &lookup, "MQTT_DISTANCE_MAX", &mut self.mqtt_distance_max)?;
        env_value( &lookup, "HOME_LATITUDE", &mut self.home_latitude)?;
        env_value( &lookup, "HOME_LONGITUDE", &mut self.home_longitude)?;
        env_value( &lookup, "LOG_FILENAME", &mut self.log_filename)?;
        env_duration( &lookup, "NOTIFY_COOLDOWN", &mut self.notify_cooldown)?;
        env_duration( &lookup, "JANITOR_INTERVAL", &mut self.janitor_interval)?;
        env_duration( &lookup, "MAX_FLIGHT_AGE", &mut self.max_flight_age)?;
        env_value( &lookup, "MAX_HISTORY", &mut self.max_history)?;
        env_duration( &lookup, "IO_TIMEOUT", &mut self.io_timeout)?;
        env_duration( &lookup, "RECONNECT_DELAY", &mut self.reconnect_delay)?;
        env_duration( &lookup, "MAX_RECONNECT_DELAY", &mut self.max_reconnect_delay)?;

        if let Some(v) = lookup("LIVENESS_HOURS") {
            self.liveness_hours = v.split(',')
                .map( |h| h.trim())
                .filter( |h| !h.is_empty())
                .map( |h| h.parse::<u32>().map_err( |e| config_error!("invalid LIVENESS_HOURS '{}': {}", v, e)))
                .collect::<Result<Vec<u32>>>()?;
        }
        Ok(())
    }

    pub fn validate (&self)->Result<()> {
        if !(-90.0..=90.0).contains( &self.home_latitude) {
            return Err( config_error!("home latitude out of range: {}", self.home_latitude))
        }
        if !(-180.0..=180.0).contains( &self.home_longitude) {
            return Err( config_error!("home longitude out of range: {}", self.home_longitude))
        }
        if !(self.mqtt_distance_max >= 0.0) {
            return Err( config_error!("invalid notification distance: {}", self.mqtt_distance_max))
        }
        if self.max_history == 0 {
            return Err( config_error!("max_history has to be positive"))
        }
        if let Some(h) = self.liveness_hours.iter().find( |h| **h > 23) {
            return Err( config_error!("invalid liveness hour: {}", h))
        }
        Ok(())
    }

    /// "host:port" of the SBS feed
    pub fn source_addr (&self)->String {
        if self.fa_host.contains(':') { self.fa_host.clone() } else { format!("{}:{}", self.fa_host, self.fa_port) }
    }

    pub fn janitor_config (&self)->JanitorConfig {
        JanitorConfig {
            interval: self.janitor_interval,
            max_age: self.max_flight_age,
            max_history: self.max_history,
            io_timeout: self.io_timeout,
        }
    }
}

fn env_value<F,T> (lookup: &F, key: &str, target: &mut T)->Result<()>
    where F: Fn(&str)->Option<String>, T: FromStr, T::Err: Display
{
    if let Some(v) = lookup(key) {
        *target = v.trim().parse::<T>().map_err( |e| config_error!("invalid {} '{}': {}", key, v, e))?;
    }
    Ok(())
}

fn env_duration<F> (lookup: &F, key: &str, target: &mut Duration)->Result<()> where F: Fn(&str)->Option<String> {
    if let Some(v) = lookup(key) {
        *target = parse_duration::parse( v.trim()).map_err( |e| config_error!("invalid {} '{}': {}", key, v, e))?;
    }
    Ok(())
}

fn de_duration<'a,D> (deserializer: D)->std::result::Result<Duration,D::Error> where D: Deserializer<'a> {
    let s = String::deserialize( deserializer)?;
    parse_duration::parse( s.as_str()).map_err( serde::de::Error::custom)
}
