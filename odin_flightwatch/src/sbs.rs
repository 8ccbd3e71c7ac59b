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

use std::{str::FromStr, time::Duration};
use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use tokio::{net::TcpStream, io::{BufReader, AsyncBufReadExt, Lines}, time::timeout};

use crate::errors::{Result, OdinFlightWatchError, parse_error};
use crate::ingest::{MessageSource, MessageConnection, ReportDecoder};
use crate::report::Report;

/// default BaseStation port of dump1090 and the FlightAware feeder
pub const SBS_PORT: u16 = 30003;

const MESSAGE_TYPES: &[&str] = &["MSG", "SEL", "ID", "AIR", "STA", "CLK"];

/// [`MessageSource`] that reads SBS lines from a BaseStation TCP socket
pub struct SbsSocketSource {
    addr: String,
    connect_timeout: Duration,
}

impl SbsSocketSource {
    pub fn new (addr: impl ToString, connect_timeout: Duration)->Self {
        SbsSocketSource { addr: addr.to_string(), connect_timeout }
    }

    pub fn addr (&self)->&str { self.addr.as_str() }
}

pub struct SbsConnection {
    lines: Lines<BufReader<TcpStream>>,
}

#[async_trait]
impl MessageSource for SbsSocketSource {
    type Connection = SbsConnection;

    async fn connect (&mut self)->Result<SbsConnection> {
        let stream = match timeout( self.connect_timeout, TcpStream::connect( self.addr.as_str())).await {
            Ok(res) => res?,
            Err(_) => return Err( OdinFlightWatchError::TimeoutError( self.connect_timeout))
        };
        let reader = BufReader::with_capacity( 8192, stream);
        Ok( SbsConnection { lines: reader.lines() } )
    }

    fn name (&self)->&str { self.addr.as_str() }
}

#[async_trait]
impl MessageConnection for SbsConnection {
    async fn next_line (&mut self)->Result<Option<String>> {
        Ok( self.lines.next_line().await? )
    }
}

/// [`ReportDecoder`] for SBS lines that were generated in the given timezone
pub struct SbsDecoder {
    source_tz: Tz
}

impl SbsDecoder {
    pub fn new (source_tz: Tz)->Self { SbsDecoder { source_tz } }
}

impl ReportDecoder for SbsDecoder {
    fn decode (&self, line: &str)->Result<Report> {
        parse_report( line, &self.source_tz)
    }
}

/// SBS as documented on http://woodair.net/SBS/Article/Barebones42_Socket_Data.htm
///
/// Message examples:
///  MSG,1,111,11111,AA2BC2,111111,2016/03/11,13:07:16.663,2016/03/11,13:07:16.626,UAL814  ,,,,,,,,,,,0
///  MSG,3,111,11111,A04424,111111,2016/03/11,13:07:05.343,2016/03/11,13:07:05.288,,11025,,,37.17274,-122.03935,,,,,,0
///  MSG,4,111,11111,AC1FCC,111111,2016/03/11,13:07:07.777,2016/03/11,13:07:07.713,,,316,106,,,1536,,,,,0
///
/// fields:
///   0: message type (MSG, SEL, ID, AIR, STA, CLK)
///   1: transmission type (MSG only: 1-8, 3: ES Airborne Position Message)
///   2: DB session id   - '111' for dump1090 generated SBS
///   3: DB aircraft id  - '11111' for dump1090 generated SBS
///   4: ICAO 24 bit id (mode S transponder code)
///   5: DB flight id - '111111' for dump1090 generated SBS
///   6: date generated
///   7: time generated
///   8: date logged
///   9: time logged
///  10: callsign
///  11: mode-C altitude (relative to 1013.2mb (Flight Level), *not* AMSL)
///  12: ground speed
///  13: track (from vx,vy, *not* heading)
///  14: latitude
///  15: longitude
///  16: vertical rate (ft/min - 64ft resolution)
///  17: squawk (mode-A squawk code)
///  18: alert (flag indicating squawk has changed)
///  19: emergency (flag)
///  20: spi (flag, transponder ident activated)
///  21: on ground (flag)
///
/// unlike the position-only ADS-B updates we keep all fields since they are persisted
pub fn parse_report (line: &str, source_tz: &Tz)->Result<Report> {
    let fields: Vec<&str> = line.trim_end().split(',').collect();
    if fields.len() < 10 {
        return Err( parse_error!( "missing common fields in SBS message: {}", line))
    }

    let message_type = fields[0].trim();
    if !MESSAGE_TYPES.contains( &message_type) {
        return Err( parse_error!( "unknown SBS message type: {}", line))
    }

    let hexident = fields[4].trim();
    if hexident.is_empty() {
        return Err( parse_error!( "missing hexident in SBS message: {}", line))
    }

    let generation_time = get_utc_datetime( fields[6].trim(), fields[7].trim(), source_tz)?;
    let mut report = Report::new( message_type, hexident, generation_time);

    let date_logged = fields[8].trim();
    let time_logged = fields[9].trim();
    if !date_logged.is_empty() && !time_logged.is_empty() {
        report.record_time = Some( get_utc_datetime( date_logged, time_logged, source_tz)?);
    }

    report.transmission_type = num_field( &fields, 1)?;
    report.session_id = str_field( &fields, 2);
    report.aircraft_id = str_field( &fields, 3);
    report.flight_id = str_field( &fields, 5);
    report.callsign = str_field( &fields, 10);
    report.altitude = num_field( &fields, 11)?;
    report.ground_speed = num_field( &fields, 12)?;
    report.track = num_field( &fields, 13)?;
    report.latitude = num_field( &fields, 14)?;
    report.longitude = num_field( &fields, 15)?;
    report.vertical_rate = num_field( &fields, 16)?;
    report.squawk = str_field( &fields, 17);
    report.alert = flag_field( &fields, 18)?;
    report.emergency = flag_field( &fields, 19)?;
    report.spi = flag_field( &fields, 20)?;
    report.on_ground = flag_field( &fields, 21)?;

    Ok(report)
}

// note that dump1090 does report time in local timezone, i.e. we have to convert to UTC
fn get_utc_datetime (date: &str, time: &str, tz: &Tz)->Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str( date, "%Y/%m/%d")?;
    let time = NaiveTime::parse_from_str( time, "%H:%M:%S%.f")?;

    let dt = match tz.from_local_datetime( &date.and_time(time)) {
        chrono::offset::LocalResult::Single(dt) => dt,
        chrono::offset::LocalResult::Ambiguous(_, dt2) => dt2, // we don't care about that precision
        chrono::offset::LocalResult::None => return Err( OdinFlightWatchError::OpFailedError("forward time jump cannot be mapped to UTC".into())),
    };
    Ok( dt.with_timezone( &Utc) )
}

fn raw_field<'a> (fields: &[&'a str], idx: usize)->Option<&'a str> {
    fields.get(idx).map( |s| s.trim()).filter( |s| !s.is_empty())
}

fn str_field (fields: &[&str], idx: usize)->Option<String> {
    raw_field( fields, idx).map( |s| s.to_string())
}

fn num_field<T: FromStr> (fields: &[&str], idx: usize)->Result<Option<T>> {
    match raw_field( fields, idx) {
        Some(s) => s.parse::<T>().map(Some).map_err( |_| parse_error!( "invalid number in SBS field {}: '{}'", idx, s)),
        None => Ok(None)
    }
}

// dump1090 uses -1 for a set flag, BaseStation uses 1
fn flag_field (fields: &[&str], idx: usize)->Result<Option<bool>> {
    match raw_field( fields, idx) {
        Some("0") => Ok(Some(false)),
        Some("1") | Some("-1") => Ok(Some(true)),
        Some(s) => Err( parse_error!( "invalid flag in SBS field {}: '{}'", idx, s)),
        None => Ok(None)
    }
}
