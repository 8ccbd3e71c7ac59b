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

mod common;
use common::*;

use std::{sync::Arc, time::Duration};
use chrono_tz::Tz;
use odin_flightwatch::{
    FlightTable,
    ingest::{Backoff, IngestionLoop, ReportOutcome},
    notify::{GateDecision, NotificationGate, Notifier},
    proximity::ProximityEvaluator,
    report::Report,
    sbs::SbsDecoder,
};

//--- test data (home at 37.4,-122.0)
const SBS_CALLSIGN: &str = "MSG,1,111,11111,A04424,111111,2025/03/11,13:07:16.663,2025/03/11,13:07:16.626,UAL814  ,,,,,,,,,,,0";
const SBS_NEAR: &str     = "MSG,3,111,11111,A04424,111111,2025/03/11,13:07:17.343,2025/03/11,13:07:17.288,,3000,,,37.40500,-122.00000,,,,,,0";
const SBS_FAR: &str      = "MSG,3,111,11111,AC1FCC,111111,2025/03/11,13:07:17.777,2025/03/11,13:07:17.713,,31000,,,38.40000,-122.00000,,,,,,0";
const SBS_GARBAGE: &str  = "this is not SBS";

struct Fixture<N: Notifier> {
    table: Arc<FlightTable>,
    notifier: Arc<N>,
    ingest: IngestionLoop<N>,
}

fn fixture<N: Notifier> (notifier: N)->Fixture<N> {
    let table = Arc::new( FlightTable::new( 50));
    let notifier = Arc::new( notifier);
    let gate = Arc::new( NotificationGate::new( Duration::from_secs(60)));
    let evaluator = ProximityEvaluator::new( HOME_LAT, HOME_LON, 1.0);
    let ingest = IngestionLoop::new( table.clone(), evaluator, gate, notifier.clone(), Duration::from_secs(1));
    Fixture { table, notifier, ingest }
}

#[tokio::test]
async fn test_filters () {
    let mut f = fixture( RecordingNotifier::default());

    let r = near_report( "A04424", t0()).with_on_ground( true);
    assert_eq!( f.ingest.process_report( r, t0()).await, ReportOutcome::OnGround);

    let r = Report::new( "MSG", "A04424", t0()).with_altitude( 3000);
    assert_eq!( f.ingest.process_report( r, t0()).await, ReportOutcome::NoSignal);

    let mut r = Report::new( "MSG", "A04424", t0());
    r.latitude = Some( HOME_LAT);
    assert_eq!( f.ingest.process_report( r, t0()).await, ReportOutcome::PartialPosition);

    assert!( f.table.is_empty());
    assert_eq!( f.ingest.msg_count(), 0);
}

#[tokio::test]
async fn test_callsign_only_report_is_merged () {
    let mut f = fixture( RecordingNotifier::default());

    let r = callsign_report( "A04424", "UAL814", t0());
    assert_eq!( f.ingest.process_report( r, t0()).await, ReportOutcome::Merged);

    let flight = f.table.lookup( "A04424").unwrap();
    assert_eq!( flight.len(), 1);
    assert!( flight.last_report().unwrap().distance.is_none());
    assert!( f.notifier.published().is_empty());
    assert_eq!( f.ingest.msg_count(), 0); // only position reports are counted
}

#[tokio::test]
async fn test_first_ping_does_not_notify () {
    let mut f = fixture( RecordingNotifier::default());

    // untracked flight - we need an established track before we notify
    assert_eq!( f.ingest.process_report( near_report( "A04424", t0()), t0()).await, ReportOutcome::Merged);
    assert!( f.notifier.published().is_empty());

    let flight = f.table.lookup( "A04424").unwrap();
    let dist = flight.last_report().unwrap().distance.unwrap();
    assert!( dist > 0.6 && dist < 0.8, "unexpected distance {dist}");
}

#[tokio::test]
async fn test_notify_tracked_flight_once () {
    let mut f = fixture( RecordingNotifier::default());

    f.ingest.process_report( callsign_report( "A04424", "UAL814 ", t0()), t0()).await;

    let outcome = f.ingest.process_report( near_report( "A04424", t0() + secs(1)), t0() + secs(1)).await;
    assert!( matches!( outcome, ReportOutcome::InRange( GateDecision::Fire(_))));

    let outcome = f.ingest.process_report( near_report( "A04424", t0() + secs(2)), t0() + secs(2)).await;
    assert!( matches!( outcome, ReportOutcome::InRange( GateDecision::CoolingDown(_))));

    // out of range reports are merged without consulting the gate
    let outcome = f.ingest.process_report( far_report( "A04424", t0() + secs(3)), t0() + secs(3)).await;
    assert_eq!( outcome, ReportOutcome::Merged);

    assert_eq!( f.notifier.published(), vec!["UAL814".to_string()]);
    assert_eq!( f.table.lookup( "A04424").unwrap().len(), 4);
    assert_eq!( f.ingest.msg_count(), 3); // call sign reports are merged but not counted
}

#[tokio::test]
async fn test_failed_delivery_keeps_tracking () {
    let mut f = fixture( FailingNotifier);

    f.ingest.process_report( callsign_report( "A04424", "UAL814", t0()), t0()).await;
    let outcome = f.ingest.process_report( near_report( "A04424", t0() + secs(1)), t0() + secs(1)).await;

    // the gate commits before delivery, i.e. we don't retry within the cooldown
    assert!( matches!( outcome, ReportOutcome::InRange( GateDecision::Fire(_))));
    let outcome = f.ingest.process_report( near_report( "A04424", t0() + secs(2)), t0() + secs(2)).await;
    assert!( matches!( outcome, ReportOutcome::InRange( GateDecision::CoolingDown(_))));
    assert_eq!( f.table.lookup( "A04424").unwrap().len(), 3);
}

#[tokio::test]
async fn test_consume_sbs_lines () {
    let mut f = fixture( RecordingNotifier::default());
    let decoder = SbsDecoder::new( Tz::UTC);
    let mut conn = ScriptedConnection::new( &[SBS_CALLSIGN, SBS_GARBAGE, SBS_NEAR, SBS_FAR]);

    f.ingest.consume( &mut conn, &decoder).await.unwrap();

    assert_eq!( f.table.len(), 2);
    assert_eq!( f.table.lookup( "A04424").unwrap().len(), 2);
    assert_eq!( f.notifier.published(), vec!["UAL814".to_string()]);
    assert_eq!( f.ingest.msg_count(), 2);
}

#[tokio::test]
async fn test_table_survives_reconnects () {
    let f = fixture( RecordingNotifier::default());
    let table = f.table.clone();
    let notifier = f.notifier.clone();
    let mut ingest = f.ingest;

    let source = ScriptedSource::new( vec![ vec![SBS_CALLSIGN], vec![], vec![SBS_NEAR] ]);
    let backoff = Backoff::new( Duration::from_millis(5), Duration::from_millis(20));
    let task = tokio::spawn( async move {
        let decoder = SbsDecoder::new( Tz::UTC);
        ingest.run_supervised( source, &decoder, backoff).await
    });

    for _ in 0..200 {
        if !notifier.published().is_empty() { break }
        tokio::time::sleep( Duration::from_millis(10)).await;
    }
    task.abort();

    assert_eq!( notifier.published(), vec!["UAL814".to_string()]);
    assert_eq!( table.lookup( "A04424").unwrap().len(), 2);
}
