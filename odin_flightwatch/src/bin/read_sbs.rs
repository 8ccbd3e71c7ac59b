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

use std::time::Duration;
use anyhow::Result;
use chrono_tz::Tz;
use clap::Parser;
use odin_flightwatch::{
    ingest::{MessageConnection, MessageSource, ReportDecoder},
    proximity::ProximityEvaluator,
    sbs::{SbsDecoder, SbsSocketSource},
};

#[derive(Parser)]
#[command(about="SBS socket monitoring tool")]
struct CliOpts {
    /// host:port from where to read SBS messages
    addr: String,

    /// timezone of message source
    #[arg(long, default_value="UTC")]
    tz: String,

    /// latitude of home location (to show distances)
    #[arg(long, requires="home_lon")]
    home_lat: Option<f64>,

    /// longitude of home location
    #[arg(long, requires="home_lat")]
    home_lon: Option<f64>,
}

#[tokio::main]
async fn main()->Result<()> {
    let args = CliOpts::parse();
    let tz: Tz = args.tz.parse()?;
    let decoder = SbsDecoder::new( tz);
    let evaluator = match (args.home_lat, args.home_lon) {
        (Some(lat), Some(lon)) => Some( ProximityEvaluator::new( lat, lon, 0.0)),
        _ => None
    };

    let mut source = SbsSocketSource::new( &args.addr, Duration::from_secs(10));
    let mut conn = source.connect().await?;

    while let Some(line) = conn.next_line().await? {
        match decoder.decode( &line) {
            Ok(mut report) => {
                if let Some(evaluator) = &evaluator { evaluator.evaluate( &mut report); }
                println!("{report}")
            }
            Err(e) => println!("PARSE ERROR for {}: {}", line, e)
        }
    }
    Ok(())
}
