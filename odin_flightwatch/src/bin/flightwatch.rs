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

use std::{env, fs::OpenOptions, path::PathBuf, sync::{Arc,Mutex}, time::Duration};
use anyhow::Result;
use clap::Parser;
use daemonize::Daemonize;
use tokio::time::sleep;
use tracing::{error,info,warn};
use tracing_subscriber::EnvFilter;

use odin_flightwatch::{
    FlightTable,
    config::{FlightWatchConfig, FOREGROUND_ENV, redact_url_password},
    ingest::{Backoff, IngestionLoop},
    janitor::Janitor,
    liveness::run_liveness,
    notify::{MqttNotifier, NotificationGate},
    persist::RedisStore,
    proximity::ProximityEvaluator,
    sbs::{SbsDecoder, SbsSocketSource},
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(about="track ADS-B flights and notify when they come close to home")]
struct CliOpts {
    /// RON config file. Environment variables override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// do not daemonize and log to stderr (same as setting RUNNING_IN_IDE)
    #[arg(long)]
    foreground: bool,
}

fn main()->Result<()> {
    let args = CliOpts::parse();
    let config = FlightWatchConfig::load( args.config.as_deref())?;
    let foreground = args.foreground || env::var_os( FOREGROUND_ENV).is_some();

    if foreground {
        tracing_subscriber::fmt()
            .with_env_filter( env_filter())
            .with_writer( std::io::stderr)
            .init();
        info!("running in foreground, not starting daemon");
    } else {
        // open before we detach so that we still can report errors
        let log_file = OpenOptions::new().create(true).append(true).open( &config.log_filename)?;
        Daemonize::new().start()?;

        tracing_subscriber::fmt()
            .with_env_filter( env_filter())
            .with_ansi( false)
            .with_writer( Mutex::new( log_file))
            .init();
    }

    // the runtime has to be created after we forked
    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on( run( config))
}

fn env_filter ()->EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new("info"))
}

async fn run (config: FlightWatchConfig)->Result<()> {
    info!("starting to record positions from {} and publish to {} and {}:{}/{}",
          config.source_addr(), redact_url_password( &config.redis_url), config.mqtt_host, config.mqtt_port, config.mqtt_topic_name);

    let table = Arc::new( FlightTable::new( config.max_history));
    let gate = Arc::new( NotificationGate::new( config.notify_cooldown));
    let notifier = Arc::new( MqttNotifier::new( &config.mqtt_client_id, &config.mqtt_host, config.mqtt_port, &config.mqtt_topic_name));
    let store = Arc::new( RedisStore::new( &config.redis_url)?);

    let janitor = Arc::new( Janitor::new( table.clone(), store, config.janitor_config()));
    tokio::spawn( janitor.run());
    tokio::spawn( run_liveness( table.clone(), notifier.clone(), config.liveness_hours.clone(), config.io_timeout));

    // the supervised loop only returns if the ingestion task panicked. We restart it on the same table and gate
    loop {
        let mut ingest = IngestionLoop::new(
            table.clone(),
            ProximityEvaluator::new( config.home_latitude, config.home_longitude, config.mqtt_distance_max),
            gate.clone(),
            notifier.clone(),
            config.io_timeout
        );
        let source = SbsSocketSource::new( config.source_addr(), CONNECT_TIMEOUT);
        let decoder = SbsDecoder::new( config.source_timezone);
        let backoff = Backoff::new( config.reconnect_delay, config.max_reconnect_delay);

        let task = tokio::spawn( async move {
            ingest.run_supervised( source, &decoder, backoff).await
        });

        match task.await {
            Ok(()) => warn!("ingestion loop terminated, restarting"),
            Err(e) => error!("error in recording positions: {}, restarting", e)
        }
        sleep( config.reconnect_delay).await;
    }
}
