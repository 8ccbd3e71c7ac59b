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
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tokio::{sync::Mutex, time::timeout};
use tracing::info;

use crate::config::redact_url_password;
use crate::errors::{Result,OdinFlightWatchError};
use crate::report::FieldRecord;

/// the key-value backend we persist the last report of each flight to
#[async_trait]
pub trait FlightStore: Send + Sync {
    async fn store (&self, key: &str, record: &FieldRecord)->Result<()>;
}

/// store with an upper bound on how long we wait for the backend
pub async fn store_with_timeout<S> (store: &S, key: &str, record: &FieldRecord, max_wait: Duration)->Result<()> where S: FlightStore + ?Sized {
    match timeout( max_wait, store.store( key, record)).await {
        Ok(res) => res,
        Err(_) => Err( OdinFlightWatchError::TimeoutError(max_wait))
    }
}

/// does this error mean the backend is not reachable (as opposed to rejecting a single record)
pub fn is_store_unavailable (e: &OdinFlightWatchError)->bool {
    match e {
        OdinFlightWatchError::TimeoutError(_) | OdinFlightWatchError::IOError(_) => true,
        OdinFlightWatchError::RedisError(e) => e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout(),
        _ => false
    }
}

/// [`FlightStore`] that writes records as Redis hashes (`HSET <hexident> field value ..`).
/// We connect lazily so that an unavailable server at startup is just another transient error.
/// Once connected, the [`ConnectionManager`] takes care of reconnects
pub struct RedisStore {
    client: Client,
    display_url: String, // redacted
    conn: Mutex<Option<ConnectionManager>>,
}

impl RedisStore {
    pub fn new (url: &str)->Result<Self> {
        let client = Client::open( url)?;
        let display_url = redact_url_password( url);
        Ok( RedisStore { client, display_url, conn: Mutex::new(None) } )
    }

    async fn connection (&self)->Result<ConnectionManager> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok( conn.clone())
        }

        let conn = ConnectionManager::new( self.client.clone()).await?;
        info!("connected to Redis at {}", self.display_url);
        *guard = Some( conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl FlightStore for RedisStore {
    async fn store (&self, key: &str, record: &FieldRecord)->Result<()> {
        let mut conn = self.connection().await?;
        let items: Vec<(&str,&str)> = record.iter().map( |(k,v)| (*k, v.as_str())).collect();

        let _: () = conn.hset_multiple( key, &items).await?;
        Ok(())
    }
}
