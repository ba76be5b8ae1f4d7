// Copyright (C) 2025 Huawei Device Co., Ltd.
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single-service connection management.
//!
//! [`GmsClient`] owns the lifecycle of one service connection: locate and
//! bind a raw channel, run the `get_service` handshake over it, then hold
//! the resulting service handle until disconnect or remote death. The
//! [`ApiConnection`] trait is its surface; everything above (the
//! multi-service client, the manager) composes connections through it.

mod gms_client;

pub use gms_client::GmsClient;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gms_core::{ConnectionHint, ConnectionResult, RemoteService};

/// Lifecycle states of one service connection.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConnectionState {
    /// No connection and none in progress.
    NotConnected,
    /// Bind or handshake in flight.
    Connecting,
    /// Handshake succeeded; the service handle is usable.
    Connected,
    /// Disconnect requested while a connection attempt was in flight; the
    /// attempt's outcome will be discarded.
    Disconnecting,
}

/// Connection establishment parameters shared by every connection a
/// client opens.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Package name reported in the handshake request.
    pub package_name: String,
    /// Account the connections are scoped to, if any.
    pub account: Option<String>,
    /// Extras forwarded with every handshake request.
    pub extras: HashMap<String, String>,
    /// Maximum bind attempts per connection attempt. Must be at least 1.
    pub bind_attempts: u32,
    /// Delay between bind attempts.
    pub retry_delay: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            package_name: "gms_client".to_string(),
            account: None,
            extras: HashMap::new(),
            bind_attempts: 3,
            retry_delay: Duration::from_millis(50),
        }
    }
}

/// Receives connection lifecycle events of an [`ApiConnection`].
pub trait ConnectionCallbacks: Send + Sync {
    /// The connection is established and its service handle is usable.
    fn on_connected(&self, hint: &ConnectionHint);

    /// An established connection was lost without a disconnect request.
    /// The argument is a `CAUSE_*` code from
    /// [`gms_core::connection_result`].
    fn on_connection_suspended(&self, cause: i32);
}

/// Receives the failure outcome of a connection attempt.
pub trait OnConnectionFailedListener: Send + Sync {
    /// The connection attempt ended without a usable handle.
    fn on_connection_failed(&self, result: &ConnectionResult);
}

/// One managed connection to a remote service.
pub trait ApiConnection: Send + Sync {
    /// Starts connecting. No-op while already connected or connecting.
    fn connect(&self);

    /// Disconnects, or marks an in-flight attempt for discard.
    fn disconnect(&self);

    /// Whether the connection is established.
    fn is_connected(&self) -> bool;

    /// Whether a connection attempt is in flight.
    fn is_connecting(&self) -> bool;

    /// The connected service handle, while connected.
    fn service(&self) -> Option<Arc<dyn RemoteService>>;
}
