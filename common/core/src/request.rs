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

//! Handshake messages.
//!
//! After a raw transport bind succeeds, the client sends one
//! [`GetServiceRequest`] over the fresh channel and receives exactly one
//! [`HandshakeResponse`] carrying either a usable service handle or a
//! non-success status code. Only the response decides whether the
//! connection counts as established.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::ServiceId;
use crate::remote::RemoteService;

/// Opaque payload delivered alongside a successful connection, passed
/// through to listeners unmodified.
pub type ConnectionHint = HashMap<String, String>;

/// The typed request opening a service handshake.
#[derive(Clone, Debug)]
pub struct GetServiceRequest {
    /// The service being requested.
    pub service_id: ServiceId,
    /// Package name of the requesting client.
    pub package_name: String,
    /// Account the client wants the service scoped to, if any.
    pub account: Option<String>,
    /// Additional key/value extras forwarded to the service.
    pub extras: HashMap<String, String>,
}

impl GetServiceRequest {
    /// Creates a request for the given service from the given package.
    pub fn new(service_id: ServiceId, package_name: impl Into<String>) -> Self {
        Self {
            service_id,
            package_name: package_name.into(),
            account: None,
            extras: HashMap::new(),
        }
    }
}

/// The single response to a [`GetServiceRequest`].
///
/// A usable `service` handle is only present when `status` is
/// [`crate::connection_result::SUCCESS`].
pub struct HandshakeResponse {
    /// Handshake status code.
    pub status: i32,
    /// The usable service handle on success.
    pub service: Option<Arc<dyn RemoteService>>,
    /// Opaque connection hint forwarded to listeners.
    pub hint: ConnectionHint,
}

impl HandshakeResponse {
    /// Creates a success response carrying a service handle.
    pub fn success(service: Arc<dyn RemoteService>, hint: ConnectionHint) -> Self {
        Self {
            status: crate::connection_result::SUCCESS,
            service: Some(service),
            hint,
        }
    }

    /// Creates a failure response carrying only a status code.
    pub fn failure(status: i32) -> Self {
        Self {
            status,
            service: None,
            hint: ConnectionHint::new(),
        }
    }
}
