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

//! Transport capability traits.
//!
//! These two capabilities are everything the client framework requires from
//! the host: a [`ServiceLocator`] that turns a service id into a bound
//! channel, and the [`RawChannel`] contract of that channel, which is one
//! asynchronous handshake response per request plus death notification.
//! Any process-boundary transport (in-process broker, sockets, pipes) can
//! stand behind them as long as it preserves those two guarantees.

use core::fmt;
use std::sync::Arc;

use crate::request::{GetServiceRequest, HandshakeResponse};

/// A usable handle to a remote service, yielded by a successful handshake.
///
/// Remote calls are modeled as a command code plus an opaque payload, the
/// reply likewise; a non-zero error is a transport-level status code.
pub trait RemoteService: Send + Sync {
    /// Sends one request to the remote service and returns its reply.
    fn transact(&self, code: u32, data: &[u8]) -> Result<Vec<u8>, i32>;
}

/// Callback receiving the single [`HandshakeResponse`] of a
/// [`RawChannel::get_service`] call.
pub type HandshakeCallback = Box<dyn FnOnce(HandshakeResponse) + Send + Sync>;

/// Callback fired when a bound channel's remote end goes away. The argument
/// is a suspension cause code.
pub type DeathRecipient = Box<dyn Fn(i32) + Send + Sync>;

/// A bound but not yet handshaken channel to a service host.
///
/// The channel doubles as a [`RemoteService`] so listener-style callers can
/// invoke the bound service directly, without the broker handshake.
pub trait RawChannel: RemoteService {
    /// Sends the handshake request. The transport must invoke `callback`
    /// exactly once, asynchronously, with the response. Responses to
    /// channels the client no longer cares about are simply discarded by
    /// the callback's owner; the transport need not track cancellation.
    fn get_service(&self, request: GetServiceRequest, callback: HandshakeCallback);

    /// Registers a recipient invoked if the remote end of this channel
    /// dies while bound.
    fn link_to_death(&self, recipient: DeathRecipient);
}

/// Failure to locate or bind the target service for one attempt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BindError {
    /// No service is registered for the requested id.
    ServiceNotFound,
    /// The service exists but refused the bind this attempt; retrying may
    /// succeed.
    BindRefused,
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BindError::ServiceNotFound => write!(f, "service not found"),
            BindError::BindRefused => write!(f, "bind refused"),
        }
    }
}

impl std::error::Error for BindError {}

/// Produces bound channels from service ids.
pub trait ServiceLocator: Send + Sync {
    /// Locates the service and binds a fresh channel to it. Dropping every
    /// clone of the returned channel unbinds it.
    fn bind(&self, service_id: crate::api::ServiceId) -> Result<Arc<dyn RawChannel>, BindError>;
}
