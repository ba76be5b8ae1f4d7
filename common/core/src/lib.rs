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

//! Shared data model of the Play Services client connection framework.
//!
//! This crate carries the types that cross the boundary between the client
//! framework (`gms_client`) and whatever hosts the remote services
//! (`gms_broker` in-process, or a real IPC transport): API identities, the
//! connection status taxonomy, handshake messages and the transport
//! capability traits. It contains no business logic.

#![warn(missing_docs, clippy::redundant_static_lifetimes)]

/// API identity types.
pub mod api;

/// Connection status taxonomy and structured failure causes.
pub mod connection_result;

/// Handshake request/response messages.
pub mod request;

/// Transport capability traits required from the host.
pub mod remote;

pub use api::{ApiId, ServiceId};
pub use connection_result::{ConnectionResult, Resolution};
pub use remote::{BindError, DeathRecipient, HandshakeCallback, RawChannel, RemoteService, ServiceLocator};
pub use request::{ConnectionHint, GetServiceRequest, HandshakeResponse};
