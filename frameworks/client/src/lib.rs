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

//! Client framework for brokered remote services.
//!
//! The crate is layered bottom up: [`connection`] manages one service
//! connection, [`client`] aggregates several behind one surface,
//! [`manager`] shares cached connections across callers and queues calls
//! until they are up, and [`proxy`] delivers listener operations over
//! short-lived binds. [`pending_result`] carries the outcome of every
//! asynchronous operation back to its caller.
//!
//! The host side is abstracted by [`gms_core::ServiceLocator`]; anything
//! implementing it can stand behind the framework.

#![warn(missing_docs, clippy::redundant_static_lifetimes)]

/// Multi-API aggregate client.
pub mod client;

/// Single-service connection management.
pub mod connection;

/// Shared connection manager worker.
pub mod manager;

/// One-shot result handles.
pub mod pending_result;

/// Bind-on-demand listener delivery.
pub mod proxy;

pub(crate) mod utils;

pub use client::{ApiClient, ApiClientBuilder};
pub use connection::{
    ApiConnection, ConnectOptions, ConnectionCallbacks, ConnectionState, GmsClient,
    OnConnectionFailedListener,
};
pub use manager::{ApiManager, ApiManagerEntry};
pub use pending_result::PendingResult;
pub use proxy::RemoteListenerProxy;
