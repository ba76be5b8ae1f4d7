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

//! In-process service broker.
//!
//! This crate stands in for the platform side of the connection framework:
//! it hosts registered services, hands out bound channels through the
//! [`gms_core::ServiceLocator`] capability and answers the `get_service`
//! handshake over them. Because everything runs in-process it can also
//! inject faults deterministically: held handshakes, gated binds, refused
//! binds and simulated service death. The client framework's tests are
//! built on these controls.

#![warn(missing_docs, clippy::redundant_static_lifetimes)]

mod broker;
mod channel;
mod service;

pub use broker::{BindGate, HandshakeGate, LocalBroker};
pub use channel::LocalChannel;
pub use service::{BrokeredService, FnService, TRANSACT_UNSUPPORTED};

use std::time::{Duration, Instant};

/// Polls `cond` until it returns `true` or `timeout` elapses.
///
/// Test helper for settling asynchronous state transitions; returns whether
/// the condition was observed.
pub fn wait_until(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
