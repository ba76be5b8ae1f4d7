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

use std::sync::Arc;

use gms_core::{ConnectionHint, GetServiceRequest, RemoteService};

/// Transport status returned for transaction codes a service does not
/// handle.
pub const TRANSACT_UNSUPPORTED: i32 = -1;

/// A service hosted by the broker.
///
/// Implementors answer the broker handshake with a usable
/// [`RemoteService`] handle plus a connection hint, or refuse it with a
/// status code. Channels bound to the service may also transact on it
/// directly, without a handshake; services that only serve handshaken
/// clients can leave [`BrokeredService::on_transact`] at its default.
pub trait BrokeredService: Send + Sync {
    /// Answers one handshake request.
    fn on_get_service(
        &self,
        request: &GetServiceRequest,
    ) -> Result<(Arc<dyn RemoteService>, ConnectionHint), i32>;

    /// Handles a transaction arriving directly on a bound channel.
    fn on_transact(&self, _code: u32, _data: &[u8]) -> Result<Vec<u8>, i32> {
        Err(TRANSACT_UNSUPPORTED)
    }
}

/// A [`BrokeredService`] backed by a single transaction closure.
///
/// Every handshake succeeds and hands back a handle to the closure
/// itself; direct channel transactions reach the same closure.
#[derive(Clone)]
pub struct FnService {
    handler: Arc<dyn Fn(u32, &[u8]) -> Result<Vec<u8>, i32> + Send + Sync>,
    hint: ConnectionHint,
}

impl FnService {
    /// Creates a service from a transaction handler.
    pub fn new(
        handler: impl Fn(u32, &[u8]) -> Result<Vec<u8>, i32> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            hint: ConnectionHint::new(),
        }
    }

    /// Adds an entry to the hint returned with every successful
    /// handshake.
    pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hint.insert(key.into(), value.into());
        self
    }
}

impl RemoteService for FnService {
    fn transact(&self, code: u32, data: &[u8]) -> Result<Vec<u8>, i32> {
        (self.handler)(code, data)
    }
}

impl BrokeredService for FnService {
    fn on_get_service(
        &self,
        _request: &GetServiceRequest,
    ) -> Result<(Arc<dyn RemoteService>, ConnectionHint), i32> {
        Ok((Arc::new(self.clone()), self.hint.clone()))
    }

    fn on_transact(&self, code: u32, data: &[u8]) -> Result<Vec<u8>, i32> {
        self.transact(code, data)
    }
}
