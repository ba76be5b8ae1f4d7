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

use std::future::Future;
use std::sync::{Arc, Mutex};

use gms_core::{
    DeathRecipient, GetServiceRequest, HandshakeCallback, HandshakeResponse, RawChannel,
    RemoteService, ServiceId,
};

use crate::broker::BrokerShared;

/// One bound channel handed out by [`crate::LocalBroker`].
///
/// The channel stays usable while any clone of its `Arc` is alive;
/// dropping the last clone is the unbind. The broker keeps only weak
/// references to it, so liveness is decided entirely by the client side.
pub struct LocalChannel {
    service_id: ServiceId,
    broker: Arc<BrokerShared>,
    recipients: Mutex<Vec<DeathRecipient>>,
}

impl LocalChannel {
    pub(crate) fn new(service_id: ServiceId, broker: Arc<BrokerShared>) -> Self {
        Self {
            service_id,
            broker,
            recipients: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn notify_death(&self, cause: i32) {
        let recipients = std::mem::take(&mut *self.recipients.lock().unwrap());
        for recipient in recipients {
            recipient(cause);
        }
    }
}

impl RemoteService for LocalChannel {
    fn transact(&self, code: u32, data: &[u8]) -> Result<Vec<u8>, i32> {
        self.broker.transact(self.service_id, code, data)
    }
}

impl RawChannel for LocalChannel {
    fn get_service(&self, request: GetServiceRequest, callback: HandshakeCallback) {
        self.broker.handshake(self.service_id, request, callback);
    }

    fn link_to_death(&self, recipient: DeathRecipient) {
        self.recipients.lock().unwrap().push(recipient);
    }
}

/// Hands a handshake response to its callback on a runtime worker, so the
/// caller of `get_service` never observes a synchronous response.
pub(crate) fn deliver(callback: HandshakeCallback, response: HandshakeResponse) {
    ylong_runtime::spawn(Box::into_pin(Box::new(async move {
        callback(response);
    })
        as Box<dyn Future<Output = ()> + Send + Sync>));
}
