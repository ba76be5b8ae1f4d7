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

//! Bind-on-demand listener delivery.
//!
//! A [`RemoteListenerProxy`] delivers operations to a listener-style
//! service without keeping a standing connection: invocations queue up,
//! a drain task binds the service, replays the queue in order against
//! the bound channel and unbinds again. No handshake is involved; the
//! operations transact on the raw channel directly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use gms_core::{RawChannel, RemoteService, ServiceId, ServiceLocator};
use log::{debug, warn};

use crate::utils::runtime_spawn;

type Invocation = Box<dyn FnOnce(&dyn RemoteService) + Send + Sync>;

/// Presents a bound channel to invocations as a plain service handle.
struct ChannelHandle(Arc<dyn RawChannel>);

impl RemoteService for ChannelHandle {
    fn transact(&self, code: u32, data: &[u8]) -> Result<Vec<u8>, i32> {
        self.0.transact(code, data)
    }
}

struct ProxyState {
    draining: bool,
    queue: VecDeque<Invocation>,
}

struct ProxyShared {
    service_id: ServiceId,
    locator: Arc<dyn ServiceLocator>,
    state: Mutex<ProxyState>,
}

/// Queue-and-replay proxy for one listener service.
///
/// Cloning is cheap; clones feed the same queue.
#[derive(Clone)]
pub struct RemoteListenerProxy {
    shared: Arc<ProxyShared>,
}

impl RemoteListenerProxy {
    /// Creates an unbound proxy for `service_id`.
    pub fn new(locator: Arc<dyn ServiceLocator>, service_id: ServiceId) -> Self {
        Self {
            shared: Arc::new(ProxyShared {
                service_id,
                locator,
                state: Mutex::new(ProxyState {
                    draining: false,
                    queue: VecDeque::new(),
                }),
            }),
        }
    }

    /// Queues one operation and makes sure a drain task is running.
    ///
    /// Operations run in invocation order. If the bind fails they stay
    /// queued and the next invocation retries.
    pub fn invoke(&self, operation: impl FnOnce(&dyn RemoteService) + Send + Sync + 'static) {
        let start_drain = {
            let mut state = self.shared.state.lock().unwrap();
            state.queue.push_back(Box::new(operation));
            if state.draining {
                false
            } else {
                state.draining = true;
                true
            }
        };
        if start_drain {
            let proxy = self.clone();
            runtime_spawn(async move {
                proxy.drain();
            });
        }
    }

    /// Number of operations still waiting for delivery.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().unwrap().queue.len()
    }

    fn drain(&self) {
        loop {
            let channel = match self.shared.locator.bind(self.shared.service_id) {
                Ok(channel) => channel,
                Err(e) => {
                    warn!("listener bind of {} failed: {}", self.shared.service_id, e);
                    self.shared.state.lock().unwrap().draining = false;
                    return;
                }
            };
            debug!("listener channel to {} bound", self.shared.service_id);
            let handle = ChannelHandle(channel);
            loop {
                let operation = self.shared.state.lock().unwrap().queue.pop_front();
                match operation {
                    Some(operation) => operation(&handle),
                    None => break,
                }
            }
            // Unbind before deciding whether to stop; a late invocation
            // gets a fresh bind.
            drop(handle);
            debug!("listener channel to {} unbound", self.shared.service_id);
            let mut state = self.shared.state.lock().unwrap();
            if state.queue.is_empty() {
                state.draining = false;
                return;
            }
        }
    }
}
