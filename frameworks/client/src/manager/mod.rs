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

//! Shared connection manager.
//!
//! [`ApiManager`] runs one worker task that owns a cache of
//! [`ApiClient`]s, one per [`ApiId`]. Callers schedule remote calls
//! through the cloneable [`ApiManagerEntry`]; calls against an API whose
//! connection is not up yet are queued and replayed in scheduling order
//! once it connects, or failed as a batch when the connection attempt
//! fails. Cached clients stay connected for reuse by later calls.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use gms_core::connection_result::INTERNAL_ERROR;
use gms_core::{ApiId, ConnectionHint, ConnectionResult, RemoteService, ServiceLocator};
use log::{debug, error, info, warn};
use ylong_runtime::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::client::{ApiClient, ApiClientBuilder};
use crate::connection::{ConnectOptions, ConnectionCallbacks, OnConnectionFailedListener};
use crate::pending_result::PendingResult;
use crate::utils::runtime_spawn;

type WaitingCall = Box<dyn FnOnce(Result<Arc<dyn RemoteService>, ConnectionResult>) + Send + Sync>;

enum ApiEvent {
    Schedule(ApiId, WaitingCall),
    Connected(ApiId, ConnectionHint),
    ConnectionFailed(ApiId, ConnectionResult),
}

/// Forwards one cached client's lifecycle events into the worker queue.
struct ManagerListener {
    api: ApiId,
    tx: UnboundedSender<ApiEvent>,
}

impl ConnectionCallbacks for ManagerListener {
    fn on_connected(&self, hint: &ConnectionHint) {
        let _ = self
            .tx
            .send(ApiEvent::Connected(self.api.clone(), hint.clone()));
    }

    fn on_connection_suspended(&self, cause: i32) {
        // The cached client reconnects lazily on the next scheduled call.
        warn!("{} suspended, cause {}", self.api, cause);
    }
}

impl OnConnectionFailedListener for ManagerListener {
    fn on_connection_failed(&self, result: &ConnectionResult) {
        let _ = self
            .tx
            .send(ApiEvent::ConnectionFailed(self.api.clone(), result.clone()));
    }
}

/// The manager worker. Owns the client cache and the per-API queues of
/// calls waiting for a connection.
pub struct ApiManager {
    locator: Arc<dyn ServiceLocator>,
    options: ConnectOptions,
    clients: HashMap<ApiId, ApiClient>,
    waiting: HashMap<ApiId, VecDeque<WaitingCall>>,
    tx: UnboundedSender<ApiEvent>,
    rx: UnboundedReceiver<ApiEvent>,
}

impl ApiManager {
    /// Spawns the worker and returns its entry.
    pub fn init(locator: Arc<dyn ServiceLocator>, options: ConnectOptions) -> ApiManagerEntry {
        debug!("ApiManager init");
        let (tx, rx) = unbounded_channel();
        let manager = ApiManager {
            locator,
            options,
            clients: HashMap::new(),
            waiting: HashMap::new(),
            tx: tx.clone(),
            rx,
        };
        runtime_spawn(manager.run());
        ApiManagerEntry { tx }
    }

    async fn run(mut self) {
        loop {
            let event = match self.rx.recv().await {
                Ok(event) => event,
                Err(e) => {
                    error!("ApiManager recv failed: {:?}", e);
                    return;
                }
            };
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Schedule(api, call) => self.handle_schedule(api, call),
            ApiEvent::Connected(api, _hint) => self.handle_connected(api),
            ApiEvent::ConnectionFailed(api, result) => self.handle_failed(api, result),
        }
    }

    fn handle_schedule(&mut self, api: ApiId, call: WaitingCall) {
        let client = self.client_for(&api);
        // Earlier calls may still sit in the queue with their connected
        // event in flight; running this one ahead of them would break the
        // scheduling order.
        let draining = self
            .waiting
            .get(&api)
            .map_or(false, |queue| !queue.is_empty());
        if !draining {
            if let Some(service) = client.service(&api) {
                call(Ok(service));
                return;
            }
        }
        debug!("{} not connected, queueing call", api);
        self.waiting.entry(api).or_default().push_back(call);
        client.connect();
    }

    fn handle_connected(&mut self, api: ApiId) {
        let service = self.clients.get(&api).and_then(|client| client.service(&api));
        match service {
            Some(service) => {
                info!("{} connected, draining queued calls", api);
                if let Some(queue) = self.waiting.get_mut(&api) {
                    while let Some(call) = queue.pop_front() {
                        call(Ok(service.clone()));
                    }
                }
            }
            None => {
                // Connection already went away again; try anew for the
                // still queued calls.
                warn!("{} reported connected without a handle", api);
                if let Some(client) = self.clients.get(&api) {
                    client.connect();
                }
            }
        }
    }

    fn handle_failed(&mut self, api: ApiId, result: ConnectionResult) {
        info!("{} connection failed, failing queued calls: {}", api, result);
        if let Some(queue) = self.waiting.get_mut(&api) {
            while let Some(call) = queue.pop_front() {
                call(Err(result.clone()));
            }
        }
    }

    /// Returns the cached client for `api`, creating it on first use.
    /// Clients are kept for the manager's lifetime.
    fn client_for(&mut self, api: &ApiId) -> ApiClient {
        if let Some(client) = self.clients.get(api) {
            return client.clone();
        }
        debug!("{} creating cached client", api);
        let listener = Arc::new(ManagerListener {
            api: api.clone(),
            tx: self.tx.clone(),
        });
        let client = ApiClientBuilder::new(self.locator.clone())
            .options(self.options.clone())
            .add_api(api.clone())
            .add_connection_callbacks(listener.clone())
            .add_on_connection_failed_listener(listener)
            .build();
        self.clients.insert(api.clone(), client.clone());
        client
    }
}

/// Cloneable entry to the manager worker.
#[derive(Clone)]
pub struct ApiManagerEntry {
    tx: UnboundedSender<ApiEvent>,
}

impl ApiManagerEntry {
    /// Schedules `call` to run against the connected service of `api`.
    ///
    /// The call runs on the worker once the connection is up, in
    /// scheduling order relative to other calls on the same API. The
    /// returned handle completes with the call's value, or with the
    /// [`ConnectionResult`] that made the connection attempt fail.
    pub fn schedule_task<R, F>(&self, api: ApiId, call: F) -> PendingResult<Result<R, ConnectionResult>>
    where
        R: Send + Sync + 'static,
        F: FnOnce(&Arc<dyn RemoteService>) -> Result<R, ConnectionResult> + Send + Sync + 'static,
    {
        let pending = PendingResult::new();
        let completer = pending.clone();
        let waiting: WaitingCall = Box::new(move |outcome| match outcome {
            Ok(service) => completer.deliver(call(&service)),
            Err(result) => completer.deliver(Err(result)),
        });
        if self.tx.send(ApiEvent::Schedule(api, waiting)).is_err() {
            error!("ApiManager is gone, failing scheduled call");
            pending.deliver(Err(ConnectionResult::new(INTERNAL_ERROR)));
        }
        pending
    }
}
