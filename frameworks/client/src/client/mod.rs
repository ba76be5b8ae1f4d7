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

//! Multi-API aggregate client.
//!
//! An [`ApiClient`] bundles one [`GmsClient`] per requested API behind a
//! single connect/disconnect surface. Lifecycle events of every member
//! fan out to the listeners registered on the client. A usage counter
//! lets concurrent operations defer a requested disconnect until the
//! last one finishes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use gms_core::{ApiId, ConnectionHint, ConnectionResult, RemoteService, ServiceLocator};
use log::debug;

use crate::connection::{
    ApiConnection, ConnectOptions, ConnectionCallbacks, GmsClient, OnConnectionFailedListener,
};

/// Key under which an API's options string travels in handshake extras.
const OPTIONS_EXTRA: &str = "options";

struct ListenerSet {
    callbacks: Vec<Arc<dyn ConnectionCallbacks>>,
    failed: Vec<Arc<dyn OnConnectionFailedListener>>,
}

struct Aggregate {
    usage: u32,
    should_disconnect: bool,
}

struct ClientInner {
    members: HashMap<ApiId, GmsClient>,
    listeners: Mutex<ListenerSet>,
    aggregate: Mutex<Aggregate>,
}

/// Fans one member's lifecycle events out to the client's listeners.
/// Holds the client weakly so members never keep it alive.
struct HubListener {
    hub: Weak<ClientInner>,
}

impl ConnectionCallbacks for HubListener {
    fn on_connected(&self, hint: &ConnectionHint) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        // Snapshot so listeners run without the lock held.
        let snapshot = hub.listeners.lock().unwrap().callbacks.clone();
        for callbacks in snapshot {
            callbacks.on_connected(hint);
        }
    }

    fn on_connection_suspended(&self, cause: i32) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        let snapshot = hub.listeners.lock().unwrap().callbacks.clone();
        for callbacks in snapshot {
            callbacks.on_connection_suspended(cause);
        }
    }
}

impl OnConnectionFailedListener for HubListener {
    fn on_connection_failed(&self, result: &ConnectionResult) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        let snapshot = hub.listeners.lock().unwrap().failed.clone();
        for listener in snapshot {
            listener.on_connection_failed(result);
        }
    }
}

/// Builder assembling an [`ApiClient`].
pub struct ApiClientBuilder {
    locator: Arc<dyn ServiceLocator>,
    options: ConnectOptions,
    apis: Vec<ApiId>,
    callbacks: Vec<Arc<dyn ConnectionCallbacks>>,
    failed_listeners: Vec<Arc<dyn OnConnectionFailedListener>>,
}

impl ApiClientBuilder {
    /// Starts a builder over the given locator with default options.
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self {
            locator,
            options: ConnectOptions::default(),
            apis: Vec::new(),
            callbacks: Vec::new(),
            failed_listeners: Vec::new(),
        }
    }

    /// Replaces the connection options used by every member.
    pub fn options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds an API the client should connect. Adding the same API twice
    /// keeps a single member.
    pub fn add_api(mut self, api: ApiId) -> Self {
        if !self.apis.contains(&api) {
            self.apis.push(api);
        }
        self
    }

    /// Registers lifecycle callbacks up front.
    pub fn add_connection_callbacks(mut self, callbacks: Arc<dyn ConnectionCallbacks>) -> Self {
        self.callbacks.push(callbacks);
        self
    }

    /// Registers a failure listener up front.
    pub fn add_on_connection_failed_listener(
        mut self,
        listener: Arc<dyn OnConnectionFailedListener>,
    ) -> Self {
        self.failed_listeners.push(listener);
        self
    }

    /// Builds the client. Members start out disconnected.
    pub fn build(self) -> ApiClient {
        let ApiClientBuilder {
            locator,
            options,
            apis,
            callbacks,
            failed_listeners,
        } = self;
        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
            let forwarder = Arc::new(HubListener { hub: weak.clone() });
            let members = apis
                .into_iter()
                .map(|api| {
                    let mut member_options = options.clone();
                    if let Some(api_options) = &api.options {
                        member_options
                            .extras
                            .insert(OPTIONS_EXTRA.to_string(), api_options.clone());
                    }
                    let member = GmsClient::new(
                        api.service_id,
                        locator.clone(),
                        member_options,
                        forwarder.clone() as Arc<dyn ConnectionCallbacks>,
                        forwarder.clone() as Arc<dyn OnConnectionFailedListener>,
                    );
                    (api, member)
                })
                .collect();
            ClientInner {
                members,
                listeners: Mutex::new(ListenerSet {
                    callbacks,
                    failed: failed_listeners,
                }),
                aggregate: Mutex::new(Aggregate {
                    usage: 0,
                    should_disconnect: false,
                }),
            }
        });
        ApiClient { inner }
    }
}

/// Aggregate connection over one or more APIs.
///
/// Cloning is cheap and all clones share members, listeners and the
/// usage counter.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Connects every member not already connected or connecting. A
    /// disconnect still pending from [`ApiClient::disconnect`] is called
    /// off.
    pub fn connect(&self) {
        self.inner.aggregate.lock().unwrap().should_disconnect = false;
        if self.is_connected() || self.is_connecting() {
            debug!("client already connecting or connected");
            return;
        }
        for member in self.inner.members.values() {
            member.connect();
        }
    }

    /// Disconnects every member, or defers the disconnect until the
    /// usage counter drops to zero.
    pub fn disconnect(&self) {
        {
            let mut aggregate = self.inner.aggregate.lock().unwrap();
            if aggregate.usage > 0 {
                debug!("client in use, disconnect deferred");
                aggregate.should_disconnect = true;
                return;
            }
            aggregate.should_disconnect = false;
        }
        for member in self.inner.members.values() {
            member.disconnect();
        }
    }

    /// Disconnects and immediately reconnects every member.
    pub fn reconnect(&self) {
        debug!("client reconnecting");
        self.disconnect();
        self.connect();
    }

    /// Whether every member is connected. A client without APIs is never
    /// connected.
    pub fn is_connected(&self) -> bool {
        !self.inner.members.is_empty()
            && self.inner.members.values().all(|member| member.is_connected())
    }

    /// Whether any member has a connection attempt in flight.
    pub fn is_connecting(&self) -> bool {
        self.inner.members.values().any(|member| member.is_connecting())
    }

    /// Whether the member for `api` is connected.
    pub fn has_connected_api(&self, api: &ApiId) -> bool {
        self.inner
            .members
            .get(api)
            .is_some_and(|member| member.is_connected())
    }

    /// The member connection for `api`, if the client was built with it.
    pub fn api_connection(&self, api: &ApiId) -> Option<GmsClient> {
        self.inner.members.get(api).cloned()
    }

    /// The connected service handle for `api`, while connected.
    pub fn service(&self, api: &ApiId) -> Option<Arc<dyn RemoteService>> {
        self.inner.members.get(api).and_then(|member| member.service())
    }

    /// Marks the client in use by one more operation, blocking disconnects.
    pub fn increment_usage_counter(&self) {
        self.inner.aggregate.lock().unwrap().usage += 1;
    }

    /// Releases one use. Runs a deferred disconnect when the last use
    /// goes away. Unbalanced calls are a caller bug and panic.
    pub fn decrement_usage_counter(&self) {
        let disconnect_now = {
            let mut aggregate = self.inner.aggregate.lock().unwrap();
            assert!(aggregate.usage > 0, "usage counter underflow");
            aggregate.usage -= 1;
            aggregate.usage == 0 && aggregate.should_disconnect
        };
        if disconnect_now {
            debug!("running deferred disconnect");
            self.disconnect();
        }
    }

    /// Registers lifecycle callbacks. Returns whether they were newly
    /// added; re-registering the same `Arc` keeps a single entry.
    pub fn register_connection_callbacks(&self, callbacks: Arc<dyn ConnectionCallbacks>) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap();
        if listeners
            .callbacks
            .iter()
            .any(|registered| Arc::ptr_eq(registered, &callbacks))
        {
            return false;
        }
        listeners.callbacks.push(callbacks);
        true
    }

    /// Whether the given callbacks are currently registered.
    pub fn is_connection_callbacks_registered(
        &self,
        callbacks: &Arc<dyn ConnectionCallbacks>,
    ) -> bool {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .callbacks
            .iter()
            .any(|registered| Arc::ptr_eq(registered, callbacks))
    }

    /// Unregisters lifecycle callbacks. Returns whether they were
    /// present; unregistering an unknown `Arc` is a no-op.
    pub fn unregister_connection_callbacks(
        &self,
        callbacks: &Arc<dyn ConnectionCallbacks>,
    ) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap();
        let before = listeners.callbacks.len();
        listeners
            .callbacks
            .retain(|registered| !Arc::ptr_eq(registered, callbacks));
        listeners.callbacks.len() != before
    }

    /// Registers a failure listener. Same semantics as
    /// [`ApiClient::register_connection_callbacks`].
    pub fn register_connection_failed_listener(
        &self,
        listener: Arc<dyn OnConnectionFailedListener>,
    ) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap();
        if listeners
            .failed
            .iter()
            .any(|registered| Arc::ptr_eq(registered, &listener))
        {
            return false;
        }
        listeners.failed.push(listener);
        true
    }

    /// Unregisters a failure listener.
    pub fn unregister_connection_failed_listener(
        &self,
        listener: &Arc<dyn OnConnectionFailedListener>,
    ) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap();
        let before = listeners.failed.len();
        listeners
            .failed
            .retain(|registered| !Arc::ptr_eq(registered, listener));
        listeners.failed.len() != before
    }
}
