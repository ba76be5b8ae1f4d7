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

use std::sync::{Arc, Mutex, MutexGuard};

use gms_core::connection_result::{
    API_UNAVAILABLE, INTERNAL_ERROR, SERVICE_MISSING, SUCCESS,
};
use gms_core::{
    BindError, ConnectionResult, GetServiceRequest, HandshakeResponse, RawChannel, RemoteService,
    ServiceId, ServiceLocator,
};
use log::{debug, info, warn};
use ylong_runtime::time::sleep;

use super::{ApiConnection, ConnectOptions, ConnectionCallbacks, ConnectionState, OnConnectionFailedListener};
use crate::utils::runtime_spawn;

struct ClientState {
    state: ConnectionState,
    channel: Option<Arc<dyn RawChannel>>,
    service: Option<Arc<dyn RemoteService>>,
    // Death cause recorded while the handshake is still in flight; the
    // handshake outcome settles against it.
    died: Option<i32>,
    // Bumped by every connect(); outcomes of earlier attempts carry the
    // generation they belong to and are dropped when it no longer matches.
    generation: u64,
}

impl ClientState {
    /// Resets to NotConnected and hands the channel back; dropping it
    /// unbinds.
    fn clear(&mut self) -> Option<Arc<dyn RawChannel>> {
        self.state = ConnectionState::NotConnected;
        self.service = None;
        self.died = None;
        self.channel.take()
    }
}

struct ClientShared {
    service_id: ServiceId,
    locator: Arc<dyn ServiceLocator>,
    options: ConnectOptions,
    callbacks: Arc<dyn ConnectionCallbacks>,
    failed_listener: Arc<dyn OnConnectionFailedListener>,
    state: Mutex<ClientState>,
}

/// The connection state machine for a single service.
///
/// Cloning is cheap and all clones drive the same connection. Lifecycle
/// outcomes are reported through the callbacks handed to
/// [`GmsClient::new`]; they are invoked without any internal lock held.
#[derive(Clone)]
pub struct GmsClient {
    shared: Arc<ClientShared>,
}

impl GmsClient {
    /// Creates a disconnected client for `service_id`.
    pub fn new(
        service_id: ServiceId,
        locator: Arc<dyn ServiceLocator>,
        options: ConnectOptions,
        callbacks: Arc<dyn ConnectionCallbacks>,
        failed_listener: Arc<dyn OnConnectionFailedListener>,
    ) -> Self {
        Self {
            shared: Arc::new(ClientShared {
                service_id,
                locator,
                options,
                callbacks,
                failed_listener,
                state: Mutex::new(ClientState {
                    state: ConnectionState::NotConnected,
                    channel: None,
                    service: None,
                    died: None,
                    generation: 0,
                }),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.shared.state.lock().unwrap()
    }

    /// Runs bind attempts and the handshake for one connect() call.
    async fn run_connect(self, generation: u64) {
        let options = &self.shared.options;
        let mut attempt = 0;
        let channel = loop {
            if !self.still_connecting(generation) {
                return;
            }
            attempt += 1;
            match self.shared.locator.bind(self.shared.service_id) {
                Ok(channel) => break channel,
                Err(BindError::ServiceNotFound) => {
                    self.bind_failed(generation, SERVICE_MISSING);
                    return;
                }
                Err(BindError::BindRefused) => {
                    if attempt >= options.bind_attempts {
                        warn!(
                            "{} bind gave up after {} attempts",
                            self.shared.service_id, attempt
                        );
                        self.bind_failed(generation, API_UNAVAILABLE);
                        return;
                    }
                    debug!(
                        "{} bind attempt {} refused, retrying",
                        self.shared.service_id, attempt
                    );
                    sleep(options.retry_delay).await;
                }
            }
        };
        {
            let mut state = self.lock_state();
            if state.generation != generation {
                return;
            }
            match state.state {
                ConnectionState::Connecting => state.channel = Some(channel.clone()),
                ConnectionState::Disconnecting => {
                    // Disconnect won the race; dropping the fresh channel
                    // unbinds it.
                    state.clear();
                    return;
                }
                _ => return,
            }
        }
        // Linked before the handshake so a death at any later point is
        // observed.
        let recipient = self.clone();
        channel.link_to_death(Box::new(move |cause| {
            recipient.remote_died(generation, cause);
        }));
        let mut request =
            GetServiceRequest::new(self.shared.service_id, options.package_name.clone());
        request.account = options.account.clone();
        request.extras = options.extras.clone();
        let client = self.clone();
        channel.get_service(
            request,
            Box::new(move |response| client.handle_handshake(generation, response)),
        );
    }

    /// Whether the attempt of `generation` is still the current,
    /// unabandoned one. Settles an abandoned attempt's state on the way
    /// out.
    fn still_connecting(&self, generation: u64) -> bool {
        let mut state = self.lock_state();
        if state.generation != generation {
            return false;
        }
        match state.state {
            ConnectionState::Connecting => true,
            ConnectionState::Disconnecting => {
                debug!("{} connect attempt abandoned", self.shared.service_id);
                state.clear();
                false
            }
            _ => false,
        }
    }

    fn bind_failed(&self, generation: u64, status: i32) {
        {
            let mut state = self.lock_state();
            if state.generation != generation {
                return;
            }
            match state.state {
                ConnectionState::Connecting => {
                    state.clear();
                }
                ConnectionState::Disconnecting => {
                    // The caller asked to disconnect; settle silently.
                    state.clear();
                    return;
                }
                _ => return,
            }
        }
        let result = ConnectionResult::new(status);
        info!("{} connection failed: {}", self.shared.service_id, result);
        self.shared.failed_listener.on_connection_failed(&result);
    }

    fn handle_handshake(&self, generation: u64, response: HandshakeResponse) {
        let outcome = {
            let mut state = self.lock_state();
            if state.generation != generation {
                debug!("{} stale handshake dropped", self.shared.service_id);
                return;
            }
            match state.state {
                ConnectionState::Disconnecting => {
                    // The caller disconnected while the handshake was in
                    // flight; its outcome no longer matters.
                    debug!(
                        "{} handshake discarded while disconnecting",
                        self.shared.service_id
                    );
                    state.clear();
                    return;
                }
                ConnectionState::Connecting => match (response.status, response.service) {
                    (SUCCESS, Some(service)) => {
                        if let Some(cause) = state.died.take() {
                            warn!(
                                "{} remote died before the handshake settled, cause {}",
                                self.shared.service_id, cause
                            );
                            state.clear();
                            Err(ConnectionResult::with_message(
                                INTERNAL_ERROR,
                                None,
                                "remote died during handshake",
                            ))
                        } else {
                            state.state = ConnectionState::Connected;
                            state.service = Some(service);
                            Ok(response.hint)
                        }
                    }
                    (SUCCESS, None) => {
                        warn!(
                            "{} success handshake without a handle",
                            self.shared.service_id
                        );
                        state.clear();
                        Err(ConnectionResult::new(INTERNAL_ERROR))
                    }
                    (status, _) => {
                        state.clear();
                        Err(ConnectionResult::new(status))
                    }
                },
                _ => {
                    warn!(
                        "{} handshake in unexpected state {:?}",
                        self.shared.service_id, state.state
                    );
                    return;
                }
            }
        };
        match outcome {
            Ok(hint) => {
                info!("{} connected", self.shared.service_id);
                self.shared.callbacks.on_connected(&hint);
            }
            Err(result) => {
                info!("{} connection failed: {}", self.shared.service_id, result);
                self.shared.failed_listener.on_connection_failed(&result);
            }
        }
    }

    fn remote_died(&self, generation: u64, cause: i32) {
        {
            let mut state = self.lock_state();
            if state.generation != generation {
                return;
            }
            match state.state {
                ConnectionState::Connected => {
                    state.clear();
                }
                ConnectionState::Connecting => {
                    // The handshake outcome is still owed; record the death
                    // so it settles as a failure.
                    state.died = Some(cause);
                    return;
                }
                _ => return,
            }
        }
        warn!("{} remote died, cause {}", self.shared.service_id, cause);
        self.shared.callbacks.on_connection_suspended(cause);
    }
}

impl ApiConnection for GmsClient {
    fn connect(&self) {
        let generation = {
            let mut state = self.lock_state();
            match state.state {
                ConnectionState::Connected | ConnectionState::Connecting => {
                    debug!("{} already connecting or connected", self.shared.service_id);
                    return;
                }
                ConnectionState::NotConnected | ConnectionState::Disconnecting => {}
            }
            state.generation += 1;
            state.state = ConnectionState::Connecting;
            state.channel = None;
            state.service = None;
            state.generation
        };
        info!("{} connecting", self.shared.service_id);
        let client = self.clone();
        runtime_spawn(async move {
            client.run_connect(generation).await;
        });
    }

    fn disconnect(&self) {
        let mut state = self.lock_state();
        match state.state {
            ConnectionState::NotConnected | ConnectionState::Disconnecting => {}
            ConnectionState::Connecting => {
                // The in-flight attempt settles the state when its outcome
                // arrives.
                info!("{} disconnect requested while connecting", self.shared.service_id);
                state.state = ConnectionState::Disconnecting;
            }
            ConnectionState::Connected => {
                state.clear();
                info!("{} disconnected", self.shared.service_id);
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.lock_state().state == ConnectionState::Connected
    }

    fn is_connecting(&self) -> bool {
        self.lock_state().state == ConnectionState::Connecting
    }

    fn service(&self) -> Option<Arc<dyn RemoteService>> {
        self.lock_state().service.clone()
    }
}
