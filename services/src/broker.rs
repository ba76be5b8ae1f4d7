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

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, Weak};

use gms_core::connection_result::{API_UNAVAILABLE, CAUSE_SERVICE_DISCONNECTED};
use gms_core::{
    BindError, GetServiceRequest, HandshakeCallback, HandshakeResponse, RawChannel, ServiceId,
    ServiceLocator,
};
use log::{debug, info, warn};

use crate::channel::{deliver, LocalChannel};
use crate::service::BrokeredService;

struct Registration {
    service: Arc<dyn BrokeredService>,
    status_override: Option<i32>,
    fail_binds: u32,
    bind_attempts: u32,
    bind_count: u32,
    bind_gate: Option<Arc<GateShared>>,
    handshake_gate: Option<Arc<HoldShared>>,
    channels: Vec<Weak<LocalChannel>>,
}

impl Registration {
    fn new(service: Arc<dyn BrokeredService>) -> Self {
        Self {
            service,
            status_override: None,
            fail_binds: 0,
            bind_attempts: 0,
            bind_count: 0,
            bind_gate: None,
            handshake_gate: None,
            channels: Vec::new(),
        }
    }
}

pub(crate) struct BrokerShared {
    registry: Mutex<HashMap<ServiceId, Registration>>,
}

impl BrokerShared {
    pub(crate) fn handshake(
        &self,
        service_id: ServiceId,
        request: GetServiceRequest,
        callback: HandshakeCallback,
    ) {
        let (service, status_override, gate) = {
            let registry = self.registry.lock().unwrap();
            match registry.get(&service_id) {
                Some(reg) => (
                    Some(reg.service.clone()),
                    reg.status_override,
                    reg.handshake_gate.clone(),
                ),
                None => (None, None, None),
            }
        };
        // User code answers the handshake outside the registry lock.
        let response = match service {
            None => {
                warn!("handshake for unregistered {}", service_id);
                HandshakeResponse::failure(API_UNAVAILABLE)
            }
            Some(_) if status_override.is_some() => {
                HandshakeResponse::failure(status_override.unwrap())
            }
            Some(service) => match service.on_get_service(&request) {
                Ok((handle, hint)) => HandshakeResponse::success(handle, hint),
                Err(status) => HandshakeResponse::failure(status),
            },
        };
        debug!("handshake for {} answered, status {}", service_id, response.status);
        match gate {
            Some(gate) => {
                if let Some((callback, response)) = gate.park_or_pass(callback, response) {
                    deliver(callback, response);
                }
            }
            None => deliver(callback, response),
        }
    }

    pub(crate) fn transact(
        &self,
        service_id: ServiceId,
        code: u32,
        data: &[u8],
    ) -> Result<Vec<u8>, i32> {
        let service = {
            let registry = self.registry.lock().unwrap();
            registry
                .get(&service_id)
                .map(|reg| reg.service.clone())
                .ok_or(API_UNAVAILABLE)?
        };
        service.on_transact(code, data)
    }
}

/// An in-process broker hosting [`BrokeredService`]s.
///
/// Cloning is cheap and every clone shares the registry. The broker is
/// the [`ServiceLocator`] handed to the client framework; on top of the
/// locator contract it offers deterministic fault injection used by the
/// framework's tests.
#[derive(Clone)]
pub struct LocalBroker {
    shared: Arc<BrokerShared>,
}

impl Default for LocalBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(BrokerShared {
                registry: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns this broker as the locator capability for clients.
    pub fn locator(&self) -> Arc<dyn ServiceLocator> {
        Arc::new(self.clone())
    }

    /// Registers `service` under `service_id`, replacing any previous
    /// registration.
    pub fn register(&self, service_id: ServiceId, service: impl BrokeredService + 'static) {
        info!("register {}", service_id);
        self.shared
            .registry
            .lock()
            .unwrap()
            .insert(service_id, Registration::new(Arc::new(service)));
    }

    /// Removes the registration for `service_id`. Existing channels keep
    /// their handles but further binds fail with
    /// [`BindError::ServiceNotFound`].
    pub fn unregister(&self, service_id: ServiceId) {
        info!("unregister {}", service_id);
        self.shared.registry.lock().unwrap().remove(&service_id);
    }

    /// Forces every subsequent handshake for `service_id` to fail with
    /// `status`, without consulting the service. `None` restores normal
    /// handshakes.
    pub fn set_handshake_status(&self, service_id: ServiceId, status: Option<i32>) {
        let mut registry = self.shared.registry.lock().unwrap();
        match registry.get_mut(&service_id) {
            Some(reg) => reg.status_override = status,
            None => warn!("set_handshake_status: {} not registered", service_id),
        }
    }

    /// Parks every handshake response for `service_id` until the returned
    /// gate is released, preserving arrival order.
    pub fn hold_handshakes(&self, service_id: ServiceId) -> HandshakeGate {
        let shared = Arc::new(HoldShared {
            state: Mutex::new(HoldState {
                released: false,
                held: Vec::new(),
            }),
        });
        let mut registry = self.shared.registry.lock().unwrap();
        match registry.get_mut(&service_id) {
            Some(reg) => reg.handshake_gate = Some(shared.clone()),
            None => warn!("hold_handshakes: {} not registered", service_id),
        }
        HandshakeGate { shared }
    }

    /// Blocks every `bind` call for `service_id` until the returned gate
    /// is opened.
    pub fn gate_binds(&self, service_id: ServiceId) -> BindGate {
        let shared = Arc::new(GateShared {
            open: Mutex::new(false),
            cond: Condvar::new(),
        });
        let mut registry = self.shared.registry.lock().unwrap();
        match registry.get_mut(&service_id) {
            Some(reg) => reg.bind_gate = Some(shared.clone()),
            None => warn!("gate_binds: {} not registered", service_id),
        }
        BindGate { shared }
    }

    /// Makes the next `count` binds of `service_id` fail with
    /// [`BindError::BindRefused`].
    pub fn fail_binds(&self, service_id: ServiceId, count: u32) {
        let mut registry = self.shared.registry.lock().unwrap();
        match registry.get_mut(&service_id) {
            Some(reg) => reg.fail_binds = count,
            None => warn!("fail_binds: {} not registered", service_id),
        }
    }

    /// Simulates death of `service_id`: the registration is dropped and
    /// every death recipient linked to one of its live channels fires
    /// with [`CAUSE_SERVICE_DISCONNECTED`].
    pub fn kill(&self, service_id: ServiceId) {
        info!("kill {}", service_id);
        let channels = self
            .shared
            .registry
            .lock()
            .unwrap()
            .remove(&service_id)
            .map(|reg| reg.channels)
            .unwrap_or_default();
        // Recipients run outside the registry lock; they may re-enter the
        // broker.
        for weak in channels {
            if let Some(channel) = weak.upgrade() {
                channel.notify_death(CAUSE_SERVICE_DISCONNECTED);
            }
        }
    }

    /// Number of successful binds of `service_id` so far.
    pub fn bind_count(&self, service_id: ServiceId) -> u32 {
        let registry = self.shared.registry.lock().unwrap();
        registry.get(&service_id).map_or(0, |reg| reg.bind_count)
    }

    /// Number of bind attempts for `service_id`, refused ones included.
    pub fn bind_attempts(&self, service_id: ServiceId) -> u32 {
        let registry = self.shared.registry.lock().unwrap();
        registry.get(&service_id).map_or(0, |reg| reg.bind_attempts)
    }

    /// Number of currently live channels bound to `service_id`.
    pub fn active_binds(&self, service_id: ServiceId) -> usize {
        let mut registry = self.shared.registry.lock().unwrap();
        match registry.get_mut(&service_id) {
            Some(reg) => {
                reg.channels.retain(|weak| weak.strong_count() > 0);
                reg.channels.len()
            }
            None => 0,
        }
    }
}

impl ServiceLocator for LocalBroker {
    fn bind(&self, service_id: ServiceId) -> Result<Arc<dyn RawChannel>, BindError> {
        let gate = {
            let registry = self.shared.registry.lock().unwrap();
            registry
                .get(&service_id)
                .and_then(|reg| reg.bind_gate.clone())
        };
        if let Some(gate) = gate {
            gate.wait();
        }
        let mut registry = self.shared.registry.lock().unwrap();
        let reg = registry
            .get_mut(&service_id)
            .ok_or(BindError::ServiceNotFound)?;
        reg.bind_attempts += 1;
        if reg.fail_binds > 0 {
            reg.fail_binds -= 1;
            debug!("bind of {} refused", service_id);
            return Err(BindError::BindRefused);
        }
        let channel = Arc::new(LocalChannel::new(service_id, self.shared.clone()));
        reg.channels.push(Arc::downgrade(&channel));
        reg.bind_count += 1;
        debug!("bind of {} succeeded, count {}", service_id, reg.bind_count);
        Ok(channel)
    }
}

struct GateShared {
    open: Mutex<bool>,
    cond: Condvar,
}

impl GateShared {
    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cond.wait(open).unwrap();
        }
    }
}

/// Handle controlling binds gated by [`LocalBroker::gate_binds`].
#[derive(Clone)]
pub struct BindGate {
    shared: Arc<GateShared>,
}

impl BindGate {
    /// Opens the gate, releasing blocked binds and letting later ones
    /// pass.
    pub fn open(&self) {
        *self.shared.open.lock().unwrap() = true;
        self.shared.cond.notify_all();
    }
}

struct HoldState {
    released: bool,
    held: Vec<(HandshakeCallback, HandshakeResponse)>,
}

struct HoldShared {
    state: Mutex<HoldState>,
}

impl HoldShared {
    /// Parks the response, or hands it back when the gate has already been
    /// released.
    fn park_or_pass(
        &self,
        callback: HandshakeCallback,
        response: HandshakeResponse,
    ) -> Option<(HandshakeCallback, HandshakeResponse)> {
        let mut state = self.state.lock().unwrap();
        if state.released {
            Some((callback, response))
        } else {
            state.held.push((callback, response));
            None
        }
    }
}

/// Handle controlling handshakes parked by
/// [`LocalBroker::hold_handshakes`].
#[derive(Clone)]
pub struct HandshakeGate {
    shared: Arc<HoldShared>,
}

impl HandshakeGate {
    /// Number of handshake responses currently parked.
    pub fn held(&self) -> usize {
        self.shared.state.lock().unwrap().held.len()
    }

    /// Delivers every parked response in arrival order and lets later
    /// handshakes pass through.
    pub fn release(&self) {
        let held = {
            let mut state = self.shared.state.lock().unwrap();
            state.released = true;
            std::mem::take(&mut state.held)
        };
        for (callback, response) in held {
            deliver(callback, response);
        }
    }
}
