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

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gms_broker::{wait_until, FnService, LocalBroker};
use gms_core::connection_result::{SERVICE_DISABLED, SERVICE_MISSING};
use gms_core::ServiceId;
use once_cell::sync::Lazy;

use super::*;

static LOG: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

fn echo_broker(id: ServiceId) -> LocalBroker {
    Lazy::force(&LOG);
    let broker = LocalBroker::new();
    broker.register(id, FnService::new(|_code, data| Ok(data.to_vec())));
    broker
}

// @tc.name: ut_manager_queue_order
// @tc.desc: Test in-order replay of calls scheduled before the
//           connection is up
// @tc.precon: NA
// @tc.step: 1. Hold the handshake and schedule three calls
//           2. Release the handshake
// @tc.expect: All calls complete in scheduling order over one bind
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_manager_queue_order_001() {
    let id = ServiceId(21);
    let broker = echo_broker(id);
    let gate = broker.hold_handshakes(id);
    let entry = ApiManager::init(broker.locator(), ConnectOptions::default());
    let api = ApiId::new(id);

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut results = Vec::new();
    for i in 0..3u32 {
        let order_clone = order.clone();
        results.push(entry.schedule_task(api.clone(), move |service| {
            let reply = service
                .transact(i, &[])
                .map_err(ConnectionResult::new)?;
            order_clone.lock().unwrap().push(i);
            Ok(reply)
        }));
    }

    assert!(wait_until(|| gate.held() == 1, Duration::from_secs(2)));
    assert!(order.lock().unwrap().is_empty());
    gate.release();

    for result in results {
        assert!(result.await_result().unwrap().is_ok());
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(broker.bind_count(id), 1);
}

// @tc.name: ut_manager_schedule_behind_queue
// @tc.desc: Test a call scheduled after the connection came up but
//           before the worker drained the queue
// @tc.precon: NA
// @tc.step: 1. Queue a call and let the connection come up in the
//              background
//           2. Schedule a second call before handling the connected
//              event, then handle it
// @tc.expect: Both calls run in scheduling order
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_manager_schedule_behind_queue_001() {
    let id = ServiceId(25);
    let broker = echo_broker(id);
    let (tx, rx) = unbounded_channel();
    let mut manager = ApiManager {
        locator: broker.locator(),
        options: ConnectOptions::default(),
        clients: HashMap::new(),
        waiting: HashMap::new(),
        tx,
        rx,
    };
    let api = ApiId::new(id);
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = order.clone();
    manager.handle_event(ApiEvent::Schedule(
        api.clone(),
        Box::new(move |outcome| {
            assert!(outcome.is_ok());
            first.lock().unwrap().push(1);
        }),
    ));
    assert!(wait_until(
        || manager
            .clients
            .get(&api)
            .map_or(false, |client| client.service(&api).is_some()),
        Duration::from_secs(2)
    ));

    let second = order.clone();
    manager.handle_event(ApiEvent::Schedule(
        api.clone(),
        Box::new(move |outcome| {
            assert!(outcome.is_ok());
            second.lock().unwrap().push(2);
        }),
    ));
    assert!(order.lock().unwrap().is_empty());

    manager.handle_event(ApiEvent::Connected(api, ConnectionHint::new()));
    assert_eq!(*order.lock().unwrap(), vec![1, 2]);
}

// @tc.name: ut_manager_failure_batch
// @tc.desc: Test failing every queued call with the attempt's outcome
// @tc.precon: NA
// @tc.step: 1. Force handshakes to fail and schedule two calls
// @tc.expect: Both calls fail with the handshake status
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_manager_failure_batch_001() {
    let id = ServiceId(22);
    let broker = echo_broker(id);
    broker.set_handshake_status(id, Some(SERVICE_DISABLED));
    let entry = ApiManager::init(broker.locator(), ConnectOptions::default());
    let api = ApiId::new(id);

    let first = entry.schedule_task(api.clone(), |service| {
        service.transact(0, &[]).map_err(ConnectionResult::new)
    });
    let second = entry.schedule_task(api, |service| {
        service.transact(0, &[]).map_err(ConnectionResult::new)
    });

    let first = first.await_result().unwrap().unwrap_err();
    assert_eq!(first.status(), SERVICE_DISABLED);
    let second = second.await_result().unwrap().unwrap_err();
    assert_eq!(second.status(), SERVICE_DISABLED);
}

// @tc.name: ut_manager_reuse
// @tc.desc: Test the cached connection serving later calls
// @tc.precon: NA
// @tc.step: 1. Schedule a call and let it complete
//           2. Schedule another one
// @tc.expect: Both complete over a single bind
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_manager_reuse_001() {
    let id = ServiceId(23);
    let broker = echo_broker(id);
    let entry = ApiManager::init(broker.locator(), ConnectOptions::default());
    let api = ApiId::new(id);

    let first = entry.schedule_task(api.clone(), |service| {
        service.transact(1, b"a").map_err(ConnectionResult::new)
    });
    assert_eq!(first.await_result().unwrap().unwrap(), b"a".to_vec());

    let second = entry.schedule_task(api, |service| {
        service.transact(2, b"b").map_err(ConnectionResult::new)
    });
    assert_eq!(second.await_result().unwrap().unwrap(), b"b".to_vec());
    assert_eq!(broker.bind_count(id), 1);
}

// @tc.name: ut_manager_unknown_service
// @tc.desc: Test scheduling against a service nobody hosts
// @tc.precon: NA
// @tc.step: 1. Schedule a call for an unregistered id
// @tc.expect: The call fails with SERVICE_MISSING
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_manager_unknown_service_001() {
    Lazy::force(&LOG);
    let broker = LocalBroker::new();
    let entry = ApiManager::init(broker.locator(), ConnectOptions::default());

    let result = entry.schedule_task(ApiId::new(ServiceId(24)), |service| {
        service.transact(0, &[]).map_err(ConnectionResult::new)
    });
    let failure = result.await_result().unwrap().unwrap_err();
    assert_eq!(failure.status(), SERVICE_MISSING);
}
