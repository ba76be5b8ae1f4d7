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

use std::thread;
use std::time::Duration;

use gms_broker::{wait_until, FnService, LocalBroker};

use super::*;

fn recording_broker(id: ServiceId) -> (LocalBroker, Arc<Mutex<Vec<u32>>>) {
    let broker = LocalBroker::new();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let recorded_clone = recorded.clone();
    broker.register(
        id,
        FnService::new(move |code, _data| {
            recorded_clone.lock().unwrap().push(code);
            Ok(Vec::new())
        }),
    );
    (broker, recorded)
}

// @tc.name: ut_proxy_replay_order
// @tc.desc: Test queued invocations replaying in order over one bind
// @tc.precon: NA
// @tc.step: 1. Gate the bind and invoke three operations
//           2. Open the gate
// @tc.expect: The service sees the operations in invocation order and
//             the channel is unbound afterwards
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_proxy_replay_order_001() {
    let id = ServiceId(31);
    let (broker, recorded) = recording_broker(id);
    let gate = broker.gate_binds(id);
    let proxy = RemoteListenerProxy::new(broker.locator(), id);

    for code in 1..=3u32 {
        proxy.invoke(move |service| {
            let _ = service.transact(code, &[]);
        });
    }
    assert!(recorded.lock().unwrap().is_empty());

    gate.open();
    assert!(wait_until(
        || *recorded.lock().unwrap() == vec![1, 2, 3],
        Duration::from_secs(2)
    ));
    assert!(wait_until(
        || broker.active_binds(id) == 0,
        Duration::from_secs(2)
    ));
    assert_eq!(broker.bind_count(id), 1);
    assert_eq!(proxy.pending(), 0);
}

// @tc.name: ut_proxy_rebind
// @tc.desc: Test a fresh bind per delivery round
// @tc.precon: NA
// @tc.step: 1. Invoke once and let the queue drain
//           2. Invoke again
// @tc.expect: Each round binds anew and unbinds afterwards
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_proxy_rebind_001() {
    let id = ServiceId(32);
    let (broker, recorded) = recording_broker(id);
    let proxy = RemoteListenerProxy::new(broker.locator(), id);

    proxy.invoke(|service| {
        let _ = service.transact(1, &[]);
    });
    assert!(wait_until(
        || *recorded.lock().unwrap() == vec![1] && broker.active_binds(id) == 0,
        Duration::from_secs(2)
    ));

    proxy.invoke(|service| {
        let _ = service.transact(2, &[]);
    });
    assert!(wait_until(
        || *recorded.lock().unwrap() == vec![1, 2] && broker.active_binds(id) == 0,
        Duration::from_secs(2)
    ));
    assert_eq!(broker.bind_count(id), 2);
}

// @tc.name: ut_proxy_bind_failure
// @tc.desc: Test operations surviving a failed bind
// @tc.precon: NA
// @tc.step: 1. Arm one bind refusal and invoke
//           2. Invoke again once the refusal is spent
// @tc.expect: The first operation stays queued and both are delivered
//             by the retry
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_proxy_bind_failure_001() {
    let id = ServiceId(33);
    let (broker, recorded) = recording_broker(id);
    broker.fail_binds(id, 1);
    let proxy = RemoteListenerProxy::new(broker.locator(), id);

    proxy.invoke(|service| {
        let _ = service.transact(1, &[]);
    });
    assert!(wait_until(
        || broker.bind_attempts(id) == 1,
        Duration::from_secs(2)
    ));
    assert!(recorded.lock().unwrap().is_empty());
    assert_eq!(proxy.pending(), 1);

    // Let the failed drain task finish before re-invoking.
    thread::sleep(Duration::from_millis(100));
    proxy.invoke(|service| {
        let _ = service.transact(2, &[]);
    });
    assert!(wait_until(
        || *recorded.lock().unwrap() == vec![1, 2],
        Duration::from_secs(2)
    ));
    assert_eq!(broker.bind_count(id), 1);
}
