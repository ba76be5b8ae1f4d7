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
use gms_core::connection_result::SERVICE_DISABLED;
use gms_core::ServiceId;
use once_cell::sync::Lazy;

use super::*;

static LOG: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ConnectionCallbacks for Recorder {
    fn on_connected(&self, _hint: &ConnectionHint) {
        self.push("connected".to_string());
    }

    fn on_connection_suspended(&self, cause: i32) {
        self.push(format!("suspended:{}", cause));
    }
}

impl OnConnectionFailedListener for Recorder {
    fn on_connection_failed(&self, result: &ConnectionResult) {
        self.push(format!("failed:{}", result.status()));
    }
}

fn echo_broker(ids: &[ServiceId]) -> LocalBroker {
    Lazy::force(&LOG);
    let broker = LocalBroker::new();
    for id in ids {
        broker.register(*id, FnService::new(|_code, data| Ok(data.to_vec())));
    }
    broker
}

fn build_client(broker: &LocalBroker, apis: &[ApiId]) -> (ApiClient, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let mut builder = ApiClientBuilder::new(broker.locator())
        .add_connection_callbacks(recorder.clone())
        .add_on_connection_failed_listener(recorder.clone());
    for api in apis {
        builder = builder.add_api(api.clone());
    }
    (builder.build(), recorder)
}

// @tc.name: ut_client_aggregate_state
// @tc.desc: Test all-members is_connected and any-member is_connecting
// @tc.precon: NA
// @tc.step: 1. Connect two APIs with one member's handshake held
//           2. Check the aggregate state, then release the handshake
// @tc.expect: Connected only reads true once every member is connected
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_client_aggregate_state_001() {
    let first = ServiceId(11);
    let second = ServiceId(12);
    let broker = echo_broker(&[first, second]);
    let gate = broker.hold_handshakes(second);
    let api_first = ApiId::new(first);
    let api_second = ApiId::new(second);
    let (client, recorder) = build_client(&broker, &[api_first.clone(), api_second.clone()]);

    client.connect();
    assert!(wait_until(
        || client.has_connected_api(&api_first) && gate.held() == 1,
        Duration::from_secs(2)
    ));
    assert!(!client.is_connected());
    assert!(client.is_connecting());
    assert!(!client.has_connected_api(&api_second));

    gate.release();
    assert!(wait_until(
        || recorder.snapshot() == vec!["connected".to_string(), "connected".to_string()],
        Duration::from_secs(2)
    ));
    assert!(client.is_connected());
    assert!(!client.is_connecting());
    assert!(client.has_connected_api(&api_second));
}

// @tc.name: ut_client_usage_counter
// @tc.desc: Test disconnect deferred by the usage counter
// @tc.precon: NA
// @tc.step: 1. Connect and mark the client in use
//           2. Disconnect, then release the use
// @tc.expect: The disconnect only happens once the counter drops to zero
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_client_usage_counter_001() {
    let id = ServiceId(13);
    let broker = echo_broker(&[id]);
    let api = ApiId::new(id);
    let (client, _recorder) = build_client(&broker, &[api]);

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)));

    client.increment_usage_counter();
    client.disconnect();
    assert!(client.is_connected());

    client.decrement_usage_counter();
    assert!(!client.is_connected());
}

// @tc.name: ut_client_connect_cancels_deferred
// @tc.desc: Test that connect calls a pending disconnect off
// @tc.precon: NA
// @tc.step: 1. Defer a disconnect behind a usage count
//           2. Connect, then release the use
// @tc.expect: The client stays connected
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_client_connect_cancels_deferred_001() {
    let id = ServiceId(14);
    let broker = echo_broker(&[id]);
    let api = ApiId::new(id);
    let (client, _recorder) = build_client(&broker, &[api]);

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)));

    client.increment_usage_counter();
    client.disconnect();
    client.connect();
    client.decrement_usage_counter();
    thread::sleep(Duration::from_millis(100));
    assert!(client.is_connected());
}

// @tc.name: ut_client_idempotent_connect
// @tc.desc: Test that repeated connects share one attempt
// @tc.precon: NA
// @tc.step: 1. Call connect twice in a row
// @tc.expect: A single bind and a single connected event
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_client_idempotent_connect_001() {
    let id = ServiceId(15);
    let broker = echo_broker(&[id]);
    let api = ApiId::new(id);
    let (client, recorder) = build_client(&broker, &[api]);

    client.connect();
    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)));
    client.connect();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(broker.bind_count(id), 1);
    assert_eq!(recorder.snapshot(), vec!["connected".to_string()]);
}

// @tc.name: ut_client_listener_registration
// @tc.desc: Test idempotent listener registration and fan-out
// @tc.precon: NA
// @tc.step: 1. Register a second listener twice, connect, unregister
// @tc.expect: Registration reports duplicates, both listeners hear
//             events, unregistration is a one-time no-op
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_client_listener_registration_001() {
    let id = ServiceId(16);
    let broker = echo_broker(&[id]);
    let api = ApiId::new(id);
    let (client, recorder) = build_client(&broker, &[api]);

    let extra = Arc::new(Recorder::default());
    let callbacks = extra.clone() as Arc<dyn ConnectionCallbacks>;
    assert!(client.register_connection_callbacks(callbacks.clone()));
    assert!(!client.register_connection_callbacks(callbacks.clone()));
    assert!(client.is_connection_callbacks_registered(&callbacks));

    client.connect();
    let expected = vec!["connected".to_string()];
    assert!(wait_until(
        || recorder.snapshot() == expected && extra.snapshot() == expected,
        Duration::from_secs(2)
    ));
    assert!(client.is_connected());

    assert!(client.unregister_connection_callbacks(&callbacks));
    assert!(!client.unregister_connection_callbacks(&callbacks));
    assert!(!client.is_connection_callbacks_registered(&callbacks));
}

// @tc.name: ut_client_failure_fanout
// @tc.desc: Test failure fan-out to every registered listener
// @tc.precon: NA
// @tc.step: 1. Register a second failure listener
//           2. Connect against a disabled service
// @tc.expect: Both listeners hear the same failure
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
fn ut_client_failure_fanout_001() {
    let id = ServiceId(17);
    let broker = echo_broker(&[id]);
    broker.set_handshake_status(id, Some(SERVICE_DISABLED));
    let api = ApiId::new(id);
    let (client, recorder) = build_client(&broker, &[api]);

    let extra = Arc::new(Recorder::default());
    assert!(client
        .register_connection_failed_listener(extra.clone() as Arc<dyn OnConnectionFailedListener>));

    client.connect();
    let expected = vec![format!("failed:{}", SERVICE_DISABLED)];
    assert!(wait_until(
        || recorder.snapshot() == expected && extra.snapshot() == expected,
        Duration::from_secs(2)
    ));
    assert!(!client.is_connected());
}

// @tc.name: ut_client_usage_underflow
// @tc.desc: Test unbalanced usage counter decrements
// @tc.precon: NA
// @tc.step: 1. Decrement a fresh client's usage counter
// @tc.expect: Panic
// @tc.type: FUNC
// @tc.require: issues#ICN16H
#[test]
#[should_panic(expected = "usage counter underflow")]
fn ut_client_usage_underflow_001() {
    let id = ServiceId(18);
    let broker = echo_broker(&[id]);
    let (client, _recorder) = build_client(&broker, &[ApiId::new(id)]);
    client.decrement_usage_counter();
}
