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

//! Schedules a call against an in-process echo service and prints the
//! reply.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example echo
//! ```

use gms_broker::{FnService, LocalBroker};
use gms_client::{ApiManager, ConnectOptions};
use gms_core::{ApiId, ConnectionResult, ServiceId};

const ECHO_SERVICE: ServiceId = ServiceId(1);

fn main() {
    env_logger::init();

    let broker = LocalBroker::new();
    broker.register(
        ECHO_SERVICE,
        FnService::new(|_code, data| Ok(data.to_vec())),
    );

    let entry = ApiManager::init(broker.locator(), ConnectOptions::default());
    let result = entry.schedule_task(ApiId::new(ECHO_SERVICE), |service| {
        service
            .transact(1, b"hello from the client")
            .map_err(ConnectionResult::new)
    });

    match result.await_result() {
        Some(Ok(reply)) => println!("echoed: {}", String::from_utf8_lossy(&reply)),
        Some(Err(failure)) => eprintln!("connection failed: {}", failure),
        None => eprintln!("call canceled"),
    }
}
