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

//! One-shot result handles.
//!
//! A [`PendingResult`] is the handle returned to callers of asynchronous
//! framework operations. The producer delivers exactly one value; the
//! consumer takes it either by blocking (`await_result`, `await_timeout`)
//! or by registering a callback, but not both. The result is consumed at
//! most once, and cancellation suppresses both delivery paths.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::utils::runtime_spawn;

type ResultCallback<R> = Box<dyn FnOnce(R) + Send + Sync>;

struct Inner<R> {
    result: Option<R>,
    completed: bool,
    consumed: bool,
    canceled: bool,
    callback_fired: bool,
    callback: Option<ResultCallback<R>>,
}

struct Shared<R> {
    inner: Mutex<Inner<R>>,
    cond: Condvar,
}

/// Handle to the single result of an asynchronous operation.
///
/// Clones share the same slot; any clone may deliver, consume or cancel.
pub struct PendingResult<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for PendingResult<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R> Default for PendingResult<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> PendingResult<R> {
    /// Creates an empty, not yet completed result slot.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    result: None,
                    completed: false,
                    consumed: false,
                    canceled: false,
                    callback_fired: false,
                    callback: None,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Whether a result has been delivered (timeout results included).
    pub fn is_completed(&self) -> bool {
        self.shared.inner.lock().unwrap().completed
    }

    /// Whether this result has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.shared.inner.lock().unwrap().canceled
    }

    /// Cancels the operation from the consumer side.
    ///
    /// Blocked waiters wake up with `None` and a registered callback will
    /// never fire. Canceling after completion has no effect.
    pub fn cancel(&self) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.completed || inner.canceled {
                return;
            }
            inner.canceled = true;
            inner.callback = None;
        }
        self.shared.cond.notify_all();
    }

    /// Blocks until the result is delivered or the handle is canceled.
    ///
    /// Returns `None` only for cancellation. Consuming a result twice is a
    /// caller bug and panics.
    pub fn await_result(&self) -> Option<R> {
        let mut inner = self.shared.inner.lock().unwrap();
        assert!(
            !inner.consumed,
            "pending result consumed more than once"
        );
        while !inner.completed && !inner.canceled {
            inner = self.shared.cond.wait(inner).unwrap();
        }
        inner.consumed = true;
        if inner.canceled {
            return None;
        }
        inner.result.take()
    }

    /// Like [`PendingResult::await_result`] but gives up after `timeout`.
    ///
    /// A timeout leaves the slot untouched, so the caller may wait again
    /// or cancel.
    pub fn await_timeout(&self, timeout: Duration) -> Option<R> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.inner.lock().unwrap();
        assert!(
            !inner.consumed,
            "pending result consumed more than once"
        );
        while !inner.completed && !inner.canceled {
            let now = Instant::now();
            if now >= deadline {
                debug!("await_timeout elapsed without a result");
                return None;
            }
            let (guard, _) = self
                .shared
                .cond
                .wait_timeout(inner, deadline - now)
                .unwrap();
            inner = guard;
        }
        inner.consumed = true;
        if inner.canceled {
            return None;
        }
        inner.result.take()
    }
}

impl<R: Send + Sync + 'static> PendingResult<R> {
    /// Delivers the result, waking waiters or dispatching the registered
    /// callback on a runtime worker. A second delivery is dropped.
    pub fn deliver(&self, value: R) {
        let dispatch = {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.canceled {
                debug!("result for canceled operation dropped");
                return;
            }
            if inner.completed {
                warn!("duplicate result dropped");
                return;
            }
            inner.completed = true;
            match inner.callback.take() {
                Some(callback) => {
                    inner.consumed = true;
                    inner.callback_fired = true;
                    Some((callback, value))
                }
                None => {
                    inner.result = Some(value);
                    None
                }
            }
        };
        self.shared.cond.notify_all();
        if let Some((callback, value)) = dispatch {
            runtime_spawn(async move {
                callback(value);
            });
        }
    }

    /// Registers the consuming callback.
    ///
    /// If the result is already there the callback is dispatched right
    /// away, still on a runtime worker. The result has a single slot for
    /// its observer: at most one callback may ever be registered, later
    /// registrations are logged and dropped. Callers wanting several
    /// listeners fan out from the one registered callback.
    pub fn set_result_callback(&self, callback: impl FnOnce(R) + Send + Sync + 'static) {
        let dispatch = {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.canceled {
                debug!("callback for canceled operation dropped");
                return;
            }
            if inner.callback.is_some() || inner.callback_fired {
                error!("result callback registered twice");
                return;
            }
            if inner.completed {
                if inner.consumed {
                    error!("result callback registered after the result was consumed");
                    return;
                }
                inner.consumed = true;
                inner.callback_fired = true;
                let value = inner.result.take();
                value.map(|value| (Box::new(callback) as ResultCallback<R>, value))
            } else {
                inner.callback = Some(Box::new(callback));
                None
            }
        };
        if let Some((callback, value)) = dispatch {
            runtime_spawn(async move {
                callback(value);
            });
        }
    }

    /// Registers the consuming callback with a deadline.
    ///
    /// If nothing is delivered within `timeout`, `timeout_result` is
    /// delivered instead and the real result, should it still arrive, is
    /// dropped.
    pub fn set_result_callback_with_timeout(
        &self,
        callback: impl FnOnce(R) + Send + Sync + 'static,
        timeout: Duration,
        timeout_result: R,
    ) {
        self.set_result_callback(callback);
        let this = self.clone();
        runtime_spawn(async move {
            ylong_runtime::time::sleep(timeout).await;
            let expired = {
                let inner = this.shared.inner.lock().unwrap();
                !inner.completed && !inner.canceled
            };
            if expired {
                debug!("operation timed out, delivering the timeout result");
                this.deliver(timeout_result);
            }
        });
    }
}
