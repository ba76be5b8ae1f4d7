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

//! Connection status taxonomy.
//!
//! Every failed connection attempt is described by a [`ConnectionResult`]:
//! an integer status code, an optional resolution action an outer layer can
//! launch, and a message. Status codes below mirror the service handshake
//! protocol; anything other than [`SUCCESS`] means the handle is unusable.

use core::fmt;

/// The connection was successful.
pub const SUCCESS: i32 = 0;
/// The target service is missing on this device.
pub const SERVICE_MISSING: i32 = 1;
/// The installed service version is too old for this client.
pub const SERVICE_VERSION_UPDATE_REQUIRED: i32 = 2;
/// The service is installed but has been disabled.
pub const SERVICE_DISABLED: i32 = 3;
/// The user is not signed in; a sign-in resolution may be offered.
pub const SIGN_IN_REQUIRED: i32 = 4;
/// The account name supplied in the options is invalid.
pub const INVALID_ACCOUNT: i32 = 5;
/// Completing the connection requires running the attached resolution.
pub const RESOLUTION_REQUIRED: i32 = 6;
/// A network error occurred; retrying may resolve the problem.
pub const NETWORK_ERROR: i32 = 7;
/// An internal error occurred; retrying may resolve the problem.
pub const INTERNAL_ERROR: i32 = 8;
/// The installed service is not authentic.
pub const SERVICE_INVALID: i32 = 9;
/// The client is misconfigured; not recoverable.
pub const DEVELOPER_ERROR: i32 = 10;
/// The application failed its license check; not recoverable.
pub const LICENSE_CHECK_FAILED: i32 = 11;
/// The client canceled the connection attempt.
pub const CANCELED: i32 = 13;
/// A caller-specified deadline elapsed before the connection completed.
pub const TIMEOUT: i32 = 14;
/// The waiting thread was interrupted before the connection completed.
pub const INTERRUPTED: i32 = 15;
/// The requested API is not available on this device.
pub const API_UNAVAILABLE: i32 = 16;
/// The service lacks one or more permissions it requires.
pub const SERVICE_MISSING_PERMISSION: i32 = 19;

/// The remote service process went away after the connection was
/// established.
pub const CAUSE_SERVICE_DISCONNECTED: i32 = 1;
/// Network connectivity was lost while the connection was established.
pub const CAUSE_NETWORK_LOST: i32 = 2;

/// Returns the canonical name of a status code.
pub fn status_string(status: i32) -> &'static str {
    match status {
        SUCCESS => "SUCCESS",
        SERVICE_MISSING => "SERVICE_MISSING",
        SERVICE_VERSION_UPDATE_REQUIRED => "SERVICE_VERSION_UPDATE_REQUIRED",
        SERVICE_DISABLED => "SERVICE_DISABLED",
        SIGN_IN_REQUIRED => "SIGN_IN_REQUIRED",
        INVALID_ACCOUNT => "INVALID_ACCOUNT",
        RESOLUTION_REQUIRED => "RESOLUTION_REQUIRED",
        NETWORK_ERROR => "NETWORK_ERROR",
        INTERNAL_ERROR => "INTERNAL_ERROR",
        SERVICE_INVALID => "SERVICE_INVALID",
        DEVELOPER_ERROR => "DEVELOPER_ERROR",
        LICENSE_CHECK_FAILED => "LICENSE_CHECK_FAILED",
        CANCELED => "CANCELED",
        TIMEOUT => "TIMEOUT",
        INTERRUPTED => "INTERRUPTED",
        API_UNAVAILABLE => "API_UNAVAILABLE",
        SERVICE_MISSING_PERMISSION => "SERVICE_MISSING_PERMISSION",
        _ => "UNKNOWN_ERROR_CODE",
    }
}

/// An action that can potentially fix a reported connection failure, for
/// example a user-facing sign-in flow. The framework passes it through
/// untouched; only an outer layer knows how to launch it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Resolution {
    /// Opaque action identifier understood by the outer layer.
    pub action: String,
}

impl Resolution {
    /// Creates a resolution wrapping the given action identifier.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }
}

/// Structured cause of a connection failure.
#[derive(Clone, PartialEq, Debug)]
pub struct ConnectionResult {
    status: i32,
    resolution: Option<Resolution>,
    message: String,
}

impl ConnectionResult {
    /// Creates a result carrying only a status code.
    pub fn new(status: i32) -> Self {
        Self::with_resolution(status, None)
    }

    /// Creates a result carrying a status code and an optional resolution.
    pub fn with_resolution(status: i32, resolution: Option<Resolution>) -> Self {
        Self {
            status,
            resolution,
            message: status_string(status).to_string(),
        }
    }

    /// Creates a result with an explicit message.
    pub fn with_message(status: i32, resolution: Option<Resolution>, message: impl Into<String>) -> Self {
        Self {
            status,
            resolution,
            message: message.into(),
        }
    }

    /// Returns the status code, [`SUCCESS`] if no error occurred.
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Whether the connection attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS
    }

    /// Whether a resolution action is attached.
    pub fn has_resolution(&self) -> bool {
        self.resolution.is_some()
    }

    /// Returns the attached resolution action, if any.
    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConnectionResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConnectionResult({}: {})", self.status, self.message)
    }
}

impl std::error::Error for ConnectionResult {}
