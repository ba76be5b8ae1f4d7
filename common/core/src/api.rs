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

//! API identity types.
//!
//! A logical remote capability is addressed by an [`ApiId`]: the numeric id
//! of the service hosting it plus an optional options value (for example an
//! account name). Two requests carrying equal identities must resolve to the
//! same cached client, so the identity is the de-duplication key everywhere.

use core::fmt;

/// Numeric identity of a remote service.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ServiceId(pub u32);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "service#{}", self.0)
    }
}

/// Identity of one logical API a client wants: the backing service plus the
/// options it was requested with.
///
/// Equality and hashing cover both fields; the manager's client cache keys
/// on the full pair.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ApiId {
    /// The service backing this API.
    pub service_id: ServiceId,
    /// Options value distinguishing clients of the same service, if any.
    pub options: Option<String>,
}

impl ApiId {
    /// Creates an identity with no options.
    pub fn new(service_id: ServiceId) -> Self {
        Self {
            service_id,
            options: None,
        }
    }

    /// Creates an identity carrying an options value.
    pub fn with_options(service_id: ServiceId, options: impl Into<String>) -> Self {
        Self {
            service_id,
            options: Some(options.into()),
        }
    }
}

impl fmt::Display for ApiId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.options {
            Some(options) => write!(f, "{}[{}]", self.service_id, options),
            None => write!(f, "{}", self.service_id),
        }
    }
}
