// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Pipeline session wrapping the DataFusion execution context.
//!
//! The session is passed explicitly to every component rather than living
//! in ambient global state, so tests can build their own local sessions
//! with substitute configurations.

use datafusion::prelude::{SessionConfig, SessionContext};
use uuid::Uuid;

use crate::errors::EtlError;
use crate::readwriter::SourceReader;
use crate::storage::StorageLocation;

/// EtlSessionBuilder creates an [EtlSession] backed by an in-process
/// DataFusion context.
#[derive(Clone, Debug, Default)]
pub struct EtlSessionBuilder {
    app_name: Option<String>,
    target_partitions: Option<usize>,
}

impl EtlSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a name for the application, included on the session's log
    /// events.
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Overrides the engine's partition count for scans, joins and
    /// aggregations. Defaults to the number of CPU cores.
    pub fn target_partitions(mut self, n: usize) -> Self {
        self.target_partitions = Some(n);
        self
    }

    /// Builds the session.
    pub fn build(&self) -> Result<EtlSession, EtlError> {
        let mut config = SessionConfig::new();
        if let Some(n) = self.target_partitions {
            config = config.with_target_partitions(n);
        }

        let session = EtlSession {
            ctx: SessionContext::new_with_config(config),
            session_id: Uuid::new_v4().to_string(),
            app_name: self
                .app_name
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
        };

        tracing::debug!(
            app = %session.app_name,
            session_id = %session.session_id,
            "session created"
        );

        Ok(session)
    }
}

/// The entry point for running transformations against the in-process
/// execution engine.
#[derive(Clone)]
pub struct EtlSession {
    ctx: SessionContext,
    session_id: String,
    app_name: String,
}

impl EtlSession {
    /// The underlying DataFusion context.
    pub fn ctx(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Makes a storage location's object store available to the engine for
    /// reads and writes under that location's URL scheme and authority.
    pub fn register_location(&self, location: &StorageLocation) -> Result<(), EtlError> {
        let base = location.base_url()?;
        self.ctx.register_object_store(&base, location.store());
        Ok(())
    }

    /// Returns a [SourceReader] that loads raw records below `source`.
    pub fn read(&self, source: &StorageLocation) -> SourceReader {
        SourceReader::new(self.clone(), source.clone())
    }
}

impl std::fmt::Debug for EtlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtlSession")
            .field("app_name", &self.app_name)
            .field("session_id", &self.session_id)
            .finish()
    }
}
