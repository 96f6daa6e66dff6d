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

//! Defines an [EtlError] for representing failures across the pipeline.
//! Most of these are wrappers for arrow, datafusion or object_store error
//! messages.

use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use thiserror::Error;

/// Different pipeline error types.
///
/// Malformed source records and unresolved fact-table joins are *not*
/// errors: the former are skipped during the load, the latter surface as
/// null foreign keys in the output.
#[derive(Error, Debug)]
pub enum EtlError {
    /// No objects matched the expected input layout. Fatal, raised before
    /// any output is written.
    #[error("no input objects found under {location}")]
    SourceUnavailable { location: String },

    /// A storage location string could not be resolved to an object store.
    #[error("invalid storage location {location}: {message}")]
    InvalidLocation { location: String, message: String },

    /// Persisting a table failed. Fatal, no retry.
    #[error("write failed for {location}: {source}")]
    WriteFailure {
        location: String,
        #[source]
        source: DataFusionError,
    },

    #[error("Apache Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("query execution error: {0}")]
    Execution(#[from] DataFusionError),

    #[error("object storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    /// Wraps a location-parsing failure with the offending location string.
    pub fn invalid_location(location: impl Into<String>, error: impl std::fmt::Display) -> Self {
        EtlError::InvalidLocation {
            location: location.into(),
            message: error.to_string(),
        }
    }
}
