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

//! Star-schema ETL for song-play event logs.
//!
//! `playlake` reads raw song-catalog and listening-activity JSON from an
//! object-storage location, derives the songs, artists, users and time
//! dimensions plus the songplays fact table, and writes each one back as
//! partitioned Parquet. Transformations run on an in-process DataFusion
//! engine reached through an explicitly-passed session.
//!
//! # Quickstart
//!
//! Run the full pipeline against a pair of storage locations:
//!
//! ```rust
//! use playlake::pipeline;
//! use playlake::session::EtlSessionBuilder;
//! use playlake::storage::StorageLocation;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), playlake::EtlError> {
//!     let session = EtlSessionBuilder::new().app_name("playlake").build()?;
//!
//!     let input = StorageLocation::parse("s3://my-bucket/raw")?;
//!     let output = StorageLocation::parse("s3://my-bucket/warehouse")?;
//!
//!     let summary = pipeline::run(&session, &input, &output).await?;
//!     println!("{} plays resolved", summary.songplays);
//!
//!     Ok(())
//! }
//! ```
//!
//! Individual stages compose as well; every stage takes and returns
//! engine [DataFrame](datafusion::prelude::DataFrame)s:
//!
//! ```rust
//! let reader = session.read(&input);
//! let songs = dimensions::songs_dimension(reader.songs().await?)?;
//! TableWriter::new(songs)
//!     .partition_by(["year", "artist_id"])
//!     .save(&output.child("songs")?)
//!     .await?;
//! ```

pub mod config;
pub mod dimensions;
pub mod errors;
pub mod pipeline;
pub mod readwriter;
pub mod schema;
pub mod session;
pub mod songplays;
pub mod storage;

pub use errors::EtlError;
pub use readwriter::{SourceReader, TableWriter};
pub use session::{EtlSession, EtlSessionBuilder};
pub use storage::StorageLocation;
