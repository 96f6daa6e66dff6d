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

//! Command-line configuration for the `playlake` binary.

use clap::Parser;

/// Transform raw song-catalog and listening-activity JSON into a
/// star-schema Parquet dataset.
#[derive(Parser, Debug, Clone)]
#[command(name = "playlake", version, about)]
pub struct Cli {
    /// Source location holding `song_data/` and `log_data/`
    /// (`s3://bucket/prefix`, `file://` URL, or a local path).
    #[arg(long)]
    pub input: String,

    /// Destination location for the songs, artists, users, time and
    /// songplays tables.
    #[arg(long)]
    pub output: String,

    /// Partition count for the execution engine; defaults to the number
    /// of CPU cores.
    #[arg(long)]
    pub target_partitions: Option<usize>,
}
