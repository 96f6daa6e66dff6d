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

//! End-to-end pipeline orchestration.
//!
//! One run reads both sources, materializes the four dimensions and the
//! fact table, and overwrites the previous output of each table. A run
//! either produces all five tables or surfaces the first fatal error;
//! there is no finer-grained partial-success reporting than per table.

use datafusion::prelude::DataFrame;
use uuid::Uuid;

use crate::dimensions;
use crate::errors::EtlError;
use crate::readwriter::TableWriter;
use crate::session::EtlSession;
use crate::songplays;
use crate::storage::StorageLocation;

pub const TABLE_SONGS: &str = "songs";
pub const TABLE_ARTISTS: &str = "artists";
pub const TABLE_USERS: &str = "users";
pub const TABLE_TIME: &str = "time";
pub const TABLE_SONGPLAYS: &str = "songplays";

/// Row counts of the tables written by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}

/// Runs the full pipeline from `input` to `output`.
pub async fn run(
    session: &EtlSession,
    input: &StorageLocation,
    output: &StorageLocation,
) -> Result<PipelineSummary, EtlError> {
    let run_id = Uuid::new_v4();
    tracing::info!(%run_id, input = input.url(), output = output.url(), "starting pipeline run");

    session.register_location(input)?;
    session.register_location(output)?;

    let reader = session.read(input);
    let mut summary = PipelineSummary::default();

    let raw_songs = reader.songs().await?;
    summary.songs = write_table(
        dimensions::songs_dimension(raw_songs.clone())?,
        output,
        TABLE_SONGS,
        &["year", "artist_id"],
    )
    .await?;
    summary.artists = write_table(
        dimensions::artists_dimension(raw_songs.clone())?,
        output,
        TABLE_ARTISTS,
        &[],
    )
    .await?;

    let raw_events = reader.events().await?;
    summary.users = write_table(
        dimensions::users_dimension(raw_events.clone())?,
        output,
        TABLE_USERS,
        &[],
    )
    .await?;
    summary.time = write_table(
        dimensions::time_dimension(raw_events.clone())?,
        output,
        TABLE_TIME,
        &["year", "month"],
    )
    .await?;

    summary.songplays = write_table(
        songplays::songplays_fact(raw_events, raw_songs)?,
        output,
        TABLE_SONGPLAYS,
        &["year", "month"],
    )
    .await?;

    tracing::info!(%run_id, ?summary, "pipeline run complete");
    Ok(summary)
}

async fn write_table(
    table: DataFrame,
    output: &StorageLocation,
    name: &str,
    partition_by: &[&str],
) -> Result<usize, EtlError> {
    let rows = table.clone().count().await?;
    tracing::info!(table = name, rows, "materialized table");

    TableWriter::new(table)
        .partition_by(partition_by.iter().copied())
        .save(&output.child(name)?)
        .await?;
    tracing::info!(table = name, "write done");

    Ok(rows)
}
