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

//! Dimension tables projected and deduplicated from the raw frames.
//!
//! Songs and artists come from the catalog; users and time come from the
//! activity log. Each dimension drops rows missing its required fields,
//! truncates oversized identifier/text values, and collapses duplicate
//! keys. The users dimension sorts by event time before deduplicating so
//! the retained row always carries the most recently observed
//! subscription level.

use arrow::datatypes::{DataType, TimeUnit};
use datafusion::functions::expr_fn::{date_part, substring, to_char};
use datafusion::prelude::{cast, col, lit, try_cast, DataFrame, Expr};

use crate::errors::EtlError;
use crate::schema::{ID_MAX_CHARS, PAGE_NEXT_SONG, TEXT_MAX_CHARS};

/// Converts the raw epoch-millisecond `ts` column into the canonical
/// `start_time` timestamp.
///
/// The fact builder uses the same expression, so every fact row's
/// `start_time` is derivable in the time dimension by construction.
pub fn event_time() -> Expr {
    cast(
        col("ts"),
        DataType::Timestamp(TimeUnit::Millisecond, None),
    )
}

/// Activity rows that represent an actual song play with a usable
/// timestamp.
pub fn play_events(events: DataFrame) -> Result<DataFrame, EtlError> {
    Ok(events.filter(
        col("page")
            .eq(lit(PAGE_NEXT_SONG))
            .and(col("ts").is_not_null())
            .and(col("ts").gt(lit(0i64))),
    )?)
}

/// One row per distinct `song_id`, an arbitrary representative winning
/// among duplicates.
pub fn songs_dimension(songs: DataFrame) -> Result<DataFrame, EtlError> {
    let projected = songs
        .filter(
            non_empty("song_id")
                .and(non_empty("title"))
                .and(non_empty("artist_id"))
                .and(col("year").is_not_null())
                .and(col("duration").is_not_null()),
        )?
        .select(vec![
            trunc_id(col("song_id")).alias("song_id"),
            trunc_text(col("title")).alias("title"),
            trunc_id(col("artist_id")).alias("artist_id"),
            col("year"),
            col("duration"),
        ])?;

    Ok(projected.distinct_on(
        vec![col("song_id")],
        vec![
            col("song_id"),
            col("title"),
            col("artist_id"),
            col("year"),
            col("duration"),
        ],
        None,
    )?)
}

/// One row per distinct `artist_id`. Location and coordinates stay
/// nullable.
pub fn artists_dimension(songs: DataFrame) -> Result<DataFrame, EtlError> {
    let projected = songs
        .filter(non_empty("artist_id").and(non_empty("artist_name")))?
        .select(vec![
            trunc_id(col("artist_id")).alias("artist_id"),
            trunc_text(col("artist_name")).alias("name"),
            trunc_text(col("artist_location")).alias("location"),
            col("artist_latitude").alias("latitude"),
            col("artist_longitude").alias("longitude"),
        ])?;

    Ok(projected.distinct_on(
        vec![col("artist_id")],
        vec![
            col("artist_id"),
            col("name"),
            col("location"),
            col("latitude"),
            col("longitude"),
        ],
        None,
    )?)
}

/// One row per distinct user, taken from every activity row naming a
/// user, with the explicit descending time sort making the dedupe keep
/// the latest observed subscription level.
pub fn users_dimension(events: DataFrame) -> Result<DataFrame, EtlError> {
    let projected = events
        .filter(
            col("ts")
                .is_not_null()
                .and(col("ts").gt(lit(0i64)))
                .and(non_empty("userId"))
                .and(non_empty("firstName"))
                .and(non_empty("lastName")),
        )?
        .select(vec![
            try_cast(trunc_id(col("userId")), DataType::Int32).alias("user_id"),
            trunc_id(col("firstName")).alias("first_name"),
            trunc_id(col("lastName")).alias("last_name"),
            col("gender"),
            col("level"),
            col("ts"),
        ])?
        .filter(col("user_id").is_not_null())?;

    Ok(projected.distinct_on(
        vec![col("user_id")],
        vec![
            col("user_id"),
            col("first_name"),
            col("last_name"),
            col("gender"),
            col("level"),
        ],
        Some(vec![
            col("user_id").sort(true, false),
            col("ts").sort(false, false),
        ]),
    )?)
}

/// One row per distinct play timestamp, with the calendar components
/// broken out for rollups.
pub fn time_dimension(events: DataFrame) -> Result<DataFrame, EtlError> {
    let start_times = play_events(events)?
        .select(vec![col("ts")])?
        .distinct()?
        .select(vec![event_time().alias("start_time")])?;

    Ok(start_times.select(vec![
        col("start_time"),
        date_component("hour", col("start_time")).alias("hour"),
        date_component("day", col("start_time")).alias("day"),
        date_component("week", col("start_time")).alias("week"),
        date_component("month", col("start_time")).alias("month"),
        date_component("year", col("start_time")).alias("year"),
        to_char(col("start_time"), lit("%A")).alias("weekday"),
    ])?)
}

/// Extracts one calendar component of a timestamp as an Int32 column.
pub(crate) fn date_component(part: &str, expr: Expr) -> Expr {
    cast(date_part(lit(part), expr), DataType::Int32)
}

pub(crate) fn non_empty(name: &str) -> Expr {
    col(name).is_not_null().and(col(name).not_eq(lit("")))
}

fn trunc_id(expr: Expr) -> Expr {
    substring(expr, lit(1i64), lit(ID_MAX_CHARS))
}

fn trunc_text(expr: Expr) -> Expr {
    substring(expr, lit(1i64), lit(TEXT_MAX_CHARS))
}
