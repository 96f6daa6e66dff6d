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

//! The song-plays fact table.
//!
//! Each qualifying play event becomes exactly one fact row. Resolution of
//! `song_id`/`artist_id` goes through a left outer join against the
//! catalog on (title, artist name, duration), exact equality only, so an
//! event with no catalog match keeps its row with null foreign keys
//! instead of being dropped.

use arrow::datatypes::DataType;
use datafusion::common::JoinType;
use datafusion::functions_window::expr_fn::row_number;
use datafusion::logical_expr::ExprFunctionExt;
use datafusion::prelude::{cast, col, try_cast, DataFrame};

use crate::dimensions::{date_component, event_time, non_empty, play_events};
use crate::errors::EtlError;

/// Builds the fact table from the raw activity and catalog frames.
///
/// The surrogate `songplay_id` is assigned by a row-number window over a
/// deterministic `(ts, session_id)` ordering; it is unique within a run
/// and carries no meaning across runs.
pub fn songplays_fact(events: DataFrame, songs: DataFrame) -> Result<DataFrame, EtlError> {
    let plays = play_events(events)?
        .filter(non_empty("userId"))?
        .select(vec![
            col("ts"),
            try_cast(col("userId"), DataType::Int32).alias("user_id"),
            col("level"),
            col("song"),
            col("artist"),
            col("length"),
            col("sessionId").alias("session_id"),
            col("location"),
            col("userAgent").alias("user_agent"),
        ])?
        .filter(col("user_id").is_not_null())?;

    let joined = plays.join_on(
        catalog_lookup(songs)?,
        JoinType::Left,
        vec![
            col("song").eq(col("title")),
            col("artist").eq(col("artist_name")),
            col("length").eq(col("duration")),
        ],
    )?;

    let numbered = joined.window(vec![row_number()
        .order_by(vec![
            col("ts").sort(true, false),
            col("session_id").sort(true, true),
        ])
        .build()?
        .alias("row_num")])?;

    Ok(numbered.select(vec![
        cast(col("row_num"), DataType::Int64).alias("songplay_id"),
        event_time().alias("start_time"),
        col("user_id"),
        col("level"),
        col("song_id"),
        col("artist_id"),
        col("session_id"),
        col("location"),
        col("user_agent"),
        date_component("year", event_time()).alias("year"),
        date_component("month", event_time()).alias("month"),
    ])?)
}

/// The catalog side of the resolution join.
///
/// Deduplicated on the join-key triple so a play can never fan out into
/// more than one fact row when the catalog repeats a (title, name,
/// duration) combination under different ids.
fn catalog_lookup(songs: DataFrame) -> Result<DataFrame, EtlError> {
    let projected = songs
        .filter(
            non_empty("song_id")
                .and(non_empty("title"))
                .and(non_empty("artist_name"))
                .and(col("duration").is_not_null()),
        )?
        .select(vec![
            col("song_id"),
            col("title"),
            col("artist_id"),
            col("artist_name"),
            col("duration"),
        ])?;

    Ok(projected.distinct_on(
        vec![col("title"), col("artist_name"), col("duration")],
        vec![
            col("song_id"),
            col("title"),
            col("artist_id"),
            col("artist_name"),
            col("duration"),
        ],
        None,
    )?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Array, Int64Array, StringArray, TimestampMillisecondArray};
    use arrow::compute::concat_batches;
    use arrow::record_batch::RecordBatch;
    use datafusion::datasource::MemTable;
    use datafusion::prelude::lit;

    use super::*;
    use crate::schema::{self, EventRecord, SongRecord, PAGE_NEXT_SONG};
    use crate::session::{EtlSession, EtlSessionBuilder};

    // 2018-11-15T00:30:26.796Z
    const TS: i64 = 1_542_241_826_796;
    const HOUR_MS: i64 = 3_600_000;

    fn setup() -> EtlSession {
        EtlSessionBuilder::new()
            .target_partitions(2)
            .build()
            .unwrap()
    }

    fn frame(session: &EtlSession, batch: RecordBatch) -> DataFrame {
        let table = MemTable::try_new(batch.schema(), vec![vec![batch]]).unwrap();
        session.ctx().read_table(Arc::new(table)).unwrap()
    }

    fn song(song_id: &str, title: &str, artist_id: &str, name: &str, duration: f64) -> SongRecord {
        SongRecord {
            song_id: Some(song_id.to_string()),
            title: Some(title.to_string()),
            artist_id: Some(artist_id.to_string()),
            artist_name: Some(name.to_string()),
            year: Some(2004),
            duration: Some(duration),
            num_songs: Some(1),
            ..Default::default()
        }
    }

    fn play(user: &str, title: &str, artist: &str, length: f64, ts: i64) -> EventRecord {
        EventRecord {
            user_id: Some(user.to_string()),
            first_name: Some("Ryan".to_string()),
            last_name: Some("Smith".to_string()),
            gender: Some("M".to_string()),
            level: Some("free".to_string()),
            page: Some(PAGE_NEXT_SONG.to_string()),
            song: Some(title.to_string()),
            artist: Some(artist.to_string()),
            length: Some(length),
            session_id: Some(583),
            location: Some("San Jose-Sunnyvale-Santa Clara, CA".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            ts: Some(ts),
        }
    }

    async fn collect(df: DataFrame) -> RecordBatch {
        let batches = df.collect().await.unwrap();
        let schema = batches[0].schema();
        concat_batches(&schema, &batches).unwrap()
    }

    fn str_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref()
            .unwrap()
    }

    #[tokio::test]
    async fn test_matched_and_unmatched_plays() -> Result<(), EtlError> {
        let session = setup();
        let songs = frame(
            &session,
            schema::songs_batch(&[song(
                "SOAAAAA1",
                "Sehr kosmisch",
                "AR1",
                "Harmonia",
                655.77751,
            )])?,
        );
        let events = frame(
            &session,
            schema::events_batch(&[
                play("26", "Sehr kosmisch", "Harmonia", 655.77751, TS),
                play("26", "Unknown Song", "Nobody", 100.0, TS + HOUR_MS),
            ])?,
        );

        let fact = songplays_fact(events, songs)?
            .sort(vec![col("start_time").sort(true, false)])?;
        let batch = collect(fact).await;

        assert_eq!(batch.num_rows(), 2);
        let song_ids = str_col(&batch, "song_id");
        let artist_ids = str_col(&batch, "artist_id");
        assert_eq!(song_ids.value(0), "SOAAAAA1");
        assert_eq!(artist_ids.value(0), "AR1");
        assert!(song_ids.is_null(1));
        assert!(artist_ids.is_null(1));
        // unmatched rows keep their event attributes
        assert_eq!(str_col(&batch, "level").value(1), "free");
        assert_eq!(str_col(&batch, "user_agent").value(1), "Mozilla/5.0");
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_catalog_triple_yields_one_row() -> Result<(), EtlError> {
        let session = setup();
        let songs = frame(
            &session,
            schema::songs_batch(&[
                song("SOAAAAA1", "Sehr kosmisch", "AR1", "Harmonia", 655.77751),
                song("SOZZZZZ9", "Sehr kosmisch", "AR1", "Harmonia", 655.77751),
            ])?,
        );
        let events = frame(
            &session,
            schema::events_batch(&[play("26", "Sehr kosmisch", "Harmonia", 655.77751, TS)])?,
        );

        let batch = collect(songplays_fact(events, songs)?).await;

        assert_eq!(batch.num_rows(), 1);
        assert!(!str_col(&batch, "song_id").is_null(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_surrogate_ids_are_unique_and_increasing() -> Result<(), EtlError> {
        let session = setup();
        let songs = frame(&session, schema::songs_batch(&[])?);
        let events = frame(
            &session,
            schema::events_batch(&[
                play("26", "A", "X", 1.0, TS + 2 * HOUR_MS),
                play("26", "B", "Y", 2.0, TS),
                play("80", "C", "Z", 3.0, TS + HOUR_MS),
            ])?,
        );

        let fact = songplays_fact(events, songs)?
            .sort(vec![col("songplay_id").sort(true, false)])?;
        let batch = collect(fact).await;

        assert_eq!(batch.num_rows(), 3);
        let ids: &Int64Array = batch
            .column_by_name("songplay_id")
            .unwrap()
            .as_any()
            .downcast_ref()
            .unwrap();
        assert_eq!(ids.values().as_ref(), &[1i64, 2, 3]);

        // ids follow the (ts, session_id) ordering
        let times: &TimestampMillisecondArray = batch
            .column_by_name("start_time")
            .unwrap()
            .as_any()
            .downcast_ref()
            .unwrap();
        assert_eq!(times.value(0), TS);
        assert_eq!(times.value(2), TS + 2 * HOUR_MS);
        Ok(())
    }

    #[tokio::test]
    async fn test_plays_without_user_are_excluded() -> Result<(), EtlError> {
        let session = setup();
        let songs = frame(&session, schema::songs_batch(&[])?);
        let mut anonymous = play("", "A", "X", 1.0, TS);
        anonymous.user_id = None;
        let events = frame(
            &session,
            schema::events_batch(&[anonymous, play("26", "B", "Y", 2.0, TS + HOUR_MS)])?,
        );

        let fact = songplays_fact(events, songs)?.filter(col("user_id").eq(lit(26i32)))?;

        assert_eq!(fact.count().await?, 1);
        Ok(())
    }
}
