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

//! Source record shapes and their Arrow schemas.
//!
//! Both sources are newline-delimited JSON, one object per line. Every
//! field is optional at the parse layer; required-field enforcement
//! happens downstream in the dimension and fact projections, so a record
//! missing one field can still contribute to the tables that do not need
//! it (a catalog row without a year still yields an artist, for
//! instance).

use std::sync::Arc;

use arrow::array::{Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use serde::Deserialize;

/// Identifier fields are stored truncated to this many characters.
pub const ID_MAX_CHARS: i64 = 50;

/// Free-text fields are stored truncated to this many characters.
pub const TEXT_MAX_CHARS: i64 = 256;

/// The activity `page` value that marks a song-play event.
pub const PAGE_NEXT_SONG: &str = "NextSong";

/// One song-catalog record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongRecord {
    #[serde(default)]
    pub song_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub num_songs: Option<i32>,
}

/// One user-activity log record. The source uses camelCase field names;
/// unknown fields (auth, method, status, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub session_id: Option<i32>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Arrow schema of the raw song-catalog frame.
pub fn song_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("song_id", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("artist_name", DataType::Utf8, true),
        Field::new("artist_location", DataType::Utf8, true),
        Field::new("artist_latitude", DataType::Float64, true),
        Field::new("artist_longitude", DataType::Float64, true),
        Field::new("year", DataType::Int32, true),
        Field::new("duration", DataType::Float64, true),
        Field::new("num_songs", DataType::Int32, true),
    ]))
}

/// Arrow schema of the raw activity frame. Column names keep the source
/// spelling; renames happen in the dimension projections.
pub fn event_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("artist", DataType::Utf8, true),
        Field::new("firstName", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("lastName", DataType::Utf8, true),
        Field::new("length", DataType::Float64, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("page", DataType::Utf8, true),
        Field::new("sessionId", DataType::Int32, true),
        Field::new("song", DataType::Utf8, true),
        Field::new("ts", DataType::Int64, true),
        Field::new("userAgent", DataType::Utf8, true),
        Field::new("userId", DataType::Utf8, true),
    ]))
}

/// Assembles parsed catalog records into a [RecordBatch].
pub fn songs_batch(rows: &[SongRecord]) -> Result<RecordBatch, ArrowError> {
    let song_id = StringArray::from(rows.iter().map(|r| r.song_id.as_deref()).collect::<Vec<_>>());
    let title = StringArray::from(rows.iter().map(|r| r.title.as_deref()).collect::<Vec<_>>());
    let artist_id = StringArray::from(
        rows.iter()
            .map(|r| r.artist_id.as_deref())
            .collect::<Vec<_>>(),
    );
    let artist_name = StringArray::from(
        rows.iter()
            .map(|r| r.artist_name.as_deref())
            .collect::<Vec<_>>(),
    );
    let artist_location = StringArray::from(
        rows.iter()
            .map(|r| r.artist_location.as_deref())
            .collect::<Vec<_>>(),
    );
    let artist_latitude =
        Float64Array::from(rows.iter().map(|r| r.artist_latitude).collect::<Vec<_>>());
    let artist_longitude =
        Float64Array::from(rows.iter().map(|r| r.artist_longitude).collect::<Vec<_>>());
    let year = Int32Array::from(rows.iter().map(|r| r.year).collect::<Vec<_>>());
    let duration = Float64Array::from(rows.iter().map(|r| r.duration).collect::<Vec<_>>());
    let num_songs = Int32Array::from(rows.iter().map(|r| r.num_songs).collect::<Vec<_>>());

    RecordBatch::try_new(
        song_schema(),
        vec![
            Arc::new(song_id),
            Arc::new(title),
            Arc::new(artist_id),
            Arc::new(artist_name),
            Arc::new(artist_location),
            Arc::new(artist_latitude),
            Arc::new(artist_longitude),
            Arc::new(year),
            Arc::new(duration),
            Arc::new(num_songs),
        ],
    )
}

/// Assembles parsed activity records into a [RecordBatch].
pub fn events_batch(rows: &[EventRecord]) -> Result<RecordBatch, ArrowError> {
    let artist = StringArray::from(rows.iter().map(|r| r.artist.as_deref()).collect::<Vec<_>>());
    let first_name = StringArray::from(
        rows.iter()
            .map(|r| r.first_name.as_deref())
            .collect::<Vec<_>>(),
    );
    let gender = StringArray::from(rows.iter().map(|r| r.gender.as_deref()).collect::<Vec<_>>());
    let last_name = StringArray::from(
        rows.iter()
            .map(|r| r.last_name.as_deref())
            .collect::<Vec<_>>(),
    );
    let length = Float64Array::from(rows.iter().map(|r| r.length).collect::<Vec<_>>());
    let level = StringArray::from(rows.iter().map(|r| r.level.as_deref()).collect::<Vec<_>>());
    let location = StringArray::from(
        rows.iter()
            .map(|r| r.location.as_deref())
            .collect::<Vec<_>>(),
    );
    let page = StringArray::from(rows.iter().map(|r| r.page.as_deref()).collect::<Vec<_>>());
    let session_id = Int32Array::from(rows.iter().map(|r| r.session_id).collect::<Vec<_>>());
    let song = StringArray::from(rows.iter().map(|r| r.song.as_deref()).collect::<Vec<_>>());
    let ts = Int64Array::from(rows.iter().map(|r| r.ts).collect::<Vec<_>>());
    let user_agent = StringArray::from(
        rows.iter()
            .map(|r| r.user_agent.as_deref())
            .collect::<Vec<_>>(),
    );
    let user_id = StringArray::from(rows.iter().map(|r| r.user_id.as_deref()).collect::<Vec<_>>());

    RecordBatch::try_new(
        event_schema(),
        vec![
            Arc::new(artist),
            Arc::new(first_name),
            Arc::new(gender),
            Arc::new(last_name),
            Arc::new(length),
            Arc::new(level),
            Arc::new(location),
            Arc::new(page),
            Arc::new(session_id),
            Arc::new(song),
            Arc::new(ts),
            Arc::new(user_agent),
            Arc::new(user_id),
        ],
    )
}

#[cfg(test)]
mod tests {
    use arrow::array::Array as _;

    use super::*;

    #[test]
    fn test_event_record_parses_camel_case_and_ignores_extras() {
        let line = r#"{"artist":"Harmonia","auth":"Logged In","firstName":"Ryan","gender":"M",
            "itemInSession":0,"lastName":"Smith","length":655.77751,"level":"free",
            "location":"San Jose-Sunnyvale-Santa Clara, CA","method":"PUT","page":"NextSong",
            "registration":1541016707796.0,"sessionId":583,"song":"Sehr kosmisch","status":200,
            "ts":1542241826796,"userId":"26","userAgent":"Mozilla/5.0"}"#;

        let record: EventRecord = serde_json::from_str(line).unwrap();

        assert_eq!(record.user_id.as_deref(), Some("26"));
        assert_eq!(record.first_name.as_deref(), Some("Ryan"));
        assert_eq!(record.session_id, Some(583));
        assert_eq!(record.ts, Some(1542241826796));
        assert_eq!(record.page.as_deref(), Some(PAGE_NEXT_SONG));
    }

    #[test]
    fn test_songs_batch_keeps_nulls() {
        let rows = vec![
            SongRecord {
                song_id: Some("SOUPIRU12A6D4FA1E1".to_string()),
                title: Some("Der Kleine Dompfaff".to_string()),
                artist_id: Some("ARJIE2Y1187B994AB7".to_string()),
                artist_name: Some("Line Renaud".to_string()),
                duration: Some(152.92036),
                year: Some(0),
                num_songs: Some(1),
                ..Default::default()
            },
            SongRecord::default(),
        ];

        let batch = songs_batch(&rows).unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), song_schema().fields().len());
        assert!(batch.column(0).is_null(1));
    }
}
