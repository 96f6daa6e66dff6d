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

//! SourceReader & TableWriter representations.
//!
//! The reader turns raw newline-delimited JSON objects into in-memory
//! frames; the writer persists finished tables as partitioned Parquet.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::datasource::MemTable;
use datafusion::prelude::DataFrame;
use serde::de::DeserializeOwned;

use crate::errors::EtlError;
use crate::schema;
use crate::session::EtlSession;
use crate::storage::StorageLocation;

/// Subpath of the source location holding song-catalog objects.
pub const SONG_DATA: &str = "song_data";

/// Subpath of the source location holding activity-log objects.
pub const LOG_DATA: &str = "log_data";

/// Outcome of loading one source: how many lines were seen and how many
/// were dropped as malformed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseStats {
    pub total: usize,
    pub malformed: usize,
}

impl ParseStats {
    pub fn valid(&self) -> usize {
        self.total - self.malformed
    }
}

/// SourceReader loads raw records from a source location into frames the
/// engine can transform.
///
/// Individual records that fail to parse are skipped and counted; only a
/// completely missing source aborts the load.
#[derive(Clone, Debug)]
pub struct SourceReader {
    session: EtlSession,
    source: StorageLocation,
}

impl SourceReader {
    /// Creates a new SourceReader for a source location with an
    /// [EtlSession].
    pub fn new(session: EtlSession, source: StorageLocation) -> Self {
        Self { session, source }
    }

    /// Loads all song-catalog records under `<source>/song_data`.
    pub async fn songs(&self) -> Result<DataFrame, EtlError> {
        let (records, stats) = self.load_records::<schema::SongRecord>(SONG_DATA).await?;
        tracing::info!(
            total = stats.total,
            malformed = stats.malformed,
            valid = stats.valid(),
            "parsed song records"
        );
        self.dataframe(schema::songs_batch(&records)?)
    }

    /// Loads all activity-log records under `<source>/log_data`.
    pub async fn events(&self) -> Result<DataFrame, EtlError> {
        let (records, stats) = self.load_records::<schema::EventRecord>(LOG_DATA).await?;
        tracing::info!(
            total = stats.total,
            malformed = stats.malformed,
            valid = stats.valid(),
            "parsed activity records"
        );
        self.dataframe(schema::events_batch(&records)?)
    }

    async fn load_records<T: DeserializeOwned>(
        &self,
        subdir: &str,
    ) -> Result<(Vec<T>, ParseStats), EtlError> {
        let location = self.source.child(subdir)?;
        let objects = location.list_json().await?;
        if objects.is_empty() {
            return Err(EtlError::SourceUnavailable {
                location: location.url().to_string(),
            });
        }

        let mut records = Vec::new();
        let mut stats = ParseStats::default();
        for meta in &objects {
            let bytes = location.fetch(&meta.location).await?;
            let mut skipped = 0usize;
            for line in bytes.split(|b| *b == b'\n') {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                stats.total += 1;
                match serde_json::from_slice::<T>(line) {
                    Ok(record) => records.push(record),
                    Err(_) => skipped += 1,
                }
            }
            if skipped > 0 {
                tracing::warn!(object = %meta.location, skipped, "skipped malformed records");
                stats.malformed += skipped;
            }
        }

        Ok((records, stats))
    }

    fn dataframe(&self, batch: RecordBatch) -> Result<DataFrame, EtlError> {
        let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
        Ok(self.session.ctx().read_table(Arc::new(table))?)
    }
}

/// TableWriter persists a finished table below a destination location.
///
/// Each save fully overwrites the table's subtree, so repeated identical
/// runs are idempotent per table.
pub struct TableWriter {
    dataframe: DataFrame,
    partition_by: Vec<String>,
}

impl TableWriter {
    /// Creates a new TableWriter from a provided [DataFrame].
    pub fn new(dataframe: DataFrame) -> Self {
        Self {
            dataframe,
            partition_by: vec![],
        }
    }

    /// Partitions the output by the given columns on storage.
    pub fn partition_by<'a, I>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.partition_by = cols.into_iter().map(|col| col.to_string()).collect();
        self
    }

    /// Writes the table as Parquet under `dest`, replacing any previous
    /// contents.
    pub async fn save(self, dest: &StorageLocation) -> Result<(), EtlError> {
        dest.clear().await?;

        let options = DataFrameWriteOptions::new().with_partition_by(self.partition_by);
        self.dataframe
            .write_parquet(dest.url(), options, None)
            .await
            .map_err(|source| EtlError::WriteFailure {
                location: dest.url().to_string(),
                source,
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use datafusion::prelude::ParquetReadOptions;

    use super::*;
    use crate::session::EtlSessionBuilder;

    fn setup() -> (EtlSession, tempfile::TempDir) {
        let session = EtlSessionBuilder::new()
            .target_partitions(2)
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        (session, dir)
    }

    fn write_source(dir: &std::path::Path, subdir: &str, name: &str, lines: &[&str]) {
        let parent = dir.join(subdir);
        std::fs::create_dir_all(&parent).unwrap();
        std::fs::write(parent.join(name), lines.join("\n")).unwrap();
    }

    fn song_line(song_id: &str, title: &str, artist_id: &str, name: &str, duration: f64) -> String {
        serde_json::json!({
            "num_songs": 1,
            "song_id": song_id,
            "title": title,
            "artist_id": artist_id,
            "artist_name": name,
            "artist_location": "",
            "artist_latitude": null,
            "artist_longitude": null,
            "year": 2004,
            "duration": duration,
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_reader_skips_malformed_records() -> Result<(), EtlError> {
        let (session, dir) = setup();
        let good_a = song_line("SOAAAAA1", "First", "AR1", "Artist One", 100.5);
        let good_b = song_line("SOBBBBB2", "Second", "AR2", "Artist Two", 200.25);
        write_source(
            dir.path(),
            "song_data/A/B",
            "tracks.json",
            &[
                good_a.as_str(),
                "{not json",
                good_b.as_str(),
                r#"{"duration": "not a number"}"#,
            ],
        );

        let source = StorageLocation::parse(dir.path().to_str().unwrap())?;
        let df = session.read(&source).songs().await?;

        assert_eq!(df.count().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_reader_fails_when_source_missing() -> Result<(), EtlError> {
        let (session, dir) = setup();
        let source = StorageLocation::parse(dir.path().to_str().unwrap())?;

        let err = session.read(&source).events().await.unwrap_err();

        assert!(matches!(err, EtlError::SourceUnavailable { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_reader_ignores_non_json_objects() -> Result<(), EtlError> {
        let (session, dir) = setup();
        let good = song_line("SOAAAAA1", "First", "AR1", "Artist One", 100.5);
        write_source(dir.path(), "song_data", "tracks.json", &[&good]);
        write_source(dir.path(), "song_data", "README.txt", &["not data"]);

        let source = StorageLocation::parse(dir.path().to_str().unwrap())?;
        let df = session.read(&source).songs().await?;

        assert_eq!(df.count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_writer_overwrites_previous_output() -> Result<(), EtlError> {
        let (session, src_dir) = setup();
        let out_dir = tempfile::tempdir()?;
        let good_a = song_line("SOAAAAA1", "First", "AR1", "Artist One", 100.5);
        let good_b = song_line("SOBBBBB2", "Second", "AR2", "Artist Two", 200.25);
        write_source(src_dir.path(), "song_data", "tracks.json", &[&good_a, &good_b]);

        let source = StorageLocation::parse(src_dir.path().to_str().unwrap())?;
        let dest = StorageLocation::parse(out_dir.path().to_str().unwrap())?.child("raw_songs")?;

        for _ in 0..2 {
            let df = session.read(&source).songs().await?;
            TableWriter::new(df).save(&dest).await?;
        }

        let df = session
            .ctx()
            .read_parquet(dest.url(), ParquetReadOptions::default())
            .await?;
        assert_eq!(df.count().await?, 2);
        Ok(())
    }
}
