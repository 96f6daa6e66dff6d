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

//! The `playlake` binary entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playlake::config::Cli;
use playlake::errors::EtlError;
use playlake::pipeline;
use playlake::session::EtlSessionBuilder;
use playlake::storage::StorageLocation;

#[tokio::main]
async fn main() -> Result<(), EtlError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut builder = EtlSessionBuilder::new().app_name("playlake");
    if let Some(n) = cli.target_partitions {
        builder = builder.target_partitions(n);
    }
    let session = builder.build()?;

    let input = StorageLocation::parse(&cli.input)?;
    let output = StorageLocation::parse(&cli.output)?;

    let summary = pipeline::run(&session, &input, &output).await?;
    tracing::info!(
        songs = summary.songs,
        artists = summary.artists,
        users = summary.users,
        time = summary.time,
        songplays = summary.songplays,
        "all tables written"
    );

    Ok(())
}
