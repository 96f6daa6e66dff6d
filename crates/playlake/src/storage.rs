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

//! Object-storage locations for pipeline inputs and outputs.
//!
//! A [StorageLocation] resolves a user-supplied location string (an
//! `s3://bucket/prefix` URL, a `file://` URL, or a bare filesystem path)
//! into an [ObjectStore] handle plus a store-relative prefix. The same
//! location is used for listing source objects, clearing a destination
//! before an overwrite, and registering the store on the execution
//! session.

use std::sync::Arc;

use futures_util::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use url::Url;

use crate::errors::EtlError;

/// A resolved storage location: a store, the prefix inside it, and the
/// canonical URL used when handing paths to the execution engine.
#[derive(Clone)]
pub struct StorageLocation {
    url: Url,
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
}

impl std::fmt::Debug for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageLocation")
            .field("url", &self.url.as_str())
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl StorageLocation {
    /// Resolves a location string.
    ///
    /// Supported forms:
    /// - `s3://bucket/prefix` (credentials and region from the environment)
    /// - `file:///absolute/path`
    /// - a bare filesystem path, absolute or relative
    pub fn parse(location: &str) -> Result<Self, EtlError> {
        if let Some(rest) = location.strip_prefix("s3://") {
            return Self::parse_s3(location, rest);
        }
        if let Some(rest) = location.strip_prefix("file://") {
            return Self::parse_local(location, rest);
        }
        if location.contains("://") {
            return Err(EtlError::invalid_location(location, "unsupported scheme"));
        }
        Self::parse_local(location, location)
    }

    fn parse_s3(location: &str, rest: &str) -> Result<Self, EtlError> {
        let (bucket, key) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, key.trim_matches('/')),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(EtlError::invalid_location(location, "missing bucket name"));
        }

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        let prefix = ObjectPath::parse(key)
            .map_err(|e| EtlError::invalid_location(location, e))?;
        let mut url = Url::parse(&format!("s3://{bucket}/"))
            .map_err(|e| EtlError::invalid_location(location, e))?;
        if !key.is_empty() {
            url.path_segments_mut()
                .map_err(|_| EtlError::invalid_location(location, "cannot be a base URL"))?
                .extend(key.split('/'))
                .push("");
        }

        Ok(Self {
            url,
            store: Arc::new(store),
            prefix,
        })
    }

    fn parse_local(location: &str, path: &str) -> Result<Self, EtlError> {
        let absolute = std::path::absolute(path)?;
        let url = Url::from_directory_path(&absolute)
            .map_err(|_| EtlError::invalid_location(location, "not an absolute directory path"))?;
        let prefix = ObjectPath::from_absolute_path(&absolute)
            .map_err(|e| EtlError::invalid_location(location, e))?;

        Ok(Self {
            url,
            store: Arc::new(LocalFileSystem::new()),
            prefix,
        })
    }

    /// The canonical URL of this location, always with a trailing slash so
    /// the engine treats it as a directory.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// The base `scheme://authority/` URL under which the store should be
    /// registered on the execution session.
    pub fn base_url(&self) -> Result<Url, EtlError> {
        let base = &self.url[..url::Position::BeforePath];
        Url::parse(&format!("{base}/")).map_err(|e| EtlError::invalid_location(self.url(), e))
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    /// A child location one path segment below this one.
    pub fn child(&self, name: &str) -> Result<Self, EtlError> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| EtlError::invalid_location(self.url.as_str(), "cannot be a base URL"))?
            .pop_if_empty()
            .push(name)
            .push("");

        Ok(Self {
            url,
            store: self.store.clone(),
            prefix: self.prefix.child(name),
        })
    }

    /// Lists all `.json` objects below this location.
    ///
    /// A missing prefix is reported as an empty listing; callers decide
    /// whether that is fatal.
    pub async fn list_json(&self) -> Result<Vec<ObjectMeta>, EtlError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|meta| meta.location.as_ref().ends_with(".json"))
            .collect())
    }

    /// Fetches the raw bytes of one object.
    pub async fn fetch(&self, location: &ObjectPath) -> Result<bytes::Bytes, EtlError> {
        Ok(self.store.get(location).await?.bytes().await?)
    }

    /// Deletes every object below this location. Used by the writer to give
    /// each table full-overwrite semantics.
    pub async fn clear(&self) -> Result<(), EtlError> {
        for meta in self.list_all().await? {
            self.store.delete(&meta.location).await?;
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ObjectMeta>, EtlError> {
        let mut stream = self.store.list(Some(&self.prefix));
        let mut objects = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(meta) => objects.push(meta),
                Err(object_store::Error::NotFound { .. }) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(objects)
    }
}
