/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! object storage abstraction and scene lookup

use std::path::Path;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use odin_common::s3::{S3Client, create_s3_client, get_s3_keys, download_s3_key};
use crate::errors::{OdinGoesrVideoError, Result};
use crate::scene::{GoesrProduct, get_prefix};

/// the default result cap for listing a single hourly prefix
pub const DEFAULT_MAX_KEYS: i32 = 100;

/// how many hours we go back when looking for the most recent scene
pub const LATEST_SEARCH_HOURS: u32 = 3;

/// the storage operations we need. Errors are reported as strings since they are wrapped into
/// scene/prefix specific pipeline errors by the callers
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// list up to `max_keys` keys that start with `prefix`, in backend order
    async fn list (&self, bucket: &str, prefix: &str, max_keys: i32)->std::result::Result<Vec<String>,String>;

    /// download object `key` into `file_path`. Implementations have to make sure `file_path` does not
    /// exist unless the download completed
    async fn download (&self, bucket: &str, key: &str, file_path: &Path)->std::result::Result<(),String>;
}

/// [`ObjectStore`] implementation for (public) AWS S3 buckets
#[derive(Debug,Clone)]
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub fn new (client: S3Client)->Self { S3ObjectStore{client} }

    pub async fn for_region (region: impl ToString)->Result<Self> {
        let client = create_s3_client( region.to_string()).await
            .map_err( |e| OdinGoesrVideoError::ConfigError( format!("cannot create S3 client: {e}")))?;
        Ok( S3ObjectStore{client} )
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list (&self, bucket: &str, prefix: &str, max_keys: i32)->std::result::Result<Vec<String>,String> {
        get_s3_keys( &self.client, bucket, prefix, max_keys).await.map_err( |e| format!("{e:?}"))
    }

    async fn download (&self, bucket: &str, key: &str, file_path: &Path)->std::result::Result<(),String> {
        download_s3_key( &self.client, bucket, key, file_path).await.map_err( |e| format!("{e:?}"))
    }
}

/// list all keys for the given prefixes, concatenated in prefix order. Fails on the first prefix the store
/// reports an error for since a gap would silently shorten the covered time span.
/// Note that keys are not de-duplicated.
pub async fn locate_scenes<I> (store: &dyn ObjectStore, bucket: &str, prefixes: I, max_keys: i32)->Result<Vec<String>>
    where I: IntoIterator<Item=String>
{
    let mut keys: Vec<String> = Vec::new();

    for prefix in prefixes {
        let mut found = store.list( bucket, &prefix, max_keys).await
            .map_err( |e| OdinGoesrVideoError::ListingError( prefix.clone(), e))?;
        debug!("found {} objects in {}/{}", found.len(), bucket, prefix);
        keys.append( &mut found);
    }

    info!("located {} scenes in {}", keys.len(), bucket);
    Ok(keys)
}

/// find the most recent scene of a product, searching back up to `max_hours` hourly prefixes from `now`.
/// Returns `Ok(None)` if there was no listing error but none of the searched prefixes had any object
pub async fn find_latest_scene (store: &dyn ObjectStore, bucket: &str, product: GoesrProduct, now: DateTime<Utc>, max_hours: u32, max_keys: i32)->Result<Option<String>> {
    for h in 0..=max_hours as i64 {
        let prefix = get_prefix( now - TimeDelta::hours(h), product);
        let found = store.list( bucket, &prefix, max_keys).await
            .map_err( |e| OdinGoesrVideoError::ListingError( prefix.clone(), e))?;

        // S3 lists in lexicographic key order, which for GOES-R file names is scan start order
        if let Some(key) = found.into_iter().max() {
            return Ok(Some(key))
        }
    }
    Ok(None)
}
