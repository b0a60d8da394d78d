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

//! the key addressed local store for downloaded scene files and rendered images.
//!
//! Entries are existence keyed: a file at the derived path is a cache hit, there is no integrity check.
//! Both downloads and renders are moved into place only after completion, so a crash never leaves a
//! partial file under a cache path. What happens to old entries is decided by a [`RetentionPolicy`].

use std::{collections::HashMap, path::{Path,PathBuf}, sync::{Arc,Mutex}, time::Duration};
use serde::{Deserialize,Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use odin_common::fs::{ensure_writable_dir, remove_old_files};
use odin_common::datetime::{deserialize_duration, serialize_duration};
use crate::errors::{OdinGoesrVideoError, Result};
use crate::storage::ObjectStore;

/// what to do with cached files. This is only applied on explicit request, never while a run is in progress
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize,Default)]
pub enum RetentionPolicy {
    /// the cache is unbounded and entries never expire
    #[default]
    KeepForever,

    /// entries that were not modified within the given duration are removed
    MaxAge(
        #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
        Duration
    ),
}

// the result of the download attempt for a key, shared by all fetches of this key within a run
type FetchOutcome = std::result::Result<PathBuf,String>;

#[derive(Debug)]
pub struct SceneCache {
    data_dir: PathBuf,
    retention: RetentionPolicy,

    // listings are not de-duplicated, hence the same key can be fetched several times (even concurrently) within a run
    outcomes: Mutex<HashMap<String,Arc<OnceCell<FetchOutcome>>>>,
}

impl SceneCache {
    pub fn new (data_dir: impl Into<PathBuf>, retention: RetentionPolicy)->Result<Self> {
        let data_dir = data_dir.into();
        ensure_writable_dir( &data_dir)?;
        Ok( SceneCache { data_dir, retention, outcomes: Mutex::new(HashMap::new()) } )
    }

    pub fn data_dir (&self)->&Path { &self.data_dir }
    pub fn retention (&self)->RetentionPolicy { self.retention }

    /// local path of the raw data file for a scene key: `{data_dir}/{key}`
    pub fn data_path (&self, key: &str)->PathBuf {
        self.data_dir.join( key.trim_start_matches('/'))
    }

    /// local path of the rendered image for a scene key and resolution: `{data_dir}/{key}.{dpi}dpi.png`
    pub fn image_path (&self, key: &str, dpi: u32)->PathBuf {
        image_path_for( &self.data_path(key), dpi)
    }

    /// forget the download outcomes of a previous run so that failed keys are attempted again
    pub fn start_run (&self) {
        self.outcomes.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// return the local path for `key`, downloading it from `store` if it is not yet cached.
    /// There is at most one download attempt per key and run: concurrent or later calls for the same key
    /// share the outcome of the first attempt, including its failure. An attempt that gets cancelled
    /// (e.g. by a task timeout) does not count
    pub async fn fetch (&self, store: &dyn ObjectStore, bucket: &str, key: &str)->Result<PathBuf> {
        let path = self.data_path(key);

        if path.is_file() {
            debug!("using cached file {:?}", path);
            return Ok(path)
        }

        let outcome = self.outcome_cell(key);
        let res = outcome.get_or_init( || async move {
            if path.is_file() { // fetched since our first check
                debug!("using cached file {:?}", path);
                Ok(path)
            } else {
                debug!("downloading {}/{} to {:?}", bucket, key, path);
                store.download( bucket, key, &path).await.map( |_| path)
            }
        }).await;

        res.clone().map_err( |e| OdinGoesrVideoError::FetchError( key.to_string(), e))
    }

    fn outcome_cell (&self, key: &str)->Arc<OnceCell<FetchOutcome>> {
        let mut map = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
        map.entry( key.to_string()).or_default().clone()
    }

    /// apply the retention policy to all cached files. Returns the number of removed files
    pub fn apply_retention (&self)->Result<usize> {
        match self.retention {
            RetentionPolicy::KeepForever => Ok(0),
            RetentionPolicy::MaxAge(max_age) => {
                let n = remove_old_files( &self.data_dir, max_age, true)?;
                info!("removed {} cached files older than {:?} from {:?}", n, max_age, self.data_dir);
                Ok(n)
            }
        }
    }
}

/// the rendered image path for a given local data file
pub fn image_path_for (data_path: &Path, dpi: u32)->PathBuf {
    let mut name = data_path.file_name().map( |s| s.to_os_string()).unwrap_or_default();
    name.push( format!(".{dpi}dpi.png"));
    data_path.with_file_name( name)
}
