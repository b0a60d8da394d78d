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

use std::{fs, path::{Path,PathBuf}, time::Duration};
use serde::{Deserialize,Serialize};

use odin_common::datetime::{deserialize_optional_duration, serialize_optional_duration, minutes};
use crate::cache::RetentionPolicy;
use crate::errors::{Result, config_error};
use crate::pipeline::PipelineConfig;
use crate::render::DEFAULT_DPI;
use crate::scene::{GoesrProduct, GoesrSatellite};
use crate::storage::DEFAULT_MAX_KEYS;
use crate::video::EncoderConfig;

/// the configuration for GOES-R video generation, usually loaded from a RON file like this:
/// ```text
/// GoesrVideoConfig(
///     s3_region: "us-east-1",
///     satellite: Goes16,
///     product: "ABI-L2-MCMIPF",
///     data_dir: "./data",
///     max_keys: 100,
///     concurrency: 4,
///     resolution: 300,
///     task_timeout: Some("10min"),
///     retention: KeepForever,
///     font: None,
///     encoder: EncoderConfig( ffmpeg: "ffmpeg", crf: 20, preset: "slower", movflags: "faststart", extra_args: [] )
/// )
/// ```
#[derive(Serialize,Deserialize,Debug,Clone)]
#[serde(default)]
pub struct GoesrVideoConfig {
    pub s3_region: String,
    pub satellite: GoesrSatellite,
    pub product: GoesrProduct,
    pub data_dir: PathBuf,
    pub max_keys: i32,  // per hourly prefix
    pub concurrency: usize,
    pub resolution: u32, // dpi

    #[serde(deserialize_with="deserialize_optional_duration", serialize_with="serialize_optional_duration")]
    pub task_timeout: Option<Duration>,

    pub retention: RetentionPolicy,
    pub font: Option<PathBuf>,
    pub encoder: EncoderConfig,
}

impl Default for GoesrVideoConfig {
    fn default()->Self {
        GoesrVideoConfig {
            s3_region: "us-east-1".to_string(),
            satellite: GoesrSatellite::default(),
            product: GoesrProduct::default(),
            data_dir: PathBuf::from("./data"),
            max_keys: DEFAULT_MAX_KEYS,
            concurrency: 1,
            resolution: DEFAULT_DPI,
            task_timeout: Some( minutes(10)),
            retention: RetentionPolicy::default(),
            font: None,
            encoder: EncoderConfig::default(),
        }
    }
}

impl GoesrVideoConfig {
    pub fn bucket (&self)->&'static str { self.satellite.bucket() }

    pub fn check (&self)->Result<()> {
        if self.concurrency == 0 { return Err( config_error("concurrency has to be at least 1")) }
        if self.resolution == 0 { return Err( config_error("resolution has to be at least 1 dpi")) }
        if self.max_keys <= 0 { return Err( config_error("max_keys has to be positive")) }
        Ok(())
    }

    /// the parts of the config the pipeline tasks need
    pub fn pipeline_config (&self)->PipelineConfig {
        PipelineConfig {
            bucket: self.bucket().to_string(),
            product: self.product,
            max_keys: self.max_keys,
            concurrency: self.concurrency,
            task_timeout: self.task_timeout,
            encoder: self.encoder.clone(),
        }
    }
}

pub fn load_config<C> (path: impl AsRef<Path>)->Result<C> where C: for<'a> Deserialize<'a> {
    let data = fs::read( path.as_ref())?;
    Ok( ron::de::from_bytes( data.as_slice())? )
}
