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

#![doc = include_str!("../doc/odin_goesr_video.md")]

mod errors;
pub use errors::*;

pub mod scene;
pub use scene::{GoesrProduct, GoesrSatellite, TimeRange, get_prefix, scene_prefixes, derive_scene_prefixes, scene_timestamp};

pub mod storage;
pub use storage::{ObjectStore, S3ObjectStore, locate_scenes, find_latest_scene, DEFAULT_MAX_KEYS, LATEST_SEARCH_HOURS};

pub mod cache;
pub use cache::{SceneCache, RetentionPolicy};

pub mod bands;
pub use bands::{Band, BandReader, default_band_reader};

pub mod render;
pub use render::SceneRenderer;

pub mod video;
pub use video::{EncoderConfig, VideoEncoder, FfmpegEncoder, assemble_video};

pub mod pipeline;
pub use pipeline::{GoesrVideoPipeline, PipelineConfig, PipelineState, RunReport, DroppedScene, RenderedScene};

pub mod config;
pub use config::{GoesrVideoConfig, load_config};

/// set up the global tracing subscriber for our binaries. A `RUST_LOG` environment filter takes precedence
/// over the provided default level
pub fn init_logging (default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new( default_level));
    let _ = tracing_subscriber::fmt().with_env_filter( filter).try_init(); // only fails if already initialized
}
