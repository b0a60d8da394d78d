/*
 * Copyright (c) 2024, United States Government, as represented by the
 * Administrator of the National Aeronautics and Space Administration.
 * All rights reserved.
 *
 * The ODIN - Open Data Integration Framework is licensed under the
 * Apache License, Version 2.0 (the "License"); you may not use this file
 * except in compliance with the License. You may obtain a copy of the
 * License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::time::Duration;
use odin_common::define_error;

pub type Result<T> = std::result::Result<T, OdinGoesrVideoError>;

define_error!{ pub OdinGoesrVideoError =
    //--- run level errors (fatal)
    InvalidRangeError(String) : "invalid time range: {0}",
    ListingError(String,String) : "failed to list scenes for prefix {0}: {1}",
    EncodeError(String) : "video encoding failed: {0}",
    NoScenesError(usize) : "none of {0} listed scenes could be rendered",
    CancelledError() : "pipeline run cancelled",

    //--- task level errors (scene gets dropped)
    FetchError(String,String) : "failed to fetch scene {0}: {1}",
    RenderError(String,String) : "failed to render {0}: {1}",
    ParseError(String) : "no capture timestamp in scene key {0}",
    TimeoutError(String,Duration) : "scene {0} timed out after {1:?}",
    TaskError(String,String) : "task for scene {0} failed: {1}",

    //--- pass through
    MissingBandError(String,String) : "band {1} not found in {0}",
    ConfigError(String) : "config error: {0}",
    IOError( #[from] std::io::Error) : "IO error {0}",
    ImageError( #[from] image::ImageError) : "image error {0}",
    FontError( #[from] ab_glyph::InvalidFont) : "invalid font {0}",
    RonError( #[from] ron::error::SpannedError) : "config parse error {0}"
}

pub fn render_error (path: impl ToString, msg: impl ToString)->OdinGoesrVideoError {
    OdinGoesrVideoError::RenderError( path.to_string(), msg.to_string())
}

pub fn config_error (msg: impl ToString)->OdinGoesrVideoError {
    OdinGoesrVideoError::ConfigError( msg.to_string())
}
