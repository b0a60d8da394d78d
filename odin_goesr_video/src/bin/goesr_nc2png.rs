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

//! render a local GOES-R ABI multi-band (MCMIP) netCDF file as a true color PNG image

use std::path::Path;
use tracing::warn;

use odin_common::{define_cli, datetime::short_utc_datetime_string};
use odin_goesr_video::{init_logging, default_band_reader, scene_timestamp, SceneRenderer, Result};
use odin_goesr_video::render::DEFAULT_DPI;

define_cli! { ARGS [about="render a GOES-R ABI multi-band scene file as true color PNG"] =
    resolution: u32 [help="render resolution in dpi", long, default_value_t=DEFAULT_DPI],
    overlay: Option<String> [help="overlay text (default is the scene timestamp from the file name)", long],
    font: Option<String> [help="pathname of TTF font for the overlay", long],
    log_level: String [help="default log level (error,warn,info,debug,trace)", long, default_value="info"],

    nc_path: String [help="pathname of netCDF scene file"],
    png_path: String [help="pathname of PNG file to create"]
}

fn main()->Result<()> {
    init_logging( &ARGS.log_level);

    let nc_path = Path::new( &ARGS.nc_path);
    let png_path = Path::new( &ARGS.png_path);

    let overlay = match &ARGS.overlay {
        Some(text) => Some( text.clone()),
        None => match scene_timestamp( &ARGS.nc_path) {
            Ok(dt) => Some( short_utc_datetime_string( &dt)),
            Err(e) => { warn!("{}, rendering without overlay", e); None }
        }
    };

    let reader = default_band_reader()?;
    let renderer = SceneRenderer::with_font_path( ARGS.resolution, ARGS.font.as_deref().map( Path::new))?;
    renderer.render_to_file( reader.as_ref(), nc_path, png_path, overlay.as_deref())?;

    println!("rendered {:?}", png_path);
    Ok(())
}
