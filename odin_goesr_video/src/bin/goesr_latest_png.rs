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

//! retrieve the most recent GOES-R ABI scene of a product and render it as true color PNG image

use std::path::Path;

use odin_common::{define_cli, datetime::{utc_now, short_utc_datetime_string}, fs::ensure_writable_dir};
use odin_goesr_video::{
    init_logging, default_band_reader, find_latest_scene, scene_timestamp, GoesrSatellite, GoesrProduct,
    S3ObjectStore, SceneCache, SceneRenderer, RetentionPolicy, OdinGoesrVideoError, Result, DEFAULT_MAX_KEYS, LATEST_SEARCH_HOURS
};
use odin_goesr_video::render::DEFAULT_DPI;

define_cli! { ARGS [about="download and render the most recent GOES-R ABI scene"] =
    satellite: u32 [help="GOES satellite number (16 or 18)", long, default_value_t=16],
    product: String [help="ABI product (e.g. ABI-L2-MCMIPF or ABI-L2-MCMIPC)", long, default_value="ABI-L2-MCMIPF"],
    region: String [help="AWS region of the bucket", long, default_value="us-east-1"],
    data_dir: String [help="directory for downloaded scene files", long, default_value="./data"],
    output_dir: String [help="directory in which to store the PNG file", long, default_value="./output"],
    resolution: u32 [help="render resolution in dpi", long, default_value_t=DEFAULT_DPI],
    log_level: String [help="default log level (error,warn,info,debug,trace)", long, default_value="info"]
}

#[tokio::main]
async fn main()->Result<()> {
    init_logging( &ARGS.log_level);

    let satellite = GoesrSatellite::from_number( ARGS.satellite)?;
    let product: GoesrProduct = ARGS.product.parse()?;
    let bucket = satellite.bucket();

    let store = S3ObjectStore::for_region( &ARGS.region).await?;
    let cache = SceneCache::new( &ARGS.data_dir, RetentionPolicy::KeepForever)?;

    let Some(key) = find_latest_scene( &store, bucket, product, utc_now(), LATEST_SEARCH_HOURS, DEFAULT_MAX_KEYS).await? else {
        return Err( OdinGoesrVideoError::NoScenesError(0))
    };
    let timestamp = scene_timestamp( &key)?;
    println!("latest {} scene: {}", product, key);

    let data_path = cache.fetch( &store, bucket, &key).await?;

    ensure_writable_dir( &ARGS.output_dir)?;
    let img_name = format!("goes{}_latest_{}.png", satellite.number(), timestamp.format("%Y%m%d_%H%M%S"));
    let img_path = Path::new( &ARGS.output_dir).join( img_name);

    let reader = default_band_reader()?;
    let renderer = SceneRenderer::with_font_path( ARGS.resolution, None)?;
    let overlay = short_utc_datetime_string( &timestamp);
    renderer.render_to_file( reader.as_ref(), &data_path, &img_path, Some( overlay.as_str()))?;

    println!("rendered {:?}", img_path);
    Ok(())
}
