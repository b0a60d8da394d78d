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

//! command line tool to create a true color time-lapse video for a given time range from GOES-R ABI scenes
//! that are retrieved from the public NOAA S3 buckets

use std::{path::Path, sync::Arc};
use tracing::info;

use odin_common::{define_cli, datetime::parse_duration_spec};
use odin_goesr_video::{
    init_logging, default_band_reader, load_config, config_error, GoesrVideoConfig, RetentionPolicy, GoesrSatellite, GoesrProduct, TimeRange,
    S3ObjectStore, SceneCache, SceneRenderer, FfmpegEncoder, GoesrVideoPipeline, Result
};

define_cli! { ARGS [about="create true color time-lapse videos from GOES-R ABI scenes"] =
    start_datetime: String [help="start of time range (UTC) as \"YYYY-MM-DD HH:MM\"", long],
    end_datetime: String [help="end of time range (UTC) as \"YYYY-MM-DD HH:MM\"", long],
    config: Option<String> [help="pathname of GoesrVideoConfig (RON) file", short, long],
    satellite: Option<u32> [help="GOES satellite number (16 or 18), overrides config", long],
    product: Option<String> [help="ABI product (e.g. ABI-L2-MCMIPF or ABI-L2-MCMIPC), overrides config", long],
    data_dir: Option<String> [help="directory for downloaded scenes and rendered images, overrides config", long],
    processes: Option<usize> [help="max number of scenes processed concurrently, overrides config", long],
    resolution: Option<u32> [help="render resolution in dpi, overrides config", long],
    max_age: Option<String> [help="remove cached files older than this (e.g. \"7d\") after the run, overrides config", long],
    log_level: String [help="default log level (error,warn,info,debug,trace)", long, default_value="info"],

    output: String [help="pathname of video file to create (e.g. goes16.mp4)"]
}

fn get_config ()->Result<GoesrVideoConfig> {
    let mut config: GoesrVideoConfig = match &ARGS.config {
        Some(path) => load_config( path)?,
        None => GoesrVideoConfig::default()
    };

    if let Some(n) = ARGS.satellite { config.satellite = GoesrSatellite::from_number(n)? }
    if let Some(product) = &ARGS.product { config.product = product.parse::<GoesrProduct>()? }
    if let Some(data_dir) = &ARGS.data_dir { config.data_dir = data_dir.into() }
    if let Some(processes) = ARGS.processes { config.concurrency = processes }
    if let Some(resolution) = ARGS.resolution { config.resolution = resolution }
    if let Some(max_age) = &ARGS.max_age {
        config.retention = RetentionPolicy::MaxAge( parse_duration_spec( max_age).map_err( config_error)?);
    }

    config.check()?;
    Ok(config)
}

#[tokio::main]
async fn main()->Result<()> {
    init_logging( &ARGS.log_level);

    let config = get_config()?;
    let range = TimeRange::parse( &ARGS.start_datetime, &ARGS.end_datetime)?;
    info!("using config {:?}", config);

    let store = Arc::new( S3ObjectStore::for_region( &config.s3_region).await?);
    let cache = Arc::new( SceneCache::new( &config.data_dir, config.retention)?);
    let reader = default_band_reader()?;
    let renderer = Arc::new( SceneRenderer::with_font_path( config.resolution, config.font.as_deref())?);
    let encoder = Arc::new( FfmpegEncoder::new( &config.encoder));

    let pipeline = GoesrVideoPipeline::new( config.pipeline_config(), store, cache.clone(), reader, renderer, encoder);

    // Ctrl-C stops dispatching scenes, the run then fails once the dispatched ones are done
    let cancel = pipeline.cancellation_token();
    tokio::spawn( async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling, waiting for running scenes to finish..");
            cancel.cancel();
        }
    });

    println!("creating {} from GOES-{} {} scenes in {} ({} hours)", ARGS.output, config.satellite.number(), config.product, range, range.n_hours());
    let report = pipeline.run( &range, Path::new( &ARGS.output)).await?;

    println!("created {:?} with {} frames", report.output, report.n_frames());
    if report.task_secs.n > 0 {
        println!("scene processing time [sec]: min={:.1} max={:.1} avg={:.1}", report.task_secs.min, report.task_secs.max, report.task_secs.avg);
    }
    if !report.dropped.is_empty() {
        println!("dropped {} of {} scenes:", report.n_dropped(), report.n_listed);
        for d in &report.dropped {
            println!("  {}: {}", d.key, d.reason);
        }
    }

    let n = cache.apply_retention()?;
    if n > 0 {
        println!("removed {} expired files from {:?}", n, cache.data_dir());
    }

    Ok(())
}
