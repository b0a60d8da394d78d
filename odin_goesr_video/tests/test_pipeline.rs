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

mod common;

use std::{path::PathBuf, time::Duration};
use chrono::{TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use odin_goesr_video::*;
use odin_goesr_video::pipeline::order_frames;
use common::*;

fn hourly_store ()->MockStore {
    MockStore::new()
        .with_keys( "ABI-L2-MCMIPF/2023/152/00/", &[fd_key(152,0,0)])
        .with_keys( "ABI-L2-MCMIPF/2023/152/01/", &[fd_key(152,1,0)])
        .with_keys( "ABI-L2-MCMIPF/2023/152/02/", &[fd_key(152,2,0)])
}

fn range ()->TimeRange {
    TimeRange::parse( "2023-06-01 00:00", "2023-06-01 03:00").unwrap()
}

#[tokio::test]
async fn test_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), hourly_store(), RecordingEncoder::default());
    let output = tmp.path().join("goes16.mp4");
    let mut state = tp.pipeline.subscribe_state();

    let report = tp.pipeline.run( &range(), &output).await.unwrap();
    println!("run report: {report:?}");

    let expected: Vec<PathBuf> = [fd_key(152,0,0), fd_key(152,1,0), fd_key(152,2,0)].iter().map( |k| tp.cache.image_path( k, TEST_DPI)).collect();
    assert_eq!( report.n_listed, 3);
    assert_eq!( report.frames, expected);
    assert!( report.dropped.is_empty());
    assert_eq!( report.task_secs.n, 3);
    assert_eq!( report.output, output);

    let rec = tp.encoder.last_record().unwrap();
    assert_eq!( rec.frame_rate, 25);
    assert_eq!( rec.frames, canonical( &expected));
    assert!( output.is_file());

    assert_eq!( tp.store.list_count(), 3);
    assert_eq!( tp.store.download_count(), 3);
    assert!( state.has_changed().unwrap());
    assert_eq!( *state.borrow_and_update(), PipelineState::Done);
    assert_eq!( tp.pipeline.state(), PipelineState::Done);
}

#[tokio::test]
async fn test_rerun_uses_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 3), tmp.path(), hourly_store(), RecordingEncoder::default());

    tp.pipeline.run( &range(), &tmp.path().join("a.mp4")).await.unwrap();
    let n_read = tp.reader.read_count();
    let report = tp.pipeline.run( &range(), &tmp.path().join("b.mp4")).await.unwrap();

    assert_eq!( report.n_frames(), 3);
    assert_eq!( tp.store.download_count(), 3);
    assert_eq!( tp.reader.read_count(), n_read);
}

#[tokio::test]
async fn test_reorders_out_of_order_completion() {
    // listing order does not match capture order, and with concurrent tasks completion order is arbitrary
    let keys = vec![ fd_key(152,0,40), fd_key(152,0,0), fd_key(152,0,20), fd_key(152,0,50), fd_key(152,0,10), fd_key(152,0,30)];
    let store = MockStore::new().with_keys( "ABI-L2-MCMIPF/2023/152/00/", &keys);
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 4), tmp.path(), store, RecordingEncoder::default());

    let range = TimeRange::parse( "2023-06-01 00:00", "2023-06-01 01:00").unwrap();
    let report = tp.pipeline.run( &range, &tmp.path().join("out.mp4")).await.unwrap();

    let mut sorted = keys.clone();
    sorted.sort(); // same minute offsets for start and end, i.e. key order is time order
    let expected: Vec<PathBuf> = sorted.iter().map( |k| tp.cache.image_path( k, TEST_DPI)).collect();
    assert_eq!( report.frames, expected);
}

#[test]
fn test_order_frames() {
    let t = |m: u32| Utc.with_ymd_and_hms( 2023, 6, 1, 0, m, 0).unwrap();
    let scene = |key: &str, img: &str, ts| RenderedScene { key: key.to_string(), image: PathBuf::from(img), timestamp: ts };

    let rendered = vec![
        scene( "c", "/data/c.png", Some(t(20))),
        scene( "x", "/data/x.png", None),
        scene( "b2", "/data/b2.png", Some(t(10))),
        scene( "a", "/data/a.png", Some(t(0))),
        scene( "b1", "/data/b1.png", Some(t(10))),
    ];
    let mut dropped = Vec::new();
    let frames = order_frames( rendered, &mut dropped);

    assert_eq!( frames, vec![
        PathBuf::from("/data/a.png"), PathBuf::from("/data/b1.png"), PathBuf::from("/data/b2.png"), PathBuf::from("/data/c.png")
    ]);
    assert_eq!( dropped.len(), 1);
    assert_eq!( dropped[0].key, "x");
}

#[tokio::test]
async fn test_partial_failure() {
    let mut store = hourly_store();
    store.corrupt_keys.insert( fd_key(152,1,0));
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), store, RecordingEncoder::default());

    let report = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await.unwrap();
    println!("dropped: {:?}", report.dropped);

    assert_eq!( report.n_frames(), 2);
    assert_eq!( report.n_dropped(), 1);
    assert_eq!( report.dropped[0].key, fd_key(152,1,0));
    assert_eq!( tp.encoder.last_record().unwrap().frames.len(), 2);
    assert_eq!( tp.pipeline.state(), PipelineState::Done);
}

#[tokio::test]
async fn test_download_failure_drops_scene() {
    let mut store = hourly_store();
    store.failing_keys.insert( fd_key(152,0,0));
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 1), tmp.path(), store, RecordingEncoder::default());

    let report = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await.unwrap();
    assert_eq!( report.frames, vec![ tp.cache.image_path( &fd_key(152,1,0), TEST_DPI), tp.cache.image_path( &fd_key(152,2,0), TEST_DPI)]);
    assert_eq!( report.dropped[0].key, fd_key(152,0,0));
}

#[tokio::test]
async fn test_unparsable_key_is_dropped() {
    let odd_key = "ABI-L2-MCMIPF/2023/152/01/scene_without_timestamp.nc".to_string();
    let store = MockStore::new()
        .with_keys( "ABI-L2-MCMIPF/2023/152/00/", &[fd_key(152,0,0)])
        .with_keys( "ABI-L2-MCMIPF/2023/152/01/", &[odd_key.clone()]);
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), store, RecordingEncoder::default());

    let range = TimeRange::parse( "2023-06-01 00:00", "2023-06-01 02:00").unwrap();
    let report = tp.pipeline.run( &range, &tmp.path().join("out.mp4")).await.unwrap();

    assert_eq!( report.n_frames(), 1);
    assert_eq!( report.dropped[0].key, odd_key);
    assert!( tp.cache.image_path( &odd_key, TEST_DPI).is_file()); // still rendered
}

#[tokio::test]
async fn test_timeout_drops_scene() {
    let store = MockStore { download_delay: Some( Duration::from_secs(5)), ..hourly_store() };
    let tmp = tempfile::tempdir().unwrap();
    let mut config = pipeline_config( GoesrProduct::FullDisk, 3);
    config.task_timeout = Some( Duration::from_millis(100));
    let tp = test_pipeline( config, tmp.path(), store, RecordingEncoder::default());

    match tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await {
        Err(OdinGoesrVideoError::NoScenesError(n)) => assert_eq!( n, 3),
        other => panic!("expected NoScenesError, got {other:?}")
    }
    assert!( tp.encoder.last_record().is_none());

    // the interrupted downloads did not leave temp files behind
    assert_eq!( tp.store.download_count(), 3);
    assert!( part_files( tmp.path()).is_empty());
}

#[tokio::test]
async fn test_timed_out_render_keeps_worker() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = pipeline_config( GoesrProduct::FullDisk, 1);
    config.task_timeout = Some( Duration::from_millis(50));
    let reader = MockBandReader::with_delay( Duration::from_millis(100)); // 4 bands per render
    let tp = test_pipeline_with_reader( config, tmp.path(), hourly_store(), reader, RecordingEncoder::default());

    let res = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await;
    println!("max concurrent band reads: {}", tp.reader.max_concurrent_reads());

    assert!( matches!( res, Err(OdinGoesrVideoError::NoScenesError(3))));
    assert_eq!( tp.reader.max_concurrent_reads(), 1); // renders of timed out scenes still count against concurrency
}

#[tokio::test]
async fn test_duplicate_failing_key_fetched_once() {
    // the same scene can show up in two listings
    let failing = fd_key(152,0,30);
    let mut store = MockStore::new()
        .with_keys( "ABI-L2-MCMIPF/2023/152/00/", &[failing.clone()])
        .with_keys( "ABI-L2-MCMIPF/2023/152/01/", &[failing.clone()])
        .with_keys( "ABI-L2-MCMIPF/2023/152/02/", &[fd_key(152,2,0)]);
    store.failing_keys.insert( failing.clone());
    store.download_delay = Some( Duration::from_millis(20));

    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 3), tmp.path(), store, RecordingEncoder::default());
    let report = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await.unwrap();

    let n_attempts = tp.store.downloaded.lock().unwrap().iter().filter( |k| **k == failing).count();
    println!("download attempts for {failing}: {n_attempts}");
    assert_eq!( n_attempts, 1);
    assert_eq!( report.n_listed, 3);
    assert_eq!( report.n_frames(), 1);
    assert_eq!( report.n_dropped(), 2);
    assert!( report.dropped.iter().all( |d| d.key == failing && d.reason.contains("failed to fetch")));
}

#[tokio::test]
async fn test_zero_survivors() {
    let mut store = hourly_store();
    for h in 0..3 { store.corrupt_keys.insert( fd_key(152,h,0)); }
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), store, RecordingEncoder::default());

    let res = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await;
    assert!( matches!( res, Err(OdinGoesrVideoError::NoScenesError(3))));
    assert!( tp.encoder.last_record().is_none());
    assert_eq!( tp.pipeline.state(), PipelineState::Failed);
}

#[tokio::test]
async fn test_empty_listing() {
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), MockStore::new(), RecordingEncoder::default());

    let res = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await;
    assert!( matches!( res, Err(OdinGoesrVideoError::NoScenesError(0))));
    assert_eq!( tp.store.download_count(), 0);
}

#[tokio::test]
async fn test_listing_failure_aborts_run() {
    let mut store = hourly_store();
    store.failing_prefixes.insert( "ABI-L2-MCMIPF/2023/152/02/".to_string());
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), store, RecordingEncoder::default());

    let res = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await;
    assert!( matches!( res, Err(OdinGoesrVideoError::ListingError(..))));
    assert_eq!( tp.store.download_count(), 0);
}

#[tokio::test]
async fn test_encoder_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), hourly_store(), RecordingEncoder::failing());

    let res = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await;
    assert!( matches!( res, Err(OdinGoesrVideoError::EncodeError(_))));
    assert_eq!( tp.pipeline.state(), PipelineState::Failed);
}

#[tokio::test]
async fn test_reversed_range() {
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), hourly_store(), RecordingEncoder::default());

    let start = Utc.with_ymd_and_hms( 2023, 6, 1, 3, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms( 2023, 6, 1, 0, 0, 0).unwrap();
    let res = tp.pipeline.run_between( start, end, &tmp.path().join("out.mp4")).await;

    assert!( matches!( res, Err(OdinGoesrVideoError::InvalidRangeError(_))));
    assert_eq!( tp.store.list_count(), 0);
    assert_eq!( tp.store.download_count(), 0);
}

#[tokio::test]
async fn test_cancel_before_run() {
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 2), tmp.path(), hourly_store(), RecordingEncoder::default());

    tp.pipeline.cancellation_token().cancel();
    let res = tp.pipeline.run( &range(), &tmp.path().join("out.mp4")).await;

    assert!( matches!( res, Err(OdinGoesrVideoError::CancelledError())));
    assert_eq!( tp.store.download_count(), 0);
    assert!( tp.encoder.last_record().is_none());
    assert_eq!( tp.pipeline.state(), PipelineState::Failed);
}

#[tokio::test]
async fn test_cancel_stops_dispatch() {
    // the store cancels while the first scene is processed. With a single worker no other scene gets dispatched
    let token = CancellationToken::new();
    let store = MockStore { cancel_on_download: Some( token.clone()), ..hourly_store() };
    let tmp = tempfile::tempdir().unwrap();
    let tp = test_pipeline( pipeline_config( GoesrProduct::FullDisk, 1), tmp.path(), store, RecordingEncoder::default());
    let pipeline = tp.pipeline.with_cancellation_token( token);

    let res = pipeline.run( &range(), &tmp.path().join("out.mp4")).await;
    println!("cancelled run: {res:?}");

    assert!( matches!( res, Err(OdinGoesrVideoError::CancelledError())));
    assert_eq!( tp.store.download_count(), 1);
    assert!( tp.cache.image_path( &fd_key(152,0,0), TEST_DPI).is_file()); // dispatched scene still completed
    assert!( tp.encoder.last_record().is_none());
}
