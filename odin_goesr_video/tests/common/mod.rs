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

//! test doubles for the storage, decoding and encoding backends

#![allow(unused)]

use std::{collections::{HashMap,HashSet}, fs, path::{Path,PathBuf}, sync::{Arc,Mutex}, time::Duration};
use std::sync::atomic::{AtomicUsize,Ordering};
use std::io::Write;
use async_trait::async_trait;
use ndarray::Array2;
use tokio_util::sync::CancellationToken;

use odin_goesr_video::{
    Band, BandReader, ObjectStore, VideoEncoder, OdinGoesrVideoError, Result, SceneCache, SceneRenderer,
    GoesrVideoPipeline, PipelineConfig, GoesrProduct, RetentionPolicy, EncoderConfig
};
use odin_goesr_video::video::EncodeJob;
use odin_common::fs::{temp_sibling_file, persist_temp_file};

pub const BUCKET: &str = "noaa-goes16";

/// full disk key for the given day-of-year 2023, hour and minute
pub fn fd_key (doy: u32, hour: u32, minute: u32)->String {
    format!("ABI-L2-MCMIPF/2023/{doy:03}/{hour:02}/OR_ABI-L2-MCMIPF-M6_G16_s2023{doy:03}{hour:02}{minute:02}205_e2023{doy:03}{hour:02}{:02}513_c2023{doy:03}{hour:02}{:02}591.nc",
        minute + 9, minute + 9)
}

/// an in-memory object store. Downloaded files contain the object key, objects that are marked as corrupt
/// produce files our band reader rejects
#[derive(Default)]
pub struct MockStore {
    pub objects: HashMap<String,Vec<String>>, // prefix -> keys
    pub failing_prefixes: HashSet<String>,
    pub failing_keys: HashSet<String>,
    pub corrupt_keys: HashSet<String>,
    pub download_delay: Option<Duration>,
    pub cancel_on_download: Option<CancellationToken>,

    pub n_list: AtomicUsize,
    pub n_download: AtomicUsize,
    pub downloaded: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn new ()->Self { MockStore::default() }

    pub fn with_keys (mut self, prefix: &str, keys: &[String])->Self {
        self.objects.entry( prefix.to_string()).or_default().extend( keys.iter().cloned());
        self
    }

    pub fn list_count (&self)->usize { self.n_list.load( Ordering::SeqCst) }
    pub fn download_count (&self)->usize { self.n_download.load( Ordering::SeqCst) }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn list (&self, _bucket: &str, prefix: &str, max_keys: i32)->std::result::Result<Vec<String>,String> {
        self.n_list.fetch_add( 1, Ordering::SeqCst);
        if self.failing_prefixes.contains( prefix) {
            return Err( format!("access denied for {prefix}"))
        }
        let keys = self.objects.get( prefix).cloned().unwrap_or_default();
        Ok( keys.into_iter().take( max_keys as usize).collect() )
    }

    async fn download (&self, _bucket: &str, key: &str, file_path: &Path)->std::result::Result<(),String> {
        self.n_download.fetch_add( 1, Ordering::SeqCst);
        self.downloaded.lock().unwrap().push( key.to_string());

        if let Some(token) = &self.cancel_on_download {
            token.cancel();
        }
        // same protocol as the S3 download: stream into a temp sibling that is moved into place on completion
        fs::create_dir_all( file_path.parent().unwrap()).map_err( |e| e.to_string())?;
        let mut tmp_file = temp_sibling_file( file_path).map_err( |e| e.to_string())?;

        if let Some(delay) = self.download_delay {
            tokio::time::sleep( delay).await;
        }
        if self.failing_keys.contains( key) {
            return Err( format!("no such key {key}"))
        }

        let content = if self.corrupt_keys.contains( key) { format!("corrupt {key}") } else { key.to_string() };
        tmp_file.write_all( content.as_bytes()).map_err( |e| e.to_string())?;
        persist_temp_file( tmp_file, file_path).map_err( |e| e.to_string())
    }
}

/// produces small constant bands for files written by [`MockStore`]
#[derive(Default)]
pub struct MockBandReader {
    pub read_delay: Option<Duration>,
    pub n_read: AtomicUsize,
    pub n_active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl MockBandReader {
    pub fn with_delay (delay: Duration)->Self {
        MockBandReader { read_delay: Some(delay), ..MockBandReader::default() }
    }

    pub fn read_count (&self)->usize { self.n_read.load( Ordering::SeqCst) }

    /// the maximum number of concurrent band reads so far
    pub fn max_concurrent_reads (&self)->usize { self.max_active.load( Ordering::SeqCst) }
}

impl BandReader for MockBandReader {
    fn read_band (&self, path: &Path, name: &str)->Result<Band> {
        self.n_read.fetch_add( 1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            let n = self.n_active.fetch_add( 1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max( n, Ordering::SeqCst);
            std::thread::sleep( delay);
            self.n_active.fetch_sub( 1, Ordering::SeqCst);
        }

        let content = fs::read_to_string( path)?;
        if content.starts_with("corrupt") {
            return Err( OdinGoesrVideoError::MissingBandError( path.display().to_string(), name.to_string()))
        }

        let v = if name == "CMI_C13" { 250.0 } else { 0.25 };
        let mut values = Array2::<f32>::from_elem( (4,6), v);
        values[[0,0]] = f32::NAN; // off-Earth corner
        Ok( Band::from_values( values) )
    }
}

/// what a [`RecordingEncoder`] saw when it was called
#[derive(Debug,Clone)]
pub struct EncodeRecord {
    pub frame_dir: PathBuf,
    pub frames: Vec<PathBuf>, // resolved frame sources in sequence order
    pub frame_rate: u32,
    pub codec_args: Vec<String>,
    pub output: PathBuf,
}

/// encoder that records its inputs and writes a dummy output file
#[derive(Default)]
pub struct RecordingEncoder {
    pub fail: bool,
    pub records: Mutex<Vec<EncodeRecord>>,
}

impl RecordingEncoder {
    pub fn failing ()->Self { RecordingEncoder { fail: true, ..Default::default() } }

    pub fn last_record (&self)->Option<EncodeRecord> { self.records.lock().unwrap().last().cloned() }
}

impl VideoEncoder for RecordingEncoder {
    fn encode (&self, job: &EncodeJob)->Result<()> {
        let frames: Vec<PathBuf> = job.frame_paths().iter().map( |p| fs::canonicalize(p).unwrap()).collect();
        self.records.lock().unwrap().push( EncodeRecord {
            frame_dir: job.frame_dir.to_path_buf(),
            frames,
            frame_rate: job.frame_rate,
            codec_args: job.profile.codec_args(),
            output: job.output.to_path_buf(),
        });

        if self.fail {
            Err( OdinGoesrVideoError::EncodeError("encoder crashed".to_string()))
        } else {
            fs::write( job.output, b"mp4")?;
            Ok(())
        }
    }
}

pub const TEST_DPI: u32 = 10;

pub fn pipeline_config (product: GoesrProduct, concurrency: usize)->PipelineConfig {
    PipelineConfig {
        bucket: BUCKET.to_string(),
        product,
        max_keys: 100,
        concurrency,
        task_timeout: Some( Duration::from_secs(30)),
        encoder: EncoderConfig::default(),
    }
}

pub struct TestPipeline {
    pub pipeline: GoesrVideoPipeline,
    pub store: Arc<MockStore>,
    pub reader: Arc<MockBandReader>,
    pub encoder: Arc<RecordingEncoder>,
    pub cache: Arc<SceneCache>,
}

pub fn test_pipeline (config: PipelineConfig, data_dir: &Path, store: MockStore, encoder: RecordingEncoder)->TestPipeline {
    test_pipeline_with_reader( config, data_dir, store, MockBandReader::default(), encoder)
}

pub fn test_pipeline_with_reader (config: PipelineConfig, data_dir: &Path, store: MockStore, reader: MockBandReader, encoder: RecordingEncoder)->TestPipeline {
    let store = Arc::new( store);
    let reader = Arc::new( reader);
    let encoder = Arc::new( encoder);
    let cache = Arc::new( SceneCache::new( data_dir, RetentionPolicy::KeepForever).unwrap());
    let renderer = Arc::new( SceneRenderer::new( TEST_DPI, None));

    let pipeline = GoesrVideoPipeline::new( config, store.clone(), cache.clone(), reader.clone(), renderer, encoder.clone());
    TestPipeline { pipeline, store, reader, encoder, cache }
}

/// the temp files of incomplete downloads and renders below dir
pub fn part_files (dir: &Path)->Vec<PathBuf> {
    let mut files = Vec::new();
    odin_common::fs::visit_dirs( dir, true, &mut |e| {
        if e.path().extension().is_some_and( |ext| ext == "part") { files.push( e.path()) }
    }).unwrap();
    files
}

pub fn canonical (paths: &[PathBuf])->Vec<PathBuf> {
    paths.iter().map( |p| fs::canonicalize(p).unwrap()).collect()
}
