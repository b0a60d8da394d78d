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

//! the list - fetch/render - assemble pipeline.
//!
//! Listing is done sequentially up front. Each listed scene then becomes an independent task that
//! fetches the data file and renders it. Tasks run concurrently (bounded by the configured concurrency)
//! and complete in arbitrary order, failing tasks just drop their scene. The surviving images are put
//! back into capture time order before they are handed to the video encoder.

use std::{panic::AssertUnwindSafe, path::{Path,PathBuf}, sync::Arc, time::{Duration,Instant}};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::{sync::{watch, OwnedSemaphorePermit, Semaphore}, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, error};

use odin_common::MinMaxAvg;
use odin_common::datetime::short_utc_datetime_string;
use crate::bands::BandReader;
use crate::cache::SceneCache;
use crate::errors::{OdinGoesrVideoError, Result};
use crate::render::SceneRenderer;
use crate::scene::{GoesrProduct, TimeRange, scene_prefixes, scene_timestamp};
use crate::storage::{ObjectStore, locate_scenes};
use crate::video::{EncoderConfig, VideoEncoder, assemble_video};

/// the settings that are passed into each pipeline task
#[derive(Debug,Clone)]
pub struct PipelineConfig {
    pub bucket: String,
    pub product: GoesrProduct,
    pub max_keys: i32,
    pub concurrency: usize,
    pub task_timeout: Option<Duration>,
    pub encoder: EncoderConfig,
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum PipelineState {
    Idle,
    Listing,
    FanningOut,
    Collecting,
    Reordering,
    Assembling,
    Done,
    Failed,
}

/// successful outcome of a single scene task
#[derive(Debug,Clone,PartialEq)]
pub struct RenderedScene {
    pub key: String,
    pub image: PathBuf,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug,Clone,PartialEq)]
pub struct DroppedScene {
    pub key: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct RunReport {
    pub n_listed: usize,
    pub frames: Vec<PathBuf>,  // in time order
    pub dropped: Vec<DroppedScene>,
    pub output: PathBuf,
    pub task_secs: MinMaxAvg,
}

impl RunReport {
    pub fn n_frames (&self)->usize { self.frames.len() }
    pub fn n_dropped (&self)->usize { self.dropped.len() }
}

/// the backends and shared (immutable) resources of a pipeline
pub struct GoesrVideoPipeline {
    config: Arc<PipelineConfig>,
    store: Arc<dyn ObjectStore>,
    cache: Arc<SceneCache>,
    reader: Arc<dyn BandReader>,
    renderer: Arc<SceneRenderer>,
    encoder: Arc<dyn VideoEncoder>,

    cancel: CancellationToken,
    state: watch::Sender<PipelineState>,
}

impl GoesrVideoPipeline {
    pub fn new (config: PipelineConfig,
                store: Arc<dyn ObjectStore>,
                cache: Arc<SceneCache>,
                reader: Arc<dyn BandReader>,
                renderer: Arc<SceneRenderer>,
                encoder: Arc<dyn VideoEncoder>)->Self
    {
        let (state,_) = watch::channel( PipelineState::Idle);
        GoesrVideoPipeline { config: Arc::new(config), store, cache, reader, renderer, encoder, cancel: CancellationToken::new(), state }
    }

    /// use an externally owned cancellation token (e.g. shared between several pipelines)
    pub fn with_cancellation_token (mut self, cancel: CancellationToken)->Self {
        self.cancel = cancel;
        self
    }

    pub fn config (&self)->&PipelineConfig { &self.config }

    /// the token to cooperatively cancel a run. Cancellation takes effect before the next scene is dispatched,
    /// already dispatched scenes still complete
    pub fn cancellation_token (&self)->CancellationToken { self.cancel.clone() }

    pub fn subscribe_state (&self)->watch::Receiver<PipelineState> { self.state.subscribe() }

    pub fn state (&self)->PipelineState { *self.state.borrow() }

    fn set_state (&self, new_state: PipelineState) {
        let old_state = self.state.send_replace( new_state);
        debug!("pipeline state {:?} -> {:?}", old_state, new_state);
    }

    /// produce a video for all scenes between `start` and `end`
    pub async fn run_between (&self, start: DateTime<Utc>, end: DateTime<Utc>, output: &Path)->Result<RunReport> {
        match TimeRange::new( start, end) {
            Ok(range) => self.run( &range, output).await,
            Err(e) => {
                self.set_state( PipelineState::Failed);
                Err(e)
            }
        }
    }

    /// produce a video for all scenes within the given time range
    pub async fn run (&self, range: &TimeRange, output: &Path)->Result<RunReport> {
        let res = self.execute( range, output).await;
        match &res {
            Ok(report) => {
                self.set_state( PipelineState::Done);
                info!("created {:?} from {} of {} scenes ({} dropped)", report.output, report.n_frames(), report.n_listed, report.n_dropped());
            }
            Err(e) => {
                self.set_state( PipelineState::Failed);
                error!("pipeline run for {} failed: {}", range, e);
            }
        }
        res
    }

    async fn execute (&self, range: &TimeRange, output: &Path)->Result<RunReport> {
        self.set_state( PipelineState::Listing);
        let keys = self.list_scenes( range).await?;
        let n_listed = keys.len();
        if n_listed == 0 {
            return Err( OdinGoesrVideoError::NoScenesError(0))
        }

        let (rendered, mut dropped, task_secs) = self.process_scenes( keys).await?;

        self.set_state( PipelineState::Reordering);
        let frames = order_frames( rendered, &mut dropped);
        if frames.is_empty() {
            return Err( OdinGoesrVideoError::NoScenesError(n_listed))
        }
        if !dropped.is_empty() {
            warn!("dropped {} of {} scenes", dropped.len(), n_listed);
        }

        self.set_state( PipelineState::Assembling);
        let encoder = self.encoder.clone();
        let product = self.config.product;
        let encoder_config = self.config.encoder.clone();
        let output = output.to_path_buf();
        let (frames,output) = tokio::task::spawn_blocking( move || {
            assemble_video( encoder.as_ref(), &frames, &output, product, &encoder_config).map( |_| (frames,output))
        }).await.map_err( |e| OdinGoesrVideoError::EncodeError( format!("encoder task failed: {e}")))??;

        Ok( RunReport { n_listed, frames, dropped, output, task_secs } )
    }

    /// the keys of all scenes within the range, in hourly prefix order
    pub async fn list_scenes (&self, range: &TimeRange)->Result<Vec<String>> {
        let prefixes = scene_prefixes( range, self.config.product);
        debug!("listing {} prefixes for {}", prefixes.len(), range);
        locate_scenes( self.store.as_ref(), &self.config.bucket, prefixes, self.config.max_keys).await
    }

    /// fetch and render the given scenes concurrently. Returns the rendered scenes in completion order, the
    /// dropped scenes and the task time statistics
    pub async fn process_scenes (&self, keys: Vec<String>)->Result<(Vec<RenderedScene>,Vec<DroppedScene>,MinMaxAvg)> {
        self.set_state( PipelineState::FanningOut);
        self.cache.start_run();

        let n_workers = self.config.concurrency.max(1);
        let permits = Arc::new( Semaphore::new( n_workers));
        let mut tasks: JoinSet<(String,Result<RenderedScene>,Duration)> = JoinSet::new();
        let mut cancelled = false;

        debug!("dispatching {} scenes to {} workers", keys.len(), n_workers);
        for key in keys {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                p = permits.clone().acquire_owned() => p.ok()
            };
            let Some(permit) = permit else {
                cancelled = true;
                break
            };

            let config = self.config.clone();
            let store = self.store.clone();
            let cache = self.cache.clone();
            let reader = self.reader.clone();
            let renderer = self.renderer.clone();

            tasks.spawn( async move {
                let t0 = Instant::now();
                let task = AssertUnwindSafe( run_scene_task( config, store, cache, reader, renderer, key.clone(), permit)).catch_unwind();
                let res = match task.await {
                    Ok(res) => res,
                    Err(_) => Err( OdinGoesrVideoError::TaskError( key.clone(), "panicked".to_string()))
                };
                (key, res, t0.elapsed())
            });
        }

        self.set_state( PipelineState::Collecting);
        let mut rendered: Vec<RenderedScene> = Vec::new();
        let mut dropped: Vec<DroppedScene> = Vec::new();
        let mut task_secs = MinMaxAvg::new();

        while let Some(res) = tasks.join_next().await {
            match res {
                Ok( (key, Ok(scene), dur) ) => {
                    debug!("finished {} in {:?}", key, dur);
                    task_secs.add( dur.as_secs_f64());
                    rendered.push( scene);
                }
                Ok( (key, Err(e), _) ) => {
                    warn!("dropping scene {}: {}", key, e);
                    dropped.push( DroppedScene{ key, reason: e.to_string() });
                }
                Err(e) => { // we don't abort tasks and catch panics, this should not happen
                    error!("scene task failed: {}", e);
                    dropped.push( DroppedScene{ key: String::new(), reason: e.to_string() });
                }
            }
        }

        if cancelled {
            info!("pipeline cancelled after {} scenes", rendered.len() + dropped.len());
            Err( OdinGoesrVideoError::CancelledError())
        } else {
            Ok( (rendered, dropped, task_secs) )
        }
    }
}

/// fetch and render a single scene, bounded by the configured task timeout
async fn run_scene_task (config: Arc<PipelineConfig>, store: Arc<dyn ObjectStore>, cache: Arc<SceneCache>,
                         reader: Arc<dyn BandReader>, renderer: Arc<SceneRenderer>, key: String,
                         permit: OwnedSemaphorePermit)->Result<RenderedScene>
{
    let task = process_scene( config.clone(), store, cache, reader, renderer, key.clone(), permit);

    if let Some(timeout) = config.task_timeout {
        match tokio::time::timeout( timeout, task).await {
            Ok(res) => res,
            Err(_) => Err( OdinGoesrVideoError::TimeoutError( key, timeout))
        }
    } else {
        task.await
    }
}

/// the worker permit is held until the render is finished, even if the task times out before that
async fn process_scene (config: Arc<PipelineConfig>, store: Arc<dyn ObjectStore>, cache: Arc<SceneCache>,
                        reader: Arc<dyn BandReader>, renderer: Arc<SceneRenderer>, key: String,
                        permit: OwnedSemaphorePermit)->Result<RenderedScene>
{
    // a key without timestamp still gets rendered (without overlay) but can't be ordered
    let timestamp = match scene_timestamp( &key) {
        Ok(dt) => Some(dt),
        Err(e) => { warn!("{}", e); None }
    };

    let data_path = cache.fetch( store.as_ref(), &config.bucket, &key).await?;
    let image_path = cache.image_path( &key, renderer.dpi());
    let overlay = timestamp.as_ref().map( short_utc_datetime_string);

    let image = tokio::task::spawn_blocking( move || {
        let _permit = permit;
        renderer.render_scene( reader.as_ref(), &data_path, &image_path, overlay.as_deref())
    }).await.map_err( |e| OdinGoesrVideoError::TaskError( key.clone(), e.to_string()))??;

    Ok( RenderedScene { key, image, timestamp } )
}

/// put rendered scenes into capture time order (image path as tie breaker). Scenes without a capture
/// timestamp have no defined position in the sequence and are moved to `dropped`
pub fn order_frames (rendered: Vec<RenderedScene>, dropped: &mut Vec<DroppedScene>)->Vec<PathBuf> {
    let mut dated: Vec<(DateTime<Utc>,PathBuf)> = Vec::with_capacity( rendered.len());

    for scene in rendered {
        match scene.timestamp {
            Some(dt) => dated.push( (dt, scene.image)),
            None => {
                let reason = OdinGoesrVideoError::ParseError( scene.key.clone()).to_string();
                dropped.push( DroppedScene{ key: scene.key, reason });
            }
        }
    }

    dated.sort();
    dated.into_iter().map( |(_,path)| path).collect()
}
