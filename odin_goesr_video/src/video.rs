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

//! assembling ordered image sequences into videos

use std::{fs, path::{Path,PathBuf}, process::Command};
use serde::{Deserialize,Serialize};
use tracing::{debug, info, error};

use crate::errors::{OdinGoesrVideoError, Result};
use crate::scene::GoesrProduct;

pub const FRAME_RATE: u32 = 25;

/// printf style pattern of the staged frame file names
pub const FRAME_PATTERN: &str = "%06d.png";

pub fn frame_name (idx: usize)->String {
    format!("{idx:06}.png")
}

/// the codec parameters that are passed through to the encoder
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct EncoderConfig {
    pub ffmpeg: PathBuf,
    pub crf: u32,
    pub preset: String,
    pub movflags: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EncoderConfig {
    fn default()->Self {
        EncoderConfig {
            ffmpeg: PathBuf::from("ffmpeg"),
            crf: 20,
            preset: "slower".to_string(),
            movflags: "faststart".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// product specific output parameters
#[derive(Debug,Clone,PartialEq)]
pub struct EncodingProfile {
    pub crf: u32,
    pub preset: String,
    pub movflags: String,
    pub pad_even: bool,  // pad width and height to even numbers
    pub pix_fmt: Option<String>,
}

impl EncodingProfile {
    /// CONUS frames have odd native dimensions which the encoder rejects for yuv420p, hence we pad
    /// them and fix the pixel format. Other products use the encoder defaults
    pub fn for_product (product: GoesrProduct, config: &EncoderConfig)->Self {
        let (pad_even, pix_fmt) = if product.is_conus() { (true, Some("yuv420p".to_string())) } else { (false, None) };
        EncodingProfile { crf: config.crf, preset: config.preset.clone(), movflags: config.movflags.clone(), pad_even, pix_fmt }
    }

    /// the output codec args in the order they are passed to the encoder
    pub fn codec_args (&self)->Vec<String> {
        let mut args: Vec<String> = vec![
            "-crf".into(), self.crf.to_string(),
            "-preset".into(), self.preset.clone(),
            "-movflags".into(), self.movflags.clone(),
        ];
        if self.pad_even {
            args.push("-vf".into());
            args.push("pad=ceil(iw/2)*2:ceil(ih/2)*2".into());
        }
        if let Some(pix_fmt) = &self.pix_fmt {
            args.push("-pix_fmt".into());
            args.push(pix_fmt.clone());
        }
        args
    }
}

/// everything an encoder needs to turn a staged frame directory into a video
#[derive(Debug,Clone)]
pub struct EncodeJob<'a> {
    pub frame_dir: &'a Path,
    pub n_frames: usize,
    pub frame_rate: u32,
    pub profile: &'a EncodingProfile,
    pub output: &'a Path,
}

impl<'a> EncodeJob<'a> {
    /// the input pattern for the staged frames (`{frame_dir}/%06d.png`)
    pub fn input_pattern (&self)->PathBuf { self.frame_dir.join( FRAME_PATTERN) }

    /// the staged frame paths in sequence order
    pub fn frame_paths (&self)->Vec<PathBuf> {
        (0..self.n_frames).map( |i| self.frame_dir.join( frame_name(i))).collect()
    }
}

/// the video encoding backend
pub trait VideoEncoder: Send + Sync {
    fn encode (&self, job: &EncodeJob)->Result<()>;
}

/// [`VideoEncoder`] that runs an external ffmpeg process
#[derive(Debug,Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    extra_args: Vec<String>,
}

impl FfmpegEncoder {
    pub fn new (config: &EncoderConfig)->Self {
        FfmpegEncoder { ffmpeg: config.ffmpeg.clone(), extra_args: config.extra_args.clone() }
    }

    pub fn command_args (&self, job: &EncodeJob)->Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(), // OK to overwrite
            "-hide_banner".into(),
            "-framerate".into(), job.frame_rate.to_string(),
            "-i".into(), job.input_pattern().display().to_string(),
        ];
        args.extend( job.profile.codec_args());
        args.extend( self.extra_args.iter().cloned());
        args.push( job.output.display().to_string());
        args
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode (&self, job: &EncodeJob)->Result<()> {
        let args = self.command_args( job);
        debug!("running {:?} {}", self.ffmpeg, args.join(" "));

        let output = Command::new( &self.ffmpeg).args( &args).output()
            .map_err( |e| OdinGoesrVideoError::EncodeError( format!("could not run {:?}: {e}", self.ffmpeg)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy( &output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(10).collect();
            let msg = tail.into_iter().rev().collect::<Vec<_>>().join("\n");
            error!("ffmpeg failed: {}\n{}", output.status, msg);
            Err( OdinGoesrVideoError::EncodeError( format!("{} exited with {}: {}", self.ffmpeg.display(), output.status, msg)))
        }
    }
}

/// stage a frame file under the given sequence name
fn stage_frame (src: &Path, tgt: &Path)->std::io::Result<()> {
    #[cfg(unix)]
    {
        let src = if src.is_absolute() { src.to_path_buf() } else { std::env::current_dir()?.join(src) };
        std::os::unix::fs::symlink( src, tgt)
    }
    #[cfg(not(unix))]
    {
        fs::copy( src, tgt).map(|_| ())
    }
}

/// stage the ordered images as a numbered sequence in a temporary directory and encode them into `output`.
/// The staging directory is removed when this function returns, regardless of the outcome
pub fn assemble_video (encoder: &dyn VideoEncoder, images: &[PathBuf], output: &Path, product: GoesrProduct, config: &EncoderConfig)->Result<()> {
    if images.is_empty() {
        return Err( OdinGoesrVideoError::EncodeError("no frames to encode".to_string()))
    }

    let staging = tempfile::Builder::new().prefix("goesr_frames").tempdir()?;
    for (i,img) in images.iter().enumerate() {
        stage_frame( img, &staging.path().join( frame_name(i)))?;
    }
    debug!("staged {} frames in {:?}", images.len(), staging.path());

    if let Some(dir) = output.parent() {
        if !dir.as_os_str().is_empty() { fs::create_dir_all(dir)?; }
    }

    let profile = EncodingProfile::for_product( product, config);
    let job = EncodeJob { frame_dir: staging.path(), n_frames: images.len(), frame_rate: FRAME_RATE, profile: &profile, output };
    encoder.encode( &job)?;

    info!("encoded {} frames into {:?}", images.len(), output);
    Ok(())
}
