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

//! true color rendering of ABI multi-band scenes.
//!
//! ABI has no green channel, we synthesize one from red, blue and the "veggie" near-IR band
//! (see <https://doi.org/10.1175/BAMS-D-16-0145.1>) and fall back to an inverted clean IR
//! brightness temperature layer wherever the visible bands are dark (night side, cloud tops).

use std::{fs, path::{Path,PathBuf}};
use ndarray::{Array2, Zip};
use image::{imageops::{self, FilterType}, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use ab_glyph::{Font, FontVec};
use tracing::{debug, warn};

use odin_common::fs::write_file_atomically;
use crate::bands::{Band, BandReader, BAND_BLUE, BAND_RED, BAND_VEGGIE, BAND_CLEAN_IR};
use crate::errors::{OdinGoesrVideoError, Result, render_error};

// green band synthesis coefficients. Note the order: red (C02), blue (C01), veggie (C03)
pub const GREEN_FROM_RED: f32 = 0.48358168;
pub const GREEN_FROM_BLUE: f32 = 0.45706946;
pub const GREEN_FROM_VEGGIE: f32 = 0.06038137;

// clean IR calibration bounds [K]
pub const CLEAN_IR_MIN: f32 = 90.0;
pub const CLEAN_IR_MAX: f32 = 313.0;

// output geometry in inches, converted to pixels with the render resolution
pub const FIGURE_SIZE_IN: f32 = 6.0;
pub const PAD_IN: f32 = 0.1;
pub const OVERLAY_PT: f32 = 4.0;

pub const DEFAULT_DPI: u32 = 300;

const DEFAULT_FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu-sans-mono-fonts/DejaVuSansMono.ttf",
];

/// the per-pixel channels of a true color composite, all in [0,1] (non finite values are possible
/// for invalid pixels and are rendered as 0)
#[derive(Debug,Clone,PartialEq)]
pub struct TrueColorComposite {
    pub red: Array2<f32>,
    pub green: Array2<f32>,
    pub blue: Array2<f32>,
    pub alpha: Array2<f32>,
}

impl TrueColorComposite {
    /// (rows,cols)
    pub fn dim (&self)->(usize,usize) { self.red.dim() }
}

#[inline]
fn gamma_corrected (v: f32)->f32 {
    v.max(0.0).sqrt() // f32::max also maps NaN to 0
}

/// normalize and invert clean IR brightness temperatures into a [0,1] greyscale layer
#[inline]
pub fn clean_ir_value (t: f32)->f32 {
    1.0 - ((t - CLEAN_IR_MIN) / (CLEAN_IR_MAX - CLEAN_IR_MIN)).clamp(0.0, 1.0)
}

/// compute the true color composite from the ABI C01 (blue), C02 (red), C03 (veggie) and C13 (clean IR) bands.
/// The reflective bands all use the validity mask of C01, which also determines the alpha channel (off Earth)
pub fn compose_true_color (c01: &Band, c02: &Band, c03: &Band, c13: &Band)->std::result::Result<TrueColorComposite,String> {
    let dim = c01.dim();
    for (name,band) in [(BAND_RED,c02), (BAND_VEGGIE,c03), (BAND_CLEAN_IR,c13)] {
        if band.dim() != dim {
            return Err( format!("band {name} has shape {:?}, expected {:?}", band.dim(), dim))
        }
    }
    let mask = &c01.valid;

    let ref_blue = c01.values.mapv( gamma_corrected);
    let ref_red = c02.values.mapv( gamma_corrected);
    let ref_veggie = c03.values.mapv( gamma_corrected);

    let mut ref_green = ref_veggie.clone();
    Zip::from(&mut ref_green).and(&ref_red).and(&ref_blue).and(&ref_veggie).and(mask)
        .for_each( |g, &r, &b, &v, &is_valid| {
            if is_valid {
                *g = GREEN_FROM_RED * r + GREEN_FROM_BLUE * b + GREEN_FROM_VEGGIE * v;
            }
        });

    let clean_ir = c13.values.mapv( clean_ir_value);

    // f32::max ignores a NaN operand, i.e. invalid IR values leave the visible channel as is
    let red = Zip::from(&ref_red).and(&clean_ir).map_collect( |&c, &ir| c.max(ir));
    let green = Zip::from(&ref_green).and(&clean_ir).map_collect( |&c, &ir| c.max(ir));
    let blue = Zip::from(&ref_blue).and(&clean_ir).map_collect( |&c, &ir| c.max(ir));
    let alpha = mask.mapv( |is_valid| if is_valid { 1.0 } else { 0.0 });

    Ok( TrueColorComposite { red, green, blue, alpha } )
}

#[inline]
fn to_u8 (v: f32)->u8 {
    if v.is_finite() { (v.clamp(0.0, 1.0) * 255.0).round() as u8 } else { 0 }
}

/// convert a composite into an RGBA image of the same size
pub fn composite_to_image (comp: &TrueColorComposite)->RgbaImage {
    let (rows,cols) = comp.dim();
    RgbaImage::from_fn( cols as u32, rows as u32, |x,y| {
        let idx = [y as usize, x as usize];
        Rgba([ to_u8(comp.red[idx]), to_u8(comp.green[idx]), to_u8(comp.blue[idx]), to_u8(comp.alpha[idx]) ])
    })
}

pub fn load_font (path: impl AsRef<Path>)->Result<FontVec> {
    let data = fs::read( path.as_ref())?;
    Ok( FontVec::try_from_vec( data)? )
}

/// look up the first of our known default font locations that exists
pub fn find_default_font ()->Option<PathBuf> {
    DEFAULT_FONT_PATHS.iter().map(PathBuf::from).find( |p| p.is_file())
}

/// renders scene files into PNG images of a fixed resolution. Instances have no mutable state and can be shared
/// between threads
pub struct SceneRenderer {
    dpi: u32,
    font: Option<FontVec>,
}

impl SceneRenderer {
    pub fn new (dpi: u32, font: Option<FontVec>)->Self {
        SceneRenderer { dpi: dpi.max(1), font }
    }

    /// create a renderer that uses the font at the given path or (if none is given) one of the well known
    /// system font locations. If there is no default font, overlays are disabled
    pub fn with_font_path (dpi: u32, font_path: Option<&Path>)->Result<Self> {
        let font = match font_path {
            Some(path) => Some( load_font(path)? ),
            None => match find_default_font() {
                Some(path) => {
                    debug!("using overlay font {:?}", path);
                    Some( load_font(path)? )
                }
                None => {
                    warn!("no overlay font found, rendering images without timestamps");
                    None
                }
            }
        };
        Ok( SceneRenderer::new( dpi, font) )
    }

    pub fn dpi (&self)->u32 { self.dpi }

    /// scale the composite to the output figure size, add a transparent border and draw the optional overlay
    /// text at the top left of the image area
    pub fn render_composite (&self, comp: &TrueColorComposite, overlay: Option<&str>)->RgbaImage {
        let img = composite_to_image( comp);
        let (w,h) = img.dimensions();
        let dpi = self.dpi as f32;

        let long_side = (FIGURE_SIZE_IN * dpi).round().max(1.0);
        let scale = long_side / w.max(h).max(1) as f32;
        let tw = ((w as f32 * scale).round() as u32).max(1);
        let th = ((h as f32 * scale).round() as u32).max(1);
        let img = if (tw,th) != (w,h) { imageops::resize( &img, tw, th, FilterType::Triangle) } else { img };

        let pad = (PAD_IN * dpi).round() as u32;
        let mut canvas = RgbaImage::new( tw + 2*pad, th + 2*pad); // all transparent
        imageops::replace( &mut canvas, &img, pad as i64, pad as i64);

        if let (Some(text), Some(font)) = (overlay, &self.font) {
            if let Some(px_scale) = font.pt_to_px_scale( OVERLAY_PT * dpi / 72.0) {
                draw_text_mut( &mut canvas, Rgba([255,255,255,255]), pad as i32, pad as i32, px_scale, font, text);
            }
        }

        canvas
    }

    /// read the required bands from `data_path` and write the rendered image to `image_path`. The target
    /// file is replaced atomically
    pub fn render_to_file (&self, reader: &dyn BandReader, data_path: &Path, image_path: &Path, overlay: Option<&str>)->Result<()> {
        let path_str = data_path.display().to_string();
        let read = |name: &str| reader.read_band( data_path, name).map_err( |e| render_error( &path_str, e));

        let c01 = read( BAND_BLUE)?;
        let c02 = read( BAND_RED)?;
        let c03 = read( BAND_VEGGIE)?;
        let c13 = read( BAND_CLEAN_IR)?;

        let comp = compose_true_color( &c01, &c02, &c03, &c13).map_err( |e| render_error( &path_str, e))?;
        let img = self.render_composite( &comp, overlay);

        write_file_atomically::<_,OdinGoesrVideoError>( image_path, |w| {
            img.write_to( w, ImageFormat::Png)?;
            Ok(())
        })?;

        debug!("rendered {:?} ({}x{})", image_path, img.width(), img.height());
        Ok(())
    }

    /// render a scene unless its image already exists (the image path is the cache key)
    pub fn render_scene (&self, reader: &dyn BandReader, data_path: &Path, image_path: &Path, overlay: Option<&str>)->Result<PathBuf> {
        if image_path.is_file() {
            debug!("using cached image {:?}", image_path);
        } else {
            self.render_to_file( reader, data_path, image_path, overlay)?;
        }
        Ok( image_path.to_path_buf() )
    }
}
