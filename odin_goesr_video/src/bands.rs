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

//! access to named 2D data bands (ABI cloud and moisture imagery channels) of a scene file

use std::{path::Path, sync::Arc};
use ndarray::Array2;

use crate::errors::Result;

// the MCMIP variables we use for true color rendering, see https://www.goes-r.gov/products/docs/PUG-L2+-vol5.pdf
pub const BAND_BLUE: &str = "CMI_C01";    // 0.47µm reflectance
pub const BAND_RED: &str = "CMI_C02";     // 0.64µm reflectance
pub const BAND_VEGGIE: &str = "CMI_C03";  // 0.86µm reflectance
pub const BAND_CLEAN_IR: &str = "CMI_C13"; // 10.3µm brightness temperature [K]

/// a physical (scaled) data band with a validity mask of the same shape (rows,cols)
#[derive(Debug,Clone,PartialEq)]
pub struct Band {
    pub values: Array2<f32>,
    pub valid: Array2<bool>,
}

impl Band {
    /// create a band from values, treating all non-finite values as invalid
    pub fn from_values (values: Array2<f32>)->Self {
        let valid = values.mapv( |v| v.is_finite());
        Band { values, valid }
    }

    /// (rows,cols)
    pub fn dim (&self)->(usize,usize) { self.values.dim() }
}

/// the decoding backend for scene files
pub trait BandReader: Send + Sync {
    /// read the named band from the file at `path`. Missing bands have to be reported as `MissingBandError`
    fn read_band (&self, path: &Path, name: &str)->Result<Band>;
}

#[cfg(feature="gdal")]
pub use gdal_reader::GdalBandReader;

/// the band reader for netCDF scene files this crate was built with
pub fn default_band_reader ()->Result<Arc<dyn BandReader>> {
    #[cfg(feature="gdal")]
    return Ok( Arc::new( GdalBandReader));

    #[cfg(not(feature="gdal"))]
    return Err( crate::errors::config_error( "no netCDF reader available (build with feature \"gdal\")"));
}

#[cfg(feature="gdal")]
mod gdal_reader {
    use std::path::Path;
    use ndarray::Array2;
    use gdal::Dataset;
    use tracing::debug;

    use super::{Band, BandReader};
    use crate::errors::{OdinGoesrVideoError, Result};

    /// [`BandReader`] for netCDF scene files that uses the GDAL netCDF driver
    #[derive(Debug,Default,Clone)]
    pub struct GdalBandReader;

    fn nc_dataset (nc_path: &Path, var_name: &str)->std::result::Result<Dataset,gdal::errors::GdalError> {
        let path = format!("NETCDF:{:?}:{:?}", nc_path, var_name);
        Dataset::open(&path)
    }

    impl BandReader for GdalBandReader {
        fn read_band (&self, path: &Path, name: &str)->Result<Band> {
            let ds = nc_dataset( path, name)
                .map_err( |e| OdinGoesrVideoError::MissingBandError( path.display().to_string(), format!("{name} ({e})")))?;
            let band = ds.rasterband(1)
                .map_err( |e| OdinGoesrVideoError::MissingBandError( path.display().to_string(), format!("{name} ({e})")))?;

            let (cols,rows) = band.size();
            let scale = band.scale().unwrap_or(1.0);
            let offset = band.offset().unwrap_or(0.0);
            let no_data = band.no_data_value();
            debug!("reading {name} ({cols}x{rows}, scale={scale}, offset={offset}, no_data={no_data:?}) from {path:?}");

            let buf = band.read_band_as::<f64>()
                .map_err( |e| OdinGoesrVideoError::RenderError( path.display().to_string(), format!("cannot read {name}: {e}")))?;
            let (_,raw) = buf.into_shape_and_vec();

            let mut values: Vec<f32> = Vec::with_capacity(raw.len());
            let mut valid: Vec<bool> = Vec::with_capacity(raw.len());
            for r in raw {
                let is_valid = r.is_finite() && no_data.map_or(true, |nd| r != nd);
                valid.push( is_valid);
                values.push( if is_valid { (r * scale + offset) as f32 } else { f32::NAN });
            }

            let values = Array2::from_shape_vec( (rows,cols), values)
                .map_err( |e| OdinGoesrVideoError::RenderError( path.display().to_string(), e.to_string()))?;
            let valid = Array2::from_shape_vec( (rows,cols), valid)
                .map_err( |e| OdinGoesrVideoError::RenderError( path.display().to_string(), e.to_string()))?;

            Ok( Band { values, valid } )
        }
    }
}
