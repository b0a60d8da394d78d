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

//! GOES-R scene identification: products, satellites, time ranges, S3 prefixes and the
//! file name convention that encodes scan times

use std::{fmt, str::FromStr, path::Path};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize,Serialize};
use regex::Regex;
use lazy_static::lazy_static;

use odin_common::if_let;
use odin_common::datetime::{parse_cli_utc_datetime, started_hours};
use crate::errors::{OdinGoesrVideoError, Result};

/* #region products and satellites *************************************************************************/

/// the ABI L2 multi-band cloud and moisture imagery (MCMIP) products we can render as true color
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize)]
#[serde(try_from="String", into="String")]
pub enum GoesrProduct {
    FullDisk,
    Conus,
    Meso1,
    Meso2,
}

impl GoesrProduct {
    pub fn as_str (&self)->&'static str {
        match self {
            GoesrProduct::FullDisk => "ABI-L2-MCMIPF",
            GoesrProduct::Conus => "ABI-L2-MCMIPC",
            GoesrProduct::Meso1 => "ABI-L2-MCMIPM1",
            GoesrProduct::Meso2 => "ABI-L2-MCMIPM2",
        }
    }

    /// the continental US product needs special encoder treatment since its native frame size has odd dimensions
    pub fn is_conus (&self)->bool { *self == GoesrProduct::Conus }
}

impl Default for GoesrProduct {
    fn default()->Self { GoesrProduct::FullDisk }
}

impl fmt::Display for GoesrProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str( self.as_str()) }
}

impl FromStr for GoesrProduct {
    type Err = OdinGoesrVideoError;

    fn from_str (s: &str)->Result<Self> {
        match s {
            "ABI-L2-MCMIPF" => Ok(GoesrProduct::FullDisk),
            "ABI-L2-MCMIPC" => Ok(GoesrProduct::Conus),
            "ABI-L2-MCMIPM1" => Ok(GoesrProduct::Meso1),
            "ABI-L2-MCMIPM2" => Ok(GoesrProduct::Meso2),
            _ => Err( OdinGoesrVideoError::ConfigError( format!("unknown product {s}")))
        }
    }
}

impl TryFrom<String> for GoesrProduct {
    type Error = OdinGoesrVideoError;
    fn try_from (s: String)->Result<Self> { s.parse() }
}

impl From<GoesrProduct> for String {
    fn from (p: GoesrProduct)->String { p.as_str().to_string() }
}

/// the operational GOES-R satellites with public NOAA buckets
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum GoesrSatellite {
    Goes16,
    Goes18,
}

impl GoesrSatellite {
    pub fn from_number (n: u32)->Result<Self> {
        match n {
            16 => Ok(GoesrSatellite::Goes16),
            18 => Ok(GoesrSatellite::Goes18),
            _ => Err( OdinGoesrVideoError::ConfigError( format!("unsupported satellite GOES-{n}")))
        }
    }

    pub fn number (&self)->u32 {
        match self { GoesrSatellite::Goes16 => 16, GoesrSatellite::Goes18 => 18 }
    }

    pub fn bucket (&self)->&'static str {
        match self { GoesrSatellite::Goes16 => "noaa-goes16", GoesrSatellite::Goes18 => "noaa-goes18" }
    }
}

impl Default for GoesrSatellite {
    fn default()->Self { GoesrSatellite::Goes16 }
}

/* #endregion products and satellites */

/* #region time range and S3 prefixes **********************************************************************/

/// a non-empty UTC time interval `[start,end)`
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new (start: DateTime<Utc>, end: DateTime<Utc>)->Result<Self> {
        if end > start {
            Ok( TimeRange{start,end} )
        } else {
            Err( OdinGoesrVideoError::InvalidRangeError( format!("start {start} is not before end {end}")))
        }
    }

    /// parse from two `YYYY-MM-DD HH:MM` specs
    pub fn parse (start: &str, end: &str)->Result<Self> {
        let start = parse_cli_utc_datetime(start).map_err(|e| OdinGoesrVideoError::InvalidRangeError( format!("invalid start {start:?}: {e}")))?;
        let end = parse_cli_utc_datetime(end).map_err(|e| OdinGoesrVideoError::InvalidRangeError( format!("invalid end {end:?}: {e}")))?;
        TimeRange::new( start, end)
    }

    pub fn start (&self)->DateTime<Utc> { self.start }
    pub fn end (&self)->DateTime<Utc> { self.end }
    pub fn duration (&self)->TimeDelta { self.end - self.start }

    /// number of hourly intervals that overlap this range (a partial last hour counts)
    pub fn n_hours (&self)->usize { started_hours( &self.start, &self.end) }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!( f, "[{} - {})", self.start, self.end) }
}

/// the S3 object prefix (some sort of a path) for GoesR. Built from year, day-of-year and hour
pub fn get_prefix (dt: DateTime<Utc>, product: GoesrProduct)->String {
    format!("{}/{}/{:03}/{:02}/", product, dt.year(), dt.ordinal(), dt.hour())
}

/// lazy iterator over the hourly S3 prefixes of a time range. This is cheap to clone, i.e. restartable
#[derive(Debug,Clone)]
pub struct ScenePrefixes {
    product: GoesrProduct,
    next: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Iterator for ScenePrefixes {
    type Item = String;

    fn next (&mut self)->Option<String> {
        if self.next < self.end {
            let prefix = get_prefix( self.next, self.product);
            self.next = self.next + TimeDelta::hours(1);
            Some(prefix)
        } else {
            None
        }
    }

    fn size_hint (&self)->(usize, Option<usize>) {
        let n = started_hours( &self.next, &self.end);
        (n, Some(n))
    }
}

impl ExactSizeIterator for ScenePrefixes {}

/// the prefixes of all hourly intervals covered by the given range, in time order
pub fn scene_prefixes (range: &TimeRange, product: GoesrProduct)->ScenePrefixes {
    ScenePrefixes { product, next: range.start, end: range.end }
}

/// validating version of [`scene_prefixes`] that fails with `InvalidRangeError` for `end <= start`
pub fn derive_scene_prefixes (start: DateTime<Utc>, end: DateTime<Utc>, product: GoesrProduct)->Result<ScenePrefixes> {
    let range = TimeRange::new( start, end)?;
    Ok( scene_prefixes( &range, product) )
}

/* #endregion time range and S3 prefixes */

/* #region GOES-R filename encoding *************************************************************************/

lazy_static! {
    static ref FILENAME_RE: Regex = Regex::new(r#"(?:.*/)?(.*)_([^-]*)-([^-]*)-([^-]+)-(.*)_G(.*)_s(.*)_e(.*)_c(.*)\.(.*)"#).unwrap();
    static ref DTG_RE: Regex = Regex::new(r#"^(\d\d\d\d)(\d\d\d)(\d\d)(\d\d)(\d\d)(\d)"#).unwrap();
    static ref END_SCAN_RE: Regex = Regex::new(r#"_s\d{14}_e(\d{14})_c\d{14}\.\w+$"#).unwrap();
}

/// file info as encoded in files downloaded from AWS S3
/// see https://www.goes-r.gov/products/docs/PUG-L2+-vol5.pdf (pg 608)
/// schema:
///         «sys_env» _ «instrument» - «level» - «product» - «mode» _G «sat_id» _s «start-time» _e «end-time» _c «create-time» .nc
///
/// times are in UTC and specified as
///        yyyy : year
///         ddd : day of year (001-366)
///          HH : UTC hour of day (00-23)
///          MM : minutes (00-59)
///          SS : seconds (00-59)
///           s : tenths of second (0-9)
///
/// example: `OR_ABI-L2-MCMIPF-M6_G16_s20231520000205_e20231520009513_c20231520009592.nc`
#[derive(Debug,Clone,PartialEq)]
pub struct GoesrFileInfo {
    pub sys_env: String, // e.g. "OR": operational realtime
    pub instrument: String, // e.g. "ABI"
    pub level: String, // e.g. "L2"
    pub product: String, // e.g. "MCMIPF"
    pub mode: String, // e.g. "M6"
    pub sat_id: u32, // e.g. 16
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
}

/// parse GoesrFileInfo from given pathname or S3 key
pub fn parse_filename (path: impl AsRef<Path>)->Option<GoesrFileInfo> {
    let path: &Path = path.as_ref();
    let filename = path.file_name()?.to_str()?;

    if_let! {
        Some(cap) = FILENAME_RE.captures(filename),
        11 = cap.len(),
        sys_env = cap[1].to_string(),
        instrument = cap[2].to_string(),
        level = cap[3].to_string(),
        product = cap[4].to_string(),
        mode = cap[5].to_string(),
        Ok(sat_id) = cap[6].parse::<u32>(),
        Some(start_time) = parse_goesr_dtg( &cap[7]),
        Some(end_time) = parse_goesr_dtg( &cap[8]),
        Some(create_time) = parse_goesr_dtg(&cap[9]) => {
            return Some( GoesrFileInfo{sys_env,instrument,level,product,mode,sat_id,start_time,end_time,create_time} )
        }
    }
    None
}

pub fn parse_goesr_dtg (s: &str)->Option<DateTime<Utc>> {
    if_let! {
        Some(cap) = DTG_RE.captures(s),
        7 = cap.len(),
        Ok(year) = cap[1].parse::<i32>(),
        Ok(doy) = cap[2].parse::<u32>(),
        Ok(hour) = cap[3].parse::<u32>(),
        Ok(min) = cap[4].parse::<u32>(),
        Ok(sec) = cap[5].parse::<u32>(),
        Ok(dec) = cap[6].parse::<u32>(),
        Some(nd) = NaiveDate::from_yo_opt( year, doy),
        Some(nt) = NaiveTime::from_hms_milli_opt(hour, min, sec, dec * 100) => {
            return Some( NaiveDateTime::new( nd, nt).and_utc() )
        }
    }
    None
}

/// the capture (end of scan) time of a scene, parsed from the last path segment of its key.
/// This is what we use to annotate rendered images and to order them in time
pub fn scene_timestamp (key: &str)->Result<DateTime<Utc>> {
    let filename = key.rsplit('/').next().unwrap_or(key);

    if_let! {
        Some(cap) = END_SCAN_RE.captures(filename),
        Some(dt) = parse_goesr_dtg( &cap[1]) => {
            return Ok(dt)
        }
    }
    Err( OdinGoesrVideoError::ParseError( key.to_string()))
}

/* #endregion GOES-R filename encoding */
