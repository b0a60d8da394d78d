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

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;
use parse_duration::parse;

// for simple use cases that do not require to handle leap seconds and the like we provide our own wrappers
#[inline] pub fn minutes (n: u64)->Duration { Duration::from_secs(n * 60) }

/// this should be used wherever we might have to use sim clock instead of wall clock
#[inline]
pub fn utc_now()->DateTime<Utc> {
    Utc::now()
}

/// number of (started) hour intervals between `start` and `end`, i.e. `ceil((end-start)/1h)`.
/// Returns 0 if `end <= start`
pub fn started_hours (start: &DateTime<Utc>, end: &DateTime<Utc>)->usize {
    if end > start {
        let dur = *end - *start;
        let h = TimeDelta::hours(1);
        let n = dur.num_seconds() / h.num_seconds();
        let rem = dur - h * (n as i32);
        if rem > TimeDelta::zero() { n as usize + 1 } else { n as usize }
    } else {
        0
    }
}

pub fn short_utc_datetime_string (dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

//--- CLI support

/// the datetime format we use for command line arguments
pub const CLI_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// parse a `YYYY-MM-DD HH:MM` spec (interpreted as UTC)
pub fn parse_cli_utc_datetime (s: &str)->Result<DateTime<Utc>,chrono::ParseError> {
    let ndt = NaiveDateTime::parse_from_str( s.trim(), CLI_DATETIME_FORMAT)?;
    Ok( ndt.and_utc() )
}

/// parse a human readable duration spec such as "10min", "7d" or "1h 30m"
pub fn parse_duration_spec (s: &str)->Result<Duration,String> {
    parse( s.trim()).map_err( |e| format!("invalid duration {s:?}: {e:?}"))
}

//--- serde support

pub fn deserialize_duration <'a,D>(deserializer: D) -> Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| serde::de::Error::custom(format!("{:?}",e)))
    })
}

pub fn deserialize_optional_duration <'a,D>(deserializer: D) -> Result<Option<Duration>,D::Error>
    where D: Deserializer<'a>
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    if let Some(s) = s {
        let d =  parse(s.as_str()).map_err( |e| serde::de::Error::custom(format!("{:?}",e)))?;
        return Ok( Some(d) )
    }

    Ok(None)
}

pub fn serialize_duration<S: Serializer> (dur: &Duration, s: S) -> Result<S::Ok, S::Error>  {
    let dfm = format!("{}s", dur.as_secs_f64());
    s.serialize_str(&dfm)
}

pub fn serialize_optional_duration<S>(dur: &Option<Duration>, s: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
{
    if let Some(d) = dur {
        return serialize_duration( d, s)
    }
    s.serialize_none()
}
