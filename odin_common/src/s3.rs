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

//! support functions for AWS S3 objects

use std::{path::Path, io::Write};
use aws_sdk_s3::Client;
use aws_config::{Region,meta::region::RegionProviderChain};

use crate::define_error;
use crate::fs::{ensure_parent_dir,temp_sibling_file,persist_temp_file};

pub type S3Client = Client;

pub type Result<T> = std::result::Result<T, OdinS3Error>;

define_error!{ pub OdinS3Error =
    IOError( #[from] std::io::Error) : "IO error {0}",
    AWSS3ObjectError( #[from] aws_smithy_runtime_api::client::result::SdkError<aws_sdk_s3::operation::get_object::GetObjectError, aws_smithy_runtime_api::http::Response>) : "AWS S3 get object error {0}",
    AWSS3ListObjectError( #[from] aws_smithy_runtime_api::client::result::SdkError<aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error, aws_smithy_runtime_api::http::Response>) : "AWS S3 list object error {0}",
    AWSByteStreamError( #[from] aws_smithy_types::byte_stream::error::Error) : "AWS byte stream download error {0}",
    NoObjectKeyError() : "No object key error"
}

/// create S3 Client for given region. This uses anonymous credentials, i.e. it is only suitable for public buckets
pub async fn create_s3_client (region: String) -> Result<Client> {
    let region_provider = RegionProviderChain::first_try( Region::new( region));
    let aws_config = aws_config::from_env().no_credentials().region(region_provider).load().await;
    Ok( Client::new(&aws_config) )
}

/// retrieve up to `max_keys` object keys for given bucket/prefix, in the order provided by S3 (lexicographic).
/// If there is no error this always returns a `Vec<String>` but it might be empty (if there were no matching objects)
pub async fn get_s3_keys (client: &Client, bucket: &str, prefix: &str, max_keys: i32) -> Result<Vec<String>> {
    let result = client.list_objects_v2()
        .bucket(bucket)
        .prefix(prefix)
        .max_keys(max_keys)
        .send().await?;

    Ok( result.contents().iter().filter_map( |o| o.key().map( |k| k.to_string())).collect() )
}

/// download the object for a given key and store it under the provided file path, creating parent
/// directories as needed. Data is streamed into a temporary sibling file that is only moved into
/// `file_path` once the transfer is complete. The temp file is removed if the transfer fails or the
/// returned future is dropped before completion
pub async fn download_s3_key (client: &Client, bucket: &str, key: &str, file_path: &Path) -> Result<()> {
    if key.is_empty() { return Err(OdinS3Error::NoObjectKeyError()) }

    ensure_parent_dir( file_path)?;
    let mut tmp_file = temp_sibling_file( file_path)?;

    let mut object = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await?;

    let file = tmp_file.as_file_mut();
    while let Some(bytes) = object.body.try_next().await? {
        file.write_all(&bytes)?;
    }
    file.flush()?;

    Ok( persist_temp_file( tmp_file, file_path)? )
}
