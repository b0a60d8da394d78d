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

use std::fs::{self,DirEntry,File};
use std::io::{self,Write,ErrorKind};
use std::time::{SystemTime,Duration};
use std::path::Path;
use tempfile::{Builder,NamedTempFile};

use crate::io_error;

type Result<T> = std::result::Result<T,std::io::Error>;

pub fn ensure_dir (path: impl AsRef<Path>)->io::Result<()> {
    let path = path.as_ref();
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// make sure the parent directory of the given file path exists (this is idempotent)
pub fn ensure_parent_dir (path: impl AsRef<Path>)->io::Result<()> {
    match path.as_ref().parent() {
        Some(dir) if !dir.as_os_str().is_empty() => ensure_dir(dir),
        _ => Ok(())
    }
}

/// check if dir pathname exists and is writable, try to create dir otherwise
pub fn ensure_writable_dir (path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        let md = fs::metadata(path)?;
        if md.permissions().readonly() {
            Err(io_error!(ErrorKind::PermissionDenied, "dir {:?} not writable", path))
        } else {
            Ok(())
        }

    } else {
        fs::create_dir_all(path)
    }
}

/* #region atomic file replacement *********************************************************************/

/// create a temporary sibling file of the given path that can be used to write contents which are then moved
/// into place with [`persist_temp_file`]. The temp file is removed when it is dropped without being persisted
/// (e.g. if the writing future gets cancelled), and concurrent writers for the same path do not interfere
pub fn temp_sibling_file (path: impl AsRef<Path>)->Result<NamedTempFile> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new(".")
    };
    let mut prefix = path.file_name().map( |s| s.to_os_string()).unwrap_or_default();
    prefix.push(".");

    Builder::new().prefix( &prefix).suffix(".part").tempfile_in( dir)
}

/// move a file created by [`temp_sibling_file`] into its final location. The target is either the complete
/// new file or (if this fails) unchanged. The temp file is removed on failure
pub fn persist_temp_file (tmp_file: NamedTempFile, path: impl AsRef<Path>)->Result<()> {
    tmp_file.persist( path.as_ref()).map( |_| ()).map_err( |e| e.error)
}

/// write a file by means of a closure that gets a buffered writer for a temporary sibling file.
/// The target path only becomes visible once the closure has completed successfully
pub fn write_file_atomically<F,E> (path: impl AsRef<Path>, f: F)->std::result::Result<(),E>
    where F: FnOnce(&mut io::BufWriter<&mut File>)->std::result::Result<(),E>, E: From<io::Error>
{
    let path = path.as_ref();
    ensure_parent_dir( path)?;
    let mut tmp_file = temp_sibling_file( path)?;

    {
        let mut w = io::BufWriter::new( tmp_file.as_file_mut());
        f( &mut w)?;
        w.flush()?;
    }

    Ok( persist_temp_file( tmp_file, path)? )
}

/* #endregion atomic file replacement */

/* #region directory traversal and cleanup *************************************************************/

pub fn visit_dirs (dir: &Path, recursive: bool, cb: &mut dyn FnMut(&DirEntry)) -> io::Result<()> {
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                if recursive { visit_dirs(&path, recursive, cb)?; }
            } else {
                cb(&entry);
            }
        }
    }
    Ok(())
}

/// remove all regular files within dir (and optionally its sub-dirs) that were last modified more than
/// `max_age` ago. Returns the number of removed files
pub fn remove_old_files<T> (dir: &T, max_age: Duration, recursive: bool)->Result<usize> where T: AsRef<Path> + ?Sized {
    let dir: &Path = dir.as_ref();

    if dir.is_dir() {
        let now = SystemTime::now();
        let mut n_removed = 0;

        visit_dirs( dir, recursive, &mut |e| {
            if let Ok(meta) = e.metadata() {
                if let Ok(last_mod) = meta.modified() {
                    if let Ok(age) = now.duration_since(last_mod) {
                        if age > max_age && fs::remove_file(e.path()).is_ok() {
                            n_removed += 1
                        }
                    }
                }
            }
        })?;

        Ok(n_removed)
    } else {
        Err( io_error!(ErrorKind::NotFound, "dir {:?}", dir))
    }
}

/* #endregion directory traversal and cleanup */
