//! Filesystem moves and atomic writes.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hidden sibling used while `name` is being written into `dir`.
fn partial_path(dir: &Path, name: &OsStr) -> PathBuf {
    dir.join(format!(".{}.partial", name.to_string_lossy()))
}

/// Write `content` to `dest` through a hidden sibling and a rename, so
/// `dest` is either the previous file or the complete new one. The parent
/// directory must already exist.
pub fn write_atomic(dest: &Path, content: &[u8]) -> io::Result<()> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = partial_path(parent, file_name);

    let written = (|| -> io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, dest)
    })();
    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

/// Move `source` into `dest_dir` under the same name, replacing a stale file
/// of that name. Returns the new path.
///
/// Tries a rename first. If that fails (other volume, for one) the file is
/// copied to a hidden name in `dest_dir`, renamed into place and the source
/// removed. When the source cannot be removed the copy is deleted again, so
/// the file never ends up in both places.
pub fn move_into(source: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source path has no file name"))?;
    let target = dest_dir.join(file_name);

    let rename_err = match fs::rename(source, &target) {
        Ok(()) => return Ok(target),
        Err(e) => e,
    };
    if !source.is_file() {
        return Err(rename_err);
    }
    debug!(
        source = %source.display(),
        target = %target.display(),
        error = %rename_err,
        "Rename failed, copying instead"
    );

    let partial = partial_path(dest_dir, file_name);
    if let Err(e) = fs::copy(source, &partial).and_then(|_| fs::rename(&partial, &target)) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(&target);
        return Err(e);
    }
    Ok(target)
}
