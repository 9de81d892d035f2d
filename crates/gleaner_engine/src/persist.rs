use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Collision-safe image sink for one output directory.
///
/// Every write lands under a name that did not exist before the call:
/// bytes go to a temp file first, then a no-clobber rename claims the
/// target. The rename is atomic at the filesystem, so concurrent workers
/// proposing the same name race safely; the loser moves on to the next
/// `_1`, `_2`, ... suffix. On any error no partial file is left behind.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn create(dir: PathBuf) -> Result<Self, PersistError> {
        ensure_output_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `body` under `proposed` or the nearest free suffixed variant.
    /// Returns the file name actually used and its full path.
    pub fn store(&self, body: &[u8], proposed: &str) -> Result<(String, PathBuf), PersistError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(body)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        let mut pending = tmp;
        let mut counter = 0u32;
        loop {
            let name = suffixed_name(proposed, counter);
            let target = self.dir.join(&name);
            match pending.persist_noclobber(&target) {
                Ok(_) => return Ok((name, target)),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    pending = err.file;
                    counter += 1;
                }
                Err(err) => return Err(PersistError::Io(err.error)),
            }
        }
    }
}

/// Overwrite `{dir}/{filename}` with text content via a temp file and
/// rename. Used for the report artifacts and the debug page dump, which
/// replace any previous run's output.
pub fn write_text_atomic(dir: &Path, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
    ensure_output_dir(dir)?;

    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    if target.exists() {
        fs::remove_file(&target)?;
    }
    tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
    Ok(target)
}

fn suffixed_name(proposed: &str, counter: u32) -> String {
    if counter == 0 {
        return proposed.to_string();
    }
    match proposed.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            format!("{stem}_{counter}.{extension}")
        }
        _ => format!("{proposed}_{counter}"),
    }
}
