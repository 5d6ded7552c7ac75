//! Release archive unpacking
//!
//! Unpacks a `.tar.gz` release into the install directory and reports which
//! entry is the client binary.

use crate::error::ExtractError;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::debug;

/// Unpack a gzip-compressed tar stream under `install_dir`
///
/// Returns the path of the last regular file whose archive path contains
/// `marker`. Entries that would land outside `install_dir` are rejected.
pub fn extract_tar_gz<R: Read>(
    reader: R,
    install_dir: &Path,
    marker: &str,
) -> Result<PathBuf, ExtractError> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let entries = archive.entries().map_err(decode_error)?;

    let mut binary = None;

    for entry in entries {
        let mut entry = entry.map_err(decode_error)?;
        let entry_type = entry.header().entry_type();
        let name = entry
            .path()
            .map_err(decode_error)?
            .to_string_lossy()
            .into_owned();

        match entry_type {
            EntryType::XGlobalHeader | EntryType::XHeader => continue,
            EntryType::Directory => {
                let target = contained_path(install_dir, &name)?;
                if target == install_dir {
                    continue;
                }
                fs::create_dir_all(&target).map_err(|e| io_error(&target, e))?;
                debug!("Created directory {:?}", target);
            }
            t if t.is_file() => {
                let target = contained_path(install_dir, &name)?;
                if target == install_dir {
                    return Err(ExtractError::PathTraversal { name });
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
                }
                let mut out = File::create(&target).map_err(|e| io_error(&target, e))?;
                io::copy(&mut entry, &mut out).map_err(|e| io_error(&target, e))?;
                debug!("Extracted {:?}", target);

                if name.contains(marker) {
                    binary = Some(target);
                }
            }
            other => {
                return Err(ExtractError::UnsupportedEntry {
                    type_code: other.as_byte() as char,
                    name,
                });
            }
        }
    }

    binary.ok_or_else(|| ExtractError::NoBinary {
        marker: marker.to_string(),
    })
}

/// Join an archive entry name onto `root`, refusing anything that escapes it
///
/// Names like `./` resolve to `root` itself.
fn contained_path(root: &Path, name: &str) -> Result<PathBuf, ExtractError> {
    let mut target = root.to_path_buf();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::PathTraversal {
                    name: name.to_string(),
                });
            }
        }
    }

    Ok(target)
}

fn decode_error(e: io::Error) -> ExtractError {
    ExtractError::Decode {
        reason: e.to_string(),
    }
}

fn io_error(path: &Path, source: io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.display().to_string(),
        source,
    }
}
