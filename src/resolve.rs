//! Deciding which physical LLVM libraries are usable.
//!
//! Toolkit packaging is inconsistent across platforms and distributions:
//! some installations report `static` while still shipping a shared
//! object, some report `shared` but only ship versioned file names, and
//! some genuinely ship only static archives. Resolution therefore runs
//! three tiers: the declared library names, a filesystem scan, and
//! finally on-the-fly synthesis of a shared library.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::query::SharedMode;

/// How a usable library was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryOrigin {
    /// Declared by `llvm-config --libnames` in shared mode.
    DeclaredShared,
    /// Found by scanning the library directory.
    ScannedShared,
    /// Manufactured from the static archives by the synthesizer.
    SynthesizedShared,
}

/// A shared library usable as input to binding generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDescriptor {
    pub path: PathBuf,
    pub origin: LibraryOrigin,
}

/// The platform's shared-library file extension, with leading dot.
pub const fn dylib_extension() -> &'static str {
    if cfg!(windows) {
        ".dll"
    } else if cfg!(target_os = "macos") {
        ".dylib"
    } else {
        ".so"
    }
}

/// Whether `extension` appears anywhere in the file name's suffix chain.
///
/// Shared libraries commonly carry versioned names such as
/// `libLLVM.so.19.1`, so matching only the final suffix would miss them.
fn has_dylib_suffix(file_name: &str, extension: &str) -> bool {
    let extension = extension.trim_start_matches('.');
    file_name.split('.').skip(1).any(|s| s == extension)
}

/// Resolve the set of usable shared libraries, or fail.
///
/// `declared_names` is `--libnames` output (only consulted in shared
/// mode); `synthesize` runs the linker fallback and is called at most
/// once, and only when the mode is static and the scan found nothing.
pub fn resolve_libraries(
    libdir: &Path,
    shared_mode: SharedMode,
    declared_names: &[String],
    synthesize: impl FnOnce() -> Result<PathBuf>,
) -> Result<Vec<LibraryDescriptor>> {
    let extension = dylib_extension();
    let mut libraries = Vec::new();

    if shared_mode == SharedMode::Shared {
        for name in declared_names {
            if has_dylib_suffix(name, extension) {
                libraries.push(LibraryDescriptor {
                    path: libdir.join(name),
                    origin: LibraryOrigin::DeclaredShared,
                });
            }
        }
    }

    if libraries.is_empty() {
        libraries.extend(scan_libdir(libdir, extension)?);
    }

    if libraries.is_empty() && shared_mode == SharedMode::Static {
        tracing::info!(
            libdir = %libdir.display(),
            "no shared LLVM library shipped, synthesizing one from static archives"
        );
        let path = synthesize()?;
        libraries.push(LibraryDescriptor {
            path,
            origin: LibraryOrigin::SynthesizedShared,
        });
    }

    if libraries.is_empty() {
        return Err(Error::NoUsableLibrary {
            libdir: libdir.to_path_buf(),
        });
    }

    tracing::debug!(count = libraries.len(), "resolved LLVM libraries");
    Ok(libraries)
}

/// Scan the library directory for shared objects.
///
/// Symlinks are skipped so a `libLLVM.so -> libLLVM.so.19.1` link does
/// not double-count its target.
fn scan_libdir(libdir: &Path, extension: &str) -> Result<Vec<LibraryDescriptor>> {
    let pattern = libdir
        .join(format!("libLLVM*{extension}*"))
        .to_string_lossy()
        .into_owned();

    let mut found = Vec::new();
    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        // An unglobbable libdir means nothing to scan, not a failure;
        // the next tier decides whether that is fatal.
        Err(err) => {
            tracing::warn!(%pattern, error = %err, "invalid libdir glob pattern");
            return Ok(found);
        }
    };

    for entry in entries.flatten() {
        let Ok(metadata) = fs::symlink_metadata(&entry) else {
            continue;
        };
        let file_type = metadata.file_type();
        if file_type.is_file() && !file_type.is_symlink() {
            found.push(LibraryDescriptor {
                path: entry,
                origin: LibraryOrigin::ScannedShared,
            });
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}
