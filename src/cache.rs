//! Fingerprinted on-disk cache for generated binding artifacts.
//!
//! The cache key ties an artifact to a specific `llvm-config` path, a
//! specific release of this crate, and a specific LLVM version. Any of
//! the three changing moves the entry to a new directory; stale entries
//! are leaked rather than evicted.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::resolve::dylib_extension;
use crate::util::hash::Fingerprint;

/// File name of the generated binding artifact inside a cache entry.
pub fn artifact_file_name() -> String {
    format!("llvmwrapimpl{}", dylib_extension())
}

/// This crate's own release version, a fingerprint input so upgrading
/// llvmwrap regenerates bindings.
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// The platform-appropriate per-user cache root.
pub fn default_cache_root() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "llvmwrap")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine a user cache directory",
            ))
        })
}

/// Cache directory name for one (helper path, crate version, LLVM
/// version) triple.
///
/// The hash covers the helper path bytes and the crate version; the LLVM
/// version is appended in the clear so entries stay human-inspectable
/// and a toolkit reinstalled at the same path under a new version lands
/// in a new directory.
pub fn cache_dir_name(llvm_config: &Path, crate_version: &str, llvm_version: &str) -> String {
    let mut fingerprint = Fingerprint::new();
    fingerprint
        .update_path(llvm_config)
        .update_str(crate_version);
    format!("{}-{}", fingerprint.finish(), llvm_version)
}

/// One cache entry: a directory expected to hold exactly one artifact.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub dir: PathBuf,
    pub artifact: PathBuf,
    /// True iff the artifact file already exists. Because artifacts are
    /// published by atomic rename, existence implies a complete file.
    pub hit: bool,
}

/// Look up the cache entry for a toolchain under the given root.
pub fn entry_for(
    root: &Path,
    llvm_config: &Path,
    crate_version: &str,
    llvm_version: &str,
) -> CacheEntry {
    let dir = root.join(cache_dir_name(llvm_config, crate_version, llvm_version));
    let artifact = dir.join(artifact_file_name());
    let hit = artifact.is_file();
    CacheEntry { dir, artifact, hit }
}

impl CacheEntry {
    /// Name identifying the loaded unit, derived from the directory name.
    pub fn module_name(&self) -> String {
        let dir_name = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("llvmwrap-{dir_name}")
    }

    /// Create the entry directory, tolerating a pre-existing one.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Open a staging file in the entry directory for the generator to
    /// write into. Staging in the same directory keeps the final
    /// [`commit`](Self::commit) a same-filesystem atomic rename.
    pub fn stage(&self) -> Result<NamedTempFile> {
        Ok(NamedTempFile::new_in(&self.dir)?)
    }

    /// Atomically publish a staged file as the artifact.
    ///
    /// Until this rename happens no partial output is visible under the
    /// artifact name, so a crashed or failed generation can never be
    /// mistaken for a cache hit.
    pub fn commit(&self, staged: NamedTempFile) -> Result<()> {
        staged
            .persist(&self.artifact)
            .map_err(|err| Error::Io(err.error))?;
        Ok(())
    }
}
