//! Loading a generated binding artifact as an isolated dynamic library.

use std::ffi::c_void;
use std::fs;
use std::path::{Path, PathBuf};

use goblin::Object;
use libloading::{Library, Symbol};

use crate::error::{Error, Result};

/// A generated binding artifact, loaded and ready for symbol lookup.
///
/// The artifact is opened with `RTLD_LOCAL | RTLD_NOW` on Unix: its
/// symbols are not merged into the process-global namespace, so two
/// modules generated from two different LLVM installations can be loaded
/// side by side without either clobbering the other. Each load is
/// independent; nothing is shared between instances loading the same
/// artifact.
///
/// The exported surface is discovered by parsing the artifact's dynamic
/// symbol table up front, and every advertised symbol is resolved once
/// during load so a broken artifact fails construction instead of a
/// later lookup.
pub struct LoadedModule {
    name: String,
    path: PathBuf,
    library: Library,
    exports: Vec<String>,
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("exports", &self.exports.len())
            .finish()
    }
}

impl LoadedModule {
    /// Load the artifact at `path`, identified as `name` in diagnostics.
    pub fn load(path: &Path, name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        let bytes = fs::read(path).map_err(|err| Error::Load {
            path: path.to_path_buf(),
            message: format!("failed to read artifact: {err}"),
        })?;
        let exports = exported_symbols(path, &bytes)?;

        let library = open_isolated(path).map_err(|err| Error::Load {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        // Resolve everything the symbol table advertises; a truncated or
        // mislinked artifact surfaces here as LoadError, not later.
        for symbol in &exports {
            unsafe { library.get::<*mut c_void>(symbol.as_bytes()) }.map_err(|err| {
                Error::Load {
                    path: path.to_path_buf(),
                    message: format!("exported symbol `{symbol}` did not resolve: {err}"),
                }
            })?;
        }

        tracing::debug!(
            module = %name,
            path = %path.display(),
            exports = exports.len(),
            "loaded binding artifact"
        );

        Ok(LoadedModule {
            name,
            path: path.to_path_buf(),
            library,
            exports,
        })
    }

    /// Diagnostic name, derived from the cache-directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the loaded artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exported symbol names, sorted and deduplicated.
    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    /// Whether the module exports `symbol`.
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.exports
            .binary_search_by(|s| s.as_str().cmp(symbol))
            .is_ok()
    }

    /// Resolve an exported symbol with a caller-chosen type.
    ///
    /// # Safety
    ///
    /// The caller must supply the symbol's true type; see
    /// [`libloading::Library::get`].
    pub unsafe fn get<T>(&self, symbol: &str) -> Result<Symbol<'_, T>> {
        self.library
            .get(symbol.as_bytes())
            .map_err(|err| Error::Load {
                path: self.path.clone(),
                message: format!("symbol `{symbol}` did not resolve: {err}"),
            })
    }
}

#[cfg(unix)]
fn open_isolated(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL) }.map(Library::from)
}

#[cfg(not(unix))]
fn open_isolated(path: &Path) -> std::result::Result<Library, libloading::Error> {
    // Windows loads are per-handle already; there is no global symbol
    // namespace to opt out of.
    unsafe { Library::new(path) }
}

/// Enumerate the defined, externally visible symbols of a shared object.
fn exported_symbols(path: &Path, bytes: &[u8]) -> Result<Vec<String>> {
    let object = Object::parse(bytes).map_err(|err| Error::Load {
        path: path.to_path_buf(),
        message: format!("not a loadable object: {err}"),
    })?;

    let mut exports = match object {
        Object::Elf(elf) => {
            use goblin::elf::section_header::SHN_UNDEF;
            use goblin::elf::sym::{STB_GLOBAL, STB_WEAK, STT_FUNC, STT_GNU_IFUNC, STT_OBJECT};

            elf.dynsyms
                .iter()
                .filter(|sym| {
                    sym.st_shndx != SHN_UNDEF as usize
                        && matches!(sym.st_bind(), STB_GLOBAL | STB_WEAK)
                        && matches!(sym.st_type(), STT_FUNC | STT_GNU_IFUNC | STT_OBJECT)
                })
                .filter_map(|sym| elf.dynstrtab.get_at(sym.st_name))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        }
        Object::Mach(goblin::mach::Mach::Binary(macho)) => macho
            .exports()
            .map_err(|err| Error::Load {
                path: path.to_path_buf(),
                message: format!("failed to read Mach-O exports: {err}"),
            })?
            .into_iter()
            // Mach-O symbol names carry a leading underscore that dlsym
            // lookups must not include.
            .map(|export| {
                export
                    .name
                    .strip_prefix('_')
                    .map(str::to_string)
                    .unwrap_or(export.name)
            })
            .collect(),
        Object::PE(pe) => pe
            .exports
            .iter()
            .filter_map(|export| export.name.map(str::to_string))
            .collect(),
        _ => {
            return Err(Error::Load {
                path: path.to_path_buf(),
                message: "unsupported artifact format".to_string(),
            })
        }
    };

    exports.sort();
    exports.dedup();
    Ok(exports)
}
