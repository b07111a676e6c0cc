//! The externally visible wrapper object.

use std::path::{Path, PathBuf};
use std::time::Duration;

use libloading::Symbol;

use crate::cache::{self, CacheEntry};
use crate::error::{Error, Result};
use crate::generator::{BindingGenerator, GeneratorInputs};
use crate::loader::LoadedModule;
use crate::locate::{find_program, process_search_paths};
use crate::query::{LlvmConfig, SharedMode};
use crate::resolve::resolve_libraries;
use crate::synth::{synthesize_shared, SynthesisInputs};

/// Construction-time overrides. The defaults reproduce the zero-config
/// behavior: `llvm-config` from `PATH`, the per-user cache root, and no
/// subprocess time limit.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Explicit path to `llvm-config`, bypassing discovery.
    pub llvm_config: Option<PathBuf>,
    /// Cache root to use instead of the platform user-cache directory.
    pub cache_root: Option<PathBuf>,
    /// Wall-clock budget applied to every subprocess invocation.
    pub timeout: Option<Duration>,
}

/// A loaded LLVM binding module tied to one toolchain installation.
///
/// All work happens during construction: locate the toolchain, compute
/// the cache key, generate the binding artifact on a cache miss, and
/// load it. There is no refresh operation; construct a new instance to
/// pick up a changed toolchain. Instances are independent, so bindings
/// for several LLVM versions can coexist in one process.
pub struct Llvm {
    version: String,
    llvm_config: PathBuf,
    module: LoadedModule,
}

impl std::fmt::Debug for Llvm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Llvm")
            .field("version", &self.version)
            .field("llvm_config", &self.llvm_config)
            .field("module", &self.module)
            .finish()
    }
}

impl Llvm {
    /// Construct against the toolchain discovered on `PATH`.
    pub fn new(generator: &mut dyn BindingGenerator) -> Result<Self> {
        Self::with_options(generator, Options::default())
    }

    /// Construct with explicit overrides.
    pub fn with_options(generator: &mut dyn BindingGenerator, options: Options) -> Result<Self> {
        let mut search_paths = process_search_paths();

        let llvm_config = match options.llvm_config {
            Some(path) => path,
            None => find_program("LLVM_CONFIG", &["llvm-config"], &search_paths)?,
        };
        let config = LlvmConfig::new(llvm_config.clone(), options.timeout);

        // The toolkit's own bin directory takes priority over the rest
        // of the search path when locating its companion tools.
        search_paths.insert(0, config.bindir()?);
        let version = config.version()?;

        let cache_root = match options.cache_root {
            Some(root) => root,
            None => cache::default_cache_root()?,
        };
        let entry = cache::entry_for(
            &cache_root,
            &llvm_config,
            cache::crate_version(),
            &version,
        );

        if entry.hit {
            tracing::debug!(dir = %entry.dir.display(), "binding cache hit");
        } else {
            tracing::info!(dir = %entry.dir.display(), "binding cache miss, generating");
            generate_into(&config, generator, &entry, &search_paths, options.timeout)?;
        }

        let module = LoadedModule::load(&entry.artifact, entry.module_name())?;

        Ok(Llvm {
            version,
            llvm_config,
            module,
        })
    }

    /// The toolkit version string, as reported by `llvm-config --version`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The resolved `llvm-config` path this instance was built against.
    pub fn llvm_config(&self) -> &Path {
        &self.llvm_config
    }

    /// Exported symbol names of the loaded binding module, sorted.
    pub fn symbols(&self) -> &[String] {
        self.module.exports()
    }

    /// Whether the binding module exports `symbol`.
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.module.has_symbol(symbol)
    }

    /// Resolve an exported symbol with a caller-chosen type.
    ///
    /// # Safety
    ///
    /// The caller must supply the symbol's true type; see
    /// [`libloading::Library::get`].
    pub unsafe fn get<T>(&self, symbol: &str) -> Result<Symbol<'_, T>> {
        self.module.get(symbol)
    }

    /// The underlying loaded module.
    pub fn module(&self) -> &LoadedModule {
        &self.module
    }
}

/// Cache-miss path: resolve libraries (synthesizing if necessary), run
/// the generator into a staging file, and publish atomically.
fn generate_into(
    config: &LlvmConfig,
    generator: &mut dyn BindingGenerator,
    entry: &CacheEntry,
    search_paths: &[PathBuf],
    timeout: Option<Duration>,
) -> Result<()> {
    entry.ensure_dir()?;

    let compiler = find_program("CPP", &["clang", "cpp", "gcc", "cc"], search_paths)?;
    let libdir = config.libdir()?;
    let shared_mode = config.shared_mode()?;
    let declared_names = if shared_mode == SharedMode::Shared {
        config.libnames()?
    } else {
        Vec::new()
    };

    let libraries = resolve_libraries(&libdir, shared_mode, &declared_names, || {
        synthesize_shared(
            &SynthesisInputs {
                compiler: &compiler,
                ldflags: &config.ldflags()?,
                libs: &config.libs()?,
                system_libs: &config.system_libs()?,
                timeout,
            },
            &entry.dir,
        )
    })?;

    let include_dir = config.includedir()?;
    let staged = entry.stage()?;
    generator
        .generate(
            &GeneratorInputs {
                compiler: &compiler,
                libraries: &libraries,
                include_dir: &include_dir,
            },
            staged.path(),
        )
        .map_err(Error::Generate)?;
    entry.commit(staged)?;

    Ok(())
}
