//! End-to-end tests for the facade pipeline.
//!
//! These drive the full locate -> query -> resolve -> generate -> load
//! flow against fake `llvm-config` scripts and a stub generator whose
//! artifact is a tiny C shared library compiled on the fly. Tests that
//! need a C compiler skip themselves when none is installed.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use llvmwrap::{
    BindingGenerator, Error, GeneratorInputs, LibraryOrigin, Llvm, Options,
};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A fake LLVM installation: an `llvm-config` shell script plus empty
/// lib/include directories. Every invocation appends its flag to a log.
struct FakeToolchain {
    _root: TempDir,
    llvm_config: PathBuf,
    log: PathBuf,
}

impl FakeToolchain {
    fn new(version: &str, shared_mode: &str, libnames: &str, libs: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let bindir = root.path().join("bin");
        let libdir = root.path().join("lib");
        let includedir = root.path().join("include");
        fs::create_dir_all(&bindir).unwrap();
        fs::create_dir_all(&libdir).unwrap();
        fs::create_dir_all(&includedir).unwrap();

        let log = root.path().join("queries.log");
        let llvm_config = bindir.join("llvm-config");
        let script = format!(
            r#"#!/bin/sh
echo "$1" >> '{log}'
case "$1" in
  --version) echo '{version}' ;;
  --bindir) echo '{bindir}' ;;
  --libdir) echo '{libdir}' ;;
  --includedir) echo '{includedir}' ;;
  --shared-mode) echo '{shared_mode}' ;;
  --libnames) echo '{libnames}' ;;
  --ldflags) echo '' ;;
  --libs) echo '{libs}' ;;
  --system-libs) echo '' ;;
  *) exit 1 ;;
esac
"#,
            log = log.display(),
            bindir = bindir.display(),
            libdir = libdir.display(),
            includedir = includedir.display(),
        );
        fs::write(&llvm_config, script).unwrap();
        fs::set_permissions(&llvm_config, fs::Permissions::from_mode(0o755)).unwrap();

        FakeToolchain {
            _root: root,
            llvm_config,
            log,
        }
    }

    fn queries(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn clear_log(&self) {
        let _ = fs::remove_file(&self.log);
    }
}

/// Stub for the external generator: copies a prebuilt shared library to
/// the staging path and records what it was asked to do.
struct StubGenerator {
    payload: Vec<u8>,
    calls: usize,
    origins: Vec<LibraryOrigin>,
    fail: bool,
}

impl StubGenerator {
    fn new(payload: Vec<u8>) -> Self {
        StubGenerator {
            payload,
            calls: 0,
            origins: Vec::new(),
            fail: false,
        }
    }
}

impl BindingGenerator for StubGenerator {
    fn generate(&mut self, inputs: &GeneratorInputs<'_>, output: &Path) -> anyhow::Result<()> {
        self.calls += 1;
        self.origins = inputs.libraries.iter().map(|lib| lib.origin).collect();
        if self.fail {
            anyhow::bail!("stub generator told to fail");
        }
        fs::write(output, &self.payload)?;
        Ok(())
    }
}

fn find_cc() -> Option<PathBuf> {
    ["cc", "gcc", "clang"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Compile a one-function shared library and return its bytes.
fn compile_dylib(dir: &Path, func: &str, ret: i32) -> Option<Vec<u8>> {
    let cc = find_cc()?;
    let src = dir.join(format!("{func}.c"));
    let out = dir.join(format!("{func}.so"));
    fs::write(&src, format!("int {func}(void) {{ return {ret}; }}\n")).unwrap();

    let status = Command::new(cc)
        .arg("-shared")
        .arg("-fPIC")
        .arg("-o")
        .arg(&out)
        .arg(&src)
        .status()
        .ok()?;
    if !status.success() {
        return None;
    }
    Some(fs::read(&out).unwrap())
}

fn options(toolchain: &FakeToolchain, cache_root: &Path) -> Options {
    Options {
        llvm_config: Some(toolchain.llvm_config.clone()),
        cache_root: Some(cache_root.to_path_buf()),
        timeout: None,
    }
}

/// All regular files under `root`, for asserting what the cache holds.
fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}

#[test]
fn test_full_pipeline_generates_and_loads() {
    init_tracing();
    let Some(payload) = compile_dylib(&std::env::temp_dir(), "llvmwrap_test_alpha", 42) else {
        eprintln!("skipping: no C compiler available");
        return;
    };

    let toolchain = FakeToolchain::new("19.1.0", "shared", "libLLVM.so.19.1", "");
    let cache_root = TempDir::new().unwrap();
    let mut generator = StubGenerator::new(payload);

    let llvm = Llvm::with_options(&mut generator, options(&toolchain, cache_root.path())).unwrap();

    assert_eq!(llvm.version(), "19.1.0");
    assert_eq!(llvm.llvm_config(), toolchain.llvm_config.as_path());
    assert_eq!(generator.calls, 1);
    assert_eq!(generator.origins, vec![LibraryOrigin::DeclaredShared]);
    assert!(llvm.has_symbol("llvmwrap_test_alpha"));

    let answer = unsafe {
        llvm.get::<unsafe extern "C" fn() -> i32>("llvmwrap_test_alpha")
            .map(|f| f())
            .unwrap()
    };
    assert_eq!(answer, 42);
}

#[test]
fn test_cache_hit_skips_generation() {
    init_tracing();
    let Some(payload) = compile_dylib(&std::env::temp_dir(), "llvmwrap_test_hit", 1) else {
        eprintln!("skipping: no C compiler available");
        return;
    };

    let toolchain = FakeToolchain::new("19.1.0", "shared", "libLLVM.so.19.1", "");
    let cache_root = TempDir::new().unwrap();

    let mut first = StubGenerator::new(payload.clone());
    Llvm::with_options(&mut first, options(&toolchain, cache_root.path())).unwrap();
    assert_eq!(first.calls, 1);

    toolchain.clear_log();
    let mut second = StubGenerator::new(payload);
    let llvm = Llvm::with_options(&mut second, options(&toolchain, cache_root.path())).unwrap();

    // A hit performs zero generator calls; only the queries needed to
    // compute the cache key remain.
    assert_eq!(second.calls, 0);
    let mut queries = toolchain.queries();
    queries.sort();
    assert_eq!(queries, vec!["--bindir", "--version"]);

    assert!(llvm.has_symbol("llvmwrap_test_hit"));
}

#[test]
fn test_toolchain_version_change_invalidates_cache() {
    init_tracing();
    let Some(payload) = compile_dylib(&std::env::temp_dir(), "llvmwrap_test_rev", 2) else {
        eprintln!("skipping: no C compiler available");
        return;
    };

    let cache_root = TempDir::new().unwrap();

    let old = FakeToolchain::new("18.1.8", "shared", "libLLVM.so.18.1", "");
    let mut generator = StubGenerator::new(payload.clone());
    Llvm::with_options(&mut generator, options(&old, cache_root.path())).unwrap();
    assert_eq!(generator.calls, 1);

    // Same helper-path shape, new version: a fresh entry is generated
    // and the stale one is left in place, not cleaned up.
    let new = FakeToolchain::new("19.1.0", "shared", "libLLVM.so.19.1", "");
    let mut generator = StubGenerator::new(payload);
    Llvm::with_options(&mut generator, options(&new, cache_root.path())).unwrap();
    assert_eq!(generator.calls, 1);

    let entries: Vec<_> = fs::read_dir(cache_root.path()).unwrap().collect();
    assert_eq!(entries.len(), 2);
}

#[cfg(target_os = "linux")]
#[test]
fn test_static_mode_synthesizes_shared_library() {
    init_tracing();
    let Some(payload) = compile_dylib(&std::env::temp_dir(), "llvmwrap_test_synth", 3) else {
        eprintln!("skipping: no C compiler available");
        return;
    };

    // Static mode, empty libdir, empty link flags: the synthesis tier
    // runs the real compiler and produces an (empty) shared library.
    let toolchain = FakeToolchain::new("19.1.0", "static", "", "");
    let cache_root = TempDir::new().unwrap();
    let mut generator = StubGenerator::new(payload);

    let llvm = Llvm::with_options(&mut generator, options(&toolchain, cache_root.path())).unwrap();

    assert_eq!(generator.calls, 1);
    assert_eq!(generator.origins, vec![LibraryOrigin::SynthesizedShared]);
    assert!(llvm.has_symbol("llvmwrap_test_synth"));

    // The synthesized library sits in the cache entry next to the artifact.
    assert!(files_under(cache_root.path())
        .iter()
        .any(|p| p.file_name().is_some_and(|n| n == "libLLVM.so")));
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_synthesis_leaves_no_artifact() {
    init_tracing();
    if find_cc().is_none() {
        eprintln!("skipping: no C compiler available");
        return;
    }

    // Static mode with an unsatisfiable library flag: the link fails,
    // construction aborts, and no binding artifact may be left behind
    // to masquerade as a cache hit.
    let toolchain = FakeToolchain::new(
        "19.1.0",
        "static",
        "",
        "-lllvmwrap_no_such_library_zzz",
    );
    let cache_root = TempDir::new().unwrap();
    let mut generator = StubGenerator::new(Vec::new());

    let err =
        Llvm::with_options(&mut generator, options(&toolchain, cache_root.path())).unwrap_err();

    assert!(matches!(err, Error::Link { .. }), "got {err:?}");
    assert_eq!(generator.calls, 0);
    assert!(!files_under(cache_root.path())
        .iter()
        .any(|p| p.file_name().is_some_and(|n| n == "llvmwrapimpl.so")));
}

#[test]
fn test_failed_generation_leaves_no_artifact_and_retries_cleanly() {
    init_tracing();
    let Some(payload) = compile_dylib(&std::env::temp_dir(), "llvmwrap_test_retry", 4) else {
        eprintln!("skipping: no C compiler available");
        return;
    };

    let toolchain = FakeToolchain::new("19.1.0", "shared", "libLLVM.so.19.1", "");
    let cache_root = TempDir::new().unwrap();

    let mut failing = StubGenerator::new(Vec::new());
    failing.fail = true;
    let err =
        Llvm::with_options(&mut failing, options(&toolchain, cache_root.path())).unwrap_err();
    assert!(matches!(err, Error::Generate(_)), "got {err:?}");

    // The staged file was discarded; the next construction sees a miss
    // and generates for real instead of loading a corrupt entry.
    let mut working = StubGenerator::new(payload);
    let llvm = Llvm::with_options(&mut working, options(&toolchain, cache_root.path())).unwrap();
    assert_eq!(working.calls, 1);
    assert!(llvm.has_symbol("llvmwrap_test_retry"));
}

#[test]
fn test_multi_version_isolation() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let (Some(payload_a), Some(payload_b)) = (
        compile_dylib(tmp.path(), "llvmwrap_test_v18", 18),
        compile_dylib(tmp.path(), "llvmwrap_test_v19", 19),
    ) else {
        eprintln!("skipping: no C compiler available");
        return;
    };

    let cache_root = TempDir::new().unwrap();
    let old = FakeToolchain::new("18.1.8", "shared", "libLLVM.so.18.1", "");
    let new = FakeToolchain::new("19.1.0", "shared", "libLLVM.so.19.1", "");

    let mut gen_a = StubGenerator::new(payload_a);
    let mut gen_b = StubGenerator::new(payload_b);
    let llvm_a = Llvm::with_options(&mut gen_a, options(&old, cache_root.path())).unwrap();
    let llvm_b = Llvm::with_options(&mut gen_b, options(&new, cache_root.path())).unwrap();

    // Both modules stay loaded side by side; neither overwrites the
    // other's symbols, and each set is independently inspectable.
    assert_eq!(llvm_a.version(), "18.1.8");
    assert_eq!(llvm_b.version(), "19.1.0");
    assert!(llvm_a.has_symbol("llvmwrap_test_v18"));
    assert!(!llvm_a.has_symbol("llvmwrap_test_v19"));
    assert!(llvm_b.has_symbol("llvmwrap_test_v19"));
    assert!(!llvm_b.has_symbol("llvmwrap_test_v18"));

    let (a, b) = unsafe {
        (
            llvm_a
                .get::<unsafe extern "C" fn() -> i32>("llvmwrap_test_v18")
                .map(|f| f())
                .unwrap(),
            llvm_b
                .get::<unsafe extern "C" fn() -> i32>("llvmwrap_test_v19")
                .map(|f| f())
                .unwrap(),
        )
    };
    assert_eq!((a, b), (18, 19));
}

#[test]
fn test_corrupt_cache_entry_from_prior_crash_is_load_error() {
    init_tracing();

    // Simulate a pre-atomic-rename artifact left by a crashed run by
    // planting a truncated file directly under the expected name.
    let toolchain = FakeToolchain::new("19.1.0", "shared", "libLLVM.so.19.1", "");
    let cache_root = TempDir::new().unwrap();
    let dir_name = llvmwrap::cache::cache_dir_name(
        &toolchain.llvm_config,
        llvmwrap::cache::crate_version(),
        "19.1.0",
    );
    let entry_dir = cache_root.path().join(dir_name);
    fs::create_dir_all(&entry_dir).unwrap();
    fs::write(
        entry_dir.join(llvmwrap::cache::artifact_file_name()),
        b"\x7fELF",
    )
    .unwrap();

    let mut generator = StubGenerator::new(Vec::new());
    let err =
        Llvm::with_options(&mut generator, options(&toolchain, cache_root.path())).unwrap_err();

    // Existence alone is trusted as a hit, so generation is skipped and
    // the corrupt file surfaces as a load failure.
    assert_eq!(generator.calls, 0);
    assert!(matches!(err, Error::Load { .. }), "got {err:?}");
}
