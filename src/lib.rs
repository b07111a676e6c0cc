//! llvmwrap - cached, self-synthesizing loader for dynamically generated
//! LLVM C API bindings.
//!
//! This crate resolves an installed LLVM toolchain through `llvm-config`,
//! decides which shared libraries are usable (manufacturing one from the
//! static archives with whole-archive linking when none is shipped),
//! caches the generated binding artifact under a fingerprint of the
//! toolchain and this crate's version, and loads the artifact as an
//! isolated dynamic library so several LLVM versions can coexist in one
//! process.
//!
//! The binding generator itself is an external collaborator plugged in
//! through the [`BindingGenerator`] trait.
//!
//! ```no_run
//! use llvmwrap::Llvm;
//! # use llvmwrap::{BindingGenerator, GeneratorInputs};
//! # struct MyGenerator;
//! # impl BindingGenerator for MyGenerator {
//! #     fn generate(
//! #         &mut self,
//! #         _inputs: &GeneratorInputs<'_>,
//! #         _output: &std::path::Path,
//! #     ) -> anyhow::Result<()> { Ok(()) }
//! # }
//!
//! let mut generator = MyGenerator;
//! let llvm = Llvm::new(&mut generator)?;
//! println!("LLVM {}", llvm.version());
//! for symbol in llvm.symbols() {
//!     println!("  {symbol}");
//! }
//! # Ok::<(), llvmwrap::Error>(())
//! ```

pub mod cache;
pub mod error;
pub mod facade;
pub mod generator;
pub mod loader;
pub mod locate;
pub mod query;
pub mod resolve;
pub mod synth;
pub mod util;

pub use error::{Error, Result};
pub use facade::{Llvm, Options};
pub use generator::{BindingGenerator, GeneratorInputs};
pub use loader::LoadedModule;
pub use query::{LlvmConfig, SharedMode};
pub use resolve::{LibraryDescriptor, LibraryOrigin};
