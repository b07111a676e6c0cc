//! Seam to the external binding generator.
//!
//! Parsing preprocessed headers and emitting callable wrapper code is
//! not this crate's job; it is reached through this trait with a single
//! entry point, and its failures propagate unchanged as fatal.

use std::path::Path;

use crate::resolve::LibraryDescriptor;

/// Everything the external generator needs to produce an artifact.
#[derive(Debug)]
pub struct GeneratorInputs<'a> {
    /// C preprocessor/compiler used to preprocess the toolkit headers.
    pub compiler: &'a Path,
    /// The resolved shared libraries the bindings will link against.
    pub libraries: &'a [LibraryDescriptor],
    /// The toolkit's include directory.
    pub include_dir: &'a Path,
}

/// The external binding-generator collaborator.
pub trait BindingGenerator {
    /// Write a loadable binding artifact to `output`.
    ///
    /// `output` is a staging path inside the cache entry; the caller
    /// publishes it under the final artifact name only if this returns
    /// `Ok`.
    fn generate(&mut self, inputs: &GeneratorInputs<'_>, output: &Path) -> anyhow::Result<()>;
}
