//! The sanitizer's only collaborator: import resolution is a
//! trait boundary, not a concrete implementation, so embedders can back it
//! with a filesystem, a package registry, or — as provided here — an
//! in-memory map for tests and simple embeddings.
use std::rc::Rc;

use fnv::FnvHashMap;
use slc_ast::Module;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("module `{0}` was not found")]
    ModuleNotFound(String),
    #[error("cyclic import detected while resolving `{0}`")]
    CyclicImport(String),
    #[error("parsing `{module}` failed: {underlying}")]
    ParseFailed { module: String, underlying: String },
}

/// A resolved import. `Rc` because the same module may be imported by
/// several importers within one compilation and the resolver has no
/// obligation to re-parse it each time.
pub type ParsedModule = Rc<Module>;

pub trait ModuleResolver {
    fn resolve(&self, module_name: &str) -> Result<ParsedModule, ResolverError>;
}

/// An in-memory resolver backed by pre-built modules, keyed by name. Used
/// by tests and by embedders who assemble their module graph up front
/// rather than resolving it lazily from storage.
#[derive(Default)]
pub struct MapModuleResolver {
    modules: FnvHashMap<String, ParsedModule>,
}
impl MapModuleResolver {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, name: impl Into<String>, module: Module) -> &mut Self {
        self.modules.insert(name.into(), Rc::new(module));
        self
    }
}
impl ModuleResolver for MapModuleResolver {
    fn resolve(&self, module_name: &str) -> Result<ParsedModule, ResolverError> {
        self.modules
            .get(module_name)
            .cloned()
            .ok_or_else(|| ResolverError::ModuleNotFound(module_name.to_owned()))
    }
}
