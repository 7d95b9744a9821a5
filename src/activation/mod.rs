// Nyseal — Activation Module
//
// Turns decrypted module source into exported symbols. Each module runs in
// its own namespace seeded with the base environment plus the symbols its
// manifest entry explicitly imports from already-active modules. Trust in
// the executed source rests on the codec's authenticity check.

mod activator;
mod error;
mod script;
mod spec;
mod value;

pub use activator::{ActivatedModule, ModuleActivator, SymbolLookup};
pub use error::{ActivationError, ScriptError};
pub use script::{ModuleRuntime, ScriptRuntime};
pub use spec::{Import, ModuleKind, ModuleSpec};
pub use value::{BaseEnvironment, Exports, Instance, Namespace, Symbol, TypeDef, Value};
