// Nyseal — Module declarations
//
// A module is either interpreted (its source runs through a ModuleRuntime)
// or data-only (its decrypted text is exported as-is). Imports are the
// explicit allow-list of symbols injected from earlier modules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    #[default]
    Interpreted,
    DataOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub module: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default)]
    pub kind: ModuleKind,
    /// Requested export names. Individual names may be missing after
    /// activation; at least one must be produced.
    pub exports: Vec<String>,
    #[serde(default)]
    pub imports: Vec<Import>,
}

impl ModuleSpec {
    pub fn interpreted(name: &str, exports: &[&str]) -> Self {
        Self::with_kind(name, ModuleKind::Interpreted, exports)
    }

    pub fn data(name: &str, exports: &[&str]) -> Self {
        Self::with_kind(name, ModuleKind::DataOnly, exports)
    }

    /// Allow `symbol` from `module` into this module's namespace.
    pub fn import(mut self, module: &str, symbol: &str) -> Self {
        self.imports.push(Import {
            module: module.to_string(),
            symbol: symbol.to_string(),
        });
        self
    }

    fn with_kind(name: &str, kind: ModuleKind, exports: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            exports: exports.iter().map(|e| e.to_string()).collect(),
            imports: Vec::new(),
        }
    }
}
