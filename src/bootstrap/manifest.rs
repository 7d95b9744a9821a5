// Nyseal — Module manifest
//
// The ordered list of modules a bootstrap activates. Order matters: every
// import must be provided by a module listed earlier.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::ModuleSpec;

use super::ManifestError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub modules: Vec<ModuleSpec>,
}

impl Manifest {
    pub fn new(modules: Vec<ModuleSpec>) -> Self {
        Self { modules }
    }

    /// The built-in Nyreth module set, in activation order.
    pub fn nyreth() -> Self {
        Self::new(vec![
            ModuleSpec::interpreted("symbolic_memory", &["SymbolicMemory", "SymbolicTrace"]),
            ModuleSpec::interpreted("symbolic_network", &["SymbolicMemoryNetwork"])
                .import("symbolic_memory", "SymbolicTrace"),
            ModuleSpec::interpreted("insight_synthesizer", &["InsightSynthesizer"])
                .import("symbolic_memory", "SymbolicMemory"),
            ModuleSpec::interpreted("recursive_engine", &["RecursiveEngine"])
                .import("symbolic_memory", "SymbolicMemory")
                .import("symbolic_network", "SymbolicMemoryNetwork")
                .import("insight_synthesizer", "InsightSynthesizer"),
            ModuleSpec::interpreted("traversal_engine", &["TraversalEngine"])
                .import("recursive_engine", "RecursiveEngine"),
            ModuleSpec::interpreted("interpretive_compression", &["InterpretiveCompressor"]),
            ModuleSpec::interpreted("semantic_reasoning_overlay", &["SemanticReasoningOverlay"]),
            ModuleSpec::interpreted("querydistiller", &["QueryDistiller"]),
            ModuleSpec::interpreted("nyreth_bridge", &["NyrethBridge"])
                .import("traversal_engine", "TraversalEngine"),
            ModuleSpec::data("glyphset4c", &["glyph_list"]),
        ])
    }

    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleSpec> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// First structural problem, if any.
    pub fn validate(&self) -> Result<(), ManifestError> {
        match self.problems().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every structural problem, in manifest order.
    pub fn problems(&self) -> Vec<ManifestError> {
        let positions: HashMap<&str, usize> = self
            .modules
            .iter()
            .enumerate()
            .rev()
            .map(|(i, m)| (m.name.as_str(), i))
            .collect();

        let mut problems = Vec::new();
        for (index, module) in self.modules.iter().enumerate() {
            if positions.get(module.name.as_str()) != Some(&index) {
                problems.push(ManifestError::DuplicateModule(module.name.clone()));
            }
            if module.exports.is_empty() {
                problems.push(ManifestError::EmptyExports(module.name.clone()));
            }

            for import in &module.imports {
                let Some(&provider_index) = positions.get(import.module.as_str()) else {
                    problems.push(ManifestError::UnknownDependency {
                        module: module.name.clone(),
                        dependency: import.module.clone(),
                    });
                    continue;
                };
                if provider_index >= index {
                    problems.push(ManifestError::ImportOrder {
                        module: module.name.clone(),
                        dependency: import.module.clone(),
                    });
                    continue;
                }
                let provider = &self.modules[provider_index];
                if !provider.exports.iter().any(|e| e == &import.symbol) {
                    problems.push(ManifestError::UnexportedSymbol {
                        module: module.name.clone(),
                        dependency: import.module.clone(),
                        symbol: import.symbol.clone(),
                    });
                }
            }
        }
        problems
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::nyreth()
    }
}
