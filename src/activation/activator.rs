// Nyseal — Module Activator
//
// activate(spec, source, lookup):
//   - data-only: wrap the decrypted text under every requested export name
//   - interpreted: seed a namespace (base environment + declared imports),
//     run the source, harvest the requested exports
//
// A missing individual export is tolerated; producing none of them is an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::script::{ModuleRuntime, ScriptRuntime};
use super::value::{BaseEnvironment, Exports, Symbol, Value};
use super::{ActivationError, ModuleKind, ModuleSpec};
use crate::codec::DecryptedSource;

/// Read access to symbols exported by already-active modules.
pub trait SymbolLookup {
    fn lookup(&self, module: &str, symbol: &str) -> Option<Symbol>;
}

/// The result of a successful activation.
#[derive(Debug, Clone)]
pub struct ActivatedModule {
    pub name: String,
    pub kind: ModuleKind,
    pub exports: Exports,
    pub activated_at: DateTime<Utc>,
}

pub struct ModuleActivator<R = ScriptRuntime> {
    runtime: R,
    base: BaseEnvironment,
}

impl ModuleActivator<ScriptRuntime> {
    pub fn new(base: BaseEnvironment) -> Self {
        Self::with_runtime(ScriptRuntime, base)
    }
}

impl Default for ModuleActivator<ScriptRuntime> {
    fn default() -> Self {
        Self::new(BaseEnvironment::standard())
    }
}

impl<R: ModuleRuntime> ModuleActivator<R> {
    pub fn with_runtime(runtime: R, base: BaseEnvironment) -> Self {
        Self { runtime, base }
    }

    pub fn base(&self) -> &BaseEnvironment {
        &self.base
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn activate(
        &self,
        spec: &ModuleSpec,
        source: &DecryptedSource,
        lookup: &dyn SymbolLookup,
    ) -> Result<ActivatedModule, ActivationError> {
        let exports = match spec.kind {
            ModuleKind::DataOnly => wrap_data(spec, source),
            ModuleKind::Interpreted => self.run_interpreted(spec, source, lookup)?,
        };

        if exports.is_empty() {
            return Err(ActivationError::NoExports {
                module: spec.name.clone(),
                requested: spec.exports.clone(),
            });
        }

        tracing::info!(
            module = %spec.name,
            exports = exports.len(),
            requested = spec.exports.len(),
            "Module activated"
        );

        Ok(ActivatedModule {
            name: spec.name.clone(),
            kind: spec.kind,
            exports,
            activated_at: Utc::now(),
        })
    }

    fn run_interpreted(
        &self,
        spec: &ModuleSpec,
        source: &DecryptedSource,
        lookup: &dyn SymbolLookup,
    ) -> Result<Exports, ActivationError> {
        let mut namespace = self.base.namespace();

        for import in &spec.imports {
            let symbol = lookup.lookup(&import.module, &import.symbol).ok_or_else(|| {
                ActivationError::UnresolvedImport {
                    module: spec.name.clone(),
                    dependency: import.module.clone(),
                    symbol: import.symbol.clone(),
                }
            })?;
            namespace.insert(import.symbol.clone(), symbol);
        }

        self.runtime
            .execute(&spec.name, source.as_str(), &mut namespace)
            .map_err(|source| ActivationError::Execution {
                module: spec.name.clone(),
                source,
            })?;

        let mut exports = Exports::new();
        for name in &spec.exports {
            match namespace.take(name) {
                Some(symbol) => {
                    exports.insert(name.clone(), symbol);
                }
                None => {
                    tracing::debug!(module = %spec.name, symbol = %name, "Requested export not produced");
                }
            }
        }
        Ok(exports)
    }
}

fn wrap_data(spec: &ModuleSpec, source: &DecryptedSource) -> Exports {
    let text: Symbol = Arc::new(Value::Text(source.as_str().to_string()));
    spec.exports
        .iter()
        .map(|name| (name.clone(), Arc::clone(&text)))
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::activation::{Namespace, ScriptError};
    use crate::codec::PayloadCodec;
    use crate::enclave::MasterSecret;

    #[derive(Default)]
    struct MapLookup(HashMap<(String, String), Symbol>);

    impl MapLookup {
        fn with(mut self, module: &str, symbol: &str, value: Value) -> Self {
            self.0
                .insert((module.to_string(), symbol.to_string()), Arc::new(value));
            self
        }
    }

    impl SymbolLookup for MapLookup {
        fn lookup(&self, module: &str, symbol: &str) -> Option<Symbol> {
            self.0.get(&(module.to_string(), symbol.to_string())).cloned()
        }
    }

    /// Runtime that records nothing and always fails.
    struct BrokenRuntime;

    impl ModuleRuntime for BrokenRuntime {
        fn execute(&self, _: &str, _: &str, _: &mut Namespace) -> Result<(), ScriptError> {
            Err(ScriptError::Unresolved("anything".into()))
        }
    }

    fn source(text: &str) -> DecryptedSource {
        let secret = MasterSecret::from_bytes(b"k".to_vec());
        let codec = PayloadCodec::with_iterations(1);
        let payload = codec.seal(text.as_bytes(), &secret).unwrap();
        codec.decrypt(&payload, &secret).unwrap()
    }

    #[test]
    fn test_partial_exports_are_tolerated() {
        let activator = ModuleActivator::default();
        let spec = ModuleSpec::interpreted("memory", &["SymbolicMemory", "Optional"]);
        let module = activator
            .activate(&spec, &source("type SymbolicMemory(traces)"), &MapLookup::default())
            .unwrap();
        assert_eq!(module.exports.len(), 1);
        assert!(module.exports.contains_key("SymbolicMemory"));
    }

    #[test]
    fn test_zero_exports_is_an_error() {
        let activator = ModuleActivator::default();
        let spec = ModuleSpec::interpreted("memory", &["SymbolicMemory"]);
        let err = activator
            .activate(&spec, &source("let unrelated = 1"), &MapLookup::default())
            .unwrap_err();
        assert!(matches!(err, ActivationError::NoExports { .. }));
    }

    #[test]
    fn test_data_only_wraps_text_under_every_name() {
        let activator = ModuleActivator::default();
        let spec = ModuleSpec::data("glyphset4c", &["glyph_list", "raw"]);
        let module = activator
            .activate(&spec, &source("[{\"Glyph Name\":\"Elun\"}]"), &MapLookup::default())
            .unwrap();
        assert_eq!(module.kind, ModuleKind::DataOnly);
        for name in ["glyph_list", "raw"] {
            assert_eq!(
                module.exports[name].as_text(),
                Some("[{\"Glyph Name\":\"Elun\"}]")
            );
        }
    }

    #[test]
    fn test_data_only_never_executes_source() {
        let activator = ModuleActivator::with_runtime(BrokenRuntime, BaseEnvironment::empty());
        let spec = ModuleSpec::data("glyphset4c", &["glyph_list"]);
        assert!(activator
            .activate(&spec, &source("not a script"), &MapLookup::default())
            .is_ok());
    }

    #[test]
    fn test_declared_import_is_injected() {
        let activator = ModuleActivator::default();
        let lookup = MapLookup::default().with(
            "symbolic_memory",
            "SymbolicTrace",
            Value::Type(crate::activation::TypeDef::new("SymbolicTrace", &["glyphs"])),
        );
        let spec = ModuleSpec::interpreted("symbolic_network", &["SymbolicMemoryNetwork"])
            .import("symbolic_memory", "SymbolicTrace");
        let module = activator
            .activate(
                &spec,
                &source("type SymbolicMemoryNetwork(links) extends SymbolicTrace"),
                &lookup,
            )
            .unwrap();
        let def = module.exports["SymbolicMemoryNetwork"].as_type().unwrap();
        assert_eq!(def.fields, vec!["glyphs", "links"]);
    }

    #[test]
    fn test_undeclared_symbols_are_not_visible() {
        let activator = ModuleActivator::default();
        let lookup = MapLookup::default().with("symbolic_memory", "SymbolicTrace", Value::Bool(true));
        let spec = ModuleSpec::interpreted("symbolic_network", &["net"]);
        let err = activator
            .activate(&spec, &source("let net = SymbolicTrace"), &lookup)
            .unwrap_err();
        match err {
            ActivationError::Execution { source, .. } => {
                assert!(matches!(source, ScriptError::Unresolved(ref s) if s == "SymbolicTrace"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_import_cites_symbol() {
        let activator = ModuleActivator::default();
        let spec = ModuleSpec::interpreted("symbolic_network", &["net"])
            .import("symbolic_memory", "SymbolicTrace");
        let err = activator
            .activate(&spec, &source("let net = SymbolicTrace"), &MapLookup::default())
            .unwrap_err();
        assert!(matches!(err, ActivationError::UnresolvedImport { ref symbol, .. } if symbol == "SymbolicTrace"));
        assert!(err.to_string().contains("SymbolicTrace"));
    }

    #[test]
    fn test_runtime_failure_becomes_execution_error() {
        let activator = ModuleActivator::with_runtime(BrokenRuntime, BaseEnvironment::empty());
        let spec = ModuleSpec::interpreted("any", &["x"]);
        let err = activator
            .activate(&spec, &source(""), &MapLookup::default())
            .unwrap_err();
        assert!(matches!(err, ActivationError::Execution { .. }));
    }

    #[test]
    fn test_base_environment_is_visible_to_scripts() {
        let activator = ModuleActivator::default();
        let spec = ModuleSpec::interpreted("graph", &["Graph"]);
        let module = activator
            .activate(&spec, &source("use GlyphGraph\nlet Graph = GlyphGraph"), &MapLookup::default())
            .unwrap();
        assert!(module.exports["Graph"].as_type().is_some());
    }
}
