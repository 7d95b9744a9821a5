// Nyseal — Module registry
//
// Append-then-freeze cache of `module name -> exports`. During bootstrap the
// sequencer owns a mutable `ModuleRegistry`; once every module is active it
// is frozen into a `FrozenRegistry`, which is cheap to clone and safe to
// share across threads without locking.
//
// Each entry is a whole `Arc<Exports>` swapped in by one insert, so a reader
// sees either no entry or a complete one. Modules also remember the order
// they were first registered in, which is their activation order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::activation::{Exports, Symbol, SymbolLookup};

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: HashMap<String, Arc<Exports>>,
    order: Vec<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins.
    pub fn register(&mut self, name: impl Into<String>, exports: Exports) -> Arc<Exports> {
        let name = name.into();
        let entry = Arc::new(exports);
        if self.entries.insert(name.clone(), Arc::clone(&entry)).is_some() {
            tracing::debug!(module = %name, "Registry entry replaced");
        } else {
            self.order.push(name);
        }
        entry
    }

    pub fn get(&self, module: &str, symbol: &str) -> Option<Symbol> {
        self.entries.get(module)?.get(symbol).cloned()
    }

    pub fn module(&self, name: &str) -> Option<Arc<Exports>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn freeze(self) -> FrozenRegistry {
        FrozenRegistry {
            entries: Arc::new(self.entries),
            order: Arc::new(self.order),
        }
    }
}

impl SymbolLookup for ModuleRegistry {
    fn lookup(&self, module: &str, symbol: &str) -> Option<Symbol> {
        self.get(module, symbol)
    }
}

/// Read-only registry handed out after bootstrap commits.
#[derive(Debug, Clone, Default)]
pub struct FrozenRegistry {
    entries: Arc<HashMap<String, Arc<Exports>>>,
    order: Arc<Vec<String>>,
}

impl FrozenRegistry {
    pub fn get(&self, module: &str, symbol: &str) -> Option<Symbol> {
        self.entries.get(module)?.get(symbol).cloned()
    }

    pub fn module(&self, name: &str) -> Option<Arc<Exports>> {
        self.entries.get(name).cloned()
    }

    /// Module names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Module names in activation order.
    pub fn activation_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// First `(module, symbol)` pair exporting `symbol`, searching modules
    /// in activation order.
    pub fn find(&self, symbol: &str) -> Option<(&str, Symbol)> {
        self.activation_order()
            .find_map(|module| self.get(module, symbol).map(|s| (module, s)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolLookup for FrozenRegistry {
    fn lookup(&self, module: &str, symbol: &str) -> Option<Symbol> {
        self.get(module, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Value;

    fn exports(pairs: &[(&str, &str)]) -> Exports {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Arc::new(Value::Text(v.to_string()))))
            .collect()
    }

    #[test]
    fn test_get_unknown_module_is_none() {
        let registry = ModuleRegistry::new();
        assert!(registry.get("never_loaded", "Anything").is_none());
        assert!(registry.freeze().get("never_loaded", "Anything").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let mut registry = ModuleRegistry::new();
        registry.register("a", exports(&[("X", "one"), ("Y", "y")]));
        registry.register("a", exports(&[("X", "two")]));
        assert_eq!(registry.get("a", "X").unwrap().as_text(), Some("two"));
        assert!(registry.get("a", "Y").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_frozen_registry_is_shared_between_threads() {
        let mut registry = ModuleRegistry::new();
        registry.register("b", exports(&[("B", "bee")]));
        registry.register("a", exports(&[("A", "ay")]));
        let frozen = registry.freeze();
        assert_eq!(frozen.names(), vec!["a", "b"]);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let frozen = frozen.clone();
                std::thread::spawn(move || frozen.get("b", "B").map(|s| s.as_text().map(String::from)))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().flatten().as_deref(), Some("bee"));
        }
    }

    #[test]
    fn test_find_searches_all_modules() {
        let mut registry = ModuleRegistry::new();
        registry.register("glyphset4c", exports(&[("glyph_list", "[]")]));
        let frozen = registry.freeze();
        let (module, symbol) = frozen.find("glyph_list").unwrap();
        assert_eq!(module, "glyphset4c");
        assert_eq!(symbol.as_text(), Some("[]"));
        assert!(frozen.find("missing").is_none());
    }

    #[test]
    fn test_find_prefers_first_activated_module() {
        let mut registry = ModuleRegistry::new();
        registry.register("zeta", exports(&[("glyph_list", "first")]));
        registry.register("alpha", exports(&[("glyph_list", "second")]));
        registry.register("zeta", exports(&[("glyph_list", "replaced")]));
        let frozen = registry.freeze();
        assert_eq!(frozen.activation_order().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(frozen.names(), vec!["alpha", "zeta"]);
        let (module, symbol) = frozen.find("glyph_list").unwrap();
        assert_eq!(module, "zeta");
        assert_eq!(symbol.as_text(), Some("replaced"));
    }
}
