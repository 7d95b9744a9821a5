// Nyseal — Module values and namespaces
//
// Every exported symbol is an `Arc<Value>`, so registry reads hand out cheap
// shared references and never a partially built value.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::glyph::{GLYPH_FIELDS, TENSOR_AXES};

/// A shared, immutable exported object.
pub type Symbol = Arc<Value>;

/// The symbols harvested from one module, keyed by export name.
pub type Exports = BTreeMap<String, Symbol>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
    Type(TypeDef),
    Instance(Instance),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Type(_) => "type",
            Value::Instance(_) => "instance",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeDef> {
        match self {
            Value::Type(def) => Some(def),
            _ => None,
        }
    }
}

/// A record type declared by a module or seeded by the base environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDef {
    pub name: String,
    /// Inherited fields first, in declaration order.
    pub fields: Vec<String>,
    pub parent: Option<String>,
}

impl TypeDef {
    pub fn new(name: &str, fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            parent: None,
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
}

// ─── Namespace ───────────────────────────────────────────────────────────────

/// Isolated symbol table a single module executes against.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    symbols: BTreeMap<String, Symbol>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, symbol: Symbol) {
        self.symbols.insert(name.into(), symbol);
    }

    pub fn take(&mut self, name: &str) -> Option<Symbol> {
        self.symbols.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// ─── Base Environment ────────────────────────────────────────────────────────

/// Fixed set of shared symbols every module namespace starts from.
#[derive(Debug, Clone, Default)]
pub struct BaseEnvironment {
    symbols: BTreeMap<String, Symbol>,
}

impl BaseEnvironment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared glyph types plus the tensor axis names.
    pub fn standard() -> Self {
        Self::empty()
            .with("Glyph", Value::Type(TypeDef::new("Glyph", &GLYPH_FIELDS)))
            .with(
                "GlyphGraph",
                Value::Type(TypeDef::new("GlyphGraph", &["nodes", "edges"])),
            )
            .with(
                "TENSOR_AXES",
                Value::List(
                    TENSOR_AXES
                        .iter()
                        .map(|axis| Value::Text(axis.to_string()))
                        .collect(),
                ),
            )
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.symbols.insert(name.to_string(), Arc::new(value));
        self
    }

    /// A fresh namespace seeded with the base symbols.
    pub fn namespace(&self) -> Namespace {
        Namespace {
            symbols: self.symbols.clone(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_environment_seeds_glyph_types() {
        let ns = BaseEnvironment::standard().namespace();
        let glyph = ns.get("Glyph").and_then(|s| s.as_type()).unwrap();
        assert!(glyph.has_field("tensor"));
        assert!(glyph.has_field("resonance_tag"));
        assert!(ns.get("GlyphGraph").unwrap().as_type().is_some());
        match ns.get("TENSOR_AXES").map(|s| s.as_ref()) {
            Some(Value::List(axes)) => assert_eq!(axes.len(), 10),
            other => panic!("unexpected TENSOR_AXES: {other:?}"),
        }
    }

    #[test]
    fn test_namespaces_are_isolated_copies() {
        let base = BaseEnvironment::standard();
        let mut a = base.namespace();
        a.insert("local", Arc::new(Value::Bool(true)));
        let b = base.namespace();
        assert!(a.contains("local"));
        assert!(!b.contains("local"));
    }

    #[test]
    fn test_value_serializes_with_kind_tag() {
        let json = serde_json::to_value(Value::Text("Elun".into())).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["value"], "Elun");
    }
}
