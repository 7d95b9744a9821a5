// Nyseal — Glyph records
//
// Glyph entries arrive as loosely typed JSON objects (the `glyph_list` export
// of the data module). Keys are human labels ("Glyph Name", "Resonance Tag"),
// numbers may be strings, and the tensor is either a 10-element list or ten
// named axis columns.

mod graph;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value as Json};
use thiserror::Error;

pub use graph::{tensor_distance, GlyphEdge, GlyphGraph, SIMILARITY_THRESHOLD, TENSOR_SIMILARITY};

/// Field names of a flattened glyph, in export order.
pub const GLYPH_FIELDS: [&str; 11] = [
    "glyph",
    "translation",
    "category",
    "class",
    "polarity",
    "domain",
    "function",
    "symbolic_potential",
    "tensor",
    "resonance_tag",
    "vector_intensity",
];

/// Axis labels of the 10-dimensional glyph tensor.
pub const TENSOR_AXES: [&str; 10] = [
    "Valence",
    "Persistence",
    "Disruption",
    "Charge",
    "Gravity",
    "Clarity",
    "Utility",
    "Depth",
    "Recursivity",
    "Tensionality",
];

const NAME_KEY: &str = "Glyph Name";
const UNKNOWN: &str = "UNKNOWN";

#[derive(Debug, Error)]
pub enum GlyphError {
    #[error("Glyph list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glyph list must be a JSON array, found {0}")]
    NotAList(&'static str),
}

// ─── Glyph ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Glyph {
    pub name: String,
    pub translation: String,
    pub category: String,
    pub class: String,
    pub polarity: String,
    pub domain: String,
    pub function: String,
    pub symbolic_potential: String,
    pub resonance_tag: String,
    pub vector_intensity: f64,
    pub tensor: [f64; 10],
}

impl Glyph {
    pub fn from_record(record: &Map<String, Json>) -> Self {
        let record = normalize_keys(record);
        let name = text(&record, NAME_KEY);
        let name = if name.is_empty() { UNKNOWN.to_string() } else { name };

        let tensor = extract_tensor(&record);
        if tensor.iter().all(|v| *v == 0.0) {
            tracing::warn!(glyph = %name, "Glyph has a zero tensor");
        }

        Self {
            translation: text(&record, "Translation"),
            category: text(&record, "Category"),
            class: text(&record, "Class"),
            polarity: text(&record, "Polarity"),
            domain: text(&record, "Domain"),
            function: text(&record, "Function"),
            symbolic_potential: text(&record, "Symbolic Potential"),
            resonance_tag: text(&record, "Resonance Tag"),
            vector_intensity: safe_float(record.get("Vector Intensity"), "Vector Intensity"),
            tensor,
            name,
        }
    }

    /// Flattened view keyed by [`GLYPH_FIELDS`].
    pub fn unfold(&self) -> BTreeMap<&'static str, Json> {
        let values = [
            Json::from(self.name.clone()),
            Json::from(self.translation.clone()),
            Json::from(self.category.clone()),
            Json::from(self.class.clone()),
            Json::from(self.polarity.clone()),
            Json::from(self.domain.clone()),
            Json::from(self.function.clone()),
            Json::from(self.symbolic_potential.clone()),
            Json::from(self.tensor.to_vec()),
            Json::from(self.resonance_tag.clone()),
            Json::from(self.vector_intensity),
        ];
        GLYPH_FIELDS.into_iter().zip(values).collect()
    }

    /// Value of one tensor axis, matched case-insensitively.
    pub fn axis(&self, label: &str) -> Option<f64> {
        TENSOR_AXES
            .iter()
            .position(|axis| axis.eq_ignore_ascii_case(label))
            .map(|i| self.tensor[i])
    }
}

impl std::fmt::Display for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) - {}",
            self.name, self.translation, self.symbolic_potential
        )
    }
}

/// Strips byte-order marks and surrounding whitespace from keys.
fn normalize_keys(record: &Map<String, Json>) -> Map<String, Json> {
    record
        .iter()
        .map(|(k, v)| (k.trim_start_matches('\u{feff}').trim().to_string(), v.clone()))
        .collect()
}

fn text(record: &Map<String, Json>, key: &str) -> String {
    match record.get(key) {
        Some(Json::String(s)) => s.clone(),
        Some(Json::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn safe_float(value: Option<&Json>, field: &str) -> f64 {
    let parsed = match value {
        None | Some(Json::Null) => return 0.0,
        Some(Json::Number(n)) => n.as_f64(),
        Some(Json::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Json::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(_) => None,
    };
    parsed.unwrap_or_else(|| {
        tracing::warn!(field, value = ?value, "Invalid float, defaulting to 0.0");
        0.0
    })
}

fn extract_tensor(record: &Map<String, Json>) -> [f64; 10] {
    let mut tensor = [0.0; 10];
    match record.get("tensor") {
        Some(Json::Array(items)) if items.len() == TENSOR_AXES.len() => {
            for (i, item) in items.iter().enumerate() {
                tensor[i] = safe_float(Some(item), &format!("tensor[{i}]"));
            }
        }
        _ => {
            for (i, label) in TENSOR_AXES.iter().enumerate() {
                tensor[i] = safe_float(record.get(*label), label);
            }
        }
    }
    tensor
}

// ─── Library ─────────────────────────────────────────────────────────────────

/// Read-only collection of glyphs.
#[derive(Debug, Clone, Default)]
pub struct GlyphLibrary {
    glyphs: Vec<Glyph>,
}

impl GlyphLibrary {
    pub fn new(glyphs: Vec<Glyph>) -> Self {
        Self { glyphs }
    }

    /// Parses a JSON array of glyph records. Non-object entries are skipped.
    pub fn from_json(text: &str) -> Result<Self, GlyphError> {
        let parsed: Json = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        let entries = match parsed {
            Json::Array(entries) => entries,
            Json::Object(_) => return Err(GlyphError::NotAList("object")),
            Json::String(_) => return Err(GlyphError::NotAList("string")),
            Json::Number(_) => return Err(GlyphError::NotAList("number")),
            Json::Bool(_) => return Err(GlyphError::NotAList("bool")),
            Json::Null => return Err(GlyphError::NotAList("null")),
        };

        let mut glyphs = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match entry.as_object() {
                Some(record) => glyphs.push(Glyph::from_record(record)),
                None => tracing::warn!(index, "Skipping glyph entry that is not an object"),
            }
        }
        Ok(Self { glyphs })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.glyphs.iter().map(|g| g.name.as_str()).collect()
    }

    /// Exact case-insensitive match first; otherwise each `_`/whitespace
    /// separated part of `name` is tried in turn.
    pub fn get_by_name(&self, name: &str) -> Option<&Glyph> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        if let Some(glyph) = self.find_exact(&wanted) {
            return Some(glyph);
        }
        wanted
            .split(|c: char| c == '_' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .find_map(|part| self.find_exact(part))
    }

    fn find_exact(&self, lowered: &str) -> Option<&Glyph> {
        self.glyphs
            .iter()
            .find(|g| g.name.trim().to_lowercase() == lowered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"Glyph Name": "Elun", "Translation": "light", "Valence": 0.8, "Depth": "0.6",
         "Vector Intensity": "0.9", "Resonance Tag": "origin"},
        {"Glyph Name": "Treyl", "tensor": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]},
        {"\ufeffGlyph Name": "Thyrel", "Valence": "not-a-number", "Depth": 1},
        42
    ]"#;

    #[test]
    fn test_library_skips_non_object_entries() {
        let library = GlyphLibrary::from_json(SAMPLE).unwrap();
        assert_eq!(library.names(), vec!["Elun", "Treyl", "Thyrel"]);
    }

    #[test]
    fn test_named_axes_and_string_numbers() {
        let library = GlyphLibrary::from_json(SAMPLE).unwrap();
        let elun = library.get_by_name("elun").unwrap();
        assert_eq!(elun.axis("valence"), Some(0.8));
        assert_eq!(elun.axis("Depth"), Some(0.6));
        assert_eq!(elun.vector_intensity, 0.9);
        assert_eq!(elun.axis("Gravity"), Some(0.0));
    }

    #[test]
    fn test_full_tensor_list_wins() {
        let library = GlyphLibrary::from_json(SAMPLE).unwrap();
        let treyl = library.get_by_name("Treyl").unwrap();
        assert_eq!(treyl.tensor[0], 1.0);
        assert_eq!(treyl.tensor[9], 10.0);
    }

    #[test]
    fn test_bom_key_and_invalid_float() {
        let library = GlyphLibrary::from_json(SAMPLE).unwrap();
        let thyrel = library.get_by_name("THYREL").unwrap();
        assert_eq!(thyrel.axis("Valence"), Some(0.0));
        assert_eq!(thyrel.axis("Depth"), Some(1.0));
    }

    #[test]
    fn test_composite_name_falls_back_to_parts() {
        let library = GlyphLibrary::from_json(SAMPLE).unwrap();
        assert_eq!(library.get_by_name("trace_Treyl loop").unwrap().name, "Treyl");
        assert!(library.get_by_name("nothing_here").is_none());
        assert!(library.get_by_name("   ").is_none());
    }

    #[test]
    fn test_missing_name_is_unknown() {
        let library = GlyphLibrary::from_json(r#"[{"Translation": "x"}]"#).unwrap();
        assert_eq!(library.names(), vec!["UNKNOWN"]);
    }

    #[test]
    fn test_unfold_uses_flat_field_names() {
        let library = GlyphLibrary::from_json(SAMPLE).unwrap();
        let flat = library.get_by_name("Elun").unwrap().unfold();
        assert_eq!(flat.len(), GLYPH_FIELDS.len());
        assert_eq!(flat["glyph"], "Elun");
        assert_eq!(flat["resonance_tag"], "origin");
        assert_eq!(flat["tensor"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn test_non_array_is_rejected() {
        assert!(matches!(
            GlyphLibrary::from_json(r#"{"Glyph Name": "Elun"}"#),
            Err(GlyphError::NotAList("object"))
        ));
        assert!(matches!(GlyphLibrary::from_json("nope"), Err(GlyphError::Json(_))));
    }
}
