// Nyseal — Glyph graph
//
// Undirected similarity graph over a glyph library. One node per glyph name;
// two glyphs are linked by a `tensor_similarity` edge when the Euclidean
// distance between their tensors is below SIMILARITY_THRESHOLD. The edge
// weight is `1 - distance`, so close glyphs carry a weight near 1.
//
// Weights go negative past distance 1, so path search minimises the summed
// tensor distance instead.

use std::collections::HashMap;

use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use super::{Glyph, GlyphLibrary};

/// Maximum (exclusive) tensor distance for two glyphs to be linked.
pub const SIMILARITY_THRESHOLD: f64 = 2.5;

pub const TENSOR_SIMILARITY: &str = "tensor_similarity";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphEdge {
    pub relation: &'static str,
    pub distance: f64,
    pub weight: f64,
}

impl GlyphEdge {
    fn similarity(distance: f64) -> Self {
        Self {
            relation: TENSOR_SIMILARITY,
            distance,
            weight: 1.0 - distance,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlyphGraph {
    graph: UnGraph<Glyph, GlyphEdge>,
    index: HashMap<String, NodeIndex>,
}

impl GlyphGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_library(library: &GlyphLibrary) -> Self {
        let mut graph = Self::new();
        for glyph in library.iter() {
            graph.add_glyph(glyph.clone());
        }
        graph.connect_similar(SIMILARITY_THRESHOLD);

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Glyph graph built"
        );
        graph
    }

    /// Adds a node, or replaces the glyph stored under an existing name.
    pub fn add_glyph(&mut self, glyph: Glyph) -> NodeIndex {
        match self.index.get(&glyph.name) {
            Some(&idx) => {
                self.graph[idx] = glyph;
                idx
            }
            None => {
                let name = glyph.name.clone();
                let idx = self.graph.add_node(glyph);
                self.index.insert(name, idx);
                idx
            }
        }
    }

    /// Links every pair of distinct glyphs closer than `threshold`.
    pub fn connect_similar(&mut self, threshold: f64) {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        for (i, &a) in nodes.iter().enumerate() {
            for &b in &nodes[i + 1..] {
                let distance = tensor_distance(&self.graph[a], &self.graph[b]);
                if distance < threshold {
                    self.graph.update_edge(a, b, GlyphEdge::similarity(distance));
                }
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn glyph(&self, name: &str) -> Option<&Glyph> {
        self.index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&GlyphEdge> {
        let (&a, &b) = (self.index.get(a)?, self.index.get(b)?);
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    /// Names linked to `name`, sorted. Empty for an unknown glyph.
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors(idx)
            .map(|n| self.graph[n].name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Path from `start` to `end` with the lowest summed tensor distance.
    pub fn find_path(&self, start: &str, end: &str) -> Option<Vec<&str>> {
        let (&from, &to) = (self.index.get(start)?, self.index.get(end)?);
        let (_, path) = astar(
            &self.graph,
            from,
            |n| n == to,
            |e| e.weight().distance,
            |_| 0.0,
        )?;
        Some(path.into_iter().map(|n| self.graph[n].name.as_str()).collect())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

pub fn tensor_distance(a: &Glyph, b: &Glyph) -> f64 {
    a.tensor
        .iter()
        .zip(b.tensor.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(name: &str, valence: f64, depth: f64) -> Glyph {
        let record = serde_json::json!({
            "Glyph Name": name,
            "Valence": valence,
            "Depth": depth,
        });
        Glyph::from_record(record.as_object().unwrap())
    }

    /// A(0,0) - B(2,0) - C(4,0), with D(2,1) off to the side and E far away.
    fn sample() -> GlyphGraph {
        GlyphGraph::from_library(&GlyphLibrary::new(vec![
            glyph("A", 0.0, 0.0),
            glyph("B", 2.0, 0.0),
            glyph("C", 4.0, 0.0),
            glyph("D", 2.0, 1.0),
            glyph("E", 100.0, 0.0),
        ]))
    }

    #[test]
    fn test_one_node_per_glyph() {
        let graph = sample();
        assert_eq!(graph.node_count(), 5);
        assert!(graph.contains("E"));
        assert_eq!(graph.glyph("B").unwrap().axis("Valence"), Some(2.0));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let graph = GlyphGraph::from_library(&GlyphLibrary::new(vec![
            glyph("origin", 0.0, 0.0),
            glyph("near", 2.4, 0.0),
            glyph("edge", -2.5, 0.0),
        ]));
        assert!(graph.edge("origin", "near").is_some());
        assert!(graph.edge("origin", "edge").is_none());
        assert!(graph.edge("near", "edge").is_none());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_edge_weight_is_one_minus_distance() {
        let graph = sample();
        let ab = graph.edge("A", "B").unwrap();
        assert_eq!(ab.relation, TENSOR_SIMILARITY);
        assert_eq!(ab.distance, 2.0);
        assert_eq!(ab.weight, -1.0);
        let bd = graph.edge("D", "B").unwrap();
        assert_eq!(bd.weight, 0.0);
        assert!(graph.edge("A", "C").is_none());
    }

    #[test]
    fn test_neighbors_are_sorted() {
        let graph = sample();
        assert_eq!(graph.neighbors("B"), vec!["A", "C", "D"]);
        assert_eq!(graph.neighbors("A"), vec!["B", "D"]);
        assert!(graph.neighbors("E").is_empty());
        assert!(graph.neighbors("unknown").is_empty());
    }

    #[test]
    fn test_find_path_prefers_shortest_distance() {
        let graph = sample();
        assert_eq!(graph.find_path("A", "C"), Some(vec!["A", "B", "C"]));
        assert_eq!(graph.find_path("A", "A"), Some(vec!["A"]));
        assert_eq!(graph.find_path("A", "E"), None);
        assert_eq!(graph.find_path("A", "unknown"), None);
    }

    #[test]
    fn test_duplicate_name_keeps_one_node() {
        let graph = GlyphGraph::from_library(&GlyphLibrary::new(vec![
            glyph("Elun", 0.0, 0.0),
            glyph("Elun", 1.0, 0.0),
        ]));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.glyph("Elun").unwrap().axis("Valence"), Some(1.0));
    }
}
