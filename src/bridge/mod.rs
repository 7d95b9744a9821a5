// Nyseal — Bridge
//
// The wired aggregate a successful bootstrap returns: the frozen registry,
// the glyph library parsed from the data module, the similarity graph built
// over that library, and the query surface.
// Everything inside is immutable, so an `Arc<Bridge>` can be shared with
// any number of readers.

mod router;
mod watcher;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::activation::{Exports, Symbol};
use crate::bootstrap::FrozenRegistry;
use crate::glyph::{GlyphGraph, GlyphLibrary};

pub use router::{
    Constraints, QueryOutcome, QueryPacket, QueryResponse, QueryRouter, DEFAULT_KEYWORDS,
};
pub use watcher::{HandledTrace, TraceWatcher, DEFAULT_POLL_INTERVAL, DEFAULT_TRACE_DIR};

/// Export name carrying the glyph dataset.
pub const GLYPH_LIST_EXPORT: &str = "glyph_list";

#[derive(Debug, Clone)]
pub struct Bridge {
    registry: FrozenRegistry,
    glyphs: Arc<GlyphLibrary>,
    graph: Arc<GlyphGraph>,
    router: QueryRouter,
    booted_at: DateTime<Utc>,
}

impl Bridge {
    pub fn new(registry: FrozenRegistry) -> Self {
        let glyphs = load_glyphs(&registry);
        let graph = GlyphGraph::from_library(&glyphs);
        Self {
            registry,
            glyphs: Arc::new(glyphs),
            graph: Arc::new(graph),
            router: QueryRouter::default(),
            booted_at: Utc::now(),
        }
    }

    pub fn with_router(mut self, router: QueryRouter) -> Self {
        self.router = router;
        self
    }

    pub fn get(&self, module: &str, symbol: &str) -> Option<Symbol> {
        self.registry.get(module, symbol)
    }

    pub fn modules(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn exports(&self, module: &str) -> Option<Arc<Exports>> {
        self.registry.module(module)
    }

    pub fn registry(&self) -> &FrozenRegistry {
        &self.registry
    }

    pub fn glyph_library(&self) -> &GlyphLibrary {
        &self.glyphs
    }

    pub fn glyph_graph(&self) -> &GlyphGraph {
        &self.graph
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    pub fn booted_at(&self) -> DateTime<Utc> {
        self.booted_at
    }

    /// Routes a free-text query, or reports that it was bypassed.
    pub fn process_query(&self, query: &str) -> QueryOutcome {
        match self.router.route(query) {
            Some(packet) => {
                tracing::info!(focus = ?packet.focus, "Routing query");
                QueryOutcome::Routed(self.handle_packet(&packet))
            }
            None => QueryOutcome::Bypass {
                message: "Query did not require symbolic routing.".to_string(),
            },
        }
    }

    /// Resolves the packet's focus glyphs against the glyph library.
    pub fn handle_packet(&self, packet: &QueryPacket) -> QueryResponse {
        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        for name in &packet.focus {
            match self.glyphs.get_by_name(name) {
                Some(glyph) => resolved.push(glyph.clone()),
                None => unresolved.push(name.clone()),
            }
        }

        tracing::info!(
            resolved = resolved.len(),
            unresolved = unresolved.len(),
            origin = %packet.origin,
            "Query handled"
        );

        QueryResponse {
            packet: packet.clone(),
            resolved,
            unresolved,
            handled_at: Utc::now(),
        }
    }
}

fn load_glyphs(registry: &FrozenRegistry) -> GlyphLibrary {
    let Some((module, symbol)) = registry.find(GLYPH_LIST_EXPORT) else {
        tracing::debug!("No glyph dataset among active modules");
        return GlyphLibrary::default();
    };
    let Some(text) = symbol.as_text() else {
        tracing::warn!(module, kind = symbol.kind(), "Glyph dataset export is not text");
        return GlyphLibrary::default();
    };
    match GlyphLibrary::from_json(text) {
        Ok(library) => {
            tracing::info!(module, glyphs = library.len(), "Glyph library loaded");
            library
        }
        Err(e) => {
            tracing::warn!(module, "Glyph dataset unreadable: {}", e);
            GlyphLibrary::default()
        }
    }
}
