use super::labels::{LinkPerspective, Locale};
use crate::graph_utils::cell::{CellId, Edge, Vertex};
use crate::graph_utils::graph::GraphStore;
use crate::graph_utils::surface::DiagramSurface;

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRow {
    pub id: CellId,
    pub source_label: String,
    pub relationship_label: String,
    pub target_label: String,
    pub perspective: LinkPerspective,
}

/// Read-only view of edges, labelled from an optional frame-of-reference vertex.
pub struct EdgeTable<'a> {
    edges: &'a [Edge],
    vertices: &'a [Vertex],
    frame: Option<&'a Vertex>,
    locale: Locale,
}

impl<'a> EdgeTable<'a> {
    pub const COLUMNS: [&'static str; 4] = ["id", "source", "relationship", "target"];

    pub fn new(edges: &'a [Edge], vertices: &'a [Vertex]) -> Self {
        Self { edges, vertices, frame: None, locale: Locale::default() }
    }

    pub fn from_store<S: DiagramSurface>(store: &'a GraphStore<S>) -> Self {
        Self::new(store.edges(), store.vertices())
    }

    pub fn with_frame(mut self, frame: Option<&'a Vertex>) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn len(&self) -> usize { self.edges.len() }
    pub fn is_empty(&self) -> bool { self.edges.is_empty() }

    pub fn vertex_label(&self, id: CellId) -> &'a str {
        self.vertices.iter().find(|v| v.id == id).map(|v| v.label.as_str()).unwrap_or("")
    }

    pub fn relationship_label(&self, edge: &Edge) -> &'static str {
        LinkPerspective::resolve(edge, self.frame).label(self.locale)
    }

    pub fn row(&self, edge: &Edge) -> EdgeRow {
        let perspective = LinkPerspective::resolve(edge, self.frame);
        EdgeRow {
            id: edge.id,
            source_label: self.vertex_label(edge.source).to_string(),
            relationship_label: perspective.label(self.locale).to_string(),
            target_label: self.vertex_label(edge.target).to_string(),
            perspective,
        }
    }

    pub fn rows(&self) -> Vec<EdgeRow> {
        self.edges.iter().map(|e| self.row(e)).collect()
    }

    pub fn edges(&self) -> &'a [Edge] { self.edges }
}
