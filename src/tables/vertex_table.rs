use crate::graph_utils::cell::{CellId, Edge, Vertex};
use crate::graph_utils::graph::GraphStore;
use crate::graph_utils::surface::DiagramSurface;

#[derive(Clone, Debug, PartialEq)]
pub struct VertexRow {
    pub id: CellId,
    pub label: String,
    pub description: String,
}

/// Read-only view of the store's vertices.
pub struct VertexTable<'a> {
    vertices: &'a [Vertex],
    edges: &'a [Edge],
}

impl<'a> VertexTable<'a> {
    pub const COLUMNS: [&'static str; 3] = ["id", "label", "description"];

    pub fn new(vertices: &'a [Vertex], edges: &'a [Edge]) -> Self {
        Self { vertices, edges }
    }

    pub fn from_store<S: DiagramSurface>(store: &'a GraphStore<S>) -> Self {
        Self::new(store.vertices(), store.edges())
    }

    pub fn len(&self) -> usize { self.vertices.len() }
    pub fn is_empty(&self) -> bool { self.vertices.is_empty() }

    pub fn rows(&self) -> Vec<VertexRow> {
        self.vertices
            .iter()
            .map(|v| VertexRow { id: v.id, label: v.label.clone(), description: v.description.clone() })
            .collect()
    }

    pub fn vertices(&self) -> &'a [Vertex] { self.vertices }

    // Edges shown next to a selected vertex
    pub fn edges_touching(&self, vertex: CellId) -> Vec<Edge> {
        self.edges.iter().filter(|e| e.touches(vertex)).cloned().collect()
    }
}
