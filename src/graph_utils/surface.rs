use std::collections::HashSet;

use super::cell::{Cell, CellId, Edge, Geometry, Vertex};

/// Structural notifications queued by a surface until the store drains them.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    CellsAdded(Vec<CellId>),
    CellConnected { edge: CellId, source: CellId, target: CellId },
    CellsRemoved(Vec<CellId>),
    CellChanged(CellId),
}

/// The rendering/interaction model the store keeps in sync with.
///
/// Implementations own cell geometry and selection. Every mutation that
/// changes which cells exist must queue a [`SurfaceEvent`].
pub trait DiagramSurface {
    /// All cells in discovery order.
    fn cells(&self) -> &[Cell];
    fn insert_cell(&mut self, cell: Cell) -> bool;
    fn remove_cells(&mut self, ids: &HashSet<CellId>) -> Vec<CellId>;
    /// Replace the value of an existing cell of the same kind. Geometry stays with the surface.
    fn update_cell(&mut self, cell: &Cell) -> bool;
    fn move_vertex(&mut self, id: CellId, x: f32, y: f32) -> bool;

    fn select_all(&mut self);
    fn clear_selection(&mut self);
    fn set_selection(&mut self, ids: Vec<CellId>);
    fn selection(&self) -> &[CellId];

    fn take_events(&mut self) -> Vec<SurfaceEvent>;

    fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells().iter().find(|c| c.id() == id)
    }
}

/// In-memory cell collection backing the canvas.
#[derive(Clone, Debug, Default)]
pub struct CellModel {
    cells: Vec<Cell>,
    selection: Vec<CellId>,
    events: Vec<SurfaceEvent>,
}

impl CellModel {
    pub fn new() -> Self { Self::default() }

    fn contains_vertex(&self, id: CellId) -> bool {
        self.cells.iter().any(|c| c.is_vertex() && c.id() == id)
    }

    // User dropped a vertex onto the canvas
    pub fn drop_vertex(&mut self, vertex: Vertex) -> CellId {
        let id = vertex.id;
        self.cells.push(Cell::Vertex(vertex));
        self.events.push(SurfaceEvent::CellsAdded(vec![id]));
        self.selection = vec![id];
        id
    }

    // User dragged a connection between two vertices
    pub fn connect(&mut self, source: CellId, target: CellId) -> Option<CellId> {
        let edge = Edge::new(source, target);
        let id = edge.id;
        if self.insert_cell(Cell::Edge(edge)) {
            self.events.push(SurfaceEvent::CellConnected { edge: id, source, target });
            Some(id)
        } else {
            None
        }
    }

    // Bulk insertion used by document import; invalid edges are skipped
    pub fn import_cells(&mut self, cells: Vec<Cell>) -> Vec<CellId> {
        let mut added = Vec::with_capacity(cells.len());
        for cell in cells {
            let id = cell.id();
            if self.insert_cell_quiet(cell) {
                added.push(id);
            }
        }
        if !added.is_empty() {
            self.events.push(SurfaceEvent::CellsAdded(added.clone()));
        }
        added
    }

    pub fn vertex_at(&self, x: f32, y: f32) -> Option<CellId> {
        // Topmost (last drawn) vertex wins
        self.cells
            .iter()
            .rev()
            .filter_map(Cell::as_vertex)
            .find(|v| v.geometry.contains(x, y))
            .map(|v| v.id)
    }

    fn insert_cell_quiet(&mut self, cell: Cell) -> bool {
        if self.cells.iter().any(|c| c.id() == cell.id()) {
            return false;
        }
        if let Cell::Edge(e) = &cell {
            if !self.contains_vertex(e.source) || !self.contains_vertex(e.target) {
                return false;
            }
        }
        self.cells.push(cell);
        true
    }
}

impl DiagramSurface for CellModel {
    fn cells(&self) -> &[Cell] { &self.cells }

    fn insert_cell(&mut self, cell: Cell) -> bool {
        let id = cell.id();
        let ok = self.insert_cell_quiet(cell);
        if ok {
            self.events.push(SurfaceEvent::CellsAdded(vec![id]));
        }
        ok
    }

    fn remove_cells(&mut self, ids: &HashSet<CellId>) -> Vec<CellId> {
        // Cascade: edges attached to a removed vertex go too
        let doomed: HashSet<CellId> = self
            .cells
            .iter()
            .filter(|c| match c {
                Cell::Vertex(v) => ids.contains(&v.id),
                Cell::Edge(e) => ids.contains(&e.id) || ids.contains(&e.source) || ids.contains(&e.target),
            })
            .map(Cell::id)
            .collect();
        if doomed.is_empty() {
            return Vec::new();
        }
        let mut removed = Vec::with_capacity(doomed.len());
        self.cells.retain(|c| {
            if doomed.contains(&c.id()) {
                removed.push(c.id());
                false
            } else {
                true
            }
        });
        self.selection.retain(|id| !doomed.contains(id));
        self.events.push(SurfaceEvent::CellsRemoved(removed.clone()));
        removed
    }

    fn update_cell(&mut self, cell: &Cell) -> bool {
        let Some(slot) = self.cells.iter_mut().find(|c| c.id() == cell.id()) else {
            return false;
        };
        match (slot, cell) {
            (Cell::Vertex(current), Cell::Vertex(next)) => {
                current.label = next.label.clone();
                current.description = next.description.clone();
                current.shape = next.shape;
            }
            (Cell::Edge(current), Cell::Edge(next)) => {
                current.link_type = next.link_type;
            }
            _ => return false,
        }
        self.events.push(SurfaceEvent::CellChanged(cell.id()));
        true
    }

    fn move_vertex(&mut self, id: CellId, x: f32, y: f32) -> bool {
        for cell in self.cells.iter_mut() {
            if let Cell::Vertex(v) = cell {
                if v.id == id {
                    v.geometry = Geometry::new(x, y, v.geometry.width, v.geometry.height);
                    return true;
                }
            }
        }
        false
    }

    fn select_all(&mut self) {
        self.selection = self.cells.iter().map(Cell::id).collect();
    }

    fn clear_selection(&mut self) { self.selection.clear(); }

    fn set_selection(&mut self, ids: Vec<CellId>) {
        let known: HashSet<CellId> = self.cells.iter().map(Cell::id).collect();
        self.selection = ids.into_iter().filter(|id| known.contains(id)).collect();
    }

    fn selection(&self) -> &[CellId] { &self.selection }

    fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(label: &str) -> Vertex {
        Vertex::new(label, Geometry::new(0.0, 0.0, 80.0, 30.0))
    }

    #[test]
    fn connect_refuses_unknown_endpoints() {
        let mut model = CellModel::new();
        let a = model.drop_vertex(vertex("a"));
        assert!(model.connect(a, uuid::Uuid::now_v7()).is_none());
        assert_eq!(model.cells().len(), 1);
    }

    #[test]
    fn removal_cascades_and_prunes_selection() {
        let mut model = CellModel::new();
        let a = model.drop_vertex(vertex("a"));
        let b = model.drop_vertex(vertex("b"));
        let e = model.connect(a, b).expect("edge");
        model.select_all();
        model.take_events();

        let removed = model.remove_cells(&HashSet::from([a]));
        assert!(removed.contains(&e));
        assert_eq!(model.selection(), &[b]);
        assert_eq!(model.take_events(), vec![SurfaceEvent::CellsRemoved(removed)]);
    }

    #[test]
    fn vertex_at_prefers_topmost() {
        let mut model = CellModel::new();
        let _below = model.drop_vertex(vertex("below"));
        let above = model.drop_vertex(vertex("above"));
        assert_eq!(model.vertex_at(10.0, 10.0), Some(above));
        assert_eq!(model.vertex_at(500.0, 500.0), None);
    }
}
