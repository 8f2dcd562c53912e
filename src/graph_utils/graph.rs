use std::collections::HashSet;

use log::debug;

use super::cell::{Cell, CellId, Edge, Geometry, Vertex, VertexShape};
use super::surface::{CellModel, DiagramSurface, SurfaceEvent};
use crate::session::SessionEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOrigin {
    // Mutation requested through the store API
    Store,
    // Mutation performed by the surface itself (drag-connect, drop, import)
    Surface,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelChange {
    pub origin: ChangeOrigin,
    pub added: Vec<CellId>,
    pub removed: Vec<CellId>,
    pub changed: Vec<CellId>,
}

impl ModelChange {
    fn from_events(origin: ChangeOrigin, events: Vec<SurfaceEvent>) -> Self {
        let mut change = ModelChange { origin, added: Vec::new(), removed: Vec::new(), changed: Vec::new() };
        for ev in events {
            match ev {
                SurfaceEvent::CellsAdded(ids) => change.added.extend(ids),
                SurfaceEvent::CellConnected { edge, .. } => {
                    if !change.added.contains(&edge) {
                        change.added.push(edge);
                    }
                }
                SurfaceEvent::CellsRemoved(ids) => change.removed.extend(ids),
                SurfaceEvent::CellChanged(id) => change.changed.push(id),
            }
        }
        change
    }

    pub fn is_structural(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.is_structural() && self.changed.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ModelChange)>;

/// Canonical vertex/edge lists derived from a [`DiagramSurface`].
///
/// The lists are a full recompute of the surface's cell collection after each
/// change, in discovery order. They are never edited in place.
pub struct GraphStore<S: DiagramSurface = CellModel> {
    surface: S,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for GraphStore<CellModel> {
    fn default() -> Self { Self::new() }
}

impl GraphStore<CellModel> {
    // Instantiate a new, empty store over an in-memory cell model
    pub fn new() -> Self {
        Self::with_surface(CellModel::new())
    }

    // Rebuild from persisted cells; edges without both endpoints are dropped
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        let mut model = CellModel::new();
        let (vertices, edges): (Vec<Cell>, Vec<Cell>) = cells.into_iter().partition(Cell::is_vertex);
        model.import_cells(vertices);
        model.import_cells(edges);
        model.take_events();
        Self::with_surface(model)
    }

    pub fn seed_example(&mut self) {
        let hello = self.insert_vertex("Hello,", (20.0, 20.0), (80.0, 30.0));
        let world = self.insert_vertex("World!", (200.0, 150.0), (80.0, 30.0));
        self.insert_edge(hello, world);
    }
}

impl<S: DiagramSurface> GraphStore<S> {
    pub fn with_surface(surface: S) -> Self {
        let mut store = Self {
            surface,
            vertices: Vec::new(),
            edges: Vec::new(),
            listeners: Vec::new(),
            next_subscription: 0,
        };
        store.surface.take_events();
        store.sync();
        store
    }

    pub fn surface(&self) -> &S { &self.surface }
    pub fn vertices(&self) -> &[Vertex] { &self.vertices }
    pub fn edges(&self) -> &[Edge] { &self.edges }

    pub fn vertex(&self, id: CellId) -> Option<&Vertex> {
        self.vertices.iter().find(|v| v.id == id)
    }

    pub fn edge(&self, id: CellId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn incident_edges(&self, vertex: CellId) -> Vec<Edge> {
        self.edges.iter().filter(|e| e.touches(vertex)).cloned().collect()
    }

    pub fn cell_count(&self) -> usize { self.vertices.len() + self.edges.len() }

    // Snapshot of all cells for persistence, vertices first
    pub fn cells(&self) -> Vec<Cell> {
        self.vertices
            .iter()
            .cloned()
            .map(Cell::Vertex)
            .chain(self.edges.iter().cloned().map(Cell::Edge))
            .collect()
    }

    // Observer registration
    pub fn subscribe(&mut self, listener: impl FnMut(&ModelChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // Listener only hears about cells the surface added or removed on its own
    pub fn on_structural_change(&mut self, mut listener: impl FnMut(&ModelChange) + 'static) -> SubscriptionId {
        self.subscribe(move |change| {
            if change.origin == ChangeOrigin::Surface && change.is_structural() {
                listener(change);
            }
        })
    }

    // Store-originated mutations
    pub fn insert_vertex(&mut self, label: &str, position: (f32, f32), size: (f32, f32)) -> CellId {
        let vertex = Vertex::new(label, Geometry::at(position, size));
        let id = vertex.id;
        self.surface.insert_cell(Cell::Vertex(vertex));
        self.commit(ChangeOrigin::Store);
        id
    }

    pub fn insert_shaped_vertex(&mut self, label: &str, shape: VertexShape, position: (f32, f32)) -> CellId {
        let vertex = Vertex::new(label, Geometry::at(position, shape.default_size())).with_shape(shape);
        let id = vertex.id;
        self.surface.insert_cell(Cell::Vertex(vertex));
        self.commit(ChangeOrigin::Store);
        id
    }

    // Refused (None) when either endpoint is not a known vertex
    pub fn insert_edge(&mut self, source: CellId, target: CellId) -> Option<CellId> {
        if self.vertex(source).is_none() || self.vertex(target).is_none() {
            debug!("edge refused: unknown endpoint {} -> {}", source, target);
            return None;
        }
        let edge = Edge::new(source, target);
        let id = edge.id;
        if !self.surface.insert_cell(Cell::Edge(edge)) {
            return None;
        }
        self.commit(ChangeOrigin::Store);
        Some(id)
    }

    // Removing a vertex takes every edge touching it along
    pub fn remove(&mut self, ids: &HashSet<CellId>) -> Vec<CellId> {
        let mut doomed = ids.clone();
        doomed.extend(
            self.edges
                .iter()
                .filter(|e| ids.contains(&e.source) || ids.contains(&e.target))
                .map(|e| e.id),
        );
        let removed = self.surface.remove_cells(&doomed);
        self.commit(ChangeOrigin::Store);
        removed
    }

    pub fn remove_selected(&mut self) -> Vec<CellId> {
        let ids: HashSet<CellId> = self.surface.selection().iter().copied().collect();
        if ids.is_empty() {
            return Vec::new();
        }
        self.remove(&ids)
    }

    pub fn clear_all(&mut self) {
        let ids: HashSet<CellId> = self.surface.cells().iter().map(Cell::id).collect();
        if !ids.is_empty() {
            self.surface.remove_cells(&ids);
        }
        self.commit(ChangeOrigin::Store);
    }

    pub fn move_vertex(&mut self, id: CellId, position: (f32, f32)) -> bool {
        let moved = self.surface.move_vertex(id, position.0, position.1);
        if moved {
            self.sync();
        }
        moved
    }

    // Selection lives on the surface; the store never mutates for it
    pub fn select_all(&mut self) { self.surface.select_all(); }
    pub fn select_none(&mut self) { self.surface.clear_selection(); }
    pub fn select(&mut self, ids: Vec<CellId>) { self.surface.set_selection(ids); }
    pub fn selection(&self) -> &[CellId] { self.surface.selection() }

    // Upward edit events from the tables
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::VertexChanged(v) => self.apply_vertex_change(&v),
            SessionEvent::EdgeChanged(e) => self.apply_edge_change(&e),
        }
    }

    pub fn apply_vertex_change(&mut self, vertex: &Vertex) -> bool {
        if self.vertex(vertex.id).is_none() {
            return false;
        }
        let mut next = vertex.clone();
        next.label = next.label.trim().to_string();
        let ok = self.surface.update_cell(&Cell::Vertex(next));
        self.commit(ChangeOrigin::Store);
        ok
    }

    pub fn apply_edge_change(&mut self, edge: &Edge) -> bool {
        if self.edge(edge.id).is_none() {
            return false;
        }
        let ok = self.surface.update_cell(&Cell::Edge(edge.clone()));
        self.commit(ChangeOrigin::Store);
        ok
    }

    // Run a surface-originated mutation and pick up whatever it changed
    pub fn update_surface<R>(&mut self, f: impl FnOnce(&mut S) -> R) -> R {
        let out = f(&mut self.surface);
        self.commit(ChangeOrigin::Surface);
        out
    }

    fn commit(&mut self, origin: ChangeOrigin) -> bool {
        let events = self.surface.take_events();
        if events.is_empty() {
            return false;
        }
        let change = ModelChange::from_events(origin, events);
        self.sync();
        debug!(
            "model change ({:?}): +{} -{} ~{}",
            change.origin,
            change.added.len(),
            change.removed.len(),
            change.changed.len()
        );
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
        true
    }

    fn sync(&mut self) {
        let cells = self.surface.cells();
        self.vertices = cells.iter().filter_map(Cell::as_vertex).cloned().collect();
        self.edges = cells.iter().filter_map(Cell::as_edge).cloned().collect();
    }
}
