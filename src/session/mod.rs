use log::debug;

use crate::graph_utils::cell::{CellId, Edge, LinkType, Vertex};

/// Upward notification produced when the session commits an edit.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    VertexChanged(Vertex),
    EdgeChanged(Edge),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    Selected { vertex: Vertex, edges: Vec<Edge> },
    EditingVertex { vertex: Vertex, draft: String },
    EditingEdge { edge: Edge },
}

impl SessionState {
    pub fn is_idle(&self) -> bool { matches!(self, SessionState::Idle) }
    pub fn is_selected(&self) -> bool { matches!(self, SessionState::Selected { .. }) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DismissReason {
    BackgroundClick,
    FrameChanged,
}

/// What a dismissal threw away.
#[derive(Clone, Debug, PartialEq)]
pub struct Dismissed {
    pub reason: DismissReason,
    pub previous: SessionState,
}

type DismissListener = Box<dyn FnMut(&Dismissed)>;

/// Transient selection/edit state of the tables, one entity at a time.
#[derive(Default)]
pub struct EditSession {
    state: SessionState,
    frame: Option<CellId>,
    dismiss_listeners: Vec<DismissListener>,
}

impl EditSession {
    pub fn new() -> Self { Self::default() }

    pub fn state(&self) -> &SessionState { &self.state }
    pub fn frame_of_reference(&self) -> Option<CellId> { self.frame }

    pub fn selected_vertex(&self) -> Option<&Vertex> {
        match &self.state {
            SessionState::Selected { vertex, .. } => Some(vertex),
            _ => None,
        }
    }

    pub fn selected_edges(&self) -> &[Edge] {
        match &self.state {
            SessionState::Selected { edges, .. } => edges,
            _ => &[],
        }
    }

    pub fn editing_vertex(&self) -> Option<(&Vertex, &str)> {
        match &self.state {
            SessionState::EditingVertex { vertex, draft } => Some((vertex, draft.as_str())),
            _ => None,
        }
    }

    pub fn editing_edge(&self) -> Option<&Edge> {
        match &self.state {
            SessionState::EditingEdge { edge } => Some(edge),
            _ => None,
        }
    }

    pub fn on_dismiss(&mut self, listener: impl FnMut(&Dismissed) + 'static) {
        self.dismiss_listeners.push(Box::new(listener));
    }

    // Click on a vertex value: incident edges come from a linear scan
    pub fn select_vertex(&mut self, vertex: &Vertex, edges: &[Edge]) {
        let incident = edges.iter().filter(|e| e.touches(vertex.id)).cloned().collect();
        self.frame = Some(vertex.id);
        self.state = SessionState::Selected { vertex: vertex.clone(), edges: incident };
    }

    // Editing drops the selection, and the selection is what framed the edge table
    pub fn edit_vertex(&mut self, vertex: &Vertex) {
        self.frame = None;
        self.state = SessionState::EditingVertex { vertex: vertex.clone(), draft: vertex.description.clone() };
    }

    pub fn set_draft(&mut self, text: impl Into<String>) -> bool {
        match &mut self.state {
            SessionState::EditingVertex { draft, .. } => {
                *draft = text.into();
                true
            }
            _ => false,
        }
    }

    // Writes the draft into the vertex and returns to Idle
    pub fn commit(&mut self) -> Option<SessionEvent> {
        match std::mem::take(&mut self.state) {
            SessionState::EditingVertex { mut vertex, draft } => {
                vertex.description = draft;
                Some(SessionEvent::VertexChanged(vertex))
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn edit_edge(&mut self, edge: &Edge) {
        self.state = SessionState::EditingEdge { edge: edge.clone() };
    }

    // The selector commits on choice; the editor stays open until dismissed
    pub fn choose_link_type(&mut self, link_type: Option<LinkType>) -> Option<SessionEvent> {
        match &mut self.state {
            SessionState::EditingEdge { edge } => {
                edge.link_type = link_type;
                Some(SessionEvent::EdgeChanged(edge.clone()))
            }
            _ => None,
        }
    }

    pub fn dismiss(&mut self) {
        self.dismiss_with(DismissReason::BackgroundClick);
    }

    pub fn set_frame_of_reference(&mut self, frame: Option<CellId>) {
        if self.frame == frame {
            return;
        }
        self.frame = frame;
        if matches!(self.state, SessionState::EditingEdge { .. }) {
            self.dismiss_with(DismissReason::FrameChanged);
        }
    }

    // Bring snapshots back in line with the store after it changed
    pub fn reconcile(&mut self, vertices: &[Vertex], edges: &[Edge]) {
        if let Some(f) = self.frame {
            if !vertices.iter().any(|v| v.id == f) {
                self.frame = None;
            }
        }
        let next = match std::mem::take(&mut self.state) {
            SessionState::Idle => SessionState::Idle,
            SessionState::Selected { vertex, .. } => match vertices.iter().find(|v| v.id == vertex.id) {
                Some(current) => SessionState::Selected {
                    vertex: current.clone(),
                    edges: edges.iter().filter(|e| e.touches(current.id)).cloned().collect(),
                },
                None => SessionState::Idle,
            },
            SessionState::EditingVertex { vertex, draft } => match vertices.iter().find(|v| v.id == vertex.id) {
                Some(current) => SessionState::EditingVertex { vertex: current.clone(), draft },
                None => SessionState::Idle,
            },
            SessionState::EditingEdge { edge } => match edges.iter().find(|e| e.id == edge.id) {
                Some(current) => SessionState::EditingEdge { edge: current.clone() },
                None => SessionState::Idle,
            },
        };
        self.state = next;
    }

    fn dismiss_with(&mut self, reason: DismissReason) {
        let previous = std::mem::take(&mut self.state);
        if reason == DismissReason::BackgroundClick {
            self.frame = None;
        }
        if previous.is_idle() {
            return;
        }
        debug!("session dismissed ({:?})", reason);
        let dismissed = Dismissed { reason, previous };
        for listener in self.dismiss_listeners.iter_mut() {
            listener(&dismissed);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::graph_utils::cell::Geometry;

    fn vertex(label: &str) -> Vertex {
        Vertex::new(label, Geometry::new(0.0, 0.0, 80.0, 30.0))
    }

    #[test]
    fn commit_outside_vertex_edit_is_noop() {
        let a = vertex("a");
        let mut s = EditSession::new();
        s.select_vertex(&a, &[]);
        assert!(s.commit().is_none());
        assert!(s.state().is_selected());
    }

    #[test]
    fn dismiss_notifies_only_when_something_was_active() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut s = EditSession::new();
        s.on_dismiss(move |d| sink.borrow_mut().push(d.reason));

        s.dismiss();
        assert!(seen.borrow().is_empty());

        s.edit_vertex(&vertex("a"));
        s.dismiss();
        assert_eq!(*seen.borrow(), vec![DismissReason::BackgroundClick]);
    }

    #[test]
    fn vertex_edit_forgets_the_previous_frame() {
        let a = vertex("a");
        let b = vertex("b");
        let mut s = EditSession::new();
        s.select_vertex(&a, &[]);
        assert_eq!(s.frame_of_reference(), Some(a.id));
        s.edit_vertex(&b);
        assert_eq!(s.frame_of_reference(), None);
        assert!(s.commit().is_some());
        assert!(s.state().is_idle());
        assert_eq!(s.frame_of_reference(), None);
    }

    #[test]
    fn reconcile_drops_state_for_removed_entities() {
        let a = vertex("a");
        let mut s = EditSession::new();
        s.select_vertex(&a, &[]);
        s.reconcile(&[], &[]);
        assert!(s.state().is_idle());
        assert_eq!(s.frame_of_reference(), None);
    }
}
