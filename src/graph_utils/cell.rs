use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Basic type aliases for clarity
pub type CellId = Uuid;

pub const DEFAULT_VERTEX_LABEL: &str = "New Vertex";
const MIN_CELL_EXTENT: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Geometry {
    // Non-finite coordinates collapse to the origin; sizes never drop below one unit
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        let coord = |v: f32| if v.is_finite() { v } else { 0.0 };
        let extent = |v: f32| if v.is_finite() { v.max(MIN_CELL_EXTENT) } else { MIN_CELL_EXTENT };
        Self { x: coord(x), y: coord(y), width: extent(width), height: extent(height) }
    }

    pub fn at(position: (f32, f32), size: (f32, f32)) -> Self {
        Self::new(position.0, position.1, size.0, size.1)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Vertex outlines offered by the toolbar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexShape {
    #[default]
    Rectangle,
    Rounded,
    Ellipse,
    Rhombus,
    Triangle,
    Cylinder,
    Actor,
    Swimlane,
}

impl VertexShape {
    pub const ALL: [VertexShape; 8] = [
        VertexShape::Swimlane,
        VertexShape::Rectangle,
        VertexShape::Rounded,
        VertexShape::Ellipse,
        VertexShape::Rhombus,
        VertexShape::Triangle,
        VertexShape::Cylinder,
        VertexShape::Actor,
    ];

    pub fn default_size(self) -> (f32, f32) {
        match self {
            VertexShape::Swimlane => (120.0, 160.0),
            VertexShape::Rectangle | VertexShape::Rounded => (100.0, 40.0),
            VertexShape::Actor => (30.0, 40.0),
            VertexShape::Ellipse
            | VertexShape::Rhombus
            | VertexShape::Triangle
            | VertexShape::Cylinder => (40.0, 40.0),
        }
    }

    pub fn style_name(self) -> &'static str {
        match self {
            VertexShape::Rectangle => "rectangle",
            VertexShape::Rounded => "rounded",
            VertexShape::Ellipse => "ellipse",
            VertexShape::Rhombus => "rhombus",
            VertexShape::Triangle => "triangle",
            VertexShape::Cylinder => "cylinder",
            VertexShape::Actor => "actor",
            VertexShape::Swimlane => "swimlane",
        }
    }

    // Unknown style names fall back to a plain rectangle
    pub fn from_style_name(name: &str) -> Self {
        VertexShape::ALL
            .into_iter()
            .find(|s| s.style_name() == name.trim())
            .unwrap_or_default()
    }
}

/// Semantic relationship carried by an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Attribute,
    Parent,
    Type,
    Whole,
}

impl LinkType {
    pub const ALL: [LinkType; 4] = [LinkType::Attribute, LinkType::Parent, LinkType::Type, LinkType::Whole];

    pub fn tag(self) -> &'static str {
        match self {
            LinkType::Attribute => "Attribute",
            LinkType::Parent => "Parent",
            LinkType::Type => "Type",
            LinkType::Whole => "Whole",
        }
    }

    // Absent or unrecognized tags mean "untyped"
    pub fn parse_tag(tag: Option<&str>) -> Option<Self> {
        tag.and_then(|t| t.parse().ok())
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for LinkType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Attribute" | "Atribute" => Ok(LinkType::Attribute),
            "Parent" => Ok(LinkType::Parent),
            "Type" => Ok(LinkType::Type),
            "Whole" => Ok(LinkType::Whole),
            other => Err(anyhow::anyhow!("unknown link type tag '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: CellId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub shape: VertexShape,
}

impl Vertex {
    pub fn new(label: &str, geometry: Geometry) -> Self {
        Self::with_id(Uuid::now_v7(), label, geometry)
    }

    pub fn with_id(id: CellId, label: &str, geometry: Geometry) -> Self {
        Self {
            id,
            label: label.trim().to_string(),
            description: String::new(),
            geometry,
            shape: VertexShape::default(),
        }
    }

    pub fn with_shape(mut self, shape: VertexShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: CellId,
    pub source: CellId,
    pub target: CellId,
    #[serde(default)]
    pub link_type: Option<LinkType>,
}

impl Edge {
    pub fn new(source: CellId, target: CellId) -> Self {
        Self::with_id(Uuid::now_v7(), source, target)
    }

    pub fn with_id(id: CellId, source: CellId, target: CellId) -> Self {
        Self { id, source, target, link_type: None }
    }

    pub fn with_link_type(mut self, link_type: Option<LinkType>) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn touches(&self, vertex: CellId) -> bool {
        self.source == vertex || self.target == vertex
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Vertex(Vertex),
    Edge(Edge),
}

impl Cell {
    pub fn id(&self) -> CellId {
        match self {
            Cell::Vertex(v) => v.id,
            Cell::Edge(e) => e.id,
        }
    }

    pub fn is_vertex(&self) -> bool { matches!(self, Cell::Vertex(_)) }
    pub fn is_edge(&self) -> bool { matches!(self, Cell::Edge(_)) }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Cell::Vertex(v) => Some(v),
            Cell::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Cell::Edge(e) => Some(e),
            Cell::Vertex(_) => None,
        }
    }
}

impl From<Vertex> for Cell {
    fn from(v: Vertex) -> Self { Cell::Vertex(v) }
}

impl From<Edge> for Cell {
    fn from(e: Edge) -> Self { Cell::Edge(e) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_sanitizes_non_finite_and_tiny_values() {
        let g = Geometry::new(f32::NAN, 5.0, 0.0, f32::INFINITY);
        assert_eq!(g.x, 0.0);
        assert_eq!(g.y, 5.0);
        assert_eq!(g.width, 1.0);
        assert_eq!(g.height, 1.0);
    }

    #[test]
    fn link_type_accepts_legacy_spelling() {
        assert_eq!("Atribute".parse::<LinkType>().ok(), Some(LinkType::Attribute));
        assert_eq!(LinkType::parse_tag(Some("Whole")), Some(LinkType::Whole));
        assert_eq!(LinkType::parse_tag(Some("Friend")), None);
        assert_eq!(LinkType::parse_tag(None), None);
    }

    #[test]
    fn unknown_style_falls_back_to_rectangle() {
        assert_eq!(VertexShape::from_style_name("ellipse"), VertexShape::Ellipse);
        assert_eq!(VertexShape::from_style_name("hexagon"), VertexShape::Rectangle);
    }
}
