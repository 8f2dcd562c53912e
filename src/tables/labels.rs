use serde::{Deserialize, Serialize};

use crate::graph_utils::cell::{Edge, LinkType, Vertex};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    English,
    Russian,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::English, Locale::Russian];

    pub fn display_name(self) -> &'static str {
        match self {
            Locale::English => "English",
            Locale::Russian => "Русский",
        }
    }

    pub fn no_type(self) -> &'static str {
        match self {
            Locale::English => "No relationship type",
            Locale::Russian => "Не имеет типа связи",
        }
    }

    // Label used in the type selector
    pub fn neutral(self, link: LinkType) -> &'static str {
        match (self, link) {
            (Locale::English, LinkType::Attribute) => "Attribute",
            (Locale::English, LinkType::Parent) => "Inheritance",
            (Locale::English, LinkType::Type) => "Type",
            (Locale::English, LinkType::Whole) => "Whole/part",
            (Locale::Russian, LinkType::Attribute) => "Атрибут",
            (Locale::Russian, LinkType::Parent) => "Наследование",
            (Locale::Russian, LinkType::Type) => "Тип",
            (Locale::Russian, LinkType::Whole) => "Целое/часть",
        }
    }

    // Read from the source end of the edge
    pub fn parent_view(self, link: LinkType) -> &'static str {
        match (self, link) {
            (Locale::English, LinkType::Attribute) => "Has attribute",
            (Locale::English, LinkType::Parent) => "Is parent of",
            (Locale::English, LinkType::Type) => "Type for",
            (Locale::English, LinkType::Whole) => "Whole for",
            (Locale::Russian, LinkType::Attribute) => "Имеет атрибут",
            (Locale::Russian, LinkType::Parent) => "Является родителем",
            (Locale::Russian, LinkType::Type) => "Тип для",
            (Locale::Russian, LinkType::Whole) => "Целое для",
        }
    }

    // Read from the target end of the edge
    pub fn child_view(self, link: LinkType) -> &'static str {
        match (self, link) {
            (Locale::English, LinkType::Attribute) => "Attribute of",
            (Locale::English, LinkType::Parent) => "Is child of",
            (Locale::English, LinkType::Type) => "Implementation of",
            (Locale::English, LinkType::Whole) => "Part of",
            (Locale::Russian, LinkType::Attribute) => "Атрибут для",
            (Locale::Russian, LinkType::Parent) => "Является наследником",
            (Locale::Russian, LinkType::Type) => "Реализация для",
            (Locale::Russian, LinkType::Whole) => "Часть от",
        }
    }
}

/// Which rendering of an edge's relationship applies for a frame of reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkPerspective {
    Parent(LinkType),
    Child(LinkType),
    NoType,
}

impl LinkPerspective {
    pub fn resolve(edge: &Edge, frame: Option<&Vertex>) -> Self {
        let Some(link) = edge.link_type else {
            return LinkPerspective::NoType;
        };
        match frame {
            None => LinkPerspective::Parent(link),
            Some(v) if v.id == edge.source => LinkPerspective::Parent(link),
            Some(v) if v.id == edge.target => LinkPerspective::Child(link),
            Some(_) => LinkPerspective::NoType,
        }
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match self {
            LinkPerspective::Parent(link) => locale.parent_view(link),
            LinkPerspective::Child(link) => locale.child_view(link),
            LinkPerspective::NoType => locale.no_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::cell::Geometry;

    fn pair() -> (Vertex, Vertex) {
        let g = Geometry::new(0.0, 0.0, 80.0, 30.0);
        (Vertex::new("Hello,", g), Vertex::new("World!", g))
    }

    #[test]
    fn untyped_edge_has_no_type_in_every_frame() {
        let (a, b) = pair();
        let e = Edge::new(a.id, b.id);
        assert_eq!(LinkPerspective::resolve(&e, None), LinkPerspective::NoType);
        assert_eq!(LinkPerspective::resolve(&e, Some(&a)), LinkPerspective::NoType);
        assert_eq!(LinkPerspective::resolve(&e, Some(&b)), LinkPerspective::NoType);
    }

    #[test]
    fn typed_edge_reads_by_endpoint() {
        let (a, b) = pair();
        let (c, _) = pair();
        let e = Edge::new(a.id, b.id).with_link_type(Some(LinkType::Parent));
        assert_eq!(LinkPerspective::resolve(&e, None), LinkPerspective::Parent(LinkType::Parent));
        assert_eq!(LinkPerspective::resolve(&e, Some(&a)), LinkPerspective::Parent(LinkType::Parent));
        assert_eq!(LinkPerspective::resolve(&e, Some(&b)), LinkPerspective::Child(LinkType::Parent));
        assert_eq!(LinkPerspective::resolve(&e, Some(&c)), LinkPerspective::NoType);
    }

    #[test]
    fn self_loop_prefers_parent_view() {
        let (a, _) = pair();
        let e = Edge::new(a.id, a.id).with_link_type(Some(LinkType::Whole));
        assert_eq!(LinkPerspective::resolve(&e, Some(&a)).label(Locale::English), "Whole for");
    }

    #[test]
    fn every_type_has_distinct_parent_and_child_labels() {
        for locale in Locale::ALL {
            for link in LinkType::ALL {
                assert_ne!(locale.parent_view(link), locale.child_view(link));
                assert_ne!(locale.neutral(link), locale.no_type());
            }
        }
    }
}
