//! mxGraph-style XML encoding of the diagram.
//!
//! Layout:
//! ```xml
//! <mxGraphModel>
//!   <root>
//!     <mxCell id="0"/>
//!     <mxCell id="1" parent="0"/>
//!     <mxCell id="…" value="Hello," description="" style="rectangle" vertex="1" parent="1">
//!       <mxGeometry x="20" y="20" width="80" height="30" as="geometry"/>
//!     </mxCell>
//!     <mxCell id="…" value="Parent" edge="1" parent="1" source="…" target="…">
//!       <mxGeometry relative="1" as="geometry"/>
//!     </mxCell>
//!   </root>
//! </mxGraphModel>
//! ```

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, bail, Result};
use log::{debug, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph_utils::cell::{Cell, CellId, Edge, Geometry, LinkType, Vertex, VertexShape, DEFAULT_VERTEX_LABEL};
use crate::graph_utils::graph::GraphStore;
use crate::graph_utils::surface::CellModel;

pub const EXPORT_FILE_NAME: &str = "diagram.xml";
pub const EXPORT_MIME: &str = "text/xml";

const MODEL_TAG: &str = "mxGraphModel";
const ROOT_TAG: &str = "root";
const CELL_TAG: &str = "mxCell";
const GEOMETRY_TAG: &str = "mxGeometry";
const ROOT_CELL_ID: &str = "0";
const LAYER_CELL_ID: &str = "1";

/// How decoded cells land in an existing store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportMode {
    // Add to what is already on the canvas
    #[default]
    Merge,
    // Clear the canvas first
    Replace,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedDiagram {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    // Edges whose endpoints were not in the document
    pub dropped_edges: usize,
}

impl DecodedDiagram {
    pub fn into_cells(self) -> Vec<Cell> {
        self.vertices
            .into_iter()
            .map(Cell::Vertex)
            .chain(self.edges.into_iter().map(Cell::Edge))
            .collect()
    }
}

pub fn encode_store(store: &GraphStore) -> Result<Vec<u8>> {
    encode(store.vertices(), store.edges())
}

pub fn encode(vertices: &[Vertex], edges: &[Edge]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(MODEL_TAG)))?;
    writer.write_event(Event::Start(BytesStart::new(ROOT_TAG)))?;

    let mut root = BytesStart::new(CELL_TAG);
    root.push_attribute(("id", ROOT_CELL_ID));
    writer.write_event(Event::Empty(root))?;
    let mut layer = BytesStart::new(CELL_TAG);
    layer.push_attribute(("id", LAYER_CELL_ID));
    layer.push_attribute(("parent", ROOT_CELL_ID));
    writer.write_event(Event::Empty(layer))?;

    for v in vertices {
        let id = v.id.to_string();
        let mut cell = BytesStart::new(CELL_TAG);
        cell.push_attribute(("id", id.as_str()));
        cell.push_attribute(("value", v.label.as_str()));
        cell.push_attribute(("description", v.description.as_str()));
        cell.push_attribute(("style", v.shape.style_name()));
        cell.push_attribute(("vertex", "1"));
        cell.push_attribute(("parent", LAYER_CELL_ID));
        writer.write_event(Event::Start(cell))?;

        let (x, y, w, h) = (
            v.geometry.x.to_string(),
            v.geometry.y.to_string(),
            v.geometry.width.to_string(),
            v.geometry.height.to_string(),
        );
        let mut geo = BytesStart::new(GEOMETRY_TAG);
        geo.push_attribute(("x", x.as_str()));
        geo.push_attribute(("y", y.as_str()));
        geo.push_attribute(("width", w.as_str()));
        geo.push_attribute(("height", h.as_str()));
        geo.push_attribute(("as", "geometry"));
        writer.write_event(Event::Empty(geo))?;
        writer.write_event(Event::End(BytesEnd::new(CELL_TAG)))?;
    }

    for e in edges {
        let (id, source, target) = (e.id.to_string(), e.source.to_string(), e.target.to_string());
        let mut cell = BytesStart::new(CELL_TAG);
        cell.push_attribute(("id", id.as_str()));
        cell.push_attribute(("value", e.link_type.map(LinkType::tag).unwrap_or("")));
        cell.push_attribute(("edge", "1"));
        cell.push_attribute(("parent", LAYER_CELL_ID));
        cell.push_attribute(("source", source.as_str()));
        cell.push_attribute(("target", target.as_str()));
        writer.write_event(Event::Start(cell))?;

        let mut geo = BytesStart::new(GEOMETRY_TAG);
        geo.push_attribute(("relative", "1"));
        geo.push_attribute(("as", "geometry"));
        writer.write_event(Event::Empty(geo))?;
        writer.write_event(Event::End(BytesEnd::new(CELL_TAG)))?;
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;
    writer.write_event(Event::End(BytesEnd::new(MODEL_TAG)))?;
    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

#[derive(Debug, Default)]
struct RawCell {
    attrs: HashMap<String, String>,
    geometry: Option<Geometry>,
}

impl RawCell {
    fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("1")
    }
}

fn read_attrs(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)?.into_owned();
        out.insert(key, value);
    }
    Ok(out)
}

fn parse_geometry(attrs: &HashMap<String, String>) -> Geometry {
    let num = |k: &str, default: f32| attrs.get(k).and_then(|v| v.trim().parse::<f32>().ok()).unwrap_or(default);
    Geometry::new(num("x", 0.0), num("y", 0.0), num("width", 80.0), num("height", 30.0))
}

/// Parse a document into cells with fresh identities.
///
/// Document ids that are valid UUIDs not present in `taken` are kept; everything
/// else gets a new id. Edges are resolved after all vertices are known.
pub fn decode(xml: &str, taken: &HashSet<CellId>) -> Result<DecodedDiagram> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut raw_cells: Vec<RawCell> = Vec::new();
    let mut open_cell: Option<RawCell> = None;
    let mut depth: usize = 0;
    let mut saw_model = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| anyhow!("malformed diagram XML at byte {}: {}", reader.buffer_position(), e))?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if depth == 0 {
                    if name != MODEL_TAG {
                        bail!("expected <{}> document element, found <{}>", MODEL_TAG, name);
                    }
                    saw_model = true;
                }
                depth += 1;
                if name == CELL_TAG {
                    open_cell = Some(RawCell { attrs: read_attrs(&e)?, geometry: None });
                } else if name == GEOMETRY_TAG {
                    if let Some(cell) = open_cell.as_mut() {
                        cell.geometry = Some(parse_geometry(&read_attrs(&e)?));
                    }
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if depth == 0 {
                    if name != MODEL_TAG {
                        bail!("expected <{}> document element, found <{}>", MODEL_TAG, name);
                    }
                    saw_model = true;
                } else if name == CELL_TAG {
                    raw_cells.push(RawCell { attrs: read_attrs(&e)?, geometry: None });
                } else if name == GEOMETRY_TAG {
                    if let Some(cell) = open_cell.as_mut() {
                        cell.geometry = Some(parse_geometry(&read_attrs(&e)?));
                    }
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if e.name().as_ref() == CELL_TAG.as_bytes() {
                    if let Some(cell) = open_cell.take() {
                        raw_cells.push(cell);
                    }
                }
            }
            Event::Text(t) if depth == 0 && !t.iter().all(u8::is_ascii_whitespace) => {
                bail!("text outside the <{}> document element", MODEL_TAG);
            }
            Event::CData(_) | Event::GeneralRef(_) if depth == 0 => {
                bail!("content outside the <{}> document element", MODEL_TAG);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_model {
        bail!("document has no <{}> element", MODEL_TAG);
    }
    if depth != 0 {
        bail!("document ended with {} unclosed element(s)", depth);
    }

    let mut used: HashSet<CellId> = taken.clone();
    let mut assign = |raw_id: Option<&str>| -> CellId {
        let kept = raw_id
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .filter(|id| !used.contains(id));
        let id = kept.unwrap_or_else(Uuid::now_v7);
        used.insert(id);
        id
    };

    let mut ids: HashMap<String, CellId> = HashMap::new();
    let mut decoded = DecodedDiagram::default();

    for raw in raw_cells.iter().filter(|c| c.flag("vertex")) {
        let id = assign(raw.get("id"));
        if let Some(doc_id) = raw.get("id") {
            ids.insert(doc_id.to_string(), id);
        }
        let geometry = raw.geometry.unwrap_or_else(|| Geometry::new(0.0, 0.0, 80.0, 30.0));
        let shape = raw.get("style").map(VertexShape::from_style_name).unwrap_or_default();
        let vertex = Vertex::with_id(id, raw.get("value").unwrap_or(DEFAULT_VERTEX_LABEL), geometry)
            .with_shape(shape)
            .with_description(raw.get("description").unwrap_or(""));
        decoded.vertices.push(vertex);
    }

    for raw in raw_cells.iter().filter(|c| c.flag("edge")) {
        let endpoints = (
            raw.get("source").and_then(|s| ids.get(s)).copied(),
            raw.get("target").and_then(|t| ids.get(t)).copied(),
        );
        let (Some(source), Some(target)) = endpoints else {
            debug!("dropping edge {:?}: endpoint not in document", raw.get("id"));
            decoded.dropped_edges += 1;
            continue;
        };
        let id = assign(raw.get("id"));
        let link_type = LinkType::parse_tag(raw.get("value").filter(|v| !v.is_empty()));
        decoded.edges.push(Edge::with_id(id, source, target).with_link_type(link_type));
    }

    Ok(decoded)
}

/// Decode `xml` and hand the cells to the surface as one import.
pub fn import_document(store: &mut GraphStore<CellModel>, xml: &str, mode: ImportMode) -> Result<Vec<CellId>> {
    let taken: HashSet<CellId> = match mode {
        ImportMode::Merge => store.cells().iter().map(Cell::id).collect(),
        ImportMode::Replace => HashSet::new(),
    };
    let decoded = decode(xml, &taken)?;
    if decoded.dropped_edges > 0 {
        warn!("import dropped {} edge(s) with missing endpoints", decoded.dropped_edges);
    }
    if mode == ImportMode::Replace {
        store.clear_all();
    }
    let cells = decoded.into_cells();
    Ok(store.update_surface(|surface| surface.import_cells(cells)))
}

/// Import that never fails: malformed or absent input leaves the store untouched.
pub fn import_or_ignore(store: &mut GraphStore<CellModel>, source: Option<&str>, mode: ImportMode) -> usize {
    let Some(xml) = source else {
        debug!("import skipped: no source loaded");
        return 0;
    };
    match import_document(store, xml, mode) {
        Ok(added) => added.len(),
        Err(e) => {
            warn!("import ignored: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_in_labels() {
        let v = Vertex::new("a < b & \"c\"", Geometry::new(1.0, 2.0, 3.0, 4.0)).with_description("<desc>");
        let bytes = encode(std::slice::from_ref(&v), &[]).expect("encode");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.contains("a &lt; b &amp; &quot;c&quot;"));
        let decoded = decode(&text, &HashSet::new()).expect("decode");
        assert_eq!(decoded.vertices[0].label, "a < b & \"c\"");
        assert_eq!(decoded.vertices[0].description, "<desc>");
    }

    #[test]
    fn rejects_foreign_and_truncated_documents() {
        assert!(decode("<svg/>", &HashSet::new()).is_err());
        assert!(decode("<mxGraphModel><root>", &HashSet::new()).is_err());
        assert!(decode("not xml at all", &HashSet::new()).is_err());
        assert!(decode("<mxGraphModel><root></mxCell></mxGraphModel>", &HashSet::new()).is_err());
    }

    #[test]
    fn rejects_stray_content_around_the_model() {
        let model = r#"<mxGraphModel><root><mxCell id="2" value="X" vertex="1"/></root></mxGraphModel>"#;
        assert!(decode(&format!("hello {}", model), &HashSet::new()).is_err());
        assert!(decode(&format!("{} trailing", model), &HashSet::new()).is_err());
        assert!(decode(&format!("<![CDATA[x]]>{}", model), &HashSet::new()).is_err());
        let decoded = decode(&format!("<?xml version=\"1.0\"?>\n{}\n", model), &HashSet::new()).expect("decode");
        assert_eq!(decoded.vertices.len(), 1);
    }

    #[test]
    fn foreign_ids_and_unknown_tags_are_normalized() {
        let xml = r#"<mxGraphModel><root>
            <mxCell id="0"/><mxCell id="1" parent="0"/>
            <mxCell id="2" value="A" vertex="1" parent="1"><mxGeometry x="10" y="20" width="80" height="30" as="geometry"/></mxCell>
            <mxCell id="3" value="B" vertex="1" parent="1"><mxGeometry x="200" y="20" width="80" height="30" as="geometry"/></mxCell>
            <mxCell id="4" value="Friend" edge="1" parent="1" source="2" target="3"/>
            <mxCell id="5" value="Type" edge="1" parent="1" source="2" target="99"/>
        </root></mxGraphModel>"#;
        let decoded = decode(xml, &HashSet::new()).expect("decode");
        assert_eq!(decoded.vertices.len(), 2);
        assert_eq!(decoded.edges.len(), 1);
        assert_eq!(decoded.dropped_edges, 1);
        assert_eq!(decoded.edges[0].link_type, None);
        assert_eq!(decoded.edges[0].source, decoded.vertices[0].id);
        assert_eq!(decoded.vertices[1].geometry.x, 200.0);
    }

    #[test]
    fn taken_ids_are_reassigned() {
        let v = Vertex::new("A", Geometry::new(0.0, 0.0, 10.0, 10.0));
        let bytes = encode(std::slice::from_ref(&v), &[]).expect("encode");
        let text = String::from_utf8(bytes).expect("utf8");
        let fresh = decode(&text, &HashSet::new()).expect("decode");
        assert_eq!(fresh.vertices[0].id, v.id);
        let clashing = decode(&text, &HashSet::from([v.id])).expect("decode");
        assert_ne!(clashing.vertices[0].id, v.id);
    }
}
