pub mod edge_table;
pub mod labels;
pub mod vertex_table;

pub use edge_table::{EdgeRow, EdgeTable};
pub use labels::{LinkPerspective, Locale};
pub use vertex_table::{VertexRow, VertexTable};
