use std::path::{Path, PathBuf};

use crate::tables::{EdgeTable, VertexTable};

// Write both table projections as CSV next to `base_path`
pub fn export_tables_csv(
    vertices: &VertexTable<'_>,
    edges: &EdgeTable<'_>,
    base_path: &Path,
) -> std::io::Result<(PathBuf, PathBuf)> {
    let parent = base_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let stem = base_path.file_stem().and_then(|s| s.to_str()).unwrap_or("diagram");
    let vertices_path = parent.join(format!("{}_vertices.csv", stem));
    let edges_path = parent.join(format!("{}_edges.csv", stem));
    {
        let mut wtr = csv::Writer::from_path(&vertices_path)?;
        wtr.write_record(VertexTable::COLUMNS)?;
        for row in vertices.rows() {
            wtr.write_record(&[row.id.to_string(), row.label, row.description])?;
        }
        wtr.flush()?;
    }
    {
        let mut wtr = csv::Writer::from_path(&edges_path)?;
        wtr.write_record(EdgeTable::COLUMNS)?;
        for row in edges.rows() {
            wtr.write_record(&[row.id.to_string(), row.source_label, row.relationship_label, row.target_label])?;
        }
        wtr.flush()?;
    }
    Ok((vertices_path, edges_path))
}
