pub mod cell;
pub mod graph;
pub mod surface;
