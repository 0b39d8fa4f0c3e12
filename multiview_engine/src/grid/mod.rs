//! Grid module - the rig of calibrated views and its live topology edits.

mod tiling;
mod view_grid;
mod view_ids;

pub use tiling::{cell_rect, slice};
pub use view_grid::{grid_matrix, lattice_positions, ViewGrid};
pub use view_ids::ViewIdAllocator;
