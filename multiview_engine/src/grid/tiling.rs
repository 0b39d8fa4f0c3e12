/// Even partition of the grid's fixed pixel area.
///
/// Integer slice boundaries are `i * total / count`, so consecutive
/// slices share an edge and the last one ends exactly at `total`.

use glam::UVec2;

/// Start and length of slice `index` out of `count` slices of `total`
pub fn slice(total: u32, count: usize, index: usize) -> (u32, u32) {
    debug_assert!(count > 0 && index < count);
    let total = total as u64;
    let count = count as u64;
    let index = index as u64;
    let start = index * total / count;
    let end = (index + 1) * total / count;
    (start as u32, (end - start) as u32)
}

/// Viewport origin and size of cell (`row`, `column`) for ragged rows
pub fn cell_rect(
    grid_resolution: UVec2,
    row_columns: &[usize],
    row: usize,
    column: usize,
) -> (UVec2, UVec2) {
    let (y, height) = slice(grid_resolution.y, row_columns.len(), row);
    let (x, width) = slice(grid_resolution.x, row_columns[row], column);
    (UVec2::new(x, y), UVec2::new(width, height))
}

#[cfg(test)]
#[path = "tiling_tests.rs"]
mod tests;
