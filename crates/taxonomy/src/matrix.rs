use crate::error::{Result, TaxonomyError};

/// The contradiction matrix: a directed lookup from an (improving, degrading)
/// parameter pair to the recommended principle IDs.
///
/// Row `i` / column `j` correspond to parameter IDs `i + 1` / `j + 1`. The
/// grid is normalized at parse time: every cell is a (possibly empty) list of
/// principle IDs, never a raw string.
#[derive(Debug, Clone)]
pub struct ContradictionMatrix {
    cells: Vec<Vec<Vec<u32>>>,
    cols: usize,
}

impl ContradictionMatrix {
    /// Parse a semicolon-delimited grid. Each row is one improving parameter;
    /// each cell is either empty or a comma-separated list of principle IDs.
    ///
    /// Cell tokens that fail integer parsing are skipped, not fatal: the
    /// published grids circulate with footnote markers and stray whitespace.
    /// Structural problems (ragged rows, empty grid) do fail the load.
    pub fn parse(raw: &str, file: &'static str) -> Result<Self> {
        let mut cells: Vec<Vec<Vec<u32>>> = Vec::new();
        let mut cols = 0;

        for (row_idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let row: Vec<Vec<u32>> = line.split(';').map(parse_cell).collect();

            if cells.is_empty() {
                cols = row.len();
            } else if row.len() != cols {
                return Err(TaxonomyError::data_load(
                    file,
                    format!(
                        "row {} has {} columns, expected {}",
                        row_idx + 1,
                        row.len(),
                        cols
                    ),
                ));
            }
            cells.push(row);
        }

        if cells.is_empty() {
            return Err(TaxonomyError::data_load(file, "matrix grid is empty"));
        }

        log::debug!("Parsed contradiction matrix {}x{}", cells.len(), cols);

        Ok(Self { cells, cols })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Principle IDs at the zero-based `(row, col)` cell, or `None` when the
    /// indices fall outside the grid.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&[u32]> {
        self.cells.get(row)?.get(col).map(Vec::as_slice)
    }
}

fn parse_cell(cell: &str) -> Vec<u32> {
    cell.split(',')
        .filter_map(|token| {
            let token = token.trim();
            if token.is_empty() {
                return None;
            }
            match token.parse::<u32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    // Lenient-skip policy for noisy source grids.
                    log::debug!("Skipping non-numeric matrix cell token '{token}'");
                    None
                }
            }
        })
        .collect()
}
