//! Square-tile grid for the gallery step.

use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cols: usize,
    pub rows: usize,
    pub tile_size: f64,
}

impl GridLayout {
    /// Columns and rows for `n` square tiles filling a `width` by `height`
    /// area, columns estimated from the aspect ratio.
    pub fn calculate(n: usize, width: f64, height: f64) -> Self {
        if n == 0 || width <= 0.0 || height <= 0.0 {
            return GridLayout {
                cols: 0,
                rows: 0,
                tile_size: 0.0,
            };
        }
        let aspect = width / height;
        let mut cols = ((n as f64 * aspect).sqrt().ceil() as usize).max(1);
        let mut rows = n.div_ceil(cols);
        while cols * rows < n {
            cols += 1;
            rows = n.div_ceil(cols);
        }
        let tile_size = (width / cols as f64).min(height / rows as f64);
        GridLayout { cols, rows, tile_size }
    }

    /// Top-left corner of tile `index`, relative to `origin`.
    pub fn cell(&self, index: usize, origin: Point) -> Point {
        if self.cols == 0 {
            return origin;
        }
        let row = index / self.cols;
        let col = index % self.cols;
        Point::new(
            origin.x + col as f64 * self.tile_size,
            origin.y + row as f64 * self.tile_size,
        )
    }

    pub fn extent(&self) -> (f64, f64) {
        (self.cols as f64 * self.tile_size, self.rows as f64 * self.tile_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_tiles_in_a_square_make_three_by_three() {
        let g = GridLayout::calculate(9, 300.0, 300.0);
        assert_eq!((g.cols, g.rows), (3, 3));
        assert_eq!(g.tile_size, 100.0);
        assert_eq!(g.cell(4, Point::new(10.0, 0.0)), Point::new(110.0, 100.0));
    }

    #[test]
    fn wide_area_gets_more_columns() {
        let g = GridLayout::calculate(9, 400.0, 100.0);
        assert_eq!((g.cols, g.rows), (6, 2));
        assert!(g.cols * g.rows >= 9);
        // Height is the limit: two rows of 50.
        assert_eq!(g.tile_size, 50.0);
    }

    #[test]
    fn zero_tiles_is_an_empty_grid() {
        let g = GridLayout::calculate(0, 100.0, 100.0);
        assert_eq!(g.extent(), (0.0, 0.0));
    }
}
