//! Rectangular cell windows

/// Half-open rectangle of cells `[row_start, row_end) x [col_start, col_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Window {
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// The whole `rows` x `cols` grid
    pub fn full(rows: usize, cols: usize) -> Self {
        Self::new(0, rows, 0, cols)
    }

    pub fn rows(&self) -> usize {
        self.row_end.saturating_sub(self.row_start)
    }

    pub fn cols(&self) -> usize {
        self.col_end.saturating_sub(self.col_start)
    }

    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_start && row < self.row_end && col >= self.col_start && col < self.col_end
    }

    /// Smallest window covering both
    pub fn union(&self, other: &Window) -> Window {
        Window::new(
            self.row_start.min(other.row_start),
            self.row_end.max(other.row_end),
            self.col_start.min(other.col_start),
            self.col_end.max(other.col_end),
        )
    }

    /// Overlap of both windows, `None` if disjoint
    pub fn intersection(&self, other: &Window) -> Option<Window> {
        let w = Window::new(
            self.row_start.max(other.row_start),
            self.row_end.min(other.row_end),
            self.col_start.max(other.col_start),
            self.col_end.min(other.col_end),
        );
        (!w.is_empty()).then_some(w)
    }

    /// Grow by `cells` on every side, clamped to a `rows` x `cols` grid
    pub fn expand(&self, cells: usize, rows: usize, cols: usize) -> Window {
        Window::new(
            self.row_start.saturating_sub(cells),
            (self.row_end + cells).min(rows),
            self.col_start.saturating_sub(cells),
            (self.col_end + cells).min(cols),
        )
    }

    /// Iterate (row, col) in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.row_start..self.row_end)
            .flat_map(move |row| (self.col_start..self.col_end).map(move |col| (row, col)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_ops() {
        let a = Window::new(0, 4, 0, 4);
        let b = Window::new(2, 6, 3, 8);
        assert_eq!(a.union(&b), Window::new(0, 6, 0, 8));
        assert_eq!(a.intersection(&b), Some(Window::new(2, 4, 3, 4)));
        assert!(a.intersection(&Window::new(5, 6, 5, 6)).is_none());
        assert_eq!(a.len(), 16);
        assert_eq!(b.cells().next(), Some((2, 3)));
        assert_eq!(b.cells().count(), b.len());
    }

    #[test]
    fn test_window_expand_clamps() {
        let w = Window::new(1, 3, 1, 3).expand(2, 4, 5);
        assert_eq!(w, Window::new(0, 4, 0, 5));
    }
}
