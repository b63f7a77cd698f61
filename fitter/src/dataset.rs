//! Dataset partitioning state for one assimilation run.

/// One observed sample. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Prefix-growing view over the dataset.
///
/// `cursor` is the length of the currently trusted prefix. It never
/// decreases; excluding the probe point removes it from the backing vector
/// at index `cursor`, so the same index then names the next candidate.
#[derive(Debug)]
pub struct WorkingSet {
    points: Vec<Point>,
    cursor: usize,
}

impl WorkingSet {
    /// Creates the working set with `seed` already-trusted leading points.
    ///
    /// The caller validates `seed <= points.len()` up front.
    pub fn new(points: Vec<Point>, seed: usize) -> Self {
        debug_assert!(seed <= points.len());
        Self {
            points,
            cursor: seed,
        }
    }

    /// The trusted prefix, i.e. the points the next fit request is built from.
    pub fn trusted(&self) -> &[Point] {
        &self.points[..self.cursor]
    }

    /// The candidate point right behind the trusted prefix, if any.
    pub fn probe(&self) -> Option<Point> {
        self.points.get(self.cursor).copied()
    }

    /// Trusts the probe point.
    pub fn accept(&mut self) {
        debug_assert!(self.cursor < self.points.len());
        self.cursor += 1;
    }

    /// Removes and returns the probe point. The cursor stays put, so it now
    /// names the point that came after the excluded one.
    pub fn exclude(&mut self) -> Point {
        debug_assert!(self.cursor < self.points.len());
        self.points.remove(self.cursor)
    }

    /// Points not yet either trusted or excluded.
    pub fn remaining(&self) -> usize {
        self.points.len() - self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.cursor == self.points.len()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

/// Append-only collection of excluded points. Never reconsidered.
#[derive(Debug, Default)]
pub struct AnomalySet {
    points: Vec<Point>,
}

impl AnomalySet {
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

#[cfg(test)]
mod tests {
    use super::{Point, WorkingSet};

    fn points() -> Vec<Point> {
        (0..5).map(|i| Point::new(i as f64, (i * i) as f64)).collect()
    }

    #[test]
    fn accept_advances_the_cursor_over_a_fixed_backing() {
        let mut ws = WorkingSet::new(points(), 3);
        assert_eq!(ws.trusted().len(), 3);
        assert_eq!(ws.probe(), Some(Point::new(3.0, 9.0)));

        ws.accept();
        assert_eq!(ws.cursor(), 4);
        assert_eq!(ws.probe(), Some(Point::new(4.0, 16.0)));

        ws.accept();
        assert!(ws.is_done());
        assert_eq!(ws.probe(), None);
    }

    #[test]
    fn exclude_keeps_the_cursor_and_shrinks_the_backing() {
        let mut ws = WorkingSet::new(points(), 3);
        let gone = ws.exclude();

        assert_eq!(gone, Point::new(3.0, 9.0));
        assert_eq!(ws.cursor(), 3);
        assert_eq!(ws.len(), 4);
        // Index 3 now names what used to be index 4.
        assert_eq!(ws.probe(), Some(Point::new(4.0, 16.0)));
    }

    #[test]
    fn remaining_strictly_decreases_under_both_transitions() {
        let mut ws = WorkingSet::new(points(), 3);
        assert_eq!(ws.remaining(), 2);
        ws.accept();
        assert_eq!(ws.remaining(), 1);
        ws.exclude();
        assert_eq!(ws.remaining(), 0);
        assert!(ws.is_done());
    }
}
