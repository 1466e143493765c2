//! Fixed-capacity rolling window.

/// Ring buffer of the most recent `capacity` values.
///
/// Storage is allocated once; pushing past capacity overwrites the oldest
/// slot. `len` counts occupied slots.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    buf: Box<[f64]>,
    /// Index the next push writes to.
    head: usize,
    len: usize,
}

impl RollingWindow {
    /// Create an empty window. Capacity is at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(1)].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a value, evicting the oldest when full.
    pub fn push(&mut self, value: f64) {
        self.buf[self.head] = value;
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    /// Values oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let start = (self.head + self.capacity() - self.len) % self.capacity();
        (0..self.len).map(move |i| self.buf[(start + i) % self.capacity()])
    }

    /// Median over occupied slots; mean of the middle pair when even.
    pub fn median(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let mut values: Vec<f64> = self.iter().collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let mid = values.len() / 2;
        if values.len() % 2 == 0 {
            Some((values[mid - 1] + values[mid]) / 2.0)
        } else {
            Some(values[mid])
        }
    }
}
