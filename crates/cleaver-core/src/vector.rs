//! Sparse numeric vectors used when evaluating raw models.

/// A sparse vector with strictly increasing indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(u32, f64)>,
}

impl SparseVector {
    /// Builds a vector from unordered pairs, summing values that share an index.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, f64)>,
    {
        let mut entries: Vec<(u32, f64)> = pairs.into_iter().collect();
        entries.sort_by_key(|&(index, _)| index);

        let mut merged: Vec<(u32, f64)> = Vec::with_capacity(entries.len());
        for (index, value) in entries {
            match merged.last_mut() {
                Some((last, sum)) if *last == index => *sum += value,
                _ => merged.push((index, value)),
            }
        }
        Self { entries: merged }
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest index present, if any.
    pub fn max_index(&self) -> Option<u32> {
        self.entries.last().map(|&(index, _)| index)
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a, x) = self.entries[i];
            let (b, y) = other.entries[j];
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += x * y;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn squared_norm(&self) -> f64 {
        self.entries.iter().map(|&(_, v)| v * v).sum()
    }

    pub fn squared_distance(&self, other: &SparseVector) -> f64 {
        (self.squared_norm() + other.squared_norm() - 2.0 * self.dot(other)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_sorts_and_merges() {
        let v = SparseVector::from_pairs([(3, 1.0), (1, 2.0), (3, 0.5)]);
        assert_eq!(v.entries(), &[(1, 2.0), (3, 1.5)]);
        assert_eq!(v.max_index(), Some(3));
    }

    #[test]
    fn test_dot_and_distance() {
        let a = SparseVector::from_pairs([(1, 1.0), (2, 2.0)]);
        let b = SparseVector::from_pairs([(2, 3.0), (5, 1.0)]);
        assert!((a.dot(&b) - 6.0).abs() < 1e-12);
        assert!((a.squared_distance(&b) - (1.0 + 1.0 + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_empty_vector() {
        let v = SparseVector::default();
        assert!(v.is_empty());
        assert_eq!(v.dot(&SparseVector::from_pairs([(1, 1.0)])), 0.0);
    }
}
