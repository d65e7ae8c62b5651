//! Row-range chunking for tables processed in parallel
//!
//! A table of `total` rows is cut into exactly `count` contiguous,
//! order-preserving ranges of `ceil(total / count)` rows. The last ranges may
//! be shorter, or empty when there are fewer rows than `count * size`.
//! Chunk membership depends on row order only.

use std::ops::Range;

/// A contiguous range of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowChunk {
    /// Position of this chunk in submission order
    pub index: usize,
    /// First row of the chunk in the source table
    pub offset: usize,
    /// Number of rows in this chunk
    pub len: usize,
}

impl RowChunk {
    pub fn new(index: usize, offset: usize, len: usize) -> Self {
        Self { index, offset, len }
    }

    pub fn rows(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Iterator over the chunks covering a table
pub struct ChunkIterator {
    total: usize,
    count: usize,
    size: usize,
    current: usize,
}

impl ChunkIterator {
    /// Create a new chunk iterator. A `count` of zero yields no chunks.
    pub fn new(total: usize, count: usize) -> Self {
        Self {
            total,
            count,
            size: chunk_size(total, count),
            current: 0,
        }
    }
}

impl Iterator for ChunkIterator {
    type Item = RowChunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.count {
            return None;
        }

        let start = (self.current * self.size).min(self.total);
        let end = (start + self.size).min(self.total);
        let chunk = RowChunk::new(self.current, start, end - start);

        self.current += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.current.min(self.count);
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChunkIterator {}

/// `ceil(total / count)`, zero when `count` is zero
fn chunk_size(total: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        total.div_ceil(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_count_and_sizes() {
        let chunks: Vec<_> = ChunkIterator::new(20, 6).collect();
        assert_eq!(chunks.len(), 6);
        let lens: Vec<usize> = chunks.iter().map(|c| c.len).collect();
        assert_eq!(lens, vec![4, 4, 4, 4, 4, 0]);
    }

    #[test]
    fn test_fewer_rows_than_chunks() {
        let chunks: Vec<_> = ChunkIterator::new(7, 6).collect();
        let lens: Vec<usize> = chunks.iter().map(|c| c.len).collect();
        assert_eq!(lens, vec![2, 2, 2, 1, 0, 0]);
        assert!(chunks[5].is_empty());
        assert_eq!(chunks[5].offset, 7);
    }

    #[test]
    fn test_empty_table() {
        let chunks: Vec<_> = ChunkIterator::new(0, 4).collect();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(RowChunk::is_empty));
    }

    #[test]
    fn test_chunk_coverage() {
        for total in [0, 1, 5, 6, 7, 99, 100, 101] {
            for count in 1..=8 {
                let mut covered = vec![0u8; total];
                let mut next = 0;
                for chunk in ChunkIterator::new(total, count) {
                    // contiguous and in submission order
                    assert_eq!(chunk.offset, next.min(total));
                    for r in chunk.rows() {
                        covered[r] += 1;
                    }
                    next = chunk.offset + chunk.len;
                }
                assert!(covered.iter().all(|&c| c == 1), "total={} count={}", total, count);
            }
        }
    }

    #[test]
    fn test_middle_chunk_rows() {
        let chunk = ChunkIterator::new(10, 3).nth(1).unwrap();
        assert_eq!(chunk.index, 1);
        assert_eq!(chunk.rows(), 4..8);
    }
}
