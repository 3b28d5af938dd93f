use sopdesk_core::types::{Chunk, DistanceMetric, SearchHit};
use sopdesk_core::{Error, Result};

#[derive(Debug, Clone)]
struct IndexEntry {
    vector: Vec<f32>,
    text: String,
    ordinal: usize,
}

/// Exact (brute-force) nearest-neighbour index.
///
/// Built once from a complete set of vectors; there is no insert, update or
/// delete. Results come back in ascending distance, and entries at equal
/// distance keep their insertion order.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    metric: DistanceMetric,
    dim: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build from `(vector, chunk_text)` pairs; ordinals follow input order.
    pub fn build(metric: DistanceMetric, items: Vec<(Vec<f32>, String)>) -> Result<Self> {
        let mut entries = Vec::with_capacity(items.len());
        for (ordinal, (vector, text)) in items.into_iter().enumerate() {
            entries.push(IndexEntry { vector, text, ordinal });
        }
        Self::from_entries(metric, entries)
    }

    /// Build from chunks and their vectors, which must correspond 1:1.
    pub fn from_chunks(metric: DistanceMetric, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::Provider(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                vectors.len()
            )));
        }
        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { vector, text: chunk.text, ordinal: chunk.ordinal })
            .collect();
        Self::from_entries(metric, entries)
    }

    pub fn empty(metric: DistanceMetric) -> Self {
        Self { metric, dim: None, entries: Vec::new() }
    }

    fn from_entries(metric: DistanceMetric, entries: Vec<IndexEntry>) -> Result<Self> {
        let dim = entries.first().map(|e| e.vector.len());
        if let Some(dim) = dim {
            if let Some(bad) = entries.iter().find(|e| e.vector.len() != dim) {
                return Err(Error::Provider(format!(
                    "chunk {} has a {}-dimensional vector, expected {}",
                    bad.ordinal,
                    bad.vector.len(),
                    dim
                )));
            }
        }
        Ok(Self { metric, dim, entries })
    }

    /// Vector dimensionality, `None` for an empty index.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// At most `k` hits, closest first. An empty index always returns no hits.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let Some(dim) = self.dim else { return Ok(Vec::new()) };
        if vector.len() != dim {
            return Err(Error::Provider(format!(
                "query vector has {} dimensions, index has {}",
                vector.len(),
                dim
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, distance(self.metric, vector, &e.vector)))
            .collect();
        // stable sort: equal distances keep insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| {
                let e = &self.entries[i];
                SearchHit { ordinal: e.ordinal, text: e.text.clone(), distance }
            })
            .collect())
    }
}

pub fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        DistanceMetric::Cosine => {
            let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if na == 0.0 || nb == 0.0 {
                1.0
            } else {
                (1.0 - dot / (na * nb)).max(0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_of_parallel_vectors_is_zero() {
        let d = distance(DistanceMetric::Cosine, &[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!(d.abs() < 1e-6);
        assert_eq!(distance(DistanceMetric::Cosine, &[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn l2_distance_is_squared_euclidean() {
        assert_eq!(distance(DistanceMetric::L2, &[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }
}
