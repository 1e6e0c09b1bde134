//! Groups face embeddings into person clusters.
//!
//! Two faces are linked when their cosine distance is below the configured
//! threshold; clusters are the connected components of that relation. The
//! minimum group size is one, so a face resembling nothing else in the
//! album forms its own singleton cluster.

use color_eyre::{Result, eyre::eyre};

/// One detected face: the photo it came from and its unit-normalized
/// embedding.
#[derive(Debug, Clone)]
pub struct FaceSample {
    pub photo_id: String,
    pub embedding: Vec<f32>,
}

/// Scales a vector to unit length. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine distance between two equal-length unit vectors.
fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(eyre!("Vectors must have the same dimension"));
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    Ok(1.0 - dot)
}

/// Partitions sample indices into clusters. Deterministic for a fixed
/// input order: groups are ordered by their first member's index and group
/// members keep input order.
pub fn assign_clusters(samples: &[FaceSample], threshold: f32) -> Result<Vec<Vec<usize>>> {
    let mut components = UnionFind::new(samples.len());
    for i in 0..samples.len() {
        for j in (i + 1)..samples.len() {
            let distance = cosine_distance(&samples[i].embedding, &samples[j].embedding)?;
            if distance < threshold {
                components.union(i, j);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: Vec<Option<usize>> = vec![None; samples.len()];
    for index in 0..samples.len() {
        let root = components.find(index);
        match group_of_root[root] {
            Some(group) => groups[group].push(index),
            None => {
                group_of_root[root] = Some(groups.len());
                groups.push(vec![index]);
            }
        }
    }
    Ok(groups)
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Smaller root wins, keeping component labels stable.
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(photo_id: &str, embedding: Vec<f32>) -> FaceSample {
        let mut embedding = embedding;
        normalize(&mut embedding);
        FaceSample {
            photo_id: photo_id.to_string(),
            embedding,
        }
    }

    #[test]
    fn normalize_produces_unit_vectors() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn close_faces_group_and_distant_faces_stay_apart() {
        let samples = vec![
            sample("p1", vec![1.0, 0.0, 0.0]),
            sample("p2", vec![0.99, 0.1, 0.0]),
            sample("p3", vec![0.0, 1.0, 0.0]),
        ];
        let groups = assign_clusters(&samples, 0.35).unwrap();
        assert_eq!(groups, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn every_face_is_assigned_even_as_a_singleton() {
        let samples = vec![
            sample("p1", vec![1.0, 0.0]),
            sample("p2", vec![0.0, 1.0]),
            sample("p3", vec![-1.0, 0.0]),
        ];
        let groups = assign_clusters(&samples, 0.1).unwrap();
        assert_eq!(groups.len(), 3);
        let assigned: usize = groups.iter().map(Vec::len).sum();
        assert_eq!(assigned, samples.len());
    }

    #[test]
    fn grouping_is_transitive_through_a_chain() {
        // a~b and b~c link a and c even though a and c are farther apart.
        let samples = vec![
            sample("p1", vec![1.0, 0.0]),
            sample("p2", vec![0.95, 0.312]),
            sample("p3", vec![0.81, 0.586]),
        ];
        let groups = assign_clusters(&samples, 0.06).unwrap();
        assert_eq!(groups, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn repeated_runs_yield_the_same_partition() {
        let samples = vec![
            sample("p1", vec![1.0, 0.0, 0.2]),
            sample("p2", vec![0.9, 0.1, 0.25]),
            sample("p3", vec![0.0, 1.0, 0.0]),
            sample("p4", vec![0.05, 0.95, 0.1]),
        ];
        let first = assign_clusters(&samples, 0.35).unwrap();
        let second = assign_clusters(&samples, 0.35).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn a_larger_threshold_merges_more_aggressively() {
        let samples = vec![
            sample("p1", vec![1.0, 0.0]),
            sample("p2", vec![0.8, 0.6]),
        ];
        assert_eq!(assign_clusters(&samples, 0.05).unwrap().len(), 2);
        assert_eq!(assign_clusters(&samples, 0.5).unwrap().len(), 1);
    }

    #[test]
    fn mismatched_dimensions_are_an_error() {
        let samples = vec![sample("p1", vec![1.0, 0.0]), sample("p2", vec![1.0])];
        assert!(assign_clusters(&samples, 0.35).is_err());
    }
}
