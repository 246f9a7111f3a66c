//! Proximity clustering of weighted vectors.
//!
//! Items are single-linkage clustered: any two items within the threshold are
//! joined, and groups are the connected components of that relation. All
//! pairs are compared, so cost grows quadratically with the item count; the
//! detectors feeding this produce tens of items per image at most.

use crate::error::FocalPointError;
use crate::ranking::{sort_by_weight_desc, Weighted};
use crate::vector::{weighted_average, Vector, WeightedVector};

/// Default grouping tolerance in normalized units.
pub const DEFAULT_THRESHOLD: f64 = 0.05;

/// A cluster of mutually proximate weighted vectors, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    items: Vec<WeightedVector>,
}

impl Group {
    /// Members of the group.
    pub fn items(&self) -> &[WeightedVector] {
        &self.items
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the group has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the member weights.
    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(WeightedVector::weight).sum()
    }

    /// Weighted mean position of the members.
    pub fn average(&self) -> Result<Vector, FocalPointError> {
        weighted_average(&self.items)
    }
}

impl Weighted for Group {
    fn weight(&self) -> f64 {
        self.total_weight()
    }
}

/// Disjoint-set forest with path halving and union by rank.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
    }
}

/// Partition `items` into groups of items linked by distance ≤ `threshold`.
///
/// Every item lands in exactly one group. Groups are ordered by the index of
/// their first member, and members keep their input order.
pub fn group_by_distance(
    items: &[WeightedVector],
    threshold: f64,
) -> Result<Vec<Group>, FocalPointError> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(FocalPointError::InvalidThreshold(threshold));
    }

    let mut sets = DisjointSet::new(items.len());
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if items[i].distance_to(&items[j])? <= threshold {
                sets.union(i, j);
            }
        }
    }

    let mut slot_of_root: Vec<Option<usize>> = vec![None; items.len()];
    let mut groups: Vec<Group> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let root = sets.find(index);
        let slot = match slot_of_root[root] {
            Some(slot) => slot,
            None => {
                groups.push(Group::default());
                slot_of_root[root] = Some(groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].items.push(item.clone());
    }
    Ok(groups)
}

/// Order groups by member count, largest first; ties keep their order.
pub fn sort_groups_by_size(groups: &mut [Group]) {
    groups.sort_by(|a, b| b.len().cmp(&a.len()));
}

/// Order groups by total weight, heaviest first; ties keep their order.
pub fn sort_groups_by_weight(groups: &mut [Group]) {
    sort_by_weight_desc(groups);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wv(x: f64, y: f64, weight: f64) -> WeightedVector {
        WeightedVector::new(Vector::new([x, y]), weight).unwrap()
    }

    fn scenario() -> Vec<WeightedVector> {
        vec![
            wv(0.10, 0.10, 1.0),
            wv(0.12, 0.10, 1.0),
            wv(0.13, 0.12, 2.0),
            wv(0.90, 0.90, 3.0),
            wv(0.91, 0.93, 3.0),
            wv(0.52, 0.90, 5.0),
        ]
    }

    /// Small deterministic generator so property checks need no extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next_unit(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }

        fn points(&mut self, count: usize) -> Vec<WeightedVector> {
            (0..count)
                .map(|_| {
                    let (x, y, w) = (self.next_unit(), self.next_unit(), self.next_unit());
                    wv(x, y, w * 10.0)
                })
                .collect()
        }
    }

    #[test]
    fn scenario_yields_three_groups() {
        let mut groups = group_by_distance(&scenario(), DEFAULT_THRESHOLD).unwrap();
        let sizes: Vec<usize> = groups.iter().map(Group::len).collect();
        assert_eq!(sizes, vec![3, 2, 1]);

        sort_groups_by_weight(&mut groups);
        let weights: Vec<f64> = groups.iter().map(Group::total_weight).collect();
        assert_eq!(weights, vec![6.0, 5.0, 4.0]);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[2].len(), 3);
    }

    #[test]
    fn sort_by_size_is_stable() {
        let items = vec![
            wv(0.1, 0.1, 1.0),
            wv(0.5, 0.5, 1.0),
            wv(0.51, 0.5, 1.0),
            wv(0.9, 0.9, 1.0),
        ];
        let mut groups = group_by_distance(&items, DEFAULT_THRESHOLD).unwrap();
        sort_groups_by_size(&mut groups);
        let firsts: Vec<f64> = groups
            .iter()
            .map(|g| g.items()[0].vector().components()[0].value())
            .collect();
        assert_eq!(firsts, vec![0.5, 0.1, 0.9]);
    }

    #[test]
    fn single_linkage_chains_through_intermediate_items() {
        let items = vec![
            WeightedVector::new(Vector::new([0.10]), 1.0).unwrap(),
            WeightedVector::new(Vector::new([0.14]), 1.0).unwrap(),
            WeightedVector::new(Vector::new([0.18]), 1.0).unwrap(),
        ];
        let groups = group_by_distance(&items, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn groups_partition_the_input() {
        let mut rng = Lcg(7);
        for threshold in [0.0, 0.02, 0.05, 0.2, 1.5] {
            let items = rng.points(40);
            let groups = group_by_distance(&items, threshold).unwrap();
            let mut seen: Vec<&WeightedVector> =
                groups.iter().flat_map(|g| g.items().iter()).collect();
            assert_eq!(seen.len(), items.len());
            for item in &items {
                let position = seen
                    .iter()
                    .position(|s| *s == item)
                    .expect("every input item belongs to a group");
                seen.swap_remove(position);
            }
            assert!(groups.iter().all(|g| !g.is_empty()));
        }
    }

    #[test]
    fn larger_threshold_never_adds_groups() {
        let mut rng = Lcg(42);
        for _ in 0..10 {
            let items = rng.points(30);
            let mut previous = usize::MAX;
            for step in 0..20 {
                let threshold = step as f64 * 0.02;
                let count = group_by_distance(&items, threshold).unwrap().len();
                assert!(count <= previous, "threshold {threshold} grew to {count}");
                previous = count;
            }
        }
    }

    #[test]
    fn empty_input_gives_no_groups() {
        assert!(group_by_distance(&[], DEFAULT_THRESHOLD).unwrap().is_empty());
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        assert!(matches!(
            group_by_distance(&scenario(), -0.1),
            Err(FocalPointError::InvalidThreshold(_))
        ));
        assert!(group_by_distance(&scenario(), f64::NAN).is_err());
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let items = vec![
            WeightedVector::new(Vector::new([0.1]), 1.0).unwrap(),
            wv(0.1, 0.1, 1.0),
        ];
        assert!(matches!(
            group_by_distance(&items, DEFAULT_THRESHOLD),
            Err(FocalPointError::DimensionMismatch { .. })
        ));
    }
}
