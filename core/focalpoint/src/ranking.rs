//! Stable descending ordering of weighted items.

use crate::vector::WeightedVector;

/// Anything that carries a scalar weight for ranking.
pub trait Weighted {
    /// The ranking key; larger ranks first.
    fn weight(&self) -> f64;
}

impl Weighted for WeightedVector {
    fn weight(&self) -> f64 {
        WeightedVector::weight(self)
    }
}

/// Sort `items` by weight, heaviest first.
///
/// The sort is stable: items of equal weight keep their relative order.
pub fn sort_by_weight_desc<T: Weighted>(items: &mut [T]) {
    if items.len() <= 1 {
        return;
    }
    items.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
}
