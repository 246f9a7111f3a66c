//! Normalized positions, vectors of positions, and weighted vectors.

use crate::error::FocalPointError;

/// A normalized coordinate along one image axis.
///
/// Values are meant to lie in `[0, 1]` (a fraction of the image width or
/// height); values outside that range are representable but not
/// [valid](Position::is_valid).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position(pub f64);

impl Position {
    /// The raw coordinate.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Absolute difference between two positions.
    pub fn distance_to(self, other: Position) -> f64 {
        (self.0 - other.0).abs()
    }

    /// True when the position lies in `[0, 1]`.
    pub fn is_valid(self) -> bool {
        (0.0..=1.0).contains(&self.0)
    }
}

/// An ordered, fixed-length sequence of positions, one per axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vector {
    components: Vec<Position>,
}

impl Vector {
    /// Build a vector from raw coordinates.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            components: values.into_iter().map(Position).collect(),
        }
    }

    /// All-zero vector of the given dimension.
    pub fn zeros(dimension: usize) -> Self {
        Self {
            components: vec![Position::default(); dimension],
        }
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    /// Components in axis order.
    pub fn components(&self) -> &[Position] {
        &self.components
    }

    /// Component on `axis`, if present.
    pub fn get(&self, axis: usize) -> Option<Position> {
        self.components.get(axis).copied()
    }

    /// True when every component lies in `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.components.iter().all(|p| p.is_valid())
    }

    /// Euclidean distance to `other`.
    ///
    /// Zero for 0-dimensional vectors and the absolute difference for
    /// 1-dimensional ones.
    pub fn distance_to(&self, other: &Vector) -> Result<f64, FocalPointError> {
        ensure_same_dimension(self.dimension(), other.dimension())?;
        let distance = match self.dimension() {
            0 => 0.0,
            1 => self.components[0].distance_to(other.components[0]),
            2 => {
                let dx = self.components[0].distance_to(other.components[0]);
                let dy = self.components[1].distance_to(other.components[1]);
                dx.hypot(dy)
            }
            _ => self
                .components
                .iter()
                .zip(&other.components)
                .map(|(a, b)| {
                    let d = a.distance_to(*b);
                    d * d
                })
                .sum::<f64>()
                .sqrt(),
        };
        Ok(distance)
    }

    /// Project onto a subset (or reordering) of axes.
    pub fn select(&self, axes: &[usize]) -> Result<Vector, FocalPointError> {
        let components = axes
            .iter()
            .map(|&index| {
                self.get(index).ok_or(FocalPointError::IndexOutOfRange {
                    index,
                    dimension: self.dimension(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    /// Unweighted mean of `vectors` (every item has weight 1).
    pub fn average(vectors: &[Vector]) -> Result<Vector, FocalPointError> {
        let weighted: Vec<WeightedVector> = vectors
            .iter()
            .map(|v| WeightedVector {
                vector: v.clone(),
                weight: 1.0,
            })
            .collect();
        weighted_average(&weighted)
    }
}

/// A vector paired with a non-negative importance weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedVector {
    vector: Vector,
    weight: f64,
}

impl WeightedVector {
    /// Pair `vector` with `weight`; the weight must be finite and non-negative.
    pub fn new(vector: Vector, weight: f64) -> Result<Self, FocalPointError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(FocalPointError::InvalidWeight(weight));
        }
        Ok(Self { vector, weight })
    }

    /// The position part.
    pub fn vector(&self) -> &Vector {
        &self.vector
    }

    /// The importance weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Distance between the position parts, ignoring weights.
    pub fn distance_to(&self, other: &WeightedVector) -> Result<f64, FocalPointError> {
        self.vector.distance_to(&other.vector)
    }

    /// Project the position part onto `axes`, keeping the weight.
    pub fn select(&self, axes: &[usize]) -> Result<WeightedVector, FocalPointError> {
        Ok(Self {
            vector: self.vector.select(axes)?,
            weight: self.weight,
        })
    }
}

/// Per-axis weighted mean `Σ(position × weight) / Σ(weight)`.
///
/// An empty list, or one whose total weight is not positive, reduces to the
/// zero-length vector.
pub fn weighted_average(items: &[WeightedVector]) -> Result<Vector, FocalPointError> {
    let Some(first) = items.first() else {
        return Ok(Vector::default());
    };
    let dimension = first.vector.dimension();
    for item in items {
        ensure_same_dimension(dimension, item.vector.dimension())?;
    }

    let total_weight: f64 = items.iter().map(|item| item.weight).sum();
    if total_weight <= 0.0 {
        return Ok(Vector::default());
    }

    let mut sums = vec![0.0; dimension];
    for item in items {
        for (sum, position) in sums.iter_mut().zip(&item.vector.components) {
            *sum += position.value() * item.weight;
        }
    }
    Ok(Vector::new(sums.into_iter().map(|sum| sum / total_weight)))
}

fn ensure_same_dimension(left: usize, right: usize) -> Result<(), FocalPointError> {
    if left == right {
        Ok(())
    } else {
        Err(FocalPointError::DimensionMismatch { left, right })
    }
}
