use crate::core::image::ImageRef;
use serde::{Deserialize, Serialize};

/// Fixed-length local keypoint descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance to another descriptor of the same length.
    pub fn distance(&self, other: &Self) -> f32 {
        debug_assert_eq!(self.0.len(), other.0.len());
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

/// Ordered keypoint descriptors extracted from one image.
///
/// Empty sets are valid (blank images) and never match any other image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSet {
    image: ImageRef,
    descriptors: Vec<Descriptor>,
}

impl DescriptorSet {
    pub fn new(image: ImageRef, descriptors: Vec<Descriptor>) -> Self {
        Self { image, descriptors }
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Count ratio-test matches from `a` against `b`.
///
/// A descriptor of `a` is a good match when its nearest neighbour in `b` is
/// closer than `ratio` times its second-nearest. Needs at least two
/// descriptors in `b` for the test to be meaningful; anything less matches
/// nothing.
pub(crate) fn count_good_matches(a: &DescriptorSet, b: &DescriptorSet, ratio: f32) -> usize {
    if a.is_empty() || b.len() < 2 {
        return 0;
    }

    a.descriptors()
        .iter()
        .filter(|descriptor| {
            let (nearest, second_nearest) = two_nearest(descriptor, b.descriptors());
            nearest < ratio * second_nearest
        })
        .count()
}

fn two_nearest(descriptor: &Descriptor, candidates: &[Descriptor]) -> (f32, f32) {
    let mut nearest = f32::INFINITY;
    let mut second_nearest = f32::INFINITY;

    for candidate in candidates {
        let distance = descriptor.distance(candidate);
        if distance < nearest {
            second_nearest = nearest;
            nearest = distance;
        } else if distance < second_nearest {
            second_nearest = distance;
        }
    }

    (nearest, second_nearest)
}
