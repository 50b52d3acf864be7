use rand::Rng;

use crate::domain::{BoundingBox, GeoPoint};

/// Uniform random coordinate inside `bbox`.
///
/// Each axis is `min + u * (max - min)` with `u` in `[0, 1)`; the result is
/// strictly below `max`. The box must already be validated.
pub fn sample_coordinate<R: Rng + ?Sized>(bbox: &BoundingBox, rng: &mut R) -> GeoPoint {
    GeoPoint {
        lat: rng.gen_range(bbox.min_lat..bbox.max_lat),
        lng: rng.gen_range(bbox.min_lng..bbox.max_lng),
    }
}
