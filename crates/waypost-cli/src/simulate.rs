//! Simulated positioning for demos and headless runs.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use waypost_core::{PositionOptions, PositionSource};
use waypost_types::{GeoPoint, PositionError, PositionSample};

/// Meters per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// A position source that wanders randomly from a starting point.
///
/// Each fix moves up to `max_step` meters in a random direction and reports
/// a random horizontal accuracy, tighter when high accuracy is requested.
pub struct RandomWalkSource {
    state: Mutex<Walk>,
    max_step: f64,
}

struct Walk {
    rng: StdRng,
    position: GeoPoint,
}

impl RandomWalkSource {
    /// Default maximum distance between consecutive fixes, in meters.
    pub const DEFAULT_STEP: f64 = 25.0;

    pub fn new(start: GeoPoint) -> Self {
        Self::with_rng(start, StdRng::from_os_rng())
    }

    /// A reproducible walk.
    pub fn seeded(start: GeoPoint, seed: u64) -> Self {
        Self::with_rng(start, StdRng::seed_from_u64(seed))
    }

    fn with_rng(start: GeoPoint, rng: StdRng) -> Self {
        Self {
            state: Mutex::new(Walk {
                rng,
                position: start,
            }),
            max_step: Self::DEFAULT_STEP,
        }
    }

    #[must_use]
    pub fn max_step(mut self, meters: f64) -> Self {
        self.max_step = meters.max(0.0);
        self
    }

    fn step(&self, high_accuracy: bool) -> PositionSample {
        let mut walk = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let distance = walk.rng.random_range(0.0..=self.max_step);
        let heading = walk.rng.random_range(0.0..std::f64::consts::TAU);
        let accuracy = if high_accuracy {
            walk.rng.random_range(3.0..10.0)
        } else {
            walk.rng.random_range(20.0..100.0)
        };

        let current = walk.position;
        let lat = (current.latitude + distance * heading.cos() / METERS_PER_DEGREE).clamp(-90.0, 90.0);
        // Longitude degrees shrink toward the poles.
        let scale = (METERS_PER_DEGREE * lat.to_radians().cos()).max(1.0);
        let lon = wrap_longitude(current.longitude + distance * heading.sin() / scale);

        walk.position = GeoPoint::new(lat, lon);
        PositionSample::new(lat, lon).with_accuracy(accuracy)
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

#[async_trait]
impl PositionSource for RandomWalkSource {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<PositionSample, PositionError> {
        let sample = self.step(options.high_accuracy);
        debug!(
            "Simulated fix {:.6}, {:.6}",
            sample.latitude, sample.longitude
        );
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meters_between(a: GeoPoint, b: GeoPoint) -> f64 {
        let dlat = (b.latitude - a.latitude) * METERS_PER_DEGREE;
        let dlon =
            (b.longitude - a.longitude) * METERS_PER_DEGREE * a.latitude.to_radians().cos();
        (dlat * dlat + dlon * dlon).sqrt()
    }

    #[tokio::test]
    async fn test_walk_stays_within_step() {
        let start = GeoPoint::new(47.6, -122.3);
        let source = RandomWalkSource::seeded(start, 7);
        let options = PositionOptions::default();

        let mut previous = start;
        for _ in 0..50 {
            let sample = source.current_position(&options).await.unwrap();
            let point = GeoPoint::new(sample.latitude, sample.longitude);
            assert!(meters_between(previous, point) <= RandomWalkSource::DEFAULT_STEP + 0.01);
            assert!(sample.validate().is_ok());
            assert!((3.0..10.0).contains(&sample.accuracy.unwrap()));
            previous = point;
        }
    }

    #[tokio::test]
    async fn test_seeded_walks_repeat() {
        let start = GeoPoint::new(0.0, 0.0);
        let a = RandomWalkSource::seeded(start, 42);
        let b = RandomWalkSource::seeded(start, 42);
        let options = PositionOptions::default();
        for _ in 0..5 {
            assert_eq!(
                a.current_position(&options).await.unwrap(),
                b.current_position(&options).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_low_accuracy_is_coarser() {
        let source = RandomWalkSource::seeded(GeoPoint::ORIGIN, 1);
        let options = PositionOptions {
            high_accuracy: false,
            ..Default::default()
        };
        let sample = source.current_position(&options).await.unwrap();
        assert!(sample.accuracy.unwrap() >= 20.0);
    }

    #[tokio::test]
    async fn test_zero_step_stands_still() {
        let start = GeoPoint::new(10.0, 20.0);
        let source = RandomWalkSource::seeded(start, 3).max_step(0.0);
        let sample = source
            .current_position(&PositionOptions::default())
            .await
            .unwrap();
        assert_eq!((sample.latitude, sample.longitude), (10.0, 20.0));
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(179.0), 179.0);
        assert!((wrap_longitude(181.0) + 179.0).abs() < 1e-9);
        assert!((wrap_longitude(-181.0) - 179.0).abs() < 1e-9);
    }
}
