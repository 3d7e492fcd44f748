//! Distance helpers over grid coordinates.
//!
//! Both helpers take the candidates as anything that views as a slice of
//! positions. A single [`Position`] is a batch of one, so callers can pass
//! either a lone coordinate or a collection and get the same behavior.

use crate::{Offset, Position};

impl AsRef<[Position]> for Position {
    fn as_ref(&self) -> &[Position] {
        std::slice::from_ref(self)
    }
}

/// Returns the index of the candidate closest to `point`.
///
/// Distances are compared squared. When several candidates are equally
/// close the first one wins. Returns `None` if `points` is empty.
pub fn closest_index<P>(point: Position, points: &P) -> Option<usize>
where
    P: AsRef<[Position]> + ?Sized,
{
    points
        .as_ref()
        .iter()
        .map(|candidate| Offset::between(point, *candidate).squared_length())
        .enumerate()
        .min_by_key(|&(_, distance)| distance)
        .map(|(index, _)| index)
}

/// Returns the Euclidean distance from `point` to each candidate, in order.
pub fn euclidean_distance<P>(point: Position, points: &P) -> Vec<f64>
where
    P: AsRef<[Position]> + ?Sized,
{
    points
        .as_ref()
        .iter()
        .map(|candidate| Offset::between(point, *candidate).length())
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn candidates() -> Vec<Position> {
        // rows 6, 8, 10 of column 8
        vec![
            Position::new(8, 6),
            Position::new(8, 8),
            Position::new(8, 10),
        ]
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-3, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn closest_and_distances_from_reference() {
        let points = candidates();
        let reference = Position::new(6, 6);

        assert_eq!(closest_index(reference, &points), Some(0));
        assert_close(&euclidean_distance(reference, &points), &[2.0, 2.828, 4.472]);

        let far_corner = Position::new(10, 10);
        assert_eq!(closest_index(far_corner, &points), Some(2));
        assert_close(&euclidean_distance(far_corner, &points), &[4.472, 2.828, 2.0]);
    }

    #[test]
    fn single_point_behaves_like_batch_of_one() {
        let reference = Position::new(6, 6);
        let enemy = Position::new(8, 8);

        assert_eq!(closest_index(reference, &enemy), Some(0));
        assert_eq!(
            euclidean_distance(reference, &enemy),
            euclidean_distance(reference, &[enemy][..])
        );
    }

    #[test]
    fn ties_resolve_to_first_candidate() {
        let points = [
            Position::new(5, 6),
            Position::new(7, 6),
            Position::new(6, 5),
        ];
        assert_eq!(closest_index(Position::new(6, 6), &points), Some(0));
    }

    #[test]
    fn empty_batch_has_no_closest() {
        let points: Vec<Position> = Vec::new();
        assert_eq!(closest_index(Position::new(0, 0), &points), None);
        assert!(euclidean_distance(Position::new(0, 0), &points).is_empty());
    }

    #[test]
    fn closest_index_agrees_with_minimum_distance() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let reference = Position::new(rng.random_range(0..13), rng.random_range(0..13));
            let count = rng.random_range(1..10);
            let points: Vec<Position> = (0..count)
                .map(|_| Position::new(rng.random_range(0..13), rng.random_range(0..13)))
                .collect();

            let distances = euclidean_distance(reference, &points);
            let index = closest_index(reference, &points).unwrap();
            let minimum = distances.iter().cloned().fold(f64::INFINITY, f64::min);
            assert_eq!(distances[index], minimum);
            assert!(distances[..index].iter().all(|d| *d > minimum));
        }
    }
}
