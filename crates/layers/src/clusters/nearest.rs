use foundation::math::Vec2;

/// Closest point of `pool` strictly within `max_distance` of `target`.
///
/// Distances are compared squared. On a tie the earlier point wins.
pub fn nearest_within(pool: &[Vec2], target: Vec2, max_distance: f64) -> Option<Vec2> {
    let mut best: Option<Vec2> = None;
    let mut best_d2 = max_distance * max_distance;
    for &p in pool {
        let d2 = p.distance_squared(target);
        if d2 < best_d2 {
            best = Some(p);
            best_d2 = d2;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::nearest_within;
    use foundation::math::Vec2;

    #[test]
    fn empty_pool_has_no_match() {
        assert_eq!(nearest_within(&[], Vec2::new(0.0, 0.0), 100.0), None);
    }

    #[test]
    fn picks_closest_inside_threshold() {
        let pool = [Vec2::new(100.0, 100.0), Vec2::new(103.0, 104.0)];
        let found = nearest_within(&pool, Vec2::new(104.0, 104.0), 50.0);
        assert_eq!(found, Some(Vec2::new(103.0, 104.0)));
    }

    #[test]
    fn threshold_is_exclusive() {
        let pool = [Vec2::new(3.0, 4.0)];
        assert_eq!(nearest_within(&pool, Vec2::new(0.0, 0.0), 5.0), None);
        assert_eq!(
            nearest_within(&pool, Vec2::new(0.0, 0.0), 5.01),
            Some(Vec2::new(3.0, 4.0))
        );
    }

    #[test]
    fn first_of_equal_candidates_wins() {
        let pool = [Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)];
        assert_eq!(
            nearest_within(&pool, Vec2::new(0.0, 0.0), 10.0),
            Some(Vec2::new(-1.0, 0.0))
        );
    }
}
