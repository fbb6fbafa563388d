use nalgebra as na;

/// Where an object is expected next frame, assuming it keeps the displacement
/// between its last two observed positions. With a single observation the
/// object is assumed to stand still.
#[inline]
pub fn linear(last: na::Point2<f32>, prev: Option<na::Point2<f32>>) -> na::Point2<f32> {
    match prev {
        Some(prev) => last + (last - prev),
        None => last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn extrapolates_displacement() {
        let p = linear(na::Point2::new(110.0, 50.0), Some(na::Point2::new(100.0, 53.0)));

        assert_relative_eq!(p.x, 120.0);
        assert_relative_eq!(p.y, 47.0);
    }

    #[test]
    fn stands_still_without_history() {
        let last = na::Point2::new(5.0, 6.0);
        assert_eq!(linear(last, None), last);
    }
}
