use nalgebra as na;
use num_traits::Float;

/// First degree least squares fit of `y` over `x`, returns `[slope, intercept]`.
///
/// `None` when the normal equations are singular, i.e. fewer than two distinct `x`.
pub fn linear_ls<T: na::RealField + Float>(
    x: &na::DVector<T>,
    y: &na::DVector<T>,
) -> Option<na::Matrix2x1<T>> {
    let n = x.iter().fold(T::zero(), |n, _| n + T::one());

    let s_x = x.sum();
    let s_x2 = x.map(|x| x * x).sum();
    let s_xy = x.zip_map(y, |x, y| x * y).sum();
    let s_y = y.sum();

    let a = na::Matrix2::new(s_x2, s_x, s_x, n);
    let b = na::Matrix2x1::new(s_xy, s_y);

    let qr_result = a.qr();
    let qty = qr_result.q().transpose() * b;

    qr_result.r().solve_upper_triangular(&qty)
}

/// Slope of `ys` sampled at `0, 1, 2, ...`
pub fn trend_slope<T: na::RealField + Float>(ys: &[T]) -> Option<T> {
    if ys.len() < 2 {
        return None;
    }

    let xs = ys.iter().scan(-T::one(), |i, _| {
        *i = *i + T::one();
        Some(*i)
    });

    let x = na::DVector::from_iterator(ys.len(), xs);
    let y = na::DVector::from_column_slice(ys);

    linear_ls(&x, &y).map(|beta| beta[0])
}

/// Arithmetic mean, zero for an empty slice.
pub fn mean<T: Float>(xs: &[T]) -> T {
    let (sum, n) = xs
        .iter()
        .fold((T::zero(), T::zero()), |(s, n), &x| (s + x, n + T::one()));

    if n > T::zero() {
        sum / n
    } else {
        T::zero()
    }
}

/// Population variance, zero for an empty slice.
pub fn variance<T: Float>(xs: &[T]) -> T {
    let m = mean(xs);
    let sq: Vec<T> = xs.iter().map(|&x| (x - m) * (x - m)).collect();

    mean(&sq)
}

#[inline]
pub fn std_dev<T: Float>(xs: &[T]) -> T {
    variance(xs).sqrt()
}
