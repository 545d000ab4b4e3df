use log::info;

use crate::Error;

/// Maximal number of points in the splines
const MAX_SPLINE_SIZE: usize = 10_000;

/// [Hermit cubic spline][splines-wiki] of a scalar function `R -> R`.
///
/// This kind of spline uses the value of a function on control points as well
/// as the derivative of the function at these points, which makes the
/// interpolated function continuously differentiable. Outside of the control
/// points, the function is extrapolated linearly from the first/last point.
///
/// [splines-wiki]: https://en.wikipedia.org/wiki/Cubic_Hermite_spline
#[derive(Debug, Clone, PartialEq)]
pub struct HermitCubicSpline {
    points: Vec<HermitSplinePoint>,
}

/// A single control point/knot in the Hermit cubic spline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HermitSplinePoint {
    /// Position of the point
    pub position: f64,
    /// Value of the function to interpolate at the position
    pub value: f64,
    /// Derivative of the function to interpolate at the position
    pub derivative: f64,
}

impl HermitCubicSpline {
    /// Create a spline from a set of control points. The points are sorted by
    /// position, and there must be at least two of them.
    pub fn new(mut points: Vec<HermitSplinePoint>) -> Result<HermitCubicSpline, Error> {
        if points.len() < 2 {
            return Err(Error::InvalidParameter(format!(
                "we need at least two points to create a spline, got {}", points.len()
            )));
        }

        for point in &points {
            if !(point.position.is_finite() && point.value.is_finite() && point.derivative.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "got non finite control point in spline: {:?}", point
                )));
            }
        }

        points.sort_unstable_by(|a, b| a.position.total_cmp(&b.position));
        for window in points.windows(2) {
            if window[0].position == window[1].position {
                return Err(Error::InvalidParameter(format!(
                    "got the same control point position ({}) twice in spline", window[0].position
                )));
            }
        }

        return Ok(HermitCubicSpline { points });
    }

    /// Create a spline from values tabulated on a regular grid starting at
    /// `start` with spacing `step`. Derivatives at the control points are
    /// estimated with finite differences (central differences inside the grid,
    /// one-sided differences at both ends).
    pub fn from_table(start: f64, step: f64, values: &[f64]) -> Result<HermitCubicSpline, Error> {
        if !(step > 0.0 && step.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "table step must be positive, got {}", step
            )));
        }

        if values.len() < 2 {
            return Err(Error::InvalidParameter(format!(
                "we need at least two values in a table, got {}", values.len()
            )));
        }

        let n_values = values.len();
        let points = values.iter().enumerate().map(|(i, &value)| {
            let derivative = if i == 0 {
                (values[1] - values[0]) / step
            } else if i == n_values - 1 {
                (values[i] - values[i - 1]) / step
            } else {
                (values[i + 1] - values[i - 1]) / (2.0 * step)
            };

            HermitSplinePoint {
                position: start + i as f64 * step,
                value: value,
                derivative: derivative,
            }
        }).collect();

        return HermitCubicSpline::new(points);
    }

    /// Create a new `HermitCubicSpline` for `function` between `start` and
    /// `stop`, trying to reach the given accuracy on average.
    ///
    /// When called, the `function` should return a tuple of `(value,
    /// derivative)` at the input position.
    ///
    /// Points are added to the spline until the requested accuracy is reached.
    /// We consider that the accuracy is reached when either the mean absolute
    /// error or the mean relative error gets below the `accuracy` threshold.
    pub fn with_accuracy<F>(
        accuracy: f64,
        start: f64,
        stop: f64,
        function: F,
    ) -> Result<HermitCubicSpline, Error> where F: Fn(f64) -> (f64, f64) {
        if !(accuracy > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "got invalid accuracy in spline ({}), it must be positive", accuracy
            )));
        }

        if !(start < stop) {
            return Err(Error::InvalidParameter(format!(
                "spline start ({}) must be smaller than spline stop ({})", start, stop
            )));
        }

        let initial_grid_size = 11;
        let grid_step = (stop - start) / (initial_grid_size - 1) as f64;

        let mut points = Vec::new();
        for k in 0..initial_grid_size {
            let position = start + k as f64 * grid_step;
            let (value, derivative) = function(position);
            points.push(HermitSplinePoint { position, value, derivative });
        }

        let mut spline = HermitCubicSpline::new(points)?;

        // add more points as required to reach the requested accuracy
        loop {
            let mut max_absolute_error = 0.0;
            let mut mean_absolute_error = 0.0;
            let mut mean_relative_error = 0.0;

            let positions = spline.positions();

            // evaluate the error at points in between grid points, since these
            // should have the highest error in average.
            let mut new_points = Vec::new();
            for k in 0..(spline.len() - 1) {
                let position = (positions[k] + positions[k + 1]) / 2.0;
                let (value, derivative) = function(position);
                let (interpolated, _) = spline.compute(position);

                let absolute_error = f64::abs(interpolated - value);
                if absolute_error > max_absolute_error {
                    max_absolute_error = absolute_error;
                }
                mean_absolute_error += absolute_error;
                mean_relative_error += f64::abs((interpolated - value) / value);

                new_points.push(HermitSplinePoint { position, value, derivative });
            }
            mean_absolute_error /= new_points.len() as f64;
            mean_relative_error /= new_points.len() as f64;

            if mean_absolute_error < accuracy || mean_relative_error < accuracy {
                info!(
                    "spline reached requested accuracy ({:.3e}) with {} reference points (max absolute error is {:.3e})",
                    accuracy, spline.len(), max_absolute_error,
                );
                break;
            }

            if spline.len() + new_points.len() > MAX_SPLINE_SIZE {
                return Err(Error::Internal(format!(
                    "failed to reach requested accuracy ({:e}) in spline interpolation, \
                    mean absolute error is {:e} and mean relative error is {:e}",
                    accuracy, mean_absolute_error, mean_relative_error
                )));
            }

            for point in new_points {
                spline.add_point(point)?;
            }
        }

        return Ok(spline);
    }

    /// Add a new control point to this spline, between two existing points
    fn add_point(&mut self, point: HermitSplinePoint) -> Result<(), Error> {
        match self.points.binary_search_by(|v| v.position.total_cmp(&point.position)) {
            Ok(_) => Err(Error::Internal(format!(
                "trying to add the same point ({}) twice to the spline", point.position
            ))),
            Err(k) => {
                self.points.insert(k, point);
                Ok(())
            }
        }
    }

    /// Get the number of control points in this spline
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Get the position of the first control point
    pub fn start(&self) -> f64 {
        self.points[0].position
    }

    /// Get the position of the last control point
    pub fn stop(&self) -> f64 {
        self.points[self.points.len() - 1].position
    }

    /// Get the position of the control points for this spline
    pub fn positions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Compute the spline and its derivative at point `x`
    pub fn compute(&self, x: f64) -> (f64, f64) {
        let first = &self.points[0];
        let last = &self.points[self.points.len() - 1];
        if x < first.position {
            return (first.value + (x - first.position) * first.derivative, first.derivative);
        } else if x >= last.position {
            return (last.value + (x - last.position) * last.derivative, last.derivative);
        }

        // notation in this function follows
        // https://en.wikipedia.org/wiki/Cubic_Hermite_spline
        let k = match self.points.binary_search_by(|v| v.position.total_cmp(&x)) {
            Ok(k) => k,
            Err(k) => k - 1,
        };

        let point_k = &self.points[k];
        let point_k_1 = &self.points[k + 1];

        let delta = point_k_1.position - point_k.position;
        let t = (x - point_k.position) / delta;
        let t_2 = t * t;
        let t_3 = t_2 * t;

        // Hermit base polynomials
        let h00 = 2.0 * t_3 - 3.0 * t_2 + 1.0;
        let h10 = t_3 - 2.0 * t_2 + t;
        let h01 = -2.0 * t_3 + 3.0 * t_2;
        let h11 = t_3 - t_2;

        let value = h00 * point_k.value
            + h10 * delta * point_k.derivative
            + h01 * point_k_1.value
            + h11 * delta * point_k_1.derivative;

        let d_h00_dt = 6.0 * (t_2 - t);
        let d_h10_dt = 3.0 * t_2 - 4.0 * t + 1.0;
        let d_h01_dt = -d_h00_dt;
        let d_h11_dt = 3.0 * t_2 - 2.0 * t;

        let derivative = (d_h00_dt * point_k.value + d_h01_dt * point_k_1.value) / delta
            + d_h10_dt * point_k.derivative
            + d_h11_dt * point_k_1.derivative;

        return (value, derivative);
    }
}
