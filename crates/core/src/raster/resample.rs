//! Point sampling of rasters at arbitrary world coordinates

use serde::{Deserialize, Serialize};

use crate::raster::Raster;

/// Method used to read a raster between cell centres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    /// Value of the closest cell
    NearestNeighbour,
    /// Distance-weighted mean of the four surrounding cells
    Bilinear,
    /// Cubic convolution over the surrounding 4×4 cells
    BicubicSpline,
    /// Cubic B-spline smoothing over the surrounding 4×4 cells
    #[default]
    BSpline,
}

impl Raster {
    /// Sample the raster at `(x, y)`.
    ///
    /// Returns `None` when the position lies outside the cell-edge extent,
    /// when the nearest cell is missing-data, or when the chosen method cannot
    /// gather enough data around the position.
    pub fn sample(&self, x: f64, y: f64, method: Resampling) -> Option<f64> {
        if !self.extent().contains(x, y) {
            return None;
        }

        let (fx, fy) = self.spec().world_to_cell(x, y);
        let (ix, iy) = (fx.floor(), fy.floor());
        let (dx, dy) = (fx - ix, fy - iy);
        let (ix, iy) = (ix as isize, iy as isize);

        // The upper edge of the extent rounds to one past the last cell.
        let spec = self.spec();
        let near_x = (ix + (dx >= 0.5) as isize).min(spec.nx as isize - 1);
        let near_y = (iy + (dy >= 0.5) as isize).min(spec.ny as isize - 1);
        let nearest = self.valid_at(near_x, near_y)?;

        match method {
            Resampling::NearestNeighbour => Some(nearest),
            Resampling::Bilinear => self.bilinear(ix, iy, dx, dy),
            Resampling::BicubicSpline => self.window(ix, iy).map(|w| bicubic(&w, dx, dy)),
            Resampling::BSpline => self.window(ix, iy).map(|w| bspline(&w, dx, dy)),
        }
    }

    fn bilinear(&self, ix: isize, iy: isize, dx: f64, dy: f64) -> Option<f64> {
        let taps = [
            (ix, iy, (1.0 - dx) * (1.0 - dy)),
            (ix + 1, iy, dx * (1.0 - dy)),
            (ix, iy + 1, (1.0 - dx) * dy),
            (ix + 1, iy + 1, dx * dy),
        ];

        let (mut z, mut n) = (0.0, 0.0);
        for (cx, cy, w) in taps {
            if let Some(v) = self.valid_at(cx, cy) {
                z += w * v;
                n += w;
            }
        }

        (n > 0.0).then(|| z / n)
    }

    /// 4×4 neighbourhood `w[col][row]` starting at `(ix - 1, iy - 1)`.
    ///
    /// Gaps are filled with the mean of their valid neighbours, repeatedly,
    /// until the window is complete or no progress is possible.
    fn window(&self, ix: isize, iy: isize) -> Option<[[f64; 4]; 4]> {
        let mut w = [[f64::NAN; 4]; 4];
        let mut missing = 0;

        for wy in 0..4 {
            for wx in 0..4 {
                match self.valid_at(ix - 1 + wx as isize, iy - 1 + wy as isize) {
                    Some(v) => w[wx][wy] = v,
                    None => missing += 1,
                }
            }
        }

        let mut passes = 0;
        while missing > 0 && missing < 16 && passes < 16 {
            let snapshot = w;
            for wy in 0..4isize {
                for wx in 0..4isize {
                    if !snapshot[wx as usize][wy as usize].is_nan() {
                        continue;
                    }

                    let (mut s, mut n) = (0.0, 0usize);
                    for jy in (wy - 1)..=(wy + 1) {
                        for jx in (wx - 1)..=(wx + 1) {
                            let inside = (0..4).contains(&jx) && (0..4).contains(&jy);
                            let v = if inside {
                                Some(snapshot[jx as usize][jy as usize]).filter(|v| !v.is_nan())
                            } else {
                                self.valid_at(ix - 1 + jx, iy - 1 + jy)
                            };
                            if let Some(v) = v {
                                s += v;
                                n += 1;
                            }
                        }
                    }

                    if n > 0 {
                        w[wx as usize][wy as usize] = s / n as f64;
                        missing -= 1;
                    }
                }
            }
            passes += 1;
        }

        (missing == 0).then_some(w)
    }
}

#[inline]
fn cubic_convolution(d: f64, v: [f64; 4]) -> f64 {
    v[1] + 0.5
        * d
        * (v[2] - v[0]
            + d * (2.0 * v[0] - 5.0 * v[1] + 4.0 * v[2] - v[3]
                + d * (3.0 * (v[1] - v[2]) + v[3] - v[0])))
}

fn bicubic(w: &[[f64; 4]; 4], dx: f64, dy: f64) -> f64 {
    let columns = [
        cubic_convolution(dy, w[0]),
        cubic_convolution(dy, w[1]),
        cubic_convolution(dy, w[2]),
        cubic_convolution(dy, w[3]),
    ];
    cubic_convolution(dx, columns)
}

/// Cubic B-spline basis weights for the four taps around offset `d ∈ [0, 1)`.
fn bspline_weights(d: f64) -> [f64; 4] {
    let mut r = [0.0; 4];
    for (i, ri) in r.iter_mut().enumerate() {
        let i = i as f64;
        let mut s = 0.0;
        for (shift, coeff) in [(1.0, 1.0), (0.0, -4.0), (-1.0, 6.0), (-2.0, -4.0)] {
            let t = i - d + shift;
            if t > 0.0 {
                s += coeff * t * t * t;
            }
        }
        *ri = s / 6.0;
    }
    r
}

fn bspline(w: &[[f64; 4]; 4], dx: f64, dy: f64) -> f64 {
    let rx = bspline_weights(dx);
    let ry = bspline_weights(dy);

    let mut z = 0.0;
    for (iy, wy) in ry.iter().enumerate() {
        for (ix, wx) in rx.iter().enumerate() {
            z += w[ix][iy] * wx * wy;
        }
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridSpec;
    use approx::assert_relative_eq;

    fn plane() -> Raster {
        let spec = GridSpec::new(0.0, 0.0, 1.0, 10, 10).unwrap();
        Raster::from_fn(spec, |x, y| 2.0 * x + 3.0 * y + 1.0)
    }

    #[test]
    fn test_outside_extent() {
        let r = plane();
        for method in [
            Resampling::NearestNeighbour,
            Resampling::Bilinear,
            Resampling::BicubicSpline,
            Resampling::BSpline,
        ] {
            assert!(r.sample(-0.6, 5.0, method).is_none());
            assert!(r.sample(5.0, 9.6, method).is_none());
            assert!(r.sample(4.5, 4.5, method).is_some());
        }
    }

    #[test]
    fn test_edges_are_symmetric() {
        let spec = GridSpec::new(0.0, 0.0, 1.0, 6, 4).unwrap();
        let r = Raster::from_fn(spec, |x, _| x);
        for method in [
            Resampling::NearestNeighbour,
            Resampling::Bilinear,
            Resampling::BicubicSpline,
            Resampling::BSpline,
        ] {
            assert!(r.sample(-0.5, 1.0, method).is_some());
            assert!(r.sample(5.5, 1.0, method).is_some());
            assert!(r.sample(2.0, -0.5, method).is_some());
            assert!(r.sample(2.0, 3.5, method).is_some());
        }
        assert_relative_eq!(r.sample(5.5, 1.0, Resampling::NearestNeighbour).unwrap(), 5.0);
        assert_relative_eq!(r.sample(-0.5, 1.0, Resampling::NearestNeighbour).unwrap(), 0.0);
    }

    #[test]
    fn test_nearest() {
        let r = plane();
        assert_relative_eq!(r.sample(3.4, 6.6, Resampling::NearestNeighbour).unwrap(), 28.0);
    }

    #[test]
    fn test_linear_surface_reproduced() {
        let r = plane();
        let (x, y) = (4.3, 5.7);
        let expected = 2.0 * x + 3.0 * y + 1.0;
        assert_relative_eq!(r.sample(x, y, Resampling::Bilinear).unwrap(), expected, epsilon = 1e-10);
        assert_relative_eq!(r.sample(x, y, Resampling::BicubicSpline).unwrap(), expected, epsilon = 1e-10);
        assert_relative_eq!(r.sample(x, y, Resampling::BSpline).unwrap(), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_bspline_weights_partition_of_unity() {
        for d in [0.0, 0.25, 0.5, 0.9] {
            let s: f64 = bspline_weights(d).iter().sum();
            assert_relative_eq!(s, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_edge_window_is_filled() {
        let r = plane();
        // Near the corner the 4×4 window reaches outside the grid.
        assert!(r.sample(0.2, 0.2, Resampling::BSpline).is_some());
        assert!(r.sample(0.2, 0.2, Resampling::BicubicSpline).is_some());
    }

    #[test]
    fn test_nodata_nearest_cell_is_not_covered() {
        let mut r = plane();
        r.set(5, 5, f64::NAN).unwrap();
        assert!(r.sample(5.1, 4.9, Resampling::Bilinear).is_none());
        // A neighbouring position still resamples around the gap.
        let v = r.sample(5.6, 5.0, Resampling::Bilinear).unwrap();
        assert!(v.is_finite());
    }
}
