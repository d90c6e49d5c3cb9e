//! Dense linear algebra for the estimation systems
//!
//! Both routines use partial pivoting and treat a pivot smaller than
//! `PIVOT_TOLERANCE × max|a_ij|` as a singular matrix.

use ndarray::{Array1, Array2};

use scatterfill_core::{Error, Result};

/// Relative pivot threshold
pub const PIVOT_TOLERANCE: f64 = 1e-12;

fn check_square(a: &Array2<f64>) -> Result<usize> {
    let (rows, cols) = a.dim();
    if rows != cols || rows == 0 {
        return Err(Error::SizeMismatch {
            er: rows.max(cols),
            ec: rows.max(cols),
            ar: rows,
            ac: cols,
        });
    }
    Ok(rows)
}

fn pivot_threshold(a: &Array2<f64>) -> Result<f64> {
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if !scale.is_finite() {
        return Err(Error::SingularSystem("matrix contains non-finite entries".into()));
    }
    if scale == 0.0 {
        return Err(Error::SingularSystem("matrix is all zeros".into()));
    }
    Ok(scale * PIVOT_TOLERANCE)
}

/// Row index of the largest `|a[(row, col)]|` for `row >= col`.
fn find_pivot(a: &Array2<f64>, col: usize) -> (usize, f64) {
    (col..a.nrows())
        .map(|row| (row, a[(row, col)].abs()))
        .fold((col, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best })
}

fn swap_rows(a: &mut Array2<f64>, r1: usize, r2: usize) {
    if r1 == r2 {
        return;
    }
    for j in 0..a.ncols() {
        a.swap((r1, j), (r2, j));
    }
}

/// Solve `a · x = b` by Gaussian elimination.
pub fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = check_square(&a)?;
    if b.len() != n {
        return Err(Error::SizeMismatch { er: n, ec: 1, ar: b.len(), ac: 1 });
    }
    let tol = pivot_threshold(&a)?;

    for col in 0..n {
        let (pivot_row, pivot_abs) = find_pivot(&a, col);
        if !(pivot_abs > tol) {
            return Err(Error::SingularSystem(format!(
                "no usable pivot in column {col} of {n}"
            )));
        }
        swap_rows(&mut a, col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[(col, col)];
        for row in (col + 1)..n {
            let factor = a[(row, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            a[(row, col)] = 0.0;
            for j in (col + 1)..n {
                a[(row, j)] -= factor * a[(col, j)];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[(i, j)] * x[j];
        }
        x[i] = sum / a[(i, i)];
    }

    Ok(x)
}

/// Invert `a` by Gauss-Jordan elimination.
pub fn invert(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = check_square(a)?;
    let tol = pivot_threshold(a)?;

    let mut m = a.clone();
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        let (pivot_row, pivot_abs) = find_pivot(&m, col);
        if !(pivot_abs > tol) {
            return Err(Error::SingularSystem(format!(
                "matrix of order {n} is not invertible (column {col})"
            )));
        }
        swap_rows(&mut m, col, pivot_row);
        swap_rows(&mut inv, col, pivot_row);

        let pivot = m[(col, col)];
        for j in 0..n {
            m[(col, j)] /= pivot;
            inv[(col, j)] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = m[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                m[(row, j)] -= factor * m[(col, j)];
                inv[(row, j)] -= factor * inv[(col, j)];
            }
        }
    }

    Ok(inv)
}
