use ndarray::{Array2, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Row-major first maximum over the defined cells.
    pub fn argmax(matrix: ArrayView2<Option<f64>>) -> Option<((usize, usize), f64)> {
        let mut best: Option<((usize, usize), f64)> = None;
        for ((row, col), cell) in matrix.indexed_iter() {
            if let Some(value) = *cell {
                match best {
                    Some((_, current)) if current >= value => {}
                    _ => best = Some(((row, col), value)),
                }
            }
        }
        best
    }

    /// First maximum of a single row, skipping undefined cells.
    pub fn row_argmax(row: ArrayView1<Option<f64>>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, cell) in row.iter().enumerate() {
            if let Some(value) = *cell {
                match best {
                    Some((_, current)) if current >= value => {}
                    _ => best = Some((idx, value)),
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Wraps plain values, turning NaN into undefined cells.
    pub fn from_dense(values: ArrayView2<f64>) -> Array2<Option<f64>> {
        values.mapv(|v| if v.is_nan() { None } else { Some(v) })
    }
}
