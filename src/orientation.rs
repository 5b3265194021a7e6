//! Anatomical orientation codes and direction cosines.
//!
//! Physical space is LPS: +x points left, +y posterior, +z superior.
//! Each letter of an orientation code names the direction the corresponding index axis points towards,
//! so `LPS` is the identity and `RAS` flips the first two axes.
use nalgebra::{Matrix3, Vector3};

/// Physical axis and sign for a direction code.
fn code_to_axis(code: char) -> crate::Result<(usize, f64)> {
    match code.to_ascii_uppercase() {
        'L' => Ok((0, 1.0)),
        'R' => Ok((0, -1.0)),
        'P' => Ok((1, 1.0)),
        'A' => Ok((1, -1.0)),
        'S' => Ok((2, 1.0)),
        'I' => Ok((2, -1.0)),
        c => Err(crate::Error::general(format!(
            "invalid anatomical direction code {c:?}"
        ))),
    }
}

fn axis_to_code(axis: usize, positive: bool) -> char {
    match (axis, positive) {
        (0, true) => 'L',
        (0, false) => 'R',
        (1, true) => 'P',
        (1, false) => 'A',
        (2, true) => 'S',
        _ => 'I',
    }
}

/// Direction cosines for a three-letter orientation code such as `RAS`.
///
/// Column `i` is the physical unit vector of index axis `i`.
pub fn direction_cosines_from_orientation(code: &str) -> crate::Result<Matrix3<f64>> {
    let codes: Vec<char> = code.chars().collect();
    if codes.len() != 3 {
        return Err(crate::Error::general(format!(
            "orientation code must have 3 letters, got {code:?}"
        )));
    }
    let mut seen = [false; 3];
    let mut out = Matrix3::zeros();
    for (col, c) in codes.into_iter().enumerate() {
        let (axis, sign) = code_to_axis(c)?;
        if seen[axis] {
            return Err(crate::Error::general(format!(
                "orientation code {code:?} uses a physical axis twice"
            )));
        }
        seen[axis] = true;
        out[(axis, col)] = sign;
    }
    Ok(out)
}

/// Nearest orientation code for a direction matrix.
pub fn orientation_from_direction_cosines(direction: &Matrix3<f64>) -> String {
    direction
        .column_iter()
        .map(|col| {
            let col: Vector3<f64> = col.into_owned();
            let axis = col.iamax();
            axis_to_code(axis, col[axis] >= 0.0)
        })
        .collect()
}

/// Direction matrix as a row-major tuple of 9 cosines.
pub fn direction_tuple(direction: &Matrix3<f64>) -> [f64; 9] {
    let mut out = [0.0; 9];
    for row in 0..3 {
        for col in 0..3 {
            out[row * 3 + col] = direction[(row, col)];
        }
    }
    out
}
