use crate::{error::GridError, series::Coordinate};

/// Index of the `(0, 0)` offset in the row-major lattice.
pub fn center_index(size: usize) -> usize {
    size * size / 2
}

/// Builds a `size x size` lattice around `center`, row-major by latitude
/// offset then longitude offset.
pub fn build_grid(
    center: Coordinate,
    size: usize,
    step_degrees: f64,
) -> Result<Vec<Coordinate>, GridError> {
    if size == 0 {
        return Err(GridError::Empty);
    }
    if size % 2 == 0 {
        return Err(GridError::EvenSize(size));
    }
    if !step_degrees.is_finite() || step_degrees <= 0.0 {
        return Err(GridError::InvalidStep(step_degrees));
    }

    let half = (size / 2) as i64;
    let mut coords = Vec::with_capacity(size * size);
    for i in -half..=half {
        for j in -half..=half {
            coords.push(center.offset(i as f64 * step_degrees, j as f64 * step_degrees));
        }
    }
    Ok(coords)
}
