use heat_core::Field;
use rand::Rng;
use std::ops::Range;

/// Cold block covering the centre-right of the grid: `n/2 .. 4n/5`.
pub fn cold_block(n: usize) -> Range<usize> {
    n / 2..4 * n / 5
}

/// Hot block in the upper-left of the grid: `n/5 .. 2n/5`.
pub fn hot_block(n: usize) -> Range<usize> {
    n / 5..2 * n / 5
}

/// Builds a fresh `n x n` field: uniform noise in `[0, 1)`, then the cold
/// block set to 0.0, then the hot block set to 1.0.
///
/// The same range is used for rows and columns. For small `n` the blocks may
/// be empty, in which case only the noise remains.
pub fn seed_field<R: Rng>(rng: &mut R, n: usize) -> Field {
    let mut f = Field::zeros(n);

    for row in 0..n {
        for col in 0..n {
            f.set(row, col, rng.gen_range(0.0..1.0));
        }
    }

    let cold = cold_block(n);
    f.fill_rect(cold.clone(), cold, 0.0);

    let hot = hot_block(n);
    f.fill_rect(hot.clone(), hot, 1.0);

    f
}
