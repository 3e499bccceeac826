use std::fmt;

/// Largest supported side length. Keeps `n * n * 4` well inside `usize` and
/// the grid inside PNG's `u32` dimensions.
pub const MAX_GRID_SIZE: usize = 8192;

/// Square row-major grid of f32 cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    n: usize,
    data: Vec<f32>,
}

impl Field {
    /// All-zero `n x n` field. Callers keep `n <= MAX_GRID_SIZE`.
    pub fn zeros(n: usize) -> Field {
        debug_assert!(n <= MAX_GRID_SIZE, "grid size {n} exceeds {MAX_GRID_SIZE}");
        Field { n, data: vec![0.0; n * n] }
    }

    /// Wraps `data` as an `n x n` field. Fails when the length is not `n * n`.
    pub fn from_vec(n: usize, data: Vec<f32>) -> Result<Field, StepError> {
        let cells = cell_count(n)?;
        if data.len() != cells {
            return Err(StepError::ShapeMismatch {
                expected: cells,
                actual: data.len(),
            });
        }
        Ok(Field { n, data })
    }

    // ---- Accessors ----
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.n || col >= self.n {
            return None;
        }
        Some(self.data[row * self.n + col])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        if row >= self.n || col >= self.n { return; }
        let idx = row * self.n + col;
        self.data[idx] = value;
    }

    /// Overwrites every cell in `rows x cols` with `value`.
    /// Ranges are clipped to the grid; empty ranges do nothing.
    pub fn fill_rect(&mut self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, value: f32) {
        let n = self.n;
        let cols = cols.start.min(n)..cols.end.min(n);
        for row in rows.start.min(n)..rows.end.min(n) {
            let base = row * n;
            for col in cols.clone() {
                self.data[base + col] = value;
            }
        }
    }

    /// Row-major little-endian f32 bytes, `4 * n * n` long.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for &x in &self.data {
            out.extend_from_slice(&x.to_le_bytes());
        }
        out
    }

    pub fn from_le_bytes(n: usize, bytes: &[u8]) -> Result<Field, StepError> {
        let cells = cell_count(n)?;
        if bytes.len() / 4 != cells || bytes.len() % 4 != 0 {
            return Err(StepError::ShapeMismatch {
                expected: cells,
                actual: bytes.len() / 4,
            });
        }
        let data = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Field { n, data })
    }
}

fn cell_count(n: usize) -> Result<usize, StepError> {
    if n > MAX_GRID_SIZE {
        return Err(StepError::TooLarge { n });
    }
    n.checked_mul(n).ok_or(StepError::TooLarge { n })
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepError {
    /// Side length above [`MAX_GRID_SIZE`].
    TooLarge { n: usize },
    /// The field's data does not hold `n * n` cells.
    ShapeMismatch { expected: usize, actual: usize },
    /// The kernel itself could not run.
    Kernel(String),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "field shape mismatch: expected {expected} cells, got {actual}")
            }
            Self::TooLarge { n } => write!(f, "grid size {n} exceeds {MAX_GRID_SIZE}"),
            Self::Kernel(reason) => write!(f, "kernel failed: {reason}"),
        }
    }
}

impl std::error::Error for StepError {}

/// A pure transform advancing a field by `iterations` updates.
///
/// Implementations must return a field of the same shape as the input and
/// must not hold state between calls.
pub trait StepFunction: Send + Sync {
    fn apply(&self, iterations: u32, beta: f32, field: &Field) -> Result<Field, StepError>;
}

/// Explicit five-point heat kernel.
///
/// Each iteration moves every interior cell toward the mean of its four
/// neighbours by `beta`. Boundary cells keep their values.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeatKernel;

impl HeatKernel {
    pub fn new() -> HeatKernel {
        HeatKernel
    }

    fn explicit_step(n: usize, beta: f32, cur: &[f32], next: &mut [f32]) {
        next.copy_from_slice(cur);
        for y in 1..(n - 1) {
            let row = y * n;
            for x in 1..(n - 1) {
                let i = row + x;

                let u = cur[i];
                let up = cur[i - n];
                let down = cur[i + n];
                let left = cur[i - 1];
                let right = cur[i + 1];

                let lap = (up + down + left + right) - 4.0 * u;
                next[i] = u + 0.25 * beta * lap;
            }
        }
    }
}

impl StepFunction for HeatKernel {
    fn apply(&self, iterations: u32, beta: f32, field: &Field) -> Result<Field, StepError> {
        let n = field.n;
        let cells = cell_count(n)?;
        if field.data.len() != cells {
            return Err(StepError::ShapeMismatch {
                expected: cells,
                actual: field.data.len(),
            });
        }
        if iterations == 0 || n < 3 {
            return Ok(field.clone());
        }

        let mut cur = field.data.clone();
        let mut next = vec![0.0f32; cells];
        for _ in 0..iterations {
            Self::explicit_step(n, beta, &cur, &mut next);
            std::mem::swap(&mut cur, &mut next);
        }
        Ok(Field { n, data: cur })
    }
}

/// Maps a field to 8-bit grayscale: `[0, 1]` spans `0..=255`, values outside
/// are clamped and non-finite values become black.
pub fn grayscale(field: &Field) -> Vec<u8> {
    field
        .data
        .iter()
        .map(|&v| {
            if v.is_finite() {
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            } else {
                0
            }
        })
        .collect()
}
