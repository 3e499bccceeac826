//! The simulation state: the heat field plus its parameters.

use crate::error::StepFailure;
use crate::render::{ImageStore, StepRecord, encode_png};
use crate::seed::seed_field;
use heat_core::{Field, MAX_GRID_SIZE, StepError, StepFunction};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs;
use std::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_ITERATIONS: u32 = 1;
pub const DEFAULT_BETA: f32 = 0.5;

/// Owns the field and the parameters used to advance it.
///
/// `n` is the size used by the next [`reset`](Self::reset); the field keeps
/// its own size until then.
pub struct SimulationState {
    n: usize,
    iterations: u32,
    beta: f32,
    step_count: u64,
    field: Field,
    last_image: Option<Vec<u8>>,
    rng: ChaCha8Rng,
    images: Option<ImageStore>,
}

/// Parameter snapshot served by `/status`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StateStatus {
    pub n: usize,
    pub field_n: usize,
    pub iterations: u32,
    pub beta: f32,
    pub step_count: u64,
    pub has_image: bool,
}

impl SimulationState {
    pub fn new(n: usize) -> SimulationState {
        Self::with_rng(n, ChaCha8Rng::from_entropy())
    }

    /// Like [`new`](Self::new) but reproducible: the seeded field and every
    /// later reset depend only on `seed`.
    pub fn with_seed(n: usize, seed: u64) -> SimulationState {
        Self::with_rng(n, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(n: usize, mut rng: ChaCha8Rng) -> SimulationState {
        let field = seed_field(&mut rng, n);
        SimulationState {
            n,
            iterations: DEFAULT_ITERATIONS,
            beta: DEFAULT_BETA,
            step_count: 0,
            field,
            last_image: None,
            rng,
            images: None,
        }
    }

    /// Writes a PNG per step into `store`. Reset clears it and writes frame 0.
    pub fn with_image_store(mut self, store: ImageStore) -> SimulationState {
        self.images = Some(store);
        self
    }

    // ---- Parameters ----

    pub fn set_beta(&mut self, beta: f32) {
        self.beta = beta;
    }

    /// Takes effect at the next reset, which fails for `n > MAX_GRID_SIZE`.
    pub fn set_n(&mut self, n: usize) {
        self.n = n;
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.iterations = iterations;
    }

    // ---- Accessors ----

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn last_image(&self) -> Option<&[u8]> {
        self.last_image.as_deref()
    }

    pub fn status(&self) -> StateStatus {
        StateStatus {
            n: self.n,
            field_n: self.field.n(),
            iterations: self.iterations,
            beta: self.beta,
            step_count: self.step_count,
            has_image: self.last_image.is_some(),
        }
    }

    /// Row-major little-endian f32 bytes of the current field.
    pub fn serialized_field(&self) -> Vec<u8> {
        self.field.to_le_bytes()
    }

    // ---- Lifecycle ----

    /// Advances the field by one call to `kernel` and renders it.
    ///
    /// On failure nothing is changed: the field, counter and image stay as
    /// they were.
    pub fn step(&mut self, kernel: &dyn StepFunction) -> Result<(), StepFailure> {
        let t0 = Instant::now();
        let next = kernel.apply(self.iterations, self.beta, &self.field)?;
        let kernel_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let expected = self.field.n();
        if next.n() != expected || next.data().len() != expected * expected {
            return Err(StepError::ShapeMismatch {
                expected: expected * expected,
                actual: next.data().len(),
            }
            .into());
        }

        let png = encode_png(&next)?;
        let step_count = self.step_count + 1;

        if let Some(store) = &self.images {
            let path = store.write_image(step_count, &png)?;
            let record = StepRecord {
                step_count,
                n: expected,
                iterations: self.iterations,
                beta: self.beta,
                kernel_ms,
            };
            if let Err(e) = store.append_record(&record) {
                // the counter does not advance, so neither may the image
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }
            debug!(path = %path.display(), "image written");
        }

        self.field = next;
        self.last_image = Some(png);
        self.step_count = step_count;

        info!(
            step_count,
            iterations = self.iterations,
            beta = self.beta,
            kernel_ms,
            "step"
        );
        Ok(())
    }

    /// Re-seeds an `n x n` field, zeroes the counter and drops the image.
    ///
    /// With an image store, the directory is emptied and the new field is
    /// written as frame 0. `last_image` still stays empty until the next step.
    pub fn reset(&mut self) -> Result<(), StepFailure> {
        if self.n > MAX_GRID_SIZE {
            return Err(StepError::TooLarge { n: self.n }.into());
        }
        let field = seed_field(&mut self.rng, self.n);

        if let Some(store) = &self.images {
            let removed = store.clear_images()?;
            let path = store.write_image(0, &encode_png(&field)?)?;
            debug!(removed, path = %path.display(), "images cleared");
        }

        self.field = field;
        self.step_count = 0;
        self.last_image = None;
        info!(n = self.n, beta = self.beta, iterations = self.iterations, "reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heat_core::HeatKernel;
    use proptest::prelude::*;

    /// Returns a field one cell short, to exercise the shape check.
    struct Truncating;

    impl StepFunction for Truncating {
        fn apply(&self, _: u32, _: f32, field: &Field) -> Result<Field, StepError> {
            let n = field.n() - 1;
            Field::from_vec(n, vec![0.0; n * n])
        }
    }

    struct Failing;

    impl StepFunction for Failing {
        fn apply(&self, _: u32, _: f32, _: &Field) -> Result<Field, StepError> {
            Err(StepError::Kernel("device lost".into()))
        }
    }

    #[test]
    fn defaults() {
        let s = SimulationState::with_seed(10, 1);
        assert_eq!(s.n(), 10);
        assert_eq!(s.iterations(), 1);
        assert_eq!(s.beta(), 0.5);
        assert_eq!(s.step_count(), 0);
        assert_eq!(s.field().data().len(), 100);
        assert!(s.last_image().is_none());
    }

    #[test]
    fn step_counts_and_renders() {
        let mut s = SimulationState::with_seed(10, 1);
        s.step(&HeatKernel).unwrap();
        s.step(&HeatKernel).unwrap();
        assert_eq!(s.step_count(), 2);
        assert!(s.last_image().is_some());
    }

    #[test]
    fn zero_iterations_still_counts() {
        let mut s = SimulationState::with_seed(10, 1);
        s.set_iterations(0);
        let before = s.serialized_field();
        s.step(&HeatKernel).unwrap();
        assert_eq!(s.step_count(), 1);
        assert_eq!(s.serialized_field(), before);
    }

    #[test]
    fn reset_zeroes_counter_and_drops_image() {
        let mut s = SimulationState::with_seed(10, 1);
        s.step(&HeatKernel).unwrap();
        s.reset().unwrap();
        assert_eq!(s.step_count(), 0);
        assert!(s.last_image().is_none());
    }

    #[test]
    fn grid_size_applies_on_reset() {
        let mut s = SimulationState::with_seed(10, 1);
        s.set_n(50);
        assert_eq!(s.serialized_field().len(), 4 * 10 * 10);
        s.step(&HeatKernel).unwrap();
        assert_eq!(s.field().n(), 10);
        s.reset().unwrap();
        assert_eq!(s.serialized_field().len(), 4 * 50 * 50);
    }

    #[test]
    fn parameters_persist_across_steps() {
        let mut s = SimulationState::with_seed(8, 3);
        s.set_beta(0.3);
        s.set_iterations(4);
        s.step(&HeatKernel).unwrap();
        s.step(&HeatKernel).unwrap();
        assert_eq!(s.beta(), 0.3);
        assert_eq!(s.iterations(), 4);
    }

    #[test]
    fn shape_mismatch_fails_without_mutation() {
        let mut s = SimulationState::with_seed(6, 2);
        let before = s.serialized_field();
        let err = s.step(&Truncating).unwrap_err();
        assert!(matches!(err, StepFailure::Kernel(StepError::ShapeMismatch { expected: 36, actual: 25 })));
        assert_eq!(s.step_count(), 0);
        assert_eq!(s.serialized_field(), before);
    }

    #[test]
    fn kernel_failure_propagates() {
        let mut s = SimulationState::with_seed(6, 2);
        assert!(matches!(s.step(&Failing), Err(StepFailure::Kernel(StepError::Kernel(_)))));
        assert_eq!(s.step_count(), 0);
    }

    #[test]
    fn image_store_follows_steps() {
        let dir = std::env::temp_dir().join(format!("heat-state-images-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store = ImageStore::open(&dir).unwrap();
        let mut s = SimulationState::with_seed(6, 2).with_image_store(store.clone());

        s.step(&HeatKernel).unwrap();
        s.step(&HeatKernel).unwrap();
        assert!(store.image_path(1).exists());
        assert!(store.image_path(2).exists());
        assert_eq!(std::fs::read(store.image_path(2)).unwrap(), s.last_image().unwrap());

        s.reset().unwrap();
        assert!(!store.image_path(1).exists());
        assert!(!store.image_path(2).exists());
        assert!(s.last_image().is_none());

        let frame0 = std::fs::read(store.image_path(0)).unwrap();
        assert_eq!(frame0, encode_png(s.field()).unwrap());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_record_leaves_no_image() {
        let dir = std::env::temp_dir().join(format!("heat-state-records-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store = ImageStore::open(&dir).unwrap();
        // a directory where the step log should be makes appends fail
        std::fs::create_dir(dir.join(ImageStore::RECORD_FILE)).unwrap();
        let mut s = SimulationState::with_seed(6, 2).with_image_store(store.clone());

        assert!(matches!(s.step(&HeatKernel), Err(StepFailure::Store(_))));
        assert_eq!(s.step_count(), 0);
        assert!(!store.image_path(1).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn oversized_reset_fails_without_mutation() {
        let mut s = SimulationState::with_seed(6, 2);
        s.step(&HeatKernel).unwrap();
        s.set_n(MAX_GRID_SIZE + 1);
        let err = s.reset().unwrap_err();
        assert!(matches!(err, StepFailure::Kernel(StepError::TooLarge { .. })));
        assert_eq!(s.step_count(), 1);
        assert_eq!(s.field().n(), 6);
    }

    #[test]
    fn status_reports_pending_grid_size() {
        let mut s = SimulationState::with_seed(10, 1);
        s.set_n(20);
        let st = s.status();
        assert_eq!((st.n, st.field_n), (20, 10));
        assert!(!st.has_image);
    }

    proptest! {
        #[test]
        fn serialized_field_round_trips(n in 1usize..40, seed in any::<u64>()) {
            let s = SimulationState::with_seed(n, seed);
            let bytes = s.serialized_field();
            prop_assert_eq!(bytes.len(), 4 * n * n);
            let back = Field::from_le_bytes(n, &bytes).unwrap();
            prop_assert_eq!(&back, s.field());
        }
    }
}
