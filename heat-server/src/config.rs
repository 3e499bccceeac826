use crate::render::ImageStore;
use crate::state::SimulationState;
use heat_core::MAX_GRID_SIZE;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Serve a heat field over HTTP")]
pub struct Args {
    /// Interface to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// TCP port
    #[arg(long, default_value_t = 8001)]
    pub port: u16,

    /// Initial grid size N (NxN)
    #[arg(long, default_value_t = 400)]
    pub n: usize,

    /// Initial diffusion coefficient
    #[arg(long, default_value_t = 0.5)]
    pub beta: f32,

    /// Kernel iterations per step
    #[arg(long, default_value_t = 1)]
    pub iterations: u32,

    /// Write heat_image<step>.png and steps.jsonl here after every step
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// RNG seed for the initial field (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Request threads; all of them share one state lock
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
}

impl Args {
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.n == 0 || self.n > MAX_GRID_SIZE {
            return Err(format!("n must be in 1..={MAX_GRID_SIZE}").into());
        }
        if self.workers == 0 {
            return Err("workers must be >= 1".into());
        }
        if !self.beta.is_finite() {
            return Err("beta must be finite".into());
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Builds the initial state described by these arguments.
    pub fn build_state(&self) -> Result<SimulationState, Box<dyn std::error::Error>> {
        let mut state = match self.seed {
            Some(seed) => SimulationState::with_seed(self.n, seed),
            None => SimulationState::new(self.n),
        };
        state.set_beta(self.beta);
        state.set_iterations(self.iterations);

        if let Some(dir) = &self.image_dir {
            let store = ImageStore::open(dir)?;
            state = state.with_image_store(store);
        }
        Ok(state)
    }
}
