pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod render;
pub mod seed;
pub mod state;
pub mod transport;

pub use command::Command;
pub use dispatch::{Response, dispatch};
pub use state::SimulationState;
pub use transport::{AppContext, HeatServer};
