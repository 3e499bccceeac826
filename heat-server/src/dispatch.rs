//! Maps a request path onto the simulation state.

use crate::command::Command;
use crate::error::StepFailure;
use crate::state::SimulationState;
use heat_core::StepFunction;
use tracing::{debug, warn};

pub const UNKNOWN_COMMAND: &str = "unknown command";
pub const NO_IMAGE: &str = "no image";

/// Body produced by a dispatched command.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// Serialized field: little-endian f32, row-major.
    Field(Vec<u8>),
    Png(Vec<u8>),
    Json(String),
    Text(String),
}

impl Response {
    pub fn unknown() -> Response {
        Response::Text(UNKNOWN_COMMAND.to_string())
    }

    pub fn into_body(self) -> Vec<u8> {
        match self {
            Response::Field(bytes) | Response::Png(bytes) => bytes,
            Response::Json(text) | Response::Text(text) => text.into_bytes(),
        }
    }
}

/// Parses `path` and applies it to `state`.
///
/// Unknown or malformed commands yield [`Response::unknown`] and leave the
/// state untouched. Only a failed step, reset or status encoding is returned
/// as an error.
pub fn dispatch(
    path: &str,
    state: &mut SimulationState,
    kernel: &dyn StepFunction,
) -> Result<Response, StepFailure> {
    match Command::parse(path) {
        Ok(cmd) => {
            debug!(command = cmd.name(), path, "dispatch");
            execute(cmd, state, kernel)
        }
        Err(e) => {
            warn!(path, error = %e, "rejected command");
            Ok(Response::unknown())
        }
    }
}

/// Applies an already parsed command.
pub fn execute(
    cmd: Command,
    state: &mut SimulationState,
    kernel: &dyn StepFunction,
) -> Result<Response, StepFailure> {
    let response = match cmd {
        Command::Step { iterations } => {
            state.set_iterations(iterations);
            state.step(kernel)?;
            Response::Field(state.serialized_field())
        }
        Command::Data => Response::Field(state.serialized_field()),
        Command::Reset => {
            state.reset()?;
            Response::Field(state.serialized_field())
        }
        Command::Beta { value, raw } => {
            state.set_beta(value);
            Response::Text(format!("beta = {raw}"))
        }
        Command::GridSize { n, raw } => {
            state.set_n(n);
            Response::Text(format!("n = {raw}"))
        }
        Command::Iterations { iterations, raw } => {
            state.set_iterations(iterations);
            Response::Text(format!("iterations = {raw}"))
        }
        Command::Image => match state.last_image() {
            Some(png) => Response::Png(png.to_vec()),
            None => Response::Text(NO_IMAGE.to_string()),
        },
        Command::Status => Response::Json(serde_json::to_string(&state.status())?),
    };
    Ok(response)
}
