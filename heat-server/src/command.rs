//! Request-path commands.
//!
//! A command is `/<name>` or `/<name>=<arg>`. Parsing is the only place a
//! request can be rejected; once a [`Command`] exists it always dispatches.

use crate::error::CommandError;
use heat_core::MAX_GRID_SIZE;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Set the iteration count, then advance one step.
    Step { iterations: u32 },
    /// Current field bytes.
    Data,
    /// Re-seed the field at the configured size.
    Reset,
    Beta { value: f32, raw: String },
    /// Grid size for the next reset, in `1..=MAX_GRID_SIZE`.
    GridSize { n: usize, raw: String },
    Iterations { iterations: u32, raw: String },
    /// PNG of the last step.
    Image,
    /// JSON parameter snapshot.
    Status,
}

impl Command {
    /// Parses a request path such as `/beta=0.3`.
    ///
    /// A path with more than one `=` has no argument form and is rejected as
    /// unknown. Status commands keep the raw argument text so the response can
    /// echo it back unchanged.
    pub fn parse(path: &str) -> Result<Command, CommandError> {
        let body = path.trim_start_matches('/');
        let parts: Vec<&str> = body.split('=').collect();
        let (name, arg) = match parts.as_slice() {
            [name] => (*name, None),
            [name, arg] => (*name, Some(*arg)),
            _ => {
                return Err(CommandError::Unknown {
                    name: parts[0].to_string(),
                })
            }
        };

        match (name, arg) {
            ("data", None) => Ok(Command::Data),
            ("reset", None) => Ok(Command::Reset),
            ("image", None) => Ok(Command::Image),
            ("status", None) => Ok(Command::Status),
            ("step", Some(arg)) => Ok(Command::Step {
                iterations: parse_arg(name, arg, "a non-negative integer")?,
            }),
            ("beta", Some(arg)) => {
                let value: f32 = parse_arg(name, arg, "a finite number")?;
                if !value.is_finite() {
                    return Err(parameter(name, arg, "a finite number"));
                }
                Ok(Command::Beta { value, raw: arg.to_string() })
            }
            ("n", Some(arg)) => {
                const EXPECTED: &str = "an integer in 1..=8192";
                let n: usize = parse_arg(name, arg, EXPECTED)?;
                if n == 0 || n > MAX_GRID_SIZE {
                    return Err(parameter(name, arg, EXPECTED));
                }
                Ok(Command::GridSize { n, raw: arg.to_string() })
            }
            ("iterations", Some(arg)) => Ok(Command::Iterations {
                iterations: parse_arg(name, arg, "a non-negative integer")?,
                raw: arg.to_string(),
            }),
            _ => Err(CommandError::Unknown {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Step { .. } => "step",
            Command::Data => "data",
            Command::Reset => "reset",
            Command::Beta { .. } => "beta",
            Command::GridSize { .. } => "n",
            Command::Iterations { .. } => "iterations",
            Command::Image => "image",
            Command::Status => "status",
        }
    }
}

fn parse_arg<T: FromStr>(name: &str, arg: &str, expected: &'static str) -> Result<T, CommandError> {
    arg.trim().parse().map_err(|_| parameter(name, arg, expected))
}

fn parameter(name: &str, arg: &str, expected: &'static str) -> CommandError {
    CommandError::Parameter {
        name: name.to_string(),
        arg: arg.to_string(),
        expected,
    }
}
