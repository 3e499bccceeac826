//! HTTP front end.
//!
//! Every GET is dispatched while holding the single state lock, so requests
//! are applied one at a time even with several worker threads. HEAD and POST
//! never touch the state.

use crate::dispatch::dispatch;
use crate::error::ServerError;
use crate::state::SimulationState;
use heat_core::StepFunction;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::thread;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{error, info, warn};

pub const POST_BODY: &str = "<html><body><h1>POST!</h1></body></html>";

/// Everything a request handler needs: the state behind its lock, and the
/// step function.
pub struct AppContext {
    state: Mutex<SimulationState>,
    kernel: Box<dyn StepFunction>,
}

impl AppContext {
    pub fn new(state: SimulationState, kernel: Box<dyn StepFunction>) -> AppContext {
        AppContext {
            state: Mutex::new(state),
            kernel,
        }
    }

    /// Runs one GET path against the state.
    ///
    /// Returns the status code and body. A poisoned lock is recovered: the
    /// state is only ever replaced wholesale, so it is never half-written.
    pub fn handle_get(&self, path: &str) -> (u16, Vec<u8>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match dispatch(path, &mut state, self.kernel.as_ref()) {
            Ok(response) => (200, response.into_body()),
            Err(e) => {
                error!(path, error = %e, "request failed");
                (500, e.to_string().into_bytes())
            }
        }
    }

    /// Runs `f` with exclusive access to the state.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut SimulationState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

pub struct HeatServer {
    server: Server,
    context: AppContext,
    headers: Vec<Header>,
}

impl HeatServer {
    pub fn bind(addr: &str, context: AppContext) -> Result<HeatServer, ServerError> {
        let server = Server::http(addr).map_err(|e| ServerError::Bind(e.to_string()))?;
        Ok(HeatServer {
            server,
            context,
            headers: standard_headers()?,
        })
    }

    /// The bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Serves requests on `workers` threads until [`unblock`](Self::unblock)
    /// is called once per worker.
    pub fn serve(&self, workers: usize) {
        info!(addr = ?self.local_addr(), workers, "serving");
        thread::scope(|scope| {
            for _ in 0..workers.max(1) {
                scope.spawn(|| {
                    for request in self.server.incoming_requests() {
                        self.handle(request);
                    }
                });
            }
        });
    }

    /// Wakes one blocked worker so it can exit.
    pub fn unblock(&self) {
        self.server.unblock();
    }

    fn handle(&self, request: Request) {
        let method = request.method().clone();
        let url = request.url().to_string();

        let (status, body) = match method {
            Method::Get => self.context.handle_get(&url),
            Method::Head => (200, Vec::new()),
            Method::Post => (200, POST_BODY.as_bytes().to_vec()),
            _ => {
                warn!(%method, url = %url, "unsupported method");
                let _ = request.respond(Response::empty(501));
                return;
            }
        };

        let mut response = Response::from_data(body).with_status_code(status);
        for header in &self.headers {
            response.add_header(header.clone());
        }
        if let Err(e) = request.respond(response) {
            warn!(%method, url = %url, error = %e, "failed to write response");
        }
    }
}

fn standard_headers() -> Result<Vec<Header>, ServerError> {
    ["Content-Type: text/html", "Access-Control-Allow-Origin: *"]
        .into_iter()
        .map(|raw| raw.parse::<Header>().map_err(|_| ServerError::Header(raw)))
        .collect()
}
