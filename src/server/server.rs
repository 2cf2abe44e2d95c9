//! Server lifecycle: registration, startup, serving, graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, info, warn};

use super::health::{probe_router, ServiceMap};
use super::metrics::{metrics_router, track_requests, Metrics, SharedMetrics};
use super::middleware::{access_log, handle_panic};
use super::service::Service;
use super::shutdown::wait_for_termination;

/// How long in-flight requests may take to finish after shutdown is
/// requested before they are aborted.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Web server configuration. Immutable once the server is constructed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address to listen on, in `host:port` form.
    pub listen_address: String,
    /// Optional namespace prefix for exported metrics.
    #[serde(default)]
    pub subsystem_name: String,
}

/// Errors surfaced by the server lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// The listen address could not be acquired. Fatal to the run
    /// attempt; the server stays idle.
    #[error("failed to bind {address}: {reason}")]
    Bind { address: String, reason: String },

    /// The transport failed while serving, for a reason other than an
    /// intentional shutdown.
    #[error("serving failed: {0}")]
    Serve(String),

    /// A service is already registered under the requested name.
    #[error("service {0:?} is already registered")]
    DuplicateService(String),

    /// The operation requires an idle server.
    #[error("server is already running")]
    AlreadyRunning,

    /// The operation requires a serving server.
    #[error("server is not running")]
    NotRunning,

    /// The metrics registry rejected the configured subsystem name.
    #[error("failed to initialize metrics: {0}")]
    Metrics(String),
}

/// Invoked with the terminal outcome once a run cycle has fully
/// stopped: `Ok(())` after a graceful shutdown, [`ServerError::Serve`]
/// after an unexpected transport failure.
pub type CompletionCallback = Box<dyn FnOnce(Result<(), ServerError>) + Send + 'static>;

/// State held only while the server is serving.
struct Running {
    local_addr: SocketAddr,
    stop: watch::Sender<bool>,
    supervisor: JoinHandle<Result<(), ServerError>>,
}

/// Web server hosting an arbitrary collection of [`Service`]s, with
/// Kubernetes probes and Prometheus metrics.
///
/// Services register before serving begins; the registry is frozen for
/// the duration of a run cycle. The server may serve again after a
/// completed shutdown, but never concurrently with itself.
pub struct Server {
    config: ServerConfig,
    router: Router,
    services: ServiceMap,
    metrics: SharedMetrics,
    running: Option<Running>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("running", &self.running.is_some())
            .finish()
    }
}

impl Server {
    /// Create an idle server for the given configuration.
    pub fn new(config: ServerConfig) -> Result<Server, ServerError> {
        let metrics =
            Metrics::new(&config.subsystem_name).map_err(|e| ServerError::Metrics(e.to_string()))?;
        Ok(Server {
            config,
            router: Router::new(),
            services: ServiceMap::new(),
            metrics,
            running: None,
        })
    }

    /// Register a named service.
    ///
    /// The service adds its own routes to the shared router and is
    /// included in probe aggregation and lifecycle notifications under
    /// `name`. Fails without side effects when `name` is taken or the
    /// server is already serving.
    pub fn register_service(
        &mut self,
        name: &str,
        service: Arc<dyn Service>,
    ) -> Result<(), ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }
        if self.services.contains_key(name) {
            return Err(ServerError::DuplicateService(name.to_string()));
        }

        let router = std::mem::take(&mut self.router);
        self.router = service.register_routes(router);
        self.services.insert(name.to_string(), service);
        debug!(service = %name, "Service registered");
        Ok(())
    }

    /// Address the server is bound to, if serving.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Begin serving on a background task.
    ///
    /// Binds the listen address and notifies every registered service's
    /// `begin_serving` in name order before returning, so all services
    /// are considered started once this call succeeds. Returns the
    /// bound address.
    ///
    /// `callback`, if supplied, receives the terminal outcome after the
    /// run cycle has fully stopped and all `stop_serving` notifications
    /// have been delivered. Use [`Server::shutdown`] to stop gracefully.
    pub async fn start(
        &mut self,
        callback: Option<CompletionCallback>,
    ) -> Result<SocketAddr, ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.config.listen_address)
            .await
            .map_err(|e| ServerError::Bind {
                address: self.config.listen_address.clone(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
            address: self.config.listen_address.clone(),
            reason: e.to_string(),
        })?;

        let services = Arc::new(self.services.clone());
        let app = self.build_app(services.clone());

        // Log after successful bind - the listener is actually accepting
        info!(address = %local_addr, services = services.len(), "Server listening");

        for (name, service) in services.iter() {
            debug!(service = %name, "Notifying BeginServing");
            service.begin_serving();
        }

        let (stop_tx, stop_rx) = watch::channel(false);

        let mut drain_rx = stop_rx.clone();
        let serve = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    // An error means the sender is gone; treat as stop.
                    let _ = drain_rx.wait_for(|stop| *stop).await;
                })
                .await
        });

        let supervisor = tokio::spawn(supervise(serve, stop_rx, services, callback));

        self.running = Some(Running {
            local_addr,
            stop: stop_tx,
            supervisor,
        });
        Ok(local_addr)
    }

    /// Execute the server until the host environment requests
    /// termination, then shut down gracefully.
    ///
    /// Returns `Ok(())` after a graceful shutdown and
    /// [`ServerError::Serve`] when the transport fails on its own;
    /// callers typically treat the latter as fatal to the process.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.start(None).await?;

        let finished = {
            let running = match self.running.as_mut() {
                Some(running) => running,
                None => return Err(ServerError::NotRunning),
            };
            tokio::select! {
                signal = wait_for_termination() => {
                    info!(signal, "Termination requested -> shutting down server");
                    None
                }
                joined = &mut running.supervisor => Some(join_outcome(joined)),
            }
        };

        match finished {
            // Serving ended on its own; nothing left to stop.
            Some(outcome) => {
                self.running = None;
                outcome
            }
            None => self.shutdown().await,
        }
    }

    /// Gracefully stop serving.
    ///
    /// Stops accepting new connections, then waits until in-flight
    /// requests drain or the grace period expires, whichever comes
    /// first. Returns only after `stop_serving` has been delivered to
    /// every service.
    pub async fn shutdown(&mut self) -> Result<(), ServerError> {
        let running = self.running.take().ok_or(ServerError::NotRunning)?;
        let _ = running.stop.send(true);
        join_outcome(running.supervisor.await)
    }

    /// Compose service routes, probes, metrics and the request-boundary
    /// middleware into the final application router.
    fn build_app(&self, services: Arc<ServiceMap>) -> Router {
        self.router
            .clone()
            .merge(probe_router(services))
            .merge(metrics_router(self.metrics.clone()))
            .route_layer(axum::middleware::from_fn_with_state(
                self.metrics.clone(),
                track_requests,
            ))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(axum::middleware::from_fn(access_log))
    }
}

/// Map a supervisor join result onto the terminal outcome.
fn join_outcome(
    joined: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => Err(ServerError::Serve(format!("lifecycle task failed: {e}"))),
    }
}

/// Watch the serve task until it finishes or a stop is requested,
/// enforce the drain grace period, then deliver `stop_serving`
/// notifications exactly once and invoke the completion callback.
async fn supervise(
    mut serve: JoinHandle<std::io::Result<()>>,
    mut stop_rx: watch::Receiver<bool>,
    services: Arc<ServiceMap>,
    callback: Option<CompletionCallback>,
) -> Result<(), ServerError> {
    let served = tokio::select! {
        joined = &mut serve => serve_outcome(joined),
        _ = async { let _ = stop_rx.wait_for(|stop| *stop).await; } => {
            match tokio::time::timeout(DRAIN_GRACE, &mut serve).await {
                Ok(joined) => serve_outcome(joined),
                Err(_) => {
                    warn!(grace = ?DRAIN_GRACE, "Drain grace period expired -> aborting in-flight requests");
                    serve.abort();
                    Ok(())
                }
            }
        }
    };

    // A requested stop (or a dropped server) makes a clean serve exit a
    // graceful shutdown; anything else is a transport failure.
    let stop_requested = *stop_rx.borrow() || stop_rx.has_changed().is_err();
    let outcome = match served {
        Ok(()) if stop_requested => {
            info!("Server gracefully shut down");
            Ok(())
        }
        Ok(()) => Err(ServerError::Serve("listener closed unexpectedly".to_string())),
        Err(e) => Err(e),
    };

    for (name, service) in services.iter() {
        debug!(service = %name, "Notifying StopServing");
        service.stop_serving();
    }

    if let Some(callback) = callback {
        callback(outcome.clone());
    }
    outcome
}

/// Translate the serve task's join result into a serve result.
fn serve_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServerError::Serve(e.to_string())),
        Err(e) => Err(ServerError::Serve(format!("serve task failed: {e}"))),
    }
}
