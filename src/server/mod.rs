//! Server module
//!
//! Three HTTP listeners share one poll engine:
//!
//! | Listener  | Routes                                  |
//! |-----------|-----------------------------------------|
//! | display   | `GET /api/poll`                         |
//! | dashboard | `POST /api/start`, `/api/stop`, `/api/reset` |
//! | voting    | `POST /api/vote`, `GET /api/cooldown`   |
//!
//! Every listener also answers `GET /health`.

pub mod connect_info;
pub mod error;
pub mod handlers;

use crate::config::{Config, CorsConfig};
use crate::polls::PollEngine;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{listener} listener could not bind {addr}: {source}")]
    Bind {
        listener: Listener,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("{listener} listener failed: {source}")]
    Serve {
        listener: Listener,
        #[source]
        source: std::io::Error,
    },

    #[error("no listener could be started")]
    NoListeners,
}

/// The three HTTP surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// Broadcast overlay: read-only results
    Display,
    /// Operator controls
    Dashboard,
    /// Public voting
    Voting,
}

impl Listener {
    pub const ALL: [Listener; 3] = [Listener::Display, Listener::Dashboard, Listener::Voting];

    pub fn name(&self) -> &'static str {
        match self {
            Listener::Display => "display",
            Listener::Dashboard => "dashboard",
            Listener::Voting => "voting",
        }
    }

    /// Configured address for this listener
    pub fn addr(&self, config: &Config) -> SocketAddr {
        match self {
            Listener::Display => config.display.bind,
            Listener::Dashboard => config.dashboard.bind,
            Listener::Voting => config.voting.bind,
        }
    }
}

impl fmt::Display for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<PollEngine>,
    /// Use `X-Forwarded-For` for voter identity
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(engine: Arc<PollEngine>) -> Self {
        Self {
            engine,
            trust_forwarded_for: false,
        }
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}

/// Routes for one listener, without middleware
pub fn create_router(listener: Listener, state: AppState) -> Router {
    let router = match listener {
        Listener::Display => Router::new().route("/api/poll", get(handlers::results::get_poll)),
        Listener::Dashboard => Router::new()
            .route("/api/start", post(handlers::control::start_poll))
            .route("/api/stop", post(handlers::control::stop_poll))
            .route("/api/reset", post(handlers::control::reset_poll)),
        Listener::Voting => Router::new()
            .route("/api/vote", post(handlers::vote::cast_vote))
            .route("/api/cooldown", get(handlers::vote::check_cooldown)),
    };

    router
        .route("/health", get(move || handlers::health_handler(listener)))
        .with_state(state)
}

/// Routes plus CORS and request tracing
pub fn create_app(listener: Listener, state: AppState, cors: &CorsConfig) -> Router {
    create_router(listener, state)
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// The pages on one port fetch from the others, so cross-origin requests are
/// expected. An empty origin list allows any origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Listeners that bound successfully, ready to serve
pub struct BoundServer {
    listeners: Vec<(Listener, TcpListener, Router)>,
    engine: Arc<PollEngine>,
    sweep_interval: Duration,
}

impl fmt::Debug for BoundServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundServer")
            .field("listeners", &self.local_addrs())
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

impl BoundServer {
    /// Bind every configured listener.
    ///
    /// A listener that cannot bind is logged and skipped; the call fails only
    /// when none of them could bind.
    pub async fn bind(config: &Config, engine: Arc<PollEngine>) -> Result<Self, ServerError> {
        let state = AppState::new(Arc::clone(&engine))
            .with_trust_forwarded_for(config.voting.trust_forwarded_for);

        let mut listeners = Vec::new();
        for listener in Listener::ALL {
            match bind_listener(listener, listener.addr(config)).await {
                Ok(tcp) => {
                    let app = create_app(listener, state.clone(), &config.cors);
                    listeners.push((listener, tcp, app));
                }
                Err(err) => tracing::error!("{}", err),
            }
        }

        if listeners.is_empty() {
            return Err(ServerError::NoListeners);
        }

        Ok(Self {
            listeners,
            engine,
            sweep_interval: Duration::from_secs(config.voting.sweep_interval_secs),
        })
    }

    /// Actual addresses, useful when binding port 0
    pub fn local_addrs(&self) -> Vec<(Listener, SocketAddr)> {
        self.listeners
            .iter()
            .filter_map(|(listener, tcp, _)| tcp.local_addr().ok().map(|addr| (*listener, addr)))
            .collect()
    }

    pub fn local_addr(&self, listener: Listener) -> Option<SocketAddr> {
        self.local_addrs()
            .into_iter()
            .find(|(l, _)| *l == listener)
            .map(|(_, addr)| addr)
    }

    /// Serve until `shutdown` resolves, then drain every listener.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();

        for (listener, tcp, app) in self.listeners {
            let mut stop = stop_rx.clone();
            tasks.spawn(async move {
                tracing::info!(listener = %listener, addr = ?tcp.local_addr().ok(), "listening");
                axum::serve(
                    tcp,
                    app.into_make_service_with_connect_info::<SocketAddr>(),
                )
                .with_graceful_shutdown(async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                })
                .await
                .map_err(|source| ServerError::Serve { listener, source })
            });
        }

        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&self.engine),
            self.sweep_interval,
            stop_rx.clone(),
        ));

        tokio::spawn(async move {
            shutdown.await;
            tracing::info!("shutting down");
            let _ = stop_tx.send(true);
        });

        let mut result = Ok(());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!("{}", err);
                    result = Err(err);
                }
                Err(err) => tracing::error!(error = %err, "listener task panicked"),
            }
        }

        sweeper.abort();
        result
    }
}

async fn bind_listener(listener: Listener, addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            listener,
            addr,
            source,
        })
}

/// Periodically evict expired cooldown entries until told to stop.
pub async fn run_sweeper(
    engine: Arc<PollEngine>,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // first tick fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = engine.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cooldowns");
                }
            }
            _ = stop.wait_for(|stopped| *stopped) => break,
        }
    }
}

/// Bind and serve with the given config until Ctrl-C.
pub async fn serve(config: &Config, engine: Arc<PollEngine>) -> Result<(), ServerError> {
    let server = BoundServer::bind(config, engine).await?;
    server
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polls::PollEngine;

    #[test]
    fn test_listener_names() {
        let names: Vec<_> = Listener::ALL.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["display", "dashboard", "voting"]);
    }

    #[test]
    fn test_listener_addr_from_config() {
        let config = Config::default();
        assert_eq!(Listener::Display.addr(&config).port(), 5000);
        assert_eq!(Listener::Dashboard.addr(&config).port(), 5001);
        assert_eq!(Listener::Voting.addr(&config).port(), 5002);
    }

    #[test]
    fn test_cors_layer_with_invalid_origin_does_not_panic() {
        let config = CorsConfig {
            allowed_origins: vec!["http://localhost:5000".to_string(), "bad\norigin".to_string()],
        };
        let _ = cors_layer(&config);
    }

    #[tokio::test]
    async fn test_bind_reports_address_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = bind_listener(Listener::Voting, addr).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { listener: Listener::Voting, .. }));
        assert!(err.to_string().starts_with("voting listener could not bind"));
    }

    #[tokio::test]
    async fn test_bind_skips_busy_listener() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = Config::default();
        config.display.bind = taken.local_addr().unwrap();
        config.dashboard.bind = "127.0.0.1:0".parse().unwrap();
        config.voting.bind = "127.0.0.1:0".parse().unwrap();

        let server = BoundServer::bind(&config, Arc::new(PollEngine::default()))
            .await
            .unwrap();
        assert!(server.local_addr(Listener::Display).is_none());
        assert!(server.local_addr(Listener::Dashboard).is_some());
        assert!(server.local_addr(Listener::Voting).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_and_stops() {
        let engine = Arc::new(PollEngine::new(Duration::from_secs(1)));
        engine
            .start_poll("Q", &["A".to_string(), "B".to_string()])
            .unwrap();
        engine
            .cast_vote_at("v1", "A", std::time::Instant::now() - Duration::from_secs(5))
            .unwrap();
        assert_eq!(engine.get_stats().tracked_voters, 1);

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run_sweeper(Arc::clone(&engine), Duration::from_secs(10), rx));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(engine.get_stats().tracked_voters, 0);

        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
