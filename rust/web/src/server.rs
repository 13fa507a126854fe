use crate::config::ServerSettings;
use crate::errors::{ErrorResponse, IntoErrorResponse};
use crate::events::EventBus;
use crate::handlers;
use crate::metrics::MetricsCollector;
use crate::middleware::with_request_logging;
use crate::session::{PlayerCommand, SessionError, SessionId, SessionManager};
use crate::ticker::{spawn_ticker, TickerSettings};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::body::BodyDeserializeError;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject::MethodNotAllowed;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// Shared state handed to every route.
#[derive(Debug, Clone)]
pub struct AppContext {
    settings: ServerSettings,
    event_bus: Arc<EventBus>,
    sessions: Arc<SessionManager>,
    metrics: MetricsCollector,
}

impl AppContext {
    pub fn new(settings: ServerSettings) -> Self {
        let event_bus = Arc::new(EventBus::with_buffer(settings.event_buffer));
        let metrics = MetricsCollector::new();
        let sessions = Arc::new(
            SessionManager::with_ttl(Arc::clone(&event_bus), settings.session_ttl())
                .with_defaults(settings.match_settings.to_match_config())
                .with_metrics(metrics.clone()),
        );
        Self {
            settings,
            event_bus,
            sessions,
            metrics,
        }
    }

    pub fn new_for_tests() -> Self {
        let mut settings = ServerSettings::default();
        settings.port = 0;
        settings.match_settings.seed = Some(7);
        Self::new(settings)
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            context: AppContext::new(settings),
        }
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Binds the listener and spawns both the HTTP server and the match
    /// ticker.
    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let settings = context.settings().clone();
        let bind_addr = Self::bind_addr(&settings)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes(&context))
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(%addr, "web server listening");

        let (ticker_tx, ticker_rx) = oneshot::channel();
        let ticker = spawn_ticker(
            context.sessions(),
            TickerSettings {
                tick_interval: settings.tick_interval(),
                cleanup_interval: settings.cleanup_interval(),
            },
            ticker_rx,
        );
        let server = tokio::spawn(server_future);

        Ok(ServerHandle {
            addr,
            shutdown: Some(shutdown_tx),
            ticker_shutdown: Some(ticker_tx),
            server: Some(server),
            ticker: Some(ticker),
            context,
        })
    }

    fn bind_addr(settings: &ServerSettings) -> Result<SocketAddr, ServerError> {
        let host = settings.host.as_str();

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, settings.port));
        }

        let candidate = format!("{}:{}", host, settings.port);
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(io_err) = err
            .source()
            .and_then(|source| source.downcast_ref::<std::io::Error>())
        {
            return ServerError::BindError(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }

        ServerError::ConfigError(err.to_string())
    }
}

/// The full route tree, also used directly by `warp::test` in tests.
pub fn routes(
    context: &AppContext,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let tree = health_routes(context)
        .or(session_routes(context))
        .unify()
        .or(player_routes(context))
        .unify()
        .or(sse_routes(context))
        .unify()
        .boxed();

    with_request_logging(tree, context.metrics()).recover(handle_rejection)
}

fn health_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| handlers::health().into_response());

    let metrics = context.metrics();
    let snapshot = warp::path!("metrics")
        .and(warp::get())
        .map(move || handlers::metrics(&metrics).into_response());

    health.or(snapshot).unify().boxed()
}

fn session_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let sessions = context.sessions();

    let create = warp::path!("api" / "sessions")
        .and(warp::post())
        .and(with_session_manager(sessions.clone()))
        .and(optional_json::<handlers::CreateSessionRequest>())
        .then(
            |sessions: Arc<SessionManager>, request: handlers::CreateSessionRequest| {
                handlers::create_session(sessions, request)
            },
        );

    let info = warp::path!("api" / "sessions" / SessionId)
        .and(warp::get())
        .and(with_session_manager(sessions.clone()))
        .then(|session_id: SessionId, sessions: Arc<SessionManager>| {
            handlers::get_session(sessions, session_id)
        });

    let state = warp::path!("api" / "sessions" / SessionId / "state")
        .and(warp::get())
        .and(with_session_manager(sessions.clone()))
        .then(|session_id: SessionId, sessions: Arc<SessionManager>| {
            handlers::get_session_state(sessions, session_id)
        });

    let delete = warp::path!("api" / "sessions" / SessionId)
        .and(warp::delete())
        .and(with_session_manager(sessions))
        .then(|session_id: SessionId, sessions: Arc<SessionManager>| {
            handlers::delete_session(sessions, session_id)
        });

    create
        .or(state)
        .unify()
        .or(info)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn player_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let sessions = context.sessions();

    let join = warp::path!("api" / "sessions" / SessionId / "players")
        .and(warp::post())
        .and(with_session_manager(sessions.clone()))
        .then(|session_id: SessionId, sessions: Arc<SessionManager>| {
            handlers::join(sessions, session_id)
        });

    let leave = warp::path!("api" / "sessions" / SessionId / "players" / u64)
        .and(warp::delete())
        .and(with_session_manager(sessions.clone()))
        .then(
            |session_id: SessionId, player: u64, sessions: Arc<SessionManager>| {
                handlers::leave(sessions, session_id, player)
            },
        );

    let deal = simple_command("deal", PlayerCommand::Deal, sessions.clone());
    let start = simple_command("start", PlayerCommand::Start, sessions.clone());
    let reset_flag = simple_command("reset-flag", PlayerCommand::ResetFlag, sessions.clone());

    let play = warp::path!("api" / "sessions" / SessionId / "players" / u64 / "play")
        .and(warp::post())
        .and(with_session_manager(sessions))
        .and(warp::body::json())
        .then(
            |session_id: SessionId,
             player: u64,
             sessions: Arc<SessionManager>,
             request: handlers::PlayRequest| {
                handlers::command(
                    sessions,
                    session_id,
                    player,
                    PlayerCommand::Play {
                        card_id: request.card_id,
                    },
                )
            },
        );

    join.or(leave)
        .unify()
        .or(deal)
        .unify()
        .or(start)
        .unify()
        .or(play)
        .unify()
        .or(reset_flag)
        .unify()
        .boxed()
}

/// A body-less command route: `POST /api/sessions/{sid}/players/{pid}/{verb}`.
fn simple_command(
    verb: &'static str,
    command: PlayerCommand,
    sessions: Arc<SessionManager>,
) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "sessions" / SessionId / "players" / u64 / ..)
        .and(warp::path(verb))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_session_manager(sessions))
        .then(
            move |session_id: SessionId, player: u64, sessions: Arc<SessionManager>| {
                handlers::command(sessions, session_id, player, command)
            },
        )
        .boxed()
}

fn sse_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let sessions = context.sessions();
    let event_bus = context.event_bus();

    warp::path!("api" / "sessions" / SessionId / "events")
        .and(warp::get())
        .and(with_session_manager(sessions))
        .and(warp::any().map(move || Arc::clone(&event_bus)))
        .then(
            |session_id: SessionId, sessions: Arc<SessionManager>, event_bus: Arc<EventBus>| {
                handlers::stream_events(session_id, sessions, event_bus)
            },
        )
        .boxed()
}

fn with_session_manager(
    sessions: Arc<SessionManager>,
) -> impl Filter<Extract = (Arc<SessionManager>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&sessions))
}

/// JSON body that may be absent entirely.
fn optional_json<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Default + Send,
{
    warp::body::bytes().and_then(|body: warp::hyper::body::Bytes| async move {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice::<T>(&body).map_err(|err| {
            warp::reject::custom(InvalidBody(err.to_string()))
        })
    })
}

#[derive(Debug)]
struct InvalidBody(String);

impl warp::reject::Reject for InvalidBody {}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let invalid = err
        .find::<InvalidBody>()
        .map(|invalid| invalid.0.clone())
        .or_else(|| err.find::<BodyDeserializeError>().map(ToString::to_string));
    if let Some(message) = invalid {
        return Ok(SessionError::InvalidRequest(message).into_http_response());
    }

    let (status, body) = if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            ErrorResponse::new("not_found", "no route matches this request"),
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorResponse::new("method_not_allowed", "method not allowed"),
        )
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("internal_error", "internal server error"),
        )
    };
    Ok(body.into_response(status))
}

/// Running server plus its ticker. Dropping the handle stops both.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    ticker_shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    context: AppContext,
}

impl ServerHandle {
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.ticker_shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        for task in [self.ticker.take(), self.server.take()].into_iter().flatten() {
            task.await.map_err(|err| {
                ServerError::ConfigError(format!("server task join error: {err}"))
            })?;
        }
        tracing::info!("server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.ticker_shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        for task in [self.ticker.take(), self.server.take()].into_iter().flatten() {
            task.abort();
        }
    }
}
