//! HTTP routes
//!
//! | Path | Description |
//! |------|-------------|
//! | `GET /` | Redirect to `/home` |
//! | `GET /home` | Listener page |
//! | `GET /controller` | Control page |
//! | `POST /controller` | `{ "command": "..." }` → `{ "result": "ok" }` |
//! | `GET /stream` | Live `audio/mpeg` broadcast |
//! | `GET /status` | Session status as JSON |
//! | `GET /*` | Static files under the public root |

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

use crate::error::{Error, Result};
use crate::probe::{ProbeTool, SoxTool};
use crate::registry::{ClientRegistry, ListenerId};
use crate::session::{CommandRequest, CommandResponse, SessionController, SessionStatus};

use super::files::PublicFiles;

/// Shared state passed to all request handlers
pub struct AppState<T: ProbeTool = SoxTool> {
    /// Broadcast engine
    pub controller: Arc<SessionController<T>>,
    /// Static file lookup
    pub files: PublicFiles,
}

impl<T: ProbeTool> AppState<T> {
    /// Create state serving files from the controller's configured public root
    pub fn new(controller: Arc<SessionController<T>>) -> Self {
        let files = PublicFiles::new(controller.config().public_root.clone());
        Self { controller, files }
    }
}

impl<T: ProbeTool> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            files: self.files.clone(),
        }
    }
}

/// Build the router with every relay endpoint
pub fn create_router<T: ProbeTool>(state: AppState<T>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/home", get(home::<T>))
        .route("/controller", get(controller_page::<T>).post(command::<T>))
        .route("/stream", get(stream::<T>))
        .route("/status", get(status::<T>))
        .fallback(static_file::<T>)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

async fn root() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/home")]).into_response()
}

async fn home<T: ProbeTool>(State(state): State<AppState<T>>) -> Result<Response> {
    let page = state.controller.config().pages.home.clone();
    serve_file(&state.files, &page).await
}

async fn controller_page<T: ProbeTool>(State(state): State<AppState<T>>) -> Result<Response> {
    let page = state.controller.config().pages.controller.clone();
    serve_file(&state.files, &page).await
}

async fn command<T: ProbeTool>(
    State(state): State<AppState<T>>,
    Json(request): Json<CommandRequest>,
) -> Json<CommandResponse> {
    Json(state.controller.handle_command(&request.command).await)
}

async fn status<T: ProbeTool>(State(state): State<AppState<T>>) -> Json<SessionStatus> {
    Json(state.controller.status().await)
}

/// Unregisters a listener when its response body is dropped
struct DetachOnDrop {
    id: ListenerId,
    registry: Arc<ClientRegistry>,
}

impl Drop for DetachOnDrop {
    fn drop(&mut self) {
        tracing::info!(listener = %self.id, "Closing listener connection");

        let id = self.id;
        let registry = Arc::clone(&self.registry);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                registry.unregister(&id).await;
            });
        }
    }
}

async fn stream<T: ProbeTool>(State(state): State<AppState<T>>) -> Response {
    let (id, listener) = state.controller.attach_listener().await;
    let guard = DetachOnDrop {
        id,
        registry: Arc::clone(state.controller.registry()),
    };

    let body = listener.map(move |chunk| {
        let _guard = &guard;
        Ok::<_, Infallible>(chunk)
    });

    (
        [(header::CONTENT_TYPE, "audio/mpeg")],
        Body::from_stream(body),
    )
        .into_response()
}

async fn static_file<T: ProbeTool>(
    State(state): State<AppState<T>>,
    method: Method,
    uri: Uri,
) -> Result<Response> {
    if method != Method::GET {
        return Err(Error::NotFound(uri.path().into()));
    }
    serve_file(&state.files, uri.path()).await
}

async fn serve_file(files: &PublicFiles, path: &str) -> Result<Response> {
    let (file, info) = files.open(path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok(([(header::CONTENT_TYPE, info.content_type())], body).into_response())
}
