use crate::errors::{DiscoveryError, ErrorKind};
use crate::service::PictureService;
use crate::types::{Picture, Sol};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const BANNER: &str = "Largest Mars rover picture per sol\n";
const COMMAND_ACCEPTED: &str = "Command accepted. Largest picture calculation has started.";
const PICTURE_FETCHED: &str = "Largest picture fetched successfully";

pub fn router(service: PictureService) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/mars/pictures/largest/command", post(submit))
        .route("/mars/pictures/largest/command/{sol}", get(lookup))
        .with_state(service)
}

/// Serves the API until `shutdown` is cancelled, then lets open requests finish.
pub async fn serve(
    listener: TcpListener,
    service: PictureService,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    tracing::info!(addr = ?listener.local_addr()?, "API listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

#[derive(Deserialize, Debug)]
struct CommandRequest {
    sol: i64,
}

#[derive(Serialize)]
struct CommandResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct PictureResponse {
    sol: Sol,
    img_src: String,
    size: u64,
    message: &'static str,
}

impl From<Picture> for PictureResponse {
    fn from(picture: Picture) -> Self {
        PictureResponse {
            sol: picture.sol,
            img_src: picture.url,
            size: picture.size,
            message: PICTURE_FETCHED,
        }
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    slug: &'static str,
    error_message: String,
}

async fn banner() -> &'static str {
    BANNER
}

async fn submit(
    State(service): State<PictureService>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, DiscoveryError> {
    let Json(request) = body.map_err(|e| DiscoveryError::InvalidInput(e.body_text()))?;
    let sol = Sol::new(request.sol)?;
    service.submit(sol).await?;
    Ok(Json(CommandResponse {
        message: COMMAND_ACCEPTED,
    }))
}

async fn lookup(
    State(service): State<PictureService>,
    Path(sol): Path<String>,
) -> Result<Json<PictureResponse>, DiscoveryError> {
    let sol: Sol = sol.parse()?;
    let picture = service.lookup(sol).await?;
    Ok(Json(picture.into()))
}

impl IntoResponse for DiscoveryError {
    fn into_response(self) -> Response {
        let (status, slug) = match self.kind() {
            ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "invalid-command"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not-found"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal-server-error"),
        };

        let error_message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ApiErrorResponse { slug, error_message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{CommandChannel, InProcessChannel};
    use crate::store::ResultStore;
    use crate::testutils::{FlakyStore, sol};
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    struct Fixture {
        channel: Arc<InProcessChannel>,
        store: Arc<FlakyStore>,
        app: Router,
    }

    fn fixture() -> Fixture {
        let channel = Arc::new(InProcessChannel::new(8));
        let store = Arc::new(FlakyStore::new());
        let app = router(PictureService::new(channel.clone(), store.clone()));
        Fixture {
            channel,
            store,
            app,
        }
    }

    fn post_command(body: &str) -> Request<Body> {
        Request::post("/mars/pictures/largest/command")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_picture(sol: &str) -> Request<Body> {
        Request::get(format!("/mars/pictures/largest/command/{sol}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_banner() {
        let f = fixture();
        let response = f
            .app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, BANNER.as_bytes());
    }

    #[tokio::test]
    async fn test_submit_command() {
        let f = fixture();
        let (status, body) = send(&f.app, post_command(r#"{"sol": 100}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], COMMAND_ACCEPTED);
        assert_eq!(f.channel.receive().await.unwrap().body, b"100".to_vec());
    }

    #[tokio::test]
    async fn test_submit_invalid_command() {
        let f = fixture();
        for payload in [r#"{"sol": 0}"#, r#"{"sol": -3}"#, r#"{"sol": "x"}"#, "{}", "not json"] {
            let (status, body) = send(&f.app, post_command(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body["slug"], "invalid-command");
        }

        // Nothing was enqueued
        f.channel.close();
        assert_eq!(f.channel.receive().await, None);
    }

    #[tokio::test]
    async fn test_submit_channel_unavailable() {
        let f = fixture();
        f.channel.close();

        let (status, body) = send(&f.app, post_command(r#"{"sol": 1}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["slug"], "internal-server-error");
    }

    #[tokio::test]
    async fn test_lookup_picture() {
        let f = fixture();
        f.store
            .upsert(&Picture {
                sol: sol(100),
                url: "http://mars.example/b.jpg".into(),
                size: 2000,
            })
            .await
            .unwrap();

        let (status, body) = send(&f.app, get_picture("100")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({
                "sol": 100,
                "img_src": "http://mars.example/b.jpg",
                "size": 2000,
                "message": PICTURE_FETCHED,
            })
        );
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let f = fixture();

        let (status, body) = send(&f.app, get_picture("200")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["slug"], "not-found");

        for sol in ["0", "-1", "abc"] {
            let (status, body) = send(&f.app, get_picture(sol)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{sol}");
            assert_eq!(body["slug"], "invalid-command");
        }

        f.store.fail_find.store(true, Ordering::SeqCst);
        let (status, body) = send(&f.app, get_picture("100")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["slug"], "internal-server-error");
        assert_eq!(body["error_message"], "Internal server error");
    }
}
