use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    config::StreamConfig,
    media::types::MediaType,
    session::{GraphSnapshot, SourceInfo, TransportSession},
};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn router(session: Arc<TransportSession>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/sources", get(list_sources).post(add_source))
        .route(
            "/sources/{media_type}/{stream_id}",
            axum::routing::delete(remove_source),
        )
        .route("/graph", get(graph))
        .with_state(session)
}

pub fn start_api_server(
    addr: SocketAddr,
    session: Arc<TransportSession>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("Error binding API server to {}: {}", addr, e);
                return;
            }
        };
        log::info!("API server started on {}", addr);
        if let Err(e) = axum::serve(listener, router(session))
            .with_graceful_shutdown(shutdown_signal(cancel))
            .await
        {
            log::error!("Error starting API server: {}", e);
        }
    });
}

async fn shutdown_signal(cancel: CancellationToken) {
    cancel.cancelled().await;
    log::info!("Shutting down API server...");
}

async fn index() -> &'static str {
    "remote media"
}

async fn list_sources(State(session): State<Arc<TransportSession>>) -> Json<Vec<SourceInfo>> {
    Json(session.sources().await)
}

async fn add_source(
    State(session): State<Arc<TransportSession>>,
    Json(stream): Json<StreamConfig>,
) -> ApiResult<SourceInfo> {
    session
        .add_remote_stream(&stream)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("{:#}", e)))?;
    session
        .sources()
        .await
        .into_iter()
        .find(|s| s.media_type == stream.media_type && s.stream_id == stream.stream_id)
        .map(Json)
        .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "source vanished".to_string()))
}

async fn remove_source(
    State(session): State<Arc<TransportSession>>,
    Path((media_type, stream_id)): Path<(MediaType, u32)>,
) -> Result<StatusCode, (StatusCode, String)> {
    session
        .remove_remote_stream(media_type, stream_id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, format!("{:#}", e)))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn graph(State(session): State<Arc<TransportSession>>) -> Json<GraphSnapshot> {
    Json(session.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        crate::init().unwrap();
        let session = Arc::new(TransportSession::new("call").unwrap());
        session.play().unwrap();
        let app = router(Arc::clone(&session));

        let (status, json) = send(
            app.clone(),
            post_json(
                "/sources",
                r#"{ "media_type": "video", "codec": "vp8", "stream_id": 7 }"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["tee"], "video-src-tee-5-7");
        assert_eq!(json["name"], "Remote video stream");

        let (status, json) = send(
            app.clone(),
            Request::get("/sources").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(|a| a.len()), Some(1));

        let (status, json) = send(
            app.clone(),
            Request::get("/graph").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["pads"][0]["name"], "video_src_5_7");

        let (status, _) = send(
            app.clone(),
            Request::delete("/sources/video/7").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(session.sources().await.is_empty());

        let (status, _) = send(
            app,
            Request::delete("/sources/video/7").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        session.stop().unwrap();
    }

    #[tokio::test]
    async fn test_add_invalid_source() {
        crate::init().unwrap();
        let app = router(Arc::new(TransportSession::new("call").unwrap()));
        let (status, _) = send(
            app,
            post_json(
                "/sources",
                r#"{ "media_type": "audio", "codec": "h264", "stream_id": 1 }"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
