//! HTTP and WebSocket routes

use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::config::ServerConfig;
use crate::constants::{MAX_FRAME_BYTES, WS_PATH};
use crate::core::message_handler::MessageHandler;
use crate::handlers::websocket::handle_ws_client;

/// Build the server routes: `/` and `/health` health checks plus the `/ws` upgrade.
///
/// `client_origin` must already be normalized (see `ServerConfig::normalize_origin`).
pub fn routes(
    handler: MessageHandler,
    client_origin: String,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let ws_route = warp::path(WS_PATH)
        .and(warp::path::end())
        .and(warp::ws())
        .and(warp::header::optional::<String>("origin"))
        .and(with_handler(handler))
        .and(with_origin(client_origin.clone()))
        .map(
            |ws: warp::ws::Ws, origin: Option<String>, handler: MessageHandler, allowed: String| {
                if !origin_allowed(origin.as_deref(), &allowed) {
                    log::warn!("WebSocket connection rejected: origin {:?}", origin);
                    return warp::reply::with_status("Origin not allowed", StatusCode::FORBIDDEN)
                        .into_response();
                }
                // Oversized frames are refused by the protocol layer before buffering
                ws.max_message_size(MAX_FRAME_BYTES)
                    .max_frame_size(MAX_FRAME_BYTES)
                    .on_upgrade(move |socket| handle_ws_client(socket, handler))
                    .into_response()
            },
        );

    let root_route = warp::path::end()
        .and(warp::get())
        .map(|| "Chat backend OK");

    // Create health check route
    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "OK");

    let cors = warp::cors()
        .allow_origin(client_origin.as_str())
        .allow_methods(vec!["GET", "POST"])
        .allow_header("content-type");

    ws_route
        .or(root_route.or(health_route).with(cors))
        .with(warp::log("rusty_rooms::http"))
}

fn with_handler(
    handler: MessageHandler,
) -> impl Filter<Extract = (MessageHandler,), Error = Infallible> + Clone {
    warp::any().map(move || handler.clone())
}

fn with_origin(origin: String) -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::any().map(move || origin.clone())
}

/// Browsers always send `Origin` on upgrades; other clients may omit it
pub fn origin_allowed(origin: Option<&str>, allowed: &str) -> bool {
    match origin {
        Some(value) => ServerConfig::normalize_origin(value)
            .map(|normalized| normalized == allowed)
            .unwrap_or(false),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_check() {
        let allowed = "http://localhost:5173";
        assert!(origin_allowed(Some("http://localhost:5173"), allowed));
        assert!(origin_allowed(None, allowed));
        assert!(!origin_allowed(Some("http://evil.example.com"), allowed));
        assert!(!origin_allowed(Some("null"), allowed));
    }
}
