//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation, route matching, and dispatching.

use std::convert::Infallible;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::IF_NONE_MATCH;
use hyper::{Method, Request, Response, StatusCode};

use crate::config::AppState;
use crate::handler::countries;
use crate::handler::static_files::{self, FileRequest};
use crate::http;

const COUNTRIES_PATH: &str = "/countries";
const COUNTRY_PATH: &str = "/country";

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut response = route_request(req, &state).await;
    http::response::apply_common_headers(
        &mut response,
        &state.config.http.server_name,
        state.config.http.enable_cors,
    );
    Ok(response)
}

/// Route request based on path and method
async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if method == Method::OPTIONS {
        return http::build_options_response(state.config.http.enable_cors);
    }

    // Health check endpoints first, they must stay cheap
    let health = &state.config.health;
    if health.enabled {
        if path == health.liveness_path {
            return get_only(&method, || async {
                http::build_health_response(StatusCode::OK, "ok")
            })
            .await;
        }
        if path == health.readiness_path {
            return get_only(&method, || countries::readiness(&state.countries)).await;
        }
    }

    if path == COUNTRIES_PATH {
        return get_only(&method, || countries::list(&state.countries)).await;
    }

    if path == COUNTRY_PATH {
        return if method == Method::POST {
            countries::create(req, state).await
        } else {
            http::build_405_response("POST, OPTIONS")
        };
    }

    if let Some(name) = path
        .strip_prefix(COUNTRY_PATH)
        .and_then(|rest| rest.strip_prefix('/'))
    {
        if name.is_empty() || name.contains('/') {
            return http::build_404_response();
        }
        return get_only(&method, || countries::get(&state.countries, name)).await;
    }

    if let Some(relative_path) = image_path(&path, &state.config.storage.image_route) {
        if method != Method::GET && method != Method::HEAD {
            return http::build_405_response("GET, HEAD, OPTIONS");
        }
        let file_req = FileRequest {
            relative_path,
            is_head: method == Method::HEAD,
            if_none_match: req
                .headers()
                .get(IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok()),
        };
        return static_files::serve_image(state.countries.images().dir(), &file_req).await;
    }

    http::build_404_response()
}

/// Run `handler` for GET and HEAD, answer 405 for anything else
async fn get_only<F, Fut>(method: &Method, handler: F) -> Response<Full<Bytes>>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Response<Full<Bytes>>>,
{
    match *method {
        Method::GET => handler().await,
        Method::HEAD => http::response::strip_body(handler().await),
        _ => http::build_405_response("GET, HEAD, OPTIONS"),
    }
}

/// Part of `path` below the image route, if it is under it
fn image_path<'a>(path: &'a str, image_route: &str) -> Option<&'a str> {
    let prefix = image_route.trim_end_matches('/');
    path.strip_prefix(prefix)?.strip_prefix('/')
}
