//! Country endpoints
//!
//! Thin adapters between HTTP and [`CountryService`]: decode the request,
//! call the service, encode the result or the error.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response, StatusCode};
use percent_encoding::percent_decode_str;

use crate::config::AppState;
use crate::error::CountryError;
use crate::handler::form;
use crate::http;
use crate::logger;
use crate::model::NewCountry;
use crate::service::CountryService;

/// `GET /countries`
pub async fn list(service: &CountryService) -> Response<Full<Bytes>> {
    match service.list().await {
        Ok(countries) => http::build_json_response(StatusCode::OK, &countries),
        Err(e) => error_response(&e),
    }
}

/// `GET /country/{name}`, answering `{}` when nothing matches
pub async fn get(service: &CountryService, raw_name: &str) -> Response<Full<Bytes>> {
    let name = match percent_decode_str(raw_name).decode_utf8() {
        Ok(name) => name,
        Err(_) => {
            return error_response(&CountryError::InvalidField(
                "country name is not valid UTF-8".to_string(),
            ))
        }
    };

    match service.get(&name).await {
        Ok(Some(country)) => http::build_json_response(StatusCode::OK, &country),
        Ok(None) => http::build_json_response(StatusCode::OK, &serde_json::json!({})),
        Err(e) => error_response(&e),
    }
}

/// `POST /country`
pub async fn create<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let result = async {
        let submission = form::read_submission(req, state.config.http.max_body_size).await?;
        let new = NewCountry::parse(submission.fields)?;
        state.countries.add(new, submission.image).await
    }
    .await;

    match result {
        Ok(country) => http::build_json_response(StatusCode::CREATED, &country),
        Err(e) => error_response(&e),
    }
}

/// Readiness probe: 503 while the store cannot be loaded
pub async fn readiness(service: &CountryService) -> Response<Full<Bytes>> {
    match service.check_ready().await {
        Ok(()) => http::build_health_response(StatusCode::OK, "ok"),
        Err(e) => {
            logger::log_warning(&format!("Readiness check failed: {e}"));
            http::build_health_response(StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

/// Map a domain error to its response; server-side details stay in the log
pub fn error_response(err: &CountryError) -> Response<Full<Bytes>> {
    let status = err.status();
    if err.is_server_error() {
        logger::log_error(&format!("Request failed: {err}"));
        http::build_error_response(status, "Internal server error")
    } else {
        logger::log_warning(&format!("Request rejected ({}): {err}", status.as_u16()));
        http::build_error_response(status, &err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_client_error_keeps_message() {
        let resp = error_response(&CountryError::DuplicateEntry);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"error":"Country name and rank must be unique"}"#);
    }

    #[tokio::test]
    async fn test_server_error_is_generic() {
        let err = CountryError::Io(std::io::Error::other("/secret/path unreadable"));
        let resp = error_response(&err);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"error":"Internal server error"}"#);
    }

    #[test]
    fn test_media_errors_status() {
        let resp = error_response(&CountryError::InvalidFileType {
            mime: "image/gif".to_string(),
        });
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let resp = error_response(&CountryError::UnsupportedMedia { size: 10, limit: 5 });
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
