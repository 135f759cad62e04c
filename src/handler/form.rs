//! Request body decoding for `POST /country`
//!
//! Accepts `multipart/form-data` (text fields plus an optional `image` file)
//! and `application/json`. Bodies are buffered in full, bounded by
//! `http.max_body_size`, before any field is inspected.

use std::convert::Infallible;

use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::Request;
use serde::Deserialize;

use crate::error::CountryError;
use crate::images::UploadedImage;
use crate::model::CountryForm;

/// Name of the multipart file field carrying the flag image
pub const IMAGE_FIELD: &str = "image";

/// Decoded add request: raw text fields and the buffered image, if any
#[derive(Debug, Default)]
pub struct Submission {
    pub fields: CountryForm,
    pub image: Option<UploadedImage>,
}

pub async fn read_submission<B>(
    req: Request<B>,
    max_body_size: usize,
) -> Result<Submission, CountryError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    check_content_length(&req, max_body_size)?;

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let body = read_body(req.into_body(), max_body_size).await?;

    match essence.as_str() {
        "multipart/form-data" => {
            let boundary = multer::parse_boundary(&content_type)
                .map_err(|e| CountryError::MalformedBody(e.to_string()))?;
            parse_multipart(body, boundary).await
        }
        "application/json" => parse_json(&body),
        "" => Err(CountryError::MalformedBody(
            "missing Content-Type, expected multipart/form-data or application/json".to_string(),
        )),
        other => Err(CountryError::MalformedBody(format!(
            "unsupported content type '{other}'"
        ))),
    }
}

/// Reject early when the declared length is already over the limit
fn check_content_length<B>(req: &Request<B>, max_body_size: usize) -> Result<(), CountryError> {
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match declared {
        Some(size) if size > max_body_size as u64 => Err(CountryError::PayloadTooLarge {
            limit: max_body_size,
        }),
        _ => Ok(()),
    }
}

async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, CountryError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() => {
            Err(CountryError::PayloadTooLarge { limit })
        }
        Err(e) => Err(CountryError::MalformedBody(format!(
            "failed to read request body: {e}"
        ))),
    }
}

async fn parse_multipart(body: Bytes, boundary: String) -> Result<Submission, CountryError> {
    let stream = futures_util::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(ToString::to_string);

        match name.as_str() {
            IMAGE_FIELD => {
                let content_type = field.content_type().map_or_else(
                    || "application/octet-stream".to_string(),
                    |m| m.essence_str().to_ascii_lowercase(),
                );
                let data = field.bytes().await.map_err(malformed)?;

                // Untouched file inputs arrive as an empty part without a file name
                if data.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
                    continue;
                }
                if submission.image.is_some() {
                    return Err(CountryError::InvalidField(
                        "only one image may be uploaded".to_string(),
                    ));
                }
                submission.image = Some(UploadedImage { content_type, data });
            }
            _ if file_name.is_some() => {
                return Err(CountryError::InvalidField(format!(
                    "unexpected file field '{name}'"
                )));
            }
            "name" => submission.fields.name = Some(field.text().await.map_err(malformed)?),
            "continent" => {
                submission.fields.continent = Some(field.text().await.map_err(malformed)?);
            }
            "rank" => submission.fields.rank = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    Ok(submission)
}

fn parse_json(body: &[u8]) -> Result<Submission, CountryError> {
    #[derive(Deserialize)]
    struct JsonCountry {
        name: Option<String>,
        continent: Option<String>,
        #[serde(default)]
        rank: Option<serde_json::Value>,
    }

    let raw: JsonCountry = serde_json::from_slice(body)
        .map_err(|e| CountryError::MalformedBody(format!("invalid JSON: {e}")))?;

    let rank = match raw.rank {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(CountryError::InvalidField(format!(
                "rank must be an integer, got {other}"
            )))
        }
    };

    Ok(Submission {
        fields: CountryForm {
            name: raw.name,
            continent: raw.continent,
            rank,
        },
        image: None,
    })
}

fn malformed(e: multer::Error) -> CountryError {
    CountryError::MalformedBody(e.to_string())
}
