use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::files::{FileError, Retrieved};
use crate::ServiceState;

/// `GET /:id`
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Response, FileError> {
    let retrieved = state.access().read(&id, None).await?;
    Ok(serve(retrieved))
}

/// `GET /s/:secret/:id`
pub async fn secret_handler(
    State(state): State<ServiceState>,
    Path((secret, id)): Path<(String, String)>,
) -> Result<Response, FileError> {
    let retrieved = state.access().read(&id, Some(&secret)).await?;
    Ok(serve(retrieved))
}

fn serve(Retrieved { record, blob }: Retrieved) -> Response {
    let content_type = if record.mime_type.is_empty() {
        mime_guess::from_path(&record.original_name)
            .first_or_octet_stream()
            .to_string()
    } else {
        record.mime_type
    };
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, HeaderValue::from(blob.size)),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&record.original_name),
            ),
        ],
        Body::from_stream(blob.stream),
    )
        .into_response()
}

/// `inline` disposition carrying a header-safe rendition of the name.
fn content_disposition(original_name: &str) -> HeaderValue {
    let safe: String = original_name
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();

    if safe.is_empty() {
        return HeaderValue::from_static("inline");
    }
    HeaderValue::from_str(&format!("inline; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_strips_unsafe_chars() {
        assert_eq!(
            content_disposition("report.pdf"),
            "inline; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition("a\"b\r\n.txt"),
            "inline; filename=\"ab.txt\""
        );
        assert_eq!(content_disposition("日本"), "inline");
    }
}
