use std::net::SocketAddr;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{ConnectInfo, Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::{Bytes, BytesMut};
use object_store::ContentHasher;
use serde::{Deserialize, Serialize};

use super::client::{client_ip, user_agent};
use crate::files::{FileError, Upload};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    /// Unix seconds
    pub expires: i64,
    /// Management token, only returned when the upload created the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

struct ReceivedFile {
    name: String,
    content_type: Option<String>,
    content: Bytes,
    content_hash: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, UploadError> {
    let limit = state.uploads().max_file_size();
    let mut file: Option<ReceivedFile> = None;
    let mut requested_hours: Option<u64> = None;
    let mut want_secret = false;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().map(str::to_string);
                let (content, content_hash) = read_limited(field, limit).await?;
                file = Some(ReceivedFile {
                    name,
                    content_type,
                    content,
                    content_hash,
                });
            }
            "expires" => {
                let text = field.text().await?;
                // Unparsable values fall back to the size-derived ceiling
                requested_hours = text.trim().parse().ok();
                if requested_hours.is_none() {
                    tracing::debug!(expires = %text, "ignoring unparsable expires");
                }
            }
            "secret" => {
                want_secret = field.text().await?.trim() == "true";
            }
            _ => {
                tracing::debug!(field = %field_name, "ignoring unknown field");
            }
        }
    }

    let file = file.ok_or_else(|| FileError::Validation("No file provided".into()))?;

    let mime_type = file
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(&file.name)
                .first_or_octet_stream()
                .to_string()
        });

    let upload = Upload {
        content: file.content,
        content_hash: file.content_hash,
        original_name: file.name,
        mime_type,
        uploader_ip: client_ip(&headers, connect_info.as_ref()),
        user_agent: user_agent(&headers),
        requested_hours,
        want_secret,
    };

    let receipt = state.uploads().ingest(upload).await?;

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            url: receipt.url,
            expires: receipt.expires,
            token: receipt.token,
        }),
    ))
}

/// Buffer a multipart field and hash it chunk by chunk, bailing out as
/// soon as it crosses `limit`.
async fn read_limited(mut field: Field<'_>, limit: u64) -> Result<(Bytes, String), UploadError> {
    let mut buf = BytesMut::new();
    let mut hasher = ContentHasher::new();
    while let Some(chunk) = field.chunk().await? {
        let size = (buf.len() + chunk.len()) as u64;
        if size > limit {
            return Err(FileError::TooLarge { size, limit }.into());
        }
        hasher.update(&chunk);
        buf.extend_from_slice(&chunk);
    }
    Ok((buf.freeze(), hasher.finalize()))
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    File(#[from] FileError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::Multipart(e) => {
                tracing::debug!(error = %e, "rejecting malformed upload");
                (e.status(), e.body_text()).into_response()
            }
            UploadError::File(e) => e.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::{FromRequest, Request};
    use axum::http::header;
    use object_store::content_hash;

    async fn chunked_multipart(chunks: Vec<&'static [u8]>) -> Multipart {
        let stream = futures::stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, std::io::Error>(Bytes::from_static(chunk))),
        );
        let request = Request::builder()
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=chunked-boundary",
            )
            .body(Body::from_stream(stream))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn file_part(content: Vec<&'static [u8]>) -> Vec<&'static [u8]> {
        let mut chunks: Vec<&'static [u8]> = vec![
            b"--chunked-boundary\r\n",
            b"Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\n",
        ];
        chunks.extend(content);
        chunks.push(b"\r\n--chunked-boundary--\r\n");
        chunks
    }

    #[tokio::test]
    async fn test_streamed_digest_matches_whole_body() {
        let mut multipart =
            chunked_multipart(file_part(vec![b"first half, ", b"second ", b"half"])).await;
        let field = multipart.next_field().await.unwrap().unwrap();

        let (content, digest) = read_limited(field, 1024).await.unwrap();
        assert_eq!(content, Bytes::from_static(b"first half, second half"));
        assert_eq!(digest, content_hash(b"first half, second half"));
    }

    #[tokio::test]
    async fn test_read_stops_at_limit() {
        let mut multipart = chunked_multipart(file_part(vec![b"0123", b"456789"])).await;
        let field = multipart.next_field().await.unwrap().unwrap();

        assert!(matches!(
            read_limited(field, 5).await,
            Err(UploadError::File(FileError::TooLarge { limit: 5, .. }))
        ));
    }
}
