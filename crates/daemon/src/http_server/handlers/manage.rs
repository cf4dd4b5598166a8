use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use crate::files::{FileError, ManageAction};
use crate::ServiceState;

#[derive(Debug, Default, Deserialize)]
pub struct ManageRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub delete: Option<String>,
}

impl ManageRequest {
    fn action(&self) -> Option<ManageAction> {
        match self.delete.as_deref() {
            Some("true") => Some(ManageAction::Delete),
            _ => None,
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, Response> {
        let mut request = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            let name = field.name().unwrap_or("").to_string();
            let value = field.text().await.map_err(IntoResponse::into_response)?;
            match name.as_str() {
                "token" => request.token = value,
                "delete" => request.delete = Some(value),
                _ => tracing::debug!(field = %name, "ignoring unknown field"),
            }
        }
        Ok(request)
    }
}

/// Manage fields arrive either urlencoded or as multipart. Anything else,
/// including an empty body, carries no fields at all.
#[async_trait]
impl<S> FromRequest<S> for ManageRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Self::from_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(request) = Form::<Self>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(request);
        }

        Ok(Self::default())
    }
}

/// `POST /:id` with fields `token` and `delete=true`.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    request: ManageRequest,
) -> Result<impl IntoResponse, FileError> {
    state
        .access()
        .manage(&id, &request.token, request.action())
        .await?;

    Ok(StatusCode::OK)
}
