use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use mentora_core::identity::IdentityError;
use mentora_engine::{EngineError, UploadError};
use mentora_store::StoreError;

/// HTTP-facing error. Bodies are `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Expired => Self::Unauthorized("Token kedaluwarsa".into()),
            _ => Self::Unauthorized("Token tidak valid".into()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => Self::NotFound("Sesi tidak ditemukan atau bukan milik Anda.".into()),
            other => {
                error!(error = %other, "store failure");
                Self::Internal("Terjadi kesalahan internal.".into())
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::UnsupportedFormat(_) => Self::BadRequest("Format file tidak didukung.".into()),
            UploadError::NothingExtracted => Self::Unprocessable("Gagal mengekstrak konten utama.".into()),
            UploadError::Store(e) => e.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::SessionNotFound(_) => {
                Self::NotFound("Sesi tidak ditemukan atau bukan milik Anda.".into())
            }
            EngineError::Collaborator(_) => Self::Internal("Gagal mendapatkan penilaian dari AI.".into()),
            EngineError::Store(e) => e.into(),
            EngineError::Internal(msg) => {
                error!(error = %msg, "engine failure");
                Self::Internal("Terjadi kesalahan internal.".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mentora_core::errors::CollaboratorError;

    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(UploadError::UnsupportedFormat("a.doc".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(UploadError::NothingExtracted).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(EngineError::SessionNotFound("s".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(EngineError::Collaborator(CollaboratorError::RateLimited)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(IdentityError::Missing).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err = ApiError::from(StoreError::Database("disk I/O error".into()));
        assert!(!err.to_string().contains("disk"));
    }
}
