use http::StatusCode;
use passkey_ceremony::PasskeyError;

const CEREMONY_FAILED: &str = "Passkey ceremony failed";
const TEMPORARILY_UNAVAILABLE: &str = "Service temporarily unavailable";

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    /// Every rejection gets one generic body so a client cannot tell which
    /// check failed.
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;

    /// Same as [`into_response_error`](Self::into_response_error), except
    /// that existence errors keep their message. Only the start steps use
    /// this; the client learns those outcomes from the options call anyway.
    fn into_start_response_error(self) -> Result<T, (StatusCode, String)>;
}

impl<T> IntoResponseError<T> for Result<T, PasskeyError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| to_response(e, false))
    }

    fn into_start_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| to_response(e, true))
    }
}

fn to_response(e: PasskeyError, report_existence: bool) -> (StatusCode, String) {
    match e {
        PasskeyError::StoreUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            TEMPORARILY_UNAVAILABLE.to_string(),
        ),
        PasskeyError::InputTooLarge { .. } => {
            (StatusCode::PAYLOAD_TOO_LARGE, CEREMONY_FAILED.to_string())
        }
        PasskeyError::Config(_) | PasskeyError::Utils(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            CEREMONY_FAILED.to_string(),
        ),
        e if report_existence && e.is_existence_error() => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        _ => (StatusCode::BAD_REQUEST, CEREMONY_FAILED.to_string()),
    }
}
