mod panel;

pub use panel::{ApiErrorBody, ApiErrorObject, PanelError, TokenError};

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
