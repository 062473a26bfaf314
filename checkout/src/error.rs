use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Failure taxonomy for the checkout slice.
///
/// `Redirect` is not a failure: it carries the navigation-layer control
/// signal and must pass through every action boundary unchanged. Everything
/// else is converted into an `ActionResult` at the public entry points.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Order is already paid")]
    AlreadyPaid,

    #[error("Order is not paid")]
    NotPaid,

    #[error("Product out of stock")]
    OutOfStock { product: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("redirect to {0}")]
    Redirect(String),
}

impl CheckoutError {
    pub fn is_redirect(&self) -> bool {
        matches!(self, CheckoutError::Redirect(_))
    }
}
