use thiserror::Error;

/// Errors from a quote source.
///
/// Callers branch on these: a missing symbol is a caller mistake and is not
/// worth retrying, a transport failure is transient, and a malformed payload
/// points at the provider.
#[derive(Error, Debug)]
pub enum QuoteError {
    /// The provider does not know the symbol (or rejected the request for it).
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    /// Transient network or provider failure; the request may succeed later.
    #[error("quote transport failure: {0}")]
    Transport(String),

    /// The provider responded with a payload the adapter could not interpret.
    #[error("malformed quote payload: {0}")]
    Malformed(String),
}

impl QuoteError {
    /// True when the failure is transient and a retry may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, QuoteError::Transport(_))
    }
}
