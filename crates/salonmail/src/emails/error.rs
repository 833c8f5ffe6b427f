use std::time::Duration;

/// Why a single scheduled email ended up `failed`.
///
/// The `Display` text is what gets stored in `error_message`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("related record not found")]
    RelatedNotFound,

    #[error("unsupported related type: {0}")]
    UnsupportedRelatedType(String),

    #[error("unsupported email type: {0}")]
    UnsupportedEmailType(String),

    #[error("mail send timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Lookup of the related record itself blew up.
    #[error("{0}")]
    Lookup(String),

    /// Raw transport error text, kept verbatim.
    #[error("{0}")]
    Transport(String),
}

impl DispatchError {
    /// Data problems are warnings; infrastructure problems are errors.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            DispatchError::RelatedNotFound
                | DispatchError::UnsupportedRelatedType(_)
                | DispatchError::UnsupportedEmailType(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::RelatedNotFound => "related_not_found",
            DispatchError::UnsupportedRelatedType(_) => "unsupported_related_type",
            DispatchError::UnsupportedEmailType(_) => "unsupported_email_type",
            DispatchError::Timeout(_) => "timeout",
            DispatchError::Lookup(_) => "lookup",
            DispatchError::Transport(_) => "transport",
        }
    }
}
