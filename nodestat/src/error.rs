use thiserror::Error;

/// Crate-wide result alias
pub type StatResult<T> = std::result::Result<T, StatError>;

/// Typed errors surfaced by the registry, the materializer and the loader
#[derive(Debug, Error)]
pub enum StatError {
    /// Alias or entity type is not registered
    #[error("StatError::UnknownType: name='{name}'")]
    UnknownType { name: String },

    /// Property has no kind, dispatch entry or table binding
    #[error("StatError::UnknownProperty: property='{property}'")]
    UnknownProperty { property: String },

    /// The underlying query failed
    #[error("StatError::Storage: operation='{operation}' source='{source}'")]
    Storage {
        operation: String,
        #[source]
        source: sea_orm::DbErr,
    },

    /// An asynchronous property strategy reported failure
    #[error("StatError::PropertyResolution: property='{property}' reason='{reason}'")]
    PropertyResolution { property: String, reason: String },

    // Configuration errors
    #[error("StatError::Config: {message}")]
    Config { message: String },
}

impl StatError {
    /// Create an unknown type error
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    /// Create an unknown property error
    pub fn unknown_property(property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            property: property.into(),
        }
    }

    /// Wrap a driver error with the operation that produced it
    pub fn storage(operation: impl Into<String>, source: sea_orm::DbErr) -> Self {
        Self::Storage {
            operation: operation.into(),
            source,
        }
    }

    /// Create a property resolution error
    pub fn resolution(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PropertyResolution {
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error.
    ///
    /// Registry misses are programmer errors and must not be retried. Storage
    /// and resolution failures are operational; retrying is up to the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage { .. } | Self::PropertyResolution { .. } => true,
            Self::UnknownType { .. } | Self::UnknownProperty { .. } | Self::Config { .. } => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownType { name } => {
                format!("Statistic type '{}' is not registered.", name)
            }
            Self::UnknownProperty { property } => {
                format!(
                    "Property '{}' is not configured. Please check the type registry.",
                    property
                )
            }
            Self::Storage { operation, source } => {
                format!("Database {} operation failed: {}", operation, source)
            }
            Self::PropertyResolution { property, reason } => {
                format!("Property '{}' could not be resolved: {}", property, reason)
            }
            Self::Config { message } => {
                format!("Invalid configuration: {}", message)
            }
        }
    }
}
