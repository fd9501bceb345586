//! Error types for myorm

use std::time::Duration;
use thiserror::Error;

/// Result type alias for myorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error (DSN parsing, handshake, refused/reset links)
    #[error("connection error: {0}")]
    Connection(String),

    /// Underlying driver error, surfaced verbatim
    #[error("driver error: {0}")]
    Driver(#[from] mysql_async::Error),

    /// A condition was built with an unusable shape
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// No field of the record was eligible for the operation
    #[error("no mappable field on `{0}`")]
    NoMappableField(String),

    /// Update/delete by record found no field marked primary
    #[error("no primary key field on `{0}`")]
    NoPrimaryKey(String),

    /// Row value could not be converted to the requested type
    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Every primary pool was exhausted during retry
    #[error("mysql group: no primary connection available")]
    NoPrimaryAvailable,

    /// Every replica pool was exhausted during retry
    #[error("mysql group: no replica connection available")]
    NoReplicaAvailable,

    /// Operation exceeded its caller-supplied deadline
    #[error("query timeout after {0:?}")]
    Timeout(Duration),

    /// Pool construction or checkout error
    #[error("pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Whether this error is connectivity-class and worth a failover retry.
    ///
    /// Server-side errors (constraint violations, syntax errors) are not
    /// connectivity failures: the link demonstrably works.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Driver(mysql_async::Error::Io(_)) => true,
            Self::Driver(mysql_async::Error::Driver(e)) => matches!(
                e,
                mysql_async::DriverError::ConnectionClosed
                    | mysql_async::DriverError::PoolDisconnected
            ),
            _ => false,
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a pool-exhaustion error
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::NoPrimaryAvailable | Self::NoReplicaAvailable)
    }
}
