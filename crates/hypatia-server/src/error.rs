//! Server error types.

use thiserror::Error;

/// Errors raised while running the HTTP server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configured address is invalid or could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let bind = ServerError::Bind("address in use".to_string());
        assert_eq!(bind.to_string(), "bind error: address in use");

        let io = ServerError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(io.to_string().starts_with("I/O error"));
    }
}
