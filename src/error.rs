//! Error types for term-gateway.

use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Operation referenced a session name that is not registered.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Spawning the pseudo-terminal process failed.
    #[error("failed to spawn session process: {0}")]
    Spawn(String),

    /// PTY-related error (resize, reader/writer setup).
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O against a session whose process is unreachable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed inbound protocol message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Convenience Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_session_display() {
        let err = GatewayError::UnknownSession("7".into());
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("unknown session"));
    }

    #[test]
    fn test_spawn_display() {
        let err = GatewayError::Spawn("no such file".into());
        assert!(err.to_string().contains("spawn"));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: GatewayError = io_err.into();
        assert!(matches!(err, GatewayError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_protocol_display() {
        let err = GatewayError::Protocol("unknown discriminator: stdfoo".into());
        assert!(err.to_string().contains("protocol error"));
        assert!(err.to_string().contains("stdfoo"));
    }
}
