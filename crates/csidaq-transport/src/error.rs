use std::net::SocketAddr;

/// Errors that can occur in UDP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind a receiving socket. Fatal to the current attempt.
    #[error("failed to bind udp socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to send a datagram.
    #[error("failed to send datagram to {target}: {source}")]
    Send {
        target: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to receive a datagram. Read timeouts are not errors.
    #[error("failed to receive datagram: {0}")]
    Recv(std::io::Error),

    /// An I/O error occurred on the socket.
    #[error("udp I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
