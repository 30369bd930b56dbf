//! Errors that can occur in the transport layer.

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying stream or socket returned an I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection before sending a terminator.
    #[error("connection closed before a terminator was seen")]
    ConnectionClosed,

    /// No terminator arrived within the configured receive timeout.
    #[error("receive timed out waiting for a message terminator")]
    Timeout,

    /// The buffer grew past the configured maximum without a terminator
    /// appearing — a defense against an unbounded read loop.
    #[error("message exceeded the maximum frame size of {0} bytes")]
    FrameTooLarge(usize),
}
