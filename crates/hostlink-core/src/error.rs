use thiserror::Error;

/// Host-level failures of the hostlink stack.
///
/// Wire-protocol violations are deliberately not represented here: they are
/// values of the closed error enumeration in `hostlink-protocol` and are
/// reported to the peer as error frames, never as Rust errors.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid wire configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),

    // Transport errors
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
