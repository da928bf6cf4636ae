use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("device error: {0}")]
    Device(String),
    #[error("readback wait timeout")]
    WaitTimeout,
    #[error("rejected non-finite voltage {0}")]
    NonFinite(f64),
}

pub type Result<T> = std::result::Result<T, HwError>;
