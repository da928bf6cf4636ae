use bimorph_traits::Channel;
use thiserror::Error;

fn fmt_channels(channels: &[Channel]) -> String {
    channels
        .iter()
        .map(|c| c.index().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BimorphError {
    #[error(
        "step timeout: {channel} armed readback stuck at {last_observed} V, commanded {commanded} V"
    )]
    StepTimeout {
        channel: Channel,
        commanded: f64,
        last_observed: f64,
    },
    #[error("ramp timeout: channels [{}] did not reach their setpoints", fmt_channels(.pending))]
    RampTimeout { pending: Vec<Channel> },
    #[error("convergence exceeded: targets not reached after {iterations} iterations")]
    ConvergenceExceeded { iterations: u32 },
    #[error("invalid move request: {0}")]
    InvalidRequest(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("move cancelled after {passes} passes")]
    Cancelled { passes: u32 },
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
