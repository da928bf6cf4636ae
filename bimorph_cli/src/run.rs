//! Command execution: config mapping, simulator assembly, and the move itself.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bimorph_core::constraint::invariant_violations;
use bimorph_core::mocks::InvariantSpy;
use bimorph_core::{
    Assignment, BimorphController, BimorphError, MoveRequest, MoveSettings, PositionCache,
};
use bimorph_hardware::SimulatedBimorph;
use bimorph_traits::clock::MonotonicClock;
use bimorph_traits::{BimorphDevice, Channel};
use eyre::WrapErr;

/// Freeze the simulated armed readback (timeout testing).
const ENV_SIM_STUCK: &str = "BIMORPH_TEST_SIM_STUCK";
/// Override the simulated ramp duration in ms, bypassing config validation.
const ENV_SIM_RAMP_MS: &str = "BIMORPH_TEST_SIM_RAMP_MS";

/// Readback of one requested channel after the move.
#[derive(Debug, Clone, Copy)]
pub struct ChannelReading {
    pub channel: Channel,
    pub current: f64,
    pub armed: f64,
    pub setpoint: f64,
}

/// What `move` reports on success.
#[derive(Debug)]
pub struct MoveOutcome {
    pub readings: Vec<ChannelReading>,
    pub writes: usize,
    pub ramps: usize,
    pub elapsed: Duration,
}

/// Build the request from `--set` assignments or a CSV file.
pub fn build_request(set: Vec<Assignment>, request: Option<&Path>) -> eyre::Result<MoveRequest> {
    let req = match request {
        Some(path) => {
            let rows = bimorph_config::load_move_request_csv(path)
                .map_err(|e| eyre::Report::new(BimorphError::InvalidRequest(format!("{e:#}"))))?;
            MoveRequest::try_from(&rows[..])?
        }
        None => MoveRequest::try_from(set)?,
    };
    Ok(req)
}

fn simulator(cfg: &bimorph_config::Config, initial: Option<f64>) -> SimulatedBimorph<MonotonicClock> {
    let stuck = std::env::var(ENV_SIM_STUCK).is_ok_and(|v| v == "1");
    let ramp_ms = std::env::var(ENV_SIM_RAMP_MS)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(cfg.simulator.ramp_duration_ms);
    if stuck {
        tracing::warn!("simulated armed readback frozen ({ENV_SIM_STUCK})");
    }
    SimulatedBimorph::new(MonotonicClock::new())
        .with_uniform(initial.unwrap_or(cfg.simulator.initial_voltage))
        .with_arm_latency(Duration::from_millis(cfg.simulator.arm_latency_ms))
        .with_ramp_duration(Duration::from_millis(ramp_ms))
        .stuck_armed(stuck)
}

/// Run one scan step against the simulator: converge, then read back the
/// requested channels.
pub fn run_move(
    cfg: &bimorph_config::Config,
    request: &MoveRequest,
    initial: Option<f64>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<MoveOutcome> {
    let settings = MoveSettings::from(cfg);
    let controller = BimorphController::builder()
        .with_settings(settings)
        .build()?;

    if let Some(v) = initial
        && !(settings.safety.min_voltage..=settings.safety.max_voltage).contains(&v)
    {
        return Err(eyre::Report::new(BimorphError::InvalidRequest(format!(
            "--initial {v} V outside [{}, {}] V",
            settings.safety.min_voltage, settings.safety.max_voltage
        ))));
    }

    let mut device = InvariantSpy::new(simulator(cfg, initial), settings.safety.max_distance);
    let mut cache = PositionCache::new();
    let started = std::time::Instant::now();

    let readings = controller
        .one_bimorph_step_until(
            &["readback"],
            request,
            &mut cache,
            |set, dev| read_channels(dev, &set.channels),
            &mut device,
            || shutdown.load(Ordering::Relaxed),
        )
        .wrap_err("move")?;

    if let Some((write, a, b)) = device.violations().first() {
        eyre::bail!("adjacency invariant violated after write {write}: {a} vs {b}");
    }

    Ok(MoveOutcome {
        readings,
        writes: device.writes(),
        ramps: device.inner().ramp_count(),
        elapsed: started.elapsed(),
    })
}

fn read_channels<D: BimorphDevice + ?Sized>(
    dev: &mut D,
    channels: &[Channel],
) -> eyre::Result<Vec<ChannelReading>> {
    let device_err = |e: bimorph_traits::DeviceError| eyre::eyre!("readback failed: {e}");
    let current = dev.current_voltages().map_err(device_err)?;
    let armed = dev.armed_voltages().map_err(device_err)?;
    let setpoint = dev.setpoint_voltages().map_err(device_err)?;
    Ok(channels
        .iter()
        .map(|&channel| ChannelReading {
            channel,
            current: current[channel.index()],
            armed: armed[channel.index()],
            setpoint: setpoint[channel.index()],
        })
        .collect())
}

/// Validate settings against the core and read the simulator once.
pub fn self_check(cfg: &bimorph_config::Config) -> eyre::Result<()> {
    let settings = MoveSettings::from(cfg);
    BimorphController::builder()
        .with_settings(settings)
        .build()?;

    let mut sim = simulator(cfg, None);
    let current = sim
        .current_voltages()
        .map_err(|e| eyre::eyre!("simulator read failed: {e}"))?;
    let armed = sim
        .armed_voltages()
        .map_err(|e| eyre::eyre!("simulator read failed: {e}"))?;
    let setpoint = sim
        .setpoint_voltages()
        .map_err(|e| eyre::eyre!("simulator read failed: {e}"))?;
    let violations = invariant_violations(&setpoint, &current, &armed, settings.safety.max_distance);
    if !violations.is_empty() {
        eyre::bail!("simulator starts in an unsafe state: {violations:?}");
    }
    tracing::info!("self-check ok");
    Ok(())
}
