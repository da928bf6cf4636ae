//! Human-readable error descriptions and structured JSON error formatting.

use bimorph_core::error::{BimorphError, BuildError};

/// Stable name for each error kind; used as the JSON `reason`.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<BimorphError>() {
        Some(BimorphError::StepTimeout { .. }) => "StepTimeout",
        Some(BimorphError::RampTimeout { .. }) => "RampTimeout",
        Some(BimorphError::ConvergenceExceeded { .. }) => "ConvergenceExceeded",
        Some(BimorphError::InvalidRequest(_)) => "InvalidRequest",
        Some(BimorphError::Hardware(_)) => "Hardware",
        Some(BimorphError::HardwareFault(_)) => "HardwareFault",
        Some(BimorphError::Cancelled { .. }) => "Cancelled",
        Some(BimorphError::State(_)) | None => "Error",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/bimorph.toml for a sample."
        );
    }

    if let Some(be) = err.downcast_ref::<BimorphError>() {
        return match be {
            BimorphError::StepTimeout {
                channel,
                commanded,
                last_observed,
            } => format!(
                "What happened: {channel} never confirmed its armed voltage (commanded {commanded} V, readback stuck at {last_observed} V).\nLikely causes: Power supply not accepting writes, channel disabled, or timeouts.timeout_s too low.\nHow to fix: Check the supply and the channel's enable state, or raise timeouts.timeout_s. Hardware was left in a safe state."
            ),
            BimorphError::RampTimeout { .. } => format!(
                "What happened: {be}.\nLikely causes: Ramp rate on the supply slower than the configured deadline, or a channel disabled mid-ramp.\nHow to fix: Raise timeouts.timeout_s or check the ramp settings on the supply. Hardware was left in a safe state."
            ),
            BimorphError::ConvergenceExceeded { iterations } => format!(
                "What happened: Targets were not reached after {iterations} arm+ramp passes.\nLikely causes: Requested targets are further apart than motion.max_distance allows for adjacent channels, or motion.step_limit is small.\nHow to fix: Move neighboring channels together, or raise motion.max_iterations / motion.step_limit."
            ),
            BimorphError::InvalidRequest(msg) => format!(
                "What happened: Invalid move request ({msg}).\nLikely causes: Channel outside 0..31, duplicate channel, or a target outside [limits].\nHow to fix: Fix the --set values or the request CSV (header 'channel,target')."
            ),
            BimorphError::Cancelled { passes } => format!(
                "What happened: Move cancelled after {passes} passes.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Rerun the move; hardware was left in a safe state."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("must have headers") {
        return "Invalid headers in move request CSV. Expected 'channel,target'.".to_string();
    }

    if lower.starts_with("motion.")
        || lower.starts_with("timeouts.")
        || lower.starts_with("limits")
        || lower.starts_with("simulator.")
        || lower.starts_with("logging.")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; everything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<BimorphError>() {
        Some(BimorphError::StepTimeout { .. }) => 3,
        Some(BimorphError::RampTimeout { .. }) => 4,
        Some(BimorphError::ConvergenceExceeded { .. }) => 5,
        Some(BimorphError::InvalidRequest(_)) => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let details = match err.downcast_ref::<BimorphError>() {
        Some(BimorphError::StepTimeout {
            channel,
            commanded,
            last_observed,
        }) => Some(json!({
            "channel": channel.raw(),
            "commanded": commanded,
            "last_observed": last_observed,
        })),
        Some(BimorphError::RampTimeout { pending }) => Some(json!({
            "pending": pending.iter().map(|c| c.raw()).collect::<Vec<_>>(),
        })),
        Some(BimorphError::ConvergenceExceeded { iterations }) => {
            Some(json!({ "iterations": iterations }))
        }
        _ => None,
    };

    let reason = reason_name(err);
    let message = humanize(err);
    match details {
        Some(d) => json!({ "reason": reason, "details": d, "message": message }),
        None => json!({ "reason": reason, "message": message }),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimorph_traits::Channel;

    fn report(e: BimorphError) -> eyre::Report {
        eyre::Report::new(e)
    }

    #[test]
    fn exit_codes_are_stable() {
        let ch = Channel::new(4).unwrap();
        let cases = [
            (
                BimorphError::StepTimeout {
                    channel: ch,
                    commanded: 1.0,
                    last_observed: 0.0,
                },
                3,
            ),
            (BimorphError::RampTimeout { pending: vec![ch] }, 4),
            (BimorphError::ConvergenceExceeded { iterations: 10 }, 5),
            (BimorphError::InvalidRequest("x".into()), 6),
            (BimorphError::Hardware("x".into()), 1),
        ];
        for (e, code) in cases {
            assert_eq!(exit_code_for_error(&report(e)), code);
        }
    }

    #[test]
    fn context_does_not_hide_the_kind() {
        let err = report(BimorphError::ConvergenceExceeded { iterations: 3 }).wrap_err("moving");
        assert_eq!(exit_code_for_error(&err), 5);
        assert!(humanize(&err).contains("after 3 arm+ramp passes"));
    }

    #[test]
    fn json_carries_details() {
        let err = report(BimorphError::RampTimeout {
            pending: vec![Channel::new(12).unwrap(), Channel::new(13).unwrap()],
        });
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "RampTimeout");
        assert_eq!(v["details"]["pending"], serde_json::json!([12, 13]));
    }

    #[test]
    fn config_messages_are_recognized() {
        let err = eyre::eyre!("motion.tolerance must be > 0");
        assert!(humanize(&err).starts_with("What happened: Configuration is invalid"));
        assert_eq!(reason_name(&err), "Error");
    }
}
