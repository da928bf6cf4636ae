//! Adjacency safety predicate.

use bimorph_traits::{Channel, Voltages};

use crate::topology::constrained_set;

/// True if committing `target_voltage` to `channel` keeps it within
/// `max_distance` of the current and armed voltage of itself and every
/// neighbor.
///
/// The self-check means no single commit can move a channel more than
/// `max_distance` away from its own present state.
pub fn is_safe(
    channel: Channel,
    target_voltage: f64,
    current: &Voltages,
    armed: &Voltages,
    max_distance: f64,
) -> bool {
    constrained_set(channel).all(|j| {
        (target_voltage - current[j.index()]).abs() <= max_distance
            && (target_voltage - armed[j.index()]).abs() <= max_distance
    })
}

/// Pairs `(i, j)` where `setpoint[i]` is further than `max_distance` from the
/// current or armed voltage of `j`, for `j` in `i`'s neighbors and `i` itself.
/// Empty when the array is safe.
pub fn invariant_violations(
    setpoint: &Voltages,
    current: &Voltages,
    armed: &Voltages,
    max_distance: f64,
) -> Vec<(Channel, Channel)> {
    let mut out = Vec::new();
    for i in Channel::all() {
        let sp = setpoint[i.index()];
        for j in constrained_set(i) {
            if (sp - current[j.index()]).abs() > max_distance
                || (sp - armed[j.index()]).abs() > max_distance
            {
                out.push((i, j));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimorph_traits::CHANNEL_COUNT;

    fn ch(i: u8) -> Channel {
        Channel::new(i).unwrap()
    }

    #[test]
    fn boundary_distance_is_allowed() {
        let mut current = [300.0; CHANNEL_COUNT];
        current[13] = 400.0;
        let armed = current;
        assert!(is_safe(ch(12), 800.0, &current, &armed, 500.0));
        assert!(!is_safe(ch(12), 800.5, &current, &armed, 500.0));
    }

    #[test]
    fn armed_state_of_neighbor_is_checked() {
        let current = [0.0; CHANNEL_COUNT];
        let mut armed = current;
        armed[1] = -200.0;
        assert!(is_safe(ch(0), 100.0, &current, &armed, 300.0));
        assert!(!is_safe(ch(0), 150.0, &current, &armed, 300.0));
    }

    #[test]
    fn self_check_limits_a_lone_channel() {
        let current = [0.0; CHANNEL_COUNT];
        let armed = current;
        assert!(is_safe(ch(28), 500.0, &current, &armed, 500.0));
        assert!(!is_safe(ch(28), 501.0, &current, &armed, 500.0));
    }

    #[test]
    fn invariant_ignores_cross_mirror_pairs() {
        let mut v = [0.0; CHANNEL_COUNT];
        v[12..24].fill(900.0);
        // channel 11 and 12 are not neighbors
        assert!(invariant_violations(&v, &v, &v, 500.0).is_empty());

        let mut armed = v;
        armed[13] = 0.0;
        let found = invariant_violations(&v, &v, &armed, 500.0);
        assert!(found.contains(&(ch(12), ch(13))));
        assert!(found.contains(&(ch(14), ch(13))));
    }

    #[test]
    fn invariant_sees_a_channel_leaving_its_own_state() {
        let current = [0.0; CHANNEL_COUNT];
        let armed = current;
        let mut setpoint = current;
        setpoint[28] = 2000.0;
        assert_eq!(
            invariant_violations(&setpoint, &current, &armed, 500.0),
            vec![(ch(28), ch(28))]
        );

        // a grouped channel reports itself as well as both neighbors
        setpoint[28] = 0.0;
        setpoint[5] = 600.0;
        let found = invariant_violations(&setpoint, &current, &armed, 500.0);
        assert_eq!(found, vec![(ch(5), ch(5)), (ch(5), ch(4)), (ch(5), ch(6))]);
    }
}
