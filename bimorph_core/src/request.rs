//! Move requests: which channels go where.

use std::collections::BTreeMap;
use std::str::FromStr;

use bimorph_traits::Channel;

use crate::config::SafetyCfg;
use crate::error::BimorphError;

/// Target voltages for a subset of channels, kept in ascending channel order.
///
/// Ascending order is also the write order of every pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveRequest {
    targets: BTreeMap<Channel, f64>,
}

impl MoveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, channel: Channel, target: f64) -> Self {
        self.targets.insert(channel, target);
        self
    }

    /// Insert or replace a target, returning the previous one.
    pub fn insert(&mut self, channel: Channel, target: f64) -> Option<f64> {
        self.targets.insert(channel, target)
    }

    pub fn target(&self, channel: Channel) -> Option<f64> {
        self.targets.get(&channel).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// `(channel, target)` pairs in ascending channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        self.targets.iter().map(|(c, v)| (*c, *v))
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.targets.keys().copied().collect()
    }

    /// Reject empty requests and targets outside the configured range.
    pub fn validate(&self, limits: &SafetyCfg) -> Result<(), BimorphError> {
        if self.targets.is_empty() {
            return Err(BimorphError::InvalidRequest("no channels requested".into()));
        }
        for (channel, target) in self.iter() {
            if !target.is_finite() {
                return Err(BimorphError::InvalidRequest(format!(
                    "{channel} target is not finite"
                )));
            }
            if !(limits.min_voltage..=limits.max_voltage).contains(&target) {
                return Err(BimorphError::InvalidRequest(format!(
                    "{channel} target {target} V outside [{}, {}] V",
                    limits.min_voltage, limits.max_voltage
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(Channel, f64)> for MoveRequest {
    fn from_iter<I: IntoIterator<Item = (Channel, f64)>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<&[bimorph_config::MoveRow]> for MoveRequest {
    type Error = BimorphError;
    fn try_from(rows: &[bimorph_config::MoveRow]) -> Result<Self, Self::Error> {
        let mut req = MoveRequest::new();
        for row in rows {
            let channel = Channel::new(row.channel).ok_or_else(|| {
                BimorphError::InvalidRequest(format!("channel {} out of range", row.channel))
            })?;
            if req.insert(channel, row.target).is_some() {
                return Err(BimorphError::InvalidRequest(format!(
                    "{channel} requested twice"
                )));
            }
        }
        Ok(req)
    }
}

/// One `CH=VOLTS` assignment, e.g. `12=350`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub channel: Channel,
    pub target: f64,
}

impl FromStr for Assignment {
    type Err = BimorphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || BimorphError::InvalidRequest(format!("expected CH=VOLTS, got {s:?}"));
        let (ch, volts) = s.split_once('=').ok_or_else(bad)?;
        let raw: u8 = ch.trim().parse().map_err(|_| bad())?;
        let channel = Channel::new(raw).ok_or_else(|| {
            BimorphError::InvalidRequest(format!("channel {raw} out of range"))
        })?;
        let target: f64 = volts.trim().parse().map_err(|_| bad())?;
        Ok(Assignment { channel, target })
    }
}

impl TryFrom<Vec<Assignment>> for MoveRequest {
    type Error = BimorphError;
    fn try_from(items: Vec<Assignment>) -> Result<Self, Self::Error> {
        let mut req = MoveRequest::new();
        for a in items {
            if req.insert(a.channel, a.target).is_some() {
                return Err(BimorphError::InvalidRequest(format!(
                    "{} requested twice",
                    a.channel
                )));
            }
        }
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(i: u8) -> Channel {
        Channel::new(i).unwrap()
    }

    #[test]
    fn iterates_in_ascending_channel_order() {
        let req = MoveRequest::new()
            .with(ch(15), 1.0)
            .with(ch(3), 2.0)
            .with(ch(12), 3.0);
        assert_eq!(req.channels(), vec![ch(3), ch(12), ch(15)]);
    }

    #[test]
    fn parses_assignments() {
        let a: Assignment = "12= 350.5".parse().unwrap();
        assert_eq!(a.channel, ch(12));
        assert_eq!(a.target, 350.5);
        assert!("32=1".parse::<Assignment>().is_err());
        assert!("12:350".parse::<Assignment>().is_err());
        assert!("x=1".parse::<Assignment>().is_err());
    }

    #[test]
    fn rejects_duplicates_and_out_of_range_targets() {
        let dup = vec![
            Assignment {
                channel: ch(1),
                target: 0.0,
            },
            Assignment {
                channel: ch(1),
                target: 5.0,
            },
        ];
        assert!(MoveRequest::try_from(dup).is_err());

        let limits = SafetyCfg::default();
        let req = MoveRequest::new().with(ch(1), 1500.0);
        let err = req.validate(&limits).unwrap_err();
        assert!(err.to_string().contains("outside"));
        assert!(MoveRequest::new().validate(&limits).is_err());
    }

    #[test]
    fn builds_from_csv_rows() {
        let rows = [
            bimorph_config::MoveRow {
                channel: 13,
                target: 350.0,
            },
            bimorph_config::MoveRow {
                channel: 12,
                target: 340.0,
            },
        ];
        let req = MoveRequest::try_from(&rows[..]).unwrap();
        assert_eq!(req.target(ch(12)), Some(340.0));
        assert_eq!(req.channels(), vec![ch(12), ch(13)]);
    }
}
