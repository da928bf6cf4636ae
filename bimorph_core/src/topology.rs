//! Physical channel layout of the bimorph power supply.
//!
//! Channels 0–11 drive the horizontal mirror and 12–23 the vertical mirror;
//! adjacency only exists inside one mirror. Channels 24–31 are wired to
//! nothing and carry no constraint.

use bimorph_traits::Channel;

/// Mirror a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Horizontal,
    Vertical,
    Unassigned,
}

impl Group {
    pub fn of(channel: Channel) -> Self {
        match channel.raw() {
            0..=11 => Group::Horizontal,
            12..=23 => Group::Vertical,
            _ => Group::Unassigned,
        }
    }

    /// First and last channel of the group, `None` for unassigned channels.
    pub fn bounds(self) -> Option<(u8, u8)> {
        match self {
            Group::Horizontal => Some((0, 11)),
            Group::Vertical => Some((12, 23)),
            Group::Unassigned => None,
        }
    }
}

/// Up to two adjacent channels, lowest index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighbors {
    raw: [u8; 2],
    len: usize,
}

impl Neighbors {
    fn push(&mut self, raw: u8) {
        self.raw[self.len] = raw;
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        self.raw[..self.len].iter().copied().filter_map(Channel::new)
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.iter().any(|c| c == channel)
    }
}

/// Channels adjacent to `channel` within its mirror.
pub fn neighbors(channel: Channel) -> Neighbors {
    let mut out = Neighbors::default();
    let Some((first, last)) = Group::of(channel).bounds() else {
        return out;
    };
    let raw = channel.raw();
    if raw > first {
        out.push(raw - 1);
    }
    if raw < last {
        out.push(raw + 1);
    }
    out
}

/// `channel` followed by its neighbors: the set a commit is checked against.
pub fn constrained_set(channel: Channel) -> impl Iterator<Item = Channel> {
    let n = neighbors(channel);
    std::iter::once(channel).chain(n.raw.into_iter().take(n.len).filter_map(Channel::new))
}
