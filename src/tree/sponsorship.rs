use crate::core::member::{Member, MemberId};
use std::collections::{HashMap, VecDeque};

/// Generation bonuses reach five levels deep in the sponsorship chain.
pub const MAX_GENERATION: u8 = 5;

/// The sponsorship relation: who directly recruited whom.
///
/// This is a separate structure from the binary placement tree. A
/// sponsor can have any number of direct recruits even though each
/// placement node holds at most two children; spillover puts a recruit
/// under a descendant while the sponsorship link still points at the
/// recruiter. Generation depth for generation bonuses is measured here,
/// never in the placement tree.
#[derive(Debug, Clone, Default)]
pub struct SponsorshipIndex {
    /// sponsor -> direct recruits, in member storage order.
    recruits: HashMap<MemberId, Vec<MemberId>>,
}

impl SponsorshipIndex {
    /// Build the index from a member collection.
    pub fn from_members<'a>(members: impl IntoIterator<Item = &'a Member>) -> Self {
        let mut recruits: HashMap<MemberId, Vec<MemberId>> = HashMap::new();
        for member in members {
            if let Some(sponsor) = member.sponsor() {
                recruits
                    .entry(sponsor.clone())
                    .or_default()
                    .push(member.id().clone());
            }
        }
        Self { recruits }
    }

    /// Members directly recruited by `sponsor`, in storage order.
    pub fn direct_recruits_of(&self, sponsor: &MemberId) -> &[MemberId] {
        self.recruits.get(sponsor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sponsorship depth of `member` below `ancestor`: 1 for a direct
    /// recruit, 2 for a recruit's recruit, and so on. `None` when
    /// `member` is not in `ancestor`'s sponsorship downline (or is
    /// `ancestor` itself).
    pub fn generation_of(&self, ancestor: &MemberId, member: &MemberId) -> Option<u8> {
        for (depth, level) in self.generations_of(ancestor, u8::MAX).iter().enumerate() {
            if level.contains(member) {
                return Some(depth as u8 + 1);
            }
        }
        None
    }

    /// The sponsorship downline of `ancestor`, split by generation.
    ///
    /// Index 0 holds generation 1 (direct recruits), index 1 holds
    /// generation 2, up to `max_depth` levels. Empty trailing levels
    /// are dropped.
    pub fn generations_of(&self, ancestor: &MemberId, max_depth: u8) -> Vec<Vec<MemberId>> {
        let mut levels = Vec::new();
        let mut frontier: VecDeque<&MemberId> = VecDeque::from([ancestor]);
        let mut depth = 0u8;
        while !frontier.is_empty() && depth < max_depth {
            let mut next = VecDeque::new();
            let mut level = Vec::new();
            for id in frontier {
                for recruit in self.direct_recruits_of(id) {
                    level.push(recruit.clone());
                    next.push_back(recruit);
                }
            }
            if level.is_empty() {
                break;
            }
            levels.push(level);
            frontier = next;
            depth += 1;
        }
        levels
    }

    /// Number of sponsors with at least one recruit.
    pub fn sponsor_count(&self) -> usize {
        self.recruits.len()
    }
}
