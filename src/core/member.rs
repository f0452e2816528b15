use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a member in the network.
///
/// # Examples
///
/// ```
/// use compensation_engine::core::member::MemberId;
///
/// let alice = MemberId::new("M-0001");
/// let bob = MemberId::new("M-0002");
/// assert_ne!(alice, bob);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One of the two subtrees directly under a member in the placement tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Left,
    Right,
}

impl Leg {
    pub fn opposite(self) -> Self {
        match self {
            Leg::Left => Leg::Right,
            Leg::Right => Leg::Left,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Left => write!(f, "left"),
            Leg::Right => write!(f, "right"),
        }
    }
}

/// One participant in the network.
///
/// A member sits in two distinct relations over the same id set:
///
/// - the **placement tree**: a strict binary tree (`parent`, `position`,
///   `left_child`, `right_child`) that determines leg volumes;
/// - the **sponsorship chain**: who recruited whom (`sponsor`), with
///   unbounded fan-out, which determines generation depth for
///   generation bonuses.
///
/// `position` describes this member's slot under its *parent*; it is
/// meaningless on the root and must be ignored there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    name: String,
    /// Current rank id. References the rank table; unknown ids resolve
    /// to the lowest rank on lookup.
    rank_id: u8,
    /// Monthly personal sales volume.
    personal_volume: Decimal,
    /// Slot under the parent. Ignored on the root.
    position: Leg,
    parent: Option<MemberId>,
    left_child: Option<MemberId>,
    right_child: Option<MemberId>,
    /// Who recruited this member. None only for the root.
    sponsor: Option<MemberId>,
    /// True when this member was personally recruited by the root user,
    /// as opposed to placed via spillover.
    direct_recruit: bool,
    joined_at: DateTime<Utc>,
}

impl Member {
    /// Create an unplaced member at the lowest rank with zero volume.
    pub fn new(id: impl Into<MemberId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rank_id: 1,
            personal_volume: Decimal::ZERO,
            position: Leg::Left,
            parent: None,
            left_child: None,
            right_child: None,
            sponsor: None,
            direct_recruit: false,
            joined_at: Utc::now(),
        }
    }

    pub fn with_rank(mut self, rank_id: u8) -> Self {
        self.rank_id = rank_id;
        self
    }

    pub fn with_personal_volume(mut self, volume: Decimal) -> Self {
        self.personal_volume = volume;
        self
    }

    /// Pre-link this member under a parent. Used when loading a network
    /// that was already laid out; live placement goes through the tree.
    pub fn with_parent(mut self, parent: MemberId, position: Leg) -> Self {
        self.parent = Some(parent);
        self.position = position;
        self
    }

    pub fn with_sponsor(mut self, sponsor: MemberId) -> Self {
        self.sponsor = Some(sponsor);
        self
    }

    pub fn as_direct_recruit(mut self) -> Self {
        self.direct_recruit = true;
        self
    }

    pub fn with_joined_at(mut self, joined_at: DateTime<Utc>) -> Self {
        self.joined_at = joined_at;
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> &MemberId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank_id(&self) -> u8 {
        self.rank_id
    }

    pub fn personal_volume(&self) -> Decimal {
        self.personal_volume
    }

    pub fn position(&self) -> Leg {
        self.position
    }

    pub fn parent(&self) -> Option<&MemberId> {
        self.parent.as_ref()
    }

    pub fn left_child(&self) -> Option<&MemberId> {
        self.left_child.as_ref()
    }

    pub fn right_child(&self) -> Option<&MemberId> {
        self.right_child.as_ref()
    }

    pub fn child(&self, leg: Leg) -> Option<&MemberId> {
        match leg {
            Leg::Left => self.left_child.as_ref(),
            Leg::Right => self.right_child.as_ref(),
        }
    }

    pub fn sponsor(&self) -> Option<&MemberId> {
        self.sponsor.as_ref()
    }

    pub fn is_direct_recruit(&self) -> bool {
        self.direct_recruit
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    /// True when either leg slot is unfilled.
    pub fn has_open_slot(&self) -> bool {
        self.left_child.is_none() || self.right_child.is_none()
    }

    // --- Crate-internal mutators, driven by the placement tree and engine ---

    pub(crate) fn set_child(&mut self, leg: Leg, child: Option<MemberId>) {
        match leg {
            Leg::Left => self.left_child = child,
            Leg::Right => self.right_child = child,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: MemberId, position: Leg) {
        self.parent = Some(parent);
        self.position = position;
    }

    pub(crate) fn set_sponsor(&mut self, sponsor: MemberId) {
        self.sponsor = Some(sponsor);
    }

    pub(crate) fn set_rank(&mut self, rank_id: u8) {
        self.rank_id = rank_id;
    }

    pub(crate) fn add_personal_volume(&mut self, amount: Decimal) {
        self.personal_volume += amount;
    }

    pub(crate) fn mark_direct_recruit(&mut self) {
        self.direct_recruit = true;
    }
}
