//! Ranking engine: a FIFO chain of member ids cut into three tiers.
//!
//! The chain lives in an arena keyed by [`MemberId`]; each slot stores its
//! predecessor and successor. Ids are issued from a monotonic counter and
//! appended at the tail, so ids strictly increase from head to tail. That
//! ordering is what lets [`TierCompute::tier`] answer in O(1) by comparing
//! an id against the segment heads.
//!
//! Segment heads double as "positions": a head equal to [`NONE`] while the
//! segment's population is non-zero means "one past the tail".

use std::collections::{BTreeMap, HashMap};

use glq_core::constants::{tier1_target, tier2_target};
use glq_core::error::TierError;
use glq_core::types::{MemberId, Tier};
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

/// Null link.
const NONE: MemberId = 0;

/// Upper bound on boundary moves performed by a single add or remove.
///
/// One mutation shifts each tier target by at most one member, so the
/// tier 1/2 boundary moves at most once and the tier 2/3 boundary at most twice.
pub const MAX_REBALANCE_STEPS: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Link {
    prev: MemberId,
    next: MemberId,
}

/// A member whose tier changed while boundaries were rebalanced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierChange {
    pub id: MemberId,
    pub from: Tier,
    pub to: Tier,
}

/// Emits the arena in id order so equal engines serialize to equal bytes.
fn serialize_sorted<S: Serializer>(links: &HashMap<MemberId, Link>, s: S) -> Result<S::Ok, S::Error> {
    links.iter().collect::<BTreeMap<_, _>>().serialize(s)
}

/// Externally visible ranking layout.
///
/// `total_tier3` is derived: `total_stakes - total_tier1 - total_tier2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingState {
    pub tier1_head: MemberId,
    pub tier2_head: MemberId,
    pub tier3_head: MemberId,
    pub last: MemberId,
    pub total_stakes: u64,
    pub total_tier1: u64,
    pub total_tier2: u64,
}

impl RankingState {
    pub fn total_tier3(&self) -> u64 {
        self.total_stakes - self.total_tier1 - self.total_tier2
    }
}

/// Incrementally balanced three-tier ranking of active members.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCompute {
    #[serde(serialize_with = "serialize_sorted")]
    links: HashMap<MemberId, Link>,
    /// Highest id ever issued. Survives full drains; ids are never reused.
    last_issued: MemberId,
    tier1_head: MemberId,
    tier2_head: MemberId,
    tier3_head: MemberId,
    last: MemberId,
    total_stakes: u64,
    total_tier1: u64,
    total_tier2: u64,
}

impl TierCompute {
    /// Create an empty ranking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new member at the junior end of the chain.
    ///
    /// Always succeeds. The new member starts in tier 3; boundaries are then
    /// advanced toward the new targets.
    pub fn add(&mut self) -> MemberId {
        self.add_tracked().0
    }

    /// [`add`](Self::add), also reporting every member whose tier changed.
    pub fn add_tracked(&mut self) -> (MemberId, Vec<TierChange>) {
        self.last_issued += 1;
        let id = self.last_issued;

        self.links.insert(id, Link { prev: self.last, next: NONE });
        if let Some(tail) = self.links.get_mut(&self.last) {
            tail.next = id;
        }

        // A head at NONE points one past the old tail, which is now `id`.
        if self.tier1_head == NONE {
            self.tier1_head = id;
        }
        if self.tier2_head == NONE {
            self.tier2_head = id;
        }
        if self.tier3_head == NONE {
            self.tier3_head = id;
        }

        self.last = id;
        self.total_stakes += 1;
        let changes = self.rebalance();

        debug!(
            id,
            total = self.total_stakes,
            tier1 = self.total_tier1,
            tier2 = self.total_tier2,
            steps = changes.len(),
            "member added"
        );
        (id, changes)
    }

    /// Unlink a member and rebalance.
    ///
    /// # Errors
    ///
    /// [`TierError::UserNotFound`] if `id` is not currently linked.
    pub fn remove(&mut self, id: MemberId) -> Result<(), TierError> {
        self.remove_tracked(id).map(|_| ())
    }

    /// [`remove`](Self::remove), also reporting every member whose tier changed.
    pub fn remove_tracked(&mut self, id: MemberId) -> Result<Vec<TierChange>, TierError> {
        let link = *self.links.get(&id).ok_or(TierError::UserNotFound(id))?;
        let tier = self.tier_of(id);

        // Any head sitting on `id` slides to its successor, which inherits
        // the same index once `id` is spliced out.
        if self.tier1_head == id {
            self.tier1_head = link.next;
        }
        if self.tier2_head == id {
            self.tier2_head = link.next;
        }
        if self.tier3_head == id {
            self.tier3_head = link.next;
        }

        match tier {
            Tier::One => self.total_tier1 -= 1,
            Tier::Two => self.total_tier2 -= 1,
            Tier::Three => {}
        }

        if let Some(prev) = self.links.get_mut(&link.prev) {
            prev.next = link.next;
        }
        if let Some(next) = self.links.get_mut(&link.next) {
            next.prev = link.prev;
        }
        if self.last == id {
            self.last = link.prev;
        }

        self.links.remove(&id);
        self.total_stakes -= 1;
        let changes = self.rebalance();

        debug!(
            id,
            %tier,
            total = self.total_stakes,
            tier1 = self.total_tier1,
            tier2 = self.total_tier2,
            steps = changes.len(),
            "member removed"
        );
        Ok(changes)
    }

    /// Current tier of an active member.
    ///
    /// # Errors
    ///
    /// [`TierError::UserNotFound`] if `id` is not currently linked.
    pub fn tier(&self, id: MemberId) -> Result<Tier, TierError> {
        if !self.contains(id) {
            return Err(TierError::UserNotFound(id));
        }
        Ok(self.tier_of(id))
    }

    /// Whether `id` is currently linked.
    pub fn contains(&self, id: MemberId) -> bool {
        self.links.contains_key(&id)
    }

    /// 1-based seniority rank: members strictly more senior than `id`, plus one.
    ///
    /// Walks forward from the head of `id`'s tier, so cost is proportional to
    /// the offset within that tier.
    pub fn position(&self, id: MemberId) -> Result<u64, TierError> {
        let tier = self.tier(id)?;
        let (mut cursor, mut rank) = match tier {
            Tier::One => (self.tier1_head, 1),
            Tier::Two => (self.tier2_head, self.total_tier1 + 1),
            Tier::Three => (self.tier3_head, self.total_tier1 + self.total_tier2 + 1),
        };
        while cursor != id {
            cursor = self.next_of(cursor);
            rank += 1;
        }
        Ok(rank)
    }

    /// Members of `tier`, most senior first.
    pub fn members(&self, tier: Tier) -> Vec<MemberId> {
        let (head, count) = match tier {
            Tier::One => (self.tier1_head, self.total_tier1),
            Tier::Two => (self.tier2_head, self.total_tier2),
            Tier::Three => (self.tier3_head, self.total_tier3()),
        };
        self.walk_from(head).take(count as usize).collect()
    }

    pub fn tier1(&self) -> Vec<MemberId> {
        self.members(Tier::One)
    }

    pub fn tier2(&self) -> Vec<MemberId> {
        self.members(Tier::Two)
    }

    pub fn tier3(&self) -> Vec<MemberId> {
        self.members(Tier::Three)
    }

    /// All active members, most senior first.
    pub fn iter(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.walk_from(self.tier1_head)
    }

    pub fn total_stakes(&self) -> u64 {
        self.total_stakes
    }

    pub fn total_tier1(&self) -> u64 {
        self.total_tier1
    }

    pub fn total_tier2(&self) -> u64 {
        self.total_tier2
    }

    pub fn total_tier3(&self) -> u64 {
        self.total_stakes - self.total_tier1 - self.total_tier2
    }

    /// Id of the junior-most member, 0 when empty.
    pub fn last(&self) -> MemberId {
        self.last
    }

    /// Highest id ever issued.
    pub fn last_issued(&self) -> MemberId {
        self.last_issued
    }

    pub fn is_empty(&self) -> bool {
        self.total_stakes == 0
    }

    /// Snapshot of the externally visible layout.
    pub fn state(&self) -> RankingState {
        RankingState {
            tier1_head: self.tier1_head,
            tier2_head: self.tier2_head,
            tier3_head: self.tier3_head,
            last: self.last,
            total_stakes: self.total_stakes,
            total_tier1: self.total_tier1,
            total_tier2: self.total_tier2,
        }
    }

    fn tier_of(&self, id: MemberId) -> Tier {
        if self.tier3_head != NONE && id >= self.tier3_head {
            Tier::Three
        } else if self.tier2_head != NONE && id >= self.tier2_head {
            Tier::Two
        } else {
            Tier::One
        }
    }

    fn next_of(&self, id: MemberId) -> MemberId {
        self.links.get(&id).map_or(NONE, |l| l.next)
    }

    /// One link toward the head; from NONE (past the tail) that is the tail.
    fn prev_of(&self, id: MemberId) -> MemberId {
        if id == NONE {
            self.last
        } else {
            self.links.get(&id).map_or(NONE, |l| l.prev)
        }
    }

    fn walk_from(&self, start: MemberId) -> impl Iterator<Item = MemberId> + '_ {
        std::iter::successors((start != NONE).then_some(start), move |&id| {
            let next = self.next_of(id);
            (next != NONE).then_some(next)
        })
    }

    /// Move both boundaries onto their targets for the current population.
    ///
    /// The tier 1/2 boundary retreats first and advances last so it never
    /// crosses the tier 2/3 boundary mid-adjustment. Every step moves exactly
    /// one member across a boundary; each move is returned in order.
    fn rebalance(&mut self) -> Vec<TierChange> {
        let want_tier1 = tier1_target(self.total_stakes);
        let want_upper = want_tier1 + tier2_target(self.total_stakes);
        let mut changes = Vec::new();

        while self.total_tier1 > want_tier1 {
            self.tier2_head = self.prev_of(self.tier2_head);
            self.total_tier1 -= 1;
            self.total_tier2 += 1;
            changes.push(TierChange { id: self.tier2_head, from: Tier::One, to: Tier::Two });
        }
        while self.total_tier1 + self.total_tier2 < want_upper {
            let promoted = self.tier3_head;
            self.tier3_head = self.next_of(promoted);
            self.total_tier2 += 1;
            changes.push(TierChange { id: promoted, from: Tier::Three, to: Tier::Two });
        }
        while self.total_tier1 + self.total_tier2 > want_upper {
            self.tier3_head = self.prev_of(self.tier3_head);
            self.total_tier2 -= 1;
            changes.push(TierChange { id: self.tier3_head, from: Tier::Two, to: Tier::Three });
        }
        while self.total_tier1 < want_tier1 {
            let promoted = self.tier2_head;
            self.tier2_head = self.next_of(promoted);
            self.total_tier1 += 1;
            self.total_tier2 -= 1;
            changes.push(TierChange { id: promoted, from: Tier::Two, to: Tier::One });
        }

        debug_assert!(
            changes.len() <= MAX_REBALANCE_STEPS,
            "rebalance walked {} links",
            changes.len()
        );
        changes
    }
}
