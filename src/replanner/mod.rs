// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The pluggable replanning policies (spec §4.3, §4.4): DRRT★ local repair and MARS/MARSHA
//! multi-path repair, behind one small capability trait rather than an open inheritance
//! hierarchy — the set of replanners is closed (spec §9).

pub mod drrt_star;
pub mod mars;

use crate::{configuration::Configuration, time::Instant, tree::Path};

pub use drrt_star::DrrtStarReplanner;
pub use mars::MarsReplanner;

/// The result of a `replan()` call (spec §3's "Replanner State", folded into a per-call return
/// value rather than a long-lived struct).
pub struct ReplanOutcome {
    /// `true` if a complete, unobstructed start→goal path was found and is the result of
    /// reattaching the goal within the deadline.
    pub success: bool,
    /// `true` if the replanner's clone of the tree was structurally altered, even if it did not
    /// reach `success`. The manager uses this to decide whether a rollback is required.
    pub mutated: bool,
    /// The best path found. Equal to the input path, unmodified, when `mutated` is `false`.
    pub replanned_path: Path,
}

/// Every replanning strategy exposes this one entry point. Implementations never mutate
/// `current_path` in place — they are handed a clone by the manager and are invariant under the
/// caller holding no locks on shared state (spec §4.4).
pub trait Replanner: Send {
    fn replan(&mut self, current_configuration: &Configuration, current_path: &Path, deadline: Instant) -> ReplanOutcome;

    /// Refreshes the bank of alternate paths a replanner may bridge onto (spec §4.4). Only
    /// `MarsReplanner` uses this; DRRT★'s local repair ignores it.
    fn set_alternate_paths(&mut self, _other_paths: Vec<Path>) {}
}

/// The configured replanning strategy (spec §6's `replanner_type` configuration input).
///
/// `MPRRT`, `DRRT`, and `anytimeDRRT` name variants of the same local-repair family described in
/// spec §9; this crate commits to `rewireBehindObs` semantics for all of them, so they share one
/// implementation (`DrrtStarReplanner`) distinguished only by label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplannerKind {
    Mprrt,
    Drrt,
    DrrtStar,
    AnytimeDrrt,
    Mars,
    Marsha,
}
