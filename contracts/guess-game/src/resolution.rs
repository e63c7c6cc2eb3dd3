//! Round resolution.
//!
//! Pure scoring over the seats of one game: no storage and no `Env`, so the
//! whole rule cascade can be exercised with plain arrays.
//!
//! Guesses are compared against a target of 0.8x the average of the valid
//! guesses, carried as a fixed-point integer scaled by `PRECISION`. Every
//! distance is measured on the scaled values, never on raw guesses, so tie
//! detection agrees with the truncated target.
//!
//! Cascade order, each stage entered only if the previous one did not end
//! the round:
//!
//! 1. Timeout: active non-submitters lose `TIMEOUT_PENALTY`. The round ends
//!    here at two active players, or when non-submitters are at least
//!    `TIMEOUT_MAJORITY_PERCENT` of the active players.
//! 2. Exact match (at most 3 active): a single exact hit costs every other
//!    valid submitter `EXACT_MATCH_PENALTY`. Two or more hits void the rule.
//! 3. Closest tie: several submitters share the minimum distance; each loses
//!    `TIE_PENALTY` and the base rule is skipped.
//! 4. Extreme bluff (at most 2 active): only evaluated while the base rule is
//!    still due. A 0 facing a 100 costs the 0-guesser `BLUFF_PENALTY` and
//!    skips the base rule.
//! 5. Base: the single closest submitter is spared, every other valid
//!    submitter loses `BASE_PENALTY`.

use soroban_sdk::contracttype;

/// Fixed-point scale of the target (two implied decimals).
pub const PRECISION: u64 = 100;
/// Highest number a player may guess.
pub const MAX_NUMBER: u32 = 100;
/// Seats in a full game.
pub const MAX_SEATS: usize = 5;

pub const TIMEOUT_PENALTY: u32 = 2;
pub const EXACT_MATCH_PENALTY: u32 = 2;
pub const TIE_PENALTY: u32 = 1;
pub const BLUFF_PENALTY: u32 = 1;
pub const BASE_PENALTY: u32 = 1;

/// Share of non-submitting active players (in percent) that ends a round.
pub const TIMEOUT_MAJORITY_PERCENT: u32 = 60;

const TARGET_NUMERATOR: u64 = 8;
const TARGET_DENOMINATOR: u64 = 10;

const EXACT_MATCH_MAX_ACTIVE: u32 = 3;
const CLOSEST_TIE_MAX_ACTIVE: u32 = 5;
const EXTREME_BLUFF_MAX_ACTIVE: u32 = 2;
const TIMEOUT_SHORT_CIRCUIT_ACTIVE: u32 = 2;

const BLUFF_LOW: u32 = 0;
const BLUFF_HIGH: u32 = 100;

/// The stage of the cascade that concluded a round.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResolutionRule {
    Timeout = 0,
    ExactMatch = 1,
    ClosestTie = 2,
    ExtremeBluff = 3,
    Base = 4,
}

/// One roster position as the engine sees it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Seat {
    pub points: u32,
    pub submitted: bool,
    pub number: u32,
}

impl Seat {
    pub fn is_active(&self) -> bool {
        self.points > 0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    pub rule: ResolutionRule,
    /// `None` when the round ended before a target was computed.
    pub target: Option<u64>,
    /// Seats that dropped to zero points this round.
    pub eliminated: [bool; MAX_SEATS],
}

impl Resolution {
    fn new() -> Self {
        Resolution {
            rule: ResolutionRule::Timeout,
            target: None,
            eliminated: [false; MAX_SEATS],
        }
    }

    #[cfg(test)]
    fn eliminated_count(&self) -> u32 {
        self.eliminated.iter().filter(|e| **e).count() as u32
    }
}

/// Snapshot taken before any penalty is applied. Later stages use it, so a
/// penalty earlier in the cascade never changes who counts as valid.
struct Tally {
    active: u32,
    valid: u32,
    valid_mask: [bool; MAX_SEATS],
    sum: u64,
}

impl Tally {
    fn of(seats: &[Seat]) -> Self {
        let mut tally = Tally {
            active: 0,
            valid: 0,
            valid_mask: [false; MAX_SEATS],
            sum: 0,
        };
        for (i, seat) in seats.iter().enumerate() {
            if !seat.is_active() {
                continue;
            }
            tally.active += 1;
            if seat.submitted {
                tally.valid += 1;
                tally.valid_mask[i] = true;
                tally.sum += seat.number as u64;
            }
        }
        tally
    }

    fn non_submitters(&self) -> u32 {
        self.active - self.valid
    }

    fn timeout_majority(&self) -> bool {
        self.non_submitters() * 100 >= self.active * TIMEOUT_MAJORITY_PERCENT
    }
}

/// `sum * 8 * PRECISION / (10 * valid)`, truncating.
pub fn compute_target(sum: u64, valid: u32) -> u64 {
    sum * TARGET_NUMERATOR * PRECISION / (TARGET_DENOMINATOR * valid as u64)
}

fn distance(number: u32, target: u64) -> u64 {
    (number as u64 * PRECISION).abs_diff(target)
}

fn penalize(seats: &mut [Seat], idx: usize, amount: u32, resolution: &mut Resolution) {
    let seat = &mut seats[idx];
    if seat.points == 0 {
        return;
    }
    seat.points = seat.points.saturating_sub(amount);
    if seat.points == 0 {
        resolution.eliminated[idx] = true;
    }
}

/// Resolve one round in place. `seats` is the roster in join order.
pub fn resolve(seats: &mut [Seat]) -> Resolution {
    debug_assert!(seats.len() <= MAX_SEATS);

    let mut resolution = Resolution::new();
    let tally = Tally::of(seats);

    if tally.valid < tally.active {
        for i in 0..seats.len() {
            if seats[i].is_active() && !seats[i].submitted {
                penalize(seats, i, TIMEOUT_PENALTY, &mut resolution);
            }
        }
        if tally.active == TIMEOUT_SHORT_CIRCUIT_ACTIVE || tally.timeout_majority() {
            return resolution;
        }
    }
    if tally.valid == 0 {
        return resolution;
    }

    let target = compute_target(tally.sum, tally.valid);
    resolution.target = Some(target);

    if tally.active <= EXACT_MATCH_MAX_ACTIVE {
        if let Some(hit) = single_exact_match(seats, &tally, target) {
            for i in 0..seats.len() {
                if tally.valid_mask[i] && i != hit {
                    penalize(seats, i, EXACT_MATCH_PENALTY, &mut resolution);
                }
            }
            resolution.rule = ResolutionRule::ExactMatch;
            return resolution;
        }
    }

    let (closest, min_distance, closest_count) = closest_seats(seats, &tally, target);

    let mut apply_base = true;
    if tally.active <= CLOSEST_TIE_MAX_ACTIVE && closest_count > 1 {
        for i in 0..seats.len() {
            if tally.valid_mask[i] && distance(seats[i].number, target) == min_distance {
                penalize(seats, i, TIE_PENALTY, &mut resolution);
            }
        }
        resolution.rule = ResolutionRule::ClosestTie;
        apply_base = false;
    }

    if tally.active <= EXTREME_BLUFF_MAX_ACTIVE {
        apply_base = apply_base && !extreme_bluff(seats, &tally, &mut resolution);
    }

    if apply_base {
        for i in 0..seats.len() {
            if tally.valid_mask[i] && i != closest {
                penalize(seats, i, BASE_PENALTY, &mut resolution);
            }
        }
        resolution.rule = ResolutionRule::Base;
    }

    resolution
}

fn single_exact_match(seats: &[Seat], tally: &Tally, target: u64) -> Option<usize> {
    let mut hit = None;
    for (i, seat) in seats.iter().enumerate() {
        if tally.valid_mask[i] && seat.number as u64 * PRECISION == target {
            if hit.is_some() {
                return None;
            }
            hit = Some(i);
        }
    }
    hit
}

/// Returns (first closest seat, minimum distance, seats at that distance).
fn closest_seats(seats: &[Seat], tally: &Tally, target: u64) -> (usize, u64, u32) {
    let mut closest = 0;
    let mut min_distance = u64::MAX;
    let mut count = 0;
    for (i, seat) in seats.iter().enumerate() {
        if !tally.valid_mask[i] {
            continue;
        }
        let d = distance(seat.number, target);
        if d < min_distance {
            closest = i;
            min_distance = d;
            count = 1;
        } else if d == min_distance {
            count += 1;
        }
    }
    (closest, min_distance, count)
}

/// Applies the bluff penalty and returns true if a 0 faced a 100.
fn extreme_bluff(seats: &mut [Seat], tally: &Tally, resolution: &mut Resolution) -> bool {
    let mut low = None;
    let mut high = false;
    for (i, seat) in seats.iter().enumerate() {
        if !tally.valid_mask[i] {
            continue;
        }
        if seat.number == BLUFF_LOW && low.is_none() {
            low = Some(i);
        } else if seat.number == BLUFF_HIGH {
            high = true;
        }
    }

    match low {
        Some(idx) if high => {
            penalize(seats, idx, BLUFF_PENALTY, resolution);
            resolution.rule = ResolutionRule::ExtremeBluff;
            true
        }
        _ => false,
    }
}
