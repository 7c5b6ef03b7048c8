//! Assignment heuristic: how well an elevator unit suits a new request.
//!
//! Rules are evaluated in order and the first that applies decides the score:
//! a full unit is never eligible, an idle unit is rated by distance (a perfect
//! match when already at the origin), and a busy unit is rated by whether it
//! will pass the origin in the request's direction, minus its load.

use crate::shared::{Direction, ElevatorSnapshot, Request};

pub const PERFECT_MATCH: i64 = 1000;
pub const IDLE_BASE: i64 = 500;
pub const IDLE_DISTANCE_PENALTY: i64 = 10;
pub const SAME_DIRECTION_BASE: i64 = 300;
pub const EN_ROUTE_BONUS: i64 = 200;
pub const WRONG_WAY_SCORE: i64 = -100;
pub const PASSENGER_PENALTY: i64 = 5;
pub const ASSIGNMENT_PENALTY: i64 = 3;

/// `None` means the unit must not take the request.
pub fn score(unit: &ElevatorSnapshot, assignments: u64, request: &Request) -> Option<i64> {
    if unit.passenger_count >= unit.capacity {
        return None;
    }

    let origin = request.origin_floor();
    if unit.idle {
        if unit.floor == origin {
            return Some(PERFECT_MATCH);
        }
        let distance = (unit.floor as i64 - origin as i64).abs();
        return Some(IDLE_BASE - IDLE_DISTANCE_PENALTY * distance);
    }

    let en_route = unit.direction == request.direction()
        && match unit.direction {
            Direction::Up => unit.floor <= origin,
            Direction::Down => unit.floor >= origin,
            Direction::Idle => false,
        };
    let base = if en_route {
        SAME_DIRECTION_BASE + EN_ROUTE_BONUS
    } else {
        WRONG_WAY_SCORE
    };

    Some(base - PASSENGER_PENALTY * unit.passenger_count as i64 - ASSIGNMENT_PENALTY * assignments as i64)
}

/// Picks the candidate with the strictly highest score; the first one wins a tie.
pub fn select_unit<I>(candidates: I) -> Option<(usize, i64)>
where
    I: IntoIterator<Item = (usize, Option<i64>)>,
{
    let mut best: Option<(usize, i64)> = None;
    for (index, score) in candidates {
        let Some(score) = score else { continue };
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best
}
