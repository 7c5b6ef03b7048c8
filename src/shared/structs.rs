/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::RequestError;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Idle,
}

impl Direction {
    /// Direction of travel from `from` to `to`; equal floors give `Idle`.
    pub fn between(from: u8, to: u8) -> Direction {
        if to > from {
            Direction::Up
        } else if to < from {
            Direction::Down
        } else {
            Direction::Idle
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Idle => "IDLE",
        };
        f.pad(symbol)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionStatus {
    Stopped,
    Moving,
    DoorsOpening,
    DoorsOpen,
    DoorsClosing,
}

impl fmt::Display for MotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            MotionStatus::Stopped => "STOPPED",
            MotionStatus::Moving => "MOVING",
            MotionStatus::DoorsOpening => "DOORS_OPENING",
            MotionStatus::DoorsOpen => "DOORS_OPEN",
            MotionStatus::DoorsClosing => "DOORS_CLOSING",
        };
        f.pad(symbol)
    }
}

/// Process-wide request sequence. Starts at zero when the process starts;
/// the first request gets id 1.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/**
 * One passenger trip.
 *
 * Only constructible through [`Request::new`], so a `Request` in the system always
 * has both floors inside the building and distinct, and a direction that matches them.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id: u64,
    origin_floor: u8,
    direction: Direction,
    destination_floor: u8,
    created_at: Instant,
}

impl Request {
    pub fn new(origin_floor: u8, destination_floor: u8, n_floors: u8) -> Result<Request, RequestError> {
        for floor in [origin_floor, destination_floor] {
            if floor < 1 || floor > n_floors {
                return Err(RequestError::FloorOutOfRange { floor, n_floors });
            }
        }
        if origin_floor == destination_floor {
            return Err(RequestError::SameFloor {
                floor: origin_floor,
            });
        }

        Ok(Request {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed) + 1,
            origin_floor,
            direction: Direction::between(origin_floor, destination_floor),
            destination_floor,
            created_at: Instant::now(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn origin_floor(&self) -> u8 {
        self.origin_floor
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn destination_floor(&self) -> u8 {
        self.destination_floor
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}: {}->{} {}",
            self.id, self.origin_floor, self.destination_floor, self.direction
        )
    }
}

/***************************************/
/*             Snapshots               */
/***************************************/

/// Consistent view of one elevator unit, taken under its lock.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ElevatorSnapshot {
    pub id: usize,
    pub floor: u8,
    pub direction: Direction,
    pub status: MotionStatus,
    pub passenger_count: u32,
    pub capacity: u32,
    pub pending_stop_count: usize,
    pub idle: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DispatcherSnapshot {
    pub total_assigned: u64,
    pub failed: u64,
    pub queue_depth: usize,
    pub assignments_per_unit: Vec<u64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SystemStatus {
    pub units: Vec<ElevatorSnapshot>,
    pub dispatcher: DispatcherSnapshot,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UnitStatistics {
    pub id: usize,
    pub assignment_count: u64,
    pub movement_time_ms: u64,
    pub door_time_ms: u64,
    pub total_served: u64,
}

impl UnitStatistics {
    pub fn busy_time_ms(&self) -> u64 {
        self.movement_time_ms + self.door_time_ms
    }

    /// Assignments per minute of busy time.
    pub fn efficiency(&self) -> f64 {
        let busy_ms = self.busy_time_ms();
        if busy_ms == 0 {
            return 0.0;
        }
        self.assignment_count as f64 / (busy_ms as f64 / 1000.0) * 60.0
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadVerdict {
    /// At least one unit never received an assignment.
    Unassigned,
    Strong,
    Moderate,
    Good,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LoadBalance {
    pub total: u64,
    pub max: u64,
    pub min: u64,
    pub average: f64,
    pub imbalance: u64,
    pub imbalance_percent: f64,
    pub verdict: LoadVerdict,
}

impl LoadBalance {
    pub fn from_counts(counts: &[u64]) -> LoadBalance {
        let total: u64 = counts.iter().sum();
        let max = counts.iter().copied().max().unwrap_or(0);
        let min = counts.iter().copied().min().unwrap_or(0);
        let average = if counts.is_empty() {
            0.0
        } else {
            total as f64 / counts.len() as f64
        };
        let imbalance = max - min;
        let imbalance_percent = if average > 0.0 {
            imbalance as f64 / average * 100.0
        } else {
            0.0
        };

        let verdict = if total > 0 && min == 0 {
            LoadVerdict::Unassigned
        } else if imbalance_percent > 50.0 {
            LoadVerdict::Strong
        } else if imbalance_percent > 20.0 {
            LoadVerdict::Moderate
        } else {
            LoadVerdict::Good
        };

        LoadBalance {
            total,
            max,
            min,
            average,
            imbalance,
            imbalance_percent,
            verdict,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Statistics {
    pub units: Vec<UnitStatistics>,
    pub load: LoadBalance,
}
