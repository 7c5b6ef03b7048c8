/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Serialize;
use std::fmt;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{LoadVerdict, Statistics, SystemStatus};

const WIDTH: usize = 80;

fn banner(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(WIDTH))?;
    writeln!(f, "{:^width$}", title, width = WIDTH)?;
    writeln!(f, "{}", "=".repeat(WIDTH))
}

/// Fixed-width table of every unit plus the dispatcher counters.
pub struct StatusTable<'a>(pub &'a SystemStatus);

impl fmt::Display for StatusTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.0;
        banner(f, "CURRENT ELEVATOR STATUS")?;
        writeln!(
            f,
            "{:<10} {:<8} {:<10} {:<15} {:<12} {:<16}",
            "Elevator", "Floor", "Direction", "Status", "Passengers", "Targets in queue"
        )?;
        writeln!(f, "{}", "-".repeat(WIDTH))?;
        for unit in &status.units {
            writeln!(
                f,
                "{:<10} {:<8} {:<10} {:<15} {:<12} {:<16}",
                unit.id,
                unit.floor,
                unit.direction,
                unit.status,
                format!("{}/{}", unit.passenger_count, unit.capacity),
                unit.pending_stop_count
            )?;
        }
        writeln!(f, "{}", "=".repeat(WIDTH))?;

        let dispatcher = &status.dispatcher;
        writeln!(
            f,
            "Dispatcher: processed {} requests, failed {}, in queue: {}",
            dispatcher.total_assigned, dispatcher.failed, dispatcher.queue_depth
        )?;
        let distribution: Vec<String> = status
            .units
            .iter()
            .zip(&dispatcher.assignments_per_unit)
            .map(|(unit, count)| format!("E{}:{}", unit.id, count))
            .collect();
        write!(f, "Load distribution: {}", distribution.join(" "))
    }
}

/// Per-unit work figures followed by the load balancing analysis.
pub struct StatisticsTable<'a>(pub &'a Statistics);

impl fmt::Display for StatisticsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let statistics = self.0;
        banner(f, "WORK STATISTICS")?;
        writeln!(
            f,
            "{:<10} {:<10} {:<14} {:<11} {:<12} {:<11} {:<8}",
            "Elevator", "Requests", "Movement (s)", "Door (s)", "Total (s)", "Req/min", "Served"
        )?;
        writeln!(f, "{}", "-".repeat(WIDTH))?;
        for unit in &statistics.units {
            writeln!(
                f,
                "{:<10} {:<10} {:<14.1} {:<11.1} {:<12.1} {:<11.1} {:<8}",
                unit.id,
                unit.assignment_count,
                unit.movement_time_ms as f64 / 1000.0,
                unit.door_time_ms as f64 / 1000.0,
                unit.busy_time_ms() as f64 / 1000.0,
                unit.efficiency(),
                unit.total_served
            )?;
        }

        let load = &statistics.load;
        banner(f, "LOAD BALANCING ANALYSIS")?;
        writeln!(f, "Total requests: {}", load.total)?;
        writeln!(f, "Average per elevator: {:.1}", load.average)?;
        writeln!(f, "Maximum: {} requests", load.max)?;
        writeln!(f, "Minimum: {} requests", load.min)?;
        writeln!(
            f,
            "Imbalance: {} requests ({:.1}%)",
            load.imbalance, load.imbalance_percent
        )?;
        let verdict = match load.verdict {
            LoadVerdict::Unassigned => "PROBLEM: an elevator did not receive any requests",
            LoadVerdict::Strong => "WARNING: strong load imbalance between elevators",
            LoadVerdict::Moderate => "WARNING: moderate load imbalance",
            LoadVerdict::Good => "Good load balancing",
        };
        writeln!(f, "{}", verdict)?;
        write!(f, "{}", "=".repeat(WIDTH))
    }
}

pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
