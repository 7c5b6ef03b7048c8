/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::sleep;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::{Config, DispatcherConfig};
use crate::dispatcher::scoring;
use crate::elevator::ElevatorUnit;
use crate::shared::{
    AssignmentError, DispatcherSnapshot, LoadBalance, Request, Statistics, SystemStatus,
    UnitStatistics, Worker,
};

/// Assignment counters. Only the dispatcher thread writes them; the lock is there
/// so status readers see `total_assigned` and `per_unit` change together.
#[derive(Debug, Clone, Default)]
pub(crate) struct AssignmentLedger {
    pub(crate) per_unit: Vec<u64>,
    pub(crate) total_assigned: u64,
    pub(crate) failed: u64,
}

/**
 * Owns the elevator units and assigns incoming requests to them.
 *
 * Requests arrive through an unbounded crossbeam channel (`submit` never blocks).
 * The dispatcher thread takes them in FIFO order, scores every unit against the
 * request and hands the winner a new stop.
 *
 * # Fields
 * - `units`:           Fixed set of units, index `i` holds the unit with id `i + 1`.
 * - `inbound_tx/rx`:   Request queue.
 * - `terminate_tx/rx`: Wakes the loop when a stop is requested.
 * - `ledger`:          Assignment counters.
 * - `running`:         Cleared by `request_stop`; new submissions are refused after that.
 */
pub struct Dispatcher {
    units: Vec<Arc<ElevatorUnit>>,
    config: DispatcherConfig,
    inbound_tx: cbc::Sender<Request>,
    inbound_rx: cbc::Receiver<Request>,
    terminate_tx: cbc::Sender<()>,
    terminate_rx: cbc::Receiver<()>,
    ledger: Mutex<AssignmentLedger>,
    running: AtomicBool,
    worker: Mutex<Option<Worker>>,
}

impl Dispatcher {
    pub fn new(units: Vec<Arc<ElevatorUnit>>, config: &DispatcherConfig) -> Dispatcher {
        let (inbound_tx, inbound_rx) = cbc::unbounded::<Request>();
        let (terminate_tx, terminate_rx) = cbc::bounded::<()>(1);
        let ledger = AssignmentLedger {
            per_unit: vec![0; units.len()],
            ..AssignmentLedger::default()
        };

        Dispatcher {
            units,
            config: config.clone(),
            inbound_tx,
            inbound_rx,
            terminate_tx,
            terminate_rx,
            ledger: Mutex::new(ledger),
            running: AtomicBool::new(true),
            worker: Mutex::new(None),
        }
    }

    /// Builds `n_elevators` units, numbered from 1, all parked at the start floor.
    pub fn from_config(config: &Config) -> Dispatcher {
        let sim = &config.simulation;
        let units = (1..=sim.n_elevators)
            .map(|id| {
                Arc::new(ElevatorUnit::new(
                    id,
                    sim.n_floors,
                    sim.capacity,
                    sim.start_floor,
                    &config.elevator,
                ))
            })
            .collect();
        Dispatcher::new(units, &config.dispatcher)
    }

    fn ledger(&self) -> MutexGuard<'_, AssignmentLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn with_ledger<R>(&self, f: impl FnOnce(&mut AssignmentLedger) -> R) -> R {
        f(&mut self.ledger())
    }

    pub fn units(&self) -> &[Arc<ElevatorUnit>] {
        &self.units
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /***************************************/
    /*             Public API              */
    /***************************************/

    /// Queues a request. Once a stop has been requested new work is refused and
    /// `false` is returned.
    pub fn submit(&self, request: Request) -> bool {
        if !self.is_running() {
            warn!("Dispatcher | Dropped | {} (system stopping)", request);
            return false;
        }
        self.inbound_tx.send(request).is_ok()
    }

    /// Scores every unit and gives the request to the best one.
    /// Returns the id of the chosen unit.
    pub fn assign(&self, request: &Request) -> Result<usize, AssignmentError> {
        let loads = self.ledger().per_unit.clone();
        let scores = self
            .units
            .iter()
            .zip(loads)
            .enumerate()
            .map(|(index, (unit, load))| (index, scoring::score(&unit.snapshot(), load, request)));

        let Some((index, score)) = scoring::select_unit(scores) else {
            self.ledger().failed += 1;
            return Err(AssignmentError::NoEligibleUnit {
                request_id: request.id(),
            });
        };

        let unit = &self.units[index];
        {
            let mut ledger = self.ledger();
            ledger.per_unit[index] += 1;
            ledger.total_assigned += 1;
        }
        info!(
            "Dispatcher | Assignment | Request {} -> Elevator {} (score {}, waited {} ms)",
            request,
            unit.id(),
            score,
            request.created_at().elapsed().as_millis()
        );
        unit.accept_stop(
            request.origin_floor(),
            request.direction(),
            request.destination_floor(),
        );
        Ok(unit.id())
    }

    /// Starts every unit, then the dispatcher thread.
    pub fn start(self: &Arc<Self>) -> io::Result<()> {
        for unit in &self.units {
            unit.start()?;
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            warn!("Dispatcher | Start | already running");
            return Ok(());
        }
        let dispatcher = Arc::clone(self);
        *worker = Some(Worker::spawn("dispatcher".into(), move || dispatcher.run())?);
        Ok(())
    }

    /// Refuses new submissions. Already queued requests are still assigned, then
    /// every unit is told to finish its work and stop.
    pub fn request_stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Dispatcher | Stop | command received");
        let _ = self.terminate_tx.try_send(());
    }

    pub fn await_stopped(&self, timeout: Duration) -> bool {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        match worker.as_mut() {
            Some(worker) => worker.await_stopped(timeout),
            None => true,
        }
    }

    pub fn status(&self) -> SystemStatus {
        let units = self.units.iter().map(|unit| unit.snapshot()).collect();
        let ledger = self.ledger();
        SystemStatus {
            units,
            dispatcher: DispatcherSnapshot {
                total_assigned: ledger.total_assigned,
                failed: ledger.failed,
                queue_depth: self.inbound_rx.len(),
                assignments_per_unit: ledger.per_unit.clone(),
            },
        }
    }

    pub fn statistics(&self) -> Statistics {
        let per_unit = self.ledger().per_unit.clone();
        let units = self
            .units
            .iter()
            .zip(&per_unit)
            .map(|(unit, &assignment_count)| UnitStatistics {
                id: unit.id(),
                assignment_count,
                movement_time_ms: unit.movement_time().as_millis() as u64,
                door_time_ms: unit.door_time().as_millis() as u64,
                total_served: unit.total_served(),
            })
            .collect();

        Statistics {
            units,
            load: LoadBalance::from_counts(&per_unit),
        }
    }

    /***************************************/
    /*            Control loop             */
    /***************************************/
    fn run(&self) {
        info!("Dispatcher | Started | Elevators: {}", self.units.len());

        loop {
            cbc::select! {
                recv(self.inbound_rx) -> request => {
                    if let Ok(request) = request {
                        self.dispatch(request);
                    }
                }
                recv(self.terminate_rx) -> _ => break,
                default(self.config.poll_timeout()) => {
                    if !self.is_running() {
                        break;
                    }
                }
            }
        }

        self.drain();
        for unit in &self.units {
            unit.request_stop();
        }
        info!(
            "Dispatcher | Stopped | Requests assigned: {}",
            self.ledger().total_assigned
        );
    }

    fn drain(&self) {
        while let Ok(request) = self.inbound_rx.try_recv() {
            self.dispatch(request);
        }
    }

    fn dispatch(&self, request: Request) {
        info!("Dispatcher | Request received | {}", request);
        let delay = self.config.assignment_delay();
        if !delay.is_zero() {
            sleep(delay);
        }

        match self.assign(&request) {
            Ok(_) => debug!("Dispatcher | Load distribution | {}", self.load_distribution()),
            Err(e) => warn!("Dispatcher | Error | {}", e),
        }
    }

    fn load_distribution(&self) -> String {
        self.units
            .iter()
            .zip(&self.ledger().per_unit)
            .map(|(unit, count)| format!("E{}:{}", unit.id(), count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
