/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::sleep;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::ElevatorConfig;
use crate::shared::{Direction, ElevatorSnapshot, MotionStatus, Worker};

/***************************************/
/*               Events                */
/***************************************/

/// Observable milestones of a unit's control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitEvent {
    Arrived { id: usize, floor: u8 },
    DoorsOpened { id: usize, floor: u8 },
    Exited { id: usize, floor: u8, count: u32 },
    Boarded { id: usize, floor: u8, count: u32 },
    DoorsClosed { id: usize, floor: u8 },
    Idle { id: usize, floor: u8 },
    Discharged { id: usize, floor: u8, count: u32 },
}

/***************************************/
/*            Unit state               */
/***************************************/

/**
 * Mutable part of an elevator unit, always accessed under the unit's lock.
 *
 * Invariants kept by the methods below:
 * - `passenger_count <= capacity`
 * - every key of `drop_offs` and `pickup_directions` is also in `pending_stops`
 */
#[derive(Debug, Clone)]
pub(crate) struct UnitState {
    pub(crate) current_floor: u8,
    pub(crate) direction: Direction,
    pub(crate) status: MotionStatus,
    pub(crate) passenger_count: u32,
    pub(crate) pending_stops: BTreeSet<u8>,
    pub(crate) drop_offs: BTreeMap<u8, u32>,
    pub(crate) pickup_directions: BTreeMap<u8, Direction>,
    pub(crate) movement_time: Duration,
    pub(crate) door_time: Duration,
    pub(crate) total_served: u64,
}

/// What happened at one stop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Exchange {
    pub(crate) exited: u32,
    pub(crate) boarded: u32,
    /// Drop-offs that could not be honoured because too few passengers were aboard.
    pub(crate) discarded: u32,
}

impl UnitState {
    pub(crate) fn new(start_floor: u8) -> UnitState {
        UnitState {
            current_floor: start_floor,
            direction: Direction::Idle,
            status: MotionStatus::Stopped,
            passenger_count: 0,
            pending_stops: BTreeSet::new(),
            drop_offs: BTreeMap::new(),
            pickup_directions: BTreeMap::new(),
            movement_time: Duration::ZERO,
            door_time: Duration::ZERO,
            total_served: 0,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.direction == Direction::Idle
            && self.pending_stops.is_empty()
            && self.passenger_count == 0
            && self.drop_offs.is_empty()
    }

    pub(crate) fn should_stop_here(&self) -> bool {
        self.pending_stops.contains(&self.current_floor)
    }

    pub(crate) fn add_stop(&mut self, call_floor: u8, call_direction: Direction, destination_floor: u8) {
        self.pending_stops.insert(call_floor);
        self.pending_stops.insert(destination_floor);
        *self.drop_offs.entry(destination_floor).or_insert(0) += 1;
        self.pickup_directions.insert(call_floor, call_direction);
        // The destination marker replaces any call already waiting on that floor
        self.pickup_directions
            .insert(destination_floor, Direction::Idle);
    }

    /// Scan policy: keep going in the current direction to the nearest pending floor,
    /// otherwise turn around to the farthest one. An idle unit takes the nearest floor
    /// and adopts the direction towards it.
    pub(crate) fn next_target(&mut self) -> Option<u8> {
        let current = self.current_floor;
        match self.direction {
            Direction::Up => self
                .pending_stops
                .range(current..)
                .next()
                .or_else(|| self.pending_stops.iter().next())
                .copied(),
            Direction::Down => self
                .pending_stops
                .range(..=current)
                .next_back()
                .or_else(|| self.pending_stops.iter().next_back())
                .copied(),
            Direction::Idle => {
                let closest = self
                    .pending_stops
                    .iter()
                    .copied()
                    .min_by_key(|floor| (*floor as i16 - current as i16).abs())?;
                self.direction = Direction::between(current, closest);
                Some(closest)
            }
        }
    }

    /// Lets passengers out, then at most one in, and retires the current floor.
    pub(crate) fn exchange_passengers(&mut self, capacity: u32) -> Exchange {
        let floor = self.current_floor;
        let mut exchange = Exchange::default();

        if let Some(count) = self.drop_offs.remove(&floor) {
            if self.passenger_count >= count {
                self.passenger_count -= count;
                self.total_served += count as u64;
                exchange.exited = count;
            } else {
                exchange.discarded = count;
            }
        }

        if let Some(call_direction) = self.pickup_directions.remove(&floor) {
            let heading_matches =
                self.direction == Direction::Idle || self.direction == call_direction;
            if call_direction != Direction::Idle
                && heading_matches
                && self.passenger_count < capacity
            {
                self.passenger_count += 1;
                exchange.boarded = 1;
            }
        }

        self.pending_stops.remove(&floor);
        exchange
    }
}

/***************************************/
/*           Elevator unit             */
/***************************************/

/**
 * One elevator car and the control loop that drives it.
 *
 * The unit is shared as `Arc<ElevatorUnit>` between its own control thread and the
 * dispatcher. All mutable state sits behind one unit-scoped mutex, so readers never
 * see a half-applied stop. The lock is released while the thread sleeps to simulate
 * travel and door time, which keeps the dispatcher's scoring from blocking on a
 * moving car.
 *
 * # Fields
 * - `timing`:      Movement and door timings.
 * - `state`:       Floor, direction, passengers and pending stops.
 * - `running`:     Cleared by `request_stop`; the loop then drains its stops and exits.
 * - `aborted`:     Set by `force_stop`; the loop exits at the next checkpoint.
 * - `wake_tx`:     Signals an idle loop that new work or a stop request arrived.
 * - `event_tx`:    Optional observer of `UnitEvent`s.
 */
pub struct ElevatorUnit {
    id: usize,
    n_floors: u8,
    capacity: u32,
    timing: ElevatorConfig,
    state: Mutex<UnitState>,
    running: AtomicBool,
    aborted: AtomicBool,
    wake_tx: cbc::Sender<()>,
    wake_rx: cbc::Receiver<()>,
    event_tx: Option<cbc::Sender<UnitEvent>>,
    worker: Mutex<Option<Worker>>,
}

impl ElevatorUnit {
    pub fn new(
        id: usize,
        n_floors: u8,
        capacity: u32,
        start_floor: u8,
        timing: &ElevatorConfig,
    ) -> ElevatorUnit {
        let (wake_tx, wake_rx) = cbc::bounded::<()>(1);
        ElevatorUnit {
            id,
            n_floors,
            capacity,
            timing: timing.clone(),
            state: Mutex::new(UnitState::new(start_floor)),
            running: AtomicBool::new(true),
            aborted: AtomicBool::new(false),
            wake_tx,
            wake_rx,
            event_tx: None,
            worker: Mutex::new(None),
        }
    }

    pub fn with_event_sender(mut self, event_tx: cbc::Sender<UnitEvent>) -> ElevatorUnit {
        self.event_tx = Some(event_tx);
        self
    }

    fn state(&self) -> MutexGuard<'_, UnitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /***************************************/
    /*             Accessors               */
    /***************************************/
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn current_floor(&self) -> u8 {
        self.state().current_floor
    }

    pub fn direction(&self) -> Direction {
        self.state().direction
    }

    pub fn status(&self) -> MotionStatus {
        self.state().status
    }

    pub fn passenger_count(&self) -> u32 {
        self.state().passenger_count
    }

    pub fn is_idle(&self) -> bool {
        self.state().is_idle()
    }

    pub fn pending_stop_count(&self) -> usize {
        self.state().pending_stops.len()
    }

    pub fn total_served(&self) -> u64 {
        self.state().total_served
    }

    pub fn movement_time(&self) -> Duration {
        self.state().movement_time
    }

    pub fn door_time(&self) -> Duration {
        self.state().door_time
    }

    pub fn snapshot(&self) -> ElevatorSnapshot {
        let state = self.state();
        ElevatorSnapshot {
            id: self.id,
            floor: state.current_floor,
            direction: state.direction,
            status: state.status,
            passenger_count: state.passenger_count,
            capacity: self.capacity,
            pending_stop_count: state.pending_stops.len(),
            idle: state.is_idle(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut UnitState) -> R) -> R {
        f(&mut self.state())
    }

    /***************************************/
    /*             Public API              */
    /***************************************/

    /// Adds a pickup at `call_floor` and a drop-off at `destination_floor`.
    /// Floors outside the building are ignored.
    pub fn accept_stop(&self, call_floor: u8, call_direction: Direction, destination_floor: u8) {
        let in_range = |floor: u8| floor >= 1 && floor <= self.n_floors;
        if !in_range(call_floor) || !in_range(destination_floor) {
            debug!(
                "Elevator {} | Request | ignored {}->{} outside 1..={}",
                self.id, call_floor, destination_floor, self.n_floors
            );
            return;
        }

        self.state()
            .add_stop(call_floor, call_direction, destination_floor);
        info!(
            "Elevator {} | Request | Pickup from {} ({}) -> deliver to {}",
            self.id, call_floor, call_direction, destination_floor
        );
        let _ = self.wake_tx.try_send(());
    }

    pub fn start(self: &Arc<Self>) -> io::Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            warn!("Elevator {} | Start | already running", self.id);
            return Ok(());
        }

        let unit = Arc::clone(self);
        *worker = Some(Worker::spawn(format!("elevator-{}", self.id), move || {
            unit.run()
        })?);
        Ok(())
    }

    /// Stops accepting idleness as "done": the loop finishes every pending stop,
    /// lets every passenger out, and then exits.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.wake_tx.try_send(());
    }

    /// Makes the loop exit at its next checkpoint, abandoning remaining work.
    pub fn force_stop(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.request_stop();
    }

    /// Returns true once the control thread has exited, or if it was never started.
    pub fn await_stopped(&self, timeout: Duration) -> bool {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        match worker.as_mut() {
            Some(worker) => worker.await_stopped(timeout),
            None => true,
        }
    }

    /***************************************/
    /*            Control loop             */
    /***************************************/
    fn run(&self) {
        info!("Elevator {} | Started | Floor {}", self.id, self.current_floor());
        let mut reported_idle = false;

        loop {
            if self.aborted.load(Ordering::SeqCst) {
                warn!(
                    "Elevator {} | Forced stop | {} stops and {} passengers abandoned",
                    self.id,
                    self.pending_stop_count(),
                    self.passenger_count()
                );
                break;
            }
            if !self.has_work() {
                break;
            }

            let stop_here = self.state().should_stop_here();
            if stop_here {
                self.stop_sequence();
            }

            let target = self.state().next_target();
            match target {
                Some(target) => {
                    reported_idle = false;
                    self.advance_toward(target);
                }
                None => {
                    let (floor, stranded) = {
                        let mut state = self.state();
                        state.direction = Direction::Idle;
                        state.status = MotionStatus::Stopped;
                        (state.current_floor, state.passenger_count)
                    };

                    if stranded > 0 {
                        self.discharge_stranded();
                        continue;
                    }
                    if !reported_idle {
                        reported_idle = true;
                        self.emit(UnitEvent::Idle { id: self.id, floor });
                    }
                    if self.running.load(Ordering::SeqCst) {
                        let _ = self.wake_rx.recv_timeout(self.timing.idle_poll());
                    }
                }
            }
        }

        self.finalize();
    }

    fn has_work(&self) -> bool {
        if self.running.load(Ordering::SeqCst) {
            return true;
        }
        let state = self.state();
        !state.pending_stops.is_empty() || state.passenger_count > 0
    }

    fn stop_sequence(&self) {
        let started = Instant::now();
        let floor = {
            let mut state = self.state();
            state.status = MotionStatus::DoorsOpening;
            state.current_floor
        };
        info!("Elevator {} | Arrived | Floor {}", self.id, floor);
        sleep(self.timing.door_half_cycle());

        let (exchange, aboard) = {
            let mut state = self.state();
            state.status = MotionStatus::DoorsOpen;
            let exchange = state.exchange_passengers(self.capacity);
            (exchange, state.passenger_count)
        };
        info!("Elevator {} | Doors | Open", self.id);
        self.emit(UnitEvent::DoorsOpened { id: self.id, floor });

        if exchange.exited > 0 {
            info!("Elevator {} | Exit | {} passengers exited", self.id, exchange.exited);
            self.emit(UnitEvent::Exited {
                id: self.id,
                floor,
                count: exchange.exited,
            });
        }
        if exchange.discarded > 0 {
            warn!(
                "Elevator {} | Exit | {} drop-offs at floor {} but only {} aboard",
                self.id, exchange.discarded, floor, aboard
            );
        }
        if exchange.boarded > 0 {
            info!("Elevator {} | Enter | {} passengers entered", self.id, exchange.boarded);
            self.emit(UnitEvent::Boarded {
                id: self.id,
                floor,
                count: exchange.boarded,
            });
        }

        if aboard > 0 {
            sleep(self.timing.passenger_hold());
            info!("Elevator {} | Passengers | Total: {}", self.id, aboard);
        }

        self.state().status = MotionStatus::DoorsClosing;
        sleep(self.timing.door_half_cycle());

        {
            let mut state = self.state();
            state.status = MotionStatus::Stopped;
            state.door_time += started.elapsed();
        }
        info!("Elevator {} | Doors | Closed", self.id);
        self.emit(UnitEvent::DoorsClosed { id: self.id, floor });
    }

    /// Moves exactly one floor towards `target`.
    fn advance_toward(&self, target: u8) {
        let direction = {
            let mut state = self.state();
            let direction = Direction::between(state.current_floor, target);
            if direction == Direction::Idle {
                return;
            }
            state.direction = direction;
            state.status = MotionStatus::Moving;
            direction
        };

        let started = Instant::now();
        sleep(self.timing.movement_time());

        let (from, to) = {
            let mut state = self.state();
            let from = state.current_floor;
            state.current_floor = match direction {
                Direction::Up => from + 1,
                _ => from - 1,
            };
            state.movement_time += started.elapsed();
            (from, state.current_floor)
        };
        debug!(
            "Elevator {} | Moving | Floor {} -> {} {}",
            self.id, from, to, direction
        );
        self.emit(UnitEvent::Arrived { id: self.id, floor: to });
    }

    /// Lets out passengers whose drop-off no longer exists.
    fn discharge_stranded(&self) {
        let (floor, count) = {
            let mut state = self.state();
            let count = state.passenger_count;
            state.passenger_count = 0;
            state.total_served += count as u64;
            state.drop_offs.clear();
            (state.current_floor, count)
        };
        warn!(
            "Elevator {} | Final exit | {} passengers exited at floor {}",
            self.id, count, floor
        );
        self.emit(UnitEvent::Discharged {
            id: self.id,
            floor,
            count,
        });
    }

    fn finalize(&self) {
        let (floor, served, busy) = {
            let mut state = self.state();
            state.status = MotionStatus::Stopped;
            state.direction = Direction::Idle;
            (
                state.current_floor,
                state.total_served,
                state.movement_time + state.door_time,
            )
        };
        info!("Elevator {} | Stopped | Floor {}", self.id, floor);
        info!(
            "Elevator {} | Statistics | Served: {}, busy time: {:.1}s",
            self.id,
            served,
            busy.as_secs_f64()
        );
    }

    fn emit(&self, event: UnitEvent) {
        if let Some(event_tx) = &self.event_tx {
            let _ = event_tx.send(event);
        }
    }
}
