/*
 * Unit tests for elevator module
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * Threaded tests run the control loop with millisecond timings and observe it
 * through the unit's event channel.
 *
 * Tests:
 *  - test_accept_stop_*
 *  - test_next_target_*
 *  - test_exchange_*
 *  - test_single_trip_visits_every_floor
 *  - test_stop_request_drains_passengers
 *  - test_force_stop_abandons_work
 *  - test_stranded_passengers_are_discharged
 *  - test_capacity_never_exceeded
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod unit_tests {
    use crate::config::ElevatorConfig;
    use crate::elevator::unit::{Exchange, UnitState};
    use crate::elevator::{ElevatorUnit, UnitEvent};
    use crate::shared::Direction::{Down, Idle, Up};
    use crate::shared::MotionStatus;
    use crossbeam_channel::{unbounded, Receiver};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    fn fast_timing() -> ElevatorConfig {
        ElevatorConfig {
            movement_time_ms: 5,
            door_operation_time_ms: 4,
            passenger_hold_ms: 2,
            idle_poll_ms: 5,
        }
    }

    fn setup_unit(capacity: u32) -> (Arc<ElevatorUnit>, Receiver<UnitEvent>) {
        let (event_tx, event_rx) = unbounded::<UnitEvent>();
        let unit = ElevatorUnit::new(1, 10, capacity, 1, &fast_timing()).with_event_sender(event_tx);
        (Arc::new(unit), event_rx)
    }

    fn state_at(floor: u8, direction: crate::shared::Direction, pending: &[u8]) -> UnitState {
        let mut state = UnitState::new(floor);
        state.direction = direction;
        state.pending_stops = pending.iter().copied().collect();
        state
    }

    /// Collects events until `done` matches one, or panics after two seconds.
    fn collect_until(event_rx: &Receiver<UnitEvent>, done: impl Fn(&UnitEvent) -> bool) -> Vec<UnitEvent> {
        let mut events = Vec::new();
        loop {
            match event_rx.recv_timeout(Duration::from_secs(2)) {
                Ok(event) => {
                    let finished = done(&event);
                    events.push(event);
                    if finished {
                        return events;
                    }
                }
                Err(e) => panic!("Timed out waiting for unit events: {:?}, got {:?}", e, events),
            }
        }
    }

    #[test]
    fn test_accept_stop_records_pickup_and_drop_off() {
        // Arrange
        let (unit, _event_rx) = setup_unit(10);

        // Act
        unit.accept_stop(3, Up, 7);

        // Assert
        unit.with_state(|state| {
            assert_eq!(state.pending_stops, BTreeSet::from([3, 7]));
            assert_eq!(state.drop_offs, BTreeMap::from([(7, 1)]));
            assert_eq!(state.pickup_directions, BTreeMap::from([(3, Up), (7, Idle)]));
        });
        assert_eq!(unit.pending_stop_count(), 2);
        assert!(!unit.is_idle());
    }

    #[test]
    fn test_accept_stop_ignores_out_of_range_floors() {
        let (unit, _event_rx) = setup_unit(10);

        unit.accept_stop(0, Up, 5);
        unit.accept_stop(3, Up, 11);

        assert_eq!(unit.pending_stop_count(), 0);
        assert!(unit.is_idle());
    }

    #[test]
    fn test_accept_stop_destination_replaces_waiting_call() {
        let (unit, _event_rx) = setup_unit(10);

        unit.accept_stop(5, Down, 2);
        unit.accept_stop(3, Up, 5);

        unit.with_state(|state| {
            assert_eq!(state.pickup_directions.get(&5), Some(&Idle));
            assert_eq!(state.drop_offs.get(&5), Some(&1));
        });
    }

    #[test]
    fn test_exchange_skips_call_replaced_by_destination() {
        // Arrange: a down call at 5, then a rider from 3 heading to 5
        let mut state = state_at(5, Idle, &[]);
        state.add_stop(5, Down, 2);
        state.add_stop(3, Up, 5);

        // Act
        let exchange = state.exchange_passengers(10);

        // Assert: the marker overwrote the call, so nobody boards at 5
        assert_eq!(exchange.boarded, 0);
        assert_eq!(state.passenger_count, 0);
        assert!(!state.pickup_directions.contains_key(&5));
    }

    #[test]
    fn test_next_target_up_prefers_floors_ahead() {
        let mut ahead = state_at(5, Up, &[2, 7, 9]);
        let mut here = state_at(5, Up, &[5, 8]);
        let mut behind = state_at(5, Up, &[2, 3]);

        assert_eq!(ahead.next_target(), Some(7));
        assert_eq!(here.next_target(), Some(5));
        // Nothing above: fall back to the lowest pending floor
        assert_eq!(behind.next_target(), Some(2));
        assert_eq!(behind.direction, Up);
    }

    #[test]
    fn test_next_target_down_prefers_floors_below() {
        let mut below = state_at(5, Down, &[2, 4, 9]);
        let mut above = state_at(5, Down, &[7, 9]);

        assert_eq!(below.next_target(), Some(4));
        // Nothing below: fall back to the highest pending floor
        assert_eq!(above.next_target(), Some(9));
    }

    #[test]
    fn test_next_target_idle_takes_nearest_and_adopts_direction() {
        let mut up = state_at(5, Idle, &[1, 8]);
        let mut tie = state_at(5, Idle, &[3, 7]);
        let mut empty = state_at(5, Idle, &[]);

        assert_eq!(up.next_target(), Some(8));
        assert_eq!(up.direction, Up);
        assert_eq!(tie.next_target(), Some(3));
        assert_eq!(tie.direction, Down);
        assert_eq!(empty.next_target(), None);
        assert_eq!(empty.direction, Idle);
    }

    #[test]
    fn test_exchange_drops_off_and_boards_one() {
        // Arrange: two passengers leave at 4, then two calls from 4 going up
        let mut state = state_at(4, Up, &[]);
        state.passenger_count = 2;
        state.add_stop(1, Up, 4);
        state.add_stop(2, Up, 4);
        state.add_stop(4, Up, 8);
        state.add_stop(4, Up, 9);

        // Act
        let exchange = state.exchange_passengers(10);

        // Assert: boarding is capped at one per stop
        assert_eq!(
            exchange,
            Exchange {
                exited: 2,
                boarded: 1,
                discarded: 0
            }
        );
        assert_eq!(state.passenger_count, 1);
        assert_eq!(state.total_served, 2);
        assert!(!state.pending_stops.contains(&4));
        assert!(!state.drop_offs.contains_key(&4));
        assert!(!state.pickup_directions.contains_key(&4));
    }

    #[test]
    fn test_exchange_full_unit_does_not_board() {
        let mut state = state_at(3, Idle, &[]);
        state.passenger_count = 4;
        state.add_stop(3, Down, 1);

        let exchange = state.exchange_passengers(4);

        assert_eq!(exchange.boarded, 0);
        assert_eq!(state.passenger_count, 4);
        assert!(!state.pending_stops.contains(&3));
    }

    #[test]
    fn test_exchange_opposite_heading_does_not_board() {
        let mut state = state_at(6, Down, &[]);
        state.add_stop(6, Up, 9);

        let exchange = state.exchange_passengers(10);

        assert_eq!(exchange.boarded, 0);
        assert_eq!(state.passenger_count, 0);
        assert!(!state.pickup_directions.contains_key(&6));
    }

    #[test]
    fn test_exchange_destination_marker_never_boards() {
        let mut state = state_at(7, Idle, &[]);
        state.passenger_count = 1;
        state.add_stop(2, Up, 7);

        let exchange = state.exchange_passengers(10);

        assert_eq!(exchange.exited, 1);
        assert_eq!(exchange.boarded, 0);
    }

    #[test]
    fn test_exchange_uncovered_drop_off_is_discarded() {
        let mut state = state_at(4, Up, &[]);
        state.passenger_count = 1;
        state.add_stop(1, Up, 4);
        state.add_stop(2, Up, 4);

        let exchange = state.exchange_passengers(10);

        assert_eq!(exchange.discarded, 2);
        assert_eq!(exchange.exited, 0);
        assert_eq!(state.passenger_count, 1);
        assert!(state.drop_offs.get(&4).is_none());
    }

    #[test]
    fn test_stop_maps_stay_within_pending_stops() {
        let mut state = UnitState::new(1);
        state.add_stop(2, Up, 6);
        state.add_stop(6, Down, 3);
        state.add_stop(4, Up, 9);

        for floor in [2, 3, 6] {
            state.current_floor = floor;
            state.exchange_passengers(10);

            for key in state.drop_offs.keys().chain(state.pickup_directions.keys()) {
                assert!(state.pending_stops.contains(key), "floor {} not pending", key);
            }
        }
    }

    #[test]
    fn test_snapshot_matches_accessors() {
        let (unit, _event_rx) = setup_unit(10);
        unit.accept_stop(2, Up, 4);

        let snapshot = unit.snapshot();

        assert_eq!(snapshot.id, unit.id());
        assert_eq!(snapshot.floor, unit.current_floor());
        assert_eq!(snapshot.direction, unit.direction());
        assert_eq!(snapshot.status, unit.status());
        assert_eq!(snapshot.passenger_count, unit.passenger_count());
        assert_eq!(snapshot.pending_stop_count, unit.pending_stop_count());
        assert_eq!(snapshot.idle, unit.is_idle());
        assert_eq!(snapshot.status, MotionStatus::Stopped);
    }

    #[test]
    fn test_single_trip_visits_every_floor() {
        // Arrange
        let (unit, event_rx) = setup_unit(10);
        unit.start().unwrap();

        // Act
        unit.accept_stop(1, Up, 5);
        let events = collect_until(&event_rx, |event| matches!(event, UnitEvent::Exited { .. }));
        collect_until(&event_rx, |event| matches!(event, UnitEvent::Idle { .. }));

        // Assert
        let floors: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                UnitEvent::Arrived { floor, .. } => Some(*floor),
                _ => None,
            })
            .collect();
        assert_eq!(floors, vec![2, 3, 4, 5]);
        assert!(events.contains(&UnitEvent::Boarded { id: 1, floor: 1, count: 1 }));
        assert!(events.contains(&UnitEvent::Exited { id: 1, floor: 5, count: 1 }));
        assert_eq!(unit.passenger_count(), 0);
        assert_eq!(unit.total_served(), 1);
        assert_eq!(unit.current_floor(), 5);
        assert!(unit.is_idle());
        assert!(unit.movement_time() > Duration::ZERO);
        assert!(unit.door_time() > Duration::ZERO);

        unit.request_stop();
        assert!(unit.await_stopped(Duration::from_secs(1)));
    }

    #[test]
    fn test_stop_request_drains_passengers() {
        // Arrange: two pending stops, three passengers aboard
        let (unit, _event_rx) = setup_unit(10);
        unit.with_state(|state| {
            state.passenger_count = 3;
            state.pending_stops = BTreeSet::from([3, 5]);
            state.drop_offs = BTreeMap::from([(3, 1), (5, 2)]);
            state.pickup_directions = BTreeMap::from([(3, Idle), (5, Idle)]);
        });

        // Act
        unit.start().unwrap();
        unit.request_stop();
        let stopped = unit.await_stopped(Duration::from_secs(2));

        // Assert
        assert!(stopped);
        assert_eq!(unit.passenger_count(), 0);
        assert_eq!(unit.total_served(), 3);
        assert_eq!(unit.current_floor(), 5);
        assert!(unit.is_idle());
    }

    #[test]
    fn test_force_stop_abandons_work() {
        let timing = ElevatorConfig {
            movement_time_ms: 50,
            ..fast_timing()
        };
        let unit = Arc::new(ElevatorUnit::new(2, 10, 10, 1, &timing));
        unit.with_state(|state| {
            state.pending_stops.insert(10);
        });

        unit.start().unwrap();
        sleep(Duration::from_millis(20));
        unit.force_stop();

        assert!(unit.await_stopped(Duration::from_secs(1)));
        assert_eq!(unit.pending_stop_count(), 1);
        assert!(unit.current_floor() < 10);
    }

    #[test]
    fn test_stranded_passengers_are_discharged() {
        let (unit, event_rx) = setup_unit(10);
        unit.with_state(|state| state.passenger_count = 2);

        unit.start().unwrap();
        let events = collect_until(&event_rx, |event| matches!(event, UnitEvent::Discharged { .. }));
        unit.request_stop();

        assert!(unit.await_stopped(Duration::from_secs(1)));
        assert_eq!(events.last(), Some(&UnitEvent::Discharged { id: 1, floor: 1, count: 2 }));
        assert_eq!(unit.passenger_count(), 0);
        assert_eq!(unit.total_served(), 2);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        // Arrange
        let (unit, _event_rx) = setup_unit(1);
        unit.accept_stop(1, Up, 5);
        unit.accept_stop(2, Up, 6);
        unit.accept_stop(3, Up, 7);

        // Act
        unit.start().unwrap();
        unit.request_stop();

        // Assert
        let deadline = Instant::now() + Duration::from_secs(2);
        while !unit.await_stopped(Duration::from_millis(1)) {
            assert!(unit.passenger_count() <= unit.capacity());
            assert!(Instant::now() < deadline, "unit did not stop in time");
        }
        assert_eq!(unit.passenger_count(), 0);
        assert_eq!(unit.total_served(), 1);
    }
}
