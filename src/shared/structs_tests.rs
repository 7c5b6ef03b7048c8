/*
 * Unit tests for the shared data structures
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * Tests:
 *  - test_request_direction_is_derived
 *  - test_request_rejects_out_of_range_floor
 *  - test_request_rejects_same_floor
 *  - test_request_ids_are_increasing
 *  - test_load_balance_*
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod structs_tests {
    use crate::shared::{Direction, LoadBalance, LoadVerdict, Request, RequestError, UnitStatistics};

    #[test]
    fn test_request_direction_is_derived() {
        // Act
        let up = Request::new(2, 7, 10).unwrap();
        let down = Request::new(9, 1, 10).unwrap();

        // Assert
        assert_eq!(up.direction(), Direction::Up);
        assert_eq!(down.direction(), Direction::Down);
        assert_eq!(up.origin_floor(), 2);
        assert_eq!(up.destination_floor(), 7);
    }

    #[test]
    fn test_request_rejects_out_of_range_floor() {
        assert_eq!(
            Request::new(0, 3, 10),
            Err(RequestError::FloorOutOfRange { floor: 0, n_floors: 10 })
        );
        assert_eq!(
            Request::new(3, 11, 10),
            Err(RequestError::FloorOutOfRange { floor: 11, n_floors: 10 })
        );
    }

    #[test]
    fn test_request_rejects_same_floor() {
        assert_eq!(Request::new(4, 4, 10), Err(RequestError::SameFloor { floor: 4 }));
    }

    #[test]
    fn test_request_ids_are_increasing() {
        // Other tests create requests concurrently, so only ordering is checked
        let first = Request::new(1, 2, 4).unwrap();
        let second = Request::new(2, 1, 4).unwrap();

        assert!(second.id() > first.id());
        assert!(first.id() >= 1);
    }

    #[test]
    fn test_request_display() {
        let request = Request::new(3, 1, 5).unwrap();

        assert_eq!(request.to_string(), format!("#{}: 3->1 DOWN", request.id()));
    }

    #[test]
    fn test_load_balance_even_distribution() {
        let load = LoadBalance::from_counts(&[5, 5, 5, 5]);

        assert_eq!(load.total, 20);
        assert_eq!(load.imbalance, 0);
        assert_eq!(load.imbalance_percent, 0.0);
        assert_eq!(load.verdict, LoadVerdict::Good);
    }

    #[test]
    fn test_load_balance_strong_imbalance() {
        // average 5, imbalance 6 -> 120 %
        let load = LoadBalance::from_counts(&[8, 2, 5]);

        assert_eq!(load.max, 8);
        assert_eq!(load.min, 2);
        assert_eq!(load.average, 5.0);
        assert_eq!(load.imbalance, 6);
        assert!((load.imbalance_percent - 120.0).abs() < 1e-9);
        assert_eq!(load.verdict, LoadVerdict::Strong);
    }

    #[test]
    fn test_load_balance_moderate_imbalance() {
        // average 10, imbalance 3 -> 30 %
        let load = LoadBalance::from_counts(&[11, 8, 11]);

        assert_eq!(load.verdict, LoadVerdict::Moderate);
    }

    #[test]
    fn test_load_balance_unit_without_assignments() {
        let load = LoadBalance::from_counts(&[3, 0]);

        assert_eq!(load.verdict, LoadVerdict::Unassigned);
    }

    #[test]
    fn test_load_balance_no_traffic() {
        let load = LoadBalance::from_counts(&[0, 0, 0]);

        assert_eq!(load.average, 0.0);
        assert_eq!(load.imbalance_percent, 0.0);
        assert_eq!(load.verdict, LoadVerdict::Good);
    }

    #[test]
    fn test_unit_efficiency() {
        let stats = UnitStatistics {
            id: 1,
            assignment_count: 6,
            movement_time_ms: 20_000,
            door_time_ms: 10_000,
            total_served: 6,
        };

        assert_eq!(stats.busy_time_ms(), 30_000);
        assert!((stats.efficiency() - 12.0).abs() < 1e-9);
    }
}
