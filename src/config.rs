/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::ConfigError;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub elevator: ElevatorConfig,
    pub dispatcher: DispatcherConfig,
    pub shutdown: ShutdownConfig,
    pub generator: GeneratorConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub n_floors: u8,
    pub n_elevators: usize,
    pub capacity: u32,
    pub start_floor: u8,
}

/// Physical timing of a single elevator unit. All values in milliseconds.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ElevatorConfig {
    pub movement_time_ms: u64,
    /// Full door cycle; half is spent opening, half closing.
    pub door_operation_time_ms: u64,
    pub passenger_hold_ms: u64,
    pub idle_poll_ms: u64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DispatcherConfig {
    pub poll_timeout_ms: u64,
    pub assignment_delay_ms: u64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    pub dispatcher_join_timeout_ms: u64,
    pub idle_wait_cycles: u32,
    pub idle_wait_interval_ms: u64,
    pub unit_join_timeout_ms: u64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 0 disables the generator, requests are then entered by hand.
    pub max_requests: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

/***************************************/
/*              Defaults               */
/***************************************/
impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            n_floors: 10,
            n_elevators: 4,
            capacity: 10,
            start_floor: 1,
        }
    }
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        ElevatorConfig {
            movement_time_ms: 800,
            door_operation_time_ms: 2000,
            passenger_hold_ms: 1000,
            idle_poll_ms: 100,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            poll_timeout_ms: 1000,
            assignment_delay_ms: 50,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        ShutdownConfig {
            dispatcher_join_timeout_ms: 5000,
            idle_wait_cycles: 15,
            idle_wait_interval_ms: 2000,
            unit_join_timeout_ms: 3000,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_requests: 0,
            min_delay_ms: 1500,
            max_delay_ms: 4000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/***************************************/
/*          Duration helpers           */
/***************************************/
impl ElevatorConfig {
    pub fn movement_time(&self) -> Duration {
        Duration::from_millis(self.movement_time_ms)
    }

    pub fn door_half_cycle(&self) -> Duration {
        Duration::from_millis(self.door_operation_time_ms / 2)
    }

    pub fn passenger_hold(&self) -> Duration {
        Duration::from_millis(self.passenger_hold_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

impl DispatcherConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn assignment_delay(&self) -> Duration {
        Duration::from_millis(self.assignment_delay_ms)
    }
}

impl ShutdownConfig {
    pub fn dispatcher_join_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatcher_join_timeout_ms)
    }

    pub fn idle_wait_interval(&self) -> Duration {
        Duration::from_millis(self.idle_wait_interval_ms)
    }

    pub fn unit_join_timeout(&self) -> Duration {
        Duration::from_millis(self.unit_join_timeout_ms)
    }
}

/***************************************/
/*             Public API              */
/***************************************/
impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.n_floors < 2 {
            return Err(ConfigError::Invalid(format!(
                "n_floors must be at least 2, got {}",
                sim.n_floors
            )));
        }
        if sim.n_elevators == 0 {
            return Err(ConfigError::Invalid("n_elevators must be at least 1".into()));
        }
        if sim.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if sim.start_floor < 1 || sim.start_floor > sim.n_floors {
            return Err(ConfigError::Invalid(format!(
                "start_floor {} outside 1..={}",
                sim.start_floor, sim.n_floors
            )));
        }
        if self.generator.min_delay_ms > self.generator.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "generator min_delay_ms {} exceeds max_delay_ms {}",
                self.generator.min_delay_ms, self.generator.max_delay_ms
            )));
        }
        Ok(())
    }
}

pub fn parse_config(config_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

/// Reads the config file at `path`. A missing file is not an error, the defaults are used.
/// Runs before the logger exists, so the caller reports the fallback.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match fs::read_to_string(path) {
        Ok(config_str) => parse_config(&config_str),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(source) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        // Arrange
        let config_str = r#"
            [simulation]
            n_floors = 6
            n_elevators = 2

            [elevator]
            movement_time_ms = 10
        "#;

        // Act
        let config = parse_config(config_str).unwrap();

        // Assert
        assert_eq!(config.simulation.n_floors, 6);
        assert_eq!(config.simulation.n_elevators, 2);
        assert_eq!(config.simulation.capacity, 10);
        assert_eq!(config.elevator.movement_time_ms, 10);
        assert_eq!(config.elevator.door_operation_time_ms, 2000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_rejects_start_floor_out_of_range() {
        let config_str = r#"
            [simulation]
            n_floors = 4
            start_floor = 5
        "#;

        let result = parse_config(config_str);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        let result = parse_config("[simulation\nn_floors = ");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_generator_delays() {
        let mut config = Config::default();
        config.generator.min_delay_ms = 500;
        config.generator.max_delay_ms = 100;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("does/not/exist/config.toml")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_door_half_cycle() {
        let elevator = ElevatorConfig::default();

        assert_eq!(elevator.door_half_cycle(), Duration::from_millis(1000));
    }
}
