/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{info, warn};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::sleep;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::Config;
use crate::coordinator::command::{Command, MENU};
use crate::coordinator::generator::RequestGenerator;
use crate::coordinator::report::{to_json, StatisticsTable, StatusTable};
use crate::dispatcher::Dispatcher;
use crate::shared::{Request, RequestError};

/***************************************/
/*               Enums                 */
/***************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Outcome of `Coordinator::shutdown`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    pub dispatcher_stopped: bool,
    pub all_idle: bool,
    /// Units that had to be force-stopped.
    pub stuck_units: Vec<usize>,
    pub generated: u64,
    pub total_assigned: u64,
}

/***************************************/
/*             Public API              */
/***************************************/

/**
 * Operator-facing glue around the dispatch core.
 *
 * Starts and stops the dispatcher (and with it every elevator unit), feeds in
 * requests from the command line or the random generator, and renders the
 * status and statistics snapshots.
 */
pub struct Coordinator {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    generator: Option<RequestGenerator>,
    json_output: bool,
}

impl Coordinator {
    pub fn new(config: Config, json_output: bool) -> Coordinator {
        let dispatcher = Arc::new(Dispatcher::from_config(&config));
        let generator = (config.generator.max_requests > 0)
            .then(|| RequestGenerator::new(&config.generator, config.simulation.n_floors));

        Coordinator {
            config,
            dispatcher,
            generator,
            json_output,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn start(&mut self) -> io::Result<()> {
        info!(
            "Coordinator | Launching | {} elevators, {} floors",
            self.config.simulation.n_elevators, self.config.simulation.n_floors
        );
        self.dispatcher.start()?;
        if let Some(generator) = self.generator.as_mut() {
            generator.start(Arc::clone(&self.dispatcher))?;
        }
        Ok(())
    }

    /// Validates and submits one request. `Ok(false)` means the system is stopping.
    pub fn add_request(&self, origin: u8, destination: u8) -> Result<bool, RequestError> {
        let request = Request::new(origin, destination, self.config.simulation.n_floors)?;
        Ok(self.dispatcher.submit(request))
    }

    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<Control> {
        match command {
            Command::AddRequest {
                origin,
                destination,
            } => match self.add_request(origin, destination) {
                Ok(true) => writeln!(out, "Request successfully added to system")?,
                Ok(false) => writeln!(out, "ERROR: system is stopping, request refused")?,
                Err(e) => writeln!(out, "ERROR: {}", e)?,
            },
            Command::Status => {
                let status = self.dispatcher.status();
                if self.json_output {
                    writeln!(out, "{}", to_json(&status)?)?;
                } else {
                    writeln!(out, "{}", StatusTable(&status))?;
                }
            }
            Command::Statistics => self.write_statistics(out)?,
            Command::Help => writeln!(out, "{}", MENU)?,
            Command::Quit => return Ok(Control::Quit),
        }
        Ok(Control::Continue)
    }

    pub fn write_statistics<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let statistics = self.dispatcher.statistics();
        if self.json_output {
            writeln!(out, "{}", to_json(&statistics)?)
        } else {
            writeln!(out, "{}", StatisticsTable(&statistics))
        }
    }

    /// Reads commands line by line until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", MENU)?;
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let control = match line.parse::<Command>() {
                Ok(command) => self.execute(command, out)?,
                Err(e) => {
                    writeln!(out, "ERROR: {}", e)?;
                    Control::Continue
                }
            };
            if control == Control::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Stops everything in order, with a bounded wait at every step.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let shutdown = self.config.shutdown.clone();

        let mut generated = 0;
        if let Some(generator) = self.generator.as_mut() {
            generator.request_stop();
            if !generator.await_stopped(shutdown.unit_join_timeout()) {
                warn!("Coordinator | Shutdown | generator did not stop in time");
            }
            generated = generator.generated();
        }

        self.dispatcher.request_stop();
        let dispatcher_stopped = self
            .dispatcher
            .await_stopped(shutdown.dispatcher_join_timeout());
        if !dispatcher_stopped {
            warn!("Coordinator | Shutdown | dispatcher did not stop in time, continuing");
            for unit in self.dispatcher.units() {
                unit.request_stop();
            }
        }

        let all_idle = self.wait_for_idle();
        if !all_idle {
            warn!("Coordinator | Shutdown | not all elevators finished in time");
        }

        let mut stuck_units = Vec::new();
        for unit in self.dispatcher.units() {
            if !unit.await_stopped(shutdown.unit_join_timeout()) {
                warn!(
                    "Coordinator | Shutdown | elevator {} did not finish in time, forcing stop",
                    unit.id()
                );
                unit.force_stop();
                if !unit.await_stopped(shutdown.unit_join_timeout()) {
                    warn!("Coordinator | Shutdown | elevator {} still running", unit.id());
                }
                stuck_units.push(unit.id());
            }
        }

        let report = ShutdownReport {
            dispatcher_stopped,
            all_idle,
            stuck_units,
            generated,
            total_assigned: self.dispatcher.status().dispatcher.total_assigned,
        };
        info!("Coordinator | Shutdown | {:?}", report);
        report
    }

    fn wait_for_idle(&self) -> bool {
        let shutdown = &self.config.shutdown;
        let units = self.dispatcher.units();

        for cycle in 0..shutdown.idle_wait_cycles {
            if units.iter().all(|unit| unit.is_idle()) {
                return true;
            }
            if cycle % 3 == 0 {
                info!("Coordinator | Shutdown | waiting for elevators to finish");
                for unit in units.iter().filter(|unit| !unit.is_idle()) {
                    let snapshot = unit.snapshot();
                    info!(
                        "   Elevator {}: floor {}, passengers={}, targets={}",
                        snapshot.id, snapshot.floor, snapshot.passenger_count, snapshot.pending_stop_count
                    );
                }
            }
            sleep(shutdown.idle_wait_interval());
        }
        units.iter().all(|unit| unit.is_idle())
    }
}
