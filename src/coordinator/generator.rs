/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{info, warn};
use rand::Rng;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::GeneratorConfig;
use crate::dispatcher::Dispatcher;
use crate::shared::{Request, Worker};

/**
 * Feeds random passenger requests to the dispatcher at random intervals.
 *
 * Stops after `max_requests`, when the dispatcher refuses a submission, or on
 * `request_stop`. The wait between requests is a `recv_timeout` on the terminate
 * channel, so a stop is seen immediately.
 */
pub struct RequestGenerator {
    config: GeneratorConfig,
    n_floors: u8,
    generated: Arc<AtomicU64>,
    terminate_tx: cbc::Sender<()>,
    terminate_rx: cbc::Receiver<()>,
    worker: Option<Worker>,
}

/// Uniform origin and destination in `1..=n_floors`, never equal.
pub fn random_trip<R: Rng>(rng: &mut R, n_floors: u8) -> (u8, u8) {
    let origin = rng.random_range(1..=n_floors);
    loop {
        let destination = rng.random_range(1..=n_floors);
        if destination != origin {
            return (origin, destination);
        }
    }
}

impl RequestGenerator {
    pub fn new(config: &GeneratorConfig, n_floors: u8) -> RequestGenerator {
        let (terminate_tx, terminate_rx) = cbc::bounded::<()>(1);
        RequestGenerator {
            config: config.clone(),
            n_floors,
            generated: Arc::new(AtomicU64::new(0)),
            terminate_tx,
            terminate_rx,
            worker: None,
        }
    }

    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::SeqCst)
    }

    pub fn start(&mut self, dispatcher: Arc<Dispatcher>) -> io::Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let config = self.config.clone();
        let n_floors = self.n_floors;
        let generated = Arc::clone(&self.generated);
        let terminate_rx = self.terminate_rx.clone();

        self.worker = Some(Worker::spawn("generator".into(), move || {
            info!("Generator | Started | max {} requests", config.max_requests);
            let mut rng = rand::rng();

            while generated.load(Ordering::SeqCst) < config.max_requests {
                let (origin, destination) = random_trip(&mut rng, n_floors);
                match Request::new(origin, destination, n_floors) {
                    Ok(request) => {
                        info!("Generator | Created | {}", request);
                        if !dispatcher.submit(request) {
                            break;
                        }
                        generated.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => warn!("Generator | Rejected | {}", e),
                }

                let delay = rng.random_range(config.min_delay_ms..=config.max_delay_ms);
                match terminate_rx.recv_timeout(Duration::from_millis(delay)) {
                    Err(cbc::RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
            }

            info!(
                "Generator | Stopped | Created {} requests",
                generated.load(Ordering::SeqCst)
            );
        })?);
        Ok(())
    }

    pub fn request_stop(&self) {
        let _ = self.terminate_tx.try_send(());
    }

    pub fn await_stopped(&mut self, timeout: Duration) -> bool {
        match self.worker.as_mut() {
            Some(worker) => worker.await_stopped(timeout),
            None => true,
        }
    }
}
