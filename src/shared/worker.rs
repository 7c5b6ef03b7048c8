/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use std::io;
use std::thread::{Builder, JoinHandle};
use std::time::Duration;

/**
 * A named OS thread with a bounded join.
 *
 * `std::thread::JoinHandle` can only be joined without a deadline, so the spawned
 * closure owns the sending half of a completion channel. The channel disconnects
 * when the closure returns (or panics), which lets `await_stopped` wait with a
 * timeout before doing the actual join.
 */
pub struct Worker {
    name: String,
    handle: Option<JoinHandle<()>>,
    done_rx: cbc::Receiver<()>,
}

impl Worker {
    pub fn spawn<F>(name: String, f: F) -> io::Result<Worker>
    where
        F: FnOnce() + Send + 'static,
    {
        let (done_tx, done_rx) = cbc::bounded::<()>(0);
        let handle = Builder::new().name(name.clone()).spawn(move || {
            let _done_tx = done_tx;
            f();
        })?;

        Ok(Worker {
            name,
            handle: Some(handle),
            done_rx,
        })
    }

    /// Waits up to `timeout` for the thread to exit. Returns false if it is still running.
    pub fn await_stopped(&mut self, timeout: Duration) -> bool {
        match self.done_rx.recv_timeout(timeout) {
            Err(cbc::RecvTimeoutError::Timeout) => false,
            _ => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        log::error!("{} panicked", self.name);
                    }
                }
                true
            }
        }
    }
}
