//! Background expiry sweep.
//!
//! Periodically reclaims stock held by reservations past their expiry time,
//! so abandoned orders do not lock stock forever. Embedders that prefer a
//! lazy model can skip the sweeper and call
//! `OrderLifecycleController::expire_due_reservations` themselves.

use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info};

use orderflow_events::EventBus;

use crate::controller::OrderLifecycleController;
use crate::events::FulfillmentEvent;

/// Sweeper configuration.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to run the sweep.
    pub poll_interval: Duration,
    /// Name for logging and the worker thread.
    pub name: String,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            name: "expiry-sweeper".to_string(),
        }
    }
}

impl SweeperConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Sweeper runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SweeperStats {
    pub sweeps: u64,
    pub reservations_expired: u64,
    pub uptime_secs: u64,
}

/// Handle to control a running sweeper.
#[derive(Debug)]
pub struct ExpirySweeperHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SweeperStats>>,
}

impl ExpirySweeperHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    /// Get current sweeper statistics.
    pub fn stats(&self) -> SweeperStats {
        match self.stats.lock() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Background worker driving the expiry sweep.
pub struct ExpirySweeper;

impl ExpirySweeper {
    /// Spawn the sweep loop in a background thread.
    pub fn spawn<B>(
        controller: Arc<OrderLifecycleController<B>>,
        config: SweeperConfig,
    ) -> ExpirySweeperHandle
    where
        B: EventBus<FulfillmentEvent> + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SweeperStats::default()));
        let stats_clone = stats.clone();

        let name = config.name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || {
                sweeper_loop(controller, config, shutdown_rx, stats_clone);
            })
            .expect("failed to spawn expiry sweeper thread");

        ExpirySweeperHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }
}

fn sweeper_loop<B>(
    controller: Arc<OrderLifecycleController<B>>,
    config: SweeperConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<SweeperStats>>,
) where
    B: EventBus<FulfillmentEvent> + Send + Sync + 'static,
{
    info!(sweeper = %config.name, "expiry sweeper started");
    let start_time = Instant::now();

    loop {
        // Check for shutdown
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match controller.expire_due_reservations(Utc::now()) {
            Ok(expired) => {
                if let Ok(mut s) = stats.lock() {
                    s.sweeps += 1;
                    s.reservations_expired += expired.len() as u64;
                    s.uptime_secs = start_time.elapsed().as_secs();
                }
                if !expired.is_empty() {
                    debug!(
                        sweeper = %config.name,
                        count = expired.len(),
                        "sweep reclaimed expired reservations"
                    );
                }
            }
            Err(e) => {
                error!(sweeper = %config.name, error = %e, "expiry sweep failed");
            }
        }

        thread::sleep(config.poll_interval);
    }

    info!(sweeper = %config.name, "expiry sweeper stopped");
}
