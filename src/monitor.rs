use crate::config::{Configuration, POLL_INTERVAL};
use crate::error::StartError;
use crate::platform::BinGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Whether the poll loop has been armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringState {
    Idle,
    Running(Configuration),
}

/// Progress reports from the poll loop to the control panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    CycleCompleted { size_gb: u64, purged: bool },
    /// The size query failed; the cycle counted the bin as empty
    QueryFailed { message: String },
    PurgeFailed { message: String },
    /// The loop saw the stop signal and will not run again
    Stopped,
}

/// Owns the size limit and the single poll loop of the process.
///
/// `start` is the only way into `Running` and nothing leads back to `Idle`;
/// the loop ends only when the stop channel is raised.
pub struct MonitoringController {
    gateway: Arc<dyn BinGateway>,
    events: mpsc::UnboundedSender<MonitorEvent>,
    stop: watch::Receiver<bool>,
    runtime: Handle,
    interval: Duration,
    state: MonitoringState,
    task: Option<JoinHandle<()>>,
}

impl MonitoringController {
    pub fn new(
        gateway: Arc<dyn BinGateway>,
        events: mpsc::UnboundedSender<MonitorEvent>,
        stop: watch::Receiver<bool>,
        runtime: Handle,
    ) -> Self {
        Self {
            gateway,
            events,
            stop,
            runtime,
            interval: POLL_INTERVAL,
            state: MonitoringState::Idle,
            task: None,
        }
    }

    pub fn state(&self) -> MonitoringState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, MonitoringState::Running(_))
    }

    /// Validate `raw_input` and arm the poll loop.
    ///
    /// The first cycle runs immediately. Invalid input leaves the
    /// controller `Idle` without touching the gateway.
    pub fn start(&mut self, raw_input: &str) -> Result<Configuration, StartError> {
        if let MonitoringState::Running(config) = self.state {
            warn!(
                "Ignoring start request, already monitoring with a {} GB limit",
                config.size_limit_gb
            );
            return Err(StartError::AlreadyRunning);
        }

        let config = Configuration::parse(raw_input).map_err(|e| {
            warn!("Rejected size limit {:?}: {}", raw_input, e);
            e
        })?;

        let poller = Poller {
            gateway: Arc::clone(&self.gateway),
            config,
            events: self.events.clone(),
            interval: self.interval,
        };
        self.task = Some(self.runtime.spawn(poller.run(self.stop.clone())));
        self.state = MonitoringState::Running(config);

        info!(
            "Monitoring started, bin is purged at {} GB",
            config.size_limit_gb
        );
        Ok(config)
    }

    /// Whether the poll loop task has returned
    pub fn loop_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }
}

/// Outcome of a single poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub size_gb: u64,
    pub purged: bool,
}

struct Poller {
    gateway: Arc<dyn BinGateway>,
    config: Configuration,
    events: mpsc::UnboundedSender<MonitorEvent>,
    interval: Duration,
}

impl Poller {
    async fn run(self, mut stop: watch::Receiver<bool>) {
        debug!("Poll loop running every {:?}", self.interval);

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            let outcome = self.cycle().await;
            self.emit(MonitorEvent::CycleCompleted {
                size_gb: outcome.size_gb,
                purged: outcome.purged,
            });

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = stop_requested(&mut stop) => break,
            }
        }

        info!("Poll loop stopped");
        self.emit(MonitorEvent::Stopped);
    }

    async fn cycle(&self) -> CycleOutcome {
        let gateway = Arc::clone(&self.gateway);
        let size_gb = match tokio::task::spawn_blocking(move || gateway.current_size_gb()).await {
            Ok(Ok(size_gb)) => size_gb,
            Ok(Err(e)) => {
                warn!("Size query failed: {}", e);
                self.emit(MonitorEvent::QueryFailed {
                    message: format!("Failed to get recycle bin size: {}", e),
                });
                0
            }
            Err(e) => {
                error!("Size query task failed: {}", e);
                self.emit(MonitorEvent::QueryFailed {
                    message: format!("Failed to get recycle bin size: {}", e),
                });
                0
            }
        };

        if !self.config.exceeded_by(size_gb) {
            debug!(
                "Bin at {} GB, under the {} GB limit",
                size_gb, self.config.size_limit_gb
            );
            return CycleOutcome {
                size_gb,
                purged: false,
            };
        }

        info!(
            "Bin at {} GB reached the {} GB limit, purging",
            size_gb, self.config.size_limit_gb
        );
        let gateway = Arc::clone(&self.gateway);
        let purged = match tokio::task::spawn_blocking(move || gateway.purge()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Purge failed: {}", e);
                self.emit(MonitorEvent::PurgeFailed {
                    message: e.to_string(),
                });
                false
            }
            Err(e) => {
                error!("Purge task failed: {}", e);
                self.emit(MonitorEvent::PurgeFailed {
                    message: e.to_string(),
                });
                false
            }
        };

        CycleOutcome { size_gb, purged }
    }

    fn emit(&self, event: MonitorEvent) {
        if self.events.send(event).is_err() {
            debug!("No listener for monitor events");
        }
    }
}

/// Resolves once the stop flag is raised or its sender is gone
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            return;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{query_error, ScriptedBin};
    use super::*;
    use crate::error::ValidationError;
    use std::sync::atomic::Ordering;
    use tokio::time::Instant;

    struct Harness {
        bin: Arc<ScriptedBin>,
        controller: MonitoringController,
        events: mpsc::UnboundedReceiver<MonitorEvent>,
        stop: watch::Sender<bool>,
    }

    fn harness(bin: ScriptedBin) -> Harness {
        let bin = Arc::new(bin);
        let (tx, events) = mpsc::unbounded_channel();
        let (stop, stop_rx) = watch::channel(false);
        let gateway: Arc<dyn BinGateway> = bin.clone();
        let controller = MonitoringController::new(gateway, tx, stop_rx, Handle::current());
        Harness {
            bin,
            controller,
            events,
            stop,
        }
    }

    async fn next_cycle(events: &mut mpsc::UnboundedReceiver<MonitorEvent>) -> (u64, bool) {
        loop {
            match events.recv().await {
                Some(MonitorEvent::CycleCompleted { size_gb, purged }) => return (size_gb, purged),
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_accepts_only_one_to_ten() {
        for n in -1..=12i64 {
            let mut h = harness(ScriptedBin::default());
            let result = h.controller.start(&n.to_string());
            if (1..=10).contains(&n) {
                assert_eq!(result.unwrap().size_limit_gb, n as u64);
                assert!(h.controller.is_running());
            } else {
                assert_eq!(
                    result,
                    Err(StartError::Invalid(ValidationError::OutOfRange { value: n }))
                );
                assert_eq!(h.controller.state(), MonitoringState::Idle);
            }
            h.stop.send(true).unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_input_makes_no_gateway_calls() {
        let mut h = harness(ScriptedBin::default());
        assert!(h.controller.start("abc").is_err());
        assert!(h.controller.start("15").is_err());

        tokio::time::sleep(POLL_INTERVAL * 3).await;
        assert_eq!(h.bin.queries(), 0);
        assert_eq!(h.bin.purges(), 0);
        assert_eq!(h.controller.state(), MonitoringState::Idle);
        assert!(h.controller.loop_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_reached_exactly_purges() {
        let mut h = harness(ScriptedBin::with_sizes([Ok(5), Ok(4)]));
        h.controller.start("5").unwrap();

        assert_eq!(next_cycle(&mut h.events).await, (5, true));
        assert_eq!(next_cycle(&mut h.events).await, (4, false));
        assert_eq!(h.bin.purges(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_then_empty_bin() {
        let mut h = harness(ScriptedBin::with_sizes([Ok(6), Ok(0)]));
        h.controller.start("5").unwrap();

        assert_eq!(next_cycle(&mut h.events).await, (6, true));
        assert_eq!(h.bin.purges(), 1);
        assert_eq!(next_cycle(&mut h.events).await, (0, false));
        assert_eq!(h.bin.purges(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failure_skips_purge_and_keeps_polling() {
        let mut h = harness(ScriptedBin::with_sizes([query_error(), Ok(2)]));
        h.controller.start("1").unwrap();

        match h.events.recv().await {
            Some(MonitorEvent::QueryFailed { message }) => {
                assert!(message.starts_with("Failed to get recycle bin size"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(next_cycle(&mut h.events).await, (0, false));
        assert_eq!(h.bin.purges(), 0);

        let failed_at = Instant::now();
        assert_eq!(next_cycle(&mut h.events).await, (2, true));
        assert!(failed_at.elapsed() >= POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_is_immediate_then_spaced() {
        let mut h = harness(ScriptedBin::default());
        let started = Instant::now();
        h.controller.start("3").unwrap();

        next_cycle(&mut h.events).await;
        assert!(started.elapsed() < POLL_INTERVAL);

        let first = Instant::now();
        next_cycle(&mut h.events).await;
        assert!(first.elapsed() >= POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_does_not_spawn_another_loop() {
        let mut h = harness(ScriptedBin::with_sizes([Ok(9), Ok(9), Ok(9), Ok(9)]));
        h.controller.start("2").unwrap();
        assert_eq!(h.controller.start("2"), Err(StartError::AlreadyRunning));
        assert_eq!(h.controller.start("oops"), Err(StartError::AlreadyRunning));

        for _ in 0..4 {
            next_cycle(&mut h.events).await;
        }
        assert_eq!(h.bin.queries(), 4);
        assert_eq!(h.bin.purges(), 4);
        assert_eq!(h.bin.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.controller.state(),
            MonitoringState::Running(Configuration { size_limit_gb: 2 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_signal_ends_loop() {
        let mut h = harness(ScriptedBin::default());
        h.controller.start("4").unwrap();
        next_cycle(&mut h.events).await;

        h.stop.send(true).unwrap();
        loop {
            match h.events.recv().await {
                Some(MonitorEvent::Stopped) => break,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }

        let queries = h.bin.queries();
        tokio::time::sleep(POLL_INTERVAL * 5).await;
        assert_eq!(h.bin.queries(), queries);
        // Stopping the loop is not a return to Idle.
        assert!(h.controller.is_running());
    }
}
