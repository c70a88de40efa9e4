//! Polling session
//!
//! Runs the fingerprint and stats loops on their own threads and delivers
//! every result over a bounded channel. Errors are delivered too; a failed
//! cycle never stops a loop.

use crate::domain::{ContainerReservation, FingerprintResponse, StatsResponse};
use crate::error::{AppError, PollError};
use crate::nvml::TelemetryDriver;
use crate::services::client::TelemetryClient;
use crate::services::fingerprint::build_fingerprint_response;
use crate::services::grouping::filter_excluded;
use crate::services::inventory::InventoryTracker;
use crate::services::stats::build_stats_response;

use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep while waiting, bounds how late a stop is noticed
const WAIT_SLICE: Duration = Duration::from_millis(50);
/// Pause between delivery attempts while the consumer is behind
const SEND_RETRY: Duration = Duration::from_millis(10);

pub type FingerprintResult = Result<FingerprintResponse, PollError>;
pub type StatsResult = Result<StatsResponse, PollError>;

/// Configuration for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// When false no polling happens and a single empty inventory is reported
    pub enabled: bool,
    pub fingerprint_period: Duration,
    pub stats_period: Duration,
    /// Devices never reported
    pub ignored_gpu_ids: HashSet<String>,
    /// Buffered reports per stream before a loop waits on the consumer
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fingerprint_period: Duration::from_secs(60),
            stats_period: Duration::from_secs(5),
            ignored_gpu_ids: HashSet::new(),
            channel_capacity: 1,
        }
    }
}

/// Receiving ends of the two report streams
pub struct ReportStreams {
    pub fingerprints: Receiver<FingerprintResult>,
    pub stats: Receiver<StatsResult>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One fingerprint loop's state between ticks
struct FingerprintPoller<D: TelemetryDriver> {
    client: Arc<TelemetryClient<D>>,
    inventory: Arc<Mutex<InventoryTracker>>,
    excluded: HashSet<String>,
    /// Cleared by a failed tick so the next success is always reported
    synced: bool,
}

impl<D: TelemetryDriver> FingerprintPoller<D> {
    /// Poll once. Returns `None` when the inventory is unchanged since the
    /// last delivered report.
    fn tick(&mut self) -> Option<FingerprintResult> {
        match self.poll() {
            Ok((response, changed)) => {
                if changed || !self.synced {
                    self.synced = true;
                    Some(Ok(response))
                } else {
                    None
                }
            }
            Err(e) => {
                log::error!("Failed to fingerprint GPUs: {}", e);
                self.synced = false;
                Some(Err(e))
            }
        }
    }

    fn poll(&self) -> Result<(FingerprintResponse, bool), PollError> {
        let data = self.client.fingerprint_data()?;
        let devices = filter_excluded(data.devices, &self.excluded);

        let changed = lock(&self.inventory).has_changed(&devices);
        if changed {
            log::info!("GPU inventory changed: {} device(s)", devices.len());
        }

        Ok((
            build_fingerprint_response(&data.driver_version, devices),
            changed,
        ))
    }
}

/// Stats loop state. Only devices already in the tracked inventory are
/// reported.
struct StatsPoller<D: TelemetryDriver> {
    client: Arc<TelemetryClient<D>>,
    inventory: Arc<Mutex<InventoryTracker>>,
    excluded: HashSet<String>,
}

impl<D: TelemetryDriver> StatsPoller<D> {
    fn tick(&self) -> StatsResult {
        let records = self.client.stats_data().map_err(|e| {
            log::error!("Failed to collect GPU stats: {}", e);
            e
        })?;
        let records = lock(&self.inventory).retain_known(records);
        let records = filter_excluded(records, &self.excluded);
        log::debug!("Collected stats for {} device(s)", records.len());
        Ok(build_stats_response(records, Utc::now()))
    }
}

/// Push a report, waiting while the channel is full. Returns false when
/// the consumer is gone or the session is stopping.
fn deliver<T>(tx: &SyncSender<T>, mut message: T, running: &AtomicBool) -> bool {
    loop {
        match tx.try_send(message) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(pending)) => {
                if !running.load(Ordering::SeqCst) {
                    return false;
                }
                message = pending;
                thread::sleep(SEND_RETRY);
            }
        }
    }
}

/// Sleep for `period`, waking early on stop. Returns false if stopped.
fn wait(period: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + period;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(WAIT_SLICE));
    }
}

/// Telemetry polling session
///
/// Owns the driver, the tracked inventory and the poll threads. Dropping
/// the session stops it.
pub struct TelemetrySession<D: TelemetryDriver + 'static> {
    client: Arc<TelemetryClient<D>>,
    config: SessionConfig,
    inventory: Arc<Mutex<InventoryTracker>>,
    running: Arc<AtomicBool>,
    handles: Vec<thread::JoinHandle<()>>,
    initialized: bool,
    started: bool,
}

impl<D: TelemetryDriver + 'static> TelemetrySession<D> {
    /// Create a new session (not started)
    pub fn new(driver: D, config: SessionConfig) -> Self {
        Self {
            client: Arc::new(TelemetryClient::new(driver)),
            config,
            inventory: Arc::new(Mutex::new(InventoryTracker::new())),
            running: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
            initialized: false,
            started: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check if the poll loops are running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_initialized(&mut self) -> Result<(), AppError> {
        if !self.initialized {
            self.client
                .initialize()
                .map_err(AppError::AdapterUnavailable)?;
            self.initialized = true;
        }
        Ok(())
    }

    fn fingerprint_poller(&self) -> FingerprintPoller<D> {
        FingerprintPoller {
            client: Arc::clone(&self.client),
            inventory: Arc::clone(&self.inventory),
            excluded: self.config.ignored_gpu_ids.clone(),
            synced: false,
        }
    }

    fn stats_poller(&self) -> StatsPoller<D> {
        StatsPoller {
            client: Arc::clone(&self.client),
            inventory: Arc::clone(&self.inventory),
            excluded: self.config.ignored_gpu_ids.clone(),
        }
    }

    /// Initialize the driver and start both poll loops.
    ///
    /// Fails with [`AppError::AdapterUnavailable`] if the driver cannot be
    /// initialized, in which case nothing is started.
    pub fn start(&mut self) -> Result<ReportStreams, AppError> {
        if self.started {
            return Err(AppError::Session("session already started".to_string()));
        }

        let capacity = self.config.channel_capacity.max(1);
        let (fp_tx, fp_rx) = mpsc::sync_channel(capacity);
        let (stats_tx, stats_rx) = mpsc::sync_channel(capacity);
        let streams = ReportStreams {
            fingerprints: fp_rx,
            stats: stats_rx,
        };

        if !self.config.enabled {
            log::info!("GPU telemetry disabled, reporting no devices");
            let _ = fp_tx.try_send(Ok(FingerprintResponse::default()));
            self.started = true;
            return Ok(streams);
        }

        self.ensure_initialized()?;
        self.running.store(true, Ordering::SeqCst);
        self.started = true;

        log::info!(
            "Starting GPU telemetry (fingerprint every {:?}, stats every {:?})",
            self.config.fingerprint_period,
            self.config.stats_period
        );

        let mut fingerprint = self.fingerprint_poller();
        let period = self.config.fingerprint_period;
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name("fingerprint-poller".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    if let Some(message) = fingerprint.tick() {
                        if !deliver(&fp_tx, message, &running) {
                            break;
                        }
                    }
                    if !wait(period, &running) {
                        break;
                    }
                }
                log::debug!("Fingerprint loop stopped");
            });
        match handle {
            Ok(handle) => self.handles.push(handle),
            Err(e) => {
                self.stop();
                return Err(e.into());
            }
        }

        let stats = self.stats_poller();
        let period = self.config.stats_period;
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name("stats-poller".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    if !deliver(&stats_tx, stats.tick(), &running) {
                        break;
                    }
                    if !wait(period, &running) {
                        break;
                    }
                }
                log::debug!("Stats loop stopped");
            });
        match handle {
            Ok(handle) => self.handles.push(handle),
            Err(e) => {
                self.stop();
                return Err(e.into());
            }
        }

        Ok(streams)
    }

    /// Stop both loops, wait for in-flight ticks and shut the driver down
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("GPU poll thread panicked");
            }
        }

        if self.initialized {
            if let Err(e) = self.client.shutdown() {
                log::warn!("Failed to shut down telemetry driver: {}", e);
            }
            self.initialized = false;
        }
    }

    /// Run a single fingerprint poll on the calling thread.
    ///
    /// Updates the tracked inventory like a loop tick, but always returns
    /// the full report.
    pub fn poll_fingerprint(&mut self) -> Result<FingerprintResponse, AppError> {
        if !self.config.enabled {
            return Ok(FingerprintResponse::default());
        }
        self.ensure_initialized()?;
        let (response, _) = self.fingerprint_poller().poll()?;
        Ok(response)
    }

    /// Run a single stats poll on the calling thread. Reports only devices
    /// in the tracked inventory, so poll the fingerprint first.
    pub fn poll_stats(&mut self) -> Result<StatsResponse, AppError> {
        if !self.config.enabled {
            return Ok(StatsResponse::default());
        }
        self.ensure_initialized()?;
        Ok(self.stats_poller().tick()?)
    }

    /// UUIDs in the most recent inventory
    pub fn inventory(&self) -> Vec<String> {
        lock(&self.inventory)
            .devices()
            .map(str::to_string)
            .collect()
    }

    /// Reserve devices for a container. Every id must be in the current
    /// inventory.
    pub fn reserve(&self, device_ids: &[String]) -> Result<ContainerReservation, AppError> {
        let inventory = lock(&self.inventory);
        let unknown: Vec<&str> = device_ids
            .iter()
            .map(String::as_str)
            .filter(|id| !inventory.contains(id))
            .collect();

        if !unknown.is_empty() {
            return Err(AppError::UnknownDevice(unknown.join(", ")));
        }

        Ok(ContainerReservation::for_devices(device_ids))
    }
}

impl<D: TelemetryDriver + 'static> Drop for TelemetrySession<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
