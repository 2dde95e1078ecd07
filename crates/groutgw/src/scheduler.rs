//! Wall-clock aligned scan loop on a dedicated worker thread.
//!
//! A pass fires when local seconds-since-midnight is a multiple of the scan
//! interval. Between checks the worker sleeps [`IDLE_POLL`]; after a pass it
//! sleeps [`SETTLE`]. A pass that overruns simply skips the ticks it missed.

use crate::cancel::CancellationToken;
use crate::progress::{Progress, ScanEventKind};
use crate::scanner::{PassSummary, ScanEngine};
use crate::settings::ScanSettings;
use chrono::{Local, NaiveDateTime, Timelike};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

pub const IDLE_POLL: Duration = Duration::from_millis(600);
pub const SETTLE: Duration = Duration::from_secs(1);

/// Source of local wall-clock time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub scan_interval_secs: u32,
    pub idle_poll: Duration,
    pub settle: Duration,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &ScanSettings) -> Self {
        Self {
            scan_interval_secs: settings.scan_interval_secs(),
            idle_poll: IDLE_POLL,
            settle: SETTLE,
        }
    }
}

/// Counters since the last `start()`.
#[derive(Debug, Default)]
pub struct SessionStats {
    passes: AtomicU64,
    passes_aborted: AtomicU64,
    files_converted: AtomicU64,
    files_failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub passes: u64,
    pub passes_aborted: u64,
    pub files_converted: u64,
    pub files_failed: u64,
}

impl StatsSnapshot {
    /// Failed files plus aborted passes.
    pub fn errors(&self) -> u64 {
        self.files_failed + self.passes_aborted
    }
}

impl SessionStats {
    fn reset(&self) {
        self.passes.store(0, Ordering::SeqCst);
        self.passes_aborted.store(0, Ordering::SeqCst);
        self.files_converted.store(0, Ordering::SeqCst);
        self.files_failed.store(0, Ordering::SeqCst);
    }

    fn record_pass(&self, summary: &PassSummary) {
        self.passes.fetch_add(1, Ordering::SeqCst);
        self.files_converted
            .fetch_add(summary.converted as u64, Ordering::SeqCst);
        self.files_failed
            .fetch_add(summary.failed as u64, Ordering::SeqCst);
    }

    fn record_abort(&self) {
        self.passes.fetch_add(1, Ordering::SeqCst);
        self.passes_aborted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            passes: self.passes.load(Ordering::SeqCst),
            passes_aborted: self.passes_aborted.load(Ordering::SeqCst),
            files_converted: self.files_converted.load(Ordering::SeqCst),
            files_failed: self.files_failed.load(Ordering::SeqCst),
        }
    }
}

#[derive(Default)]
struct Control {
    token: Option<CancellationToken>,
    worker: Option<JoinHandle<()>>,
}

/// Owns the worker thread. `start`/`stop` may be called from any thread.
pub struct Scheduler {
    config: SchedulerConfig,
    engine: Arc<dyn ScanEngine>,
    progress: Arc<Progress>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    stats: Arc<SessionStats>,
    control: Mutex<Control>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, engine: Arc<dyn ScanEngine>, progress: Progress) -> Self {
        Self {
            config,
            engine,
            progress: Arc::new(progress),
            clock: Arc::new(SystemClock),
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SessionStats::default()),
            control: Mutex::new(Control::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Launch the worker. Returns `false` if one is already alive.
    pub fn start(&self) -> bool {
        let mut control = self.lock_control();
        if control.worker.as_ref().map_or(false, |w| !w.is_finished()) {
            warn!("Scheduler already running");
            return false;
        }
        if let Some(finished) = control.worker.take() {
            let _ = finished.join();
        }

        let token = CancellationToken::new();
        self.stats.reset();
        let worker = ScanLoop {
            config: self.config.clone(),
            engine: Arc::clone(&self.engine),
            progress: Arc::clone(&self.progress),
            clock: Arc::clone(&self.clock),
            running: Arc::clone(&self.running),
            stats: Arc::clone(&self.stats),
            token: token.clone(),
        };

        match thread::Builder::new()
            .name("groutgw-scan".to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                control.worker = Some(handle);
                control.token = Some(token);
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to spawn scan thread");
                false
            }
        }
    }

    /// Request the loop to end. Idempotent; does not wait.
    pub fn stop(&self, reason: Option<&str>) {
        if let Some(token) = &self.lock_control().token {
            token.cancel_with_reason(reason);
        }
    }

    /// Set by the worker once the loop begins, cleared once it ends.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True while a worker thread exists and has not exited.
    pub fn is_alive(&self) -> bool {
        self.lock_control()
            .worker
            .as_ref()
            .map_or(false, |w| !w.is_finished())
    }

    /// Block until the worker exits.
    pub fn wait(&self) {
        let worker = self.lock_control().worker.take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("Scan thread panicked");
            }
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop(None);
        self.wait();
    }
}

struct ScanLoop {
    config: SchedulerConfig,
    engine: Arc<dyn ScanEngine>,
    progress: Arc<Progress>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    stats: Arc<SessionStats>,
    token: CancellationToken,
}

/// Clears the running flag even if a pass panics.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ScanLoop {
    fn run(self) {
        self.running.store(true, Ordering::SeqCst);
        let _running = RunningGuard(&self.running);
        let interval = self.config.scan_interval_secs.max(1);
        info!(interval_secs = interval, "Scan loop started");
        self.progress.emit(ScanEventKind::Started);

        let mut last_fired: Option<NaiveDateTime> = None;
        while !self.token.is_cancelled() {
            let now = self.clock.now();
            let second = now.with_nanosecond(0).unwrap_or(now);
            if now.num_seconds_from_midnight() % interval != 0 || last_fired == Some(second) {
                self.clock.sleep(self.config.idle_poll);
                continue;
            }
            last_fired = Some(second);

            match self.engine.run_pass(&self.progress, &self.token) {
                Ok(summary) => self.stats.record_pass(&summary),
                Err(e) => {
                    warn!(error = %e, "Scan pass aborted");
                    self.stats.record_abort();
                    self.progress.emit(ScanEventKind::PassAborted {
                        error: e.to_string(),
                    });
                }
            }
            self.clock.sleep(self.config.settle);
        }

        let reason = self.token.reason();
        info!(reason = reason.as_deref().unwrap_or("none"), "Scan loop stopped");
        self.progress.emit(ScanEventKind::Stopped { reason });
    }
}
