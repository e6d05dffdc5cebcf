// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Alarm actuator - buzzer and light driven as a timed on/off sequence
//!
//! ```text
//!   Idle ──trigger()──▶ Running ──(cycles complete)──▶ Idle
//!                          │
//!                  trigger() is a no-op
//! ```
//!
//! The running flag is the only lock between triggers: `trigger` claims it
//! with a compare-and-swap, and a guard owned by the sequence task releases
//! it, forcing both outputs off on the way out.

mod gpio;

pub use gpio::{SysfsGpio, SysfsPin};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{ActuatorBackend, ActuatorConfig};
use crate::error::ActuatorError;

/// Capability to drive the two alarm outputs
pub trait AlarmOutputs: Send + Sync {
    fn set_outputs(&self, buzzer: bool, light: bool) -> Result<(), ActuatorError>;
}

/// Build the output driver named in the configuration
pub fn outputs_from_config(config: &ActuatorConfig) -> Result<Arc<dyn AlarmOutputs>, ActuatorError> {
    match config.backend {
        ActuatorBackend::Log => Ok(Arc::new(LogOutputs)),
        ActuatorBackend::Sysfs => Ok(Arc::new(SysfsGpio::open(
            &config.gpio_root,
            config.buzzer_pin,
            config.light_pin,
        )?)),
    }
}

/// Outputs that only log, for hosts without alarm hardware
pub struct LogOutputs;

impl AlarmOutputs for LogOutputs {
    fn set_outputs(&self, buzzer: bool, light: bool) -> Result<(), ActuatorError> {
        debug!("Alarm outputs: buzzer={} light={}", buzzer, light);
        Ok(())
    }
}

/// One observed output change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub buzzer: bool,
    pub light: bool,
    pub at: Instant,
}

/// Outputs that remember every change, for tests
#[derive(Default)]
pub struct RecordingOutputs {
    transitions: Mutex<Vec<Transition>>,
}

impl RecordingOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.lock().clone()
    }

    /// Number of times the outputs were switched on
    pub fn on_count(&self) -> usize {
        self.transitions.lock().iter().filter(|t| t.buzzer && t.light).count()
    }

    /// Last state written, `(false, false)` if nothing was written
    pub fn current(&self) -> (bool, bool) {
        self.transitions
            .lock()
            .last()
            .map(|t| (t.buzzer, t.light))
            .unwrap_or((false, false))
    }
}

impl AlarmOutputs for RecordingOutputs {
    fn set_outputs(&self, buzzer: bool, light: bool) -> Result<(), ActuatorError> {
        self.transitions.lock().push(Transition {
            buzzer,
            light,
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Shape of one alarm sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmPattern {
    pub cycles: u32,
    pub on: Duration,
    pub off: Duration,
}

impl AlarmPattern {
    pub fn from_config(config: &ActuatorConfig) -> Self {
        Self {
            cycles: config.cycles,
            on: config.on_duration(),
            off: config.off_duration(),
        }
    }
}

impl Default for AlarmPattern {
    fn default() -> Self {
        Self::from_config(&ActuatorConfig::default())
    }
}

/// Runs at most one alarm sequence at a time
pub struct AlarmController {
    outputs: Arc<dyn AlarmOutputs>,
    pattern: AlarmPattern,
    running: Arc<AtomicBool>,
    current: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
    sequences: AtomicU64,
}

impl AlarmController {
    /// Create the controller and force both outputs off
    pub fn new(outputs: Arc<dyn AlarmOutputs>, pattern: AlarmPattern, runtime: Handle) -> Self {
        if let Err(e) = outputs.set_outputs(false, false) {
            warn!("Could not reset alarm outputs: {}", e);
        }

        Self {
            outputs,
            pattern,
            running: Arc::new(AtomicBool::new(false)),
            current: Mutex::new(None),
            runtime,
            sequences: AtomicU64::new(0),
        }
    }

    /// Start a sequence unless one is already running
    ///
    /// Never blocks. Returns `true` if this call started a sequence; a call
    /// made while busy neither queues nor restarts anything.
    pub fn trigger(&self) -> bool {
        // Held across the claim and spawn so `current` always names the live task
        let mut current = self.current.lock();

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Alarm already running, trigger ignored");
            return false;
        }

        let guard = SequenceGuard {
            running: self.running.clone(),
            outputs: self.outputs.clone(),
        };
        let outputs = self.outputs.clone();
        let pattern = self.pattern;
        let number = self.sequences.fetch_add(1, Ordering::Relaxed) + 1;

        info!("Alarm sequence #{} started ({} cycles)", number, pattern.cycles);
        *current = Some(self.runtime.spawn(async move {
            let _guard = guard;
            run_sequence(outputs.as_ref(), pattern).await;
            info!("Alarm sequence #{} complete", number);
        }));

        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Sequences started since process start
    pub fn sequences_started(&self) -> u64 {
        self.sequences.load(Ordering::Relaxed)
    }

    /// Wait for the current sequence, if any, to finish
    pub async fn wait_idle(&self) {
        let handle = self.current.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Alarm sequence task failed: {}", e);
            }
        }
    }
}

/// Releases the running flag and forces outputs off, however the task ends
struct SequenceGuard {
    running: Arc<AtomicBool>,
    outputs: Arc<dyn AlarmOutputs>,
}

impl Drop for SequenceGuard {
    fn drop(&mut self) {
        if let Err(e) = self.outputs.set_outputs(false, false) {
            warn!("Could not switch alarm outputs off: {}", e);
        }
        self.running.store(false, Ordering::Release);
    }
}

async fn run_sequence(outputs: &dyn AlarmOutputs, pattern: AlarmPattern) {
    // Deadlines are absolute so a slow output write does not stretch the cadence
    let mut deadline = Instant::now();

    for _ in 0..pattern.cycles {
        switch(outputs, true);
        deadline += pattern.on;
        tokio::time::sleep_until(deadline).await;

        switch(outputs, false);
        deadline += pattern.off;
        tokio::time::sleep_until(deadline).await;
    }
}

fn switch(outputs: &dyn AlarmOutputs, on: bool) {
    if let Err(e) = outputs.set_outputs(on, on) {
        warn!("Alarm output write failed: {}", e);
    }
}
