//! The outward-facing run loop.
//!
//! The server owns the context and drives the step sequence at a fixed
//! timestep until it is stopped or the configured tick budget runs out.
//! Simulation stays single-threaded; the stop flag is the only value shared
//! across threads.

use crate::context::ServerContext;
use crate::world::KernelError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Run-loop settings. Loadable from a config file; all fields have
/// serviceable defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Fixed simulation timestep in milliseconds.
    pub tick_interval_ms: u64,
    /// Stop after this many ticks. `None` runs until stopped.
    pub max_ticks: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            max_ticks: None,
        }
    }
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Startup wiring supplied by the game. Each configuration is handed the
/// context once at bootstrap and typically queues the initial world switch.
///
/// Configurations are an explicit registration list; the server never scans
/// for them.
pub trait GameConfiguration {
    fn configure(&self, context: &mut ServerContext) -> Result<(), KernelError>;
}

/// Cloneable stop signal for a running server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    running: Arc<AtomicBool>,
}

impl ServerHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Owns the server context and repeatedly executes the step sequence.
pub struct Server {
    context: ServerContext,
    config: ServerConfig,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            context: ServerContext::new(),
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Build a server and run every game configuration against its context.
    /// Requires at least one configuration; a failing configuration aborts
    /// the bootstrap.
    pub fn bootstrap(
        config: ServerConfig,
        configurations: &[Box<dyn GameConfiguration>],
    ) -> Result<Self, KernelError> {
        if configurations.is_empty() {
            return Err(KernelError::NoConfiguration);
        }
        let mut server = Self::new(config);
        for configuration in configurations {
            configuration.configure(&mut server.context)?;
        }
        Ok(server)
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ServerContext {
        &mut self.context
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            running: self.running.clone(),
        }
    }

    /// Run the step loop until stopped or `max_ticks` is reached, then tear
    /// the context down.
    ///
    /// Each step advances by the fixed tick interval; the remainder of the
    /// interval is slept off. A world-construction failure is fatal while no
    /// world is active (startup); once a world runs, a failed switch is
    /// logged and the current world keeps running.
    pub fn run(&mut self) -> Result<(), KernelError> {
        let interval = self.config.tick_interval();
        tracing::info!(
            interval_ms = self.config.tick_interval_ms,
            max_ticks = ?self.config.max_ticks,
            "server starting"
        );

        let result = self.run_loop(interval);

        self.context.shutdown();
        self.running.store(false, Ordering::SeqCst);
        tracing::info!(tick = self.context.tick(), "server stopped");
        result
    }

    fn run_loop(&mut self, interval: Duration) -> Result<(), KernelError> {
        while self.running.load(Ordering::SeqCst) {
            if let Some(max) = self.config.max_ticks {
                if self.context.tick() >= max {
                    break;
                }
            }

            let frame_start = Instant::now();
            match self.context.step(interval) {
                Ok(_) => {}
                Err(err @ KernelError::Construction(_))
                    if self.context.active_world_node().is_some() =>
                {
                    tracing::error!(error = %err, "world switch failed, keeping active world");
                }
                Err(err) => return Err(err),
            }

            if let Some(rest) = interval.checked_sub(frame_start.elapsed()) {
                if !rest.is_zero() {
                    std::thread::sleep(rest);
                }
            }
        }
        Ok(())
    }
}
