//! Schedule controller
//!
//! Owns the single recurring trigger that starts scheduled automation runs.
//! The trigger is rebuilt from stored configuration on `start()` and on every
//! `update_schedule()`; there is no incremental diff.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta, TimeZone};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::automation::{AutomationService, Trigger};
use crate::application::settings::resolve_settings;
use crate::domain::{Period, ScheduleMode, SchedulePolicy};
use crate::shared::ShutdownSignal;

/// Longest single sleep of the trigger. The wall clock is re-read after
/// each one, so suspend and clock changes are caught within this bound.
const MAX_SLEEP: Duration = Duration::from_secs(15 * 60);

/// Wall-clock source, local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Elapsed time until the local wall time `at` is reached, across any
    /// UTC offset change in between. Zero once `at` has passed.
    fn until(&self, at: NaiveDateTime) -> Duration;
}

pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn until(&self, at: NaiveDateTime) -> Duration {
        // A wall time skipped by a spring-forward gap fires an hour later.
        let target = Local
            .from_local_datetime(&at)
            .earliest()
            .or_else(|| Local.from_local_datetime(&(at + TimeDelta::hours(1))).earliest());
        match target {
            Some(instant) => (instant - Local::now()).to_std().unwrap_or(Duration::ZERO),
            None => (at - self.now()).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleStatus {
    pub mode: ScheduleMode,
    pub time: String,
    pub armed: bool,
    pub next_fire: Option<NaiveDateTime>,
}

struct Installed {
    policy: SchedulePolicy,
    task: Option<JoinHandle<()>>,
}

pub struct ScheduleController {
    automation: Arc<AutomationService>,
    shutdown: ShutdownSignal,
    clock: Arc<dyn Clock>,
    installed: Mutex<Installed>,
}

impl ScheduleController {
    pub fn new(automation: Arc<AutomationService>, shutdown: ShutdownSignal) -> Self {
        Self::with_clock(automation, shutdown, Arc::new(LocalClock))
    }

    pub fn with_clock(
        automation: Arc<AutomationService>,
        shutdown: ShutdownSignal,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            automation,
            shutdown,
            clock,
            installed: Mutex::new(Installed {
                policy: SchedulePolicy::from_config("disabled", ""),
                task: None,
            }),
        }
    }

    /// Install the trigger described by stored configuration.
    pub async fn start(&self) -> Option<NaiveDateTime> {
        info!("📅 Starting schedule controller");
        self.update_schedule().await
    }

    /// Drop the current trigger and install a fresh one from stored
    /// configuration. Runs already started keep going. Returns the next
    /// firing instant, if any.
    pub async fn update_schedule(&self) -> Option<NaiveDateTime> {
        let mut installed = self.installed.lock().await;
        if let Some(task) = installed.task.take() {
            task.abort();
        }

        let policy = self.current_policy().await;
        installed.policy = policy;

        if !policy.is_enabled() {
            info!("📅 Schedule disabled, no trigger installed");
            return None;
        }

        let next = policy.next_fire_after(self.clock.now());
        installed.task = Some(tokio::spawn(trigger_loop(
            self.automation.clone(),
            self.clock.clone(),
            self.shutdown.clone(),
            policy,
        )));

        info!(
            mode = %policy.mode,
            time = %policy.time_label(),
            next_fire = ?next,
            "📅 Schedule installed"
        );
        next
    }

    /// Remove the trigger. Idempotent.
    pub async fn shutdown(&self) {
        let mut installed = self.installed.lock().await;
        if let Some(task) = installed.task.take() {
            task.abort();
            info!("📅 Schedule controller stopped");
        }
    }

    pub async fn status(&self) -> ScheduleStatus {
        let installed = self.installed.lock().await;
        let armed = installed
            .task
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false);
        ScheduleStatus {
            mode: installed.policy.mode,
            time: installed.policy.time_label(),
            armed,
            next_fire: if armed {
                installed.policy.next_fire_after(self.clock.now())
            } else {
                None
            },
        }
    }

    async fn current_policy(&self) -> SchedulePolicy {
        match self.automation.resolved_settings().await {
            Ok(settings) => settings.schedule_policy(),
            Err(e) => {
                warn!(error = %e, "Could not read schedule configuration, using defaults");
                resolve_settings(&Default::default(), self.automation.defaults()).schedule_policy()
            }
        }
    }
}

/// Start the run a firing at `fire_at` is responsible for.
pub fn fire(automation: &Arc<AutomationService>, fire_at: NaiveDateTime) -> Period {
    let period = SchedulePolicy::target_period(fire_at.date());
    info!(
        fired_at = %fire_at,
        period_start = %period.start,
        period_end = %period.end,
        "⏰ Scheduled automation firing"
    );
    automation.spawn_run(period, Trigger::Scheduled);
    period
}

async fn trigger_loop(
    automation: Arc<AutomationService>,
    clock: Arc<dyn Clock>,
    shutdown: ShutdownSignal,
    policy: SchedulePolicy,
) {
    let mut after = clock.now();
    loop {
        let Some(fire_at) = policy.next_fire_after(after) else {
            return;
        };
        debug!(
            next_fire = %fire_at,
            wait_secs = clock.until(fire_at).as_secs(),
            "Trigger sleeping"
        );

        loop {
            let remaining = clock.until(fire_at);
            if remaining.is_zero() {
                break;
            }
            let notified = shutdown.notified();
            tokio::select! {
                _ = tokio::time::sleep(remaining.min(MAX_SLEEP)) => {}
                _ = notified.wait() => {
                    info!("Schedule trigger stopping on shutdown");
                    return;
                }
            }
        }

        fire(&automation, fire_at);
        after = fire_at.max(clock.now());
    }
}
