//! Daily reminder scheduling using cron schedules
//!
//! Each completed conversation produces one [`ScheduledReminder`]. The
//! scheduler keeps every reminder forever (there is no cancellation) and, on
//! each tick, hands due reminders to a [`Delivery`] implementation.

use crate::error::{Error, Result};
use crate::session::UserId;
use crate::time_of_day::TimeOfDay;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use cron::Schedule;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One recurring daily reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReminder {
    pub target: UserId,
    pub time: TimeOfDay,
    pub text: String,
}

/// Where the controller hands finished reminders
pub trait ReminderSink {
    fn schedule(&self, reminder: ScheduledReminder) -> Result<()>;
}

/// How late an occurrence may still be delivered when no tick interval is known
pub const DEFAULT_MISFIRE_GRACE: TimeDelta = TimeDelta::seconds(1);

/// Sends a reminder text to a user
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, target: UserId, text: &str) -> Result<()>;
}

struct Job<Z: TimeZone> {
    reminder: ScheduledReminder,
    schedule: Schedule,
    next_fire: Option<DateTime<Z>>,
}

/// Append-only set of daily jobs, evaluated against caller-supplied clocks
pub struct JobRegistry<Z: TimeZone> {
    jobs: Vec<Job<Z>>,
    misfire_grace: TimeDelta,
}

impl<Z: TimeZone> JobRegistry<Z> {
    pub fn new() -> Self {
        Self::with_misfire_grace(DEFAULT_MISFIRE_GRACE)
    }

    /// Occurrences found more than `misfire_grace` after their time are skipped
    pub fn with_misfire_grace(misfire_grace: TimeDelta) -> Self {
        Self {
            jobs: Vec::new(),
            misfire_grace,
        }
    }

    /// Add a job; the first fire is the next occurrence strictly after `now`.
    /// Returns that first fire time.
    pub fn register(
        &mut self,
        reminder: ScheduledReminder,
        now: &DateTime<Z>,
    ) -> Result<DateTime<Z>> {
        let schedule = reminder.time.schedule()?;
        let next_fire = schedule.after(now).next().ok_or_else(|| {
            Error::Schedule(format!("no upcoming fire time for {}", reminder.time))
        })?;

        self.jobs.push(Job {
            reminder,
            schedule,
            next_fire: Some(next_fire.clone()),
        });

        Ok(next_fire)
    }

    /// Collect reminders due at `now` and move each to its next occurrence.
    /// An occurrence older than the misfire grace is dropped, not sent late.
    pub fn take_due(&mut self, now: &DateTime<Z>) -> Vec<ScheduledReminder> {
        let mut due = Vec::new();

        for job in &mut self.jobs {
            let Some(next) = job.next_fire.clone() else {
                continue;
            };
            if next > *now {
                continue;
            }

            let late_by = now.clone().signed_duration_since(next);
            if late_by <= self.misfire_grace {
                due.push(job.reminder.clone());
            } else {
                warn!(
                    "Reminder for {} at {} missed by {}s, skipping this occurrence",
                    job.reminder.target,
                    job.reminder.time,
                    late_by.num_seconds()
                );
            }
            job.next_fire = job.schedule.after(now).next();
        }

        due
    }

    /// Earliest pending fire time across all jobs
    pub fn next_fire(&self) -> Option<DateTime<Z>> {
        self.jobs
            .iter()
            .filter_map(|job| job.next_fire.clone())
            .min()
    }

    pub fn reminders(&self) -> impl Iterator<Item = &ScheduledReminder> {
        self.jobs.iter().map(|job| &job.reminder)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl<Z: TimeZone> Default for JobRegistry<Z> {
    fn default() -> Self {
        Self::new()
    }
}

struct Inner {
    jobs: Mutex<JobRegistry<Local>>,
    delivery: Arc<dyn Delivery>,
    tick: Duration,
    started: AtomicBool,
}

/// Background scheduler firing reminders in host local time
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    /// Occurrences are still delivered up to one tick plus a second late
    pub fn new(delivery: Arc<dyn Delivery>, tick: Duration) -> Self {
        let misfire_grace = TimeDelta::from_std(tick)
            .ok()
            .and_then(|tick| tick.checked_add(&DEFAULT_MISFIRE_GRACE))
            .unwrap_or(TimeDelta::MAX);

        Self {
            inner: Arc::new(Inner {
                jobs: Mutex::new(JobRegistry::with_misfire_grace(misfire_grace)),
                delivery,
                tick,
                started: AtomicBool::new(false),
            }),
        }
    }

    fn jobs(&self) -> MutexGuard<'_, JobRegistry<Local>> {
        self.inner.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the tick loop. Only the first call does anything.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("Reminder scheduler already started");
            return None;
        }

        info!(
            "Reminder scheduler started (tick every {:?}, {} jobs)",
            self.inner.tick,
            self.len()
        );

        let scheduler = self.clone();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.inner.tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                scheduler.fire_due(Local::now());
            }
        }))
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Register a reminder as if the current time were `now`
    pub fn schedule_at(&self, reminder: ScheduledReminder, now: DateTime<Local>) -> Result<()> {
        let target = reminder.target;
        let time = reminder.time;
        let next = self.jobs().register(reminder, &now)?;
        info!("Reminder for {} at {} registered, first fire {}", target, time, next);
        Ok(())
    }

    /// Deliver everything due at `now`, one task per reminder
    pub fn fire_due(&self, now: DateTime<Local>) -> Vec<JoinHandle<()>> {
        let due = self.jobs().take_due(&now);

        due.into_iter()
            .map(|reminder| {
                let delivery = Arc::clone(&self.inner.delivery);
                info!("Reminder due for {} at {}", reminder.target, reminder.time);
                tokio::spawn(async move {
                    match delivery.deliver(reminder.target, &reminder.text).await {
                        Ok(()) => debug!("Reminder delivered to {}", reminder.target),
                        Err(e) => warn!("Failed to deliver reminder to {}: {}", reminder.target, e),
                    }
                })
            })
            .collect()
    }

    pub fn next_fire(&self) -> Option<DateTime<Local>> {
        self.jobs().next_fire()
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }
}

impl ReminderSink for ReminderScheduler {
    fn schedule(&self, reminder: ScheduledReminder) -> Result<()> {
        self.schedule_at(reminder, Local::now())
    }
}
