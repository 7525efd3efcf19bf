//! Timer lifecycle — long-lived timer tasks driven by arm/stop commands.
//!
//! Every timer is a tokio task created once and reused: arming sends a new
//! deadline, stopping cancels the pending one. Each command carries an epoch
//! so a fire that raced with a newer command can be recognised as stale by
//! whoever handles it. Dropping the [`TimerManager`] closes every command
//! channel, which ends the tasks once any in-flight fire has completed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use commander_domain::id::RuleId;

/// The four timers an automation slot can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-shot: runs the actions once the delay has elapsed.
    Delay,
    /// Periodic: re-runs the actions while the automation stays triggered.
    Reminder,
    /// One-shot: clears a constraint some time after it became true.
    Reset(RuleId),
    /// Periodic: sets a constraint when no message arrived for a while.
    Timeout(RuleId),
}

impl TimerKind {
    #[must_use]
    pub fn is_periodic(self) -> bool {
        matches!(self, Self::Reminder | Self::Timeout(_))
    }

    /// The constraint a rule timer belongs to.
    #[must_use]
    pub fn rule(self) -> Option<RuleId> {
        match self {
            Self::Reset(id) | Self::Timeout(id) => Some(id),
            Self::Delay | Self::Reminder => None,
        }
    }
}

/// What a timer task does after handling a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fire {
    Continue,
    /// The timed entity is gone; the task ends.
    Terminate,
}

/// Callback invoked with the epoch of the arm command that fired.
pub type OnFire = Arc<dyn Fn(u64) -> BoxFuture<'static, Fire> + Send + Sync>;

enum Command {
    Arm {
        deadline: Instant,
        period: Duration,
        epoch: u64,
    },
    Stop,
}

/// Handle to one timer task.
pub struct Timer {
    kind: TimerKind,
    epoch: u64,
    commands: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl Timer {
    /// Spawn an idle timer task.
    #[must_use]
    pub fn spawn(kind: TimerKind, on_fire: OnFire) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(kind, receiver, on_fire));
        Self {
            kind,
            epoch: 0,
            commands,
            handle,
        }
    }

    /// (Re)arm the timer to fire `after` from now, superseding any pending
    /// deadline. Returns the epoch of this arm.
    pub fn arm(&mut self, after: Duration) -> u64 {
        self.epoch += 1;
        let command = Command::Arm {
            deadline: Instant::now() + after,
            period: after,
            epoch: self.epoch,
        };
        if self.commands.send(command).is_err() {
            tracing::warn!(kind = ?self.kind, "timer task is gone, arm ignored");
        }
        self.epoch
    }

    /// Cancel the pending deadline, if any.
    pub fn stop(&mut self) {
        self.epoch += 1;
        let _ = self.commands.send(Command::Stop);
    }

    /// Whether `epoch` belongs to the latest arm command.
    #[must_use]
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn run(kind: TimerKind, mut commands: mpsc::UnboundedReceiver<Command>, on_fire: OnFire) {
    let mut armed: Option<(Instant, Duration, u64)> = None;
    loop {
        let Some((deadline, period, epoch)) = armed else {
            match commands.recv().await {
                None => break,
                Some(Command::Arm {
                    deadline,
                    period,
                    epoch,
                }) => armed = Some((deadline, period, epoch)),
                Some(Command::Stop) => {}
            }
            continue;
        };
        tokio::select! {
            biased;
            command = commands.recv() => match command {
                None => break,
                Some(Command::Arm { deadline, period, epoch }) => {
                    armed = Some((deadline, period, epoch));
                }
                Some(Command::Stop) => armed = None,
            },
            () = tokio::time::sleep_until(deadline) => {
                armed = kind.is_periodic().then_some((deadline + period, period, epoch));
                if on_fire(epoch).await == Fire::Terminate {
                    break;
                }
            }
        }
    }
    tracing::trace!(?kind, "timer task finished");
}

/// Owns every timer and collaborator task of one automation slot.
#[derive(Default)]
pub struct TimerManager {
    timers: HashMap<TimerKind, Timer>,
    tasks: HashMap<RuleId, Vec<JoinHandle<()>>>,
}

impl TimerManager {
    /// Return the timer of `kind`, spawning it on first use.
    pub fn ensure(&mut self, kind: TimerKind, on_fire: impl FnOnce() -> OnFire) -> &mut Timer {
        self.timers
            .entry(kind)
            .or_insert_with(|| Timer::spawn(kind, on_fire()))
    }

    /// Arm the timer of `kind`, spawning it on first use.
    pub fn arm(
        &mut self,
        kind: TimerKind,
        after: Duration,
        on_fire: impl FnOnce() -> OnFire,
    ) -> u64 {
        self.ensure(kind, on_fire).arm(after)
    }

    /// Stop the timer of `kind` if it exists.
    pub fn stop(&mut self, kind: TimerKind) {
        if let Some(timer) = self.timers.get_mut(&kind) {
            timer.stop();
        }
    }

    #[must_use]
    pub fn is_current(&self, kind: TimerKind, epoch: u64) -> bool {
        self.timers
            .get(&kind)
            .is_some_and(|timer| timer.is_current(epoch))
    }

    /// Hand a collaborator task over to the slot. It is aborted when the rule
    /// or its automation goes away.
    pub fn attach(&mut self, rule: RuleId, handle: JoinHandle<()>) {
        self.tasks.entry(rule).or_default().push(handle);
    }

    /// Stop and drop everything belonging to one rule.
    pub fn release_rule(&mut self, rule: RuleId) {
        self.timers.retain(|kind, timer| {
            if kind.rule() == Some(rule) {
                timer.stop();
                false
            } else {
                true
            }
        });
        for handle in self.tasks.remove(&rule).unwrap_or_default() {
            handle.abort();
        }
    }

    /// Stop every timer, close their command channels and abort every
    /// attached task.
    pub fn shutdown(&mut self) {
        for timer in self.timers.values_mut() {
            timer.stop();
        }
        self.timers.clear();
        for handle in self.tasks.drain().flat_map(|(_, handles)| handles) {
            handle.abort();
        }
    }

    /// Number of timer and collaborator tasks still running.
    #[must_use]
    pub fn running(&self) -> usize {
        let timers = self.timers.values().filter(|t| !t.is_finished()).count();
        let tasks = self
            .tasks
            .values()
            .flatten()
            .filter(|h| !h.is_finished())
            .count();
        timers + tasks
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting() -> (Arc<AtomicUsize>, OnFire) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let on_fire: OnFire = Arc::new(move |_epoch| -> BoxFuture<'static, Fire> {
            inner.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Fire::Continue })
        });
        (count, on_fire)
    }

    async fn sleep_secs(secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_one_shot_timer_once() {
        let (count, on_fire) = counting();
        let mut timer = Timer::spawn(TimerKind::Delay, on_fire);
        timer.arm(Duration::from_secs(5));

        sleep_secs(4.9).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sleep_secs(0.2).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        sleep_secs(60.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_periodic_timer_every_period() {
        let (count, on_fire) = counting();
        let mut timer = Timer::spawn(TimerKind::Reminder, on_fire);
        timer.arm(Duration::from_secs(10));

        sleep_secs(35.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_fire_after_stop() {
        let (count, on_fire) = counting();
        let mut timer = Timer::spawn(TimerKind::Delay, on_fire);
        timer.arm(Duration::from_secs(5));
        sleep_secs(2.0).await;
        timer.stop();

        sleep_secs(10.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_restart_deadline_when_rearmed() {
        let (count, on_fire) = counting();
        let mut timer = Timer::spawn(TimerKind::Timeout(RuleId::from_raw(1)), on_fire);
        timer.arm(Duration::from_secs(5));
        sleep_secs(4.0).await;
        timer.arm(Duration::from_secs(5));

        sleep_secs(4.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sleep_secs(1.5).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_track_current_epoch() {
        let (_count, on_fire) = counting();
        let mut timer = Timer::spawn(TimerKind::Delay, on_fire);
        let first = timer.arm(Duration::from_secs(1));
        assert!(timer.is_current(first));
        timer.stop();
        assert!(!timer.is_current(first));
        let second = timer.arm(Duration::from_secs(1));
        assert!(timer.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn should_end_tasks_on_shutdown() {
        let (count, on_fire) = counting();
        let mut manager = TimerManager::default();
        manager.arm(TimerKind::Delay, Duration::from_secs(5), || on_fire);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        manager.attach(
            RuleId::from_raw(4),
            tokio::spawn(async move {
                let _guard = tx;
                std::future::pending::<()>().await;
            }),
        );
        sleep_secs(0.1).await;
        assert_eq!(manager.running(), 2);

        manager.shutdown();
        sleep_secs(10.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(rx.await.is_err());
        // the task dropped its callback when it ended
        assert_eq!(Arc::strong_count(&count), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_release_only_the_given_rule() {
        let (count, on_fire) = counting();
        let mut manager = TimerManager::default();
        let keep = RuleId::from_raw(1);
        let gone = RuleId::from_raw(2);
        manager.arm(TimerKind::Reset(keep), Duration::from_secs(5), || {
            Arc::clone(&on_fire)
        });
        manager.arm(TimerKind::Reset(gone), Duration::from_secs(5), || on_fire);

        manager.release_rule(gone);
        sleep_secs(6.0).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_classify_timer_kinds() {
        let rule = RuleId::from_raw(9);
        assert!(TimerKind::Reminder.is_periodic());
        assert!(TimerKind::Timeout(rule).is_periodic());
        assert!(!TimerKind::Delay.is_periodic());
        assert_eq!(TimerKind::Reset(rule).rule(), Some(rule));
        assert_eq!(TimerKind::Delay.rule(), None);
    }
}
