//! Cancellable single-shot timers.
//!
//! A scheduler never calls back into the component that armed it. When a timer
//! expires its `TimerTicket` is handed back to the control loop, which routes
//! it to the owner. Owners compare the ticket with the one they armed last, so
//! a ticket that was already in flight when its timer got cancelled is
//! recognised as stale and ignored.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, ManualClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerTicket(pub u64);

pub trait Scheduler: Send + Sync {
    /// Deliver `ticket` once `after` has elapsed unless the returned token is
    /// cancelled first.
    fn schedule(&self, after: Duration, ticket: TimerTicket) -> CancellationToken;
}

/// Timers backed by `tokio::time::sleep`; expired tickets are sent on a channel.
pub struct TokioScheduler {
    runtime: Handle,
    fired_tx: mpsc::UnboundedSender<TimerTicket>,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> (Self, mpsc::UnboundedReceiver<TimerTicket>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (Self { runtime, fired_tx }, fired_rx)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, after: Duration, ticket: TimerTicket) -> CancellationToken {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let fired_tx = self.fired_tx.clone();

        self.runtime.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(after) => {
                    let _ = fired_tx.send(ticket);
                }
                _ = cancelled.cancelled() => {}
            }
        });

        token
    }
}

struct PendingTimer {
    deadline: DateTime<Utc>,
    ticket: TimerTicket,
    token: CancellationToken,
}

/// Scheduler driven by a `ManualClock`. Nothing fires until the test advances
/// time and collects the due tickets.
pub struct VirtualScheduler {
    clock: ManualClock,
    pending: Mutex<Vec<PendingTimer>>,
}

impl VirtualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Move the clock forward and return the tickets that came due, earliest first.
    pub fn advance(&self, by: chrono::Duration) -> Vec<TimerTicket> {
        self.clock.advance(by);
        self.fire_due()
    }

    pub fn fire_due(&self) -> Vec<TimerTicket> {
        let now = self.clock.now();
        let mut pending = self.lock_pending();
        pending.retain(|timer| !timer.token.is_cancelled());

        let mut due: Vec<PendingTimer> = Vec::new();
        let mut index = 0;
        while index < pending.len() {
            if pending[index].deadline <= now {
                due.push(pending.remove(index));
            } else {
                index += 1;
            }
        }

        due.sort_by_key(|timer| timer.deadline);
        due.into_iter().map(|timer| timer.ticket).collect()
    }

    pub fn armed_count(&self) -> usize {
        self.lock_pending()
            .iter()
            .filter(|timer| !timer.token.is_cancelled())
            .count()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<PendingTimer>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&self, after: Duration, ticket: TimerTicket) -> CancellationToken {
        let token = CancellationToken::new();
        let after_ms = i64::try_from(after.as_millis()).unwrap_or(i64::MAX);
        let deadline = self.clock.now() + chrono::Duration::milliseconds(after_ms);

        self.lock_pending().push(PendingTimer {
            deadline,
            ticket,
            token: token.clone(),
        });

        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
    }

    #[test]
    fn virtual_timer_fires_at_deadline_not_before() {
        let clock = clock();
        let scheduler = VirtualScheduler::new(clock.clone());
        scheduler.schedule(Duration::from_secs(30), TimerTicket(1));

        assert!(scheduler.advance(chrono::Duration::seconds(29)).is_empty());
        assert_eq!(scheduler.advance(chrono::Duration::seconds(1)), vec![TimerTicket(1)]);
        assert!(scheduler.advance(chrono::Duration::seconds(60)).is_empty());
    }

    #[test]
    fn cancelled_virtual_timer_never_fires() {
        let scheduler = VirtualScheduler::new(clock());
        let token = scheduler.schedule(Duration::from_secs(5), TimerTicket(7));
        assert_eq!(scheduler.armed_count(), 1);

        token.cancel();
        assert_eq!(scheduler.armed_count(), 0);
        assert!(scheduler.advance(chrono::Duration::seconds(10)).is_empty());
    }

    #[test]
    fn due_tickets_come_back_in_deadline_order() {
        let scheduler = VirtualScheduler::new(clock());
        scheduler.schedule(Duration::from_secs(20), TimerTicket(2));
        scheduler.schedule(Duration::from_secs(10), TimerTicket(1));

        assert_eq!(
            scheduler.advance(chrono::Duration::seconds(30)),
            vec![TimerTicket(1), TimerTicket(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_delivers_ticket() {
        let (scheduler, mut fired) = TokioScheduler::new(Handle::current());
        scheduler.schedule(Duration::from_secs(30), TimerTicket(3));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(fired.recv().await, Some(TimerTicket(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_tokio_timer_stays_silent() {
        let (scheduler, mut fired) = TokioScheduler::new(Handle::current());
        let token = scheduler.schedule(Duration::from_secs(30), TimerTicket(4));
        token.cancel();

        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert!(fired.try_recv().is_err());
    }
}
