use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

use crate::events::{AppEvent, IndicatorId};

/// Starts repeating animation tasks for typing indicators
pub trait Scheduler {
    fn start(&self, period: Duration, indicator: IndicatorId) -> RepeatingTask;
}

/// Handle to a repeating task. Cancelling is synchronous: once `cancel`
/// returns no further tick is delivered. Dropping the handle cancels it.
#[derive(Debug)]
pub struct RepeatingTask {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl RepeatingTask {
    pub fn new(cancelled: Arc<AtomicBool>, abort: Option<AbortHandle>) -> Self {
        Self { cancelled, abort }
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Delivers `AppEvent::IndicatorTick` into the application event channel
#[derive(Clone)]
pub struct TokioScheduler {
    events: mpsc::UnboundedSender<AppEvent>,
}

impl TokioScheduler {
    pub fn new(events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { events }
    }
}

impl Scheduler for TokioScheduler {
    fn start(&self, period: Duration, indicator: IndicatorId) -> RepeatingTask {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                if events.send(AppEvent::IndicatorTick(indicator)).is_err() {
                    break;
                }
            }
            trace!(indicator = indicator.0, "indicator task stopped");
        });

        RepeatingTask::new(cancelled, Some(handle.abort_handle()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticks_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);
        let mut task = scheduler.start(Duration::from_millis(5), IndicatorId(7));

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(first, Some(AppEvent::IndicatorTick(IndicatorId(7))));

        task.cancel();
        assert!(task.is_cancelled());

        // drain anything that was already queued, then nothing new arrives
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);
        drop(scheduler.start(Duration::from_millis(5), IndicatorId(1)));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }
}
