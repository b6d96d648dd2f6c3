use crate::models::PollOptions;
use crate::tasks::LoadTicket;
use log::debug;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Re-checks the options slot every `every` until it is populated, then runs
/// `on_ready` once.
///
/// The task ends quietly without calling `on_ready` as soon as `ticket` goes
/// stale, so a waiter started for a superseded poll never reports readiness.
pub fn spawn_options_waiter<F>(
    options: PollOptions,
    every: Duration,
    ticket: LoadTicket,
    on_ready: F,
) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut checks: u64 = 0;

        loop {
            interval.tick().await;
            checks += 1;

            if !ticket.is_current() {
                debug!("Options waiter superseded after {} check(s)", checks);
                return;
            }
            if !options.is_empty() {
                debug!("Options arrived after {} check(s)", checks);
                on_ready();
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollOption;
    use crate::tasks::LoadCounter;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    const TICK: Duration = Duration::from_millis(1);

    fn counting() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let hook = {
            let fired = Arc::clone(&fired);
            move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        };
        (fired, hook)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_options_arrive() {
        let options = PollOptions::default();
        let counter = LoadCounter::default();
        let (fired, hook) = counting();

        let handle = spawn_options_waiter(options.clone(), TICK, counter.issue(), hook);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!handle.is_finished());

        options.populate(vec![PollOption::new("Approve")]);
        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_waiter_never_fires() {
        let options = PollOptions::default();
        let counter = LoadCounter::default();
        let (fired, hook) = counting();

        let handle = spawn_options_waiter(options.clone(), TICK, counter.issue(), hook);
        sleep(Duration::from_millis(5)).await;

        counter.issue();
        options.populate(vec![PollOption::new("Approve")]);

        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidated_counter_stops_pending_waiter() {
        let counter = LoadCounter::default();
        let (fired, hook) = counting();

        let handle = spawn_options_waiter(PollOptions::default(), TICK, counter.issue(), hook);
        counter.invalidate();

        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
