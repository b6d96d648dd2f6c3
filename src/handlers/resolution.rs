use super::{lock, PollDetail, PollVariant};
use crate::models::PollEntity;
use crate::tasks::{spawn_options_waiter, LoadTicket};
use futures::stream::{BoxStream, StreamExt};
use log::{debug, info};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Applies each emitted poll to the detail, one emission at a time.
pub(super) struct Resolver<K: PollVariant> {
    variant: Arc<K>,
    detail: PollDetail<K>,
    options_retry: Duration,
    options_waiter: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<K: PollVariant> Resolver<K> {
    pub(super) fn new(
        variant: Arc<K>,
        detail: PollDetail<K>,
        options_retry: Duration,
        options_waiter: Arc<Mutex<Option<JoinHandle<()>>>>,
    ) -> Self {
        Self {
            variant,
            detail,
            options_retry,
            options_waiter,
        }
    }

    pub(super) async fn follow(self, poll_id: String, mut updates: BoxStream<'static, Option<Arc<K::Poll>>>) {
        info!("Following poll {}", poll_id);
        while let Some(update) = updates.next().await {
            match update {
                Some(poll) => self.apply(poll),
                None => debug!("Poll {} is not available yet", poll_id),
            }
        }
        debug!("Update stream for poll {} ended", poll_id);
    }

    fn apply(&self, poll: Arc<K::Poll>) {
        let (previous, ticket) = self.detail.replace_poll(Arc::clone(&poll));
        self.variant.on_poll_loaded(&self.detail);

        if let Some(previous) = previous {
            if previous.state() != poll.state() {
                info!("Poll {} moved from {:?} to {:?}", poll.id(), previous.state(), poll.state());
                self.variant.on_state_changed(&self.detail);
            }
        }

        self.wait_for_options(&poll, ticket.clone());

        if poll.state().has_results() {
            self.schedule_chart(poll, ticket);
        }
    }

    fn wait_for_options(&self, poll: &Arc<K::Poll>, ticket: LoadTicket) {
        let stale = lock(&self.options_waiter).take();
        if let Some(stale) = stale {
            stale.abort();
        }

        if !poll.options().is_empty() {
            self.variant.on_poll_with_options_loaded(&self.detail);
            return;
        }

        debug!("Options of poll {} not loaded yet, waiting", poll.id());
        let variant = Arc::clone(&self.variant);
        let detail = self.detail.clone();
        let waiter = spawn_options_waiter(poll.options().clone(), self.options_retry, ticket, move || {
            variant.on_poll_with_options_loaded(&detail)
        });
        *lock(&self.options_waiter) = Some(waiter);
    }

    // Chart work runs on the next scheduling turn, after the current emission
    // has been fully applied.
    fn schedule_chart(&self, poll: Arc<K::Poll>, ticket: LoadTicket) {
        let variant = Arc::clone(&self.variant);
        let detail = self.detail.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            if !ticket.is_current() {
                debug!("Skipping chart for superseded version of poll {}", poll.id());
                return;
            }
            let data = variant.chart_data(&poll);
            detail.publish_chart(data);
        });
    }
}
