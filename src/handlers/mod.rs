mod mutation;
mod resolution;

pub use mutation::MutationOutcome;

use crate::config::DetailConfig;
use crate::db::{GroupRepository, PollRepository};
use crate::models::{Group, PollEntity, VoteData};
use crate::route::RouteSnapshot;
use crate::services::{ErrorReporter, LogErrorReporter, NoDialog, PollDialog, PromptService};
use crate::tasks::{LoadCounter, LoadTicket};
use crate::voting::{generate_chart_data, ChartData, ChartType, VoteTable};
use futures::stream::{BoxStream, StreamExt};
use log::{debug, info, warn};
use resolution::Resolver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Behavior a concrete kind of poll plugs into the detail controller.
///
/// Every hook defaults to a no-op. Hooks driven by the poll stream run on the
/// controller's subscription task after the held poll reference has been
/// updated. `on_deleted`, and `on_poll_loaded` after an anonymization, run on
/// the task awaiting `delete_poll` / `pseudoanonymize_poll`.
pub trait PollVariant: Send + Sync + Sized + 'static {
    type Poll: PollEntity;
    type Vote: VoteData;

    fn has_perms(&self) -> bool;

    fn chart_type(&self) -> ChartType;

    fn chart_data(&self, poll: &Self::Poll) -> ChartData {
        generate_chart_data(poll, self.chart_type())
    }

    /// Runs for every emitted poll and again after a successful anonymization.
    fn on_poll_loaded(&self, _detail: &PollDetail<Self>) {}

    fn on_poll_with_options_loaded(&self, _detail: &PollDetail<Self>) {}

    fn on_state_changed(&self, _detail: &PollDetail<Self>) {}

    fn on_deleted(&self, _detail: &PollDetail<Self>) {}
}

/// Collaborators the controller talks to.
pub struct Services<P: PollEntity> {
    pub polls: Arc<dyn PollRepository<P>>,
    pub groups: Arc<dyn GroupRepository>,
    pub prompt: Arc<dyn PromptService>,
    pub errors: Arc<dyn ErrorReporter>,
    pub dialog: Arc<dyn PollDialog<P>>,
}

impl<P: PollEntity> Services<P> {
    /// Reports errors to the log and has no edit dialog attached.
    pub fn with_defaults(
        polls: Arc<dyn PollRepository<P>>,
        groups: Arc<dyn GroupRepository>,
        prompt: Arc<dyn PromptService>,
    ) -> Self {
        Self {
            polls,
            groups,
            prompt,
            errors: Arc::new(LogErrorReporter),
            dialog: Arc::new(NoDialog),
        }
    }
}

impl<P: PollEntity> Clone for Services<P> {
    fn clone(&self) -> Self {
        Self {
            polls: Arc::clone(&self.polls),
            groups: Arc::clone(&self.groups),
            prompt: Arc::clone(&self.prompt),
            errors: Arc::clone(&self.errors),
            dialog: Arc::clone(&self.dialog),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct DetailState<K: PollVariant> {
    poll: RwLock<Option<Arc<K::Poll>>>,
    user_groups: RwLock<Vec<Group>>,
    chart: watch::Sender<Option<ChartData>>,
    votes: watch::Sender<Option<VoteTable<K::Vote>>>,
    loads: LoadCounter,
    torn_down: AtomicBool,
}

/// What the detail view currently shows. Cheap to clone, handed to every hook.
pub struct PollDetail<K: PollVariant> {
    inner: Arc<DetailState<K>>,
}

impl<K: PollVariant> Clone for PollDetail<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: PollVariant> PollDetail<K> {
    fn new() -> Self {
        Self {
            inner: Arc::new(DetailState {
                poll: RwLock::new(None),
                user_groups: RwLock::new(Vec::new()),
                chart: watch::channel(None).0,
                votes: watch::channel(None).0,
                loads: LoadCounter::default(),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    /// The most recently emitted poll, if any arrived yet.
    pub fn poll(&self) -> Option<Arc<K::Poll>> {
        match self.inner.poll.read() {
            Ok(poll) => poll.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn user_groups(&self) -> Vec<Group> {
        match self.inner.user_groups.read() {
            Ok(groups) => groups.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn chart_data(&self) -> Option<ChartData> {
        self.inner.chart.borrow().clone()
    }

    /// Late subscribers start with the latest chart.
    pub fn subscribe_chart(&self) -> watch::Receiver<Option<ChartData>> {
        self.inner.chart.subscribe()
    }

    /// Publishes the per-voter table, or hides it once every vote is anonymous.
    pub fn set_votes_data(&self, data: Vec<K::Vote>) {
        let table = VoteTable::project(data);
        if table.is_none() {
            debug!("Votes are anonymized, hiding the per-voter table");
        }
        self.inner.votes.send_replace(table);
    }

    pub fn votes_data(&self) -> Option<VoteTable<K::Vote>> {
        self.inner.votes.borrow().clone()
    }

    pub fn subscribe_votes(&self) -> watch::Receiver<Option<VoteTable<K::Vote>>> {
        self.inner.votes.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }

    fn replace_poll(&self, poll: Arc<K::Poll>) -> (Option<Arc<K::Poll>>, LoadTicket) {
        let previous = match self.inner.poll.write() {
            Ok(mut slot) => slot.replace(poll),
            Err(poisoned) => poisoned.into_inner().replace(poll),
        };
        (previous, self.inner.loads.issue())
    }

    fn set_user_groups(&self, groups: Vec<Group>) {
        match self.inner.user_groups.write() {
            Ok(mut slot) => *slot = groups,
            Err(poisoned) => *poisoned.into_inner() = groups,
        }
    }

    fn publish_chart(&self, data: ChartData) {
        self.inner.chart.send_replace(Some(data));
    }

    // Returns false if it was already torn down
    fn tear_down(&self) -> bool {
        if self.inner.torn_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.loads.invalidate();
        match self.inner.poll.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        self.inner.chart.send_replace(None);
        self.inner.votes.send_replace(None);
        true
    }
}

/// Keeps a [`PollDetail`] in sync with the repository for one poll.
///
/// Must be activated from inside a tokio runtime. Dropping the controller
/// tears it down.
pub struct PollDetailController<K: PollVariant> {
    variant: Arc<K>,
    detail: PollDetail<K>,
    services: Services<K::Poll>,
    config: DetailConfig,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
    options_waiter: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<K: PollVariant> PollDetailController<K> {
    pub fn new(variant: K, services: Services<K::Poll>, config: DetailConfig) -> Self {
        Self {
            variant: Arc::new(variant),
            detail: PollDetail::new(),
            services,
            config,
            subscriptions: Mutex::new(Vec::new()),
            options_waiter: Arc::new(Mutex::new(None)),
        }
    }

    /// Resolves the poll id from the route and starts following the poll and
    /// the group list. Without an id only the groups are followed.
    pub fn activate(&self, route: &RouteSnapshot) {
        if self.detail.is_torn_down() {
            warn!("Ignoring activation of a torn down poll detail");
            return;
        }
        let mut subscriptions = lock(&self.subscriptions);
        if !subscriptions.is_empty() {
            warn!("Poll detail is already active");
            return;
        }

        match route.id() {
            Some(poll_id) => {
                let updates = self.services.polls.observe_by_id(poll_id);
                let resolver = Resolver::new(
                    Arc::clone(&self.variant),
                    self.detail.clone(),
                    self.config.options_retry,
                    Arc::clone(&self.options_waiter),
                );
                subscriptions.push(tokio::spawn(resolver.follow(poll_id.to_string(), updates)));
            }
            None => debug!("No poll id in route, nothing to follow"),
        }

        let detail = self.detail.clone();
        let mut groups = self.services.groups.observe_all();
        subscriptions.push(tokio::spawn(async move {
            while let Some(list) = groups.next().await {
                detail.set_user_groups(list);
            }
        }));
    }

    pub fn detail(&self) -> &PollDetail<K> {
        &self.detail
    }

    pub fn variant(&self) -> &K {
        &self.variant
    }

    pub fn has_perms(&self) -> bool {
        self.variant.has_perms()
    }

    pub fn chart_type(&self) -> ChartType {
        self.variant.chart_type()
    }

    pub fn group_observable(&self) -> BoxStream<'static, Vec<Group>> {
        self.services.groups.observe_all()
    }

    pub fn open_dialog(&self, poll: &K::Poll) {
        self.services.dialog.open_dialog(poll);
    }

    /// Releases every subscription and stops pending work. Idempotent.
    pub fn teardown(&self) {
        if !self.detail.tear_down() {
            return;
        }
        for handle in lock(&self.subscriptions).drain(..) {
            handle.abort();
        }
        if let Some(waiter) = lock(&self.options_waiter).take() {
            waiter.abort();
        }
        info!("Poll detail torn down");
    }
}

impl<K: PollVariant> Drop for PollDetailController<K> {
    fn drop(&mut self) {
        self.teardown();
    }
}
