use crate::error::PollError;
use crate::models::{Group, Poll, PollEntity, PollOption, PollState, Vote};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Reactive access to polls plus the mutations the detail view may request.
#[async_trait]
pub trait PollRepository<P: PollEntity>: Send + Sync {
    /// Emits the current value first (`None` while the poll is unknown), then
    /// every replacement in order.
    fn observe_by_id(&self, id: &str) -> BoxStream<'static, Option<Arc<P>>>;

    async fn delete(&self, poll: &P) -> Result<(), PollError>;

    /// Strips voter identities from every vote of the poll. The poll itself is
    /// left untouched, so no new poll value is emitted.
    async fn pseudoanonymize(&self, poll: &P) -> Result<(), PollError>;
}

pub trait GroupRepository: Send + Sync {
    fn observe_all(&self) -> BoxStream<'static, Vec<Group>>;
}

fn receiver_stream<T: Send + 'static>(rx: UnboundedReceiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct PollRecord {
    poll: Option<Arc<Poll>>,
    votes: Vec<Vote>,
    subscribers: Vec<UnboundedSender<Option<Arc<Poll>>>>,
}

impl PollRecord {
    fn publish(&mut self) {
        let current = self.poll.clone();
        self.subscribers.retain(|tx| tx.send(current.clone()).is_ok());
    }
}

#[derive(Default)]
struct GroupRecord {
    groups: Vec<Group>,
    subscribers: Vec<UnboundedSender<Vec<Group>>>,
}

/// In-memory store for polls, their votes and the group list.
///
/// Every subscriber gets its own channel, so emissions reach each of them in
/// the order they were published.
#[derive(Default)]
pub struct Database {
    polls: Mutex<HashMap<String, PollRecord>>,
    groups: Mutex<GroupRecord>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    // Insert or replace a poll and emit it to its subscribers
    pub fn save_poll(&self, poll: Poll) -> Arc<Poll> {
        let poll = Arc::new(poll);
        let mut polls = lock(&self.polls);
        let record = polls.entry(poll.id.clone()).or_default();
        record.poll = Some(Arc::clone(&poll));
        record.publish();
        info!("Saved poll {} in state {:?}", poll.id, poll.state);
        poll
    }

    pub fn get_poll(&self, poll_id: &str) -> Result<Arc<Poll>, PollError> {
        lock(&self.polls)
            .get(poll_id)
            .and_then(|record| record.poll.clone())
            .ok_or_else(|| PollError::NotFound(poll_id.to_string()))
    }

    pub fn set_state(&self, poll_id: &str, state: PollState) -> Result<Arc<Poll>, PollError> {
        let current = self.get_poll(poll_id)?;
        Ok(self.save_poll(current.in_state(state)))
    }

    // Fill the options slot without emitting a new poll value
    pub fn populate_options(&self, poll_id: &str, options: Vec<PollOption>) -> Result<(), PollError> {
        let poll = self.get_poll(poll_id)?;
        debug!("Populating {} option(s) for poll {}", options.len(), poll_id);
        poll.options.populate(options);
        Ok(())
    }

    pub fn save_vote(&self, poll_id: &str, vote: Vote) -> Result<(), PollError> {
        let mut polls = lock(&self.polls);
        match polls.get_mut(poll_id) {
            Some(record) if record.poll.is_some() => {
                record.votes.push(vote);
                Ok(())
            }
            _ => Err(PollError::NotFound(poll_id.to_string())),
        }
    }

    pub fn get_poll_votes(&self, poll_id: &str) -> Vec<Vote> {
        lock(&self.polls)
            .get(poll_id)
            .map(|record| record.votes.clone())
            .unwrap_or_default()
    }

    pub fn set_groups(&self, groups: Vec<Group>) {
        let mut record = lock(&self.groups);
        record.groups = groups;
        let current = record.groups.clone();
        record.subscribers.retain(|tx| tx.send(current.clone()).is_ok());
    }

    /// Number of poll subscriptions that are still open.
    pub fn subscriber_count(&self, poll_id: &str) -> usize {
        lock(&self.polls)
            .get(poll_id)
            .map(|record| record.subscribers.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PollRepository<Poll> for Database {
    fn observe_by_id(&self, id: &str) -> BoxStream<'static, Option<Arc<Poll>>> {
        let (tx, rx) = unbounded_channel();
        let mut polls = lock(&self.polls);
        let record = polls.entry(id.to_string()).or_default();
        if tx.send(record.poll.clone()).is_ok() {
            record.subscribers.push(tx);
        }
        receiver_stream(rx)
    }

    async fn delete(&self, poll: &Poll) -> Result<(), PollError> {
        let mut polls = lock(&self.polls);
        let record = polls
            .get_mut(&poll.id)
            .filter(|record| record.poll.is_some())
            .ok_or_else(|| PollError::NotFound(poll.id.clone()))?;
        record.poll = None;
        record.votes.clear();
        record.publish();
        info!("Deleted poll {}", poll.id);
        Ok(())
    }

    async fn pseudoanonymize(&self, poll: &Poll) -> Result<(), PollError> {
        let mut polls = lock(&self.polls);
        let record = polls
            .get_mut(&poll.id)
            .filter(|record| record.poll.is_some())
            .ok_or_else(|| PollError::NotFound(poll.id.clone()))?;
        for vote in record.votes.iter_mut() {
            vote.user = None;
        }
        info!("Anonymized {} vote(s) of poll {}", record.votes.len(), poll.id);
        Ok(())
    }
}

impl GroupRepository for Database {
    fn observe_all(&self) -> BoxStream<'static, Vec<Group>> {
        let (tx, rx) = unbounded_channel();
        let mut record = lock(&self.groups);
        if tx.send(record.groups.clone()).is_ok() {
            record.subscribers.push(tx);
        }
        receiver_stream(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, VoteValue};

    fn poll(id: &str) -> Poll {
        Poll::new("Budget".to_string(), PollState::Started).with_id(id)
    }

    #[tokio::test]
    async fn observer_sees_absent_then_every_version() {
        let db = Database::new();
        let mut updates = db.observe_by_id("42");

        db.save_poll(poll("42"));
        db.set_state("42", PollState::Finished).unwrap();

        assert!(updates.next().await.unwrap().is_none());
        assert_eq!(updates.next().await.unwrap().unwrap().state, PollState::Started);
        assert_eq!(updates.next().await.unwrap().unwrap().state, PollState::Finished);
    }

    #[tokio::test]
    async fn late_observer_starts_with_current_value() {
        let db = Database::new();
        db.save_poll(poll("42"));

        let mut updates = db.observe_by_id("42");
        assert_eq!(updates.next().await.unwrap().unwrap().id, "42");
    }

    #[tokio::test]
    async fn delete_emits_absent_and_fails_the_second_time() {
        let db = Database::new();
        let saved = db.save_poll(poll("42"));
        let mut updates = db.observe_by_id("42");
        updates.next().await;

        db.delete(&*saved).await.unwrap();
        assert!(updates.next().await.unwrap().is_none());
        assert_eq!(db.delete(&*saved).await, Err(PollError::NotFound("42".to_string())));
    }

    #[tokio::test]
    async fn pseudoanonymize_strips_users_only() {
        let db = Database::new();
        let saved = db.save_poll(poll("42"));
        let user = User {
            id: "7".to_string(),
            username: "bob".to_string(),
        };
        db.save_vote("42", Vote::new(Some(user), "o1", VoteValue::Yes)).unwrap();

        db.pseudoanonymize(&*saved).await.unwrap();

        let votes = db.get_poll_votes("42");
        assert_eq!(votes.len(), 1);
        assert!(votes[0].user.is_none());
        assert_eq!(votes[0].value, VoteValue::Yes);
    }

    #[test]
    fn populate_options_does_not_emit() {
        let db = Database::new();
        let saved = db.save_poll(poll("42"));
        db.populate_options("42", vec![PollOption::new("Approve")]).unwrap();
        assert_eq!(saved.options.len(), 1);
        assert!(db.populate_options("missing", Vec::new()).is_err());
    }

    #[tokio::test]
    async fn group_observers_get_each_list() {
        let db = Database::new();
        let mut groups = db.observe_all();
        db.set_groups(vec![Group {
            id: "1".to_string(),
            name: "Delegates".to_string(),
        }]);

        assert!(groups.next().await.unwrap().is_empty());
        assert_eq!(groups.next().await.unwrap()[0].name, "Delegates");
    }

    #[test]
    fn dropped_streams_are_not_counted() {
        let db = Database::new();
        let updates = db.observe_by_id("42");
        assert_eq!(db.subscriber_count("42"), 1);
        drop(updates);
        assert_eq!(db.subscriber_count("42"), 0);
    }
}
