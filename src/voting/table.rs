use crate::models::VoteData;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// True when no record in the batch names its voter.
pub fn is_anonymized<D: VoteData>(data: &[D]) -> bool {
    data.iter().all(|vote| vote.user().is_none())
}

/// Snapshot of the per-voter table, present only while voters are identifiable.
#[derive(Debug)]
pub struct VoteTable<D> {
    rows: Arc<Vec<D>>,
}

impl<D> Clone for VoteTable<D> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<D: VoteData> VoteTable<D> {
    /// Returns `None` once the votes were anonymized, which hides the table.
    pub fn project(data: Vec<D>) -> Option<Self> {
        if is_anonymized(&data) {
            None
        } else {
            Some(Self {
                rows: Arc::new(data),
            })
        }
    }

    pub fn rows(&self) -> &[D] {
        &self.rows
    }

    /// One-shot stream of the snapshot. Each call starts over with the same rows.
    pub fn stream(&self) -> BoxStream<'static, Arc<Vec<D>>> {
        stream::once(futures::future::ready(Arc::clone(&self.rows))).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, Vote, VoteValue};

    fn alice() -> Option<User> {
        Some(User {
            id: "1".to_string(),
            username: "alice".to_string(),
        })
    }

    #[test]
    fn anonymous_batch_is_suppressed() {
        let votes = vec![
            Vote::new(None, "o1", VoteValue::Yes),
            Vote::new(None, "o1", VoteValue::No),
        ];
        assert!(VoteTable::project(votes).is_none());
    }

    #[test]
    fn empty_batch_counts_as_anonymized() {
        assert!(VoteTable::<Vote>::project(Vec::new()).is_none());
    }

    #[test]
    fn one_identified_voter_keeps_the_whole_list() {
        let votes = vec![
            Vote::new(None, "o1", VoteValue::Yes),
            Vote::new(alice(), "o1", VoteValue::Abstain),
        ];
        let table = VoteTable::project(votes.clone()).expect("table should be visible");
        assert_eq!(table.rows(), votes.as_slice());
    }

    #[tokio::test]
    async fn stream_restarts_with_the_same_snapshot() {
        let table = VoteTable::project(vec![Vote::new(alice(), "o1", VoteValue::Yes)]).unwrap();

        let first: Vec<_> = table.stream().collect().await;
        let second: Vec<_> = table.stream().collect().await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }
}
