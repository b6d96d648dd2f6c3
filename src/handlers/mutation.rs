use super::{PollDetailController, PollVariant};
use crate::error::PollError;
use crate::models::PollEntity;
use log::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The user did not confirm; nothing was requested.
    Declined,
    Applied,
    /// Reported to the error channel.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Delete,
    Pseudoanonymize,
}

impl Mutation {
    fn title(self) -> &'static str {
        match self {
            Mutation::Delete => "Delete poll",
            Mutation::Pseudoanonymize => "Anonymize single votes",
        }
    }

    fn body(self) -> &'static str {
        match self {
            Mutation::Delete => "Do you really want to delete the selected poll?",
            Mutation::Pseudoanonymize => "Do you really want to anonymize all votes? This cannot be undone.",
        }
    }

    fn action(self) -> &'static str {
        match self {
            Mutation::Delete => "delete",
            Mutation::Pseudoanonymize => "anonymize",
        }
    }
}

impl<K: PollVariant> PollDetailController<K> {
    /// Deletes the poll after confirmation and runs `on_deleted`.
    pub async fn delete_poll(&self) -> MutationOutcome {
        self.mutate(Mutation::Delete).await
    }

    /// Anonymizes the votes after confirmation.
    ///
    /// The poll itself does not change, so no new value is emitted; instead
    /// `on_poll_loaded` runs again so the variant can reload its votes.
    pub async fn pseudoanonymize_poll(&self) -> MutationOutcome {
        self.mutate(Mutation::Pseudoanonymize).await
    }

    async fn mutate(&self, mutation: Mutation) -> MutationOutcome {
        let Some(poll) = self.detail.poll() else {
            self.services.errors.raise_error(&PollError::NotLoaded);
            return MutationOutcome::Failed;
        };

        if !self.services.prompt.open(mutation.title(), mutation.body()).await {
            info!("{} of poll {} declined", mutation.action(), poll.id());
            return MutationOutcome::Declined;
        }

        let result = match mutation {
            Mutation::Delete => self.services.polls.delete(&poll).await,
            Mutation::Pseudoanonymize => self.services.polls.pseudoanonymize(&poll).await,
        };

        match result {
            Ok(()) => {
                info!("{} of poll {} succeeded", mutation.action(), poll.id());
                if self.detail.is_torn_down() {
                    debug!("Poll detail torn down during {}, skipping hooks", mutation.action());
                    return MutationOutcome::Applied;
                }
                match mutation {
                    Mutation::Delete => self.variant.on_deleted(&self.detail),
                    Mutation::Pseudoanonymize => self.variant.on_poll_loaded(&self.detail),
                }
                MutationOutcome::Applied
            }
            Err(e) => {
                error!("Failed to {} poll {}: {}", mutation.action(), poll.id(), e);
                self.services.errors.raise_error(&e);
                MutationOutcome::Failed
            }
        }
    }
}
