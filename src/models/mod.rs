use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use uuid::Uuid;

/// Read-only view of a poll as the detail controller needs it.
pub trait PollEntity: Send + Sync + 'static {
    fn id(&self) -> &str;
    fn state(&self) -> PollState;
    fn options(&self) -> &PollOptions;
}

/// Anything that can appear as a row in the per-voter table.
pub trait VoteData: Send + Sync + 'static {
    fn user(&self) -> Option<&User>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PollState {
    Created,
    Started,
    Finished,
    Published,
}

impl PollState {
    /// Finished and published polls carry a tally that may be charted.
    pub fn has_results(self) -> bool {
        matches!(self, PollState::Finished | PollState::Published)
    }
}

impl From<PollState> for u8 {
    fn from(state: PollState) -> u8 {
        match state {
            PollState::Created => 1,
            PollState::Started => 2,
            PollState::Finished => 3,
            PollState::Published => 4,
        }
    }
}

impl TryFrom<u8> for PollState {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(PollState::Created),
            2 => Ok(PollState::Started),
            3 => Ok(PollState::Finished),
            4 => Ok(PollState::Published),
            _ => Err(format!("Unknown poll state: {}", code)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteValue {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
    #[serde(rename = "A")]
    Abstain,
}

impl VoteValue {
    pub const ALL: [VoteValue; 3] = [VoteValue::Yes, VoteValue::No, VoteValue::Abstain];

    pub fn label(self) -> &'static str {
        match self {
            VoteValue::Yes => "Yes",
            VoteValue::No => "No",
            VoteValue::Abstain => "Abstain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub yes: f64,
    #[serde(default)]
    pub no: f64,
    #[serde(default)]
    pub abstain: f64,
}

impl PollOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            yes: 0.0,
            no: 0.0,
            abstain: 0.0,
        }
    }

    pub fn with_tally(mut self, yes: f64, no: f64, abstain: f64) -> Self {
        self.yes = yes;
        self.no = no;
        self.abstain = abstain;
        self
    }

    pub fn amount(&self, value: VoteValue) -> f64 {
        match value {
            VoteValue::Yes => self.yes,
            VoteValue::No => self.no,
            VoteValue::Abstain => self.abstain,
        }
    }
}

/// Options slot shared by every version of a poll.
///
/// The repository fills it on its own schedule, independently of emitting the
/// poll itself, so readers must expect it to be empty at first.
#[derive(Debug, Clone, Default)]
pub struct PollOptions {
    inner: Arc<RwLock<Vec<PollOption>>>,
}

impl PollOptions {
    pub fn new(options: Vec<PollOption>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(options)),
        }
    }

    // A writer that panicked still left a complete list behind
    fn read(&self) -> RwLockReadGuard<'_, Vec<PollOption>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn snapshot(&self) -> Vec<PollOption> {
        self.read().clone()
    }

    pub fn populate(&self, options: Vec<PollOption>) {
        match self.inner.write() {
            Ok(mut slot) => *slot = options,
            Err(poisoned) => *poisoned.into_inner() = options,
        }
    }

    #[cfg(test)]
    fn shares_slot_with(&self, other: &PollOptions) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Serialize for PollOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PollOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<PollOption>::deserialize(deserializer).map(PollOptions::new)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub state: PollState,
    #[serde(default)]
    pub options: PollOptions,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn new(title: String, state: PollState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            state,
            options: PollOptions::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// A new version of this poll in another state, sharing the options slot.
    pub fn in_state(&self, state: PollState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

impl PollEntity for Poll {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> PollState {
        self.state
    }

    fn options(&self) -> &PollOptions {
        &self.options
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub user: Option<User>,
    pub option_id: String,
    pub value: VoteValue,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

fn default_weight() -> f64 {
    1.0
}

impl Vote {
    pub fn new(user: Option<User>, option_id: impl Into<String>, value: VoteValue) -> Self {
        Self {
            user,
            option_id: option_id.into(),
            value,
            weight: default_weight(),
            timestamp: Utc::now(),
        }
    }
}

impl VoteData for Vote {
    fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_finished_and_published_have_results() {
        assert!(!PollState::Created.has_results());
        assert!(!PollState::Started.has_results());
        assert!(PollState::Finished.has_results());
        assert!(PollState::Published.has_results());
    }

    #[test]
    fn state_serializes_as_numeric_code() {
        assert_eq!(serde_json::to_string(&PollState::Finished).unwrap(), "3");
        let state: PollState = serde_json::from_str("4").unwrap();
        assert_eq!(state, PollState::Published);
        assert!(serde_json::from_str::<PollState>("9").is_err());
    }

    #[test]
    fn new_versions_share_the_options_slot() {
        let poll = Poll::new("Budget".to_string(), PollState::Started);
        let finished = poll.in_state(PollState::Finished);
        assert!(finished.options.shares_slot_with(&poll.options));
        assert!(finished.options.is_empty());

        poll.options.populate(vec![PollOption::new("Approve")]);
        assert_eq!(finished.options.len(), 1);
    }

    #[test]
    fn poisoned_slot_still_reports_its_options() {
        let options = PollOptions::new(vec![PollOption::new("Approve")]);
        let writer = options.clone();
        let result = std::thread::spawn(move || {
            let _guard = writer.inner.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(options.inner.is_poisoned());

        assert!(!options.is_empty());
        assert_eq!(options.len(), 1);
        assert_eq!(options.snapshot()[0].text, "Approve");

        options.populate(Vec::new());
        assert!(options.is_empty());
    }

    #[test]
    fn poll_round_trips_through_json_with_options() {
        let json = r#"{
            "id": "42",
            "title": "Budget",
            "state": 3,
            "options": [{"id": "o1", "text": "Approve", "yes": 5.0}],
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let poll: Poll = serde_json::from_str(json).unwrap();
        assert_eq!(poll.state, PollState::Finished);
        let options = poll.options.snapshot();
        assert_eq!(options[0].amount(VoteValue::Yes), 5.0);
        assert_eq!(options[0].amount(VoteValue::No), 0.0);
    }

    #[test]
    fn vote_value_uses_single_letter_codes() {
        assert_eq!(serde_json::to_string(&VoteValue::Abstain).unwrap(), "\"A\"");
    }
}
