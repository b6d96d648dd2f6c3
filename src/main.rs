use log::{error, info, warn};
use poll_detail::config::parse_flag;
use poll_detail::db::Database;
use poll_detail::models::{Group, Poll, PollOption, PollOptions, PollState, User, Vote, VoteValue};
use poll_detail::services::AutoPrompt;
use poll_detail::voting::{vote_style, ChartType};
use poll_detail::{DetailConfig, PollDetail, PollDetailController, PollError, PollVariant, RouteSnapshot, Services};
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const SETTLE: Duration = Duration::from_millis(20);

// Motion-style poll: one yes/no/abstain tally per option
struct MotionPollDetail {
    database: Arc<Database>,
}

impl PollVariant for MotionPollDetail {
    type Poll = Poll;
    type Vote = Vote;

    fn has_perms(&self) -> bool {
        true
    }

    fn chart_type(&self) -> ChartType {
        ChartType::HorizontalBar
    }

    fn on_poll_loaded(&self, detail: &PollDetail<Self>) {
        if let Some(poll) = detail.poll() {
            info!("Loaded poll {} ({:?})", poll.title, poll.state);
            detail.set_votes_data(self.database.get_poll_votes(&poll.id));
        }
    }

    fn on_poll_with_options_loaded(&self, detail: &PollDetail<Self>) {
        if let Some(poll) = detail.poll() {
            info!("Poll {} has {} option(s)", poll.id, poll.options.len());
        }
    }

    fn on_state_changed(&self, detail: &PollDetail<Self>) {
        if let Some(poll) = detail.poll() {
            info!("Poll {} is now {:?}", poll.id, poll.state);
        }
    }

    fn on_deleted(&self, _detail: &PollDetail<Self>) {
        info!("Poll deleted, leaving the detail view");
    }
}

#[derive(Deserialize)]
struct Fixture {
    poll: Poll,
    #[serde(default)]
    votes: Vec<Vote>,
    #[serde(default)]
    groups: Vec<Group>,
}

fn load_fixture(poll_id: &str) -> Result<Fixture, Box<dyn std::error::Error + Send + Sync>> {
    if let Ok(path) = env::var("POLL_FIXTURE") {
        let raw = std::fs::read_to_string(&path)?;
        return Ok(serde_json::from_str(&raw)?);
    }

    let poll = Poll::new("Adopt the budget".to_string(), PollState::Finished).with_id(poll_id);
    let budget = PollOption::new("Budget 2025").with_tally(12.0, 3.0, 2.0);
    let budget_id = budget.id.clone();
    poll.options
        .populate(vec![budget, PollOption::new("Amendment A").with_tally(7.0, 8.0, 2.0)]);
    let votes = ["ada", "grace"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let user = User {
                id: (i + 1).to_string(),
                username: name.to_string(),
            };
            Vote::new(Some(user), budget_id.as_str(), VoteValue::Yes)
        })
        .collect();
    let groups = vec![Group {
        id: "1".to_string(),
        name: "Delegates".to_string(),
    }];
    Ok(Fixture { poll, votes, groups })
}

fn auto_confirm() -> Result<bool, PollError> {
    match env::var("POLL_AUTO_CONFIRM") {
        Ok(value) => parse_flag("POLL_AUTO_CONFIRM", &value),
        Err(_) => Ok(true),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match DetailConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    let answer = match auto_confirm() {
        Ok(answer) => answer,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let path = env::var("POLL_ROUTE").unwrap_or_else(|_| "polls/42".to_string());
    let route = match RouteSnapshot::from_path(&config.route_pattern, &path) {
        Ok(route) => route,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    let Some(poll_id) = route.id().map(str::to_string) else {
        warn!("Route {} does not name a poll", path);
        return;
    };

    let mut fixture = match load_fixture(&poll_id) {
        Ok(fixture) => fixture,
        Err(e) => {
            error!("Failed to load poll fixture: {}", e);
            return;
        }
    };

    // Options arrive on their own, after the poll itself
    let pending_options = fixture.poll.options.snapshot();
    fixture.poll.options = PollOptions::default();
    fixture.poll.id = poll_id.clone();

    let database = Arc::new(Database::new());
    database.set_groups(fixture.groups);
    database.save_poll(fixture.poll);
    for vote in fixture.votes {
        if let Err(e) = database.save_vote(&poll_id, vote) {
            error!("Failed to save vote: {}", e);
        }
    }

    let services: Services<Poll> =
        Services::with_defaults(database.clone(), database.clone(), Arc::new(AutoPrompt { answer }));
    let variant = MotionPollDetail {
        database: Arc::clone(&database),
    };
    let controller = PollDetailController::new(variant, services, config);
    controller.activate(&route);
    sleep(SETTLE).await;

    if let Err(e) = database.populate_options(&poll_id, pending_options) {
        error!("Failed to populate options: {}", e);
    }
    sleep(SETTLE).await;

    // Publishing the results emits a new version and redraws the chart
    if let Err(e) = database.set_state(&poll_id, PollState::Published) {
        error!("Failed to publish poll: {}", e);
    }
    sleep(SETTLE).await;

    let detail = controller.detail();
    if let Some(chart) = detail.chart_data() {
        info!("Chart ({:?}): {:?}, {} vote(s) in total", chart.chart_type, chart.labels, chart.total());
    }
    info!("{} group(s) cached", detail.user_groups().len());
    if let Some(table) = detail.votes_data() {
        for vote in table.rows() {
            let style = vote_style(vote.value);
            let voter = vote.user.as_ref().map(|user| user.username.as_str()).unwrap_or("-");
            info!("{} voted {} [{} / {}]", voter, vote.value.label(), style.css, style.icon);
        }
    }

    let outcome = controller.pseudoanonymize_poll().await;
    info!("Anonymize: {:?}, per-voter table visible: {}", outcome, detail.votes_data().is_some());

    let outcome = controller.delete_poll().await;
    info!("Delete: {:?}", outcome);

    controller.teardown();
}
