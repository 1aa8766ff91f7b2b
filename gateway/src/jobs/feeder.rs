use std::time::Duration;

use rand::seq::SliceRandom;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::deferred::ActionListener;
use crate::store::{StoreClient, StoreError};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Donald", "Edsger", "Frances", "Grace", "Hedy", "Ivan",
    "Joan", "John", "Ken", "Katherine", "Leslie", "Margaret", "Niklaus", "Radia", "Robin",
    "Shafi", "Sophie", "Tim", "Whitfield", "Yukihiro",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Backus", "Dijkstra", "Goldwasser", "Hamilton", "Hopper", "Johnson", "Kay",
    "Knuth", "Lamport", "Liskov", "Lovelace", "McCarthy", "Milner", "Perlman", "Ritchie",
    "Shannon", "Sutherland", "Thompson", "Turing", "Wilson", "Wirth",
];

#[derive(Debug, Clone)]
pub(crate) struct SyntheticDocument {
    pub first_name: String,
    pub last_name: String,
}

impl SyntheticDocument {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            first_name: pick(FIRST_NAMES, &mut rng),
            last_name: pick(LAST_NAMES, &mut rng),
        }
    }

    fn to_value(&self) -> Value {
        serde_json::json!({
            "first_name": self.first_name,
            "last_name": self.last_name,
        })
    }
}

fn pick(names: &[&str], rng: &mut impl rand::Rng) -> String {
    names.choose(rng).copied().unwrap_or("Anonymous").to_string()
}

/// Logs the outcome of a single feeder write.
struct WriteListener {
    document: SyntheticDocument,
    tick: u64,
}

impl ActionListener<String> for WriteListener {
    fn on_response(self, id: String) {
        tracing::debug!(
            tick = self.tick,
            id = %id,
            first_name = %self.document.first_name,
            last_name = %self.document.last_name,
            "added synthetic document"
        );
    }

    fn on_failure(self, error: StoreError) {
        tracing::error!(
            tick = self.tick,
            first_name = %self.document.first_name,
            last_name = %self.document.last_name,
            error = %error,
            "failed to insert synthetic document"
        );
    }
}

#[derive(Debug)]
pub(crate) enum FeederMessage {
    Tick,
}

pub(crate) struct FeederActor;

pub(crate) struct FeederArgs {
    pub store: StoreClient,
    pub interval: Duration,
}

pub(crate) struct FeederState {
    store: StoreClient,
    interval: Duration,
    ticks: u64,
    timer: Option<JoinHandle<()>>,
}

impl Actor for FeederActor {
    type Msg = FeederMessage;
    type State = FeederState;
    type Arguments = FeederArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(FeederState {
            store: args.store,
            interval: args.interval,
            ticks: 0,
            timer: None,
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.timer = Some(spawn_timer(myself, state.interval));
        tracing::info!(
            interval_secs = state.interval.as_secs_f64(),
            "synthetic feeder started"
        );
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        tracing::info!(ticks = state.ticks, "synthetic feeder stopped");
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            FeederMessage::Tick => {
                state.ticks += 1;
                let document = SyntheticDocument::generate();
                let id = Uuid::new_v4().to_string();
                let body = document.to_value();
                state.store.index_async(
                    id,
                    body,
                    WriteListener {
                        document,
                        tick: state.ticks,
                    },
                );
            }
        }
        Ok(())
    }
}

/// Fixed-delay timer: the first tick lands one period after start, and a late
/// tick pushes the following ones back instead of bursting.
fn spawn_timer(actor: ActorRef<FeederMessage>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if actor.cast(FeederMessage::Tick).is_err() {
                break;
            }
        }
    })
}
