use std::{collections::HashMap, sync::Arc};

use rand::{seq::SliceRandom, thread_rng};
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use crate::{
    cards::Card,
    catalog::CardCatalog,
    config::DraftConfig,
    err,
    error::Res,
};

use super::{
    observer::DraftObserver,
    seat::SeatHandle,
    table::{DraftTable, Pools},
    view::{PackView, PoolView},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Phase {
    Lobby,
    Drafting,
    Finished,
}

struct DraftEntry {
    id: Uuid,
    owner: Uuid,
    set: String,
    max_players: usize,
    players: Vec<Uuid>,
    phase: Phase,
    seats: HashMap<Uuid, SeatHandle>,
    pools: Pools,
    task: Option<JoinHandle<()>>,
}

impl DraftEntry {
    fn summary(&self) -> DraftSummary {
        DraftSummary {
            id: self.id,
            owner: self.owner,
            set: self.set.clone(),
            max_players: self.max_players,
            players: self.players.clone(),
            phase: self.phase,
        }
    }

    fn active(&self) -> bool {
        self.phase != Phase::Finished
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct DraftSummary {
    pub id: Uuid,
    pub owner: Uuid,
    pub set: String,
    pub max_players: usize,
    pub players: Vec<Uuid>,
    pub phase: Phase,
}

/// Every draft the process knows about, from sign up until it is removed.
pub struct DraftServer {
    catalog: Arc<dyn CardCatalog>,
    config: DraftConfig,
    observer: Arc<dyn DraftObserver>,
    drafts: Mutex<HashMap<Uuid, DraftEntry>>,
}

impl DraftServer {
    pub fn new(
        catalog: Arc<dyn CardCatalog>,
        config: DraftConfig,
        observer: Arc<dyn DraftObserver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            config,
            observer,
            drafts: Mutex::new(HashMap::new()),
        })
    }

    /// Open sign ups for a draft of `set`. It fires when `max_players` have
    /// joined, or when the owner starts it.
    pub async fn create(
        &self,
        owner: Uuid,
        set: &str,
        max_players: Option<usize>,
    ) -> Res<DraftSummary> {
        let set = self.catalog.set_data(set)?.code.clone();
        let max_players = max_players.unwrap_or(self.config.table_size);
        if max_players == 0 {
            return err("A draft needs at least one player.");
        }

        let entry = DraftEntry {
            id: Uuid::new_v4(),
            owner,
            set,
            max_players,
            players: Vec::new(),
            phase: Phase::Lobby,
            seats: HashMap::new(),
            pools: HashMap::new(),
            task: None,
        };
        let summary = entry.summary();
        tracing::info!("Draft {} of {} opened by {owner}.", summary.id, summary.set);
        self.drafts.lock().await.insert(entry.id, entry);
        Ok(summary)
    }

    pub async fn summary(&self, draft: Uuid) -> Res<DraftSummary> {
        match self.drafts.lock().await.get(&draft) {
            Some(entry) => Ok(entry.summary()),
            None => err("No such draft."),
        }
    }

    pub async fn join(self: &Arc<Self>, draft: Uuid, player: Uuid) -> Res<DraftSummary> {
        let (set, players) = {
            let mut drafts = self.drafts.lock().await;
            if drafts
                .values()
                .any(|entry| entry.active() && entry.players.contains(&player))
            {
                return err("You cannot join more than one draft at a time.");
            }

            let Some(entry) = drafts.get_mut(&draft) else {
                return err("No such draft.");
            };
            if entry.phase != Phase::Lobby {
                return err("Draft already started.");
            }

            entry.players.push(player);
            if entry.players.len() < entry.max_players {
                return Ok(entry.summary());
            }
            entry.phase = Phase::Drafting;
            (entry.set.clone(), entry.players.clone())
        };

        match self.fire(draft, &set, players).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.reopen(draft, Some(player)).await;
                Err(e)
            }
        }
    }

    pub async fn leave(&self, draft: Uuid, player: Uuid) -> Res<DraftSummary> {
        let mut drafts = self.drafts.lock().await;
        let Some(entry) = drafts.get_mut(&draft) else {
            return err("No such draft.");
        };
        if entry.phase != Phase::Lobby {
            return err("Draft already started.");
        }
        let Some(position) = entry.players.iter().position(|p| *p == player) else {
            return err("You are not signed up for this draft.");
        };

        entry.players.remove(position);
        Ok(entry.summary())
    }

    /// Fire a draft before it is full. Only its owner may do this.
    pub async fn start(self: &Arc<Self>, draft: Uuid, requester: Uuid) -> Res<DraftSummary> {
        let (set, players) = {
            let mut drafts = self.drafts.lock().await;
            let Some(entry) = drafts.get_mut(&draft) else {
                return err("No such draft.");
            };
            if entry.owner != requester {
                return err("Only the player who created the draft can start it.");
            }
            if entry.phase != Phase::Lobby {
                return err("Draft already started.");
            }
            if entry.players.is_empty() {
                return err("Nobody has joined yet.");
            }
            entry.phase = Phase::Drafting;
            (entry.set.clone(), entry.players.clone())
        };

        match self.fire(draft, &set, players).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.reopen(draft, None).await;
                Err(e)
            }
        }
    }

    /// Forget a draft, stopping it if it is still running.
    pub async fn remove(&self, draft: Uuid) -> Res<()> {
        let Some(entry) = self.drafts.lock().await.remove(&draft) else {
            return err("No such draft.");
        };
        if let Some(task) = entry.task {
            task.abort();
        }
        tracing::info!("Draft {draft} removed.");
        Ok(())
    }

    /// Seat the players in a random order and start drafting. The entry is
    /// already marked as drafting, packs are opened without holding the
    /// registry lock.
    async fn fire(
        self: &Arc<Self>,
        draft: Uuid,
        set: &str,
        mut players: Vec<Uuid>,
    ) -> Res<DraftSummary> {
        let data = self.catalog.set_data(set)?;
        let rules = self.config.rules_for(set);
        players.shuffle(&mut thread_rng());

        let table = DraftTable::form(
            draft,
            &players,
            data,
            players.len(),
            rules,
            self.config.rounds,
            self.observer.clone(),
        )?;
        table.seed_packs(&mut thread_rng())?;

        let mut drafts = self.drafts.lock().await;
        let Some(entry) = drafts.get_mut(&draft) else {
            return err("No such draft.");
        };
        entry.seats = table
            .handles()
            .iter()
            .map(|handle| (handle.id(), handle.clone()))
            .collect();
        entry.players = players;

        let server = Arc::clone(self);
        entry.task = Some(tokio::spawn(async move {
            let result = table.start().await;
            server.finish(draft, result).await;
        }));
        Ok(entry.summary())
    }

    /// Put a draft that failed to fire back into its lobby.
    async fn reopen(&self, draft: Uuid, joined: Option<Uuid>) {
        if let Some(entry) = self.drafts.lock().await.get_mut(&draft) {
            entry.phase = Phase::Lobby;
            if let Some(player) = joined {
                entry.players.retain(|p| *p != player);
            }
        }
    }

    async fn finish(&self, draft: Uuid, result: Res<Pools>) {
        let mut drafts = self.drafts.lock().await;
        match result {
            Ok(pools) => {
                if let Some(entry) = drafts.get_mut(&draft) {
                    entry.phase = Phase::Finished;
                    entry.pools = pools;
                    entry.seats.clear();
                    entry.task = None;
                }
            }
            Err(e) => {
                tracing::error!("Draft {draft} failed: {e}");
                drafts.remove(&draft);
            }
        }
    }

    async fn seat_for(&self, player: Uuid) -> Res<SeatHandle> {
        let drafts = self.drafts.lock().await;
        match drafts
            .values()
            .filter(|entry| entry.phase == Phase::Drafting)
            .find_map(|entry| entry.seats.get(&player))
        {
            Some(seat) => Ok(seat.clone()),
            None => err("You are not in a draft right now!"),
        }
    }

    pub async fn pick(&self, player: Uuid, index: usize) -> Res<Card> {
        self.seat_for(player).await?.pick(index).await
    }

    pub async fn reserve(&self, player: Uuid, index: usize) -> Res<Vec<Card>> {
        self.seat_for(player).await?.reserve(index).await
    }

    pub async fn pack(&self, player: Uuid) -> Res<PackView> {
        self.seat_for(player).await?.pack().await
    }

    /// The player's pool in their running draft, or in a finished one.
    pub async fn pool(&self, player: Uuid) -> Res<PoolView> {
        if let Ok(seat) = self.seat_for(player).await {
            return seat.pool().await;
        }

        let drafts = self.drafts.lock().await;
        match drafts
            .values()
            .filter(|entry| entry.phase == Phase::Finished)
            .find_map(|entry| entry.pools.get(&player).map(|pool| (entry, pool)))
        {
            Some((entry, pool)) => Ok(PoolView::new(pool, &entry.set)),
            None => err("You are not in a draft right now!"),
        }
    }
}
