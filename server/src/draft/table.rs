use std::{collections::HashMap, sync::Arc};

use rand::Rng;
use tokio::{sync::mpsc, task::JoinSet};
use uuid::Uuid;

use crate::{
    cards::Card,
    catalog::SetData,
    config::SetRules,
    err,
    error::{ConfigError, Error, Res},
};

use super::{
    observer::DraftObserver,
    packs::BoosterGenerator,
    seat::{self, Seat, SeatContext, SeatEvent, SeatHandle},
};

/// Final pools, keyed by seat.
pub type Pools = HashMap<Uuid, Vec<Card>>;

/// A ring of seats drafting one set. Seat `i` passes left to seat `i - 1`
/// and right to seat `i + 1`, wrapping around.
pub struct DraftTable {
    id: Uuid,
    set: Arc<SetData>,
    rules: SetRules,
    rounds: usize,
    seats: Vec<Seat>,
    handles: Vec<SeatHandle>,
}

impl DraftTable {
    pub fn form(
        id: Uuid,
        players: &[Uuid],
        set: Arc<SetData>,
        table_size: usize,
        rules: SetRules,
        rounds: usize,
        observer: Arc<dyn DraftObserver>,
    ) -> Res<Self> {
        if table_size == 0 || rounds == 0 {
            return err("A draft needs at least one seat and one round.");
        }
        if players.len() != table_size {
            return err(format!(
                "Table needs {table_size} players, {} joined.",
                players.len()
            ));
        }
        for (i, player) in players.iter().enumerate() {
            if players[..i].contains(player) {
                return err(format!("Player {player} joined twice."));
            }
        }

        let context = SeatContext {
            set: set.code.clone(),
            rules: rules.clone(),
            rounds,
            observer,
        };

        let (handles, mailboxes): (Vec<_>, Vec<_>) =
            players.iter().map(|&player| seat::channel(player)).unzip();
        let n = handles.len();
        let seats = mailboxes
            .into_iter()
            .enumerate()
            .map(|(i, mailbox)| {
                let left = handles[(i + n - 1) % n].clone();
                let right = handles[(i + 1) % n].clone();
                Seat::new(handles[i].id(), mailbox, left, right, context.clone())
            })
            .collect();

        Ok(Self {
            id,
            set,
            rules,
            rounds,
            seats,
            handles,
        })
    }

    /// Handles in seating order, for sending commands to seats.
    pub fn handles(&self) -> &[SeatHandle] {
        &self.handles
    }

    /// Open every round's pack for every seat and queue them with the seat
    /// that opened them, in round order. Every pack at the table has the
    /// size of the first one opened.
    pub fn seed_packs<R: Rng + ?Sized>(&self, rng: &mut R) -> Res<()> {
        let generator = BoosterGenerator::new(&self.set, &self.rules);
        let mut size = None;
        for handle in &self.handles {
            for round in 1..=self.rounds {
                let pack = generator.generate_sized(rng, round, size)?;
                if pack.is_empty() {
                    return Err(ConfigError::EmptyPack {
                        set: self.set.code.clone(),
                    }
                    .into());
                }
                size = Some(pack.len());
                handle.offer(pack.with_origin(handle.id()))?;
            }
        }
        Ok(())
    }

    /// Run every seat until each has a full pool. Seats still running when
    /// this returns are stopped.
    pub async fn start(self) -> Res<Pools> {
        tracing::info!(
            "Starting {} draft {} with {} seats.",
            self.set.code,
            self.id,
            self.handles.len()
        );

        let (events, mut finished) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        for seat in self.seats {
            tasks.spawn(seat.run(events.clone()));
        }
        drop(events);

        let mut pools = HashMap::new();
        while pools.len() < self.handles.len() {
            match finished.recv().await {
                Some(SeatEvent::Finished { seat, pool }) => {
                    tracing::debug!("Draft {}: seat {seat} done.", self.id);
                    pools.insert(seat, pool);
                }
                Some(SeatEvent::Failed { seat, error }) => {
                    tracing::error!("Draft {} abandoned, seat {seat} failed.", self.id);
                    tasks.abort_all();
                    return Err(error);
                }
                None => {
                    tasks.abort_all();
                    return Err(Error::Protocol(format!(
                        "seats of draft {} stopped without finishing",
                        self.id
                    )));
                }
            }
        }

        tasks.shutdown().await;
        tracing::info!("Draft {} complete.", self.id);
        Ok(pools)
    }
}
