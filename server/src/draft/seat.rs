use std::{cmp::Ordering, collections::VecDeque, sync::Arc};

use tokio::sync::{
    mpsc::{self, UnboundedReceiver, UnboundedSender},
    oneshot,
};
use uuid::Uuid;

use crate::{
    cards::{scryfall::cardlist_link, Card},
    config::SetRules,
    err,
    error::{Error, Res},
};

use super::{
    observer::DraftObserver,
    packs::Pack,
    view::{pack_cards, PackView, PoolView, SeatStatus},
};

/// Messages handled one at a time by a seat's task. Everything that touches
/// seat state goes through here.
pub enum SeatRequest {
    Offer(Pack),
    Pick {
        index: usize,
        reply: oneshot::Sender<Res<Card>>,
    },
    Reserve {
        index: usize,
        reply: oneshot::Sender<Res<Vec<Card>>>,
    },
    ShowPack(oneshot::Sender<PackView>),
    ShowPool(oneshot::Sender<PoolView>),
}

/// Sent to the table once when a seat's task ends.
#[derive(Debug)]
pub enum SeatEvent {
    Finished { seat: Uuid, pool: Vec<Card> },
    Failed { seat: Uuid, error: Error },
}

/// Sending side of a seat's mailbox. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SeatHandle {
    id: Uuid,
    chan: UnboundedSender<SeatRequest>,
}

impl SeatHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Hand a pack to this seat. Ownership of the pack moves to its queue.
    pub fn offer(&self, pack: Pack) -> Res<()> {
        self.chan
            .send(SeatRequest::Offer(pack))
            .map_err(|_| Error::SeatClosed(self.id))
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SeatRequest) -> Res<T> {
        let (reply, response) = oneshot::channel();
        self.chan
            .send(make(reply))
            .map_err(|_| Error::SeatClosed(self.id))?;
        response.await.map_err(|_| Error::SeatClosed(self.id))
    }

    /// Take the card at a 1-based position of the open pack.
    pub async fn pick(&self, index: usize) -> Res<Card> {
        self.request(|reply| SeatRequest::Pick { index, reply }).await?
    }

    /// Reserve the card at a 1-based position, returning all reservations.
    pub async fn reserve(&self, index: usize) -> Res<Vec<Card>> {
        self.request(|reply| SeatRequest::Reserve { index, reply }).await?
    }

    pub async fn pack(&self) -> Res<PackView> {
        self.request(SeatRequest::ShowPack).await
    }

    pub async fn pool(&self) -> Res<PoolView> {
        self.request(SeatRequest::ShowPool).await
    }
}

pub fn channel(id: Uuid) -> (SeatHandle, UnboundedReceiver<SeatRequest>) {
    let (chan, requests) = mpsc::unbounded_channel();
    (SeatHandle { id, chan }, requests)
}

/// Settings shared by every seat at a table.
#[derive(Clone)]
pub struct SeatContext {
    pub set: String,
    pub rules: SetRules,
    pub rounds: usize,
    pub observer: Arc<dyn DraftObserver>,
}

pub struct Seat {
    id: Uuid,
    context: SeatContext,
    pub(super) chan: UnboundedReceiver<SeatRequest>,
    pub(super) left: SeatHandle,
    pub(super) right: SeatHandle,

    /// Packs for the current round, or not yet looked at.
    inbound: VecDeque<Pack>,

    /// Packs seen to belong to a later round.
    deferred: VecDeque<Pack>,

    current: Option<Pack>,
    round: usize,
    sub_round: usize,
    picks: usize,
    reserved: VecDeque<Card>,
    pool: Vec<Card>,
    done: bool,
}

impl Seat {
    pub fn new(
        id: Uuid,
        chan: UnboundedReceiver<SeatRequest>,
        left: SeatHandle,
        right: SeatHandle,
        context: SeatContext,
    ) -> Self {
        Self {
            id,
            context,
            chan,
            left,
            right,
            inbound: VecDeque::new(),
            deferred: VecDeque::new(),
            current: None,
            round: 1,
            sub_round: 0,
            picks: 0,
            reserved: VecDeque::new(),
            pool: Vec::new(),
            done: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Serve requests until the pool is complete, then report to the table.
    /// A finished seat keeps answering until the table stops it.
    pub async fn run(mut self, events: UnboundedSender<SeatEvent>) {
        match self.serve().await {
            Ok(()) => {
                events
                    .send(SeatEvent::Finished {
                        seat: self.id,
                        pool: self.pool.clone(),
                    })
                    .ok();
                while let Some(request) = self.chan.recv().await {
                    self.handle(request);
                }
            }
            Err(error) => {
                tracing::error!("Seat {} stopped: {error}", self.id);
                events
                    .send(SeatEvent::Failed {
                        seat: self.id,
                        error,
                    })
                    .ok();
            }
        }
    }

    async fn serve(&mut self) -> Res<()> {
        self.open_next()?;
        while !self.done {
            let Some(request) = self.chan.recv().await else {
                return Err(Error::Protocol(format!(
                    "seat {} lost its mailbox before finishing",
                    self.id
                )));
            };
            self.handle(request);
            self.open_next()?;
        }
        Ok(())
    }

    fn handle(&mut self, request: SeatRequest) {
        match request {
            SeatRequest::Offer(pack) if self.done => {
                tracing::debug!("Seat {} is done, dropping {} card pack.", self.id, pack.len());
            }
            SeatRequest::Offer(pack) => self.inbound.push_back(pack),
            SeatRequest::Pick { index, reply } => {
                reply.send(self.pick(index)).ok();
            }
            SeatRequest::Reserve { index, reply } => {
                reply.send(self.reserve(index)).ok();
            }
            SeatRequest::ShowPack(reply) => {
                reply.send(self.pack_view()).ok();
            }
            SeatRequest::ShowPool(reply) => {
                reply.send(self.pool_view()).ok();
            }
        }
    }

    fn status(&self) -> SeatStatus {
        if self.done {
            SeatStatus::Done
        } else if self.current.is_some() {
            SeatStatus::Reviewing
        } else {
            SeatStatus::Waiting
        }
    }

    /// Take packs off the inbound queue until one can be opened. Packs for a
    /// later round are set aside, empty packs are dropped.
    fn open_next(&mut self) -> Res<()> {
        while self.current.is_none() && !self.done {
            let Some(pack) = self.inbound.pop_front() else {
                return Ok(());
            };

            match pack.round().cmp(&self.round) {
                Ordering::Greater => self.deferred.push_back(pack),
                Ordering::Less if pack.is_empty() => {}
                Ordering::Less => {
                    return Err(Error::Protocol(format!(
                        "seat {} received a round {} pack with {} cards during round {}",
                        self.id,
                        pack.round(),
                        pack.len(),
                        self.round
                    )));
                }
                Ordering::Equal if pack.is_empty() => {
                    tracing::debug!("Seat {} discarding finished pack.", self.id);
                }
                Ordering::Equal => {
                    self.current = Some(pack);
                    self.sub_round += 1;
                    self.notify_pack();
                }
            }
        }
        Ok(())
    }

    fn pick(&mut self, index: usize) -> Res<Card> {
        if self.done {
            return err("Your pool is complete.");
        }
        let Some(pack) = self.current.as_mut() else {
            return err("No pack open.");
        };
        let Some(card) = pack.take(index) else {
            return err(format!(
                "Invalid pick {index}, choose a card from 1 to {}.",
                pack.len()
            ));
        };
        let emptied = pack.is_empty();
        let quota = self.round * pack.size();

        self.pool.push(card.clone());
        self.picks += 1;
        self.notify_pool();

        if self.picks >= self.context.rules.max_picks || emptied || self.pool.len() >= quota {
            self.pass_pack();
        }
        Ok(card)
    }

    fn reserve(&mut self, index: usize) -> Res<Vec<Card>> {
        if self.done {
            return err("Your pool is complete.");
        }
        let Some(pack) = self.current.as_ref() else {
            return err("No pack open.");
        };
        let Some(card) = pack.get(index).cloned() else {
            return err(format!(
                "Invalid card {index}, choose a card from 1 to {}.",
                pack.len()
            ));
        };
        if self.context.rules.max_reserved == 0 {
            return err("Reservations are not used for this set.");
        }

        while self.reserved.len() >= self.context.rules.max_reserved {
            self.reserved.pop_front();
        }
        self.reserved.push_back(card);
        Ok(self.reserved.iter().cloned().collect())
    }

    /// Odd rounds pass left, even rounds pass right.
    fn neighbor(&self) -> &SeatHandle {
        if self.round % 2 == 1 {
            &self.left
        } else {
            &self.right
        }
    }

    fn pass_pack(&mut self) {
        self.reserved.clear();
        self.picks = 0;

        let Some(pack) = self.current.take() else {
            return;
        };
        let pack_size = pack.size();
        let neighbor = self.neighbor();
        tracing::debug!(
            "Seat {} passing {} cards to {}.",
            self.id,
            pack.len(),
            neighbor.id()
        );
        if neighbor.offer(pack).is_err() {
            tracing::debug!("Seat {} has left the table, dropping pack.", neighbor.id());
        }

        if self.pool.len() >= self.round * pack_size {
            self.round += 1;
            self.sub_round = 0;

            // Anything still queued was left over from the finished round or
            // already known to be later. Deferred packs go first.
            self.deferred.extend(self.inbound.drain(..));
            self.inbound = std::mem::take(&mut self.deferred);
            tracing::debug!("Seat {} starting round {}.", self.id, self.round);
        }

        if self.pool.len() == self.context.rounds * pack_size {
            tracing::info!("Seat {} finished with {} cards.", self.id, self.pool.len());
            self.done = true;
        }

        self.notify_pack();
    }

    fn pack_view(&self) -> PackView {
        let cards = self.current.as_ref().map(Pack::cards).unwrap_or(&[]);
        PackView {
            status: self.status(),
            round: self.round.min(self.context.rounds),
            pick: self.sub_round,
            picks_remaining: self.context.rules.max_picks.saturating_sub(self.picks),
            origin: self.current.as_ref().and_then(Pack::origin),
            cards: pack_cards(cards),
            reserved: self.reserved.iter().map(Card::display_name).collect(),
            link: cardlist_link(cards, &self.context.set),
        }
    }

    fn pool_view(&self) -> PoolView {
        PoolView::new(&self.pool, &self.context.set)
    }

    fn notify_pack(&self) {
        if let Err(e) = self.context.observer.pack_opened(self.id, &self.pack_view()) {
            tracing::warn!("Failed to show pack for seat {}: {e}", self.id);
        }
    }

    fn notify_pool(&self) {
        if let Err(e) = self.context.observer.pool_changed(self.id, &self.pool) {
            tracing::warn!("Failed to show pool for seat {}: {e}", self.id);
        }
    }
}
