use uuid::Uuid;

use crate::{cards::Card, error::Res};

use super::view::PackView;

/// Hooks the front end implements to show a seat's state. Errors are logged
/// by the seat and never stop the draft.
pub trait DraftObserver: Send + Sync {
    /// A pack was opened or the open pack was passed on.
    fn pack_opened(&self, seat: Uuid, pack: &PackView) -> Res<()>;

    /// A card was added to the seat's pool.
    fn pool_changed(&self, seat: Uuid, pool: &[Card]) -> Res<()>;
}

/// Writes every transition to the log.
pub struct TracingObserver;

impl DraftObserver for TracingObserver {
    fn pack_opened(&self, seat: Uuid, pack: &PackView) -> Res<()> {
        tracing::debug!(
            "Seat {seat}: {} with {} cards ({:?}).",
            pack.title(),
            pack.cards.len(),
            pack.status
        );
        Ok(())
    }

    fn pool_changed(&self, seat: Uuid, pool: &[Card]) -> Res<()> {
        if let Some(card) = pool.last() {
            tracing::debug!("Seat {seat} picked {}, pool now {}.", card.name(), pool.len());
        }
        Ok(())
    }
}
