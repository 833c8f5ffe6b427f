use async_trait::async_trait;

use crate::emails::error::DispatchError;
use crate::reservations::{Reservation, ReservationsRepo};

pub const RESERVATION: &str = "reservation";

/// Typed form of the `related_type` / `related_id` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedRef {
    Reservation(i64),
}

impl RelatedRef {
    pub fn parse(related_type: &str, related_id: i64) -> Result<Self, DispatchError> {
        match related_type {
            RESERVATION => Ok(RelatedRef::Reservation(related_id)),
            other => Err(DispatchError::UnsupportedRelatedType(other.to_string())),
        }
    }

    pub fn related_type(&self) -> &'static str {
        match self {
            RelatedRef::Reservation(_) => RESERVATION,
        }
    }

    pub fn related_id(&self) -> i64 {
        match self {
            RelatedRef::Reservation(id) => *id,
        }
    }
}

/// A resolved related entity.
#[derive(Debug, Clone)]
pub enum Related {
    Reservation(Reservation),
}

#[async_trait]
pub trait RelatedLookup: Send + Sync {
    /// `Ok(None)` means the entity is gone.
    async fn find(&self, related: &RelatedRef) -> anyhow::Result<Option<Related>>;
}

#[derive(Clone)]
pub struct PgRelatedLookup {
    reservations: ReservationsRepo,
}

impl PgRelatedLookup {
    pub fn new(reservations: ReservationsRepo) -> Self {
        Self { reservations }
    }
}

#[async_trait]
impl RelatedLookup for PgRelatedLookup {
    async fn find(&self, related: &RelatedRef) -> anyhow::Result<Option<Related>> {
        match related {
            RelatedRef::Reservation(id) => Ok(self
                .reservations
                .find(*id)
                .await?
                .map(Related::Reservation)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_related_type_is_rejected() {
        let err = RelatedRef::parse("order", 7).unwrap_err();
        assert_eq!(err.to_string(), "unsupported related type: order");

        let ok = RelatedRef::parse("reservation", 7).unwrap();
        assert_eq!(ok, RelatedRef::Reservation(7));
        assert_eq!(ok.related_type(), "reservation");
        assert_eq!(ok.related_id(), 7);
    }
}
