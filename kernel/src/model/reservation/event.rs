use super::DateRange;
use crate::model::id::{PropertyId, ReservationId, UserId};
use derive_new::new;

#[derive(new)]
pub struct CreateReservation {
    pub property_id: PropertyId,
    pub renter_id: UserId,
    pub period: DateRange,
}

#[derive(new)]
pub struct CancelReservation {
    pub reservation_id: ReservationId,
    pub requested_user: UserId,
}

#[derive(new)]
pub struct ConfirmReservation {
    pub reservation_id: ReservationId,
    pub requested_user: UserId,
}
