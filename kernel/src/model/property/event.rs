use crate::model::id::{PropertyId, UserId};
use derive_new::new;
use rust_decimal::Decimal;

#[derive(new)]
pub struct CreateProperty {
    pub title: String,
    pub description: String,
    pub district: String,
    pub address: String,
    pub monthly_rate: Decimal,
    pub rooms: i32,
    pub furnished: bool,
    pub owned_by: UserId,
}

#[derive(new)]
pub struct ApproveProperty {
    pub property_id: PropertyId,
}
