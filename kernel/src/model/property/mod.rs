pub mod event;

use crate::model::id::{PropertyId, UserId};
use rust_decimal::Decimal;

#[derive(Debug)]
pub struct Property {
    pub property_id: PropertyId,
    pub title: String,
    pub description: String,
    pub district: String,
    pub address: String,
    pub monthly_rate: Decimal,
    pub rooms: i32,
    pub furnished: bool,
    pub approved: bool,
    pub owner: PropertyOwner,
}

#[derive(Debug)]
pub struct PropertyOwner {
    pub owner_id: UserId,
    pub owner_name: String,
}
