pub mod auth;
pub mod health;
pub mod property;
pub mod reservation;
pub mod user;
