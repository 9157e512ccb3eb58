pub mod auth;
pub mod property;
pub mod reservation;
pub mod user;
