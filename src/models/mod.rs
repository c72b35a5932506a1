pub mod auth;
pub mod catalog;
pub mod events;
pub mod ledger;
pub mod promotions;
pub mod reservations;
pub mod treasury;
pub mod visits;
