pub mod closures;
pub mod ledger;
pub mod reservations;
pub mod rooms;
pub mod visits;
