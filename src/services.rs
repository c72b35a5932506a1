pub mod clock;
pub mod closure_service;
pub mod ledger_service;
pub mod monitor;
pub mod reservation_service;
pub mod tariff;
