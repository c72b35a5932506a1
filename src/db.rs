pub mod closure_repo;
pub mod ledger_repo;
pub mod promotion_repo;
pub mod reservation_repo;
pub mod room_repo;
pub mod visit_repo;

pub use closure_repo::ClosureRepository;
pub use ledger_repo::LedgerRepository;
pub use promotion_repo::PromotionRepository;
pub use reservation_repo::ReservationRepository;
pub use room_repo::RoomRepository;
pub use visit_repo::VisitRepository;
