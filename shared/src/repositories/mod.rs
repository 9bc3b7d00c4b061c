pub mod account_repository;
pub mod position_repository;
pub mod trade_repository;

pub use account_repository::AccountRepository;
pub use position_repository::PositionRepository;
pub use trade_repository::TradeRepository;
