pub mod ledger_repository;
pub mod member_repository;
pub mod settings_repository;
pub mod user_repository;

pub use ledger_repository::LedgerRepository;
pub use member_repository::MemberRepository;
pub use settings_repository::SettingsRepository;
pub use user_repository::UserRepository;
