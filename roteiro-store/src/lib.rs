pub mod affiliate_repo;
pub mod app_config;
pub mod booking_repo;
pub mod contact_repo;
pub mod database;
pub mod events;
pub mod fleet_repo;
pub mod memory;
pub mod package_repo;
pub mod redis_repo;
pub mod user_repo;

pub use affiliate_repo::StoreAffiliateRepository;
pub use booking_repo::StoreBookingRepository;
pub use contact_repo::StoreContactRepository;
pub use database::DbClient;
pub use events::{EventProducer, LogEventPublisher};
pub use fleet_repo::StoreFleetRepository;
pub use memory::MemoryStore;
pub use package_repo::StorePackageRepository;
pub use redis_repo::RedisClient;
pub use user_repo::StoreUserDirectory;
