pub mod kosis;
pub mod store;

pub use kosis::KosisClient;
pub use store::PgStore;
