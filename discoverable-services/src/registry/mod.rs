pub mod cache;
pub mod loader;

pub use cache::RegistryCache;
pub use loader::Catalog;
