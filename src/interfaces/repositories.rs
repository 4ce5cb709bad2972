pub mod auth_provider;
pub mod geocoder;
pub mod memory_store;
pub mod pg_store;
pub mod plant_store;
pub mod subscription;
pub mod token;
