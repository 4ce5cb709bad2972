pub mod auth;
pub mod capture;
pub mod dashboard;
pub mod export;
pub mod extractors;
pub mod table;
pub mod wizard;
