pub mod auth;
pub mod dashboard;
pub mod home;
pub mod json_error;
pub mod role;
pub mod system;
pub mod wizard;
