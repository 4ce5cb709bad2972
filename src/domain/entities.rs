pub mod image;
pub mod location;
pub mod plant;
pub mod token;
pub mod user;
