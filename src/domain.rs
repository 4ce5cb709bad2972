pub mod device;
pub mod entities;
pub mod use_cases;
