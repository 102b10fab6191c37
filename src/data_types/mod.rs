pub mod progress;
pub mod route;
pub mod vessel;
