pub mod artifacts;
pub mod federation;
pub mod health;
