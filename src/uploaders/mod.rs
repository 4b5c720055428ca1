pub mod error;
pub mod factory;
pub mod google_drive;
pub mod local;
pub mod wasabi;
