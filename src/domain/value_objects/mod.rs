pub mod collaborator;
pub mod enums;
pub mod events;
pub mod recording;
