pub mod collaborator;
pub mod transport;
pub mod upload_session;
