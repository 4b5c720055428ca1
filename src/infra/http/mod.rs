pub mod recording_api;
pub mod transport;

pub use recording_api::RecordingApiHttp;
pub use transport::HttpProviderTransport;
