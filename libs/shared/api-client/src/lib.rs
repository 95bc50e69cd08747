pub mod client;
pub mod credentials;
pub mod envelope;

pub use client::ApiClient;
pub use credentials::{CredentialProvider, StaticCredentials};
pub use envelope::ApiEnvelope;
