// hostmirror-api: async GraphQL client for the remote server's data API

pub mod client;
pub mod error;
pub mod transport;

pub use client::GraphqlClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
