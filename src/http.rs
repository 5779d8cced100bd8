//! Shared reqwest client construction.

use reqwest::Client;
use std::time::Duration;

/// User-Agent string identifying this client
const USER_AGENT: &str = concat!(
    "tomecast/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/cladam/tomecast)"
);

/// Create a configured HTTP client.
///
/// Without a timeout the transport defaults apply; summarisation on the backend
/// can take minutes, so none is set unless configured.
pub fn create_client(timeout: Option<Duration>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
