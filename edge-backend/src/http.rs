use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Process-wide HTTP client shared by the model client and the web tools.
///
/// Per-request overrides (auth headers, shorter timeouts) go on the request builder.
static SHARED_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .pool_max_idle_per_host(5)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("edge-backend/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create shared HTTP client")
});

pub fn shared_client() -> &'static Client {
    &SHARED_CLIENT
}
