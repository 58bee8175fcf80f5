pub mod account;
pub mod billing;
pub mod contest;
pub mod export;
pub mod referral;
pub mod setup;

use tgvpn_client::{ApiClient, ClientConfig, LocalStore};

use crate::cli::OutputFormat;

/// What every remote command needs.
pub struct Session {
    pub client: ApiClient,
    pub store: LocalStore,
    pub format: OutputFormat,
}

impl Session {
    pub fn new(
        server: &str,
        init_data: Option<String>,
        store: LocalStore,
        format: OutputFormat,
    ) -> Self {
        let client = ApiClient::new(ClientConfig::new(server.trim_end_matches('/')));
        client.set_init_data(init_data);
        Self {
            client,
            store,
            format,
        }
    }

    pub fn json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}
