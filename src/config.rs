use anyhow::Context;

const DATABASE_URL_VAR: &str = "DATABASE_URL";
const SERVER_PORT_VAR: &str = "SERVER_PORT";

/// Runtime configuration for the catalog service: the Postgres DSN and the
/// HTTP bind port, both required.
#[derive(Debug)]
pub struct Config {
    database_url: String,
    server_port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = require_env(DATABASE_URL_VAR)?;
        let server_port = parse_port(&require_env(SERVER_PORT_VAR)?)?;
        Ok(Self {
            database_url,
            server_port,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("Missing environment variable {key}"))
}

fn parse_port(raw: &str) -> anyhow::Result<u16> {
    raw.parse()
        .with_context(|| format!("Invalid {SERVER_PORT_VAR} value {raw:?}"))
}
