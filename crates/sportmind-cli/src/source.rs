//! Where session records come from: the local store or the API gateway.

use anyhow::Context;
use serde_json::Value;
use sportmind_store::SessionStore;
use sportmind_sync::GatewayClient;

/// Dates with uploaded sessions, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct DatePage {
    pub dates: Vec<String>,
    pub total: u64,
}

/// Sessions for one date, as returned to API callers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPage {
    pub date: String,
    pub total_sessions: u64,
    pub sessions: Vec<Value>,
}

#[derive(Debug, Clone)]
pub enum SessionSource {
    Local(SessionStore),
    Gateway(GatewayClient),
}

impl SessionSource {
    /// Value of the `source` field in API responses.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Gateway(_) => "api",
        }
    }

    pub async fn dates(&self) -> anyhow::Result<DatePage> {
        match self {
            Self::Local(store) => {
                let store = store.clone();
                let dates = tokio::task::spawn_blocking(move || store.list_dates())
                    .await
                    .context("session store task failed")?
                    .context("listing session dates")?;
                Ok(DatePage {
                    total: dates.len() as u64,
                    dates,
                })
            }
            Self::Gateway(client) => {
                let listing = client
                    .fetch_dates()
                    .await
                    .context("fetching dates from gateway")?;
                Ok(DatePage {
                    dates: listing.dates,
                    total: listing.total_dates,
                })
            }
        }
    }

    /// Sessions uploaded on `date`, which the caller has already validated.
    pub async fn sessions(&self, date: &str) -> anyhow::Result<SessionPage> {
        match self {
            Self::Local(store) => {
                let store = store.clone();
                let owned = date.to_string();
                let records = tokio::task::spawn_blocking(move || store.sessions_for_date(&owned))
                    .await
                    .context("session store task failed")?
                    .with_context(|| format!("loading sessions for {date}"))?;
                Ok(SessionPage {
                    date: date.to_string(),
                    total_sessions: records.len() as u64,
                    sessions: records.into_iter().map(Value::Object).collect(),
                })
            }
            Self::Gateway(client) => {
                let listing = client
                    .fetch_sessions(date)
                    .await
                    .with_context(|| format!("fetching sessions for {date} from gateway"))?;
                Ok(SessionPage {
                    date: listing.date.unwrap_or_else(|| date.to_string()),
                    total_sessions: listing.total_sessions,
                    sessions: listing.sessions,
                })
            }
        }
    }
}
