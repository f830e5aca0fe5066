//! Foundation provider client — fetches the catalog and posts donations.
//!
//! Each call makes exactly one HTTP attempt. A non-success status is
//! reported as [`DonationError::Provider`]; retrying is left to the user.

use reqwest::Client;
use tracing::debug;

use crate::catalog::CatalogSource;
use crate::errors::{DonationError, Result};
use crate::payment::PaymentGateway;
use crate::types::{Foundation, PaymentRequest};

#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    base_url: String,
}

impl HttpProvider {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn foundations_url(&self) -> String {
        format!("{}/foundations", self.base_url)
    }
}

impl CatalogSource for HttpProvider {
    async fn fetch_foundations(&self) -> Result<Vec<Foundation>> {
        let resp = self.client.get(self.foundations_url()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DonationError::Provider(format!(
                "GET /foundations returned {status}"
            )));
        }

        let foundations: Vec<Foundation> = resp.json().await?;
        debug!("Fetched {} foundations", foundations.len());
        Ok(foundations)
    }
}

impl PaymentGateway for HttpProvider {
    async fn pay(&self, request: &PaymentRequest) -> Result<()> {
        let resp = self
            .client
            .post(self.foundations_url())
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DonationError::Provider(format!(
                "POST /foundations returned {status}: {body}"
            )));
        }
        debug!(
            "Payment accepted: {} {} to foundation {}",
            request.amount, request.currency, request.foundation_id
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
