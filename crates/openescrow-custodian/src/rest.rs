//! REST implementation of the [`CustodianGateway`].
//!
//! Bearer-authenticated, per-sub-account paths, bounded per-call timeout.
//! A transport timeout maps to `CustodianTimeout` — the outcome is unknown
//! and only reconciliation may decide it. Every body is parsed through the
//! tagged [`ApiEnvelope`] before any field is read.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use openescrow_types::{
    AccountRef, CustodianConfig, ExternalTransaction, OpenescrowError, Result,
};

use crate::wire::{
    ApiEnvelope, BalancePayload, CustodianWallet, SwapQuotation, SwapResult, TransactionPayload,
    TransferReceipt,
};
use crate::CustodianGateway;

/// HTTP client for the custodian REST API.
pub struct RestCustodian {
    client: Client,
    config: CustodianConfig,
}

impl RestCustodian {
    /// Build a client with the configured per-call timeout.
    pub fn new(config: CustodianConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| OpenescrowError::Configuration(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_transport(operation: &str, err: &reqwest::Error) -> OpenescrowError {
        if err.is_timeout() {
            OpenescrowError::CustodianTimeout {
                operation: operation.to_string(),
            }
        } else {
            OpenescrowError::ExternalService {
                code: "transport".to_string(),
                message: err.to_string(),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<T> {
        debug!(operation, path, "custodian GET");
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.config.bearer_token)
            .send()
            .await
            .map_err(|e| Self::map_transport(operation, &e))?;
        Self::decode(operation, response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!(operation, path, "custodian POST");
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.config.bearer_token)
            .json(body)
            .send()
            .await
            .map_err(|e| Self::map_transport(operation, &e))?;
        Self::decode(operation, response).await
    }

    async fn decode<T: DeserializeOwned>(operation: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::map_transport(operation, &e))?;

        // The custodian wraps errors in the envelope even on non-2xx, so
        // try the envelope first and fall back to the raw status.
        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(parse_err) if status.is_success() => Err(OpenescrowError::MalformedResponse {
                reason: format!("{operation}: {parse_err}"),
            }),
            Err(_) => Err(OpenescrowError::ExternalService {
                code: format!("http_{}", status.as_u16()),
                message: body.chars().take(256).collect(),
            }),
        }
    }
}

#[async_trait]
impl CustodianGateway for RestCustodian {
    async fn get_balance(&self, account: &AccountRef, currency: &str) -> Result<Decimal> {
        let path = format!("accounts/{}/balances/{currency}", account.as_str());
        let payload: BalancePayload = self.get_json("get_balance", &path).await?;
        Ok(payload.available)
    }

    async fn transfer_internal(
        &self,
        from: &AccountRef,
        to: &AccountRef,
        currency: &str,
        amount: Decimal,
        note: &str,
    ) -> Result<TransferReceipt> {
        #[derive(Serialize)]
        struct Body<'a> {
            from: &'a str,
            to: &'a str,
            currency: &'a str,
            amount: Decimal,
            note: &'a str,
        }
        let body = Body {
            from: from.as_str(),
            to: to.as_str(),
            currency,
            amount,
            note,
        };
        self.post_json("transfer_internal", "transfers", &body).await
    }

    async fn create_swap_quotation(
        &self,
        account: &AccountRef,
        from_currency: &str,
        to_currency: &str,
        from_amount: Decimal,
    ) -> Result<SwapQuotation> {
        #[derive(Serialize)]
        struct Body<'a> {
            from_currency: &'a str,
            to_currency: &'a str,
            from_amount: Decimal,
        }
        let path = format!("accounts/{}/swaps/quote", account.as_str());
        let body = Body {
            from_currency,
            to_currency,
            from_amount,
        };
        self.post_json("create_swap_quotation", &path, &body).await
    }

    async fn confirm_swap(&self, account: &AccountRef, quotation_id: &str) -> Result<SwapResult> {
        let path = format!("accounts/{}/swaps/{quotation_id}/confirm", account.as_str());
        self.post_json("confirm_swap", &path, &serde_json::json!({}))
            .await
    }

    async fn list_wallets(&self, account: &AccountRef) -> Result<Vec<CustodianWallet>> {
        let path = format!("accounts/{}/wallets", account.as_str());
        self.get_json("list_wallets", &path).await
    }

    async fn list_transactions(
        &self,
        account: &AccountRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExternalTransaction>> {
        let path = format!(
            "accounts/{}/transactions?since={}",
            account.as_str(),
            since.to_rfc3339()
        );
        let rows: Vec<TransactionPayload> = self.get_json("list_transactions", &path).await?;
        Ok(rows.into_iter().map(ExternalTransaction::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let config = CustodianConfig {
            base_url: "https://custodian.example.com/api/v1/".to_string(),
            ..CustodianConfig::default()
        };
        let client = RestCustodian::new(config).unwrap();
        assert_eq!(
            client.url("accounts/sub_1/wallets"),
            "https://custodian.example.com/api/v1/accounts/sub_1/wallets"
        );
    }

    #[test]
    fn builds_with_default_config() {
        assert!(RestCustodian::new(CustodianConfig::default()).is_ok());
    }
}
