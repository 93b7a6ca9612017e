//! Source verification on Etherscan compatible block explorers.

use {
    crate::config::Network,
    alloy::primitives::{Address, Bytes, hex},
    anyhow::{Context, Result},
    serde::Deserialize,
    std::time::Duration,
    url::Url,
};

/// Etherscan's multichain API. The chain is selected per request.
pub const DEFAULT_API_URL: &str = "https://api.etherscan.io/v2/api";

/// Whether the contract deployed on `network` should be verified.
///
/// Development networks are never verified. Everywhere else verification
/// happens iff an explorer API key is available.
pub fn should_verify(
    network: &Network,
    development_chains: &[String],
    api_key: Option<&str>,
) -> bool {
    !network.is_development(development_chains) && api_key.is_some_and(|key| !key.is_empty())
}

/// What the explorer needs to rebuild and match the deployed code.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub address: Address,
    /// `<source path>:<contract name>`
    pub contract_name: String,
    /// Full compiler version, e.g. `0.8.7+commit.e28d00a7`.
    pub compiler_version: String,
    /// Standard JSON compiler input.
    pub standard_json_input: String,
    pub constructor_args: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    AlreadyVerified,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Verifying: Send + Sync {
    async fn verify(&self, request: VerificationRequest) -> Result<Verification>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("explorer rejected the verification: {0}")]
    Rejected(String),
    #[error("verification did not finish after {0} attempts: {1}")]
    Timeout(usize, String),
}

pub struct Etherscan {
    client: reqwest::Client,
    url: Url,
    api_key: String,
    chain_id: u64,
    poll_interval: Duration,
    max_attempts: usize,
}

impl Etherscan {
    pub fn new(
        client: reqwest::Client,
        url: Url,
        api_key: String,
        chain_id: u64,
        poll_interval: Duration,
        max_attempts: usize,
    ) -> Self {
        Self {
            client,
            url,
            api_key,
            chain_id,
            poll_interval,
            max_attempts,
        }
    }

    fn query(&self, action: &str) -> Vec<(&'static str, String)> {
        vec![
            ("chainid", self.chain_id.to_string()),
            ("module", "contract".to_string()),
            ("action", action.to_string()),
            ("apikey", self.api_key.clone()),
        ]
    }

    async fn is_verified(&self, address: Address) -> Result<bool> {
        let mut query = self.query("getsourcecode");
        query.push(("address", address.to_string()));
        let response: Response<serde_json::Value> = self
            .client
            .get(self.url.clone())
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed getsourcecode response")?;
        Ok(has_source_code(&response))
    }

    async fn submit(&self, request: &VerificationRequest) -> Result<Submission> {
        let mut form = self.query("verifysourcecode");
        form.extend([
            ("contractaddress", request.address.to_string()),
            ("sourceCode", request.standard_json_input.clone()),
            ("codeformat", "solidity-standard-json-input".to_string()),
            ("contractname", request.contract_name.clone()),
            ("compilerversion", format!("v{}", request.compiler_version)),
            // Sic, the explorer API spells it this way.
            ("constructorArguements", hex::encode(&request.constructor_args)),
        ]);
        let response: Response<String> = self
            .client
            .post(self.url.clone())
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed verifysourcecode response")?;
        Ok(Submission::from(response))
    }

    async fn status(&self, guid: &str) -> Result<Status> {
        let mut query = self.query("checkverifystatus");
        query.push(("guid", guid.to_string()));
        let response: Response<String> = self
            .client
            .get(self.url.clone())
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed checkverifystatus response")?;
        Ok(Status::from(response))
    }
}

#[async_trait::async_trait]
impl Verifying for Etherscan {
    async fn verify(&self, request: VerificationRequest) -> Result<Verification> {
        if self.is_verified(request.address).await? {
            return Ok(Verification::AlreadyVerified);
        }

        let mut attempt = 0;
        let guid = loop {
            attempt += 1;
            match self.submit(&request).await? {
                Submission::Accepted(guid) => break guid,
                Submission::AlreadyVerified => return Ok(Verification::AlreadyVerified),
                Submission::NotIndexed(message) if attempt < self.max_attempts => {
                    tracing::debug!(%message, attempt, "explorer has not indexed the contract yet");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Submission::NotIndexed(message) => {
                    return Err(Error::Timeout(attempt, message).into());
                }
                Submission::Rejected(message) => return Err(Error::Rejected(message).into()),
            }
        };
        tracing::info!(%guid, address = %request.address, "submitted source for verification");

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.poll_interval).await;
            match self.status(&guid).await? {
                Status::Pending => tracing::debug!(%guid, attempt, "verification pending"),
                Status::Verified => return Ok(Verification::Verified),
                Status::AlreadyVerified => return Ok(Verification::AlreadyVerified),
                Status::Failed(message) => return Err(Error::Rejected(message).into()),
            }
        }
        Err(Error::Timeout(self.max_attempts, format!("guid {guid} still pending")).into())
    }
}

/// Envelope of every explorer response.
#[derive(Debug, Deserialize)]
struct Response<T> {
    status: String,
    message: String,
    result: T,
}

#[derive(Debug, PartialEq)]
enum Submission {
    Accepted(String),
    AlreadyVerified,
    /// The explorer does not know the bytecode yet. Happens right after the
    /// deployment and resolves by itself.
    NotIndexed(String),
    Rejected(String),
}

impl From<Response<String>> for Submission {
    fn from(response: Response<String>) -> Self {
        let lower = response.result.to_lowercase();
        if response.status == "1" {
            Self::Accepted(response.result)
        } else if lower.contains("already verified") {
            Self::AlreadyVerified
        } else if lower.contains("unable to locate contractcode")
            || lower.contains("does not have bytecode")
        {
            Self::NotIndexed(response.result)
        } else {
            Self::Rejected(format!("{}: {}", response.message, response.result))
        }
    }
}

#[derive(Debug, PartialEq)]
enum Status {
    Pending,
    Verified,
    AlreadyVerified,
    Failed(String),
}

impl From<Response<String>> for Status {
    fn from(response: Response<String>) -> Self {
        let lower = response.result.to_lowercase();
        if lower.contains("pending") {
            Self::Pending
        } else if lower.contains("already verified") {
            Self::AlreadyVerified
        } else if response.status == "1" {
            Self::Verified
        } else {
            Self::Failed(response.result)
        }
    }
}

fn has_source_code(response: &Response<serde_json::Value>) -> bool {
    response.status == "1"
        && response
            .result
            .get(0)
            .and_then(|entry| entry.get("SourceCode"))
            .and_then(|source| source.as_str())
            .is_some_and(|source| !source.is_empty())
}
