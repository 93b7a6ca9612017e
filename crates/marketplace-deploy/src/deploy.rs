use {
    crate::{
        artifact::Artifact,
        deployments::{DeploymentRecord, Deployments},
    },
    alloy::{
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        primitives::{Address, B256, Bytes},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::TransactionRequest,
        signers::local::PrivateKeySigner,
    },
    anyhow::{Context, Result, ensure},
    url::Url,
};

/// A contract creation to send.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployRequest {
    pub name: String,
    pub init_code: Bytes,
    /// Blocks to wait for, including the one the transaction was mined in.
    pub confirmations: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeployReceipt {
    pub address: Address,
    pub transaction_hash: B256,
    pub gas_used: u64,
}

/// Sends contract creations to a chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Deploying: Send + Sync {
    /// The account contracts are deployed from.
    fn deployer(&self) -> Address;

    /// Sends the creation and waits for the requested confirmations.
    async fn deploy(&self, request: DeployRequest) -> Result<DeployReceipt>;

    /// Whether the chain currently has code at `address`.
    async fn has_code(&self, address: Address) -> Result<bool>;
}

/// Deploys through a JSON-RPC node.
pub struct NodeDeployer {
    provider: DynProvider,
    from: Address,
}

impl NodeDeployer {
    /// Signs locally with `signer` when given. Otherwise the node's first
    /// unlocked account is used and the node signs.
    pub async fn connect(url: &Url, signer: Option<PrivateKeySigner>) -> Result<Self> {
        let (provider, from) = match signer {
            Some(signer) => {
                let from = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url.clone())
                    .erased();
                (provider, from)
            }
            None => {
                let provider = ProviderBuilder::new().connect_http(url.clone()).erased();
                let accounts = provider
                    .get_accounts()
                    .await
                    .context("could not fetch node accounts")?;
                let from = *accounts
                    .first()
                    .context("node has no unlocked accounts, configure a private key")?;
                (provider, from)
            }
        };
        Ok(Self { provider, from })
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .context("could not fetch current chain id")
    }
}

#[async_trait::async_trait]
impl Deploying for NodeDeployer {
    fn deployer(&self) -> Address {
        self.from
    }

    async fn deploy(&self, request: DeployRequest) -> Result<DeployReceipt> {
        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_deploy_code(request.init_code);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .with_context(|| format!("failed to send deployment of {}", request.name))?;
        let transaction_hash = *pending.tx_hash();
        tracing::info!(
            "deploying \"{}\" (tx: {transaction_hash})...",
            request.name
        );
        let receipt = pending
            .with_required_confirmations(request.confirmations)
            .get_receipt()
            .await
            .with_context(|| format!("failed to confirm deployment tx {transaction_hash}"))?;
        ensure!(
            receipt.status(),
            "deployment tx {transaction_hash} of {} reverted",
            request.name
        );
        let address = receipt
            .contract_address
            .with_context(|| format!("receipt of {transaction_hash} has no contract address"))?;
        Ok(DeployReceipt {
            address,
            transaction_hash,
            gas_used: receipt.gas_used,
        })
    }

    async fn has_code(&self, address: Address) -> Result<bool> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .with_context(|| format!("could not fetch code at {address}"))?;
        Ok(!code.is_empty())
    }
}

/// Result of [`deploy`].
#[derive(Debug, Clone, PartialEq)]
pub struct Deployed {
    pub record: DeploymentRecord,
    /// `false` when an identical earlier deployment was reused.
    pub newly_deployed: bool,
}

/// Deploys `artifact` under its contract name and stores the record.
///
/// An existing deployment with identical creation code is reused instead of
/// sending another transaction, as long as the chain still has code at its
/// address. Records outlive local nodes that get restarted.
pub async fn deploy(
    deployer: &dyn Deploying,
    deployments: &mut Deployments,
    artifact: &Artifact,
    chain_id: u64,
    args: &[String],
    confirmations: u64,
) -> Result<Deployed> {
    let name = &artifact.contract_name;
    let encoded_args = artifact.encode_constructor_args(args)?;
    let init_code_hash = artifact.init_code_hash(&encoded_args);

    if let Some(existing) = deployments.find(name)? {
        if existing.init_code_hash != init_code_hash {
            tracing::info!("creation code of \"{name}\" changed, redeploying");
        } else if deployer.has_code(existing.address).await? {
            tracing::info!("reusing \"{name}\" at {}", existing.address);
            return Ok(Deployed {
                record: existing,
                newly_deployed: false,
            });
        } else {
            tracing::warn!(
                address = %existing.address,
                "no code at recorded deployment of \"{name}\", redeploying"
            );
        }
    }

    let receipt = deployer
        .deploy(DeployRequest {
            name: name.clone(),
            init_code: artifact.init_code(&encoded_args),
            confirmations,
        })
        .await?;
    tracing::info!(
        "deployed \"{name}\" at {} with {} gas",
        receipt.address,
        receipt.gas_used
    );

    let record = DeploymentRecord {
        name: name.clone(),
        address: receipt.address,
        chain_id,
        abi: artifact.abi.clone(),
        args: args.to_vec(),
        transaction_hash: Some(receipt.transaction_hash),
        gas_used: Some(receipt.gas_used),
        init_code_hash,
    };
    deployments.save(record.clone())?;
    Ok(Deployed {
        record,
        newly_deployed: true,
    })
}
