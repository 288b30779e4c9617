use std::path::PathBuf;

use clap::Args;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Chain the access conditions refer to
    #[arg(long, default_value = "mumbai")]
    pub chain: String,

    /// Token contract name used in access conditions
    #[arg(long, default_value = "BUIBlockNFT")]
    pub contract_name: String,

    /// Dev ledger publish price in wei
    #[arg(long, default_value_t = 330_000_000_000_000_000)]
    pub publish_price: u64,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            chain: self.chain.clone(),
            contract_name: self.contract_name.clone(),
            publish_price: self.publish_price,
            log_dir: self.log_dir.clone(),
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized bui directory at: {}\n\
             - Policy key: {}\n\
             - Store: {}\n\
             - Config: {}\n\
             - Chain: {}\n\
             - Contract: {}",
            state.bui_dir.display(),
            state.key_path.display(),
            state.store_path.display(),
            state.config_path.display(),
            state.config.chain,
            state.config.contract_name,
        );

        Ok(output)
    }
}
