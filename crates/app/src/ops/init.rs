use clap::Args;

use crate::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default log level written to the config
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            log_level: self.log_level.clone(),
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let wallet = state.load_wallet()?;

        Ok(format!(
            "Initialized arfs directory at: {}\n\
             - Config: {}\n\
             - Wallet: {}\n\
             - Ledger: {}\n\
             - Address: {}",
            state.arfs_dir.display(),
            state.config_path.display(),
            state.wallet_path().display(),
            state.ledger_dir().display(),
            wallet.address(),
        ))
    }
}
