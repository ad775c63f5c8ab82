use clap::Args;

use common::crypto::{derive_drive_key, DriveAuthParams, KeyError};

use crate::state::StateError;

/// Derive a drive key from the configured wallet
#[derive(Args, Debug, Clone)]
pub struct DriveKeyOp {
    #[arg(long)]
    pub drive_id: String,

    #[arg(long)]
    pub password: String,

    /// Drive auth mode, as found in the drive's Drive-Auth-Mode tag
    #[arg(long, default_value = "password")]
    pub auth_mode: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DriveKeyError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key derivation failed: {0}")]
    Key(#[from] KeyError),
}

#[async_trait::async_trait]
impl crate::op::Op for DriveKeyOp {
    type Error = DriveKeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let wallet = state.load_wallet()?;

        let params = DriveAuthParams::from_name(&self.auth_mode, self.password.as_str())?;
        let drive_key = derive_drive_key(self.drive_id.as_str(), wallet.as_ref(), &params)?;
        Ok(drive_key.to_b64url())
    }
}
