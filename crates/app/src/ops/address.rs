use clap::Args;

use crate::state::StateError;

/// Print the address of the configured wallet
#[derive(Args, Debug, Clone)]
pub struct Address;

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("failed to load wallet: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Address {
    type Error = AddressError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        Ok(state.load_wallet()?.address())
    }
}
