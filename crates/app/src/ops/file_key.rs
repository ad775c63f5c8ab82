use clap::Args;

use common::crypto::{derive_file_key, DriveKey, KeyError, SecretError};

/// Derive a file key from a drive key; needs no wallet
#[derive(Args, Debug, Clone)]
pub struct FileKeyOp {
    /// Drive key as unpadded base64url
    #[arg(long)]
    pub drive_key: String,

    #[arg(long)]
    pub file_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FileKeyError {
    #[error("invalid drive key: {0}")]
    DriveKey(#[from] SecretError),
    #[error("key derivation failed: {0}")]
    Key(#[from] KeyError),
}

#[async_trait::async_trait]
impl crate::op::Op for FileKeyOp {
    type Error = FileKeyError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let drive_key = DriveKey::from_b64url(&self.drive_key)?;
        let file_key = derive_file_key(&drive_key, self.file_id.as_str())?;
        Ok(file_key.to_b64url())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::op::{Op, OpContext};

    #[tokio::test]
    async fn test_known_answer() {
        let op = FileKeyOp {
            drive_key: "_BswoSJy8cGrHQN7xge2naIiGajCEV7yfC0MXD_XBig".to_string(),
            file_id: "225f09b7-84c0-495f-b4e6-1c775a6976d0".to_string(),
        };
        let output = op.execute(&OpContext::new(None)).await.unwrap();
        assert_eq!(output, "_pl7qmnwd7HENIh3jKBImz7jkwTCntNaPyAeoVX8BBs");
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let op = FileKeyOp {
            drive_key: "AAAA".to_string(),
            file_id: "225f09b7-84c0-495f-b4e6-1c775a6976d0".to_string(),
        };
        assert!(matches!(
            op.execute(&OpContext::new(None)).await,
            Err(FileKeyError::DriveKey(_))
        ));

        let op = FileKeyOp {
            drive_key: "_BswoSJy8cGrHQN7xge2naIiGajCEV7yfC0MXD_XBig".to_string(),
            file_id: "225f09b784c0495fb4e61c775a6976d0".to_string(),
        };
        assert!(matches!(
            op.execute(&OpContext::new(None)).await,
            Err(FileKeyError::Key(KeyError::InvalidIdentifier(_)))
        ));
    }
}
