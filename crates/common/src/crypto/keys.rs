use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pss, RsaPrivateKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Size of Ed25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Errors that can occur while loading wallets or deriving keys
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("unsupported drive auth mode: {0}")]
    UnsupportedAuthMode(String),
    #[error("key import failure: {0}")]
    KeyImport(String),
    #[error("signer error: {0}")]
    Signer(#[from] anyhow::Error),
    #[error("failed to generate random bytes: {0}")]
    Rng(#[from] getrandom::Error),
}

/// A wallet that can produce deterministic signatures
///
/// Drive keys are derived from a signature over a fixed message, so the
/// scheme must be free of random salts: the same wallet signing the same
/// message must always produce the same bytes.
pub trait WalletSigner: Send + Sync {
    /// Sign `msg`, returning the raw signature bytes
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError>;

    /// The public address of this wallet
    fn address(&self) -> String;
}

/// Hash public key material into a wallet address
pub fn owner_to_address(owner: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(owner))
}

/// JSON Web Key members of an RSA private key
#[derive(Deserialize)]
struct RsaJwk {
    kty: String,
    n: String,
    e: String,
    d: String,
    p: String,
    q: String,
}

/// An RSA wallet loaded from a JSON Web Key
///
/// Signs with RSASSA-PSS over SHA-256 using a zero-length salt, which makes
/// the signature a pure function of key and message.
#[derive(Clone)]
pub struct JwkWallet {
    key: RsaPrivateKey,
}

impl std::fmt::Debug for JwkWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwkWallet")
            .field("address", &self.address())
            .finish()
    }
}

impl From<RsaPrivateKey> for JwkWallet {
    fn from(key: RsaPrivateKey) -> Self {
        Self { key }
    }
}

impl JwkWallet {
    /// Parse an RSA wallet from its JWK JSON text
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyImport`] if the JSON is malformed, the key is
    /// not an RSA key, a member is not base64url, or the components do not
    /// form a consistent private key.
    pub fn from_jwk(json: &str) -> Result<Self, KeyError> {
        let jwk: RsaJwk = serde_json::from_str(json)
            .map_err(|e| KeyError::KeyImport(format!("malformed JWK: {}", e)))?;

        if jwk.kty != "RSA" {
            return Err(KeyError::KeyImport(format!(
                "expected an RSA JWK, got kty {:?}",
                jwk.kty
            )));
        }

        let n = jwk_uint("n", &jwk.n)?;
        let e = jwk_uint("e", &jwk.e)?;
        let d = jwk_uint("d", &jwk.d)?;
        let p = jwk_uint("p", &jwk.p)?;
        let q = jwk_uint("q", &jwk.q)?;

        let key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| KeyError::KeyImport(format!("invalid RSA components: {}", e)))?;
        key.validate()
            .map_err(|e| KeyError::KeyImport(format!("invalid RSA key: {}", e)))?;

        Ok(Self { key })
    }

    /// The RSA modulus, big-endian, as published on the ledger as the owner
    pub fn owner(&self) -> Vec<u8> {
        self.key.n().to_bytes_be()
    }
}

fn jwk_uint(member: &str, value: &str) -> Result<BigUint, KeyError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| KeyError::KeyImport(format!("JWK member {} is not base64url: {}", member, e)))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

impl WalletSigner for JwkWallet {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError> {
        let digest = Sha256::digest(msg);
        // A zero-length salt never draws from the rng, it is only used for blinding
        let mut rng = aes_gcm::aead::OsRng;
        self.key
            .sign_with_rng(&mut rng, Pss::new_with_salt::<Sha256>(0), &digest)
            .map_err(|e| anyhow::anyhow!("rsa-pss signing failed: {}", e).into())
    }

    fn address(&self) -> String {
        owner_to_address(&self.owner())
    }
}

/// An Ed25519 wallet
///
/// Ed25519 signatures are deterministic, so any Ed25519 key can stand in for
/// an RSA wallet when deriving drive keys.
///
/// # Examples
///
/// ```ignore
/// let wallet = Ed25519Wallet::generate();
///
/// // Persist to PEM format
/// std::fs::write("wallet.pem", wallet.to_pem())?;
///
/// // Load from PEM
/// let pem = std::fs::read_to_string("wallet.pem")?;
/// let recovered = Ed25519Wallet::from_pem(&pem)?;
/// ```
#[derive(Clone)]
pub struct Ed25519Wallet(SigningKey);

impl std::fmt::Debug for Ed25519Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Ed25519Wallet")
            .field(&self.address())
            .finish()
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for Ed25519Wallet {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&secret))
    }
}

impl Ed25519Wallet {
    /// Generate a new random wallet using a cryptographically secure RNG
    pub fn generate() -> Self {
        Self::try_generate().expect("failed to generate random bytes")
    }

    /// Like [`Ed25519Wallet::generate`], but reports an unavailable RNG
    pub fn try_generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut bytes)?;
        Ok(Self::from(bytes))
    }

    /// The 32-byte verifying key
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.verifying_key().to_bytes()
    }

    /// Convert secret key to raw bytes
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Encode the wallet in PEM format for storage
    ///
    /// Returns a PEM-encoded string with tag "PRIVATE KEY".
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new("PRIVATE KEY", self.to_bytes());
        pem::encode(&pem)
    }

    /// Parse a wallet from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PEM string is malformed
    /// - The PEM tag is not "PRIVATE KEY"
    /// - The key size is incorrect
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str)
            .map_err(|e| KeyError::KeyImport(format!("failed to parse PEM: {}", e)))?;

        if pem.tag() != "PRIVATE KEY" {
            return Err(KeyError::KeyImport(
                "invalid PEM tag, expected PRIVATE KEY".to_string(),
            ));
        }

        let contents = pem.contents();
        if contents.len() != PRIVATE_KEY_SIZE {
            return Err(KeyError::KeyImport(format!(
                "invalid private key size in PEM, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                contents.len()
            )));
        }

        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        bytes.copy_from_slice(contents);
        Ok(Self::from(bytes))
    }
}

impl WalletSigner for Ed25519Wallet {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError> {
        Ok(self.0.sign(msg).to_bytes().to_vec())
    }

    fn address(&self) -> String {
        owner_to_address(&self.public_key())
    }
}
