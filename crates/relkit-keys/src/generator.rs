use crate::provision::KeyError;
use sigstore::crypto::SigningScheme;

/// Private and public halves of a signing key, PEM-encoded.
#[derive(Clone)]
pub struct KeyPair {
    pub private_bytes: Vec<u8>,
    pub public_bytes: Vec<u8>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_bytes", &"[redacted]")
            .field("public_bytes", &String::from_utf8_lossy(&self.public_bytes))
            .finish()
    }
}

/// Abstraction over key generation for testability.
///
/// Production code uses [`CosignKeyGenerator`], tests use mockall-generated mocks.
pub trait KeyGenerator: Send + Sync {
    /// Generate a fresh key pair, encrypting the private half with `password`.
    fn generate(&self, password: &[u8]) -> Result<KeyPair, KeyError>;
}

/// Generates cosign-compatible keys: ECDSA P-256, the private key as an
/// `ENCRYPTED SIGSTORE PRIVATE KEY` PEM, the public key as SPKI PEM.
pub struct CosignKeyGenerator;

impl KeyGenerator for CosignKeyGenerator {
    fn generate(&self, password: &[u8]) -> Result<KeyPair, KeyError> {
        let generate_err = |e: sigstore::errors::SigstoreError| KeyError::Generate {
            detail: e.to_string(),
        };

        let signer = SigningScheme::ECDSA_P256_SHA256_ASN1
            .create_signer()
            .map_err(generate_err)?;
        let keys = signer.to_sigstore_keypair().map_err(generate_err)?;

        let private_pem = keys
            .private_key_to_encrypted_pem(password)
            .map_err(generate_err)?;
        let public_pem = keys.public_key_to_pem().map_err(generate_err)?;

        Ok(KeyPair {
            private_bytes: private_pem.as_bytes().to_vec(),
            public_bytes: public_pem.into_bytes(),
        })
    }
}
