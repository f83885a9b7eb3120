use std::fmt;

use const_oid::ObjectIdentifier;
use der::asn1::BitString;
use der::{Any, Tag, Tagged};
use ecdsa::signature::{SignatureEncoding, Signer, Verifier};
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use p521::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::CryptoRngCore;
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey},
    traits::PublicKeyParts,
};
use sha2::Sha256;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::{Result, SignatureAlgorithm};
use crate::error::CertProfileError;

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

/// Smallest RSA modulus accepted for generated keys.
pub const MIN_RSA_BITS: usize = 2048;
/// Largest RSA modulus accepted for generated keys.
pub const MAX_RSA_BITS: usize = 8192;

/// Key type and size used when a profile has to generate its own key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyAlgorithm {
    Rsa {
        bits: usize,
    },
    #[default]
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Ed25519,
}

impl KeyAlgorithm {
    /// Checks the parameters without generating anything.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match *self {
            KeyAlgorithm::Rsa { bits } if bits < MIN_RSA_BITS => Err(format!(
                "RSA keys must be at least {MIN_RSA_BITS} bits, got {bits}"
            )),
            KeyAlgorithm::Rsa { bits } if bits > MAX_RSA_BITS => Err(format!(
                "RSA keys must be at most {MAX_RSA_BITS} bits, got {bits}"
            )),
            KeyAlgorithm::Rsa { bits } if bits % 8 != 0 => {
                Err(format!("RSA key size must be a multiple of 8, got {bits}"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa { bits } => write!(f, "RSA-{bits}"),
            KeyAlgorithm::EcdsaP256 => f.write_str("ECDSA P-256"),
            KeyAlgorithm::EcdsaP384 => f.write_str("ECDSA P-384"),
            KeyAlgorithm::EcdsaP521 => f.write_str("ECDSA P-521"),
            KeyAlgorithm::Ed25519 => f.write_str("Ed25519"),
        }
    }
}

/// Supported key types for certificate operations.
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    EcdsaP521 {
        secret: p521::SecretKey,
        public: p521::PublicKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generates a key pair of the given algorithm from `rng`.
    pub fn generate<R: CryptoRngCore>(algorithm: KeyAlgorithm, rng: &mut R) -> Result<Self> {
        algorithm
            .validate()
            .map_err(|reason| CertProfileError::KeyGenerationError {
                role: None,
                algorithm,
                reason,
            })?;

        let key_pair = match algorithm {
            KeyAlgorithm::Rsa { bits } => {
                let private = RsaPrivateKey::new(rng, bits).map_err(|e| {
                    CertProfileError::KeyGenerationError {
                        role: None,
                        algorithm,
                        reason: e.to_string(),
                    }
                })?;
                let public = RsaPublicKey::from(&private);
                KeyPair::Rsa {
                    private: Box::new(private),
                    public,
                }
            }
            KeyAlgorithm::EcdsaP256 => {
                let signing_key = P256SigningKey::random(rng);
                let verifying_key = signing_key.verifying_key().to_owned();
                KeyPair::EcdsaP256 {
                    signing_key,
                    verifying_key,
                }
            }
            KeyAlgorithm::EcdsaP384 => {
                let signing_key = P384SigningKey::random(rng);
                let verifying_key = signing_key.verifying_key().to_owned();
                KeyPair::EcdsaP384 {
                    signing_key,
                    verifying_key,
                }
            }
            KeyAlgorithm::EcdsaP521 => {
                let secret = p521::SecretKey::random(rng);
                let public = secret.public_key();
                KeyPair::EcdsaP521 { secret, public }
            }
            KeyAlgorithm::Ed25519 => KeyPair::Ed25519 {
                signing_key: Ed25519SigningKey::generate(rng),
            },
        };

        tracing::debug!(%algorithm, "generated key pair");
        Ok(key_pair)
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let signing_key = P256SigningKey::random(&mut rand_core::OsRng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut rand_core::OsRng);
        KeyPair::Ed25519 { signing_key }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa { public, .. } => KeyAlgorithm::Rsa {
                bits: public.size() * 8,
            },
            KeyPair::EcdsaP256 { .. } => KeyAlgorithm::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyAlgorithm::EcdsaP384,
            KeyPair::EcdsaP521 { .. } => KeyAlgorithm::EcdsaP521,
            KeyPair::Ed25519 { .. } => KeyAlgorithm::Ed25519,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::EcdsaP521 { public, .. } => PublicKey::EcdsaP521(*public),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// The signature algorithm certificates signed by this key are issued under.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::EcdsaP521 { .. } => SignatureAlgorithm::Sha512WithECDSA,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    /// Signs `data` under [`KeyPair::signature_algorithm`]. ECDSA signatures are DER encoded.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_error = |e: ecdsa::signature::Error| {
            CertProfileError::EncodingError(format!("signature failed: {e}"))
        };

        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key =
                    rsa::pkcs1v15::SigningKey::<Sha256>::new(*(private.clone()));
                let signature = signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP521 { secret, .. } => {
                let signing_key = p521::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
                    .map_err(signing_error)?;
                let signature: p521::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature = signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

/// Public half of a supported key, as carried in templates and signing requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    EcdsaP521(p521::PublicKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKey::Rsa(public) => KeyAlgorithm::Rsa {
                bits: public.size() * 8,
            },
            PublicKey::EcdsaP256(_) => KeyAlgorithm::EcdsaP256,
            PublicKey::EcdsaP384(_) => KeyAlgorithm::EcdsaP384,
            PublicKey::EcdsaP521(_) => KeyAlgorithm::EcdsaP521,
            PublicKey::Ed25519(_) => KeyAlgorithm::Ed25519,
        }
    }

    /// Encodes the key as a SubjectPublicKeyInfo.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let (oid, parameters, key_bytes) = match self {
            PublicKey::Rsa(public) => (
                RSA_ENCRYPTION,
                Some(Any::new(Tag::Null, Vec::<u8>::new())?),
                public.to_pkcs1_der()?.as_bytes().to_vec(),
            ),
            PublicKey::EcdsaP256(verifying_key) => (
                ID_EC_PUBLIC_KEY,
                Some(Any::new(Tag::ObjectIdentifier, SECP256R1.as_bytes())?),
                verifying_key.to_encoded_point(false).as_bytes().to_vec(),
            ),
            PublicKey::EcdsaP384(verifying_key) => (
                ID_EC_PUBLIC_KEY,
                Some(Any::new(Tag::ObjectIdentifier, SECP384R1.as_bytes())?),
                verifying_key.to_encoded_point(false).as_bytes().to_vec(),
            ),
            PublicKey::EcdsaP521(public) => (
                ID_EC_PUBLIC_KEY,
                Some(Any::new(Tag::ObjectIdentifier, SECP521R1.as_bytes())?),
                public.to_encoded_point(false).as_bytes().to_vec(),
            ),
            PublicKey::Ed25519(verifying_key) => (
                const_oid::db::rfc8410::ID_ED_25519,
                None,
                verifying_key.to_bytes().to_vec(),
            ),
        };

        Ok(SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned { oid, parameters },
            subject_public_key: BitString::from_bytes(&key_bytes)?,
        })
    }

    /// Decodes a SubjectPublicKeyInfo into one of the supported key types.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let key_bytes = spki.subject_public_key.raw_bytes();
        let invalid_key =
            |e: &dyn fmt::Display| CertProfileError::DecodingError(format!("invalid public key: {e}"));

        match spki.algorithm.oid {
            RSA_ENCRYPTION => Ok(PublicKey::Rsa(RsaPublicKey::from_pkcs1_der(key_bytes)?)),
            ID_EC_PUBLIC_KEY => {
                let curve = match &spki.algorithm.parameters {
                    Some(params) if params.tag() == Tag::ObjectIdentifier => {
                        ObjectIdentifier::from_bytes(params.value())?
                    }
                    _ => {
                        return Err(CertProfileError::DecodingError(
                            "EC public key without named curve".to_string(),
                        ));
                    }
                };
                match curve {
                    SECP256R1 => P256VerifyingKey::from_sec1_bytes(key_bytes)
                        .map(PublicKey::EcdsaP256)
                        .map_err(|e| invalid_key(&e)),
                    SECP384R1 => P384VerifyingKey::from_sec1_bytes(key_bytes)
                        .map(PublicKey::EcdsaP384)
                        .map_err(|e| invalid_key(&e)),
                    SECP521R1 => p521::PublicKey::from_sec1_bytes(key_bytes)
                        .map(PublicKey::EcdsaP521)
                        .map_err(|e| invalid_key(&e)),
                    other => Err(CertProfileError::DecodingError(format!(
                        "unsupported EC curve {other}"
                    ))),
                }
            }
            const_oid::db::rfc8410::ID_ED_25519 => {
                let bytes: [u8; 32] = key_bytes.try_into().map_err(|_| {
                    CertProfileError::DecodingError("Ed25519 key must be 32 bytes".to_string())
                })?;
                Ed25519VerifyingKey::from_bytes(&bytes)
                    .map(PublicKey::Ed25519)
                    .map_err(|e| invalid_key(&e))
            }
            other => Err(CertProfileError::DecodingError(format!(
                "unsupported public key algorithm {other}"
            ))),
        }
    }

    /// SHA-1 over the subjectPublicKey bits (RFC 5280 4.2.1.2, method 1).
    pub fn key_identifier(&self) -> Result<Vec<u8>> {
        let spki = self.to_spki()?;
        let digest = <sha1::Sha1 as sha1::Digest>::digest(spki.subject_public_key.raw_bytes());
        Ok(digest.to_vec())
    }

    /// Verifies `signature` over `data`. Only the algorithm this key signs
    /// with is accepted.
    pub fn verify(
        &self,
        algorithm: &AlgorithmIdentifierOwned,
        data: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let expected: AlgorithmIdentifierOwned = match self {
            PublicKey::Rsa(_) => SignatureAlgorithm::Sha256WithRSA,
            PublicKey::EcdsaP256(_) => SignatureAlgorithm::Sha256WithECDSA,
            PublicKey::EcdsaP384(_) => SignatureAlgorithm::Sha384WithECDSA,
            PublicKey::EcdsaP521(_) => SignatureAlgorithm::Sha512WithECDSA,
            PublicKey::Ed25519(_) => SignatureAlgorithm::Ed25519,
        }
        .into();
        if expected.oid != algorithm.oid {
            return Err(CertProfileError::InvalidInput(format!(
                "signature algorithm {} does not match {} key",
                algorithm.oid,
                self.algorithm()
            )));
        }

        let bad_signature =
            |e: ecdsa::signature::Error| CertProfileError::InvalidInput(format!("bad signature: {e}"));

        match self {
            PublicKey::Rsa(public) => {
                let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
                let signature =
                    rsa::pkcs1v15::Signature::try_from(signature).map_err(bad_signature)?;
                verifying_key.verify(data, &signature).map_err(bad_signature)
            }
            PublicKey::EcdsaP256(verifying_key) => {
                let signature =
                    p256::ecdsa::Signature::from_der(signature).map_err(bad_signature)?;
                verifying_key.verify(data, &signature).map_err(bad_signature)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                let signature =
                    p384::ecdsa::Signature::from_der(signature).map_err(bad_signature)?;
                verifying_key.verify(data, &signature).map_err(bad_signature)
            }
            PublicKey::EcdsaP521(public) => {
                let encoded = public.to_encoded_point(false);
                let verifying_key = p521::ecdsa::VerifyingKey::from_sec1_bytes(encoded.as_bytes())
                    .map_err(bad_signature)?;
                let signature =
                    p521::ecdsa::Signature::from_der(signature).map_err(bad_signature)?;
                verifying_key.verify(data, &signature).map_err(bad_signature)
            }
            PublicKey::Ed25519(verifying_key) => {
                let signature =
                    ed25519_dalek::Signature::from_slice(signature).map_err(bad_signature)?;
                verifying_key.verify(data, &signature).map_err(bad_signature)
            }
        }
    }
}
