//! # CertProfile - Role-Based X.509 Certificate Issuance
//!
//! CertProfile builds and signs X.509 certificates for a small private PKI using
//! rustcrypto libraries. Every certificate is issued under one of three roles,
//! each with a fixed policy:
//!
//! | Role           | CA  | Key usage                          | Path length | Default validity |
//! |----------------|-----|------------------------------------|-------------|------------------|
//! | `Root`         | yes | keyCertSign, cRLSign               | 1           | 20 years         |
//! | `Intermediate` | yes | keyCertSign, cRLSign               | absent      | 10 years         |
//! | `Leaf`         | no  | digitalSignature, keyEncipherment  | absent      | 24 hours         |
//!
//! A [`profile::Profile`] starts from the role's template, applies an ordered
//! list of [`profile::ProfileOption`]s and, when no public key was supplied,
//! generates a key pair. [`profile::Profile::create_certificate`] signs it.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 to 8192-bit keys, signed with SHA-256
//! - **ECDSA**: P-256, P-384 and P-521 curves
//! - **Ed25519**
//!
//! ## Quick Start
//!
//! ### Issuing a Chain
//!
//! ```rust,no_run
//! use certprofile::profile::{Profile, ProfileOption};
//!
//! # fn main() -> Result<(), certprofile::error::CertProfileError> {
//! let root = Profile::root("Example Root CA", vec![])?
//!     .create_certificate()?
//!     .into_issuer()
//!     .expect("root key was generated");
//!
//! let intermediate = Profile::intermediate("Example Intermediate CA", &root, vec![])?
//!     .create_certificate()?
//!     .into_issuer()
//!     .expect("intermediate key was generated");
//!
//! let leaf = Profile::leaf(
//!     "service.example.com",
//!     &intermediate,
//!     vec![ProfileOption::with_hosts("service.example.com,10.0.0.7")],
//! )?
//! .create_certificate()?;
//!
//! println!("{}", leaf.certificate.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Signing a Request
//!
//! ```rust,no_run
//! use certprofile::{csr::SigningRequest, profile::{Profile, Role}};
//! # use certprofile::cert::CertificateWithPrivateKey;
//!
//! # fn sign(ca: &CertificateWithPrivateKey, pem: &str) -> Result<(), certprofile::error::CertProfileError> {
//! let request = SigningRequest::from_pem(pem)?;
//! request.verify_signature()?;
//!
//! let signed = Profile::with_signing_request(
//!     Role::Leaf,
//!     &request,
//!     ca,
//!     vec![],
//!     &mut rand_core::OsRng,
//! )?
//! .create_certificate()?;
//! assert!(signed.private_key.is_none());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use certprofile::{error::CertProfileError, key::KeyAlgorithm, profile::{Profile, ProfileOption}};
//!
//! let result = Profile::root(
//!     "Example Root CA",
//!     vec![ProfileOption::with_key_algorithm(KeyAlgorithm::Rsa { bits: 1024 })],
//! );
//! match result {
//!     Err(CertProfileError::MutatorError { mutator, reason, .. }) => {
//!         println!("option {mutator} rejected: {reason}")
//!     }
//!     Err(e) => println!("other error: {e}"),
//!     Ok(_) => unreachable!(),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`profile`]: Roles, profile options and certificate creation
//! - [`template`]: The unsigned certificate description profiles produce
//! - [`issuer`]: Template validation and signing
//! - [`cert`]: Certificate encoding, decoding and extensions
//! - [`csr`]: PKCS#10 signing requests
//! - [`key`]: Key generation and signature verification
//! - [`ca_service`]: Contract with a remote CA service
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure assembly

pub mod ca_service;
pub mod cert;
pub mod csr;
pub mod error;
pub mod issuer;
pub mod key;
pub mod profile;
pub mod tbs_certificate;
pub mod template;
