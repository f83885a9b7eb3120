//! Role-based certificate profiles.
//!
//! A [`Profile`] is assembled from the role's default template, an optional
//! signing request, and an ordered list of [`ProfileOption`]s. When no public
//! key was supplied a key pair is generated only after every option succeeded.
//! [`Profile::create_certificate`] consumes the profile and signs it.

mod options;
mod role;

pub use options::{ProfileOption, is_valid_dns_name};
pub use role::{Role, RolePolicy};

use rand_core::CryptoRngCore;
use time::{Duration, OffsetDateTime};

use crate::cert::params::{DistinguishedName, truncate_to_seconds};
use crate::cert::{Certificate, CertificateWithPrivateKey, Result};
use crate::csr::SigningRequest;
use crate::error::CertProfileError;
use crate::issuer::{Issuer, SelfIssuer};
use crate::key::{KeyAlgorithm, KeyPair, PublicKey};
use crate::template::CertificateTemplate;
use options::ProfileState;

/// Serial numbers are 128 random bits, kept positive.
const SERIAL_NUMBER_LEN: usize = 16;

/// A finalized template bound to its role and issuer, ready to be signed.
pub struct Profile<'a> {
    role: Role,
    template: CertificateTemplate,
    issuer: Option<&'a dyn Issuer>,
    subject_key: Option<KeyPair>,
    applied_options: Vec<&'static str>,
}

impl std::fmt::Debug for Profile<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("role", &self.role)
            .field("template", &self.template)
            .field("self_signed", &self.issuer.is_none())
            .field("subject_key", &self.subject_key)
            .field("applied_options", &self.applied_options)
            .finish()
    }
}

/// Output of [`Profile::create_certificate`].
#[derive(Debug)]
pub struct SignedCertificate {
    pub der: Vec<u8>,
    pub certificate: Certificate,
    /// Present only when the profile generated the subject key pair.
    pub private_key: Option<KeyPair>,
}

impl SignedCertificate {
    /// Pairs the certificate with its generated key so it can issue further
    /// certificates. `None` when the key came from outside.
    pub fn into_issuer(self) -> Option<CertificateWithPrivateKey> {
        let key = self.private_key?;
        Some(CertificateWithPrivateKey {
            cert: self.certificate,
            key,
        })
    }
}

impl<'a> Profile<'a> {
    /// Builds a profile for `role` with a generated (or option-supplied) key.
    ///
    /// Roots take no issuer and sign themselves; intermediates and leaves need one.
    pub fn new<R: CryptoRngCore>(
        role: Role,
        subject: DistinguishedName,
        issuer: Option<&'a dyn Issuer>,
        options: Vec<ProfileOption>,
        rng: &mut R,
    ) -> Result<Self> {
        let subject = subject.as_x509_name()?;
        let issuer_name = match (role, issuer) {
            (Role::Root, None) => subject.clone(),
            (Role::Root, Some(_)) => {
                return Err(CertProfileError::InvalidInput(
                    "root profiles are self-signed and take no issuer".to_string(),
                ));
            }
            (_, Some(issuer)) => issuer.issuer_name()?,
            (_, None) => {
                return Err(CertProfileError::InvalidInput(format!(
                    "{role} profiles need an issuer"
                )));
            }
        };

        let now = truncate_to_seconds(OffsetDateTime::now_utc());
        let template = role.build_template_at(subject, issuer_name, now);
        Self::assemble(role, now, template, issuer, options, rng)
    }

    /// Builds a profile whose subject, SANs, extensions and public key come from
    /// `request`. No key pair is generated.
    ///
    /// A request without a public key fails with
    /// [`CertProfileError::MissingPublicKey`] before anything else happens.
    pub fn with_signing_request<R: CryptoRngCore>(
        role: Role,
        request: &SigningRequest,
        issuer: &'a dyn Issuer,
        mut options: Vec<ProfileOption>,
        rng: &mut R,
    ) -> Result<Self> {
        let now = truncate_to_seconds(OffsetDateTime::now_utc());
        let template = adapt_signing_request_at(role, request, issuer, now)?;
        if role == Role::Root {
            return Err(CertProfileError::InvalidInput(
                "root profiles cannot be built from a signing request".to_string(),
            ));
        }

        if let Some(public_key) = &template.subject_public_key {
            options.push(ProfileOption::PublicKey(public_key.clone()));
        }
        Self::assemble(role, now, template, Some(issuer), options, rng)
    }

    /// Self-signed root using the operating system's CSPRNG.
    pub fn root(name: &str, options: Vec<ProfileOption>) -> Result<Self> {
        Self::new(
            Role::Root,
            DistinguishedName::from_common_name(name),
            None,
            options,
            &mut rand_core::OsRng,
        )
    }

    /// Intermediate CA using the operating system's CSPRNG.
    pub fn intermediate(
        name: &str,
        issuer: &'a dyn Issuer,
        options: Vec<ProfileOption>,
    ) -> Result<Self> {
        Self::new(
            Role::Intermediate,
            DistinguishedName::from_common_name(name),
            Some(issuer),
            options,
            &mut rand_core::OsRng,
        )
    }

    /// Leaf certificate using the operating system's CSPRNG.
    pub fn leaf(name: &str, issuer: &'a dyn Issuer, options: Vec<ProfileOption>) -> Result<Self> {
        Self::new(
            Role::Leaf,
            DistinguishedName::from_common_name(name),
            Some(issuer),
            options,
            &mut rand_core::OsRng,
        )
    }

    fn assemble<R: CryptoRngCore>(
        role: Role,
        now: OffsetDateTime,
        template: CertificateTemplate,
        issuer: Option<&'a dyn Issuer>,
        options: Vec<ProfileOption>,
        rng: &mut R,
    ) -> Result<Self> {
        tracing::debug!(%role, default_duration = %role.default_duration(), "building profile");

        let mut state = ProfileState {
            role,
            now,
            template,
            key_algorithm: KeyAlgorithm::default(),
        };
        let mut applied_options = Vec::with_capacity(options.len());
        for option in options {
            let mutator = option.name();
            option
                .apply(&mut state)
                .map_err(|reason| CertProfileError::MutatorError {
                    role,
                    mutator,
                    reason,
                })?;
            tracing::debug!(%role, mutator, "applied profile option");
            applied_options.push(mutator);
        }

        let ProfileState {
            mut template,
            key_algorithm,
            ..
        } = state;

        template.serial_number = generate_serial(rng);

        let subject_key = if template.subject_public_key.is_none() {
            let key_pair = generate_subject_key(role, key_algorithm, rng)?;
            template.subject_public_key = Some(key_pair.public_key());
            Some(key_pair)
        } else {
            None
        };

        Ok(Self {
            role,
            template,
            issuer,
            subject_key,
            applied_options,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn default_duration(&self) -> Duration {
        self.role.default_duration()
    }

    pub fn template(&self) -> &CertificateTemplate {
        &self.template
    }

    pub fn subject_public_key(&self) -> Option<&PublicKey> {
        self.template.subject_public_key.as_ref()
    }

    /// The generated key pair; `None` when the public key was supplied.
    pub fn subject_private_key(&self) -> Option<&KeyPair> {
        self.subject_key.as_ref()
    }

    /// Names of the options applied, in order.
    pub fn applied_options(&self) -> &[&'static str] {
        &self.applied_options
    }

    /// Signs the template with the issuer key, or with the generated key for roots.
    pub fn create_certificate(self) -> Result<SignedCertificate> {
        let role = self.role;
        let certificate = match self.issuer {
            Some(issuer) => issuer.issue(&self.template, role)?,
            None => {
                let key = self
                    .subject_key
                    .as_ref()
                    .ok_or_else(|| CertProfileError::SigningError {
                        role,
                        reason: "self-signed profile has no private key to sign with".to_string(),
                    })?;
                SelfIssuer {
                    name: self.template.subject.clone(),
                    key,
                }
                .issue(&self.template, role)?
            }
        };
        let der = certificate.to_der()?;

        tracing::info!(
            %role,
            subject = %self.template.subject,
            serial = %hex(&self.template.serial_number),
            "signed certificate"
        );

        Ok(SignedCertificate {
            der,
            certificate,
            private_key: self.subject_key,
        })
    }
}

/// Overlays a signing request on the role's default template.
///
/// The issuer name comes from `issuer`; subject, SANs, extensions and public key
/// come from the request unchanged.
pub fn adapt_signing_request(
    role: Role,
    request: &SigningRequest,
    issuer: &dyn Issuer,
) -> Result<CertificateTemplate> {
    adapt_signing_request_at(
        role,
        request,
        issuer,
        truncate_to_seconds(OffsetDateTime::now_utc()),
    )
}

fn adapt_signing_request_at(
    role: Role,
    request: &SigningRequest,
    issuer: &dyn Issuer,
    now: OffsetDateTime,
) -> Result<CertificateTemplate> {
    let public_key = request
        .public_key
        .clone()
        .ok_or(CertProfileError::MissingPublicKey { role })?;

    let mut template = role.build_template_at(request.subject.clone(), issuer.issuer_name()?, now);
    template.extra_extensions = request.extensions.clone();
    template.subject_alt_names = request.subject_alt_names.clone();
    template.subject_public_key = Some(public_key);

    tracing::debug!(
        %role,
        subject = %request.subject,
        extensions = request.extensions.len(),
        "adapted signing request"
    );
    Ok(template)
}

fn generate_subject_key<R: CryptoRngCore>(
    role: Role,
    algorithm: KeyAlgorithm,
    rng: &mut R,
) -> Result<KeyPair> {
    KeyPair::generate(algorithm, rng).map_err(|e| match e {
        CertProfileError::KeyGenerationError {
            algorithm, reason, ..
        } => CertProfileError::KeyGenerationError {
            role: Some(role),
            algorithm,
            reason,
        },
        other => other,
    })
}

fn generate_serial<R: CryptoRngCore>(rng: &mut R) -> Vec<u8> {
    let mut serial = vec![0u8; SERIAL_NUMBER_LEN];
    rng.fill_bytes(&mut serial);
    serial[0] &= 0x7f;
    if serial[0] == 0 {
        serial[0] = 1;
    }
    serial
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_is_positive_and_nonzero() {
        let mut rng = rand_core::OsRng;
        for _ in 0..64 {
            let serial = generate_serial(&mut rng);
            assert_eq!(serial.len(), SERIAL_NUMBER_LEN);
            assert!(serial[0] > 0 && serial[0] < 0x80);
        }
    }

    #[test]
    fn test_key_generation_failure_names_the_role() {
        let err = generate_subject_key(
            Role::Intermediate,
            KeyAlgorithm::Rsa { bits: 1024 },
            &mut rand_core::OsRng,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CertProfileError::KeyGenerationError {
                role: Some(Role::Intermediate),
                algorithm: KeyAlgorithm::Rsa { bits: 1024 },
                ..
            }
        ));
        assert!(err.to_string().starts_with("intermediate profile:"));
    }

    #[test]
    fn test_root_signs_itself() {
        let profile = Profile::root("Example Root CA", vec![]).unwrap();
        assert_eq!(profile.template().issuer, profile.template().subject);
        let signed = profile.create_certificate().unwrap();
        let key = signed.private_key.as_ref().unwrap();
        signed
            .certificate
            .verify_signed_by(&key.public_key())
            .unwrap();
        assert_eq!(Certificate::from_der(&signed.der).unwrap(), signed.certificate);
    }
}
