use der::Encode;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::extensions::{KeyUsages, SubjectKeyIdentifier, ToAndFromX509Extension};
use crate::cert::{Certificate, Result};
use crate::error::CertProfileError;
use crate::key::KeyPair;
use crate::profile::Role;
use crate::tbs_certificate::TbsCertificate;
use crate::template::CertificateTemplate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and sign templates.
pub trait Issuer {
    /// Returns the issuer's name exactly as its own certificate encodes it.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// The issuer's own certificate, `None` when issuing self-signed.
    fn certificate(&self) -> Option<&Certificate>;

    /// Signs `template` as a certificate of the given role.
    ///
    /// Any failure, including encoding problems in the template, is reported as
    /// [`CertProfileError::SigningError`]; no partial certificate is returned.
    fn issue(&self, template: &CertificateTemplate, role: Role) -> Result<Certificate> {
        sign_template(self, template, role).map_err(|e| match e {
            CertProfileError::SigningError { .. } => e,
            other => CertProfileError::SigningError {
                role,
                reason: other.to_string(),
            },
        })
    }
}

fn sign_template<I: Issuer + ?Sized>(
    issuer: &I,
    template: &CertificateTemplate,
    role: Role,
) -> Result<Certificate> {
    let fail = |reason: String| CertProfileError::SigningError { role, reason };

    validate_template(template, role).map_err(fail)?;

    let subject_public_key = template
        .subject_public_key
        .as_ref()
        .ok_or_else(|| fail("template has no subject public key".to_string()))?;

    let signing_key = issuer.signing_key();
    let authority_key_id = match issuer.certificate() {
        Some(issuer_cert) => {
            if !issuer_cert.is_ca() {
                return Err(fail("issuer certificate is not a CA".to_string()));
            }
            if issuer_cert.public_key()? != signing_key.public_key() {
                return Err(fail(
                    "issuer private key does not match the issuer certificate".to_string(),
                ));
            }
            let key_id = match issuer_cert.extension(SubjectKeyIdentifier::OID) {
                Some(ext) => ext.to_extension::<SubjectKeyIdentifier>()?.0,
                None => signing_key.public_key().key_identifier()?,
            };
            Some(key_id)
        }
        None => None,
    };

    let signature_algorithm = signing_key.signature_algorithm();
    let tbs_cert = TbsCertificate::from_template(
        template,
        subject_public_key,
        signature_algorithm,
        authority_key_id,
    )?;
    let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;

    let signature = signing_key.sign_data(&tbs_cert_inner.to_der()?)?;

    let cert_inner = CertificateInner {
        tbs_certificate: tbs_cert_inner,
        signature_algorithm: signature_algorithm.into(),
        signature: der::asn1::BitString::from_bytes(&signature)?,
    };

    Ok(Certificate { inner: cert_inner })
}

/// Structural checks a template must pass before it is signed.
fn validate_template(
    template: &CertificateTemplate,
    role: Role,
) -> std::result::Result<(), String> {
    if !template.validity.is_well_formed() {
        return Err(format!(
            "notAfter {} is not after notBefore {}",
            template.validity.not_after, template.validity.not_before
        ));
    }
    if template.is_ca && !template.basic_constraints_valid {
        return Err("isCA requires valid basic constraints".to_string());
    }
    if role.is_ca() {
        if !template.is_ca {
            return Err(format!("{role} certificates must be CAs"));
        }
        if !template.key_usage.contains(KeyUsages::KeyCertSign) {
            return Err(format!("{role} certificates need the certificate-signing key usage"));
        }
        if !template.key_usage.contains(KeyUsages::CRLSign) {
            return Err(format!("{role} certificates need the CRL-signing key usage"));
        }
    } else if template.is_ca {
        return Err(format!("{role} certificates must not be CAs"));
    }
    if !(-1..=i32::from(u8::MAX)).contains(&template.max_path_len) {
        return Err(format!(
            "path length {} is out of range",
            template.max_path_len
        ));
    }
    if template.serial_number.is_empty() {
        return Err("serial number is empty".to_string());
    }
    Ok(())
}

/// Issuer for self-signed certificates: the subject signs with its own key.
pub struct SelfIssuer<'a> {
    pub name: Name,
    pub key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.name.clone())
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn certificate(&self) -> Option<&Certificate> {
        None
    }
}
