//! PKCS#10 signing requests, reduced to what a profile takes from them.

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use x509_cert::name::Name;
use x509_cert::request::CertReq;

use crate::cert::Result;
use crate::cert::extensions::{SubjectAltName, ToAndFromX509Extension};
use crate::cert::params::ExtensionParam;
use crate::error::CertProfileError;
use crate::key::PublicKey;

/// PKCS#9 extensionRequest attribute.
const ID_EXTENSION_REQ: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// A certificate signing request.
///
/// `public_key` is optional so callers can hand over requests assembled from
/// other sources; profiles refuse requests without one. `extensions` holds every
/// requested extension verbatim, in request order, while `subject_alt_names`
/// is the decoded view of the SAN extension among them. `subject` is the
/// request's name as encoded and is copied into certificates unchanged.
#[derive(Clone, Debug, Builder, PartialEq, Eq)]
pub struct SigningRequest {
    pub subject: Name,
    pub public_key: Option<PublicKey>,
    #[builder(default)]
    pub subject_alt_names: SubjectAltName,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
    #[builder(skip)]
    raw: Option<CertReq>,
}

impl SigningRequest {
    /// Parses a DER encoded PKCS#10 request.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let request = CertReq::from_der(der)?;
        let info = &request.info;

        let subject = info.subject.clone();
        let public_key = PublicKey::from_x509spki(&info.public_key)?;

        let mut extensions = Vec::new();
        for attribute in info.attributes.iter() {
            if attribute.oid != ID_EXTENSION_REQ {
                continue;
            }
            for value in attribute.values.iter() {
                let requested = Vec::<x509_cert::ext::Extension>::from_der(&value.to_der()?)?;
                extensions.extend(requested.iter().map(ExtensionParam::from_x509));
            }
        }

        let subject_alt_names = match extensions.iter().find(|ext| ext.oid == SubjectAltName::OID)
        {
            Some(ext) => ext.to_extension::<SubjectAltName>()?,
            None => SubjectAltName::default(),
        };

        tracing::debug!(
            subject = %subject,
            extensions = extensions.len(),
            "parsed signing request"
        );

        Ok(Self {
            subject,
            public_key: Some(public_key),
            subject_alt_names,
            extensions,
            raw: Some(request),
        })
    }

    /// Parses a PEM encoded PKCS#10 request.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let pem = pem::parse(pem_str).map_err(|e| CertProfileError::DecodingError(e.to_string()))?;
        match pem.tag() {
            "CERTIFICATE REQUEST" | "NEW CERTIFICATE REQUEST" => Self::from_der(pem.contents()),
            other => Err(CertProfileError::DecodingError(format!(
                "expected CERTIFICATE REQUEST PEM block, found {other}"
            ))),
        }
    }

    /// Checks the request's self-signature. Only requests that were parsed
    /// from DER or PEM carry one.
    pub fn verify_signature(&self) -> Result<()> {
        let request = self.raw.as_ref().ok_or_else(|| {
            CertProfileError::InvalidInput("signing request was not parsed from DER".to_string())
        })?;
        let public_key = self
            .public_key
            .as_ref()
            .ok_or_else(|| CertProfileError::InvalidInput("no public key".to_string()))?;
        let signature = request.signature.as_bytes().ok_or_else(|| {
            CertProfileError::DecodingError("signature has unused bits".to_string())
        })?;
        public_key.verify(&request.algorithm, &request.info.to_der()?, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::DistinguishedName;
    use crate::key::KeyPair;

    #[test]
    fn test_built_request_has_no_signature_to_check() {
        let request = SigningRequest::builder()
            .subject(
                DistinguishedName::from_common_name("api.example.com")
                    .as_x509_name()
                    .unwrap(),
            )
            .public_key(KeyPair::generate_ecdsa_p256().public_key())
            .build();
        assert!(request.extensions.is_empty());
        assert!(request.subject_alt_names.is_empty());
        assert!(matches!(
            request.verify_signature(),
            Err(CertProfileError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_certificate_pem_is_not_a_request() {
        let pem = pem::encode(&pem::Pem::new("CERTIFICATE", vec![0x30, 0x00]));
        assert!(matches!(
            SigningRequest::from_pem(&pem),
            Err(CertProfileError::DecodingError(_))
        ));
    }

    #[test]
    fn test_garbage_der_is_rejected() {
        assert!(SigningRequest::from_der(&[0x30, 0x03, 0x02, 0x01, 0x00]).is_err());
    }
}
