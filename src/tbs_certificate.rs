use std::time::SystemTime;

use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;

use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
};
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::CertProfileError;
use crate::key::PublicKey;
use crate::template::CertificateTemplate;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - X.509 extensions in encoding order.
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Lays out a template for signing.
    ///
    /// Generated extensions come first: basic constraints (critical), key usage
    /// (critical), extended key usage, subject alternative names (critical when
    /// the subject is empty), subject key identifier and, when
    /// `authority_key_id` is given, authority key identifier. The template's
    /// extra extensions follow and replace generated ones sharing an OID.
    pub fn from_template(
        template: &CertificateTemplate,
        subject_public_key: &PublicKey,
        signature_algorithm: SignatureAlgorithm,
        authority_key_id: Option<Vec<u8>>,
    ) -> Result<Self, CertProfileError> {
        let mut generated = Vec::new();

        if template.basic_constraints_valid {
            let basic_constraints = BasicConstraints {
                is_ca: template.is_ca,
                max_path_length: if template.is_ca {
                    template.path_len_constraint()
                } else {
                    None
                },
            };
            generated.push(ExtensionParam::from_extension(&basic_constraints, true)?);
        }

        if !template.key_usage.is_empty() {
            generated.push(ExtensionParam::from_extension(
                &KeyUsage(template.key_usage),
                true,
            )?);
        }

        if !template.extended_key_usage.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: template.extended_key_usage.clone(),
            };
            generated.push(ExtensionParam::from_extension(&extended_key_usage, false)?);
        }

        if !template.subject_alt_names.is_empty() {
            generated.push(ExtensionParam::from_extension(
                &template.subject_alt_names,
                template.subject.0.is_empty(),
            )?);
        }

        let subject_key_id = SubjectKeyIdentifier(subject_public_key.key_identifier()?);
        generated.push(ExtensionParam::from_extension(&subject_key_id, false)?);

        if let Some(key_identifier) = authority_key_id {
            let authority_key_id = AuthorityKeyIdentifier { key_identifier };
            generated.push(ExtensionParam::from_extension(&authority_key_id, false)?);
        }

        let extensions = generated
            .into_iter()
            .filter(|ext| {
                !template
                    .extra_extensions
                    .iter()
                    .any(|extra| extra.oid == ext.oid)
            })
            .chain(template.extra_extensions.iter().cloned())
            .collect();

        Ok(Self {
            serial_number: template.serial_number.clone(),
            signature_algorithm,
            issuer: template.issuer.clone(),
            validity: template.validity,
            subject: template.subject.clone(),
            subject_public_key: subject_public_key.clone(),
            extensions,
        })
    }

    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner, CertProfileError> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>, CertProfileError>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(self.serial_number.as_slice())?,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }
}

/// UTCTime through 2049, GeneralizedTime from 2050 on (RFC 5280 4.1.2.5).
fn to_x509_time(t: OffsetDateTime) -> Result<x509_cert::time::Time, CertProfileError> {
    let system_time = SystemTime::from(t);
    if t.year() < 2050 {
        Ok(x509_cert::time::Time::UtcTime(UtcTime::from_system_time(
            system_time,
        )?))
    } else {
        Ok(x509_cert::time::Time::GeneralTime(
            GeneralizedTime::from_system_time(system_time)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::{KeyUsages, SubjectAltName, ToAndFromX509Extension};
    use crate::cert::params::DistinguishedName;
    use crate::key::KeyPair;

    fn leaf_template(public_key: &PublicKey) -> CertificateTemplate {
        CertificateTemplate {
            serial_number: vec![0x42],
            subject: DistinguishedName::from_common_name("leaf.example.com")
                .as_x509_name()
                .unwrap(),
            issuer: DistinguishedName::from_common_name("Example CA")
                .as_x509_name()
                .unwrap(),
            validity: Validity::for_days(1),
            is_ca: false,
            basic_constraints_valid: true,
            max_path_len: 0,
            max_path_len_zero: false,
            key_usage: KeyUsages::DigitalSignature.into(),
            extended_key_usage: Vec::new(),
            subject_alt_names: SubjectAltName {
                dns_names: vec!["leaf.example.com".to_string()],
                ..Default::default()
            },
            extra_extensions: Vec::new(),
            subject_public_key: Some(public_key.clone()),
        }
    }

    #[test]
    fn test_extra_extension_replaces_generated_one() {
        let key = KeyPair::generate_ecdsa_p256().public_key();
        let mut template = leaf_template(&key);
        let carried = SubjectAltName {
            dns_names: vec!["carried.example.com".to_string()],
            ..Default::default()
        };
        template.extra_extensions = vec![ExtensionParam::from_extension(&carried, false).unwrap()];

        let tbs = TbsCertificate::from_template(
            &template,
            &key,
            SignatureAlgorithm::Sha256WithECDSA,
            None,
        )
        .unwrap();

        let sans: Vec<_> = tbs
            .extensions
            .iter()
            .filter(|ext| ext.oid == SubjectAltName::OID)
            .collect();
        assert_eq!(sans.len(), 1);
        assert_eq!(sans[0], &template.extra_extensions[0]);
    }

    #[test]
    fn test_san_is_critical_only_for_empty_subject() {
        let key = KeyPair::generate_ecdsa_p256().public_key();
        let mut template = leaf_template(&key);
        let san_critical = |template: &CertificateTemplate| {
            TbsCertificate::from_template(template, &key, SignatureAlgorithm::Sha256WithECDSA, None)
                .unwrap()
                .extensions
                .iter()
                .find(|ext| ext.oid == SubjectAltName::OID)
                .unwrap()
                .critical
        };
        assert!(!san_critical(&template));
        template.subject = Name::default();
        assert!(san_critical(&template));
    }

    #[test]
    fn test_far_future_uses_generalized_time() {
        let far = OffsetDateTime::from_unix_timestamp(4_102_444_800).unwrap(); // 2100-01-01
        assert!(matches!(
            to_x509_time(far).unwrap(),
            x509_cert::time::Time::GeneralTime(_)
        ));
        let near = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert!(matches!(
            to_x509_time(near).unwrap(),
            x509_cert::time::Time::UtcTime(_)
        ));
    }
}
