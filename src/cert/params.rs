use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::SetOfVec;
use der::{Any, Tag};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::CertProfileError;

const OID_COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const OID_STATE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const OID_LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const OID_ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const OID_ORGANIZATION_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Distinguished name parameters for building an X.509 certificate.
///
/// Used to build names the crate creates itself and to read the common fields
/// of a parsed name. Templates and signing requests carry the encoded
/// [`x509_cert::name::Name`], so names taken from elsewhere are never rebuilt
/// from this struct. When an attribute repeats, the first value fills the named
/// field and later ones go to `additional`.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
/// * `additional` - Any other attribute, as (OID, string value).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into, default)]
    pub common_name: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organization_unit: Option<String>,
    #[builder(default)]
    pub additional: Vec<(ObjectIdentifier, String)>,
}

impl DistinguishedName {
    /// Shorthand for a name holding only a common name.
    pub fn from_common_name(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.common_name.is_empty()
            && self.country.is_none()
            && self.state.is_none()
            && self.locality.is_none()
            && self.organization.is_none()
            && self.organization_unit.is_none()
            && self.additional.is_empty()
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Attributes are emitted most-significant first (C, ST, L, O, OU, CN), one per RDN.
    /// Country uses PrintableString, everything else UTF8String.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName, CertProfileError> {
        let named = [
            (OID_COUNTRY, self.country.as_deref()),
            (OID_STATE, self.state.as_deref()),
            (OID_LOCALITY, self.locality.as_deref()),
            (OID_ORGANIZATION, self.organization.as_deref()),
            (OID_ORGANIZATION_UNIT, self.organization_unit.as_deref()),
            (
                OID_COMMON_NAME,
                Some(self.common_name.as_str()).filter(|cn| !cn.is_empty()),
            ),
        ];

        let mut rdns = Vec::new();
        let attributes = named
            .into_iter()
            .filter_map(|(oid, value)| value.map(|v| (oid, v)))
            .chain(self.additional.iter().map(|(oid, v)| (*oid, v.as_str())));
        for (oid, value) in attributes {
            let tag = if oid == OID_COUNTRY {
                Tag::PrintableString
            } else {
                Tag::Utf8String
            };
            let atv = AttributeTypeAndValue {
                oid,
                value: Any::new(tag, value.as_bytes())?,
            };
            rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?));
        }

        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Any directory string type is accepted as long as its contents are UTF-8.
    pub fn from_x509_name(
        x509dn: &x509_cert::name::DistinguishedName,
    ) -> Result<Self, CertProfileError> {
        let mut dn = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let value = std::str::from_utf8(attr.value.value())
                    .map_err(|e| {
                        CertProfileError::DecodingError(format!(
                            "name attribute {} is not a string: {e}",
                            attr.oid
                        ))
                    })?
                    .to_string();
                let slot = match attr.oid {
                    OID_COMMON_NAME if dn.common_name.is_empty() => {
                        dn.common_name = value;
                        continue;
                    }
                    OID_COUNTRY => &mut dn.country,
                    OID_STATE => &mut dn.state,
                    OID_LOCALITY => &mut dn.locality,
                    OID_ORGANIZATION => &mut dn.organization,
                    OID_ORGANIZATION_UNIT => &mut dn.organization_unit,
                    _ => {
                        dn.additional.push((attr.oid, value));
                        continue;
                    }
                };
                if slot.is_none() {
                    *slot = Some(value);
                } else {
                    dn.additional.push((attr.oid, value));
                }
            }
        }

        Ok(dn)
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting at `not_before` (truncated to whole
    /// seconds, the precision certificates carry) and lasting `duration`.
    pub fn starting_at(not_before: OffsetDateTime, duration: Duration) -> Self {
        let not_before = truncate_to_seconds(not_before);
        Self {
            not_before,
            not_after: not_before.saturating_add(duration),
        }
    }

    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        Self::starting_at(OffsetDateTime::now_utc(), Duration::days(days))
    }

    pub fn duration(&self) -> Duration {
        self.not_after - self.not_before
    }

    pub fn is_well_formed(&self) -> bool {
        self.not_after > self.not_before
    }
}

pub(crate) fn truncate_to_seconds(t: OffsetDateTime) -> OffsetDateTime {
    t.replace_nanosecond(0).unwrap_or(t)
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: &E,
        critical: bool,
    ) -> Result<Self, CertProfileError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, CertProfileError> {
        E::from_x509_extension_value(&self.value)
    }

    pub(crate) fn from_x509(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }
}
