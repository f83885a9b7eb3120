//! The in-progress certificate record that profiles build and the signer consumes.

use x509_cert::name::Name;

use crate::cert::extensions::{ExtendedKeyUsageOption, FlagSet, KeyUsages, SubjectAltName};
use crate::cert::params::{ExtensionParam, Validity};
use crate::key::PublicKey;

/// Mutable certificate template.
///
/// Path length follows the usual two-field convention: `max_path_len > 0` is a
/// limit, `max_path_len == 0` is a limit of zero only when `max_path_len_zero`
/// is set, and `-1` (or `0` without the flag) means no limit is encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateTemplate {
    /// Positive big-endian serial number.
    pub serial_number: Vec<u8>,
    /// Encoded as given: attribute order, string types and repeats are kept.
    pub subject: Name,
    pub issuer: Name,
    pub validity: Validity,
    pub is_ca: bool,
    pub basic_constraints_valid: bool,
    pub max_path_len: i32,
    pub max_path_len_zero: bool,
    pub key_usage: FlagSet<KeyUsages>,
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
    pub subject_alt_names: SubjectAltName,
    /// Emitted verbatim after the generated extensions, replacing any generated
    /// extension with the same OID.
    pub extra_extensions: Vec<ExtensionParam>,
    pub subject_public_key: Option<PublicKey>,
}

impl CertificateTemplate {
    /// Path length to encode in basic constraints, if any.
    ///
    /// Values above 255 are clamped; the signer rejects them before encoding.
    pub fn path_len_constraint(&self) -> Option<u8> {
        match self.max_path_len {
            n if n > 0 => Some(u8::try_from(n).unwrap_or(u8::MAX)),
            0 if self.max_path_len_zero => Some(0),
            _ => None,
        }
    }
}
