use std::fmt;

use time::{Duration, OffsetDateTime};
use x509_cert::name::Name;

use crate::cert::extensions::{ExtendedKeyUsageOption, FlagSet, KeyUsages, SubjectAltName};
use crate::cert::params::Validity;
use crate::template::CertificateTemplate;

const YEAR: i64 = 365;

/// Position of a certificate in the CA hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Root,
    Intermediate,
    Leaf,
}

/// Static policy for one role.
#[derive(Debug)]
pub struct RolePolicy {
    pub default_duration: Duration,
    pub is_ca: bool,
    pub key_usage: &'static [KeyUsages],
    pub extended_key_usage: &'static [ExtendedKeyUsageOption],
    pub max_path_len: i32,
    pub max_path_len_zero: bool,
}

/// Indexed by [`Role::index`]. Never mutated.
static ROLE_POLICIES: [RolePolicy; 3] = [
    RolePolicy {
        default_duration: Duration::days(20 * YEAR),
        is_ca: true,
        key_usage: &[KeyUsages::KeyCertSign, KeyUsages::CRLSign],
        extended_key_usage: &[],
        max_path_len: 1,
        max_path_len_zero: false,
    },
    RolePolicy {
        default_duration: Duration::days(10 * YEAR),
        is_ca: true,
        key_usage: &[KeyUsages::KeyCertSign, KeyUsages::CRLSign],
        extended_key_usage: &[],
        // Literal (0, false): encodes as "no path length" under the template convention.
        max_path_len: 0,
        max_path_len_zero: false,
    },
    RolePolicy {
        default_duration: Duration::hours(24),
        is_ca: false,
        key_usage: &[KeyUsages::DigitalSignature, KeyUsages::KeyEncipherment],
        extended_key_usage: &[
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ],
        max_path_len: -1,
        max_path_len_zero: false,
    },
];

impl Role {
    pub const ALL: [Role; 3] = [Role::Root, Role::Intermediate, Role::Leaf];

    fn index(self) -> usize {
        match self {
            Role::Root => 0,
            Role::Intermediate => 1,
            Role::Leaf => 2,
        }
    }

    pub fn policy(self) -> &'static RolePolicy {
        &ROLE_POLICIES[self.index()]
    }

    /// Validity span a template of this role gets when nothing overrides it.
    pub fn default_duration(self) -> Duration {
        self.policy().default_duration
    }

    pub fn is_ca(self) -> bool {
        self.policy().is_ca
    }

    /// Builds the role's default template valid from `now`.
    ///
    /// Roots are self-signed, so `issuer` is ignored and the subject is used.
    /// The serial number and public key are left empty for the profile to fill.
    pub fn build_template_at(
        self,
        subject: Name,
        issuer: Name,
        now: OffsetDateTime,
    ) -> CertificateTemplate {
        let policy = self.policy();
        let issuer = match self {
            Role::Root => subject.clone(),
            _ => issuer,
        };
        let key_usage = policy
            .key_usage
            .iter()
            .fold(FlagSet::default(), |acc, usage| acc | *usage);

        CertificateTemplate {
            serial_number: Vec::new(),
            subject,
            issuer,
            validity: Validity::starting_at(now, policy.default_duration),
            is_ca: policy.is_ca,
            basic_constraints_valid: true,
            max_path_len: policy.max_path_len,
            max_path_len_zero: policy.max_path_len_zero,
            key_usage,
            extended_key_usage: policy.extended_key_usage.to_vec(),
            subject_alt_names: SubjectAltName::default(),
            extra_extensions: Vec::new(),
            subject_public_key: None,
        }
    }

    /// [`Role::build_template_at`] for the current time.
    pub fn build_template(self, subject: Name, issuer: Name) -> CertificateTemplate {
        self.build_template_at(subject, issuer, OffsetDateTime::now_utc())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Root => "root",
            Role::Intermediate => "intermediate",
            Role::Leaf => "leaf",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::DistinguishedName;

    fn name(common_name: &str) -> Name {
        DistinguishedName::from_common_name(common_name)
            .as_x509_name()
            .unwrap()
    }

    #[test]
    fn test_ca_roles_can_sign_certificates_and_crls() {
        for role in [Role::Root, Role::Intermediate] {
            let template = role.build_template(name("CA"), name("Parent"));
            assert!(template.is_ca);
            assert!(template.basic_constraints_valid);
            assert!(template.key_usage.contains(KeyUsages::KeyCertSign));
            assert!(template.key_usage.contains(KeyUsages::CRLSign));
        }
    }

    #[test]
    fn test_leaf_is_not_a_ca() {
        let template = Role::Leaf.build_template(name("leaf.example.com"), name("Example CA"));
        assert!(!template.is_ca);
        assert!(!template.key_usage.contains(KeyUsages::KeyCertSign));
        assert_eq!(
            template.extended_key_usage,
            vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth
            ]
        );
    }

    #[test]
    fn test_default_durations_are_ordered() {
        assert_eq!(Role::Intermediate.default_duration(), Duration::days(3650));
        assert!(Role::Root.default_duration() > Role::Intermediate.default_duration());
        assert!(Role::Leaf.default_duration() < Role::Intermediate.default_duration());
    }

    #[test]
    fn test_template_validity_follows_default_duration() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        for role in Role::ALL {
            let template = role.build_template_at(name("x"), name("y"), now);
            assert_eq!(template.validity.not_before, now);
            assert_eq!(template.validity.duration(), role.default_duration());
        }
    }

    #[test]
    fn test_root_issuer_is_its_subject() {
        let subject = name("Root CA");
        let template = Role::Root.build_template(subject.clone(), name("ignored"));
        assert_eq!(template.issuer, subject);
    }

    #[test]
    fn test_intermediate_keeps_literal_path_len() {
        let template =
            Role::Intermediate.build_template(name("Example Intermediate CA"), name("Root CA"));
        assert_eq!(template.max_path_len, 0);
        assert!(!template.max_path_len_zero);
        assert_eq!(template.path_len_constraint(), None);
    }
}
