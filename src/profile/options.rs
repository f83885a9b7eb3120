use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use time::{Duration, OffsetDateTime};
use x509_cert::name::Name;

use super::Role;
use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::params::{DistinguishedName, ExtensionParam, Validity, truncate_to_seconds};
use crate::key::{KeyAlgorithm, PublicKey};
use crate::template::CertificateTemplate;

static DNS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*\.)?([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.?$")
        .expect("DNS name pattern is valid")
});

static EMAIL_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email pattern is valid"));

static URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://\S+$").expect("URI pattern is valid")
});

/// Whether `name` is an ASCII hostname, optionally with a leading wildcard label.
pub fn is_valid_dns_name(name: &str) -> bool {
    name.len() <= 253 && DNS_NAME.is_match(name)
}

/// A named override applied to a profile before it is finalized.
///
/// Options run in the order given; the first one to fail stops construction.
#[derive(Debug, Clone)]
pub enum ProfileOption {
    /// Use this subject public key; no key pair is generated.
    PublicKey(PublicKey),
    /// Override the validity window. A missing `not_before` means now; a missing
    /// `not_after` means `not_before + duration`, or the role default without one.
    Validity {
        not_before: Option<OffsetDateTime>,
        not_after: Option<OffsetDateTime>,
        duration: Option<Duration>,
    },
    /// Key type generated when no public key is supplied.
    KeyAlgorithm(KeyAlgorithm),
    /// Comma separated hosts added to the subject alternative names.
    Hosts(String),
    /// Replace the role's extended key usages.
    ExtendedKeyUsage(Vec<ExtendedKeyUsageOption>),
    /// Replace the subject name. Roots keep issuer and subject equal.
    Subject(DistinguishedName),
    /// Replace the subject with an already encoded name, kept byte for byte.
    SubjectName(Name),
    /// Append an opaque extension.
    ExtraExtension(ExtensionParam),
}

/// What options may touch while a profile is being assembled.
#[derive(Debug)]
pub(crate) struct ProfileState {
    pub role: Role,
    pub now: OffsetDateTime,
    pub template: CertificateTemplate,
    pub key_algorithm: KeyAlgorithm,
}

impl ProfileOption {
    pub fn with_public_key(public_key: PublicKey) -> Self {
        ProfileOption::PublicKey(public_key)
    }

    pub fn with_validity(not_before: OffsetDateTime, not_after: OffsetDateTime) -> Self {
        ProfileOption::Validity {
            not_before: Some(not_before),
            not_after: Some(not_after),
            duration: None,
        }
    }

    pub fn with_duration(duration: Duration) -> Self {
        ProfileOption::Validity {
            not_before: None,
            not_after: None,
            duration: Some(duration),
        }
    }

    pub fn with_key_algorithm(algorithm: KeyAlgorithm) -> Self {
        ProfileOption::KeyAlgorithm(algorithm)
    }

    pub fn with_hosts(hosts: impl Into<String>) -> Self {
        ProfileOption::Hosts(hosts.into())
    }

    /// Name recorded in the profile's applied options and in errors.
    pub fn name(&self) -> &'static str {
        match self {
            ProfileOption::PublicKey(_) => "public-key",
            ProfileOption::Validity { .. } => "validity",
            ProfileOption::KeyAlgorithm(_) => "key-algorithm",
            ProfileOption::Hosts(_) => "hosts",
            ProfileOption::ExtendedKeyUsage(_) => "extended-key-usage",
            ProfileOption::Subject(_) | ProfileOption::SubjectName(_) => "subject",
            ProfileOption::ExtraExtension(_) => "extra-extension",
        }
    }

    pub(crate) fn apply(self, state: &mut ProfileState) -> Result<(), String> {
        let template = &mut state.template;
        match self {
            ProfileOption::PublicKey(public_key) => {
                template.subject_public_key = Some(public_key);
            }
            ProfileOption::Validity {
                not_before,
                not_after,
                duration,
            } => {
                if let Some(d) = duration {
                    if !d.is_positive() {
                        return Err(format!("duration must be positive, got {d}"));
                    }
                }
                let not_before = truncate_to_seconds(not_before.unwrap_or(state.now));
                let not_after = match not_after {
                    Some(not_after) => truncate_to_seconds(not_after),
                    None => {
                        let duration = duration.unwrap_or(state.role.default_duration());
                        not_before.checked_add(duration).ok_or_else(|| {
                            format!("notBefore {not_before} plus {duration} is out of range")
                        })?
                    }
                };
                let validity = Validity {
                    not_before,
                    not_after,
                };
                if !validity.is_well_formed() {
                    return Err(format!(
                        "notAfter {not_after} must be after notBefore {not_before}"
                    ));
                }
                template.validity = validity;
            }
            ProfileOption::KeyAlgorithm(algorithm) => {
                algorithm.validate()?;
                state.key_algorithm = algorithm;
            }
            ProfileOption::Hosts(hosts) => {
                let mut sans = template.subject_alt_names.clone();
                for host in hosts.split(',').map(str::trim).filter(|h| !h.is_empty()) {
                    if let Ok(ip) = host.parse::<IpAddr>() {
                        sans.ip_addresses.push(ip);
                    } else if host.contains("://") {
                        if !URI.is_match(host) {
                            return Err(format!("invalid URI {host:?}"));
                        }
                        sans.uris.push(host.to_string());
                    } else if host.contains('@') {
                        if !EMAIL_ADDRESS.is_match(host) {
                            return Err(format!("invalid email address {host:?}"));
                        }
                        sans.email_addresses.push(host.to_string());
                    } else if is_valid_dns_name(host) {
                        sans.dns_names.push(host.to_string());
                    } else {
                        return Err(format!("invalid host {host:?}"));
                    }
                }
                template.subject_alt_names = sans;
            }
            ProfileOption::ExtendedKeyUsage(usages) => {
                template.extended_key_usage = usages;
            }
            ProfileOption::Subject(subject) => {
                let subject = subject.as_x509_name().map_err(|e| e.to_string())?;
                set_subject(state, subject);
            }
            ProfileOption::SubjectName(subject) => set_subject(state, subject),
            ProfileOption::ExtraExtension(extension) => {
                template.extra_extensions.push(extension);
            }
        }
        Ok(())
    }
}

fn set_subject(state: &mut ProfileState, subject: Name) {
    if state.role == Role::Root {
        state.template.issuer = subject.clone();
    }
    state.template.subject = subject;
}
