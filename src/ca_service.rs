//! Contract with the remote CA service.
//!
//! Transport, TLS, re-authentication and bootstrap token minting live with the
//! implementor of [`CaService`]; this module only shapes requests and answers.

use crate::cert::{Certificate, Result};
use crate::csr::SigningRequest;
use crate::error::CertProfileError;
use crate::profile::is_valid_dns_name;
use crate::template::CertificateTemplate;

/// What is sent to the CA for signing.
#[derive(Debug, Clone, Copy)]
pub enum CertificateRequest<'a> {
    Template(&'a CertificateTemplate),
    SigningRequest(&'a SigningRequest),
}

/// Operations the CA service exposes to this crate.
pub trait CaService {
    /// Whether a certificate has been issued for `hostname`.
    fn check_host(&self, hostname: &str, bootstrap_token: Option<&str>) -> Result<bool>;

    /// Asks the CA to sign `request`.
    fn request_certificate(
        &self,
        request: CertificateRequest<'_>,
        bootstrap_token: &str,
    ) -> Result<Certificate>;
}

/// Answer of a host check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Exists,
    Missing,
}

impl HostStatus {
    /// Process exit status for a command reporting this answer.
    pub fn exit_code(self) -> i32 {
        match self {
            HostStatus::Exists => 0,
            HostStatus::Missing => 1,
        }
    }
}

/// Exit status when the check itself could not be completed.
pub const EXIT_FAILURE: i32 = 2;

/// Exit status for the outcome of [`check_host`].
pub fn exit_code(outcome: &Result<HostStatus>) -> i32 {
    match outcome {
        Ok(status) => status.exit_code(),
        Err(_) => EXIT_FAILURE,
    }
}

/// Validates `hostname` and asks `service` whether it has a certificate.
pub fn check_host<S: CaService + ?Sized>(
    service: &S,
    hostname: &str,
    bootstrap_token: Option<&str>,
) -> Result<HostStatus> {
    let hostname = hostname.trim();
    if hostname.is_empty() {
        return Err(CertProfileError::InvalidInput(
            "a hostname is required".to_string(),
        ));
    }
    if hostname.parse::<std::net::IpAddr>().is_err() && !is_valid_dns_name(hostname) {
        return Err(CertProfileError::InvalidInput(format!(
            "invalid hostname {hostname:?}"
        )));
    }

    let exists = service.check_host(hostname, bootstrap_token)?;
    tracing::info!(hostname, exists, "checked host");
    Ok(if exists {
        HostStatus::Exists
    } else {
        HostStatus::Missing
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct FakeCa {
        hosts: Vec<&'static str>,
        calls: RefCell<Vec<(String, Option<String>)>>,
        unreachable: bool,
    }

    impl FakeCa {
        fn new(hosts: Vec<&'static str>) -> Self {
            Self {
                hosts,
                calls: RefCell::new(Vec::new()),
                unreachable: false,
            }
        }
    }

    impl CaService for FakeCa {
        fn check_host(&self, hostname: &str, bootstrap_token: Option<&str>) -> Result<bool> {
            self.calls
                .borrow_mut()
                .push((hostname.to_string(), bootstrap_token.map(str::to_string)));
            if self.unreachable {
                return Err(CertProfileError::CaService("connection refused".to_string()));
            }
            Ok(self.hosts.contains(&hostname))
        }

        fn request_certificate(
            &self,
            _request: CertificateRequest<'_>,
            _bootstrap_token: &str,
        ) -> Result<Certificate> {
            Err(CertProfileError::CaService("not implemented".to_string()))
        }
    }

    #[test]
    fn test_known_host_exits_zero() {
        let ca = FakeCa::new(vec!["internal.example.com"]);
        let outcome = check_host(&ca, "internal.example.com", Some("token"));
        assert_eq!(outcome.as_ref().unwrap(), &HostStatus::Exists);
        assert_eq!(exit_code(&outcome), 0);
        assert_eq!(
            ca.calls.borrow()[0],
            ("internal.example.com".to_string(), Some("token".to_string()))
        );
    }

    #[test]
    fn test_unknown_host_exits_one() {
        let ca = FakeCa::new(vec![]);
        let outcome = check_host(&ca, "missing.example.com", None);
        assert_eq!(exit_code(&outcome), 1);
    }

    #[test]
    fn test_service_failure_exits_nonzero() {
        let mut ca = FakeCa::new(vec!["internal.example.com"]);
        ca.unreachable = true;
        let outcome = check_host(&ca, "internal.example.com", None);
        assert!(matches!(outcome, Err(CertProfileError::CaService(_))));
        assert_eq!(exit_code(&outcome), EXIT_FAILURE);
    }

    #[test]
    fn test_invalid_hostname_never_reaches_service() {
        let ca = FakeCa::new(vec![]);
        assert!(check_host(&ca, "  ", None).is_err());
        assert!(check_host(&ca, "not a host", None).is_err());
        assert!(ca.calls.borrow().is_empty());
    }
}
