use certprofile::cert::extensions::SubjectAltName;
use certprofile::cert::params::{DistinguishedName, ExtensionParam};
use certprofile::csr::SigningRequest;
use certprofile::error::CertProfileError;
use certprofile::key::{KeyAlgorithm, KeyPair};
use certprofile::profile::{Profile, ProfileOption, Role};

fn main() -> Result<(), CertProfileError> {
    // Self-signed root with a P-384 key
    let root = Profile::root(
        "Example Root CA",
        vec![ProfileOption::with_key_algorithm(KeyAlgorithm::EcdsaP384)],
    )?
    .create_certificate()?
    .into_issuer()
    .ok_or_else(|| CertProfileError::InvalidInput("root key was not generated".to_string()))?;

    let intermediate = Profile::intermediate("Example Intermediate CA", &root, vec![])?
        .create_certificate()?
        .into_issuer()
        .ok_or_else(|| {
            CertProfileError::InvalidInput("intermediate key was not generated".to_string())
        })?;

    // The service keeps its own key and only hands over a request
    let service_key = KeyPair::generate_ed25519();
    let sans = SubjectAltName {
        dns_names: vec!["service.example.com".to_string()],
        ip_addresses: vec!["10.0.0.7".parse::<std::net::IpAddr>().map_err(|e| {
            CertProfileError::InvalidInput(format!("bad demo address: {e}"))
        })?],
        ..Default::default()
    };
    let request = SigningRequest::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("service.example.com")
                .organization("Example Corp")
                .build()
                .as_x509_name()?,
        )
        .public_key(service_key.public_key())
        .extensions(vec![ExtensionParam::from_extension(&sans, false)?])
        .subject_alt_names(sans)
        .build();

    let leaf = Profile::with_signing_request(
        Role::Leaf,
        &request,
        &intermediate,
        vec![],
        &mut rand_core::OsRng,
    )?
    .create_certificate()?;
    leaf.certificate
        .verify_signed_by(&intermediate.cert.public_key()?)?;

    println!("Root CA:\n{}", root.cert.to_pem()?);
    println!("Intermediate CA:\n{}", intermediate.cert.to_pem()?);
    println!("Leaf:\n{}", leaf.certificate.to_pem()?);
    Ok(())
}
