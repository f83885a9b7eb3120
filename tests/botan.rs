use botan::Certificate as BotanCertificate;

use certprofile::key::KeyAlgorithm;
use certprofile::profile::{Profile, ProfileOption, Role};

fn root_der(algorithm: KeyAlgorithm) -> Vec<u8> {
    Profile::new(
        Role::Root,
        certprofile::cert::params::DistinguishedName::builder()
            .common_name("crabs.crabs")
            .organization("Crab widgits SE")
            .build(),
        None,
        vec![ProfileOption::with_key_algorithm(algorithm)],
        &mut rand_core::OsRng,
    )
    .unwrap()
    .create_certificate()
    .unwrap()
    .der
}

fn check_cert(cert_der: &[u8]) -> BotanCertificate {
    // Use botan crate to parse the DER and assert it succeeds
    BotanCertificate::load(cert_der).expect("Botan failed to parse certificate")
}

#[test]
#[ignore]
fn test_botan_ecdsa_p256() {
    check_cert(&root_der(KeyAlgorithm::EcdsaP256));
}

#[test]
#[ignore]
fn test_botan_ed25519() {
    check_cert(&root_der(KeyAlgorithm::Ed25519));
}

#[test]
#[ignore]
fn test_botan_ecdsa_p384() {
    check_cert(&root_der(KeyAlgorithm::EcdsaP384));
}

#[test]
#[ignore]
fn test_botan_ecdsa_p521() {
    check_cert(&root_der(KeyAlgorithm::EcdsaP521));
}

#[test]
#[ignore]
fn test_botan_rsa() {
    check_cert(&root_der(KeyAlgorithm::Rsa { bits: 2048 }));
}

#[test]
#[ignore]
fn test_botan_leaf_under_root() {
    let root = Profile::root("crabs.crabs", vec![])
        .unwrap()
        .create_certificate()
        .unwrap()
        .into_issuer()
        .unwrap();
    let leaf = Profile::leaf(
        "leaf.crabs.crabs",
        &root,
        vec![ProfileOption::with_hosts("leaf.crabs.crabs")],
    )
    .unwrap()
    .create_certificate()
    .unwrap();

    check_cert(&root.cert.to_der().unwrap());
    let leaf = check_cert(&leaf.der);
    assert!(leaf.matches_hostname("leaf.crabs.crabs").unwrap());
}
