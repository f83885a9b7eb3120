mod util;

use certprofile::cert::extensions::SubjectAltName;
use certprofile::cert::extensions::ToAndFromX509Extension;
use certprofile::cert::params::DistinguishedName;
use certprofile::csr::SigningRequest;
use certprofile::profile::{Profile, Role};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::stack::Stack;
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509NameBuilder, X509ReqBuilder, X509StoreContext};
use der::Encode;
use regex::Regex;
use std::fs;
use std::process::Command;

fn openssl_text(pem: &str, name: &str) -> String {
    let path = std::env::temp_dir().join(format!("certprofile_{}_{name}.pem", std::process::id()));
    fs::write(&path, pem).expect("Failed to write certificate");

    let output = Command::new("openssl")
        .arg("x509")
        .arg("-in")
        .arg(&path)
        .arg("-noout")
        .arg("-text")
        .output()
        .expect("Failed to execute OpenSSL command");
    fs::remove_file(&path).expect("Failed to remove test certificate");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn common_name(name: &openssl::x509::X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

#[test]
fn test_openssl_cli_reads_chain() {
    let root = util::generate_root();
    let intermediate = util::generate_intermediate(&root);
    let leaf = util::generate_leaf(&intermediate, "server.myca.local,10.0.0.1");

    let root_text = openssl_text(&root.cert.to_pem().unwrap(), "root");
    assert!(root_text.contains("Version: 3 (0x2)"));
    assert!(root_text.contains("CA:TRUE, pathlen:1"));
    assert!(root_text.contains("Certificate Sign, CRL Sign"));
    let self_signed = Regex::new(r"Issuer: CN ?= ?myca\.local[\s\S]*Subject: CN ?= ?myca\.local").unwrap();
    assert!(self_signed.is_match(&root_text));

    let intermediate_text = openssl_text(&intermediate.cert.to_pem().unwrap(), "intermediate");
    let ca_true = Regex::new(r"CA:TRUE\s*\n").unwrap();
    assert!(
        ca_true.is_match(&intermediate_text),
        "intermediate must be a CA without a path length"
    );
    assert!(intermediate_text.contains("Authority Key Identifier"));

    let leaf_text = openssl_text(&leaf.certificate.to_pem().unwrap(), "leaf");
    assert!(leaf_text.contains("CA:FALSE"));
    assert!(leaf_text.contains("Digital Signature, Key Encipherment"));
    assert!(leaf_text.contains("TLS Web Server Authentication, TLS Web Client Authentication"));
    assert!(leaf_text.contains("DNS:server.myca.local, IP Address:10.0.0.1"));
    assert!(leaf_text.contains("Signature Algorithm: ecdsa-with-SHA256"));

    let not_before_regex = Regex::new(r"Not Before: .+").unwrap();
    let not_after_regex = Regex::new(r"Not After : .+").unwrap();
    assert!(not_before_regex.is_match(&leaf_text));
    assert!(not_after_regex.is_match(&leaf_text));
}

#[test]
fn test_openssl_crate_verifies_chain() {
    let root = util::generate_root();
    let intermediate = util::generate_intermediate(&root);
    let leaf = util::generate_leaf(&intermediate, "server.myca.local");

    let root_x509 = X509::from_der(&root.cert.to_der().unwrap()).unwrap();
    let intermediate_x509 = X509::from_pem(intermediate.cert.to_pem().unwrap().as_bytes()).unwrap();
    let leaf_x509 = X509::from_der(&leaf.der).unwrap();

    assert_eq!(common_name(leaf_x509.subject_name()), "server.myca.local");
    assert_eq!(
        common_name(leaf_x509.issuer_name()),
        "Example Intermediate CA"
    );
    assert_eq!(leaf_x509.version(), 2);
    assert_eq!(
        leaf_x509.signature_algorithm().object().nid(),
        Nid::ECDSA_WITH_SHA256
    );
    assert!(leaf_x509.verify(&intermediate_x509.public_key().unwrap()).unwrap());
    assert!(!leaf_x509.verify(&root_x509.public_key().unwrap()).unwrap());

    let serial = leaf_x509.serial_number().to_bn().unwrap();
    assert!(!serial.is_negative());
    assert!(serial.num_bits() > 64);

    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(root_x509).unwrap();
    let store = store.build();
    let mut chain = Stack::new().unwrap();
    chain.push(intermediate_x509).unwrap();

    let mut context = X509StoreContext::new().unwrap();
    let verified = context
        .init(&store, &leaf_x509, &chain, |c| {
            let ok = c.verify_cert()?;
            if !ok {
                eprintln!("verification error: {}", c.error());
            }
            Ok(ok)
        })
        .unwrap();
    assert!(verified, "OpenSSL rejected the issued chain");
}

#[test]
fn test_openssl_signing_request_is_honoured() {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let pkey = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "api.myca.local")
        .unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONALUNITNAME, "Team A")
        .unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONALUNITNAME, "Team B")
        .unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "Crab widgits SE")
        .unwrap();
    let name = name.build();
    let name_der = name.to_der().unwrap();

    let mut builder = X509ReqBuilder::new().unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder.set_subject_name(&name).unwrap();
    let san = {
        let context = builder.x509v3_context(None);
        SubjectAlternativeName::new()
            .dns("api.myca.local")
            .ip("10.0.0.9")
            .build(&context)
            .unwrap()
    };
    let mut extensions = Stack::new().unwrap();
    extensions.push(san).unwrap();
    builder.add_extensions(&extensions).unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    let csr_pem = String::from_utf8(builder.build().to_pem().unwrap()).unwrap();

    let request = SigningRequest::from_pem(&csr_pem).unwrap();
    request.verify_signature().unwrap();
    assert_eq!(request.subject.to_der().unwrap(), name_der);
    let subject = DistinguishedName::from_x509_name(&request.subject).unwrap();
    assert_eq!(subject.common_name, "api.myca.local");
    assert_eq!(subject.organization.as_deref(), Some("Crab widgits SE"));
    assert_eq!(subject.organization_unit.as_deref(), Some("Team A"));
    assert_eq!(request.extensions.len(), 1);
    assert_eq!(request.extensions[0].oid, SubjectAltName::OID);
    assert_eq!(request.subject_alt_names.dns_names, vec!["api.myca.local"]);
    assert_eq!(request.subject_alt_names.ip_addresses.len(), 1);

    let root = util::generate_root();
    let signed = Profile::with_signing_request(
        Role::Leaf,
        &request,
        &root,
        vec![],
        &mut rand_core::OsRng,
    )
    .unwrap()
    .create_certificate()
    .unwrap();

    let carried = signed
        .certificate
        .extension(SubjectAltName::OID)
        .unwrap();
    assert_eq!(carried, request.extensions[0]);

    assert_eq!(signed.certificate.subject().to_der().unwrap(), name_der);

    let leaf_x509 = X509::from_der(&signed.der).unwrap();
    assert_eq!(leaf_x509.subject_name().to_der().unwrap(), name_der);
    let units: Vec<String> = leaf_x509
        .subject_name()
        .entries_by_nid(Nid::ORGANIZATIONALUNITNAME)
        .map(|entry| entry.data().as_utf8().unwrap().to_string())
        .collect();
    assert_eq!(units, ["Team A", "Team B"]);
    let csr_key = pkey.public_key_to_der().unwrap();
    assert_eq!(leaf_x509.public_key().unwrap().public_key_to_der().unwrap(), csr_key);
    let root_x509 = X509::from_der(&root.cert.to_der().unwrap()).unwrap();
    assert!(leaf_x509.verify(&root_x509.public_key().unwrap()).unwrap());
}
