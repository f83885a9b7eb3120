#![allow(dead_code)]

use std::cell::Cell;

use certprofile::cert::CertificateWithPrivateKey;
use certprofile::cert::params::DistinguishedName;
use certprofile::profile::{Profile, ProfileOption, SignedCertificate};
use rand_core::{CryptoRng, OsRng, RngCore};

pub fn generate_root() -> CertificateWithPrivateKey {
    Profile::root("myca.local", vec![])
        .unwrap()
        .create_certificate()
        .unwrap()
        .into_issuer()
        .unwrap()
}

pub fn generate_intermediate(root: &CertificateWithPrivateKey) -> CertificateWithPrivateKey {
    Profile::intermediate("Example Intermediate CA", root, vec![])
        .unwrap()
        .create_certificate()
        .unwrap()
        .into_issuer()
        .unwrap()
}

pub fn generate_leaf(issuer: &CertificateWithPrivateKey, hosts: &str) -> SignedCertificate {
    Profile::leaf(
        "server.myca.local",
        issuer,
        vec![ProfileOption::with_hosts(hosts)],
    )
    .unwrap()
    .create_certificate()
    .unwrap()
}

pub fn subject(common_name: &str) -> DistinguishedName {
    DistinguishedName::builder()
        .common_name(common_name)
        .organization("Crab widgits SE")
        .build()
}

/// OS randomness that counts how often it was asked for bytes.
#[derive(Default)]
pub struct CountingRng {
    calls: Cell<usize>,
}

impl CountingRng {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        self.tick();
        OsRng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.tick();
        OsRng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.tick();
        OsRng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.tick();
        OsRng.try_fill_bytes(dest)
    }
}

impl CryptoRng for CountingRng {}
