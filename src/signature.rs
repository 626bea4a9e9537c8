/// Toolchain signature computation
///
/// A signature fingerprints one buildable configuration. It is the first 12
/// hex characters of SHA-256 over the `|`-joined fields, always in this order:
///
/// `version | CC | CXX | CFLAGS | CXXFLAGS | LDFLAGS | tests | acl | xnnpack | extra`
///
/// All five compiler and flag variables the build consumes are hashed,
/// `LDFLAGS` included, so changing any of them selects a different cache entry.
/// `DEPCACHE_CACHE_DIR` is not part of the signature: it chooses where the cache
/// lives, not what gets built, and every root already separates its entries.
///
/// Reordering or adding fields changes every signature and orphans existing
/// cache entries.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::build::Toggles;
use crate::toolchain::ToolchainEnv;

/// Number of hex characters kept from the digest
pub const SIGNATURE_LEN: usize = 12;

/// Version bucket used when none was declared or discovered
pub const UNKNOWN_VERSION: &str = "unknown";

/// Short hex fingerprint of a build configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Accept a user-supplied signature: exactly [`SIGNATURE_LEN`] hex characters.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.len() == SIGNATURE_LEN && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Signature(value.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything that determines a build configuration
#[derive(Debug, Clone, Copy)]
pub struct SignatureInputs<'a> {
    pub version: &'a str,
    pub env: &'a ToolchainEnv,
    pub toggles: Toggles,
    pub extra: &'a str,
}

impl SignatureInputs<'_> {
    /// The canonical field list that gets hashed
    pub fn canonical(&self) -> String {
        let env = self.env;
        let fields: [&str; 10] = [
            self.version,
            env.cc.as_deref().unwrap_or_default(),
            env.cxx.as_deref().unwrap_or_default(),
            env.cflags.as_deref().unwrap_or_default(),
            env.cxxflags.as_deref().unwrap_or_default(),
            env.ldflags.as_deref().unwrap_or_default(),
            Toggles::literal(self.toggles.tests),
            Toggles::literal(self.toggles.acl),
            Toggles::literal(self.toggles.xnnpack),
            self.extra,
        ];
        fields.join("|")
    }

    pub fn compute(&self) -> Signature {
        let digest = hex::encode(Sha256::digest(self.canonical().as_bytes()));
        Signature(digest[..SIGNATURE_LEN].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> ToolchainEnv {
        ToolchainEnv {
            cc: Some("clang".to_string()),
            cxx: Some("clang++".to_string()),
            cflags: Some("-O2".to_string()),
            cxxflags: Some("-O2".to_string()),
            ldflags: Some("-fuse-ld=lld".to_string()),
        }
    }

    fn signature(version: &str, env: &ToolchainEnv, toggles: Toggles, extra: &str) -> Signature {
        SignatureInputs {
            version,
            env,
            toggles,
            extra,
        }
        .compute()
    }

    #[test]
    fn test_signature_deterministic() {
        let env = base_env();
        let a = signature("1.23.2", &env, Toggles::default(), "");
        let b = signature("1.23.2", &env, Toggles::default(), "");

        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), SIGNATURE_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_known_value() {
        // Pinned so an accidental field reorder shows up as a test failure
        let env = ToolchainEnv::default();
        let inputs = SignatureInputs {
            version: "1.23.2",
            env: &env,
            toggles: Toggles::default(),
            extra: "",
        };
        assert_eq!(inputs.canonical(), "1.23.2||||||0|0|0|");

        let expected = hex::encode(Sha256::digest(b"1.23.2||||||0|0|0|"));
        assert_eq!(inputs.compute().as_str(), &expected[..SIGNATURE_LEN]);
    }

    #[test]
    fn test_signature_sensitive_to_every_field() {
        let env = base_env();
        let toggles = Toggles::default();
        let base = signature("1.23.2", &env, toggles, "A=1");

        let mut variants = Vec::new();
        variants.push(signature("1.23.3", &env, toggles, "A=1"));

        let mutations: [fn(&mut ToolchainEnv); 5] = [
            |e: &mut ToolchainEnv| e.cc = Some("gcc".to_string()),
            |e: &mut ToolchainEnv| e.cxx = Some("g++".to_string()),
            |e: &mut ToolchainEnv| e.cflags = Some("-O3".to_string()),
            |e: &mut ToolchainEnv| e.cxxflags = None,
            |e: &mut ToolchainEnv| e.ldflags = Some("-fuse-ld=gold".to_string()),
        ];
        for mutate in mutations {
            let mut changed = env.clone();
            mutate(&mut changed);
            variants.push(signature("1.23.2", &changed, toggles, "A=1"));
        }

        variants.push(signature(
            "1.23.2",
            &env,
            Toggles {
                tests: true,
                ..toggles
            },
            "A=1",
        ));
        variants.push(signature(
            "1.23.2",
            &env,
            Toggles {
                acl: true,
                ..toggles
            },
            "A=1",
        ));
        variants.push(signature(
            "1.23.2",
            &env,
            Toggles {
                xnnpack: true,
                ..toggles
            },
            "A=1",
        ));
        variants.push(signature("1.23.2", &env, toggles, "A=2"));

        for variant in &variants {
            assert_ne!(variant, &base);
        }

        let mut unique = variants.clone();
        unique.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        unique.dedup();
        assert_eq!(unique.len(), variants.len());
    }

    #[test]
    fn test_signature_field_boundaries_matter() {
        let env = ToolchainEnv::default();
        let a = signature("1.2", &env, Toggles::default(), "");
        let b = signature("1.", &env, Toggles::default(), "2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_accepts_only_signature_shaped_values() {
        let sig = signature("1.23.2", &base_env(), Toggles::default(), "");
        assert_eq!(Signature::parse(sig.as_str()), Some(sig.clone()));
        assert_eq!(
            Signature::parse("ABCDEF012345").map(|s| s.to_string()),
            Some("abcdef012345".to_string())
        );

        for bad in ["", "/", "..", "../../etc", "/tmp/victim", "abcdef01234", "abcdef0123456", "abcdef01234g"] {
            assert!(Signature::parse(bad).is_none(), "accepted {:?}", bad);
        }
    }
}
