//! Webhook Payload Signatures — HMAC-SHA256 over the Raw Body
//!
//! When an app secret is configured, the platform signs every POST
//! delivery and sends `X-Hub-Signature-256: sha256=<hex digest>`.

use subtle::ConstantTimeEq;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Verifies delivery signatures with the app secret.
pub struct PayloadVerifier {
    app_secret: String,
}

impl PayloadVerifier {
    pub fn new(app_secret: impl Into<String>) -> Self {
        Self {
            app_secret: app_secret.into(),
        }
    }

    fn digest(&self, body: &[u8]) -> [u8; 32] {
        hmac_sha256::HMAC::mac(body, self.app_secret.as_bytes())
    }

    /// Hex HMAC-SHA256 of `body` under the app secret.
    pub fn sign(&self, body: &[u8]) -> String {
        hex::encode(self.digest(body))
    }

    /// Check a `sha256=<hex>` header value against `body`.
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> bool {
        let Some(given) = header
            .and_then(|h| h.strip_prefix("sha256="))
            .and_then(|h| hex::decode(h).ok())
        else {
            return false;
        };
        given.as_slice().ct_eq(self.digest(body).as_slice()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // RFC 4231 test case 2.
        let verifier = PayloadVerifier::new("Jefe");
        assert_eq!(
            verifier.sign(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_accepts_valid_and_rejects_tampered() {
        let verifier = PayloadVerifier::new("app-secret");
        let body = br#"{"object":"page","entry":[]}"#;
        let header = format!("sha256={}", verifier.sign(body));

        assert!(verifier.verify(body, Some(&header)));
        assert!(!verifier.verify(b"{}", Some(&header)));
        assert!(!verifier.verify(body, Some("sha1=abc")));
        assert!(!verifier.verify(body, None));
    }

    #[test]
    fn test_verify_accepts_uppercase_hex_and_rejects_malformed() {
        let verifier = PayloadVerifier::new("app-secret");
        let body = b"payload";
        let upper = format!("sha256={}", verifier.sign(body).to_uppercase());

        assert!(verifier.verify(body, Some(&upper)));
        assert!(!verifier.verify(body, Some("sha256=zz")));
        assert!(!verifier.verify(body, Some("sha256=")));
        let truncated = format!("sha256={}", &verifier.sign(body)[..62]);
        assert!(!verifier.verify(body, Some(&truncated)));
    }
}
