//! JWS signing and verification over PEM keys.
//!
//! RSA uses RSASSA-PKCS1-v1_5; ECDSA signatures use the fixed-width
//! `r ‖ s` encoding required by RFC 7518 §3.4.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::{AuthError, AuthResult};
use crate::types::SigningAlgorithm;

macro_rules! rsa_sign {
    ($digest:ty, $key:expr, $message:expr) => {{
        let signing_key = rsa::pkcs1v15::SigningKey::<$digest>::new($key);
        signing_key
            .try_sign($message)
            .map(|sig| sig.to_vec())
            .map_err(|e| AuthError::signing(e.to_string()))
    }};
}

macro_rules! rsa_verify {
    ($digest:ty, $key:expr, $message:expr, $signature:expr) => {{
        let verifying_key = rsa::pkcs1v15::VerifyingKey::<$digest>::new($key);
        match rsa::pkcs1v15::Signature::try_from($signature) {
            Ok(sig) => verifying_key.verify($message, &sig).is_ok(),
            Err(_) => false,
        }
    }};
}

macro_rules! ec_sign {
    ($curve:ident, $pem:expr, $message:expr) => {{
        let secret = $curve::SecretKey::from_pkcs8_pem($pem)
            .map_err(|e| AuthError::signing(format!("invalid private key: {e}")))?;
        let signing_key = $curve::ecdsa::SigningKey::from(&secret);
        let signature: $curve::ecdsa::Signature = signing_key
            .try_sign($message)
            .map_err(|e| AuthError::signing(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }};
}

macro_rules! ec_verify {
    ($curve:ident, $pem:expr, $message:expr, $signature:expr) => {{
        let public_key = $curve::PublicKey::from_public_key_pem($pem)
            .map_err(|e| AuthError::invalid_token(format!("invalid public key: {e}")))?;
        let verifying_key = $curve::ecdsa::VerifyingKey::from(&public_key);
        match $curve::ecdsa::Signature::from_slice($signature) {
            Ok(sig) => verifying_key.verify($message, &sig).is_ok(),
            Err(_) => false,
        }
    }};
}

/// Signs `message` with a PKCS#8 PEM private key.
///
/// # Errors
///
/// Returns `Signing` if the key does not parse or signing fails.
pub fn sign(
    algorithm: SigningAlgorithm,
    private_key_pem: &str,
    message: &[u8],
) -> AuthResult<Vec<u8>> {
    match algorithm {
        SigningAlgorithm::RS256 | SigningAlgorithm::RS384 | SigningAlgorithm::RS512 => {
            let key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
                .map_err(|e| AuthError::signing(format!("invalid private key: {e}")))?;
            match algorithm {
                SigningAlgorithm::RS256 => rsa_sign!(Sha256, key, message),
                SigningAlgorithm::RS384 => rsa_sign!(Sha384, key, message),
                _ => rsa_sign!(Sha512, key, message),
            }
        }
        SigningAlgorithm::ES256 => ec_sign!(p256, private_key_pem, message),
        SigningAlgorithm::ES384 => ec_sign!(p384, private_key_pem, message),
        SigningAlgorithm::ES512 => {
            let secret = p521::SecretKey::from_pkcs8_pem(private_key_pem)
                .map_err(|e| AuthError::signing(format!("invalid private key: {e}")))?;
            let signing_key = p521::ecdsa::SigningKey::from_bytes(&secret.to_bytes())
                .map_err(|e| AuthError::signing(e.to_string()))?;
            let signature: p521::ecdsa::Signature = signing_key
                .try_sign(message)
                .map_err(|e| AuthError::signing(e.to_string()))?;
            Ok(signature.to_bytes().to_vec())
        }
    }
}

/// Verifies `signature` over `message` with an SPKI PEM public key.
///
/// Returns `Ok(false)` for a well-formed key and a bad signature.
///
/// # Errors
///
/// Returns `InvalidToken` if the public key does not parse.
pub fn verify(
    algorithm: SigningAlgorithm,
    public_key_pem: &str,
    message: &[u8],
    signature: &[u8],
) -> AuthResult<bool> {
    let valid = match algorithm {
        SigningAlgorithm::RS256 | SigningAlgorithm::RS384 | SigningAlgorithm::RS512 => {
            let key = RsaPublicKey::from_public_key_pem(public_key_pem)
                .map_err(|e| AuthError::invalid_token(format!("invalid public key: {e}")))?;
            match algorithm {
                SigningAlgorithm::RS256 => rsa_verify!(Sha256, key, message, signature),
                SigningAlgorithm::RS384 => rsa_verify!(Sha384, key, message, signature),
                _ => rsa_verify!(Sha512, key, message, signature),
            }
        }
        SigningAlgorithm::ES256 => ec_verify!(p256, public_key_pem, message, signature),
        SigningAlgorithm::ES384 => ec_verify!(p384, public_key_pem, message, signature),
        SigningAlgorithm::ES512 => {
            let public_key = p521::PublicKey::from_public_key_pem(public_key_pem)
                .map_err(|e| AuthError::invalid_token(format!("invalid public key: {e}")))?;
            let point = elliptic_curve::sec1::ToEncodedPoint::to_encoded_point(&public_key, false);
            let verifying_key = p521::ecdsa::VerifyingKey::from_sec1_bytes(point.as_bytes())
                .map_err(|e| AuthError::invalid_token(format!("invalid public key: {e}")))?;
            match p521::ecdsa::Signature::from_slice(signature) {
                Ok(sig) => verifying_key.verify(message, &sig).is_ok(),
                Err(_) => false,
            }
        }
    };
    Ok(valid)
}

/// Signs `signing_input` and returns the base64url signature segment.
///
/// Framed here rather than with `jsonwebtoken`, which cannot sign ES512.
///
/// # Errors
///
/// Returns `Signing` if signing fails.
pub fn sign_compact(
    algorithm: SigningAlgorithm,
    private_key_pem: &str,
    signing_input: &str,
) -> AuthResult<String> {
    let signature = sign(algorithm, private_key_pem, signing_input.as_bytes())?;
    Ok(URL_SAFE_NO_PAD.encode(signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keygen::{
        EcdsaKeyGenerator, GeneratedKeyPair, KeyGenerator, RsaKeyGenerator,
    };
    use crate::types::EcCurve;

    fn key_pair(algorithm: SigningAlgorithm) -> GeneratedKeyPair {
        match algorithm.curve() {
            Some(curve) => EcdsaKeyGenerator::new(curve)
                .generate_key_pair(algorithm)
                .unwrap(),
            None => RsaKeyGenerator::new(2048)
                .unwrap()
                .generate_key_pair(algorithm)
                .unwrap(),
        }
    }

    #[test]
    fn test_sign_verify_all_algorithms() {
        for algorithm in SigningAlgorithm::ALL {
            let pair = key_pair(algorithm);
            let signature = sign(algorithm, &pair.private_key_pem, b"header.payload").unwrap();
            assert!(
                verify(algorithm, &pair.public_key_pem, b"header.payload", &signature).unwrap(),
                "{algorithm}"
            );
            assert!(
                !verify(algorithm, &pair.public_key_pem, b"header.other", &signature).unwrap(),
                "{algorithm}"
            );
        }
    }

    #[test]
    fn test_ecdsa_signature_widths() {
        for curve in [EcCurve::P256, EcCurve::P384, EcCurve::P521] {
            let pair = key_pair(curve.algorithm());
            let signature = sign(curve.algorithm(), &pair.private_key_pem, b"msg").unwrap();
            assert_eq!(signature.len(), curve.field_size() * 2);
        }
    }

    #[test]
    fn test_verify_rejects_truncated_signature() {
        let pair = key_pair(SigningAlgorithm::ES256);
        let signature = sign(SigningAlgorithm::ES256, &pair.private_key_pem, b"msg").unwrap();
        assert!(
            !verify(
                SigningAlgorithm::ES256,
                &pair.public_key_pem,
                b"msg",
                &signature[..10]
            )
            .unwrap()
        );
    }

    #[test]
    fn test_verify_with_other_key_fails() {
        let a = key_pair(SigningAlgorithm::ES384);
        let b = key_pair(SigningAlgorithm::ES384);
        let signature = sign(SigningAlgorithm::ES384, &a.private_key_pem, b"msg").unwrap();
        assert!(!verify(SigningAlgorithm::ES384, &b.public_key_pem, b"msg", &signature).unwrap());
    }

    #[test]
    fn test_invalid_pem() {
        assert!(sign(SigningAlgorithm::ES256, "garbage", b"msg").is_err());
        assert!(verify(SigningAlgorithm::RS256, "garbage", b"msg", b"sig").is_err());
    }
}
