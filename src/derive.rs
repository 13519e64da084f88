//! Ed25519 public-key derivation and the scalar-walk primitive shared by the
//! CPU and GPU search paths.

use curve25519_dalek::edwards::EdwardsPoint;
use sha2::{Digest, Sha512};

/// Derive the compressed Ed25519 public key for a 32-byte seed the way
/// Solana keypairs do: `h = SHA512(seed)`, clamp the low half
/// (`h[0] &= 0xF8; h[31] &= 0x7F; h[31] |= 0x40`), then multiply the base
/// point by the clamped bytes with no further clamping or reduction.
///
/// `mul_base_clamped` applies exactly that clamp to the raw bytes, so the
/// result is byte-identical to `ed25519_dalek`'s `verifying_key()`.
pub fn derive_pubkey(seed: &[u8; 32]) -> [u8; 32] {
    let digest = Sha512::digest(seed);
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&digest[..32]);
    EdwardsPoint::mul_base_clamped(scalar).compress().to_bytes()
}

/// Step the seed to the next candidate.
///
/// The seed is treated as a 256-bit counter whose LOW byte is index 31: the
/// carry runs from byte 31 toward byte 0 and wraps past 2^256 back to zero.
/// This is the convention the GPU kernel's 24-bit tail (offsets 29..32)
/// relies on; keep it even though "little-endian" would normally put the low
/// byte at index 0.
pub fn increment_seed(seed: &mut [u8; 32]) {
    for byte in seed.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}

/// Render a public key as a Base58 Solana address.
pub fn encode_address(pubkey: &[u8; 32]) -> String {
    bs58::encode(pubkey).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 8032 TEST 1
    const TEST1_SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const TEST1_PUBKEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn seed_from_hex(s: &str) -> [u8; 32] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    #[test]
    fn derive_matches_rfc8032_vector() {
        let seed = seed_from_hex(TEST1_SEED);
        assert_eq!(hex::encode(derive_pubkey(&seed)), TEST1_PUBKEY);
    }

    #[test]
    fn derive_matches_dalek_signing_key() {
        use rand::RngCore;

        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let mut seed = [0u8; 32];
            rng.fill_bytes(&mut seed);
            let expected = ed25519_dalek::SigningKey::from_bytes(&seed)
                .verifying_key()
                .to_bytes();
            assert_eq!(derive_pubkey(&seed), expected);
        }
    }

    #[test]
    fn increment_carries_from_byte_31_toward_byte_0() {
        let mut seed = [0u8; 32];
        increment_seed(&mut seed);
        assert_eq!(seed[31], 1);
        assert!(seed[..31].iter().all(|&b| b == 0));

        let mut seed = [0u8; 32];
        seed[31] = 0xFF;
        increment_seed(&mut seed);
        assert_eq!(seed[30], 1);
        assert_eq!(seed[31], 0);

        let mut seed = [0u8; 32];
        seed[30] = 0xFF;
        seed[31] = 0xFF;
        increment_seed(&mut seed);
        assert_eq!(seed[29], 1);
        assert_eq!(seed[30], 0);
        assert_eq!(seed[31], 0);
    }

    #[test]
    fn increment_wraps_past_2_pow_256() {
        let mut seed = [0xFFu8; 32];
        increment_seed(&mut seed);
        assert_eq!(seed, [0u8; 32]);
    }

    #[test]
    fn all_zero_key_encodes_to_32_ones() {
        assert_eq!(encode_address(&[0u8; 32]), "1".repeat(32));
    }
}
