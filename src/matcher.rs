//! Compiles a Base58 prefix into inclusive 32-byte ranges and tests public
//! keys against them.
//!
//! A 32-byte key renders to 32..=44 Base58 characters depending on how many
//! leading zero bytes it has, so a single textual prefix corresponds to one
//! candidate byte range per encoded length. Padding the prefix with `'1'`
//! (the Base58 zero digit) gives the smallest string of a given length and
//! padding with `'z'` (the largest digit) gives the biggest; decoding the
//! two pads as numeric values therefore spans the whole tail space at that
//! length. A length whose minimum pad overflows 32 bytes admits no keys at
//! all and is skipped; a length where only the maximum pad overflows is
//! clamped to the all-0xFF key so the top of the keyspace stays covered.

use crate::error::Error;

/// The Base58 alphabet used by Solana addresses (no `0`, `O`, `I`, `l`).
pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Shortest possible encoding of 32 bytes (all-zero key, 32 ones).
pub const MIN_ADDRESS_LEN: usize = 32;
/// Longest possible encoding of 32 bytes.
pub const MAX_ADDRESS_LEN: usize = 44;

/// An inclusive range of 32-byte keys under unsigned lexicographic
/// (big-endian) byte order. `min <= max` always holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PubkeyRange {
    pub min: [u8; 32],
    pub max: [u8; 32],
}

/// The compiled form of a prefix: one range per admissible encoded length,
/// plus the prefix itself for the textual confirmation step.
///
/// Ranges from different lengths may overlap; a key accepted by two ranges
/// is still a single match because confirmation ends the test. The range
/// cover is complete (every key whose address starts with the prefix is
/// inside some range) but slightly generous at the boundaries, which is why
/// [`Matcher::confirm`] exists.
#[derive(Clone, Debug)]
pub struct Matcher {
    prefix: String,
    ranges: Vec<PubkeyRange>,
}

impl Matcher {
    /// Compile `prefix` into its range cover.
    pub fn compile(prefix: &str) -> Result<Self, Error> {
        let mut ranges = Vec::new();
        let shortest = prefix.len().max(MIN_ADDRESS_LEN);
        for len in shortest..=MAX_ADDRESS_LEN {
            let pad = len - prefix.len();
            let min_str = format!("{prefix}{}", "1".repeat(pad));
            let max_str = format!("{prefix}{}", "z".repeat(pad));
            let Some(min) = decode_value(&min_str) else {
                // either the prefix has a character outside the alphabet or
                // even the smallest string of this length overflows 32
                // bytes, meaning no key encodes to it
                continue;
            };
            // only the upper pad overflowing means the length reaches past
            // the top of the keyspace; clamp instead of losing the tail
            let max = decode_value(&max_str).unwrap_or([0xFF; 32]);
            debug_assert!(min <= max);
            ranges.push(PubkeyRange { min, max });
        }
        if ranges.is_empty() {
            return Err(Error::InvalidPrefix(prefix.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            ranges,
        })
    }

    /// Whether `pubkey` falls inside any candidate range.
    ///
    /// Called once per derivation on the CPU path; byte-array comparisons
    /// compile down to `memcmp`, no allocation, no Base58 work.
    #[inline]
    pub fn matches(&self, pubkey: &[u8; 32]) -> bool {
        self.ranges
            .iter()
            .any(|r| *pubkey >= r.min && *pubkey <= r.max)
    }

    /// Whether a rendered address really starts with the prefix. Filters
    /// the rare boundary keys whose byte value is inside a range but whose
    /// text diverges from the prefix.
    #[inline]
    pub fn confirm(&self, address: &str) -> bool {
        address.starts_with(&self.prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ranges(&self) -> &[PubkeyRange] {
        &self.ranges
    }
}

/// Decode a Base58 string to its numeric value as a right-aligned 32-byte
/// array. Leading `'1'` digits are zeros and only widen the string, so the
/// zero bytes they decode to are stripped before the width check. `None`
/// when the string contains a non-alphabet character or the value needs
/// more than 32 bytes.
fn decode_value(s: &str) -> Option<[u8; 32]> {
    let raw = bs58::decode(s).into_vec().ok()?;
    let value = &raw[raw.iter().take_while(|&&b| b == 0).count()..];
    if value.len() > 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out[32 - value.len()..].copy_from_slice(value);
    Some(out)
}
