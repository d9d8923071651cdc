//! Hash functions for NetSieve
//!
//! Domain constraints (`$domain=`) are stored as 64-bit composite hashes built
//! from two Murmur3 32-bit passes with different seeds, so a rule carries a
//! handful of integers instead of owned strings.
//!
//! # Sentinel Handling
//!
//! `(lo=0, hi=0)` is reserved as "no hash". `hash64` never returns it.

/// 64-bit hash represented as two 32-bit parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(C)]
pub struct Hash64 {
    pub lo: u32,
    pub hi: u32,
}

impl Hash64 {
    #[inline]
    pub const fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }

    /// Check if this hash is the empty sentinel (0, 0).
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    #[inline]
    pub const fn to_u64(&self) -> u64 {
        ((self.hi as u64) << 32) | (self.lo as u64)
    }
}

const SEED_LO: u32 = 0x9e3779b9; // Golden ratio
const SEED_HI: u32 = 0x85ebca6b; // Murmur3 constant

/// Murmur3 32-bit hash.
#[inline]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let len = data.len();
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let k = k.wrapping_mul(0xcc9e2d51).rotate_left(15).wrapping_mul(0x1b873593);

        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    let tail = chunks.remainder();
    let mut k: u32 = 0;
    if tail.len() >= 3 {
        k ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k ^= tail[0] as u32;
        let k = k.wrapping_mul(0xcc9e2d51).rotate_left(15).wrapping_mul(0x1b873593);
        h ^= k;
    }

    // Finalization
    h ^= len as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;

    h
}

/// Compute a 64-bit hash as a (lo, hi) pair. Never returns the (0, 0) sentinel.
#[inline]
pub fn hash64(data: &[u8]) -> Hash64 {
    let mut lo = murmur3_32(data, SEED_LO);
    let hi = murmur3_32(data, SEED_HI);

    if lo == 0 && hi == 0 {
        lo = 1;
    }

    Hash64 { lo, hi }
}

/// Hash a domain for constraint lookup.
/// Case-insensitive; a trailing root dot is ignored.
#[inline]
pub fn hash_domain(domain: &str) -> Hash64 {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let mut buf = [0u8; 256];
    let len = domain.len().min(256);

    for (slot, &b) in buf.iter_mut().zip(&domain.as_bytes()[..len]) {
        *slot = b.to_ascii_lowercase();
    }

    hash64(&buf[..len])
}

/// CRC-32 (IEEE 802.3) of a filter list, used as its checksum.
pub fn crc32(data: &[u8]) -> u32 {
    static CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut c = i as u32;
            let mut j = 0;
            while j < 8 {
                c = if c & 1 != 0 {
                    0xedb88320 ^ (c >> 1)
                } else {
                    c >> 1
                };
                j += 1;
            }
            table[i] = c;
            i += 1;
        }
        table
    };

    let mut crc = 0xffffffff_u32;
    for &byte in data {
        crc = CRC32_TABLE[((crc ^ byte as u32) & 0xff) as usize] ^ (crc >> 8);
    }
    crc ^ 0xffffffff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur3_different_strings() {
        assert_ne!(murmur3_32(b"example.com", 0), murmur3_32(b"example.org", 0));
    }

    #[test]
    fn test_murmur3_different_seeds() {
        assert_ne!(murmur3_32(b"example.com", 0), murmur3_32(b"example.com", 1));
    }

    #[test]
    fn test_murmur3_tail_lengths_distinct() {
        let a = murmur3_32(b"abcde", 7);
        let b = murmur3_32(b"abcdf", 7);
        let c = murmur3_32(b"abcd", 7);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash64_never_zero() {
        for s in [b"" as &[u8], b"a", b"test", b"example.com"] {
            assert!(!hash64(s).is_empty(), "hash64({:?}) returned empty sentinel", s);
        }
    }

    #[test]
    fn test_hash_domain_case_insensitive() {
        assert_eq!(hash_domain("Example.COM"), hash_domain("example.com"));
    }

    #[test]
    fn test_hash_domain_ignores_root_dot() {
        assert_eq!(hash_domain("example.com."), hash_domain("example.com"));
    }

    #[test]
    fn test_crc32_known_value() {
        // Standard check value for "123456789"
        assert_eq!(crc32(b"123456789"), 0xcbf43926);
    }

    #[test]
    fn test_crc32_detects_changes() {
        assert_ne!(crc32(b"||ads.com^"), crc32(b"||ads.org^"));
    }
}
