//! Prefix arithmetic for EID and locator matching.
//!
//! A [`Prefix`] pairs an address with a prefix length counted from the most
//! significant bit of the network order address. The masking here is the
//! basis for longest-prefix matching in the mapping database, so it has to be
//! exact for both families, including the degenerate 0-length prefix.

use core::fmt;
use std::str::FromStr;

use log::debug;

use crate::address::{AddrOrdering, AddressError, LispAddr};

/// An `(address, prefix length)` pair.
///
/// The length is validated against the family on construction: 0..=32 for
/// IPv4, 0..=128 for IPv6. A prefix over [`LispAddr::Unspecified`] is
/// invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    addr: LispAddr,
    len: u8,
}

/// Error produced when constructing or parsing a [`Prefix`].
#[derive(Debug)]
pub enum PrefixError {
    /// The prefix length is out of range for the address family, or the
    /// family admits no prefix at all.
    InvalidLength,
    /// The textual form lacks the `/length` token.
    MissingLength,
    /// The address part could not be parsed.
    Address(AddressError),
}

impl Prefix {
    /// Create a new `Prefix` over the given address.
    pub fn new(addr: LispAddr, len: u8) -> Result<Prefix, PrefixError> {
        let max = match addr {
            LispAddr::V4(_) => 32,
            LispAddr::V6(_) => 128,
            LispAddr::Unspecified => return Err(PrefixError::InvalidLength),
        };
        if len > max {
            return Err(PrefixError::InvalidLength);
        }
        Ok(Prefix { addr, len })
    }

    /// The address this prefix was constructed with, host bits included.
    pub fn address(&self) -> LispAddr {
        self.addr
    }

    /// The prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.len
    }

    /// The network address: the prefix address with all host bits cleared.
    pub fn network(&self) -> LispAddr {
        match self.addr {
            LispAddr::V4(addr) => {
                // A plain shift by 32 would be UB territory, handle the
                // 0-length mask separately.
                let mask = if self.len == 0 {
                    0
                } else {
                    u32::MAX << (32 - self.len as u32)
                };
                LispAddr::V4((u32::from(addr) & mask).into())
            }
            LispAddr::V6(addr) => {
                // 128-bit masking is done one 32-bit word at a time: whole
                // words up to the prefix length are kept, one partial word
                // gets a truncated mask, the rest is zeroed.
                let whole_words = (self.len / 32) as usize;
                let partial_bits = u32::from(self.len % 32);

                let mut words = [0u32; 4];
                let octets = addr.octets();
                for (i, word) in words.iter_mut().enumerate() {
                    let raw: [u8; 4] = octets[i * 4..i * 4 + 4]
                        .try_into()
                        .expect("slice of 4 octets converts to [u8; 4]; qed");
                    let mask = if i < whole_words {
                        u32::MAX
                    } else if i == whole_words && partial_bits != 0 {
                        u32::MAX << (32 - partial_bits)
                    } else {
                        0
                    };
                    *word = u32::from_be_bytes(raw) & mask;
                }

                let mut masked = [0u8; 16];
                for (i, word) in words.iter().enumerate() {
                    masked[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
                }
                LispAddr::V6(masked.into())
            }
            // Unrepresentable per the constructor, but keep the arithmetic
            // total.
            LispAddr::Unspecified => LispAddr::Unspecified,
        }
    }

    /// Whether `other` is contained in this prefix.
    ///
    /// Containment requires matching families and that this prefix is no
    /// more specific than `other`. Identical prefixes contain themselves.
    pub fn contains(&self, other: &Prefix) -> bool {
        if self.addr.afi() != other.addr.afi() {
            return false;
        }
        if self.len > other.len {
            return false;
        }

        // Truncate the inner prefix to the outer length and compare network
        // addresses.
        let outer = self.network();
        let inner = Prefix {
            addr: other.addr,
            len: self.len,
        }
        .network();

        outer.compare(&inner) == AddrOrdering::Equal
    }
}

impl FromStr for Prefix {
    type Err = PrefixError;

    /// Parse the `address/length` form used in configuration files.
    ///
    /// A 0 length is rejected in textual form, config entries always carry a
    /// real network.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_part, len_part) = match s.split_once('/') {
            Some(parts) => parts,
            None => {
                debug!("Prefix not of the form prefix/length: {s}");
                return Err(PrefixError::MissingLength);
            }
        };
        let addr = LispAddr::parse_literal(addr_part)?;
        let len = len_part
            .parse::<u8>()
            .map_err(|_| PrefixError::InvalidLength)?;
        if len == 0 {
            return Err(PrefixError::InvalidLength);
        }
        Prefix::new(addr, len)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

impl From<AddressError> for PrefixError {
    fn from(value: AddressError) -> Self {
        PrefixError::Address(value)
    }
}

impl fmt::Display for PrefixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength => f.write_str("prefix length out of range for address family"),
            Self::MissingLength => f.write_str("missing /length in prefix"),
            Self::Address(e) => f.write_fmt(format_args!("invalid prefix address: {e}")),
        }
    }
}

impl std::error::Error for PrefixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Address(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Prefix;
    use crate::address::LispAddr;

    fn prefix(s: &str) -> Prefix {
        Prefix::from_str(s).expect("valid test prefix")
    }

    fn addr(s: &str) -> LispAddr {
        LispAddr::parse_literal(s).expect("valid test literal")
    }

    #[test]
    fn network_address_v4() {
        assert_eq!(prefix("192.168.1.130/24").network(), addr("192.168.1.0"));
        assert_eq!(prefix("10.1.2.3/8").network(), addr("10.0.0.0"));
        assert_eq!(prefix("255.255.255.255/32").network(), addr("255.255.255.255"));
        let all = Prefix::new(addr("255.255.255.255"), 0).unwrap();
        assert_eq!(all.network(), addr("0.0.0.0"));
    }

    #[test]
    fn network_address_v6() {
        assert_eq!(prefix("2001:db8::1234/32").network(), addr("2001:db8::"));
        assert_eq!(
            prefix("2001:db8:aaaa:bbbb:cccc::1/64").network(),
            addr("2001:db8:aaaa:bbbb::")
        );
        // Partial word masking, 36 bits keeps the top nibble of word 1.
        assert_eq!(
            prefix("2001:db8:f234::1/36").network(),
            addr("2001:db8:f000::")
        );
        assert_eq!(
            prefix("2001:db8::1/128").network(),
            addr("2001:db8::1")
        );
        let all = Prefix::new(addr("ffff::ffff"), 0).unwrap();
        assert_eq!(all.network(), addr("::"));
    }

    #[test]
    fn containment() {
        assert!(prefix("10.0.0.0/8").contains(&prefix("10.1.2.0/24")));
        assert!(!prefix("10.0.0.0/8").contains(&prefix("11.0.0.0/8")));
        // More specific never contains less specific.
        assert!(!prefix("10.1.2.0/24").contains(&prefix("10.0.0.0/8")));
        // Reflexive.
        assert!(prefix("10.1.2.0/24").contains(&prefix("10.1.2.0/24")));
        assert!(prefix("2001:db8::/32").contains(&prefix("2001:db8:1::/48")));
        assert!(!prefix("2001:db8::/32").contains(&prefix("2001:db9::/48")));
    }

    #[test]
    fn containment_requires_matching_families() {
        // ::/1 covers half the v6 space, still unrelated to any v4 prefix.
        let v6 = Prefix::new(addr("::"), 1).unwrap();
        let v4 = Prefix::new(addr("0.0.0.0"), 1).unwrap();
        assert!(!v6.contains(&v4));
        assert!(!v4.contains(&v6));
    }

    #[test]
    fn length_validation() {
        assert!(Prefix::new(addr("10.0.0.0"), 32).is_ok());
        assert!(Prefix::new(addr("10.0.0.0"), 33).is_err());
        assert!(Prefix::new(addr("2001:db8::"), 128).is_ok());
        assert!(Prefix::new(addr("2001:db8::"), 129).is_err());
        assert!(Prefix::new(LispAddr::Unspecified, 0).is_err());
    }

    #[test]
    fn text_form() {
        assert!(Prefix::from_str("10.0.0.0").is_err());
        assert!(Prefix::from_str("10.0.0.0/").is_err());
        assert!(Prefix::from_str("10.0.0.0/0").is_err());
        assert!(Prefix::from_str("10.0.0.0/33").is_err());
        assert!(Prefix::from_str("not-an-addr/8").is_err());
        let p = prefix("10.0.0.0/8");
        assert_eq!(p.prefix_len(), 8);
        assert_eq!(p.address(), addr("10.0.0.0"));
        assert_eq!(p.to_string(), "10.0.0.0/8");
    }
}
