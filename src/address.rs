//! The dual-stack address abstraction used throughout the control plane.
//!
//! A [`LispAddr`] is a value type: the family tag and the payload live in the
//! same enum variant, so a mismatched tag/payload combination cannot be
//! constructed. [`LispAddr::Unspecified`] is the explicit "unknown/absent"
//! sentinel, it is never encoded as a zero address.

use core::fmt;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    str::FromStr,
};

use bytes::{Buf, BufMut};
use log::debug;

use crate::{
    afi::Afi,
    resolve::{PreferredFamily, Resolve},
};

/// An IPv4 or IPv6 address, or the explicit absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LispAddr {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
    /// No address. Serializes to the "no address" AFI with an empty payload.
    Unspecified,
}

/// Byte order to use when writing an IPv4 address payload.
///
/// IPv6 payloads are a plain byte string and have no secondary host order at
/// this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Network,
    Host,
}

/// Outcome of comparing two addresses.
///
/// Addresses of different families have no defined order. That is an explicit
/// outcome here, never coerced into an equality result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrOrdering {
    DifferentFamily,
    Less,
    Equal,
    Greater,
}

/// Errors produced while converting addresses between their forms.
#[derive(Debug)]
pub enum AddressError {
    /// The address family is not recognized, or the operation is undefined
    /// for [`LispAddr::Unspecified`].
    UnknownFamily,
    /// An LCAF encoded address reached a point expecting a fixed width
    /// address. LCAF decoding is owned by a dedicated collaborator.
    UnsupportedEncoding,
    /// The text is neither a valid address literal nor a name which
    /// qualifies for resolution.
    Parse,
    /// A qualified name could not be resolved.
    Resolution(io::Error),
    /// The wire buffer ended before the length declared by the AFI tag.
    Truncated,
}

impl LispAddr {
    /// Parse an address literal.
    ///
    /// A colon anywhere in the string selects IPv6, otherwise the string is
    /// treated as an IPv4 literal.
    pub fn parse_literal(s: &str) -> Result<LispAddr, AddressError> {
        if s.contains(':') {
            Ipv6Addr::from_str(s).map(LispAddr::V6)
        } else {
            Ipv4Addr::from_str(s).map(LispAddr::V4)
        }
        .map_err(|_| AddressError::Parse)
    }

    /// Convert a config entry to one or more addresses.
    ///
    /// The string is first tried as a literal. If that fails and it
    /// qualifies as a resolvable name, the resolver collaborator is asked,
    /// with `preferred` as the family hint. Anything else is rejected
    /// outright.
    pub fn from_text<R: Resolve>(
        s: &str,
        preferred: PreferredFamily,
        resolver: &R,
    ) -> Result<Vec<LispAddr>, AddressError> {
        if let Ok(addr) = Self::parse_literal(s) {
            return Ok(vec![addr]);
        }

        if !qualifies_as_name(s) {
            debug!("Could not parse address or hostname: {s}");
            return Err(AddressError::Parse);
        }

        match resolver.resolve(s, preferred) {
            Ok(addrs) if addrs.is_empty() => Err(AddressError::Resolution(io::Error::new(
                io::ErrorKind::NotFound,
                "name resolved to no usable address",
            ))),
            Ok(addrs) => Ok(addrs),
            Err(e) => {
                debug!("Failed to resolve {s}: {e}");
                Err(AddressError::Resolution(e))
            }
        }
    }

    /// The protocol AFI for this address family.
    pub fn afi(&self) -> Afi {
        match self {
            LispAddr::V4(_) => Afi::Ipv4,
            LispAddr::V6(_) => Afi::Ipv6,
            LispAddr::Unspecified => Afi::NoAddress,
        }
    }

    /// Render the address in presentation format.
    ///
    /// [`LispAddr::Unspecified`] has no textual form. Every call returns an
    /// independently owned string.
    pub fn to_text(&self) -> Result<String, AddressError> {
        match self {
            LispAddr::V4(addr) => Ok(addr.to_string()),
            LispAddr::V6(addr) => Ok(addr.to_string()),
            LispAddr::Unspecified => Err(AddressError::UnknownFamily),
        }
    }

    /// Write the address payload, without AFI tag, to `dst`.
    ///
    /// IPv4 honors the requested byte order. IPv6 is a plain byte string and
    /// is emitted unchanged. Returns the number of bytes written.
    pub fn write_wire<B: BufMut>(
        &self,
        dst: &mut B,
        order: ByteOrder,
    ) -> Result<usize, AddressError> {
        match self {
            LispAddr::V4(addr) => {
                let octets = addr.octets();
                match order {
                    ByteOrder::Network => dst.put_slice(&octets),
                    ByteOrder::Host => {
                        dst.put_slice(&u32::from_be_bytes(octets).to_ne_bytes())
                    }
                }
                Ok(4)
            }
            LispAddr::V6(addr) => {
                dst.put_slice(&addr.octets());
                Ok(16)
            }
            LispAddr::Unspecified => {
                debug!("Refusing to serialize an address without family");
                Err(AddressError::UnknownFamily)
            }
        }
    }

    /// Read an AFI-tagged address from `src`.
    ///
    /// Consumes the 2-byte network order AFI tag and exactly the payload
    /// length of the resolved family, never more. The "no address" tag
    /// consumes no payload bytes.
    pub fn read_wire<B: Buf>(src: &mut B) -> Result<LispAddr, AddressError> {
        if src.remaining() < 2 {
            return Err(AddressError::Truncated);
        }
        let afi = match Afi::from_wire(src.get_u16()) {
            Ok(afi) => afi,
            Err(e) => {
                debug!("Could not extract address: {e}");
                return Err(AddressError::UnknownFamily);
            }
        };
        match afi {
            Afi::NoAddress => Ok(LispAddr::Unspecified),
            Afi::Ipv4 => {
                if src.remaining() < 4 {
                    return Err(AddressError::Truncated);
                }
                let mut raw = [0; 4];
                src.copy_to_slice(&mut raw);
                Ok(LispAddr::V4(raw.into()))
            }
            Afi::Ipv6 => {
                if src.remaining() < 16 {
                    return Err(AddressError::Truncated);
                }
                let mut raw = [0; 16];
                src.copy_to_slice(&mut raw);
                Ok(LispAddr::V6(raw.into()))
            }
            Afi::Lcaf => {
                debug!("Could not extract address: LCAF encoding is handled elsewhere");
                Err(AddressError::UnsupportedEncoding)
            }
        }
    }

    /// Compare two addresses byte-wise in network order.
    pub fn compare(&self, other: &LispAddr) -> AddrOrdering {
        let cmp = match (self, other) {
            (LispAddr::V4(a), LispAddr::V4(b)) => a.octets().cmp(&b.octets()),
            (LispAddr::V6(a), LispAddr::V6(b)) => a.octets().cmp(&b.octets()),
            _ => return AddrOrdering::DifferentFamily,
        };
        match cmp {
            std::cmp::Ordering::Less => AddrOrdering::Less,
            std::cmp::Ordering::Equal => AddrOrdering::Equal,
            std::cmp::Ordering::Greater => AddrOrdering::Greater,
        }
    }

    /// Whether the address is link local.
    ///
    /// For IPv4 this is 169.254.0.0/16, for IPv6 the fe80::/10 block.
    /// Link-local addresses are not usable as RLOCs.
    pub fn is_link_local(&self) -> bool {
        match self {
            LispAddr::V4(addr) => {
                let octets = addr.octets();
                octets[0] == 169 && octets[1] == 254
            }
            LispAddr::V6(addr) => {
                let octets = addr.octets();
                octets[0] == 0xfe && (octets[1] & 0xc0) == 0x80
            }
            LispAddr::Unspecified => false,
        }
    }

    /// Build the native socket address used on the sendto path.
    pub fn socket_addr(&self, port: u16) -> Result<SocketAddr, AddressError> {
        match self {
            LispAddr::V4(addr) => Ok(SocketAddr::new(IpAddr::V4(*addr), port)),
            LispAddr::V6(addr) => Ok(SocketAddr::new(IpAddr::V6(*addr), port)),
            LispAddr::Unspecified => Err(AddressError::UnknownFamily),
        }
    }
}

impl From<IpAddr> for LispAddr {
    fn from(value: IpAddr) -> Self {
        match value {
            IpAddr::V4(addr) => LispAddr::V4(addr),
            IpAddr::V6(addr) => LispAddr::V6(addr),
        }
    }
}

impl fmt::Display for LispAddr {
    /// Presentation format for V4/V6. `Unspecified` intentionally renders as
    /// an empty string rather than a placeholder; use [`LispAddr::to_text`]
    /// when absence must be an error.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LispAddr::V4(addr) => write!(f, "{addr}"),
            LispAddr::V6(addr) => write!(f, "{addr}"),
            LispAddr::Unspecified => Ok(()),
        }
    }
}

/// Whether a string qualifies as a name we are willing to hand to the
/// resolver.
///
/// The first character must be alphanumeric, the last alphabetic, all
/// characters alphanumeric, `-` or `.`, and there must be at least one dot
/// with no two dots adjacent.
fn qualifies_as_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    let (first, last) = match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return false,
    };
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphabetic() {
        return false;
    }

    let mut seen_dot = false;
    let mut prev = 0u8;
    for &c in bytes {
        if c == b'.' {
            if prev == b'.' {
                return false;
            }
            seen_dot = true;
        } else if !c.is_ascii_alphanumeric() && c != b'-' {
            return false;
        }
        prev = c;
    }
    seen_dot
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFamily => f.write_str("unknown address family"),
            Self::UnsupportedEncoding => f.write_str("unsupported extended address encoding"),
            Self::Parse => f.write_str("not an address literal or resolvable name"),
            Self::Resolution(e) => f.write_fmt(format_args!("name resolution failed: {e}")),
            Self::Truncated => f.write_str("address truncated on the wire"),
        }
    }
}

impl std::error::Error for AddressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resolution(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::{Buf, BytesMut};

    use super::{qualifies_as_name, AddrOrdering, AddressError, ByteOrder, LispAddr};
    use crate::resolve::{PreferredFamily, Resolve};

    struct FixedResolver(Vec<LispAddr>);

    impl Resolve for FixedResolver {
        fn resolve(
            &self,
            _name: &str,
            _preferred: PreferredFamily,
        ) -> io::Result<Vec<LispAddr>> {
            Ok(self.0.clone())
        }
    }

    struct FailingResolver;

    impl Resolve for FailingResolver {
        fn resolve(
            &self,
            _name: &str,
            _preferred: PreferredFamily,
        ) -> io::Result<Vec<LispAddr>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such host"))
        }
    }

    #[test]
    fn parse_and_format_roundtrip() {
        for literal in ["10.0.0.1", "192.168.1.130", "2001:db8::1234", "fe80::1", "::"] {
            let addr = LispAddr::parse_literal(literal).expect("valid literal");
            assert_eq!(addr.to_text().expect("has a textual form"), literal);
            // Re-parsing the formatted form yields an equal value.
            let reparsed = LispAddr::parse_literal(&addr.to_text().unwrap()).unwrap();
            assert_eq!(addr.compare(&reparsed), AddrOrdering::Equal);
        }
    }

    #[test]
    fn colon_probe_selects_family() {
        assert!(matches!(
            LispAddr::parse_literal("2001:db8::1").unwrap(),
            LispAddr::V6(_)
        ));
        assert!(matches!(
            LispAddr::parse_literal("127.0.0.1").unwrap(),
            LispAddr::V4(_)
        ));
        // A v4 literal with a colon is probed as v6 and rejected.
        assert!(LispAddr::parse_literal("127.0.0.1:").is_err());
    }

    #[test]
    fn unspecified_has_no_textual_form() {
        assert!(LispAddr::Unspecified.to_text().is_err());
        assert_eq!(format!("{}", LispAddr::Unspecified), "");
    }

    #[test]
    fn wire_roundtrip() {
        for literal in ["192.0.2.55", "2001:db8::dead:beef"] {
            let addr = LispAddr::parse_literal(literal).unwrap();
            let mut buf = BytesMut::new();
            buf.extend_from_slice(&addr.afi().as_wire().to_be_bytes());
            addr.write_wire(&mut buf, ByteOrder::Network)
                .expect("serializable");
            let decoded = LispAddr::read_wire(&mut buf).expect("decodable");
            assert_eq!(addr, decoded);
            assert!(!buf.has_remaining());
        }
    }

    #[test]
    fn no_address_tag_consumes_no_payload() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0, 0, 0xaa, 0xbb]);
        let decoded = LispAddr::read_wire(&mut buf).unwrap();
        assert_eq!(decoded, LispAddr::Unspecified);
        // Trailing bytes belong to the caller.
        assert_eq!(buf.remaining(), 2);
    }

    #[test]
    fn lcaf_and_unknown_tags_fail() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&16387u16.to_be_bytes());
        assert!(matches!(
            LispAddr::read_wire(&mut buf),
            Err(AddressError::UnsupportedEncoding)
        ));

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0, 3, 1, 2, 3, 4]);
        assert!(matches!(
            LispAddr::read_wire(&mut buf),
            Err(AddressError::UnknownFamily)
        ));
    }

    #[test]
    fn short_buffers_fail_cleanly() {
        // Tag promises IPv6 but only 4 payload bytes follow.
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0, 2, 1, 2, 3, 4]);
        assert!(matches!(
            LispAddr::read_wire(&mut buf),
            Err(AddressError::Truncated)
        ));

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0]);
        assert!(matches!(
            LispAddr::read_wire(&mut buf),
            Err(AddressError::Truncated)
        ));
    }

    #[test]
    fn unspecified_has_no_wire_form() {
        let mut buf = BytesMut::new();
        assert!(LispAddr::Unspecified
            .write_wire(&mut buf, ByteOrder::Network)
            .is_err());
    }

    #[test]
    fn cross_family_compare_is_never_an_ordering() {
        let v4 = LispAddr::parse_literal("1.2.3.4").unwrap();
        let v6 = LispAddr::parse_literal("::1").unwrap();
        assert_eq!(v4.compare(&v6), AddrOrdering::DifferentFamily);
        assert_eq!(v6.compare(&v4), AddrOrdering::DifferentFamily);
        assert_eq!(
            LispAddr::Unspecified.compare(&LispAddr::Unspecified),
            AddrOrdering::DifferentFamily
        );
    }

    #[test]
    fn same_family_ordering() {
        let low = LispAddr::parse_literal("10.0.0.1").unwrap();
        let high = LispAddr::parse_literal("10.0.0.2").unwrap();
        assert_eq!(low.compare(&high), AddrOrdering::Less);
        assert_eq!(high.compare(&low), AddrOrdering::Greater);
        assert_eq!(low.compare(&low), AddrOrdering::Equal);
    }

    #[test]
    fn link_local_classification() {
        assert!(LispAddr::parse_literal("169.254.1.1").unwrap().is_link_local());
        assert!(LispAddr::parse_literal("fe80::1").unwrap().is_link_local());
        assert!(!LispAddr::parse_literal("8.8.8.8").unwrap().is_link_local());
        assert!(!LispAddr::parse_literal("2001:db8::1").unwrap().is_link_local());
        // febf::/10 is still within the link local block, fec0:: is not.
        assert!(LispAddr::parse_literal("febf::1").unwrap().is_link_local());
        assert!(!LispAddr::parse_literal("fec0::1").unwrap().is_link_local());
        assert!(!LispAddr::Unspecified.is_link_local());
    }

    #[test]
    fn socket_addr_construction() {
        let addr = LispAddr::parse_literal("192.0.2.1").unwrap();
        assert_eq!(
            addr.socket_addr(4342).unwrap().to_string(),
            "192.0.2.1:4342"
        );
        let addr = LispAddr::parse_literal("2001:db8::1").unwrap();
        assert_eq!(
            addr.socket_addr(4342).unwrap().to_string(),
            "[2001:db8::1]:4342"
        );
        assert!(LispAddr::Unspecified.socket_addr(4342).is_err());
    }

    #[test]
    fn name_qualification_rule() {
        assert!(qualifies_as_name("example.com"));
        assert!(qualifies_as_name("a-b.example.org"));
        assert!(qualifies_as_name("0host.example.net"));
        // No dot at all.
        assert!(!qualifies_as_name("localhost"));
        // Adjacent dots.
        assert!(!qualifies_as_name("bad..example.com"));
        // Leading or trailing dot.
        assert!(!qualifies_as_name(".example.com"));
        assert!(!qualifies_as_name("example.com."));
        // Final character must be alphabetic.
        assert!(!qualifies_as_name("example.co1"));
        // First character must be alphanumeric.
        assert!(!qualifies_as_name("-example.com"));
        // Invalid character.
        assert!(!qualifies_as_name("exa_mple.com"));
        assert!(!qualifies_as_name(""));
    }

    #[test]
    fn from_text_prefers_literal() {
        let resolver = FailingResolver;
        let addrs =
            LispAddr::from_text("203.0.113.7", PreferredFamily::Any, &resolver).unwrap();
        assert_eq!(addrs, vec![LispAddr::parse_literal("203.0.113.7").unwrap()]);
    }

    #[test]
    fn from_text_resolves_qualified_names() {
        let expected = vec![LispAddr::parse_literal("198.51.100.4").unwrap()];
        let resolver = FixedResolver(expected.clone());
        let addrs =
            LispAddr::from_text("mr.example.com", PreferredFamily::Any, &resolver).unwrap();
        assert_eq!(addrs, expected);
    }

    #[test]
    fn from_text_rejects_malformed_input_outright() {
        // A malformed name must be rejected without asking the resolver.
        struct PanicResolver;
        impl Resolve for PanicResolver {
            fn resolve(
                &self,
                _name: &str,
                _preferred: PreferredFamily,
            ) -> io::Result<Vec<LispAddr>> {
                panic!("resolver must not be consulted for malformed input");
            }
        }
        assert!(matches!(
            LispAddr::from_text("not_a%name", PreferredFamily::Any, &PanicResolver),
            Err(AddressError::Parse)
        ));
    }

    #[test]
    fn from_text_reports_resolution_failure() {
        assert!(matches!(
            LispAddr::from_text("mr.example.com", PreferredFamily::Any, &FailingResolver),
            Err(AddressError::Resolution(_))
        ));
    }
}
