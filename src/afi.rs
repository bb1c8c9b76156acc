//! Translation between the AFI numbering used on the wire by the LISP
//! control plane and the address families the host stack knows about.
//!
//! AFI values follow the IANA address-family registry, with the LCAF value
//! carved out by LISP for its extended encodings. LCAF is deliberately not a
//! host family: it survives translation as its own variant and callers must
//! special-case it before treating an address as fixed width.

use std::fmt;

/// Wire value for the "no address" AFI.
const AFI_NO_ADDR: u16 = 0;
/// Wire value for the IPv4 AFI.
const AFI_IP: u16 = 1;
/// Wire value for the IPv6 AFI.
const AFI_IPV6: u16 = 2;
/// Wire value for the LISP Canonical Address Format AFI.
const AFI_LCAF: u16 = 16387;

/// An address family as carried in a 2-byte AFI field of a LISP control
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Afi {
    /// Explicit absence of an address. Carries no payload bytes.
    NoAddress,
    /// Plain IPv4, 4 payload bytes.
    Ipv4,
    /// Plain IPv6, 16 payload bytes.
    Ipv6,
    /// LISP Canonical Address Format. Variable-width extended encoding,
    /// decoded by a dedicated collaborator, never by this crate.
    Lcaf,
}

/// Error returned when a wire AFI value is not part of the translation table.
///
/// The offending value is kept so callers can log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownAfi(pub u16);

impl Afi {
    /// Translate a wire AFI value to an address family.
    pub fn from_wire(value: u16) -> Result<Afi, UnknownAfi> {
        match value {
            AFI_NO_ADDR => Ok(Afi::NoAddress),
            AFI_IP => Ok(Afi::Ipv4),
            AFI_IPV6 => Ok(Afi::Ipv6),
            AFI_LCAF => Ok(Afi::Lcaf),
            other => Err(UnknownAfi(other)),
        }
    }

    /// The wire value for this address family. Total inverse of
    /// [`Afi::from_wire`].
    pub fn as_wire(&self) -> u16 {
        match self {
            Afi::NoAddress => AFI_NO_ADDR,
            Afi::Ipv4 => AFI_IP,
            Afi::Ipv6 => AFI_IPV6,
            Afi::Lcaf => AFI_LCAF,
        }
    }

    /// The fixed payload length in bytes for an address of this family.
    ///
    /// `NoAddress` has a valid length of 0. `Lcaf` addresses have no fixed
    /// width, which is an error distinct from the zero length.
    pub fn addr_len(&self) -> Result<usize, UnknownAfi> {
        match self {
            Afi::NoAddress => Ok(0),
            Afi::Ipv4 => Ok(4),
            Afi::Ipv6 => Ok(16),
            Afi::Lcaf => Err(UnknownAfi(AFI_LCAF)),
        }
    }
}

impl fmt::Display for Afi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Afi::NoAddress => "no-address",
            Afi::Ipv4 => "IPv4",
            Afi::Ipv6 => "IPv6",
            Afi::Lcaf => "LCAF",
        })
    }
}

impl fmt::Display for UnknownAfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("unknown AFI value {}", self.0))
    }
}

impl std::error::Error for UnknownAfi {}
