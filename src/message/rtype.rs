use std::fmt::{self, Display, Formatter};

/// A resource record type.
///
/// Modeled as a newtype over the raw 16-bit value so that arbitrary
/// record queries can name types this crate has no special handling for.
///
/// [RFC 1035 section 3.2.2](https://www.rfc-editor.org/rfc/rfc1035.html#section-3.2.2)
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RrType(pub u16);

impl RrType {
    /// A host address.
    pub const A: RrType = RrType(1);
    /// An authoritative name server.
    pub const NS: RrType = RrType(2);
    /// The canonical name for an alias.
    pub const CNAME: RrType = RrType(5);
    /// A domain name pointer.
    pub const PTR: RrType = RrType(12);
    /// Text strings.
    pub const TXT: RrType = RrType(16);
    /// An IPv6 host address.
    pub const AAAA: RrType = RrType(28);
    /// A server selection record.
    pub const SRV: RrType = RrType(33);
    /// A non-terminal name redirection.
    pub const DNAME: RrType = RrType(39);

    /// Returns `true` for record types whose RDATA embeds a domain name
    /// subject to compression in a received message.
    pub(crate) fn rdata_is_name(self) -> bool {
        matches!(
            self,
            RrType::NS | RrType::CNAME | RrType::PTR | RrType::SRV | RrType::DNAME
        )
    }

    /// Converts a record type to a static string, `"TYPE"` for
    /// values without a mnemonic.
    pub fn to_str(self) -> &'static str {
        match self {
            RrType::A => "A",
            RrType::NS => "NS",
            RrType::CNAME => "CNAME",
            RrType::PTR => "PTR",
            RrType::TXT => "TXT",
            RrType::AAAA => "AAAA",
            RrType::SRV => "SRV",
            RrType::DNAME => "DNAME",
            _ => "TYPE",
        }
    }
}

impl Display for RrType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.to_str() {
            "TYPE" => write!(f, "TYPE{}", self.0),
            s => f.pad(s),
        }
    }
}

impl From<u16> for RrType {
    #[inline]
    fn from(value: u16) -> Self {
        RrType(value)
    }
}

/// A resource record class.
///
/// [RFC 1035 section 3.2.4](https://www.rfc-editor.org/rfc/rfc1035.html#section-3.2.4)
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RrClass(pub u16);

impl RrClass {
    /// The Internet class.
    pub const IN: RrClass = RrClass(1);
}

impl Display for RrClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            RrClass::IN => f.pad("IN"),
            RrClass(v) => write!(f, "CLASS{v}"),
        }
    }
}
