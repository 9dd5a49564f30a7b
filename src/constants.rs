//! Constants and definitions.

/// Domain name max length.
///
/// [RFC 1035 section 3.1](https://www.rfc-editor.org/rfc/rfc1035.html#section-3.1)
pub const NAME_MAX_LENGTH: usize = 255;

/// Domain name label max length.
///
/// [RFC 1035 section 3.1](https://www.rfc-editor.org/rfc/rfc1035.html#section-3.1)
pub const LABEL_MAX_LENGTH: usize = 63;

/// Maximal number of compression pointers allowed in a single domain name.
///
/// This is a [stubdns](crate)-specific constant.
pub const NAME_MAX_POINTERS: usize = 32;

/// Message header length.
///
/// [RFC 1035 section 4.1.1](https://www.rfc-editor.org/rfc/rfc1035.html#section-4.1.1)
pub const HEADER_LENGTH: usize = 12;

/// Maximal size of a DNS message sent or received over UDP.
///
/// [RFC 1035 section 2.3.4](https://www.rfc-editor.org/rfc/rfc1035.html#section-2.3.4)
pub const UDP_MESSAGE_MAX_SIZE: usize = 512;

/// Maximal size of a DNS message sent or received over the TCP transport.
#[cfg(feature = "tcp")]
#[cfg_attr(docsrs, doc(cfg(feature = "tcp")))]
pub const TCP_MESSAGE_MAX_SIZE: usize = 1024;

/// Size of the buffers queries and responses are held in.
pub(crate) const MESSAGE_MAX_SIZE: usize = if cfg!(feature = "tcp") {
    1024
} else {
    UDP_MESSAGE_MAX_SIZE
};

/// Maximal number of CNAME alias rewrites followed by a single query.
pub const MAX_ALIAS_NAME_CHANGES: u16 = 40;

/// Maximal number of concurrently live queries, siblings included.
///
/// This is a [stubdns](crate)-specific constant.
pub const QUERY_STORE_CAPACITY: usize = 16;

/// Maximal size of TXT record data returned in service info.
pub const TXT_DATA_MAX_SIZE: usize = 256;
