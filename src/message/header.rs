use crate::{
    bytes::{Cursor, WCursor},
    constants::HEADER_LENGTH,
    message::Flags,
    Result,
};

/// Message header.
///
/// [RFC 1035 section 4.1.1](https://www.rfc-editor.org/rfc/rfc1035.html#section-4.1.1)
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Header {
    /// An identifier assigned by the program that generates the query.
    /// The identifier is copied into the corresponding reply and is used
    /// to match replies to outstanding queries.
    pub id: u16,
    /// Message flags.
    pub flags: Flags,
    /// Number of entries in the question section.
    pub qd_count: u16,
    /// Number of resource records in the answer section.
    pub an_count: u16,
    /// Number of name server resource records in the authority section.
    pub ns_count: u16,
    /// Number of resource records in the additional records section.
    pub ar_count: u16,
}

impl Header {
    pub(crate) fn read(c: &mut Cursor<'_>) -> Result<Header> {
        Ok(Header {
            id: c.u16_be()?,
            flags: Flags::from(c.u16_be()?),
            qd_count: c.u16_be()?,
            an_count: c.u16_be()?,
            ns_count: c.u16_be()?,
            ar_count: c.u16_be()?,
        })
    }

    pub(crate) fn write(&self, w: &mut WCursor<'_>) -> Result<usize> {
        w.u16_be(self.id)?;
        w.u16_be(self.flags.into())?;
        w.u16_be(self.qd_count)?;
        w.u16_be(self.an_count)?;
        w.u16_be(self.ns_count)?;
        w.u16_be(self.ar_count)?;
        Ok(HEADER_LENGTH)
    }
}
