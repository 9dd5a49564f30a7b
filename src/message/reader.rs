use crate::{
    bytes::Cursor,
    message::{Header, RrClass, RrType},
    names::{read_name, skip_name, NameBuf},
    Result,
};

/// Offsets and counts of the record sections of a received message.
///
/// Populating walks the whole message once, so a malformed record
/// anywhere is rejected up front and the projection accessors can trust
/// the section boundaries.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Sections {
    pub answer_offset: u16,
    pub answer_count: u16,
    pub authority_offset: u16,
    pub authority_count: u16,
    pub additional_offset: u16,
    pub additional_count: u16,
}

impl Sections {
    pub fn populate(msg: &[u8]) -> Result<(Header, Sections)> {
        let mut c = Cursor::new(msg);
        let header = Header::read(&mut c)?;

        for _ in 0..header.qd_count {
            skip_name(&mut c)?;
            c.skip(4)?;
        }

        let mut sections = Sections {
            answer_offset: c.pos() as u16,
            answer_count: header.an_count,
            ..Default::default()
        };

        for _ in 0..header.an_count {
            skip_record(&mut c)?;
        }
        sections.authority_offset = c.pos() as u16;
        sections.authority_count = header.ns_count;

        for _ in 0..header.ns_count {
            skip_record(&mut c)?;
        }
        sections.additional_offset = c.pos() as u16;
        sections.additional_count = header.ar_count;

        for _ in 0..header.ar_count {
            skip_record(&mut c)?;
        }

        Ok((header, sections))
    }
}

fn skip_record(c: &mut Cursor<'_>) -> Result<()> {
    skip_name(c)?;
    c.skip(8)?; // TYPE, CLASS, TTL
    let rd_length = c.u16_be()?;
    c.skip(rd_length as usize)
}

/// A resource record located inside a message.
#[derive(Clone, Debug)]
pub(crate) struct RecordRef<'a> {
    msg: &'a [u8],
    pub name_pos: usize,
    pub rtype: RrType,
    pub rclass: RrClass,
    pub ttl: u32,
    pub rdata_pos: usize,
    pub rdata_len: u16,
}

impl<'a> RecordRef<'a> {
    /// Reads the record owner name.
    pub fn owner(&self) -> Result<NameBuf> {
        read_name(&mut Cursor::with_pos(self.msg, self.name_pos))
    }

    /// Case-insensitive owner name match.
    pub fn owner_is(&self, name: &NameBuf) -> Result<bool> {
        Ok(self.owner()?.eq_ignore_case(name))
    }

    /// The raw record data.
    pub fn rdata(&self) -> Result<&'a [u8]> {
        Cursor::with_pos(self.msg, self.rdata_pos).slice(self.rdata_len as usize)
    }

    /// A cursor positioned at the record data, over the whole message so
    /// that embedded compression pointers resolve.
    pub fn rdata_cursor(&self) -> Cursor<'a> {
        Cursor::with_pos(self.msg, self.rdata_pos)
    }

    /// Reads the domain name the record data starts with (PTR, CNAME,
    /// DNAME, NS targets).
    pub fn rdata_name(&self) -> Result<NameBuf> {
        read_name(&mut self.rdata_cursor())
    }
}

/// Iterates the records of one message section.
pub(crate) struct RecordIter<'a> {
    msg: &'a [u8],
    cursor: Cursor<'a>,
    remaining: u16,
    failed: bool,
}

impl<'a> RecordIter<'a> {
    pub fn new(msg: &'a [u8], offset: u16, count: u16) -> Self {
        RecordIter {
            msg,
            cursor: Cursor::with_pos(msg, offset as usize),
            remaining: count,
            failed: false,
        }
    }

    fn next_impl(&mut self) -> Result<RecordRef<'a>> {
        let name_pos = self.cursor.pos();
        skip_name(&mut self.cursor)?;
        let rtype = RrType(self.cursor.u16_be()?);
        let rclass = RrClass(self.cursor.u16_be()?);
        let ttl = self.cursor.u32_be()?;
        let rdata_len = self.cursor.u16_be()?;
        let rdata_pos = self.cursor.pos();
        self.cursor.skip(rdata_len as usize)?;

        Ok(RecordRef {
            msg: self.msg,
            name_pos,
            rtype,
            rclass,
            ttl,
            rdata_pos,
            rdata_len,
        })
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Result<RecordRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let res = self.next_impl();
        if res.is_err() {
            self.failed = true;
        }
        Some(res)
    }
}
