use crate::{
    bytes::WCursor,
    message::{Flags, Header, RrClass, RrType},
    names::NameBuf,
    Result,
};

/// Builds outgoing query messages.
///
/// A message carries one or two questions. The question name is copied
/// from the query's stored encoding; both questions of a two-question
/// message repeat the full name, compression is never emitted.
pub(crate) struct QueryWriter<'a> {
    wcursor: WCursor<'a>,
}

impl<'a> QueryWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        QueryWriter {
            wcursor: WCursor::new(buf),
        }
    }

    pub fn write(
        &mut self,
        id: u16,
        recursion_desired: bool,
        name: &NameBuf,
        qtypes: &[RrType],
    ) -> Result<usize> {
        let header = Header {
            id,
            flags: *Flags::new().set_recursion_desired(recursion_desired),
            qd_count: qtypes.len() as u16,
            ..Default::default()
        };

        header.write(&mut self.wcursor)?;
        for qtype in qtypes {
            self.wcursor.bytes(name.as_bytes())?;
            self.wcursor.u16_be(qtype.0)?;
            self.wcursor.u16_be(RrClass::IN.0)?;
        }

        Ok(self.wcursor.pos())
    }
}
