//! Domain names in wire form.
//!
//! Names are kept encoded (length-prefixed labels, zero-terminated) in
//! bounded buffers. Reading from a received message follows compression
//! pointers; emitting never produces them.

use crate::{
    bytes::Cursor,
    constants::{LABEL_MAX_LENGTH, NAME_MAX_LENGTH, NAME_MAX_POINTERS},
    Error, Result,
};
use arrayvec::{ArrayString, ArrayVec};
use std::fmt::{self, Display, Formatter};

/// A dotted-form domain name in a bounded string.
pub type NameString = ArrayString<NAME_MAX_LENGTH>;

/// A single label in a bounded string.
pub type LabelString = ArrayString<LABEL_MAX_LENGTH>;

const POINTER_MASK: u8 = 0b1100_0000;

/// A domain name encoded in DNS wire form, owned inline.
///
/// The buffer holds the complete uncompressed encoding including the
/// terminating zero byte. Comparison is case-insensitive: label length
/// bytes never exceed 63 and are left untouched by ASCII lowercasing.
#[derive(Clone, Debug, Default)]
pub(crate) struct NameBuf {
    bytes: ArrayVec<u8, NAME_MAX_LENGTH>,
}

impl NameBuf {
    /// Encodes a name from an optional single label and a dotted name.
    ///
    /// `label`, when given, is prepended as one label regardless of any
    /// dots it contains (service instance labels may embed dots). `name`
    /// is split on dots; a trailing dot is accepted.
    pub fn encode(label: Option<&str>, name: &str) -> Result<NameBuf> {
        let mut out = NameBuf::default();

        if let Some(label) = label {
            out.push_label(label.as_bytes())?;
        }

        let name = name.strip_suffix('.').unwrap_or(name);
        if name.is_empty() && label.is_none() {
            return Err(Error::InvalidArgs("empty name"));
        }
        if !name.is_empty() {
            for part in name.split('.') {
                out.push_label(part.as_bytes())?;
            }
        }

        out.terminate()?;
        Ok(out)
    }

    /// Encodes a name by prepending `label` to an already-encoded name.
    pub fn encode_with_suffix(label: &str, suffix: &NameBuf) -> Result<NameBuf> {
        let mut out = NameBuf::default();
        out.push_label(label.as_bytes())?;
        // suffix is already terminated
        out.bytes
            .try_extend_from_slice(suffix.as_bytes())
            .map_err(|_| Error::InvalidArgs("name too long"))?;
        Ok(out)
    }

    fn push_label(&mut self, label: &[u8]) -> Result<()> {
        if label.is_empty() {
            return Err(Error::InvalidArgs("empty label"));
        }
        if label.len() > LABEL_MAX_LENGTH {
            return Err(Error::InvalidArgs("label too long"));
        }
        if self.bytes.remaining_capacity() < label.len() + 2 {
            // room for this label and the terminator
            return Err(Error::InvalidArgs("name too long"));
        }
        self.bytes.push(label.len() as u8);
        self.bytes.try_extend_from_slice(label).ok();
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.bytes
            .try_push(0)
            .map_err(|_| Error::InvalidArgs("name too long"))
    }

    /// The complete encoding, terminator included.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Case-insensitive wire-form equality.
    pub fn eq_ignore_case(&self, other: &NameBuf) -> bool {
        self.bytes.eq_ignore_ascii_case(&other.bytes)
    }

    /// Returns the first label.
    pub fn first_label(&self) -> Result<LabelString> {
        let mut c = Cursor::new(self.as_bytes());
        let len = c.u8()? as usize;
        if len == 0 || len > LABEL_MAX_LENGTH {
            return Err(Error::Parse);
        }
        label_string(c.slice(len)?)
    }

    /// Splits off the first label, returning it and the remaining name.
    pub fn split_first(&self) -> Result<(LabelString, NameBuf)> {
        let mut c = Cursor::new(self.as_bytes());
        let len = c.u8()? as usize;
        if len == 0 || len > LABEL_MAX_LENGTH {
            return Err(Error::Parse);
        }
        let label = label_string(c.slice(len)?)?;

        let mut rest = NameBuf::default();
        rest.bytes
            .try_extend_from_slice(&self.as_bytes()[1 + len..])
            .map_err(|_| Error::Parse)?;
        Ok((label, rest))
    }

    /// Renders the name in dotted form, `example.com.` style, with the
    /// trailing dot denoting the root zone.
    pub fn to_dotted(&self) -> NameString {
        let mut out = NameString::new();
        let mut c = Cursor::new(self.as_bytes());

        loop {
            let len = match c.u8() {
                Ok(0) | Err(_) => break,
                Ok(l) => l as usize,
            };
            let Ok(label) = c.slice(len) else { break };
            for &b in label {
                let ch = if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '?'
                };
                if out.try_push(ch).is_err() {
                    return out;
                }
            }
            if out.try_push('.').is_err() {
                return out;
            }
        }

        if out.is_empty() {
            out.push('.');
        }
        out
    }
}

fn label_string(bytes: &[u8]) -> Result<LabelString> {
    let s = std::str::from_utf8(bytes).map_err(|_| Error::Parse)?;
    LabelString::try_from(s).map_err(|_| Error::Parse)
}

/// Reads a possibly compressed name at the cursor into uncompressed wire
/// form. The cursor is left just past the name's in-place bytes.
pub(crate) fn read_name(c: &mut Cursor<'_>) -> Result<NameBuf> {
    let mut out = NameBuf::default();
    let mut n_pointers = 0usize;
    let mut resume_pos = None;

    loop {
        let len = c.u8()?;
        match len {
            0 => break,
            l if l & POINTER_MASK == POINTER_MASK => {
                let lo = c.u8()?;
                if resume_pos.is_none() {
                    resume_pos = Some(c.pos());
                }
                n_pointers += 1;
                if n_pointers > NAME_MAX_POINTERS {
                    return Err(Error::Parse);
                }
                let target = (((l & !POINTER_MASK) as usize) << 8) | lo as usize;
                if target >= c.pos() - 2 {
                    // pointers must refer to an earlier occurrence
                    return Err(Error::Parse);
                }
                c.set_pos(target);
            }
            l if l & POINTER_MASK != 0 => return Err(Error::Parse),
            l => {
                let label = c.slice(l as usize)?;
                if out.bytes.remaining_capacity() < label.len() + 2 {
                    return Err(Error::Parse);
                }
                out.bytes.push(l);
                out.bytes.try_extend_from_slice(label).ok();
            }
        }
    }

    out.bytes.try_push(0).map_err(|_| Error::Parse)?;
    if let Some(pos) = resume_pos {
        c.set_pos(pos);
    }
    Ok(out)
}

/// Advances the cursor past a possibly compressed name without decoding it.
pub(crate) fn skip_name(c: &mut Cursor<'_>) -> Result<()> {
    loop {
        let len = c.u8()?;
        match len {
            0 => return Ok(()),
            l if l & POINTER_MASK == POINTER_MASK => {
                c.u8()?;
                return Ok(());
            }
            l if l & POINTER_MASK != 0 => return Err(Error::Parse),
            l => c.skip(l as usize)?,
        }
    }
}

impl Display for NameBuf {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_dotted())
    }
}
