//! Query response projections.
//!
//! A response is a read-only view over one or more received messages
//! (the main response plus retained sibling responses). Views are valid
//! only inside the completion callback; the underlying messages are
//! released when it returns.

use crate::{
    client::QueryKind,
    constants::TXT_DATA_MAX_SIZE,
    message::{RecordIter, RecordRef, RrClass, RrType, Sections},
    names::{LabelString, NameBuf, NameString},
    Error, Result,
};
use arrayvec::ArrayVec;
use std::net::Ipv6Addr;

#[cfg(feature = "nat64")]
use crate::client::Nat64Prefix;

/// One received message with its section table.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Part<'a> {
    pub msg: &'a [u8],
    pub sections: Sections,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Section {
    Answer,
    Additional,
}

impl<'a> Part<'a> {
    fn records(&self, section: Section) -> RecordIter<'a> {
        let (offset, count) = match section {
            Section::Answer => (self.sections.answer_offset, self.sections.answer_count),
            Section::Additional => (
                self.sections.additional_offset,
                self.sections.additional_count,
            ),
        };
        RecordIter::new(self.msg, offset, count)
    }
}

/// Follows CNAME records in the answer section that rewrite `name`,
/// returning the final owner name and the number of rewrites.
pub(crate) fn chase_alias(part: &Part<'_>, name: &NameBuf) -> Result<(NameBuf, u16)> {
    let mut name = name.clone();
    let mut changes = 0u16;

    for rec in part.records(Section::Answer) {
        let rec = rec?;
        if rec.rclass != RrClass::IN || rec.rtype != RrType::CNAME {
            continue;
        }
        if rec.owner_is(&name)? {
            name = rec.rdata_name()?;
            changes += 1;
        }
    }

    Ok((name, changes))
}

/// Number of answer-section records of `rtype` owned by `name`.
pub(crate) fn count_answer_records(
    part: &Part<'_>,
    name: &NameBuf,
    rtype: RrType,
) -> Result<u16> {
    let mut count = 0;
    for rec in part.records(Section::Answer) {
        let rec = rec?;
        if rec.rclass == RrClass::IN && rec.rtype == rtype && rec.owner_is(name)? {
            count += 1;
        }
    }
    Ok(count)
}

/// Checks whether an IPv6 address response calls for NAT64 synthesis:
/// no AAAA anywhere for the (aliased) name, but at least one A record in
/// the additional section.
#[cfg(feature = "nat64")]
pub(crate) fn requires_nat64(part: &Part<'_>, name: &NameBuf) -> Result<bool> {
    let (target, _) = chase_alias(part, name)?;

    if count_answer_records(part, &target, RrType::AAAA)? != 0 {
        return Ok(false);
    }
    for rec in part.records(Section::Additional) {
        let rec = rec?;
        if rec.rclass == RrClass::IN && rec.rtype == RrType::A && rec.owner_is(&target)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Locates the SRV record for `instance` in this part and returns its
/// target host name.
pub(crate) fn find_srv_target(part: &Part<'_>, instance: &NameBuf) -> Result<Option<NameBuf>> {
    let (target, _) = chase_alias(part, instance)?;

    for section in [Section::Answer, Section::Additional] {
        for rec in part.records(section) {
            let rec = rec?;
            if rec.rclass != RrClass::IN || rec.rtype != RrType::SRV {
                continue;
            }
            if rec.owner_is(&target)? {
                let mut c = rec.rdata_cursor();
                c.skip(6)?; // priority, weight, port
                return Ok(Some(crate::names::read_name(&mut c)?));
            }
        }
    }
    Ok(None)
}

/// Whether this part carries an AAAA record for `host` in its answer or
/// additional section.
pub(crate) fn has_host_address(part: &Part<'_>, host: &NameBuf) -> Result<bool> {
    let (target, _) = chase_alias(part, host)?;

    for section in [Section::Answer, Section::Additional] {
        for rec in part.records(section) {
            let rec = rec?;
            if rec.rclass == RrClass::IN && rec.rtype == RrType::AAAA && rec.owner_is(&target)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Service instance information projected from a response.
#[derive(Clone, Debug)]
pub struct ServiceInfo {
    /// TTL of the SRV record.
    pub ttl: u32,
    /// SRV priority.
    pub priority: u16,
    /// SRV weight.
    pub weight: u16,
    /// SRV port.
    pub port: u16,
    /// SRV target host name, dotted form.
    pub host_name: NameString,
    /// First IPv6 address of the target host, or the unspecified
    /// address when the response carries none.
    pub host_address: Ipv6Addr,
    /// TTL of the host address record, zero when absent.
    pub host_address_ttl: u32,
    /// Raw TXT record data, empty when the response carries none.
    pub txt_data: ArrayVec<u8, TXT_DATA_MAX_SIZE>,
    /// TTL of the TXT record, zero when absent.
    pub txt_ttl: u32,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        ServiceInfo {
            ttl: 0,
            priority: 0,
            weight: 0,
            port: 0,
            host_name: NameString::new(),
            host_address: Ipv6Addr::UNSPECIFIED,
            host_address_ttl: 0,
            txt_data: ArrayVec::new(),
            txt_ttl: 0,
        }
    }
}

/// The section a record was found in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecordSection {
    /// The answer section.
    Answer,
    /// The authority section.
    Authority,
    /// The additional records section.
    Additional,
}

/// Information about one record of an arbitrary record query response.
#[derive(Clone, Debug)]
pub struct RecordInfo {
    /// The section the record came from.
    pub section: RecordSection,
    /// Record owner name, dotted form.
    pub name: NameString,
    /// Record type.
    pub rr_type: RrType,
    /// Record class.
    pub rr_class: RrClass,
    /// Record time-to-live.
    pub ttl: u32,
    /// Length of the full record data. For record types whose data is a
    /// compressed domain name (PTR, CNAME, DNAME, NS, SRV) this is the
    /// decompressed length.
    pub record_length: u16,
    /// Number of bytes actually copied into the caller's buffer.
    pub data_length: u16,
}

/// The shared projection core behind the typed response views.
#[derive(Debug)]
pub(crate) struct Response<'a> {
    pub kind: QueryKind,
    /// The main query's QNAME.
    pub name: &'a NameBuf,
    /// Main response first, then retained sibling responses in chain
    /// order.
    pub parts: ArrayVec<Part<'a>, 3>,
    #[cfg(feature = "nat64")]
    pub nat64_prefix: Option<Nat64Prefix>,
}

impl<'a> Response<'a> {
    fn query_name(&self) -> NameString {
        self.name.to_dotted()
    }

    /// The Nth address record for `host`. AAAA address queries read the
    /// answer section only; browse/service host lookups read answer then
    /// additional. IPv4 kinds synthesize via the NAT64 prefix.
    fn find_address(
        &self,
        host: &NameBuf,
        index: u16,
        additional_too: bool,
    ) -> Result<(Ipv6Addr, u32)> {
        #[cfg(feature = "nat64")]
        let want_a = self.kind == QueryKind::Ip4Address;
        #[cfg(not(feature = "nat64"))]
        let want_a = false;

        let rtype = if want_a { RrType::A } else { RrType::AAAA };
        let mut n = 0u16;

        for part in &self.parts {
            let (target, _) = chase_alias(part, host)?;

            let sections: &[Section] = if additional_too {
                &[Section::Answer, Section::Additional]
            } else {
                &[Section::Answer]
            };

            for &section in sections {
                for rec in part.records(section) {
                    let rec = rec?;
                    if rec.rclass != RrClass::IN
                        || rec.rtype != rtype
                        || !rec.owner_is(&target)?
                    {
                        continue;
                    }
                    if n == index {
                        return Ok((self.record_address(&rec)?, rec.ttl));
                    }
                    n += 1;
                }
            }
        }

        Err(Error::NotFound)
    }

    fn record_address(&self, rec: &RecordRef<'_>) -> Result<Ipv6Addr> {
        let rdata = rec.rdata()?;
        match rec.rtype {
            RrType::AAAA => {
                let octets: [u8; 16] = rdata.try_into().map_err(|_| Error::Parse)?;
                Ok(Ipv6Addr::from(octets))
            }
            #[cfg(feature = "nat64")]
            RrType::A => {
                let v4: [u8; 4] = rdata.try_into().map_err(|_| Error::Parse)?;
                let prefix = self
                    .nat64_prefix
                    .ok_or(Error::InvalidState("no NAT64 prefix"))?;
                Ok(prefix.synthesize(v4))
            }
            _ => Err(Error::Parse),
        }
    }

    /// The Nth service instance label of a browse response.
    fn service_instance(&self, index: u16) -> Result<LabelString> {
        let mut n = 0u16;
        for part in &self.parts {
            for rec in part.records(Section::Answer) {
                let rec = rec?;
                if rec.rclass != RrClass::IN
                    || rec.rtype != RrType::PTR
                    || !rec.owner_is(self.name)?
                {
                    continue;
                }
                if n == index {
                    return rec.rdata_name()?.first_label();
                }
                n += 1;
            }
        }
        Err(Error::NotFound)
    }

    /// Reads SRV, TXT and host-address data for the given instance name.
    fn service_info(&self, instance: &NameBuf) -> Result<ServiceInfo> {
        let mut info = ServiceInfo::default();
        let mut srv_found = false;
        let mut txt_found = false;

        for part in &self.parts {
            let (target, _) = chase_alias(part, instance)?;

            for section in [Section::Answer, Section::Additional] {
                for rec in part.records(section) {
                    let rec = rec?;
                    if rec.rclass != RrClass::IN {
                        continue;
                    }
                    if !srv_found && rec.rtype == RrType::SRV && rec.owner_is(&target)? {
                        let mut c = rec.rdata_cursor();
                        info.priority = c.u16_be()?;
                        info.weight = c.u16_be()?;
                        info.port = c.u16_be()?;
                        info.host_name = crate::names::read_name(&mut c)?.to_dotted();
                        info.ttl = rec.ttl;
                        srv_found = true;
                    } else if !txt_found && rec.rtype == RrType::TXT && rec.owner_is(&target)? {
                        let rdata = rec.rdata()?;
                        info.txt_data
                            .try_extend_from_slice(rdata)
                            .map_err(|_| Error::NoBufs)?;
                        info.txt_ttl = rec.ttl;
                        txt_found = true;
                    }
                }
            }
        }

        if !srv_found && !txt_found {
            return Err(Error::NotFound);
        }

        if srv_found && info.host_name.as_str() != "." {
            let host = NameBuf::encode(None, info.host_name.as_str())?;
            match self.find_address(&host, 0, true) {
                Ok((addr, ttl)) => {
                    info.host_address = addr;
                    info.host_address_ttl = ttl;
                }
                Err(Error::NotFound) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(info)
    }

    /// The Nth record across answer, authority and additional sections.
    fn record_info(&self, index: u16, data_buf: &mut [u8]) -> Result<RecordInfo> {
        let part = self.parts.first().ok_or(Error::NotFound)?;
        let s = &part.sections;

        let spans = [
            (RecordSection::Answer, s.answer_offset, s.answer_count),
            (RecordSection::Authority, s.authority_offset, s.authority_count),
            (
                RecordSection::Additional,
                s.additional_offset,
                s.additional_count,
            ),
        ];

        let mut n = 0u16;
        for (section, offset, count) in spans {
            for rec in RecordIter::new(part.msg, offset, count) {
                let rec = rec?;
                if n == index {
                    return self.read_record_info(section, &rec, data_buf);
                }
                n += 1;
            }
        }
        Err(Error::NotFound)
    }

    fn read_record_info(
        &self,
        section: RecordSection,
        rec: &RecordRef<'_>,
        data_buf: &mut [u8],
    ) -> Result<RecordInfo> {
        let mut info = RecordInfo {
            section,
            name: rec.owner()?.to_dotted(),
            rr_type: rec.rtype,
            rr_class: rec.rclass,
            ttl: rec.ttl,
            record_length: 0,
            data_length: 0,
        };

        if rec.rtype.rdata_is_name() {
            // decompress the embedded name into the caller's buffer
            let mut c = rec.rdata_cursor();
            let mut srv_fields = [0u8; 6];
            let mut fixed: &[u8] = &[];
            if rec.rtype == RrType::SRV {
                srv_fields.copy_from_slice(c.slice(6)?);
                fixed = &srv_fields;
            }
            let name = crate::names::read_name(&mut c)?;

            let total = fixed.len() + name.as_bytes().len();
            if data_buf.len() < total {
                return Err(Error::NoBufs);
            }
            data_buf[..fixed.len()].copy_from_slice(fixed);
            data_buf[fixed.len()..total].copy_from_slice(name.as_bytes());
            info.record_length = total as u16;
            info.data_length = total as u16;
        } else {
            let rdata = rec.rdata()?;
            let copied = rdata.len().min(data_buf.len());
            data_buf[..copied].copy_from_slice(&rdata[..copied]);
            info.record_length = rdata.len() as u16;
            info.data_length = copied as u16;
        }

        Ok(info)
    }
}

/// A response to an address resolution query.
///
/// For IPv4 resolution the addresses are returned as NAT64-synthesized
/// IPv6 addresses.
#[derive(Debug)]
pub struct AddressResponse<'a>(pub(crate) Response<'a>);

impl AddressResponse<'_> {
    /// The host name the query was issued for, dotted form.
    pub fn host_name(&self) -> NameString {
        self.0.query_name()
    }

    /// The address record at `index` and its TTL. [`Error::NotFound`]
    /// past the end of the list.
    pub fn address(&self, index: u16) -> Result<(Ipv6Addr, u32)> {
        self.0.find_address(self.0.name, index, false)
    }
}

/// A response to a browse (service instance enumeration) query.
#[derive(Debug)]
pub struct BrowseResponse<'a>(pub(crate) Response<'a>);

impl BrowseResponse<'_> {
    /// The service name the query was issued for, dotted form.
    pub fn service_name(&self) -> NameString {
        self.0.query_name()
    }

    /// The service instance label at `index`. [`Error::NotFound`] past
    /// the end of the list.
    pub fn service_instance(&self, index: u16) -> Result<LabelString> {
        self.0.service_instance(index)
    }

    /// SRV/TXT/address info for an enumerated instance, when the
    /// response carries it.
    pub fn service_info(&self, instance_label: &str) -> Result<ServiceInfo> {
        let instance = NameBuf::encode_with_suffix(instance_label, self.0.name)?;
        self.0.service_info(&instance)
    }

    /// The IPv6 address of `host_name` at `index`, searching answer and
    /// additional sections.
    pub fn host_address(&self, host_name: &str, index: u16) -> Result<(Ipv6Addr, u32)> {
        let host = NameBuf::encode(None, host_name)?;
        self.0.find_address(&host, index, true)
    }
}

/// A response to a service instance resolution query.
#[derive(Debug)]
pub struct ServiceResponse<'a>(pub(crate) Response<'a>);

impl ServiceResponse<'_> {
    /// The service instance label and the remaining service name the
    /// query was issued for.
    pub fn service_name(&self) -> Result<(LabelString, NameString)> {
        let (label, rest) = self.0.name.split_first()?;
        Ok((label, rest.to_dotted()))
    }

    /// SRV/TXT/address info for the resolved instance.
    ///
    /// When no TXT record is present `txt_data` is empty; when no
    /// address record is present `host_address` is unspecified.
    pub fn service_info(&self) -> Result<ServiceInfo> {
        self.0.service_info(self.0.name)
    }

    /// The IPv6 address of `host_name` at `index`, searching answer and
    /// additional sections.
    pub fn host_address(&self, host_name: &str, index: u16) -> Result<(Ipv6Addr, u32)> {
        let host = NameBuf::encode(None, host_name)?;
        self.0.find_address(&host, index, true)
    }
}

/// A response to an arbitrary record query.
#[derive(Debug)]
pub struct RecordResponse<'a>(pub(crate) Response<'a>);

impl RecordResponse<'_> {
    /// The name the query was issued for, dotted form.
    pub fn query_name(&self) -> NameString {
        self.0.query_name()
    }

    /// The record at `index` across the answer, authority and additional
    /// sections, in that order. Record data is copied into `data_buf`;
    /// for PTR, CNAME, DNAME, NS and SRV records the embedded name is
    /// decompressed first and must fit.
    pub fn record_info(&self, index: u16, data_buf: &mut [u8]) -> Result<RecordInfo> {
        self.0.record_info(index, data_buf)
    }
}
