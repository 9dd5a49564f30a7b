//! Live query state.

use crate::{
    client::{Callback, QueryConfig},
    constants::{MESSAGE_MAX_SIZE, QUERY_STORE_CAPACITY},
    message::RrType,
    names::NameBuf,
    Error, Result,
};
use arrayvec::ArrayVec;

/// A buffer holding one DNS message.
pub(crate) type MessageBuf = ArrayVec<u8, MESSAGE_MAX_SIZE>;

/// What a query resolves.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum QueryKind {
    /// IPv6 address resolution (AAAA).
    Ip6Address,
    /// IPv4 address resolution (A), answered as NAT64-synthesized IPv6.
    #[cfg(feature = "nat64")]
    Ip4Address,
    /// Service instance enumeration (PTR).
    Browse,
    /// Service instance resolution, SRV and TXT in one message.
    ServiceSrvTxt,
    /// Service instance resolution, SRV only.
    ServiceSrv,
    /// Service instance resolution, TXT only.
    ServiceTxt,
    /// Arbitrary record query.
    Record,
}

impl QueryKind {
    /// The question types the kind puts on the wire.
    pub fn question_types(self, record_type: RrType) -> ArrayVec<RrType, 2> {
        let mut qtypes = ArrayVec::new();
        match self {
            QueryKind::Ip6Address => qtypes.push(RrType::AAAA),
            #[cfg(feature = "nat64")]
            QueryKind::Ip4Address => qtypes.push(RrType::A),
            QueryKind::Browse => qtypes.push(RrType::PTR),
            QueryKind::ServiceSrvTxt => {
                qtypes.push(RrType::SRV);
                qtypes.push(RrType::TXT);
            }
            QueryKind::ServiceSrv => qtypes.push(RrType::SRV),
            QueryKind::ServiceTxt => qtypes.push(RrType::TXT),
            QueryKind::Record => qtypes.push(record_type),
        }
        qtypes
    }

    /// The record type terminal for this kind, used when deciding
    /// whether an aliased response carries an answer.
    pub fn terminal_type(self) -> Option<RrType> {
        match self {
            QueryKind::Ip6Address => Some(RrType::AAAA),
            #[cfg(feature = "nat64")]
            QueryKind::Ip4Address => Some(RrType::A),
            _ => None,
        }
    }
}

/// What a live query has produced so far.
#[derive(Debug, Default)]
pub(crate) enum SavedOutcome {
    /// Still waiting.
    #[default]
    Pending,
    /// A response message, retained until the whole group can finalize.
    Response(MessageBuf),
    /// A terminal error that does not fail the group by itself
    /// (a name error, or any failure of a host-address follow-up).
    Failed(Error),
}

impl SavedOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, SavedOutcome::Pending)
    }
}

/// A live query.
///
/// A query owns its encoded QNAME and, once a response arrives, the
/// retained response message. Queries belonging to one user request are
/// chained through `next_id`; the head of the chain (`main_id == id`)
/// carries the callback.
#[derive(Debug)]
pub(crate) struct Query {
    pub id: u16,
    pub kind: QueryKind,
    pub config: QueryConfig,
    /// Question type, `Record` kind only.
    pub record_type: RrType,
    /// Transmissions performed so far.
    pub tx_count: u8,
    /// Absolute deadline of the next retransmission, meaningful only
    /// while the query is awaiting a response.
    pub retransmit_at: u64,
    /// Awaiting a response (or a deferred sibling).
    pub awaiting: bool,
    /// Spawn an AAAA follow-up for the SRV target host if the service
    /// response does not carry one.
    pub should_resolve_host_addr: bool,
    /// This query is the spawned host-address follow-up of its group.
    pub is_host_follow_up: bool,
    /// Head of the sibling chain; equals `id` for the main query.
    pub main_id: u16,
    /// Next sibling in the chain.
    pub next_id: Option<u16>,
    /// CNAME rewrites performed across restarts.
    pub alias_changes: u16,
    pub outcome: SavedOutcome,
    /// Completion handler; main query only.
    pub callback: Option<Callback>,
    /// The QNAME in wire form.
    pub name: NameBuf,
    /// Re-drive this query over the TCP transport.
    #[cfg(feature = "tcp")]
    pub use_tcp: bool,
}

impl Query {
    pub(crate) fn new(id: u16, kind: QueryKind, config: QueryConfig, name: NameBuf) -> Query {
        Query {
            id,
            kind,
            config,
            record_type: RrType::default(),
            tx_count: 0,
            retransmit_at: u64::MAX,
            awaiting: false,
            should_resolve_host_addr: false,
            is_host_follow_up: false,
            main_id: id,
            next_id: None,
            alias_changes: 0,
            outcome: SavedOutcome::Pending,
            callback: None,
            name,
            #[cfg(feature = "tcp")]
            use_tcp: false,
        }
    }
}

/// The set of live queries.
///
/// Bounded: allocation past capacity fails with [`Error::NoBufs`]. Every
/// live query has a unique message id.
#[derive(Debug, Default)]
pub(crate) struct QueryStore {
    queries: ArrayVec<Query, QUERY_STORE_CAPACITY>,
}

impl QueryStore {
    pub fn insert(&mut self, query: Query) -> Result<()> {
        debug_assert!(!self.contains(query.id));
        self.queries.try_push(query).map_err(|_| Error::NoBufs)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: u16) -> Option<&Query> {
        self.queries.iter().find(|q| q.id == id)
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut Query> {
        self.queries.iter_mut().find(|q| q.id == id)
    }

    pub fn remove(&mut self, id: u16) -> Option<Query> {
        let pos = self.queries.iter().position(|q| q.id == id)?;
        Some(self.queries.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// The ids of a sibling group in chain order, main query first.
    /// Only live queries are listed.
    pub fn group_ids(&self, main_id: u16) -> ArrayVec<u16, 3> {
        let mut ids = ArrayVec::new();
        let mut next = Some(main_id);
        while let Some(id) = next {
            let Some(q) = self.get(id) else { break };
            if ids.try_push(id).is_err() {
                break;
            }
            next = q.next_id;
        }
        ids
    }

    /// Appends `sibling_id` to the end of the group chain.
    pub fn link_sibling(&mut self, main_id: u16, sibling_id: u16) {
        let mut id = main_id;
        loop {
            match self.get(id).and_then(|q| q.next_id) {
                Some(next) => id = next,
                None => break,
            }
        }
        if let Some(q) = self.get_mut(id) {
            q.next_id = Some(sibling_id);
        }
    }
}
