//! The resolver engine.
//!
//! [`Client`] issues DNS queries against a configured recursive server
//! and delivers typed results through completion callbacks. The engine
//! is single-threaded and non-blocking: every state transition happens
//! inside an API call, a timer fire, or a receive handler, all driven by
//! the embedder's event loop through the [`Platform`] seam.

mod config;
pub use config::*;

mod platform;
pub use platform::*;

mod response;
pub use response::{
    AddressResponse, BrowseResponse, RecordInfo, RecordResponse, RecordSection, ServiceInfo,
    ServiceResponse,
};

mod query;
mod servers;

#[cfg(feature = "tcp")]
mod tcp;


use crate::{
    bytes::Cursor,
    constants::{MAX_ALIAS_NAME_CHANGES, MESSAGE_MAX_SIZE, UDP_MESSAGE_MAX_SIZE},
    message::{Header, QueryWriter, RCode, RrType, Sections},
    names::NameBuf,
    Error, Result,
};
use query::{MessageBuf, Query, QueryKind, QueryStore, SavedOutcome};
use response::{chase_alias, count_answer_records, Part, Response};
use servers::LimitedServers;

#[cfg(feature = "nat64")]
use response::requires_nat64;

use std::net::SocketAddrV6;

/// Completion callback of an address resolution query.
pub type AddressCallback = Box<dyn FnMut(Result<AddressResponse<'_>>)>;

/// Completion callback of a browse query.
pub type BrowseCallback = Box<dyn FnMut(Result<BrowseResponse<'_>>)>;

/// Completion callback of a service instance resolution query.
pub type ServiceCallback = Box<dyn FnMut(Result<ServiceResponse<'_>>)>;

/// Completion callback of an arbitrary record query.
pub type RecordCallback = Box<dyn FnMut(Result<RecordResponse<'_>>)>;

/// A completion handler, tagged by the query kind it belongs to.
pub(crate) enum Callback {
    Address(AddressCallback),
    Browse(BrowseCallback),
    Service(ServiceCallback),
    Record(RecordCallback),
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Callback::Address(_) => "AddressCallback",
            Callback::Browse(_) => "BrowseCallback",
            Callback::Service(_) => "ServiceCallback",
            Callback::Record(_) => "RecordCallback",
        })
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "tcp")] {
        /// The platform services [`Client`] requires.
        ///
        /// With the `tcp` feature enabled this covers [`TcpPlatform`];
        /// otherwise [`Platform`] alone suffices. Implemented
        /// automatically.
        pub trait ClientPlatform: TcpPlatform {}
        impl<T: TcpPlatform> ClientPlatform for T {}
    } else {
        /// The platform services [`Client`] requires.
        ///
        /// With the `tcp` feature enabled this covers `TcpPlatform`;
        /// otherwise [`Platform`] alone suffices. Implemented
        /// automatically.
        pub trait ClientPlatform: Platform {}
        impl<T: Platform> ClientPlatform for T {}
    }
}

/// Arguments of a query being started.
struct StartInfo<'a> {
    kind: QueryKind,
    second_kind: Option<QueryKind>,
    config: QueryConfig,
    callback: Callback,
    label: Option<&'a str>,
    name: &'a str,
    record_type: RrType,
    resolve_host_addr: bool,
}

/// A DNS stub resolver client.
///
/// Instances are independent; each owns its query store, timer deadline
/// and transport endpoints through its platform.
pub struct Client<P: ClientPlatform> {
    platform: P,
    store: QueryStore,
    default_config: QueryConfig,
    user_set_default_address: bool,
    limited_servers: LimitedServers,
    started: bool,
    #[cfg(feature = "tcp")]
    tcp: tcp::TcpEndpoint,
}

impl<P: ClientPlatform> Client<P> {
    /// Creates a client over the given platform.
    pub fn new(platform: P) -> Client<P> {
        let mut client = Client {
            platform,
            store: QueryStore::default(),
            default_config: QueryConfig::built_in(),
            user_set_default_address: false,
            limited_servers: LimitedServers::default(),
            started: false,
            #[cfg(feature = "tcp")]
            tcp: tcp::TcpEndpoint::default(),
        };
        client.refresh_default_server_address();
        client
    }

    /// Starts the client, binding the UDP socket to an ephemeral port.
    ///
    /// Returns [`Error::Already`] if the client is already started.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::Already);
        }
        self.platform.udp_bind()?;
        self.started = true;
        self.refresh_default_server_address();
        tracing::debug!("dns client started");
        Ok(())
    }

    /// Stops the client.
    ///
    /// Every live query is finalized with [`Error::Aborted`], the
    /// sockets are closed and the timer is cancelled. No callback fires
    /// after `stop` returns.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;

        loop {
            let next = self.store.iter().next().map(|q| (q.id, q.main_id));
            let Some((id, main_id)) = next else { break };
            self.finalize_group(main_id, Some(Error::Aborted));
            // a query orphaned from its group cannot recur
            self.store.remove(id);
        }

        self.platform.udp_close();
        self.platform.cancel_timer();
        #[cfg(feature = "tcp")]
        {
            self.platform.tcp_close();
            self.tcp.reset();
        }
        tracing::debug!("dns client stopped");
    }

    /// The current default query config.
    pub fn default_config(&self) -> &QueryConfig {
        &self.default_config
    }

    /// Sets the default query config. Unspecified fields are filled from
    /// the build-time defaults, so the stored default is always concrete.
    pub fn set_default_config(&mut self, config: &QueryConfig) {
        self.user_set_default_address = !config.server_sock_addr.ip().is_unspecified();
        self.default_config = config.merged_with(&QueryConfig::built_in());
        self.refresh_default_server_address();
    }

    /// Resets the default query config to the build-time defaults,
    /// dropping any user-pinned server address.
    pub fn reset_default_config(&mut self) {
        self.default_config = QueryConfig::built_in();
        self.user_set_default_address = false;
        self.refresh_default_server_address();
    }

    /// Sends an AAAA address resolution query for `host_name`.
    ///
    /// On success the query completes asynchronously through `callback`,
    /// exactly once.
    pub fn resolve_address(
        &mut self,
        host_name: &str,
        callback: AddressCallback,
        config: Option<&QueryConfig>,
    ) -> Result<()> {
        let config = self.effective_config(config)?;
        self.start_query(StartInfo {
            kind: QueryKind::Ip6Address,
            second_kind: None,
            config,
            callback: Callback::Address(callback),
            label: None,
            name: host_name,
            record_type: RrType::default(),
            resolve_host_addr: false,
        })
    }

    /// Sends an A address resolution query for `host_name`. Responses
    /// are delivered as IPv6 addresses synthesized via the NAT64 prefix.
    ///
    /// Fails with [`Error::InvalidState`] when no NAT64 prefix is known.
    #[cfg(feature = "nat64")]
    #[cfg_attr(docsrs, doc(cfg(feature = "nat64")))]
    pub fn resolve_ip4_address(
        &mut self,
        host_name: &str,
        callback: AddressCallback,
        config: Option<&QueryConfig>,
    ) -> Result<()> {
        let config = self.effective_config(config)?;
        if config.nat64_mode != Nat64Mode::Allow {
            return Err(Error::InvalidArgs("NAT64 disallowed by config"));
        }
        if self.platform.nat64_prefix().is_none() {
            return Err(Error::InvalidState("no NAT64 prefix"));
        }
        self.start_query(StartInfo {
            kind: QueryKind::Ip4Address,
            second_kind: None,
            config,
            callback: Callback::Address(callback),
            label: None,
            name: host_name,
            record_type: RrType::default(),
            resolve_host_addr: false,
        })
    }

    /// Sends a browse (service instance enumeration) query for
    /// `service_name`.
    pub fn browse(
        &mut self,
        service_name: &str,
        callback: BrowseCallback,
        config: Option<&QueryConfig>,
    ) -> Result<()> {
        let config = self.effective_config(config)?;
        self.start_query(StartInfo {
            kind: QueryKind::Browse,
            second_kind: None,
            config,
            callback: Callback::Browse(callback),
            label: None,
            name: service_name,
            record_type: RrType::default(),
            resolve_host_addr: false,
        })
    }

    /// Starts a service instance resolution for
    /// `instance_label`.`service_name`.
    pub fn resolve_service(
        &mut self,
        instance_label: &str,
        service_name: &str,
        callback: ServiceCallback,
        config: Option<&QueryConfig>,
    ) -> Result<()> {
        self.resolve(instance_label, service_name, callback, config, false)
    }

    /// Starts a service instance resolution for
    /// `instance_label`.`service_name`, following up with a host address
    /// query when the service response does not carry an address for the
    /// SRV target host. The callback fires once, after the follow-up
    /// completes.
    pub fn resolve_service_and_host_address(
        &mut self,
        instance_label: &str,
        service_name: &str,
        callback: ServiceCallback,
        config: Option<&QueryConfig>,
    ) -> Result<()> {
        self.resolve(instance_label, service_name, callback, config, true)
    }

    /// Sends a query for an arbitrary record type. `first_label`, when
    /// given, is prepended to `name` as a single label.
    pub fn query_record(
        &mut self,
        record_type: RrType,
        first_label: Option<&str>,
        name: &str,
        callback: RecordCallback,
        config: Option<&QueryConfig>,
    ) -> Result<()> {
        let config = self.effective_config(config)?;
        self.start_query(StartInfo {
            kind: QueryKind::Record,
            second_kind: None,
            config,
            callback: Callback::Record(callback),
            label: first_label,
            name,
            record_type,
            resolve_host_addr: false,
        })
    }

    fn resolve(
        &mut self,
        instance_label: &str,
        service_name: &str,
        callback: ServiceCallback,
        config: Option<&QueryConfig>,
        resolve_host_addr: bool,
    ) -> Result<()> {
        let config = self.effective_config(config)?;

        let limited = self
            .limited_servers
            .is_limited(config.server_sock_addr.ip());
        let (kind, second_kind) = match config.service_mode {
            ServiceMode::Srv => (QueryKind::ServiceSrv, None),
            ServiceMode::Txt => {
                if resolve_host_addr {
                    return Err(Error::InvalidArgs(
                        "TXT-only service mode cannot resolve host address",
                    ));
                }
                (QueryKind::ServiceTxt, None)
            }
            ServiceMode::SrvTxt | ServiceMode::SrvTxtOptimize if limited => {
                (QueryKind::ServiceSrv, Some(QueryKind::ServiceTxt))
            }
            ServiceMode::SrvTxt | ServiceMode::SrvTxtOptimize => (QueryKind::ServiceSrvTxt, None),
            ServiceMode::SrvTxtSeparate => (QueryKind::ServiceSrv, Some(QueryKind::ServiceTxt)),
            ServiceMode::Unspecified => {
                return Err(Error::InvalidArgs("unspecified service mode"))
            }
        };

        self.start_query(StartInfo {
            kind,
            second_kind,
            config,
            callback: Callback::Service(callback),
            label: Some(instance_label),
            name: service_name,
            record_type: RrType::default(),
            resolve_host_addr,
        })
    }

    /// Handles a datagram received on the client's UDP socket.
    pub fn handle_udp_receive(&mut self, msg: &[u8], from: &SocketAddrV6) {
        if !self.started {
            return;
        }

        let mut c = Cursor::new(msg);
        let Ok(header) = Header::read(&mut c) else {
            return;
        };
        if !header.flags.response() || header.flags.opcode() != 0 {
            tracing::trace!("dropping non-response message from {from}");
            return;
        }
        if !self.store.contains(header.id) {
            tracing::trace!("dropping response with unknown id {:#06x} from {from}", header.id);
            return;
        }

        #[cfg(feature = "tcp")]
        if header.flags.truncated() {
            tracing::debug!("response {:#06x} truncated, retrying over TCP", header.id);
            let id = header.id;
            let main_id = self.store.get(id).map_or(id, |q| q.main_id);
            if let Some(q) = self.store.get_mut(id) {
                q.use_tcp = true;
                q.tx_count = 0;
            }
            if let Err(e) = self.send_query(id) {
                self.finalize_group(main_id, Some(e));
            }
            self.reschedule_timer();
            return;
        }

        self.process_response(&header, msg);
        self.reschedule_timer();
    }

    /// Handles a fire of the retransmission timer armed through
    /// [`Platform::arm_timer`].
    pub fn handle_timer(&mut self) {
        if !self.started {
            return;
        }
        let now = self.platform.now_ms();

        loop {
            let due = self
                .store
                .iter()
                .find(|q| q.awaiting && q.retransmit_at <= now)
                .map(|q| {
                    (
                        q.id,
                        q.main_id,
                        q.tx_count,
                        q.config.max_tx_attempts,
                        q.is_host_follow_up,
                    )
                });
            let Some((id, main_id, tx_count, max_attempts, follow_up)) = due else {
                break;
            };

            if tx_count < max_attempts {
                tracing::debug!("query {id:#06x} timed out, retransmitting");
                if let Err(e) = self.send_query(id) {
                    self.fail_query(id, main_id, follow_up, e);
                }
            } else {
                tracing::debug!("query {id:#06x} exhausted {max_attempts} attempts");
                self.fail_query(id, main_id, follow_up, Error::ResponseTimeout);
            }
        }

        self.reschedule_timer();
    }

    //
    // ------------------------------------------------------------------------------------------------
    //

    fn effective_config(&self, config: Option<&QueryConfig>) -> Result<QueryConfig> {
        if !self.started {
            return Err(Error::InvalidState("client not started"));
        }
        let merged = match config {
            Some(c) => c.merged_with(&self.default_config),
            None => self.default_config,
        };
        #[cfg(not(feature = "tcp"))]
        if merged.transport == Transport::Tcp {
            return Err(Error::InvalidArgs("TCP transport not enabled"));
        }
        Ok(merged)
    }

    fn refresh_default_server_address(&mut self) {
        if self.user_set_default_address {
            return;
        }
        if let Some(server) = self.platform.preferred_server() {
            self.default_config.server_sock_addr = server;
        }
    }

    fn new_message_id(&self) -> u16 {
        loop {
            let id = rand::random::<u16>();
            if !self.store.contains(id) {
                return id;
            }
        }
    }

    fn start_query(&mut self, info: StartInfo<'_>) -> Result<()> {
        let name = NameBuf::encode(info.label, info.name)?;

        let main_id = self.new_message_id();
        let mut main = Query::new(main_id, info.kind, info.config, name.clone());
        main.record_type = info.record_type;
        main.should_resolve_host_addr = info.resolve_host_addr;
        main.callback = Some(info.callback);
        self.store.insert(main)?;

        if let Some(second_kind) = info.second_kind {
            let sibling_id = self.new_message_id();
            let mut sibling = Query::new(sibling_id, second_kind, info.config, name);
            sibling.main_id = main_id;
            if let Err(e) = self.store.insert(sibling) {
                self.store.remove(main_id);
                return Err(e);
            }
            self.store.link_sibling(main_id, sibling_id);
        }

        let ids = self.store.group_ids(main_id);
        for &id in &ids {
            if let Err(e) = self.send_query(id) {
                for &gone in &ids {
                    self.store.remove(gone);
                }
                self.reschedule_timer();
                return Err(e);
            }
        }
        self.reschedule_timer();
        Ok(())
    }

    fn send_query(&mut self, id: u16) -> Result<()> {
        let now = self.platform.now_ms();
        let (kind, record_type, config, name) = match self.store.get(id) {
            Some(q) => (q.kind, q.record_type, q.config, q.name.clone()),
            None => return Ok(()),
        };

        let mut buf = [0u8; MESSAGE_MAX_SIZE];
        let qtypes = kind.question_types(record_type);
        let len = QueryWriter::new(&mut buf[..]).write(
            id,
            config.recursion_flag == RecursionFlag::Desired,
            &name,
            &qtypes,
        )?;

        #[cfg(feature = "tcp")]
        {
            let use_tcp = self.store.get(id).is_some_and(|q| q.use_tcp)
                || config.transport == Transport::Tcp
                || len > UDP_MESSAGE_MAX_SIZE;
            if use_tcp {
                self.tcp_send_message(&config.server_sock_addr, &buf[..len])?;
                if let Some(q) = self.store.get_mut(id) {
                    q.use_tcp = true;
                }
            } else {
                self.platform.udp_send(&config.server_sock_addr, &buf[..len])?;
            }
        }
        #[cfg(not(feature = "tcp"))]
        {
            if len > UDP_MESSAGE_MAX_SIZE {
                return Err(Error::NoBufs);
            }
            self.platform.udp_send(&config.server_sock_addr, &buf[..len])?;
        }

        if let Some(q) = self.store.get_mut(id) {
            q.tx_count += 1;
            q.awaiting = true;
            q.retransmit_at = now + config.response_timeout_ms as u64;
        }
        tracing::debug!(
            "sent query {id:#06x} ({} questions) to {}",
            qtypes.len(),
            config.server_sock_addr
        );
        Ok(())
    }

    fn process_response(&mut self, header: &Header, msg: &[u8]) {
        let id = header.id;
        let (kind, main_id, follow_up, config) = match self.store.get(id) {
            Some(q) => (q.kind, q.main_id, q.is_host_follow_up, q.config),
            None => return,
        };

        if let Some(error) = RCode::query_error(header.flags.response_code()) {
            tracing::debug!(
                "query {id:#06x} answered with rcode {}: {error}",
                header.flags.response_code()
            );

            if error == Error::FailedResponse(RCode::FormErr as u8)
                && kind == QueryKind::ServiceSrvTxt
            {
                self.limited_servers
                    .note_limited(*config.server_sock_addr.ip());
                if config.service_mode == ServiceMode::SrvTxtOptimize
                    && self.replace_with_separate_srv_txt(id).is_ok()
                {
                    return;
                }
            }

            match error {
                Error::NotFound => {
                    self.record_outcome(id, SavedOutcome::Failed(Error::NotFound));
                    self.maybe_finalize(main_id);
                }
                e => self.fail_query(id, main_id, follow_up, e),
            }
            return;
        }

        if let Err(e) = self.process_success(id, main_id, kind, &config, msg) {
            if e == Error::Parse
                && kind == QueryKind::ServiceSrvTxt
                && config.service_mode == ServiceMode::SrvTxtOptimize
            {
                self.limited_servers
                    .note_limited(*config.server_sock_addr.ip());
                if self.replace_with_separate_srv_txt(id).is_ok() {
                    return;
                }
            }
            self.fail_query(id, main_id, follow_up, e);
        }
    }

    fn process_success(
        &mut self,
        id: u16,
        main_id: u16,
        kind: QueryKind,
        config: &QueryConfig,
        msg: &[u8],
    ) -> Result<()> {
        let (_, sections) = Sections::populate(msg)?;
        let part = Part { msg, sections };

        if kind == QueryKind::ServiceSrvTxt {
            self.limited_servers
                .note_capable(config.server_sock_addr.ip());
        }

        let (name, alias_changes) = match self.store.get(id) {
            Some(q) => (q.name.clone(), q.alias_changes),
            None => return Ok(()),
        };

        if self.nat64_needed(kind, config, &part, &name)? {
            if let Some(q) = self.store.get_mut(id) {
                #[cfg(feature = "nat64")]
                {
                    q.kind = QueryKind::Ip4Address;
                }
                q.tx_count = 0;
            }
            tracing::debug!("query {id:#06x} has no AAAA records, switching to IPv4 resolution");
            return self.send_query(id);
        }

        if let Some(terminal) = kind.terminal_type() {
            let (aliased, changes) = chase_alias(&part, &name)?;
            if changes > 0 {
                let total = alias_changes.saturating_add(changes);
                if total > MAX_ALIAS_NAME_CHANGES {
                    return Err(Error::Parse);
                }
                if let Some(q) = self.store.get_mut(id) {
                    q.alias_changes = total;
                }

                if count_answer_records(&part, &aliased, terminal)? == 0 {
                    // no terminal record for the rewritten owner,
                    // restart under the alias with the same id
                    if let Some(q) = self.store.get_mut(id) {
                        q.name = aliased;
                        q.tx_count = 0;
                    }
                    tracing::debug!("query {id:#06x} follows a name alias, restarting");
                    return self.send_query(id);
                }
            }
        }

        let mut saved = MessageBuf::new();
        saved
            .try_extend_from_slice(msg)
            .map_err(|_| Error::Parse)?;
        self.record_outcome(id, SavedOutcome::Response(saved));

        if matches!(kind, QueryKind::ServiceSrvTxt | QueryKind::ServiceSrv) {
            self.resolve_host_address_if_needed(main_id, &part);
        }
        self.maybe_finalize(main_id);
        Ok(())
    }

    #[cfg(feature = "nat64")]
    fn nat64_needed(
        &self,
        kind: QueryKind,
        config: &QueryConfig,
        part: &Part<'_>,
        name: &NameBuf,
    ) -> Result<bool> {
        Ok(kind == QueryKind::Ip6Address
            && config.nat64_mode == Nat64Mode::Allow
            && self.platform.nat64_prefix().is_some()
            && requires_nat64(part, name)?)
    }

    #[cfg(not(feature = "nat64"))]
    fn nat64_needed(
        &self,
        _kind: QueryKind,
        _config: &QueryConfig,
        _part: &Part<'_>,
        _name: &NameBuf,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Spawns an AAAA follow-up for the SRV target host when the group
    /// asked for it and this response does not carry the address.
    fn resolve_host_address_if_needed(&mut self, main_id: u16, part: &Part<'_>) {
        let (should, name, config) = match self.store.get(main_id) {
            Some(m) => (m.should_resolve_host_addr, m.name.clone(), m.config),
            None => return,
        };
        if !should {
            return;
        }
        let has_follow_up = self
            .store
            .group_ids(main_id)
            .iter()
            .any(|&gid| self.store.get(gid).is_some_and(|q| q.is_host_follow_up));
        if has_follow_up {
            return;
        }

        let Ok(Some(host)) = response::find_srv_target(part, &name) else {
            return;
        };
        match response::has_host_address(part, &host) {
            Ok(false) => {}
            _ => return,
        }

        let id = self.new_message_id();
        let mut follow_up = Query::new(id, QueryKind::Ip6Address, config, host);
        follow_up.main_id = main_id;
        follow_up.is_host_follow_up = true;
        if self.store.insert(follow_up).is_err() {
            // no room; the group finalizes without a host address
            return;
        }
        self.store.link_sibling(main_id, id);
        tracing::debug!("spawning host address follow-up {id:#06x} for group {main_id:#06x}");
        if let Err(e) = self.send_query(id) {
            self.record_outcome(id, SavedOutcome::Failed(e));
        }
    }

    /// Converts an in-flight two-question SRV+TXT query into a pair of
    /// separate SRV and TXT sibling queries, preserving the callback.
    fn replace_with_separate_srv_txt(&mut self, id: u16) -> Result<()> {
        let (config, name) = match self.store.get(id) {
            Some(q) => (q.config, q.name.clone()),
            None => return Err(Error::InvalidState("unknown query")),
        };

        if let Some(q) = self.store.get_mut(id) {
            q.kind = QueryKind::ServiceSrv;
            q.tx_count = 0;
            q.awaiting = false;
        }

        let sibling_id = self.new_message_id();
        let mut sibling = Query::new(sibling_id, QueryKind::ServiceTxt, config, name);
        sibling.main_id = id;
        self.store.insert(sibling)?;
        self.store.link_sibling(id, sibling_id);

        self.send_query(id)?;
        self.send_query(sibling_id)?;
        self.reschedule_timer();
        tracing::debug!("query {id:#06x} split into separate SRV and TXT queries");
        Ok(())
    }

    fn record_outcome(&mut self, id: u16, outcome: SavedOutcome) {
        if let Some(q) = self.store.get_mut(id) {
            q.outcome = outcome;
            q.awaiting = false;
            q.retransmit_at = u64::MAX;
        }
    }

    /// Records a terminal failure: follow-up failures degrade to a
    /// successful group response without a host address, anything else
    /// fails the whole group.
    fn fail_query(&mut self, id: u16, main_id: u16, follow_up: bool, error: Error) {
        if follow_up {
            self.record_outcome(id, SavedOutcome::Failed(error));
            self.maybe_finalize(main_id);
        } else {
            self.finalize_group(main_id, Some(error));
        }
    }

    fn maybe_finalize(&mut self, main_id: u16) {
        let all_done = self
            .store
            .group_ids(main_id)
            .iter()
            .all(|&id| self.store.get(id).is_some_and(|q| !q.outcome.is_pending()));
        if all_done {
            self.finalize_group(main_id, None);
        }
    }

    /// The effective error of a finished group: the first terminal error
    /// in chain order wins, except that a TXT `NotFound` does not
    /// override a successful SRV sibling, and host follow-up failures
    /// degrade to success.
    fn merged_error(&self, ids: &[u16]) -> Option<Error> {
        let srv_ok = ids.iter().any(|&id| {
            self.store.get(id).is_some_and(|q| {
                matches!(q.kind, QueryKind::ServiceSrv | QueryKind::ServiceSrvTxt)
                    && matches!(q.outcome, SavedOutcome::Response(_))
            })
        });

        for &id in ids {
            let Some(q) = self.store.get(id) else { continue };
            if let SavedOutcome::Failed(e) = q.outcome {
                if q.is_host_follow_up {
                    continue;
                }
                if q.kind == QueryKind::ServiceTxt && e == Error::NotFound && srv_ok {
                    continue;
                }
                return Some(e);
            }
        }
        None
    }

    /// Finalizes a sibling group: invokes the callback exactly once and
    /// removes every group member from the store.
    fn finalize_group(&mut self, main_id: u16, forced_error: Option<Error>) {
        let ids = self.store.group_ids(main_id);
        if ids.is_empty() {
            return;
        }
        let error = forced_error.or_else(|| self.merged_error(&ids));
        let callback = self.store.get_mut(main_id).and_then(|q| q.callback.take());

        tracing::debug!("finalizing group {main_id:#06x}: {:?}", error);

        if let Some(callback) = callback {
            self.invoke_callback(callback, &ids, error);
        }

        for &id in &ids {
            self.store.remove(id);
        }
        self.reschedule_timer();
    }

    fn invoke_callback(&self, callback: Callback, ids: &[u16], error: Option<Error>) {
        let result = match error {
            Some(e) => Err(e),
            None => self.build_response(ids),
        };

        match callback {
            Callback::Address(mut f) => f(result.map(AddressResponse)),
            Callback::Browse(mut f) => f(result.map(BrowseResponse)),
            Callback::Service(mut f) => f(result.map(ServiceResponse)),
            Callback::Record(mut f) => f(result.map(RecordResponse)),
        }
    }

    fn build_response(&self, ids: &[u16]) -> Result<Response<'_>> {
        let main = self
            .store
            .get(ids[0])
            .ok_or(Error::InvalidState("unknown query"))?;

        let mut parts = arrayvec::ArrayVec::new();
        for &id in ids {
            let Some(q) = self.store.get(id) else { continue };
            if let SavedOutcome::Response(buf) = &q.outcome {
                let (_, sections) = Sections::populate(buf)?;
                let part = Part {
                    msg: buf.as_slice(),
                    sections,
                };
                if parts.try_push(part).is_err() {
                    break;
                }
            }
        }

        Ok(Response {
            kind: main.kind,
            name: &main.name,
            parts,
            #[cfg(feature = "nat64")]
            nat64_prefix: self.platform.nat64_prefix(),
        })
    }

    fn reschedule_timer(&mut self) {
        let next = self
            .store
            .iter()
            .filter(|q| q.awaiting)
            .map(|q| q.retransmit_at)
            .min();
        match next {
            Some(deadline) => self.platform.arm_timer(deadline),
            None => self.platform.cancel_timer(),
        }
    }
}

#[cfg(feature = "tcp")]
#[cfg_attr(docsrs, doc(cfg(feature = "tcp")))]
impl<P: ClientPlatform> Client<P> {
    fn tcp_send_message(&mut self, dst: &SocketAddrV6, msg: &[u8]) -> Result<()> {
        use tcp::TcpState;

        let Client { platform, tcp, .. } = self;
        match tcp.state {
            TcpState::Uninitialized => {
                tcp.stage(msg)?;
                platform.tcp_connect(dst)?;
                tcp.state = TcpState::Connecting;
            }
            TcpState::Connecting => tcp.stage(msg)?,
            TcpState::ConnectedIdle => {
                tcp.stage(msg)?;
                platform.tcp_send(tcp.staged())?;
                tcp.state = TcpState::ConnectedSending;
            }
            TcpState::ConnectedSending => return Err(Error::NoBufs),
        }
        Ok(())
    }

    /// Handles establishment of the TCP connection requested through
    /// [`TcpPlatform::tcp_connect`].
    pub fn handle_tcp_established(&mut self) {
        use tcp::TcpState;

        self.tcp.state = TcpState::ConnectedIdle;
        if self.tcp.staged().is_empty() {
            return;
        }
        let Client { platform, tcp, .. } = self;
        if platform.tcp_send(tcp.staged()).is_ok() {
            tcp.state = TcpState::ConnectedSending;
        } else {
            platform.tcp_close();
            self.handle_tcp_disconnected();
        }
    }

    /// Handles completion of a [`TcpPlatform::tcp_send`].
    pub fn handle_tcp_send_done(&mut self) {
        use tcp::TcpState;

        self.tcp.clear_staged();
        if self.tcp.state == TcpState::ConnectedSending {
            self.tcp.state = TcpState::ConnectedIdle;
        }
    }

    /// Handles bytes received on the TCP connection.
    pub fn handle_tcp_receive(&mut self, data: &[u8]) {
        if !self.started {
            return;
        }
        if self.tcp.push_received(data).is_err() {
            self.platform.tcp_close();
            self.handle_tcp_disconnected();
            return;
        }

        loop {
            match self.tcp.pop_message() {
                Ok(Some(msg)) => {
                    let mut c = Cursor::new(&msg);
                    let Ok(header) = Header::read(&mut c) else {
                        continue;
                    };
                    if !header.flags.response() || header.flags.opcode() != 0 {
                        continue;
                    }
                    if !self.store.contains(header.id) {
                        continue;
                    }
                    self.process_response(&header, &msg);
                }
                Ok(None) => break,
                Err(_) => {
                    self.platform.tcp_close();
                    self.handle_tcp_disconnected();
                    break;
                }
            }
        }
        self.reschedule_timer();
    }

    /// Handles loss of the TCP connection. Every query awaiting a TCP
    /// response fails.
    pub fn handle_tcp_disconnected(&mut self) {
        self.tcp.reset();
        loop {
            let main_id = self
                .store
                .iter()
                .find(|q| q.use_tcp && q.awaiting)
                .map(|q| q.main_id);
            let Some(main_id) = main_id else { break };
            self.finalize_group(main_id, Some(Error::FailedResponse(RCode::ServFail as u8)));
        }
        self.reschedule_timer();
    }
}
