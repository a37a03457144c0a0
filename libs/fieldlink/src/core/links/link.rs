// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! One link and its state machine.
//!
//! Transitions run under the link's own lock and return what the caller must
//! do next (send a put, report a failure). Nothing here calls a delegate.

use parking_lot::Mutex;

use super::channel::RemoteUpdate;
use super::deferred::DeferredWrites;
use super::link_id::{LinkId, PutTicket};
use super::spec::{ChannelKey, LinkSpec};
use super::state::{ConnectedState, LinkState};
use crate::core::channel_ref::ChannelRef;
use crate::core::delegates::{FieldReading, PutRequest};
use crate::core::error::{FieldLinkError, Result};
use crate::core::meta::Alarm;
use crate::core::value::TypedValue;

struct LinkInner {
    state: LinkState,
    reading: Option<FieldReading>,
    deferred: DeferredWrites,
    in_flight: Option<PutTicket>,
    flush_on_complete: bool,
}

/// Result of leaving the connected state.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Teardown {
    pub from: Option<LinkState>,
    pub failed_put: Option<PutTicket>,
    pub discarded_writes: usize,
}

/// Result of a put completion.
#[derive(Debug, PartialEq)]
pub(crate) enum PutCompletion {
    /// Ticket was not in flight (late completion after teardown).
    Stale,
    Done { next: Option<PutRequest> },
}

/// Value selected from a remote update for this link.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Inbound {
    pub value: TypedValue,
    pub alarm: Option<Alarm>,
}

pub struct Link {
    id: LinkId,
    local: ChannelRef,
    spec: LinkSpec,
    key: ChannelKey,
    registration: u64,
    inner: Mutex<LinkInner>,
}

impl Link {
    pub(crate) fn new(local: ChannelRef, spec: LinkSpec, registration: u64) -> Self {
        let key = spec.channel_key();
        Self {
            id: LinkId::new(),
            local,
            spec,
            key,
            registration,
            inner: Mutex::new(LinkInner {
                state: LinkState::Disconnected,
                reading: None,
                deferred: DeferredWrites::default(),
                in_flight: None,
                flush_on_complete: false,
            }),
        }
    }

    pub fn id(&self) -> &LinkId {
        &self.id
    }

    pub fn local(&self) -> &ChannelRef {
        &self.local
    }

    pub fn spec(&self) -> &LinkSpec {
        &self.spec
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn registration(&self) -> u64 {
        self.registration
    }

    pub fn state(&self) -> LinkState {
        self.inner.lock().state
    }

    pub fn pending_writes(&self) -> usize {
        self.inner.lock().deferred.len()
    }

    pub(crate) fn set_connecting(&self) -> Option<LinkState> {
        let mut inner = self.inner.lock();
        match inner.state {
            LinkState::Disconnected => {
                inner.state = LinkState::Connecting;
                Some(LinkState::Disconnected)
            }
            _ => None,
        }
    }

    pub(crate) fn set_connected(&self) -> Option<LinkState> {
        let mut inner = self.inner.lock();
        match inner.state {
            LinkState::Disconnected | LinkState::Connecting => {
                let from = inner.state;
                inner.state = LinkState::Connected(ConnectedState::Idle);
                Some(from)
            }
            _ => None,
        }
    }

    pub(crate) fn set_disconnected(&self) -> Teardown {
        self.teardown(LinkState::Disconnected)
    }

    pub(crate) fn close(&self) -> Teardown {
        self.teardown(LinkState::Closed)
    }

    fn teardown(&self, to: LinkState) -> Teardown {
        let mut inner = self.inner.lock();
        if inner.state.is_closed() || inner.state == to {
            return Teardown::default();
        }
        let from = inner.state;
        inner.state = to;
        inner.reading = None;
        inner.flush_on_complete = false;
        Teardown {
            from: Some(from),
            failed_put: inner.in_flight.take(),
            discarded_writes: inner.deferred.clear(),
        }
    }

    /// Accept a local write. Returns the put to send now, if any.
    ///
    /// Deferred links only buffer. A non-deferred write that finds a put in
    /// flight is buffered and sent when that put completes.
    pub(crate) fn begin_put(
        &self,
        path: &str,
        value: TypedValue,
        ticket: PutTicket,
    ) -> Result<Option<PutRequest>> {
        let mut inner = self.inner.lock();
        self.require_connected(inner.state)?;

        let path = if path.is_empty() {
            self.spec.field.as_str()
        } else {
            path
        };
        if self.spec.defer {
            inner.deferred.merge(path, value);
            return Ok(None);
        }
        if inner.in_flight.is_some() {
            inner.deferred.merge(path, value);
            inner.flush_on_complete = true;
            return Ok(None);
        }

        inner.in_flight = Some(ticket);
        inner.state = LinkState::Connected(ConnectedState::PutPending);
        Ok(Some(self.put_request(ticket, vec![(path.to_string(), value)])))
    }

    /// Send every buffered write as one put.
    pub(crate) fn flush(&self, ticket: PutTicket) -> Result<Option<PutRequest>> {
        let mut inner = self.inner.lock();
        self.require_connected(inner.state)?;
        if inner.deferred.is_empty() {
            return Ok(None);
        }
        if inner.in_flight.is_some() {
            inner.flush_on_complete = true;
            return Ok(None);
        }
        let fields = inner.deferred.take();
        inner.in_flight = Some(ticket);
        inner.state = LinkState::Connected(ConnectedState::PutPending);
        Ok(Some(self.put_request(ticket, fields)))
    }

    pub(crate) fn complete_put(&self, ticket: PutTicket, next_ticket: PutTicket) -> PutCompletion {
        let mut inner = self.inner.lock();
        if inner.in_flight != Some(ticket) {
            return PutCompletion::Stale;
        }
        inner.in_flight = None;

        let next = if inner.flush_on_complete && !inner.deferred.is_empty() {
            inner.flush_on_complete = false;
            let fields = inner.deferred.take();
            inner.in_flight = Some(next_ticket);
            Some(self.put_request(next_ticket, fields))
        } else {
            inner.flush_on_complete = false;
            None
        };

        if inner.state == LinkState::Connected(ConnectedState::PutPending) && next.is_none() {
            inner.state = LinkState::Connected(ConnectedState::Idle);
        }
        PutCompletion::Done { next }
    }

    /// Store a remote update. `None` if the link is not connected or the
    /// update lacks this link's sub-field.
    pub(crate) fn accept_update(&self, update: &RemoteUpdate) -> Option<Inbound> {
        let mut inner = self.inner.lock();
        if !inner.state.is_connected() {
            return None;
        }

        let (value, alarm, time) = if self.spec.field.is_empty() {
            (update.value.clone(), update.alarm.clone(), update.time)
        } else {
            (update.fields.get(&self.spec.field)?.clone(), None, None)
        };

        let mut time = time.unwrap_or_default();
        if let Some(transform) = &self.spec.time_tag {
            transform.apply(&mut time);
        }
        inner.reading = Some(FieldReading {
            value: value.clone(),
            alarm: alarm.clone().unwrap_or_default(),
            time,
        });
        if inner.state == LinkState::Connected(ConnectedState::Idle) {
            inner.state = LinkState::Connected(ConnectedState::GetPending);
        }
        Some(Inbound { value, alarm })
    }

    pub(crate) fn finish_get(&self) {
        let mut inner = self.inner.lock();
        if inner.state == LinkState::Connected(ConnectedState::GetPending) {
            inner.state = LinkState::Connected(ConnectedState::Idle);
        }
    }

    /// Last value received, with its time tag applied.
    pub fn read(&self) -> Result<FieldReading> {
        let inner = self.inner.lock();
        self.require_connected(inner.state)?;
        inner.reading.clone().ok_or_else(|| {
            FieldLinkError::NotFound(format!("link {} has not received a value yet", self.id))
        })
    }

    fn require_connected(&self, state: LinkState) -> Result<()> {
        match state {
            LinkState::Connected(_) => Ok(()),
            LinkState::Closed => Err(FieldLinkError::LinkClosed(format!(
                "link {} to '{}'",
                self.id, self.spec.target
            ))),
            other => Err(FieldLinkError::LinkDisconnected(format!(
                "link {} to '{}' is {}",
                self.id, self.spec.target, other
            ))),
        }
    }

    fn put_request(&self, ticket: PutTicket, fields: Vec<(String, TypedValue)>) -> PutRequest {
        PutRequest {
            link: self.id.clone(),
            ticket,
            target: self.spec.target.clone(),
            fields,
            process: self.spec.proc.outbound(),
        }
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("id", &self.id)
            .field("local", &self.local)
            .field("target", &self.spec.target)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::meta::{Severity, TimeStamp};
    use crate::core::time_tag::TimeTagTransform;

    fn connected(spec: LinkSpec) -> Link {
        let link = Link::new(ChannelRef::new("rec:local"), spec, 0);
        link.set_connecting();
        link.set_connected();
        link
    }

    #[test]
    fn test_put_requires_connection() {
        let link = Link::new(ChannelRef::new("rec:local"), LinkSpec::new("remote"), 0);
        assert!(matches!(
            link.begin_put("", TypedValue::from(1i32), PutTicket::from(1)),
            Err(FieldLinkError::LinkDisconnected(_))
        ));
    }

    #[test]
    fn test_deferred_writes_flush_as_one_put() {
        let link = connected(LinkSpec::new("remote").with_defer(true));
        assert!(link.begin_put("X", TypedValue::from(1i32), PutTicket::from(1)).unwrap().is_none());
        assert!(link.begin_put("Y", TypedValue::from(2i32), PutTicket::from(2)).unwrap().is_none());
        assert_eq!(link.state(), LinkState::Connected(ConnectedState::Idle));

        let put = link.flush(PutTicket::from(3)).unwrap().unwrap();
        assert_eq!(put.fields.len(), 2);
        assert_eq!(link.state(), LinkState::Connected(ConnectedState::PutPending));
        assert!(link.flush(PutTicket::from(4)).unwrap().is_none());
    }

    #[test]
    fn test_write_during_put_is_coalesced() {
        let link = connected(LinkSpec::new("remote"));
        let first = link.begin_put("", TypedValue::from(1i32), PutTicket::from(1)).unwrap();
        assert!(first.is_some());
        assert!(link.begin_put("", TypedValue::from(2i32), PutTicket::from(2)).unwrap().is_none());
        assert!(link.begin_put("", TypedValue::from(3i32), PutTicket::from(3)).unwrap().is_none());

        let PutCompletion::Done { next } = link.complete_put(PutTicket::from(1), PutTicket::from(4))
        else {
            panic!("completion was stale");
        };
        let next = next.unwrap();
        assert_eq!(next.ticket, PutTicket::from(4));
        assert_eq!(next.fields, vec![(String::new(), TypedValue::from(3i32))]);

        assert_eq!(
            link.complete_put(PutTicket::from(4), PutTicket::from(5)),
            PutCompletion::Done { next: None }
        );
        assert_eq!(link.state(), LinkState::Connected(ConnectedState::Idle));
        assert_eq!(
            link.complete_put(PutTicket::from(4), PutTicket::from(6)),
            PutCompletion::Stale
        );
    }

    #[test]
    fn test_disconnect_fails_pending_put_and_discards_buffer() {
        let link = connected(LinkSpec::new("remote"));
        link.begin_put("", TypedValue::from(1i32), PutTicket::from(1)).unwrap();
        link.begin_put("", TypedValue::from(2i32), PutTicket::from(2)).unwrap();

        let teardown = link.set_disconnected();
        assert_eq!(teardown.from, Some(LinkState::Connected(ConnectedState::PutPending)));
        assert_eq!(teardown.failed_put, Some(PutTicket::from(1)));
        assert_eq!(teardown.discarded_writes, 1);
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_closed_is_terminal() {
        let link = connected(LinkSpec::new("remote"));
        link.close();
        assert!(link.set_connected().is_none());
        assert_eq!(link.set_disconnected(), Teardown::default());
        assert!(matches!(
            link.begin_put("", TypedValue::from(1i32), PutTicket::from(1)),
            Err(FieldLinkError::LinkClosed(_))
        ));
    }

    #[test]
    fn test_accept_update_selects_value_and_tags_time() {
        let link = connected(
            LinkSpec::new("remote").with_time_tag(TimeTagTransform::new(20).unwrap()),
        );
        let update = RemoteUpdate::new(5i32)
            .with_alarm(Alarm::new(Severity::Major, "hi"))
            .with_time(TimeStamp::new(1, 0x1234_5678));

        let inbound = link.accept_update(&update).unwrap();
        assert_eq!(inbound.value, TypedValue::from(5i32));
        assert_eq!(inbound.alarm.map(|a| a.severity), Some(Severity::Major));
        assert_eq!(link.state(), LinkState::Connected(ConnectedState::GetPending));

        let reading = link.read().unwrap();
        assert_eq!(reading.time.user_tag, 0x45678);
        assert_eq!(reading.time.nanoseconds, 0x1230_0000);

        link.finish_get();
        assert_eq!(link.state(), LinkState::Connected(ConnectedState::Idle));
    }

    #[test]
    fn test_sub_field_update_takes_value_only() {
        let link = connected(LinkSpec::new("remote").with_field("limit"));
        let update = RemoteUpdate::new(0i32)
            .with_alarm(Alarm::new(Severity::Invalid, "x"))
            .with_field("limit", 9.5f64);
        let inbound = link.accept_update(&update).unwrap();
        assert_eq!(inbound.value, TypedValue::from(9.5f64));
        assert!(inbound.alarm.is_none());

        assert!(link.accept_update(&RemoteUpdate::new(1i32)).is_none());
    }
}
