//! GET / GETNEXT / SET / GETBULK request processing.
//!
//! All four requests share the same skeleton: walk the inbound varbinds in
//! order, resolve each against the access views and the MIB tree, and carry
//! the first error (status and 1-based index) into the PDU header. Later
//! errors only surface as exception values on their own varbinds.

use tracing::trace;

use super::Agent;
use crate::error::ErrorStatus;
use crate::handler::GetResult;
use crate::message::{Datagram, FLAG_AUTH, MSG_MAX_SIZE, Pdu, PduType};
use crate::mib::{Access, NextOutcome, Principal, SearchOutcome};
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

/// Bytes reserved for the message envelope around the varbind list.
const ENVELOPE_ALLOWANCE: usize = 256;

/// Hard ceiling on varbinds a single GETBULK response may carry.
const MAX_BULK_VARBINDS: usize = 4096;

pub(crate) fn dispatch(agent: &Agent, datagram: &Datagram) -> Option<Pdu> {
    let pdu = datagram.pdu();
    let mut response = match pdu.pdu_type {
        PduType::GetRequest => get(agent, datagram),
        PduType::GetNextRequest => get_next(agent, datagram),
        PduType::SetRequest => set(agent, datagram),
        PduType::GetBulkRequest => {
            if datagram.version == Version::V1 {
                // GETBULK does not exist in SNMPv1
                trace!("dropping v1 GETBULK");
                return None;
            }
            get_bulk(agent, datagram)
        }
        PduType::Response => {
            trace!("dropping inbound response PDU");
            return None;
        }
    };

    if datagram.version == Version::V1 {
        downgrade_v1(&mut response);
    }
    Some(response)
}

/// First-error bookkeeping for the PDU header.
#[derive(Default)]
struct FirstError {
    status: Option<ErrorStatus>,
    index: i32,
}

impl FirstError {
    fn record(&mut self, status: ErrorStatus, index: i32) {
        if !status.is_ok() && self.status.is_none() {
            self.status = Some(status);
            self.index = index;
        }
    }

    fn status(&self) -> ErrorStatus {
        self.status.unwrap_or(ErrorStatus::NoError)
    }
}

/// The per-varbind access check.
///
/// Exact requests (GET, SET) require one of the principal's views to cover
/// the OID. Successor requests skip the coverage test: the walk itself is
/// view-bounded and a query outside every view simply ends the MIB view.
fn check_access(
    agent: &Agent,
    datagram: &Datagram,
    oid: &Oid,
    access: Access,
    require_cover: bool,
) -> ErrorStatus {
    let Some(principal) = datagram.principal else {
        return ErrorStatus::NoAccess;
    };

    match datagram.version {
        Version::V3 => {
            if require_cover && !agent.acl.covers(principal, access, oid) {
                return ErrorStatus::NoAccess;
            }
            let flags = datagram.v3.as_ref().map_or(0, |h| h.msg_flags);
            if !agent.security_mode.permits(flags) {
                return ErrorStatus::AuthorizationError;
            }
            if flags & FLAG_AUTH != 0
                && let Some(err) = datagram.auth_error
            {
                return err;
            }
            ErrorStatus::NoError
        }
        Version::V1 | Version::V2c => {
            if require_cover && !agent.acl.covers(principal, access, oid) {
                return ErrorStatus::NoAccess;
            }
            ErrorStatus::NoError
        }
    }
}

/// Largest varbind payload the response may carry.
fn response_limit(datagram: &Datagram) -> usize {
    let max = datagram
        .v3
        .as_ref()
        .map_or(MSG_MAX_SIZE, |h| h.msg_max_size.clamp(484, MSG_MAX_SIZE));
    (max as usize).saturating_sub(ENVELOPE_ALLOWANCE)
}

fn finalize(request: &Pdu, first_error: FirstError, varbinds: Vec<VarBind>, limit: usize) -> Pdu {
    let total: usize = varbinds.iter().map(VarBind::wire_size).sum();
    if total > limit {
        return Pdu::response(request.request_id, ErrorStatus::TooBig, 0, Vec::new());
    }
    Pdu::response(
        request.request_id,
        first_error.status(),
        first_error.index,
        varbinds,
    )
}

fn get(agent: &Agent, datagram: &Datagram) -> Pdu {
    let pdu = datagram.pdu();
    let mut first_error = FirstError::default();
    let mut out = Vec::with_capacity(pdu.varbinds.len());

    for (idx, vb_in) in pdu.varbinds.iter().enumerate() {
        let index = (idx + 1) as i32;
        let status = check_access(agent, datagram, &vb_in.oid, Access::ReadOnly, true);
        let vb_out = if status.is_ok() {
            VarBind::new(vb_in.oid.clone(), resolve_get(agent, datagram, &vb_in.oid))
        } else {
            first_error.record(status, index);
            vb_in.clone()
        };
        out.push(vb_out);
    }

    finalize(pdu, first_error, out, response_limit(datagram))
}

/// Exact lookup across the principal's read views.
fn resolve_get(agent: &Agent, datagram: &Datagram, oid: &Oid) -> Value {
    let principal = datagram.principal.expect("access check resolved principal");
    let mut miss = Value::NoSuchObject;

    for view in agent.acl.views(principal, Access::ReadOnly) {
        if oid < view.prefix() {
            // Ahead of this view; later views cannot match either
            break;
        }
        if !oid.starts_with(view.prefix()) {
            continue;
        }
        match agent.mib.search(oid) {
            SearchOutcome::Instance {
                handler, suffix, ..
            } => match handler.get(&suffix) {
                GetResult::Value(value) => return value,
                GetResult::NoSuchInstance => miss = Value::NoSuchInstance,
            },
            SearchOutcome::NoSuchInstance => miss = Value::NoSuchInstance,
            SearchOutcome::NoSuchObject => {}
        }
    }
    miss
}

fn get_next(agent: &Agent, datagram: &Datagram) -> Pdu {
    let pdu = datagram.pdu();
    let mut first_error = FirstError::default();
    let mut out = Vec::with_capacity(pdu.varbinds.len());

    for (idx, vb_in) in pdu.varbinds.iter().enumerate() {
        let index = (idx + 1) as i32;
        let status = check_access(agent, datagram, &vb_in.oid, Access::ReadOnly, false);
        let vb_out = if status.is_ok() {
            let (oid, value) = resolve_next(agent, datagram, &vb_in.oid);
            VarBind::new(oid, value)
        } else {
            first_error.record(status, index);
            vb_in.clone()
        };
        out.push(vb_out);
    }

    finalize(pdu, first_error, out, response_limit(datagram))
}

/// Successor lookup across the principal's read views, in view order.
fn resolve_next(agent: &Agent, datagram: &Datagram, oid: &Oid) -> (Oid, Value) {
    let principal = datagram.principal.expect("access check resolved principal");

    for view in agent.acl.views(principal, Access::ReadOnly) {
        match agent.mib.search_next(oid, view.prefix()) {
            NextOutcome::Found { oid, value } => return (oid, value),
            NextOutcome::EndOfView => continue,
        }
    }
    (oid.clone(), Value::EndOfMibView)
}

fn set(agent: &Agent, datagram: &Datagram) -> Pdu {
    let pdu = datagram.pdu();
    let mut first_error = FirstError::default();
    let mut out = Vec::with_capacity(pdu.varbinds.len());

    for (idx, vb_in) in pdu.varbinds.iter().enumerate() {
        let index = (idx + 1) as i32;
        let mut status = check_access(agent, datagram, &vb_in.oid, Access::ReadWrite, true);
        if status.is_ok() {
            status = resolve_set(agent, datagram, vb_in);
        }
        first_error.record(status, index);
        // SET responses echo the request varbind regardless of outcome
        out.push(vb_in.clone());
    }

    finalize(pdu, first_error, out, response_limit(datagram))
}

/// Exact lookup and assignment across the principal's write views.
fn resolve_set(agent: &Agent, datagram: &Datagram, vb_in: &VarBind) -> ErrorStatus {
    let principal = datagram.principal.expect("access check resolved principal");
    let oid = &vb_in.oid;

    for view in agent.acl.views(principal, Access::ReadWrite) {
        if oid < view.prefix() {
            break;
        }
        if !oid.starts_with(view.prefix()) {
            continue;
        }
        if let SearchOutcome::Instance {
            handler, suffix, ..
        } = agent.mib.search(oid)
        {
            return handler.set(&suffix, &vb_in.value).to_error_status();
        }
    }
    // Miss: the would-be exception tag converts to notWritable for SET
    ErrorStatus::NotWritable
}

fn get_bulk(agent: &Agent, datagram: &Datagram) -> Pdu {
    let pdu = datagram.pdu();
    let limit = response_limit(datagram);
    let non_repeaters = pdu.non_repeaters().min(pdu.varbinds.len());
    let max_repetitions = pdu.max_repetitions();

    let mut first_error = FirstError::default();
    let mut out = Vec::new();
    let mut total = 0usize;

    // Non-repeaters: one successor each
    for (idx, vb_in) in pdu.varbinds[..non_repeaters].iter().enumerate() {
        let index = (idx + 1) as i32;
        let status = check_access(agent, datagram, &vb_in.oid, Access::ReadOnly, false);
        let vb_out = if status.is_ok() {
            let (oid, value) = resolve_next(agent, datagram, &vb_in.oid);
            VarBind::new(oid, value)
        } else {
            first_error.record(status, index);
            vb_in.clone()
        };
        total += vb_out.wire_size();
        out.push(vb_out);
    }

    // Repeaters: walked max_repetitions times, each round advancing from
    // the previous yield. A slot that reaches end-of-view is latched: the
    // sentinel is repeated and its handler is not called again.
    struct Cursor {
        oid: Oid,
        index: i32,
        done: bool,
    }
    let mut cursors: Vec<Cursor> = pdu.varbinds[non_repeaters..]
        .iter()
        .enumerate()
        .map(|(j, vb)| Cursor {
            oid: vb.oid.clone(),
            index: (non_repeaters + j + 1) as i32,
            done: false,
        })
        .collect();

    'rounds: for _ in 0..max_repetitions {
        if cursors.is_empty() {
            break;
        }
        for cursor in cursors.iter_mut() {
            if out.len() >= MAX_BULK_VARBINDS || total > limit {
                break 'rounds;
            }
            let vb_out = if cursor.done {
                VarBind::new(cursor.oid.clone(), Value::EndOfMibView)
            } else {
                let status =
                    check_access(agent, datagram, &cursor.oid, Access::ReadOnly, false);
                if status.is_ok() {
                    let (oid, value) = resolve_next(agent, datagram, &cursor.oid);
                    if value == Value::EndOfMibView {
                        cursor.done = true;
                    }
                    cursor.oid = oid.clone();
                    VarBind::new(oid, value)
                } else {
                    first_error.record(status, cursor.index);
                    cursor.done = true;
                    VarBind::new(cursor.oid.clone(), Value::EndOfMibView)
                }
            };
            total += vb_out.wire_size();
            out.push(vb_out);
        }
    }

    // Trim trailing varbinds that overflow the response budget
    while total > limit {
        match out.pop() {
            Some(vb) => total -= vb.wire_size(),
            None => break,
        }
    }

    Pdu::response(
        pdu.request_id,
        first_error.status(),
        first_error.index,
        out,
    )
}

/// Map a v2c-shaped response onto SNMPv1 conventions: exception values
/// become a noSuchName error at the offending index, and v2c-only statuses
/// collapse to their closest v1 counterpart.
fn downgrade_v1(pdu: &mut Pdu) {
    let status = ErrorStatus::from_i32(pdu.error_status).to_v1();
    pdu.error_status = status.as_i32();

    if status.is_ok()
        && let Some(idx) = pdu.varbinds.iter().position(|vb| vb.value.is_exception())
    {
        pdu.error_status = ErrorStatus::NoSuchName.as_i32();
        pdu.error_index = (idx + 1) as i32;
    }

    // v1 has no exception tags on the wire
    for vb in &mut pdu.varbinds {
        if vb.value.is_exception() {
            vb.value = Value::Null;
        }
    }
}
