//! DNS response synthesis.
//!
//! This module builds the answers for resolved records and wraps them into
//! complete DNS messages.

use std::net::{Ipv4Addr, Ipv6Addr};

use hickory_proto::{
    op::{Header, Message, MessageType, OpCode, ResponseCode},
    rr::{
        rdata::{A, AAAA, CNAME, NULL, TXT},
        domain::Label, DNSClass, Name, RData, Record as ResourceRecord, RecordType,
    },
};
use log::{debug, warn};

use crate::config::{ServerConfig, RECORD_TTL};
use crate::errors::ServerError;
use crate::names::to_ascii_name;
use crate::resolver::find_record;
use crate::store::{Record, RecordStore};
use crate::utils::strip_diacritics;

/// Record type code of URI records (RFC 7553).
pub const URI_RECORD_TYPE: u16 = 256;

/// Longest DNS character-string in bytes.
const MAX_CHARACTER_STRING: usize = 255;

/// The labels a record answers under, in answer order: name, id, `e`+id, `e-`+id.
pub fn alias_labels(record: &Record) -> [String; 4] {
    let [id, e_id, e_dash_id] = record.id_aliases();
    [to_ascii_name(&record.full_name), id, e_id, e_dash_id]
}

/// Build the answer records for a resolved record.
///
/// # Arguments
/// * `record` - The resolved record.
/// * `query_type` - The requested record type.
/// * `config` - The server configuration, for the base domain.
///
/// # Returns
/// `Ok(None)` if the type is not served, otherwise the answers in alias order.
/// Fails only for a name label longer than 63 bytes.
pub fn synthesize(
    record: &Record,
    query_type: RecordType,
    config: &ServerConfig,
) -> Result<Option<Vec<ResourceRecord>>, ServerError> {
    let answers = match query_type {
        RecordType::A => per_alias(record, config, |_| RData::A(A(Ipv4Addr::LOCALHOST)))?,
        RecordType::AAAA => {
            per_alias(record, config, |_| RData::AAAA(AAAA(Ipv6Addr::LOCALHOST)))?
        }
        RecordType::CNAME => per_alias(record, config, |name| RData::CNAME(CNAME(name.clone())))?,
        RecordType::TXT => {
            let ascii_name = to_ascii_name(&record.full_name);
            let name = owner_name(&ascii_name, config)?;
            let description = strip_diacritics(&record.description);
            let segments = [
                ascii_name.as_str(),
                description.as_str(),
                record.target_url.as_str(),
            ]
            .into_iter()
            .flat_map(character_strings)
            .collect();
            vec![ResourceRecord::from_rdata(name, RECORD_TTL, RData::TXT(TXT::new(segments)))]
        }
        uri if u16::from(uri) == URI_RECORD_TYPE => {
            let target = uri_rdata(&record.target_url);
            per_alias(record, config, |_| RData::Unknown {
                code: uri,
                rdata: NULL::with(target.clone()),
            })?
        }
        _ => return Ok(None),
    };

    Ok(Some(answers))
}

/// One record per alias label, each owned by the qualified alias name.
fn per_alias<F>(
    record: &Record,
    config: &ServerConfig,
    rdata: F,
) -> Result<Vec<ResourceRecord>, ServerError>
where
    F: Fn(&Name) -> RData,
{
    alias_labels(record)
        .iter()
        .map(|label| {
            let name = owner_name(label, config)?;
            let data = rdata(&name);
            Ok(ResourceRecord::from_rdata(name, RECORD_TTL, data))
        })
        .collect()
}

/// Qualify an alias label below the base domain.
///
/// Labels are taken as raw bytes, so names with spaces or punctuation still
/// form an owner name. Dots split labels; empty labels are skipped.
fn owner_name(label: &str, config: &ServerConfig) -> Result<Name, ServerError> {
    let labels = label
        .split('.')
        .chain(config.base_domain.split('.'))
        .filter(|part| !part.is_empty())
        .map(|part| Label::from_raw_bytes(part.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Name::from_labels(labels)?)
}

/// Split text into character-strings of at most 255 bytes, cutting on char boundaries.
fn character_strings(text: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut rest = text;
    while rest.len() > MAX_CHARACTER_STRING {
        let mut cut = MAX_CHARACTER_STRING;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        strings.push(head.to_string());
        rest = tail;
    }
    strings.push(rest.to_string());
    strings
}

/// Encode URI record data: priority, weight, then the target without a length prefix.
fn uri_rdata(target: &str) -> Vec<u8> {
    let mut rdata = Vec::with_capacity(4 + target.len());
    rdata.extend_from_slice(&0u16.to_be_bytes()); // priority
    rdata.extend_from_slice(&0u16.to_be_bytes()); // weight
    rdata.extend_from_slice(target.as_bytes());
    rdata
}

/// Answer a parsed DNS request.
///
/// Only the first question is looked at. Unknown names and unsupported types
/// get NXDOMAIN, classes other than IN get NOTIMP.
pub fn answer(request: &Message, store: &RecordStore, config: &ServerConfig) -> Message {
    let mut response = Message::new();
    response.set_header(Header::response_from_request(request.header()));
    response.set_authoritative(true);

    if request.message_type() != MessageType::Query || request.op_code() != OpCode::Query {
        debug!(
            "unsupported message {:?} / {:?}",
            request.message_type(),
            request.op_code()
        );
        response.set_response_code(ResponseCode::NotImp);
        return response;
    }

    let Some(query) = request.queries().first() else {
        response.set_response_code(ResponseCode::FormErr);
        return response;
    };
    response.add_query(query.clone());

    if query.query_class() != DNSClass::IN {
        debug!("unsupported class {} for {}", query.query_class(), query.name());
        response.set_response_code(ResponseCode::NotImp);
        return response;
    }

    let name = query.name().to_ascii();
    let code = match find_record(store, &name) {
        Some(record) => match synthesize(record, query.query_type(), config) {
            Ok(Some(answers)) => {
                response.add_answers(answers);
                ResponseCode::NoError
            }
            Ok(None) => {
                debug!("defaulting to NXDOMAIN for {} {}", name, query.query_type());
                ResponseCode::NXDomain
            }
            Err(e) => {
                warn!("could not synthesize answer for {}: {}", name, e);
                ResponseCode::ServFail
            }
        },
        None => {
            debug!("no record for {}", name);
            ResponseCode::NXDomain
        }
    };

    response.set_response_code(code);
    response
}

/// Decode a request packet, answer it and encode the response.
///
/// # Arguments
/// * `packet` - The raw request.
/// * `store` - The record store.
/// * `config` - The server configuration.
///
/// # Returns
/// A `Result` containing the encoded response.
pub fn handle_packet(
    packet: &[u8],
    store: &RecordStore,
    config: &ServerConfig,
) -> Result<Vec<u8>, ServerError> {
    let request = Message::from_vec(packet)?;
    let response = answer(&request, store, config);
    Ok(response.to_vec()?)
}
