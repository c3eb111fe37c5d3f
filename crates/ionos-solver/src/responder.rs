//! Authoritative DNS responder for conformance runs
//!
//! Answers queries straight from the provider state the solver writes to,
//! so a freshly presented TXT record can be resolved without a real DNS
//! deployment. Only the record types a DNS-01 check needs are served:
//!
//! - `A` always resolves to the loopback address
//! - `TXT` returns the stored challenge content, or NXDOMAIN
//! - `NS` and `SOA` point at an obviously invalid nameserver
//!
//! Any other type turns the reply into SERVFAIL.

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, NS, SOA, TXT};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::challenge::un_fqdn;
use crate::errors::DnsError;
use crate::providers::{DnsProvider, ProviderHandle};

/// Nameserver named in NS and SOA answers
pub const NAMESERVER: &str = "ns.ionos-acme-webhook.invalid.";

/// TTL of every synthesized answer
pub const ANSWER_TTL: u32 = 5;

const SOA_SERIAL: u32 = 20;
const SOA_TIMER: i32 = 5;
const SOA_MINIMUM: u32 = 5;

/// Longest single character-string in TXT RDATA
const TXT_CHUNK_LEN: usize = 255;

const MAX_DATAGRAM_LEN: usize = 4096;

/// Minimal authoritative responder over a shared provider
pub struct DnsResponder<P> {
    provider: ProviderHandle<P>,
}

impl<P> Clone for DnsResponder<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: DnsProvider + 'static> DnsResponder<P> {
    pub fn new(provider: ProviderHandle<P>) -> Self {
        Self { provider }
    }

    /// Bind the UDP socket the responder will serve on
    pub async fn bind(addr: SocketAddr) -> Result<UdpSocket, DnsError> {
        Ok(UdpSocket::bind(addr).await?)
    }

    /// Build the reply for one DNS message.
    ///
    /// Questions are answered in order. The first question that cannot be
    /// answered turns the reply into SERVFAIL and ends processing.
    pub async fn handle_request(&self, request: &Message) -> Message {
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_authoritative(true)
            .set_recursion_desired(request.recursion_desired())
            .set_checking_disabled(request.checking_disabled())
            .set_response_code(ResponseCode::NoError);
        response.add_queries(request.queries().to_vec());

        if request.op_code() != OpCode::Query {
            return response;
        }

        for query in request.queries() {
            if let Err(e) = self.add_answer(query, &mut response).await {
                warn!(name = %query.name(), error = %e, "Failed to answer DNS question");
                response.set_response_code(ResponseCode::ServFail);
                break;
            }
        }

        response
    }

    async fn add_answer(&self, query: &Query, response: &mut Message) -> Result<(), DnsError> {
        let name = query.name().clone();

        match query.query_type() {
            RecordType::A => {
                let rdata = RData::A(A::from(Ipv4Addr::LOCALHOST));
                response.add_answer(Record::from_rdata(name, ANSWER_TTL, rdata));
            }
            RecordType::TXT => {
                let ascii = name.to_lowercase().to_ascii();
                let value = {
                    let provider = self.provider.read().await;
                    provider.get_record_value("", un_fqdn(&ascii)).await
                };

                match value {
                    Ok(content) => {
                        let mut chunks: Vec<&[u8]> =
                            content.as_bytes().chunks(TXT_CHUNK_LEN).collect();
                        if chunks.is_empty() {
                            chunks.push(b"");
                        }
                        let rdata = RData::TXT(TXT::from_bytes(chunks));
                        response.add_answer(Record::from_rdata(name, ANSWER_TTL, rdata));
                    }
                    Err(e) => {
                        debug!("No TXT record for {}: {}", ascii, e);
                        response.set_response_code(ResponseCode::NXDomain);
                    }
                }
            }
            RecordType::NS => {
                let nameserver = Name::from_ascii(NAMESERVER)?;
                let rdata = RData::NS(NS(nameserver));
                response.add_answer(Record::from_rdata(name, ANSWER_TTL, rdata));
            }
            RecordType::SOA => {
                let nameserver = Name::from_ascii(NAMESERVER)?;
                let rdata = RData::SOA(SOA::new(
                    nameserver.clone(),
                    nameserver.clone(),
                    SOA_SERIAL,
                    SOA_TIMER,
                    SOA_TIMER,
                    SOA_TIMER,
                    SOA_MINIMUM,
                ));
                response.add_answer(Record::from_rdata(nameserver, ANSWER_TTL, rdata));
            }
            other => return Err(DnsError::UnsupportedRecordType(other)),
        }

        Ok(())
    }

    /// Serve queries on `socket` until `shutdown` is cancelled.
    ///
    /// Every datagram is handled on its own task. Undecodable datagrams are
    /// dropped, and replies still in flight at shutdown are never sent.
    pub async fn serve(self, socket: UdpSocket, shutdown: CancellationToken) -> Result<(), DnsError> {
        let socket = Arc::new(socket);
        info!("DNS responder listening on {}", socket.local_addr()?);

        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            let (len, peer) = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received; stopping DNS responder");
                    break;
                }
                received = socket.recv_from(&mut buf) => match received {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "Failed to receive DNS datagram");
                        continue;
                    }
                },
            };

            let request = match Message::from_vec(&buf[..len]) {
                Ok(request) => request,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "Dropping undecodable DNS message");
                    continue;
                }
            };

            let responder = self.clone();
            let socket = Arc::clone(&socket);
            let cancelled = shutdown.child_token();
            tokio::spawn(async move {
                let response = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => return,
                    response = responder.handle_request(&request) => response,
                };

                match response.to_vec() {
                    Ok(bytes) => {
                        if let Err(e) = socket.send_to(&bytes, peer).await {
                            warn!(peer = %peer, error = %e, "Failed to send DNS response");
                        }
                    }
                    Err(e) => warn!(peer = %peer, error = %e, "Failed to encode DNS response"),
                }
            });
        }

        Ok(())
    }
}
