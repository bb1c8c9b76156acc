//! The control-message receive and dispatch loop.
//!
//! One [`Dispatcher`] serves the whole control plane: it waits on the
//! control sockets (one per address family in dual-stack operation), reads
//! one datagram at a time and routes it to the per-type handler. The
//! handlers themselves are external collaborators behind the
//! [`ControlHandlers`] trait; a failing handler costs exactly one message,
//! never the loop.

use core::fmt;
use std::{io, net::SocketAddr};

use bytes::Bytes;
use log::{debug, trace, warn};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::{address::LispAddr, config::ControlConfig, message::MessageType};

/// Upper bound on the size of a single control message.
const MAX_CONTROL_MESSAGE_SIZE: usize = 4096;

/// A received control message together with its sender metadata.
#[derive(Debug, Clone)]
pub struct ControlDatagram {
    /// The raw message bytes. Ownership moves to the handler, the
    /// dispatcher only reads the type tag.
    pub payload: Bytes,
    /// Address of the local interface the message arrived on.
    pub local_rloc: LispAddr,
    /// Source port of the peer, needed to reply to Map-Requests.
    pub remote_port: u16,
}

/// Error produced when the socket layer cannot deliver a complete
/// `(payload, local RLOC, remote port)` triple.
#[derive(Debug)]
pub struct ReceiveError {
    inner: io::Error,
}

/// Opaque failure reported by a protocol handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The per-type protocol handlers the dispatcher routes to.
///
/// There is deliberately no Map-Register method: a mobile node is never a
/// map server, Map-Register messages are dropped before reaching the
/// handlers.
pub trait ControlHandlers {
    fn handle_map_request(
        &self,
        payload: &[u8],
        local_rloc: LispAddr,
        remote_port: u16,
    ) -> Result<(), HandlerError>;

    fn handle_map_reply(&self, payload: &[u8]) -> Result<(), HandlerError>;

    fn handle_map_notify(&self, payload: &[u8]) -> Result<(), HandlerError>;

    fn handle_map_referral(&self, payload: &[u8]) -> Result<(), HandlerError>;

    fn handle_info_nat(&self, payload: &[u8], local_rloc: LispAddr) -> Result<(), HandlerError>;
}

/// The socket-layer collaborator: produces one received control message at a
/// time, with the sender metadata already extracted.
#[allow(async_fn_in_trait)]
pub trait ControlSocket {
    /// Wait for and return the next datagram on this socket.
    async fn receive(&self) -> Result<ControlDatagram, ReceiveError>;
}

/// [`ControlSocket`] implementation over a bound UDP socket.
#[derive(Debug)]
pub struct UdpControlSocket {
    socket: UdpSocket,
}

impl UdpControlSocket {
    /// Bind a control socket on the given address.
    pub async fn bind(addr: SocketAddr) -> io::Result<UdpControlSocket> {
        Ok(UdpControlSocket {
            socket: UdpSocket::bind(addr).await?,
        })
    }

    pub fn new(socket: UdpSocket) -> UdpControlSocket {
        UdpControlSocket { socket }
    }
}

impl ControlSocket for UdpControlSocket {
    async fn receive(&self) -> Result<ControlDatagram, ReceiveError> {
        let mut buf = vec![0; MAX_CONTROL_MESSAGE_SIZE];
        let (len, peer) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        let local_rloc = LispAddr::from(self.socket.local_addr()?.ip());
        Ok(ControlDatagram {
            payload: Bytes::from(buf),
            local_rloc,
            remote_port: peer.port(),
        })
    }
}

/// Routes received control messages to their handlers.
///
/// The dispatcher carries no state across messages. The configuration it
/// holds is read-only; reconfiguring means building a new dispatcher with a
/// new [`ControlConfig`].
pub struct Dispatcher<S, H> {
    sock_v4: Option<S>,
    sock_v6: Option<S>,
    handlers: H,
    config: ControlConfig,
}

impl<S, H> Dispatcher<S, H>
where
    S: ControlSocket,
    H: ControlHandlers,
{
    /// Create a new `Dispatcher` over up to one control socket per family.
    pub fn new(
        sock_v4: Option<S>,
        sock_v6: Option<S>,
        handlers: H,
        config: ControlConfig,
    ) -> Self {
        Dispatcher {
            sock_v4,
            sock_v6,
            handlers,
            config,
        }
    }

    /// The active control-plane configuration.
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Run the dispatch loop until `cancellation` fires.
    ///
    /// Per-message failures, whether in the socket layer or in a handler,
    /// are logged and the message dropped; the loop itself only ends through
    /// cancellation.
    pub async fn run(self, cancellation: CancellationToken) {
        if self.sock_v4.is_none() && self.sock_v6.is_none() {
            warn!("Dispatch loop started without any control socket");
        }
        loop {
            let datagram = tokio::select! {
                _ = cancellation.cancelled() => {
                    debug!("Control dispatch loop shutting down");
                    return;
                }
                datagram = recv_on(self.sock_v4.as_ref()) => datagram,
                datagram = recv_on(self.sock_v6.as_ref()) => datagram,
            };
            match datagram {
                Ok(datagram) => dispatch(&self.handlers, &datagram),
                Err(e) => {
                    // This message is lost, the socket stays in the loop.
                    warn!("Failed to receive control message: {e}");
                }
            }
        }
    }
}

/// Receive on a socket which may not be configured; an absent socket simply
/// never becomes ready.
async fn recv_on<S: ControlSocket>(sock: Option<&S>) -> Result<ControlDatagram, ReceiveError> {
    match sock {
        Some(sock) => sock.receive().await,
        None => std::future::pending().await,
    }
}

/// Route one received control message to the matching handler.
///
/// Split out of the loop so the routing table is testable without sockets.
pub fn dispatch<H: ControlHandlers>(handlers: &H, datagram: &ControlDatagram) {
    trace!("Received a LISP control message");

    let msg_type = match MessageType::from_payload(&datagram.payload) {
        Some(msg_type) => msg_type,
        None => {
            debug!("Unidentified type control message received");
            return;
        }
    };

    debug!("Received a LISP {msg_type} message");

    let res = match msg_type {
        // The encapsulation wrapper of an ECM is unwrapped by the
        // Map-Request handler itself.
        MessageType::MapRequest | MessageType::EncapControl => handlers.handle_map_request(
            &datagram.payload,
            datagram.local_rloc,
            datagram.remote_port,
        ),
        MessageType::MapReply => handlers.handle_map_reply(&datagram.payload),
        MessageType::MapRegister => {
            // This node is never a map server.
            trace!("Ignoring Map-Register");
            Ok(())
        }
        MessageType::MapNotify => handlers.handle_map_notify(&datagram.payload),
        MessageType::MapReferral => handlers.handle_map_referral(&datagram.payload),
        MessageType::InfoNat => {
            handlers.handle_info_nat(&datagram.payload, datagram.local_rloc)
        }
    };

    if let Err(e) = res {
        warn!("Dropping {msg_type} message after handler failure: {e}");
    } else {
        trace!("Completed processing of LISP control message");
    }
}

impl fmt::Display for ReceiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("socket receive failed: {}", self.inner))
    }
}

impl std::error::Error for ReceiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl From<io::Error> for ReceiveError {
    fn from(value: io::Error) -> Self {
        ReceiveError { inner: value }
    }
}
