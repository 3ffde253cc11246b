//! Dial and listen convenience wrappers.
//!
//! Thin adapters over tokio and tokio-rustls for callers that just want an
//! authenticated stream from a textual connection key. The authentication
//! guarantees live entirely in the configuration assembly; these wrappers
//! add nothing beyond TCP plumbing and can be bypassed by consuming
//! [`ClientTlsConfig`] and [`ServerTlsConfig`] directly.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_rustls::{client, server, TlsAcceptor, TlsConnector};
use tracing::debug;

use crate::error::Result;
use crate::key::ConnectionKey;
use crate::tls::{ClientTlsConfig, ServerTlsConfig};

/// Connect to `addr` and complete a mutually authenticated handshake.
///
/// The key is parsed from its textual form; the server is expected to
/// present a leaf for the default server name.
pub async fn dial<A: ToSocketAddrs>(
    addr: A,
    key: &str,
) -> Result<client::TlsStream<TcpStream>> {
    let key = ConnectionKey::parse(key)?;
    let (config, server_name) = ClientTlsConfig::new(&key)?.into_parts();

    let stream = TcpStream::connect(addr).await?;
    let connector = TlsConnector::from(Arc::new(config));
    let stream = connector.connect(server_name, stream).await?;

    debug!(
        peer = %stream.get_ref().0.peer_addr()?,
        "TLS connection established"
    );

    Ok(stream)
}

/// A TCP listener that requires a mutually authenticated handshake from
/// every connection it accepts.
pub struct TlsListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

/// Bind `addr` and accept connections authenticated by `key`.
///
/// The key is parsed from its textual form. Bind to port 0 to let the OS
/// pick a port; [`TlsListener::local_addr`] reports the bound address.
pub async fn listen<A: ToSocketAddrs>(addr: A, key: &str) -> Result<TlsListener> {
    let key = ConnectionKey::parse(key)?;
    let tls = ServerTlsConfig::new(&key)?;

    let listener = TcpListener::bind(addr).await?;
    debug!(addr = %listener.local_addr()?, "listening for TLS connections");

    Ok(TlsListener {
        listener,
        acceptor: TlsAcceptor::from(Arc::new(tls.into_config())),
    })
}

impl TlsListener {
    /// Accept the next connection and drive the handshake to completion.
    ///
    /// Fails when the peer cannot authenticate; the listener stays usable,
    /// so callers typically keep accepting in a loop.
    pub async fn accept(&self) -> Result<(server::TlsStream<TcpStream>, SocketAddr)> {
        let (stream, peer_addr) = self.listener.accept().await?;
        let stream = self.acceptor.accept(stream).await?;

        debug!(peer = %peer_addr, "TLS connection accepted");

        Ok((stream, peer_addr))
    }

    /// The local address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
