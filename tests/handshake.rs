//! End-to-end handshake tests.
//!
//! The two sides are wired up over an in-memory duplex pipe, so these tests
//! exercise the real rustls handshake without touching the network. The
//! dial/listen wrappers get a separate test over a localhost socket.

use std::io;
use std::sync::Arc;

use kbtls::{ClientTlsConfig, ConnectionKey, Error, ServerTlsConfig};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
use tokio_rustls::{TlsAcceptor, TlsConnector};

fn distinct_keys() -> (ConnectionKey, ConnectionKey) {
    let k1 = ConnectionKey::generate().unwrap();
    let k2 = ConnectionKey::generate().unwrap();
    assert_ne!(k1, k2, "generated the same key twice");
    (k1, k2)
}

/// Run a handshake between the given configs over an in-memory pipe. The
/// server reads four bytes and echoes `pong`; the client sends `test` and
/// reads the reply.
async fn run_handshake(
    client_cfg: &ClientTlsConfig,
    server_cfg: &ServerTlsConfig,
) -> (io::Result<[u8; 4]>, io::Result<[u8; 4]>) {
    let (client_io, server_io) = duplex(16 * 1024);

    let acceptor = TlsAcceptor::from(Arc::new(server_cfg.config().clone()));
    let server = tokio::spawn(async move {
        let mut stream = acceptor.accept(server_io).await?;

        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await?;
        stream.write_all(b"pong").await?;
        stream.flush().await?;

        io::Result::Ok(buf)
    });

    let client = async {
        let connector = TlsConnector::from(Arc::new(client_cfg.config().clone()));
        let mut stream = connector
            .connect(client_cfg.server_name().clone(), client_io)
            .await?;

        stream.write_all(b"test").await?;
        stream.flush().await?;

        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await?;

        io::Result::Ok(buf)
    };

    let client_result = client.await;
    let server_result = server.await.unwrap();

    (client_result, server_result)
}

#[tokio::test]
async fn handshake_succeeds_with_equal_keys() {
    let key = ConnectionKey::generate().unwrap();

    let client_cfg = ClientTlsConfig::new(&key).unwrap();
    let server_cfg = ServerTlsConfig::new(&key).unwrap();

    let (client_result, server_result) = run_handshake(&client_cfg, &server_cfg).await;

    assert_eq!(&server_result.unwrap(), b"test");
    assert_eq!(&client_result.unwrap(), b"pong");
}

#[tokio::test]
async fn handshake_fails_with_different_keys() {
    let (client_key, server_key) = distinct_keys();

    let client_cfg = ClientTlsConfig::new(&client_key).unwrap();
    let server_cfg = ServerTlsConfig::new(&server_key).unwrap();

    let (client_result, server_result) = run_handshake(&client_cfg, &server_cfg).await;

    assert!(client_result.is_err(), "client accepted a foreign CA");
    assert!(server_result.is_err(), "server accepted a foreign CA");
}

#[tokio::test]
async fn handshake_fails_with_different_keys_and_matching_name() {
    // Pinning is by CA, not by name: a server that knows the right name but
    // holds the wrong key must still be rejected.
    let (client_key, server_key) = distinct_keys();

    let client_cfg = ClientTlsConfig::for_server_name(&client_key, "test").unwrap();
    let server_cfg = ServerTlsConfig::for_server_name(&server_key, "test").unwrap();

    let (client_result, server_result) = run_handshake(&client_cfg, &server_cfg).await;

    assert!(client_result.is_err());
    assert!(server_result.is_err());
}

#[tokio::test]
async fn handshake_fails_on_server_name_mismatch() {
    // Same key on both sides, but the server's leaf was issued for the
    // default name while the client pins "test".
    let key = ConnectionKey::generate().unwrap();

    let client_cfg = ClientTlsConfig::for_server_name(&key, "test").unwrap();
    let server_cfg = ServerTlsConfig::new(&key).unwrap();

    let (client_result, server_result) = run_handshake(&client_cfg, &server_cfg).await;

    let client_err = client_result.unwrap_err();
    assert!(
        client_err.to_string().contains("NotValidForName"),
        "expected a name mismatch, got: {client_err}"
    );
    assert!(server_result.is_err());
}

#[tokio::test]
async fn handshake_fails_without_client_certificate() {
    // A client that trusts the derived CA but presents no certificate of its
    // own must be turned away; client authentication is mandatory.
    let key = ConnectionKey::generate().unwrap();
    let server_cfg = ServerTlsConfig::new(&key).unwrap();

    let ca = kbtls::CertificateAuthority::generate(&key).unwrap();
    let mut roots = rustls::RootCertStore::empty();
    roots.add(ca.cert_der().clone()).unwrap();

    let anon_config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_root_certificates(roots)
    .with_no_client_auth();

    let (client_io, server_io) = duplex(16 * 1024);

    let acceptor = TlsAcceptor::from(Arc::new(server_cfg.into_config()));
    let server = tokio::spawn(async move {
        let mut stream = acceptor.accept(server_io).await?;
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await?;
        io::Result::Ok(())
    });

    // In TLS 1.3 the client may believe the handshake finished before the
    // server has judged its (absent) certificate, so the rejection can also
    // surface on the first read.
    let client_result: io::Result<()> = async {
        let connector = TlsConnector::from(Arc::new(anon_config));
        let mut stream = connector
            .connect(rustls::pki_types::ServerName::try_from("localhost").unwrap(), client_io)
            .await?;
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await?;
        Ok(())
    }
    .await;

    assert!(server.await.unwrap().is_err());
    assert!(client_result.is_err());
}

#[tokio::test]
async fn dial_and_listen_roundtrip() {
    let key = ConnectionKey::generate().unwrap();

    let listener = kbtls::listen("localhost:0", &key.to_string()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let key_text = key.to_string();
    let client = tokio::spawn(async move {
        let mut stream = kbtls::dial(addr, &key_text).await?;
        stream.write_all(b"test").await?;
        stream.flush().await?;
        stream.shutdown().await?;
        kbtls::Result::Ok(())
    });

    let (mut stream, _peer) = listener.accept().await.unwrap();

    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"test");

    client.await.unwrap().unwrap();
}

#[tokio::test]
async fn dial_fails_with_wrong_key() {
    let (client_key, server_key) = distinct_keys();

    let listener = kbtls::listen("localhost:0", &server_key.to_string())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let client_text = client_key.to_string();
    let client = tokio::spawn(async move { kbtls::dial(addr, &client_text).await.map(|_| ()) });

    assert!(listener.accept().await.is_err());
    assert!(client.await.unwrap().is_err());
}

#[tokio::test]
async fn zero_key_is_rejected_before_any_socket() {
    let zero_text = "A".repeat(43);

    assert!(matches!(
        kbtls::listen("localhost:0", &zero_text).await,
        Err(Error::ZeroKey)
    ));
    assert!(matches!(
        kbtls::dial("localhost:1", &zero_text).await,
        Err(Error::ZeroKey)
    ));
}

#[tokio::test]
async fn handshake_is_stable_across_config_rebuilds() {
    // Rebuilding the configs from the same key must keep interoperating;
    // nothing about the derivation depends on process state.
    let key = ConnectionKey::generate().unwrap();

    for _ in 0..3 {
        let client_cfg = ClientTlsConfig::new(&key).unwrap();
        let server_cfg = ServerTlsConfig::new(&key).unwrap();

        let (client_result, server_result) = run_handshake(&client_cfg, &server_cfg).await;
        assert!(client_result.is_ok());
        assert!(server_result.is_ok());
    }
}
