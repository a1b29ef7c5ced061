//! Integration tests for the WebSocket connector.
//!
//! Each test spins up a bare `tokio-tungstenite` server on an ephemeral
//! port and points the connector at it, so real frames cross a real socket.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use lavaforge_transport::{
        ConnectRequest, Connection, Connector, TransportError,
        WebSocketConnector,
    };
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::handshake::server::{
        ErrorResponse, Request, Response,
    };
    use tokio_tungstenite::tungstenite::Message;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        (listener, format!("ws://{addr}"))
    }

    #[tokio::test]
    async fn test_connect_sends_headers_and_exchanges_text() {
        let (listener, url) = listener().await;
        let (header_tx, header_rx) = oneshot::channel::<Option<String>>();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| {
                let auth = req
                    .headers()
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let _ = header_tx.send(auth);
                Ok::<_, ErrorResponse>(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                .await
                .unwrap();

            // Echo one frame back, then close.
            let msg = ws.next().await.unwrap().unwrap();
            assert!(msg.is_text(), "client must send text frames");
            ws.send(msg).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let request = ConnectRequest::new(&url).header("Authorization", "pw");
        let conn = WebSocketConnector
            .connect(&request)
            .await
            .expect("should connect");

        assert_eq!(header_rx.await.unwrap().as_deref(), Some("pw"));
        assert!(conn.id().into_inner() > 0);

        conn.send(br#"{"op":"stop","guildId":"1"}"#)
            .await
            .expect("send should succeed");
        let echoed = conn.recv().await.expect("recv ok").expect("has data");
        assert_eq!(echoed, br#"{"op":"stop","guildId":"1"}"#);

        // Server closed: clean end of stream.
        let end = conn.recv().await.expect("recv should not error");
        assert!(end.is_none());

        // Nothing goes out once the close frame arrived.
        let after = conn.send(br#"{"op":"stop","guildId":"1"}"#).await;
        assert!(matches!(after, Err(TransportError::ConnectionClosed(_))));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_rejected_handshake_reports_status() {
        let (listener, url) = listener().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = |_req: &Request, _resp: Response| {
                let reject = tokio_tungstenite::tungstenite::http::Response::builder()
                    .status(401)
                    .body(None)
                    .unwrap();
                Err::<Response, ErrorResponse>(reject)
            };
            let _ = tokio_tungstenite::accept_hdr_async(stream, callback).await;
        });

        let result = WebSocketConnector
            .connect(&ConnectRequest::new(&url).header("Authorization", "bad"))
            .await;

        assert!(
            matches!(result, Err(TransportError::HandshakeRejected(401))),
            "expected 401 rejection, got {:?}",
            result.err()
        );
    }

    #[tokio::test]
    async fn test_connect_nothing_listening_fails() {
        // Bind then drop to get a port that is (almost certainly) closed.
        let (listener, url) = listener().await;
        drop(listener);

        let result = WebSocketConnector.connect(&ConnectRequest::new(&url)).await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }

    #[tokio::test]
    async fn test_connect_invalid_header_value_is_rejected_locally() {
        let request =
            ConnectRequest::new("ws://127.0.0.1:1").header("Authorization", "a\nb");
        let result = WebSocketConnector.connect(&request).await;
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_recv_skips_ping_frames() {
        let (listener, url) = listener().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Ping(vec![1, 2].into())).await.unwrap();
            ws.send(Message::text(r#"{"op":"stats"}"#)).await.unwrap();
            // Keep the socket open until the client is done reading.
            let _ = ws.next().await;
        });

        let conn = WebSocketConnector
            .connect(&ConnectRequest::new(&url))
            .await
            .expect("should connect");
        let data = conn.recv().await.unwrap().unwrap();
        assert_eq!(data, br#"{"op":"stats"}"#);
        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_send_after_local_close_is_rejected() {
        let (listener, url) = listener().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let conn = WebSocketConnector
            .connect(&ConnectRequest::new(&url))
            .await
            .expect("should connect");
        conn.close().await.expect("close should succeed");

        let result = conn.send(b"{}").await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }

    #[cfg(feature = "tls")]
    #[tokio::test]
    async fn test_secure_url_attempts_tls_handshake() {
        let (listener, url) = listener().await;
        let url = url.replacen("ws://", "wss://", 1);

        // A plain TCP peer that hangs up: the TLS handshake fails, which
        // proves the client tried one.
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let result = WebSocketConnector.connect(&ConnectRequest::new(&url)).await;
        assert!(
            matches!(result, Err(TransportError::ConnectFailed(_))),
            "expected a failed TLS handshake, got {:?}",
            result.err()
        );
    }
}
