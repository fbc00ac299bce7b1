use std::net::SocketAddr;

use tokio::net::TcpListener;

/// A server that accepts connections and never answers them.
///
/// Accepted sockets are kept open for the life of the test runtime so the
/// client waits on a response instead of seeing a reset.
pub async fn silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}
