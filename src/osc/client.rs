//! UDP client speaking the server's run/stop OSC surface.

use std::io;
use std::net::UdpSocket;
use std::path::Path;

use rosc::{encoder, OscMessage, OscPacket, OscType};

use crate::discovery::{discover, ConnectionParams};

use super::CLIENT_ID;

/// Fire-and-forget OSC client bound to a discovered server.
///
/// Messages go to the loopback address only; the server rejects non-local
/// senders anyway. The first argument of every message identifies the
/// client: v4 servers expect the auth token from their log, v3 servers a
/// plain string id.
#[derive(Debug)]
pub struct SonicPiClient {
    socket: UdpSocket,
    params: ConnectionParams,
}

impl SonicPiClient {
    /// Discover a running server from its logs and bind a socket to it.
    /// `log_dir` of `None` uses the default per-user log location.
    pub fn connect(log_dir: Option<&Path>) -> io::Result<Self> {
        let params = discover(log_dir).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "no running server found in log directory",
            )
        })?;
        Self::with_params(params)
    }

    /// Bind a client to known connection parameters.
    pub fn with_params(params: ConnectionParams) -> io::Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        Ok(SonicPiClient { socket, params })
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Submit a code string for immediate execution.
    pub fn run_code(&self, code: &str) -> io::Result<()> {
        self.send(
            "/run-code",
            vec![self.identity(), OscType::String(code.to_string())],
        )
    }

    /// Stop every running job on the server.
    pub fn stop_all(&self) -> io::Result<()> {
        self.send("/stop-all-jobs", vec![self.identity()])
    }

    fn identity(&self) -> OscType {
        match self.params.token {
            Some(token) if self.params.protocol_major >= 4 => OscType::Int(token),
            _ => OscType::String(CLIENT_ID.to_string()),
        }
    }

    fn send(&self, addr: &str, args: Vec<OscType>) -> io::Result<()> {
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let bytes = encoder::encode(&packet)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.socket
            .send_to(&bytes, ("127.0.0.1", self.params.port))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::decoder;

    fn local_receiver() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    fn recv_message(socket: &UdpSocket) -> OscMessage {
        let mut buf = [0u8; 4096];
        let (len, _) = socket.recv_from(&mut buf).unwrap();
        match decoder::decode_udp(&buf[..len]).unwrap().1 {
            OscPacket::Message(msg) => msg,
            other => panic!("expected message, got {other:?}"),
        }
    }

    fn v4_params(port: u16) -> ConnectionParams {
        ConnectionParams {
            port,
            token: Some(12345),
            version: "4.5.1".to_string(),
            protocol_major: 4,
        }
    }

    fn v3_params(port: u16) -> ConnectionParams {
        ConnectionParams {
            port,
            token: None,
            version: "3.3.1".to_string(),
            protocol_major: 3,
        }
    }

    #[test]
    fn run_code_sends_token_and_source_on_v4() {
        let (receiver, port) = local_receiver();
        let client = SonicPiClient::with_params(v4_params(port)).unwrap();
        client.run_code("play 60").unwrap();
        let msg = recv_message(&receiver);
        assert_eq!(msg.addr, "/run-code");
        assert_eq!(msg.args.len(), 2);
        assert_eq!(msg.args[0], OscType::Int(12345));
        assert_eq!(msg.args[1], OscType::String("play 60".to_string()));
    }

    #[test]
    fn run_code_sends_client_id_on_v3() {
        let (receiver, port) = local_receiver();
        let client = SonicPiClient::with_params(v3_params(port)).unwrap();
        client.run_code("sleep 1").unwrap();
        let msg = recv_message(&receiver);
        assert_eq!(msg.args[0], OscType::String(CLIENT_ID.to_string()));
    }

    #[test]
    fn stop_all_sends_identity_only() {
        let (receiver, port) = local_receiver();
        let client = SonicPiClient::with_params(v4_params(port)).unwrap();
        client.stop_all().unwrap();
        let msg = recv_message(&receiver);
        assert_eq!(msg.addr, "/stop-all-jobs");
        assert_eq!(msg.args, vec![OscType::Int(12345)]);
    }

    #[test]
    fn connect_fails_cleanly_without_logs() {
        let dir = tempfile::tempdir().unwrap();
        let err = SonicPiClient::connect(Some(dir.path())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
