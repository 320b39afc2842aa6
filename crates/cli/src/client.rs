// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket client for talking to quedod.

use crate::exit_error::ExitError;
use quedo_daemon::protocol::{decode_response, encode, Request, Response};
use quedo_daemon::{env, lifecycle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub struct DaemonClient {
    config: lifecycle::DaemonConfig,
}

impl DaemonClient {
    pub fn new() -> Result<Self, ExitError> {
        let config = lifecycle::DaemonConfig::load()
            .map_err(|e| ExitError::io(format!("cannot resolve paths: {e}")))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &lifecycle::DaemonConfig {
        &self.config
    }

    /// True when something answers a ping on the socket.
    pub async fn is_running(&self) -> bool {
        matches!(self.request(Request::Ping).await, Ok(Response::Pong))
    }

    /// One request/response exchange with the IPC timeout applied.
    pub async fn request(&self, request: Request) -> Result<Response, ExitError> {
        let exchange = async {
            let stream = UnixStream::connect(&self.config.socket_path).await.map_err(|_| {
                ExitError::unavailable("quedod is not running (try `quedo start`)")
            })?;
            let (read_half, mut write_half) = stream.into_split();

            let mut line = encode(&request)
                .map_err(|e| ExitError::io(format!("encode failed: {e}")))?;
            line.push('\n');
            write_half
                .write_all(line.as_bytes())
                .await
                .map_err(|e| ExitError::io(format!("socket write failed: {e}")))?;

            let mut reader = BufReader::new(read_half).lines();
            let reply = reader
                .next_line()
                .await
                .map_err(|e| ExitError::io(format!("socket read failed: {e}")))?
                .ok_or_else(|| ExitError::unavailable("quedod closed the connection"))?;
            decode_response(&reply)
                .map_err(|e| ExitError::io(format!("bad response from quedod: {e}")))
        };

        match tokio::time::timeout(env::ipc_timeout(), exchange).await {
            Ok(result) => result,
            Err(_) => Err(ExitError::unavailable("quedod did not answer in time")),
        }
    }

    /// Request variant that surfaces daemon-side errors as data errors.
    pub async fn expect_ok(&self, request: Request) -> Result<Response, ExitError> {
        match self.request(request).await? {
            Response::Error { message } => Err(ExitError::data(message)),
            response => Ok(response),
        }
    }
}
