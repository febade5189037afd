// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Source RCON client.
//!
//! Wire format, little-endian: `size: i32 | id: i32 | type: i32 | body | 0 | 0`
//! where `size` counts every byte after itself.

use crate::console::{Console, ConsoleSession};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};

const SERVERDATA_AUTH: i32 = 3;
const SERVERDATA_AUTH_RESPONSE: i32 = 2;
const SERVERDATA_EXECCOMMAND: i32 = 2;
const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// id + type + two terminators.
const MIN_PACKET_SIZE: i32 = 10;
const MAX_PACKET_SIZE: i32 = 4096 + MIN_PACKET_SIZE;

pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let size = MIN_PACKET_SIZE.saturating_add(i32::try_from(body.len()).unwrap_or(i32::MAX));
        let mut buf = Vec::with_capacity(size as usize + 4);
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        buf
    }

    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let size = reader.read_i32_le().await.context("reading packet size")?;
        if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&size) {
            bail!("invalid packet size {size}");
        }
        let id = reader.read_i32_le().await?;
        let kind = reader.read_i32_le().await?;
        let mut body = vec![0u8; (size - 8) as usize];
        reader
            .read_exact(&mut body)
            .await
            .context("reading packet body")?;
        // Drop the body and packet terminators.
        while body.last() == Some(&0) {
            body.pop();
        }
        Ok(Self {
            id,
            kind,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// An authenticated RCON connection.
pub struct RconClient {
    stream: TcpStream,
    next_id: i32,
    io_timeout: Duration,
}

impl RconClient {
    pub async fn connect(addr: SocketAddr, password: &str, io_timeout: Duration) -> Result<Self> {
        let stream = timeout(io_timeout, TcpStream::connect(addr))
            .await
            .with_context(|| format!("timed out connecting to {addr}"))?
            .with_context(|| format!("connecting to {addr}"))?;
        let mut client = Self {
            stream,
            next_id: 1,
            io_timeout,
        };
        client.authenticate(password).await?;
        Ok(client)
    }

    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }

    async fn send(&mut self, packet: &Packet) -> Result<()> {
        self.stream
            .write_all(&packet.encode())
            .await
            .context("writing packet")
    }

    async fn receive(&mut self) -> Result<Packet> {
        timeout(self.io_timeout, Packet::read_from(&mut self.stream))
            .await
            .context("timed out waiting for response")?
    }

    async fn authenticate(&mut self, password: &str) -> Result<()> {
        let id = self.allocate_id();
        self.send(&Packet::new(id, SERVERDATA_AUTH, password))
            .await?;
        loop {
            let reply = self.receive().await.context("waiting for auth response")?;
            match reply.kind {
                SERVERDATA_AUTH_RESPONSE if reply.id == -1 => bail!("authentication failed"),
                SERVERDATA_AUTH_RESPONSE if reply.id == id => return Ok(()),
                // Some servers send an empty RESPONSE_VALUE ahead of the auth response.
                SERVERDATA_RESPONSE_VALUE => continue,
                other => bail!("unexpected packet type {other} during authentication"),
            }
        }
    }

    /// Execute `command` and return the first response body.
    pub async fn execute(&mut self, command: &str) -> Result<String> {
        let id = self.allocate_id();
        self.send(&Packet::new(id, SERVERDATA_EXECCOMMAND, command))
            .await?;
        let reply = self.receive().await?;
        if reply.id != id {
            debug!("response id {} does not match request id {id}", reply.id);
        }
        Ok(reply.body)
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await.context("closing connection")
    }
}

#[async_trait]
impl ConsoleSession for RconClient {
    async fn run(&mut self, command: &str) -> Result<String> {
        self.execute(command).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        RconClient::close(*self).await
    }
}

/// Dials servers on the loopback interface.
#[derive(Debug, Clone)]
pub struct RconConsole {
    io_timeout: Duration,
}

impl RconConsole {
    pub fn new(io_timeout: Duration) -> Self {
        Self { io_timeout }
    }
}

impl Default for RconConsole {
    fn default() -> Self {
        Self::new(DEFAULT_IO_TIMEOUT)
    }
}

#[async_trait]
impl Console for RconConsole {
    async fn connect(&self, port: u16, password: &str) -> Result<Box<dyn ConsoleSession>> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let client = RconClient::connect(addr, password, self.io_timeout).await?;
        Ok(Box::new(client))
    }
}
