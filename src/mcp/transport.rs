use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::mcp::{
    errors::{MCPError, MCPResult, TransportError},
    protocol::{MCPMessage, MessageParser},
};

/// One inbound line: a parsed message, or the reason it could not be parsed
pub type Incoming = MCPResult<MCPMessage>;

/// Message transport used by the server loop
#[async_trait]
pub trait MCPTransport: Send {
    /// Next inbound message; `None` once the peer has closed its side
    async fn receive(&mut self) -> Option<Incoming>;

    /// Handle for sending responses, cloneable into spawned call tasks
    fn sender(&self) -> MessageSender;

    /// Stop accepting outbound messages and flush what is queued
    async fn close(&mut self) -> MCPResult<()>;

    fn is_connected(&self) -> bool;
}

/// Cloneable outbound half of a transport
#[derive(Debug, Clone)]
pub struct MessageSender {
    sender: mpsc::UnboundedSender<MCPMessage>,
    is_connected: Arc<AtomicBool>,
}

impl MessageSender {
    pub fn send(&self, message: MCPMessage) -> MCPResult<()> {
        if !self.is_connected.load(Ordering::Acquire) {
            return Err(MCPError::Transport(TransportError::ConnectionLost(
                "Output stream is closed".to_string(),
            )));
        }

        self.sender.send(message).map_err(|_| {
            MCPError::Transport(TransportError::ConnectionLost(
                "Output channel closed".to_string(),
            ))
        })
    }
}

/// Newline-delimited JSON-RPC over a pair of byte streams.
///
/// Production uses stdin/stdout; tests plug in `tokio::io::duplex`.
pub struct StdioTransport {
    sender: Option<MessageSender>,
    receiver: mpsc::UnboundedReceiver<Incoming>,
    writer_task: Option<JoinHandle<()>>,
    is_connected: Arc<AtomicBool>,
}

impl StdioTransport {
    /// Transport over the process's own stdin and stdout
    pub fn stdio() -> Self {
        Self::from_io(tokio::io::stdin(), tokio::io::stdout())
    }

    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (msg_sender, msg_receiver) = mpsc::unbounded_channel();
        let (response_sender, response_receiver) = mpsc::unbounded_channel();
        let is_connected = Arc::new(AtomicBool::new(true));

        let writer_task = tokio::spawn(write_loop(writer, response_receiver, is_connected.clone()));
        tokio::spawn(read_loop(reader, msg_sender));

        Self {
            sender: Some(MessageSender {
                sender: response_sender,
                is_connected: is_connected.clone(),
            }),
            receiver: msg_receiver,
            writer_task: Some(writer_task),
            is_connected,
        }
    }
}

async fn read_loop<R>(reader: R, messages: mpsc::UnboundedSender<Incoming>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => {
                debug!("Input stream reached EOF");
                break;
            }
            Ok(_) => {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                let parsed = MessageParser::parse_message(&line);
                if let Err(e) = &parsed {
                    warn!("Failed to parse inbound message: {}", e);
                }
                if messages.send(parsed).is_err() {
                    warn!("Receiver dropped, closing input stream");
                    break;
                }
            }
            Err(e) => {
                error!("Failed to read input stream: {}", e);
                break;
            }
        }
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut responses: mpsc::UnboundedReceiver<MCPMessage>,
    is_connected: Arc<AtomicBool>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = responses.recv().await {
        let mut data = match MessageParser::serialize_message(&message) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to serialize message: {}", e);
                continue;
            }
        };
        data.push(b'\n');

        let written = async {
            writer.write_all(&data).await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            error!("Failed to write to output stream: {}", e);
            is_connected.store(false, Ordering::Release);
            break;
        }
    }
    let _ = writer.shutdown().await;
}

#[async_trait]
impl MCPTransport for StdioTransport {
    async fn receive(&mut self) -> Option<Incoming> {
        self.receiver.recv().await
    }

    fn sender(&self) -> MessageSender {
        match &self.sender {
            Some(sender) => sender.clone(),
            None => {
                // Closed: hand out a sender whose messages are refused.
                let (sender, _) = mpsc::unbounded_channel();
                MessageSender {
                    sender,
                    is_connected: Arc::new(AtomicBool::new(false)),
                }
            }
        }
    }

    async fn close(&mut self) -> MCPResult<()> {
        self.sender = None;
        if let Some(task) = self.writer_task.take() {
            task.await.map_err(|e| {
                MCPError::Transport(TransportError::ConnectionLost(format!("writer task failed: {}", e)))
            })?;
        }
        self.is_connected.store(false, Ordering::Release);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Acquire)
    }
}
