//! Connection driver.
//!
//! A [`Client`] owns both halves of a caller-supplied byte stream. [`Client::run`]
//! reads CR LF framed lines, decodes them and hands each message to every
//! registered handler that accepts it. Each accepted handler runs in its own
//! spawned task, which the loop never awaits. The loop also listens for two
//! control signals:
//!
//! - **warning**: logged, the loop keeps going;
//! - **fatal**: latched as the client's error, the loop stops reading.
//!
//! When the loop ends, for whatever reason, the completion signal fires once
//! and [`Client::done`] resolves for every waiter.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::irc::error::ClientError;
use crate::irc::framer::{self, LineCodec};
use crate::irc::handlers::HandlerRegistry;
use crate::irc::message::Message;

type Reader = FramedRead<Box<dyn AsyncRead + Send + Unpin>, LineCodec>;
type Writer = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, LineCodec>;

/// Fires the completion signal when dropped, including when `run` is
/// cancelled mid-loop.
struct CompletionGuard<'a>(&'a watch::Sender<bool>);

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

struct SignalReceivers {
    warn: mpsc::Receiver<ClientError>,
    fatal: mpsc::Receiver<ClientError>,
}

/// An IRC connection over any async duplex byte stream.
pub struct Client {
    handlers: HandlerRegistry,
    writer: tokio::sync::Mutex<Writer>,
    // Both taken by the first `run`.
    reader: Mutex<Option<Reader>>,
    signals: Mutex<Option<SignalReceivers>>,
    warn_tx: mpsc::Sender<ClientError>,
    fatal_tx: mpsc::Sender<ClientError>,
    done_tx: watch::Sender<bool>,
    error: Mutex<Option<Arc<ClientError>>>,
}

impl Client {
    pub fn new<S>(stream: S, handlers: HandlerRegistry) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_config(stream, handlers, &ClientConfig::default())
    }

    pub fn with_config<S>(stream: S, handlers: HandlerRegistry, config: &ClientConfig) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let read_half: Box<dyn AsyncRead + Send + Unpin> = Box::new(read_half);
        let write_half: Box<dyn AsyncWrite + Send + Unpin> = Box::new(write_half);
        let codec = LineCodec::with_max_len(config.max_line_len);

        let capacity = config.signal_capacity.max(1);
        let (warn_tx, warn) = mpsc::channel(capacity);
        let (fatal_tx, fatal) = mpsc::channel(capacity);
        let (done_tx, _) = watch::channel(false);

        Arc::new(Self {
            handlers,
            writer: tokio::sync::Mutex::new(FramedWrite::new(write_half, codec.clone())),
            reader: Mutex::new(Some(FramedRead::new(read_half, codec))),
            signals: Mutex::new(Some(SignalReceivers { warn, fatal })),
            warn_tx,
            fatal_tx,
            done_tx,
            error: Mutex::new(None),
        })
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Drive the connection until the stream ends, a read fails or a fatal
    /// signal arrives.
    ///
    /// Returns the terminating error, which is also kept for
    /// [`Client::error`]. A clean end of stream is `Ok(())`. Only the first
    /// call runs the loop; later calls fail with
    /// [`ClientError::AlreadyRunning`].
    pub async fn run(self: &Arc<Self>) -> Result<(), Arc<ClientError>> {
        let reader = self.reader.lock().take();
        let signals = self.signals.lock().take();
        let (Some(mut reader), Some(mut signals)) = (reader, signals) else {
            return Err(Arc::new(ClientError::AlreadyRunning));
        };
        let _completion = CompletionGuard(&self.done_tx);

        info!("client loop started");
        let outcome = loop {
            tokio::select! {
                frame = reader.next() => match frame {
                    Some(Ok(line)) => self.dispatch(&line),
                    Some(Err(e)) => break Some(ClientError::Read(e)),
                    None => break None,
                },
                Some(warning) = signals.warn.recv() => {
                    warn!(error = %warning, "warning signal");
                }
                Some(fatal) = signals.fatal.recv() => break Some(fatal),
            }
        };
        drop(signals);
        drop(reader);

        let result = match outcome {
            Some(err) => {
                warn!(error = %err, "client loop terminated");
                let err = Arc::new(err);
                *self.error.lock() = Some(Arc::clone(&err));
                Err(err)
            }
            None => {
                info!("stream closed");
                Ok(())
            }
        };
        result
    }

    fn dispatch(self: &Arc<Self>, line: &[u8]) {
        let msg = match Message::decode(line) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(
                    line = %String::from_utf8_lossy(line),
                    error = %e,
                    "dispatching partially decoded line"
                );
                e.into_partial()
            }
        };
        trace!(message = ?msg, ">>");

        let msg = Arc::new(msg);
        for handler in self.handlers.snapshot() {
            if handler.accepts(&msg) {
                tokio::spawn(handler.act(Arc::clone(self), Arc::clone(&msg)));
            }
        }
    }

    /// Encode `msg` and write it as one CR LF terminated line.
    ///
    /// Concurrent callers are serialized; lines never interleave. Fields
    /// containing CR, LF or NUL are rejected with
    /// [`ProtocolError::IllegalControlChar`](crate::irc::error::ProtocolError::IllegalControlChar).
    pub async fn send(&self, msg: &Message) -> Result<(), ClientError> {
        let line = msg.encode()?;
        trace!(line = %line, "<<");
        self.writer
            .lock()
            .await
            .send(line)
            .await
            .map_err(ClientError::Write)
    }

    /// Write several messages back to back with a single flush.
    ///
    /// Every message is encoded and checked before anything is written, so
    /// a bad message writes nothing.
    pub async fn send_all(&self, msgs: &[Message]) -> Result<(), ClientError> {
        let lines = msgs
            .iter()
            .map(Message::encode)
            .collect::<Result<Vec<_>, _>>()?;
        for line in &lines {
            framer::validate_line(line).map_err(ClientError::Write)?;
        }

        let mut writer = self.writer.lock().await;
        for line in lines {
            trace!(line = %line, "<<");
            writer.feed(line).await.map_err(ClientError::Write)?;
        }
        writer.flush().await.map_err(ClientError::Write)
    }

    /// Report a non-fatal problem. The loop logs it and keeps running.
    pub async fn warn(&self, err: impl Into<ClientError>) {
        if self.warn_tx.send(err.into()).await.is_err() {
            debug!("warning raised after the client loop ended");
        }
    }

    /// Stop the loop with `err` as its terminating error.
    pub async fn fatal(&self, err: impl Into<ClientError>) {
        if self.fatal_tx.send(err.into()).await.is_err() {
            debug!("fatal signal raised after the client loop ended");
        }
    }

    /// Wait until the loop has terminated.
    pub async fn done(&self) {
        let mut rx = self.done_tx.subscribe();
        let _ = rx.wait_for(|finished| *finished).await;
    }

    pub fn is_finished(&self) -> bool {
        *self.done_tx.borrow()
    }

    /// The error the loop terminated with, if any.
    pub fn error(&self) -> Option<Arc<ClientError>> {
        self.error.lock().clone()
    }
}
