use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};

use super::protocol::{self, CommandStatus, Reply};
use crate::config::TplSettings;
use crate::dome_control::{paths, CommandId, DeviceLink, TplValue};
use crate::util::*;

const RETRY_MILLIS: u64 = 100;
const REPLY_POLL: Duration = Duration::from_millis(10);

/// What the server has told us so far about one request
#[derive(Debug, Default)]
struct CommandRecord {
    done: bool,
    /// Dropped as soon as it is done, nobody will poll it
    abandoned: bool,
    value: Option<TplValue>,
    error: Option<String>,
}

type Records = Arc<Mutex<HashMap<u32, CommandRecord>>>;

fn lock(records: &Records) -> MutexGuard<'_, HashMap<u32, CommandRecord>> {
    records.lock().unwrap_or_else(PoisonError::into_inner)
}

fn link_error(message: String) -> DomeError {
    DomeError::from_msg(DomeErrorType::Link, message)
}

/// Device link over a TPL2 TCP connection.
/// A background task reads every reply and files it under its command id.
pub struct TplClient {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    records: Records,
    next_id: AtomicU32,
    reader: JoinHandle<()>,
    timeout: Duration,
}

impl TplClient {
    pub async fn connect(settings: &TplSettings) -> DomeResult<TplClient> {
        let stream = Self::open_stream(settings).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let greeting = Self::next_line(&mut lines, settings.timeout()).await?;
        if !protocol::is_greeting(&greeting) {
            return Err(link_error(format!("Unexpected greeting: {}", greeting)));
        }
        debug!("[tpl] {}", greeting);

        write_half
            .write_all(protocol::format_auth(&settings.user, &settings.password).as_bytes())
            .await?;
        let auth = Self::next_line(&mut lines, settings.timeout()).await?;
        if !protocol::is_auth_ok(&auth) {
            return Err(link_error(format!("Authentication failed: {}", auth)));
        }
        info!("Logged in to TPL server {}:{}", settings.host, settings.port);

        let records = Records::default();
        let reader = tokio::spawn(read_replies(lines, records.clone()));

        Ok(TplClient {
            writer: tokio::sync::Mutex::new(write_half),
            records,
            next_id: AtomicU32::new(1),
            reader,
            timeout: settings.timeout(),
        })
    }

    async fn open_stream(settings: &TplSettings) -> DomeResult<TcpStream> {
        let addr = format!("{}:{}", settings.host, settings.port);
        let mut delays = retry::delay::Exponential::from_millis(RETRY_MILLIS)
            .take(settings.connect_tries.saturating_sub(1) as usize);

        loop {
            let reason = match time::timeout(settings.timeout(), TcpStream::connect(&addr)).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => e.to_string(),
                Err(_) => "connection timed out".to_string(),
            };

            match delays.next() {
                Some(delay) => {
                    warn!("Could not connect to {}: {} -- Retrying", addr, reason);
                    time::sleep(delay).await;
                }
                None => {
                    return Err(link_error(format!(
                        "Could not connect to {}: {}",
                        addr, reason
                    )))
                }
            }
        }
    }

    async fn next_line(
        lines: &mut Lines<BufReader<OwnedReadHalf>>,
        timeout: Duration,
    ) -> DomeResult<String> {
        match time::timeout(timeout, lines.next_line()).await {
            Ok(Ok(Some(line))) => Ok(line),
            Ok(Ok(None)) => Err(link_error("Server closed the connection".to_string())),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(link_error("Server did not answer".to_string())),
        }
    }

    async fn send(&self, request: impl FnOnce(u32) -> String + Send) -> DomeResult<u32> {
        if self.reader.is_finished() {
            return Err(link_error("Connection to TPL server is closed".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.records).insert(id, CommandRecord::default());

        let line = request(id);
        trace!("[tpl] > {}", line.trim_end());
        if let Err(e) = self.writer.lock().await.write_all(line.as_bytes()).await {
            lock(&self.records).remove(&id);
            return Err(e.into());
        }
        Ok(id)
    }

    fn take_if_done(&self, id: u32) -> Option<CommandRecord> {
        let mut records = lock(&self.records);
        match records.get(&id) {
            Some(record) if record.done => records.remove(&id),
            _ => None,
        }
    }
}

#[async_trait]
impl DeviceLink for TplClient {
    async fn read(&self, path: &str) -> DomeResult<Option<TplValue>> {
        let id = self.send(|id| protocol::format_get(id, path)).await?;
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(record) = self.take_if_done(id) {
                if let Some(error) = record.error {
                    debug!("[tpl] GET {} failed: {}", path, error);
                    return Ok(None);
                }
                return Ok(record.value);
            }
            if self.reader.is_finished() {
                return Err(link_error(format!(
                    "Connection closed while reading {}",
                    path
                )));
            }
            if Instant::now() > deadline {
                lock(&self.records).remove(&id);
                return Err(link_error(format!("No answer reading {}", path)));
            }
            time::sleep(REPLY_POLL).await;
        }
    }

    async fn write_async(&self, path: &str, value: TplValue) -> DomeResult<CommandId> {
        let id = self
            .send(|id| protocol::format_set(id, path, &value))
            .await?;
        Ok(CommandId(id))
    }

    /// Ids the client no longer tracks count as complete
    async fn is_complete(&self, cmd: CommandId) -> DomeResult<bool> {
        if !lock(&self.records).contains_key(&cmd.0) {
            return Ok(true);
        }
        if let Some(record) = self.take_if_done(cmd.0) {
            return match record.error {
                Some(error) => Err(link_error(format!(
                    "Command {} rejected: {}",
                    cmd.0, error
                ))),
                None => Ok(true),
            };
        }
        if self.reader.is_finished() {
            return Err(link_error(format!(
                "Connection closed before command {} completed",
                cmd.0
            )));
        }
        Ok(false)
    }

    async fn forget(&self, cmd: CommandId) {
        let mut records = lock(&self.records);
        let done = match records.get_mut(&cmd.0) {
            Some(record) => {
                record.abandoned = true;
                record.done
            }
            None => return,
        };
        if done {
            records.remove(&cmd.0);
        }
    }

    async fn probe_live(&self) -> bool {
        if self.reader.is_finished() {
            return false;
        }
        matches!(self.read(paths::SERVER_UPTIME).await, Ok(Some(_)))
    }
}

impl Drop for TplClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_replies(mut lines: Lines<BufReader<OwnedReadHalf>>, records: Records) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                trace!("[tpl] < {}", line);
                file_reply(&records, protocol::parse_reply(&line));
            }
            Ok(None) => {
                warn!("TPL server closed the connection");
                return;
            }
            Err(e) => {
                warn!("Reading from TPL server failed: {}", e);
                return;
            }
        }
    }
}

fn file_reply(records: &Records, reply: Reply) {
    let mut records = lock(records);
    let (id, record) = match reply.id().and_then(|id| Some((id, records.get_mut(&id)?))) {
        Some(entry) => entry,
        None => {
            trace!("[tpl] unsolicited {:?}", reply);
            return;
        }
    };

    match reply {
        Reply::Command { status, .. } => match status {
            CommandStatus::Ok => {}
            CommandStatus::Complete => record.done = true,
            CommandStatus::Error => {
                record.done = true;
                record
                    .error
                    .get_or_insert_with(|| "rejected by server".to_string());
            }
        },
        Reply::Data { value, .. } => record.value = Some(value),
        Reply::Event { kind, text, .. } => {
            if kind == "ERROR" {
                record.error = Some(text);
            }
        }
        Reply::Unknown(_) => {}
    }

    if record.done && record.abandoned {
        if let Some(error) = &record.error {
            warn!("TPL command {} failed: {}", id, error);
        }
        records.remove(&id);
    }
}
