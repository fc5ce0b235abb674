//! A live IRC client connection implementing [`TransportSession`].
//!
//! Three tasks run per session:
//! - the reader parses inbound lines, answers `PING`, and correlates whois
//!   replies;
//! - the dispatcher hands chat and error events to listeners one at a time;
//! - the writer drains the outbound queue, pacing lines when flood
//!   protection is on.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    futures::{
        SinkExt, StreamExt,
        stream::{SplitSink, SplitStream},
    },
    tokio::{
        net::TcpStream,
        sync::{mpsc, oneshot},
        task::JoinHandle,
    },
    tokio_util::{
        codec::{Framed, LinesCodec, LinesCodecError},
        sync::CancellationToken,
    },
    tracing::{debug, info, trace, warn},
};

use sockbot_provider::{
    ErrorClass, IdentityInfo, ListenerId, ListenerSet, SessionSettings, TransportError,
    TransportEvent, TransportEventKind, TransportListener, TransportSession,
};

use crate::{
    error::{Error, Result},
    message::{self, Message},
};

pub const DEFAULT_PORT: u16 = 6667;

/// Inbound line limit: a 512 byte message plus an IRCv3 tag section.
const MAX_INBOUND_LINE: usize = 8191 + message::MAX_LINE_LEN;

/// How long `disconnect` waits for queued lines and `QUIT` to go out.
const QUIT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

type Connection = Framed<TcpStream, LinesCodec>;
type LineSink = SplitSink<Connection, String>;
type LineSource = SplitStream<Connection>;
type WhoisMap = Arc<Mutex<HashMap<String, PendingWhois>>>;

/// Connection knobs that are not part of [`SessionSettings`].
#[derive(Debug, Clone)]
pub struct IrcOptions {
    pub connect_timeout: Duration,
    /// Time allowed between `NICK`/`USER` and the `001` welcome.
    pub registration_timeout: Duration,
    pub lookup_timeout: Duration,
    /// Ident sent in `USER`; defaults to the nickname.
    pub ident: Option<String>,
    pub quit_message: String,
}

impl Default for IrcOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            registration_timeout: Duration::from_secs(60),
            lookup_timeout: Duration::from_secs(10),
            ident: None,
            quit_message: "Goodbye".into(),
        }
    }
}

/// Map an error numeric onto the provider's error classes.
pub fn classify_numeric(code: u16) -> ErrorClass {
    match code {
        451 | 477 => ErrorClass::UnregisteredIdentity,
        433 => ErrorClass::NicknameInUse,
        401 | 403 => ErrorClass::NoSuchTarget,
        _ => ErrorClass::Other,
    }
}

/// `host` or `host:port`, defaulting the port.
pub fn server_address(server: &str) -> Result<String> {
    let server = server.trim();
    if server.is_empty() || server.contains(char::is_whitespace) {
        return Err(Error::InvalidAddress {
            address: server.to_string(),
        });
    }
    match server.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(server.to_string())
        },
        Some(_) => Err(Error::InvalidAddress {
            address: server.to_string(),
        }),
        None => Ok(format!("{server}:{DEFAULT_PORT}")),
    }
}

enum Outbound {
    Line(String),
    /// Last line; the writer stops after sending it.
    Quit(String),
}

struct PendingWhois {
    info: IdentityInfo,
    found: bool,
    waiters: Vec<oneshot::Sender<Option<IdentityInfo>>>,
}

impl PendingWhois {
    fn new(nick: &str) -> Self {
        Self {
            info: IdentityInfo {
                nick: nick.to_string(),
                ..IdentityInfo::default()
            },
            found: false,
            waiters: Vec::new(),
        }
    }
}

pub struct IrcSession {
    nickname: String,
    listeners: Arc<ListenerSet>,
    whois: WhoisMap,
    outbound: mpsc::UnboundedSender<Outbound>,
    cancel: CancellationToken,
    writer: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
    lookup_timeout: Duration,
    quit_message: String,
}

impl IrcSession {
    /// Connect, register, and join the configured channels.
    pub async fn connect(settings: &SessionSettings, options: &IrcOptions) -> Result<Arc<Self>> {
        let address = server_address(&settings.server)?;
        info!(server = %address, nick = %settings.nickname, "connecting to irc server");

        let stream = tokio::time::timeout(
            options.connect_timeout,
            TcpStream::connect(address.as_str()),
        )
        .await
        .map_err(|_| Error::Timeout {
            what: "tcp connect",
        })??;
        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_INBOUND_LINE));
        let (mut sink, mut source): (LineSink, LineSource) = framed.split();

        let ident = options.ident.as_deref().unwrap_or(&settings.nickname);
        send_line(&mut sink, &message::nick(&settings.nickname)).await?;
        send_line(&mut sink, &message::user(ident, &settings.display_name)).await?;
        tokio::time::timeout(
            options.registration_timeout,
            await_welcome(&mut sink, &mut source),
        )
        .await
        .map_err(|_| Error::Timeout {
            what: "registration",
        })??;
        info!(server = %address, nick = %settings.nickname, "registered with irc server");

        let cancel = CancellationToken::new();
        let listeners = Arc::new(ListenerSet::new());
        let whois: WhoisMap = Arc::default();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let flood_delay = settings
            .flood_protection
            .then_some(settings.flood_protection_delay);
        let writer = tokio::spawn(run_writer(sink, outbound_rx, cancel.clone(), flood_delay));
        tokio::spawn(run_dispatcher(Arc::clone(&listeners), events_rx));
        tokio::spawn(
            Reader {
                whois: Arc::clone(&whois),
                outbound: outbound_tx.clone(),
                events: events_tx,
                cancel: cancel.clone(),
            }
            .run(source),
        );

        let session = Arc::new(Self {
            nickname: settings.nickname.clone(),
            listeners,
            whois,
            outbound: outbound_tx,
            cancel,
            writer: Mutex::new(Some(writer)),
            closing: AtomicBool::new(false),
            lookup_timeout: options.lookup_timeout,
            quit_message: options.quit_message.clone(),
        });
        for channel in &settings.channels {
            session.queue(Outbound::Line(message::join(channel)))?;
        }
        Ok(session)
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled() && !self.closing.load(Ordering::SeqCst)
    }

    /// Queue a raw protocol line.
    pub fn send_raw(&self, line: &str) -> Result<()> {
        self.queue(Outbound::Line(line.to_string()))
    }

    fn queue(&self, item: Outbound) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Closed);
        }
        self.outbound.send(item).map_err(|_| Error::Closed)
    }
}

impl Drop for IrcSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl TransportSession for IrcSession {
    async fn send(&self, destination: &str, text: &str) -> sockbot_provider::Result<()> {
        let destination = destination.trim();
        if destination.is_empty() || destination.contains([' ', ',']) {
            return Err(Error::invalid_target(destination).into());
        }
        let lines = message::privmsg_lines(destination, text);
        trace!(destination, lines = lines.len(), "queueing privmsg");
        for line in lines {
            self.queue(Outbound::Line(line))?;
        }
        Ok(())
    }

    fn add_listener(
        &self,
        kind: TransportEventKind,
        listener: Arc<dyn TransportListener>,
    ) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    async fn lookup_identity(&self, name: &str) -> sockbot_provider::Result<Option<IdentityInfo>> {
        let name = name.trim();
        if name.is_empty() || name.contains(' ') {
            return Err(Error::invalid_target(name).into());
        }
        let key = name.to_lowercase();
        let (tx, rx) = oneshot::channel();
        let first = {
            let mut pending = self.whois.lock().unwrap_or_else(|e| e.into_inner());
            let entry = pending
                .entry(key.clone())
                .or_insert_with(|| PendingWhois::new(name));
            entry.waiters.push(tx);
            entry.waiters.len() == 1
        };
        if first {
            self.queue(Outbound::Line(message::whois(name)))?;
        }

        let outcome = tokio::time::timeout(self.lookup_timeout, rx).await;
        match outcome {
            Ok(Ok(info)) => Ok(info),
            Ok(Err(_)) => Err(Error::Closed.into()),
            Err(_) => {
                // Our receiver is gone by now; other callers may still wait.
                let mut pending = self.whois.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(entry) = pending.get_mut(&key) {
                    entry.waiters.retain(|waiter| !waiter.is_closed());
                    if entry.waiters.is_empty() {
                        pending.remove(&key);
                    }
                }
                drop(pending);
                Err(Error::Timeout {
                    what: "whois reply",
                }
                .into())
            },
        }
    }

    async fn disconnect(&self) -> sockbot_provider::Result<()> {
        if self.closing.swap(true, Ordering::SeqCst) {
            debug!("irc session already closing");
            return Ok(());
        }
        info!(nick = %self.nickname, "disconnecting from irc server");
        self.listeners.clear();

        // Through the queue so replies already queued go out first.
        if self
            .outbound
            .send(Outbound::Quit(message::quit(&self.quit_message)))
            .is_err()
        {
            debug!("irc writer already stopped");
        }
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(writer) = writer
            && tokio::time::timeout(QUIT_FLUSH_TIMEOUT, writer).await.is_err()
        {
            warn!("irc writer did not drain before timeout");
        }
        self.cancel.cancel();
        Ok(())
    }
}

async fn send_line(sink: &mut LineSink, line: &str) -> Result<()> {
    // LinesCodec terminates with LF; IRC wants CRLF.
    sink.send(format!("{line}\r")).await?;
    Ok(())
}

async fn await_welcome(sink: &mut LineSink, source: &mut LineSource) -> Result<()> {
    while let Some(line) = source.next().await {
        let line = line?;
        let Some(msg) = Message::parse(&line) else {
            continue;
        };
        match msg.command.as_str() {
            "001" => return Ok(()),
            "PING" => send_line(sink, &message::pong(msg.trailing().unwrap_or_default())).await?,
            "432" | "433" | "436" | "437" | "464" | "465" | "ERROR" => {
                return Err(Error::registration(
                    msg.command.clone(),
                    msg.trailing().unwrap_or_default(),
                ));
            },
            _ => trace!(line = %line, "pre-registration line"),
        }
    }
    Err(Error::Closed)
}

async fn run_writer(
    mut sink: LineSink,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    cancel: CancellationToken,
    flood_delay: Option<Duration>,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = queue.recv() => next,
        };
        let Some(next) = next else {
            break;
        };
        let (line, last) = match next {
            Outbound::Line(line) => (line, false),
            Outbound::Quit(line) => (line, true),
        };
        if let Err(e) = send_line(&mut sink, &line).await {
            warn!(error = %e, "irc write failed");
            break;
        }
        if last {
            break;
        }
        if let Some(delay) = flood_delay {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {},
            }
        }
    }
    if let Err(e) = sink.close().await {
        debug!(error = %e, "closing irc connection");
    }
    debug!("irc writer stopped");
}

async fn run_dispatcher(
    listeners: Arc<ListenerSet>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        listeners.deliver(&event).await;
    }
    debug!("irc dispatcher stopped");
}

struct Reader {
    whois: WhoisMap,
    outbound: mpsc::UnboundedSender<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
    cancel: CancellationToken,
}

impl Reader {
    async fn run(self, mut source: LineSource) {
        let lost = loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => break None,
                next = source.next() => next,
            };
            match next {
                Some(Ok(line)) => self.handle_line(&line),
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    warn!("dropping oversized irc line");
                },
                Some(Err(e)) => {
                    warn!(error = %e, "irc read failed");
                    break Some(format!("read failed: {e}"));
                },
                None => {
                    info!("irc server closed the connection");
                    break Some("connection closed by server".to_string());
                },
            }
        };
        if let Some(reason) = lost {
            self.emit(TransportEvent::Error(TransportError {
                classification: ErrorClass::Other,
                command: "ERROR".to_string(),
                message: reason,
            }));
        }
        // Dropping the senders fails pending lookups.
        self.whois
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.cancel.cancel();
        debug!("irc reader stopped");
    }

    fn handle_line(&self, line: &str) {
        let Some(msg) = Message::parse(line) else {
            debug!(line, "ignoring unparseable irc line");
            return;
        };
        match msg.command.as_str() {
            "PING" => {
                let token = msg.trailing().unwrap_or_default();
                if self
                    .outbound
                    .send(Outbound::Line(message::pong(token)))
                    .is_err()
                {
                    debug!("pong dropped, writer stopped");
                }
            },
            "PRIVMSG" => self.handle_privmsg(&msg, line),
            "311" => self.whois_update(&msg, |pending| {
                pending.found = true;
                pending.info.user = msg.param(2).map(str::to_string);
                pending.info.host = msg.param(3).map(str::to_string);
                pending.info.real_name = msg.param(5).map(str::to_string);
            }),
            "319" => self.whois_update(&msg, |pending| {
                pending.found = true;
                if let Some(channels) = msg.param(2) {
                    pending
                        .info
                        .channels
                        .extend(channels.split_whitespace().map(str::to_string));
                }
            }),
            "318" => self.whois_finish(&msg),
            "ERROR" => warn!(message = msg.trailing().unwrap_or_default(), "irc server error"),
            _ => match msg.numeric() {
                Some(code @ 400..=599) => {
                    if code == 401 {
                        self.whois_finish(&msg);
                    }
                    self.emit_error(code, &msg);
                },
                _ => trace!(command = %msg.command, "unhandled irc line"),
            },
        }
    }

    fn handle_privmsg(&self, msg: &Message, line: &str) {
        let (Some(source), Some(destination), Some(text)) =
            (msg.source_nick(), msg.param(0), msg.param(1))
        else {
            debug!(line, "malformed privmsg");
            return;
        };
        if message::is_ctcp(text) {
            debug!(source, "skipping ctcp message");
            return;
        }
        self.emit(TransportEvent::Message {
            source: source.to_string(),
            destination: destination.to_string(),
            text: text.to_string(),
            raw: line.to_string(),
        });
    }

    fn emit_error(&self, code: u16, msg: &Message) {
        let classification = classify_numeric(code);
        // Params are `<me> [<subject>...] :<text>`.
        let detail = msg.params.get(1..).unwrap_or_default().join(" ");
        debug!(code, ?classification, detail = %detail, "irc error reply");
        self.emit(TransportEvent::Error(TransportError {
            classification,
            command: msg.command.clone(),
            message: detail,
        }));
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!("irc event dropped, dispatcher stopped");
        }
    }

    fn whois_update(&self, msg: &Message, update: impl FnOnce(&mut PendingWhois)) {
        let Some(nick) = msg.param(1) else {
            return;
        };
        let mut pending = self.whois.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = pending.get_mut(&nick.to_lowercase()) {
            update(entry);
        }
    }

    fn whois_finish(&self, msg: &Message) {
        let Some(nick) = msg.param(1) else {
            return;
        };
        let entry = self
            .whois
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&nick.to_lowercase());
        let Some(entry) = entry else {
            return;
        };
        let result = entry.found.then_some(entry.info);
        for waiter in entry.waiters {
            // Waiter gone means the lookup timed out.
            let _ = waiter.send(result.clone());
        }
    }
}
