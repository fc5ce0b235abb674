#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt},
    tokio::{
        net::{TcpListener, TcpStream},
        sync::mpsc,
    },
    tokio_util::codec::{Framed, LinesCodec},
};

use {
    sockbot_irc::{Error, IrcOptions, IrcSession},
    sockbot_provider::{
        ErrorClass, SessionSettings, TransportEvent, TransportEventKind, TransportListener,
        TransportSession,
    },
};

type Server = Framed<TcpStream, LinesCodec>;

const WAIT: Duration = Duration::from_secs(5);

fn settings(server: String) -> SessionSettings {
    SessionSettings {
        server,
        nickname: "sockbot".into(),
        channels: vec!["#room".into()],
        flood_protection: false,
        ..SessionSettings::default()
    }
}

fn options() -> IrcOptions {
    IrcOptions {
        connect_timeout: WAIT,
        registration_timeout: WAIT,
        lookup_timeout: Duration::from_secs(2),
        ..IrcOptions::default()
    }
}

async fn next_line(server: &mut Server) -> String {
    tokio::time::timeout(WAIT, server.next())
        .await
        .expect("timed out waiting for client line")
        .expect("client closed connection")
        .unwrap()
}

async fn say(server: &mut Server, line: &str) {
    server.send(line).await.unwrap();
}

/// Accept one client, check its registration, welcome it and consume the
/// JOIN that follows.
async fn connect() -> (Arc<IrcSession>, Server) {
    connect_with(options()).await
}

async fn connect_with(options: IrcOptions) -> (Arc<IrcSession>, Server) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let settings = settings(address);

    let (session, mut server) = tokio::join!(IrcSession::connect(&settings, &options), async {
        let (stream, _) = listener.accept().await.unwrap();
        let mut server = Framed::new(stream, LinesCodec::new());
        assert_eq!(next_line(&mut server).await, "NICK sockbot");
        assert_eq!(
            next_line(&mut server).await,
            "USER sockbot 0 * :Sockbot IRC Edition"
        );
        say(&mut server, ":irc.test 001 sockbot :Welcome to the test network").await;
        server
    });
    let session = session.unwrap();
    assert_eq!(next_line(&mut server).await, "JOIN #room");
    (session, server)
}

struct Forward(mpsc::UnboundedSender<TransportEvent>);

#[async_trait]
impl TransportListener for Forward {
    async fn on_event(&self, event: &TransportEvent) {
        let _ = self.0.send(event.clone());
    }
}

fn forward(session: &IrcSession, kind: TransportEventKind) -> mpsc::UnboundedReceiver<TransportEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    session.add_listener(kind, Arc::new(Forward(tx)));
    rx
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn registers_then_joins() {
    let (session, _server) = connect().await;
    assert_eq!(session.nickname(), "sockbot");
    assert!(session.is_connected());
}

#[tokio::test]
async fn privmsg_is_delivered_and_ctcp_skipped() {
    let (session, mut server) = connect().await;
    let mut events = forward(&session, TransportEventKind::Message);

    say(&mut server, ":alice!a@host PRIVMSG #room :\x01VERSION\x01").await;
    say(&mut server, ":alice!a@host PRIVMSG #room :bot please !ping").await;

    assert_eq!(next_event(&mut events).await, TransportEvent::Message {
        source: "alice".into(),
        destination: "#room".into(),
        text: "bot please !ping".into(),
        raw: ":alice!a@host PRIVMSG #room :bot please !ping".into(),
    });
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn ping_is_answered() {
    let (_session, mut server) = connect().await;
    say(&mut server, "PING :irc.test").await;
    assert_eq!(next_line(&mut server).await, "PONG :irc.test");
}

#[tokio::test]
async fn send_splits_lines() {
    let (session, mut server) = connect().await;
    session.send("#room", "one\ntwo").await.unwrap();
    assert_eq!(next_line(&mut server).await, "PRIVMSG #room :one");
    assert_eq!(next_line(&mut server).await, "PRIVMSG #room :two");

    let err = session.send("  ", "nobody").await.unwrap_err();
    assert!(matches!(err, sockbot_provider::Error::MalformedPayload { .. }));
}

#[tokio::test]
async fn error_numerics_are_classified() {
    let (session, mut server) = connect().await;
    let mut errors = forward(&session, TransportEventKind::Error);

    say(
        &mut server,
        ":irc.test 477 sockbot #secret :You need to be identified to a registered account",
    )
    .await;

    let TransportEvent::Error(error) = next_event(&mut errors).await else {
        panic!("expected an error event");
    };
    assert_eq!(error.classification, ErrorClass::UnregisteredIdentity);
    assert_eq!(error.command, "477");
    assert!(error.message.starts_with("#secret"));
}

#[tokio::test]
async fn whois_lookup_resolves() {
    let (session, mut server) = connect().await;

    let lookup = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.lookup_identity("alice").await })
    };
    assert_eq!(next_line(&mut server).await, "WHOIS alice");
    say(&mut server, ":irc.test 311 sockbot alice ~alice example.org * :Alice Liddell").await;
    say(&mut server, ":irc.test 319 sockbot alice :@#room #other").await;
    say(&mut server, ":irc.test 318 sockbot alice :End of /WHOIS list.").await;

    let info = lookup.await.unwrap().unwrap().unwrap();
    assert_eq!(info.nick, "alice");
    assert_eq!(info.user.as_deref(), Some("~alice"));
    assert_eq!(info.host.as_deref(), Some("example.org"));
    assert_eq!(info.real_name.as_deref(), Some("Alice Liddell"));
    assert_eq!(info.channels, vec!["@#room".to_string(), "#other".to_string()]);
}

#[tokio::test]
async fn whois_unknown_nick_is_none() {
    let (session, mut server) = connect().await;

    let lookup = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.lookup_identity("ghost").await })
    };
    assert_eq!(next_line(&mut server).await, "WHOIS ghost");
    say(&mut server, ":irc.test 401 sockbot ghost :No such nick/channel").await;
    say(&mut server, ":irc.test 318 sockbot ghost :End of /WHOIS list.").await;

    assert_eq!(lookup.await.unwrap().unwrap(), None);
}

#[tokio::test]
async fn timed_out_whois_leaves_later_callers_waiting() {
    let (session, mut server) = connect_with(IrcOptions {
        lookup_timeout: Duration::from_secs(1),
        ..options()
    })
    .await;

    let early = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.lookup_identity("alice").await })
    };
    assert_eq!(next_line(&mut server).await, "WHOIS alice");

    tokio::time::sleep(Duration::from_millis(500)).await;
    let late = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.lookup_identity("Alice").await })
    };

    assert!(early.await.unwrap().is_err());
    say(&mut server, ":irc.test 311 sockbot alice ~alice example.org * :Alice Liddell").await;
    say(&mut server, ":irc.test 318 sockbot alice :End of /WHOIS list.").await;

    let info = late.await.unwrap().unwrap().unwrap();
    assert_eq!(info.host.as_deref(), Some("example.org"));
}

#[tokio::test]
async fn server_hangup_is_reported_as_error_event() {
    let (session, server) = connect().await;
    let mut errors = forward(&session, TransportEventKind::Error);

    drop(server);

    let TransportEvent::Error(error) = next_event(&mut errors).await else {
        panic!("expected an error event");
    };
    assert_eq!(error.classification, ErrorClass::Other);
    assert_eq!(error.command, "ERROR");
    assert_eq!(error.message, "connection closed by server");
}

#[tokio::test]
async fn nickname_in_use_fails_registration() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let settings = settings(listener.local_addr().unwrap().to_string());
    let options = options();

    let (result, _server) = tokio::join!(IrcSession::connect(&settings, &options), async {
        let (stream, _) = listener.accept().await.unwrap();
        let mut server = Framed::new(stream, LinesCodec::new());
        next_line(&mut server).await;
        next_line(&mut server).await;
        say(&mut server, ":irc.test 433 * sockbot :Nickname is already in use").await;
        server
    });

    match result {
        Err(Error::Registration { code, .. }) => assert_eq!(code, "433"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("registration should fail"),
    }
}

#[tokio::test]
async fn disconnect_sends_quit_and_closes() {
    let (session, mut server) = connect().await;
    session.send("#room", "last words").await.unwrap();
    session.disconnect().await.unwrap();

    assert_eq!(next_line(&mut server).await, "PRIVMSG #room :last words");
    assert_eq!(next_line(&mut server).await, "QUIT :Goodbye");
    assert!(!session.is_connected());
    assert!(session.send("#room", "too late").await.is_err());

    // Idempotent.
    session.disconnect().await.unwrap();
}
