#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sockbot_provider::{
    CommandBatch, CommandContext, CommandHandler, CommandInvocation, CommandProcessor,
    CommandRegistry, Error, Forum, ForumSettings, Notification, NotificationTopic, ReplyHandle,
    TransportConnector,
};

use support::MockConnector;

fn forum(connector: &Arc<MockConnector>) -> Forum {
    Forum::new(
        ForumSettings::new("sockbot", "irc.example.net"),
        Arc::clone(connector) as Arc<dyn TransportConnector>,
    )
}

type Log = Arc<Mutex<Vec<String>>>;

fn record_topics(forum: &Forum, log: &Log) {
    for topic in NotificationTopic::ALL {
        let log = Arc::clone(log);
        forum.subscribe(
            *topic,
            Arc::new(move |topic: NotificationTopic, n: &Arc<Notification>| {
                log.lock()
                    .unwrap()
                    .push(format!("{topic} {}", n.id()));
            }),
        );
    }
}

struct Reply(&'static str);

#[async_trait]
impl CommandHandler for Reply {
    async fn handle(&self, invocation: &CommandInvocation) -> anyhow::Result<()> {
        invocation.reply.send(self.0).await?;
        Ok(())
    }
}

struct Record(Log);

#[async_trait]
impl CommandHandler for Record {
    async fn handle(&self, invocation: &CommandInvocation) -> anyhow::Result<()> {
        self.0
            .lock()
            .unwrap()
            .push(format!("command {}", invocation.command.name));
        Ok(())
    }
}

struct Fail;

#[async_trait]
impl CommandHandler for Fail {
    async fn handle(&self, _invocation: &CommandInvocation) -> anyhow::Result<()> {
        anyhow::bail!("handler exploded")
    }
}

#[tokio::test]
async fn ping_in_channel_without_mention() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    let registry = Arc::new(CommandRegistry::default());
    registry.register("ping", Arc::new(Reply("pong")));
    forum.set_commands(registry).unwrap();
    forum.activate().await.unwrap();

    let log: Log = Arc::default();
    record_topics(&forum, &log);

    let session = connector.session();
    assert_eq!(session.inject_message("alice", "#room", "bot please !ping").await, 1);

    assert_eq!(*log.lock().unwrap(), vec![
        "notification:message 1".to_string(),
        "notification 1".to_string(),
    ]);
    assert_eq!(session.sent(), vec![("#room".to_string(), "pong".to_string())]);
}

struct Matched(usize);

#[async_trait]
impl CommandBatch for Matched {
    fn len(&self) -> usize {
        self.0
    }

    async fn execute(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Captures the context and reply target of every offered message.
#[derive(Default)]
struct Capture {
    offered: Mutex<Vec<(CommandContext, String)>>,
}

#[async_trait]
impl CommandProcessor for Capture {
    async fn match_commands(
        &self,
        context: CommandContext,
        body: &str,
        reply: ReplyHandle,
    ) -> anyhow::Result<Box<dyn CommandBatch>> {
        self.offered
            .lock()
            .unwrap()
            .push((context, reply.target().to_string()));
        Ok(Box::new(Matched(usize::from(body.contains("!ping")))))
    }
}

#[tokio::test]
async fn mention_of_short_username_reaches_processor_with_channel_context() {
    let connector = MockConnector::new();
    let forum = Forum::new(
        ForumSettings::new("bot", "irc.example.net"),
        Arc::clone(&connector) as Arc<dyn TransportConnector>,
    );
    let capture = Arc::new(Capture::default());
    forum.set_commands(capture.clone()).unwrap();
    forum.activate().await.unwrap();

    let log: Log = Arc::default();
    record_topics(&forum, &log);

    let session = connector.session();
    assert_eq!(session.inject_message("alice", "#room", "bot please !ping").await, 1);

    assert_eq!(*log.lock().unwrap(), vec![
        "notification:message 1".to_string(),
        "notification 1".to_string(),
        "notification:mention 1".to_string(),
    ]);

    let offered = capture.offered.lock().unwrap();
    assert_eq!(offered.len(), 1);
    let (context, target) = &offered[0];
    assert_eq!(context.topic_id, "#room");
    assert_eq!(context.user_id, "alice");
    assert_eq!(context.post_id, None);
    assert_eq!(target, "#room");
}

#[tokio::test]
async fn each_notification_hits_message_then_generic_exactly_once() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    let log: Log = Arc::default();
    record_topics(&forum, &log);

    let pipeline = forum.pipeline();
    pipeline.receive_message("alice", "#room", "one", "").await.unwrap();
    pipeline.receive_message("bob", "#room", "two", "").await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec![
        "notification:message 1".to_string(),
        "notification 1".to_string(),
        "notification:message 2".to_string(),
        "notification 2".to_string(),
    ]);
}

#[tokio::test]
async fn mention_emitted_only_when_username_in_body() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    let log: Log = Arc::default();
    record_topics(&forum, &log);

    let pipeline = forum.pipeline();
    pipeline
        .receive_message("alice", "#room", "hey sockbot are you there", "")
        .await
        .unwrap();
    pipeline
        .receive_message("alice", "#room", "hey bot are you there", "")
        .await
        .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.iter().filter(|l| l.starts_with("notification:mention")).count(), 1);
    assert_eq!(log[2], "notification:mention 1");
    assert_eq!(log.len(), 5);
}

#[tokio::test]
async fn subscribers_run_before_commands() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    let log: Log = Arc::default();

    let registry = Arc::new(CommandRegistry::default());
    registry.register("note", Arc::new(Record(Arc::clone(&log))));
    forum.set_commands(registry).unwrap();

    let seen = Arc::clone(&log);
    forum.subscribe(
        NotificationTopic::Any,
        Arc::new(move |_: NotificationTopic, _: &Arc<Notification>| {
            seen.lock().unwrap().push("notified".to_string());
        }),
    );

    forum
        .pipeline()
        .receive_message("alice", "#room", "!note", "")
        .await
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec![
        "notified".to_string(),
        "command note".to_string(),
    ]);
}

#[tokio::test]
async fn command_failure_is_isolated_to_one_message() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    let registry = Arc::new(CommandRegistry::default());
    registry.register("boom", Arc::new(Fail));
    registry.register("ping", Arc::new(Reply("pong")));
    forum.set_commands(registry).unwrap();
    forum.activate().await.unwrap();

    let err = forum
        .pipeline()
        .receive_message("alice", "#room", "!boom", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommandProcessing { .. }));
    assert!(err.to_string().contains("handler exploded"));

    let session = connector.session();
    session.inject_message("alice", "#room", "!boom").await;
    session.inject_message("alice", "#room", "!ping").await;

    assert!(forum.is_activated());
    assert_eq!(session.message_listeners(), 1);
    assert_eq!(session.sent(), vec![("#room".to_string(), "pong".to_string())]);
}

#[tokio::test]
async fn malformed_lines_are_dropped_without_stopping_the_listener() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    let log: Log = Arc::default();
    record_topics(&forum, &log);
    forum.activate().await.unwrap();

    let session = connector.session();
    session.inject_message("", "#room", "no sender").await;
    session.inject_message("alice", "#room", "fine").await;

    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn direct_messages_are_answered_privately() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    let registry = Arc::new(CommandRegistry::default());
    registry.register("ping", Arc::new(Reply("pong")));
    forum.set_commands(registry).unwrap();

    let captured: Arc<Mutex<Option<Arc<Notification>>>> = Arc::default();
    let slot = Arc::clone(&captured);
    forum.subscribe(
        NotificationTopic::Message,
        Arc::new(move |_: NotificationTopic, n: &Arc<Notification>| {
            *slot.lock().unwrap() = Some(Arc::clone(n));
        }),
    );
    forum.activate().await.unwrap();

    let session = connector.session();
    session.inject_message("alice", "sockbot", "!ping").await;
    assert_eq!(session.sent(), vec![("alice".to_string(), "pong".to_string())]);

    let notification = captured.lock().unwrap().clone().unwrap();
    let pm = notification.private_message().unwrap();
    assert_eq!(pm.from(), "alice");
    assert_eq!(pm.to(), "sockbot");
    pm.reply(&forum, "hello again").await.unwrap();
    assert_eq!(session.sent()[1], ("alice".to_string(), "hello again".to_string()));
}

#[tokio::test]
async fn post_and_topic_replies_go_to_channel() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    forum.activate().await.unwrap();

    let notification = forum
        .pipeline()
        .receive_message("alice", "#room", "hello", "")
        .await
        .unwrap();
    notification.get_post().reply(&forum, "post reply").await.unwrap();
    notification
        .get_topic()
        .unwrap()
        .reply(&forum, "topic reply")
        .await
        .unwrap();

    assert_eq!(connector.session().sent(), vec![
        ("#room".to_string(), "post reply".to_string()),
        ("#room".to_string(), "topic reply".to_string()),
    ]);
}

#[tokio::test]
async fn builtin_help_lists_commands() {
    let connector = MockConnector::new();
    let forum = forum(&connector);
    let registry = Arc::new(CommandRegistry::default());
    registry.register("ping", Arc::new(Reply("pong")));
    forum.set_commands(registry).unwrap();
    forum.activate().await.unwrap();

    let session = connector.session();
    session.inject_message("alice", "#room", "!help").await;
    assert_eq!(session.sent(), vec![("#room".to_string(), "!ping".to_string())]);
}
