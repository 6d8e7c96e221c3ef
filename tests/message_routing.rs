//! Message routing integration tests.
//!
//! Covers direct and channel PRIVMSG delivery, the +n external-message
//! gate, and NOTICE's no-error-reply rule.

mod common;

use std::time::Duration;

use common::TestServer;
use relay_proto::Command;

#[tokio::test]
async fn direct_privmsg_is_delivered_verbatim() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    alice.register_and_drain().await.unwrap();
    let mut bob = server.connect("bob").await.unwrap();
    bob.register_and_drain().await.unwrap();

    alice.privmsg("bob", "Hello World!").await.unwrap();

    let msg = bob.recv().await.unwrap();
    assert_eq!(msg.source_nick(), Some("alice"));
    match &msg.command {
        Command::PRIVMSG(target, text) => {
            assert_eq!(target, "bob");
            assert_eq!(text, "Hello World!");
        }
        other => panic!("expected PRIVMSG, got {:?}", other),
    }

    // No echo back to the sender.
    assert!(alice.recv_timeout(Duration::from_millis(200)).await.is_err());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn privmsg_to_unknown_nick_gets_401() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    alice.register_and_drain().await.unwrap();

    alice.privmsg("ghost", "anyone there?").await.unwrap();
    let reply = alice.recv().await.unwrap();
    assert_eq!(reply.response_code(), Some(401));
    assert_eq!(reply.response_args().unwrap()[1], "ghost");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn channel_privmsg_reaches_everyone_but_sender() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    alice.register_and_drain().await.unwrap();
    let mut bob = server.connect("bob").await.unwrap();
    bob.register_and_drain().await.unwrap();
    let mut carol = server.connect("carol").await.unwrap();
    carol.register_and_drain().await.unwrap();

    alice.join("#room").await.unwrap();
    bob.join("#room").await.unwrap();
    carol.join("#room").await.unwrap();
    alice.recv().await.unwrap(); // bob's JOIN
    alice.recv().await.unwrap(); // carol's JOIN
    bob.recv().await.unwrap(); // carol's JOIN

    alice.privmsg("#room", "hi all").await.unwrap();

    for client in [&mut bob, &mut carol] {
        let msg = client.recv().await.unwrap();
        assert_eq!(msg.source_nick(), Some("alice"));
        assert!(matches!(&msg.command, Command::PRIVMSG(t, x) if t == "#room" && x == "hi all"));
    }
    assert!(alice.recv_timeout(Duration::from_millis(200)).await.is_err());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn no_external_messages_when_plus_n() {
    let server = TestServer::spawn().await.unwrap();
    let mut member = server.connect("member").await.unwrap();
    member.register_and_drain().await.unwrap();
    member.join("#room").await.unwrap();
    member.send_raw("MODE #room +n").await.unwrap();
    member.recv().await.unwrap();

    let mut outsider = server.connect("outsider").await.unwrap();
    outsider.register_and_drain().await.unwrap();
    outsider.privmsg("#room", "let me in").await.unwrap();

    let reply = outsider.recv().await.unwrap();
    assert_eq!(reply.response_code(), Some(404));
    let args = reply.response_args().unwrap();
    assert_eq!(args[1], "#room");
    assert_eq!(args[2], "Cannot send to channel");

    // Nothing reached the channel.
    assert!(member.recv_timeout(Duration::from_millis(200)).await.is_err());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn external_messages_allowed_without_plus_n() {
    let server = TestServer::spawn().await.unwrap();
    let mut member = server.connect("member").await.unwrap();
    member.register_and_drain().await.unwrap();
    member.join("#room").await.unwrap();

    let mut outsider = server.connect("outsider").await.unwrap();
    outsider.register_and_drain().await.unwrap();
    outsider.privmsg("#room", "hello from outside").await.unwrap();

    let msg = member.recv().await.unwrap();
    assert_eq!(msg.source_nick(), Some("outsider"));
    assert!(matches!(&msg.command, Command::PRIVMSG(..)));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn notice_delivers_but_never_errors() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    alice.register_and_drain().await.unwrap();
    let mut bob = server.connect("bob").await.unwrap();
    bob.register_and_drain().await.unwrap();

    alice.send_raw("NOTICE bob :heads up").await.unwrap();
    let msg = bob.recv().await.unwrap();
    assert!(matches!(&msg.command, Command::NOTICE(t, x) if t == "bob" && x == "heads up"));

    // Failed deliveries are silent.
    alice.send_raw("NOTICE ghost :hello?").await.unwrap();
    alice.send_raw("NOTICE #nowhere :hello?").await.unwrap();
    assert!(alice.recv_timeout(Duration::from_millis(200)).await.is_err());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn privmsg_to_missing_channel_gets_403() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = server.connect("alice").await.unwrap();
    alice.register_and_drain().await.unwrap();

    alice.privmsg("#nowhere", "anyone?").await.unwrap();
    let reply = alice.recv().await.unwrap();
    assert_eq!(reply.response_code(), Some(403));
    assert_eq!(reply.response_args().unwrap()[1], "#nowhere");

    server.stop().await.unwrap();
}
