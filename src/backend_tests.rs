//! End-to-end backend tests against a loopback IRC server.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::config::ClientConfig;
use crate::protocol::{ClientAction, ClientEvent, Credentials};

fn credentials() -> Credentials {
    Credentials {
        token: "oauth:secret".into(),
        nick: "TestUser".into(),
        channel: "testchan".into(),
    }
}

fn spawn_backend(port: u16) -> (Sender<ClientAction>, Receiver<ClientEvent>) {
    let (action_tx, action_rx) = unbounded::<ClientAction>();
    let (event_tx, event_rx) = unbounded::<ClientEvent>();
    let config = ClientConfig {
        server: "127.0.0.1".into(),
        port,
        max_messages: 60,
    };
    thread::spawn(move || {
        crate::backend::run_backend(config, action_rx, event_tx);
    });
    (action_tx, event_rx)
}

/// Wait for an event matching the predicate, skipping others.
fn wait_for(
    rx: &Receiver<ClientEvent>,
    pred: impl Fn(&ClientEvent) -> bool,
    what: &str,
) -> ClientEvent {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) if pred(&event) => return event,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for {}", what),
        }
    }
}

fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).expect("server read");
    line.trim_end().to_string()
}

fn accept_with_timeout(listener: &TcpListener) -> (BufReader<TcpStream>, TcpStream) {
    let (stream, _) = listener.accept().expect("accept");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("set timeout");
    let reader = BufReader::new(stream.try_clone().expect("clone stream"));
    (reader, stream)
}

/// Accept with a deadline, so a dial that never comes fails instead of hanging.
fn accept_within(listener: &TcpListener, deadline: Duration) -> (BufReader<TcpStream>, TcpStream) {
    listener.set_nonblocking(true).expect("set nonblocking");
    let end = Instant::now() + deadline;
    let stream = loop {
        match listener.accept() {
            Ok((stream, _)) => break stream,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() > end {
                    panic!("timed out waiting for a connection");
                }
                thread::sleep(Duration::from_millis(20));
            }
            Err(e) => panic!("accept failed: {}", e),
        }
    };
    listener.set_nonblocking(false).expect("set blocking");
    stream.set_nonblocking(false).expect("stream blocking");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("set timeout");
    let reader = BufReader::new(stream.try_clone().expect("clone stream"));
    (reader, stream)
}

#[test]
fn test_registration_join_and_inbound_chat() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (mut reader, mut writer) = accept_with_timeout(&listener);
        let pass = read_line(&mut reader);
        let nick = read_line(&mut reader);
        writer
            .write_all(b":tmi.twitch.tv 001 testuser :Welcome, GLHF!\r\n")
            .unwrap();
        let join = read_line(&mut reader);
        writer
            .write_all(b":alice!alice@alice.tmi.twitch.tv PRIVMSG #testchan :hello there\r\n")
            .unwrap();
        // Hold the connection open while the client drains events
        thread::sleep(Duration::from_millis(500));
        (pass, nick, join)
    });

    let (action_tx, event_rx) = spawn_backend(port);
    action_tx
        .send(ClientAction::Connect(credentials()))
        .unwrap();

    let connected = wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Connected(_)),
        "registration",
    );
    match connected {
        ClientEvent::Connected(msg) => {
            assert_eq!(msg, "Successfully connected! Now trying to join channel...");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    let chat = wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Chat { .. }),
        "inbound chat",
    );
    match chat {
        ClientEvent::Chat {
            sender,
            text,
            is_self,
        } => {
            assert_eq!(sender, "alice");
            assert_eq!(text, "hello there");
            assert!(!is_self);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let (pass, nick, join) = server.join().unwrap();
    assert_eq!(pass, "PASS oauth:secret");
    // NICK is lower-cased on the wire
    assert_eq!(nick, "NICK testuser");
    assert_eq!(join, "JOIN #testchan");
}

#[test]
fn test_ping_gets_pong_before_registration() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (mut reader, mut writer) = accept_with_timeout(&listener);
        let _pass = read_line(&mut reader);
        let _nick = read_line(&mut reader);
        // A bare PING can arrive before 001; the reply must not wait on it
        writer.write_all(b"PING :tmi.twitch.tv\r\n").unwrap();
        read_line(&mut reader)
    });

    let (action_tx, _event_rx) = spawn_backend(port);
    action_tx
        .send(ClientAction::Connect(credentials()))
        .unwrap();

    let pong = server.join().unwrap();
    assert_eq!(pong, "PONG :tmi.twitch.tv");
}

#[test]
fn test_blank_credentials_emit_one_error_and_no_io() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    listener.set_nonblocking(true).unwrap();

    let (action_tx, event_rx) = spawn_backend(port);
    let mut bad = credentials();
    bad.channel = String::new();
    action_tx.send(ClientAction::Connect(bad)).unwrap();

    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Error(_)),
        "config error",
    );

    // Exactly one status event, and no socket was ever opened
    thread::sleep(Duration::from_millis(300));
    assert!(event_rx.try_recv().is_err());
    match listener.accept() {
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
        other => panic!("unexpected connection attempt: {:?}", other),
    }
}

#[test]
fn test_send_message_echo_and_throttle() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (mut reader, mut writer) = accept_with_timeout(&listener);
        let _pass = read_line(&mut reader);
        let _nick = read_line(&mut reader);
        writer
            .write_all(b":tmi.twitch.tv 001 testuser :Welcome\r\n")
            .unwrap();
        let _join = read_line(&mut reader);
        let t_join = Instant::now();
        let privmsg = read_line(&mut reader);
        let gap = t_join.elapsed();
        thread::sleep(Duration::from_millis(200));
        (privmsg, gap)
    });

    let (action_tx, event_rx) = spawn_backend(port);
    action_tx
        .send(ClientAction::Connect(credentials()))
        .unwrap();
    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Connected(_)),
        "registration",
    );

    action_tx
        .send(ClientAction::SendMessage("hi chat".into()))
        .unwrap();

    // Exactly one locally echoed copy, marked as ours
    let echo = wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Chat { is_self: true, .. }),
        "self echo",
    );
    match echo {
        ClientEvent::Chat { sender, text, .. } => {
            assert_eq!(sender, "TestUser");
            assert_eq!(text, "hi chat");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let (privmsg, gap) = server.join().unwrap();
    assert_eq!(privmsg, "PRIVMSG #testchan :hi chat");
    // The PRIVMSG followed the JOIN, so the 1750 ms floor applies between them
    assert!(
        gap >= Duration::from_millis(1700),
        "throttle gap too small: {:?}",
        gap
    );
}

#[test]
fn test_read_failure_reconnects_with_same_credentials() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        // First connection: register, then drop it mid-session
        let (mut reader, mut writer) = accept_with_timeout(&listener);
        let _pass = read_line(&mut reader);
        let _nick = read_line(&mut reader);
        writer
            .write_all(b":tmi.twitch.tv 001 testuser :Welcome\r\n")
            .unwrap();
        let _join = read_line(&mut reader);
        drop(writer);
        drop(reader);

        // The backend reconnects on its own with the same credentials
        let (mut reader, _writer) = accept_with_timeout(&listener);
        let pass = read_line(&mut reader);
        let nick = read_line(&mut reader);
        thread::sleep(Duration::from_millis(200));
        (pass, nick)
    });

    let (action_tx, event_rx) = spawn_backend(port);
    action_tx
        .send(ClientAction::Connect(credentials()))
        .unwrap();

    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Connected(_)),
        "registration",
    );
    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Error(_)),
        "read error",
    );
    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Disconnected(_)),
        "disconnect",
    );

    let (pass, nick) = server.join().unwrap();
    assert_eq!(pass, "PASS oauth:secret");
    assert_eq!(nick, "NICK testuser");
}

#[test]
fn test_reconnect_gives_up_after_repeated_failures() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();

    let (action_tx, event_rx) = spawn_backend(port);
    action_tx
        .send(ClientAction::Connect(credentials()))
        .unwrap();

    // Initial connection plus three automatic retries. Each one is dropped
    // right after registration, before any 001 arrives.
    for _ in 0..4 {
        let (mut reader, _writer) = accept_within(&listener, Duration::from_secs(10));
        let _pass = read_line(&mut reader);
        let _nick = read_line(&mut reader);
    }

    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Error(m) if m.contains("Giving up")),
        "giving-up error",
    );

    // No further dialing on its own after the cap is hit
    listener.set_nonblocking(true).unwrap();
    thread::sleep(Duration::from_millis(400));
    match listener.accept() {
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
        other => panic!("dialed again after giving up: {:?}", other),
    }

    // An explicit Connect resets the attempt counter and dials again
    action_tx
        .send(ClientAction::Connect(credentials()))
        .unwrap();
    let (mut reader, mut writer) = accept_within(&listener, Duration::from_secs(10));
    let pass = read_line(&mut reader);
    assert_eq!(pass, "PASS oauth:secret");
    let _nick = read_line(&mut reader);
    writer
        .write_all(b":tmi.twitch.tv 001 testuser :Welcome\r\n")
        .unwrap();
    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Connected(_)),
        "registration after explicit connect",
    );
}

#[test]
fn test_invalid_message_rejected_with_error_status() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (mut reader, mut writer) = accept_with_timeout(&listener);
        let _pass = read_line(&mut reader);
        let _nick = read_line(&mut reader);
        writer
            .write_all(b":tmi.twitch.tv 001 testuser :Welcome\r\n")
            .unwrap();
        let _join = read_line(&mut reader);
        // Only the valid message may reach the wire
        let privmsg = read_line(&mut reader);
        thread::sleep(Duration::from_millis(200));
        privmsg
    });

    let (action_tx, event_rx) = spawn_backend(port);
    action_tx
        .send(ClientAction::Connect(credentials()))
        .unwrap();
    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Connected(_)),
        "registration",
    );

    action_tx
        .send(ClientAction::SendMessage("   ".into()))
        .unwrap();
    action_tx
        .send(ClientAction::SendMessage("evil\r\nQUIT".into()))
        .unwrap();
    action_tx
        .send(ClientAction::SendMessage("still here".into()))
        .unwrap();

    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Error(m) if m.contains("empty")),
        "empty-message rejection",
    );
    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Error(m) if m.contains("newline")),
        "newline rejection",
    );

    // Rejected messages are never echoed locally either
    let echo = wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Chat { is_self: true, .. }),
        "self echo",
    );
    match echo {
        ClientEvent::Chat { text, .. } => assert_eq!(text, "still here"),
        other => panic!("unexpected event: {:?}", other),
    }

    let privmsg = server.join().unwrap();
    assert_eq!(privmsg, "PRIVMSG #testchan :still here");
}

#[test]
fn test_disconnect_when_already_disconnected_is_noop() {
    let (action_tx, event_rx) = spawn_backend(1);

    action_tx
        .send(ClientAction::Disconnect { reconnect: false })
        .unwrap();

    thread::sleep(Duration::from_millis(300));
    assert!(event_rx.try_recv().is_err());
}

#[test]
fn test_send_message_while_disconnected_reports_error() {
    let (action_tx, event_rx) = spawn_backend(1);

    action_tx
        .send(ClientAction::SendMessage("hello?".into()))
        .unwrap();

    wait_for(
        &event_rx,
        |e| matches!(e, ClientEvent::Error(_)),
        "not-connected error",
    );
}
