// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! End-to-end session scenarios against a scripted server on an in-memory
//! duplex stream.

use cassandra_cql::{
    connection::session::{
        QueryResult,
        Session,
        SessionError,
        SessionState,
    },
    frame::{
        header::ProtocolVersion,
        requests::register::RegisterEventType,
        responses::{
            error::ErrorCode,
            event::Event,
            result::SchemaChangeType,
        },
        rows::RowsError,
        value::CqlValue,
        ColumnType,
        Consistency,
    },
};
use std::convert::TryInto;
use tokio::io::{
    duplex,
    AsyncReadExt,
    AsyncWriteExt,
    DuplexStream,
};

async fn read_frame(server: &mut DuplexStream) -> ([u8; 8], Vec<u8>) {
    let mut header = [0u8; 8];
    server.read_exact(&mut header).await.unwrap();
    let len = u32::from_be_bytes(header[4..8].try_into().unwrap()) as usize;
    let mut body = vec![0u8; len];
    server.read_exact(&mut body).await.unwrap();
    (header, body)
}

fn response(version_byte: u8, opcode: u8, body: &[u8]) -> Vec<u8> {
    let mut frame = vec![version_byte, 0x00, 0x00, opcode];
    frame.extend((body.len() as u32).to_be_bytes());
    frame.extend(body);
    frame
}

fn write_string(s: &str, payload: &mut Vec<u8>) {
    payload.extend((s.len() as u16).to_be_bytes());
    payload.extend(s.as_bytes());
}

fn write_bytes(b: &[u8], payload: &mut Vec<u8>) {
    payload.extend((b.len() as i32).to_be_bytes());
    payload.extend(b);
}

// RESULT Rows body: global table spec, columns (k varchar, v int), one row {k:"x", v:42}
fn rows_body() -> Vec<u8> {
    let mut body = (2i32).to_be_bytes().to_vec();
    body.extend((1i32).to_be_bytes()); // flags: global tables spec
    body.extend((2i32).to_be_bytes()); // columns count
    write_string("ks", &mut body);
    write_string("t", &mut body);
    write_string("k", &mut body);
    body.extend([0x00, 0x0D]);
    write_string("v", &mut body);
    body.extend([0x00, 0x09]);
    body.extend((1i32).to_be_bytes()); // row count
    write_bytes(b"x", &mut body);
    write_bytes(&42i32.to_be_bytes(), &mut body);
    body
}

/// Run the v1 startup handshake and hand back the ready session plus the
/// server end for further scripting.
async fn ready_session_v1() -> (Session<DuplexStream>, DuplexStream) {
    let (client, mut server) = duplex(1 << 16);
    let mut session: Session<DuplexStream> = Session::with_stream(client, ProtocolVersion::V1);
    let script = tokio::spawn(async move {
        let (header, _) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x01);
        server.write_all(&response(0x81, 0x02, &[])).await.unwrap();
        server
    });
    session.startup().await.unwrap();
    (session, script.await.unwrap())
}

#[tokio::test]
async fn s1_startup_ready() {
    let (client, mut server) = duplex(1 << 16);
    let mut session: Session<DuplexStream> = Session::with_stream(client, ProtocolVersion::V1);
    let script = tokio::spawn(async move {
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header, [0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x16]);
        let mut expected = vec![0x00, 0x01, 0x00, 0x0B];
        expected.extend(b"CQL_VERSION");
        expected.extend([0x00, 0x05]);
        expected.extend(b"3.0.0");
        assert_eq!(body, expected);
        server.write_all(&[0x81, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00]).await.unwrap();
    });
    assert_eq!(session.state(), SessionState::Fresh);
    session.startup().await.unwrap();
    assert!(session.is_ready());
    script.await.unwrap();
}

#[tokio::test]
async fn s2_query_returning_rows() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x07);
        // [long string] statement + [consistency] ONE
        let mut expected = (17i32).to_be_bytes().to_vec();
        expected.extend(b"SELECT k,v FROM t");
        expected.extend([0x00, 0x01]);
        assert_eq!(body, expected);
        server.write_all(&response(0x81, 0x08, &rows_body())).await.unwrap();
    });
    match session.query("SELECT k,v FROM t", Consistency::One).await.unwrap() {
        QueryResult::Rows(mut rows) => {
            assert_eq!(rows.metadata().columns_count(), 2);
            let specs = rows.metadata().column_specs();
            assert_eq!(specs[0].name(), "k");
            assert_eq!(specs[0].kind(), &ColumnType::VarChar);
            assert_eq!(specs[1].name(), "v");
            assert_eq!(specs[1].kind(), &ColumnType::Int);
            let row = rows.try_next().unwrap();
            assert_eq!(row.get(0), Some(&CqlValue::Text("x".to_owned())));
            assert_eq!(row.get(1), Some(&CqlValue::Int(42)));
            assert!(matches!(rows.try_next(), Err(RowsError::Exhausted)));
        }
        _ => panic!("expected rows"),
    }
    script.await.unwrap();
}

#[tokio::test]
async fn s3_prepared_roundtrip_and_unprepared() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        // PREPARE
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x09);
        let statement_len = i32::from_be_bytes(body[..4].try_into().unwrap()) as usize;
        assert_eq!(&body[4..4 + statement_len], b"INSERT INTO t(k,v) VALUES(?,?)");
        let mut prepared = (4i32).to_be_bytes().to_vec();
        prepared.extend([0x00, 0x01, 0xB1]); // [short bytes] id
        prepared.extend((1i32).to_be_bytes()); // flags: global tables spec
        prepared.extend((2i32).to_be_bytes()); // columns count
        let mut tail = Vec::new();
        write_string("ks", &mut tail);
        write_string("t", &mut tail);
        write_string("k", &mut tail);
        tail.extend([0x00, 0x0D]);
        write_string("v", &mut tail);
        tail.extend([0x00, 0x09]);
        prepared.extend(tail);
        server.write_all(&response(0x81, 0x08, &prepared)).await.unwrap();

        // EXECUTE -> Void
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x0A);
        let mut expected = vec![0x00, 0x01, 0xB1]; // [short bytes] id
        expected.extend([0x00, 0x02]); // two values
        expected.extend((1i32).to_be_bytes());
        expected.extend(b"y");
        expected.extend((4i32).to_be_bytes());
        expected.extend(7i32.to_be_bytes());
        expected.extend([0x00, 0x01]); // ONE
        assert_eq!(body, expected);
        server
            .write_all(&response(0x81, 0x08, &(1i32).to_be_bytes()))
            .await
            .unwrap();

        // EXECUTE -> ERROR Unprepared
        let (header, _) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x0A);
        let mut error = (0x2500i32).to_be_bytes().to_vec();
        write_string("Unknown prepared id", &mut error);
        error.extend([0x00, 0x01, 0xB1]);
        server.write_all(&response(0x81, 0x00, &error)).await.unwrap();
    });

    let prepared = session.prepare("INSERT INTO t(k,v) VALUES(?,?)").await.unwrap();
    assert_eq!(prepared.id(), &[0xB1]);
    assert_eq!(prepared.bind_metadata().columns_count(), 2);

    match session
        .execute(&prepared, vec!["y".into(), 7i32.into()], Consistency::One)
        .await
        .unwrap()
    {
        QueryResult::Void => (),
        _ => panic!("expected void"),
    }

    let err = session
        .execute(&prepared, vec!["z".into(), 8i32.into()], Consistency::Any)
        .await
        .unwrap_err();
    match err {
        SessionError::Server(e) => {
            assert_eq!(e.code(), ErrorCode::Unprepared);
            assert_eq!(e.unprepared_id(), Some(&[0xB1][..]));
        }
        other => panic!("expected server error, got {:?}", other),
    }
    // a server error is not a wire error; the session stays usable
    assert!(session.is_ready());
    script.await.unwrap();
}

#[tokio::test]
async fn s4_unavailable_error() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        let _ = read_frame(&mut server).await;
        let mut error = (0x1000i32).to_be_bytes().to_vec();
        write_string("Cannot achieve consistency", &mut error);
        error.extend([0x00, 0x04]); // QUORUM
        error.extend((3i32).to_be_bytes());
        error.extend((1i32).to_be_bytes());
        server.write_all(&response(0x81, 0x00, &error)).await.unwrap();
    });
    let err = session.query("SELECT k FROM t", Consistency::Quorum).await.unwrap_err();
    match err {
        SessionError::Server(e) => {
            assert_eq!(e.code(), ErrorCode::Unavailable);
            assert_eq!(e.message(), "Cannot achieve consistency");
            match e.additional() {
                Some(cassandra_cql::frame::responses::error::Additional::Unavailable(u)) => {
                    assert_eq!(u.cl, Consistency::Quorum);
                    assert_eq!(u.required, 3);
                    assert_eq!(u.alive, 1);
                }
                other => panic!("expected unavailable tail, got {:?}", other),
            }
        }
        other => panic!("expected server error, got {:?}", other),
    }
    script.await.unwrap();
}

#[tokio::test]
async fn s5_schema_change() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        let _ = read_frame(&mut server).await;
        let mut body = (5i32).to_be_bytes().to_vec();
        write_string("CREATED", &mut body);
        write_string("ks", &mut body);
        write_string("", &mut body);
        server.write_all(&response(0x81, 0x08, &body)).await.unwrap();
    });
    match session
        .query("CREATE KEYSPACE ks", Consistency::One)
        .await
        .unwrap()
    {
        QueryResult::SchemaChange(change) => {
            assert_eq!(change.change, SchemaChangeType::Created);
            assert_eq!(change.keyspace, "ks");
            assert_eq!(change.table, "");
        }
        _ => panic!("expected schema change"),
    }
    script.await.unwrap();
}

#[tokio::test]
async fn v1_credentials_round() {
    let (client, mut server) = duplex(1 << 16);
    let mut session = Session::with_stream(client, ProtocolVersion::V1)
        .authenticator(cassandra_cql::frame::requests::auth_response::PasswordAuth::new(
            "cassandra".to_owned(),
            "cassandra".to_owned(),
        ));
    let script = tokio::spawn(async move {
        let (header, _) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x01);
        let mut authenticate = Vec::new();
        write_string("org.apache.cassandra.auth.PasswordAuthenticator", &mut authenticate);
        server.write_all(&response(0x81, 0x03, &authenticate)).await.unwrap();
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x04); // CREDENTIALS
        assert_eq!(body[..2], [0x00, 0x02]); // two entries
        server.write_all(&response(0x81, 0x02, &[])).await.unwrap();
    });
    session.startup().await.unwrap();
    assert!(session.is_ready());
    script.await.unwrap();
}

#[tokio::test]
async fn v2_sasl_round() {
    let (client, mut server) = duplex(1 << 16);
    let mut session = Session::with_stream(client, ProtocolVersion::V2)
        .authenticator(cassandra_cql::frame::requests::auth_response::PasswordAuth::new(
            "user".to_owned(),
            "pass".to_owned(),
        ));
    let script = tokio::spawn(async move {
        let (header, _) = read_frame(&mut server).await;
        assert_eq!(header, [0x02, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x16]);
        let mut authenticate = Vec::new();
        write_string("auth", &mut authenticate);
        server.write_all(&response(0x82, 0x03, &authenticate)).await.unwrap();
        // first AUTH_RESPONSE, challenged once
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x0F);
        assert_eq!(&body[4..], b"\0user\0pass");
        let mut challenge = Vec::new();
        write_bytes(b"again", &mut challenge);
        server.write_all(&response(0x82, 0x0E, &challenge)).await.unwrap();
        // second AUTH_RESPONSE, accepted
        let (header, _) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x0F);
        let mut success = Vec::new();
        write_bytes(&[], &mut success);
        server.write_all(&response(0x82, 0x10, &success)).await.unwrap();
    });
    session.startup().await.unwrap();
    assert!(session.is_ready());
    script.await.unwrap();
}

#[tokio::test]
async fn options_is_valid_before_startup() {
    let (client, mut server) = duplex(1 << 16);
    let mut session: Session<DuplexStream> = Session::with_stream(client, ProtocolVersion::V2);
    let script = tokio::spawn(async move {
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x05);
        assert!(body.is_empty());
        let mut supported = vec![0x00, 0x02];
        write_string("CQL_VERSION", &mut supported);
        supported.extend([0x00, 0x01]);
        write_string("3.0.0", &mut supported);
        write_string("COMPRESSION", &mut supported);
        supported.extend([0x00, 0x02]);
        write_string("lz4", &mut supported);
        write_string("snappy", &mut supported);
        server.write_all(&response(0x82, 0x06, &supported)).await.unwrap();
    });
    let supported = session.options().await.unwrap();
    assert_eq!(supported.compression(), &["lz4".to_owned(), "snappy".to_owned()]);
    // still Fresh: OPTIONS does not advance the handshake
    assert_eq!(session.state(), SessionState::Fresh);
    script.await.unwrap();
}

#[tokio::test]
async fn use_keyspace_validates_and_caches() {
    let (mut session, mut server) = ready_session_v1().await;
    // rejected synchronously, nothing hits the wire
    let err = session.use_keyspace("bad name").await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidArgument(_)));

    let script = tokio::spawn(async move {
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x07);
        let statement_len = i32::from_be_bytes(body[..4].try_into().unwrap()) as usize;
        assert_eq!(&body[4..4 + statement_len], b"USE ks1");
        // consistency ANY
        assert_eq!(&body[4 + statement_len..], &[0x00, 0x00]);
        let mut result = (3i32).to_be_bytes().to_vec();
        write_string("ks1", &mut result);
        server.write_all(&response(0x81, 0x08, &result)).await.unwrap();
        server
    });
    session.use_keyspace("ks1").await.unwrap();
    assert_eq!(session.used_keyspace(), Some("ks1"));
    let _server = script.await.unwrap();
    // cached: no further frames are sent, so no server script is needed
    session.use_keyspace("ks1").await.unwrap();
}

#[tokio::test]
async fn register_then_read_event() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        let (header, body) = read_frame(&mut server).await;
        assert_eq!(header[3], 0x0B);
        let mut expected = vec![0x00, 0x01, 0x00, 0x0D];
        expected.extend(b"SCHEMA_CHANGE");
        assert_eq!(body, expected);
        server.write_all(&response(0x81, 0x02, &[])).await.unwrap();
        // a pushed event on the reserved stream id
        let mut event = Vec::new();
        write_string("SCHEMA_CHANGE", &mut event);
        write_string("DROPPED", &mut event);
        write_string("ks", &mut event);
        write_string("t", &mut event);
        let mut frame = vec![0x81, 0x00, 0xFF, 0x0C];
        frame.extend((event.len() as u32).to_be_bytes());
        frame.extend(event);
        server.write_all(&frame).await.unwrap();
    });
    session.register(&[RegisterEventType::SchemaChange]).await.unwrap();
    let event = session.read_event().await.unwrap();
    match event.event() {
        Event::SchemaChange(change) => {
            assert_eq!(change.change, SchemaChangeType::Dropped);
            assert_eq!(change.keyspace, "ks");
            assert_eq!(change.table, "t");
        }
        other => panic!("expected schema change event, got {:?}", other),
    }
    script.await.unwrap();
}

#[tokio::test]
async fn trailing_body_bytes_are_discarded() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        let _ = read_frame(&mut server).await;
        // a Void result with three surplus body bytes
        let mut body = (1i32).to_be_bytes().to_vec();
        body.extend([0xDE, 0xAD, 0xBF]);
        server.write_all(&response(0x81, 0x08, &body)).await.unwrap();
    });
    match session.query("UPDATE t SET v = 0", Consistency::One).await.unwrap() {
        QueryResult::Void => (),
        _ => panic!("expected void"),
    }
    assert!(session.is_ready());
    script.await.unwrap();
}

#[tokio::test]
async fn direction_bit_mismatch_closes_the_session() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        let _ = read_frame(&mut server).await;
        // request direction bit on a response frame
        server
            .write_all(&response(0x01, 0x08, &(1i32).to_be_bytes()))
            .await
            .unwrap();
    });
    let err = session.query("SELECT k FROM t", Consistency::One).await.unwrap_err();
    assert!(matches!(err, SessionError::WireFormat(_)));
    assert_eq!(session.state(), SessionState::Closed);
    // Closed is terminal
    let err = session.query("SELECT k FROM t", Consistency::One).await.unwrap_err();
    assert!(matches!(err, SessionError::Closed));
    script.await.unwrap();
}

#[tokio::test]
async fn truncated_frame_closes_the_session() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        let _ = read_frame(&mut server).await;
        // declare 8 body bytes but deliver 2, then hang up
        let mut frame = vec![0x81, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x08];
        frame.extend([0x00, 0x00]);
        server.write_all(&frame).await.unwrap();
        drop(server);
    });
    let err = session.query("SELECT k FROM t", Consistency::One).await.unwrap_err();
    assert!(matches!(err, SessionError::WireFormat(_)));
    assert_eq!(session.state(), SessionState::Closed);
    script.await.unwrap();
}

#[tokio::test]
async fn execute_bind_count_is_checked_before_sending() {
    let (mut session, mut server) = ready_session_v1().await;
    let script = tokio::spawn(async move {
        let _ = read_frame(&mut server).await;
        let mut prepared = (4i32).to_be_bytes().to_vec();
        prepared.extend([0x00, 0x01, 0xB1]);
        prepared.extend((1i32).to_be_bytes());
        prepared.extend((1i32).to_be_bytes());
        write_string("ks", &mut prepared);
        write_string("t", &mut prepared);
        write_string("k", &mut prepared);
        prepared.extend([0x00, 0x0D]);
        server.write_all(&response(0x81, 0x08, &prepared)).await.unwrap();
    });
    let prepared = session.prepare("INSERT INTO t(k) VALUES(?)").await.unwrap();
    let err = session
        .execute(&prepared, vec!["a".into(), "b".into()], Consistency::One)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidArgument(_)));
    script.await.unwrap();
}
