//! Datagram client behavior against a scripted controller.

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hses_client::Error;
use hses_client::udp::Client;
use hses_proto::udp::{ReadStatus, ReadVar, ReadVars, WriteVars};
use support::MockController;

const TIMEOUT: Duration = Duration::from_secs(2);

async fn connect(mock: &MockController) -> Client {
    Client::connect("127.0.0.1", mock.port(), TIMEOUT).await.unwrap()
}

#[tokio::test]
async fn read_status_decodes_the_status_bits() {
    let mock = MockController::bind().await;
    let client = connect(&mock).await;

    let script = async {
        let (request, peer) = mock.recv().await;
        assert_eq!(request.command, 0x72);
        assert_eq!(request.instance, 1);
        assert_eq!(request.service, 0x01);
        assert!(request.payload.is_empty());
        mock.send(peer, &support::response(request.request_id, 0, 0, &[0x47, 0, 0, 0, 0x42, 0, 0, 0]))
            .await;
    };

    let (status, ()) = tokio::join!(client.send_command(ReadStatus, TIMEOUT), script);
    let status = status.unwrap();

    assert!(status.step);
    assert!(status.one_cycle);
    assert!(status.continuous);
    assert!(!status.running);
    assert!(status.play);
    assert!(status.teach_pendant_hold);
    assert!(status.servo_on);
    assert!(!status.alarm);
}

#[tokio::test]
async fn single_variable_read_round_trip() {
    let mock = MockController::bind().await;
    let client = connect(&mock).await;

    let script = async {
        let (request, peer) = mock.recv().await;
        assert_eq!(request.command, 0x7b);
        assert_eq!(request.instance, 6);
        assert_eq!(request.service, 0x01);
        assert!(request.payload.is_empty());
        mock.send(peer, &support::response(request.request_id, 0, 0, &[0xfb, 0xff])).await;
    };

    let (values, ()) = tokio::join!(client.send_command(ReadVars::<i16>::new(6, 1), TIMEOUT), script);
    assert_eq!(values.unwrap(), vec![-5]);
}

#[tokio::test]
async fn multi_variable_write_layout() {
    let mock = MockController::bind().await;
    let client = connect(&mock).await;

    let script = async {
        let (request, peer) = mock.recv().await;
        assert_eq!(request.command, 0x305);
        assert_eq!(request.instance, 8);
        assert_eq!(request.service, 0x34);

        let mut expected = Vec::new();
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&(-5.0f32).to_le_bytes());
        expected.extend_from_slice(&0.0f32.to_le_bytes());
        assert_eq!(request.payload, expected);

        mock.send(peer, &support::response(request.request_id, 0, 0, &[])).await;
    };

    let (result, ()) =
        tokio::join!(client.send_command(WriteVars::<f32>::new(8, vec![-5.0, 0.0]), TIMEOUT), script);
    result.unwrap();
}

#[tokio::test]
async fn remote_failure_maps_to_command_failed() {
    let mock = MockController::bind().await;
    let client = connect(&mock).await;

    let script = async {
        let (request, peer) = mock.recv().await;
        mock.send(peer, &support::failure(request.request_id, 0x08, 0x2030)).await;
    };

    let (result, ()) = tokio::join!(client.send_command(ReadStatus, TIMEOUT), script);
    match result {
        Err(Error::CommandFailed { status, extra_status }) => {
            assert_eq!(status, 0x08);
            assert_eq!(extra_status, 0x2030);
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_reply_times_out() {
    let mock = MockController::bind().await;
    let client = connect(&mock).await;

    let result = client.send_command(ReadStatus, Duration::from_millis(50)).await;
    assert!(matches!(result, Err(Error::Timeout)));

    // The request was actually sent.
    let (request, _) = mock.recv().await;
    assert_eq!(request.command, 0x72);
}

#[tokio::test]
async fn interleaved_replies_resolve_the_right_sessions() {
    let mock = MockController::bind().await;
    let client = connect(&mock).await;

    let script = async {
        let (first, peer) = mock.recv().await;
        let (second, _) = mock.recv().await;
        assert_ne!(first.request_id, second.request_id, "concurrent sessions get distinct ids");

        // Value is the variable index, replies in reverse order.
        mock.send(peer, &support::response(second.request_id, 0, 0, &[second.instance as u8]))
            .await;
        mock.send(peer, &support::response(first.request_id, 0, 0, &[first.instance as u8]))
            .await;
    };

    let (first, second, ()) = tokio::join!(
        client.send_command(ReadVar::<u8>::new(11), TIMEOUT),
        client.send_command(ReadVar::<u8>::new(22), TIMEOUT),
        script,
    );
    assert_eq!(first.unwrap(), 11);
    assert_eq!(second.unwrap(), 22);
}

#[tokio::test]
async fn unsolicited_replies_reach_the_error_sink() {
    let mock = MockController::bind().await;
    let seen: Arc<Mutex<Vec<Error>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = seen.clone();
        Box::new(move |error: Error| seen.lock().unwrap().push(error))
    };
    let client = Client::connect_with("127.0.0.1", mock.port(), TIMEOUT, Some(sink))
        .await
        .unwrap();

    let script = async {
        let (request, peer) = mock.recv().await;
        // A reply nobody asked for, then the real one.
        mock.send(peer, &support::response(request.request_id.wrapping_add(7), 0, 0, &[1]))
            .await;
        mock.send(peer, &support::response(request.request_id, 0, 0, &[1])).await;
    };

    let (result, ()) = tokio::join!(client.send_command(ReadVar::<u8>::new(0), TIMEOUT), script);
    result.unwrap();

    let seen = seen.lock().unwrap();
    assert!(
        seen.iter().any(|error| matches!(error, Error::UnsolicitedReply(_))),
        "error sink saw {seen:?}"
    );
}

#[tokio::test]
async fn close_cancels_pending_sessions() {
    let mock = MockController::bind().await;
    let client = connect(&mock).await;

    let script = async {
        let _ = mock.recv().await;
        client.close();
    };

    let (result, ()) = tokio::join!(client.send_command(ReadStatus, TIMEOUT), script);
    assert!(matches!(result, Err(Error::Cancelled)));

    // The client is unusable afterwards.
    let result = client.send_command(ReadStatus, TIMEOUT).await;
    assert!(matches!(result, Err(Error::NotConnected)));
}
