mod support;

use msgbus_client::{Client, MessagePayload, TransportError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use support::mock_transport::MockTransport;

fn client_with(transport: MockTransport) -> Client {
    Client::new(
        Some(Arc::new(transport)),
        None,
        None,
        None,
        HashMap::new(),
        "prod".to_string(),
        Duration::from_secs(5),
        Duration::from_millis(50),
    )
    .expect("client construction should succeed with an explicit transport")
}

#[tokio::test]
async fn consume_then_ack_round_trip() {
    let transport = MockTransport::default();
    transport.receive_batches.lock().unwrap().push_back(vec![
        msgbus_client::ConsumerMessage {
            ack_id: "ack0".to_string(),
            payload: MessagePayload {
                data: bytes::Bytes::from_static(b"payload"),
                crc32: None,
                md5: None,
            },
        },
    ]);

    let client = client_with(transport);
    let mut consumer = client
        .create_consumer("/test/destination".to_string(), "group0".to_string())
        .unwrap();
    consumer.open().await.unwrap();

    let delivered = consumer.receive(1).await;
    assert_eq!(delivered.len(), 1);
    let (token, message) = &delivered[0];
    assert_eq!(token.ack_id(), "ack0");
    assert_eq!(token.hostport(), "0:0");
    assert_eq!(message.ack_id, "ack0");

    let acked = consumer.ack(token.clone()).await;
    assert!(acked);

    consumer.close();
}

#[tokio::test]
async fn ack_rpc_failure_surfaces_false_but_leaves_consumer_usable() {
    let transport = MockTransport::default();
    transport.receive_batches.lock().unwrap().push_back(vec![
        msgbus_client::ConsumerMessage {
            ack_id: "ack0".to_string(),
            payload: MessagePayload {
                data: bytes::Bytes::from_static(b"payload"),
                crc32: None,
                md5: None,
            },
        },
        msgbus_client::ConsumerMessage {
            ack_id: "ack1".to_string(),
            payload: MessagePayload {
                data: bytes::Bytes::from_static(b"payload"),
                crc32: None,
                md5: None,
            },
        },
    ]);
    transport
        .ack_results
        .lock()
        .unwrap()
        .push_back(Err(TransportError::Failed {
            method: "ackMessages",
            source: "output host unreachable".into(),
        }));

    let client = client_with(transport);
    let mut consumer = client
        .create_consumer("/test/destination".to_string(), "group0".to_string())
        .unwrap();
    consumer.open().await.unwrap();

    let delivered = consumer.receive(2).await;
    assert_eq!(delivered.len(), 2);

    let failed_ack = consumer.ack(delivered[0].0.clone()).await;
    assert!(!failed_ack);

    // The consumer keeps working after an ack failure: a subsequent nack on
    // the other token still gets dispatched and succeeds.
    let nacked = consumer.nack(delivered[1].0.clone()).await;
    assert!(nacked);

    consumer.close();
}

#[tokio::test]
async fn reconfiguration_resolves_service_suffix_from_deployment_str() {
    let mock = Arc::new(MockTransport::default());
    let client = Client::new(
        Some(mock.clone()),
        None,
        None,
        None,
        HashMap::new(),
        "staging".to_string(),
        Duration::from_secs(5),
        Duration::from_millis(50),
    )
    .unwrap();

    let mut consumer = client
        .create_consumer("/test/destination".to_string(), "group0".to_string())
        .unwrap();
    consumer.open().await.unwrap();

    assert_eq!(
        mock.consumer_group_hosts_suffixes.lock().unwrap().as_slice(),
        ["staging"],
        "readConsumerGroupHosts must resolve the service suffix from the client's \
         deployment string, not hardcode the canonical empty suffix"
    );

    consumer.close();
}
