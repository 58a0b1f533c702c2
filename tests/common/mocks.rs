//! Mock implementations for test fixtures.
//!
//! Re-exports the in-crate test doubles and adds helpers for driving them.

pub use portal_net::adapters::mock::{
    ConnectOutcome, MockHttpClient, MockResponse, MockSocketConnector, MockSocketPeer,
};

use std::time::Duration;

use portal_net::websocket::{ChannelHandle, ChannelState};

const STATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait until the channel reports `expected`.
pub async fn wait_for_state(handle: &ChannelHandle, expected: ChannelState) {
    let mut rx = handle.state_receiver();
    let reached = tokio::time::timeout(STATE_TIMEOUT, async {
        loop {
            if *rx.borrow_and_update() == expected {
                return true;
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    })
    .await;
    assert_eq!(
        reached,
        Ok(true),
        "channel never reached {:?}, last state {:?}",
        expected,
        handle.state()
    );
}

/// Next accepted mock connection, failing the test if none arrives.
pub async fn expect_peer(connector: &MockSocketConnector) -> MockSocketPeer {
    tokio::time::timeout(STATE_TIMEOUT, connector.next_peer())
        .await
        .expect("timed out waiting for a connection")
        .expect("connector dropped")
}

/// Refuse the next `count` connection attempts.
pub fn refuse(connector: &MockSocketConnector, count: usize) {
    connector.script((0..count).map(|_| ConnectOutcome::Refuse("server unavailable".to_string())));
}
