mod common;

use std::time::Duration;

use padbridge_core::EventBus;
use padbridge_net::protocol::{
    ClipRequest, ColumnAction, MatrixAction, RowAction, SlotAction,
};
use padbridge_net::ClipEngineClient;

use common::{connected_client, wait_until, FakeEngine};

#[test]
fn triggers_reach_the_engine() {
    let engine = FakeEngine::start();
    let (client, _) = connected_client(&engine);

    client.trigger_slot(2, 5);
    client.stop_slot(2, 5);
    client.trigger_scene(3);
    client.stop_column(1);
    client.stop_all();

    assert!(wait_until(Duration::from_secs(2), || engine.requests().len() == 5));
    assert_eq!(
        engine.requests(),
        vec![
            ClipRequest::TriggerSlot {
                matrix_id: 0,
                column: 2,
                row: 5,
                action: SlotAction::Trigger,
            },
            ClipRequest::TriggerSlot {
                matrix_id: 0,
                column: 2,
                row: 5,
                action: SlotAction::Stop,
            },
            ClipRequest::TriggerRow {
                matrix_id: 0,
                row: 3,
                action: RowAction::Play,
            },
            ClipRequest::TriggerColumn {
                matrix_id: 0,
                column: 1,
                action: ColumnAction::Stop,
            },
            ClipRequest::TriggerMatrix {
                matrix_id: 0,
                action: MatrixAction::StopAllClips,
            },
        ]
    );
}

#[test]
fn rejected_trigger_is_not_raised() {
    let engine = FakeEngine::start();
    engine.reject_triggers("no such slot");
    let (client, _) = connected_client(&engine);

    client.trigger_slot(99, 99);
    assert_eq!(engine.requests().len(), 1);
    assert!(client.is_connected());
}

#[test]
fn triggers_are_skipped_while_disconnected() {
    let engine = FakeEngine::start();
    let client = ClipEngineClient::new("127.0.0.1", engine.port(), 0, EventBus::new());

    client.trigger_slot(0, 0);
    client.stop_all();
    std::thread::sleep(Duration::from_millis(50));
    assert!(engine.requests().is_empty());
}
