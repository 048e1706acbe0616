// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::envelope::{Envelope, MessageType};
use proptest::prelude::*;

fn arb_message_type() -> impl Strategy<Value = MessageType> {
    prop_oneof![
        Just(MessageType::WorkerInfo),
        Just(MessageType::ManagedObjects),
        Just(MessageType::QueryChangeLog),
        Just(MessageType::DeleteChangeLog),
        Just(MessageType::EditChangeLog),
        Just(MessageType::QueryChangeSet),
        Just(MessageType::QuerySecret),
        Just(MessageType::UpgradeWorker),
    ]
}

proptest! {
    #[test]
    fn envelope_round_trips_through_json(kind in arb_message_type(), payload in "[a-z]{0,16}") {
        let env = Envelope::new(kind, serde_json::json!({"payload": payload}));
        let text = serde_json::to_string(&env).expect("serialize");
        let back: Envelope = serde_json::from_str(&text).expect("deserialize");
        prop_assert_eq!(back.message_type, env.message_type);
        prop_assert_eq!(back.request_id, env.request_id);
        prop_assert_eq!(back.data, env.data);
    }

    #[test]
    fn reply_to_never_changes_request_id(kind in arb_message_type()) {
        let req = Envelope::new(kind, serde_json::json!({}));
        let reply = req.reply_to(serde_json::json!({"code": 0}));
        prop_assert_eq!(reply.request_id, req.request_id);
    }
}
