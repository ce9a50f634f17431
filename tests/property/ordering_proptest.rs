//! Property-based tests for conversation ordering

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;
use teammatch::client::Conversation;
use teammatch::shared::{ChatMessage, ConversationKey, MessageSender};

fn message(id: u8, secs: i64) -> ChatMessage {
    ChatMessage {
        id: format!("m{:03}", id),
        sender: MessageSender {
            id: "u1".into(),
            name: "Ana".into(),
        },
        content: format!("message {}", id),
        created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        recipient: None,
    }
}

fn messages() -> impl Strategy<Value = Vec<ChatMessage>> {
    // Few distinct timestamps so ties are common
    prop::collection::vec((0u8..40, 0i64..8), 0..40)
        .prop_map(|pairs| pairs.into_iter().map(|(id, secs)| message(id, secs)).collect())
}

fn assert_sorted_and_unique(conversation: &Conversation) -> Result<(), TestCaseError> {
    for pair in conversation.messages.windows(2) {
        prop_assert!(pair[0].display_order(&pair[1]).is_lt());
    }
    let ids: HashSet<_> = conversation.messages.iter().map(|m| &m.id).collect();
    prop_assert_eq!(ids.len(), conversation.messages.len());
    Ok(())
}

proptest! {
    #[test]
    fn test_insert_keeps_order_without_duplicates(batch in messages()) {
        let mut conversation = Conversation::new(ConversationKey::Global);
        for m in batch {
            conversation.insert(m);
        }
        assert_sorted_and_unique(&conversation)?;
    }

    #[test]
    fn test_live_then_history_matches_history_alone(live in messages(), history in messages()) {
        let mut mixed = Conversation::new(ConversationKey::Global);
        for m in live.iter().cloned() {
            mixed.insert(m);
        }
        mixed.merge(history.clone());
        assert_sorted_and_unique(&mixed)?;

        // Every id seen is present exactly once
        let expected: HashSet<_> = live.iter().chain(history.iter()).map(|m| m.id.clone()).collect();
        let actual: HashSet<_> = mixed.messages.iter().map(|m| m.id.clone()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn test_merge_is_idempotent(history in messages()) {
        let mut conversation = Conversation::new(ConversationKey::Global);
        conversation.merge(history.clone());
        let before = conversation.messages.clone();
        prop_assert!(!conversation.merge(history));
        prop_assert_eq!(conversation.messages, before);
    }
}
