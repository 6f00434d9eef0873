use proptest::prelude::*;
use sdk::definition::{EdgeRecord, GraphDefinition, NodeRecord, RawRecord};
use sdk::errors::{EngineError, ParleyErrorExt};

// Every error carries a static, non-empty hint that never echoes the
// offending input back verbatim.
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "[a-z_]{12,40}") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::UnknownIntent(error_str.clone()),
            EngineError::DuplicateIntent { intent: error_str.clone(), count: 2 },
            EngineError::UnknownCommand(error_str.clone()),
            EngineError::NoCandidates { state: error_str.clone() },
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
            prop_assert!(!err.is_recoverable());
        }
    }
}

// A definition written back out as JSON parses to the same records, in the
// same order, with each record landing in the same node/edge variant.
proptest! {
    #[test]
    fn test_definition_json_round_trip(
        intents in prop::collection::vec("[a-z]{1,8}", 1..6),
        patterns in prop::collection::vec("[a-z ]{1,20}", 1..4),
        response in proptest::option::of("[A-Za-z !]{0,20}"),
    ) {
        let mut records: Vec<RawRecord> = intents
            .iter()
            .map(|intent| {
                let mut node = NodeRecord::new(intent.clone()).with_context_set(["seen"]);
                node.response = response.clone();
                node.into()
            })
            .collect();
        records.push(EdgeRecord::from_anywhere(intents[0].clone(), patterns.clone()).into());

        let def = GraphDefinition::from_records(records);
        let json = serde_json::to_string(&def).expect("Failed to serialize definition");
        let parsed = GraphDefinition::from_json_str(&json).expect("Failed to parse definition");

        prop_assert_eq!(&def, &parsed);
        prop_assert_eq!(parsed.nodes().count(), intents.len());
        prop_assert_eq!(parsed.edges().count(), 1);
    }
}
