//! Property-based tests for the import/export engine.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Delimited text round-trips losslessly, empty cells included
//! - N rows sharing a key yield exactly N-1 duplicates
//! - Preview and import agree on every single row

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use std::sync::Arc;
use storeport::io::codec;
use storeport::io::uniqueness::check_uniqueness;
use storeport::storage::CatalogBackend;
use storeport::{EngineConfig, EntityType, ImportOptions, ImportService, InMemoryBackend, Row};

/// A cell value the codec preserves exactly: empty or already trimmed.
fn cell() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-zA-Z0-9\",.;:'!?()\\-]([a-zA-Z0-9 \",.;:'!?()\\-\n]{0,18}[a-zA-Z0-9\",.;:'!?()\\-])?",
    ]
}

fn table() -> impl Strategy<Value = (Vec<String>, Vec<Vec<String>>)> {
    (1usize..6).prop_flat_map(|width| {
        (
            prop::collection::hash_set("[a-z][a-z_]{0,10}", width)
                .prop_map(|set| set.into_iter().collect::<Vec<_>>()),
            prop::collection::vec(prop::collection::vec(cell(), width), 0..12),
        )
    })
}

fn field() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("widget".to_string()),
        Just("Widget Pro".to_string()),
        Just("bad slug!".to_string()),
        Just("X".to_string()),
        Just("10".to_string()),
        Just("-3".to_string()),
        Just("0".to_string()),
        Just("4.5".to_string()),
        Just("yes".to_string()),
        Just("false".to_string()),
        Just("a@b.co".to_string()),
        Just("<b>bold</b>".to_string()),
        "[a-z0-9 -]{0,12}",
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// Property: decode(encode(rows)) == rows for trimmed values, empty included.
    #[test]
    fn prop_codec_round_trip((header, cells) in table()) {
        let rows: Vec<Row> = cells
            .iter()
            .map(|values| header.iter().cloned().zip(values.iter().cloned()).collect())
            .collect();

        let text = codec::encode(&rows).unwrap();
        let decoded = codec::decode(&text).unwrap();
        prop_assert_eq!(decoded, rows);
    }

    /// Property: a one-column table survives the round trip even when
    /// every value is empty.
    #[test]
    fn prop_codec_round_trip_single_column(values in prop::collection::vec(cell(), 0..10)) {
        let rows: Vec<Row> = values
            .into_iter()
            .map(|value| Row::new().with("sku", value))
            .collect();

        let text = codec::encode(&rows).unwrap();
        let decoded = codec::decode(&text).unwrap();
        prop_assert_eq!(decoded, rows);
    }

    /// Property: N rows sharing one key give exactly N-1 duplicates.
    #[test]
    fn prop_uniqueness_n_minus_one(
        shared in 1usize..20,
        unique in 0usize..20,
        seed in any::<u64>(),
    ) {
        let mut keys: Vec<String> = (0..shared)
            .map(|i| if i % 2 == 0 { "Same-Key".to_string() } else { " same-key ".to_string() })
            .collect();
        keys.extend((0..unique).map(|i| format!("unique-{i}")));
        let len = keys.len();
        keys.rotate_left(usize::try_from(seed % len as u64).unwrap());

        let report = check_uniqueness(&keys, |k| Some(k.as_str()));
        prop_assert_eq!(report.duplicates.len(), shared - 1);
        prop_assert_eq!(report.valid, shared == 1);
    }

    /// Property: preview marks a row valid iff importing it alone succeeds.
    #[test]
    fn prop_preview_import_parity(
        name in field(),
        slug in field(),
        price in field(),
        promotional_price in field(),
        stock in field(),
        active in field(),
    ) {
        let row = Row::new()
            .with("name", name)
            .with("slug", slug)
            .with("price", price)
            .with("promotional_price", promotional_price)
            .with("stock", stock)
            .with("active", active);

        let backend = Arc::new(InMemoryBackend::new());
        let service = ImportService::new(
            Arc::clone(&backend) as Arc<dyn CatalogBackend>,
            EngineConfig::default().without_delays(),
        );

        let preview = service
            .preview("store-1", EntityType::Products, std::slice::from_ref(&row))
            .unwrap();
        let result = runtime()
            .block_on(service.import_from_records(
                "store-1",
                EntityType::Products,
                vec![row],
                ImportOptions::new(),
            ))
            .unwrap();

        prop_assert_eq!(preview.per_row_verdicts[0].is_valid, result.success);
        prop_assert_eq!(preview.valid_rows, result.imported);
    }
}
