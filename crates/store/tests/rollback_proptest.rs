//! Property-based tests for MemoryStore transactions using proptest.

use proptest::prelude::*;
use rowstage_core::schema::SchemaBuilder;
use rowstage_core::{DataType, FieldValue, Value};
use rowstage_store::{MemoryStore, RecordStore};

#[derive(Clone, Debug)]
enum Op {
    Insert(String),
    Update(i64, String),
    Delete(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(Op::Insert),
        (1i64..12, "[a-z]{1,6}").prop_map(|(id, name)| Op::Update(id, name)),
        (1i64..12).prop_map(Op::Delete),
    ]
}

fn seeded(rows: usize) -> MemoryStore {
    let schema = SchemaBuilder::new("items")
        .unwrap()
        .add_field("id", DataType::Int64)
        .unwrap()
        .add_field("name", DataType::String)
        .unwrap()
        .add_primary_key(&["id"], true)
        .unwrap()
        .build()
        .unwrap();
    let mut store = MemoryStore::new();
    store.create_table(schema).unwrap();
    for i in 0..rows {
        store
            .seed("items", vec![Value::Null, Value::String(format!("item{}", i))])
            .unwrap();
    }
    store
}

fn apply(store: &mut MemoryStore, op: &Op) {
    // Individual failures (missing rows) are expected and leave the table as is.
    let _ = match op {
        Op::Insert(name) => store
            .insert("items", &[FieldValue::new("name", name.as_str())])
            .map(|_| ()),
        Op::Update(id, name) => store.update(
            "items",
            &[FieldValue::new("id", *id)],
            &[FieldValue::new("name", name.as_str())],
        ),
        Op::Delete(id) => store.delete("items", &[FieldValue::new("id", *id)]),
    };
}

proptest! {
    /// Rolling back a transaction restores the exact pre-transaction rows.
    #[test]
    fn rollback_restores_rows(
        initial in 0usize..8,
        ops in prop::collection::vec(op_strategy(), 0..30)
    ) {
        let mut store = seeded(initial);
        let before = store.rows("items").unwrap();

        store.begin_transaction().unwrap();
        for op in &ops {
            apply(&mut store, op);
        }
        store.rollback().unwrap();

        prop_assert_eq!(store.rows("items").unwrap(), before);
    }

    /// Committed changes match the same operations applied without a transaction.
    #[test]
    fn commit_matches_autocommit(
        initial in 0usize..8,
        ops in prop::collection::vec(op_strategy(), 0..30)
    ) {
        let mut transactional = seeded(initial);
        let mut autocommit = seeded(initial);

        transactional.begin_transaction().unwrap();
        for op in &ops {
            apply(&mut transactional, op);
            apply(&mut autocommit, op);
        }
        transactional.commit().unwrap();

        prop_assert_eq!(
            transactional.rows("items").unwrap(),
            autocommit.rows("items").unwrap()
        );
    }
}
