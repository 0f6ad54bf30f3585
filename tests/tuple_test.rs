use std::sync::Arc;

use heapdb::common::{PageId, SlotId, TableId};
use heapdb::storage::page::{HeapPage, Page};
use heapdb::tuple::{DataType, Schema, Tuple, TupleBuilder, Value};

fn create_user_schema() -> Arc<Schema> {
    Schema::builder()
        .column("id", DataType::Integer)
        .column("name", DataType::VarChar(100))
        .nullable_column("email", DataType::VarChar(200))
        .column("balance", DataType::BigInt)
        .column("active", DataType::Boolean)
        .build_arc()
}

fn empty_page(schema: &Arc<Schema>) -> HeapPage {
    let pid = PageId::new(TableId::new(1), 0);
    HeapPage::new(pid, &HeapPage::empty_page_data(), schema.clone()).unwrap()
}

#[test]
fn test_tuple_to_heap_page_roundtrip() {
    let schema = create_user_schema();
    let mut page = empty_page(&schema);

    let mut original = TupleBuilder::new(schema.clone())
        .value(1i32)
        .value("Alice")
        .value("alice@example.com")
        .value(30_000i64)
        .value(true)
        .build();
    page.insert_tuple(&mut original).unwrap();
    let rid = original.record_id().unwrap();

    // Read back through a fresh page built from the stored image
    let image = page.page_data();
    let reloaded = HeapPage::new(page.id(), &image, schema).unwrap();
    let recovered = reloaded.tuple(rid.slot_id).unwrap();

    assert_eq!(recovered, original);
    assert_eq!(recovered.record_id(), Some(rid));
    assert_eq!(
        recovered.value_by_name("name"),
        Some(&Value::String("Alice".to_string()))
    );
}

#[test]
fn test_multiple_tuples_in_page() {
    let schema = create_user_schema();
    let mut page = empty_page(&schema);

    let mut stored = Vec::new();
    for i in 0..10i32 {
        let mut tuple = TupleBuilder::new(schema.clone())
            .value(i)
            .value(format!("user{}", i))
            .null()
            .value(i as i64 * 100)
            .value(i % 2 == 0)
            .build();
        page.insert_tuple(&mut tuple).unwrap();
        assert_eq!(tuple.record_id().unwrap().slot_id, SlotId::new(i as u16));
        stored.push(tuple);
    }

    assert_eq!(page.tuple_count(), 10);
    assert_eq!(page.tuples().unwrap(), stored);
}

#[test]
fn test_tuple_with_nulls() {
    let schema = create_user_schema();
    let mut page = empty_page(&schema);

    let mut original = TupleBuilder::new(schema)
        .value(42i32)
        .value("Bob")
        .null()
        .value(-5i64)
        .value(false)
        .build();
    page.insert_tuple(&mut original).unwrap();

    let recovered = page.tuple(original.record_id().unwrap().slot_id).unwrap();
    assert_eq!(recovered.value_by_name("id"), Some(&Value::Integer(42)));
    assert!(recovered.value_by_name("email").unwrap().is_null());
    assert_eq!(recovered.to_string(), "(42, 'Bob', NULL, -5, false)");
}

#[test]
fn test_all_data_types() {
    let schema = Schema::builder()
        .column("bool_col", DataType::Boolean)
        .column("int_col", DataType::Integer)
        .column("bigint_col", DataType::BigInt)
        .column("double_col", DataType::Double)
        .column("varchar_col", DataType::VarChar(50))
        .build_arc();

    let tuple = Tuple::new(
        schema.clone(),
        vec![
            Value::Boolean(true),
            Value::Integer(2_000_000_000),
            Value::BigInt(9_000_000_000_000_000_000),
            Value::Double(2.718281828),
            Value::String("variable length string".to_string()),
        ],
    );

    let bytes = tuple.to_bytes().unwrap();
    let recovered = Tuple::from_bytes(schema, &bytes).unwrap();
    assert_eq!(tuple, recovered);
}

#[test]
fn test_tuple_size_calculation() {
    let schema = Schema::builder()
        .column("id", DataType::Integer)
        .column("name", DataType::VarChar(100))
        .column("score", DataType::Double)
        .build_arc();

    // Bitmap 1 + 4 + (2 + 100) + 8
    assert_eq!(schema.null_bitmap_size(), 1);
    assert_eq!(schema.max_tuple_size(), 115);

    let tuple = TupleBuilder::new(schema)
        .value(7i32)
        .value("abc")
        .value(1.5)
        .build();
    assert_eq!(tuple.to_bytes().unwrap().len(), 1 + 4 + 8 + 2 + 3);
}

#[test]
fn test_large_tuple_storage() {
    let schema = Schema::builder()
        .column("id", DataType::Integer)
        .column("data", DataType::VarChar(3000))
        .build_arc();
    let mut page = empty_page(&schema);

    let large_string = "x".repeat(2100);
    let mut tuple = TupleBuilder::new(schema.clone())
        .value(1i32)
        .value(large_string.clone())
        .build();
    page.insert_tuple(&mut tuple).unwrap();

    // A second one does not fit
    let mut another = tuple.clone();
    assert!(!page.has_room(another.to_bytes().unwrap().len()));
    assert!(page.insert_tuple(&mut another).is_err());

    let recovered = page.tuple(SlotId::new(0)).unwrap();
    assert_eq!(recovered.value(1), Some(&Value::String(large_string)));
}
