//! Integration tests for heap files: placement of inserted tuples, deletes,
//! scans and persistence.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use heapdb::common::{DatabaseConfig, Permissions, PAGE_SIZE};
use heapdb::storage::heap::HeapFile;
use heapdb::storage::page::{HeapPage, Page, MAX_TUPLE_SIZE};
use heapdb::storage::{DbFile, DbFileIterator};
use heapdb::tuple::{DataType, Schema, Tuple, TupleBuilder, Value};
use heapdb::{Database, DbError, PageId, RecordId, SlotId};

use tempfile::TempDir;

fn create_schema() -> Arc<Schema> {
    Schema::builder()
        .column("id", DataType::Integer)
        .column("name", DataType::VarChar(4096))
        .build_arc()
}

fn create_db() -> Database {
    let config = DatabaseConfig::new(16)
        .with_lock_retry_limit(5)
        .with_lock_wait_interval(Duration::from_millis(5));
    Database::new(config).unwrap()
}

fn row(schema: &Arc<Schema>, id: i32, name_len: usize) -> Tuple {
    TupleBuilder::new(schema.clone())
        .value(id)
        .value("x".repeat(name_len))
        .build()
}

fn scan_ids(db: &Database, table: &HeapFile) -> Vec<i32> {
    let txn = db.begin();
    let mut iter = table.scan(db.buffer_pool(), txn);
    iter.open().unwrap();
    let ids = iter
        .map(|t| match t.unwrap().value(0) {
            Some(Value::Integer(id)) => *id,
            other => panic!("unexpected id {:?}", other),
        })
        .collect();
    db.commit(txn).unwrap();
    ids
}

#[test]
fn test_first_insert_creates_page() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();
    assert_eq!(table.num_pages().unwrap(), 0);

    let txn = db.begin();
    let mut tuple = row(table.schema(), 1, 10);
    db.buffer_pool()
        .insert_tuple(txn, table.id(), &mut tuple)
        .unwrap();

    assert_eq!(table.num_pages().unwrap(), 1);
    assert_eq!(
        tuple.record_id(),
        Some(RecordId::new(PageId::new(table.id(), 0), SlotId::new(0)))
    );
    db.commit(txn).unwrap();
    assert_eq!(scan_ids(&db, &table), vec![1]);
}

#[test]
fn test_insert_spills_to_new_pages() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();

    // Three of these fill a page
    let txn = db.begin();
    let mut rids = HashSet::new();
    for id in 0..10 {
        let mut tuple = row(table.schema(), id, 1200);
        db.buffer_pool()
            .insert_tuple(txn, table.id(), &mut tuple)
            .unwrap();
        assert!(rids.insert(tuple.record_id().unwrap()));
    }
    db.commit(txn).unwrap();

    assert_eq!(table.num_pages().unwrap(), 4);
    assert_eq!(
        table.path().metadata().unwrap().len(),
        4 * PAGE_SIZE as u64
    );
    assert_eq!(scan_ids(&db, &table), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_insert_reuses_freed_space() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();
    let pool = db.buffer_pool();

    let txn = db.begin();
    let mut tuples: Vec<Tuple> = (0..3).map(|id| row(table.schema(), id, 1200)).collect();
    for tuple in &mut tuples {
        pool.insert_tuple(txn, table.id(), tuple).unwrap();
    }
    pool.delete_tuple(txn, &tuples[0]).unwrap();

    let mut replacement = row(table.schema(), 42, 1200);
    pool.insert_tuple(txn, table.id(), &mut replacement).unwrap();
    db.commit(txn).unwrap();

    assert_eq!(table.num_pages().unwrap(), 1);
    assert_eq!(replacement.record_id(), tuples[0].record_id());
    assert_eq!(scan_ids(&db, &table), vec![42, 1, 2]);
}

#[test]
fn test_tuple_too_large() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();

    let txn = db.begin();
    let mut tuple = row(table.schema(), 1, MAX_TUPLE_SIZE);
    let err = db
        .buffer_pool()
        .insert_tuple(txn, table.id(), &mut tuple)
        .unwrap_err();
    assert!(matches!(err, DbError::TupleTooLarge(len) if len > MAX_TUPLE_SIZE));
    assert_eq!(table.num_pages().unwrap(), 0);
    assert!(tuple.record_id().is_none());
    db.abort(txn).unwrap();
}

#[test]
fn test_largest_tuple_fits_alone() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();

    // 4 id bytes, a 2 byte length and the null bitmap
    let name_len = MAX_TUPLE_SIZE - 4 - 2 - table.schema().null_bitmap_size();
    let txn = db.begin();
    for id in 0..2 {
        let mut tuple = row(table.schema(), id, name_len);
        assert_eq!(tuple.to_bytes().unwrap().len(), MAX_TUPLE_SIZE);
        db.buffer_pool()
            .insert_tuple(txn, table.id(), &mut tuple)
            .unwrap();
        assert_eq!(tuple.record_id().unwrap().page_id.page_number(), id as u32);
    }
    db.commit(txn).unwrap();
    assert_eq!(table.num_pages().unwrap(), 2);
}

#[test]
fn test_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();

    let other = Schema::builder().column("flag", DataType::Boolean).build_arc();
    let mut tuple = TupleBuilder::new(other).value(true).build();
    let txn = db.begin();
    assert!(matches!(
        db.buffer_pool().insert_tuple(txn, table.id(), &mut tuple),
        Err(DbError::SchemaMismatch(id)) if id == table.id()
    ));
}

#[test]
fn test_delete_errors() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();
    let pool = db.buffer_pool();
    let txn = db.begin();

    let mut tuple = row(table.schema(), 1, 4);
    pool.insert_tuple(txn, table.id(), &mut tuple).unwrap();

    // Past the end of the file
    let mut ghost = row(table.schema(), 2, 4);
    ghost.set_record_id(Some(RecordId::new(
        PageId::new(table.id(), 3),
        SlotId::new(0),
    )));
    assert!(matches!(
        table.delete_tuple(pool, txn, &ghost),
        Err(DbError::TupleNotFound(_))
    ));

    // Slot that was never used
    ghost.set_record_id(Some(RecordId::new(
        PageId::new(table.id(), 0),
        SlotId::new(9),
    )));
    assert!(table.delete_tuple(pool, txn, &ghost).is_err());

    pool.delete_tuple(txn, &tuple).unwrap();
    // Already deleted
    assert!(table.delete_tuple(pool, txn, &tuple).is_err());
    db.abort(txn).unwrap();
}

#[test]
fn test_iterator_protocol() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();
    let pool = db.buffer_pool();

    let txn = db.begin();
    for id in 0..3 {
        pool.insert_tuple(txn, table.id(), &mut row(table.schema(), id, 8))
            .unwrap();
    }
    db.commit(txn).unwrap();

    let txn = db.begin();
    let mut iter = table.iterator(pool, txn);
    assert!(matches!(iter.has_next(), Err(DbError::IteratorNotOpen)));
    assert!(matches!(iter.next_tuple(), Err(DbError::IteratorNotOpen)));
    assert!(matches!(iter.rewind(), Err(DbError::IteratorNotOpen)));
    assert!(iter.next().is_none());

    iter.open().unwrap();
    assert!(matches!(iter.open(), Err(DbError::IteratorAlreadyOpen)));

    let mut first_pass = Vec::new();
    while iter.has_next().unwrap() {
        first_pass.push(iter.next_tuple().unwrap());
    }
    assert_eq!(first_pass.len(), 3);
    assert!(matches!(iter.next_tuple(), Err(DbError::IteratorExhausted)));

    iter.rewind().unwrap();
    let second_pass: Vec<Tuple> = iter.by_ref().map(|t| t.unwrap()).collect();
    assert_eq!(first_pass, second_pass);
    assert!(second_pass.iter().all(|t| t.record_id().is_some()));

    iter.close();
    assert!(matches!(iter.has_next(), Err(DbError::IteratorNotOpen)));
    iter.open().unwrap();
    assert!(iter.has_next().unwrap());

    // Scanned pages stay locked after close
    assert!(pool.holds_lock(txn, PageId::new(table.id(), 0)));
    db.commit(txn).unwrap();
}

#[test]
fn test_scan_empty_table() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();

    let txn = db.begin();
    let mut iter = table.scan(db.buffer_pool(), txn);
    iter.open().unwrap();
    assert!(!iter.has_next().unwrap());
    assert!(matches!(iter.next_tuple(), Err(DbError::IteratorExhausted)));
    assert!(iter.next().is_none());
}

#[test]
fn test_scan_skips_empty_pages() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();

    let empty = HeapPage::empty_page_data();
    for n in 0..3 {
        let pid = PageId::new(table.id(), n);
        let mut page = HeapPage::new(pid, &empty, table.schema().clone()).unwrap();
        if n == 2 {
            page.insert_tuple(&mut row(table.schema(), 7, 3)).unwrap();
        }
        table.write_page(&page).unwrap();
    }

    assert_eq!(scan_ids(&db, &table), vec![7]);
}

#[test]
fn test_page_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();

    let pid = PageId::new(table.id(), 0);
    let mut page = HeapPage::new(pid, &HeapPage::empty_page_data(), table.schema().clone()).unwrap();
    page.insert_tuple(&mut row(table.schema(), 1, 20)).unwrap();
    page.insert_tuple(&mut row(table.schema(), 2, 30)).unwrap();
    table.write_page(&page).unwrap();

    let read = table.read_page(pid).unwrap();
    assert_eq!(read.id(), pid);
    assert_eq!(read.page_data(), page.page_data());
    assert_eq!(read.is_dirty(), None);

    assert!(matches!(
        table.read_page(PageId::new(table.id(), 1)),
        Err(DbError::PageOutOfRange(_))
    ));
}

#[test]
fn test_table_id_follows_path() {
    let dir = TempDir::new().unwrap();
    let schema = create_schema();

    let a = HeapFile::open(dir.path().join("a.dat"), schema.clone()).unwrap();
    let a_again = HeapFile::open(dir.path().join(".").join("a.dat"), schema.clone()).unwrap();
    let b = HeapFile::open(dir.path().join("b.dat"), schema).unwrap();

    assert_eq!(a.id(), a_again.id());
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_reject_partial_page_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("torn.dat");
    std::fs::write(&path, vec![0u8; PAGE_SIZE + 100]).unwrap();

    let db = create_db();
    assert!(matches!(
        db.open_table(&path, "torn", create_schema()),
        Err(DbError::InvalidTableFile { .. })
    ));
}

#[test]
fn test_committed_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.dat");

    let table_id = {
        let db = create_db();
        let table = db.open_table(&path, "t", create_schema()).unwrap();
        let txn = db.begin();
        for id in 0..5 {
            db.buffer_pool()
                .insert_tuple(txn, table.id(), &mut row(table.schema(), id, 16))
                .unwrap();
        }
        db.commit(txn).unwrap();

        let txn = db.begin();
        db.buffer_pool()
            .insert_tuple(txn, table.id(), &mut row(table.schema(), 99, 16))
            .unwrap();
        db.abort(txn).unwrap();
        table.id()
    };

    let db = create_db();
    let table = db.open_table(&path, "t", create_schema()).unwrap();
    assert_eq!(table.id(), table_id);
    assert_eq!(scan_ids(&db, &table), vec![0, 1, 2, 3, 4]);

    let txn = db.begin();
    let page = db
        .buffer_pool()
        .get_page(txn, PageId::new(table_id, 0), Permissions::ReadOnly)
        .unwrap();
    assert_eq!(HeapPage::from_page(&**page.read()).unwrap().tuple_count(), 5);
}

#[test]
fn test_scan_stops_after_lock_abort() {
    let dir = TempDir::new().unwrap();
    let db = create_db();
    let table = db
        .open_table(dir.path().join("t.dat"), "t", create_schema())
        .unwrap();
    let pool = db.buffer_pool();

    let writer = db.begin();
    pool.insert_tuple(writer, table.id(), &mut row(table.schema(), 1, 8))
        .unwrap();

    // The writer still holds page 0 exclusively
    let reader = db.begin();
    let mut iter = table.scan(pool, reader);
    iter.open().unwrap();
    let results: Vec<_> = iter.by_ref().collect();

    assert_eq!(results.len(), 1);
    assert!(matches!(&results[0], Err(e) if e.is_abort()));
    assert!(!iter.is_open());
    assert!(matches!(iter.has_next(), Err(DbError::IteratorNotOpen)));

    db.abort(reader).unwrap();
    db.commit(writer).unwrap();
}
