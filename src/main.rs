use heapdb::common::DatabaseConfig;
use heapdb::storage::{DbFile, DbFileIterator};
use heapdb::tuple::{DataType, Schema, TupleBuilder};
use heapdb::Database;
use tracing_subscriber::EnvFilter;

fn main() -> heapdb::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("heapdb - a disk-oriented page store");
    println!("===================================\n");

    let db_path = std::env::temp_dir().join("heapdb_demo.dat");
    // Start from an empty table on every run
    let _ = std::fs::remove_file(&db_path);

    let db = Database::new(DatabaseConfig::new(8))?;
    let schema = Schema::builder()
        .column("id", DataType::Integer)
        .column("name", DataType::VarChar(64))
        .nullable_column("score", DataType::Double)
        .build_arc();
    let table = db.open_table(&db_path, "players", schema.clone())?;
    println!("Opened table 'players' at {} ({})", db_path.display(), table.id());

    // Committed inserts reach the file
    let txn = db.begin();
    for (id, name) in [(1i32, "ada"), (2, "brian"), (3, "chen")] {
        let mut tuple = TupleBuilder::new(schema.clone())
            .value(id)
            .value(name)
            .value(id as f64 * 1.5)
            .build();
        db.buffer_pool().insert_tuple(txn, table.id(), &mut tuple)?;
        if let Some(rid) = tuple.record_id() {
            println!("Inserted {} at {}", tuple, rid);
        }
    }
    db.commit(txn)?;
    println!(
        "Committed {}: file has {} page(s)\n",
        txn,
        table.num_pages()?
    );

    // Aborted inserts vanish
    let txn = db.begin();
    let mut ghost = TupleBuilder::new(schema.clone())
        .value(99)
        .value("ghost")
        .null()
        .build();
    db.buffer_pool().insert_tuple(txn, table.id(), &mut ghost)?;
    db.abort(txn)?;
    println!("Aborted {} after inserting {}\n", txn, ghost);

    let txn = db.begin();
    let mut scan = table.iterator(db.buffer_pool(), txn);
    scan.open()?;
    println!("Scan:");
    let mut count = 0;
    for tuple in scan {
        println!("  {}", tuple?);
        count += 1;
    }
    db.commit(txn)?;

    let disk = table.disk_manager();
    println!(
        "\n{} tuple(s); {} page read(s), {} page write(s)",
        count,
        disk.num_reads(),
        disk.num_writes()
    );

    Ok(())
}
