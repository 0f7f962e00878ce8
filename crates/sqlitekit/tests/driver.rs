//! End-to-end driver tests over real SQLite databases.

use sqlitekit::{
    Aggregate, BlobOptions, Client, Database, ErrorKind, FunctionOptions, OpenOptions, Params,
    Preparable, Queryable, Template, TransactionBehavior, TransactionHandle, Transactional, Value,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

fn temp_db_path(tag: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "sqlitekit_test_{}_{}_{}.db",
        tag,
        std::process::id(),
        n
    ))
}

fn test_table(client: &Client) {
    client
        .execute(
            "CREATE TABLE test (
                id INTEGER PRIMARY KEY,
                integer INTEGER,
                text TEXT,
                double REAL,
                blob BLOB,
                nullable TEXT
            )",
            Params::None,
        )
        .unwrap();
}

#[test]
fn select_version_in_both_shapes() {
    let client = Client::memory().unwrap();

    let row = client
        .query_one("SELECT sqlite_version() version", Params::None)
        .unwrap()
        .unwrap();
    let version = row.get_named::<String>("version").unwrap();
    assert!(!version.is_empty());
    assert!(version.starts_with('3'));

    let array = client
        .query_one_array("SELECT sqlite_version()", Params::None)
        .unwrap()
        .unwrap();
    assert_eq!(array, vec![Value::Text(version)]);
}

#[test]
fn open_missing_file_without_create_is_code_14() {
    let path = temp_db_path("missing");
    let err = Client::open(
        path.to_str().unwrap(),
        OpenOptions::default().create(false),
    )
    .unwrap_err();

    assert_eq!(err.code(), Some(14));
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    assert!(!path.exists());
}

#[test]
fn insert_and_select_round_trip() {
    let client = Client::memory().unwrap();
    test_table(&client);

    let stmt = client
        .prepare("INSERT INTO test (integer, text, double, blob, nullable) VALUES (?, ?, ?, ?, ?)")
        .unwrap();
    let changes = stmt
        .run([
            Value::Int(0),
            Value::from("hello world"),
            Value::Real(3.14),
            Value::Blob(vec![1, 2, 3]),
            Value::Null,
        ])
        .unwrap();
    stmt.finalize().unwrap();

    assert_eq!(changes, 1);
    assert_eq!(client.database().last_insert_rowid().unwrap(), 1);
    assert_eq!(client.database().changes().unwrap(), 1);

    let row = client
        .query_one(
            "SELECT integer, text, double, blob, nullable FROM test",
            Params::None,
        )
        .unwrap()
        .unwrap();
    assert_eq!(row.get_by_name("integer"), Some(&Value::Int(0)));
    assert_eq!(
        row.get_by_name("text"),
        Some(&Value::Text("hello world".to_string()))
    );
    assert_eq!(row.get_by_name("double"), Some(&Value::Real(3.14)));
    assert_eq!(row.get_by_name("blob"), Some(&Value::Blob(vec![1, 2, 3])));
    assert_eq!(row.get_by_name("nullable"), Some(&Value::Null));
}

#[test]
fn bind_round_trip_is_bit_identical() {
    let client = Client::memory().unwrap();
    let stmt = client.prepare("SELECT ? v").unwrap();

    // bool reads back as integer 0/1
    assert_eq!(
        stmt.get_array([Value::Bool(true)]).unwrap().unwrap(),
        vec![Value::Int(1)]
    );
    assert_eq!(
        stmt.get_array([Value::Bool(false)]).unwrap().unwrap(),
        vec![Value::Int(0)]
    );

    let cases = [
        Value::Null,
        Value::Int(0),
        Value::Int(sqlitekit::MAX_SAFE_INTEGER),
        Value::Int(sqlitekit::MIN_SAFE_INTEGER),
        Value::Real(std::f64::consts::PI),
        Value::Real(-0.0),
        Value::Text(String::new()),
        Value::Text("héllo wörld".to_string()),
        Value::Blob(Vec::new()),
        Value::Blob(vec![0, 127, 255]),
    ];
    for value in cases {
        let out = stmt.get_array([value.clone()]).unwrap().unwrap();
        assert_eq!(out, vec![value.clone()], "round-trip of {value:?}");
    }
}

#[test]
fn repeated_run_accumulates_changes() {
    let client = Client::memory().unwrap();
    test_table(&client);

    let stmt = client
        .prepare("INSERT INTO test (integer) VALUES (?)")
        .unwrap();
    let n = 25;
    let mut total = 0;
    for i in 0..n {
        total += stmt.run([Value::Int(i)]).unwrap();
    }
    assert_eq!(total, n as u64);
    assert_eq!(client.database().total_changes().unwrap(), n as u64);
}

#[test]
fn scoped_transaction_inserts_ten_rows() {
    let client = Client::memory().unwrap();
    test_table(&client);

    client
        .transaction(TransactionBehavior::Deferred, |tx| {
            let stmt = tx.prepare(
                "INSERT INTO test (integer, text, double, blob, nullable) VALUES (?, ?, ?, ?, ?)",
            )?;
            for i in 0..10i64 {
                stmt.run([
                    Value::Int(i),
                    Value::Text(format!("hello {i}")),
                    Value::Real(3.14),
                    Value::Blob(vec![3, 2, 1]),
                    Value::Null,
                ])?;
            }
            stmt.finalize()
        })
        .unwrap();

    let rows = client
        .query(
            "SELECT * FROM test WHERE integer != 1 AND text != 'hello world'",
            Params::None,
        )
        .unwrap();
    assert_eq!(rows.len(), 9);
}

#[test]
fn failed_transaction_leaves_no_trace() {
    let client = Client::memory().unwrap();
    test_table(&client);

    let before = client
        .query("SELECT * FROM test", Params::None)
        .unwrap()
        .len();

    let out: sqlitekit::Result<()> =
        client.transaction(TransactionBehavior::Immediate, |tx| {
            tx.execute("INSERT INTO test (integer) VALUES (1)", Params::None)?;
            // Constraint failure: duplicate rowid
            tx.execute("INSERT INTO test (id) VALUES (1), (1)", Params::None)?;
            Ok(())
        });

    assert!(out.is_err());
    assert!(out.unwrap_err().is_constraint());
    let after = client
        .query("SELECT * FROM test", Params::None)
        .unwrap()
        .len();
    assert_eq!(before, after);
    assert!(!client.database().in_transaction());
}

#[test]
fn template_queries_match_spec_shapes() {
    let client = Client::memory().unwrap();

    let rows = client
        .query_template(
            &Template::new("SELECT ")
                .value(1i64)
                .text(" a, ")
                .value(std::f64::consts::PI)
                .text(" b, ")
                .value(vec![1u8, 2])
                .text(" c"),
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_by_name("a"), Some(&Value::Int(1)));
    assert_eq!(
        rows[0].get_by_name("b"),
        Some(&Value::Real(std::f64::consts::PI))
    );
    assert_eq!(rows[0].get_by_name("c"), Some(&Value::Blob(vec![1, 2])));

    let rows = client
        .query_template(&Template::new("SELECT ").value("1; DROP TABLE"))
        .unwrap();
    assert_eq!(
        rows[0].get_named::<String>("?").unwrap(),
        "1; DROP TABLE"
    );
}

#[test]
fn scalar_and_aggregate_functions() {
    let client = Client::memory().unwrap();
    let db = client.database();

    db.function(
        "add",
        FunctionOptions::new().args(2).deterministic(true),
        |args| {
            Ok(Value::Int(
                args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0),
            ))
        },
    )
    .unwrap();

    let row = client
        .query_one("SELECT add(1, 2) v", Params::None)
        .unwrap()
        .unwrap();
    assert_eq!(row.get_named::<i64>("v").unwrap(), 3);

    client
        .execute("CREATE TABLE n (v INTEGER)", Params::None)
        .unwrap();
    client
        .execute("INSERT INTO n VALUES (1), (2), (3), (4)", Params::None)
        .unwrap();

    db.aggregate(
        "fold_sum",
        FunctionOptions::new().args(1),
        Aggregate::new(0i64, |acc, args| {
            Ok(Value::Int(
                acc.as_i64().unwrap_or(0) + args[0].as_i64().unwrap_or(0),
            ))
        }),
    )
    .unwrap();

    let row = client
        .query_one("SELECT fold_sum(v) s FROM n", Params::None)
        .unwrap()
        .unwrap();
    assert_eq!(row.get_named::<i64>("s").unwrap(), 10);
}

#[test]
fn close_finalizes_every_statement() {
    let client = Client::memory().unwrap();
    test_table(&client);

    let s1 = client.prepare("SELECT * FROM test").unwrap();
    let s2 = client.prepare("INSERT INTO test (integer) VALUES (?)").unwrap();
    let _s3 = client.prepare("SELECT 1").unwrap();
    assert_eq!(client.database().statement_count(), 3);

    client.close().unwrap();
    assert_eq!(client.database().statement_count(), 0);
    assert!(!client.is_open());

    // Outstanding statement objects degrade to typed errors.
    assert!(matches!(
        s1.all(()),
        Err(sqlitekit::Error::ConnectionClosed)
    ));
    assert!(matches!(
        s2.run([Value::Int(1)]),
        Err(sqlitekit::Error::ConnectionClosed)
    ));

    // Closed-connection properties error; close stays a no-op.
    assert!(client.database().changes().is_err());
    assert!(client.database().last_insert_rowid().is_err());
    assert!(client.database().autocommit().is_err());
    client.close().unwrap();
}

#[test]
fn events_fire_in_lifecycle_order() {
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let db = Database::new(":memory:", OpenOptions::default()).unwrap();
    let l1 = Rc::clone(&log);
    db.on_connect(move |e| l1.borrow_mut().push(format!("connect:{}", e.path)));
    let l2 = Rc::clone(&log);
    db.on_close(move |e| l2.borrow_mut().push(format!("close:{}", e.path)));

    db.connect().unwrap();
    db.exec("CREATE TABLE t (v)").unwrap();
    log.borrow_mut().push("query".to_string());
    db.close().unwrap();

    assert_eq!(
        &*log.borrow(),
        &["connect::memory:", "query", "close::memory:"]
    );
}

#[test]
fn panicking_listener_does_not_block_others() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));

    let reached = Rc::new(RefCell::new(false));
    let db = Database::new(":memory:", OpenOptions::default()).unwrap();
    db.on_connect(|_| panic!("bad listener"));
    let r = Rc::clone(&reached);
    db.on_connect(move |_| *r.borrow_mut() = true);

    db.connect().unwrap();
    std::panic::set_hook(prev_hook);

    assert!(*reached.borrow());
}

#[test]
fn streaming_yields_exactly_k_and_is_not_restartable() {
    let client = Client::memory().unwrap();
    test_table(&client);
    client
        .execute(
            "INSERT INTO test (integer) VALUES (1), (2), (3), (4), (5)",
            Params::None,
        )
        .unwrap();

    let stmt = client.prepare("SELECT integer FROM test ORDER BY id").unwrap();
    let mut rows = stmt.iter(()).unwrap();
    assert!(rows.next().is_some());

    // A competing traversal before the first is drained errors.
    assert!(matches!(
        stmt.iter(()),
        Err(sqlitekit::Error::StatementBusy)
    ));

    let rest: Vec<_> = rows.by_ref().collect::<sqlitekit::Result<Vec<_>>>().unwrap();
    assert_eq!(rest.len(), 4);
    assert!(rows.next().is_none());
    stmt.finalize().unwrap();
}

#[test]
fn file_database_and_url_forms_persist() {
    let path = temp_db_path("file");
    let path_str = path.to_str().unwrap().to_string();

    {
        let client = Client::open(&path_str, OpenOptions::default()).unwrap();
        test_table(&client);
        client
            .execute("INSERT INTO test (text) VALUES ('persisted')", Params::None)
            .unwrap();
        client.close().unwrap();
    }

    {
        let url = format!("file://{path_str}");
        let client = Client::open(&url, OpenOptions::default().create(false)).unwrap();
        let row = client
            .query_one("SELECT text FROM test", Params::None)
            .unwrap()
            .unwrap();
        assert_eq!(row.get_named::<String>("text").unwrap(), "persisted");
        client.close().unwrap();
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn readonly_connection_rejects_writes() {
    let path = temp_db_path("readonly");
    let path_str = path.to_str().unwrap().to_string();

    {
        let client = Client::open(&path_str, OpenOptions::default()).unwrap();
        test_table(&client);
        client.close().unwrap();
    }

    let client = Client::open(&path_str, OpenOptions::default().readonly(true)).unwrap();
    assert!(
        client.query("SELECT * FROM test", Params::None).is_ok()
    );
    let err = client
        .execute("INSERT INTO test (integer) VALUES (1)", Params::None)
        .unwrap_err();
    // SQLITE_READONLY is primary code 8
    assert_eq!(err.code().map(|c| c & 0xff), Some(8));
    client.close().unwrap();

    let _ = std::fs::remove_file(&path);
}

#[test]
fn blob_io_through_client() {
    let client = Client::memory().unwrap();
    client
        .execute(
            "CREATE TABLE files (id INTEGER PRIMARY KEY, data BLOB)",
            Params::None,
        )
        .unwrap();
    client
        .execute("INSERT INTO files (data) VALUES (zeroblob(4))", Params::None)
        .unwrap();

    let blob = client
        .database()
        .open_blob(&BlobOptions::new("files", "data", 1))
        .unwrap();
    blob.write_at(&[0xde, 0xad, 0xbe, 0xef], 0).unwrap();
    blob.close().unwrap();

    let row = client
        .query_one("SELECT data FROM files", Params::None)
        .unwrap()
        .unwrap();
    assert_eq!(
        row.get_by_name("data"),
        Some(&Value::Blob(vec![0xde, 0xad, 0xbe, 0xef]))
    );
}

#[test]
fn online_backup_copies_database() {
    let client = Client::memory().unwrap();
    test_table(&client);
    client
        .execute(
            "INSERT INTO test (text) VALUES ('alpha'), ('beta')",
            Params::None,
        )
        .unwrap();

    let path = temp_db_path("backup");
    let dest = Database::open(path.to_str().unwrap(), OpenOptions::default()).unwrap();
    client.database().backup_to(&dest, "main", -1).unwrap();

    let rows = dest
        .query("SELECT text FROM test ORDER BY id", Params::None)
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_named::<String>("text").unwrap(), "alpha");
    dest.close().unwrap();

    let _ = std::fs::remove_file(&path);
}

#[test]
fn cross_connection_visibility_after_commit() {
    let path = temp_db_path("shared");
    let path_str = path.to_str().unwrap().to_string();

    let writer = Client::open(&path_str, OpenOptions::default()).unwrap();
    test_table(&writer);

    let reader = Client::open(&path_str, OpenOptions::default().create(false)).unwrap();

    let tx = writer.begin_transaction(TransactionBehavior::Immediate).unwrap();
    tx.execute("INSERT INTO test (integer) VALUES (7)", Params::None)
        .unwrap();
    tx.commit().unwrap();

    let rows = reader.query("SELECT integer FROM test", Params::None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_named::<i64>("integer").unwrap(), 7);

    writer.close().unwrap();
    reader.close().unwrap();
    let _ = std::fs::remove_file(&path);
}

#[test]
fn load_extension_requires_opt_in() {
    let client = Client::memory().unwrap();
    let err = client
        .database()
        .load_extension("/nonexistent/extension", None)
        .unwrap_err();
    assert!(matches!(err, sqlitekit::Error::ExtensionsDisabled));
}

#[test]
fn int64_connection_option_applies_to_statements() {
    let client = Client::open(":memory:", OpenOptions::default().int64(true)).unwrap();
    let big = sqlitekit::MAX_SAFE_INTEGER + 7;

    let row = client
        .query_one("SELECT ? v", Params::Positional(vec![Value::Int(big)]))
        .unwrap()
        .unwrap();
    assert_eq!(row.get_named::<i64>("v").unwrap(), big);
}
