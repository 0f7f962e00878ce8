//! Client façade.
//!
//! [`Client`] composes the database, transaction engine and event surface
//! behind the [`Queryable`]/[`Preparable`]/[`Transactional`] contracts and
//! adds streaming single-call helpers plus template queries. Each helper
//! runs over an ephemeral statement that is finalized when the call (or
//! the returned sequence) completes.

use crate::database::{ConnectionEvent, Database, OpenOptions};
use crate::statement::{Statement, StatementOptions};
use crate::template::Template;
use crate::transaction::Transaction;
use sqlitekit_core::{
    ColumnInfo, ListenerId, Params, Preparable, Queryable, Result, Row, TransactionBehavior,
    Transactional, Value, log_warn,
};
use std::sync::Arc;

/// A connected SQLite client.
#[derive(Debug)]
pub struct Client {
    db: Database,
}

impl Client {
    /// Open a connection to `path` (a filesystem path, `file:` URL or
    /// `":memory:"`).
    pub fn open(path: impl AsRef<str>, options: OpenOptions) -> Result<Self> {
        Ok(Self {
            db: Database::open(path, options)?,
        })
    }

    /// Open an in-memory database with default options.
    pub fn memory() -> Result<Self> {
        Self::open(":memory:", OpenOptions::default())
    }

    /// The underlying database, for blob/function/backup access.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Whether the connection is open.
    pub fn is_open(&self) -> bool {
        self.db.is_open()
    }

    /// Close the connection; see [`Database::close`].
    pub fn close(&self) -> Result<()> {
        self.db.close()
    }

    /// Compile a reusable statement with options.
    pub fn prepare_with(&self, sql: &str, options: StatementOptions) -> Result<Statement> {
        self.db.prepare_with(sql, options)
    }

    /// Stream object-shape rows; the ephemeral statement finalizes when
    /// the sequence is drained or dropped.
    pub fn query_many(&self, sql: &str, params: impl Into<Params>) -> Result<QueryRows> {
        QueryRows::new(self.db.prepare(sql)?, params.into())
    }

    /// Stream positional rows.
    pub fn query_many_array(
        &self,
        sql: &str,
        params: impl Into<Params>,
    ) -> Result<QueryArrayRows> {
        QueryArrayRows::new(self.db.prepare(sql)?, params.into())
    }

    /// Run a [`Template`] and collect object-shape rows.
    pub fn query_template(&self, template: &Template) -> Result<Vec<Row>> {
        self.query(template.sql(), Params::Positional(template.params().to_vec()))
    }

    /// Run a [`Template`] as a write, returning the change count.
    pub fn execute_template(&self, template: &Template) -> Result<u64> {
        self.execute(template.sql(), Params::Positional(template.params().to_vec()))
    }

    /// Subscribe to connect notifications.
    pub fn on_connect(&self, listener: impl Fn(&ConnectionEvent) + 'static) -> ListenerId {
        self.db.on_connect(listener)
    }

    /// Subscribe to close notifications.
    pub fn on_close(&self, listener: impl Fn(&ConnectionEvent) + 'static) -> ListenerId {
        self.db.on_close(listener)
    }
}

impl Queryable for Client {
    fn execute(&self, sql: &str, params: Params) -> Result<u64> {
        self.db.execute(sql, params)
    }

    fn query(&self, sql: &str, params: Params) -> Result<Vec<Row>> {
        self.db.query(sql, params)
    }

    fn query_one(&self, sql: &str, params: Params) -> Result<Option<Row>> {
        self.db.query_one(sql, params)
    }

    fn query_array(&self, sql: &str, params: Params) -> Result<Vec<Vec<Value>>> {
        self.db.query_array(sql, params)
    }

    fn query_one_array(&self, sql: &str, params: Params) -> Result<Option<Vec<Value>>> {
        self.db.query_one_array(sql, params)
    }
}

impl Preparable for Client {
    type Stmt = Statement;

    fn prepare(&self, sql: &str) -> Result<Statement> {
        self.db.prepare(sql)
    }
}

impl Transactional for Client {
    type Tx<'conn>
        = Transaction<'conn>
    where
        Self: 'conn;

    fn begin_transaction(&self, behavior: TransactionBehavior) -> Result<Transaction<'_>> {
        self.db.begin_transaction(behavior)
    }
}

/// Streaming object-shape rows over an owned ephemeral statement.
pub struct QueryRows {
    stmt: Statement,
    columns: Arc<ColumnInfo>,
    done: bool,
}

impl QueryRows {
    fn new(stmt: Statement, params: Params) -> Result<Self> {
        stmt.begin(params)?;
        let columns = stmt.column_info()?;
        Ok(Self {
            stmt,
            columns,
            done: false,
        })
    }

    fn finish(&mut self) {
        self.done = true;
        if let Err(err) = self.stmt.finalize() {
            log_warn!("error finalizing streamed statement: {err}");
        }
    }
}

impl Iterator for QueryRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.stmt.step_cursor() {
            Ok(true) => match self.stmt.row_values() {
                Ok(values) => Some(Ok(Row::with_columns(Arc::clone(&self.columns), values))),
                Err(err) => {
                    self.finish();
                    Some(Err(err))
                }
            },
            Ok(false) => {
                self.finish();
                None
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}

/// Streaming positional rows over an owned ephemeral statement.
pub struct QueryArrayRows {
    stmt: Statement,
    done: bool,
}

impl QueryArrayRows {
    fn new(stmt: Statement, params: Params) -> Result<Self> {
        stmt.begin(params)?;
        Ok(Self { stmt, done: false })
    }

    fn finish(&mut self) {
        self.done = true;
        if let Err(err) = self.stmt.finalize() {
            log_warn!("error finalizing streamed statement: {err}");
        }
    }
}

impl Iterator for QueryArrayRows {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.stmt.step_cursor() {
            Ok(true) => match self.stmt.row_values() {
                Ok(values) => Some(Ok(values)),
                Err(err) => {
                    self.finish();
                    Some(Err(err))
                }
            },
            Ok(false) => {
                self.finish();
                None
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_client() -> Client {
        let client = Client::memory().unwrap();
        client
            .execute(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)",
                Params::None,
            )
            .unwrap();
        client
            .execute("INSERT INTO t (name) VALUES ('a'), ('b'), ('c')", Params::None)
            .unwrap();
        client
    }

    #[test]
    fn eager_helpers_finalize_their_statements() {
        let client = seeded_client();

        let rows = client.query("SELECT * FROM t ORDER BY id", Params::None).unwrap();
        assert_eq!(rows.len(), 3);

        let row = client
            .query_one("SELECT name FROM t WHERE id = ?", Params::Positional(vec![2.into()]))
            .unwrap()
            .unwrap();
        assert_eq!(row.get_named::<String>("name").unwrap(), "b");

        let arrays = client
            .query_array("SELECT id FROM t ORDER BY id", Params::None)
            .unwrap();
        assert_eq!(arrays[0], vec![Value::Int(1)]);

        let one = client
            .query_one_array("SELECT id, name FROM t WHERE id = 3", Params::None)
            .unwrap()
            .unwrap();
        assert_eq!(one, vec![Value::Int(3), Value::Text("c".to_string())]);

        // Nothing leaked into the statement registry.
        assert_eq!(client.database().statement_count(), 0);
    }

    #[test]
    fn query_many_streams_exactly_k_rows() {
        let client = seeded_client();

        let rows = client.query_many("SELECT name FROM t ORDER BY id", ()).unwrap();
        let names: Vec<String> = rows
            .map(|r| r.and_then(|row| row.get_named("name")))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(client.database().statement_count(), 0);
    }

    #[test]
    fn query_many_drop_mid_stream_finalizes() {
        let client = seeded_client();

        {
            let mut rows = client.query_many("SELECT name FROM t", ()).unwrap();
            let _ = rows.next();
            assert_eq!(client.database().statement_count(), 1);
        }
        assert_eq!(client.database().statement_count(), 0);
    }

    #[test]
    fn query_many_array_streams_positionally() {
        let client = seeded_client();

        let rows: Vec<Vec<Value>> = client
            .query_many_array("SELECT id FROM t ORDER BY id DESC", ())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![vec![Value::Int(3)], vec![Value::Int(2)], vec![Value::Int(1)]]
        );
    }

    #[test]
    fn template_queries_substitute_placeholders() {
        let client = seeded_client();

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
        assert_eq!(rows[0].get_named::<i64>("a").unwrap(), 1);
        assert_eq!(
            rows[0].get_named::<f64>("b").unwrap(),
            std::f64::consts::PI
        );
        assert_eq!(rows[0].get_named::<Vec<u8>>("c").unwrap(), vec![1, 2]);

        // Hostile text stays a parameter.
        let rows = client
            .query_template(&Template::new("SELECT ").value("1; DROP TABLE t"))
            .unwrap();
        assert_eq!(
            rows[0].get_named::<String>("?").unwrap(),
            "1; DROP TABLE t"
        );
        assert_eq!(client.query("SELECT COUNT(*) n FROM t", Params::None).unwrap().len(), 1);
    }

    #[test]
    fn execute_template_counts_changes() {
        let client = seeded_client();

        let changes = client
            .execute_template(
                &Template::new("INSERT INTO t (name) VALUES (")
                    .value("d")
                    .text(")"),
            )
            .unwrap();
        assert_eq!(changes, 1);
        assert_eq!(client.database().last_insert_rowid().unwrap(), 4);
    }

    #[test]
    fn scoped_transaction_through_client() {
        let client = seeded_client();

        client
            .transaction(TransactionBehavior::Deferred, |tx| {
                tx.execute("DELETE FROM t WHERE id = 1", Params::None)
            })
            .unwrap();

        let rows = client.query("SELECT * FROM t", Params::None).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
