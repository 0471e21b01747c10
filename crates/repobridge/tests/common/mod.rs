//! In-memory store, host transaction manager and entities shared by the
//! integration tests.

#![allow(dead_code)]

use repobridge::prelude::*;
use repobridge::{IsolationLevel, NamingStrategyKind, NativeTransaction};
use repobridge_core::{
    CompareOp, DeleteStatement, InsertStatement, NullHandling, OnConflict, OrderExpr, SelectQuery,
    UpdateStatement,
};
use repobridge_query::pattern;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, Once};

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub created_at: Option<i64>,
}

impl Customer {
    pub fn new(id: i64, first: &str, last: &str) -> Self {
        Self {
            id: Some(id),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            email: Some(format!("{}.{}@example.com", first, last).to_lowercase()),
            age: None,
            created_at: None,
        }
    }

    pub fn age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn probe() -> Self {
        Self::default()
    }
}

impl Mapped for Customer {
    const NAME: &'static str = "Customer";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("firstName", SqlType::Text).nullable(true),
            PropertyInfo::new("lastName", SqlType::Text).nullable(true),
            PropertyInfo::new("email", SqlType::Text)
                .nullable(true)
                .with(&[Annotation::Indexed(None)]),
            PropertyInfo::new("age", SqlType::Integer).nullable(true),
            PropertyInfo::new("createdAt", SqlType::Timestamp).with(&[Annotation::Transient]),
        ];
        P
    }
}

impl Entity for Customer {
    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("firstName", self.first_name.clone().into()),
            ("lastName", self.last_name.clone().into()),
            ("email", self.email.clone().into()),
            ("age", self.age.into()),
            ("createdAt", self.created_at.map(Value::Timestamp).unwrap_or_default()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        let age = match row.value("age").as_i64() {
            Some(age) => Some(i32::try_from(age).map_err(|e| {
                Error::conversion("Customer", "age", e.to_string())
            })?),
            None => None,
        };
        Ok(Self {
            id: row.value("id").as_i64(),
            first_name: row.value("firstName").as_str().map(str::to_string),
            last_name: row.value("lastName").as_str().map(str::to_string),
            email: row.value("email").as_str().map(str::to_string),
            age,
            created_at: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub id: Option<i64>,
    pub balance: i64,
    pub version: Option<i64>,
}

impl Mapped for Ledger {
    const NAME: &'static str = "Ledger";
    fn annotations() -> &'static [Annotation] {
        &[Annotation::Table("ledgers")]
    }
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("balance", SqlType::BigInt),
            PropertyInfo::new("version", SqlType::BigInt).with(&[Annotation::Version]),
        ];
        P
    }
}

impl Entity for Ledger {
    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("balance", self.balance.into()),
            ("version", self.version.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.value("id").as_i64(),
            balance: row.value("balance").as_i64().unwrap_or_default(),
            version: row.value("version").as_i64(),
        })
    }
}

/// Value object without an identifier; never a valid repository root.
#[derive(Debug, Clone, Default)]
pub struct Address {
    pub city: Option<String>,
}

impl Mapped for Address {
    const NAME: &'static str = "Address";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[PropertyInfo::new("city", SqlType::Text)];
        P
    }
}

impl Entity for Address {
    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![("city", self.city.clone().into())]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            city: row.value("city").as_str().map(str::to_string),
        })
    }
}

/// Entity keyed by a UUID; callers often pass the key as plain text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Token {
    pub id: Option<String>,
    pub label: Option<String>,
}

impl Token {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            label: Some(label.to_string()),
        }
    }
}

impl Mapped for Token {
    const NAME: &'static str = "Token";
    fn annotations() -> &'static [Annotation] {
        &[Annotation::Table("tokens")]
    }
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::Uuid).with(&[Annotation::Id]),
            PropertyInfo::new("label", SqlType::Text).nullable(true),
        ];
        P
    }
}

impl Entity for Token {
    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.clone().map(Value::Uuid).unwrap_or_default()),
            ("label", self.label.clone().into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.value("id").as_str().map(str::to_string),
            label: row.value("label").as_str().map(str::to_string),
        })
    }
}

/// Two entities sharing one display name in different tables.
macro_rules! document_entity {
    ($ty:ident, $table:literal) => {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $ty {
            pub id: Option<i64>,
            pub body: Option<String>,
        }

        impl $ty {
            pub fn new(id: i64, body: &str) -> Self {
                Self {
                    id: Some(id),
                    body: Some(body.to_string()),
                }
            }
        }

        impl Mapped for $ty {
            const NAME: &'static str = stringify!($ty);
            fn annotations() -> &'static [Annotation] {
                &[Annotation::Table($table), Annotation::DisplayName("Document")]
            }
            fn properties() -> &'static [PropertyInfo] {
                static P: &[PropertyInfo] = &[
                    PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
                    PropertyInfo::new("body", SqlType::Text).nullable(true),
                ];
                P
            }
        }

        impl Entity for $ty {
            fn to_values(&self) -> Vec<(&'static str, Value)> {
                vec![("id", self.id.into()), ("body", self.body.clone().into())]
            }

            fn from_row(row: &Row) -> Result<Self> {
                Ok(Self {
                    id: row.value("id").as_i64(),
                    body: row.value("body").as_str().map(str::to_string),
                })
            }
        }
    };
}

document_entity!(Note, "notes");
document_entity!(Memo, "memos");

/// Cache region of an entity type.
pub fn region<E: Mapped>() -> &'static str {
    std::any::type_name::<E>()
}

pub fn mapping() -> Arc<MappingContext> {
    Arc::new(MappingContext::new(
        repobridge::MappingConfig::new().naming(NamingStrategyKind::SnakeCase),
    ))
}

// ============================================================================
// Store
// ============================================================================

type Tables = HashMap<String, Vec<Row>>;

/// A store holding rows in memory. Native transactions snapshot the tables
/// on begin and restore them on rollback.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    snapshots: Mutex<Vec<Tables>>,
    next_id: AtomicI64,
    pub selects: AtomicUsize,
    pub key_lookups: AtomicUsize,
    pub last_query: Mutex<Option<SelectQuery>>,
    pub isolations: Mutex<Vec<Option<IsolationLevel>>>,
    pub fail_native_commit: AtomicBool,
    pub fail_native_begin: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1000),
            ..Self::default()
        })
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn selects(&self) -> usize {
        self.selects.load(AtomicOrdering::SeqCst)
    }

    pub fn key_lookups(&self) -> usize {
        self.key_lookups.load(AtomicOrdering::SeqCst)
    }

    fn matches(filter: Option<&Expr>, row: &Row) -> bool {
        filter.is_none_or(|expr| eval(expr, row))
    }
}

fn compare(a: &Value, b: &Value, ignore_case: bool) -> Option<Ordering> {
    match (a, b) {
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        _ => match (a.as_i64(), b.as_i64(), a.as_str(), b.as_str()) {
            (Some(x), Some(y), _, _) => Some(x.cmp(&y)),
            (_, _, Some(x), Some(y)) if ignore_case => Some(x.to_lowercase().cmp(&y.to_lowercase())),
            (_, _, Some(x), Some(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

fn eval(expr: &Expr, row: &Row) -> bool {
    match expr {
        Expr::Compare { column, op, value } => {
            let current = row.value(column);
            if current.is_null() || value.is_null() {
                return false;
            }
            let ordering = compare(&current, value, false);
            match op {
                CompareOp::Eq => current.key_eq(value) || current == *value,
                CompareOp::Ne => !(current.key_eq(value) || current == *value),
                CompareOp::Lt => ordering == Some(Ordering::Less),
                CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                CompareOp::Gt => ordering == Some(Ordering::Greater),
                CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            }
        }
        Expr::EqIgnoreCase { column, value } => row
            .value(column)
            .as_str()
            .is_some_and(|s| s.to_lowercase() == value.to_lowercase()),
        Expr::Like {
            column,
            pattern: p,
            case_insensitive,
        } => row
            .value(column)
            .as_str()
            .is_some_and(|s| pattern::matches_like(s, p, *case_insensitive)),
        Expr::Regex {
            column,
            pattern: p,
            case_insensitive,
        } => row
            .value(column)
            .as_str()
            .is_some_and(|s| pattern::matches_pattern(s, p, *case_insensitive)),
        Expr::IsNull { column, negated } => row.value(column).is_null() != *negated,
        Expr::In { column, values } => {
            let current = row.value(column);
            values.iter().any(|v| current.key_eq(v) || current == *v)
        }
        Expr::And(all) => all.iter().all(|e| eval(e, row)),
        Expr::Or(any) => any.iter().any(|e| eval(e, row)),
        Expr::Not(inner) => !eval(inner, row),
        // Raw text is not interpreted here.
        Expr::Raw(_) => true,
    }
}

fn sort_rows(rows: &mut [Row], order_by: &[OrderExpr]) {
    rows.sort_by(|a, b| {
        for order in order_by {
            let (x, y) = (a.value(&order.column), b.value(&order.column));
            let ordering = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => match order.nulls {
                    NullHandling::NullsLast => Ordering::Greater,
                    _ => Ordering::Less,
                },
                (false, true) => match order.nulls {
                    NullHandling::NullsLast => Ordering::Less,
                    _ => Ordering::Greater,
                },
                (false, false) => {
                    let o = compare(&x, &y, order.ignore_case).unwrap_or(Ordering::Equal);
                    match order.direction {
                        Direction::Asc => o,
                        Direction::Desc => o.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn key_of(row: &Row, columns: &[String]) -> Vec<Value> {
    columns.iter().map(|c| row.value(c)).collect()
}

impl MemoryStore {
    fn write_rows(&self, statement: &InsertStatement, upsert: bool) -> u64 {
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(statement.table.clone()).or_default();
        let mut affected = 0;
        for pairs in &statement.rows {
            let mut row = Row::from_pairs(pairs.clone());
            if row.value("id").is_null() {
                let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
                row.insert("id", Value::BigInt(id));
            }
            let (target, columns) = match &statement.on_conflict {
                Some(OnConflict::DoUpdate { columns, target }) if upsert => {
                    (target.clone(), Some(columns.clone()))
                }
                _ => (vec!["id".to_string()], None),
            };
            let key = key_of(&row, &target);
            let existing = table.iter_mut().find(|r| {
                key_of(r, &target)
                    .iter()
                    .zip(&key)
                    .all(|(a, b)| a.key_eq(b) || a == b)
            });
            match (existing, columns) {
                (Some(existing), Some(columns)) => {
                    for column in &columns {
                        existing.insert(column.clone(), row.value(column));
                    }
                    affected += 1;
                }
                (Some(_), None) => {}
                (None, _) => {
                    table.push(row);
                    affected += 1;
                }
            }
        }
        affected
    }
}

impl NativeTransaction for MemoryStore {
    fn begin_transaction(&self, isolation: Option<IsolationLevel>) -> Result<()> {
        self.isolations.lock().unwrap().push(isolation);
        if self.fail_native_begin.load(AtomicOrdering::SeqCst) {
            return Err(Error::store("native session unavailable"));
        }
        let snapshot = self.tables.lock().unwrap().clone();
        self.snapshots.lock().unwrap().push(snapshot);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        if self.fail_native_commit.load(AtomicOrdering::SeqCst) {
            return Err(Error::store("native commit rejected"));
        }
        self.snapshots.lock().unwrap().pop();
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        if let Some(snapshot) = self.snapshots.lock().unwrap().pop() {
            *self.tables.lock().unwrap() = snapshot;
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.snapshots.lock().unwrap().is_empty()
    }
}

impl Store for MemoryStore {
    fn select(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        self.selects.fetch_add(1, AtomicOrdering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        let mut rows: Vec<Row> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| Self::matches(query.filter.as_ref(), row))
            .collect();
        sort_rows(&mut rows, &query.order_by);
        let offset = usize::try_from(query.offset.unwrap_or(0)).unwrap();
        let limit = query.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap());
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| {
                if query.columns.is_empty() {
                    row
                } else {
                    Row::from_pairs(query.columns.iter().map(|c| (c.clone(), row.value(c))))
                }
            })
            .collect())
    }

    fn count(&self, query: &SelectQuery) -> Result<u64> {
        Ok(self
            .rows(&query.table)
            .iter()
            .filter(|row| Self::matches(query.filter.as_ref(), row))
            .count() as u64)
    }

    fn insert(&self, statement: &InsertStatement) -> Result<u64> {
        Ok(self.write_rows(statement, false))
    }

    fn upsert(&self, statement: &InsertStatement) -> Result<u64> {
        Ok(self.write_rows(statement, true))
    }

    fn update(&self, statement: &UpdateStatement) -> Result<u64> {
        let mut tables = self.tables.lock().unwrap();
        let Some(table) = tables.get_mut(&statement.table) else {
            return Ok(0);
        };
        let mut affected = 0;
        for row in table.iter_mut() {
            if Self::matches(statement.filter.as_ref(), row) {
                for (column, value) in &statement.sets {
                    row.insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn delete(&self, statement: &DeleteStatement) -> Result<u64> {
        let mut tables = self.tables.lock().unwrap();
        let Some(table) = tables.get_mut(&statement.table) else {
            return Ok(0);
        };
        let before = table.len();
        table.retain(|row| !Self::matches(statement.filter.as_ref(), row));
        Ok((before - table.len()) as u64)
    }

    fn find_by_key(&self, table: &str, key_column: &str, key: &Value) -> Result<Option<Row>> {
        self.key_lookups.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(self
            .rows(table)
            .into_iter()
            .find(|row| row.value(key_column).key_eq(key)))
    }

    /// Understands `SELECT * FROM <table>` only.
    fn query_raw(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        match sql.strip_prefix("SELECT * FROM ") {
            Some(table) => Ok(self.rows(table.trim())),
            None => Err(Error::store(format!("unsupported query: {sql}"))),
        }
    }

    /// Understands `DELETE FROM <table>` only.
    fn execute_raw(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        match sql.strip_prefix("DELETE FROM ") {
            Some(table) => {
                let mut tables = self.tables.lock().unwrap();
                Ok(tables.remove(table.trim()).map_or(0, |rows| rows.len() as u64))
            }
            None => Err(Error::store(format!("unsupported statement: {sql}"))),
        }
    }
}

// ============================================================================
// Host transaction manager
// ============================================================================

#[derive(Debug, Default)]
pub struct HostManager {
    pub log: Mutex<Vec<String>>,
    next: AtomicU32,
    pub fail_commit: AtomicBool,
}

impl HostManager {
    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl HostTransactionManager for HostManager {
    type Status = u32;
    type Suspended = u32;

    fn begin(&self, definition: &TransactionDefinition) -> Result<u32> {
        let id = self.next.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        self.log
            .lock()
            .unwrap()
            .push(format!("begin {id} {}", definition.isolation));
        Ok(id)
    }

    fn commit(&self, status: u32) -> Result<()> {
        self.log.lock().unwrap().push(format!("commit {status}"));
        if self.fail_commit.load(AtomicOrdering::SeqCst) {
            return Err(Error::store("connection lost during commit"));
        }
        Ok(())
    }

    fn rollback(&self, status: u32) -> Result<()> {
        self.log.lock().unwrap().push(format!("rollback {status}"));
        Ok(())
    }

    fn suspend(&self, status: &mut u32) -> Result<u32> {
        self.log.lock().unwrap().push(format!("suspend {status}"));
        Ok(*status)
    }

    fn resume(&self, status: &mut u32, _suspended: u32) -> Result<()> {
        self.log.lock().unwrap().push(format!("resume {status}"));
        Ok(())
    }
}

/// Host manager shared between the operations under test and assertions.
#[derive(Debug, Clone, Default)]
pub struct SharedHost(pub Arc<HostManager>);

impl HostTransactionManager for SharedHost {
    type Status = u32;
    type Suspended = u32;

    fn begin(&self, definition: &TransactionDefinition) -> Result<u32> {
        self.0.begin(definition)
    }

    fn commit(&self, status: u32) -> Result<()> {
        self.0.commit(status)
    }

    fn rollback(&self, status: u32) -> Result<()> {
        self.0.rollback(status)
    }

    fn suspend(&self, status: &mut u32) -> Result<u32> {
        self.0.suspend(status)
    }

    fn resume(&self, status: &mut u32, suspended: u32) -> Result<()> {
        self.0.resume(status, suspended)
    }
}

pub type TestOps = Operations<MemoryStore, SharedHost>;

/// Operations over a fresh store, without caching.
pub fn operations() -> (TestOps, Arc<MemoryStore>, Arc<HostManager>) {
    init_tracing();
    let store = MemoryStore::new();
    let host = Arc::new(HostManager::default());
    let ops = Operations::new(Arc::clone(&store), mapping(), SharedHost(Arc::clone(&host)));
    (ops, store, host)
}
