//! # SQLite 저장소 구현체
//!
//! `Store` 트레이트를 sqlx + SQLite로 구현합니다.
//!
//! ## 동작 방식
//! - `QuerySpec`을 `sqlx::QueryBuilder`로 SQL 문자열로 조립합니다.
//!   값은 전부 `?` 바인딩으로 전달하고, 컬럼 이름은 스키마 목록과 대조한 것만 씁니다.
//! - 부분 문자열 검색은 `REGEXP`(sqlx `regexp` 기능)에 `(?i)` 패턴을 넘깁니다.
//!   SQLite의 `lower()`/`LIKE`는 ASCII만 접으므로 "REUNIÃO"와 "reunião"를 같게 보지 못합니다.
//! - 각 행은 SQLite의 `json_object()`로 JSON 텍스트를 만들어 가져옵니다.
//!   관계(relationship)는 `LEFT JOIN` 후 중첩된 `json_object()`로 펼칩니다.
//!
//! ```sql
//! SELECT json_object('id', t.id, ..., 'professional', json_object('id', r0.id, 'name', r0.name))
//! FROM lessons t
//! LEFT JOIN professionals r0 ON r0.id = t.professional_id
//! WHERE ... ORDER BY ... LIMIT ? OFFSET ?
//! ```

use super::schema::{Relation, TableDef};
use super::{Filter, FilterValue, Order, Predicate, QueryResult, QuerySpec, Record, Store, StoreError, Table};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;
use std::str::FromStr;

/// SQLite 연결 풀을 감싼 저장소
///
/// `SqlitePool`은 내부적으로 Arc이므로 clone해도 같은 풀을 가리킵니다.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 연결 풀을 만듭니다. 데이터베이스 파일이 없으면 생성하고 외래키 검사를 켭니다.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            // 연결마다 REGEXP 함수 등록 (regex 크레이트 구현)
            .with_regexp();

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// `./migrations`의 아직 적용되지 않은 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_rows(
        &self,
        def: &'static TableDef,
        mut qb: QueryBuilder<'_, Sqlite>,
    ) -> Result<Vec<Value>, StoreError> {
        // SELECT 결과는 행마다 json_object() 텍스트 한 칸이므로 String 스칼라로 받습니다.
        let raw: Vec<String> = qb
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(def.name, e))?;

        // 텍스트 → serde_json::Value. 하나라도 깨져 있으면 전체를 MalformedRow로
        raw.iter()
            .map(|text| serde_json::from_str(text))
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|e| StoreError::MalformedRow(e.to_string()))
    }

    async fn count_rows(
        &self,
        def: &'static TableDef,
        filters: &[Filter],
    ) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {} t", def.name));
        push_filters(&mut qb, def, filters)?;

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(def.name, e))
    }

    /// `column = value`인 첫 행 (관계 펼침 없음)
    async fn fetch_first(
        &self,
        def: &'static TableDef,
        column: &'static str,
        value: i64,
    ) -> Result<Option<Value>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        push_select_head(&mut qb, def, &[]);
        qb.push(format!(" WHERE t.{column} = "));
        qb.push_bind(value);
        qb.push(" LIMIT 1");

        Ok(self.fetch_rows(def, qb).await?.into_iter().next())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn select(&self, spec: &QuerySpec) -> Result<QueryResult, StoreError> {
        // 스키마 정의를 먼저 찾아 두고, 컬럼/관계 이름은 모두 여기에 대조합니다.
        let def = spec.table.def();
        let relations = resolve_relations(def, &spec.embed)?;

        // SELECT json_object(...) FROM ... WHERE ... ORDER BY ... 순서로 조립
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        push_select_head(&mut qb, def, &relations);
        push_filters(&mut qb, def, &spec.filters)?;
        push_order(&mut qb, def, &spec.order)?;

        // 행 범위 [from, to] → LIMIT (to - from + 1) OFFSET from
        if let Some(range) = spec.range {
            qb.push(" LIMIT ");
            qb.push_bind(range.limit());
            qb.push(" OFFSET ");
            qb.push_bind(range.from.max(0));
        }

        let rows = self.fetch_rows(def, qb).await?;
        // 정확한 개수는 범위 없이 같은 조건으로 한 번 더 셉니다.
        let count = if spec.count {
            Some(self.count_rows(def, &spec.filters).await?)
        } else {
            None
        };

        tracing::trace!(table = def.name, rows = rows.len(), ?count, "store select");
        Ok(QueryResult { rows, count })
    }

    async fn insert(&self, table: Table, record: Record) -> Result<Value, StoreError> {
        let def = table.def();

        let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {}", def.name));
        if record.is_empty() {
            qb.push(" DEFAULT VALUES");
        } else {
            let columns = record
                .keys()
                .map(|key| checked_column(def, key))
                .collect::<Result<Vec<_>, _>>()?;
            // 컬럼 이름은 검사를 통과한 것만 SQL에 직접 넣고, 값은 전부 바인딩
            qb.push(format!(" ({}) VALUES (", columns.join(", ")));
            for (i, value) in record.values().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_json(&mut qb, value);
            }
            qb.push(")");
        }

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(def.name, e))?;

        // 복합키 테이블(lesson_students)도 SQLite 내부 rowid는 가지고 있습니다.
        let rowid = result.last_insert_rowid();
        self.fetch_first(def, "rowid", rowid)
            .await?
            .ok_or_else(|| StoreError::MalformedRow(format!("inserted row {rowid} not found in {}", def.name)))
    }

    async fn update(
        &self,
        table: Table,
        key_column: &str,
        key_value: i64,
        patch: Record,
    ) -> Result<Option<Value>, StoreError> {
        let def = table.def();
        let key = checked_column(def, key_column)?;

        if !patch.is_empty() {
            let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", def.name));
            for (i, (column, value)) in patch.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(format!("{} = ", checked_column(def, column)?));
                push_json(&mut qb, value);
            }
            qb.push(format!(" WHERE {key} = "));
            qb.push_bind(key_value);

            let result = qb
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::from_sqlx(def.name, e))?;

            // 바뀐 행이 없으면 대상 id가 없는 것
            if result.rows_affected() == 0 {
                return Ok(None);
            }
        }

        self.fetch_first(def, key, key_value).await
    }

    async fn delete(
        &self,
        table: Table,
        key_column: &str,
        key_value: i64,
    ) -> Result<bool, StoreError> {
        let def = table.def();
        let key = checked_column(def, key_column)?;

        // 참조 중인 행이면 SQLite가 FOREIGN KEY 에러를 내고 from_sqlx가 분류합니다.
        let sql = format!("DELETE FROM {} WHERE {key} = ?", def.name);
        let result = sqlx::query(&sql)
            .bind(key_value)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(def.name, e))?;

        Ok(result.rows_affected() > 0)
    }
}

fn checked_column(def: &'static TableDef, column: &str) -> Result<&'static str, StoreError> {
    def.column(column).ok_or_else(|| StoreError::UnknownColumn {
        table: def.name,
        column: column.to_string(),
    })
}

fn resolve_relations(
    def: &'static TableDef,
    embed: &[&'static str],
) -> Result<Vec<&'static Relation>, StoreError> {
    embed
        .iter()
        .map(|name| {
            def.relation(name).ok_or_else(|| StoreError::UnknownRelation {
                table: def.name,
                relation: name.to_string(),
            })
        })
        .collect()
}

/// `json_object(...) FROM table t LEFT JOIN ...`
fn push_select_head(qb: &mut QueryBuilder<'_, Sqlite>, def: &TableDef, relations: &[&Relation]) {
    let mut object = String::from("json_object(");
    for (i, column) in def.columns.iter().enumerate() {
        if i > 0 {
            object.push_str(", ");
        }
        object.push_str(&format!("'{column}', t.{column}"));
    }
    for (alias, relation) in relations.iter().enumerate() {
        object.push_str(&format!(", '{}', json_object(", relation.name));
        for (j, column) in relation.columns.iter().enumerate() {
            if j > 0 {
                object.push_str(", ");
            }
            object.push_str(&format!("'{column}', r{alias}.{column}"));
        }
        object.push(')');
    }
    object.push(')');

    qb.push(object);
    qb.push(format!(" FROM {} t", def.name));
    for (alias, relation) in relations.iter().enumerate() {
        qb.push(format!(
            " LEFT JOIN {} r{alias} ON r{alias}.id = t.{}",
            relation.table.name(),
            relation.foreign_key
        ));
    }
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    def: &'static TableDef,
    filters: &[Filter],
) -> Result<(), StoreError> {
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::Where(predicate) => push_predicate(qb, def, predicate)?,
            // 빈 OR은 항상 거짓
            Filter::AnyOf(predicates) if predicates.is_empty() => {
                qb.push("0");
            }
            Filter::AnyOf(predicates) => {
                qb.push("(");
                for (j, predicate) in predicates.iter().enumerate() {
                    if j > 0 {
                        qb.push(" OR ");
                    }
                    push_predicate(qb, def, predicate)?;
                }
                qb.push(")");
            }
        }
    }
    Ok(())
}

fn push_predicate(
    qb: &mut QueryBuilder<'_, Sqlite>,
    def: &'static TableDef,
    predicate: &Predicate,
) -> Result<(), StoreError> {
    let column = checked_column(def, predicate.column())?;
    match predicate {
        Predicate::Eq(_, value) => {
            qb.push(format!("t.{column} = "));
            push_value(qb, value);
        }
        Predicate::Gte(_, value) => {
            qb.push(format!("t.{column} >= "));
            push_value(qb, value);
        }
        Predicate::Lte(_, value) => {
            qb.push(format!("t.{column} <= "));
            push_value(qb, value);
        }
        Predicate::In(_, values) if values.is_empty() => {
            qb.push("0");
        }
        Predicate::In(_, values) => {
            qb.push(format!("t.{column} IN ("));
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, value);
            }
            qb.push(")");
        }
        Predicate::Contains(_, term) => {
            // NULL 컬럼은 빈 문자열로 보고 매칭
            qb.push(format!("coalesce(t.{column}, '') REGEXP "));
            qb.push_bind(contains_pattern(term));
        }
    }
    Ok(())
}

fn push_order(
    qb: &mut QueryBuilder<'_, Sqlite>,
    def: &'static TableDef,
    orders: &[Order],
) -> Result<(), StoreError> {
    for (i, order) in orders.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        match order {
            Order::Asc(column) => {
                qb.push(format!("t.{} ASC", checked_column(def, column)?));
            }
            Order::Desc(column) => {
                qb.push(format!("t.{} DESC", checked_column(def, column)?));
            }
            Order::Ranked { column, ranking } => {
                let column = checked_column(def, column)?;
                // 서열표를 CASE 식으로 바꿔 요일 같은 고정 순서로 정렬
                // 라벨은 코드 상수지만 작은따옴표는 SQL 규칙대로 두 번 써서 이스케이프
                let mut case = format!("CASE t.{column}");
                for (rank, label) in ranking.iter().enumerate() {
                    case.push_str(&format!(" WHEN '{}' THEN {rank}", label.replace('\'', "''")));
                }
                case.push_str(&format!(" ELSE {} END ASC", ranking.len()));
                qb.push(case);
            }
        }
    }
    Ok(())
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &FilterValue) {
    match value {
        FilterValue::Int(i) => {
            qb.push_bind(*i);
        }
        FilterValue::Text(s) => {
            qb.push_bind(s.clone());
        }
    }
}

fn push_json(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Bool(b) => {
            qb.push_bind(i64::from(*b));
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                qb.push_bind(i);
            }
            None => {
                qb.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        other => {
            qb.push_bind(other.to_string());
        }
    }
}

/// 유니코드 대소문자를 무시하는 부분 문자열 정규식. 검색어의 메타문자는 이스케이프합니다.
fn contains_pattern(term: &str) -> String {
    format!("(?i){}", regex::escape(term))
}

/// 테스트용 인메모리 저장소 (마이그레이션 적용 완료)
///
/// 인메모리 SQLite는 연결마다 별도 DB이므로 연결을 하나로 제한합니다.
#[cfg(test)]
pub async fn test_store() -> SqliteStore {
    let store = SqliteStore::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory sqlite");
    store.migrate().await.expect("migrations");
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Predicate, RowRange};
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn contains_pattern_escapes_metacharacters() {
        assert_eq!(contains_pattern("Zoom"), "(?i)Zoom");
        assert_eq!(contains_pattern("a.b(c)"), "(?i)a\\.b\\(c\\)");
    }

    #[tokio::test]
    async fn contains_folds_accented_case() {
        let store = test_store().await;
        for name in ["REUNIÃO DE PAIS", "Ética", "50% off", "Caio"] {
            store
                .insert(Table::Subjects, record(json!({ "name": name })))
                .await
                .unwrap();
        }

        let matches = |term: &str| {
            let spec = QuerySpec::new(Table::Subjects)
                .filter(Predicate::Contains("name", term.into()))
                .with_count();
            let store = store.clone();
            async move { store.select(&spec).await.unwrap().count }
        };
        for term in ["reunião", "REUNIÃO", "Reunião", "reuni", "ão de"] {
            assert_eq!(matches(term).await, Some(1), "{term}");
        }
        assert_eq!(matches("ÉTICA").await, Some(1));
        assert_eq!(matches("50%").await, Some(1));
        assert_eq!(matches("%").await, Some(1));
        assert_eq!(matches("c.io").await, Some(0));
    }

    #[tokio::test]
    async fn insert_returns_row_with_defaults() {
        let store = test_store().await;
        let row = store
            .insert(Table::Professionals, record(json!({ "name": "Ana" })))
            .await
            .unwrap();

        assert_eq!(row["name"], "Ana");
        assert!(row["id"].as_i64().is_some());
        assert!(row["created_at"].as_str().is_some());
    }

    #[tokio::test]
    async fn unknown_column_is_rejected_before_sql() {
        let store = test_store().await;
        let err = store
            .insert(Table::Subjects, record(json!({ "nope": 1 })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { .. }));

        let spec = QuerySpec::new(Table::Subjects).embed("professional");
        let err = store.select(&spec).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownRelation { .. }));
    }

    #[tokio::test]
    async fn select_embeds_relations_and_counts_ignoring_range() {
        let store = test_store().await;
        let family = store
            .insert(Table::Families, record(json!({ "name": "Silva" })))
            .await
            .unwrap();
        for name in ["Bia", "Caio", "Davi"] {
            store
                .insert(
                    Table::Students,
                    record(json!({ "name": name, "family_id": family["id"] })),
                )
                .await
                .unwrap();
        }

        let spec = QuerySpec::new(Table::Students)
            .embed("family")
            .filter(Predicate::Contains("name", "I".into()))
            .order(Order::Asc("name"))
            .range(RowRange { from: 0, to: 1 })
            .with_count();
        let result = store.select(&spec).await.unwrap();

        assert_eq!(result.count, Some(3));
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["name"], "Bia");
        assert_eq!(result.rows[0]["family"]["name"], "Silva");
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = test_store().await;
        let row = store
            .insert(Table::Schools, record(json!({ "name": "Escola A" })))
            .await
            .unwrap();
        let id = row["id"].as_i64().unwrap();

        let updated = store
            .update(Table::Schools, "id", id, record(json!({ "city": "Recife" })))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["city"], "Recife");

        assert!(store
            .update(Table::Schools, "id", id + 100, record(json!({ "city": "X" })))
            .await
            .unwrap()
            .is_none());
        assert!(store.delete(Table::Schools, "id", id).await.unwrap());
        assert!(!store.delete(Table::Schools, "id", id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_referenced_row_is_a_foreign_key_violation() {
        let store = test_store().await;
        let family = store
            .insert(Table::Families, record(json!({ "name": "Souza" })))
            .await
            .unwrap();
        store
            .insert(
                Table::Students,
                record(json!({ "name": "Eva", "family_id": family["id"] })),
            )
            .await
            .unwrap();

        let err = store
            .delete(Table::Families, "id", family["id"].as_i64().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::ForeignKeyViolation { table: "families", .. }
        ));
    }
}
