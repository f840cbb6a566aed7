//! # 저장소(Store) 경계 모듈
//!
//! 관리 콘솔은 원격 관계형 저장소를 "범용 쿼리 클라이언트"로만 다룹니다.
//! 이 모듈은 그 경계를 정의합니다:
//! - `Store` 트레이트: 조회(select) / 삽입(insert) / 수정(update) / 삭제(delete)
//! - `QuerySpec`: 테이블, 조건(predicate), 정렬, 행 범위, 정확한 개수(count) 요청
//! - `StoreError`: 저장소가 돌려주는 모든 실패
//!
//! 행(row)은 타입이 없는 JSON(`serde_json::Value`)으로 오가며,
//! 타입이 있는 레코드로의 변환(정규화)은 `models`에서 조회 직후에 수행합니다.
//!
//! 저장소 클라이언트는 전역 싱글톤이 아니라 `Arc<dyn Store>`로 주입됩니다.
//! 테스트에서는 인메모리 SQLite 저장소를 같은 자리에 넣습니다.

pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use schema::Table;

/// 삽입/수정 시 전달하는 컬럼 → 값 묶음
pub type Record = Map<String, Value>;

/// 조건식에 바인딩되는 값
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

/// 컬럼 하나에 대한 조건
///
/// 컬럼 이름은 항상 코드에 고정된 `&'static str`이며,
/// 저장소 구현체가 스키마(`schema`)와 대조해 검사합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = value`
    Eq(&'static str, FilterValue),
    /// `column >= value`
    Gte(&'static str, FilterValue),
    /// `column <= value`
    Lte(&'static str, FilterValue),
    /// `column IN (values...)`, 빈 목록은 항상 거짓
    In(&'static str, Vec<FilterValue>),
    /// 대소문자를 구분하지 않는 부분 문자열 일치
    Contains(&'static str, String),
}

impl Predicate {
    pub fn column(&self) -> &'static str {
        match self {
            Predicate::Eq(column, _)
            | Predicate::Gte(column, _)
            | Predicate::Lte(column, _)
            | Predicate::In(column, _)
            | Predicate::Contains(column, _) => column,
        }
    }
}

/// WHERE 절의 한 항목. 항목끼리는 AND로 결합됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Where(Predicate),
    /// 내부 조건들을 OR로 결합 (자유 텍스트 검색에 사용)
    AnyOf(Vec<Predicate>),
}

/// 정렬 기준
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Asc(&'static str),
    Desc(&'static str),
    /// 고정된 서열표 순서대로 정렬 (사전순이 아님).
    /// 서열표에 없는 값은 맨 뒤로 갑니다.
    Ranked {
        column: &'static str,
        ranking: &'static [&'static str],
    },
}

/// 양 끝을 포함하는 0-기반 행 범위 `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: i64,
    pub to: i64,
}

impl RowRange {
    /// 행은 하나도 가져오지 않는 범위 (개수만 필요할 때)
    pub const EMPTY: RowRange = RowRange { from: 0, to: -1 };

    pub fn limit(&self) -> i64 {
        (self.to - self.from + 1).max(0)
    }
}

/// 저장소에 보내는 조회 요청 전체
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub table: Table,
    /// 함께 펼쳐 받을 관계 이름 (예: 수업의 "professional")
    pub embed: Vec<&'static str>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub range: Option<RowRange>,
    /// 범위를 무시한 "정확한" 개수를 함께 요청할지 여부
    pub count: bool,
}

impl QuerySpec {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            embed: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            range: None,
            count: false,
        }
    }

    pub fn embed(mut self, relation: &'static str) -> Self {
        self.embed.push(relation);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(Filter::Where(predicate));
        self
    }

    pub fn any_of(mut self, predicates: Vec<Predicate>) -> Self {
        self.filters.push(Filter::AnyOf(predicates));
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn range(mut self, range: RowRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// 통계용 사본: 같은 조건으로 전체 행을 받되 범위, 개수 요청, 정렬은 빼고
    /// 펼칠 관계는 `embed`로 좁힙니다.
    pub fn for_statistics(&self, embed: &[&'static str]) -> Self {
        Self {
            table: self.table,
            embed: embed.to_vec(),
            filters: self.filters.clone(),
            order: Vec::new(),
            range: None,
            count: false,
        }
    }
}

/// 조회 결과. `count`는 요청했을 때만 채워집니다.
#[derive(Debug, Default)]
pub struct QueryResult {
    pub rows: Vec<Value>,
    pub count: Option<i64>,
}

/// 저장소가 돌려주는 실패
///
/// 코어는 재시도하지 않고 호출자에게 그대로 전달합니다.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 다른 행이 아직 참조 중인 행을 삭제하려 함
    #[error("{table}: {message}")]
    ForeignKeyViolation { table: &'static str, message: String },

    #[error("unknown column `{column}` on table `{table}`")]
    UnknownColumn { table: &'static str, column: String },

    #[error("unknown relation `{relation}` on table `{table}`")]
    UnknownRelation {
        table: &'static str,
        relation: String,
    },

    /// 행 JSON이 기대한 모양이 아님
    #[error("malformed row: {0}")]
    MalformedRow(String),

    #[error("store backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

impl StoreError {
    /// sqlx 에러를 분류합니다. 외래키 위반만 따로 구분합니다.
    pub fn from_sqlx(table: &'static str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_foreign_key_violation()
                || db_err.message().contains("FOREIGN KEY constraint failed")
            {
                return StoreError::ForeignKeyViolation {
                    table,
                    message: db_err.message().to_string(),
                };
            }
        }
        StoreError::Backend(err)
    }
}

/// 범용 쿼리 클라이언트
#[async_trait]
pub trait Store: Send + Sync {
    /// 조건/정렬/범위에 맞는 행들과 (요청 시) 범위를 무시한 전체 개수
    async fn select(&self, spec: &QuerySpec) -> Result<QueryResult, StoreError>;

    /// 행을 삽입하고 저장소가 채운 값(id, created_at 등)이 포함된 행을 반환
    async fn insert(&self, table: Table, record: Record) -> Result<Value, StoreError>;

    /// `key_column = key_value`인 행을 수정. 대상이 없으면 `None`
    async fn update(
        &self,
        table: Table,
        key_column: &str,
        key_value: i64,
        patch: Record,
    ) -> Result<Option<Value>, StoreError>;

    /// `key_column = key_value`인 행을 삭제. 삭제된 행이 있으면 `true`
    async fn delete(&self, table: Table, key_column: &str, key_value: i64)
        -> Result<bool, StoreError>;

    /// 행은 받지 않고 개수만 셉니다.
    async fn count(&self, spec: &QuerySpec) -> Result<i64, StoreError> {
        let spec = spec.clone().range(RowRange::EMPTY).with_count();
        Ok(self.select(&spec).await?.count.unwrap_or(0))
    }
}
