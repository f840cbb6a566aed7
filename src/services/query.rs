//! # 목록 조회 조건 → 저장소 쿼리 변환
//!
//! 화면의 검색/필터 입력(`*Criteria`)과 페이지 번호를 `QuerySpec`으로 바꾸고,
//! 저장소에 보내 한 페이지와 전체 개수를 받아옵니다.
//!
//! ## 규칙
//! - 비어 있지 않은 필드마다 조건 하나. 필드끼리는 AND, 자유 텍스트는 여러 컬럼에 OR
//! - 페이지 크기 10, 0부터 시작. `page`는 행 범위 `[page*10, page*10+9]`가 됨
//! - 정렬 마지막에 항상 `id`를 붙여 페이지 경계가 흔들리지 않게 함
//! - 같은 입력이면 항상 같은(`==`) `QuerySpec`

use crate::models::{AvailabilityStatus, DayOfWeek, LessonStatus};
use crate::store::{Order, Predicate, QuerySpec, RowRange, Store, StoreError, Table};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

pub const PAGE_SIZE: i64 = 10;

/// 마지막 행 위치(`(page + 1) * PAGE_SIZE - 1`)가 i64 안에 들어가는 가장 큰 페이지
pub const MAX_PAGE: i64 = i64::MAX / PAGE_SIZE - 1;

/// 쿼리 문자열의 빈 값(`?status=`)을 "조건 없음"으로 취급하는 역직렬화 도우미
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let text: Option<String> = Option::deserialize(deserializer)?;
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// 페이지 요청. `seq`는 클라이언트가 붙인 요청 번호로, 응답에 그대로 돌려줍니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub seq: Option<u64>,
}

impl PageRequest {
    pub fn new(page: i64) -> Self {
        Self {
            page: Some(page),
            seq: None,
        }
    }

    /// 음수 페이지는 0, 행 위치가 i64를 넘칠 만큼 큰 페이지는 `MAX_PAGE`로 취급
    pub fn index(&self) -> i64 {
        self.page.unwrap_or(0).clamp(0, MAX_PAGE)
    }

    pub fn range(&self) -> RowRange {
        let from = self.index() * PAGE_SIZE;
        RowRange {
            from,
            to: from + PAGE_SIZE - 1,
        }
    }
}

/// `ceil(total / size)`. 빈 결과는 0페이지.
pub fn page_count(total: i64, size: i64) -> i64 {
    if total <= 0 || size <= 0 {
        return 0;
    }
    (total + size - 1) / size
}

/// 한 페이지 분량의 결과
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    /// 페이지와 무관한 필터 결과 전체 개수
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub page_count: i64,
}

impl<T> Page<T> {
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            rows: self.rows.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            page_count: self.page_count,
        })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            rows: self.rows.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            page_count: self.page_count,
        }
    }
}

/// 수업 목록 필터
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LessonCriteria {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<LessonStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub professional_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub subject_id: Option<i64>,
    /// 이 날짜 00:00:00.000부터 (UTC)
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_from: Option<NaiveDate>,
    /// 이 날짜 23:59:59.999까지 (UTC)
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_to: Option<NaiveDate>,
}

/// 가용 시간대 목록 필터
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AvailabilityCriteria {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub professional_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub day_of_week: Option<DayOfWeek>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<AvailabilityStatus>,
}

/// 명부 목록 필터 (이름 검색)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DirectoryCriteria {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub search: Option<String>,
}

pub fn build_lesson_query(criteria: &LessonCriteria, page: PageRequest) -> QuerySpec {
    let mut spec = QuerySpec::new(Table::Lessons)
        .embed("professional")
        .embed("subject");

    if let Some(term) = &criteria.search {
        spec = spec.any_of(vec![
            Predicate::Contains("description", term.clone()),
            Predicate::Contains("meeting_url", term.clone()),
        ]);
    }
    if let Some(status) = criteria.status {
        spec = spec.filter(Predicate::Eq("status", status.as_str().into()));
    }
    if let Some(id) = criteria.professional_id {
        spec = spec.filter(Predicate::Eq("professional_id", id.into()));
    }
    if let Some(id) = criteria.subject_id {
        spec = spec.filter(Predicate::Eq("subject_id", id.into()));
    }
    // 저장된 시각은 고정 폭 UTC 텍스트이므로 문자열 비교가 곧 시간 비교
    if let Some(from) = criteria.date_from {
        spec = spec.filter(Predicate::Gte(
            "start_at",
            format!("{}T00:00:00.000Z", from.format("%Y-%m-%d")).into(),
        ));
    }
    if let Some(to) = criteria.date_to {
        spec = spec.filter(Predicate::Lte(
            "start_at",
            format!("{}T23:59:59.999Z", to.format("%Y-%m-%d")).into(),
        ));
    }

    spec.order(Order::Desc("start_at"))
        .order(Order::Desc("id"))
        .range(page.range())
        .with_count()
}

pub fn build_availability_query(criteria: &AvailabilityCriteria, page: PageRequest) -> QuerySpec {
    let mut spec = QuerySpec::new(Table::Availability).embed("professional");

    if let Some(id) = criteria.professional_id {
        spec = spec.filter(Predicate::Eq("professional_id", id.into()));
    }
    if let Some(day) = criteria.day_of_week {
        spec = spec.filter(Predicate::Eq("day_of_week", day.as_str().into()));
    }
    if let Some(status) = criteria.status {
        spec = spec.filter(Predicate::Eq("status", status.as_str().into()));
    }

    // 요일은 사전순이 아니라 월요일부터
    spec.order(Order::Ranked {
        column: "day_of_week",
        ranking: DayOfWeek::LABELS,
    })
    .order(Order::Asc("start_time"))
    .order(Order::Asc("id"))
    .range(page.range())
    .with_count()
}

pub fn build_directory_query(
    table: Table,
    embed: &[&'static str],
    criteria: &DirectoryCriteria,
    page: PageRequest,
) -> QuerySpec {
    let mut spec = embed
        .iter()
        .fold(QuerySpec::new(table), |spec, relation| spec.embed(*relation));

    if let Some(term) = &criteria.search {
        spec = spec.filter(Predicate::Contains("name", term.clone()));
    }

    spec.order(Order::Asc("name"))
        .order(Order::Asc("id"))
        .range(page.range())
        .with_count()
}

/// 쿼리를 실행해 한 페이지를 받아옵니다. 저장소 에러는 그대로 전달합니다.
pub async fn execute(store: &dyn Store, spec: &QuerySpec) -> Result<Page<Value>, StoreError> {
    let result = store.select(spec).await?;
    let total = result.count.unwrap_or(result.rows.len() as i64);

    let (page, page_size) = match spec.range {
        Some(range) if range.limit() > 0 => (range.from / range.limit(), range.limit()),
        _ => (0, total.max(1)),
    };

    Ok(Page {
        rows: result.rows,
        total,
        page,
        page_size,
        page_count: page_count(total, page_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::test_store;
    use crate::store::{Filter, Record};
    use serde_json::json;
    use std::collections::HashSet;

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn page_math() {
        assert_eq!(PageRequest::new(0).range(), RowRange { from: 0, to: 9 });
        assert_eq!(PageRequest::new(2).range(), RowRange { from: 20, to: 29 });
        assert_eq!(PageRequest::new(-3).range(), RowRange { from: 0, to: 9 });
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(23, 10), 3);
    }

    #[test]
    fn huge_page_number_is_clamped() {
        for page in [i64::MAX / 5, i64::MAX] {
            let request = PageRequest::new(page);
            assert_eq!(request.index(), MAX_PAGE);
            let range = request.range();
            assert_eq!(range.limit(), PAGE_SIZE);
            assert!(range.to > 0);
        }
    }

    #[test]
    fn building_is_deterministic() {
        let criteria = LessonCriteria {
            search: Some("zoom".into()),
            status: Some(LessonStatus::Canceled),
            professional_id: Some(4),
            date_from: NaiveDate::from_ymd_opt(2026, 3, 2),
            date_to: NaiveDate::from_ymd_opt(2026, 3, 2),
            ..Default::default()
        };
        let a = build_lesson_query(&criteria, PageRequest::new(1));
        let b = build_lesson_query(&criteria.clone(), PageRequest::new(1));
        assert_eq!(a, b);

        assert_eq!(a.range, Some(RowRange { from: 10, to: 19 }));
        assert!(a.count);
        assert_eq!(
            a.filters,
            vec![
                Filter::AnyOf(vec![
                    Predicate::Contains("description", "zoom".into()),
                    Predicate::Contains("meeting_url", "zoom".into()),
                ]),
                Filter::Where(Predicate::Eq("status", "canceled".into())),
                Filter::Where(Predicate::Eq("professional_id", 4i64.into())),
                Filter::Where(Predicate::Gte("start_at", "2026-03-02T00:00:00.000Z".into())),
                Filter::Where(Predicate::Lte("start_at", "2026-03-02T23:59:59.999Z".into())),
            ]
        );
    }

    #[test]
    fn empty_criteria_only_orders() {
        let spec = build_availability_query(&AvailabilityCriteria::default(), PageRequest::default());
        assert!(spec.filters.is_empty());
        assert_eq!(spec.order.len(), 3);
        assert_eq!(spec.embed, vec!["professional"]);
    }

    #[test]
    fn blank_query_values_are_absent() {
        let criteria: LessonCriteria =
            serde_json::from_value(json!({ "search": "  ", "status": "", "professional_id": "7" })).unwrap();
        assert_eq!(criteria.search, None);
        assert_eq!(criteria.status, None);
        assert_eq!(criteria.professional_id, Some(7));

        let bad: Result<AvailabilityCriteria, _> = serde_json::from_value(json!({ "day_of_week": "someday" }));
        assert!(bad.is_err());
    }

    async fn seed_reference(store: &dyn Store) -> (i64, i64) {
        let professional = store
            .insert(Table::Professionals, record(json!({ "name": "Ana" })))
            .await
            .unwrap();
        let subject = store
            .insert(Table::Subjects, record(json!({ "name": "Leitura" })))
            .await
            .unwrap();
        (professional["id"].as_i64().unwrap(), subject["id"].as_i64().unwrap())
    }

    #[tokio::test]
    async fn pages_partition_the_filtered_set() {
        let store = test_store().await;
        let (professional, subject) = seed_reference(&store).await;
        // 같은 시작 시각이 여러 개여도 id 순서로 경계가 고정됨
        for i in 0..23 {
            store
                .insert(
                    Table::Lessons,
                    record(json!({
                        "professional_id": professional,
                        "subject_id": subject,
                        "start_at": format!("2026-04-{:02}T10:00:00.000Z", 1 + i / 3),
                        "end_at": format!("2026-04-{:02}T11:00:00.000Z", 1 + i / 3),
                    })),
                )
                .await
                .unwrap();
        }

        let criteria = LessonCriteria::default();
        let first = execute(&store, &build_lesson_query(&criteria, PageRequest::new(0)))
            .await
            .unwrap();
        assert_eq!(first.total, 23);
        assert_eq!(first.page_count, 3);

        let mut seen = HashSet::new();
        let mut fetched = 0;
        for page in 0..first.page_count {
            let result = execute(&store, &build_lesson_query(&criteria, PageRequest::new(page)))
                .await
                .unwrap();
            assert_eq!(result.page, page);
            fetched += result.rows.len();
            for row in result.rows {
                assert!(seen.insert(row["id"].as_i64().unwrap()));
            }
        }
        assert_eq!(fetched, 23);
        assert_eq!(seen.len(), 23);
    }

    #[tokio::test]
    async fn canceled_on_one_day() {
        let store = test_store().await;
        let (professional, subject) = seed_reference(&store).await;
        let lessons = [
            ("2026-03-01T23:59:59.000Z", "canceled"),
            ("2026-03-02T00:00:00.000Z", "canceled"),
            ("2026-03-02T12:30:00.000Z", "scheduled"),
            ("2026-03-02T23:59:59.000Z", "canceled"),
            ("2026-03-03T00:00:00.000Z", "canceled"),
        ];
        for (start, status) in lessons {
            store
                .insert(
                    Table::Lessons,
                    record(json!({
                        "professional_id": professional,
                        "subject_id": subject,
                        "start_at": start,
                        "end_at": "2026-03-04T00:00:00.000Z",
                        "status": status,
                    })),
                )
                .await
                .unwrap();
        }

        let day = NaiveDate::from_ymd_opt(2026, 3, 2);
        let criteria = LessonCriteria {
            status: Some(LessonStatus::Canceled),
            date_from: day,
            date_to: day,
            ..Default::default()
        };
        let page = execute(&store, &build_lesson_query(&criteria, PageRequest::default()))
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        let starts: Vec<_> = page.rows.iter().map(|r| r["start_at"].as_str().unwrap()).collect();
        assert_eq!(starts, vec!["2026-03-02T23:59:59.000Z", "2026-03-02T00:00:00.000Z"]);
        assert!(page.rows.iter().all(|r| r["status"] == "canceled"));
        assert_eq!(page.rows[0]["professional"]["name"], "Ana");
    }

    #[tokio::test]
    async fn availability_orders_by_weekday_not_alphabet() {
        let store = test_store().await;
        let (professional, _) = seed_reference(&store).await;
        for (day, start) in [("sunday", "08:00"), ("friday", "09:00"), ("monday", "14:00"), ("monday", "08:00")] {
            store
                .insert(
                    Table::Availability,
                    record(json!({
                        "professional_id": professional,
                        "day_of_week": day,
                        "start_time": start,
                        "end_time": "18:00",
                    })),
                )
                .await
                .unwrap();
        }

        let page = execute(
            &store,
            &build_availability_query(&AvailabilityCriteria::default(), PageRequest::default()),
        )
        .await
        .unwrap();
        let order: Vec<_> = page
            .rows
            .iter()
            .map(|r| format!("{} {}", r["day_of_week"].as_str().unwrap(), r["start_time"].as_str().unwrap()))
            .collect();
        assert_eq!(order, vec!["monday 08:00", "monday 14:00", "friday 09:00", "sunday 08:00"]);
    }
}
