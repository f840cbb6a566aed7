//! # 가용 시간대 저장소 함수

use super::{Listing, ScheduleRules};
use crate::error::AppError;
use crate::models::{AvailabilityDraft, AvailabilityStatus, AvailabilityWindow};
use crate::services::query::{self, AvailabilityCriteria, PageRequest};
use crate::services::stats::{summarize_availability, AvailabilityStatistics};
use crate::store::{Predicate, QuerySpec, Store, Table};

pub async fn list_availability(
    store: &dyn Store,
    criteria: &AvailabilityCriteria,
    page: PageRequest,
) -> Result<Listing<AvailabilityWindow, AvailabilityStatistics>, AppError> {
    let spec = query::build_availability_query(criteria, page);
    let page = query::execute(store, &spec)
        .await?
        .try_map(AvailabilityWindow::from_row)?;

    let all = store
        .select(&spec.for_statistics(&[]))
        .await?
        .rows
        .into_iter()
        .map(AvailabilityWindow::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let stats = summarize_availability(&all, page.total);

    tracing::debug!(total = page.total, page = page.page, "listed availability");
    Ok(Listing { page, stats })
}

pub async fn get_availability(store: &dyn Store, id: i64) -> Result<AvailabilityWindow, AppError> {
    let spec = QuerySpec::new(Table::Availability)
        .embed("professional")
        .filter(Predicate::Eq("id", id.into()));
    let row = store
        .select(&spec)
        .await?
        .rows
        .into_iter()
        .next()
        .ok_or(AppError::NotFound)?;
    Ok(AvailabilityWindow::from_row(row)?)
}

pub async fn create_availability(
    store: &dyn Store,
    draft: &AvailabilityDraft,
    rules: ScheduleRules,
) -> Result<AvailabilityWindow, AppError> {
    if rules.conflict_check {
        ensure_no_overlap(store, draft, None).await?;
    }

    let row = store.insert(Table::Availability, draft.to_record()).await?;
    let id = row["id"]
        .as_i64()
        .ok_or_else(|| AppError::Internal("inserted availability has no id".into()))?;

    tracing::info!(
        availability_id = id,
        professional_id = draft.professional_id,
        day = draft.day_of_week.as_str(),
        "availability created"
    );
    get_availability(store, id).await
}

/// 요일/시작/종료/상태 전체 교체
pub async fn update_availability(
    store: &dyn Store,
    id: i64,
    draft: &AvailabilityDraft,
    rules: ScheduleRules,
) -> Result<AvailabilityWindow, AppError> {
    if rules.conflict_check {
        ensure_no_overlap(store, draft, Some(id)).await?;
    }

    store
        .update(Table::Availability, "id", id, draft.to_record())
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(availability_id = id, "availability updated");
    get_availability(store, id).await
}

pub async fn delete_availability(store: &dyn Store, id: i64) -> Result<(), AppError> {
    if !store.delete(Table::Availability, "id", id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(availability_id = id, "availability deleted");
    Ok(())
}

/// 같은 전문가의 활성 시간대와 주간 시각이 겹치면 `Conflict`.
/// 비활성 시간대는 겹쳐도 상관없습니다.
async fn ensure_no_overlap(
    store: &dyn Store,
    draft: &AvailabilityDraft,
    exclude: Option<i64>,
) -> Result<(), AppError> {
    if draft.status == AvailabilityStatus::Inactive {
        return Ok(());
    }

    let spec = QuerySpec::new(Table::Availability)
        .filter(Predicate::Eq("professional_id", draft.professional_id.into()));

    for row in store.select(&spec).await?.rows {
        let other = AvailabilityWindow::from_row(row)?;
        if Some(other.id) == exclude || other.status == AvailabilityStatus::Inactive {
            continue;
        }
        if draft.overlaps(&other.draft()) {
            return Err(AppError::Conflict(format!(
                "Overlaps availability #{} ({} {}-{})",
                other.id,
                other.day_of_week.as_str(),
                other.start_time.format("%H:%M"),
                other.end_time.format("%H:%M"),
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityForm, DayOfWeek};
    use crate::store::sqlite::test_store;
    use crate::store::Record;
    use serde_json::json;

    async fn professional(store: &dyn Store, name: &str) -> i64 {
        let record: Record = json!({ "name": name }).as_object().cloned().unwrap();
        store.insert(Table::Professionals, record).await.unwrap()["id"]
            .as_i64()
            .unwrap()
    }

    fn draft(professional_id: i64, day: &str, start: &str, end: &str) -> AvailabilityDraft {
        AvailabilityForm {
            professional_id: Some(professional_id),
            day_of_week: Some(day.into()),
            start_time: Some(start.into()),
            end_time: Some(end.into()),
            status: None,
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn create_update_delete_round_trip() {
        let store = test_store().await;
        let p = professional(&store, "Ana").await;

        let window = create_availability(&store, &draft(p, "saturday", "22:00", "02:00"), ScheduleRules::default())
            .await
            .unwrap();
        assert_eq!(window.day_of_week, DayOfWeek::Saturday);
        assert_eq!(window.duration_minutes(), 240);
        assert_eq!(window.professional_name.as_deref(), Some("Ana"));

        let mut replacement = draft(p, "sunday", "08:00", "12:00");
        replacement.status = AvailabilityStatus::Temporary;
        let window = update_availability(&store, window.id, &replacement, ScheduleRules::default())
            .await
            .unwrap();
        assert_eq!(window.day_of_week, DayOfWeek::Sunday);
        assert_eq!(window.status, AvailabilityStatus::Temporary);

        delete_availability(&store, window.id).await.unwrap();
        assert!(matches!(get_availability(&store, window.id).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn overlapping_windows_allowed_unless_checked() {
        let store = test_store().await;
        let p = professional(&store, "Ana").await;
        let free = ScheduleRules::default();
        let checked = ScheduleRules {
            conflict_check: true,
            ..Default::default()
        };

        create_availability(&store, &draft(p, "monday", "08:00", "12:00"), free)
            .await
            .unwrap();
        create_availability(&store, &draft(p, "monday", "10:00", "14:00"), free)
            .await
            .unwrap();

        let err = create_availability(&store, &draft(p, "monday", "11:00", "13:00"), checked)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // 다른 전문가는 같은 시각이어도 괜찮음
        let q = professional(&store, "Rui").await;
        create_availability(&store, &draft(q, "monday", "11:00", "13:00"), checked)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn professional_delete_cascades_to_windows() {
        let store = test_store().await;
        let p = professional(&store, "Ana").await;
        create_availability(&store, &draft(p, "friday", "09:00", "10:00"), ScheduleRules::default())
            .await
            .unwrap();

        assert!(store.delete(Table::Professionals, "id", p).await.unwrap());
        let remaining = store.count(&QuerySpec::new(Table::Availability)).await.unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn listing_reports_hours_for_whole_filter() {
        let store = test_store().await;
        let p = professional(&store, "Ana").await;
        for day in DayOfWeek::ALL.iter().chain(DayOfWeek::ALL[..5].iter()) {
            create_availability(&store, &draft(p, day.as_str(), "08:00", "09:30"), ScheduleRules::default())
                .await
                .unwrap();
        }

        let listing = list_availability(&store, &AvailabilityCriteria::default(), PageRequest::new(0))
            .await
            .unwrap();
        assert_eq!(listing.page.rows.len(), 10);
        assert_eq!(listing.page.total, 12);
        assert_eq!(listing.stats.total_minutes, 12 * 90);
        assert_eq!(listing.stats.total_hours, 18.0);
        assert_eq!(listing.page.rows[0].day_of_week, DayOfWeek::Monday);
    }
}
