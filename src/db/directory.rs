//! # 명부 저장소 함수
//!
//! `DirectoryEntity`를 구현한 다섯 엔티티를 같은 함수로 처리합니다.
//! 목록의 각 항목에는 삭제를 막는 참조 개수(`dependents`)를 붙입니다.

use crate::error::AppError;
use crate::models::row::decode;
use crate::models::{DirectoryEntity, DirectoryEntry};
use crate::services::query::{self, DirectoryCriteria, Page, PageRequest};
use crate::store::{Predicate, QuerySpec, Store};

pub async fn list_entries<T: DirectoryEntity>(
    store: &dyn Store,
    criteria: &DirectoryCriteria,
    page: PageRequest,
) -> Result<Page<DirectoryEntry<T>>, AppError> {
    let spec = query::build_directory_query(T::TABLE, T::EMBED, criteria, page);
    let page = query::execute(store, &spec).await?.try_map(decode::<T>)?;

    let mut dependents = Vec::with_capacity(page.rows.len());
    for item in &page.rows {
        dependents.push(count_dependents::<T>(store, item.id()).await?);
    }

    let mut dependents = dependents.into_iter();
    Ok(page.map(|item| DirectoryEntry {
        item,
        dependents: dependents.next().unwrap_or(0),
    }))
}

pub async fn get_entry<T: DirectoryEntity>(store: &dyn Store, id: i64) -> Result<T, AppError> {
    let spec = T::EMBED
        .iter()
        .fold(QuerySpec::new(T::TABLE), |spec, relation| spec.embed(*relation))
        .filter(Predicate::Eq("id", id.into()));
    let row = store
        .select(&spec)
        .await?
        .rows
        .into_iter()
        .next()
        .ok_or(AppError::NotFound)?;
    Ok(decode(row)?)
}

pub async fn create_entry<T: DirectoryEntity>(store: &dyn Store, form: &T::Form) -> Result<T, AppError> {
    let record = T::validate(form)?;
    let row = store.insert(T::TABLE, record).await?;
    let id = row["id"]
        .as_i64()
        .ok_or_else(|| AppError::Internal(format!("inserted {} row has no id", T::TABLE.name())))?;

    tracing::info!(table = T::TABLE.name(), id, "directory entry created");
    get_entry(store, id).await
}

/// 참조 중인 행이 있으면 저장소가 거부합니다 (`StoreError::ForeignKeyViolation`).
pub async fn delete_entry<T: DirectoryEntity>(store: &dyn Store, id: i64) -> Result<(), AppError> {
    if !store.delete(T::TABLE, "id", id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(table = T::TABLE.name(), id, "directory entry deleted");
    Ok(())
}

async fn count_dependents<T: DirectoryEntity>(store: &dyn Store, id: i64) -> Result<i64, AppError> {
    let mut total = 0;
    for (table, column) in T::DEPENDENTS {
        let spec = QuerySpec::new(*table).filter(Predicate::Eq(*column, id.into()));
        total += store.count(&spec).await?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_lesson, ScheduleRules};
    use crate::models::*;
    use crate::store::sqlite::test_store;
    use crate::store::StoreError;
    use chrono::{Duration, TimeZone, Utc};

    fn professional_form(name: &str) -> ProfessionalForm {
        ProfessionalForm {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn dependents_count_blocking_references() {
        let store = test_store().await;
        let ana: Professional = create_entry(&store, &professional_form("Ana")).await.unwrap();
        let rui: Professional = create_entry(&store, &professional_form("Rui")).await.unwrap();
        let subject: Subject = create_entry(
            &store,
            &SubjectForm {
                name: Some("Música".into()),
                description: None,
            },
        )
        .await
        .unwrap();

        let start = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();
        let draft = LessonForm {
            professional_id: Some(ana.id),
            subject_id: Some(subject.id),
            start_at: Some(start.to_rfc3339()),
            end_at: Some((start + Duration::hours(1)).to_rfc3339()),
            ..Default::default()
        }
        .validate(false, start)
        .unwrap();
        create_lesson(&store, &draft, ScheduleRules::default()).await.unwrap();

        let page = list_entries::<Professional>(&store, &DirectoryCriteria::default(), PageRequest::default())
            .await
            .unwrap();
        let counts: Vec<_> = page.rows.iter().map(|e| (e.item.name.as_str(), e.dependents)).collect();
        assert_eq!(counts, vec![("Ana", 1), ("Rui", 0)]);

        delete_entry::<Professional>(&store, rui.id).await.unwrap();
        let err = delete_entry::<Professional>(&store, ana.id).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn students_embed_family_and_school() {
        let store = test_store().await;
        let family: Family = create_entry(
            &store,
            &FamilyForm {
                name: Some("Silva".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let student: Student = create_entry(
            &store,
            &StudentForm {
                name: Some("Bia".into()),
                family_id: Some(family.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(student.family.as_ref().map(|f| f.name.as_str()), Some("Silva"));
        assert_eq!(student.school, None);

        let families = list_entries::<Family>(&store, &DirectoryCriteria::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(families.rows[0].dependents, 1);
    }

    #[tokio::test]
    async fn search_matches_name_case_insensitively() {
        let store = test_store().await;
        for name in ["Escola Azul", "Colégio Verde", "escola rosa"] {
            create_entry::<School>(
                &store,
                &SchoolForm {
                    name: Some(name.into()),
                    city: None,
                },
            )
            .await
            .unwrap();
        }

        let criteria = DirectoryCriteria {
            search: Some("ESCOLA".into()),
        };
        let page = list_entries::<School>(&store, &criteria, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.rows.iter().all(|e| e.dependents == 0));
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_store() {
        let store = test_store().await;
        let err = create_entry::<Subject>(&store, &SubjectForm::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::MissingName)));
    }
}
