//! # 기본 명부(Directory) 엔티티
//!
//! 전문가, 과목, 가족, 학교, 학생. 일정 모듈이 참조하는 대상들로,
//! 여기서는 이름 검색 목록 + 생성 + 삭제만 다룹니다.
//!
//! 각 엔티티는 `DirectoryEntity`를 구현해 테이블, 펼칠 관계, 삭제를 막는 참조를
//! 선언합니다. 라우트와 저장소 계층은 이 트레잇 하나로 다섯 엔티티를 처리합니다.

use super::row::{related, Related};
use super::validation::ValidationError;
use crate::store::{Record, Table};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub trait DirectoryEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Form: DeserializeOwned + Send + Sync;

    const TABLE: Table;
    const EMBED: &'static [&'static str] = &[];

    /// 이 엔티티를 참조하며 삭제를 거부시키는 `(테이블, 외래키 컬럼)` 목록.
    /// 연쇄 삭제(CASCADE)나 NULL 처리되는 참조는 넣지 않습니다.
    const DEPENDENTS: &'static [(Table, &'static str)];

    fn id(&self) -> i64;

    fn validate(form: &Self::Form) -> Result<Record, ValidationError>;
}

/// 목록 항목: 엔티티 + 삭제를 막는 참조 개수
///
/// 콘솔은 `dependents > 0`이면 삭제 버튼을 비활성화합니다.
/// 최종 판단은 저장소의 외래키 제약이 합니다.
#[derive(Debug, Serialize)]
pub struct DirectoryEntry<T> {
    #[serde(flatten)]
    pub item: T,
    pub dependents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub specialty: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfessionalForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
}

impl DirectoryEntity for Professional {
    type Form = ProfessionalForm;
    const TABLE: Table = Table::Professionals;
    const DEPENDENTS: &'static [(Table, &'static str)] = &[(Table::Lessons, "professional_id")];

    fn id(&self) -> i64 {
        self.id
    }

    fn validate(form: &ProfessionalForm) -> Result<Record, ValidationError> {
        let mut record = named(&form.name)?;
        optional(&mut record, "email", &form.email);
        optional(&mut record, "specialty", &form.specialty);
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubjectForm {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl DirectoryEntity for Subject {
    type Form = SubjectForm;
    const TABLE: Table = Table::Subjects;
    const DEPENDENTS: &'static [(Table, &'static str)] = &[(Table::Lessons, "subject_id")];

    fn id(&self) -> i64 {
        self.id
    }

    fn validate(form: &SubjectForm) -> Result<Record, ValidationError> {
        let mut record = named(&form.name)?;
        optional(&mut record, "description", &form.description);
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FamilyForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl DirectoryEntity for Family {
    type Form = FamilyForm;
    const TABLE: Table = Table::Families;
    const DEPENDENTS: &'static [(Table, &'static str)] = &[(Table::Students, "family_id")];

    fn id(&self) -> i64 {
        self.id
    }

    fn validate(form: &FamilyForm) -> Result<Record, ValidationError> {
        let mut record = named(&form.name)?;
        optional(&mut record, "email", &form.email);
        optional(&mut record, "phone", &form.phone);
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: i64,
    pub name: String,
    pub city: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SchoolForm {
    pub name: Option<String>,
    pub city: Option<String>,
}

impl DirectoryEntity for School {
    type Form = SchoolForm;
    const TABLE: Table = Table::Schools;
    // 학교가 삭제되면 학생의 school_id는 NULL이 됨
    const DEPENDENTS: &'static [(Table, &'static str)] = &[];

    fn id(&self) -> i64 {
        self.id
    }

    fn validate(form: &SchoolForm) -> Result<Record, ValidationError> {
        let mut record = named(&form.name)?;
        optional(&mut record, "city", &form.city);
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub family_id: Option<i64>,
    pub school_id: Option<i64>,
    pub birth_date: Option<String>,
    pub created_at: String,
    #[serde(default, deserialize_with = "related")]
    pub family: Option<Related>,
    #[serde(default, deserialize_with = "related")]
    pub school: Option<Related>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentForm {
    pub name: Option<String>,
    pub family_id: Option<i64>,
    pub school_id: Option<i64>,
    /// `YYYY-MM-DD`
    pub birth_date: Option<String>,
}

impl DirectoryEntity for Student {
    type Form = StudentForm;
    const TABLE: Table = Table::Students;
    const EMBED: &'static [&'static str] = &["family", "school"];
    const DEPENDENTS: &'static [(Table, &'static str)] = &[(Table::LessonStudents, "student_id")];

    fn id(&self) -> i64 {
        self.id
    }

    fn validate(form: &StudentForm) -> Result<Record, ValidationError> {
        let mut record = named(&form.name)?;
        if let Some(id) = form.family_id.filter(|id| *id > 0) {
            record.insert("family_id".into(), id.into());
        }
        if let Some(id) = form.school_id.filter(|id| *id > 0) {
            record.insert("school_id".into(), id.into());
        }
        if let Some(text) = non_blank(&form.birth_date) {
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidTimestamp(text.to_string()))?;
            record.insert("birth_date".into(), date.format("%Y-%m-%d").to_string().into());
        }
        Ok(record)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn named(name: &Option<String>) -> Result<Record, ValidationError> {
    let name = non_blank(name).ok_or(ValidationError::MissingName)?;
    let mut record = Record::new();
    record.insert("name".into(), Value::String(name.to_string()));
    Ok(record)
}

fn optional(record: &mut Record, column: &str, value: &Option<String>) {
    if let Some(text) = non_blank(value) {
        record.insert(column.to_string(), Value::String(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn name_is_required_and_trimmed() {
        let form = ProfessionalForm {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(Professional::validate(&form), Err(ValidationError::MissingName));

        let form = ProfessionalForm {
            name: Some(" Ana Lima ".into()),
            email: Some("".into()),
            specialty: Some("Fonoaudiologia".into()),
        };
        let record = Professional::validate(&form).unwrap();
        assert_eq!(Value::Object(record), json!({ "name": "Ana Lima", "specialty": "Fonoaudiologia" }));
    }

    #[test]
    fn student_birth_date_must_be_a_calendar_date() {
        let mut form = StudentForm {
            name: Some("Bia".into()),
            family_id: Some(3),
            birth_date: Some("2015-02-30".into()),
            ..Default::default()
        };
        assert_eq!(
            Student::validate(&form),
            Err(ValidationError::InvalidTimestamp("2015-02-30".into()))
        );

        form.birth_date = Some("2015-02-28".into());
        let record = Student::validate(&form).unwrap();
        assert_eq!(record["family_id"], 3);
        assert_eq!(record["birth_date"], "2015-02-28");
        assert!(!record.contains_key("school_id"));
    }

    #[test]
    fn entry_flattens_item() {
        let entry = DirectoryEntry {
            item: School {
                id: 1,
                name: "Escola Sol".into(),
                city: None,
                created_at: "2026-01-01T00:00:00.000Z".into(),
            },
            dependents: 0,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["name"], "Escola Sol");
        assert_eq!(value["dependents"], 0);
    }
}
