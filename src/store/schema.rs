//! 저장소가 알고 있는 테이블과 관계(relationship) 정의.
//!
//! `migrations/`의 스키마와 같은 컬럼 목록을 유지해야 합니다.
//! 조건/정렬/삽입에 쓰이는 컬럼 이름은 모두 여기 목록과 대조됩니다.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Professionals,
    Subjects,
    Families,
    Schools,
    Students,
    Lessons,
    LessonStudents,
    Availability,
}

#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub relations: &'static [Relation],
}

/// 외래키로 연결된 다른 테이블의 행을 `{id, name}` 형태로 펼쳐 받는 관계
#[derive(Debug)]
pub struct Relation {
    pub name: &'static str,
    pub table: Table,
    pub foreign_key: &'static str,
    pub columns: &'static [&'static str],
}

const ID_AND_NAME: &[&str] = &["id", "name"];

static PROFESSIONALS: TableDef = TableDef {
    name: "professionals",
    columns: &["id", "name", "email", "specialty", "created_at"],
    relations: &[],
};

static SUBJECTS: TableDef = TableDef {
    name: "subjects",
    columns: &["id", "name", "description", "created_at"],
    relations: &[],
};

static FAMILIES: TableDef = TableDef {
    name: "families",
    columns: &["id", "name", "email", "phone", "created_at"],
    relations: &[],
};

static SCHOOLS: TableDef = TableDef {
    name: "schools",
    columns: &["id", "name", "city", "created_at"],
    relations: &[],
};

static STUDENTS: TableDef = TableDef {
    name: "students",
    columns: &["id", "name", "family_id", "school_id", "birth_date", "created_at"],
    relations: &[
        Relation {
            name: "family",
            table: Table::Families,
            foreign_key: "family_id",
            columns: ID_AND_NAME,
        },
        Relation {
            name: "school",
            table: Table::Schools,
            foreign_key: "school_id",
            columns: ID_AND_NAME,
        },
    ],
};

static LESSONS: TableDef = TableDef {
    name: "lessons",
    columns: &[
        "id",
        "professional_id",
        "subject_id",
        "start_at",
        "end_at",
        "status",
        "description",
        "meeting_url",
        "created_at",
    ],
    relations: &[
        Relation {
            name: "professional",
            table: Table::Professionals,
            foreign_key: "professional_id",
            columns: ID_AND_NAME,
        },
        Relation {
            name: "subject",
            table: Table::Subjects,
            foreign_key: "subject_id",
            columns: ID_AND_NAME,
        },
    ],
};

static LESSON_STUDENTS: TableDef = TableDef {
    name: "lesson_students",
    columns: &["lesson_id", "student_id"],
    relations: &[],
};

static AVAILABILITY: TableDef = TableDef {
    name: "availability",
    columns: &[
        "id",
        "professional_id",
        "day_of_week",
        "start_time",
        "end_time",
        "status",
        "created_at",
    ],
    relations: &[Relation {
        name: "professional",
        table: Table::Professionals,
        foreign_key: "professional_id",
        columns: ID_AND_NAME,
    }],
};

impl Table {
    pub fn def(self) -> &'static TableDef {
        match self {
            Table::Professionals => &PROFESSIONALS,
            Table::Subjects => &SUBJECTS,
            Table::Families => &FAMILIES,
            Table::Schools => &SCHOOLS,
            Table::Students => &STUDENTS,
            Table::Lessons => &LESSONS,
            Table::LessonStudents => &LESSON_STUDENTS,
            Table::Availability => &AVAILABILITY,
        }
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }
}

impl TableDef {
    /// 스키마에 있는 컬럼이면 그 `'static` 이름을 돌려줍니다.
    pub fn column(&self, column: &str) -> Option<&'static str> {
        self.columns.iter().copied().find(|c| *c == column)
    }

    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        self.relations.iter().find(|r| r.name == name)
    }
}
