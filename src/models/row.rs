//! 저장소 행(JSON) → 타입 있는 레코드 변환에 쓰는 공용 도우미.
//!
//! 저장소에서 온 행은 모양이 보장되지 않으므로, 조회 직후 여기서 한 번 정규화합니다.
//! 필수 필드가 빠졌거나 형식이 틀리면 `StoreError::MalformedRow`가 되고,
//! 펼친 관계(LEFT JOIN)가 비어 있으면 `None`이 됩니다.

use crate::store::StoreError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 펼쳐 받은 관계 행의 `{id, name}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Related {
    pub id: i64,
    pub name: String,
}

/// `{"id": null, "name": null}`처럼 비어 있는 관계는 `None`으로 취급합니다.
pub fn related<'de, D>(deserializer: D) -> Result<Option<Related>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Loose {
        id: Option<i64>,
        name: Option<String>,
    }

    let loose: Option<Loose> = Option::deserialize(deserializer)?;
    Ok(match loose {
        Some(Loose {
            id: Some(id),
            name: Some(name),
        }) => Some(Related { id, name }),
        _ => None,
    })
}

pub fn decode<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::MalformedRow(e.to_string()))
}

/// 저장 형식: `2026-03-02T14:00:00.000Z` (UTC, 밀리초 3자리)
///
/// 자릿수가 고정되어 있어 문자열 비교 순서가 시간 순서와 같습니다.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::MalformedRow(format!("timestamp `{text}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "related")]
        owner: Option<Related>,
    }

    #[test]
    fn empty_relation_becomes_none() {
        let row: Row = decode(json!({ "owner": { "id": null, "name": null } })).unwrap();
        assert_eq!(row.owner, None);

        let row: Row = decode(json!({})).unwrap();
        assert_eq!(row.owner, None);

        let row: Row = decode(json!({ "owner": { "id": 4, "name": "Lia" } })).unwrap();
        assert_eq!(row.owner, Some(Related { id: 4, name: "Lia".into() }));
    }

    #[test]
    fn timestamps_have_fixed_width() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "2026-03-02T14:00:00.000Z");
        assert_eq!(parse_timestamp("2026-03-02T14:00:00.000Z").unwrap(), at);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
