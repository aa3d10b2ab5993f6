//! Query-parameter validation.
//!
//! Each resource has a schema of optional parameters. Validation either
//! returns the typed [`QueryParams`] or every violation found.

use chrono::{DateTime, NaiveDate};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ApiError, FieldViolation, Result};
use crate::models::{QueryParams, RawQuery};
use crate::service::Resource;

/// Longest allowed span between a start and end date.
pub const MAX_RANGE_DAYS: i64 = 365;

// == Rules ==
/// Constraint on a single parameter.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Integer within optional inclusive bounds
    Int { min: Option<i64>, max: Option<i64> },
    /// `YYYY-MM-DD` or a full RFC 3339 timestamp
    IsoDate,
    Bool,
    OneOf(&'static [&'static str]),
    Text,
}

/// A parameter name, its rule, and the message reported on violation.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rule: Rule,
    pub message: &'static str,
}

const fn field(name: &'static str, rule: Rule, message: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        rule,
        message,
    }
}

/// Schema for a resource, plus its date-range pair if it has one.
pub struct Schema {
    pub fields: &'static [FieldSpec],
    pub date_range: Option<(&'static str, &'static str)>,
}

static APOD: Schema = Schema {
    fields: &[
        field("count", Rule::Int { min: Some(1), max: Some(100) }, "Count must be between 1 and 100"),
        field("date", Rule::IsoDate, "Date must be in ISO 8601 format (YYYY-MM-DD)"),
        field("start_date", Rule::IsoDate, "Start date must be in ISO 8601 format"),
        field("end_date", Rule::IsoDate, "End date must be in ISO 8601 format"),
        field("thumbs", Rule::Bool, "Thumbs must be true or false"),
    ],
    date_range: Some(("start_date", "end_date")),
};

static INSIGHT_WEATHER: Schema = Schema {
    fields: &[
        field("feedtype", Rule::OneOf(&["json", "csv"]), "Feedtype must be json or csv"),
        field("ver", Rule::OneOf(&["1.0", "1.1"]), "Version must be 1.0 or 1.1"),
    ],
    date_range: None,
};

static EONET_EVENTS: Schema = Schema {
    fields: &[
        field("limit", Rule::Int { min: Some(1), max: Some(100) }, "Limit must be between 1 and 100"),
        field("days", Rule::Int { min: Some(1), max: Some(365) }, "Days must be between 1 and 365"),
        field("status", Rule::OneOf(&["open", "closed"]), "Status must be open or closed"),
        field("category", Rule::Text, "Category must be a string"),
    ],
    date_range: None,
};

static EONET_CATEGORIES: Schema = Schema {
    fields: &[],
    date_range: None,
};

static DONKI: Schema = Schema {
    fields: &[
        field("startDate", Rule::IsoDate, "Start date must be in ISO 8601 format"),
        field("endDate", Rule::IsoDate, "End date must be in ISO 8601 format"),
        field("type", Rule::Text, "Type must be a string"),
    ],
    date_range: Some(("startDate", "endDate")),
};

/// Validation schema of a resource.
pub fn schema_for(resource: Resource) -> &'static Schema {
    match resource {
        Resource::Apod => &APOD,
        Resource::InsightWeather => &INSIGHT_WEATHER,
        Resource::EonetEvents => &EONET_EVENTS,
        Resource::EonetCategories => &EONET_CATEGORIES,
        Resource::DonkiCme
        | Resource::DonkiSolarFlares
        | Resource::DonkiGeomagneticStorms
        | Resource::DonkiNotifications => &DONKI,
    }
}

// == Validate ==
/// Validates `raw` against the resource schema.
///
/// Parameters outside the schema are dropped.
pub fn validate(resource: Resource, raw: &RawQuery) -> Result<QueryParams> {
    let schema = schema_for(resource);
    let mut params = QueryParams::new();
    let mut violations = Vec::new();

    for spec in schema.fields {
        let Some(value) = raw.get(spec.name) else {
            continue;
        };
        match check(spec.rule, value) {
            Some(typed) => {
                params.insert(spec.name.to_string(), typed);
            }
            None => violations.push(FieldViolation::new(spec.name, spec.message, Some(value.as_str()))),
        }
    }

    let ignored: Vec<&str> = raw
        .keys()
        .map(String::as_str)
        .filter(|k| !schema.fields.iter().any(|f| f.name == *k))
        .collect();
    if !ignored.is_empty() {
        debug!(resource = resource.cache_name(), ?ignored, "Dropping unknown query parameters");
    }

    if let Some((start, end)) = schema.date_range {
        if let Some(violation) = check_range(&params, start, end) {
            violations.push(violation);
        }
    }

    if violations.is_empty() {
        Ok(params)
    } else {
        Err(ApiError::validation(violations))
    }
}

/// Applies one rule, returning the typed value when it passes.
fn check(rule: Rule, raw: &str) -> Option<Value> {
    match rule {
        Rule::Int { min, max } => {
            let n: i64 = raw.trim().parse().ok()?;
            let in_range = min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m);
            in_range.then(|| json!(n))
        }
        Rule::IsoDate => parse_date(raw).map(|_| json!(raw)),
        Rule::Bool => match raw {
            "true" | "1" => Some(json!(true)),
            "false" | "0" => Some(json!(false)),
            _ => None,
        },
        Rule::OneOf(allowed) => allowed.contains(&raw).then(|| json!(raw)),
        Rule::Text => Some(json!(raw)),
    }
}

/// Parses a calendar date or RFC 3339 timestamp to its date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn check_range(params: &QueryParams, start_key: &str, end_key: &str) -> Option<FieldViolation> {
    let start = params.get(start_key)?.as_str().and_then(parse_date)?;
    let end_raw = params.get(end_key)?.as_str()?;
    let end = parse_date(end_raw)?;

    if start > end {
        return Some(FieldViolation::new(
            start_key,
            "Start date must be before end date",
            Some(end_raw),
        ));
    }
    if (end - start).num_days() > MAX_RANGE_DAYS {
        return Some(FieldViolation::new(
            end_key,
            "Date range cannot exceed 365 days",
            Some(end_raw),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawQuery {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn violations(result: Result<QueryParams>) -> Vec<FieldViolation> {
        match result {
            Err(ApiError::ValidationFailed { details, .. }) => details,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_count_boundaries() {
        for bad in ["0", "101", "-1", "ten", "1.5"] {
            let details = violations(validate(Resource::Apod, &raw(&[("count", bad)])));
            assert_eq!(details[0].field, "count");
            assert_eq!(details[0].value.as_deref(), Some(bad));
        }
        for good in ["1", "100"] {
            let params = validate(Resource::Apod, &raw(&[("count", good)])).unwrap();
            assert_eq!(params["count"], json!(good.parse::<i64>().unwrap()));
        }
    }

    #[test]
    fn test_typed_values() {
        let params = validate(
            Resource::Apod,
            &raw(&[("date", "2024-01-05"), ("thumbs", "true")]),
        )
        .unwrap();
        assert_eq!(params["date"], json!("2024-01-05"));
        assert_eq!(params["thumbs"], json!(true));
    }

    #[test]
    fn test_enums() {
        assert!(validate(Resource::InsightWeather, &raw(&[("feedtype", "csv")])).is_ok());
        assert!(validate(Resource::InsightWeather, &raw(&[("feedtype", "xml")])).is_err());
        assert!(validate(Resource::EonetEvents, &raw(&[("status", "closed")])).is_ok());
        assert!(validate(Resource::EonetEvents, &raw(&[("status", "pending")])).is_err());
    }

    #[test]
    fn test_all_violations_are_reported() {
        let details = violations(validate(
            Resource::EonetEvents,
            &raw(&[("limit", "0"), ("days", "400"), ("status", "x")]),
        ));
        let mut fields: Vec<&str> = details.iter().map(|d| d.field.as_str()).collect();
        fields.sort();
        assert_eq!(fields, vec!["days", "limit", "status"]);
    }

    #[test]
    fn test_dates() {
        assert!(validate(Resource::DonkiCme, &raw(&[("startDate", "2024-02-30")])).is_err());
        assert!(validate(Resource::DonkiCme, &raw(&[("startDate", "yesterday")])).is_err());
        assert!(validate(
            Resource::DonkiCme,
            &raw(&[("startDate", "2024-02-01T00:00:00Z")])
        )
        .is_ok());
    }

    #[test]
    fn test_date_ranges() {
        let reversed = violations(validate(
            Resource::DonkiGeomagneticStorms,
            &raw(&[("startDate", "2024-03-01"), ("endDate", "2024-02-01")]),
        ));
        assert_eq!(reversed[0].message, "Start date must be before end date");

        let too_long = violations(validate(
            Resource::Apod,
            &raw(&[("start_date", "2022-01-01"), ("end_date", "2024-01-01")]),
        ));
        assert_eq!(too_long[0].message, "Date range cannot exceed 365 days");

        assert!(validate(
            Resource::DonkiNotifications,
            &raw(&[("startDate", "2024-01-01"), ("endDate", "2024-12-31")])
        )
        .is_ok());
    }

    #[test]
    fn test_unknown_parameters_are_dropped() {
        let params = validate(
            Resource::EonetCategories,
            &raw(&[("api_key", "stolen"), ("foo", "bar")]),
        )
        .unwrap();
        assert!(params.is_empty());
    }
}
