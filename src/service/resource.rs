//! Logical upstream resources and their fixed properties.

use chrono::{Days, NaiveDate};
use serde_json::{json, Value};

use crate::models::QueryParams;
use crate::upstream::Host;

// == Resource ==
/// A proxied upstream resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Apod,
    InsightWeather,
    EonetEvents,
    EonetCategories,
    DonkiCme,
    DonkiSolarFlares,
    DonkiGeomagneticStorms,
    DonkiNotifications,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Apod,
        Resource::InsightWeather,
        Resource::EonetEvents,
        Resource::EonetCategories,
        Resource::DonkiCme,
        Resource::DonkiSolarFlares,
        Resource::DonkiGeomagneticStorms,
        Resource::DonkiNotifications,
    ];

    /// Prefix of this resource's cache keys.
    pub fn cache_name(self) -> &'static str {
        match self {
            Resource::Apod => "apod",
            Resource::InsightWeather => "insight_weather",
            Resource::EonetEvents => "eonet_events",
            Resource::EonetCategories => "eonet_categories",
            Resource::DonkiCme => "donki_cme",
            Resource::DonkiSolarFlares => "donki_flr",
            Resource::DonkiGeomagneticStorms => "donki_gst",
            Resource::DonkiNotifications => "donki_notifications",
        }
    }

    /// Human-readable name used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Resource::Apod => "APOD",
            Resource::InsightWeather => "InSight weather",
            Resource::EonetEvents => "EONET events",
            Resource::EonetCategories => "EONET categories",
            Resource::DonkiCme => "DONKI CME data",
            Resource::DonkiSolarFlares => "DONKI Solar Flares",
            Resource::DonkiGeomagneticStorms => "DONKI Geomagnetic Storms",
            Resource::DonkiNotifications => "DONKI notifications",
        }
    }

    pub fn host(self) -> Host {
        match self {
            Resource::EonetEvents | Resource::EonetCategories => Host::Eonet,
            _ => Host::Nasa,
        }
    }

    /// Upstream path relative to the host base URL.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Apod => "/planetary/apod",
            Resource::InsightWeather => "/insight_weather/",
            Resource::EonetEvents => "/events",
            Resource::EonetCategories => "/categories",
            Resource::DonkiCme => "/DONKI/CME",
            Resource::DonkiSolarFlares => "/DONKI/FLR",
            Resource::DonkiGeomagneticStorms => "/DONKI/GST",
            Resource::DonkiNotifications => "/DONKI/notifications",
        }
    }

    /// Cache lifetime in seconds, longer for slower-changing data.
    pub fn ttl_secs(self) -> u64 {
        match self {
            Resource::EonetCategories => 3600,
            Resource::Apod
            | Resource::DonkiCme
            | Resource::DonkiSolarFlares
            | Resource::DonkiGeomagneticStorms => 600,
            Resource::InsightWeather | Resource::EonetEvents | Resource::DonkiNotifications => 300,
        }
    }

    /// Fills in resource defaults for parameters the caller left out.
    pub fn apply_defaults(self, params: &mut QueryParams, today: NaiveDate) {
        match self {
            Resource::Apod => {
                // The APOD API rejects `count` combined with a date selector.
                let has_selector = ["count", "date", "start_date", "end_date"]
                    .iter()
                    .any(|k| params.contains_key(*k));
                if !has_selector {
                    params.insert("count".into(), json!(1));
                }
            }
            Resource::InsightWeather => {
                default(params, "feedtype", json!("json"));
                default(params, "ver", json!("1.0"));
            }
            Resource::EonetEvents => {
                default(params, "limit", json!(20));
                default(params, "days", json!(30));
                default(params, "status", json!("open"));
            }
            Resource::EonetCategories => {}
            Resource::DonkiCme | Resource::DonkiSolarFlares | Resource::DonkiGeomagneticStorms => {
                default(params, "startDate", json!(days_before(today, 30)));
                default(params, "endDate", json!(today.to_string()));
            }
            Resource::DonkiNotifications => {
                default(params, "startDate", json!(days_before(today, 7)));
                default(params, "endDate", json!(today.to_string()));
                default(params, "type", json!("all"));
            }
        }
    }
}

fn default(params: &mut QueryParams, key: &str, value: Value) {
    params.entry(key.to_string()).or_insert(value);
}

fn days_before(today: NaiveDate, days: u64) -> String {
    today
        .checked_sub_days(Days::new(days))
        .unwrap_or(today)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_apod_defaults_count() {
        let mut params = QueryParams::new();
        Resource::Apod.apply_defaults(&mut params, today());
        assert_eq!(params.get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_apod_date_suppresses_count_default() {
        let mut params = QueryParams::new();
        params.insert("date".into(), json!("2024-01-01"));
        Resource::Apod.apply_defaults(&mut params, today());
        assert!(!params.contains_key("count"));
    }

    #[test]
    fn test_caller_values_win() {
        let mut params = QueryParams::new();
        params.insert("status".into(), json!("closed"));
        Resource::EonetEvents.apply_defaults(&mut params, today());

        assert_eq!(params["status"], json!("closed"));
        assert_eq!(params["limit"], json!(20));
        assert_eq!(params["days"], json!(30));
    }

    #[test]
    fn test_donki_lookback_windows() {
        let mut cme = QueryParams::new();
        Resource::DonkiCme.apply_defaults(&mut cme, today());
        assert_eq!(cme["startDate"], json!("2024-02-14"));
        assert_eq!(cme["endDate"], json!("2024-03-15"));

        let mut notes = QueryParams::new();
        Resource::DonkiNotifications.apply_defaults(&mut notes, today());
        assert_eq!(notes["startDate"], json!("2024-03-08"));
        assert_eq!(notes["type"], json!("all"));
    }

    #[test]
    fn test_ttls_and_hosts() {
        assert_eq!(Resource::EonetCategories.ttl_secs(), 3600);
        assert_eq!(Resource::InsightWeather.ttl_secs(), 300);
        assert_eq!(Resource::EonetEvents.host(), Host::Eonet);
        assert_eq!(Resource::DonkiSolarFlares.host(), Host::Nasa);
        for resource in Resource::ALL {
            assert!((300..=3600).contains(&resource.ttl_secs()));
            assert!(resource.path().starts_with('/'));
        }
    }
}
