use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// National Weather Service API Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AlertResponse {
    /// Required; an explicit `null` counts as no alerts
    #[serde(deserialize_with = "null_as_empty")]
    pub features: Vec<AlertFeature>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Deserialize)]
pub struct AlertFeature {
    pub properties: AlertProperties,
}

/// Alert fields are all optional; defaults are applied when formatting
#[derive(Debug, Default, Deserialize)]
pub struct AlertProperties {
    pub event: Option<String>,
    #[serde(rename = "areaDesc")]
    pub area_desc: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PointsResponse {
    pub properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
pub struct PointsProperties {
    /// URL of the forecast resource for this grid point
    pub forecast: String,
}

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub properties: ForecastProperties,
}

/// Periods stay untyped until rendered; only the leading ones are ever read
#[derive(Debug, Deserialize)]
pub struct ForecastProperties {
    pub periods: Vec<serde_json::Value>,
}

impl ForecastResponse {
    /// Decodes the first `limit` periods, failing if any of those is malformed
    pub fn leading_periods(&self, limit: usize) -> Result<Vec<ForecastPeriod>, serde_json::Error> {
        self.properties
            .periods
            .iter()
            .take(limit)
            .map(ForecastPeriod::deserialize)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ForecastPeriod {
    pub name: String,
    pub temperature: serde_json::Number,
    #[serde(rename = "temperatureUnit")]
    pub temperature_unit: String,
    #[serde(rename = "windSpeed")]
    pub wind_speed: String,
    #[serde(rename = "windDirection")]
    pub wind_direction: String,
    #[serde(rename = "detailedForecast")]
    pub detailed_forecast: String,
}

// ============================================================================
// MCP Tool and Prompt Request Models
// ============================================================================

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetAlertsRequest {
    /// Two-letter US state code (e.g. CA, NY)
    pub state: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetForecastRequest {
    /// Latitude of the location
    pub latitude: f64,
    /// Longitude of the location
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct TranslationPromptArgs {
    /// Sentence to translate
    pub txt: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alert_properties_tolerate_missing_and_null_fields() {
        let response: AlertResponse = serde_json::from_value(json!({
            "features": [
                { "properties": { "event": "Flood Watch", "severity": null } }
            ]
        }))
        .unwrap();

        let props = &response.features[0].properties;
        assert_eq!(props.event.as_deref(), Some("Flood Watch"));
        assert!(props.severity.is_none());
        assert!(props.area_desc.is_none());
    }

    #[test]
    fn test_alert_response_requires_features() {
        let parsed = serde_json::from_value::<AlertResponse>(json!({ "title": "no features" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_null_features_means_no_alerts() {
        let response: AlertResponse = serde_json::from_value(json!({ "features": null })).unwrap();
        assert!(response.features.is_empty());
    }

    #[test]
    fn test_leading_periods_ignore_trailing_garbage() {
        let valid = json!({
            "name": "Today",
            "temperature": 70,
            "temperatureUnit": "F",
            "windSpeed": "5 mph",
            "windDirection": "N",
            "detailedForecast": "Sunny."
        });
        let response: ForecastResponse = serde_json::from_value(json!({
            "properties": { "periods": [valid.clone(), valid, { "name": "Broken", "temperature": null }] }
        }))
        .unwrap();

        assert_eq!(response.leading_periods(2).unwrap().len(), 2);
        assert!(response.leading_periods(3).is_err());
    }

    #[test]
    fn test_points_response_requires_forecast_url() {
        let parsed = serde_json::from_value::<PointsResponse>(json!({
            "properties": { "gridId": "MTR", "gridX": 85, "gridY": 105 }
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_forecast_period_keeps_temperature_verbatim() {
        let period: ForecastPeriod = serde_json::from_value(json!({
            "name": "Tonight",
            "temperature": 48,
            "temperatureUnit": "F",
            "windSpeed": "5 to 10 mph",
            "windDirection": "W",
            "detailedForecast": "Mostly clear."
        }))
        .unwrap();

        assert_eq!(period.temperature.to_string(), "48");
    }
}
