use crate::constants::{BLOCK_SEPARATOR, FORECAST_PERIOD_LIMIT, NO_ACTIVE_ALERTS};
use crate::models::{AlertFeature, AlertResponse, ForecastPeriod, ForecastResponse};

const UNKNOWN: &str = "Unknown";
const NO_DESCRIPTION: &str = "No description available";
const NO_INSTRUCTIONS: &str = "No specific instructions provided";

/// Formats a single alert feature into a readable block
pub fn format_alert(feature: &AlertFeature) -> String {
    let props = &feature.properties;
    format!(
        "\nEvent: {}\nArea: {}\nSeverity: {}\nDescription: {}\nInstructions: {}\n",
        props.event.as_deref().unwrap_or(UNKNOWN),
        props.area_desc.as_deref().unwrap_or(UNKNOWN),
        props.severity.as_deref().unwrap_or(UNKNOWN),
        props.description.as_deref().unwrap_or(NO_DESCRIPTION),
        props.instruction.as_deref().unwrap_or(NO_INSTRUCTIONS),
    )
}

/// Formats weather alerts into a human-readable string
pub fn format_alerts(alerts: &AlertResponse) -> String {
    if alerts.features.is_empty() {
        return NO_ACTIVE_ALERTS.to_string();
    }

    alerts
        .features
        .iter()
        .map(format_alert)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

fn format_period(period: &ForecastPeriod) -> String {
    format!(
        "\n{}:\nTemperature: {}\u{00b0}{}\nWind: {} {}\nForecast: {}\n",
        period.name,
        period.temperature,
        period.temperature_unit,
        period.wind_speed,
        period.wind_direction,
        period.detailed_forecast
    )
}

/// Formats the next few forecast periods into a human-readable string.
///
/// Periods past the limit are never decoded, so only a malformed leading
/// period is an error.
pub fn format_forecast(forecast: &ForecastResponse) -> Result<String, serde_json::Error> {
    Ok(forecast
        .leading_periods(FORECAST_PERIOD_LIMIT)?
        .iter()
        .map(format_period)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR))
}

pub fn format_greeting(name: &str) -> String {
    format!("Hello, {}!", name)
}

/// Instruction handed to the client's language model; this does not translate anything itself
pub fn format_translation_prompt(txt: &str) -> String {
    format!("Please translate this sentence into Japanese:\n\n{}", txt)
}
