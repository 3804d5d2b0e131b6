use std::time::Duration;

/// User agent string for HTTP requests
pub const USER_AGENT: &str = "weather-app/1.0";

/// Media type requested from the National Weather Service API
pub const ACCEPT_GEO_JSON: &str = "application/geo+json";

/// National Weather Service API base URL
pub const NWS_API_BASE: &str = "https://api.weather.gov";

/// Per-call timeout for outbound weather requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of forecast periods rendered by `get_forecast`
pub const FORECAST_PERIOD_LIMIT: usize = 5;

/// Separator placed between rendered alert or forecast blocks
pub const BLOCK_SEPARATOR: &str = "\n---\n";

pub const ALERTS_UNAVAILABLE: &str = "Unable to fetch alerts or no alerts found.";
pub const NO_ACTIVE_ALERTS: &str = "No active alerts for this state.";
pub const FORECAST_LOCATION_UNAVAILABLE: &str = "Unable to fetch forecast data for this location.";
pub const FORECAST_DETAIL_UNAVAILABLE: &str = "Unable to fetch detailed forecast.";

/// URI scheme of the greeting resource template
pub const GREETING_SCHEME: &str = "greeting://";

/// Default listening port
pub const DEFAULT_PORT: u16 = 8123;

/// Lifetime of a fetched JSON Web Key Set before it is refreshed
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Timeout for fetching the JSON Web Key Set
pub const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum spacing between key set fetches forced by an unknown key id
pub const JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
