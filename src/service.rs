use anyhow::Result;
use rmcp::{
    handler::server::{
        router::{prompt::PromptRouter, tool::ToolRouter},
        wrapper::Parameters,
        ServerHandler,
    },
    model::{
        AnnotateAble, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        Implementation, ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParam, PromptMessage, PromptMessageRole, ProtocolVersion, RawResourceTemplate, ReadResourceRequestParam, ReadResourceResult,
        ResourceContents, ServerCapabilities, ServerInfo,
    },
    prompt, prompt_handler, prompt_router,
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use std::sync::Arc;

use crate::config::Config;
use crate::constants::{
    ALERTS_UNAVAILABLE, FORECAST_DETAIL_UNAVAILABLE, FORECAST_LOCATION_UNAVAILABLE, GREETING_SCHEME,
};
use crate::formatters::{format_alerts, format_forecast, format_greeting, format_translation_prompt};
use crate::models::{GetAlertsRequest, GetForecastRequest, TranslationPromptArgs};
use crate::nws::NwsClient;

/// Main weather service that handles MCP requests
#[derive(Clone)]
pub struct Weather {
    nws: Arc<NwsClient>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl Weather {
    /// Creates a new Weather service instance
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(NwsClient::new(config.nws_api_base.as_str())?))
    }

    pub fn with_client(nws: NwsClient) -> Self {
        Self {
            nws: Arc::new(nws),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    /// Active alerts for `state` as text; upstream failures become a fixed placeholder
    pub async fn alerts_report(&self, state: &str) -> String {
        match self.nws.alerts(state).await {
            Ok(alerts) => format_alerts(&alerts),
            Err(e) => {
                tracing::warn!(state, error = %e, "Failed to fetch alerts");
                ALERTS_UNAVAILABLE.to_string()
            }
        }
    }

    /// Forecast for a coordinate pair: grid-point lookup, then the forecast itself
    pub async fn forecast_report(&self, latitude: f64, longitude: f64) -> String {
        let points = match self.nws.points(latitude, longitude).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(latitude, longitude, error = %e, "Failed to resolve grid point");
                return FORECAST_LOCATION_UNAVAILABLE.to_string();
            }
        };

        let forecast_url = &points.properties.forecast;
        let forecast = match self.nws.forecast(forecast_url).await {
            Ok(forecast) => forecast,
            Err(e) => {
                tracing::warn!(url = %forecast_url, error = %e, "Failed to fetch forecast");
                return FORECAST_DETAIL_UNAVAILABLE.to_string();
            }
        };

        format_forecast(&forecast).unwrap_or_else(|e| {
            tracing::warn!(url = %forecast_url, error = %e, "Malformed forecast period");
            FORECAST_DETAIL_UNAVAILABLE.to_string()
        })
    }

    fn resource_templates() -> Vec<RawResourceTemplate> {
        vec![RawResourceTemplate {
            uri_template: format!("{}{{name}}", GREETING_SCHEME),
            name: "get_greeting".into(),
            title: None,
            description: Some("Get a personalized greeting".into()),
            mime_type: Some("text/plain".into()),
        }]
    }

    /// Reads a `greeting://{name}` resource
    fn read_greeting(uri: &str) -> Result<ReadResourceResult, McpError> {
        let name = uri
            .strip_prefix(GREETING_SCHEME)
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .ok_or_else(|| McpError::resource_not_found(format!("Unknown resource: {}", uri), None))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(format_greeting(name), uri)],
        })
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for Weather {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "weather".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                title: None,
                website_url: None,
            },
            instructions: Some(
                "Weather tools backed by the National Weather Service API: active alerts by US state \
                and multi-period forecasts by coordinates. Also offers a greeting resource and a \
                Japanese translation prompt."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![],
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            resource_templates: Self::resource_templates()
                .into_iter()
                .map(|t| t.no_annotation())
                .collect(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        tracing::info!("Reading resource: {}", request.uri);
        Self::read_greeting(&request.uri)
    }
}

#[tool_router]
impl Weather {
    /// Gets active weather alerts for a US state
    #[tool(description = "Get weather alerts for a US state. Provide a two-letter US state code (e.g. CA, NY).")]
    async fn get_alerts(
        &self,
        Parameters(request): Parameters<GetAlertsRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Getting alerts for state: {}", request.state);

        let formatted = self.alerts_report(&request.state).await;

        Ok(CallToolResult::success(vec![Content::text(formatted)]))
    }

    /// Gets the weather forecast for a location
    #[tool(description = "Get weather forecast for a location. Provide the latitude and longitude of the location.")]
    async fn get_forecast(
        &self,
        Parameters(request): Parameters<GetForecastRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(
            "Getting forecast for coordinates: {}, {}",
            request.latitude,
            request.longitude
        );

        let formatted = self.forecast_report(request.latitude, request.longitude).await;

        Ok(CallToolResult::success(vec![Content::text(formatted)]))
    }
}

#[prompt_router]
impl Weather {
    #[prompt(name = "translation_ja", description = "Translating to Japanese")]
    async fn translation_ja(
        &self,
        Parameters(args): Parameters<TranslationPromptArgs>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        Ok(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format_translation_prompt(&args.txt),
        )])
    }
}
