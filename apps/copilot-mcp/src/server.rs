//! # Copilot MCP Server
//!
//! Implements `ServerHandler` with the `Retrieve` tool, which forwards to the
//! Copilot Retrieval API, and eleven research prompts rendered from
//! `copilot_core::PROMPT_TEMPLATES`.

use crate::forwarder::{ForwardError, RetrievalForwarder};
use copilot_core::{DataSource, PromptKind};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::prompt::PromptRouter, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, GetPromptRequestParams, GetPromptResult, ListPromptsResult,
        PaginatedRequestParams, PromptMessage, PromptMessageRole, ServerCapabilities, ServerInfo,
    },
    prompt, prompt_handler, prompt_router, schemars,
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router,
};
use serde::Deserialize;

// =============================================================================
// MCP SERVER
// =============================================================================

/// MCP server that bridges to the Copilot Retrieval API.
#[derive(Clone)]
pub struct CopilotMcp {
    forwarder: RetrievalForwarder,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
    #[allow(dead_code)]
    prompt_router: PromptRouter<Self>,
}

// =============================================================================
// TOOL PARAMETER STRUCTS
// =============================================================================

/// Content source accepted by the Retrieval API.
#[derive(Debug, Clone, Copy, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DataSourceParam {
    SharePoint,
    OneDriveBusiness,
    ExternalItem,
}

impl From<DataSourceParam> for DataSource {
    fn from(param: DataSourceParam) -> Self {
        match param {
            DataSourceParam::SharePoint => Self::SharePoint,
            DataSourceParam::OneDriveBusiness => Self::OneDriveBusiness,
            DataSourceParam::ExternalItem => Self::ExternalItem,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveParams {
    #[schemars(
        description = "Natural language query string used to retrieve relevant text extracts. \
                       This parameter has a limit of 1,500 characters. Your query should be a \
                       single sentence, and you should avoid spelling errors in context-rich keywords."
    )]
    pub query: String,
    #[schemars(
        description = "The data source from which to retrieve the extracts (sharePoint, \
                       oneDriveBusiness, externalItem). If not specified, the default is all \
                       available sources."
    )]
    pub data_source: Option<DataSourceParam>,
    #[schemars(
        description = "Indicates whether extracts should be retrieved from specific connectors \
                       (if using externalItem)."
    )]
    pub connection_ids: Option<Vec<String>>,
    #[schemars(
        description = "The number of results that are returned in the response. Must be between \
                       1 and 25. By default, returns up to 25 results."
    )]
    pub maximum_number_of_results: Option<i64>,
}

// =============================================================================
// PROMPT ARGUMENT STRUCTS
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TopicArgs {
    #[schemars(
        description = "The project, technology, or topic you want to research \
                       (e.g., 'mobile app development', 'API design patterns', 'deployment strategies')"
    )]
    pub topic: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IssueArgs {
    #[schemars(
        description = "The error, issue, or problem you need help troubleshooting \
                       (e.g., 'authentication errors', 'deployment failures', 'database connection issues')"
    )]
    pub issue: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TechnologyArgs {
    #[schemars(
        description = "The technology, framework, or area you need standards for \
                       (e.g., 'React development', 'microservices architecture', 'API design', 'security guidelines')"
    )]
    pub technology: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProcessArgs {
    #[schemars(
        description = "The business process or workflow you need information about \
                       (e.g., 'customer onboarding', 'expense approval', 'vendor management', 'data privacy')"
    )]
    pub process: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MarketArgs {
    #[schemars(
        description = "The market, competitor, or business area you want to research \
                       (e.g., 'mobile payment market', 'competitor analysis Q3', 'customer satisfaction trends')"
    )]
    pub topic: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProcedureArgs {
    #[schemars(
        description = "The DevOps area or procedure you need information about \
                       (e.g., 'CI/CD pipeline', 'container deployment', 'monitoring setup', 'infrastructure automation')"
    )]
    pub procedure: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceArgs {
    #[schemars(
        description = "The compliance area or regulation you need information about \
                       (e.g., 'GDPR compliance', 'security audit', 'data retention', 'privacy policies')"
    )]
    pub compliance_area: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingArgs {
    #[schemars(
        description = "The training topic or skill area you need resources for \
                       (e.g., 'new employee onboarding', 'cloud platform training', 'security awareness', 'technical certifications')"
    )]
    pub training_topic: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightArgs {
    #[schemars(
        description = "The customer insight area you want to research \
                       (e.g., 'customer satisfaction', 'user experience feedback', 'product reviews', 'support ticket trends')"
    )]
    pub insight_area: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationArgs {
    #[schemars(
        description = "The integration area or system you need patterns for \
                       (e.g., 'payment system integration', 'webhook implementation', 'data synchronization', 'third-party APIs')"
    )]
    pub integration_area: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityArgs {
    #[schemars(
        description = "The security area you need guidance for \
                       (e.g., 'password policy', 'incident response', 'cloud hardening', 'access reviews')"
    )]
    pub security_area: String,
}

// =============================================================================
// TOOL IMPLEMENTATIONS
// =============================================================================

#[tool_router]
impl CopilotMcp {
    pub fn new(forwarder: RetrievalForwarder) -> Self {
        Self {
            forwarder,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    #[tool(
        name = "Retrieve",
        description = "Retrieves relevant knowledge information from internal systems \
                       (Confluence, Jira, Azure Devops, Salesforce...) in a secure and compliant way."
    )]
    async fn retrieve(&self, params: Parameters<RetrieveParams>) -> Result<CallToolResult, McpError> {
        let RetrieveParams {
            query,
            data_source,
            connection_ids,
            maximum_number_of_results,
        } = params.0;
        let result = self
            .forwarder
            .retrieve(
                query,
                data_source.map(DataSource::from),
                connection_ids,
                maximum_number_of_results,
            )
            .await;
        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(ForwardError::InvalidParams(e)) => Err(McpError::invalid_params(format!("{e}"), None)),
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }
}

// =============================================================================
// PROMPTS
// =============================================================================

fn render(kind: PromptKind, topic: &str) -> Vec<PromptMessage> {
    vec![PromptMessage::new_text(PromptMessageRole::User, kind.render(topic))]
}

#[prompt_router]
impl CopilotMcp {
    #[prompt(
        name = "project_research",
        description = "Research project documentation, best practices, and technical resources \
                       across your organization's knowledge base. Ideal for finding development standards, \
                       architecture decisions, and project-related documentation."
    )]
    async fn project_research(&self, args: Parameters<TopicArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::ProjectResearch, &args.0.topic))
    }

    #[prompt(
        name = "troubleshooting_guide",
        description = "Find troubleshooting guides, error solutions, and technical documentation \
                       for resolving common issues. Perfect for locating debugging procedures and problem \
                       resolution steps."
    )]
    async fn troubleshooting_guide(&self, args: Parameters<IssueArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::TroubleshootingGuide, &args.0.issue))
    }

    #[prompt(
        name = "code_standards",
        description = "Access coding standards, architecture guidelines, and technical best \
                       practices from your organization. Useful for understanding development conventions \
                       and architectural decisions."
    )]
    async fn code_standards(&self, args: Parameters<TechnologyArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::CodeStandards, &args.0.technology))
    }

    #[prompt(
        name = "business_process",
        description = "Retrieve business process documentation, workflows, and operational \
                       procedures from your organization. Perfect for understanding company processes and \
                       compliance requirements."
    )]
    async fn business_process(&self, args: Parameters<ProcessArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::BusinessProcess, &args.0.process))
    }

    #[prompt(
        name = "competitive_intelligence",
        description = "Research market analysis, competitor information, and business intelligence \
                       from internal reports and documents. Ideal for gathering market insights and \
                       competitive positioning."
    )]
    async fn competitive_intelligence(&self, args: Parameters<MarketArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::CompetitiveIntelligence, &args.0.topic))
    }

    #[prompt(
        name = "devops_procedures",
        description = "Access DevOps procedures, deployment guides, and infrastructure documentation. \
                       Perfect for finding CI/CD pipelines, deployment strategies, and operational procedures."
    )]
    async fn devops_procedures(&self, args: Parameters<ProcedureArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::DevopsProcedures, &args.0.procedure))
    }

    #[prompt(
        name = "compliance_documentation",
        description = "Find compliance procedures, audit documentation, and regulatory guidelines \
                       from your organization. Essential for understanding security, privacy, and regulatory \
                       requirements."
    )]
    async fn compliance_documentation(
        &self,
        args: Parameters<ComplianceArgs>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::ComplianceDocumentation, &args.0.compliance_area))
    }

    #[prompt(
        name = "training_resources",
        description = "Access training materials, onboarding guides, and learning resources from \
                       your organization. Perfect for finding educational content and skill development materials."
    )]
    async fn training_resources(&self, args: Parameters<TrainingArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::TrainingResources, &args.0.training_topic))
    }

    #[prompt(
        name = "customer_insights",
        description = "Research customer feedback, survey results, and user research findings \
                       from your organization's knowledge base. Ideal for understanding customer needs and \
                       satisfaction trends."
    )]
    async fn customer_insights(&self, args: Parameters<InsightArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::CustomerInsights, &args.0.insight_area))
    }

    #[prompt(
        name = "integration_patterns",
        description = "Find integration patterns, API documentation, and system integration guides \
                       from your organization's technical resources. Perfect for understanding system \
                       connections and data flows."
    )]
    async fn integration_patterns(
        &self,
        args: Parameters<IntegrationArgs>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::IntegrationPatterns, &args.0.integration_area))
    }

    #[prompt(
        name = "security_guidelines",
        description = "Find security policies, hardening guides, and incident procedures from \
                       your organization. Useful for locating security baselines, access rules, and \
                       response runbooks."
    )]
    async fn security_guidelines(&self, args: Parameters<SecurityArgs>) -> Result<Vec<PromptMessage>, McpError> {
        Ok(render(PromptKind::SecurityGuidelines, &args.0.security_area))
    }
}

// =============================================================================
// SERVER HANDLER
// =============================================================================

#[tool_handler]
#[prompt_handler]
impl ServerHandler for CopilotMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Microsoft 365 Copilot retrieval server. Use the Retrieve tool to search \
                 internal knowledge, or one of the research prompts to run a guided search."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
