use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use concierge_core::config::ChatConfig;
use concierge_core::domain::activity::Activity;
use concierge_core::domain::reservation::{BookingResponse, ReservationEnvelope};
use concierge_core::domain::room::Room;
use concierge_core::domain::spa::SpaService;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::ConversationContext;
use crate::directive::{self, Directive, DirectiveKind, DirectiveOutcome};
use crate::gateway::ReservationGateway;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::LlmClient;
use crate::prompt::{CatalogContext, PromptBuilder, PromptError, PromptInput, Topics};

pub const UPSTREAM_FAILURE_REPLY: &str = "Sorry, I encountered an error. Please try again.";
pub const NOT_CONFIGURED_REPLY: &str = "API key not configured. Please add GEMINI_API_KEY to your \
     environment (or set llm.api_key in concierge.toml).";
pub const EMPTY_MESSAGE_REPLY: &str = "Please type a message so I can help you.";
pub const DIRECTIVE_APOLOGY: &str = "(Sorry, I wasn't able to process that request automatically. \
     Could you confirm the details so I can try again?)";

/// Live catalogue lookups used to ground the prompt.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn available_rooms(&self) -> Result<Vec<Room>>;
    async fn available_spa_services(&self) -> Result<Vec<SpaService>>;
    async fn available_activities(&self) -> Result<Vec<Activity>>;
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_context: Option<ConversationContext>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_data: Option<BookingResponse>,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat message is empty")]
    EmptyMessage,
    #[error("no LLM client is configured")]
    NotConfigured,
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("LLM call failed: {0:#}")]
    Upstream(anyhow::Error),
}

impl ChatError {
    /// The conversational reply shown to the guest for this failure.
    pub fn reply(&self) -> &'static str {
        match self {
            Self::EmptyMessage => EMPTY_MESSAGE_REPLY,
            Self::NotConfigured => NOT_CONFIGURED_REPLY,
            Self::Prompt(_) | Self::Upstream(_) => UPSTREAM_FAILURE_REPLY,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyMessage)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSettings {
    pub resort_name: String,
    pub context_lines: usize,
}

impl From<&ChatConfig> for ChatSettings {
    fn from(config: &ChatConfig) -> Self {
        Self { resort_name: config.resort_name.clone(), context_lines: config.context_lines }
    }
}

pub struct ConciergeRuntime {
    llm: Option<Arc<dyn LlmClient>>,
    catalog: Arc<dyn CatalogSource>,
    gateway: Arc<dyn ReservationGateway>,
    prompts: PromptBuilder,
    guardrails: GuardrailPolicy,
    settings: ChatSettings,
}

impl ConciergeRuntime {
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        catalog: Arc<dyn CatalogSource>,
        gateway: Arc<dyn ReservationGateway>,
        guardrails: GuardrailPolicy,
        settings: ChatSettings,
    ) -> Result<Self, PromptError> {
        Ok(Self { llm, catalog, gateway, prompts: PromptBuilder::new()?, guardrails, settings })
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn handle_message(
        &self,
        request: &ChatRequest,
        today: NaiveDate,
        correlation_id: &str,
    ) -> Result<ChatReply, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let Some(llm) = self.llm.as_ref() else {
            tracing::error!(
                event_name = "chat.llm.not_configured",
                correlation_id,
                "chat request received without an LLM API key"
            );
            return Err(ChatError::NotConfigured);
        };

        let topics = Topics::detect(message);
        let catalog = self.load_catalog(topics, correlation_id).await;
        let conversation = request
            .conversation_context
            .as_ref()
            .map(|context| context.trailing(self.settings.context_lines))
            .unwrap_or_default();

        let prompt = self.prompts.render(&PromptInput {
            resort_name: &self.settings.resort_name,
            today,
            catalog: &catalog,
            conversation: &conversation,
            message,
        })?;

        let raw = llm.complete(&prompt).await.map_err(|error| {
            tracing::error!(
                event_name = "chat.llm.failed",
                correlation_id,
                error = %format!("{error:#}"),
                "LLM call failed"
            );
            ChatError::Upstream(error)
        })?;

        let extraction = directive::extract(&raw);
        match extraction.outcome {
            DirectiveOutcome::Absent => Ok(ChatReply { reply: extraction.reply, booking_data: None }),
            DirectiveOutcome::Malformed { kind, reason } => {
                tracing::warn!(
                    event_name = "chat.directive.malformed",
                    correlation_id,
                    directive = kind.as_str(),
                    reason = %reason,
                    "could not parse directive from model output"
                );
                Ok(ChatReply { reply: append(&extraction.reply, DIRECTIVE_APOLOGY), booking_data: None })
            }
            DirectiveOutcome::Parsed(directive) => {
                Ok(self.run_directive(extraction.reply, &directive, correlation_id).await)
            }
        }
    }

    async fn run_directive(&self, reply: String, directive: &Directive, correlation_id: &str) -> ChatReply {
        let decision = self.guardrails.evaluate(directive);
        if let GuardrailDecision::Deny { reason_code, user_message, fallback_path }
        | GuardrailDecision::Degrade { reason_code, user_message, fallback_path } = &decision
        {
            tracing::info!(
                event_name = "chat.directive.guardrail",
                correlation_id,
                directive = directive.kind.as_str(),
                reason_code = *reason_code,
                fallback_path = *fallback_path,
                "directive blocked by guardrail"
            );
            return ChatReply { reply: append(&reply, user_message), booking_data: None };
        }

        let envelope = &directive.envelope;
        let report = match self.gateway.check_availability(envelope).await {
            Ok(report) => report,
            Err(error) => return self.gateway_failure(reply, directive.kind, &error, correlation_id),
        };

        tracing::info!(
            event_name = "chat.directive.availability",
            correlation_id,
            directive = directive.kind.as_str(),
            reservation_type = %envelope.kind,
            available = report.available,
            "availability checked for chat directive"
        );

        if directive.kind == DirectiveKind::CheckAvailability || !report.available {
            let mut text = report.message.clone();
            if let (true, Some(nights), Some(total)) =
                (report.available, report.nights, report.total_price)
            {
                text.push_str(&format!(" Total for {nights} night(s): ${}.", total.normalize()));
            }
            return ChatReply { reply: append(&reply, &text), booking_data: None };
        }

        self.book(reply, envelope, correlation_id).await
    }

    async fn book(&self, reply: String, envelope: &ReservationEnvelope, correlation_id: &str) -> ChatReply {
        match self.gateway.create_booking(envelope).await {
            Ok(response) if response.success => {
                tracing::info!(
                    event_name = "chat.directive.booked",
                    correlation_id,
                    reservation_type = %envelope.kind,
                    "reservation created from chat"
                );
                ChatReply { reply: append(&reply, &response.message), booking_data: Some(response) }
            }
            Ok(response) => ChatReply { reply: append(&reply, &response.message), booking_data: None },
            Err(error) => {
                self.gateway_failure(reply, DirectiveKind::BookingRequest, &error, correlation_id)
            }
        }
    }

    fn gateway_failure(
        &self,
        reply: String,
        kind: DirectiveKind,
        error: &crate::gateway::GatewayError,
        correlation_id: &str,
    ) -> ChatReply {
        tracing::error!(
            event_name = "chat.directive.gateway_failed",
            correlation_id,
            directive = kind.as_str(),
            error = %error,
            "reservation gateway failed"
        );
        ChatReply { reply: append(&reply, DIRECTIVE_APOLOGY), booking_data: None }
    }

    async fn load_catalog(&self, topics: Topics, correlation_id: &str) -> CatalogContext {
        let mut catalog = CatalogContext::default();
        if !topics.any() {
            tracing::debug!(
                event_name = "chat.catalog.skipped",
                correlation_id,
                "message names no catalogue section"
            );
            return catalog;
        }

        if topics.rooms {
            match self.catalog.available_rooms().await {
                Ok(rooms) => catalog.rooms = rooms,
                Err(error) => log_catalog_failure("rooms", &error, correlation_id),
            }
        }
        if topics.spa {
            match self.catalog.available_spa_services().await {
                Ok(services) => catalog.spa_services = services,
                Err(error) => log_catalog_failure("spa_services", &error, correlation_id),
            }
        }
        if topics.activities {
            match self.catalog.available_activities().await {
                Ok(activities) => catalog.activities = activities,
                Err(error) => log_catalog_failure("activities", &error, correlation_id),
            }
        }

        catalog
    }
}

fn log_catalog_failure(section: &str, error: &anyhow::Error, correlation_id: &str) {
    tracing::warn!(
        event_name = "chat.catalog.unavailable",
        correlation_id,
        section,
        error = %format!("{error:#}"),
        "catalogue lookup failed; continuing without it"
    );
}

fn append(reply: &str, extra: &str) -> String {
    match (reply.trim().is_empty(), extra.trim().is_empty()) {
        (true, _) => extra.trim().to_string(),
        (_, true) => reply.trim().to_string(),
        _ => format!("{}\n\n{}", reply.trim(), extra.trim()),
    }
}
