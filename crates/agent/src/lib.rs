//! Chat concierge runtime.
//!
//! Turns a guest message into a grounded LLM prompt, calls the configured
//! provider, and acts on any directive the model appends to its reply:
//!
//! 1. **Prompting** (`prompt`, `conversation`) - catalogue snapshot, today's
//!    date and the trailing transcript rendered through a Tera template.
//! 2. **Completion** (`llm`) - Gemini, OpenAI-compatible or Ollama clients.
//! 3. **Directive handling** (`directive`, `guardrails`) - extract
//!    `CHECK_AVAILABILITY` / `BOOKING_REQUEST` payloads and vet them.
//! 4. **Execution** (`gateway`) - availability checks and bookings go
//!    through the same reservation service the HTTP API uses.
//!
//! The model never decides prices or availability. Both come from the
//! reservation service.

pub mod conversation;
pub mod directive;
pub mod gateway;
pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod runtime;

pub use conversation::{ConversationContext, ConversationTurn};
pub use gateway::{GatewayError, HttpGateway, ReservationGateway};
pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use llm::{build_client, LlmClient};
pub use runtime::{CatalogSource, ChatError, ChatReply, ChatRequest, ChatSettings, ConciergeRuntime};
