//! The chat orchestrator.
//!
//! A [`ChatAssistant`] runs one turn per call on its own tokio task: it
//! trims the thread to the token budget, streams the model answer into a
//! fresh assistant message, invokes the requested tools (or stops to ask
//! the user when a tool needs confirmation) and loops until the model
//! stops calling tools.
//!
//! Frames go out through an [`Emitter`]; each frame is applied to the
//! turn's [`ChatState`] only after it was sent, so the persisted messages
//! are exactly what the client rendered. The turn always ends with one
//! [`TurnCompletion`] on the completion channel.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use lc_context::{limit_messages, to_prompt_messages, Tokenizer};
use lc_domain::chat_state::{ChatState, StreamPartError};
use lc_domain::config::{AutoSummaryConfig, ChatConfig};
use lc_domain::conversation::AssistantParams;
use lc_domain::message::{Citation, ConfirmRequest, Message, MessageBody, MessagePart, Role};
use lc_domain::prompt::PromptMessage;
use lc_domain::stream::{StreamEvent, Usage};
use lc_domain::stream_part::StreamPart;
use lc_domain::tool::{ContentItem, ToolCall, ToolCallResult, ToolResultOutput};
use lc_domain::trace::TraceEvent;
use lc_providers::{ChatRequest, LlmProvider};
use lc_store::MessageStore;
use lc_tools::{ToolFunction, ToolInvocation, ToolSet, ToolUiEvent, ToolUiLink};

use super::emitter::{ClientGone, Emitter, Frame};
use super::summary;

const PROVIDER_ERROR_TEXT: &str = "Failed reading response from LLM";
const DENIED_TEXT: &str = "User denied access to function";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub max_tool_loops: usize,
    pub event_buffer: usize,
    pub default_token_limit: usize,
    pub auto_summary: AutoSummaryConfig,
    /// Model name sent with every request; `None` uses the provider default.
    pub model: Option<String>,
}

impl ChatOptions {
    pub fn from_config(cfg: &ChatConfig) -> Self {
        Self {
            max_tool_loops: cfg.max_tool_loops,
            event_buffer: cfg.event_buffer,
            default_token_limit: cfg.default_token_limit,
            auto_summary: cfg.auto_summary.clone(),
            model: None,
        }
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// The thread a turn starts from, root first.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub conversation_id: String,
    pub history: Vec<Message>,
}

pub struct TurnStream {
    pub frames: mpsc::Receiver<Frame>,
    pub completion: oneshot::Receiver<TurnCompletion>,
}

impl TurnStream {
    /// Read every frame, then the completion.
    pub async fn collect(mut self) -> (Vec<Frame>, Option<TurnCompletion>) {
        let mut frames = Vec::new();
        while let Some(frame) = self.frames.recv().await {
            frames.push(frame);
        }
        (frames, self.completion.await.ok())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TurnFailure {
    #[error("Failed reading response from LLM: {0}")]
    Provider(String),

    #[error("{message}")]
    Tool { tool: String, message: String },

    #[error("No such function: {0}")]
    ToolNotFound(String),

    #[error("protocol violation: {0}")]
    Protocol(#[from] StreamPartError),

    #[error("store: {0}")]
    Store(String),

    #[error("Iteration count exceeded")]
    IterationLimit,

    #[error("invalid history: {0}")]
    InvalidHistory(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Done,
    AwaitingConfirmation,
    ClientGone,
    Failed(TurnFailure),
}

#[derive(Debug, Clone)]
pub struct TurnCompletion {
    pub outcome: TurnOutcome,
    /// Messages persisted by this turn, in order.
    pub saved: Vec<Message>,
    pub title: Option<String>,
    pub usage: Usage,
    pub last_sent_at: Option<DateTime<Utc>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ChatAssistant
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
}

pub struct ChatAssistant {
    params: AssistantParams,
    provider: Arc<dyn LlmProvider>,
    tools: ToolSet,
    store: Arc<dyn MessageStore>,
    tokenizer: Arc<dyn Tokenizer>,
    options: ChatOptions,
    summarizer: Option<Summarizer>,
}

enum TurnKind {
    UserMessage,
    ConfirmResponse { request: ConfirmRequest, allowed: bool },
}

impl ChatAssistant {
    pub fn new(
        params: AssistantParams,
        provider: Arc<dyn LlmProvider>,
        tools: ToolSet,
        store: Arc<dyn MessageStore>,
        tokenizer: Arc<dyn Tokenizer>,
        options: ChatOptions,
    ) -> Self {
        Self {
            params,
            provider,
            tools,
            store,
            tokenizer,
            options,
            summarizer: None,
        }
    }

    /// Enable title generation with the given provider.
    pub fn with_summarizer(mut self, provider: Arc<dyn LlmProvider>, model: Option<String>) -> Self {
        self.summarizer = Some(Summarizer { provider, model });
        self
    }

    pub fn params(&self) -> &AssistantParams {
        &self.params
    }

    /// Answer the user message at the end of `input.history`.
    pub fn send_user_message(self: Arc<Self>, input: TurnInput) -> TurnStream {
        self.spawn_turn(input, TurnKind::UserMessage)
    }

    /// Resume a turn parked on the `tool-auth-request` at the end of
    /// `input.history`.
    pub fn send_confirm_response(
        self: Arc<Self>,
        input: TurnInput,
        request: ConfirmRequest,
        allowed: bool,
    ) -> TurnStream {
        self.spawn_turn(input, TurnKind::ConfirmResponse { request, allowed })
    }

    fn spawn_turn(self: Arc<Self>, input: TurnInput, kind: TurnKind) -> TurnStream {
        let (tx, frames) = mpsc::channel(self.options.event_buffer.max(1));
        let (done_tx, completion) = oneshot::channel();

        let span = tracing::info_span!(
            "chat_turn",
            conversation_id = %input.conversation_id,
            assistant_id = %self.params.assistant_id,
        );
        tokio::spawn(
            async move {
                let completion = self.run(input, kind, tx).await;
                tracing::debug!(outcome = ?completion.outcome, saved = completion.saved.len(), "turn finished");
                let _ = done_tx.send(completion);
            }
            .instrument(span),
        );

        TurnStream { frames, completion }
    }

    async fn run(&self, input: TurnInput, kind: TurnKind, tx: mpsc::Sender<Frame>) -> TurnCompletion {
        let first_exchange = matches!(kind, TurnKind::UserMessage) && input.history.len() == 1;
        let mut turn = Turn {
            assistant: self,
            emitter: Emitter::new(tx, input.conversation_id.clone()),
            state: ChatState::new(input.conversation_id, input.history),
            saved: Vec::new(),
            usage: Usage::default(),
            pending_usage: None,
            unsaved: false,
        };

        let result = match kind {
            TurnKind::UserMessage => turn.answer_user().await,
            TurnKind::ConfirmResponse { request, allowed } => {
                turn.resume_after_confirm(request, allowed).await
            }
        };
        turn.finish(result, first_exchange).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn: state of one running turn
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

enum Stop {
    ClientGone,
    Failed(TurnFailure),
}

impl From<ClientGone> for Stop {
    fn from(_: ClientGone) -> Self {
        Stop::ClientGone
    }
}

impl From<TurnFailure> for Stop {
    fn from(f: TurnFailure) -> Self {
        Stop::Failed(f)
    }
}

impl From<StreamPartError> for Stop {
    fn from(e: StreamPartError) -> Self {
        Stop::Failed(TurnFailure::Protocol(e))
    }
}

enum LoopEnd {
    Done,
    AwaitingConfirmation,
}

struct Turn<'a> {
    assistant: &'a ChatAssistant,
    emitter: Emitter,
    state: ChatState,
    saved: Vec<Message>,
    usage: Usage,
    /// Usage of the model call that produced the open assistant message.
    pending_usage: Option<Usage>,
    /// The last message in `state` has not been persisted yet.
    unsaved: bool,
}

impl Turn<'_> {
    fn conversation_id(&self) -> &str {
        self.state.conversation_id()
    }

    fn apply(&mut self, part: StreamPart) -> Result<(), Stop> {
        self.state.apply_stream_part(&part)?;
        Ok(())
    }

    async fn open_message(&mut self, message: Message) -> Result<(), Stop> {
        let part = self.emitter.message(message).await?;
        self.apply(part)?;
        self.unsaved = true;
        Ok(())
    }

    async fn add_part(&mut self, part: MessagePart) -> Result<(), Stop> {
        let part = self.emitter.part(part).await?;
        self.apply(part)
    }

    fn last_part(&self) -> Option<&MessagePart> {
        self.state.last().and_then(|m| m.parts().last())
    }

    async fn persist_last(&mut self) -> Result<(), TurnFailure> {
        let Some(message) = self.state.last().cloned() else {
            return Ok(());
        };
        let usage = match message.role() {
            Role::Assistant => self.pending_usage.take(),
            _ => None,
        };
        self.assistant
            .store
            .save_message(&message, usage.as_ref())
            .await
            .map_err(|e| {
                tracing::error!(
                    conversation_id = %message.conversation_id,
                    message_id = %message.id,
                    error = %e,
                    "failed to persist message"
                );
                TurnFailure::Store(e.to_string())
            })?;
        self.unsaved = false;
        self.saved.push(message);
        Ok(())
    }

    // ── Entry points ───────────────────────────────────────────────

    async fn answer_user(&mut self) -> Result<LoopEnd, Stop> {
        if self.state.last().map(Message::role) != Some(Role::User) {
            return Err(TurnFailure::InvalidHistory(
                "history must end with a user message".into(),
            )
            .into());
        }
        self.model_loop().await
    }

    async fn resume_after_confirm(&mut self, request: ConfirmRequest, allowed: bool) -> Result<LoopEnd, Stop> {
        match self.state.last().map(|m| &m.body) {
            Some(MessageBody::ToolAuthRequest { tool_call_id, .. })
                if *tool_call_id == request.tool_call_id => {}
            _ => {
                return Err(TurnFailure::InvalidHistory(
                    "history must end with the tool-auth-request being answered".into(),
                )
                .into())
            }
        }

        let response = self.state.create_tool_auth_response_message(allowed);
        self.open_message(response).await?;
        self.persist_last().await?;

        let call = ToolCall::from(request);
        if allowed {
            let func = self.lookup(&call).await?;
            self.invoke_tool(&call, func.as_ref()).await?;
        } else {
            tracing::info!(
                conversation_id = %self.conversation_id(),
                tool = %call.tool_name,
                "tool call denied by user"
            );
            let denied = ToolResultOutput::ErrorText { value: DENIED_TEXT.into() };
            self.write_tool_message(&call, denied, Vec::new()).await?;
        }

        self.model_loop().await
    }

    // ── Model loop ─────────────────────────────────────────────────

    async fn model_loop(&mut self) -> Result<LoopEnd, Stop> {
        for iteration in 0..self.assistant.options.max_tool_loops {
            if self.emitter.is_client_gone() {
                return Err(Stop::ClientGone);
            }
            tracing::debug!(iteration, "model loop iteration");

            let request = self.build_request(iteration == 0);
            let shell = self.state.create_empty_assistant_message();
            self.open_message(shell).await?;

            let calls = self.stream_assistant(&request).await?;
            for call in &calls {
                self.add_part(MessagePart::ToolCall(call.clone())).await?;
            }
            if calls.is_empty() {
                self.persist_last().await?;
                return Ok(LoopEnd::Done);
            }

            let mut resolved = Vec::with_capacity(calls.len());
            for call in calls {
                let func = self.lookup(&call).await?;
                resolved.push((call, func));
            }

            let gate = resolved.iter().position(|(_, f)| f.require_confirm());
            if let Some(i) = gate {
                let request = ConfirmRequest::from(&resolved[i].0);
                let part = self.emitter.confirm_request(request).await?;
                self.apply(part)?;
            }
            self.persist_last().await?;

            let auto = gate.unwrap_or(resolved.len());
            for (call, func) in &resolved[..auto] {
                self.invoke_tool(call, func.as_ref()).await?;
            }

            if let Some(i) = gate {
                self.request_confirmation(&resolved[i].0).await?;
                return Ok(LoopEnd::AwaitingConfirmation);
            }
        }

        let failure = TurnFailure::IterationLimit;
        let _ = self.emitter.raw_error(failure.to_string()).await;
        Err(failure.into())
    }

    fn build_request(&self, first: bool) -> ChatRequest {
        let a = self.assistant;
        let history: Vec<Message> = self
            .state
            .messages()
            .iter()
            .filter(|m| !m.is_tool_auth())
            .cloned()
            .collect();
        let budget = a.params.token_limit.unwrap_or(a.options.default_token_limit);
        let trimmed = limit_messages(a.tokenizer.as_ref(), &a.params.system_prompt, &history, budget);

        let mut kept = trimmed.messages;
        if kept.is_empty() {
            if let Some(newest) = history.last() {
                tracing::warn!(
                    conversation_id = %self.conversation_id(),
                    budget,
                    "newest message alone exceeds the token budget, sending it anyway"
                );
                kept = vec![newest.clone()];
            }
        }

        if first {
            TraceEvent::TurnStarted {
                conversation_id: self.conversation_id().to_owned(),
                assistant_id: a.params.assistant_id.clone(),
                history_len: history.len(),
                trimmed_len: kept.len(),
                prompt_tokens: trimmed.token_count,
            }
            .emit();
        }

        let mut messages = Vec::with_capacity(kept.len() + 1);
        if !a.params.system_prompt.is_empty() {
            messages.push(PromptMessage::system(a.params.system_prompt.as_str()));
        }
        messages.extend(to_prompt_messages(&kept));

        ChatRequest {
            messages,
            tools: a.tools.definitions(),
            temperature: a.params.temperature,
            max_tokens: None,
            model: a.options.model.clone(),
        }
    }

    /// Stream one model answer into the open assistant message and return
    /// the tool calls it requested.
    async fn stream_assistant(&mut self, request: &ChatRequest) -> Result<Vec<ToolCall>, Stop> {
        let provider = Arc::clone(&self.assistant.provider);
        let started = Instant::now();
        let span = tracing::info_span!(
            "llm.call",
            "otel.kind" = "CLIENT",
            provider = provider.provider_id(),
            model = request.model.as_deref().unwrap_or("default"),
        );

        let mut stream = match provider.chat_stream(request).instrument(span).await {
            Ok(s) => s,
            Err(e) => return Err(self.provider_failed(e.to_string()).await),
        };

        // call_id -> (name, raw args) for calls not finished by the provider.
        let mut pending: Vec<(String, String, String)> = Vec::new();
        let mut calls: Vec<ToolCall> = Vec::new();
        let mut usage: Option<Usage> = None;

        while let Some(event) = stream.next().await {
            let event = match event {
                Ok(ev) => ev,
                Err(e) => return Err(self.provider_failed(e.to_string()).await),
            };
            match event {
                StreamEvent::Token { text } => self.text_delta(text).await?,
                StreamEvent::Thinking { text } => self.reasoning_delta(text).await?,
                StreamEvent::Source { url } => {
                    let part = self.emitter.citations(vec![Citation::Url(url)]).await?;
                    self.apply(part)?;
                }
                StreamEvent::ToolCallStarted { call_id, tool_name } => {
                    pending.push((call_id, tool_name, String::new()));
                }
                StreamEvent::ToolCallDelta { call_id, delta } => {
                    if let Some(entry) = pending.iter_mut().find(|(id, _, _)| *id == call_id) {
                        entry.2.push_str(&delta);
                    }
                }
                StreamEvent::ToolCallFinished { call_id, tool_name, arguments } => {
                    pending.retain(|(id, _, _)| *id != call_id);
                    calls.push(ToolCall {
                        tool_call_id: call_id,
                        tool_name,
                        args: arguments,
                    });
                }
                StreamEvent::Done { usage: u, .. } => {
                    if u.is_some() {
                        usage = u;
                    }
                }
                StreamEvent::Error { message } => {
                    return Err(self.provider_failed(message).await);
                }
            }
        }

        // Some providers only send start + delta.
        for (call_id, tool_name, raw) in pending {
            let args = parse_arguments(&call_id, &tool_name, &raw);
            calls.push(ToolCall { tool_call_id: call_id, tool_name, args });
        }

        if let Some(u) = usage {
            self.usage.add(&u);
            self.pending_usage = Some(u);
        }
        TraceEvent::LlmRequest {
            provider: provider.provider_id().to_owned(),
            model: request.model.clone().unwrap_or_else(|| "default".into()),
            streaming: true,
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: usage.map(|u| u.prompt_tokens),
            completion_tokens: usage.map(|u| u.completion_tokens),
        }
        .emit();

        Ok(calls)
    }

    async fn text_delta(&mut self, text: String) -> Result<(), Stop> {
        if !matches!(self.last_part(), Some(MessagePart::Text { .. })) {
            self.add_part(MessagePart::text("")).await?;
        }
        let part = self.emitter.text(text).await?;
        self.apply(part)
    }

    async fn reasoning_delta(&mut self, text: String) -> Result<(), Stop> {
        if !matches!(self.last_part(), Some(MessagePart::Reasoning { .. })) {
            self.add_part(MessagePart::reasoning("")).await?;
        }
        let part = self.emitter.reasoning(text).await?;
        self.apply(part)
    }

    async fn provider_failed(&mut self, message: String) -> Stop {
        tracing::error!(
            conversation_id = %self.conversation_id(),
            provider = %self.assistant.provider.provider_id(),
            error = %message,
            "model stream failed"
        );
        match self.add_part(MessagePart::error(PROVIDER_ERROR_TEXT)).await {
            Err(Stop::Failed(f)) => Stop::Failed(f),
            _ => Stop::Failed(TurnFailure::Provider(message)),
        }
    }

    // ── Tools ──────────────────────────────────────────────────────

    async fn lookup(&mut self, call: &ToolCall) -> Result<Arc<dyn ToolFunction>, Stop> {
        match self.assistant.tools.lookup(&call.tool_name) {
            Some(func) => Ok(func),
            None => {
                let failure = TurnFailure::ToolNotFound(call.tool_name.clone());
                let _ = self.emitter.raw_error(failure.to_string()).await;
                Err(failure.into())
            }
        }
    }

    async fn invoke_tool(&mut self, call: &ToolCall, func: &dyn ToolFunction) -> Result<(), Stop> {
        if self.emitter.is_client_gone() {
            return Err(Stop::ClientGone);
        }

        let ui = ToolUiLink::new();
        let started = Instant::now();
        let span = tracing::info_span!("tool_invoke", tool = %call.tool_name);
        let result = func
            .invoke(ToolInvocation {
                messages: self.state.messages(),
                assistant_id: &self.assistant.params.assistant_id,
                tool_call_id: &call.tool_call_id,
                args: &call.args,
                ui: &ui,
            })
            .instrument(span)
            .await;

        TraceEvent::ToolInvoked {
            conversation_id: self.conversation_id().to_owned(),
            tool_name: call.tool_name.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            ok: result.is_ok(),
        }
        .emit();

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    conversation_id = %self.conversation_id(),
                    tool = %call.tool_name,
                    error = %e,
                    "tool invocation failed"
                );
                let _ = self.emitter.raw_error(e.to_string()).await;
                return Err(TurnFailure::Tool {
                    tool: call.tool_name.clone(),
                    message: e.to_string(),
                }
                .into());
            }
        };

        let mut debug = Vec::new();
        let mut files = Vec::new();
        for event in ui.drain() {
            match event {
                ToolUiEvent::Debug { display_message, data } => {
                    debug.push(MessagePart::Debug { display_message, data });
                }
                ToolUiEvent::Attachment(file) => files.push(file),
            }
        }

        let output = if files.is_empty() {
            ToolResultOutput::Text { value: text }
        } else {
            let mut items = vec![ContentItem::Text { text }];
            items.extend(files.into_iter().map(ContentItem::File));
            ToolResultOutput::Content { value: items }
        };
        self.write_tool_message(call, output, debug).await
    }

    async fn write_tool_message(
        &mut self,
        call: &ToolCall,
        output: ToolResultOutput,
        debug: Vec<MessagePart>,
    ) -> Result<(), Stop> {
        let shell = self.state.create_tool_message();
        self.open_message(shell).await?;
        self.add_part(MessagePart::ToolResult(ToolCallResult {
            tool_call_id: call.tool_call_id.clone(),
            tool_name: call.tool_name.clone(),
            result: output,
        }))
        .await?;
        for part in debug {
            self.add_part(part).await?;
        }
        self.persist_last().await?;
        Ok(())
    }

    async fn request_confirmation(&mut self, call: &ToolCall) -> Result<(), Stop> {
        let request = self.state.create_tool_auth_request_message(call);
        self.open_message(request).await?;
        self.persist_last().await?;
        TraceEvent::ConfirmationRequested {
            conversation_id: self.conversation_id().to_owned(),
            tool_name: call.tool_name.clone(),
            tool_call_id: call.tool_call_id.clone(),
        }
        .emit();
        Ok(())
    }

    // ── Completion ─────────────────────────────────────────────────

    async fn finish(mut self, result: Result<LoopEnd, Stop>, first_exchange: bool) -> TurnCompletion {
        let mut outcome = match result {
            Ok(LoopEnd::Done) => TurnOutcome::Done,
            Ok(LoopEnd::AwaitingConfirmation) => TurnOutcome::AwaitingConfirmation,
            Err(Stop::ClientGone) => TurnOutcome::ClientGone,
            Err(Stop::Failed(failure)) => {
                match &failure {
                    TurnFailure::Protocol(e) => tracing::error!(
                        conversation_id = %self.conversation_id(),
                        error = %e,
                        "stream protocol violation"
                    ),
                    other => tracing::warn!(
                        conversation_id = %self.conversation_id(),
                        error = %other,
                        "turn failed"
                    ),
                }
                TurnOutcome::Failed(failure)
            }
        };

        // Partial messages are kept whatever ended the turn.
        if self.unsaved {
            if let Err(failure) = self.persist_last().await {
                if !matches!(outcome, TurnOutcome::Failed(_)) {
                    outcome = TurnOutcome::Failed(failure);
                }
            }
        }

        // A first exchange parked at a confirmation is titled too; the
        // resumed turn is never a first exchange.
        let titled = matches!(outcome, TurnOutcome::Done | TurnOutcome::AwaitingConfirmation);
        let title = if titled && first_exchange {
            self.summarize().await
        } else {
            None
        };

        let last_sent_at = self.saved.last().map(|m| m.sent_at);
        TurnCompletion {
            outcome,
            saved: self.saved,
            title,
            usage: self.usage,
            last_sent_at,
        }
    }

    async fn summarize(&mut self) -> Option<String> {
        let a = self.assistant;
        if !a.options.auto_summary.enabled {
            return None;
        }
        let summarizer = a.summarizer.as_ref()?;
        let result = summary::summarize(
            summarizer.provider.as_ref(),
            summarizer.model.clone(),
            self.state.conversation_id(),
            self.state.messages(),
            a.options.auto_summary.max_chars,
        )
        .await;

        match result {
            Ok(title) => {
                let _ = self.emitter.summary(title.clone()).await;
                Some(title)
            }
            Err(e) => {
                tracing::warn!(
                    conversation_id = %self.conversation_id(),
                    error = %e,
                    "summary generation failed"
                );
                None
            }
        }
    }
}

/// Parse streamed tool arguments; empty or invalid JSON becomes `{}`.
fn parse_arguments(call_id: &str, tool_name: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(
            call_id = %call_id,
            tool = %tool_name,
            error = %e,
            "tool call arguments are not valid JSON, defaulting to empty object"
        );
        Value::Object(Default::default())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_default_to_empty_object() {
        assert_eq!(parse_arguments("c", "t", ""), serde_json::json!({}));
        assert_eq!(parse_arguments("c", "t", "{oops"), serde_json::json!({}));
        assert_eq!(parse_arguments("c", "t", r#"{"a":1}"#), serde_json::json!({"a": 1}));
    }

    #[test]
    fn failure_messages_match_client_wording() {
        assert_eq!(TurnFailure::ToolNotFound("x".into()).to_string(), "No such function: x");
        assert_eq!(TurnFailure::IterationLimit.to_string(), "Iteration count exceeded");
        assert!(TurnFailure::Provider("boom".into())
            .to_string()
            .starts_with("Failed reading response from LLM"));
    }

    #[test]
    fn options_follow_chat_config() {
        let opts = ChatOptions::default();
        assert_eq!(opts.max_tool_loops, 10);
        assert_eq!(opts.event_buffer, 64);
        assert!(opts.model.is_none());
    }
}
