//! Chat session: the submit flow.
//!
//! A submit records the user prompt and an empty assistant message, then
//! streams the reply into that message. The first prompt of a conversation
//! also asks the model for a short title, concurrently with the reply.
//!
//! ```rust,ignore
//! use ollachat::prelude::*;
//!
//! let client = OllamaClient::local()?;
//! let store = ConversationStore::open("conversations.json")?;
//! let mut session = ChatSession::from_client(client, store);
//!
//! let outcome = session
//!     .submit_with("Why is the sky blue?", "deepseek-r1", |event| match event {
//!         ThinkEvent::Reasoning(text) => println!("[thinking] {text}"),
//!         ThinkEvent::Narrative(text) => print!("{text}"),
//!     })
//!     .await?;
//! ```

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::{ChatTransport, OllamaClient};
use crate::conversation::ConversationStore;
use crate::error::{ChatError, Result};
use crate::reasoning::extractor::DEFAULT_MAX_BUFFER_BYTES;
use crate::reasoning::{ThinkEvent, ThinkExtractor, strip_reasoning};
use crate::streaming::{Accepted, RecordStream, StreamAggregator};
use crate::types::{ChatRequest, CompletionRequest, Message, StreamRecord};

/// System prompt used to summarize a first prompt into a conversation title.
pub const TITLE_SYSTEM_PROMPT: &str = "You are a tool that receives an input and responds only with a 2-5 word summary of its topic, with no other prose. Choose words from the input itself (not from the expected answer) so the summary works as a precise title. Return the summary for the following input.";

/// Result of one submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub conversation_id: String,
    /// Raw reply text as appended to the assistant message
    pub reply: String,
    /// Reply text outside reasoning blocks
    pub narrative: String,
    /// Completed reasoning blocks, in order
    pub reasoning: Vec<String>,
    /// Records appended (records drained after `done` excluded)
    pub records: usize,
    /// Whether the server sent its final `done` record
    pub completed: bool,
    /// Title applied to a fresh conversation, if one was generated
    pub title: Option<String>,
}

/// Drives prompts through a transport into a conversation store.
pub struct ChatSession<T> {
    transport: T,
    store: ConversationStore,
    max_reasoning_buffer: usize,
    generate_titles: bool,
    cancel: Option<CancellationToken>,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T, store: ConversationStore) -> Self {
        Self {
            transport,
            store,
            max_reasoning_buffer: DEFAULT_MAX_BUFFER_BYTES,
            generate_titles: true,
            cancel: None,
        }
    }

    /// Set the cap on buffered unterminated reasoning text
    pub fn with_max_reasoning_buffer(mut self, bytes: usize) -> Self {
        self.max_reasoning_buffer = bytes;
        self
    }

    /// Enable or disable title generation for fresh conversations
    pub fn with_title_generation(mut self, enabled: bool) -> Self {
        self.generate_titles = enabled;
        self
    }

    /// Abandon a submit in flight once `token` is cancelled.
    ///
    /// The reply and title requests are dropped and the submit returns
    /// [`ChatError::Cancelled`]; text received so far stays in the conversation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConversationStore {
        &mut self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_store(self) -> ConversationStore {
        self.store
    }

    /// Submit a chat prompt to `model`.
    pub async fn submit(&mut self, input: &str, model: &str) -> Result<SubmitOutcome> {
        self.submit_with(input, model, |_| {}).await
    }

    /// Submit a chat prompt, reporting reasoning and narrative text as it streams.
    pub async fn submit_with<F>(
        &mut self,
        input: &str,
        model: &str,
        mut on_event: F,
    ) -> Result<SubmitOutcome>
    where
        F: FnMut(&ThinkEvent) + Send,
    {
        let (conversation_id, fresh) = self.begin(input, model)?;

        self.store.add_message(Message::user(input))?;
        let request = match self.store.current() {
            Some(conversation) => ChatRequest::from_history(model, &conversation.messages),
            None => ChatRequest::from_history(model, &[Message::user(input)]),
        };
        self.store.add_message(Message::assistant_placeholder(model))?;

        let transport = &self.transport;
        let store = &mut self.store;
        let max_buffer = self.max_reasoning_buffer;
        let wants_title = fresh && self.generate_titles;

        let title_fut = async {
            if wants_title {
                generate_title(transport, model, input).await
            } else {
                None
            }
        };
        let reply_fut = async {
            let stream = transport.chat_stream(request).await?;
            drive_reply(stream, store, max_buffer, &mut on_event).await
        };
        let joined = cancellable(self.cancel.as_ref(), async {
            Ok(tokio::join!(title_fut, reply_fut))
        })
        .await;
        let (title, reply) = joined.unwrap_or_else(|e| (None, Err(e)));

        self.finish(conversation_id, title, reply)
    }

    /// Submit a completion prompt; the reply is recorded like a chat reply.
    pub async fn complete_with<F>(
        &mut self,
        mut request: CompletionRequest,
        mut on_event: F,
    ) -> Result<SubmitOutcome>
    where
        F: FnMut(&ThinkEvent) + Send,
    {
        let prompt = request.prompt.clone();
        let model = request.model.clone();
        let (conversation_id, _) = self.begin(&prompt, &model)?;

        self.store.add_message(Message::user(prompt))?;
        self.store.add_message(Message::assistant_placeholder(&model))?;

        request.stream = true;
        let transport = &self.transport;
        let store = &mut self.store;
        let max_buffer = self.max_reasoning_buffer;
        let reply = cancellable(self.cancel.as_ref(), async {
            let stream = transport.completion_stream(request).await?;
            drive_reply(stream, store, max_buffer, &mut on_event).await
        })
        .await;

        self.finish(conversation_id, None, reply)
    }

    /// Validate input and select a conversation; returns its id and whether it was empty.
    fn begin(&mut self, input: &str, model: &str) -> Result<(String, bool)> {
        if input.trim().is_empty() {
            return Err(ChatError::InvalidInput("The prompt can't be empty".to_string()));
        }
        if model.trim().is_empty() {
            return Err(ChatError::InvalidInput("The model can't be empty".to_string()));
        }

        let conversation_id = match self.store.current_id() {
            Some(id) => id.to_string(),
            None => self.store.new_conversation()?,
        };
        let fresh = self.store.current().is_none_or(|c| c.is_empty());
        Ok((conversation_id, fresh))
    }

    fn finish(
        &mut self,
        conversation_id: String,
        title: Option<String>,
        reply: Result<SubmitOutcome>,
    ) -> Result<SubmitOutcome> {
        if let Some(title) = &title {
            self.store.rename(&conversation_id, title.clone())?;
        }
        self.store.save()?;

        let mut outcome = reply?;
        outcome.conversation_id = conversation_id;
        outcome.title = title;
        Ok(outcome)
    }
}

impl ChatSession<OllamaClient> {
    /// Session over `client`, using its configured reasoning buffer cap.
    pub fn from_client(client: OllamaClient, store: ConversationStore) -> Self {
        let max_reasoning_buffer = client.config().max_reasoning_buffer;
        Self::new(client, store).with_max_reasoning_buffer(max_reasoning_buffer)
    }
}

/// Ask the model for a short title; failures are logged and yield `None`.
async fn generate_title<T: ChatTransport + ?Sized>(
    transport: &T,
    model: &str,
    input: &str,
) -> Option<String> {
    let request = CompletionRequest::new(model, input).with_system(TITLE_SYSTEM_PROMPT);
    match transport.completion(request).await {
        Ok(record) => {
            let title = strip_reasoning(&record.response)
                .trim()
                .trim_matches('"')
                .trim()
                .to_string();
            (!title.is_empty()).then_some(title)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Title generation failed");
            None
        }
    }
}

/// Run `work` until it finishes or `cancel` fires, whichever comes first.
///
/// On cancellation `work` is dropped, which closes any open response body.
async fn cancellable<T>(
    cancel: Option<&CancellationToken>,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    let Some(token) = cancel else {
        return work.await;
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::debug!("Submit cancelled");
            Err(ChatError::Cancelled)
        }
        result = work => result,
    }
}

/// Consume one reply stream into the current assistant message.
async fn drive_reply<R, F>(
    mut stream: RecordStream<R>,
    store: &mut ConversationStore,
    max_reasoning_buffer: usize,
    on_event: &mut F,
) -> Result<SubmitOutcome>
where
    R: StreamRecord + 'static,
    F: FnMut(&ThinkEvent),
{
    let mut aggregator = StreamAggregator::new();
    let mut extractor = ThinkExtractor::new().with_max_buffer_bytes(max_reasoning_buffer);
    let mut outcome = SubmitOutcome::default();

    let mut emit = |events: Vec<ThinkEvent>, outcome: &mut SubmitOutcome| {
        for event in events {
            on_event(&event);
            match event {
                ThinkEvent::Narrative(text) => outcome.narrative.push_str(&text),
                ThinkEvent::Reasoning(text) => outcome.reasoning.push(text),
            }
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(record) => {
                if aggregator.accept(&record) == Accepted::Drained {
                    continue;
                }
                store.append_to_last_assistant(record.content());
                emit(extractor.push(record.content()), &mut outcome);
            }
            Err(e) if aggregator.is_done() => {
                tracing::debug!(error = %e, "Transport error after final record ignored");
            }
            Err(e) => return Err(e),
        }
    }

    emit(extractor.finish(), &mut outcome);
    outcome.completed = aggregator.is_done();
    outcome.records = aggregator.records_seen();
    outcome.reply = aggregator.into_transcript();

    if !outcome.completed {
        tracing::warn!(records = outcome.records, "Reply stream ended without a final record");
    }
    Ok(outcome)
}
