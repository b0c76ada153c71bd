use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

use crate::config::Config;
use crate::error::RemoteCallError;
use crate::model::Message;
use crate::providers;

pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<String, RemoteCallError>> + 'a>>;

pub trait ChatBackend {
    fn chat<'a>(&'a self, system: &'a Message, history: &'a [Message]) -> ChatFuture<'a>;
}

pub struct HttpChatBackend {
    client: Client,
    cfg: Config,
}

impl HttpChatBackend {
    pub fn new(client: Client, cfg: Config) -> Self {
        Self { client, cfg }
    }
}

impl ChatBackend for HttpChatBackend {
    fn chat<'a>(&'a self, system: &'a Message, history: &'a [Message]) -> ChatFuture<'a> {
        Box::pin(providers::openai::chat(
            &self.client,
            &self.cfg,
            system,
            history,
        ))
    }
}

/// The system prompt is not part of the history; it is rebuilt on every
/// call. A user message is recorded before its request goes out and stays
/// recorded when the request fails, so after a failure the history ends with
/// a user message that has no assistant reply.
pub struct ChatSession<B = HttpChatBackend> {
    backend: B,
    history: Vec<Message>,
}

impl<B> ChatSession<B>
where
    B: ChatBackend,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn ask(
        &mut self,
        system_content: &str,
        user_content: &str,
    ) -> Result<String, RemoteCallError> {
        self.history.push(Message::user(user_content));

        let system = Message::system(system_content);
        debug!(
            history_len = self.history.len(),
            user_content_len = user_content.len(),
            "asking chat backend"
        );
        let reply = self.backend.chat(&system, &self.history).await?;

        self.history.push(Message::assistant(reply.clone()));
        Ok(reply)
    }
}
