//! Event dispatch and job processing.

use std::{future::Future, sync::Arc, time::Duration};

use log::{debug, error, info, warn};

use crate::context::{ContextStore, PendingImageContext};
use crate::error::{RelayError, Result};
use crate::line::{MessageContent, MessageEvent, OutgoingMessage, WebhookEvent};
use crate::queue::{JobHandler, LaneQueue};

use super::messages;
use super::services::{ImageGenerator, ImageHost, Messenger};

/// Work queued on a user's lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Download an image message and keep it as the user's context.
    StoreImage {
        message_id: String,
        external_url: Option<String>,
    },
    /// Generate an image for a text prompt, using the context if one is fresh.
    Generate { prompt: String },
}

/// Owns the context store and the external services; runs queued jobs.
pub struct Relay<G, H, M> {
    contexts: Arc<ContextStore>,
    generator: G,
    host: H,
    messenger: M,
}

impl<G, H, M> Relay<G, H, M>
where
    G: ImageGenerator,
    H: ImageHost,
    M: Messenger,
{
    pub fn new(contexts: Arc<ContextStore>, generator: G, host: H, messenger: M) -> Self {
        Self {
            contexts,
            generator,
            host,
            messenger,
        }
    }

    #[must_use]
    pub fn contexts(&self) -> &Arc<ContextStore> {
        &self.contexts
    }

    async fn store_image(&self, user_id: &str, message_id: &str, external_url: Option<&str>) {
        let fetched = match external_url {
            Some(url) => self.messenger.fetch_external(url).await,
            None => self.messenger.fetch_content(message_id).await,
        };

        match fetched {
            Ok(image) => {
                info!(
                    "Stored reference image from {user_id} ({} bytes)",
                    image.bytes.len()
                );
                self.contexts.put(user_id, image).await;
            }
            Err(e) => {
                error!("Error fetching image {message_id} from {user_id}: {e}");
                self.push_best_effort(user_id, messages::image_fetch_failed(&e))
                    .await;
            }
        }
    }

    async fn generate(&self, user_id: &str, prompt: &str) {
        let context = self.contexts.take_if_fresh(user_id).await;

        match self
            .generate_and_deliver(user_id, prompt, context.as_ref())
            .await
        {
            Ok(()) => info!("Image sent to user {user_id}"),
            Err(e) => {
                error!("Error generating image for {user_id}: {e}");
                if let Some(context) = context {
                    self.contexts.restore(context).await;
                }
                self.push_best_effort(user_id, messages::generation_failed(&e))
                    .await;
            }
        }
    }

    async fn generate_and_deliver(
        &self,
        user_id: &str,
        prompt: &str,
        context: Option<&PendingImageContext>,
    ) -> Result<()> {
        let full_prompt = match context {
            Some(context) => {
                debug!("Describing reference image for {user_id}");
                let description = self.generator.describe(&context.image).await?;
                messages::edit_prompt(&description, prompt)
            }
            None => prompt.to_string(),
        };

        info!("Generating image with prompt: {full_prompt}");
        let image = self.generator.generate(&full_prompt).await?;
        info!("Image generated successfully");

        let url = self.host.upload(&image).await?;
        info!("Image uploaded: {url}");

        self.messenger
            .push(
                user_id,
                vec![
                    OutgoingMessage::text(messages::generated(prompt)),
                    OutgoingMessage::image(url),
                ],
            )
            .await
    }

    async fn push_best_effort(&self, user_id: &str, text: String) {
        if let Err(e) = self
            .messenger
            .push(user_id, vec![OutgoingMessage::text(text)])
            .await
        {
            error!("Error sending error message to {user_id}: {e}");
        }
    }
}

impl<G, H, M> JobHandler for Relay<G, H, M>
where
    G: ImageGenerator,
    H: ImageHost,
    M: Messenger,
{
    type Job = Job;

    async fn handle(&self, user_id: &str, job: Job) {
        match job {
            Job::StoreImage {
                message_id,
                external_url,
            } => {
                self.store_image(user_id, &message_id, external_url.as_deref())
                    .await;
            }
            Job::Generate { prompt } => self.generate(user_id, &prompt).await,
        }
    }
}

/// Receives parsed webhook events.
pub trait EventDispatch: Send + Sync + 'static {
    fn dispatch(&self, event: WebhookEvent) -> impl Future<Output = ()> + Send;
}

/// Acknowledges events on the webhook path and queues the slow work.
pub struct Dispatcher<G, H, M>
where
    G: ImageGenerator,
    H: ImageHost,
    M: Messenger,
{
    relay: Arc<Relay<G, H, M>>,
    queue: LaneQueue<Relay<G, H, M>>,
    context_ttl: Duration,
}

impl<G, H, M> Dispatcher<G, H, M>
where
    G: ImageGenerator,
    H: ImageHost,
    M: Messenger,
{
    pub fn new(relay: Arc<Relay<G, H, M>>, max_concurrent: usize, context_ttl: Duration) -> Self {
        let queue = LaneQueue::new(Arc::clone(&relay), max_concurrent);
        Self {
            relay,
            queue,
            context_ttl,
        }
    }

    #[must_use]
    pub fn relay(&self) -> &Arc<Relay<G, H, M>> {
        &self.relay
    }

    async fn dispatch_message(&self, event: MessageEvent) {
        let Some(user_id) = event.source.as_ref().and_then(|s| s.user_id.clone()) else {
            debug!("Ignoring message without a user source");
            return;
        };

        let (job, ack) = match event.message {
            MessageContent::Text { text, .. } => {
                let prompt = text.trim();
                if prompt.is_empty() {
                    debug!("Ignoring empty text from {user_id}");
                    return;
                }
                info!("Received message from {user_id}: {prompt}");
                (
                    Job::Generate {
                        prompt: prompt.to_string(),
                    },
                    messages::GENERATING.to_string(),
                )
            }
            MessageContent::Image {
                id,
                content_provider,
            } => {
                info!("Received image {id} from {user_id}");
                let external_url = content_provider
                    .as_ref()
                    .and_then(|provider| provider.external_url())
                    .map(str::to_string);
                (
                    Job::StoreImage {
                        message_id: id,
                        external_url,
                    },
                    messages::image_received(self.context_ttl),
                )
            }
            MessageContent::Unsupported => {
                debug!("Ignoring unsupported message type from {user_id}");
                return;
            }
        };

        let reply_token = event.reply_token.as_deref();
        if self.queue.is_full(&user_id).await {
            warn!("Job lane for {user_id} is full, refusing message");
            let busy = RelayError::QueueFull(user_id.clone()).user_message();
            self.acknowledge(&user_id, reply_token, busy).await;
            return;
        }

        // Acknowledge before queuing: no push for this message may precede the ack.
        self.acknowledge(&user_id, reply_token, ack).await;

        if let Err(e) = self.queue.submit(&user_id, job).await {
            warn!("Could not queue job for {user_id}: {e}");
            self.relay.push_best_effort(&user_id, e.user_message()).await;
        }
    }

    async fn acknowledge(&self, user_id: &str, reply_token: Option<&str>, text: String) {
        let Some(reply_token) = reply_token else {
            return;
        };
        if let Err(e) = self
            .relay
            .messenger
            .reply(reply_token, vec![OutgoingMessage::text(text)])
            .await
        {
            warn!("Failed to acknowledge message from {user_id}: {e}");
        }
    }
}

impl<G, H, M> EventDispatch for Dispatcher<G, H, M>
where
    G: ImageGenerator,
    H: ImageHost,
    M: Messenger,
{
    async fn dispatch(&self, event: WebhookEvent) {
        match event {
            WebhookEvent::Message(message) => self.dispatch_message(message).await,
            WebhookEvent::Unsupported => debug!("Ignoring non-message event"),
        }
    }
}
