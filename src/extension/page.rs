//! Page context: hosts the current page and answers extraction requests.

use super::extractor::{CodeAndExamples, PageExtractor, PageSnapshot};
use super::protocol::{Payload, Request, Response};
use crate::error::RelayError;
use tokio::sync::{broadcast, mpsc, oneshot};

const MUTATION_CHANNEL_CAPACITY: usize = 32;

/// Notification that the hosted page changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMutation {
    pub url: String,
    pub sequence: u64,
}

enum PageCommand {
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    Load(PageSnapshot),
}

pub struct PageContext {
    page: Option<PageSnapshot>,
    extractor: PageExtractor,
    commands: mpsc::Receiver<PageCommand>,
    mutations: broadcast::Sender<PageMutation>,
    sequence: u64,
}

impl PageContext {
    pub fn new(capacity: usize) -> (Self, PageHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        let (mutations, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        let handle = PageHandle {
            commands: tx,
            mutations: mutations.clone(),
        };
        let context = Self {
            page: None,
            extractor: PageExtractor::default(),
            commands: rx,
            mutations,
            sequence: 0,
        };
        (context, handle)
    }

    pub fn spawn(capacity: usize) -> PageHandle {
        let (context, handle) = Self::new(capacity);
        tokio::spawn(context.run());
        handle
    }

    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                PageCommand::Request { request, reply } => {
                    let response = self.answer(&request);
                    if reply.send(response).is_err() {
                        tracing::debug!(action = request.action(), "requester gone; reply dropped");
                    }
                }
                PageCommand::Load(page) => {
                    self.sequence += 1;
                    let mutation = PageMutation {
                        url: page.url.clone(),
                        sequence: self.sequence,
                    };
                    self.page = Some(page);
                    // No subscribers is fine.
                    let _ = self.mutations.send(mutation);
                }
            }
        }
        tracing::debug!("page context stopped");
    }

    fn answer(&self, request: &Request) -> Response {
        let Some(page) = &self.page else {
            return Response::error("no problem page loaded");
        };
        match request {
            Request::GetProblemData { .. } => {
                Response::ok(Payload::Problem(self.extractor.extract(page)))
            }
            Request::GetCodeAndExamples => Response::ok(Payload::Code(CodeAndExamples::from(
                self.extractor.extract(page),
            ))),
            Request::CheckAuth => Response::error("checkAuth is answered by the relay"),
        }
    }
}

/// Cloneable sender side of the page context.
#[derive(Clone)]
pub struct PageHandle {
    commands: mpsc::Sender<PageCommand>,
    mutations: broadcast::Sender<PageMutation>,
}

impl PageHandle {
    pub async fn request(&self, request: Request) -> Result<Response, RelayError> {
        let action = request.action();
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(PageCommand::Request { request, reply })
            .await
            .map_err(|_| RelayError::Disconnected { context: "page" })?;
        rx.await.map_err(|_| RelayError::NoReply {
            context: "page",
            action,
        })
    }

    /// Replace the hosted page; subscribers see one mutation per load.
    pub async fn load(&self, page: PageSnapshot) -> Result<(), RelayError> {
        self.commands
            .send(PageCommand::Load(page))
            .await
            .map_err(|_| RelayError::Disconnected { context: "page" })
    }

    pub fn subscribe_mutations(&self) -> broadcast::Receiver<PageMutation> {
        self.mutations.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn queued_commands(&self) -> usize {
        self.commands.max_capacity() - self.commands.capacity()
    }
}
