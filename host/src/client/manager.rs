//! Establishes one MCP client connection and supervises it for its whole
//! lifetime (§4.5). Grounded on the teacher's channel-actor pattern
//! (`agent/src/mcp/manager.rs`): the connecting task spawns an actor that
//! owns the session exclusively, and every caller talks to it over a
//! request/reply channel rather than touching the session directly. That
//! keeps "the task that opened the connection is the only one that closes
//! it" true by construction.

use super::session::ClientSession;
use crate::config::{ClientConfig, Transport};
use crate::managers::security::SecurityManager;
use rmcp::model::{CallToolResult, GetPromptResult, Prompt, ReadResourceResult, Resource, Tool};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type Reply<T> = oneshot::Sender<anyhow::Result<T>>;

enum ClientRequest {
    ListTools(Reply<Vec<Tool>>),
    ListPrompts(Reply<Vec<Prompt>>),
    ListResources(Reply<Vec<Resource>>),
    CallTool {
        name: String,
        arguments: Option<Value>,
        reply: Reply<CallToolResult>,
    },
    GetPrompt {
        name: String,
        arguments: Option<Value>,
        reply: Reply<GetPromptResult>,
    },
    ReadResource {
        uri: String,
        reply: Reply<ReadResourceResult>,
    },
}

/// Cloneable front for one connected client; the live session lives inside
/// the actor task this handle talks to.
#[derive(Clone)]
pub struct ClientHandle {
    pub client_id: String,
    sender: mpsc::Sender<ClientRequest>,
    teardown: CancellationToken,
}

impl ClientHandle {
    pub async fn list_tools(&self) -> anyhow::Result<Vec<Tool>> {
        self.call(ClientRequest::ListTools).await
    }

    pub async fn list_prompts(&self) -> anyhow::Result<Vec<Prompt>> {
        self.call(ClientRequest::ListPrompts).await
    }

    pub async fn list_resources(&self) -> anyhow::Result<Vec<Resource>> {
        self.call(ClientRequest::ListResources).await
    }

    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> anyhow::Result<CallToolResult> {
        let name = name.to_string();
        self.call(|reply| ClientRequest::CallTool { name, arguments, reply }).await
    }

    pub async fn get_prompt(&self, name: &str, arguments: Option<Value>) -> anyhow::Result<GetPromptResult> {
        let name = name.to_string();
        self.call(|reply| ClientRequest::GetPrompt { name, arguments, reply }).await
    }

    pub async fn read_resource(&self, uri: &str) -> anyhow::Result<ReadResourceResult> {
        let uri = uri.to_string();
        self.call(|reply| ClientRequest::ReadResource { uri, reply }).await
    }

    /// Signals the owning actor to close the session and exit.
    pub fn shutdown(&self) {
        self.teardown.cancel();
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> ClientRequest) -> anyhow::Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| anyhow::anyhow!("client `{}` actor has shut down", self.client_id))?;
        reply_rx
            .await
            .map_err(|_| anyhow::anyhow!("client `{}` dropped the reply channel", self.client_id))?
    }
}

pub struct ClientManager;

impl ClientManager {
    /// Connects `config` and spawns its owning actor onto `tasks`. The
    /// returned handle is usable as soon as this resolves; the caller
    /// (`MCPHost`) is responsible for discovering capabilities and
    /// registering them afterward.
    pub async fn connect(
        config: &ClientConfig,
        security: &SecurityManager,
        tasks: &mut JoinSet<()>,
    ) -> anyhow::Result<ClientHandle> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("client `{}`: {e}", config.client_id))?;

        let timeout = Duration::from_secs(config.timeout_secs);

        let session = match config.transport {
            Transport::Stdio => {
                let server_path = config.server_path.as_deref().unwrap();
                let env = security.resolve_secrets(&config.gcp_secrets).await;
                ClientSession::connect_stdio(&config.client_id, server_path, &config.server_args, &env, timeout).await?
            }
            Transport::Sse => {
                let sse_url = config.sse_url.as_deref().unwrap();
                ClientSession::connect_sse(&config.client_id, sse_url, timeout).await?
            }
        };

        let (sender, receiver) = mpsc::channel(32);
        let teardown = CancellationToken::new();
        let client_id = config.client_id.clone();

        tasks.spawn(Self::run(client_id.clone(), session, receiver, teardown.clone()));

        Ok(ClientHandle { client_id, sender, teardown })
    }

    async fn run(
        client_id: String,
        session: ClientSession,
        mut receiver: mpsc::Receiver<ClientRequest>,
        teardown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = teardown.cancelled() => break,
                req = receiver.recv() => {
                    match req {
                        Some(req) => Self::handle(&session, req).await,
                        None => break,
                    }
                }
            }
        }

        tracing::info!(client_id = %client_id, "closing client connection");
        if let Err(err) = session.close().await {
            tracing::warn!(client_id = %client_id, error = %err, "error while closing client session");
        }
    }

    async fn handle(session: &ClientSession, req: ClientRequest) {
        match req {
            ClientRequest::ListTools(reply) => {
                let _ = reply.send(session.list_tools().await);
            }
            ClientRequest::ListPrompts(reply) => {
                let _ = reply.send(session.list_prompts().await);
            }
            ClientRequest::ListResources(reply) => {
                let _ = reply.send(session.list_resources().await);
            }
            ClientRequest::CallTool { name, arguments, reply } => {
                let _ = reply.send(session.call_tool(&name, arguments).await);
            }
            ClientRequest::GetPrompt { name, arguments, reply } => {
                let _ = reply.send(session.get_prompt(&name, arguments).await);
            }
            ClientRequest::ReadResource { uri, reply } => {
                let _ = reply.send(session.read_resource(&uri).await);
            }
        }
    }
}
