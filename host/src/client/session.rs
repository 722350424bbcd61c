//! Wraps one connected MCP session. Transport (stdio subprocess vs. SSE)
//! only matters at connect time — `rmcp::ServiceExt::serve` returns the
//! same session type regardless, so everything past `connect_*` is
//! transport-agnostic, matching the session contract this runtime requires
//! (§6.5).

use rmcp::model::{
    CallToolRequestParam, CallToolResult, GetPromptRequestParam, GetPromptResult,
    ReadResourceRequestParam, ReadResourceResult, Tool,
};
use rmcp::service::RunningService;
use rmcp::transport::sse_client::SseClientTransport;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::process::Command;

type Session = RunningService<RoleClient, ()>;

pub struct ClientSession {
    pub client_id: String,
    inner: Session,
}

impl ClientSession {
    pub async fn connect_stdio(
        client_id: &str,
        server_path: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut cmd = Command::new(server_path);
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let transport = TokioChildProcess::new(cmd)?;
        let inner = tokio::time::timeout(timeout, ().serve(transport))
            .await
            .map_err(|_| anyhow::anyhow!("client `{client_id}` connect timed out"))??;

        Ok(Self {
            client_id: client_id.to_string(),
            inner,
        })
    }

    pub async fn connect_sse(client_id: &str, sse_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let transport = SseClientTransport::start(sse_url.to_string()).await?;
        let inner = tokio::time::timeout(timeout, ().serve(transport))
            .await
            .map_err(|_| anyhow::anyhow!("client `{client_id}` connect timed out"))??;

        Ok(Self {
            client_id: client_id.to_string(),
            inner,
        })
    }

    pub async fn list_tools(&self) -> anyhow::Result<Vec<Tool>> {
        Ok(self.inner.list_tools(Default::default()).await?.tools)
    }

    pub async fn list_prompts(&self) -> anyhow::Result<Vec<rmcp::model::Prompt>> {
        Ok(self.inner.list_prompts(Default::default()).await?.prompts)
    }

    pub async fn list_resources(&self) -> anyhow::Result<Vec<rmcp::model::Resource>> {
        Ok(self.inner.list_resources(Default::default()).await?.resources)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> anyhow::Result<CallToolResult> {
        let args = arguments.and_then(|v| v.as_object().cloned());
        Ok(self
            .inner
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: args,
                task: None,
            })
            .await?)
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> anyhow::Result<GetPromptResult> {
        let args = arguments.and_then(|v| v.as_object().cloned());
        Ok(self
            .inner
            .get_prompt(GetPromptRequestParam {
                name: name.to_string(),
                arguments: args,
            })
            .await?)
    }

    pub async fn read_resource(&self, uri: &str) -> anyhow::Result<ReadResourceResult> {
        Ok(self
            .inner
            .read_resource(ReadResourceRequestParam { uri: uri.to_string() })
            .await?)
    }

    /// Consumes the session, closing the underlying transport.
    pub async fn close(self) -> anyhow::Result<()> {
        self.inner.cancel().await?;
        Ok(())
    }
}

/// Flattens an MCP tool-result's content blocks into a plain string, the
/// shape the agent loop feeds back to the LLM as a tool message.
pub fn flatten_content(result: &CallToolResult) -> String {
    let mut output = String::new();
    for content in &result.content {
        if !output.is_empty() {
            output.push('\n');
        }
        match &content.raw {
            rmcp::model::RawContent::Text(text) => output.push_str(&text.text),
            other => output.push_str(&format!("{other:?}")),
        }
    }
    output
}
