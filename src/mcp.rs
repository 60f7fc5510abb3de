use std::sync::Arc;

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    bot::{Bot, Input},
    error,
    render,
    reply::Reply,
    session::UserId,
};

#[derive(Clone)]
pub struct DossierMcpServer {
    bot: Arc<Bot>,
    tool_router: ToolRouter<Self>,
}

impl DossierMcpServer {
    pub fn new(bot: Arc<Bot>) -> Self {
        Self {
            bot,
            tool_router: Self::tool_router(),
        }
    }

    async fn dispatch(
        &self,
        user: UserId,
        input: Input,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let replies = self.bot.handle(user, input).await;

        let summary = if replies.is_empty() {
            "(no reply)".to_string()
        } else {
            render::transcript(&replies)
        };
        let structured = serde_json::to_value(ConversationResponse {
            user_id: user,
            reply_count: replies.len(),
            replies,
        })
        .map_err(|e| mcp_error("failed to serialize replies", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }
}

#[tool_router(router = tool_router)]
impl DossierMcpServer {
    /// Send a chat message (search query, AI question or /command).
    #[tool(
        name = "dossier_message",
        description = "Send a chat message as a user. Plain text searches the catalog (or asks the AI in AI mode); text starting with / is a command such as /start, /cancel or /birthdays."
    )]
    pub async fn dossier_message(
        &self,
        params: Parameters<MessageParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        self.dispatch(params.user_id, Input::from_message(&params.text))
            .await
    }

    /// Press a button previously returned in a reply.
    #[tool(
        name = "dossier_press",
        description = "Press a button as a user, by the callback data listed with the button in an earlier reply (e.g. card:next:1, select_folder:0, ask_ai|3)."
    )]
    pub async fn dossier_press(
        &self,
        params: Parameters<PressParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        self.dispatch(params.user_id, Input::Callback(params.data))
            .await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for DossierMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("dossier", env!("CARGO_PKG_VERSION")).with_title("dossier MCP"),
            )
            .with_instructions(
                "Use dossier_message to search person folders by name and dossier_press to follow the buttons in its replies.",
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageParams {
    /// Chat user the message comes from.
    pub user_id: UserId,
    /// Message text.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PressParams {
    /// Chat user pressing the button.
    pub user_id: UserId,
    /// Callback data of the button.
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationResponse {
    user_id: UserId,
    reply_count: usize,
    replies: Vec<Reply>,
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

pub fn run_mcp(bot: Bot) -> error::Result<()> {
    let server = DossierMcpServer::new(Arc::new(bot));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            error::Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            error::Error::Config(format!(
                "MCP server initialization failed: {e}"
            ))
        })?;
        running.waiting().await.map_err(|e| {
            error::Error::Config(format!("MCP server error: {e}"))
        })?;
        Ok(())
    })
}
