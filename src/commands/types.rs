// 命令层数据类型定义

use crate::models::{AppConfigPatch, InstallMethod, ToolInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 请求：`{"id": 1, "op": "scan-tools", ...参数}`
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Request {
    ScanTools,
    CheckVersions {
        tools: Vec<ToolInfo>,
    },
    UpdateTool {
        tool: ToolInfo,
    },
    BatchUpdate {
        tools: Vec<ToolInfo>,
    },
    #[serde(rename_all = "camelCase")]
    InstallTool {
        tool_name: String,
        install_method: InstallMethod,
        package_name: String,
    },
    GetToolDefinitions,
    ClearCache,
    GetConfig,
    SetConfig {
        config: AppConfigPatch,
    },
}

impl Request {
    pub fn op(&self) -> &'static str {
        match self {
            Request::ScanTools => "scan-tools",
            Request::CheckVersions { .. } => "check-versions",
            Request::UpdateTool { .. } => "update-tool",
            Request::BatchUpdate { .. } => "batch-update",
            Request::InstallTool { .. } => "install-tool",
            Request::GetToolDefinitions => "get-tool-definitions",
            Request::ClearCache => "clear-cache",
            Request::GetConfig => "get-config",
            Request::SetConfig { .. } => "set-config",
        }
    }
}

/// 响应：`{"id": 1, "ok": true, "result": ...}` 或 `{"id": 1, "ok": false, "error": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Response {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: impl Into<String>) -> Self {
        Response {
            id,
            ok: false,
            result: None,
            error: Some(error.into()),
        }
    }
}
