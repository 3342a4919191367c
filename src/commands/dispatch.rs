// 请求分发与 JSON lines 传输
//
// 每行一个请求，按到达顺序逐个处理，每个请求恰好产生一行响应

use super::types::{Request, Response};
use super::{config_commands, tool_commands, AppState};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// 执行单个请求
pub async fn handle(state: &AppState, request: Request) -> Result<Value, String> {
    match request {
        Request::ScanTools => to_value(tool_commands::scan_tools(state).await?),
        Request::CheckVersions { tools } => {
            to_value(tool_commands::check_versions(state, tools).await?)
        }
        Request::UpdateTool { tool } => to_value(tool_commands::update_tool(state, tool).await?),
        Request::BatchUpdate { tools } => {
            to_value(tool_commands::batch_update(state, tools).await?)
        }
        Request::InstallTool {
            tool_name,
            install_method,
            package_name,
        } => to_value(
            tool_commands::install_tool(state, tool_name, install_method, package_name).await?,
        ),
        Request::GetToolDefinitions => to_value(tool_commands::get_tool_definitions(state)?),
        Request::ClearCache => {
            tool_commands::clear_cache(state)?;
            Ok(Value::Null)
        }
        Request::GetConfig => to_value(config_commands::get_config(state)?),
        Request::SetConfig { config } => to_value(config_commands::set_config(state, config)?),
    }
}

/// 解析并执行一行请求
pub async fn handle_line(state: &AppState, line: &str) -> Response {
    let raw: Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => return Response::failure(Value::Null, format!("无法解析请求: {e}")),
    };
    let id = raw.get("id").cloned().unwrap_or(Value::Null);

    let request: Request = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => return Response::failure(id, format!("无效的请求: {e}")),
    };

    let op = request.op();
    tracing::debug!(id = %id, op, "处理请求");
    match handle(state, request).await {
        Ok(result) => Response::success(id, result),
        Err(e) => {
            tracing::warn!(id = %id, op, error = %e, "请求处理失败");
            Response::failure(id, e)
        }
    }
}

/// 从 reader 读取请求直到 EOF，响应写入 writer
pub async fn serve<R, W>(state: &AppState, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(state, &line).await;
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }
    tracing::info!("输入结束，停止服务");
    Ok(())
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tool::sources::ProviderEndpoints;
    use crate::services::tool::{Catalog, ToolDetector, ToolManager, Updater, VersionService};
    use crate::services::ConfigManager;
    use crate::utils::command::testing::{ok, ScriptedRunner};
    use crate::utils::command::CommandRunner;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn state(runner: ScriptedRunner) -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(Catalog::builtin());
        let runner: Arc<dyn CommandRunner> = Arc::new(runner);
        let engine = ToolManager::new(
            catalog.clone(),
            ToolDetector::new(catalog.clone(), runner.clone()),
            VersionService::with_endpoints(
                reqwest::Client::new(),
                ProviderEndpoints::single("http://127.0.0.1:9"),
                None,
            ),
            Updater::with_backup_dir(catalog, runner, dir.path().join("backups")),
        );
        let config = ConfigManager::with_path(dir.path().join("config.json"));
        (AppState::new(engine, config), dir)
    }

    async fn call(state: &AppState, request: Value) -> Response {
        handle_line(state, &request.to_string()).await
    }

    #[tokio::test]
    async fn test_scan_and_definitions() {
        let (state, _dir) = state(ScriptedRunner::new());

        let response = call(&state, json!({"id": 1, "op": "scan-tools"})).await;
        assert!(response.ok);
        let tools = response.result.unwrap();
        assert_eq!(tools.as_array().unwrap().len(), 13);
        assert!(tools
            .as_array()
            .unwrap()
            .iter()
            .all(|t| t["status"] == "not-installed"));

        let response = call(&state, json!({"id": 2, "op": "get-tool-definitions"})).await;
        assert_eq!(response.id, json!(2));
        assert_eq!(response.result.unwrap()[0]["name"], "claude");
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_requests() {
        let (state, _dir) = state(ScriptedRunner::new());

        let response = handle_line(&state, "{ not json").await;
        assert!(!response.ok);
        assert_eq!(response.id, Value::Null);

        let response = call(&state, json!({"id": 3, "op": "format-disk"})).await;
        assert!(!response.ok);
        assert_eq!(response.id, json!(3));
    }

    #[tokio::test]
    async fn test_install_failure_is_typed_result() {
        let (state, _dir) = state(ScriptedRunner::new());
        let response = call(
            &state,
            json!({
                "id": 4,
                "op": "install-tool",
                "toolName": "sample",
                "installMethod": "binary",
                "packageName": "sample"
            }),
        )
        .await;

        assert!(response.ok);
        let result = response.result.unwrap();
        assert_eq!(result["success"], false);
        assert!(result["error"].as_str().unwrap().contains("不支持"));

        let response = call(
            &state,
            json!({
                "id": 5,
                "op": "install-tool",
                "toolName": "",
                "installMethod": "npm",
                "packageName": "sample"
            }),
        )
        .await;
        assert!(response.ok);
        let result = response.result.unwrap();
        assert_eq!(result["success"], false);
        assert!(result["error"].as_str().unwrap().contains("工具名称不能为空"));
    }

    #[tokio::test]
    async fn test_config_round_trip_and_clear_cache() {
        let (state, _dir) = state(ScriptedRunner::new());

        let response = call(
            &state,
            json!({"id": 5, "op": "set-config", "config": {"autoBackup": false, "checkInterval": 2}}),
        )
        .await;
        assert!(response.ok);

        let response = call(&state, json!({"id": 6, "op": "get-config"})).await;
        let config = response.result.unwrap();
        assert_eq!(config["autoBackup"], false);
        assert_eq!(config["checkInterval"], 2);
        assert_eq!(config["showNotifications"], true);

        let response = call(&state, json!({"id": 7, "op": "clear-cache"})).await;
        assert!(response.ok);
    }

    #[tokio::test]
    async fn test_serve_answers_every_line_in_order() {
        let runner = ScriptedRunner::new()
            .with_program("claude", "/home/u/.npm-global/lib/node_modules/.bin/claude")
            .on("claude --version", ok("2.0.37 (Claude Code)"));
        let (state, _dir) = state(runner);

        let input = concat!(
            "{\"id\": 1, \"op\": \"get-config\"}\n",
            "\n",
            "garbage\n",
            "{\"id\": 2, \"op\": \"scan-tools\"}\n",
        );
        let mut output = Vec::new();
        serve(&state, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].id, json!(1));
        assert!(!responses[1].ok);
        assert_eq!(responses[2].id, json!(2));

        let tools = responses[2].result.as_ref().unwrap();
        assert_eq!(tools[0]["currentVersion"], "2.0.37");
        assert_eq!(tools[0]["installMethod"], "npm");
    }
}
