// 工具目录
//
// 内置支持的 AI 编程工具定义，启动时加载一次，之后只读

use crate::models::{GithubRepo, PackageSources, ToolDefinition};

const TRIPLET: &str = r"(\d+\.\d+\.\d+)";

/// 工具目录
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Vec<ToolDefinition>,
}

impl Catalog {
    pub fn new(definitions: Vec<ToolDefinition>) -> Self {
        Self { definitions }
    }

    /// 内置工具目录
    pub fn builtin() -> Self {
        let definitions = vec![
            tool("claude", "Claude Code", "claude", "--version")
                .npm("@anthropic-ai/claude-code")
                .github("anthropics", "claude-code")
                .config_paths(&["~/.claude/config.json", "~/.config/claude/config.json"])
                .homepage("https://claude.ai/code"),
            tool("gemini", "Gemini CLI", "gemini", "--version")
                .npm("@google/gemini-cli")
                .pip("gemini-cli")
                .homepage("https://ai.google.dev/"),
            tool("codex", "Codex CLI", "codex", "--version")
                .npm("openai-codex-cli")
                .pip("codex-cli"),
            tool("qwen", "Qwen CLI", "qwen", "-v")
                .pip("qwen-cli")
                .github("QwenLM", "Qwen")
                .homepage("https://qwenlm.github.io/"),
            tool("iflow", "iFlow", "iflow", "--version").npm("iflow-cli"),
            tool("crush", "Crush", "crush", "--version")
                .npm("crush-cli")
                .github("crush-ai", "crush"),
            tool("opencode", "OpenCode", "opencode", "--version")
                .npm("opencode-cli")
                .pip("opencode"),
            tool("droid", "Droid", "droid", "--version").npm("droid-cli"),
            tool("goose", "Goose", "goose", "--version")
                .npm("goose-cli")
                .pip("goose-ai")
                .github("block", "goose")
                .homepage("https://github.com/block/goose"),
            // VS Code 扩展：通过 `code --list-extensions` 的输出识别版本
            tool("cline", "Cline", "code", "--list-extensions --show-versions")
                .vscode("saoudrizwan.claude-dev")
                .pattern(r"saoudrizwan\.claude-dev@(\d+\.\d+\.\d+)")
                .homepage("https://github.com/saoudrizwan/claude-dev"),
            tool("copilot", "GitHub Copilot CLI", "github-copilot-cli", "--version")
                .npm("@githubnext/github-copilot-cli")
                .homepage("https://githubnext.com/projects/copilot-cli"),
            tool("codebuddy", "CodeBuddy", "codebuddy", "--version")
                .npm("codebuddy-cli")
                .pip("codebuddy"),
            tool("kimi", "Kimi CLI", "kimi", "-v")
                .pip("kimi-cli")
                .github("MoonshotAI", "kimi-cli")
                .homepage("https://www.moonshot.cn/"),
        ];

        Self::new(definitions.into_iter().map(|b| b.0).collect())
    }

    /// 根据名称获取工具定义
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

struct DefinitionBuilder(ToolDefinition);

fn tool(name: &str, display_name: &str, command: &str, version_flag: &str) -> DefinitionBuilder {
    DefinitionBuilder(ToolDefinition {
        name: name.to_string(),
        display_name: display_name.to_string(),
        command: command.to_string(),
        version_flag: version_flag.to_string(),
        version_pattern: TRIPLET.to_string(),
        install_methods: PackageSources::default(),
        config_paths: Vec::new(),
        homepage: None,
    })
}

impl DefinitionBuilder {
    fn npm(mut self, package: &str) -> Self {
        self.0.install_methods.npm = Some(package.to_string());
        self
    }

    fn pip(mut self, package: &str) -> Self {
        self.0.install_methods.pip = Some(package.to_string());
        self
    }

    fn github(mut self, owner: &str, repo: &str) -> Self {
        self.0.install_methods.github = Some(GithubRepo {
            owner: owner.to_string(),
            repo: repo.to_string(),
        });
        self
    }

    fn vscode(mut self, extension_id: &str) -> Self {
        self.0.install_methods.vscode = Some(extension_id.to_string());
        self
    }

    fn pattern(mut self, pattern: &str) -> Self {
        self.0.version_pattern = pattern.to_string();
        self
    }

    fn config_paths(mut self, paths: &[&str]) -> Self {
        self.0.config_paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    fn homepage(mut self, url: &str) -> Self {
        self.0.homepage = Some(url.to_string());
        self
    }
}
