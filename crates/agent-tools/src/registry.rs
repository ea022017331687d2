//! Name-keyed store of registered tools. Populated at startup, read-only
//! once the orchestrator loop begins.

use crate::contract::Tool;
use agent_core::{AgentError, ToolDefinition};
use std::collections::HashMap;

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its definition's name. Duplicate names are a
    /// registration error; the caller decides whether that's fatal (a
    /// built-in collision) or just logged and skipped (an MCP collision).
    pub fn register(&mut self, tool: Tool) -> Result<(), AgentError> {
        if self.tools.contains_key(&tool.definition.name) {
            return Err(AgentError::RegistrationCollision(tool.definition.name.clone()));
        }
        self.tools.insert(tool.definition.name.clone(), tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.values().map(|t| &t.definition).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ToolHandler;
    use agent_core::{ExecutionContext, ParamType, ToolCall, ToolParameter, ToolResult};
    use async_trait::async_trait;

    struct NoopHandler;

    #[async_trait]
    impl ToolHandler for NoopHandler {
        async fn invoke(&self, _call: &ToolCall, _ctx: &ExecutionContext) -> ToolResult {
            ToolResult::success("noop")
        }
    }

    fn def(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: "test tool".to_string(),
            parameters: vec![ToolParameter::required("x", ParamType::String, "x")],
            safe: true,
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Tool::new(def("a"), NoopHandler)).unwrap();
        assert!(registry.get("a").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_register_duplicate_is_error() {
        let mut registry = ToolRegistry::new();
        registry.register(Tool::new(def("a"), NoopHandler)).unwrap();
        let err = registry.register(Tool::new(def("a"), NoopHandler)).unwrap_err();
        assert!(matches!(err, AgentError::RegistrationCollision(name) if name == "a"));
    }

    #[test]
    fn test_definitions_enumerates_all() {
        let mut registry = ToolRegistry::new();
        registry.register(Tool::new(def("a"), NoopHandler)).unwrap();
        registry.register(Tool::new(def("b"), NoopHandler)).unwrap();
        let names: Vec<_> = registry.definitions().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
    }

    #[test]
    fn test_len_and_is_empty() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(Tool::new(def("a"), NoopHandler)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }
}
