//! Catalog operations exposed as callable tools for the chat assistant.
//!
//! Each [`Tool`] wraps one of the same service operations the HTTP API
//! uses, described with an OpenAI function-calling parameter schema so the
//! model can discover and invoke it. The registry is assembled explicitly
//! at agent construction time; nothing here is a process-wide singleton.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::filters::UniversityFilters;
use crate::service::{UniversityDetail, UniversityListItem, UniversityService};

/// A tool the chat assistant can discover and call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier used in tool-call dispatch (e.g. `"get_university"`).
    fn name(&self) -> &str;

    /// One-line description for model-side tool selection.
    fn description(&self) -> &str;

    /// OpenAI function-calling JSON Schema for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with JSON parameters; the returned value is serialized back
    /// to the model verbatim.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Bridge giving tools access to the catalog database.
pub struct ToolContext {
    pool: SqlitePool,
}

impl ToolContext {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn service(&self) -> UniversityService {
        UniversityService::new(self.pool.clone())
    }
}

/// Registry of tools available to the assistant.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with the catalog tools the assistant needs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AvailableFiltersTool));
        registry.register(Box::new(SearchUniversitiesTool));
        registry.register(Box::new(GetUniversityTool));
        registry.register(Box::new(CompareUniversitiesTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn list_item_json(item: &UniversityListItem) -> Value {
    json!({
        "id": item.id,
        "name": item.name,
        "city": item.city,
        "country": item.country.name,
        "country_code": item.country.code,
        "programs_count": item.programs_count,
    })
}

fn detail_json(detail: &UniversityDetail) -> Value {
    json!({
        "id": detail.id,
        "name": detail.name,
        "city": detail.city,
        "description": detail.description,
        "country": detail.country.name,
        "country_code": detail.country.code,
        "programs": detail.programs,
    })
}

/// Lists every country, program, and exam the catalog knows about.
pub struct AvailableFiltersTool;

#[async_trait]
impl Tool for AvailableFiltersTool {
    fn name(&self) -> &str {
        "get_available_filters"
    }

    fn description(&self) -> &str {
        "Get all available filter options: countries, programs, and exams"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let meta = ctx.service().get_meta().await?;

        Ok(json!({
            "countries": meta.countries.iter()
                .map(|c| json!({ "code": c.code, "name": c.name }))
                .collect::<Vec<_>>(),
            "programs": meta.programs,
            "exams": meta.exams,
        }))
    }
}

/// Filtered university search, first page only.
pub struct SearchUniversitiesTool;

#[async_trait]
impl Tool for SearchUniversitiesTool {
    fn name(&self) -> &str {
        "search_universities"
    }

    fn description(&self) -> &str {
        "Search universities with optional country, program, exam, min_score, and name filters"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "country": { "type": "string", "description": "Country code, e.g. KZ, TR, DE" },
                "program": { "type": "string", "description": "Program name or numeric ID, e.g. Computer Science" },
                "exam": { "type": "string", "description": "Exam name, e.g. SAT, IELTS, ENT" },
                "min_score": { "type": "number", "description": "Minimum required exam score" },
                "query": { "type": "string", "description": "Case-insensitive substring match on university name" }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let filters = UniversityFilters {
            country_code: params["country"].as_str().map(str::to_string),
            program: params["program"].as_str().map(str::to_string),
            exam: params["exam"].as_str().map(str::to_string),
            min_score: params["min_score"].as_f64(),
            query: params["query"].as_str().map(str::to_string),
            page: 1,
            limit: 20,
        };

        let (items, total) = ctx.service().list_universities(&filters).await?;

        if items.is_empty() {
            return Ok(json!({
                "found": 0,
                "message": "No universities match your criteria.",
                "tip": "Use get_available_filters to see valid country codes, programs, and exams.",
            }));
        }

        Ok(json!({
            "found": total,
            "showing": items.len(),
            "universities": items.iter().map(list_item_json).collect::<Vec<_>>(),
        }))
    }
}

/// Full university detail by numeric ID.
pub struct GetUniversityTool;

#[async_trait]
impl Tool for GetUniversityTool {
    fn name(&self) -> &str {
        "get_university"
    }

    fn description(&self) -> &str {
        "Get detailed information about a university by its numeric ID"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "university_id": { "type": "integer", "description": "The numeric ID of the university" }
            },
            "required": ["university_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let Some(university_id) = params["university_id"].as_i64() else {
            anyhow::bail!("university_id must be an integer");
        };

        match ctx.service().get_university(university_id).await? {
            Some(detail) => Ok(detail_json(&detail)),
            None => Ok(json!({
                "error": format!("University with ID {} not found.", university_id),
                "tip": "Use search_universities to find valid university IDs.",
            })),
        }
    }
}

/// Side-by-side comparison of 2 to 5 universities.
pub struct CompareUniversitiesTool;

#[async_trait]
impl Tool for CompareUniversitiesTool {
    fn name(&self) -> &str {
        "compare_universities"
    }

    fn description(&self) -> &str {
        "Compare 2 to 5 universities side by side"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "university_ids": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "University IDs to compare, e.g. [1, 2, 3]"
                }
            },
            "required": ["university_ids"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let ids: Vec<i64> = params["university_ids"]
            .as_array()
            .map(|values| values.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();

        if ids.len() < 2 {
            return Ok(json!({
                "error": "Please provide at least 2 university IDs to compare."
            }));
        }
        if ids.len() > 5 {
            return Ok(json!({
                "error": "Please compare at most 5 universities at a time."
            }));
        }

        let service = ctx.service();
        let mut found = Vec::new();
        let mut not_found = Vec::new();

        for id in ids {
            match service.get_university(id).await? {
                Some(detail) => found.push(detail_json(&detail)),
                None => not_found.push(id),
            }
        }

        if found.is_empty() {
            return Ok(json!({
                "error": "None of the provided IDs were found.",
                "tip": "Use search_universities to find valid university IDs.",
            }));
        }

        let mut comparison = json!({
            "universities_compared": found.len(),
            "comparison": found,
        });
        if !not_found.is_empty() {
            comparison["not_found_ids"] = json!(not_found);
        }

        Ok(comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 4);
        assert!(registry.find("get_available_filters").is_some());
        assert!(registry.find("search_universities").is_some());
        assert!(registry.find("get_university").is_some());
        assert!(registry.find("compare_universities").is_some());
        assert!(registry.find("drop_tables").is_none());
    }

    #[test]
    fn test_schemas_are_objects() {
        let registry = ToolRegistry::with_builtins();
        for tool in registry.tools() {
            let schema = tool.parameters_schema();
            assert_eq!(schema["type"], "object", "tool {}", tool.name());
            assert!(schema["properties"].is_object(), "tool {}", tool.name());
        }
    }
}
