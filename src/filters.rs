//! Filter parameters and the composable SQL predicate builder.
//!
//! [`build_conditions`] turns a [`UniversityFilters`] value into a
//! conjunctive WHERE fragment over `universities u` plus an ordered bind
//! list. The same conditions drive both the count query and the paged
//! fetch, so `total` is always computed against the identical predicate.
//!
//! The requirement-scoped filters (program, exam, min_score) are combined
//! inside a single correlated EXISTS subquery. That makes them hold on a
//! single requirement row: a university whose CS program wants IELTS and
//! whose Math program wants a high SAT must NOT match
//! `program=CS&exam=SAT`. Three independent EXISTS clauses would get this
//! wrong.

use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

/// Filter parameters supported by the listing API.
#[derive(Debug, Clone)]
pub struct UniversityFilters {
    /// Country code, matched case-insensitively (exact).
    pub country_code: Option<String>,
    /// Numeric program ID, or a case-insensitive exact program name.
    pub program: Option<String>,
    /// Exam name, matched case-insensitively (exact).
    pub exam: Option<String>,
    /// Lower bound on the requirement's stored minimum score.
    pub min_score: Option<f64>,
    /// Case-insensitive substring match on the university name.
    pub query: Option<String>,
    pub page: i64,
    pub limit: i64,
}

impl Default for UniversityFilters {
    fn default() -> Self {
        Self {
            country_code: None,
            program: None,
            exam: None,
            min_score: None,
            query: None,
            page: 1,
            limit: 20,
        }
    }
}

impl UniversityFilters {
    /// Row offset for the page window. Saturates so absurd page numbers
    /// produce an empty page instead of overflowing.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// A positional bind value for the generated SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Int(i64),
    Real(f64),
}

/// WHERE clauses and their binds, in positional order.
#[derive(Debug, Default)]
pub struct SqlConditions {
    clauses: Vec<String>,
    binds: Vec<BindValue>,
}

impl SqlConditions {
    /// Render as a ` WHERE ...` suffix, or an empty string when no filter
    /// is active.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }

    /// Apply all binds to a query, in order.
    pub fn apply<'q>(
        &'q self,
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        for bind in &self.binds {
            query = match bind {
                BindValue::Text(s) => query.bind(s.as_str()),
                BindValue::Int(i) => query.bind(*i),
                BindValue::Real(f) => query.bind(*f),
            };
        }
        query
    }
}

/// Normalized program filter: a numeric ID, or a lowercased exact name.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramFilter {
    Id(i64),
    Name(String),
}

/// Parse the loose `program` input. Integers are treated as program IDs;
/// anything else is a case-insensitive exact name match. Blank input means
/// no constraint.
pub fn parse_program_filter(program: Option<&str>) -> Option<ProgramFilter> {
    let value = program?.trim();
    if value.is_empty() {
        return None;
    }

    match value.parse::<i64>() {
        Ok(id) => Some(ProgramFilter::Id(id)),
        Err(_) => Some(ProgramFilter::Name(value.to_lowercase())),
    }
}

/// Build the conjunctive predicate set for a filter bundle.
pub fn build_conditions(filters: &UniversityFilters) -> SqlConditions {
    let mut conditions = SqlConditions::default();

    if let Some(code) = non_empty(filters.country_code.as_deref()) {
        conditions
            .clauses
            .push("u.country_id IN (SELECT id FROM countries WHERE LOWER(code) = ?)".to_string());
        conditions.binds.push(BindValue::Text(code.to_lowercase()));
    }

    if let Some(query) = non_empty(filters.query.as_deref()) {
        conditions.clauses.push("LOWER(u.name) LIKE ?".to_string());
        conditions
            .binds
            .push(BindValue::Text(format!("%{}%", query.to_lowercase())));
    }

    // Requirement-scoped filters share one EXISTS subquery (single-row AND).
    let mut req_clauses: Vec<&str> = Vec::new();
    let mut req_binds: Vec<BindValue> = Vec::new();
    let mut join_programs = false;
    let mut join_exams = false;

    if let Some(score) = filters.min_score {
        req_clauses.push("r.min_score >= ?");
        req_binds.push(BindValue::Real(score));
    }

    match parse_program_filter(filters.program.as_deref()) {
        Some(ProgramFilter::Id(id)) => {
            req_clauses.push("r.program_id = ?");
            req_binds.push(BindValue::Int(id));
        }
        Some(ProgramFilter::Name(name)) => {
            join_programs = true;
            req_clauses.push("LOWER(p.name) = ?");
            req_binds.push(BindValue::Text(name));
        }
        None => {}
    }

    if let Some(exam) = non_empty(filters.exam.as_deref()) {
        join_exams = true;
        req_clauses.push("LOWER(e.name) = ?");
        req_binds.push(BindValue::Text(exam.to_lowercase()));
    }

    if !req_clauses.is_empty() {
        let mut subquery = String::from("EXISTS (SELECT 1 FROM requirements r");
        if join_programs {
            subquery.push_str(" JOIN programs p ON p.id = r.program_id");
        }
        if join_exams {
            subquery.push_str(" JOIN exams e ON e.id = r.exam_id");
        }
        subquery.push_str(" WHERE r.university_id = u.id AND ");
        subquery.push_str(&req_clauses.join(" AND "));
        subquery.push(')');

        conditions.clauses.push(subquery);
        conditions.binds.extend(req_binds);
    }

    conditions
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters_no_where() {
        let conditions = build_conditions(&UniversityFilters::default());
        assert_eq!(conditions.where_sql(), "");
        assert!(conditions.binds().is_empty());
    }

    #[test]
    fn test_country_code_lowercased_exact() {
        let filters = UniversityFilters {
            country_code: Some("KZ".to_string()),
            ..Default::default()
        };
        let conditions = build_conditions(&filters);
        assert!(conditions.where_sql().contains("LOWER(code) = ?"));
        assert_eq!(
            conditions.binds(),
            &[BindValue::Text("kz".to_string())]
        );
    }

    #[test]
    fn test_query_becomes_substring_like() {
        let filters = UniversityFilters {
            query: Some("Tech".to_string()),
            ..Default::default()
        };
        let conditions = build_conditions(&filters);
        assert!(conditions.where_sql().contains("LOWER(u.name) LIKE ?"));
        assert_eq!(
            conditions.binds(),
            &[BindValue::Text("%tech%".to_string())]
        );
    }

    #[test]
    fn test_program_numeric_is_id() {
        assert_eq!(
            parse_program_filter(Some("42")),
            Some(ProgramFilter::Id(42))
        );
    }

    #[test]
    fn test_program_text_is_lowercased_name() {
        assert_eq!(
            parse_program_filter(Some("Computer Science")),
            Some(ProgramFilter::Name("computer science".to_string()))
        );
    }

    #[test]
    fn test_program_blank_is_no_constraint() {
        assert_eq!(parse_program_filter(None), None);
        assert_eq!(parse_program_filter(Some("")), None);
        assert_eq!(parse_program_filter(Some("   ")), None);
    }

    #[test]
    fn test_program_input_trimmed_before_parse() {
        assert_eq!(
            parse_program_filter(Some(" 7 ")),
            Some(ProgramFilter::Id(7))
        );
    }

    #[test]
    fn test_requirement_filters_share_one_exists() {
        let filters = UniversityFilters {
            program: Some("Computer Science".to_string()),
            exam: Some("SAT".to_string()),
            min_score: Some(1300.0),
            ..Default::default()
        };
        let conditions = build_conditions(&filters);
        let sql = conditions.where_sql();

        assert_eq!(sql.matches("EXISTS").count(), 1);
        assert!(sql.contains("r.min_score >= ?"));
        assert!(sql.contains("LOWER(p.name) = ?"));
        assert!(sql.contains("LOWER(e.name) = ?"));
        assert!(sql.contains("r.university_id = u.id"));
    }

    #[test]
    fn test_program_id_skips_program_join() {
        let filters = UniversityFilters {
            program: Some("3".to_string()),
            ..Default::default()
        };
        let conditions = build_conditions(&filters);
        let sql = conditions.where_sql();
        assert!(sql.contains("r.program_id = ?"));
        assert!(!sql.contains("JOIN programs"));
    }

    #[test]
    fn test_bind_order_matches_clause_order() {
        let filters = UniversityFilters {
            country_code: Some("TR".to_string()),
            query: Some("uni".to_string()),
            min_score: Some(6.5),
            program: Some("9".to_string()),
            exam: Some("IELTS".to_string()),
            ..Default::default()
        };
        let conditions = build_conditions(&filters);
        assert_eq!(
            conditions.binds(),
            &[
                BindValue::Text("tr".to_string()),
                BindValue::Text("%uni%".to_string()),
                BindValue::Real(6.5),
                BindValue::Int(9),
                BindValue::Text("ielts".to_string()),
            ]
        );
    }

    #[test]
    fn test_offset_arithmetic() {
        let filters = UniversityFilters {
            page: 3,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(filters.offset(), 40);

        let first = UniversityFilters::default();
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn test_offset_saturates_on_extreme_page() {
        let filters = UniversityFilters {
            page: i64::MAX,
            limit: 100,
            ..Default::default()
        };
        assert_eq!(filters.offset(), i64::MAX);
    }
}
