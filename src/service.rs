//! Listing, detail, and meta operations over the catalog schema.
//!
//! `UniversityService` is a thin unit of work around a [`SqlitePool`]: each
//! operation runs one or more read-only queries and holds no state of its
//! own. Country data is joined into the listing fetch and program counts
//! come from a single grouped query over the page's IDs, so no operation
//! issues per-row queries.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::filters::{build_conditions, UniversityFilters};
use crate::models::{Country, Exam, Program};

/// Country reference embedded in university payloads.
#[derive(Debug, Clone, Serialize)]
pub struct CountryRef {
    pub code: String,
    pub name: String,
}

/// Short university representation for list responses.
#[derive(Debug, Clone, Serialize)]
pub struct UniversityListItem {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub country: CountryRef,
    pub programs_count: i64,
}

/// Exam requirement with its minimal score.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementDetail {
    pub exam: String,
    pub min_score: f64,
}

/// A program offered by a university, with its exam requirements.
#[derive(Debug, Clone, Serialize)]
pub struct ProgramDetail {
    pub id: i64,
    pub name: String,
    pub degree_level: String,
    pub requirements: Vec<RequirementDetail>,
}

/// Detailed university representation.
#[derive(Debug, Clone, Serialize)]
pub struct UniversityDetail {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub description: Option<String>,
    pub country: CountryRef,
    pub programs: Vec<ProgramDetail>,
}

/// Distinct countries, programs, and exams for filter UIs.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub countries: Vec<Country>,
    pub programs: Vec<Program>,
    pub exams: Vec<Exam>,
}

/// Encapsulates database operations for universities.
#[derive(Clone)]
pub struct UniversityService {
    pool: SqlitePool,
}

impl UniversityService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return a page of universities matching the filters, plus the total
    /// match count independent of the page window.
    pub async fn list_universities(
        &self,
        filters: &UniversityFilters,
    ) -> Result<(Vec<UniversityListItem>, i64)> {
        let conditions = build_conditions(filters);
        let where_sql = conditions.where_sql();

        let count_sql = format!("SELECT COUNT(*) AS total FROM universities u{}", where_sql);
        let total: i64 = conditions
            .apply(sqlx::query(&count_sql))
            .fetch_one(&self.pool)
            .await?
            .get("total");

        // Name is the primary sort key; id breaks ties so pagination stays
        // deterministic across pages.
        let page_sql = format!(
            "SELECT u.id, u.name, u.city, c.code AS country_code, c.name AS country_name \
             FROM universities u \
             JOIN countries c ON c.id = u.country_id\
             {} ORDER BY u.name ASC, u.id ASC LIMIT ? OFFSET ?",
            where_sql
        );
        let rows = conditions
            .apply(sqlx::query(&page_sql))
            .bind(filters.limit)
            .bind(filters.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut items: Vec<UniversityListItem> = rows
            .iter()
            .map(|row| UniversityListItem {
                id: row.get("id"),
                name: row.get("name"),
                city: row.get("city"),
                country: CountryRef {
                    code: row.get("country_code"),
                    name: row.get("country_name"),
                },
                programs_count: 0,
            })
            .collect();

        let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
        let counts = self.program_counts(&ids).await?;
        for item in &mut items {
            item.programs_count = counts.get(&item.id).copied().unwrap_or(0);
        }

        Ok((items, total))
    }

    /// Distinct-program counts for a set of universities, in one grouped
    /// query. Counts distinct programs, not requirement rows: a university
    /// with IELTS and SAT requirements for the same program offers one
    /// program.
    async fn program_counts(&self, university_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if university_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; university_ids.len()].join(", ");
        let sql = format!(
            "SELECT university_id, COUNT(DISTINCT program_id) AS programs_count \
             FROM requirements WHERE university_id IN ({}) GROUP BY university_id",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in university_ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("university_id"), row.get("programs_count")))
            .collect())
    }

    /// Fetch a single university with its programs and requirements, or
    /// `None` when the ID does not exist.
    pub async fn get_university(&self, university_id: i64) -> Result<Option<UniversityDetail>> {
        let row = sqlx::query(
            "SELECT u.id, u.name, u.city, u.description, c.code AS country_code, \
                    c.name AS country_name \
             FROM universities u \
             JOIN countries c ON c.id = u.country_id \
             WHERE u.id = ?",
        )
        .bind(university_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let requirement_rows = sqlx::query(
            "SELECT r.min_score, p.id AS program_id, p.name AS program_name, \
                    p.degree_level, e.name AS exam_name \
             FROM requirements r \
             LEFT JOIN programs p ON p.id = r.program_id \
             LEFT JOIN exams e ON e.id = r.exam_id \
             WHERE r.university_id = ? \
             ORDER BY r.id",
        )
        .bind(university_id)
        .fetch_all(&self.pool)
        .await?;

        let mut program_order: Vec<i64> = Vec::new();
        let mut program_map: HashMap<i64, ProgramDetail> = HashMap::new();

        for req in &requirement_rows {
            let program_id: Option<i64> = req.get("program_id");
            let exam_name: Option<String> = req.get("exam_name");

            // Dangling program or exam references are tolerated, not errors.
            let (Some(program_id), Some(exam_name)) = (program_id, exam_name) else {
                continue;
            };

            let entry = program_map.entry(program_id).or_insert_with(|| {
                program_order.push(program_id);
                ProgramDetail {
                    id: program_id,
                    name: req.get("program_name"),
                    degree_level: req.get("degree_level"),
                    requirements: Vec::new(),
                }
            });
            entry.requirements.push(RequirementDetail {
                exam: exam_name,
                min_score: req.get("min_score"),
            });
        }

        let mut programs: Vec<ProgramDetail> = program_order
            .into_iter()
            .filter_map(|id| program_map.remove(&id))
            .collect();
        programs.sort_by_key(|program| program.name.to_lowercase());

        Ok(Some(UniversityDetail {
            id: row.get("id"),
            name: row.get("name"),
            city: row.get("city"),
            description: row.get("description"),
            country: CountryRef {
                code: row.get("country_code"),
                name: row.get("country_name"),
            },
            programs,
        }))
    }

    /// Full countries/programs/exams collections, each ordered by name.
    pub async fn get_meta(&self) -> Result<Meta> {
        let countries = sqlx::query_as::<_, Country>(
            "SELECT id, name, code FROM countries ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let programs = sqlx::query_as::<_, Program>(
            "SELECT id, name, degree_level FROM programs ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let exams = sqlx::query_as::<_, Exam>("SELECT id, name FROM exams ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(Meta {
            countries,
            programs,
            exams,
        })
    }
}
