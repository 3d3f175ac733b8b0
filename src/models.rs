//! Row types for the reference tables, plus the degree-level domain.
//!
//! University and requirement rows never materialize as structs: the
//! service assembles its response payloads straight from joined queries.

use serde::Serialize;

/// A country that hosts partner universities.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub code: String,
}

/// A standardized exam used in admission requirements.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Exam {
    pub id: i64,
    pub name: String,
}

/// Program degree tier. Stored in the database as its lowercase string
/// form, which the schema CHECK-constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeLevel {
    Bachelor,
    Master,
}

impl DegreeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegreeLevel::Bachelor => "bachelor",
            DegreeLevel::Master => "master",
        }
    }
}

impl std::str::FromStr for DegreeLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bachelor" => Ok(DegreeLevel::Bachelor),
            "master" => Ok(DegreeLevel::Master),
            other => anyhow::bail!("Unknown degree level: {}", other),
        }
    }
}

/// A program that universities can offer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub degree_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_level_round_trips_through_str() {
        for level in [DegreeLevel::Bachelor, DegreeLevel::Master] {
            let parsed: DegreeLevel = level.as_str().parse().unwrap();
            assert_eq!(parsed, level);
        }
        assert!("phd".parse::<DegreeLevel>().is_err());
    }
}
