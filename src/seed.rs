//! Idempotent demo-dataset seeding.
//!
//! Rows are upserted by natural keys: country code (uppercased), exam name
//! (lowercased), program name + degree level (lowercased), university name
//! (lowercased). Requirements are keyed by their (university, program,
//! exam) triple. Re-running refreshes mutable fields in place and never
//! duplicates rows.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::DegreeLevel;

struct CountrySeed {
    name: &'static str,
    code: &'static str,
}

struct ProgramSeed {
    name: &'static str,
    degree_level: DegreeLevel,
}

struct RequirementSeed {
    exam: &'static str,
    min_score: f64,
}

struct OfferingSeed {
    program: &'static str,
    degree_level: DegreeLevel,
    requirements: &'static [RequirementSeed],
}

struct UniversitySeed {
    name: &'static str,
    city: &'static str,
    description: &'static str,
    country_code: &'static str,
    offerings: &'static [OfferingSeed],
}

const COUNTRIES: &[CountrySeed] = &[
    CountrySeed { name: "Kazakhstan", code: "KZ" },
    CountrySeed { name: "Turkey", code: "TR" },
    CountrySeed { name: "Romania", code: "RO" },
    CountrySeed { name: "Germany", code: "DE" },
];

const EXAMS: &[&str] = &["IELTS", "SAT", "ENT"];

const PROGRAMS: &[ProgramSeed] = &[
    ProgramSeed { name: "Computer Science", degree_level: DegreeLevel::Bachelor },
    ProgramSeed { name: "Data Science", degree_level: DegreeLevel::Master },
    ProgramSeed { name: "Business Administration", degree_level: DegreeLevel::Bachelor },
    ProgramSeed { name: "Mechanical Engineering", degree_level: DegreeLevel::Bachelor },
    ProgramSeed { name: "International Relations", degree_level: DegreeLevel::Bachelor },
    ProgramSeed { name: "Finance", degree_level: DegreeLevel::Master },
    ProgramSeed { name: "Architecture", degree_level: DegreeLevel::Bachelor },
];

const UNIVERSITIES: &[UniversitySeed] = &[
    UniversitySeed {
        name: "Nazarbayev University",
        city: "Astana",
        description: "Research university with strong STEM focus.",
        country_code: "KZ",
        offerings: &[
            OfferingSeed {
                program: "Computer Science",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "SAT", min_score: 1350.0 },
                ],
            },
            OfferingSeed {
                program: "Mechanical Engineering",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.0 },
                    RequirementSeed { exam: "SAT", min_score: 1280.0 },
                ],
            },
            OfferingSeed {
                program: "Data Science",
                degree_level: DegreeLevel::Master,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 7.0 }],
            },
        ],
    },
    UniversitySeed {
        name: "Al-Farabi Kazakh National University",
        city: "Almaty",
        description: "Classical university with wide range of faculties.",
        country_code: "KZ",
        offerings: &[
            OfferingSeed {
                program: "Business Administration",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.0 },
                    RequirementSeed { exam: "ENT", min_score: 110.0 },
                ],
            },
            OfferingSeed {
                program: "International Relations",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.0 },
                    RequirementSeed { exam: "ENT", min_score: 105.0 },
                ],
            },
        ],
    },
    UniversitySeed {
        name: "KIMEP University",
        city: "Almaty",
        description: "Internationally focused business school in Kazakhstan.",
        country_code: "KZ",
        offerings: &[
            OfferingSeed {
                program: "Finance",
                degree_level: DegreeLevel::Master,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "ENT", min_score: 115.0 },
                ],
            },
            OfferingSeed {
                program: "Business Administration",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "ENT", min_score: 115.0 },
                ],
            },
        ],
    },
    UniversitySeed {
        name: "Istanbul Technical University",
        city: "Istanbul",
        description: "Leading engineering school in Turkey.",
        country_code: "TR",
        offerings: &[
            OfferingSeed {
                program: "Mechanical Engineering",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "SAT", min_score: 1300.0 },
                ],
            },
            OfferingSeed {
                program: "Architecture",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "SAT", min_score: 1250.0 },
                ],
            },
            OfferingSeed {
                program: "Data Science",
                degree_level: DegreeLevel::Master,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 7.0 }],
            },
        ],
    },
    UniversitySeed {
        name: "Middle East Technical University",
        city: "Ankara",
        description: "STEM-oriented public research university.",
        country_code: "TR",
        offerings: &[
            OfferingSeed {
                program: "Computer Science",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "SAT", min_score: 1380.0 },
                ],
            },
            OfferingSeed {
                program: "International Relations",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 6.5 }],
            },
        ],
    },
    UniversitySeed {
        name: "Bogazici University",
        city: "Istanbul",
        description: "Selective public university overlooking the Bosphorus.",
        country_code: "TR",
        offerings: &[
            OfferingSeed {
                program: "Business Administration",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "SAT", min_score: 1320.0 },
                ],
            },
            OfferingSeed {
                program: "Finance",
                degree_level: DegreeLevel::Master,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 7.0 }],
            },
        ],
    },
    UniversitySeed {
        name: "University of Bucharest",
        city: "Bucharest",
        description: "Comprehensive Romanian university.",
        country_code: "RO",
        offerings: &[
            OfferingSeed {
                program: "International Relations",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 6.0 }],
            },
            OfferingSeed {
                program: "Data Science",
                degree_level: DegreeLevel::Master,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 6.5 }],
            },
        ],
    },
    UniversitySeed {
        name: "Politehnica University of Bucharest",
        city: "Bucharest",
        description: "Largest technical university in Romania.",
        country_code: "RO",
        offerings: &[
            OfferingSeed {
                program: "Mechanical Engineering",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.0 },
                    RequirementSeed { exam: "SAT", min_score: 1250.0 },
                ],
            },
            OfferingSeed {
                program: "Computer Science",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.0 },
                    RequirementSeed { exam: "SAT", min_score: 1300.0 },
                ],
            },
        ],
    },
    UniversitySeed {
        name: "Babeș-Bolyai University",
        city: "Cluj-Napoca",
        description: "Multicultural university with wide offerings.",
        country_code: "RO",
        offerings: &[
            OfferingSeed {
                program: "Business Administration",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 6.0 }],
            },
            OfferingSeed {
                program: "Computer Science",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 6.0 }],
            },
        ],
    },
    UniversitySeed {
        name: "Technical University of Munich",
        city: "Munich",
        description: "Germany's premier technical university.",
        country_code: "DE",
        offerings: &[
            OfferingSeed {
                program: "Mechanical Engineering",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "SAT", min_score: 1400.0 },
                ],
            },
            OfferingSeed {
                program: "Data Science",
                degree_level: DegreeLevel::Master,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 7.0 }],
            },
        ],
    },
    UniversitySeed {
        name: "Humboldt University of Berlin",
        city: "Berlin",
        description: "Historic Berlin university covering humanities and sciences.",
        country_code: "DE",
        offerings: &[
            OfferingSeed {
                program: "International Relations",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 6.5 }],
            },
            OfferingSeed {
                program: "Business Administration",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 6.5 }],
            },
        ],
    },
    UniversitySeed {
        name: "Ludwig Maximilian University of Munich",
        city: "Munich",
        description: "Research-intensive university with global reach.",
        country_code: "DE",
        offerings: &[
            OfferingSeed {
                program: "Finance",
                degree_level: DegreeLevel::Master,
                requirements: &[RequirementSeed { exam: "IELTS", min_score: 7.0 }],
            },
            OfferingSeed {
                program: "Computer Science",
                degree_level: DegreeLevel::Bachelor,
                requirements: &[
                    RequirementSeed { exam: "IELTS", min_score: 6.5 },
                    RequirementSeed { exam: "SAT", min_score: 1360.0 },
                ],
            },
        ],
    },
];

pub async fn run_seed(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;

    seed_pool(&pool).await?;

    pool.close().await;
    Ok(())
}

/// Seed an already-migrated pool. Exposed separately so tests can build
/// fixture databases without going through a config file.
pub async fn seed_pool(pool: &SqlitePool) -> Result<()> {
    let country_ids = seed_countries(pool).await?;
    let exam_ids = seed_exams(pool).await?;
    let program_ids = seed_programs(pool).await?;
    let mut requirements = 0u64;

    for seed in UNIVERSITIES {
        let country_id = country_ids[&seed.country_code.to_uppercase()];
        let university_id = upsert_university(pool, seed, country_id).await?;

        for offering in seed.offerings {
            let program_key = (offering.program.to_lowercase(), offering.degree_level);
            let program_id = program_ids[&program_key];

            for requirement in offering.requirements {
                let exam_id = exam_ids[&requirement.exam.to_lowercase()];
                upsert_requirement(
                    pool,
                    university_id,
                    program_id,
                    exam_id,
                    requirement.min_score,
                )
                .await?;
                requirements += 1;
            }
        }
    }

    println!("seed");
    println!("  countries: {}", COUNTRIES.len());
    println!("  exams: {}", EXAMS.len());
    println!("  programs: {}", PROGRAMS.len());
    println!("  universities: {}", UNIVERSITIES.len());
    println!("  requirements: {}", requirements);
    println!("ok");

    Ok(())
}

async fn seed_countries(pool: &SqlitePool) -> Result<HashMap<String, i64>> {
    let mut mapping = HashMap::new();
    for seed in COUNTRIES {
        let code = seed.code.to_uppercase();
        let existing = sqlx::query("SELECT id FROM countries WHERE code = ?")
            .bind(&code)
            .fetch_optional(pool)
            .await?;

        let id = match existing {
            Some(row) => {
                let id: i64 = row.get("id");
                sqlx::query("UPDATE countries SET name = ? WHERE id = ?")
                    .bind(seed.name)
                    .bind(id)
                    .execute(pool)
                    .await?;
                id
            }
            None => {
                sqlx::query("INSERT INTO countries (name, code) VALUES (?, ?)")
                    .bind(seed.name)
                    .bind(&code)
                    .execute(pool)
                    .await?
                    .last_insert_rowid()
            }
        };
        mapping.insert(code, id);
    }
    Ok(mapping)
}

async fn seed_exams(pool: &SqlitePool) -> Result<HashMap<String, i64>> {
    let mut mapping = HashMap::new();
    for name in EXAMS {
        let existing = sqlx::query("SELECT id FROM exams WHERE LOWER(name) = ?")
            .bind(name.to_lowercase())
            .fetch_optional(pool)
            .await?;

        let id = match existing {
            Some(row) => row.get("id"),
            None => sqlx::query("INSERT INTO exams (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await?
                .last_insert_rowid(),
        };
        mapping.insert(name.to_lowercase(), id);
    }
    Ok(mapping)
}

async fn seed_programs(pool: &SqlitePool) -> Result<HashMap<(String, DegreeLevel), i64>> {
    let mut mapping = HashMap::new();
    for seed in PROGRAMS {
        let existing =
            sqlx::query("SELECT id FROM programs WHERE LOWER(name) = ? AND degree_level = ?")
                .bind(seed.name.to_lowercase())
                .bind(seed.degree_level.as_str())
                .fetch_optional(pool)
                .await?;

        let id = match existing {
            Some(row) => row.get("id"),
            None => sqlx::query("INSERT INTO programs (name, degree_level) VALUES (?, ?)")
                .bind(seed.name)
                .bind(seed.degree_level.as_str())
                .execute(pool)
                .await?
                .last_insert_rowid(),
        };
        mapping.insert((seed.name.to_lowercase(), seed.degree_level), id);
    }
    Ok(mapping)
}

async fn upsert_university(
    pool: &SqlitePool,
    seed: &UniversitySeed,
    country_id: i64,
) -> Result<i64> {
    let existing = sqlx::query("SELECT id FROM universities WHERE LOWER(name) = ?")
        .bind(seed.name.to_lowercase())
        .fetch_optional(pool)
        .await?;

    let id = match existing {
        Some(row) => {
            let id: i64 = row.get("id");
            sqlx::query(
                "UPDATE universities SET city = ?, description = ?, country_id = ? WHERE id = ?",
            )
            .bind(seed.city)
            .bind(seed.description)
            .bind(country_id)
            .bind(id)
            .execute(pool)
            .await?;
            id
        }
        None => sqlx::query(
            "INSERT INTO universities (name, city, description, country_id) VALUES (?, ?, ?, ?)",
        )
        .bind(seed.name)
        .bind(seed.city)
        .bind(seed.description)
        .bind(country_id)
        .execute(pool)
        .await?
        .last_insert_rowid(),
    };
    Ok(id)
}

async fn upsert_requirement(
    pool: &SqlitePool,
    university_id: i64,
    program_id: i64,
    exam_id: i64,
    min_score: f64,
) -> Result<()> {
    let existing = sqlx::query(
        "SELECT id FROM requirements WHERE university_id = ? AND program_id = ? AND exam_id = ?",
    )
    .bind(university_id)
    .bind(program_id)
    .bind(exam_id)
    .fetch_optional(pool)
    .await?;

    match existing {
        Some(row) => {
            let id: i64 = row.get("id");
            sqlx::query("UPDATE requirements SET min_score = ? WHERE id = ?")
                .bind(min_score)
                .bind(id)
                .execute(pool)
                .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO requirements (university_id, program_id, exam_id, min_score) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(university_id)
            .bind(program_id)
            .bind(exam_id)
            .bind(min_score)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}
