//! Database-backed tests for the listing/detail service and seed routine.

use sqlx::SqlitePool;
use tempfile::TempDir;

use uni_catalog::config::Config;
use uni_catalog::db;
use uni_catalog::filters::UniversityFilters;
use uni_catalog::migrate;
use uni_catalog::seed;
use uni_catalog::service::UniversityService;

async fn setup() -> (TempDir, SqlitePool) {
    let tmp = TempDir::new().unwrap();
    let mut cfg = Config::minimal();
    cfg.db.path = tmp.path().join("catalog.sqlite");

    let pool = db::connect(&cfg).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    seed::seed_pool(&pool).await.unwrap();

    (tmp, pool)
}

fn filters() -> UniversityFilters {
    UniversityFilters::default()
}

#[tokio::test]
async fn test_unfiltered_listing_is_complete_and_name_ordered() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    let (items, total) = service
        .list_universities(&UniversityFilters {
            limit: 100,
            ..filters()
        })
        .await
        .unwrap();

    assert_eq!(total, 12);
    assert_eq!(items.len(), 12);

    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted, "listing must be ordered by name ascending");
}

#[tokio::test]
async fn test_country_filter_is_case_insensitive_exact() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    let (upper, upper_total) = service
        .list_universities(&UniversityFilters {
            country_code: Some("KZ".to_string()),
            ..filters()
        })
        .await
        .unwrap();

    assert_eq!(upper_total, 3);
    assert!(upper.iter().all(|i| i.country.code == "KZ"));

    let (lower, lower_total) = service
        .list_universities(&UniversityFilters {
            country_code: Some("kz".to_string()),
            ..filters()
        })
        .await
        .unwrap();

    assert_eq!(lower_total, upper_total);
    let upper_ids: Vec<i64> = upper.iter().map(|i| i.id).collect();
    let lower_ids: Vec<i64> = lower.iter().map(|i| i.id).collect();
    assert_eq!(upper_ids, lower_ids);
}

#[tokio::test]
async fn test_total_is_independent_of_page_window() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    for page in 1..=3 {
        let (_, total) = service
            .list_universities(&UniversityFilters {
                page,
                limit: 5,
                ..filters()
            })
            .await
            .unwrap();
        assert_eq!(total, 12, "total changed on page {}", page);
    }
}

#[tokio::test]
async fn test_pagination_concatenates_to_full_result_set() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    let (all, _) = service
        .list_universities(&UniversityFilters {
            limit: 100,
            ..filters()
        })
        .await
        .unwrap();

    let mut paged_ids: Vec<i64> = Vec::new();
    for page in 1..=3 {
        let (items, _) = service
            .list_universities(&UniversityFilters {
                page,
                limit: 5,
                ..filters()
            })
            .await
            .unwrap();
        let expected_len = if page < 3 { 5 } else { 2 };
        assert_eq!(items.len(), expected_len, "page {} size", page);
        paged_ids.extend(items.iter().map(|i| i.id));
    }

    let all_ids: Vec<i64> = all.iter().map(|i| i.id).collect();
    assert_eq!(paged_ids, all_ids, "pages must cover the full set in order");
}

#[tokio::test]
async fn test_program_count_is_distinct_programs_not_requirement_rows() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    let (items, _) = service
        .list_universities(&UniversityFilters {
            query: Some("Nazarbayev".to_string()),
            ..filters()
        })
        .await
        .unwrap();

    // Nazarbayev has 5 requirement rows across 3 distinct programs.
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].programs_count, 3);
}

#[tokio::test]
async fn test_combined_program_and_exam_must_match_one_requirement_row() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    // Four universities require SAT specifically for Computer Science.
    let (items, total) = service
        .list_universities(&UniversityFilters {
            program: Some("Computer Science".to_string()),
            exam: Some("SAT".to_string()),
            ..filters()
        })
        .await
        .unwrap();

    assert_eq!(total, 4);
    assert!(
        !items.iter().any(|i| i.name.contains("Babe")),
        "Babes-Bolyai offers CS with IELTS only and must not match CS+SAT"
    );

    // No university pairs Computer Science with ENT, even though some
    // require ENT for other programs.
    let (_, none_total) = service
        .list_universities(&UniversityFilters {
            program: Some("Computer Science".to_string()),
            exam: Some("ENT".to_string()),
            ..filters()
        })
        .await
        .unwrap();
    assert_eq!(none_total, 0);
}

#[tokio::test]
async fn test_min_score_is_a_floor_on_stored_minimums() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    // Only TU Munich stores a requirement of 1400 or more.
    let (items, total) = service
        .list_universities(&UniversityFilters {
            min_score: Some(1400.0),
            ..filters()
        })
        .await
        .unwrap();

    assert_eq!(total, 1);
    assert_eq!(items[0].name, "Technical University of Munich");

    // Combined with program+exam it narrows on the same requirement row.
    let (_, strict_total) = service
        .list_universities(&UniversityFilters {
            program: Some("Computer Science".to_string()),
            exam: Some("SAT".to_string()),
            min_score: Some(1360.0),
            ..filters()
        })
        .await
        .unwrap();
    assert_eq!(strict_total, 2); // METU 1380, LMU 1360
}

#[tokio::test]
async fn test_program_filter_accepts_numeric_id() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    let meta = service.get_meta().await.unwrap();
    let cs = meta
        .programs
        .iter()
        .find(|p| p.name == "Computer Science")
        .unwrap();

    let (_, by_name_total) = service
        .list_universities(&UniversityFilters {
            program: Some("computer science".to_string()),
            ..filters()
        })
        .await
        .unwrap();

    let (_, by_id_total) = service
        .list_universities(&UniversityFilters {
            program: Some(cs.id.to_string()),
            ..filters()
        })
        .await
        .unwrap();

    assert_eq!(by_name_total, 5);
    assert_eq!(by_id_total, by_name_total);
}

#[tokio::test]
async fn test_name_query_is_case_insensitive_substring() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    let (items, total) = service
        .list_universities(&UniversityFilters {
            query: Some("technical".to_string()),
            ..filters()
        })
        .await
        .unwrap();

    assert_eq!(total, 3);
    assert!(items.iter().all(|i| i.name.to_lowercase().contains("technical")));
}

#[tokio::test]
async fn test_detail_groups_requirements_by_program_sorted_by_name() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    let (items, _) = service
        .list_universities(&UniversityFilters {
            query: Some("KIMEP".to_string()),
            ..filters()
        })
        .await
        .unwrap();
    let detail = service.get_university(items[0].id).await.unwrap().unwrap();

    assert_eq!(detail.name, "KIMEP University");
    assert_eq!(detail.country.code, "KZ");

    let names: Vec<&str> = detail.programs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Business Administration", "Finance"]);

    let finance = &detail.programs[1];
    assert_eq!(finance.degree_level, "master");
    assert_eq!(finance.requirements.len(), 2);
    assert!(finance
        .requirements
        .iter()
        .any(|r| r.exam == "IELTS" && (r.min_score - 6.5).abs() < 1e-9));
    assert!(finance
        .requirements
        .iter()
        .any(|r| r.exam == "ENT" && (r.min_score - 115.0).abs() < 1e-9));
}

#[tokio::test]
async fn test_detail_absent_id_is_none() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool);

    let detail = service.get_university(999_999).await.unwrap();
    assert!(detail.is_none());
}

#[tokio::test]
async fn test_detail_skips_requirements_with_dangling_references() {
    let (_tmp, pool) = setup().await;
    let service = UniversityService::new(pool.clone());

    let (items, _) = service
        .list_universities(&UniversityFilters {
            query: Some("KIMEP".to_string()),
            ..filters()
        })
        .await
        .unwrap();
    let university_id = items[0].id;

    let before = service.get_university(university_id).await.unwrap().unwrap();

    // Plant a requirement whose program and exam do not exist.
    let mut conn = pool.acquire().await.unwrap();
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO requirements (university_id, program_id, exam_id, min_score) \
         VALUES (?, 99999, 99999, 5.0)",
    )
    .bind(university_id)
    .execute(&mut *conn)
    .await
    .unwrap();
    drop(conn);

    let after = service.get_university(university_id).await.unwrap().unwrap();
    assert_eq!(after.programs.len(), before.programs.len());
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let (_tmp, pool) = setup().await;

    let counts_before = table_counts(&pool).await;
    seed::seed_pool(&pool).await.unwrap();
    let counts_after = table_counts(&pool).await;

    assert_eq!(counts_before, counts_after);
}

async fn table_counts(pool: &SqlitePool) -> Vec<i64> {
    let mut counts = Vec::new();
    for table in [
        "countries",
        "exams",
        "programs",
        "universities",
        "requirements",
    ] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap();
        counts.push(count);
    }
    counts
}
