#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{
    add_part, config, new_widget, parts_include, part, setup_db, widget, widget_repo,
};
use modkit_repo::{
    FindQuery, IncludeMode, LogicalOp, QueryPolicy, ReadOptions, RepoError, Repository, SortSpec,
    ValidationError, WriteOptions,
};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection};

/// alpha (3 parts, two named bolt), beta (1 bolt), gamma (no parts).
async fn seed(db: &DatabaseConnection) -> Repository<widget::Entity> {
    let repo = widget_repo(db);
    for name in ["alpha", "beta", "gamma"] {
        repo.create(new_widget(name), &WriteOptions::default())
            .await
            .unwrap();
    }
    add_part(db, 1, "bolt").await;
    add_part(db, 1, "bolt").await;
    add_part(db, 1, "nut").await;
    add_part(db, 2, "bolt").await;
    repo
}

fn names<M: std::ops::Deref<Target = widget::Model>>(rows: &[M]) -> Vec<String> {
    rows.iter().map(|r| r.name.clone()).collect()
}

#[tokio::test]
async fn count_is_distinct_over_one_to_many_join() {
    let db = setup_db().await;
    let repo = seed(&db).await;
    let includes = [parts_include()];

    let res = repo
        .find(&FindQuery::new(), ReadOptions::default().includes(&includes))
        .await
        .unwrap();
    assert_eq!(res.count, 3);
    assert_eq!(names(&res.rows), ["alpha", "beta", "gamma"]);
    assert_eq!(res.rows[0].related("parts").len(), 3);
    assert_eq!(res.rows[1].related("parts").len(), 1);
    assert!(res.rows[2].related("parts").is_empty());
    assert_eq!(res.rows[1].related("parts")[0]["name"], "bolt");
}

#[tokio::test]
async fn filter_on_joined_relation_counts_parents() {
    let db = setup_db().await;
    let repo = seed(&db).await;
    let includes = [parts_include()];

    let query = FindQuery::new().filter(Condition::all().add(part::Column::Name.eq("bolt")));
    let res = repo
        .find(&query, ReadOptions::default().includes(&includes))
        .await
        .unwrap();
    // alpha joins twice on "bolt" but is one record
    assert_eq!(res.count, 2);
    assert_eq!(names(&res.rows), ["alpha", "beta"]);
}

#[tokio::test]
async fn soft_deleted_rows_are_excluded_unless_requested() {
    let db = setup_db().await;
    let repo = seed(&db).await;
    repo.delete_by_id(2_i64, &WriteOptions::default())
        .await
        .unwrap();

    let res = repo
        .find(&FindQuery::new(), ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(res.count, 2);
    assert_eq!(names(&res.rows), ["alpha", "gamma"]);

    let all = repo
        .find_all(&FindQuery::new().with_deleted(), ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn ordering_is_validated_against_allowlist() {
    let db = setup_db().await;
    let repo = seed(&db).await;

    let err = repo
        .find_all(
            &FindQuery::new().order(vec![SortSpec::asc("createdBy")]),
            ReadOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::SortColumnNotAllowed(ref c)) if c == "createdBy"
    ));
    assert!(err.is_client_error());

    let err = repo
        .find(
            &FindQuery::new().order(vec![SortSpec::new("name", "desc")]),
            ReadOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidSortDirection { .. })
    ));
}

#[tokio::test]
async fn explicit_order_overrides_default() {
    let db = setup_db().await;
    let repo = seed(&db).await;

    let rows = repo
        .find_all(
            &FindQuery::new().order(vec![SortSpec::desc("name")]),
            ReadOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), ["gamma", "beta", "alpha"]);
}

#[tokio::test]
async fn pagination_is_clamped() {
    let db = setup_db().await;
    let repo = seed(&db).await;

    let page = repo
        .find(
            &FindQuery::new().paginate(Some(2), Some(1)),
            ReadOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(names(&page.rows), ["gamma"]);

    // oversized and non-positive limits fall back to the ceiling
    for limit in [500, 0, -5] {
        let page = repo
            .find(
                &FindQuery::new().paginate(Some(limit), Some(0)),
                ReadOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.rows.len(), 3, "limit {limit}");
    }

    let window = repo.get_limit_and_page(Some(500), Some(2));
    assert_eq!(window.limit, 200);
    assert_eq!(window.offset, 400);
}

#[tokio::test]
async fn include_modes_follow_policy_defaults() {
    let db = setup_db().await;
    seed(&db).await;

    let policy = QueryPolicy::<widget::Entity>::builder(&config())
        .include(parts_include().ignore_on_find())
        .build()
        .unwrap();
    let repo = Repository::new(db.clone(), policy).unwrap();

    // find skips defaults flagged ignore_on_find
    let rows = repo
        .find_all(&FindQuery::new(), ReadOptions::default())
        .await
        .unwrap();
    assert!(rows.iter().all(|r| r.related.is_empty()));

    // lookups by id use every default
    let one = repo
        .get_by_id(1_i64, ReadOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(one.related("parts").len(), 3);

    // raw reads attach nothing
    let one = repo
        .get_by_id(1_i64, ReadOptions::raw())
        .await
        .unwrap()
        .unwrap();
    assert!(one.related.is_empty());

    // merging a request keeps it, flagged defaults stay out
    let requested = [parts_include()];
    let rows = repo
        .find_all(
            &FindQuery::new(),
            ReadOptions::default()
                .includes(&requested)
                .mode(IncludeMode::Merge),
        )
        .await
        .unwrap();
    assert_eq!(rows[0].related("parts").len(), 3);
    assert_eq!(rows[0].related.len(), 1);
}

#[tokio::test]
async fn get_all_by_ids_attaches_requested_includes() {
    let db = setup_db().await;
    let repo = seed(&db).await;
    let includes = [parts_include()];

    let rows = repo
        .get_all_by_ids([2_i64, 3], ReadOptions::default().includes(&includes))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let beta = rows.iter().find(|r| r.name == "beta").unwrap();
    assert_eq!(beta.related("parts").len(), 1);
}

#[tokio::test]
async fn prefix_search_matches_any_needle() {
    let db = setup_db().await;
    let repo = seed(&db).await;
    let ops = repo.operators();
    assert_eq!(ops.resolve(LogicalOp::ILike), LogicalOp::Like);

    let cond = ops
        .prefix_search(widget::Column::Name, "al  GAM", " ")
        .unwrap();
    let rows = repo
        .find_all(&FindQuery::new().filter(cond), ReadOptions::default())
        .await
        .unwrap();
    // sqlite LIKE ignores ASCII case
    assert_eq!(names(&rows), ["alpha", "gamma"]);

    let expr = ops
        .condition(widget::Column::Name, LogicalOp::NotILike, "b%")
        .unwrap();
    let rows = repo
        .find_all(
            &FindQuery::new().filter(Condition::all().add(expr)),
            ReadOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), ["alpha", "gamma"]);
}

#[tokio::test]
async fn paginated_find_with_include_counts_every_parent() {
    let db = setup_db().await;
    let repo = seed(&db).await;
    let includes = [parts_include()];

    let page = repo
        .find(
            &FindQuery::new().paginate(Some(2), Some(0)),
            ReadOptions::default().includes(&includes),
        )
        .await
        .unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(names(&page.rows), ["alpha", "beta"]);
    let sizes: Vec<usize> = page.rows.iter().map(|r| r.related("parts").len()).collect();
    assert_eq!(sizes, [3, 1]);
}
