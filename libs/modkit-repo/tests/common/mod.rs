#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use modkit_repo::{AuditColumns, AuditedEntity, QueryPolicy, RepoConfig, Repository, SortSpec};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, RelationTrait};

use modkit_repo::Include;

pub mod widget {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "widgets")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub created_at: DateTimeUtc,
        pub created_by: Option<i64>,
        pub updated_at: Option<DateTimeUtc>,
        pub updated_by: Option<i64>,
        pub deleted_at: Option<DateTimeUtc>,
        pub deleted_by: Option<i64>,
        pub un_deleted_at: Option<DateTimeUtc>,
        pub un_deleted_by: Option<i64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::part::Entity")]
        Parts,
    }

    impl Related<super::part::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Parts.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod part {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "parts")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub widget_id: i64,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::widget::Entity",
            from = "Column::WidgetId",
            to = "super::widget::Column::Id"
        )]
        Widget,
    }

    impl Related<super::widget::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Widget.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Plain lookup table; deletes are physical.
pub mod tag {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "tags")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        #[sea_orm(unique)]
        pub label: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Composite key `(team_id, user_id)`.
pub mod membership {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "memberships")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub team_id: i64,
        #[sea_orm(primary_key, auto_increment = false)]
        pub user_id: i64,
        pub role: String,
        pub created_at: DateTimeUtc,
        pub deleted_at: Option<DateTimeUtc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl AuditedEntity for widget::Entity {
    fn audit_columns() -> AuditColumns<Self::Column> {
        AuditColumns {
            created_at: widget::Column::CreatedAt,
            created_by: Some(widget::Column::CreatedBy),
            updated_at: Some(widget::Column::UpdatedAt),
            updated_by: Some(widget::Column::UpdatedBy),
            deleted_at: Some(widget::Column::DeletedAt),
            deleted_by: Some(widget::Column::DeletedBy),
            un_deleted_at: Some(widget::Column::UnDeletedAt),
            un_deleted_by: Some(widget::Column::UnDeletedBy),
        }
    }
}

impl AuditedEntity for tag::Entity {
    const PARANOID: bool = false;

    fn audit_columns() -> AuditColumns<Self::Column> {
        AuditColumns::created_only(tag::Column::CreatedAt)
    }
}

impl AuditedEntity for membership::Entity {
    fn audit_columns() -> AuditColumns<Self::Column> {
        AuditColumns {
            deleted_at: Some(membership::Column::DeletedAt),
            ..AuditColumns::created_only(membership::Column::CreatedAt)
        }
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE widgets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        created_by INTEGER NULL,
        updated_at TEXT NULL,
        updated_by INTEGER NULL,
        deleted_at TEXT NULL,
        deleted_by INTEGER NULL,
        un_deleted_at TEXT NULL,
        un_deleted_by INTEGER NULL
    )",
    "CREATE TABLE parts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        widget_id INTEGER NOT NULL REFERENCES widgets(id),
        name TEXT NOT NULL
    )",
    "CREATE TABLE tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE memberships (
        team_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        created_at TEXT NOT NULL,
        deleted_at TEXT NULL,
        PRIMARY KEY (team_id, user_id)
    )",
];

/// Fresh in-memory database with the test schema.
///
/// One pooled connection: every `sqlite::memory:` connection is its own
/// database.
pub async fn setup_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.expect("connect sqlite");
    for stmt in SCHEMA {
        db.execute_unprepared(stmt).await.expect("create schema");
    }
    db
}

pub fn config() -> RepoConfig {
    RepoConfig::with_max_page_size(200)
}

pub fn parts_include() -> Include {
    Include::new("parts", || widget::Relation::Parts.def())
}

pub fn widget_policy() -> QueryPolicy<widget::Entity> {
    QueryPolicy::builder(&config())
        .sortable("name", widget::Column::Name)
        .default_order(vec![SortSpec::asc("id")])
        .build()
        .unwrap()
}

pub fn widget_repo(db: &DatabaseConnection) -> Repository<widget::Entity> {
    Repository::new(db.clone(), widget_policy()).unwrap()
}

pub fn tag_repo(db: &DatabaseConnection) -> Repository<tag::Entity> {
    let policy = QueryPolicy::builder(&config()).build().unwrap();
    Repository::new(db.clone(), policy).unwrap()
}

pub fn membership_repo(db: &DatabaseConnection) -> Repository<membership::Entity> {
    let policy = QueryPolicy::builder(&config()).build().unwrap();
    Repository::new(db.clone(), policy).unwrap()
}

pub fn new_widget(name: &str) -> widget::ActiveModel {
    widget::ActiveModel {
        name: sea_orm::Set(name.to_owned()),
        ..Default::default()
    }
}

pub fn widget_with_id(id: i64, name: &str) -> widget::ActiveModel {
    widget::ActiveModel {
        id: sea_orm::Set(id),
        name: sea_orm::Set(name.to_owned()),
        ..Default::default()
    }
}

pub async fn add_part(db: &DatabaseConnection, widget_id: i64, name: &str) {
    db.execute_unprepared(&format!(
        "INSERT INTO parts (widget_id, name) VALUES ({widget_id}, '{name}')"
    ))
    .await
    .expect("insert part");
}
