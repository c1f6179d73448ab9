//! End-to-end tests: definitions -> snapshot -> diff -> SQL.

use tern_core::prelude::*;

fn users_v1() -> TableDefinition {
    TableDefinition::new("users")
        .column(ColumnDefinition::new("id", "uuid").primary_key())
        .column(ColumnDefinition::new("email", "text").unique())
        .column(ColumnDefinition::new("name", "text"))
}

fn users_v2() -> TableDefinition {
    TableDefinition::new("users")
        .column(ColumnDefinition::new("id", "uuid").primary_key())
        .column(ColumnDefinition::new("email", "text").unique())
        .column(ColumnDefinition::new("fullName", "text"))
        .column(ColumnDefinition::new("role", "user_role").default("'member'"))
        .column(
            ColumnDefinition::new("createdAt", "timestamp")
                .default(POSTGRES.current_timestamp()),
        )
        .index(["createdAt"])
}

fn posts() -> TableDefinition {
    TableDefinition::new("posts")
        .column(ColumnDefinition::new("id", "serial").primary_key())
        .column(ColumnDefinition::new("authorId", "uuid").references("users", "id"))
        .column(ColumnDefinition::new("title", "text"))
}

#[test]
fn first_migration_creates_the_users_table() {
    let before = Snapshot::new();
    let after = create_snapshot(&[users_v1()], &[]);

    let diff = compute_diff(&before, &after);
    assert_eq!(
        diff.changes,
        vec![DiffChange::TableAdded {
            table: "users".into()
        }]
    );

    let sql = generate_migration_sql(&diff.changes, &SqlContext::new(&before, &after), &DEFAULT_DIALECT);
    assert!(sql.contains("CREATE TABLE \"users\""));
    assert!(sql.contains("\"id\" uuid NOT NULL"));
    assert!(sql.contains("PRIMARY KEY (\"id\")"));
    assert!(sql.contains("\"email\" text NOT NULL UNIQUE"));
}

#[test]
fn second_migration_renames_and_extends() {
    let v1 = create_snapshot(&[users_v1()], &[]);
    let v2 = create_snapshot(
        &[users_v2(), posts()],
        &[EnumDefinition::new("user_role", ["admin", "member"])],
    );

    let diff = compute_diff(&v1, &v2);
    let kinds: Vec<&str> = diff.changes.iter().map(DiffChange::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "table_added",
            "column_renamed",
            "column_added",
            "column_added",
            "index_added",
            "enum_added",
        ]
    );

    let ctx = SqlContext::new(&v1, &v2);
    let pg = generate_migration_sql(&diff.changes, &ctx, &POSTGRES);
    let statements: Vec<&str> = pg.split("\n\n").collect();
    assert!(statements[0].starts_with("CREATE TYPE \"user_role\""));
    assert!(statements[1].starts_with("CREATE TABLE \"posts\""));
    assert!(pg.contains("\"id\" serial NOT NULL"));
    assert!(pg.contains("FOREIGN KEY (\"author_id\") REFERENCES \"users\" (\"id\")"));
    assert!(pg.contains("RENAME COLUMN \"name\" TO \"full_name\""));
    assert!(pg.contains("ADD COLUMN \"created_at\" timestamp with time zone NOT NULL DEFAULT now()"));
    assert!(pg.contains("ADD COLUMN \"role\" \"user_role\" NOT NULL DEFAULT 'member'"));
    assert!(pg.contains("CREATE INDEX \"idx_users_created_at\" ON \"users\" (\"created_at\")"));

    let rollback = generate_rollback_sql(&diff.changes, &ctx, &POSTGRES);
    let undo: Vec<&str> = rollback.split("\n\n").collect();
    assert_eq!(
        undo,
        vec![
            "DROP INDEX \"idx_users_created_at\";",
            "ALTER TABLE \"users\" DROP COLUMN \"role\";",
            "ALTER TABLE \"users\" DROP COLUMN \"created_at\";",
            "ALTER TABLE \"users\" RENAME COLUMN \"full_name\" TO \"name\";",
            "DROP TABLE \"posts\";",
            "DROP TYPE \"user_role\";",
        ]
    );
}

#[test]
fn dialects_diverge_on_the_same_change_list() {
    let before = Snapshot::new();
    let after = create_snapshot(&[posts(), users_v2()], &[EnumDefinition::new("user_role", ["admin", "member"])]);
    let diff = compute_diff(&before, &after);
    let ctx = SqlContext::new(&before, &after);

    let pg = generate_migration_sql(&diff.changes, &ctx, &POSTGRES);
    let lite = generate_migration_sql(&diff.changes, &ctx, &SQLITE);

    assert!(pg.contains("timestamp with time zone"));
    assert!(pg.contains("CREATE TYPE"));
    assert!(!lite.contains("timestamp with time zone"));
    assert!(!lite.contains("CREATE TYPE"));
    assert!(lite.contains("\"created_at\" TEXT NOT NULL"));
    assert!(lite.contains("\"id\" INTEGER NOT NULL"));
    assert!(lite.contains("CHECK(\"role\" IN ('admin', 'member'))"));

    assert_eq!(POSTGRES.auto_increment_primary_key(), "serial PRIMARY KEY");
    assert_eq!(POSTGRES.current_timestamp(), "now()");
    assert_eq!(SQLITE.auto_increment_primary_key(), "INTEGER PRIMARY KEY AUTOINCREMENT");
    assert!(SQLITE.current_timestamp().contains("datetime('now')"));
}

#[test]
fn snapshot_survives_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let snapshot = create_snapshot(
        &[users_v2(), posts()],
        &[EnumDefinition::new("user_role", ["admin", "member"])],
    );

    write_snapshot(&path, &snapshot).unwrap();
    let restored = read_snapshot(&path).unwrap().unwrap();
    assert_eq!(restored, snapshot);
    assert!(compute_diff(&restored, &snapshot).is_empty());
}
