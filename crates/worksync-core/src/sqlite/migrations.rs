#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SqliteMigration {
    pub version: i64,
    pub name: &'static str,
    pub up_sql: &'static str,
    pub down_sql: &'static str,
}

// Column layout matches what the Streamlit app creates on its own startup, so
// either side may initialize the database file first.
const MIGRATION_0001: SqliteMigration = SqliteMigration {
    version: 1,
    name: "initial_workflow_schema",
    up_sql: r#"
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password TEXT,
    role TEXT
);

CREATE TABLE IF NOT EXISTS user_data (
    username TEXT PRIMARY KEY,
    state_json TEXT,
    last_updated TIMESTAMP
);
"#,
    down_sql: r#"
DROP TABLE IF EXISTS user_data;
DROP TABLE IF EXISTS users;
"#,
};

const MIGRATION_0002: SqliteMigration = SqliteMigration {
    version: 2,
    name: "add_user_data_last_updated_index",
    up_sql: r#"
CREATE INDEX IF NOT EXISTS idx_user_data_last_updated
    ON user_data (last_updated DESC);
"#,
    down_sql: r#"
DROP INDEX IF EXISTS idx_user_data_last_updated;
"#,
};

const MIGRATIONS: [SqliteMigration; 2] = [MIGRATION_0001, MIGRATION_0002];

pub fn migrations() -> &'static [SqliteMigration] {
    &MIGRATIONS
}

pub fn migration(version: i64) -> Option<&'static SqliteMigration> {
    MIGRATIONS.iter().find(|entry| entry.version == version)
}

pub fn current_schema_version() -> i64 {
    MIGRATIONS.last().map(|entry| entry.version).unwrap_or(0)
}
