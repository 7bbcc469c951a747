pub const SCHEMA: &str = r#"
-- Parks table: the entities assets hang off. Rows are upserted from the
-- static seed list; id is stable across runs.
CREATE TABLE IF NOT EXISTS parks (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    country TEXT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    biome TEXT,
    established INTEGER,
    area_acres INTEGER,
    summary TEXT,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- Assets table: one row per acquired or synthesized artifact.
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    park_id INTEGER NOT NULL,
    kind TEXT NOT NULL,              -- 'photo', 'satellite', 'curated'
    source TEXT NOT NULL,            -- provider tag or 'synthetic'
    reference TEXT NOT NULL,         -- remote URL or synthetic layer tag
    local_path TEXT,
    placeholder TEXT,                -- inline data URL preview
    width INTEGER,
    height INTEGER,
    attribution TEXT,
    dedup_key TEXT NOT NULL UNIQUE,  -- sha256(park_id | kind | reference)
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (park_id) REFERENCES parks (id)
);

CREATE INDEX IF NOT EXISTS idx_assets_park ON assets(park_id);
CREATE INDEX IF NOT EXISTS idx_assets_kind ON assets(kind);
CREATE INDEX IF NOT EXISTS idx_assets_source ON assets(source);
"#;
