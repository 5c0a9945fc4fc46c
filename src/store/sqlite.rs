use super::types::{apply_patch, AssetPatch, BulkOutcome, Program, Store, StoreResult};
use crate::engine::{Asset, AssetKind, DomainRecord, IpRecord, UrlRecord};
use crate::error::StoreError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

/// SQLite backed store. List-valued columns hold JSON arrays.
pub struct SqliteStore {
    db_path: String,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &str) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(db_path, conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(":memory:", Connection::open_in_memory()?)
    }

    fn with_connection(db_path: &str, conn: Connection) -> StoreResult<Self> {
        let store = Self {
            db_path: db_path.to_string(),
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".to_string()))
    }

    fn initialize(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS programs (
                name TEXT PRIMARY KEY,
                disabled INTEGER NOT NULL DEFAULT 0,
                inscope TEXT NOT NULL DEFAULT '[]',
                outscope TEXT NOT NULL DEFAULT '[]',
                blacklist TEXT NOT NULL DEFAULT '[]'
            );
            CREATE TABLE IF NOT EXISTS domains (
                hostname TEXT PRIMARY KEY,
                ips TEXT NOT NULL,
                source TEXT,
                program TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS ips (
                address TEXT PRIMARY KEY,
                domains TEXT NOT NULL,
                source TEXT,
                program TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS urls (
                url TEXT PRIMARY KEY,
                hostname TEXT NOT NULL,
                port INTEGER NOT NULL,
                status INTEGER,
                content_length INTEGER,
                query TEXT NOT NULL,
                source TEXT,
                program TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_domains_program ON domains(program);
            CREATE INDEX IF NOT EXISTS idx_ips_program ON ips(program);
            CREATE INDEX IF NOT EXISTS idx_urls_program ON urls(program);
            CREATE INDEX IF NOT EXISTS idx_urls_hostname ON urls(hostname);",
        )?;

        info!("SQLite store initialized at {}", self.db_path);
        Ok(())
    }
}

fn table_for(kind: AssetKind) -> (&'static str, &'static str) {
    match kind {
        AssetKind::Domain => ("domains", "hostname"),
        AssetKind::Ip => ("ips", "address"),
        AssetKind::Url => ("urls", "url"),
    }
}

fn to_json(values: &[String]) -> StoreResult<String> {
    Ok(serde_json::to_string(values)?)
}

fn from_json(text: &str) -> StoreResult<Vec<String>> {
    Ok(serde_json::from_str(text)?)
}

fn require_program(conn: &Connection, name: &str) -> StoreResult<()> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM programs WHERE name = ?1", [name], |r| r.get(0))
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::ProgramNotFound(name.to_string())),
    }
}

fn read_program(row: &Row<'_>) -> rusqlite::Result<(String, bool, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get::<_, i64>(1)? != 0,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn insert_asset(
    tx: &Transaction<'_>,
    asset: &Asset,
    program: &str,
    source: Option<&str>,
) -> StoreResult<bool> {
    let inserted = match asset {
        Asset::Domain(d) => tx.execute(
            "INSERT OR IGNORE INTO domains (hostname, ips, source, program) VALUES (?1, ?2, ?3, ?4)",
            params![d.hostname, to_json(&d.ips)?, source, program],
        )?,
        Asset::Ip(ip) => tx.execute(
            "INSERT OR IGNORE INTO ips (address, domains, source, program) VALUES (?1, ?2, ?3, ?4)",
            params![ip.address, to_json(&ip.domains)?, source, program],
        )?,
        Asset::Url(u) => tx.execute(
            "INSERT OR IGNORE INTO urls (url, hostname, port, status, content_length, query, source, program)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                u.url,
                u.hostname,
                u.port,
                u.status,
                u.content_length.map(|l| l as i64),
                to_json(&u.query)?,
                source,
                program
            ],
        )?,
    };
    Ok(inserted > 0)
}

fn load_asset(tx: &Transaction<'_>, kind: AssetKind, key: &str) -> StoreResult<Option<Asset>> {
    let asset = match kind {
        AssetKind::Domain => tx
            .query_row(
                "SELECT ips FROM domains WHERE hostname = ?1",
                [key],
                |r| r.get::<_, String>(0),
            )
            .optional()?
            .map(|ips| -> StoreResult<Asset> {
                Ok(Asset::Domain(DomainRecord {
                    hostname: key.to_string(),
                    ips: from_json(&ips)?,
                }))
            })
            .transpose()?,
        AssetKind::Ip => tx
            .query_row(
                "SELECT domains FROM ips WHERE address = ?1",
                [key],
                |r| r.get::<_, String>(0),
            )
            .optional()?
            .map(|domains| -> StoreResult<Asset> {
                Ok(Asset::Ip(IpRecord {
                    address: key.to_string(),
                    domains: from_json(&domains)?,
                }))
            })
            .transpose()?,
        AssetKind::Url => tx
            .query_row(
                "SELECT hostname, port, status, content_length, query FROM urls WHERE url = ?1",
                [key],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, u16>(1)?,
                        r.get::<_, Option<u16>>(2)?,
                        r.get::<_, Option<i64>>(3)?,
                        r.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?
            .map(|(hostname, port, status, length, query)| -> StoreResult<Asset> {
                Ok(Asset::Url(UrlRecord {
                    url: key.to_string(),
                    hostname,
                    port,
                    status,
                    content_length: length.map(|l| l as u64),
                    query: from_json(&query)?,
                }))
            })
            .transpose()?,
    };
    Ok(asset)
}

fn save_asset(tx: &Transaction<'_>, asset: &Asset) -> StoreResult<()> {
    match asset {
        Asset::Domain(d) => tx.execute(
            "UPDATE domains SET ips = ?2 WHERE hostname = ?1",
            params![d.hostname, to_json(&d.ips)?],
        )?,
        Asset::Ip(ip) => tx.execute(
            "UPDATE ips SET domains = ?2 WHERE address = ?1",
            params![ip.address, to_json(&ip.domains)?],
        )?,
        Asset::Url(u) => tx.execute(
            "UPDATE urls SET hostname = ?2, port = ?3, status = ?4, content_length = ?5, query = ?6
             WHERE url = ?1",
            params![
                u.url,
                u.hostname,
                u.port,
                u.status,
                u.content_length.map(|l| l as i64),
                to_json(&u.query)?
            ],
        )?,
    };
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_program(&self, name: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO programs (name) VALUES (?1)",
            [name],
        )?;
        if inserted == 0 {
            return Err(StoreError::ProgramExists(name.to_string()));
        }
        Ok(())
    }

    async fn list_programs(&self, include_disabled: bool) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT name FROM programs WHERE disabled = 0 OR ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map([include_disabled], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn set_program_disabled(&self, name: &str, disabled: bool) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE programs SET disabled = ?2 WHERE name = ?1",
            params![name, disabled],
        )?;
        if changed == 0 {
            return Err(StoreError::ProgramNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn all_programs(&self) -> StoreResult<Vec<Program>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT name, disabled, inscope, outscope, blacklist FROM programs ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], read_program)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(name, disabled, inscope, outscope, blacklist)| {
                Ok(Program {
                    name,
                    disabled,
                    inscope: from_json(&inscope)?,
                    outscope: from_json(&outscope)?,
                    blacklist: from_json(&blacklist)?,
                })
            })
            .collect()
    }

    async fn get_program_scope(&self, program: &str) -> StoreResult<(Vec<String>, Vec<String>)> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT inscope, outscope FROM programs WHERE name = ?1",
                [program],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let (inscope, outscope) =
            row.ok_or_else(|| StoreError::ProgramNotFound(program.to_string()))?;
        Ok((from_json(&inscope)?, from_json(&outscope)?))
    }

    async fn get_program_blacklist(&self, program: &str) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let blacklist: Option<String> = conn
            .query_row(
                "SELECT blacklist FROM programs WHERE name = ?1",
                [program],
                |r| r.get(0),
            )
            .optional()?;
        let blacklist =
            blacklist.ok_or_else(|| StoreError::ProgramNotFound(program.to_string()))?;
        from_json(&blacklist)
    }

    async fn update_program_scope(
        &self,
        program: &str,
        inscope: &[String],
        outscope: &[String],
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE programs SET inscope = ?2, outscope = ?3 WHERE name = ?1",
            params![program, to_json(inscope)?, to_json(outscope)?],
        )?;
        if changed == 0 {
            return Err(StoreError::ProgramNotFound(program.to_string()));
        }
        Ok(())
    }

    async fn update_program_blacklist(
        &self,
        program: &str,
        blacklist: &[String],
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE programs SET blacklist = ?2 WHERE name = ?1",
            params![program, to_json(blacklist)?],
        )?;
        if changed == 0 {
            return Err(StoreError::ProgramNotFound(program.to_string()));
        }
        Ok(())
    }

    async fn bulk_create(
        &self,
        records: Vec<Asset>,
        program: &str,
        source: Option<&str>,
    ) -> StoreResult<BulkOutcome> {
        let mut conn = self.conn()?;
        require_program(&conn, program)?;

        let tx = conn.transaction()?;
        let mut outcome = BulkOutcome::default();
        for asset in &records {
            if insert_asset(&tx, asset, program, source)? {
                outcome.created.push(asset.key().to_string());
            } else {
                outcome.failed.push(asset.key().to_string());
            }
        }
        tx.commit()?;
        Ok(outcome)
    }

    async fn bulk_update(
        &self,
        kind: AssetKind,
        patches: Vec<(String, AssetPatch)>,
    ) -> StoreResult<Vec<String>> {
        let mut conn = self.conn()?;
        let (table, key_column) = table_for(kind);
        let delete_sql = format!("DELETE FROM {} WHERE {} = ?1", table, key_column);

        let tx = conn.transaction()?;
        let mut updated = Vec::new();
        for (key, patch) in patches {
            let changed = match patch {
                AssetPatch::Delete => tx.execute(&delete_sql, [&key])? > 0,
                patch => match load_asset(&tx, kind, &key)? {
                    Some(mut asset) => {
                        let applied = apply_patch(&mut asset, patch);
                        if applied {
                            save_asset(&tx, &asset)?;
                        }
                        applied
                    }
                    None => false,
                },
            };
            if changed {
                updated.push(key);
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    async fn list_assets(
        &self,
        kind: AssetKind,
        program: Option<&str>,
    ) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let (table, key_column) = table_for(kind);
        let sql = format!(
            "SELECT {key} FROM {table} WHERE ?1 IS NULL OR program = ?1 ORDER BY {key}",
            key = key_column,
            table = table
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map([program], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn list_urls_by_hostname(&self, hostname: &str) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare_cached("SELECT url FROM urls WHERE hostname = ?1 ORDER BY url")?;
        let rows = stmt.query_map([hostname], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_program_scope_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_program("acme").await.unwrap();

        let inscope = vec!["*.acme.com".to_string()];
        let outscope = vec!["vpn.acme.com".to_string()];
        store
            .update_program_scope("acme", &inscope, &outscope)
            .await
            .unwrap();

        assert_eq!(
            store.get_program_scope("acme").await.unwrap(),
            (inscope, outscope)
        );
        assert!(store.get_program_blacklist("acme").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.get_program_scope("ghost").await,
            Err(StoreError::ProgramNotFound(_))
        ));
        assert!(matches!(
            store.set_program_disabled("ghost", true).await,
            Err(StoreError::ProgramNotFound(_))
        ));
        assert!(matches!(
            store.bulk_create(vec![], "ghost", None).await,
            Err(StoreError::ProgramNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_url_merge_patch() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_program("acme").await.unwrap();

        let record = UrlRecord {
            url: "https://www.acme.com/login".to_string(),
            hostname: "www.acme.com".to_string(),
            port: 443,
            status: Some(200),
            content_length: Some(512),
            query: vec!["a=1".to_string()],
        };
        store
            .bulk_create(vec![Asset::Url(record.clone())], "acme", Some("crawler"))
            .await
            .unwrap();

        let update = UrlRecord {
            status: None,
            content_length: None,
            query: vec!["b=2".to_string(), "a=1".to_string()],
            ..record.clone()
        };
        let updated = store
            .bulk_update(
                AssetKind::Url,
                vec![(record.url.clone(), AssetPatch::MergeUrl(update))],
            )
            .await
            .unwrap();
        assert_eq!(updated, vec![record.url.clone()]);

        let conn = store.conn().unwrap();
        let (status, query): (Option<u16>, String) = conn
            .query_row(
                "SELECT status, query FROM urls WHERE url = ?1",
                [&record.url],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, Some(200));
        assert_eq!(query, r#"["a=1","b=2"]"#);
    }
}
