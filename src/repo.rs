use async_trait::async_trait;

use crate::models::*;
use crate::settings::BotSettings;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("duplicate id")] DuplicateId,
    #[error("conflict")] Conflict,
    #[error("storage unavailable: {0}")] StorageUnavailable(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => RepoError::DuplicateId,
            other => RepoError::StorageUnavailable(other.to_string()),
        }
    }
}

/// Persisted collection of reports.
#[async_trait]
pub trait ReportRepo: Send + Sync {
    async fn create_report(&self, report: Report) -> RepoResult<Report>;
    async fn get_report(&self, id: &str) -> RepoResult<Report>;
    /// Unresolved report for the user; most recent `reported_at` wins.
    async fn find_active_by_user(&self, user_id: &str) -> RepoResult<Option<Report>>;
    async fn find_approved_active_by_user(&self, user_id: &str) -> RepoResult<Option<Report>>;
    /// Every record for the user, newest first, dismissed reviews included.
    async fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Report>>;
    async fn update_report(&self, id: &str, patch: ReportPatch) -> RepoResult<Report>;
    // Aggregates below leave dismissed reviews out.
    async fn count_all(&self) -> RepoResult<u64>;
    async fn count_active(&self) -> RepoResult<u64>;
    async fn count_resolved(&self) -> RepoResult<u64>;
    async fn count_approved(&self) -> RepoResult<u64>;
    async fn distinct_reporters(&self) -> RepoResult<u64>;
    /// Distinct targeted users: (all, currently blacklisted, cleared).
    async fn distinct_users(&self) -> RepoResult<(u64, u64, u64)>;
    async fn delete_all(&self) -> RepoResult<u64>;

    async fn stats_snapshot(&self) -> RepoResult<StatsSnapshot> {
        Ok(StatsSnapshot {
            total: self.count_all().await?,
            active: self.count_active().await?,
            resolved: self.count_resolved().await?,
        })
    }
}

pub type SettingsUpdate = Box<dyn FnOnce(&mut BotSettings) + Send>;

/// The single configuration record, stored apart from reports.
#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn get_settings(&self) -> RepoResult<BotSettings>;
    async fn update_settings(&self, f: SettingsUpdate) -> RepoResult<BotSettings>;
}

pub trait Repo: ReportRepo + SettingsRepo {}

impl<T> Repo for T where T: ReportRepo + SettingsRepo {}

#[cfg(feature = "file-store")]
pub mod file {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};
    use std::collections::HashSet;
    use std::fs::{self, File};
    use std::io::{ErrorKind, Write};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock};

    const REPORTS_FILE: &str = "reports.json";
    const SETTINGS_FILE: &str = "settings.json";

    /// JSON-array report store. Every mutation works on a copy, writes it
    /// with temp-file + fsync + rename, and only then swaps it in, so a
    /// failed write leaves both memory and disk on the previous version.
    #[derive(Clone)]
    pub struct FileRepo {
        reports: Arc<RwLock<Vec<Report>>>,
        settings: Arc<RwLock<BotSettings>>,
        dir: Arc<PathBuf>,
    }

    fn poisoned<T>(_: T) -> RepoError {
        RepoError::StorageUnavailable("store lock poisoned".into())
    }

    fn io_err(path: &Path, e: impl std::fmt::Display) -> RepoError {
        RepoError::StorageUnavailable(format!("{}: {e}", path.display()))
    }

    fn load<T: DeserializeOwned + Default>(path: &Path) -> RepoResult<T> {
        match fs::read(path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
            Ok(bytes) => {
                let v = serde_json::from_slice(&bytes).map_err(|e| io_err(path, e))?;
                log::info!("[file-store] loaded '{}'", path.display());
                Ok(v)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("[file-store] no file at '{}', starting empty", path.display());
                Ok(T::default())
            }
            Err(e) => Err(io_err(path, e)),
        }
    }

    fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> RepoResult<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| io_err(path, e))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut f = File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
            f.write_all(&bytes).map_err(|e| io_err(&tmp, e))?;
            f.sync_all().map_err(|e| io_err(&tmp, e))?;
        }
        fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
        // directory entry durability; not every platform supports it
        if let Ok(d) = File::open(dir) {
            let _ = d.sync_all();
        }
        Ok(())
    }

    impl FileRepo {
        pub fn open(dir: impl Into<PathBuf>) -> RepoResult<Self> {
            let dir = dir.into();
            let reports: Vec<Report> = load(&dir.join(REPORTS_FILE))?;
            let settings: BotSettings = load(&dir.join(SETTINGS_FILE))?;
            Ok(Self {
                reports: Arc::new(RwLock::new(reports)),
                settings: Arc::new(RwLock::new(settings)),
                dir: Arc::new(dir),
            })
        }

        pub fn reports_path(&self) -> PathBuf {
            self.dir.join(REPORTS_FILE)
        }

        pub fn settings_path(&self) -> PathBuf {
            self.dir.join(SETTINGS_FILE)
        }

        fn read<R>(&self, f: impl FnOnce(&[Report]) -> R) -> RepoResult<R> {
            let s = self.reports.read().map_err(poisoned)?;
            Ok(f(&s))
        }

        fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Report>) -> RepoResult<R>) -> RepoResult<R> {
            let mut s = self.reports.write().map_err(poisoned)?;
            let mut next = s.clone();
            let out = f(&mut next)?;
            write_atomic(&self.reports_path(), &next)?;
            *s = next;
            Ok(out)
        }

        fn latest_active<'a>(reports: &'a [Report], user_id: &str, approved_only: bool) -> Option<&'a Report> {
            reports
                .iter()
                .filter(|r| r.user_id == user_id && r.is_active() && (!approved_only || r.approved))
                .max_by_key(|r| r.reported_at)
        }
    }

    #[async_trait]
    impl ReportRepo for FileRepo {
        async fn create_report(&self, report: Report) -> RepoResult<Report> {
            self.mutate(|all| {
                if all.iter().any(|r| r.id == report.id) {
                    return Err(RepoError::DuplicateId);
                }
                all.push(report.clone());
                Ok(report)
            })
        }

        async fn get_report(&self, id: &str) -> RepoResult<Report> {
            self.read(|all| all.iter().find(|r| r.id == id).cloned())?
                .ok_or(RepoError::NotFound)
        }

        async fn find_active_by_user(&self, user_id: &str) -> RepoResult<Option<Report>> {
            self.read(|all| Self::latest_active(all, user_id, false).cloned())
        }

        async fn find_approved_active_by_user(&self, user_id: &str) -> RepoResult<Option<Report>> {
            self.read(|all| Self::latest_active(all, user_id, true).cloned())
        }

        async fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Report>> {
            self.read(|all| {
                let mut v: Vec<_> = all.iter().filter(|r| r.user_id == user_id).cloned().collect();
                v.sort_by(|a, b| b.reported_at.cmp(&a.reported_at)); // latest first
                v
            })
        }

        async fn update_report(&self, id: &str, patch: ReportPatch) -> RepoResult<Report> {
            self.mutate(|all| {
                let r = all.iter_mut().find(|r| r.id == id).ok_or(RepoError::NotFound)?;
                if !patch.preconditions_hold(r) {
                    return Err(RepoError::Conflict);
                }
                patch.apply(r);
                Ok(r.clone())
            })
        }

        async fn count_all(&self) -> RepoResult<u64> {
            self.read(|all| all.iter().filter(|r| !r.dismissed).count() as u64)
        }

        async fn count_active(&self) -> RepoResult<u64> {
            self.read(|all| all.iter().filter(|r| r.is_active()).count() as u64)
        }

        async fn count_resolved(&self) -> RepoResult<u64> {
            self.read(|all| all.iter().filter(|r| r.unblacklisted).count() as u64)
        }

        async fn count_approved(&self) -> RepoResult<u64> {
            self.read(|all| all.iter().filter(|r| r.approved).count() as u64)
        }

        async fn distinct_reporters(&self) -> RepoResult<u64> {
            self.read(|all| {
                all.iter().filter(|r| !r.dismissed).map(|r| r.reported_by.as_str()).collect::<HashSet<_>>().len() as u64
            })
        }

        async fn distinct_users(&self) -> RepoResult<(u64, u64, u64)> {
            self.read(|all| {
                let users = |f: &dyn Fn(&Report) -> bool| {
                    all.iter().filter(|r| f(r)).map(|r| r.user_id.as_str()).collect::<HashSet<_>>().len() as u64
                };
                (users(&|r| !r.dismissed), users(&|r| r.is_active()), users(&|r| r.unblacklisted))
            })
        }

        async fn delete_all(&self) -> RepoResult<u64> {
            self.mutate(|all| {
                let n = all.len() as u64;
                all.clear();
                Ok(n)
            })
        }
    }

    #[async_trait]
    impl SettingsRepo for FileRepo {
        async fn get_settings(&self) -> RepoResult<BotSettings> {
            Ok(self.settings.read().map_err(poisoned)?.clone())
        }

        async fn update_settings(&self, f: SettingsUpdate) -> RepoResult<BotSettings> {
            let mut s = self.settings.write().map_err(poisoned)?;
            let mut next = s.clone();
            f(&mut next);
            write_atomic(&self.settings_path(), &next)?;
            *s = next.clone();
            Ok(next)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use chrono::{DateTime, Utc};
    use sqlx::types::Json;
    use sqlx::{Pool, Postgres};

    const COLUMNS: &str = "id, user_id, reason, proof, server, reported_by, reported_at, \
        rendered_message_ref, review_message_ref, user_tag, source, unblacklisted, \
        unblacklisted_by, unblacklisted_at, approved, dismissed, dismissed_by, dismissed_at, \
        edits, last_edited_by, last_edited_at";

    #[derive(sqlx::FromRow)]
    struct ReportRow {
        id: String,
        user_id: String,
        reason: String,
        proof: Option<String>,
        server: String,
        reported_by: String,
        reported_at: DateTime<Utc>,
        rendered_message_ref: Option<String>,
        review_message_ref: Option<String>,
        user_tag: Option<String>,
        source: String,
        unblacklisted: bool,
        unblacklisted_by: Option<String>,
        unblacklisted_at: Option<DateTime<Utc>>,
        approved: bool,
        dismissed: bool,
        dismissed_by: Option<String>,
        dismissed_at: Option<DateTime<Utc>>,
        edits: Json<Vec<EditRecord>>,
        last_edited_by: Option<String>,
        last_edited_at: Option<DateTime<Utc>>,
    }

    fn source_str(s: ReportSource) -> &'static str {
        match s {
            ReportSource::Direct => "direct",
            ReportSource::StaffReview => "staffReview",
        }
    }

    impl From<ReportRow> for Report {
        fn from(r: ReportRow) -> Self {
            Report {
                id: r.id,
                user_id: r.user_id,
                reason: r.reason,
                proof: r.proof,
                server: r.server,
                reported_by: r.reported_by,
                reported_at: r.reported_at,
                rendered_message_ref: r.rendered_message_ref,
                review_message_ref: r.review_message_ref,
                user_tag: r.user_tag,
                source: if r.source == "staffReview" { ReportSource::StaffReview } else { ReportSource::Direct },
                unblacklisted: r.unblacklisted,
                unblacklisted_by: r.unblacklisted_by,
                unblacklisted_at: r.unblacklisted_at,
                approved: r.approved,
                dismissed: r.dismissed,
                dismissed_by: r.dismissed_by,
                dismissed_at: r.dismissed_at,
                edits: r.edits.0,
                last_edited_by: r.last_edited_by,
                last_edited_at: r.last_edited_at,
            }
        }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub fn pool(&self) -> &Pool<Postgres> { &self.pool }

        pub async fn migrate(&self) -> RepoResult<()> {
            sqlx::migrate!("./migrations")
                .run(&self.pool)
                .await
                .map_err(|e| RepoError::StorageUnavailable(e.to_string()))
        }

        async fn count(&self, sql: &str) -> RepoResult<u64> {
            let n: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
            Ok(n.max(0) as u64)
        }

        async fn latest_active(&self, user_id: &str, approved_only: bool) -> RepoResult<Option<Report>> {
            let sql = format!(
                "SELECT {COLUMNS} FROM reports WHERE user_id = $1 AND unblacklisted = FALSE \
                 AND dismissed = FALSE AND ($2 = FALSE OR approved = TRUE) ORDER BY reported_at DESC LIMIT 1"
            );
            let row = sqlx::query_as::<_, ReportRow>(&sql)
                .bind(user_id)
                .bind(approved_only)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(Report::from))
        }
    }

    #[async_trait]
    impl ReportRepo for PgRepo {
        async fn create_report(&self, r: Report) -> RepoResult<Report> {
            let sql = format!(
                "INSERT INTO reports ({COLUMNS}) VALUES \
                 ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21)"
            );
            sqlx::query(&sql)
                .bind(&r.id)
                .bind(&r.user_id)
                .bind(&r.reason)
                .bind(&r.proof)
                .bind(&r.server)
                .bind(&r.reported_by)
                .bind(r.reported_at)
                .bind(&r.rendered_message_ref)
                .bind(&r.review_message_ref)
                .bind(&r.user_tag)
                .bind(source_str(r.source))
                .bind(r.unblacklisted)
                .bind(&r.unblacklisted_by)
                .bind(r.unblacklisted_at)
                .bind(r.approved)
                .bind(r.dismissed)
                .bind(&r.dismissed_by)
                .bind(r.dismissed_at)
                .bind(Json(&r.edits))
                .bind(&r.last_edited_by)
                .bind(r.last_edited_at)
                .execute(&self.pool)
                .await?;
            Ok(r)
        }

        async fn get_report(&self, id: &str) -> RepoResult<Report> {
            let sql = format!("SELECT {COLUMNS} FROM reports WHERE id = $1");
            let row = sqlx::query_as::<_, ReportRow>(&sql).bind(id).fetch_one(&self.pool).await?;
            Ok(row.into())
        }

        async fn find_active_by_user(&self, user_id: &str) -> RepoResult<Option<Report>> {
            self.latest_active(user_id, false).await
        }

        async fn find_approved_active_by_user(&self, user_id: &str) -> RepoResult<Option<Report>> {
            self.latest_active(user_id, true).await
        }

        async fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Report>> {
            let sql = format!("SELECT {COLUMNS} FROM reports WHERE user_id = $1 ORDER BY reported_at DESC");
            let rows = sqlx::query_as::<_, ReportRow>(&sql).bind(user_id).fetch_all(&self.pool).await?;
            Ok(rows.into_iter().map(Report::from).collect())
        }

        async fn update_report(&self, id: &str, patch: ReportPatch) -> RepoResult<Report> {
            let mut tx = self.pool.begin().await?;
            let sql = format!("SELECT {COLUMNS} FROM reports WHERE id = $1 FOR UPDATE");
            let mut report: Report = sqlx::query_as::<_, ReportRow>(&sql)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepoError::NotFound)?
                .into();
            if !patch.preconditions_hold(&report) {
                return Err(RepoError::Conflict); // tx rolls back on drop
            }
            patch.apply(&mut report);
            sqlx::query(
                "UPDATE reports SET reason=$2, proof=$3, approved=$4, unblacklisted=$5, \
                 unblacklisted_by=$6, unblacklisted_at=$7, edits=$8, last_edited_by=$9, \
                 last_edited_at=$10, rendered_message_ref=$11, review_message_ref=$12, \
                 dismissed=$13, dismissed_by=$14, dismissed_at=$15 WHERE id=$1",
            )
            .bind(&report.id)
            .bind(&report.reason)
            .bind(&report.proof)
            .bind(report.approved)
            .bind(report.unblacklisted)
            .bind(&report.unblacklisted_by)
            .bind(report.unblacklisted_at)
            .bind(Json(&report.edits))
            .bind(&report.last_edited_by)
            .bind(report.last_edited_at)
            .bind(&report.rendered_message_ref)
            .bind(&report.review_message_ref)
            .bind(report.dismissed)
            .bind(&report.dismissed_by)
            .bind(report.dismissed_at)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(report)
        }

        async fn count_all(&self) -> RepoResult<u64> {
            self.count("SELECT COUNT(*) FROM reports WHERE dismissed = FALSE").await
        }

        async fn count_active(&self) -> RepoResult<u64> {
            self.count("SELECT COUNT(*) FROM reports WHERE unblacklisted = FALSE AND dismissed = FALSE").await
        }

        async fn count_resolved(&self) -> RepoResult<u64> {
            self.count("SELECT COUNT(*) FROM reports WHERE unblacklisted = TRUE").await
        }

        async fn count_approved(&self) -> RepoResult<u64> {
            self.count("SELECT COUNT(*) FROM reports WHERE approved = TRUE").await
        }

        async fn distinct_reporters(&self) -> RepoResult<u64> {
            self.count("SELECT COUNT(DISTINCT reported_by) FROM reports WHERE dismissed = FALSE").await
        }

        async fn distinct_users(&self) -> RepoResult<(u64, u64, u64)> {
            let (all, active, cleared): (i64, i64, i64) = sqlx::query_as(
                "SELECT COUNT(DISTINCT user_id), \
                        COUNT(DISTINCT user_id) FILTER (WHERE unblacklisted = FALSE), \
                        COUNT(DISTINCT user_id) FILTER (WHERE unblacklisted = TRUE) \
                 FROM reports WHERE dismissed = FALSE",
            )
            .fetch_one(&self.pool)
            .await?;
            Ok((all.max(0) as u64, active.max(0) as u64, cleared.max(0) as u64))
        }

        async fn delete_all(&self) -> RepoResult<u64> {
            let res = sqlx::query("DELETE FROM reports").execute(&self.pool).await?;
            Ok(res.rows_affected())
        }
    }

    #[async_trait]
    impl SettingsRepo for PgRepo {
        async fn get_settings(&self) -> RepoResult<BotSettings> {
            let row: Option<Json<BotSettings>> =
                sqlx::query_scalar("SELECT data FROM bot_settings WHERE id = 1")
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.map(|j| j.0).unwrap_or_default())
        }

        async fn update_settings(&self, f: SettingsUpdate) -> RepoResult<BotSettings> {
            let mut tx = self.pool.begin().await?;
            sqlx::query("INSERT INTO bot_settings (id, data) VALUES (1, '{}'::jsonb) ON CONFLICT (id) DO NOTHING")
                .execute(&mut *tx)
                .await?;
            let Json(mut settings): Json<BotSettings> =
                sqlx::query_scalar("SELECT data FROM bot_settings WHERE id = 1 FOR UPDATE")
                    .fetch_one(&mut *tx)
                    .await?;
            f(&mut settings);
            sqlx::query("UPDATE bot_settings SET data = $1 WHERE id = 1")
                .bind(Json(&settings))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(settings)
        }
    }
}
