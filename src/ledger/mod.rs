//! The ledger is the history of completed katas: a JSON object mapping a kata name to the moments
//! it was done.
//!
//! ```json
//! {
//!   "bcounter": ["2024-03-02T18:11:54.204Z", "2024-03-09T07:40:12.001Z"]
//! }
//! ```
//!
//! The whole map is read once and written back in full after a change. History for katas that are
//! no longer in the catalog is kept untouched.

use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, info};

use crate::{catalog::Kata, error::KataError};

/// Completing the same kata twice within this window is probably a mistake.
pub const REDO_CONFIRMATION_WINDOW: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    completions: BTreeMap<String, Vec<DateTime<Utc>>>,
}

impl Ledger {
    pub fn completions(&self, name: &str) -> &[DateTime<Utc>] {
        self.completions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.completions.is_empty()
    }

    /// Fills [Kata::completions] from the ledger. Katas without history get an empty sequence.
    pub fn merge(&self, katas: &mut [Kata]) {
        for kata in katas {
            kata.completions = self.completions(&kata.name).to_vec();
        }
    }

    /// Appends `now` to the history of `name`. Only katas from `visible` may be recorded.
    pub fn record(
        &mut self,
        visible: &[Kata],
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), KataError> {
        if !visible.iter().any(|k| k.name == name) {
            return Err(KataError::UnknownKata(name.to_string()));
        }
        self.completions.entry(name.to_string()).or_default().push(now);
        Ok(())
    }
}

#[cfg(test)]
impl From<BTreeMap<String, Vec<DateTime<Utc>>>> for Ledger {
    fn from(completions: BTreeMap<String, Vec<DateTime<Utc>>>) -> Self {
        Self { completions }
    }
}

/// The most recent moment in `completions`, which aren't guaranteed to be sorted. `None` means
/// never.
pub fn last_completion(completions: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    completions.iter().max().copied()
}

/// Whether recording now would repeat a completion from a few minutes ago.
pub fn needs_confirmation(completions: &[DateTime<Utc>], now: DateTime<Utc>) -> bool {
    last_completion(completions).is_some_and(|last| now - last < REDO_CONFIRMATION_WINDOW)
}

/// Ledger file on disk.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self) -> impl FnOnce(std::io::Error) -> KataError + '_ {
        move |source| KataError::LedgerIo {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads the ledger. A missing or empty file is an empty ledger, and a `null` history is an
    /// empty one.
    pub async fn load(&self) -> Result<Ledger, KataError> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger at {:?}", self.path);
                return Ok(Ledger::default());
            }
            Err(e) => return Err(self.io_error()(e)),
        };

        file.lock_shared().map_err(self.io_error())?;
        let mut data = String::new();
        let read = file.read_to_string(&mut data).await;
        file.unlock_async().await.map_err(self.io_error())?;
        read.map_err(self.io_error())?;

        if data.trim().is_empty() {
            return Ok(Ledger::default());
        }

        let stored: BTreeMap<String, Option<Vec<DateTime<Utc>>>> = serde_json::from_str(&data)
            .map_err(|source| KataError::LedgerParse {
                path: self.path.clone(),
                source,
            })?;
        let completions = stored
            .into_iter()
            .map(|(name, history)| (name, history.unwrap_or_default()))
            .collect();
        Ok(Ledger { completions })
    }

    /// Replaces the file's content with the whole ledger.
    pub async fn persist(&self, ledger: &Ledger) -> Result<(), KataError> {
        let data = serde_json::to_vec_pretty(&ledger.completions).map_err(|source| {
            KataError::LedgerSerialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut file = self.open_for_write().await?;

        file.lock_exclusive().map_err(self.io_error())?;
        let result = Self::write_snapshot(&mut file, &data).await;
        file.unlock_async().await.map_err(self.io_error())?;
        result.map_err(self.io_error())?;

        debug!("Persisted ledger to {:?}", self.path);
        Ok(())
    }

    /// Records a completion and persists the ledger, creating the file if it doesn't exist yet.
    /// Nothing is touched on disk when `name` isn't visible.
    pub async fn record(
        &self,
        ledger: &mut Ledger,
        visible: &[Kata],
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), KataError> {
        ledger.record(visible, name, now)?;
        self.persist(ledger).await?;
        info!("Recorded {name} as done at {now}");
        Ok(())
    }

    async fn open_for_write(&self) -> Result<File, KataError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(self.io_error())?;
        }
        File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await
            .map_err(self.io_error())
    }

    // Truncation happens under the lock, so readers never see a half-cleared file from us.
    async fn write_snapshot(file: &mut File, data: &[u8]) -> std::io::Result<()> {
        file.set_len(0).await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{catalog::Kata, error::KataError};

    use super::{last_completion, needs_confirmation, Ledger, LedgerFile};

    fn moment(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()
    }

    fn katas(names: &[&str]) -> Vec<Kata> {
        names
            .iter()
            .map(|name| Kata::new(*name, format!("https://example.com/{name}.git")))
            .collect()
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let ledger = LedgerFile::new(dir.path().join("missing.json")).load().await?;
        assert!(ledger.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_empty_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("done.json");
        fs::write(&path, "")?;
        let ledger = LedgerFile::new(&path).load().await?;
        assert!(ledger.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_malformed_file_names_path() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("done.json");
        fs::write(&path, r#"{"bcounter": "yesterday"}"#)?;

        let error = LedgerFile::new(&path).load().await.unwrap_err();

        assert!(matches!(&error, KataError::LedgerParse { path: p, .. } if *p == path));
        assert!(error.to_string().contains("done.json"));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_null_history_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("done.json");
        fs::write(&path, r#"{"x": null, "y": ["2024-03-01T10:00:00Z"]}"#)?;

        let file = LedgerFile::new(&path);
        let mut ledger = file.load().await?;

        assert!(ledger.completions("x").is_empty());
        assert_eq!(ledger.completions("y"), &[moment(1)]);

        file.record(&mut ledger, &katas(&["x"]), "x", moment(2))
            .await?;
        let stored: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(
            stored,
            serde_json::json!({
                "x": ["2024-03-02T10:00:00Z"],
                "y": ["2024-03-01T10:00:00Z"],
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_load_accepts_offsets() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("done.json");
        fs::write(
            &path,
            r#"{"clock": ["2024-03-02T20:11:54.204+02:00", "2024-03-03T07:00:00Z"]}"#,
        )?;

        let ledger = LedgerFile::new(&path).load().await?;

        assert_eq!(
            ledger.completions("clock"),
            &[
                Utc.with_ymd_and_hms(2024, 3, 2, 18, 11, 54).unwrap()
                    + Duration::milliseconds(204),
                Utc.with_ymd_and_hms(2024, 3, 3, 7, 0, 0).unwrap(),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_record_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let file = LedgerFile::new(dir.path().join("nested/done.json"));
        let visible = katas(&["foo", "bar"]);

        let mut ledger = Ledger::default();
        ledger.record(&visible, "foo", moment(1))?;
        ledger.record(&visible, "bar", moment(2))?;
        file.persist(&ledger).await?;

        let mut ledger = file.load().await?;
        file.record(&mut ledger, &visible, "foo", moment(3)).await?;

        let reloaded = file.load().await?;
        assert_eq!(reloaded.completions("foo"), &[moment(1), moment(3)]);
        assert_eq!(reloaded.completions("bar"), &[moment(2)]);
        assert_eq!(reloaded, ledger);
        Ok(())
    }

    #[tokio::test]
    async fn test_record_creates_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("done.json");
        let file = LedgerFile::new(&path);
        let mut ledger = file.load().await?;

        file.record(&mut ledger, &katas(&["x"]), "x", moment(4))
            .await?;

        let stored: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(stored, serde_json::json!({ "x": ["2024-03-04T10:00:00Z"] }));
        Ok(())
    }

    #[tokio::test]
    async fn test_persist_keeps_katas_missing_from_catalog() -> Result<()> {
        let dir = tempdir()?;
        let file = LedgerFile::new(dir.path().join("done.json"));
        let mut ledger = Ledger::from(
            [("retired".to_string(), vec![moment(1)])]
                .into_iter()
                .collect::<std::collections::BTreeMap<_, _>>(),
        );

        file.record(&mut ledger, &katas(&["x"]), "x", moment(2))
            .await?;

        let reloaded = file.load().await?;
        assert_eq!(reloaded.completions("retired"), &[moment(1)]);
        assert_eq!(reloaded.completions("x"), &[moment(2)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_persist_shrinks_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("done.json");
        fs::write(&path, " ".repeat(4096))?;

        LedgerFile::new(&path).persist(&Ledger::default()).await?;

        assert_eq!(fs::read_to_string(&path)?, "{}");
        Ok(())
    }

    #[tokio::test]
    async fn test_record_unknown_kata_leaves_disk_alone() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("done.json");
        let file = LedgerFile::new(&path);
        let mut ledger = file.load().await?;

        let result = file.record(&mut ledger, &katas(&["x"]), "y", moment(4)).await;

        assert!(matches!(result, Err(KataError::UnknownKata(_))));
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_record_rejects_unknown_kata() {
        let mut ledger = Ledger::default();
        let result = ledger.record(&katas(&["foo"]), "nope", moment(1));
        assert!(matches!(result, Err(KataError::UnknownKata(name)) if name == "nope"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_merge_does_not_touch_ledger() -> Result<()> {
        let mut ledger = Ledger::default();
        let visible = katas(&["a", "b", "c"]);
        ledger.record(&visible, "a", moment(1))?;
        ledger.record(&visible, "a", moment(2))?;
        ledger.record(&visible, "c", moment(3))?;
        let before = ledger.clone();

        let mut first = visible.clone();
        ledger.merge(&mut first);
        let mut second = first.clone();
        ledger.merge(&mut second);

        assert_eq!(ledger, before);
        assert_eq!(first, second);
        assert_eq!(first[0].completions, vec![moment(1), moment(2)]);
        assert!(first[1].completions.is_empty());
        assert_eq!(first[2].completions, vec![moment(3)]);
        Ok(())
    }

    #[test]
    fn test_last_completion_scans_for_maximum() {
        assert_eq!(last_completion(&[]), None);
        assert_eq!(
            last_completion(&[moment(5), moment(9), moment(2)]),
            Some(moment(9))
        );
    }

    #[test]
    fn test_needs_confirmation_within_five_minutes() {
        let last = moment(5);
        assert!(!needs_confirmation(&[], last));
        assert!(needs_confirmation(&[last], last + Duration::minutes(4)));
        assert!(!needs_confirmation(&[last], last + Duration::minutes(5)));
        assert!(!needs_confirmation(&[last], last + Duration::days(1)));
    }
}
