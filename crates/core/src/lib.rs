pub mod analysis;
pub mod domain;
pub mod eda;
pub mod error;
pub mod frame;
pub mod indicators;
pub mod ingest;
pub mod pipeline;
pub mod scoring;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use chrono::{FixedOffset, Offset, Utc};
    use std::path::{Path, PathBuf};

    const DEFAULT_DATA_DIR: &str = "data";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_dir: PathBuf,
        pub news_tz_offset: Option<FixedOffset>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let data_dir = std::env::var("NEWSCORR_DATA_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

            // Unset means UTC; an explicitly empty value disables localization.
            let news_tz_offset = match std::env::var("NEWS_TZ_OFFSET") {
                Ok(s) if s.trim().is_empty() => None,
                Ok(s) => Some(
                    s.trim()
                        .parse::<FixedOffset>()
                        .with_context(|| format!("NEWS_TZ_OFFSET is not a valid offset: {s}"))?,
                ),
                Err(_) => Some(utc_offset()),
            };

            Ok(Self {
                data_dir,
                news_tz_offset,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
            Self {
                data_dir: data_dir.into(),
                news_tz_offset: Some(utc_offset()),
                sentry_dsn: None,
            }
        }

        pub fn raw_dir(&self) -> PathBuf {
            self.data_dir.join("raw")
        }

        pub fn interim_dir(&self) -> PathBuf {
            self.data_dir.join("interim")
        }

        pub fn processed_dir(&self) -> PathBuf {
            self.data_dir.join("processed")
        }

        pub fn reports_dir(&self) -> PathBuf {
            self.processed_dir().join("reports")
        }

        /// Creates the raw/interim/processed tree. Safe to call repeatedly.
        pub fn ensure_data_dirs(&self) -> anyhow::Result<()> {
            for dir in [
                self.raw_dir(),
                self.interim_dir(),
                self.processed_dir(),
                self.reports_dir(),
            ] {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            Ok(())
        }

        /// Absolute paths are used as-is; relative ones are looked up under the raw dir.
        pub fn resolve_raw(&self, path: &Path) -> PathBuf {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.raw_dir().join(path)
            }
        }
    }

    fn utc_offset() -> FixedOffset {
        Utc.fix()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn data_dirs_can_be_created() {
            let tmp = tempfile::tempdir().unwrap();
            let settings = Settings::with_data_dir(tmp.path().join("data"));

            settings.ensure_data_dirs().unwrap();
            // Second call must not fail on existing directories.
            settings.ensure_data_dirs().unwrap();

            assert!(settings.raw_dir().is_dir());
            assert!(settings.interim_dir().is_dir());
            assert!(settings.processed_dir().is_dir());
            assert!(settings.reports_dir().is_dir());
        }

        #[test]
        fn relative_paths_resolve_under_raw_dir() {
            let settings = Settings::with_data_dir("/srv/data");
            assert_eq!(
                settings.resolve_raw(Path::new("news.csv")),
                PathBuf::from("/srv/data/raw/news.csv")
            );
            assert_eq!(
                settings.resolve_raw(Path::new("/tmp/prices.csv")),
                PathBuf::from("/tmp/prices.csv")
            );
        }
    }
}
