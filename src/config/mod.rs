use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "JournalCli";
const APP_NAME: &str = "journal";
const DATA_DIR_NAME: &str = ".journal";
const DEFAULT_JOURNAL: &str = "default";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    /// Build a loader around pre-resolved paths (tests, embedding).
    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub journal_dir: PathBuf,
    pub state_dir: PathBuf,
    pub draft_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("JOURNAL_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("JOURNAL_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        // Journal files live directly under a dotfile directory in $HOME.
        let data_root = match override_data {
            Some(path) => path,
            None => {
                let base = BaseDirs::new().context("resolving home directory")?;
                base.home_dir().join(DATA_DIR_NAME)
            }
        };
        let journal_dir = data_root.clone();

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));
        let draft_dir = state_dir.join("drafts");

        Ok(Self {
            config_dir,
            config_file,
            data_dir: data_root,
            journal_dir,
            state_dir,
            draft_dir,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.journal_dir,
            &self.state_dir,
            &self.draft_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_journal: String,
    pub editor: EditorConfig,
    pub storage: StorageOptions,
    pub list: ListOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_journal: DEFAULT_JOURNAL.to_string(),
            editor: EditorConfig::default(),
            storage: StorageOptions::default(),
            list: ListOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        self.storage.resolve(paths);
        self.editor.resolve(paths);
        if self.default_journal.trim().is_empty() {
            tracing::warn!("empty default_journal in config, falling back to '{DEFAULT_JOURNAL}'");
            self.default_journal = DEFAULT_JOURNAL.to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor command line, split on whitespace ("code --wait" works).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Last-resort program when neither config nor $VISUAL/$EDITOR is set.
    pub fallback: String,
    #[serde(skip)]
    pub draft_dir: PathBuf,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: None,
            fallback: "vi".to_string(),
            draft_dir: PathBuf::new(),
        }
    }
}

impl EditorConfig {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.draft_dir.as_os_str().is_empty() {
            self.draft_dir = paths.draft_dir.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub journal_dir: PathBuf,
    pub pretty: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            journal_dir: PathBuf::new(),
            pretty: true,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.journal_dir.as_os_str().is_empty() {
            self.journal_dir = paths.journal_dir.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    pub max_entries: usize,
    pub snippet_width: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            max_entries: 20,
            snippet_width: 160,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        let data_dir = base.join("data");
        let state_dir = base.join("state");
        ConfigPaths {
            config_dir: config_dir.clone(),
            config_file: config_dir.join("config.toml"),
            data_dir: data_dir.clone(),
            journal_dir: data_dir,
            state_dir: state_dir.clone(),
            draft_dir: state_dir.join("drafts"),
        }
    }

    #[test]
    fn load_or_init_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let loader = ConfigLoader::from_paths(paths.clone());

        let cfg = loader.load_or_init()?;
        assert!(paths.config_file.exists());
        assert_eq!(cfg.default_journal, "default");
        assert_eq!(cfg.storage.journal_dir, paths.journal_dir);
        assert_eq!(cfg.editor.draft_dir, paths.draft_dir);

        // The written file must parse back to the same settings.
        let reloaded = loader.load()?;
        assert_eq!(reloaded.default_journal, cfg.default_journal);
        assert_eq!(reloaded.storage.pretty, cfg.storage.pretty);
        assert_eq!(reloaded.list.max_entries, cfg.list.max_entries);
        Ok(())
    }

    #[test]
    fn empty_default_journal_falls_back() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "default_journal = \"  \"\n\n[editor]\nfallback = \"nano\"\n",
        )?;

        let loader = ConfigLoader::from_paths(paths);
        let cfg = loader.load_or_init()?;
        assert_eq!(cfg.default_journal, "default");
        assert_eq!(cfg.editor.fallback, "nano");
        Ok(())
    }

    #[test]
    fn partial_config_keeps_section_defaults() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "default_journal = \"work\"\n")?;

        let loader = ConfigLoader::from_paths(paths);
        let cfg = loader.load()?;
        assert_eq!(cfg.default_journal, "work");
        assert!(cfg.storage.pretty);
        assert_eq!(cfg.list.max_entries, 20);
        assert_eq!(cfg.editor.fallback, "vi");
        Ok(())
    }
}
