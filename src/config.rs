//! Configuration management for confparse.
//!
//! [`ParseOptions`] controls how one document is parsed. [`Settings`] bundles
//! parse options with logging settings and loads them in layers: built-in
//! defaults, then configuration files, then `CONFPARSE_*` environment
//! variables.

use crate::dialect::Dialect;
use crate::error::{Error, Result as ParseResult};
use crate::logging::{LogLevel, LoggingConfig};
use anyhow::{Context, Result};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default line-ending pattern used to split input text.
pub const DEFAULT_LINE_SPLIT: &str = r"\r*\n";

/// Default character encoding of configuration files.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// How a single configuration document is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Configuration dialect
    pub dialect: Dialect,
    /// Comment markers; `None` uses the dialect default
    pub comment_markers: Option<Vec<char>>,
    /// Indent width per brace depth; `None` uses the dialect default
    pub indent_step: Option<usize>,
    /// Drop blank lines outside banner and macro bodies
    pub ignore_blank_lines: bool,
    /// Commit automatically after each mutation
    pub auto_commit: bool,
    /// Regular expression separating lines of input text
    pub line_split: String,
    /// Encoding label (WHATWG names such as `utf-8`, `latin1`, `shift_jis`)
    /// used to read and write files
    pub encoding: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            comment_markers: None,
            indent_step: None,
            ignore_blank_lines: false,
            auto_commit: true,
            line_split: DEFAULT_LINE_SPLIT.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

impl ParseOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn with_comment_markers(mut self, markers: impl IntoIterator<Item = char>) -> Self {
        self.comment_markers = Some(markers.into_iter().collect());
        self
    }

    pub fn with_indent_step(mut self, step: usize) -> Self {
        self.indent_step = Some(step);
        self
    }

    pub fn with_ignore_blank_lines(mut self, ignore: bool) -> Self {
        self.ignore_blank_lines = ignore;
        self
    }

    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    pub fn with_line_split(mut self, pattern: impl Into<String>) -> Self {
        self.line_split = pattern.into();
        self
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    /// Comment markers after applying the dialect default.
    pub fn resolved_comment_markers(&self) -> Vec<char> {
        self.comment_markers
            .clone()
            .unwrap_or_else(|| self.dialect.default_comment_markers())
    }

    /// Indent step after applying the dialect default.
    pub fn resolved_indent_step(&self) -> usize {
        self.indent_step
            .unwrap_or_else(|| self.dialect.default_indent_step())
    }

    /// The encoding named by [`encoding`](Self::encoding).
    pub fn resolved_encoding(&self) -> ParseResult<&'static Encoding> {
        Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            Error::invalid_arguments(format!("unknown encoding '{}'", self.encoding))
        })
    }

    /// Check the options without parsing anything.
    pub fn validate(&self) -> ParseResult<()> {
        self.resolved_encoding()?;
        if self.resolved_indent_step() == 0 {
            return Err(Error::invalid_arguments("indent step must be at least 1"));
        }
        if self.line_split.is_empty() {
            return Err(Error::invalid_arguments("line split pattern is empty"));
        }
        if let Some(markers) = &self.comment_markers {
            if markers.is_empty() || markers.iter().any(|c| c.is_whitespace()) {
                return Err(Error::invalid_arguments(
                    "comment markers must be non-whitespace characters",
                ));
            }
        }
        Ok(())
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default parse options
    pub parse: ParseOptions,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from the standard locations plus the environment.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut settings = Self::from_layers(Self::get_config_paths(config_path))?;
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Explicit path takes priority
        if let Some(path) = explicit_path {
            paths.push(path.clone());
            return paths;
        }

        paths.push(PathBuf::from("/etc/confparse/confparse.toml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".confparse.toml"));
        }

        paths.push(PathBuf::from("confparse.toml"));

        if let Ok(env_config) = std::env::var("CONFPARSE_CONFIG") {
            paths.insert(0, PathBuf::from(env_config));
        }

        paths
    }

    /// Layer the existing files among `paths`, later files winning.
    ///
    /// Only keys present in a file override earlier layers, so a later file
    /// can set a value back to its default.
    fn from_layers<I>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut merged = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
        for path in paths {
            if path.exists() {
                let layer = Self::read_layer(&path)?;
                merged = deep_merge(&merged, &layer);
                tracing::debug!(path = %path.display(), "merged settings file");
            }
        }
        serde_yaml::from_value(merged).context("Failed to build settings from configuration files")
    }

    /// Read one settings file into a generic value tree.
    fn read_layer(path: &Path) -> Result<serde_yaml::Value> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let layer: serde_yaml::Value = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        // An empty YAML document sets nothing.
        Ok(match layer {
            serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
            other => other,
        })
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // CONFPARSE_DIALECT
        if let Ok(dialect) = std::env::var("CONFPARSE_DIALECT") {
            self.parse.dialect = dialect
                .parse()
                .with_context(|| format!("Invalid CONFPARSE_DIALECT '{}'", dialect))?;
        }

        // CONFPARSE_COMMENT_MARKERS, e.g. "!#" or "!,#"
        if let Ok(markers) = std::env::var("CONFPARSE_COMMENT_MARKERS") {
            let markers: Vec<char> = markers
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            if !markers.is_empty() {
                self.parse.comment_markers = Some(markers);
            }
        }

        // CONFPARSE_INDENT_STEP
        if let Ok(step) = std::env::var("CONFPARSE_INDENT_STEP") {
            if let Ok(n) = step.trim().parse() {
                self.parse.indent_step = Some(n);
            }
        }

        // CONFPARSE_IGNORE_BLANK_LINES
        if let Ok(value) = std::env::var("CONFPARSE_IGNORE_BLANK_LINES") {
            self.parse.ignore_blank_lines = parse_flag(&value);
        }

        // CONFPARSE_AUTO_COMMIT
        if let Ok(value) = std::env::var("CONFPARSE_AUTO_COMMIT") {
            self.parse.auto_commit = parse_flag(&value);
        }

        // CONFPARSE_ENCODING
        if let Ok(label) = std::env::var("CONFPARSE_ENCODING") {
            if Encoding::for_label(label.trim().as_bytes()).is_none() {
                anyhow::bail!("Invalid CONFPARSE_ENCODING '{}'", label);
            }
            self.parse.encoding = label.trim().to_string();
        }

        // CONFPARSE_LOG_LEVEL
        if let Ok(level) = std::env::var("CONFPARSE_LOG_LEVEL") {
            if let Ok(level) = level.parse::<LogLevel>() {
                self.logging.level = level;
            }
        }

        Ok(())
    }

    /// Load settings from a single file on top of the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let layer = Self::read_layer(path)?;
        serde_yaml::from_value(layer)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Deep merge two settings trees; mappings merge key by key, anything else
/// is replaced by `overlay`.
fn deep_merge(base: &serde_yaml::Value, overlay: &serde_yaml::Value) -> serde_yaml::Value {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let value = match base_map.get(key) {
                    Some(base_value) => deep_merge(base_value, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            serde_yaml::Value::Mapping(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: [&str; 8] = [
        "CONFPARSE_CONFIG",
        "CONFPARSE_DIALECT",
        "CONFPARSE_COMMENT_MARKERS",
        "CONFPARSE_INDENT_STEP",
        "CONFPARSE_IGNORE_BLANK_LINES",
        "CONFPARSE_AUTO_COMMIT",
        "CONFPARSE_ENCODING",
        "CONFPARSE_LOG_LEVEL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.parse.dialect, Dialect::Ios);
        assert_eq!(settings.parse.line_split, DEFAULT_LINE_SPLIT);
        assert!(!settings.parse.ignore_blank_lines);
        assert!(settings.parse.auto_commit);
        assert_eq!(settings.parse.encoding, DEFAULT_ENCODING);
        assert_eq!(settings.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_resolved_defaults() {
        let junos = ParseOptions::new(Dialect::Junos);
        assert_eq!(junos.resolved_comment_markers(), vec!['#']);
        assert_eq!(junos.resolved_indent_step(), 4);

        let custom = ParseOptions::new(Dialect::Nxos)
            .with_comment_markers(['!', '#'])
            .with_indent_step(3);
        assert_eq!(custom.resolved_comment_markers(), vec!['!', '#']);
        assert_eq!(custom.resolved_indent_step(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(ParseOptions::default().validate().is_ok());
        assert!(ParseOptions::default().with_indent_step(0).validate().is_err());
        assert!(ParseOptions::default().with_line_split("").validate().is_err());
        assert!(ParseOptions::default()
            .with_comment_markers([' '])
            .validate()
            .is_err());
        assert!(matches!(
            ParseOptions::default().with_encoding("klingon").validate(),
            Err(Error::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_resolved_encoding() {
        let latin1 = ParseOptions::default().with_encoding("latin1");
        assert_eq!(latin1.resolved_encoding().unwrap(), encoding_rs::WINDOWS_1252);
        assert_eq!(
            ParseOptions::default().resolved_encoding().unwrap(),
            encoding_rs::UTF_8
        );
    }

    #[test]
    fn test_layers_later_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.toml");
        std::fs::write(
            &base,
            "[parse]\ndialect = \"nxos\"\nindent_step = 2\nignore_blank_lines = true\nauto_commit = false\n\n[logging]\nansi_colors = false\n",
        )
        .unwrap();
        let overlay = dir.path().join("overlay.yaml");
        std::fs::write(
            &overlay,
            "parse:\n  ignore_blank_lines: false\n  auto_commit: true\nlogging:\n  ansi_colors: true\n",
        )
        .unwrap();

        let merged = Settings::from_layers(vec![
            base.clone(),
            dir.path().join("missing.toml"),
            overlay,
        ])
        .unwrap();
        assert_eq!(merged.parse.dialect, Dialect::Nxos);
        assert_eq!(merged.parse.indent_step, Some(2));
        assert!(!merged.parse.ignore_blank_lines);
        assert!(merged.parse.auto_commit);
        assert!(merged.logging.ansi_colors);

        let base_only = Settings::from_layers(vec![base]).unwrap();
        assert!(base_only.parse.ignore_blank_lines);
        assert!(!base_only.parse.auto_commit);
        assert!(!base_only.logging.ansi_colors);
    }

    #[test]
    fn test_deep_merge_keeps_unset_keys() {
        let base: serde_yaml::Value =
            serde_yaml::from_str("parse:\n  dialect: asa\n  indent_step: 3\n").unwrap();
        let overlay: serde_yaml::Value = serde_yaml::from_str("parse:\n  indent_step: 1\n").unwrap();
        let merged: Settings = serde_yaml::from_value(deep_merge(&base, &overlay)).unwrap();
        assert_eq!(merged.parse.dialect, Dialect::Asa);
        assert_eq!(merged.parse.indent_step, Some(1));
    }

    #[test]
    fn test_empty_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "").unwrap();
        assert_eq!(Settings::from_file(&path).unwrap(), Settings::default());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confparse.toml");
        std::fs::write(
            &path,
            "[parse]\ndialect = \"junos\"\nignore_blank_lines = true\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.parse.dialect, Dialect::Junos);
        assert!(settings.parse.ignore_blank_lines);
        assert_eq!(settings.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confparse.yaml");
        std::fs::write(&path, "parse:\n  dialect: asa\n  comment_markers: ['!', ':']\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.parse.dialect, Dialect::Asa);
        assert_eq!(settings.parse.comment_markers, Some(vec!['!', ':']));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        clear_env();
        std::env::set_var("CONFPARSE_DIALECT", "nx-os");
        std::env::set_var("CONFPARSE_COMMENT_MARKERS", "!,#");
        std::env::set_var("CONFPARSE_INDENT_STEP", "2");
        std::env::set_var("CONFPARSE_AUTO_COMMIT", "no");
        std::env::set_var("CONFPARSE_ENCODING", "latin1");
        std::env::set_var("CONFPARSE_LOG_LEVEL", "trace");

        let mut settings = Settings::default();
        settings.apply_env_overrides().unwrap();
        clear_env();

        assert_eq!(settings.parse.dialect, Dialect::Nxos);
        assert_eq!(settings.parse.comment_markers, Some(vec!['!', '#']));
        assert_eq!(settings.parse.indent_step, Some(2));
        assert!(!settings.parse.auto_commit);
        assert_eq!(settings.parse.encoding, "latin1");
        assert_eq!(settings.logging.level, LogLevel::Trace);
    }

    #[test]
    #[serial]
    fn test_env_bad_dialect() {
        clear_env();
        std::env::set_var("CONFPARSE_DIALECT", "eos");
        let mut settings = Settings::default();
        let result = settings.apply_env_overrides();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_bad_encoding() {
        clear_env();
        std::env::set_var("CONFPARSE_ENCODING", "klingon");
        let mut settings = Settings::default();
        let result = settings.apply_env_overrides();
        clear_env();
        assert!(result.is_err());
        assert_eq!(settings.parse.encoding, DEFAULT_ENCODING);
    }

    #[test]
    #[serial]
    fn test_load_explicit_path_only() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explicit.toml");
        std::fs::write(&path, "[parse]\ndialect = \"iosxr\"\n").unwrap();

        let paths = Settings::get_config_paths(Some(&path));
        assert_eq!(paths, vec![path.clone()]);

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.parse.dialect, Dialect::Iosxr);
    }
}
