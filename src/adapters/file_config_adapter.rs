//! INI file configuration adapter.

use crate::domain::error::SwingError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SwingError> {
        let path = path.as_ref();
        let parse_error = |reason: String| SwingError::ConfigParse {
            file: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
        Self::from_string(&content).map_err(parse_error)
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[market]
watchlist = RELIANCE.NS, TCS.NS
interval = 1h

[account]
capital = 2000000
risk_fraction = 0.005
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("market", "interval"),
            Some("1h".to_string())
        );
        assert_eq!(
            adapter.get_string("account", "capital"),
            Some("2000000".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[account]\ncapital = 100\n").unwrap();
        assert_eq!(adapter.get_string("account", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn values_are_returned_unparsed() {
        let adapter =
            FileConfigAdapter::from_string("[market]\nlookback = 5OO\n[trailing]\nenabled = flase\n")
                .unwrap();
        assert_eq!(adapter.get_string("market", "lookback"), Some("5OO".to_string()));
        assert_eq!(adapter.get_string("trailing", "enabled"), Some("flase".to_string()));
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter = FileConfigAdapter::from_string(
            "[telegram]\nchat_ids = 111, 222 ,,333\nempty =\n",
        )
        .unwrap();
        assert_eq!(adapter.get_list("telegram", "chat_ids"), vec!["111", "222", "333"]);
        assert!(adapter.get_list("telegram", "empty").is_empty());
        assert!(adapter.get_list("telegram", "missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[ledger]\npath = /var/lib/swing/portfolio.json\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("ledger", "path"),
            Some("/var/lib/swing/portfolio.json".to_string())
        );
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, SwingError::ConfigParse { file, .. } if file.ends_with("config.ini")));
    }
}
