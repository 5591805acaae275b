use crate::config::Configuration;
use anyhow::{Context, bail};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

/// A configuration source
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// A configuration file (maybe TOML, YAML or JSON)
    File(PathBuf),
    /// No configuration file, use the defaults
    Default,
}

const CANDIDATES: &[&str] = &[
    "Lull.toml",
    ".lull.toml",
    "Lull.yaml",
    ".lull.yaml",
    "Lull.json",
    ".lull.json",
];

impl Source {
    /// Find a first config source candidate in a directory
    pub fn find(path: &Path) -> Source {
        CANDIDATES
            .iter()
            .find_map(|name| check_path(path, name))
            .map(Source::File)
            .unwrap_or(Source::Default)
    }

    /// Load the configuration from the source.
    pub fn load(self) -> anyhow::Result<Configuration> {
        match self {
            Self::File(file) => load_from(&file)
                .with_context(|| format!("error loading configuration from '{}'", file.display())),
            Self::Default => {
                tracing::debug!("no configuration file found, using defaults");
                Ok(Configuration::default())
            }
        }
    }
}

fn check_path(path: &Path, name: &str) -> Option<PathBuf> {
    let path = path.join(name);
    path.is_file().then_some(path)
}

/// Parse the file according to its extension: `toml`, `yaml` or `json`.
fn load_from(file: &Path) -> anyhow::Result<Configuration> {
    let extension = file.extension().map(|ext| ext.to_string_lossy());
    let Some(extension) = extension.as_deref() else {
        bail!("Missing configuration file extension");
    };

    Ok(match extension {
        "toml" => toml::from_str(&std::fs::read_to_string(file)?)?,
        "yaml" => serde_yaml::from_reader(BufReader::new(File::open(file)?))?,
        "json" => serde_json::from_reader(BufReader::new(File::open(file)?))?,
        other => bail!("Unsupported configuration file type: {other}"),
    })
}
