// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::ConfigError;
use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// Scalar config values (`42`, `true`, `"x"`) that end up as strings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{s}"),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawRcon {
    pub port: Option<i64>,
    pub password: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawBackup {
    pub location: Option<PathBuf>,
    pub data: Option<Vec<PathBuf>>,
}

/// One instance exactly as written in the config file.
#[derive(Debug, Default, Deserialize)]
pub struct RawInstance {
    #[serde(default, alias = "app_id")]
    pub package_id: Option<Scalar>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub environment: HashMap<String, Scalar>,
    #[serde(default)]
    pub rcon: Option<RawRcon>,
    #[serde(default)]
    pub backup: Option<RawBackup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconConfig {
    pub port: u16,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSpec {
    pub location: PathBuf,
    pub data: Vec<PathBuf>,
}

/// A validated instance. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub name: String,
    pub package_id: String,
    pub command: Vec<String>,
    pub working_directory: PathBuf,
    pub environment: HashMap<String, String>,
    pub rcon: Option<RconConfig>,
    /// `None` only for command-line instances started without backup flags.
    pub backup: Option<BackupSpec>,
}

impl RawInstance {
    /// Validate an instance read from a configuration file, where `backup` is required.
    pub fn validate(self, name: &str) -> Result<InstanceConfig, ConfigError> {
        self.build(name, true)
    }

    /// Validate an instance given on the command line. Backups are off when
    /// no backup section was given at all.
    pub fn validate_standalone(self, name: &str) -> Result<InstanceConfig, ConfigError> {
        self.build(name, false)
    }

    fn build(self, name: &str, backup_required: bool) -> Result<InstanceConfig, ConfigError> {
        let missing = |field| ConfigError::MissingField {
            instance: name.to_string(),
            field,
        };
        let invalid = |field, reason: &str| ConfigError::InvalidField {
            instance: name.to_string(),
            field,
            reason: reason.to_string(),
        };

        let command = self.command.ok_or_else(|| missing("command"))?;
        if command.first().is_none_or(String::is_empty) {
            return Err(invalid("command", "no command specified"));
        }

        let rcon = match self.rcon {
            None => None,
            Some(RawRcon {
                port: Some(port),
                password: Some(password),
            }) => {
                let port = u16::try_from(port)
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| invalid("rcon.port", "must be between 1 and 65535"))?;
                Some(RconConfig {
                    port,
                    password: password.to_string(),
                })
            }
            Some(_) => {
                return Err(ConfigError::PartialRcon {
                    instance: name.to_string(),
                });
            }
        };

        let package_id = self
            .package_id
            .ok_or_else(|| missing("package_id"))?
            .to_string();
        if package_id.is_empty() {
            return Err(invalid("package_id", "must not be empty"));
        }

        let backup = match self.backup {
            Some(backup) => {
                let location = backup.location.ok_or_else(|| missing("backup.location"))?;
                let data = backup.data.ok_or_else(|| missing("backup.data"))?;
                if data.is_empty() {
                    return Err(invalid("backup.data", "at least one path is required"));
                }
                Some(BackupSpec { location, data })
            }
            None if backup_required => return Err(missing("backup")),
            None => None,
        };

        let environment = self
            .environment
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();

        Ok(InstanceConfig {
            name: name.to_string(),
            package_id,
            command,
            working_directory: self
                .working_directory
                .unwrap_or_else(|| PathBuf::from(".")),
            environment,
            rcon,
            backup,
        })
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

/// Parse a multi-instance document; YAML when `yaml` is set, JSON otherwise.
pub fn parse_instances(
    contents: &str,
    yaml: bool,
) -> Result<BTreeMap<String, RawInstance>, String> {
    if yaml {
        serde_yaml::from_str(contents).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(contents).map_err(|e| e.to_string())
    }
}

/// Read and validate every instance in `path`. Fails on the first invalid instance.
pub fn load_config(path: &Path) -> Result<Vec<InstanceConfig>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = parse_instances(&contents, is_yaml(path)).map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })?;
    if raw.is_empty() {
        return Err(ConfigError::Empty);
    }

    let instances = raw
        .into_iter()
        .map(|(name, instance)| instance.validate(&name))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        "loaded {} instance(s) from {}",
        instances.len(),
        path.display()
    );
    Ok(instances)
}
