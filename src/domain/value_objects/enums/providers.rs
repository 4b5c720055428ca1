use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StorageProvider {
    Local,
    Wasabi,
    GoogleDrive,
}

impl Display for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider = match self {
            StorageProvider::Local => "local",
            StorageProvider::Wasabi => "wasabi",
            StorageProvider::GoogleDrive => "google_drive",
        };
        write!(f, "{}", provider)
    }
}

impl FromStr for StorageProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            // `local_device` is the legacy room-setting spelling.
            "local" | "local_device" => Ok(StorageProvider::Local),
            "wasabi" => Ok(StorageProvider::Wasabi),
            "google_drive" => Ok(StorageProvider::GoogleDrive),
            other => Err(format!("Unsupported storage provider: {}", other)),
        }
    }
}
