use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusStatus {
    Offline,
    Active,
    InRoute,
    Stopped,
    Maintenance,
}

impl BusStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusStatus::Offline => "offline",
            BusStatus::Active => "active",
            BusStatus::InRoute => "in_route",
            BusStatus::Stopped => "stopped",
            BusStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown bus status '{0}'")]
pub struct UnknownBusStatus(pub String);

impl FromStr for BusStatus {
    type Err = UnknownBusStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "offline" => Ok(BusStatus::Offline),
            "active" => Ok(BusStatus::Active),
            "in_route" => Ok(BusStatus::InRoute),
            "stopped" => Ok(BusStatus::Stopped),
            "maintenance" => Ok(BusStatus::Maintenance),
            _ => Err(UnknownBusStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: String,
    pub bus_number: String,
    pub license_plate: String,
    pub capacity: u32,
    pub status: BusStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBus {
    pub bus_number: String,
    pub license_plate: String,
    pub capacity: u32,
    pub status: BusStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
}

/// Body of `PATCH /buses/{id}/status`. This endpoint takes snake_case fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusStatusUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BusStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
}

impl BusStatusUpdate {
    pub fn status(status: BusStatus) -> Self {
        Self {
            status: Some(status),
            current_location: None,
        }
    }
}
