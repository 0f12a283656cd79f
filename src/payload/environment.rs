//! Environment snapshot consumed by the payload builder.
//!
//! Device, app, user and regulatory context come from platform services
//! the client does not own. They are read through `EnvironmentProvider`,
//! once per auction, as a plain value.

use serde::{Deserialize, Serialize};

/// Display metrics of the device, in density-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayContext {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

/// Last known device location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
    /// Accuracy radius in meters.
    pub accuracy: u32,
    /// Age of the fix in milliseconds.
    pub age_ms: u64,
}

/// Network the device is currently using.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    Unknown,
    Wifi,
    Cellular,
}

impl ConnectionType {
    pub fn code(&self) -> u8 {
        match self {
            ConnectionType::Unknown => 0,
            ConnectionType::Wifi => 1,
            ConnectionType::Cellular => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub user_agent: Option<String>,
    pub os: String,
    pub os_version: Option<String>,
    pub language: Option<String>,
    pub display: Option<DisplayContext>,
    pub advertising_id: Option<String>,
    pub limit_ad_tracking: bool,
    /// Mobile country code; non-positive values mean unknown.
    pub mcc: i32,
    /// Mobile network code; non-positive values mean unknown.
    pub mnc: i32,
    pub carrier: Option<String>,
    pub connection: ConnectionType,
    pub geo: Option<GeoLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub bundle: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub store_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unknown,
}

impl Gender {
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Female => "F",
            Gender::Male => "M",
            Gender::Unknown => "O",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    /// Year of birth; zero when unknown.
    pub year_of_birth: u32,
    pub gender: Gender,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegsInfo {
    /// `None` when GDPR applicability is unknown.
    pub subject_to_gdpr: Option<bool>,
    pub gdpr_consent: Option<String>,
    pub subject_to_coppa: bool,
}

/// Everything the payload builder needs beyond the request parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub device: DeviceInfo,
    pub app: AppInfo,
    pub user: UserInfo,
    pub regs: RegsInfo,
}

/// Source of environment snapshots.
pub trait EnvironmentProvider: Send + Sync {
    /// Capture the current environment.
    fn snapshot(&self) -> Environment;
}

/// Provider returning a fixed environment, typically loaded from config.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    environment: Environment,
}

impl StaticEnvironment {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn snapshot(&self) -> Environment {
        self.environment.clone()
    }
}
