use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_DEVELOPER_NAME_LEN: usize = 200;
pub const MAX_VERSION_LEN: usize = 50;
pub const MAX_ICON_PATH_LEN: usize = 500;
pub const MAX_SOCIAL_TWITTER_LEN: usize = 200;

pub const DEFAULT_LIST_LIMIT: u64 = 50;
pub const MAX_LIST_LIMIT: u64 = 100;

/// Review status of a submitted app. Only ever moves `Pending -> Approved`,
/// and that move belongs to the reviewer, not to this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Pending,
    Approved,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            other => Err(ValidationError::Invalid {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Games,
    Entertainment,
    Health,
    Weather,
    Finance,
    Home,
    Music,
    Sports,
    Education,
    Travel,
    Utilities,
    Social,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Self::Games,
        Self::Entertainment,
        Self::Health,
        Self::Weather,
        Self::Finance,
        Self::Home,
        Self::Music,
        Self::Sports,
        Self::Education,
        Self::Travel,
        Self::Utilities,
        Self::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Games => "games",
            Self::Entertainment => "entertainment",
            Self::Health => "health",
            Self::Weather => "weather",
            Self::Finance => "finance",
            Self::Home => "home",
            Self::Music => "music",
            Self::Sports => "sports",
            Self::Education => "education",
            Self::Travel => "travel",
            Self::Utilities => "utilities",
            Self::Social => "social",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::Invalid {
                field: "category",
                value: s.to_string(),
            })
    }
}

/// Device family an IPA targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTarget {
    Iphone,
    Ipad,
    #[default]
    Both,
}

impl DeviceTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iphone => "iphone",
            Self::Ipad => "ipad",
            Self::Both => "both",
        }
    }
}

impl FromStr for DeviceTarget {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iphone" => Ok(Self::Iphone),
            "ipad" => Ok(Self::Ipad),
            "both" => Ok(Self::Both),
            other => Err(ValidationError::Invalid {
                field: "device",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Invalid {field}: {value}")]
    Invalid { field: &'static str, value: String },
}

/// A submitted app as stored in the app record store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub developer_name: String,
    pub version: String,
    pub category: Category,
    pub ipa_path: String,
    pub device: DeviceTarget,
    pub icon_path: Option<String>,
    pub social_twitter: Option<String>,
    pub social_website: Option<String>,
    pub app_store_link: Option<String>,
    pub status: AppStatus,
    pub created_at: DateTime<Utc>,
    pub uploaded_by_device_id: Option<String>,
}

impl AppRecord {
    /// Ownership is derived, never stored: the requester owns the app iff it
    /// presents the device id the app was uploaded with.
    pub fn is_owned_by(&self, device_id: Option<&str>) -> bool {
        match (device_id, self.uploaded_by_device_id.as_deref()) {
            (Some(requester), Some(uploader)) => !requester.is_empty() && requester == uploader,
            _ => false,
        }
    }
}

/// Unvalidated submission as it arrives from a client.
#[derive(Clone, Debug, Default)]
pub struct AppDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub developer_name: Option<String>,
    pub version: Option<String>,
    pub category: Option<String>,
    pub ipa_path: Option<String>,
    pub device: Option<String>,
    pub icon_path: Option<String>,
    pub social_twitter: Option<String>,
    pub social_website: Option<String>,
    pub app_store_link: Option<String>,
    pub device_id: Option<String>,
}

/// A submission that passed validation and may be handed to admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewApp {
    pub name: String,
    pub description: String,
    pub developer_name: String,
    pub version: String,
    pub category: Category,
    pub ipa_path: String,
    pub device: DeviceTarget,
    pub icon_path: Option<String>,
    pub social_twitter: Option<String>,
    pub social_website: Option<String>,
    pub app_store_link: Option<String>,
    pub device_id: Option<String>,
}

impl AppDraft {
    pub fn validate(self) -> Result<NewApp, ValidationError> {
        let name = required(self.name, "App name", MAX_NAME_LEN)?;
        let developer_name = required(self.developer_name, "Developer name", MAX_DEVELOPER_NAME_LEN)?;
        let version = required(self.version, "Version", MAX_VERSION_LEN)?;
        let ipa_path = required(self.ipa_path, "IPA path", usize::MAX)?;

        let category = self
            .category
            .ok_or(ValidationError::Required("Category"))?
            .parse::<Category>()?;

        let device = match self.device.as_deref() {
            None | Some("") => DeviceTarget::default(),
            Some(device) => device.parse()?,
        };

        let description = self.description.unwrap_or_default();
        max_len(&description, "Description", MAX_DESCRIPTION_LEN)?;

        let icon_path = optional(self.icon_path);
        if let Some(icon) = &icon_path {
            max_len(icon, "Icon path", MAX_ICON_PATH_LEN)?;
        }

        let social_twitter = optional(self.social_twitter);
        if let Some(handle) = &social_twitter {
            max_len(handle, "Twitter handle", MAX_SOCIAL_TWITTER_LEN)?;
        }

        let social_website = optional_url(self.social_website, "socialWebsite")?;
        let app_store_link = optional_url(self.app_store_link, "appStoreLink")?;

        Ok(NewApp {
            name,
            description,
            developer_name,
            version,
            category,
            ipa_path,
            device,
            icon_path,
            social_twitter,
            social_website,
            app_store_link,
            device_id: antimatter_types::utils::non_empty(self.device_id),
        })
    }
}

impl NewApp {
    /// Every new record starts out pending review.
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> AppRecord {
        AppRecord {
            id,
            name: self.name,
            description: self.description,
            developer_name: self.developer_name,
            version: self.version,
            category: self.category,
            ipa_path: self.ipa_path,
            device: self.device,
            icon_path: self.icon_path,
            social_twitter: self.social_twitter,
            social_website: self.social_website,
            app_store_link: self.app_store_link,
            status: AppStatus::Pending,
            created_at,
            uploaded_by_device_id: self.device_id,
        }
    }
}

/// Which apps a listing returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppFilter {
    Statuses(Vec<AppStatus>),
    UploadedBy(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppQuery {
    pub filter: AppFilter,
    pub limit: u64,
}

impl AppQuery {
    /// Builds the listing query the store front uses: apps of one device when
    /// a device id is given, otherwise the requested status (or both).
    pub fn new(
        status: Option<&str>,
        device_id: Option<String>,
        limit: Option<u64>,
    ) -> Result<Self, ValidationError> {
        let filter = match antimatter_types::utils::non_empty(device_id) {
            Some(device_id) => AppFilter::UploadedBy(device_id),
            None => match status.filter(|s| !s.is_empty()) {
                Some(status) => AppFilter::Statuses(vec![status.parse()?]),
                None => AppFilter::Statuses(vec![AppStatus::Approved, AppStatus::Pending]),
            },
        };

        let limit = match limit {
            Some(0) | None => DEFAULT_LIST_LIMIT,
            Some(limit) => limit.min(MAX_LIST_LIMIT),
        };

        Ok(Self { filter, limit })
    }

    pub fn matches(&self, app: &AppRecord) -> bool {
        match &self.filter {
            AppFilter::Statuses(statuses) => statuses.contains(&app.status),
            AppFilter::UploadedBy(device_id) => {
                app.uploaded_by_device_id.as_deref() == Some(device_id.as_str())
            }
        }
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::Required(field))?;
    max_len(&value, field, max)?;
    Ok(value)
}

fn optional(value: Option<String>) -> Option<String> {
    antimatter_types::utils::non_empty(value)
}

fn optional_url(
    value: Option<String>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match optional(value) {
        None => Ok(None),
        Some(raw) => url::Url::parse(&raw)
            .map(|_| Some(raw.clone()))
            .map_err(|_| ValidationError::Invalid { field, value: raw }),
    }
}

fn max_len(value: &str, field: &'static str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AppDraft {
        AppDraft {
            name: Some("Delta".into()),
            developer_name: Some("Riley".into()),
            version: Some("1.2.0".into()),
            category: Some("games".into()),
            ipa_path: Some("1700000000-delta.ipa".into()),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_draft_fills_defaults() {
        let app = draft().validate().unwrap();
        assert_eq!(app.device, DeviceTarget::Both);
        assert_eq!(app.description, "");
        assert_eq!(app.device_id, None);
        assert_eq!(app.category, Category::Games);
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = AppDraft {
            name: Some("   ".into()),
            ..draft()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Required("App name"));
        assert_eq!(err.to_string(), "App name is required");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = AppDraft {
            category: Some("productivity".into()),
            ..draft()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { field: "category", .. }));
    }

    #[test]
    fn overlong_version_is_rejected() {
        let err = AppDraft {
            version: Some("1".repeat(51)),
            ..draft()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "Version",
                max: 50
            }
        );
    }

    #[test]
    fn empty_links_are_dropped_and_bad_links_rejected() {
        let app = AppDraft {
            social_website: Some(String::new()),
            app_store_link: Some("https://apps.apple.com/app/id1".into()),
            ..draft()
        }
        .validate()
        .unwrap();
        assert_eq!(app.social_website, None);
        assert!(app.app_store_link.is_some());

        let err = AppDraft {
            social_website: Some("not a url".into()),
            ..draft()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { field: "socialWebsite", .. }));
    }

    #[test]
    fn blank_device_id_means_anonymous() {
        let app = AppDraft {
            device_id: Some(String::new()),
            ..draft()
        }
        .validate()
        .unwrap();
        assert_eq!(app.device_id, None);
    }

    #[test]
    fn ownership_requires_matching_device() {
        let record = AppDraft {
            device_id: Some("dev-1".into()),
            ..draft()
        }
        .validate()
        .unwrap()
        .into_record("app-1".into(), Utc::now());

        assert_eq!(record.status, AppStatus::Pending);
        assert!(record.is_owned_by(Some("dev-1")));
        assert!(!record.is_owned_by(Some("dev-2")));
        assert!(!record.is_owned_by(None));
    }

    #[test]
    fn listing_query_defaults_and_clamps() {
        let query = AppQuery::new(None, None, None).unwrap();
        assert_eq!(
            query.filter,
            AppFilter::Statuses(vec![AppStatus::Approved, AppStatus::Pending])
        );
        assert_eq!(query.limit, DEFAULT_LIST_LIMIT);

        let query = AppQuery::new(Some("approved"), Some("dev-1".into()), Some(500)).unwrap();
        assert_eq!(query.filter, AppFilter::UploadedBy("dev-1".into()));
        assert_eq!(query.limit, MAX_LIST_LIMIT);

        assert!(AppQuery::new(Some("rejected"), None, None).is_err());
    }
}
