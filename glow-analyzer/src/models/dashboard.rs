//! Admin dashboard statistics
//!
//! The backend owns every count; this module only sums and averages what it
//! returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `/summary` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub active_users: u64,
}

/// One row of `/users` or `/today-users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Missing on users who never analyzed
    #[serde(default)]
    pub analysis_count: Option<u64>,
    #[serde(default)]
    pub last_active_at: Option<String>,
}

impl UserRow {
    /// Case-insensitive match on name or email
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [self.name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Registration chart bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RegistrationRange {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl RegistrationRange {
    pub fn as_query(&self) -> &'static str {
        match self {
            RegistrationRange::Daily => "Daily",
            RegistrationRange::Weekly => "Weekly",
            RegistrationRange::Monthly => "Monthly",
        }
    }
}

impl std::str::FromStr for RegistrationRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(RegistrationRange::Daily),
            "weekly" => Ok(RegistrationRange::Weekly),
            "monthly" => Ok(RegistrationRange::Monthly),
            other => Err(format!("unknown range '{}' (daily, weekly, monthly)", other)),
        }
    }
}

/// `/registrations` chart series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationSeries {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub data: Vec<u64>,
}

/// Everything the dashboard shows after one refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub summary: UserSummary,
    pub users: Vec<UserRow>,
    pub today_users: Vec<UserRow>,
    pub registrations: RegistrationSeries,
    /// Sum of `analysis_count` over all users
    pub total_analyses: u64,
    pub fetched_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    pub fn collect(
        summary: UserSummary,
        users: Vec<UserRow>,
        today_users: Vec<UserRow>,
        registrations: RegistrationSeries,
    ) -> Self {
        let total_analyses = total_analyses(&users);
        Self {
            summary,
            users,
            today_users,
            registrations,
            total_analyses,
            fetched_at: Utc::now(),
        }
    }

    /// Mean analyses per listed user; 0.0 when the list is empty
    pub fn average_analyses_per_user(&self) -> f64 {
        if self.users.is_empty() {
            return 0.0;
        }
        self.total_analyses as f64 / self.users.len() as f64
    }

    /// Active users as a fraction of total users
    pub fn active_ratio(&self) -> f64 {
        if self.summary.total_users == 0 {
            return 0.0;
        }
        self.summary.active_users as f64 / self.summary.total_users as f64
    }

    /// Users matching a search box query
    pub fn filter_users(&self, query: &str) -> Vec<&UserRow> {
        self.users.iter().filter(|u| u.matches(query)).collect()
    }

    /// Total registrations across the chart window
    pub fn registrations_in_range(&self) -> u64 {
        self.registrations.data.iter().sum()
    }
}

/// Sum analysis counts, treating missing counts as zero
pub fn total_analyses(users: &[UserRow]) -> u64 {
    users.iter().map(|u| u.analysis_count.unwrap_or(0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str, count: Option<u64>) -> UserRow {
        UserRow {
            uid: None,
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            analysis_count: count,
            last_active_at: None,
        }
    }

    #[test]
    fn test_total_treats_missing_as_zero() {
        let users = vec![
            user("Ana", "ana@example.com", Some(3)),
            user("Bo", "bo@example.com", None),
            user("Cy", "cy@example.com", Some(4)),
        ];
        assert_eq!(total_analyses(&users), 7);
    }

    #[test]
    fn test_averages() {
        let snapshot = DashboardSnapshot::collect(
            UserSummary {
                total_users: 4,
                active_users: 1,
            },
            vec![user("Ana", "a@x.io", Some(3)), user("Bo", "b@x.io", Some(1))],
            vec![],
            RegistrationSeries {
                labels: vec!["Mon".into(), "Tue".into()],
                data: vec![2, 5],
            },
        );

        assert_eq!(snapshot.total_analyses, 4);
        assert!((snapshot.average_analyses_per_user() - 2.0).abs() < f64::EPSILON);
        assert!((snapshot.active_ratio() - 0.25).abs() < f64::EPSILON);
        assert_eq!(snapshot.registrations_in_range(), 7);
    }

    #[test]
    fn test_empty_snapshot_has_zero_ratios() {
        let snapshot = DashboardSnapshot::collect(
            UserSummary::default(),
            vec![],
            vec![],
            RegistrationSeries::default(),
        );
        assert_eq!(snapshot.average_analyses_per_user(), 0.0);
        assert_eq!(snapshot.active_ratio(), 0.0);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let snapshot = DashboardSnapshot::collect(
            UserSummary::default(),
            vec![user("Ana Lima", "ana@example.com", None), user("Bo", "bo@corp.io", None)],
            vec![],
            RegistrationSeries::default(),
        );

        assert_eq!(snapshot.filter_users("LIMA").len(), 1);
        assert_eq!(snapshot.filter_users("corp").len(), 1);
        assert_eq!(snapshot.filter_users("  ").len(), 2);
    }

    #[test]
    fn test_range_parsing() {
        assert_eq!("weekly".parse::<RegistrationRange>().unwrap(), RegistrationRange::Weekly);
        assert!("yearly".parse::<RegistrationRange>().is_err());
    }
}
