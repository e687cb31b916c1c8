use crate::domain::models::repository::{RepositoryIdentifier, RepositoryInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Growth windows reported for every repository, in days.
pub const GROWTH_PERIODS: [u32; 3] = [365, 180, 30];

/// Star counts for one repository over one growth window.
///
/// `penult` counts stars received before the window and `ult` stars received
/// inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarWindow {
    pub repo_name: String,
    pub period_days: u32,
    pub penult: u64,
    pub ult: u64,
}

impl StarWindow {
    /// Ratio of all stars to the stars before the window, rounded to three decimals.
    ///
    /// Returns `None` for a zero baseline.
    pub fn growth(&self) -> Option<f64> {
        if self.penult == 0 {
            return None;
        }
        #[expect(clippy::cast_precision_loss, reason = "star counts stay far below 2^52")]
        let ratio = (self.penult + self.ult) as f64 / self.penult as f64;
        Some((ratio * 1000.0).round() / 1000.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub growth30: f64,
    pub growth180: f64,
    pub growth365: f64,
}

impl GrowthMetrics {
    pub fn set(&mut self, period_days: u32, growth: f64) -> bool {
        match period_days {
            30 => self.growth30 = growth,
            180 => self.growth180 = growth,
            365 => self.growth365 = growth,
            _ => return false,
        }
        true
    }
}

pub type GrowthTable = BTreeMap<RepositoryIdentifier, GrowthMetrics>;

/// Repositories that GitHub attributes to a language they have little to do with.
const LANGUAGE_BLOCKLIST: &[&str] = &[
    "996icu/996.ICU",
    "public-apis/public-apis",
    "CyC2018/CS-Notes",
    "awesome-selfhosted/awesome-selfhosted",
    "jaywcjlove/awesome-mac",
    "bayandin/awesome-awesomeness",
    "donnemartin/system-design-primer",
];

pub fn language_counts(id: &RepositoryIdentifier) -> bool {
    !LANGUAGE_BLOCKLIST.contains(&id.as_str())
}

/// One output row joining growth metrics with fetched metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportRow {
    pub name: String,
    pub url: String,
    pub stars: u64,
    pub growth30: f64,
    pub growth180: f64,
    pub growth365: f64,
    pub language: String,
    pub topics: String,
    pub description: String,
}

impl ReportRow {
    pub fn new(
        id: &RepositoryIdentifier,
        growth: GrowthMetrics,
        info: Option<&RepositoryInfo>,
    ) -> Self {
        let sentinel = RepositoryInfo::sentinel();
        let info = info.unwrap_or(&sentinel);
        let language = if language_counts(id) {
            info.language.clone()
        } else {
            String::new()
        };

        Self {
            name: id.to_string(),
            url: id.html_url(),
            stars: info.stars,
            growth30: growth.growth30,
            growth180: growth.growth180,
            growth365: growth.growth365,
            language,
            topics: info.topics.join(", "),
            description: info.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(penult: u64, ult: u64) -> StarWindow {
        StarWindow {
            repo_name: "a/b".to_string(),
            period_days: 30,
            penult,
            ult,
        }
    }

    #[test]
    fn test_growth_is_rounded_to_three_decimals() {
        assert_eq!(window(3, 1).growth(), Some(1.333));
        assert_eq!(window(10, 10).growth(), Some(2.0));
        assert_eq!(window(7, 0).growth(), Some(1.0));
    }

    #[test]
    fn test_growth_skips_zero_baseline() {
        assert_eq!(window(0, 50).growth(), None);
    }

    #[test]
    fn test_growth_metrics_ignore_unknown_periods() {
        let mut metrics = GrowthMetrics::default();
        assert!(metrics.set(180, 1.5));
        assert!(!metrics.set(7, 9.0));
        assert_eq!(
            metrics,
            GrowthMetrics {
                growth30: 0.0,
                growth180: 1.5,
                growth365: 0.0
            }
        );
    }

    #[test]
    fn test_report_row_joins_metadata() -> anyhow::Result<()> {
        let id: RepositoryIdentifier = "test/repo".parse()?;
        let info = RepositoryInfo {
            stars: 55,
            language: "Go".to_string(),
            topics: vec!["a".to_string(), "b".to_string()],
            description: String::new(),
        };
        let growth = GrowthMetrics {
            growth30: 1.1,
            growth180: 1.2,
            growth365: 1.3,
        };

        let row = ReportRow::new(&id, growth, Some(&info));
        assert_eq!(
            serde_json::to_string(&row)?,
            concat!(
                r#"{"Name":"test/repo","Url":"https://github.com/test/repo","Stars":55,"#,
                r#""Growth30":1.1,"Growth180":1.2,"Growth365":1.3,"#,
                r#""Language":"Go","Topics":"a, b","Description":""}"#,
            )
        );
        Ok(())
    }

    #[test]
    fn test_report_row_without_metadata_is_empty() -> anyhow::Result<()> {
        let id: RepositoryIdentifier = "gone/repo".parse()?;
        let row = ReportRow::new(&id, GrowthMetrics::default(), None);
        assert_eq!(row.stars, 0);
        assert!(row.language.is_empty());
        assert!(row.topics.is_empty());
        Ok(())
    }

    #[test]
    fn test_report_row_clears_blocklisted_language() -> anyhow::Result<()> {
        let id: RepositoryIdentifier = "public-apis/public-apis".parse()?;
        let info = RepositoryInfo {
            stars: 1,
            language: "Python".to_string(),
            ..RepositoryInfo::default()
        };
        let row = ReportRow::new(&id, GrowthMetrics::default(), Some(&info));
        assert!(row.language.is_empty());
        assert_eq!(row.stars, 1);
        Ok(())
    }
}
