use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("repository identifier {0:?} is not of the form owner/name")]
    Malformed(String),
}

/// A GitHub repository named as `owner/name`.
///
/// Construction always goes through [`FromStr`], so an existing value is known to
/// split into exactly two non-empty components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryIdentifier {
    full_name: String,
    separator: usize,
}

impl RepositoryIdentifier {
    pub fn owner(&self) -> &str {
        &self.full_name[..self.separator]
    }

    pub fn name(&self) -> &str {
        &self.full_name[self.separator + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.full_name
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}", self.full_name)
    }
}

impl FromStr for RepositoryIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    full_name: s.to_string(),
                    separator: owner.len(),
                })
            }
            _ => Err(IdentifierError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for RepositoryIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepositoryIdentifier> for String {
    fn from(value: RepositoryIdentifier) -> Self {
        value.full_name
    }
}

impl fmt::Display for RepositoryIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Metadata fetched for one repository.
///
/// The `Default` value doubles as the "no data available" sentinel used for
/// repositories that were not found or could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryInfo {
    #[serde(rename = "Stars")]
    pub stars: u64,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Topics", deserialize_with = "null_as_empty")]
    pub topics: Vec<String>,
    #[serde(rename = "Description")]
    pub description: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RepositoryInfo {
    pub fn sentinel() -> Self {
        Self::default()
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::default()
    }
}

pub type ResultMap = HashMap<RepositoryIdentifier, RepositoryInfo>;
