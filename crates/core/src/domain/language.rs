// Supported submission languages (closed set, case-sensitive codes).

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "cxx")]
    Cxx,
    #[serde(rename = "python2")]
    Python2,
    #[serde(rename = "python3")]
    Python3,
    #[serde(rename = "java")]
    Java,
}

impl Language {
    pub fn as_code(&self) -> &'static str {
        match self {
            Language::Cxx => "cxx",
            Language::Python2 => "python2",
            Language::Python3 => "python3",
            Language::Java => "java",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Cxx => "C++",
            Language::Python2 => "Python 2",
            Language::Python3 => "Python 3",
            Language::Java => "Java",
        }
    }

    pub fn parse(code: &str) -> Result<Language> {
        match code {
            "cxx" => Ok(Language::Cxx),
            "python2" => Ok(Language::Python2),
            "python3" => Ok(Language::Python3),
            "java" => Ok(Language::Java),
            other => Err(DomainError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}
