use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tables published on the NDS-OM market watch page.
///
/// Each table is reachable two ways: through a portlet resource (AJAX) and
/// through a tab on the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableId {
    #[serde(rename = "ndsomEntityTable")]
    Ndsom,
    #[serde(rename = "oddLotEntityTable")]
    OddLot,
    #[serde(rename = "whenReIssuedEntityTable")]
    WhenReIssued,
    #[serde(rename = "whenIssuedEntityTable")]
    WhenIssued,
}

impl TableId {
    pub const ALL: [TableId; 4] = [
        TableId::Ndsom,
        TableId::OddLot,
        TableId::WhenReIssued,
        TableId::WhenIssued,
    ];

    /// The `id` attribute of the `<table>` element.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableId::Ndsom => "ndsomEntityTable",
            TableId::OddLot => "oddLotEntityTable",
            TableId::WhenReIssued => "whenReIssuedEntityTable",
            TableId::WhenIssued => "whenIssuedEntityTable",
        }
    }

    /// Portlet resource id serving this table as JSON.
    pub fn resource_id(&self) -> &'static str {
        match self {
            TableId::Ndsom => "getNdsomData",
            TableId::OddLot => "getOddLotData",
            TableId::WhenReIssued => "getWhenReIssuedData",
            TableId::WhenIssued => "getWhenIssuedData",
        }
    }

    /// CSS selector of the tab that reveals this table on the rendered page.
    pub fn default_tab_selector(&self) -> &'static str {
        match self {
            TableId::Ndsom => "a[href='#ndsomTab']",
            TableId::OddLot => "a[href='#oddLotTab']",
            TableId::WhenReIssued => "a[href='#whenReIssuedTab']",
            TableId::WhenIssued => "a[href='#whenIssuedTab']",
        }
    }

    /// CSS selector of the pager's "next" control (DataTables naming).
    pub fn next_control_selector(&self) -> String {
        format!("#{}_next", self.as_str())
    }

    /// CSS selector matching body rows of this table.
    pub fn row_selector(&self) -> String {
        format!("table#{} tbody tr", self.as_str())
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TableId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableId::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = TableId::ALL.iter().map(TableId::as_str).collect();
                AppError::ConfigError(format!(
                    "Unknown table '{s}'. Valid tables: {}",
                    known.join(", ")
                ))
            })
    }
}

/// How a table is retrieved from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// GET the server-rendered page and parse the table out of it.
    Html,
    /// POST to the portlet resource and decode its JSON payload.
    Direct,
    /// Drive a headless browser through every page of the table.
    Browser,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Html => "html",
            Strategy::Direct => "direct",
            Strategy::Browser => "browser",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Strategy::Html),
            "direct" => Ok(Strategy::Direct),
            "browser" => Ok(Strategy::Browser),
            _ => Err(AppError::ConfigError(format!(
                "Unknown strategy '{s}'. Valid strategies: html, direct, browser"
            ))),
        }
    }
}
