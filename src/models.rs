use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use rusqlite::Connection;

use crate::error::{CafeteriaError, Result};

pub type CategoryId = i64;

/// Display name of the "no category filter" choice.
pub const ALL_CATEGORIES: &str = "Todas";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Open,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Spelling stored in `pedidos.estado_pedido`.
    pub fn as_db(&self) -> &'static str {
        match self {
            OrderStatus::Open => "abierta",
            OrderStatus::Preparing => "preparacion",
            OrderStatus::Ready => "lista",
            OrderStatus::Delivered => "entregada",
            OrderStatus::Cancelled => "cancelada",
        }
    }

    fn english(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Next (or previous, for negative steps) status in display order, wrapping around.
    pub fn cycle(&self, step: i32) -> OrderStatus {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0) as i32;
        let len = Self::ALL.len() as i32;
        Self::ALL[(idx + step).rem_euclid(len) as usize]
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db())
    }
}

impl FromStr for OrderStatus {
    type Err = CafeteriaError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|st| st.as_db() == needle || st.english() == needle)
            .ok_or_else(|| CafeteriaError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(CategoryId),
}

/// The user's current filter choices. Replaced wholesale whenever a control changes.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterContext {
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub max_amount: f64,
    pub status: OrderStatus,
    pub category: CategoryFilter,
}

impl FilterContext {
    /// Today-only range, open orders, every category.
    pub fn with_max_amount(max_amount: f64) -> Self {
        let today = Local::now().date_naive();
        Self {
            date_start: today,
            date_end: today,
            max_amount,
            status: OrderStatus::Open,
            category: CategoryFilter::All,
        }
    }
}

impl Default for FilterContext {
    fn default() -> Self {
        Self::with_max_amount(100.0)
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CafeteriaError::InvalidDate(raw.to_string()))
}

/// Category names to ids, in alphabetical order.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    by_name: BTreeMap<String, CategoryId>,
}

impl CategoryCatalog {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt =
            conn.prepare("SELECT id_categoria, nombre_categoria FROM categorias ORDER BY 2")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(1)?, row.get(0)?)))?;
        let pairs = rows.collect::<std::result::Result<Vec<(String, CategoryId)>, _>>()?;
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, CategoryId)>,
        S: Into<String>,
    {
        Self {
            by_name: pairs.into_iter().map(|(n, id)| (n.into(), id)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CategoryId)> {
        self.by_name.iter().map(|(n, id)| (n.as_str(), *id))
    }

    /// Selector choices: the sentinel first, then every category by name.
    pub fn options(&self) -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(self.by_name.values().map(|id| CategoryFilter::Only(*id)))
            .collect()
    }

    /// Turn a selector name into a filter. `Todas` (any case) means no filter.
    pub fn resolve(&self, selection: &str) -> Result<CategoryFilter> {
        let selection = selection.trim();
        if selection.eq_ignore_ascii_case(ALL_CATEGORIES) {
            return Ok(CategoryFilter::All);
        }
        self.by_name
            .get(selection)
            .map(|id| CategoryFilter::Only(*id))
            .ok_or_else(|| CafeteriaError::UnknownCategory(selection.to_string()))
    }

    pub fn label(&self, filter: CategoryFilter) -> String {
        match filter {
            CategoryFilter::All => ALL_CATEGORIES.to_string(),
            CategoryFilter::Only(id) => self
                .by_name
                .iter()
                .find(|(_, v)| **v == id)
                .map(|(n, _)| n.clone())
                .unwrap_or_else(|| format!("#{id}")),
        }
    }

    /// Step through `options()` from `current`, wrapping around.
    pub fn cycle(&self, current: CategoryFilter, step: i32) -> CategoryFilter {
        let options = self.options();
        let idx = options.iter().position(|o| *o == current).unwrap_or(0) as i32;
        options[(idx + step).rem_euclid(options.len() as i32) as usize]
    }
}
