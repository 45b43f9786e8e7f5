//! Item categories: static SKU lists, per-line classification, dynamic id sets
//!
//! The loader stamps six boolean flags onto every transaction line; cookies
//! and sides have no flag and are matched by SKU instead.

use super::line_reader::{LineFilter, ReaderError, SqliteLineReader, TransactionLine};
use std::collections::HashSet;

pub type ItemId = i64;

/// Cookie SKUs (no loader flag, matched by id)
pub const COOKIE_ITEM_IDS: &[ItemId] = &[700001, 700002];

/// Side SKUs reported as their own table
pub const SIDE_ITEM_IDS: &[ItemId] = &[680001, 680002, 680003, 680004];

/// Dip SKUs substituted when the window has no flagged caesar-dip rows
pub const CAESAR_DIP_FALLBACK_IDS: &[ItemId] = &[620001, 620002, 620003];

/// Crazy Sauce SKU (standalone cross-sell list)
pub const CRAZY_SAUCE_ITEM_ID: ItemId = 620010;

/// 20oz bottle SKUs tracked as individual sold-with counters
pub const PEPSI_20OZ_ITEM_ID: ItemId = 900101;
pub const DIET_PEPSI_20OZ_ITEM_ID: ItemId = 900102;
pub const MTN_DEW_20OZ_ITEM_ID: ItemId = 900103;

/// 2-liter bottle SKUs (standalone cross-sell list)
pub const BEV_2L_ITEM_IDS: &[ItemId] = &[900201, 900202];

/// Boolean flag columns precomputed by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFlag {
    Pizza,
    Bread,
    Wings,
    Beverages,
    CrazyPuffs,
    CaesarDip,
}

impl CategoryFlag {
    pub fn column(&self) -> &'static str {
        match self {
            CategoryFlag::Pizza => "is_pizza",
            CategoryFlag::Bread => "is_bread",
            CategoryFlag::Wings => "is_wings",
            CategoryFlag::Beverages => "is_beverages",
            CategoryFlag::CrazyPuffs => "is_crazy_puffs",
            CategoryFlag::CaesarDip => "is_caesar_dip",
        }
    }
}

/// Category resolved once per line
///
/// Check order doubles as companion-attribution precedence: bread beats every
/// later category, so a multi-flagged line lands in exactly one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryTag {
    Bread,
    Cookie,
    CaesarDip,
    Wings,
    Beverage,
    CrazyPuffs,
    Pizza,
    Side,
    Other,
}

impl CategoryTag {
    pub fn classify(line: &TransactionLine) -> Self {
        if line.is_bread {
            CategoryTag::Bread
        } else if COOKIE_ITEM_IDS.contains(&line.item_id) {
            CategoryTag::Cookie
        } else if line.is_caesar_dip {
            CategoryTag::CaesarDip
        } else if line.is_wings {
            CategoryTag::Wings
        } else if line.is_beverages {
            CategoryTag::Beverage
        } else if line.is_crazy_puffs {
            CategoryTag::CrazyPuffs
        } else if line.is_pizza {
            CategoryTag::Pizza
        } else if SIDE_ITEM_IDS.contains(&line.item_id) {
            CategoryTag::Side
        } else {
            CategoryTag::Other
        }
    }
}

/// Distinct item-id sets per category for one report window
#[derive(Debug, Clone)]
pub struct CategoryIdSets {
    pub pizza: Vec<ItemId>,
    pub bread: Vec<ItemId>,
    pub wings: Vec<ItemId>,
    pub beverages: Vec<ItemId>,
    pub crazy_puffs: Vec<ItemId>,
    pub caesar_dip: Vec<ItemId>,
    pub cookies: Vec<ItemId>,
    pub sides: Vec<ItemId>,
}

impl CategoryIdSets {
    /// Derive the flag-driven sets from the window; cookies and sides stay static
    pub fn build(reader: &SqliteLineReader, filter: &LineFilter) -> Result<Self, ReaderError> {
        let pizza = reader.distinct_flag_ids(CategoryFlag::Pizza, filter)?;
        let bread = reader.distinct_flag_ids(CategoryFlag::Bread, filter)?;
        let wings = reader.distinct_flag_ids(CategoryFlag::Wings, filter)?;
        let beverages = reader.distinct_flag_ids(CategoryFlag::Beverages, filter)?;
        let crazy_puffs = reader.distinct_flag_ids(CategoryFlag::CrazyPuffs, filter)?;
        let caesar_dip = reader.distinct_flag_ids(CategoryFlag::CaesarDip, filter)?;

        Ok(Self::from_dynamic(pizza, bread, wings, beverages, crazy_puffs, caesar_dip))
    }

    /// Assemble sets from already-derived dynamic lists
    ///
    /// An empty caesar-dip list means the window simply had none on the menu
    /// export; the fallback SKUs stand in so the table never vanishes.
    pub fn from_dynamic(
        pizza: Vec<ItemId>,
        bread: Vec<ItemId>,
        wings: Vec<ItemId>,
        beverages: Vec<ItemId>,
        crazy_puffs: Vec<ItemId>,
        caesar_dip: Vec<ItemId>,
    ) -> Self {
        let caesar_dip = if caesar_dip.is_empty() {
            log::debug!("No flagged caesar-dip rows in window, using fallback SKUs");
            CAESAR_DIP_FALLBACK_IDS.to_vec()
        } else {
            caesar_dip
        };

        Self {
            pizza,
            bread,
            wings,
            beverages,
            crazy_puffs,
            caesar_dip,
            cookies: COOKIE_ITEM_IDS.to_vec(),
            sides: SIDE_ITEM_IDS.to_vec(),
        }
    }

    /// Union of every category set, deduplicated and ascending
    pub fn relevant_universe(&self) -> Vec<ItemId> {
        let mut ids: HashSet<ItemId> = HashSet::new();
        for set in [
            &self.pizza,
            &self.bread,
            &self.wings,
            &self.beverages,
            &self.crazy_puffs,
            &self.caesar_dip,
            &self.cookies,
            &self.sides,
        ] {
            ids.extend(set.iter().copied());
        }

        let mut ids: Vec<ItemId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids
    }
}
