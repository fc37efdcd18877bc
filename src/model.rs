use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grocery aisle an item is filed under. The discriminant is the grouping order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bakery = 0,
    Meat = 1,
    Dairy = 2,
    Vegetables = 3,
    Fruits = 4,
    Cosmetics = 5,
    Other = 6,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Bakery,
        Category::Meat,
        Category::Dairy,
        Category::Vegetables,
        Category::Fruits,
        Category::Cosmetics,
        Category::Other,
    ];

    pub fn order(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bakery => "bakery",
            Self::Meat => "meat",
            Self::Dairy => "dairy",
            Self::Vegetables => "vegetables",
            Self::Fruits => "fruits",
            Self::Cosmetics => "cosmetics",
            Self::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bakery => "Bakery",
            Self::Meat => "Meat & Fish",
            Self::Dairy => "Dairy",
            Self::Vegetables => "Vegetables",
            Self::Fruits => "Fruits",
            Self::Cosmetics => "Cosmetics",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// One line of a shopping list. Fields are fixed once the item is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    name: String,
    category: Category,
    sort_order: u32,
}

impl Item {
    pub(crate) fn new(name: String, category: Category, sort_order: u32) -> Self {
        Item {
            name,
            category,
            sort_order,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn sort_order(&self) -> u32 {
        self.sort_order
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingList {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<Item>,
}

impl ShoppingList {
    pub fn new(name: impl Into<String>, mut items: Vec<Item>) -> Self {
        items.sort_by_key(Item::sort_order);
        ShoppingList {
            name: name.into(),
            created_at: Utc::now(),
            items,
        }
    }

    /// Name used when the caller doesn't supply one, e.g. "List 2024-05-01 18:30".
    pub fn default_name(now: DateTime<Utc>) -> String {
        format!("List {}", now.format("%Y-%m-%d %H:%M"))
    }

    /// Items grouped by category, in category order. Empty groups are skipped.
    pub fn grouped(&self) -> Vec<(Category, Vec<&Item>)> {
        group_by_category(&self.items)
    }
}

pub fn group_by_category(items: &[Item]) -> Vec<(Category, Vec<&Item>)> {
    Category::ALL
        .into_iter()
        .filter_map(|cat| {
            let members: Vec<&Item> = items.iter().filter(|i| i.category == cat).collect();
            if members.is_empty() {
                None
            } else {
                Some((cat, members))
            }
        })
        .collect()
}
