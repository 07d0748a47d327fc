//! Filename classification for source CSV files.
//!
//! Each landed file belongs to exactly one category, determined by a prefix
//! match on the lowercased base name. The prefixes are disjoint, so no file
//! can match two categories. Files matching no rule are discarded (logged,
//! not an error).

use std::fmt;

use tracing::debug;

/// A source file category.
///
/// Closed set: every category maps to exactly one destination table and one
/// fixed column schema (see the `schema` module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Sales transactions (`venta*`).
    Sales,
    /// Inventory snapshots (`stock*`).
    Stock,
    /// Customer master data (`cliente*` or `deuda*`).
    Customer,
}

impl Category {
    /// All categories, in fixed processing order.
    pub const ALL: [Category; 3] = [Category::Sales, Category::Stock, Category::Customer];

    /// Classify an object name, or `None` if it matches no rule.
    ///
    /// Rules are applied to the lowercased base name; first match wins.
    pub fn classify(object_name: &str) -> Option<Category> {
        let name = base_name(object_name).to_lowercase();

        if name.starts_with("venta") {
            Some(Category::Sales)
        } else if name.starts_with("stock") {
            Some(Category::Stock)
        } else if name.starts_with("cliente") || name.starts_with("deuda") {
            Some(Category::Customer)
        } else {
            None
        }
    }

    /// Lowercase identifier used in config keys and log targets.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sales => "sales",
            Category::Stock => "stock",
            Category::Customer => "customer",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The base name of an object path (everything after the last `/`).
fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Listed source files partitioned into category buckets.
///
/// Listing order is preserved within each bucket.
#[derive(Debug, Default)]
pub struct Classified {
    sales: Vec<String>,
    stock: Vec<String>,
    customer: Vec<String>,
    discarded: Vec<String>,
}

impl Classified {
    /// Partition object names into category buckets.
    pub fn partition<I>(object_names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut classified = Classified::default();

        for name in object_names {
            match Category::classify(&name) {
                Some(Category::Sales) => classified.sales.push(name),
                Some(Category::Stock) => classified.stock.push(name),
                Some(Category::Customer) => classified.customer.push(name),
                None => {
                    debug!(file = %name, "Discarding unclassified file");
                    classified.discarded.push(name);
                }
            }
        }

        classified
    }

    /// Files in the given category, in listing order.
    pub fn files(&self, category: Category) -> &[String] {
        match category {
            Category::Sales => &self.sales,
            Category::Stock => &self.stock,
            Category::Customer => &self.customer,
        }
    }

    /// Files that matched no classification rule.
    pub fn discarded(&self) -> &[String] {
        &self.discarded
    }
}
