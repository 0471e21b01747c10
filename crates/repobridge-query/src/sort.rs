//! Sort descriptors over property names.

pub use repobridge_core::{Direction, NullHandling};

/// One sort term: a property and how to order it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Order {
    property: String,
    direction: Direction,
    ignore_case: bool,
    null_handling: NullHandling,
}

impl Order {
    pub fn new(direction: Direction, property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction,
            ignore_case: false,
            null_handling: NullHandling::Native,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(Direction::Asc, property)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(Direction::Desc, property)
    }

    /// Compare text case-insensitively.
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn nulls_first(mut self) -> Self {
        self.null_handling = NullHandling::NullsFirst;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.null_handling = NullHandling::NullsLast;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn null_handling(&self) -> NullHandling {
        self.null_handling
    }
}

/// An ordered sequence of sort terms.
///
/// ```
/// use repobridge_query::{Order, Sort};
///
/// let sort = Sort::by(["lastName", "firstName"]).and(Sort::from(Order::desc("age")));
/// let names: Vec<_> = sort.iter().map(Order::property).collect();
/// assert_eq!(names, ["lastName", "firstName", "age"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    /// No ordering.
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Ascending on each property, in the given order.
    pub fn by<I, P>(properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self::by_direction(Direction::Asc, properties)
    }

    /// One direction for every property.
    pub fn by_direction<I, P>(direction: Direction, properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        properties
            .into_iter()
            .map(|p| Order::new(direction, p))
            .collect()
    }

    /// Append the terms of `other`.
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    /// Flip every term.
    pub fn descending(self) -> Self {
        self.with_direction(Direction::Desc)
    }

    pub fn ascending(self) -> Self {
        self.with_direction(Direction::Asc)
    }

    fn with_direction(self, direction: Direction) -> Self {
        self.orders
            .into_iter()
            .map(|o| o.with_direction(direction))
            .collect()
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// Term for `property`, if present.
    pub fn order_for(&self, property: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.property == property)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl From<Order> for Sort {
    fn from(order: Order) -> Self {
        Self {
            orders: vec![order],
        }
    }
}

impl FromIterator<Order> for Sort {
    fn from_iter<T: IntoIterator<Item = Order>>(iter: T) -> Self {
        Self {
            orders: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Sort {
    type Item = &'a Order;
    type IntoIter = std::slice::Iter<'a, Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}
