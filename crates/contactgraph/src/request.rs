//! Request vocabulary of the read path: filters, sort orders and fetch hints.

use crate::value::Value;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Relationship type of group membership.
pub const RELATIONSHIP_HAS_MEMBER: &str = "HasMember";

/// How a filter value is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchKind {
    /// Whole value equality
    #[default]
    Exactly,
    /// Substring
    Contains,
    /// Prefix
    StartsWith,
    /// Suffix
    EndsWith,
}

/// Match options of a detail filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchFlags {
    /// Comparison applied
    pub kind: MatchKind,
    /// Compare as strings even for exact matches
    pub fixed_string: bool,
    /// Respect case when comparing strings
    pub case_sensitive: bool,
    /// Compare phone numbers by their local suffix
    pub phone_number: bool,
}

impl MatchFlags {
    /// Flags for `kind` with default options.
    pub fn new(kind: MatchKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Exact string comparison.
    pub fn fixed_string() -> Self {
        Self {
            fixed_string: true,
            ..Self::default()
        }
    }

    /// Phone number comparison.
    pub fn phone_number() -> Self {
        Self {
            phone_number: true,
            ..Self::default()
        }
    }

    /// Respect case.
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Whether values are compared as strings.
    pub fn is_string_compare(&self) -> bool {
        self.fixed_string || self.kind != MatchKind::Exactly
    }
}

/// Bound handling of a range filter; the default range is `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RangeFlags {
    /// Exclude the lower bound
    pub exclude_lower: bool,
    /// Include the upper bound
    pub include_upper: bool,
}

impl RangeFlags {
    /// `[min, max]`
    pub fn closed() -> Self {
        Self {
            exclude_lower: false,
            include_upper: true,
        }
    }
}

/// Event selected by a change log filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeLogEvent {
    /// Created at or after the threshold
    Added,
    /// Modified at or after the threshold
    Changed,
    /// Removed at or after the threshold
    Removed,
}

/// Side of a relationship the filtered contact is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelationshipRole {
    /// The related contact is the first participant, e.g. the group
    First,
    /// The related contact is the second participant, e.g. the member
    Second,
    /// Either side
    #[default]
    Either,
}

/// A contact named by its manager and local id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRef {
    /// URI of the manager owning the contact, empty for the local manager
    pub manager_uri: String,
    /// Local id within that manager
    pub local_id: u32,
}

impl ContactRef {
    /// A contact of the local manager.
    pub fn local(local_id: u32) -> Self {
        Self {
            manager_uri: String::new(),
            local_id,
        }
    }
}

/// A filter over contacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Matches everything
    #[default]
    Default,
    /// Matches nothing
    Invalid,
    /// Compare a detail field, or any field of the detail when `field` is `None`.
    ///
    /// A null `value` matches contacts having the detail or field at all.
    DetailField {
        /// Detail definition name
        detail: String,
        /// Field name
        field: Option<String>,
        /// Compared value
        value: Value,
        /// Comparison options
        flags: MatchFlags,
    },
    /// Compare a detail field against a range; a null bound is open
    DetailRange {
        /// Detail definition name
        detail: String,
        /// Field name
        field: String,
        /// Lower bound
        min: Value,
        /// Upper bound
        max: Value,
        /// Bound handling
        range: RangeFlags,
        /// Comparison options
        flags: MatchFlags,
    },
    /// Contacts with one of these local ids
    LocalId(Vec<u32>),
    /// Contacts changed since a point in time
    ChangeLog {
        /// Change selected
        event: ChangeLogEvent,
        /// Threshold
        since: DateTime<FixedOffset>,
    },
    /// Contacts taking part in a relationship
    Relationship {
        /// Relationship type, e.g. [`RELATIONSHIP_HAS_MEMBER`]
        relationship_type: String,
        /// Role of the related contact
        role: RelationshipRole,
        /// The other participant, any contact when `None`
        related: Option<ContactRef>,
    },
    /// All children match
    Intersection(Vec<Filter>),
    /// Any child matches
    Union(Vec<Filter>),
}

impl Filter {
    /// Compare `detail.field` with `value`.
    pub fn detail_field(
        detail: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
        flags: MatchFlags,
    ) -> Self {
        Filter::DetailField {
            detail: detail.into(),
            field: Some(field.into()),
            value: value.into(),
            flags,
        }
    }

    /// Contacts having a `detail`.
    pub fn has_detail(detail: impl Into<String>) -> Self {
        Filter::DetailField {
            detail: detail.into(),
            field: None,
            value: Value::Null,
            flags: MatchFlags::default(),
        }
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Filter) -> Self {
        Filter::Intersection(vec![self, other])
    }

    /// Disjunction of `self` and `other`.
    pub fn or(self, other: Filter) -> Self {
        Filter::Union(vec![self, other])
    }
}

/// Sort direction of a sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Placement of contacts lacking the sorted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlankPolicy {
    /// Blank values sort before all others
    #[default]
    BlanksFirst,
    /// Blank values sort after all others
    BlanksLast,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Detail definition name
    pub detail: String,
    /// Field name
    pub field: String,
    /// Direction
    pub direction: SortDirection,
    /// Blank handling
    pub blank_policy: BlankPolicy,
    /// Respect case
    pub case_sensitive: bool,
}

impl SortOrder {
    /// Ascending, case-insensitive, blanks first.
    pub fn new(detail: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            field: field.into(),
            direction: SortDirection::default(),
            blank_policy: BlankPolicy::default(),
            case_sensitive: false,
        }
    }

    /// Sort largest first.
    pub fn descending(mut self) -> Self {
        self.direction = SortDirection::Descending;
        self
    }

    /// Set the blank policy.
    pub fn with_blank_policy(mut self, blank_policy: BlankPolicy) -> Self {
        self.blank_policy = blank_policy;
        self
    }

    /// Respect case.
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

/// What a fetch should return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchHint {
    /// Detail definitions to fetch; empty fetches everything
    pub details: Vec<String>,
    /// Skip the relationship columns
    pub no_relationships: bool,
}

impl FetchHint {
    /// Fetch only `details`.
    pub fn details<I, S>(details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            details: details.into_iter().map(Into::into).collect(),
            no_relationships: false,
        }
    }

    /// Skip the relationship columns.
    pub fn without_relationships(mut self) -> Self {
        self.no_relationships = true;
        self
    }

    /// Whether every detail is fetched.
    pub fn fetches_all(&self) -> bool {
        self.details.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_compare_flags() {
        assert!(!MatchFlags::default().is_string_compare());
        assert!(MatchFlags::fixed_string().is_string_compare());
        assert!(MatchFlags::new(MatchKind::Contains).is_string_compare());
        assert!(!MatchFlags::phone_number().is_string_compare());
    }

    #[test]
    fn test_sort_order_defaults() {
        let order = SortOrder::new("Name", "FirstName");
        assert_eq!(order.blank_policy, BlankPolicy::BlanksFirst);
        assert!(!order.case_sensitive);
        assert_eq!(order.descending().direction, SortDirection::Descending);
    }

    #[test]
    fn test_filter_builders() {
        let filter = Filter::has_detail("Tag").and(Filter::LocalId(vec![1]));
        match filter {
            Filter::Intersection(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected filter {other:?}"),
        }
    }
}
