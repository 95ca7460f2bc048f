//! Closed tagged-variant types shared by the parser, link cache and graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A typed relationship between two notes, declared in front-matter or
/// inline as `relation:: [[Target]]`.
///
/// This is a fixed, closed set — there is no per-vault extension
/// mechanism, unlike a free-form tag. Every variant has a defined
/// (possibly approximate) inverse so that adding an edge in one direction
/// can register the reciprocal edge automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    ParentOf,
    ChildOf,
    RelatedTo,
    Supports,
    Contradicts,
    DependsOn,
    References,
    Extends,
    Implements,
    ExampleOf,
}

impl RelationType {
    pub const ALL: [RelationType; 10] = [
        RelationType::ParentOf,
        RelationType::ChildOf,
        RelationType::RelatedTo,
        RelationType::Supports,
        RelationType::Contradicts,
        RelationType::DependsOn,
        RelationType::References,
        RelationType::Extends,
        RelationType::Implements,
        RelationType::ExampleOf,
    ];

    /// The inverse relation to register on the target note.
    ///
    /// Some pairs are exact logical inverses (`parent_of` <-> `child_of`,
    /// `supports` <-> `contradicts`); others have no precise inverse and
    /// fall back to the nearest approximation, matching the mapping the
    /// original knowledge-graph implementation uses.
    pub fn inverse(self) -> RelationType {
        match self {
            RelationType::ParentOf => RelationType::ChildOf,
            RelationType::ChildOf => RelationType::ParentOf,
            RelationType::Supports => RelationType::Contradicts,
            RelationType::Contradicts => RelationType::Supports,
            RelationType::DependsOn => RelationType::References,
            RelationType::References => RelationType::DependsOn,
            RelationType::Extends => RelationType::RelatedTo,
            RelationType::Implements => RelationType::RelatedTo,
            RelationType::ExampleOf => RelationType::RelatedTo,
            RelationType::RelatedTo => RelationType::RelatedTo,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::ParentOf => "parent_of",
            RelationType::ChildOf => "child_of",
            RelationType::RelatedTo => "related_to",
            RelationType::Supports => "supports",
            RelationType::Contradicts => "contradicts",
            RelationType::DependsOn => "depends_on",
            RelationType::References => "references",
            RelationType::Extends => "extends",
            RelationType::Implements => "implements",
            RelationType::ExampleOf => "example_of",
        }
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "parent_of" | "parent" => Ok(RelationType::ParentOf),
            "child_of" | "child" => Ok(RelationType::ChildOf),
            "related_to" | "related" => Ok(RelationType::RelatedTo),
            "supports" => Ok(RelationType::Supports),
            "contradicts" => Ok(RelationType::Contradicts),
            "depends_on" | "depends" => Ok(RelationType::DependsOn),
            "references" | "reference" => Ok(RelationType::References),
            "extends" => Ok(RelationType::Extends),
            "implements" => Ok(RelationType::Implements),
            "example_of" | "example" => Ok(RelationType::ExampleOf),
            other => Err(format!("unknown relation type '{other}'")),
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An untyped `[[Wiki Link]]` extracted from a note body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiLink {
    /// Text between the brackets before any `|` split.
    pub target: String,
    /// Text after `|`, or `target` again when there is no pipe.
    pub display_text: String,
    /// 1-based line number the link occurs on.
    pub line_number: usize,
    /// Up to 50 characters of body text on either side of the link.
    pub context: String,
}

/// A typed relationship extracted from `relation:: [[Target]]` syntax or
/// declared in front-matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub relation_type: RelationType,
    pub target: String,
    pub line_number: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_is_reciprocal_for_exact_pairs() {
        assert_eq!(RelationType::ParentOf.inverse(), RelationType::ChildOf);
        assert_eq!(RelationType::ChildOf.inverse(), RelationType::ParentOf);
        assert_eq!(RelationType::Supports.inverse(), RelationType::Contradicts);
        assert_eq!(RelationType::Contradicts.inverse(), RelationType::Supports);
    }

    #[test]
    fn approximate_inverses_fall_back_to_related() {
        assert_eq!(RelationType::Extends.inverse(), RelationType::RelatedTo);
        assert_eq!(RelationType::Implements.inverse(), RelationType::RelatedTo);
        assert_eq!(RelationType::ExampleOf.inverse(), RelationType::RelatedTo);
    }

    #[test]
    fn depends_on_references_are_mutual_but_not_symmetric_inverse_of_each_other() {
        assert_eq!(RelationType::DependsOn.inverse(), RelationType::References);
        assert_eq!(RelationType::References.inverse(), RelationType::DependsOn);
    }

    #[test]
    fn from_str_is_case_and_separator_insensitive() {
        assert_eq!(
            RelationType::from_str("Parent-Of").unwrap(),
            RelationType::ParentOf
        );
        assert_eq!(
            RelationType::from_str("PARENT OF").unwrap(),
            RelationType::ParentOf
        );
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert!(RelationType::from_str("frobnicates").is_err());
    }

    #[test]
    fn display_roundtrips_through_from_str() {
        for variant in RelationType::ALL {
            let s = variant.to_string();
            assert_eq!(RelationType::from_str(&s).unwrap(), variant);
        }
    }
}
