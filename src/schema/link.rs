use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::SchemaError;

/// Relation kind. Doubles as the edge label in the graph.
///
/// Edges always point from the row that declares the relation to the
/// resource it names: a port's `parent:project:<uuid>` column becomes
/// `port -parent-> project`, which is why tenant scoping walks `in('parent')`
/// from the project vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Ref,
    Parent,
    BackRef,
}

impl LinkKind {
    pub const ALL: [LinkKind; 3] = [LinkKind::Ref, LinkKind::Parent, LinkKind::BackRef];

    /// Edge label.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Ref => "ref",
            LinkKind::Parent => "parent",
            LinkKind::BackRef => "back_ref",
        }
    }

    /// Wide-row column prefixes that declare this kind of relation.
    ///
    /// Older keyspaces spell back references `backref:`; both are accepted.
    pub fn column_prefixes(&self) -> &'static [&'static str] {
        match self {
            LinkKind::Ref => &["ref:"],
            LinkKind::Parent => &["parent:"],
            LinkKind::BackRef => &["back_ref:", "backref:"],
        }
    }

    /// Match a column name against every relation prefix, returning the
    /// kind and the remainder of the column name.
    pub fn from_column(column: &str) -> Option<(LinkKind, &str)> {
        LinkKind::ALL.iter().find_map(|kind| {
            kind.column_prefixes()
                .iter()
                .find_map(|prefix| column.strip_prefix(prefix))
                .map(|rest| (*kind, rest))
        })
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ref" => Ok(LinkKind::Ref),
            "parent" => Ok(LinkKind::Parent),
            "back_ref" | "backref" => Ok(LinkKind::BackRef),
            other => Err(SchemaError::UnknownLinkKind(other.to_string())),
        }
    }
}
