use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::GraphSeqError;

/// Closed vocabulary of relation tags understood by the collection engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelType {
    /// Container to element of a list or set.
    Member,
    /// Membership relation to the following membership relation.
    Next,
    /// Matrix to row wrapper.
    Row,
    /// Matrix to column wrapper.
    Column,
    /// Row wrapper to column wrapper, carrying a cell payload.
    Value,
    /// Row or column wrapper to its label holder.
    Label,
}

impl RelType {
    pub const ALL: [RelType; 6] = [
        RelType::Member,
        RelType::Next,
        RelType::Row,
        RelType::Column,
        RelType::Value,
        RelType::Label,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelType::Member => "Member",
            RelType::Next => "Next",
            RelType::Row => "Row",
            RelType::Column => "Column",
            RelType::Value => "Value",
            RelType::Label => "Label",
        }
    }

    /// Tags that can anchor a chain of `Next` links.
    pub fn is_membership(self) -> bool {
        match self {
            RelType::Member | RelType::Row | RelType::Column => true,
            RelType::Next | RelType::Value | RelType::Label => false,
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelType {
    type Err = GraphSeqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelType::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| GraphSeqError::schema(format!("unknown relation type {s:?}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEntity {
    pub id: i64,
    pub kind: String,
    pub data: serde_json::Value,
    pub created_tx: i64,
    pub terminated_tx: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphRelation {
    pub id: i64,
    pub source: i64,
    pub target: i64,
    pub rel_type: RelType,
    pub data: serde_json::Value,
    pub created_tx: i64,
    pub terminated_tx: Option<i64>,
}

impl GraphEntity {
    /// Hides a termination that happened after `epoch`.
    pub(crate) fn as_of(mut self, epoch: i64) -> Self {
        if self.terminated_tx.is_some_and(|tx| tx > epoch) {
            self.terminated_tx = None;
        }
        self
    }
}

impl GraphRelation {
    pub(crate) fn as_of(mut self, epoch: i64) -> Self {
        if self.terminated_tx.is_some_and(|tx| tx > epoch) {
            self.terminated_tx = None;
        }
        self
    }

    pub fn source(&self) -> i64 {
        self.source
    }

    pub fn target(&self) -> i64 {
        self.target
    }
}

pub(crate) const ENTITY_COLUMNS: &str = "id, kind, data, created_tx, terminated_tx";
pub(crate) const RELATION_COLUMNS: &str =
    "id, source_id, target_id, rel_type, data, created_tx, terminated_tx";

pub(crate) fn validate_kind(kind: &str) -> Result<(), GraphSeqError> {
    if kind.trim().is_empty() {
        return Err(GraphSeqError::invalid_input("entity kind must be set"));
    }
    Ok(())
}

pub(crate) fn row_to_entity(row: &rusqlite::Row<'_>) -> Result<GraphEntity, rusqlite::Error> {
    let data: String = row.get(2)?;
    Ok(GraphEntity {
        id: row.get(0)?,
        kind: row.get(1)?,
        data: parse_json(&data)?,
        created_tx: row.get(3)?,
        terminated_tx: row.get(4)?,
    })
}

pub(crate) fn row_to_relation(row: &rusqlite::Row<'_>) -> Result<GraphRelation, rusqlite::Error> {
    let tag: String = row.get(3)?;
    let rel_type = tag.parse::<RelType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let data: String = row.get(4)?;
    Ok(GraphRelation {
        id: row.get(0)?,
        source: row.get(1)?,
        target: row.get(2)?,
        rel_type,
        data: parse_json(&data)?,
        created_tx: row.get(5)?,
        terminated_tx: row.get(6)?,
    })
}

fn parse_json(data: &str) -> Result<serde_json::Value, rusqlite::Error> {
    serde_json::from_str(data).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            data.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rel_type_tags_parse_back() {
        for tag in RelType::ALL {
            assert_eq!(tag.as_str().parse::<RelType>().unwrap(), tag);
        }
        assert!(matches!(
            "ListElement".parse::<RelType>(),
            Err(GraphSeqError::SchemaError(_))
        ));
    }

    #[test]
    fn only_anchor_tags_are_membership() {
        let anchors: Vec<_> = RelType::ALL
            .into_iter()
            .filter(|tag| tag.is_membership())
            .collect();
        assert_eq!(anchors, vec![RelType::Member, RelType::Row, RelType::Column]);
    }
}
