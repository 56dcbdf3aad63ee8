use std::{fmt, result};

use serde::Serialize;

use crate::{
    chain::{ChainArena, ChainDefect},
    errors::GraphSeqError,
    graph::{RelType, Snapshot},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub container: i64,
    pub rel_type: RelType,
    pub epoch: i64,
    pub members: usize,
    pub links: usize,
    pub heads: usize,
    pub tails: usize,
    pub reachable: usize,
    pub defects: Vec<ChainDefect>,
}

impl ChainReport {
    pub fn has_issues(&self) -> bool {
        !self.defects.is_empty() || self.heads > 1 || self.reachable != self.members
    }
}

#[derive(Debug)]
pub struct ChainIntegrityError {
    pub reports: Vec<ChainReport>,
    pub source: Option<GraphSeqError>,
}

impl fmt::Display for ChainIntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let broken = self.reports.iter().filter(|r| r.has_issues()).count();
        write!(f, "{broken} broken chain(s) detected")
    }
}

impl std::error::Error for ChainIntegrityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &dyn std::error::Error)
    }
}

pub fn chain_report(
    snapshot: &Snapshot<'_>,
    container: i64,
    rel_type: RelType,
) -> Result<ChainReport, GraphSeqError> {
    let arena = ChainArena::load(snapshot, container, rel_type)?;
    Ok(ChainReport {
        container,
        rel_type,
        epoch: snapshot.epoch(),
        members: arena.len(),
        links: arena.link_count(),
        heads: arena.head_candidates(),
        tails: arena.tail_candidates(),
        reachable: arena.walk().len(),
        defects: arena.defects().to_vec(),
    })
}

/// Reports every membership chain hanging off `container`.
pub fn run_chain_checks(
    snapshot: &Snapshot<'_>,
    container: i64,
) -> Result<Vec<ChainReport>, GraphSeqError> {
    let mut reports = Vec::new();
    for rel_type in RelType::ALL.into_iter().filter(|tag| tag.is_membership()) {
        let report = chain_report(snapshot, container, rel_type)?;
        if report.members > 0 {
            reports.push(report);
        }
    }
    Ok(reports)
}

pub fn run_strict_chain_checks(
    snapshot: &Snapshot<'_>,
    container: i64,
) -> result::Result<(), ChainIntegrityError> {
    let reports = run_chain_checks(snapshot, container).map_err(|err| ChainIntegrityError {
        reports: Vec::new(),
        source: Some(err),
    })?;
    if reports.iter().any(ChainReport::has_issues) {
        Err(ChainIntegrityError {
            reports,
            source: None,
        })
    } else {
        Ok(())
    }
}
