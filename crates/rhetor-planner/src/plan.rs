//! Document plans

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fd::Fd;

/// Paragraphs of aggregation segments of clauses.
///
/// Every paragraph and segment is non-empty once the plan is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentPlan {
    paragraphs: Vec<Vec<Vec<Fd>>>,
}

impl Default for DocumentPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentPlan {
    pub fn new() -> Self {
        Self {
            paragraphs: vec![vec![Vec::new()]],
        }
    }

    fn last_paragraph(&mut self) -> &mut Vec<Vec<Fd>> {
        if self.paragraphs.is_empty() {
            self.paragraphs.push(vec![Vec::new()]);
        }
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    pub fn add_clause(&mut self, clause: Fd) {
        let paragraph = self.last_paragraph();
        if paragraph.is_empty() {
            paragraph.push(Vec::new());
        }
        let last = paragraph.len() - 1;
        paragraph[last].push(clause);
    }

    /// Close the current segment unless it is still empty.
    pub fn add_aggregation_boundary(&mut self) {
        let paragraph = self.last_paragraph();
        if paragraph.last().map_or(false, |segment| !segment.is_empty()) {
            paragraph.push(Vec::new());
        }
    }

    /// Close the current paragraph, dropping an empty trailing segment.
    ///
    /// A paragraph left without segments is reused instead of closed.
    pub fn add_paragraph_boundary(&mut self) {
        let paragraph = self.last_paragraph();
        if paragraph.last().map_or(false, Vec::is_empty) {
            paragraph.pop();
        }
        if paragraph.is_empty() {
            paragraph.push(Vec::new());
        } else {
            self.paragraphs.push(vec![Vec::new()]);
        }
    }

    /// Drop the empty segment and paragraph left open at the end.
    pub fn finish(&mut self) {
        if let Some(paragraph) = self.paragraphs.last_mut() {
            if paragraph.last().map_or(false, Vec::is_empty) {
                paragraph.pop();
            }
            if paragraph.is_empty() {
                self.paragraphs.pop();
            }
        }
    }

    pub fn paragraphs(&self) -> &[Vec<Vec<Fd>>] {
        &self.paragraphs
    }

    /// Every clause, in order.
    pub fn clauses(&self) -> impl Iterator<Item = &Fd> {
        self.paragraphs.iter().flatten().flatten()
    }

    pub fn clause_count(&self) -> usize {
        self.clauses().count()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses().next().is_none()
    }
}

impl fmt::Display for DocumentPlan {
    /// One `paragraph.segment.clause.{json}` line per clause, 1-based.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DocumentPlan:")?;
        for (p, paragraph) in self.paragraphs.iter().enumerate() {
            for (s, segment) in paragraph.iter().enumerate() {
                for (c, clause) in segment.iter().enumerate() {
                    let json = serde_json::to_string(clause).map_err(|_| fmt::Error)?;
                    writeln!(f, "{}.{}.{}.{json}", p + 1, s + 1, c + 1)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fd::FdValue;

    fn clause(n: i64) -> Fd {
        [("n".to_string(), FdValue::Ground(n.into()))]
            .into_iter()
            .collect()
    }

    fn shape(plan: &DocumentPlan) -> Vec<Vec<usize>> {
        plan.paragraphs()
            .iter()
            .map(|p| p.iter().map(Vec::len).collect())
            .collect()
    }

    #[test]
    fn boundaries_only_close_non_empty_groups() {
        let mut plan = DocumentPlan::new();
        plan.add_aggregation_boundary();
        plan.add_clause(clause(1));
        plan.add_aggregation_boundary();
        plan.add_aggregation_boundary();
        plan.add_clause(clause(2));
        plan.add_aggregation_boundary();
        plan.add_paragraph_boundary();
        plan.add_clause(clause(3));
        plan.finish();
        assert_eq!(shape(&plan), vec![vec![1, 1], vec![1]]);
    }

    #[test]
    fn leading_paragraph_boundary_keeps_the_paragraph() {
        let mut plan = DocumentPlan::new();
        plan.add_paragraph_boundary();
        plan.add_paragraph_boundary();
        plan.add_clause(clause(1));
        plan.finish();
        assert_eq!(shape(&plan), vec![vec![1]]);
    }

    #[test]
    fn finished_empty_plan_has_no_paragraphs() {
        let mut plan = DocumentPlan::new();
        plan.finish();
        assert!(plan.paragraphs().is_empty());
        assert!(plan.is_empty());
        assert_eq!(plan.to_string(), "DocumentPlan:\n");
    }

    #[test]
    fn display_numbers_clauses() {
        let mut plan = DocumentPlan::new();
        plan.add_clause(clause(5));
        plan.add_paragraph_boundary();
        plan.add_clause(clause(7));
        plan.finish();
        assert_eq!(plan.to_string(), "DocumentPlan:\n1.1.1.{\"n\":5}\n2.1.1.{\"n\":7}\n");
    }
}
