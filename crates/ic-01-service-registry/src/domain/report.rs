use shared_types::TopologyIssue;
use std::fmt;

/// Result of validating one system's declared interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub system: String,
    /// True iff `issues` is empty.
    pub valid: bool,
    pub issues: Vec<TopologyIssue>,
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            valid: true,
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn push_issue(&mut self, issue: TopologyIssue) {
        self.valid = false;
        self.issues.push(issue);
    }

    pub fn recommend(&mut self, recommendation: impl Into<String>) {
        let recommendation = recommendation.into();
        if !self.recommendations.contains(&recommendation) {
            self.recommendations.push(recommendation);
        }
    }

    /// Whether a cycle was reported.
    pub fn has_cycle(&self) -> bool {
        self.issues.iter().any(TopologyIssue::is_cycle)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "{}: valid", self.system);
        }
        write!(f, "{}: {} issue(s)", self.system, self.issues.len())?;
        for issue in &self.issues {
            write!(f, "; {issue}")?;
        }
        Ok(())
    }
}
