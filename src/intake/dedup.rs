//! Duplicate detection for incoming warranty submissions
//!
//! Scores a candidate against every existing record with a weighted
//! combination of field similarities and flags the best match at or above
//! the configured threshold. Scoring is pure; the intake pipeline acts on
//! the verdict.

use serde::{Deserialize, Serialize};

use super::similarity::{field_similarity, text_similarity};
use crate::types::{WarrantyRecord, WarrantySubmission};

/// Scan scope for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DedupScope {
    /// Compare only against records in the submission's brand partition.
    #[default]
    Brand,
    /// Compare against every record in the store.
    Global,
}

/// Per-field score weights. Must sum to 1.0.
///
/// Exact-match fields carry the discriminating power; free text is a
/// tie-strengthener. The defaults are exact binary fractions so that
/// threshold-boundary behavior is reproducible in f64 arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldWeights {
    pub email: f64,
    pub product_model: f64,
    pub client_name: f64,
    pub issue_description: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            email: 0.5,
            product_model: 0.25,
            client_name: 0.125,
            issue_description: 0.125,
        }
    }
}

impl FieldWeights {
    pub fn sum(&self) -> f64 {
        self.email + self.product_model + self.client_name + self.issue_description
    }
}

/// Duplicate checker configuration (operator-tunable via TOML).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Scan scope: same brand partition or the whole store.
    #[serde(default)]
    pub scope: DedupScope,
    /// Combined score at or above which a submission is a duplicate.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub weights: FieldWeights,
}

fn default_threshold() -> f64 {
    0.75
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            scope: DedupScope::default(),
            threshold: default_threshold(),
            weights: FieldWeights::default(),
        }
    }
}

/// One scored comparison factor, kept for operator-facing duplicate reports.
#[derive(Debug, Clone)]
pub struct FactorScore {
    pub field: &'static str,
    pub score: f64,
    pub weight: f64,
}

/// Outcome of checking one candidate against the existing record set.
#[derive(Debug, Clone)]
pub enum DedupVerdict {
    /// No existing record reached the threshold.
    Unique {
        /// Best score seen (0.0 when the store was empty).
        best_score: f64,
    },
    /// The candidate duplicates an existing ticket.
    Duplicate {
        ticket_id: String,
        score: f64,
        factors: Vec<FactorScore>,
    },
}

impl DedupVerdict {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DedupVerdict::Duplicate { .. })
    }
}

/// Weighted-similarity duplicate checker.
pub struct DuplicateChecker {
    config: DedupConfig,
}

impl DuplicateChecker {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Per-field similarity factors for one candidate/record pair.
    ///
    /// A field that is empty on either side scores 0.0 but keeps its
    /// weight, so sparse submissions cannot inflate the combined score.
    pub fn factors(&self, candidate: &WarrantySubmission, record: &WarrantyRecord) -> Vec<FactorScore> {
        let w = &self.config.weights;
        vec![
            FactorScore {
                field: "email",
                score: field_similarity(&candidate.client_email, &record.client_email),
                weight: w.email,
            },
            FactorScore {
                field: "product_model",
                score: field_similarity(&candidate.product_model, &record.product_model),
                weight: w.product_model,
            },
            FactorScore {
                field: "client_name",
                score: field_similarity(&candidate.client_name, &record.client_name),
                weight: w.client_name,
            },
            FactorScore {
                field: "issue_description",
                score: text_similarity(&candidate.issue_description, &record.issue_description),
                weight: w.issue_description,
            },
        ]
    }

    /// Combined score for one candidate/record pair, in `[0, 1]`.
    pub fn score(&self, candidate: &WarrantySubmission, record: &WarrantyRecord) -> f64 {
        self.factors(candidate, record)
            .iter()
            .map(|f| f.score * f.weight)
            .sum()
    }

    /// Decide whether `candidate` duplicates any of `existing`.
    ///
    /// The best-scoring record wins; ties on the top score resolve to the
    /// earliest `submitted_at` (the presumed canonical claim). With a
    /// `Brand` scope, records from other partitions are ignored, so the
    /// caller may pass the whole store either way.
    pub fn check(&self, candidate: &WarrantySubmission, existing: &[WarrantyRecord]) -> DedupVerdict {
        let mut best: Option<(&WarrantyRecord, f64)> = None;

        for record in existing {
            if self.config.scope == DedupScope::Brand && Some(record.brand) != candidate.brand {
                continue;
            }

            let score = self.score(candidate, record);
            let replaces = match best {
                None => true,
                Some((best_record, best_score)) => {
                    score > best_score
                        || (score == best_score && record.submitted_at < best_record.submitted_at)
                }
            };
            if replaces {
                best = Some((record, score));
            }
        }

        match best {
            Some((record, score)) if score >= self.config.threshold => DedupVerdict::Duplicate {
                ticket_id: record.ticket_id.clone(),
                score,
                factors: self.factors(candidate, record),
            },
            Some((_, score)) => DedupVerdict::Unique { best_score: score },
            None => DedupVerdict::Unique { best_score: 0.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Brand, TicketStatus};
    use chrono::{TimeZone, Utc};

    fn submission(email: &str, model: &str, name: &str, issue: &str) -> WarrantySubmission {
        WarrantySubmission {
            brand: Some(Brand::Conway),
            client_email: email.to_string(),
            client_name: name.to_string(),
            product_model: model.to_string(),
            issue_description: issue.to_string(),
            ..Default::default()
        }
    }

    fn record(
        id: &str,
        email: &str,
        model: &str,
        name: &str,
        issue: &str,
        day: u32,
    ) -> WarrantyRecord {
        WarrantyRecord {
            ticket_id: id.to_string(),
            brand: Brand::Conway,
            status: TicketStatus::Recibida,
            submitted_at: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).single().unwrap(),
            client_email: email.to_string(),
            client_name: name.to_string(),
            tax_id: String::new(),
            product_model: model.to_string(),
            product_size: String::new(),
            manufacture_year: String::new(),
            product_condition: String::new(),
            issue_description: issue.to_string(),
            proposed_solution: String::new(),
        }
    }

    fn checker() -> DuplicateChecker {
        DuplicateChecker::new(DedupConfig::default())
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert_eq!(FieldWeights::default().sum(), 1.0);
    }

    #[test]
    fn identical_records_score_exactly_one() {
        let c = checker();
        let cand = submission("a@x.com", "SN123", "Taller A", "ruido de frenos");
        let rec = record("t1", "a@x.com", "SN123", "Taller A", "ruido de frenos", 1);

        assert_eq!(c.score(&cand, &rec), 1.0);
        let verdict = c.check(&cand, &[rec]);
        match verdict {
            DedupVerdict::Duplicate { ticket_id, score, .. } => {
                assert_eq!(ticket_id, "t1");
                assert_eq!(score, 1.0);
            }
            DedupVerdict::Unique { .. } => panic!("identical record must be a duplicate"),
        }
    }

    #[test]
    fn empty_store_is_always_unique() {
        let c = checker();
        let cand = submission("a@x.com", "SN123", "Taller A", "ruido");
        assert!(!c.check(&cand, &[]).is_duplicate());
    }

    #[test]
    fn score_is_symmetric_in_field_content() {
        let c = checker();
        let cand_a = submission("a@x.com", "Cairon C 2.0", "Taller", "brake noise");
        let rec_b = record("t1", "a@y.com", "Cairon C 3.0", "Taller Dos", "brakes are noisy", 1);

        // Mirror the contents: candidate B vs record A.
        let cand_b = submission("a@y.com", "Cairon C 3.0", "Taller Dos", "brakes are noisy");
        let rec_a = record("t2", "a@x.com", "Cairon C 2.0", "Taller", "brake noise", 1);

        assert_eq!(c.score(&cand_a, &rec_b), c.score(&cand_b, &rec_a));
    }

    #[test]
    fn boundary_score_of_exactly_threshold_is_duplicate() {
        // Email + product identical, everything else empty on both sides:
        // 0.5 + 0.25 = exactly 0.75 with the default binary-fraction weights.
        let c = checker();
        let cand = submission("a@x.com", "SN123", "", "");
        let rec = record("t1", "a@x.com", "SN123", "", "", 1);

        assert_eq!(c.score(&cand, &rec), 0.75);
        assert!(c.check(&cand, &[rec]).is_duplicate());
    }

    #[test]
    fn score_just_below_threshold_is_unique() {
        let config = DedupConfig {
            weights: FieldWeights {
                email: 0.749,
                product_model: 0.251,
                client_name: 0.0,
                issue_description: 0.0,
            },
            ..Default::default()
        };
        let c = DuplicateChecker::new(config);
        // Only the email can match (the record has no model): 0.749 < 0.75.
        let cand = submission("a@x.com", "SN123", "", "");
        let rec = record("t1", "a@x.com", "", "", "", 1);

        let verdict = c.check(&cand, &[rec]);
        match verdict {
            DedupVerdict::Unique { best_score } => assert!(best_score < 0.75),
            DedupVerdict::Duplicate { .. } => panic!("0.749 must classify unique"),
        }
    }

    #[test]
    fn tie_breaks_to_earliest_submission() {
        let c = checker();
        let cand = submission("a@x.com", "SN123", "Taller A", "ruido");
        let newer = record("t-new", "a@x.com", "SN123", "Taller A", "ruido", 20);
        let older = record("t-old", "a@x.com", "SN123", "Taller A", "ruido", 3);

        for order in [vec![newer.clone(), older.clone()], vec![older.clone(), newer.clone()]] {
            match c.check(&cand, &order) {
                DedupVerdict::Duplicate { ticket_id, .. } => assert_eq!(ticket_id, "t-old"),
                DedupVerdict::Unique { .. } => panic!("expected duplicate"),
            }
        }
    }

    #[test]
    fn near_identical_issue_text_still_matches() {
        // Heavy fields identical, free text paraphrased.
        let c = checker();
        let cand = submission("a@x.com", "SN123", "", "brakes are noisy");
        let rec = record("t1", "a@x.com", "SN123", "", "brake noise", 1);

        let score = c.score(&cand, &rec);
        assert!(score >= 0.75, "expected duplicate-range score, got {score}");
        assert!(c.check(&cand, &[rec]).is_duplicate());
    }

    #[test]
    fn empty_fields_never_inflate_the_score() {
        // All comparison fields empty on both sides: nothing matches, 0.0.
        let c = checker();
        let cand = submission("", "", "", "");
        let rec = record("t1", "", "", "", "", 1);
        assert_eq!(c.score(&cand, &rec), 0.0);
        assert!(!c.check(&cand, &[rec]).is_duplicate());
    }

    #[test]
    fn brand_scope_skips_other_partitions() {
        let c = checker();
        let cand = submission("a@x.com", "SN123", "Taller A", "ruido");
        let mut other = record("t1", "a@x.com", "SN123", "Taller A", "ruido", 1);
        other.brand = Brand::Dare;

        assert!(!c.check(&cand, &[other.clone()]).is_duplicate());

        let global = DuplicateChecker::new(DedupConfig {
            scope: DedupScope::Global,
            ..Default::default()
        });
        assert!(global.check(&cand, &[other]).is_duplicate());
    }
}
