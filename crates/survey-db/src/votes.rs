use anyhow::Result;
use tracing::{debug, error, warn};

use survey_types::api::InsertResult;
use survey_types::models::Document;

use crate::document::{Collection, DocumentStore, Filter, FindOptions, stamp_if_absent};
use crate::surveys::SurveyStore;

/// Field of a vote that references the voted survey.
///
/// The name is historical: `voteId` holds the survey id, not an id of the
/// vote itself.
pub const SURVEY_REF_FIELD: &str = "voteId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastOutcome {
    pub inserted: InsertResult,
    /// Whether the survey's `voteCount` was bumped. `false` means the vote
    /// log and the counter now disagree.
    pub counter_updated: bool,
}

/// Append-only vote log plus the denormalized per-survey counter.
pub struct VoteLedger<'a> {
    db: &'a dyn DocumentStore,
}

impl<'a> VoteLedger<'a> {
    pub fn new(db: &'a dyn DocumentStore) -> Self {
        Self { db }
    }

    /// Appends the vote, then increments the survey counter.
    ///
    /// The two writes are not transactional. Success depends on the append
    /// alone; a failed or missed increment is logged and reported through
    /// `CastOutcome::counter_updated`.
    pub fn cast(&self, survey_id: &str, mut vote: Document) -> Result<CastOutcome> {
        stamp_if_absent(&mut vote, "timestamp");
        let inserted = self.db.insert_one(Collection::Votes, vote)?;

        let counter_updated = match SurveyStore::new(self.db).increment_vote_count(survey_id) {
            Ok(result) if result.matched_count == 1 => {
                debug!("Vote {} counted on survey {}", inserted.inserted_id, survey_id);
                true
            }
            Ok(_) => {
                warn!(
                    "Vote {} references unknown survey {}; counter not updated",
                    inserted.inserted_id, survey_id
                );
                false
            }
            Err(e) => {
                error!(
                    "Vote {} recorded but voteCount of survey {} not incremented: {}",
                    inserted.inserted_id, survey_id, e
                );
                false
            }
        };

        Ok(CastOutcome {
            inserted,
            counter_updated,
        })
    }

    pub fn list_all(&self) -> Result<Vec<Document>> {
        self.db.find(Collection::Votes, &Filter::all(), &FindOptions::default())
    }

    pub fn by_voter(&self, email: &str) -> Result<Vec<Document>> {
        self.by_field("voterEmail", email)
    }

    pub fn by_surveyor(&self, email: &str) -> Result<Vec<Document>> {
        self.by_field("surveyorEmail", email)
    }

    pub fn by_survey(&self, survey_id: &str) -> Result<Vec<Document>> {
        self.by_field(SURVEY_REF_FIELD, survey_id)
    }

    pub fn get(&self, id: &str) -> Result<Option<Document>> {
        self.db.find_one(Collection::Votes, &Filter::by_id(id))
    }

    fn by_field(&self, field: &str, value: &str) -> Result<Vec<Document>> {
        self.db.find(
            Collection::Votes,
            &Filter::all().eq(field, value),
            &FindOptions::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn three_votes_move_the_counter_to_three() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);
        let ledger = VoteLedger::new(&db);
        let survey_id = surveys.create(doc(json!({ "title": "X" }))).unwrap().inserted_id;
        let other_id = surveys.create(doc(json!({ "title": "Y" }))).unwrap().inserted_id;

        for voter in ["a@x.io", "b@x.io", "c@x.io"] {
            let outcome = ledger
                .cast(
                    &survey_id,
                    doc(json!({ "voteId": survey_id, "voterEmail": voter, "choice": "yes" })),
                )
                .unwrap();
            assert!(outcome.counter_updated);
        }
        ledger
            .cast(&other_id, doc(json!({ "voteId": other_id, "voterEmail": "a@x.io" })))
            .unwrap();

        let survey = surveys.get_by_id(&survey_id).unwrap().unwrap();
        assert_eq!(survey["voteCount"], json!(3));
        assert_eq!(ledger.by_survey(&survey_id).unwrap().len(), 3);
        assert_eq!(ledger.by_voter("a@x.io").unwrap().len(), 2);
    }

    #[test]
    fn saturated_counter_keeps_the_vote_and_the_store_usable() {
        let db = Database::open_in_memory().unwrap();
        let ledger = VoteLedger::new(&db);
        let survey_id = db
            .insert_one(Collection::Surveys, doc(json!({ "title": "X", "voteCount": i64::MAX })))
            .unwrap()
            .inserted_id;

        let outcome = ledger
            .cast(&survey_id, doc(json!({ "voteId": survey_id, "voterEmail": "a@x.io" })))
            .unwrap();
        assert!(!outcome.counter_updated);
        assert_eq!(ledger.by_survey(&survey_id).unwrap().len(), 1);

        let survey = SurveyStore::new(&db).get_by_id(&survey_id).unwrap().unwrap();
        assert_eq!(survey["voteCount"], json!(i64::MAX));
    }

    #[test]
    fn vote_for_unknown_survey_is_still_recorded() {
        let db = Database::open_in_memory().unwrap();
        let ledger = VoteLedger::new(&db);

        let outcome = ledger
            .cast("missing", doc(json!({ "voteId": "missing", "surveyorEmail": "s@x.io" })))
            .unwrap();
        assert!(!outcome.counter_updated);

        let stored = ledger.get(&outcome.inserted.inserted_id).unwrap().unwrap();
        assert_eq!(stored["voteId"], json!("missing"));
        assert!(stored["timestamp"].is_string());
        assert_eq!(ledger.by_surveyor("s@x.io").unwrap().len(), 1);
    }
}
