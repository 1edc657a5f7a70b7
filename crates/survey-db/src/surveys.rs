use anyhow::Result;
use serde_json::Value;

use survey_types::api::{DeleteResult, InsertResult, SurveyPage, UpdateResult};
use survey_types::models::{Direction, Document, SurveyStatus};

use crate::document::{
    Collection, DocumentStore, Filter, FindOptions, ID_FIELD, Sort, Update, stamp_if_absent,
};

pub const VOTE_COUNT_FIELD: &str = "voteCount";
pub const TOP_RANKED_LIMIT: u64 = 6;

/// Filters shared by the paged listing and its count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyFilter {
    /// Case-insensitive fragment of the title.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
}

impl SurveyFilter {
    fn to_filter(&self) -> Filter {
        let mut filter = Filter::all();
        if let Some(search) = &self.search {
            filter = filter.contains("title", search);
        }
        if let Some(category) = &self.category {
            filter = filter.eq("category", category.as_str());
        }
        filter
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyQuery {
    pub filter: SurveyFilter,
    pub deadline_order: Option<Direction>,
    /// 1-based.
    pub page: u64,
    pub size: u64,
}

pub struct SurveyStore<'a> {
    db: &'a dyn DocumentStore,
}

impl<'a> SurveyStore<'a> {
    pub fn new(db: &'a dyn DocumentStore) -> Self {
        Self { db }
    }

    /// Stores the survey as submitted. Ownership (`surveyor`) is whatever the
    /// client declared. The vote counter always starts at zero.
    pub fn create(&self, mut survey: Document) -> Result<InsertResult> {
        survey
            .entry("status")
            .or_insert_with(|| Value::String(SurveyStatus::Pending.as_str().to_string()));
        survey.insert(VOTE_COUNT_FIELD.to_string(), Value::from(0));
        stamp_if_absent(&mut survey, "timestamp");
        self.db.insert_one(Collection::Surveys, survey)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Document>> {
        self.db.find_one(Collection::Surveys, &Filter::by_id(id))
    }

    pub fn delete_by_id(&self, id: &str) -> Result<DeleteResult> {
        self.db.delete_one(Collection::Surveys, &Filter::by_id(id))
    }

    /// Overwrites the supplied fields, creating the survey when the id is
    /// unknown. The vote counter belongs to the vote ledger and is not
    /// writable here.
    pub fn replace(&self, id: &str, mut fields: Document) -> Result<UpdateResult> {
        fields.remove(ID_FIELD);
        fields.remove(VOTE_COUNT_FIELD);
        self.db
            .update_one(Collection::Surveys, &Filter::by_id(id), &Update::set(fields), true)
    }

    pub fn update_status(
        &self,
        id: &str,
        status: SurveyStatus,
        feedback: Option<&str>,
    ) -> Result<UpdateResult> {
        let mut update = Update::default().set_field("status", status.as_str());
        if let Some(feedback) = feedback {
            update = update.set_field("feedback", feedback);
        }
        self.db
            .update_one(Collection::Surveys, &Filter::by_id(id), &update, false)
    }

    /// One page of matching surveys plus the total match count. The two reads
    /// are independent; concurrent writes may make them disagree.
    pub fn list(&self, query: &SurveyQuery) -> Result<SurveyPage> {
        let filter = query.filter.to_filter();
        let sort = query.deadline_order.map(|direction| Sort::new("deadline", direction));
        let options = FindOptions::default()
            .sorted(sort)
            .skip(query.page.saturating_sub(1).saturating_mul(query.size))
            .limit(query.size);

        let surveys = self.db.find(Collection::Surveys, &filter, &options)?;
        let total_count = self.db.count(Collection::Surveys, &filter)?;
        Ok(SurveyPage {
            surveys,
            total_count,
        })
    }

    pub fn count(&self, filter: &SurveyFilter) -> Result<u64> {
        self.db.count(Collection::Surveys, &filter.to_filter())
    }

    pub fn top_ranked(&self, sort: Option<Sort>) -> Result<Vec<Document>> {
        let options = FindOptions::default().sorted(sort).limit(TOP_RANKED_LIMIT);
        self.db.find(Collection::Surveys, &Filter::all(), &options)
    }

    pub fn by_surveyor(&self, email: &str) -> Result<Vec<Document>> {
        self.db.find(
            Collection::Surveys,
            &Filter::all().eq("surveyor.email", email),
            &FindOptions::default(),
        )
    }

    pub fn increment_vote_count(&self, id: &str) -> Result<UpdateResult> {
        self.db.update_one(
            Collection::Surveys,
            &Filter::by_id(id),
            &Update::inc(VOTE_COUNT_FIELD, 1),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn create_then_get_returns_the_same_fields() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);
        let id = surveys
            .create(doc(json!({
                "title": "Sleep",
                "category": "health",
                "deadline": "2026-12-01",
                "surveyor": { "email": "s@x.io", "name": "Sam" }
            })))
            .unwrap()
            .inserted_id;

        let stored = surveys.get_by_id(&id).unwrap().unwrap();
        assert_eq!(stored["title"], json!("Sleep"));
        assert_eq!(stored["category"], json!("health"));
        assert_eq!(stored["surveyor"]["name"], json!("Sam"));
        assert_eq!(stored["status"], json!("pending"));
        assert_eq!(stored["voteCount"], json!(0));
        assert!(stored["timestamp"].is_string());
    }

    #[test]
    fn create_ignores_a_client_vote_count() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);
        let id = surveys
            .create(doc(json!({ "title": "t", "voteCount": i64::MAX })))
            .unwrap()
            .inserted_id;
        assert_eq!(surveys.get_by_id(&id).unwrap().unwrap()["voteCount"], json!(0));
    }

    #[test]
    fn page_far_past_the_end_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);
        for i in 0..3 {
            surveys.create(doc(json!({ "title": format!("s{}", i) }))).unwrap();
        }

        let page = surveys
            .list(&SurveyQuery {
                filter: SurveyFilter::default(),
                deadline_order: None,
                page: u64::MAX,
                size: 10,
            })
            .unwrap();
        assert!(page.surveys.is_empty());
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn status_update_is_visible_and_unrestricted() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);
        let id = surveys.create(doc(json!({ "title": "t" }))).unwrap().inserted_id;

        surveys.update_status(&id, SurveyStatus::Published, Some("ok")).unwrap();
        let stored = surveys.get_by_id(&id).unwrap().unwrap();
        assert_eq!(stored["status"], json!("published"));
        assert_eq!(stored["feedback"], json!("ok"));

        // back to pending is allowed; feedback is kept when none is given
        surveys.update_status(&id, SurveyStatus::Pending, None).unwrap();
        let stored = surveys.get_by_id(&id).unwrap().unwrap();
        assert_eq!(stored["status"], json!("pending"));
        assert_eq!(stored["feedback"], json!("ok"));
    }

    #[test]
    fn replace_upserts_and_protects_the_counter() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);

        let created = surveys
            .replace("s-1", doc(json!({ "title": "fresh", "voteCount": 99 })))
            .unwrap();
        assert_eq!(created.upserted_id.as_deref(), Some("s-1"));
        assert!(surveys.get_by_id("s-1").unwrap().unwrap().get("voteCount").is_none());

        surveys.increment_vote_count("s-1").unwrap();
        surveys
            .replace("s-1", doc(json!({ "title": "edited", "voteCount": 0 })))
            .unwrap();
        let stored = surveys.get_by_id("s-1").unwrap().unwrap();
        assert_eq!(stored["title"], json!("edited"));
        assert_eq!(stored["voteCount"], json!(1));
    }

    #[test]
    fn second_page_of_filtered_listing() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);
        for i in 1..=12 {
            surveys
                .create(doc(json!({ "title": format!("Foo poll {}", i), "category": "tech" })))
                .unwrap();
        }
        surveys.create(doc(json!({ "title": "Foo elsewhere", "category": "food" }))).unwrap();
        surveys.create(doc(json!({ "title": "Bar", "category": "tech" }))).unwrap();

        let page = surveys
            .list(&SurveyQuery {
                filter: SurveyFilter {
                    search: Some("foo".into()),
                    category: Some("tech".into()),
                },
                deadline_order: None,
                page: 2,
                size: 5,
            })
            .unwrap();

        assert_eq!(page.total_count, 12);
        let titles: Vec<_> = page.surveys.iter().map(|s| s["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Foo poll 6", "Foo poll 7", "Foo poll 8", "Foo poll 9", "Foo poll 10"]);
    }

    #[test]
    fn listing_sorts_by_deadline() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);
        for deadline in ["2026-03-01", "2026-01-01", "2026-02-01"] {
            surveys.create(doc(json!({ "title": deadline, "deadline": deadline }))).unwrap();
        }
        let page = surveys
            .list(&SurveyQuery {
                filter: SurveyFilter::default(),
                deadline_order: Some(Direction::Descending),
                page: 1,
                size: 10,
            })
            .unwrap();
        let deadlines: Vec<_> = page.surveys.iter().map(|s| s["deadline"].as_str().unwrap()).collect();
        assert_eq!(deadlines, vec!["2026-03-01", "2026-02-01", "2026-01-01"]);
    }

    #[test]
    fn top_ranked_is_capped_at_six() {
        let db = Database::open_in_memory().unwrap();
        let surveys = SurveyStore::new(&db);
        for votes in 0..9 {
            surveys.create(doc(json!({ "title": "t", "voteCount": votes }))).unwrap();
        }
        let top = surveys
            .top_ranked(Some(Sort::new(VOTE_COUNT_FIELD, Direction::Descending)))
            .unwrap();
        let counts: Vec<_> = top.iter().map(|s| s["voteCount"].as_i64().unwrap()).collect();
        assert_eq!(counts, vec![8, 7, 6, 5, 4, 3]);
    }
}
