//! Task/Review entities and their redb store.
//!
//! redb is the single source of truth. Every mutation is one write
//! transaction: read, validate, write, commit — or bail and let the
//! dropped transaction roll everything back. Two racing mutations on
//! the same rows serialize at the transaction boundary, so the loser
//! of a delete race sees NotFound instead of corrupting state.

use crate::planner;
use chrono::NaiveDate;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "profile")]
use std::time::Instant;
use uuid::Uuid;

const TASKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("tasks");
const REVIEWS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("reviews");
const USERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("users");
const USERNAME_INDEX: TableDefinition<&str, &[u8]> = TableDefinition::new("username_index");

// ── Entity types ──────────────────────────────────────────────

/// A task — one user's commitment to study a topic over a date range.
/// Created together with its reviews; immutable afterwards except for
/// whole-schedule deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub owner: Uuid,
    pub topic: String,
    /// Self-rated prior knowledge, 1-5.
    pub familiarity: u8,
    /// Self-rated topic hardness, 1-5.
    pub difficulty: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Display tag, opaque to the server.
    pub color: String,
}

/// One scheduled review occurrence. Lifecycle: scheduled → completed
/// (one-way), either state → deleted. Reviews are only ever created as
/// part of schedule creation — mutations move, complete, or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub owner: Uuid,
    pub task_id: Uuid,
    /// Denormalized from the task so the calendar needs no join.
    pub topic: String,
    pub date: NaiveDate,
    pub completed: bool,
    pub color: String,
}

/// A review joined with its task's date range — the calendar row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub task_id: Uuid,
    pub topic: String,
    pub date: NaiveDate,
    pub completed: bool,
    pub color: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Topic name empty or whitespace-only.
    EmptyTopic,
    /// Familiarity or difficulty outside 1-5.
    RatingOutOfRange,
    /// End date not strictly after start date.
    InvalidDateRange,
    /// Mutation target absent, or not owned by the caller.
    NotFound,
    /// Another review of the same task already sits on the target date.
    DateConflict,
    UsernameTaken,
    Storage(String),
    Decode(String),
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into StoreError::Storage.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for StoreError {
            fn from(e: $t) -> Self { StoreError::Storage(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::EmptyTopic => write!(f, "topic name must not be empty"),
            StoreError::RatingOutOfRange => {
                write!(f, "familiarity and difficulty must be between 1 and 5")
            }
            StoreError::InvalidDateRange => write!(f, "end date must be after start date"),
            StoreError::NotFound => write!(f, "not found"),
            StoreError::DateConflict => {
                write!(f, "another review of this topic is already on that date")
            }
            StoreError::UsernameTaken => write!(f, "username is already taken"),
            StoreError::Storage(e) => write!(f, "storage: {e}"),
            StoreError::Decode(e) => write!(f, "decode: {e}"),
            StoreError::Encode(e) => write!(f, "encode: {e}"),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(value).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

// ── The store ──────────────────────────────────────────────────

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct ScheduleStore {
    db: Arc<Database>,
}

impl ScheduleStore {
    /// Open (or create) the store at the given path.
    /// Creates tables if they don't exist.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        // Ensure tables exist
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(TASKS)?;
            let _ = txn.open_table(REVIEWS)?;
            let _ = txn.open_table(USERS)?;
            let _ = txn.open_table(USERNAME_INDEX)?;
        }
        txn.commit()?;

        Ok(ScheduleStore { db: Arc::new(db) })
    }

    // ── Schedules ──────────────────────────────────────────────

    /// Create a task and its full run of reviews in one transaction.
    /// Either every row lands or none do.
    pub fn create_schedule(
        &self,
        owner: Uuid,
        topic: &str,
        familiarity: u8,
        difficulty: u8,
        start_date: NaiveDate,
        end_date: NaiveDate,
        color: &str,
    ) -> Result<(Task, Vec<Review>), StoreError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(StoreError::EmptyTopic);
        }
        if !(1..=5).contains(&familiarity) || !(1..=5).contains(&difficulty) {
            return Err(StoreError::RatingOutOfRange);
        }
        if end_date <= start_date {
            return Err(StoreError::InvalidDateRange);
        }

        let task = Task {
            id: Uuid::new_v4(),
            owner,
            topic: topic.to_string(),
            familiarity,
            difficulty,
            start_date,
            end_date,
            color: color.to_string(),
        };

        let reviews: Vec<Review> = planner::review_dates(familiarity, difficulty, start_date, end_date)
            .into_iter()
            .map(|date| Review {
                id: Uuid::new_v4(),
                owner,
                task_id: task.id,
                topic: task.topic.clone(),
                date,
                completed: false,
                color: task.color.clone(),
            })
            .collect();

        #[cfg(feature = "profile")]
        let write_start = Instant::now();
        let txn = self.db.begin_write()?;
        {
            let mut tasks = txn.open_table(TASKS)?;
            tasks.insert(task.id.as_bytes().as_slice(), encode(&task)?.as_slice())?;

            let mut table = txn.open_table(REVIEWS)?;
            for review in &reviews {
                table.insert(review.id.as_bytes().as_slice(), encode(review)?.as_slice())?;
            }
        }
        txn.commit()?;
        #[cfg(feature = "profile")]
        tracing::debug!(
            rows = reviews.len() + 1,
            elapsed_us = write_start.elapsed().as_micros() as u64,
            "schedule creation committed"
        );

        Ok((task, reviews))
    }

    /// Every review for one owner, joined with its task's date range,
    /// sorted by date. An owner with no tasks gets an empty vec.
    pub fn list_reviews(&self, owner: Uuid) -> Result<Vec<ReviewView>, StoreError> {
        let txn = self.db.begin_read()?;

        let tasks_table = txn.open_table(TASKS)?;
        let mut ranges = std::collections::HashMap::new();
        for entry in tasks_table.iter()? {
            let (_, value) = entry?;
            let task: Task = decode(value.value())?;
            if task.owner == owner {
                ranges.insert(task.id, (task.start_date, task.end_date));
            }
        }

        let reviews_table = txn.open_table(REVIEWS)?;
        let mut out = Vec::new();
        for entry in reviews_table.iter()? {
            let (_, value) = entry?;
            let review: Review = decode(value.value())?;
            if review.owner != owner {
                continue;
            }
            let (start_date, end_date) = ranges.get(&review.task_id).copied().ok_or_else(|| {
                StoreError::Storage(format!("review {} references a missing task", review.id))
            })?;
            out.push(ReviewView {
                id: review.id,
                task_id: review.task_id,
                topic: review.topic,
                date: review.date,
                completed: review.completed,
                color: review.color,
                start_date,
                end_date,
            });
        }

        out.sort_by(|a, b| (a.date, &a.topic, a.id).cmp(&(b.date, &b.topic, b.id)));
        Ok(out)
    }

    // ── Review mutations ───────────────────────────────────────

    /// Move one review to a new date. At most one review per (task,
    /// date) — a move onto an occupied date is refused with no effect.
    /// The new date may fall outside the task's original range; moves
    /// are user-directed overrides.
    pub fn move_review(
        &self,
        owner: Uuid,
        review_id: Uuid,
        new_date: NaiveDate,
    ) -> Result<Review, StoreError> {
        let txn = self.db.begin_write()?;
        let moved;
        {
            let mut reviews = txn.open_table(REVIEWS)?;

            let mut review: Review = match reviews.get(review_id.as_bytes().as_slice())? {
                Some(raw) => decode(raw.value())?,
                None => return Err(StoreError::NotFound),
            };
            if review.owner != owner {
                return Err(StoreError::NotFound);
            }

            for entry in reviews.iter()? {
                let (_, value) = entry?;
                let other: Review = decode(value.value())?;
                if other.id != review.id && other.task_id == review.task_id && other.date == new_date
                {
                    return Err(StoreError::DateConflict);
                }
            }

            review.date = new_date;
            reviews.insert(review.id.as_bytes().as_slice(), encode(&review)?.as_slice())?;
            moved = review;
        }
        txn.commit()?;
        Ok(moved)
    }

    /// Mark a review completed. Idempotent — completing a completed
    /// review succeeds and changes nothing. The flag never goes back.
    pub fn complete_review(&self, owner: Uuid, review_id: Uuid) -> Result<Review, StoreError> {
        let txn = self.db.begin_write()?;
        let completed;
        {
            let mut reviews = txn.open_table(REVIEWS)?;

            let mut review: Review = match reviews.get(review_id.as_bytes().as_slice())? {
                Some(raw) => decode(raw.value())?,
                None => return Err(StoreError::NotFound),
            };
            if review.owner != owner {
                return Err(StoreError::NotFound);
            }

            review.completed = true;
            reviews.insert(review.id.as_bytes().as_slice(), encode(&review)?.as_slice())?;
            completed = review;
        }
        txn.commit()?;
        Ok(completed)
    }

    /// Remove exactly one review. The parent task stays, even if this
    /// was its last review — dropping the whole schedule is a separate,
    /// explicit action.
    pub fn delete_review(&self, owner: Uuid, review_id: Uuid) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut reviews = txn.open_table(REVIEWS)?;

            let review: Review = match reviews.get(review_id.as_bytes().as_slice())? {
                Some(raw) => decode(raw.value())?,
                None => return Err(StoreError::NotFound),
            };
            if review.owner != owner {
                return Err(StoreError::NotFound);
            }

            reviews.remove(review_id.as_bytes().as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Remove every review and task for (owner, topic) in one
    /// transaction. Returns (tasks deleted, reviews deleted). NotFound
    /// only when nothing matched at all — the second of two racing
    /// deletes lands here.
    pub fn delete_schedule(&self, owner: Uuid, topic: &str) -> Result<(usize, usize), StoreError> {
        let txn = self.db.begin_write()?;
        let counts;
        {
            let mut reviews = txn.open_table(REVIEWS)?;
            let doomed_reviews: Vec<Uuid> = {
                let mut ids = Vec::new();
                for entry in reviews.iter()? {
                    let (_, value) = entry?;
                    let review: Review = decode(value.value())?;
                    if review.owner == owner && review.topic == topic {
                        ids.push(review.id);
                    }
                }
                ids
            };
            for id in &doomed_reviews {
                reviews.remove(id.as_bytes().as_slice())?;
            }

            let mut tasks = txn.open_table(TASKS)?;
            let doomed_tasks: Vec<Uuid> = {
                let mut ids = Vec::new();
                for entry in tasks.iter()? {
                    let (_, value) = entry?;
                    let task: Task = decode(value.value())?;
                    if task.owner == owner && task.topic == topic {
                        ids.push(task.id);
                    }
                }
                ids
            };
            for id in &doomed_tasks {
                tasks.remove(id.as_bytes().as_slice())?;
            }

            if doomed_tasks.is_empty() && doomed_reviews.is_empty() {
                // Nothing matched — abort via drop, no writes land.
                return Err(StoreError::NotFound);
            }
            counts = (doomed_tasks.len(), doomed_reviews.len());
        }
        txn.commit()?;
        Ok(counts)
    }

    // ── Users ──────────────────────────────────────────────────

    pub fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut index = txn.open_table(USERNAME_INDEX)?;
            if index.get(user.username.as_str())?.is_some() {
                return Err(StoreError::UsernameTaken);
            }

            let mut users = txn.open_table(USERS)?;
            users.insert(user.id.as_bytes().as_slice(), encode(user)?.as_slice())?;
            index.insert(user.username.as_str(), user.id.as_bytes().as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;

        match users.get(id.as_bytes().as_slice())? {
            Some(raw) => Ok(Some(decode(raw.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(USERNAME_INDEX)?;

        match index.get(username)? {
            Some(id_raw) => {
                let users = txn.open_table(USERS)?;
                match users.get(id_raw.value())? {
                    Some(raw) => Ok(Some(decode(raw.value())?)),
                    None => Ok(None),
                }
            }
            None => Ok(None),
        }
    }

    /// Seed a default admin user if no users exist. Returns true if created.
    pub fn ensure_default_user(&self) -> Result<bool, StoreError> {
        if self.get_user_by_username("admin")?.is_some() {
            return Ok(false);
        }

        use argon2::{
            password_hash::{rand_core::OsRng, SaltString},
            Argon2, PasswordHasher,
        };

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(b"admin", &salt)
            .map_err(|e| StoreError::Storage(e.to_string()))?
            .to_string();

        self.create_user(&User {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            password_hash,
        })?;
        Ok(true)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a temp store that auto-cleans.
    fn temp_store(name: &str) -> (ScheduleStore, String) {
        let path = format!("/tmp/schedulearn_test_{name}_{}.redb", std::process::id());
        let _ = fs::remove_file(&path); // clean up any leftover
        let store = ScheduleStore::open(&path).unwrap();
        (store, path)
    }

    fn cleanup(path: &str) {
        let _ = fs::remove_file(path);
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_schedule(store: &ScheduleStore, owner: Uuid, topic: &str) -> (Task, Vec<Review>) {
        store
            .create_schedule(owner, topic, 3, 3, d("2024-01-01"), d("2024-01-31"), "#4f46e5")
            .unwrap()
    }

    #[test]
    fn create_then_list_round_trip() {
        let (store, path) = temp_store("create_list");
        let owner = Uuid::new_v4();

        let (task, reviews) = make_schedule(&store, owner, "Ownership");
        assert_eq!(reviews.len(), 4); // EF 3 over Jan: intervals 3, 9, 27

        let listed = store.list_reviews(owner).unwrap();
        assert_eq!(listed.len(), reviews.len());
        assert_eq!(listed[0].date, d("2024-01-01"));
        for view in &listed {
            assert!(!view.completed);
            assert_eq!(view.topic, "Ownership");
            assert_eq!(view.task_id, task.id);
            assert_eq!(view.color, "#4f46e5");
            assert_eq!(view.start_date, d("2024-01-01"));
            assert_eq!(view.end_date, d("2024-01-31"));
        }
        for pair in listed.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }

        cleanup(&path);
    }

    #[test]
    fn list_is_empty_for_unknown_owner() {
        let (store, path) = temp_store("empty_owner");
        make_schedule(&store, Uuid::new_v4(), "Lifetimes");

        let listed = store.list_reviews(Uuid::new_v4()).unwrap();
        assert!(listed.is_empty());

        cleanup(&path);
    }

    #[test]
    fn create_rejects_bad_input_and_writes_nothing() {
        let (store, path) = temp_store("validation");
        let owner = Uuid::new_v4();

        let r = store.create_schedule(owner, "  ", 3, 3, d("2024-01-01"), d("2024-01-31"), "");
        assert_eq!(r.unwrap_err(), StoreError::EmptyTopic);

        let r = store.create_schedule(owner, "Tokio", 0, 3, d("2024-01-01"), d("2024-01-31"), "");
        assert_eq!(r.unwrap_err(), StoreError::RatingOutOfRange);

        let r = store.create_schedule(owner, "Tokio", 3, 6, d("2024-01-01"), d("2024-01-31"), "");
        assert_eq!(r.unwrap_err(), StoreError::RatingOutOfRange);

        // End not strictly after start
        let r = store.create_schedule(owner, "Tokio", 3, 3, d("2024-01-31"), d("2024-01-31"), "");
        assert_eq!(r.unwrap_err(), StoreError::InvalidDateRange);

        assert!(store.list_reviews(owner).unwrap().is_empty());

        cleanup(&path);
    }

    #[test]
    fn complete_is_idempotent() {
        let (store, path) = temp_store("complete");
        let owner = Uuid::new_v4();
        let (_, reviews) = make_schedule(&store, owner, "Borrowck");
        let id = reviews[1].id;

        let first = store.complete_review(owner, id).unwrap();
        assert!(first.completed);

        let second = store.complete_review(owner, id).unwrap();
        assert_eq!(first, second);

        let listed = store.list_reviews(owner).unwrap();
        assert_eq!(listed.iter().filter(|v| v.completed).count(), 1);

        cleanup(&path);
    }

    #[test]
    fn complete_unknown_review_is_not_found() {
        let (store, path) = temp_store("complete_missing");
        let owner = Uuid::new_v4();
        make_schedule(&store, owner, "Traits");

        let r = store.complete_review(owner, Uuid::new_v4());
        assert_eq!(r.unwrap_err(), StoreError::NotFound);

        cleanup(&path);
    }

    #[test]
    fn delete_review_leaves_other_rows_untouched() {
        let (store, path) = temp_store("delete_one");
        let owner = Uuid::new_v4();
        let (_, reviews) = make_schedule(&store, owner, "Macros");
        let before = store.list_reviews(owner).unwrap();

        // Nonexistent id — nothing changes
        let r = store.delete_review(owner, Uuid::new_v4());
        assert_eq!(r.unwrap_err(), StoreError::NotFound);
        assert_eq!(store.list_reviews(owner).unwrap(), before);

        // Real delete removes exactly one row
        store.delete_review(owner, reviews[0].id).unwrap();
        let after = store.list_reviews(owner).unwrap();
        assert_eq!(after.len(), before.len() - 1);
        assert!(after.iter().all(|v| v.id != reviews[0].id));

        cleanup(&path);
    }

    #[test]
    fn delete_review_checks_ownership() {
        let (store, path) = temp_store("delete_owner");
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let (_, reviews) = make_schedule(&store, owner, "Pinning");

        let r = store.delete_review(intruder, reviews[0].id);
        assert_eq!(r.unwrap_err(), StoreError::NotFound);
        assert_eq!(store.list_reviews(owner).unwrap().len(), reviews.len());

        cleanup(&path);
    }

    #[test]
    fn deleting_last_review_keeps_the_task() {
        let (store, path) = temp_store("last_review");
        let owner = Uuid::new_v4();
        // Two-day range yields a single review
        let (_, reviews) = store
            .create_schedule(owner, "Unsafe", 3, 3, d("2024-05-01"), d("2024-05-02"), "")
            .unwrap();
        assert_eq!(reviews.len(), 1);

        store.delete_review(owner, reviews[0].id).unwrap();
        assert!(store.list_reviews(owner).unwrap().is_empty());

        // The task row is still there: deleting the schedule finds it.
        let (tasks, revs) = store.delete_schedule(owner, "Unsafe").unwrap();
        assert_eq!((tasks, revs), (1, 0));

        cleanup(&path);
    }

    #[test]
    fn delete_schedule_scopes_to_owner() {
        let (store, path) = temp_store("delete_schedule");
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (_, alice_reviews) = make_schedule(&store, alice, "Serde");
        make_schedule(&store, bob, "Serde");

        let (tasks, reviews) = store.delete_schedule(alice, "Serde").unwrap();
        assert_eq!(tasks, 1);
        assert_eq!(reviews, alice_reviews.len());

        // Bob's identically-named schedule is untouched
        assert!(store.list_reviews(alice).unwrap().is_empty());
        assert_eq!(store.list_reviews(bob).unwrap().len(), alice_reviews.len());

        // A second delete on the same key observes NotFound
        let r = store.delete_schedule(alice, "Serde");
        assert_eq!(r.unwrap_err(), StoreError::NotFound);

        cleanup(&path);
    }

    #[test]
    fn move_to_occupied_date_is_refused() {
        let (store, path) = temp_store("move_conflict");
        let owner = Uuid::new_v4();
        let (_, reviews) = make_schedule(&store, owner, "Async");

        let first = &reviews[0];
        let second = &reviews[1];

        let r = store.move_review(owner, second.id, first.date);
        assert_eq!(r.unwrap_err(), StoreError::DateConflict);

        // Both rows keep their dates
        let listed = store.list_reviews(owner).unwrap();
        let dates: Vec<NaiveDate> = listed.iter().map(|v| v.date).collect();
        assert!(dates.contains(&first.date));
        assert!(dates.contains(&second.date));
        assert_eq!(listed.len(), reviews.len());

        cleanup(&path);
    }

    #[test]
    fn move_outside_task_range_is_allowed() {
        let (store, path) = temp_store("move_outside");
        let owner = Uuid::new_v4();
        let (_, reviews) = make_schedule(&store, owner, "Ffi");

        // Past the task's end date — moves are user-directed overrides
        let moved = store.move_review(owner, reviews[1].id, d("2024-03-15")).unwrap();
        assert_eq!(moved.date, d("2024-03-15"));

        let listed = store.list_reviews(owner).unwrap();
        assert_eq!(listed.last().unwrap().date, d("2024-03-15"));

        cleanup(&path);
    }

    #[test]
    fn move_checks_ownership() {
        let (store, path) = temp_store("move_owner");
        let owner = Uuid::new_v4();
        let (_, reviews) = make_schedule(&store, owner, "Wasm");

        let r = store.move_review(Uuid::new_v4(), reviews[0].id, d("2024-02-01"));
        assert_eq!(r.unwrap_err(), StoreError::NotFound);

        cleanup(&path);
    }

    #[test]
    fn mutations_survive_reopen() {
        let (store, path) = temp_store("reopen");
        let owner = Uuid::new_v4();
        let (_, reviews) = make_schedule(&store, owner, "Lifetimes");

        store.complete_review(owner, reviews[0].id).unwrap();
        store.move_review(owner, reviews[1].id, d("2024-02-20")).unwrap();
        drop(store);

        let store = ScheduleStore::open(&path).unwrap();
        let listed = store.list_reviews(owner).unwrap();
        assert_eq!(listed.len(), reviews.len());
        assert!(listed.iter().any(|v| v.id == reviews[0].id && v.completed));
        assert!(listed.iter().any(|v| v.id == reviews[1].id && v.date == d("2024-02-20")));

        cleanup(&path);
    }

    #[test]
    fn racing_deletes_serialize() {
        let (store, path) = temp_store("race");
        let owner = Uuid::new_v4();
        make_schedule(&store, owner, "Channels");

        let a = store.clone();
        let b = store.clone();
        let ha = std::thread::spawn(move || a.delete_schedule(owner, "Channels"));
        let hb = std::thread::spawn(move || b.delete_schedule(owner, "Channels"));

        let ra = ha.join().unwrap();
        let rb = hb.join().unwrap();

        // Exactly one wins with the full counts; the other sees NotFound.
        let (winner, loser) = if ra.is_ok() { (ra, rb) } else { (rb, ra) };
        assert_eq!(winner.unwrap(), (1, 4));
        assert_eq!(loser.unwrap_err(), StoreError::NotFound);
        assert!(store.list_reviews(owner).unwrap().is_empty());

        cleanup(&path);
    }

    #[test]
    fn username_index_enforces_uniqueness() {
        let (store, path) = temp_store("users");

        let user = User {
            id: Uuid::new_v4(),
            username: "maya".to_string(),
            password_hash: "hash".to_string(),
        };
        store.create_user(&user).unwrap();

        let dup = User {
            id: Uuid::new_v4(),
            username: "maya".to_string(),
            password_hash: "other".to_string(),
        };
        assert_eq!(store.create_user(&dup).unwrap_err(), StoreError::UsernameTaken);

        let found = store.get_user_by_username("maya").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.get_user_by_username("nobody").unwrap().is_none());

        cleanup(&path);
    }
}
