use async_duckdb::ClientBuilder;
use async_duckdb::duckdb::{OptionalExt, Row, params};
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use std::path::Path;

use crate::clients::entities::{
    NewSavedTrack, NewUser, Preferences, SaveOutcome, SavedTrack, User,
};
use crate::clients::errors::{Error, Result};

/// Connection string that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

enum Table {
    User,
    SavedTrack,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::User => "users",
            Table::SavedTrack => "saved_tracks",
        }
    }
}

const USER_COLUMNS: &str =
    "id, spotify_id, display_name, email, favorite_genres, favorite_artists, created_at";
const SAVED_TRACK_COLUMNS: &str =
    "id, user_id, track_id, track_name, artists, image_url, saved_at";

// Rows as they come out of DuckDB, before the JSON list columns and the
// timestamps are decoded.
struct UserRow {
    id: String,
    spotify_id: String,
    display_name: String,
    email: String,
    favorite_genres: String,
    favorite_artists: String,
    created_at: String,
}

impl UserRow {
    fn read(row: &Row<'_>) -> async_duckdb::duckdb::Result<Self> {
        Ok(UserRow {
            id: row.get(0)?,
            spotify_id: row.get(1)?,
            display_name: row.get(2)?,
            email: row.get(3)?,
            favorite_genres: row.get(4)?,
            favorite_artists: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<User> {
        Ok(User {
            favorite_genres: decode_list(&self.favorite_genres)?,
            favorite_artists: decode_list(&self.favorite_artists)?,
            created_at: decode_timestamp(&self.created_at)?,
            id: self.id,
            spotify_id: self.spotify_id,
            display_name: self.display_name,
            email: self.email,
        })
    }
}

struct SavedTrackRow {
    id: String,
    user_id: String,
    track_id: String,
    track_name: String,
    artists: String,
    image_url: Option<String>,
    saved_at: String,
}

impl SavedTrackRow {
    fn read(row: &Row<'_>) -> async_duckdb::duckdb::Result<Self> {
        Ok(SavedTrackRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            track_id: row.get(2)?,
            track_name: row.get(3)?,
            artists: row.get(4)?,
            image_url: row.get(5)?,
            saved_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<SavedTrack> {
        Ok(SavedTrack {
            artists: decode_list(&self.artists)?,
            saved_at: decode_timestamp(&self.saved_at)?,
            id: self.id,
            user_id: self.user_id,
            track_id: self.track_id,
            track_name: self.track_name,
            image_url: self.image_url,
        })
    }
}

fn encode_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values).map_err(|e| Error::CorruptRecord(e.to_string()))
}

fn decode_list(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| Error::CorruptRecord(format!("list column {raw:?}: {e}")))
}

// Fixed precision keeps the stored text sortable.
fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::CorruptRecord(format!("timestamp {raw:?}: {e}")))
}

/// Stores users and their saved tracks in an embedded DuckDB database.
///
/// All statements of one operation run inside a single closure on the
/// client's connection thread, so a lookup followed by a write cannot
/// interleave with another request's write.
pub struct LocalStorage {
    client: async_duckdb::Client,
}

impl LocalStorage {
    /// Open `<store_url>/<db_name>.duckdb`, or a private in-memory database
    /// when `store_url` is [`IN_MEMORY`].
    pub async fn open(store_url: &str, db_name: &str) -> Result<Self> {
        if store_url == IN_MEMORY {
            return Self::in_memory().await;
        }
        let dir = Path::new(store_url);
        tokio::fs::create_dir_all(dir).await?;
        let db_path = dir.join(format!("{db_name}.duckdb"));
        let client = ClientBuilder::new().path(&db_path).open().await?;
        debug!("Opened storage database at {db_path:?}");
        Ok(LocalStorage { client })
    }

    pub async fn in_memory() -> Result<Self> {
        let client = ClientBuilder::new().open().await?;
        debug!("Opened in-memory storage database");
        Ok(LocalStorage { client })
    }

    pub async fn init_db(&self) -> Result<()> {
        let table_query = format!(
            "
            CREATE SEQUENCE IF NOT EXISTS saved_track_seq START 1;
            CREATE TABLE IF NOT EXISTS {user_table} (
                id TEXT PRIMARY KEY,
                spotify_id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                email TEXT NOT NULL,
                favorite_genres TEXT NOT NULL,
                favorite_artists TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {track_table} (
                seq BIGINT DEFAULT nextval('saved_track_seq'),
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                track_id TEXT NOT NULL,
                track_name TEXT NOT NULL,
                artists TEXT NOT NULL,
                image_url TEXT,
                saved_at TEXT NOT NULL
            );
        ",
            user_table = Table::User.as_str(),
            track_table = Table::SavedTrack.as_str()
        );
        self.client
            .conn(move |conn| conn.execute_batch(&table_query))
            .await?;

        debug!("Successfully initialized storage database");
        Ok(())
    }

    /// Insert a new user. Fails with [`Error::Conflict`] if the email is taken.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let user = User::register(new_user);
        let genres = encode_list(&user.favorite_genres)?;
        let artists = encode_list(&user.favorite_artists)?;
        let created_at = encode_timestamp(&user.created_at);
        let lookup = format!(
            "SELECT id FROM {} WHERE email = ? LIMIT 1;",
            Table::User.as_str()
        );
        let insert = format!(
            "INSERT INTO {} ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?);",
            Table::User.as_str()
        );
        let (id, spotify_id, display_name, email) = (
            user.id.clone(),
            user.spotify_id.clone(),
            user.display_name.clone(),
            user.email.clone(),
        );

        let inserted = self
            .client
            .conn(move |conn| {
                let existing: Option<String> = conn
                    .query_row(&lookup, [email.as_str()], |row| row.get(0))
                    .optional()?;
                if existing.is_some() {
                    return Ok(false);
                }
                conn.execute(
                    &insert,
                    params![id, spotify_id, display_name, email, genres, artists, created_at],
                )?;
                Ok(true)
            })
            .await?;

        if !inserted {
            return Err(Error::Conflict(format!(
                "a user with email {} already exists",
                user.email
            )));
        }
        debug!("Created user {}", user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM {} WHERE id = ? LIMIT 1;",
            Table::User.as_str()
        );
        let user_id = user_id.to_string();

        let row = self
            .client
            .conn(move |conn| {
                conn.query_row(&query, [user_id.as_str()], UserRow::read)
                    .optional()
            })
            .await?;

        row.map(UserRow::decode).transpose()
    }

    /// Overwrite a user's favourite genres and artists. Returns `false` when
    /// no such user exists.
    pub async fn update_preferences(&self, user_id: &str, preferences: &Preferences) -> Result<bool> {
        let query = format!(
            "UPDATE {} SET favorite_genres = ?, favorite_artists = ? WHERE id = ?;",
            Table::User.as_str()
        );
        let genres = encode_list(&preferences.genres)?;
        let artists = encode_list(&preferences.artists)?;
        let user_id = user_id.to_string();

        let updated = self
            .client
            .conn(move |conn| conn.execute(&query, params![genres, artists, user_id]))
            .await?;

        Ok(updated > 0)
    }

    /// Add a track to the user's saved list. Saving a track id that is already
    /// present leaves the list untouched and returns the existing entry.
    pub async fn save_track(&self, user_id: &str, track: NewSavedTrack) -> Result<SaveOutcome> {
        let saved = SavedTrack::for_user(user_id, track);
        let artists = encode_list(&saved.artists)?;
        let saved_at = encode_timestamp(&saved.saved_at);
        let lookup = format!(
            "SELECT {SAVED_TRACK_COLUMNS} FROM {} WHERE user_id = ? AND track_id = ? LIMIT 1;",
            Table::SavedTrack.as_str()
        );
        let insert = format!(
            "INSERT INTO {} ({SAVED_TRACK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?);",
            Table::SavedTrack.as_str()
        );
        let record = saved.clone();

        let existing = self
            .client
            .conn(move |conn| {
                let existing = conn
                    .query_row(
                        &lookup,
                        params![record.user_id, record.track_id],
                        SavedTrackRow::read,
                    )
                    .optional()?;
                if existing.is_none() {
                    conn.execute(
                        &insert,
                        params![
                            record.id,
                            record.user_id,
                            record.track_id,
                            record.track_name,
                            artists,
                            record.image_url,
                            saved_at
                        ],
                    )?;
                }
                Ok(existing)
            })
            .await?;

        match existing {
            Some(row) => {
                debug!("Track {} already saved for user {user_id}", saved.track_id);
                Ok(SaveOutcome::AlreadySaved(row.decode()?))
            }
            None => {
                debug!("Saved track {} for user {user_id}", saved.track_id);
                Ok(SaveOutcome::Created(saved))
            }
        }
    }

    /// A user's saved tracks in the order they were saved.
    pub async fn saved_tracks(&self, user_id: &str) -> Result<Vec<SavedTrack>> {
        let query = format!(
            "SELECT {SAVED_TRACK_COLUMNS} FROM {} WHERE user_id = ? ORDER BY seq;",
            Table::SavedTrack.as_str()
        );
        let user_id = user_id.to_string();

        let rows = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt
                    .query_map([user_id.as_str()], SavedTrackRow::read)?
                    .collect::<async_duckdb::duckdb::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(SavedTrackRow::decode).collect()
    }

    /// Returns whether a saved entry was actually removed.
    pub async fn remove_saved_track(&self, user_id: &str, track_id: &str) -> Result<bool> {
        let query = format!(
            "DELETE FROM {} WHERE user_id = ? AND track_id = ?;",
            Table::SavedTrack.as_str()
        );
        let (user_id, track_id) = (user_id.to_string(), track_id.to_string());

        let removed = self
            .client
            .conn(move |conn| conn.execute(&query, params![user_id, track_id]))
            .await?;

        debug!("Removed {removed} saved track row(s)");
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> LocalStorage {
        let storage = LocalStorage::in_memory().await.unwrap();
        storage.init_db().await.unwrap();
        storage
    }

    fn ada() -> NewUser {
        NewUser {
            display_name: "Ada".into(),
            email: "ada@example.com".into(),
            spotify_id: String::new(),
        }
    }

    fn track(id: &str) -> NewSavedTrack {
        NewSavedTrack {
            track_id: id.into(),
            track_name: format!("Track {id}"),
            artists: vec!["Someone".into()],
            image_url: None,
        }
    }

    #[tokio::test]
    async fn created_user_can_be_fetched() {
        let storage = storage().await;
        let created = storage.create_user(ada()).await.unwrap();

        let fetched = storage.get_user(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.favorite_genres.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let storage = storage().await;
        let first = storage.create_user(ada()).await.unwrap();

        let second = storage.create_user(ada()).await;
        assert!(matches!(second, Err(Error::Conflict(_))));

        let count = storage
            .client
            .conn(|conn| conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get::<_, i64>(0)))
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(storage.get_user(&first.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let storage = storage().await;
        assert!(storage.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn preferences_are_overwritten() {
        let storage = storage().await;
        let user = storage.create_user(ada()).await.unwrap();

        let first = Preferences {
            genres: vec!["jazz".into()],
            artists: vec![],
        };
        assert!(storage.update_preferences(&user.id, &first).await.unwrap());
        let second = Preferences {
            genres: vec!["techno".into(), "house".into()],
            artists: vec!["4NHQUGzhtTLFvgF5SZesLK".into()],
        };
        assert!(storage.update_preferences(&user.id, &second).await.unwrap());

        let fetched = storage.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.favorite_genres, second.genres);
        assert_eq!(fetched.favorite_artists, second.artists);
    }

    #[tokio::test]
    async fn preferences_for_unknown_user_match_nothing() {
        let storage = storage().await;
        let updated = storage
            .update_preferences("missing", &Preferences::default())
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn saving_twice_keeps_one_entry() {
        let storage = storage().await;
        let user = storage.create_user(ada()).await.unwrap();

        let first = storage.save_track(&user.id, track("T1")).await.unwrap();
        let second = storage.save_track(&user.id, track("T1")).await.unwrap();

        let SaveOutcome::Created(created) = first else {
            panic!("first save should create an entry");
        };
        assert_eq!(second, SaveOutcome::AlreadySaved(created.clone()));
        assert_eq!(storage.saved_tracks(&user.id).await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn saved_tracks_keep_insertion_order_per_user() {
        let storage = storage().await;
        let user = storage.create_user(ada()).await.unwrap();
        for id in ["T3", "T1", "T2"] {
            storage.save_track(&user.id, track(id)).await.unwrap();
        }
        storage.save_track("someone-else", track("T9")).await.unwrap();

        let ids: Vec<_> = storage
            .saved_tracks(&user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.track_id)
            .collect();
        assert_eq!(ids, ["T3", "T1", "T2"]);
    }

    #[tokio::test]
    async fn removing_is_idempotent() {
        let storage = storage().await;
        let user = storage.create_user(ada()).await.unwrap();
        storage.save_track(&user.id, track("T1")).await.unwrap();

        assert!(!storage.remove_saved_track(&user.id, "T404").await.unwrap());
        assert_eq!(storage.saved_tracks(&user.id).await.unwrap().len(), 1);

        assert!(storage.remove_saved_track(&user.id, "T1").await.unwrap());
        assert!(!storage.remove_saved_track(&user.id, "T1").await.unwrap());
        assert!(storage.saved_tracks(&user.id).await.unwrap().is_empty());
    }
}
