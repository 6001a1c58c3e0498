//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend for Warden. It uses rusqlite with
//! bundled SQLite behind a mutex. Permission sets are stored as CBOR arrays
//! of permission names.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use warden_core::{
    CollectionId, EntityId, GroupId, PermissionCollection, PermissionSet, SecuredEntity, UserId,
};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{entity_collection_ids, EntityStore, PermissionCollectionStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Every call holds the connection for its
/// whole duration, so a single `save_entity` is atomic.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and its parent directory) and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the database described by `config`.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        match &config.path {
            Some(path) => Self::open(path),
            None => Self::open_memory(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(format!("sqlite connection: {}", e)))
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a blocking operation that needs mutable access.
    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }
}

// Helper to encode a permission set to CBOR
fn encode_permissions(permissions: &PermissionSet) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(permissions, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

// Helper to decode a permission set from CBOR
fn decode_permissions(bytes: &[u8]) -> Result<PermissionSet> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn load_collection(conn: &Connection, id: CollectionId) -> Result<Option<PermissionCollection>> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT permissions FROM permission_collections WHERE collection_id = ?1",
            params![id.get()],
            |row| row.get(0),
        )
        .optional()?;

    match blob {
        Some(bytes) => Ok(Some(PermissionCollection::with_id(id, decode_permissions(&bytes)?))),
        None => Ok(None),
    }
}

// Rows of one mapping table for an entity, as (principal, collection) pairs
fn load_mapping(
    conn: &Connection,
    sql: &str,
    entity_id: EntityId,
) -> Result<Vec<(i64, CollectionId)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![entity_id.get()], |row| {
            Ok((row.get::<_, i64>(0)?, CollectionId(row.get(1)?)))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// Whether any entity still maps `id`, in either table
fn is_mapped(conn: &Connection, id: CollectionId) -> Result<bool> {
    let mapped = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entity_user_permissions WHERE collection_id = ?1)
             OR EXISTS(SELECT 1 FROM entity_group_permissions WHERE collection_id = ?1)",
        params![id.get()],
        |row| row.get(0),
    )?;
    Ok(mapped)
}

fn require_collection(conn: &Connection, id: CollectionId) -> Result<PermissionCollection> {
    load_collection(conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))
}

impl PermissionCollectionStore for SqliteStore {
    fn save_collection(&self, collection: &mut PermissionCollection) -> Result<CollectionId> {
        let blob = encode_permissions(collection.permissions())?;
        let existing = collection.id();

        let id = self.with_conn(|conn| {
            let now = now_millis();
            match existing {
                Some(id) => {
                    conn.execute(
                        "INSERT INTO permission_collections (collection_id, permissions, updated_at)
                         VALUES (?1, ?2, ?3)
                         ON CONFLICT(collection_id) DO UPDATE SET
                            permissions = excluded.permissions,
                            updated_at = excluded.updated_at",
                        params![id.get(), blob, now],
                    )?;
                    Ok(id)
                }
                None => {
                    conn.execute(
                        "INSERT INTO permission_collections (permissions, updated_at) VALUES (?1, ?2)",
                        params![blob, now],
                    )?;
                    Ok(CollectionId(conn.last_insert_rowid()))
                }
            }
        })?;

        collection.assign_id(id);
        tracing::trace!(collection = %id, size = collection.len(), "sqlite: saved collection");
        Ok(id)
    }

    fn find_collection(&self, id: CollectionId) -> Result<Option<PermissionCollection>> {
        self.with_conn(|conn| load_collection(conn, id))
    }
}

impl EntityStore for SqliteStore {
    fn save_entity(&self, entity: &mut SecuredEntity) -> Result<EntityId> {
        let collections = entity_collection_ids(entity)?;
        let existing = entity.id();
        let name = entity.name.clone();
        let description = entity.description.clone();

        let id = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_millis();

            let id = match existing {
                Some(id) => {
                    tx.execute(
                        "INSERT INTO entities (entity_id, name, description, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?4)
                         ON CONFLICT(entity_id) DO UPDATE SET
                            name = excluded.name,
                            description = excluded.description,
                            updated_at = excluded.updated_at",
                        params![id.get(), name, description, now],
                    )?;
                    id
                }
                None => {
                    tx.execute(
                        "INSERT INTO entities (name, description, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?3)",
                        params![name, description, now],
                    )?;
                    EntityId(tx.last_insert_rowid())
                }
            };

            // Replace both mappings with the current ones
            tx.execute(
                "DELETE FROM entity_user_permissions WHERE entity_id = ?1",
                params![id.get()],
            )?;
            tx.execute(
                "DELETE FROM entity_group_permissions WHERE entity_id = ?1",
                params![id.get()],
            )?;

            // Whatever is still mapped belongs to another entity; dropping tx rolls back
            for collection_id in collections.iter() {
                if is_mapped(&tx, collection_id)? {
                    return Err(StoreError::SharedCollection(collection_id.to_string()));
                }
            }

            for (user, collection_id) in &collections.users {
                tx.execute(
                    "INSERT INTO entity_user_permissions (entity_id, user_id, collection_id)
                     VALUES (?1, ?2, ?3)",
                    params![id.get(), user.get(), collection_id.get()],
                )?;
            }
            for (group, collection_id) in &collections.groups {
                tx.execute(
                    "INSERT INTO entity_group_permissions (entity_id, group_id, collection_id)
                     VALUES (?1, ?2, ?3)",
                    params![id.get(), group.get(), collection_id.get()],
                )?;
            }

            tx.commit()?;
            Ok(id)
        })?;

        entity.assign_id(id);
        tracing::trace!(
            entity = %id,
            users = collections.users.len(),
            groups = collections.groups.len(),
            "sqlite: saved entity"
        );
        Ok(id)
    }

    fn find_entity(&self, id: EntityId) -> Result<Option<SecuredEntity>> {
        self.with_conn(|conn| {
            let row: Option<(String, Option<String>)> = conn
                .query_row(
                    "SELECT name, description FROM entities WHERE entity_id = ?1",
                    params![id.get()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((name, description)) = row else {
                return Ok(None);
            };

            let mut entity = SecuredEntity::new(name);
            entity.description = description;
            entity.assign_id(id);

            let users = load_mapping(
                conn,
                "SELECT user_id, collection_id FROM entity_user_permissions WHERE entity_id = ?1",
                id,
            )?;
            for (user, collection_id) in users {
                entity
                    .user_permissions
                    .attach(UserId(user), require_collection(conn, collection_id)?);
            }

            let groups = load_mapping(
                conn,
                "SELECT group_id, collection_id FROM entity_group_permissions WHERE entity_id = ?1",
                id,
            )?;
            for (group, collection_id) in groups {
                entity
                    .group_permissions
                    .attach(GroupId(group), require_collection(conn, collection_id)?);
            }

            Ok(Some(entity))
        })
    }

    fn delete_entity(&self, id: EntityId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM permission_collections WHERE collection_id IN (
                    SELECT collection_id FROM entity_user_permissions WHERE entity_id = ?1
                    UNION
                    SELECT collection_id FROM entity_group_permissions WHERE entity_id = ?1
                 )",
                params![id.get()],
            )?;
            tx.execute(
                "DELETE FROM entity_user_permissions WHERE entity_id = ?1",
                params![id.get()],
            )?;
            tx.execute(
                "DELETE FROM entity_group_permissions WHERE entity_id = ?1",
                params![id.get()],
            )?;
            let removed = tx.execute("DELETE FROM entities WHERE entity_id = ?1", params![id.get()])?;

            tx.commit()?;
            tracing::trace!(entity = %id, removed, "sqlite: deleted entity");
            Ok(removed > 0)
        })
    }

    fn list_entities(&self) -> Result<Vec<EntityId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT entity_id FROM entities ORDER BY entity_id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0).map(EntityId))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::Permission;

    fn set(permissions: &[Permission]) -> PermissionSet {
        permissions.iter().copied().collect()
    }

    fn saved_collection(store: &SqliteStore, permissions: &[Permission]) -> PermissionCollection {
        let mut collection = PermissionCollection::new(set(permissions));
        store.save_collection(&mut collection).unwrap();
        collection
    }

    #[test]
    fn test_collection_insert_then_update() {
        let store = SqliteStore::open_memory().unwrap();
        let mut collection = saved_collection(&store, &[Permission::Read]);
        let id = collection.id().unwrap();

        collection.revoke(&set(&[Permission::Read]));
        assert_eq!(store.save_collection(&mut collection).unwrap(), id);

        // Emptied collections stay stored
        let loaded = store.find_collection(id).unwrap().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_entity_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();

        let mut entity = SecuredEntity::new("orthophoto").with_description("2024 flight");
        entity
            .user_permissions
            .attach(UserId(1), saved_collection(&store, &[Permission::Read, Permission::Write]));
        entity
            .group_permissions
            .attach(GroupId(9), saved_collection(&store, &[Permission::Admin]));

        let id = store.save_entity(&mut entity).unwrap();
        let loaded = store.find_entity(id).unwrap().unwrap();

        assert_eq!(loaded, entity);
        assert_eq!(store.list_entities().unwrap(), vec![id]);
    }

    #[test]
    fn test_resave_replaces_mapping() {
        let store = SqliteStore::open_memory().unwrap();
        let mut entity = SecuredEntity::new("roads");
        entity
            .user_permissions
            .attach(UserId(1), saved_collection(&store, &[Permission::Read]));
        let id = store.save_entity(&mut entity).unwrap();

        entity.user_permissions.detach(&UserId(1));
        entity
            .user_permissions
            .attach(UserId(2), saved_collection(&store, &[Permission::Delete]));
        store.save_entity(&mut entity).unwrap();

        let loaded = store.find_entity(id).unwrap().unwrap();
        assert!(!loaded.user_permissions.contains(&UserId(1)));
        assert!(loaded.user_permissions.contains(&UserId(2)));
    }

    #[test]
    fn test_transient_entity_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let mut entity = SecuredEntity::new("roads");
        entity
            .group_permissions
            .attach(GroupId(1), PermissionCollection::new(set(&[Permission::Read])));

        assert!(matches!(
            store.save_entity(&mut entity),
            Err(StoreError::Transient(_))
        ));
        assert!(store.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_delete_entity_cascades_collections() {
        let store = SqliteStore::open_memory().unwrap();
        let collection = saved_collection(&store, &[Permission::Read]);
        let collection_id = collection.id().unwrap();

        let mut entity = SecuredEntity::new("lakes");
        entity.user_permissions.attach(UserId(3), collection);
        let id = store.save_entity(&mut entity).unwrap();

        assert!(store.delete_entity(id).unwrap());
        assert!(store.find_entity(id).unwrap().is_none());
        assert!(store.find_collection(collection_id).unwrap().is_none());
        assert!(!store.delete_entity(id).unwrap());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("warden.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            let mut entity = SecuredEntity::new("contours");
            entity
                .user_permissions
                .attach(UserId(4), saved_collection(&store, &[Permission::Read]));
            store.save_entity(&mut entity).unwrap()
        };

        let store = SqliteStore::from_config(&StoreConfig::at(&path)).unwrap();
        let loaded = store.find_entity(id).unwrap().unwrap();
        assert!(loaded
            .permissions_of(UserId(4).into())
            .unwrap()
            .contains(Permission::Read));
    }

    #[test]
    fn test_collection_shared_between_principals_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let collection = saved_collection(&store, &[Permission::Read]);

        let mut entity = SecuredEntity::new("roads");
        entity.user_permissions.attach(UserId(1), collection.clone());
        entity.user_permissions.attach(UserId(2), collection);

        assert!(matches!(
            store.save_entity(&mut entity),
            Err(StoreError::SharedCollection(_))
        ));
        assert!(!entity.is_persisted());
        assert!(store.list_entities().unwrap().is_empty());
    }

    #[test]
    fn test_collection_shared_between_entities_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let collection = saved_collection(&store, &[Permission::Read]);

        let mut first = SecuredEntity::new("roads");
        first.user_permissions.attach(UserId(1), collection.clone());
        let first_id = store.save_entity(&mut first).unwrap();

        let mut second = SecuredEntity::new("rivers");
        second.group_permissions.attach(GroupId(1), collection);
        assert!(matches!(
            store.save_entity(&mut second),
            Err(StoreError::SharedCollection(_))
        ));

        // The failed save rolled back its entity row
        assert_eq!(store.list_entities().unwrap(), vec![first_id]);
        assert_eq!(store.save_entity(&mut first).unwrap(), first_id);
        assert_eq!(store.find_entity(first_id).unwrap().unwrap(), first);
    }
}
