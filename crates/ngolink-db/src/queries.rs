use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use ngolink_types::models::{Message, Ngo, NgoStatus, Requirement, RequirementStatus, Role, User};

use crate::models::{
    MESSAGE_COLUMNS, MessageRow, NGO_COLUMNS, NewNgo, NewRequirement, NgoRow, ProfileUpdate,
    REQUIREMENT_COLUMNS, RequirementRow, USER_COLUMNS, UserRow,
};
use crate::{Database, server_timestamp};

impl Database {
    // -- Users --

    /// Create-if-absent. Returns `false` when a user with this email exists.
    pub fn create_user(
        &self,
        email: &str,
        password: &str,
        role: Role,
        name: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (email, password, role, name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![email, password, role.as_str(), name, server_timestamp()],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, email))
    }

    /// Merge the given profile fields. Returns `None` if no such user exists.
    pub fn update_user_profile(&self, email: &str, update: &ProfileUpdate) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                     name = COALESCE(?2, name),
                     bio = COALESCE(?3, bio),
                     contact = COALESCE(?4, contact),
                     profile_picture = COALESCE(?5, profile_picture)
                 WHERE email = ?1",
                params![
                    email,
                    update.name,
                    update.bio,
                    update.contact,
                    update.profile_picture
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, email)
        })
    }

    // -- NGOs --

    pub fn get_ngo(&self, email: &str) -> Result<Option<Ngo>> {
        self.with_conn(|conn| query_ngo(conn, email))
    }

    /// True if either an NGO or a user document already holds this email.
    pub fn email_taken(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| email_taken(conn, email))
    }

    /// Create the NGO and its mirrored `ngo` user in one transaction.
    /// Returns `false` (and writes nothing) if the email is already taken.
    pub fn create_ngo(&self, ngo: &NewNgo) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if email_taken(&tx, &ngo.email)? {
                return Ok(false);
            }
            insert_ngo_with_user(&tx, ngo, &server_timestamp())?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Mark the NGO approved and propagate the status to its mirrored user,
    /// if one exists. Returns `false` if the NGO does not exist.
    pub fn approve_ngo(&self, email: &str, approved_by: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE ngos SET status = ?2, approved_by = ?3, approved_at = ?4 WHERE email = ?1",
                params![
                    email,
                    NgoStatus::Approved.as_str(),
                    approved_by,
                    server_timestamp()
                ],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            tx.execute(
                "UPDATE users SET status = ?2 WHERE email = ?1",
                params![email, NgoStatus::Approved.as_str()],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// NGOs with the given status, optionally restricted to one city, oldest first.
    pub fn list_ngos(&self, status: NgoStatus, city: Option<&str>) -> Result<Vec<Ngo>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NGO_COLUMNS} FROM ngos
                 WHERE status = ?1 AND (?2 IS NULL OR city = ?2)
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![status.as_str(), city], NgoRow::read)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(Ngo::try_from).collect()
        })
    }

    // -- Requirements --

    pub fn insert_requirement(&self, new: &NewRequirement) -> Result<Requirement> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO requirements (id, ngo_email, item, quantity, description, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    new.ngo_email,
                    new.item,
                    new.quantity,
                    new.description,
                    RequirementStatus::Pending.as_str(),
                    server_timestamp()
                ],
            )?;
            query_requirement(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("Requirement {} vanished after insert", id))
        })
    }

    pub fn get_requirement(&self, id: &Uuid) -> Result<Option<Requirement>> {
        self.with_conn(|conn| query_requirement(conn, id))
    }

    /// Requirements with the given status, for one NGO or across all of them,
    /// oldest first.
    pub fn list_requirements(
        &self,
        ngo_email: Option<&str>,
        status: RequirementStatus,
    ) -> Result<Vec<Requirement>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REQUIREMENT_COLUMNS} FROM requirements
                 WHERE status = ?1 AND (?2 IS NULL OR ngo_email = ?2)
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![status.as_str(), ngo_email], RequirementRow::read)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(Requirement::try_from).collect()
        })
    }

    /// Overwrite item, quantity and description and stamp `updated_at`, only
    /// while the requirement is approved. Status is left untouched. Returns
    /// `None` if no approved requirement with this id exists.
    pub fn update_requirement_fields(
        &self,
        id: &Uuid,
        item: &str,
        quantity: i64,
        description: &str,
    ) -> Result<Option<Requirement>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE requirements SET item = ?2, quantity = ?3, description = ?4, updated_at = ?5
                 WHERE id = ?1 AND status = ?6",
                params![
                    id.to_string(),
                    item,
                    quantity,
                    description,
                    server_timestamp(),
                    RequirementStatus::Approved.as_str()
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_requirement(conn, id)
        })
    }

    /// Returns `false` if no such requirement exists.
    pub fn approve_requirement(&self, id: &Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE requirements SET status = ?2 WHERE id = ?1",
                params![id.to_string(), RequirementStatus::Approved.as_str()],
            )?;
            Ok(changed == 1)
        })
    }

    /// Returns `false` if no such requirement exists.
    pub fn reject_requirement(&self, id: &Uuid, reason: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE requirements SET status = ?2, rejection_reason = ?3, reviewed_at = ?4
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    RequirementStatus::Rejected.as_str(),
                    reason,
                    server_timestamp()
                ],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, from: &str, to: &str, body: &str) -> Result<Message> {
        let id = Uuid::new_v4();
        let created_at = server_timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, from_email, to_email, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.to_string(), from, to, body, created_at],
            )?;
            Ok(())
        })?;

        Message::try_from(MessageRow {
            id: id.to_string(),
            from_email: from.to_string(),
            to_email: to.to_string(),
            body: body.to_string(),
            created_at,
        })
    }

    /// Every message whose sender AND recipient are both in `{a, b}`,
    /// oldest first. Self-messages of either party are included.
    pub fn get_conversation(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE from_email IN (?1, ?2) AND to_email IN (?1, ?2)
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![a, b], MessageRow::read)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(Message::try_from).collect()
        })
    }
}

pub(crate) fn email_taken(conn: &Connection, email: &str) -> Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM ngos WHERE email = ?1)
             OR EXISTS (SELECT 1 FROM users WHERE email = ?1)",
        [email],
        |row| row.get(0),
    )?;
    Ok(taken)
}

/// Plain inserts: a duplicate email fails the statement (and the enclosing
/// transaction) rather than overwriting.
pub(crate) fn insert_ngo_with_user(conn: &Connection, ngo: &NewNgo, now: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO ngos (email, name, city, full_address, category, registration_id, contact,
                           password, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            ngo.email,
            ngo.name,
            ngo.city,
            ngo.full_address,
            ngo.category,
            ngo.registration_id,
            ngo.contact,
            ngo.password,
            NgoStatus::Pending.as_str(),
            now
        ],
    )?;
    conn.execute(
        "INSERT INTO users (email, password, role, status, name, contact, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            ngo.email,
            ngo.password,
            Role::Ngo.as_str(),
            NgoStatus::Pending.as_str(),
            ngo.name,
            ngo.contact,
            now
        ],
    )?;
    Ok(())
}

fn query_user(conn: &Connection, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    let row = conn.query_row(&sql, [email], UserRow::read).optional()?;
    row.map(User::try_from).transpose()
}

fn query_ngo(conn: &Connection, email: &str) -> Result<Option<Ngo>> {
    let sql = format!("SELECT {NGO_COLUMNS} FROM ngos WHERE email = ?1");
    let row = conn.query_row(&sql, [email], NgoRow::read).optional()?;
    row.map(Ngo::try_from).transpose()
}

fn query_requirement(conn: &Connection, id: &Uuid) -> Result<Option<Requirement>> {
    let sql = format!("SELECT {REQUIREMENT_COLUMNS} FROM requirements WHERE id = ?1");
    let row = conn
        .query_row(&sql, [id.to_string()], RequirementRow::read)
        .optional()?;
    row.map(Requirement::try_from).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_ngo(email: &str, city: &str) -> NewNgo {
        NewNgo {
            email: email.into(),
            name: format!("{email} trust"),
            city: city.into(),
            full_address: "1 Main St".into(),
            category: "food".into(),
            registration_id: "REG-1".into(),
            contact: "555".into(),
            password: "pw".into(),
        }
    }

    fn new_requirement(ngo: &str, item: &str) -> NewRequirement {
        NewRequirement {
            ngo_email: ngo.into(),
            item: item.into(),
            quantity: 5,
            description: "".into(),
        }
    }

    #[test]
    fn test_create_user_is_create_if_absent() {
        let db = db();
        assert!(db.create_user("a@x.com", "p", Role::User, Some("A")).unwrap());
        assert!(!db.create_user("a@x.com", "other", Role::User, None).unwrap());

        let user = db.get_user("a@x.com").unwrap().unwrap();
        assert_eq!(user.password, "p");
        assert_eq!(user.name.as_deref(), Some("A"));
        assert_eq!(user.role, Role::User);
        assert_eq!(user.status, None);
    }

    #[test]
    fn test_profile_merge_keeps_unset_fields() {
        let db = db();
        db.create_user("a@x.com", "p", Role::User, Some("A")).unwrap();

        let update = ProfileUpdate {
            bio: Some("hello".into()),
            ..Default::default()
        };
        let user = db.update_user_profile("a@x.com", &update).unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("A"));
        assert_eq!(user.bio.as_deref(), Some("hello"));

        assert!(db.update_user_profile("nobody@x.com", &update).unwrap().is_none());
    }

    #[test]
    fn test_create_ngo_writes_mirrored_user() {
        let db = db();
        assert!(db.create_ngo(&new_ngo("n@x.com", "Pune")).unwrap());

        let ngo = db.get_ngo("n@x.com").unwrap().unwrap();
        assert_eq!(ngo.status, NgoStatus::Pending);
        let user = db.get_user("n@x.com").unwrap().unwrap();
        assert_eq!(user.role, Role::Ngo);
        assert_eq!(user.status, Some(NgoStatus::Pending));

        // Second registration and a clash with a plain user both refuse.
        assert!(!db.create_ngo(&new_ngo("n@x.com", "Pune")).unwrap());
        db.create_user("u@x.com", "p", Role::User, None).unwrap();
        assert!(!db.create_ngo(&new_ngo("u@x.com", "Pune")).unwrap());
        assert!(db.get_ngo("u@x.com").unwrap().is_none());
    }

    #[test]
    fn test_approve_ngo_propagates_and_is_idempotent() {
        let db = db();
        db.create_ngo(&new_ngo("n@x.com", "Pune")).unwrap();

        assert!(db.approve_ngo("n@x.com", Some("admin@x.com")).unwrap());
        assert!(db.approve_ngo("n@x.com", Some("admin@x.com")).unwrap());

        let ngo = db.get_ngo("n@x.com").unwrap().unwrap();
        assert_eq!(ngo.status, NgoStatus::Approved);
        assert_eq!(ngo.approved_by.as_deref(), Some("admin@x.com"));
        assert!(ngo.approved_at.is_some());
        let user = db.get_user("n@x.com").unwrap().unwrap();
        assert_eq!(user.status, Some(NgoStatus::Approved));

        assert!(!db.approve_ngo("ghost@x.com", None).unwrap());
    }

    #[test]
    fn test_list_ngos_filters_status_and_city() {
        let db = db();
        db.create_ngo(&new_ngo("a@x.com", "Pune")).unwrap();
        db.create_ngo(&new_ngo("b@x.com", "Delhi")).unwrap();
        db.create_ngo(&new_ngo("c@x.com", "Pune")).unwrap();
        db.approve_ngo("a@x.com", None).unwrap();
        db.approve_ngo("b@x.com", None).unwrap();

        let approved = db.list_ngos(NgoStatus::Approved, None).unwrap();
        assert_eq!(approved.len(), 2);
        let pune = db.list_ngos(NgoStatus::Approved, Some("Pune")).unwrap();
        assert_eq!(pune.len(), 1);
        assert_eq!(pune[0].email, "a@x.com");
        let pending = db.list_ngos(NgoStatus::Pending, None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].email, "c@x.com");
    }

    #[test]
    fn test_requirement_lifecycle() {
        let db = db();
        let req = db.insert_requirement(&new_requirement("n@x.com", "Rice bags")).unwrap();
        assert_eq!(req.status, RequirementStatus::Pending);
        assert!(req.updated_at.is_none());

        assert!(db.approve_requirement(&req.id).unwrap());
        let updated = db
            .update_requirement_fields(&req.id, "Wheat", 9, "urgent")
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, RequirementStatus::Approved);
        assert_eq!(updated.item, "Wheat");
        assert_eq!(updated.quantity, 9);
        assert!(updated.updated_at.unwrap() >= updated.created_at);

        let other = db.insert_requirement(&new_requirement("n@x.com", "Soap")).unwrap();
        assert!(db.reject_requirement(&other.id, "duplicate").unwrap());
        let rejected = db.get_requirement(&other.id).unwrap().unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate"));
        assert!(rejected.reviewed_at.is_some());

        let missing = Uuid::new_v4();
        assert!(!db.approve_requirement(&missing).unwrap());
        assert!(!db.reject_requirement(&missing, "x").unwrap());
        assert!(db.update_requirement_fields(&missing, "a", 1, "").unwrap().is_none());
    }

    #[test]
    fn test_update_fields_skips_unapproved_rows() {
        let db = db();
        let req = db.insert_requirement(&new_requirement("n@x.com", "Rice")).unwrap();
        assert!(db.update_requirement_fields(&req.id, "Wheat", 9, "").unwrap().is_none());

        // Rejected after approval: the edit must not land.
        assert!(db.approve_requirement(&req.id).unwrap());
        assert!(db.reject_requirement(&req.id, "spam").unwrap());
        assert!(db.update_requirement_fields(&req.id, "Wheat", 9, "").unwrap().is_none());

        let stored = db.get_requirement(&req.id).unwrap().unwrap();
        assert_eq!(stored.item, "Rice");
        assert_eq!(stored.quantity, 5);
        assert_eq!(stored.status, RequirementStatus::Rejected);
        assert!(stored.updated_at.is_none());
    }

    #[test]
    fn test_list_requirements_by_ngo_and_status() {
        let db = db();
        let a = db.insert_requirement(&new_requirement("a@x.com", "Rice")).unwrap();
        db.insert_requirement(&new_requirement("a@x.com", "Soap")).unwrap();
        db.insert_requirement(&new_requirement("b@x.com", "Books")).unwrap();
        db.approve_requirement(&a.id).unwrap();

        let approved = db.list_requirements(Some("a@x.com"), RequirementStatus::Approved).unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, a.id);
        let pending_a = db.list_requirements(Some("a@x.com"), RequirementStatus::Pending).unwrap();
        assert_eq!(pending_a.len(), 1);
        let pending_all = db.list_requirements(None, RequirementStatus::Pending).unwrap();
        assert_eq!(pending_all.len(), 2);
        assert!(db.list_requirements(Some("b@x.com"), RequirementStatus::Rejected).unwrap().is_empty());
    }

    #[test]
    fn test_conversation_predicate_and_order() {
        let db = db();
        db.insert_message("a", "b", "1").unwrap();
        db.insert_message("b", "a", "2").unwrap();
        db.insert_message("a", "c", "not ours").unwrap();
        db.insert_message("c", "b", "not ours either").unwrap();
        db.insert_message("a", "a", "note to self").unwrap();

        let convo = db.get_conversation("a", "b").unwrap();
        let bodies: Vec<&str> = convo.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["1", "2", "note to self"]);
        assert!(convo.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}
