use anyhow::Result;
use tracing::debug;

use crate::models::NewNgo;
use crate::queries::insert_ngo_with_user;
use crate::{Database, server_timestamp};

/// NGO registrations staged for one atomic commit.
///
/// Staging does not touch the store. Callers check for existing emails before
/// staging, so a concurrent registration of the same email can slip in between
/// the check and the commit. When that happens the commit fails as a whole and
/// nothing from the batch is written.
#[derive(Debug, Default)]
pub struct NgoBatch {
    staged: Vec<NewNgo>,
}

impl NgoBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, ngo: NewNgo) {
        self.staged.push(ngo);
    }

    /// Whether an entry with this email is already staged.
    pub fn contains(&self, email: &str) -> bool {
        self.staged.iter().any(|n| n.email == email)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

impl Database {
    /// Write every staged NGO and its mirrored user in a single transaction.
    /// Returns the number of NGOs written.
    pub fn commit_ngo_batch(&self, batch: NgoBatch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let now = server_timestamp();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for ngo in &batch.staged {
                insert_ngo_with_user(&tx, ngo, &now)?;
            }
            tx.commit()?;
            debug!("Committed NGO batch of {}", batch.len());
            Ok(batch.len())
        })
    }
}
