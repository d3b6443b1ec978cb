//! Creation/update timestamps carried by aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Creation, update, and soft-deletion instants for a persisted aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// When the aggregate was created.
    pub created_at: DateTime<Utc>,
    /// When the aggregate was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Reads skip rows where this is set.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Creates timestamps for a freshly constructed aggregate.
    #[must_use]
    pub fn new(clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Marks the aggregate as mutated now.
    pub fn touch(&mut self, clock: &dyn Clock) {
        self.updated_at = clock.now();
    }
}
