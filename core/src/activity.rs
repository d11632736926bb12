//! Activity log — append-only engagement rows recorded by callers
//! (logins, task completions), consumed by the analytics heatmap.

use crate::{
    clock::SimClock,
    types::{ClassroomId, EntityId, StudentId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: EntityId,
    pub classroom_id: ClassroomId,
    pub student_id: StudentId,
    /// Engagement intensity in [0, 1].
    pub activity_level: f64,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ActivityStore {
    pub records: Vec<ActivityRecord>,
}

impl ActivityStore {
    pub fn record(
        &mut self,
        classroom_id: &str,
        student_id: &str,
        activity_level: f64,
        clock: &SimClock,
    ) {
        self.records.push(ActivityRecord {
            id: Uuid::new_v4().to_string(),
            classroom_id: classroom_id.to_string(),
            student_id: student_id.to_string(),
            activity_level: activity_level.clamp(0.0, 1.0),
            at: clock.now,
        });
    }

    pub fn student_records(&self, student_id: &str) -> Vec<&ActivityRecord> {
        self.records
            .iter()
            .filter(|r| r.student_id == student_id)
            .collect()
    }
}
