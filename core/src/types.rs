//! Shared primitive types used across the entire simulation.

/// A stable, unique identifier for any entity in the simulation.
pub type EntityId = String;

/// The top-level tenant: one classroom groups students, jobs and stocks.
pub type ClassroomId = String;

/// Identifier of a single student within a classroom.
pub type StudentId = String;

/// Amounts of classroom currency. Display units, not cents.
pub type Money = f64;
