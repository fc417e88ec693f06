//! File round-trip for the assignment upload artifact, so a run can be
//! inspected and resumed into the upload step.

use chairlift_protocol::types::ReviewerAssignments;
use std::io;
use std::path::Path;

pub fn save_assignments(assignments: &ReviewerAssignments, path: &Path) -> io::Result<()> {
    let json = assignments
        .to_json()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, json)
}

pub fn load_assignments(path: &Path) -> io::Result<ReviewerAssignments> {
    let raw = std::fs::read_to_string(path)?;
    ReviewerAssignments::from_json(&raw)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
