//! Spatial relationship name -> PostGIS function mapping (spec.md §4.2/§4.4).
//!
//! Grounded on `examples/original_source/spatial/spatial.go::GetRelationshipFunction`.

use crate::error::{Result, TileServerError};

/// Resolves a relationship name (case-insensitive) to its PostGIS function.
/// Unknown spellings return `InvalidArgument` (mapped to `BadRequest`).
pub fn relationship_function(name: &str) -> Result<&'static str> {
    match name.to_lowercase().as_str() {
        "contains" => Ok("ST_Contains"),
        "crosses" => Ok("ST_Crosses"),
        "disjoint" => Ok("ST_Disjoint"),
        "equals" => Ok("ST_Equals"),
        "intersects" => Ok("ST_Intersects"),
        "overlaps" => Ok("ST_Overlaps"),
        "within" => Ok("ST_Within"),
        "touches" => Ok("ST_Touches"),
        other => Err(TileServerError::InvalidRelationship(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_relationships() {
        assert_eq!(relationship_function("intersects").unwrap(), "ST_Intersects");
        assert_eq!(relationship_function("Within").unwrap(), "ST_Within");
        assert_eq!(relationship_function("TOUCHES").unwrap(), "ST_Touches");
        assert_eq!(relationship_function("contains").unwrap(), "ST_Contains");
        assert_eq!(relationship_function("crosses").unwrap(), "ST_Crosses");
        assert_eq!(relationship_function("disjoint").unwrap(), "ST_Disjoint");
        assert_eq!(relationship_function("equals").unwrap(), "ST_Equals");
        assert_eq!(relationship_function("overlaps").unwrap(), "ST_Overlaps");
    }

    #[test]
    fn rejects_unknown_relationship() {
        assert!(relationship_function("nonsense").is_err());
    }
}
