//! Exercise definitions - body-part categories and their exercises
//!
//! Both are owned by the remote document store and read-only here.

use serde::{Deserialize, Serialize};

/// Reference from a body part to one of its exercises
///
/// The relationship attribute comes back either expanded (`{"$id": ..}`)
/// or as a bare id string, depending on the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExerciseRef {
    Id(String),
    Document {
        #[serde(rename = "$id")]
        id: String,
    },
}

impl ExerciseRef {
    pub fn id(&self) -> &str {
        match self {
            ExerciseRef::Id(id) => id,
            ExerciseRef::Document { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Relationship attribute, named `exercise` in the collection
    #[serde(default, rename = "exercise")]
    pub exercises: Vec<ExerciseRef>,
}

impl BodyPart {
    /// Exercise ids in the order the body part lists them
    pub fn exercise_ids(&self) -> Vec<&str> {
        self.exercises.iter().map(ExerciseRef::id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}
