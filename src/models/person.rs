use serde::{Deserialize, Serialize};

/// Identifier assigned by the store when a person is created.
pub type PersonId = i32;

/// A stored person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
}

/// A person that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
}

impl NewPerson {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Attach the identifier the store generated.
    pub fn with_id(self, id: PersonId) -> Person {
        Person {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}
