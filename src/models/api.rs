use serde::{Deserialize, Serialize};

use super::{NewPerson, PersonId};
use crate::error::AppResult;
use crate::validation::validate_name;

/// Request to create a new person.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePersonRequest {
    pub first_name: String,
    pub last_name: String,
}

impl CreatePersonRequest {
    /// Validate both names and turn the request into a storable person.
    pub fn into_new_person(self) -> AppResult<NewPerson> {
        validate_name(&self.first_name, "firstName")?;
        validate_name(&self.last_name, "lastName")?;
        Ok(NewPerson::new(self.first_name, self.last_name))
    }
}

/// Response after successfully creating a person.
#[derive(Debug, Serialize)]
pub struct CreatePersonResponse {
    pub id: PersonId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_person_request_deserialization() {
        let json = r#"{"firstName": "A", "lastName": "B"}"#;
        let request: CreatePersonRequest =
            serde_json::from_str(json).expect("Deserialization should succeed");

        assert_eq!(request.first_name, "A");
        assert_eq!(request.last_name, "B");
    }

    #[test]
    fn test_create_person_request_missing_first_name() {
        let json = r#"{"lastName": "B"}"#;
        let err = serde_json::from_str::<CreatePersonRequest>(json).unwrap_err();

        assert!(err.to_string().contains("firstName"));
    }

    #[test]
    fn test_empty_last_name_rejected() {
        let request = CreatePersonRequest {
            first_name: "A".to_string(),
            last_name: String::new(),
        };

        let err = request.into_new_person().unwrap_err();
        assert!(err.to_string().contains("lastName"));
    }

    #[test]
    fn test_create_person_response_serialization() {
        let json = serde_json::to_string(&CreatePersonResponse { id: 12 })
            .expect("Serialization should succeed");
        assert_eq!(json, r#"{"id":12}"#);
    }
}
