mod api;
mod person;

pub use api::{CreatePersonRequest, CreatePersonResponse};
pub use person::{NewPerson, Person, PersonId};
