mod echo;
mod health;
mod metrics;
mod person;

pub use echo::echo;
pub use health::health_check;
pub use self::metrics::metrics;
pub use person::{create_person, delete_person, get_person};
